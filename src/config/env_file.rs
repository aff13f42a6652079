//! `KEY=VALUE` env file support
//!
//! Values from the file sit between process environment variables and the
//! TOML file in precedence. The process environment is never modified.

use std::collections::HashMap;
use std::path::Path;

/// Parse env file content
///
/// Blank lines and lines starting with `#` are skipped. Each remaining line
/// is split at the first `=`; key and value are trimmed. Lines without `=`
/// or with an empty key are ignored. Later duplicates win.
#[must_use]
pub fn parse_env_file(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Load an env file, returning an empty map if it is absent or unreadable
pub fn load_env_file(path: &Path) -> HashMap<String, String> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let vars = parse_env_file(&content);
            tracing::debug!(path = %path.display(), vars = vars.len(), "loaded env file");
            vars
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "env file not found");
            HashMap::new()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read env file");
            HashMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn captured_logs(f: impl FnOnce()) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        tracing::subscriber::with_default(subscriber, f);

        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn parses_pairs_comments_and_blanks() {
        let vars = parse_env_file(
            "# credentials\n\nGROQ_API_KEY = gsk_123\nMODEL=llama=3\n\
             \x20 # indented comment\nBROKEN\n=nokey\n",
        );

        assert_eq!(vars.len(), 2);
        assert_eq!(vars["GROQ_API_KEY"], "gsk_123");
        assert_eq!(vars["MODEL"], "llama=3");
    }

    #[test]
    fn later_duplicates_win() {
        let vars = parse_env_file("A=1\nA=2\n");
        assert_eq!(vars["A"], "2");
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_env_file(&dir.path().join(".env")).is_empty());
    }

    #[test]
    fn missing_file_is_logged_as_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");

        let logs = captured_logs(|| {
            load_env_file(&path);
        });

        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("env file not found"), "{logs}");
    }
}
