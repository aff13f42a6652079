//! Cleanup of model output before it is spoken or stored

use std::sync::LazyLock;

use regex::Regex;

/// Maximum length of a sanitized reply, in characters
pub const MAX_REPLY_CHARS: usize = 600;

/// Inline markdown punctuation that TTS would read aloud
static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*_~`|#]+").expect("valid regex"));

/// Block-quote markers at the start of a line
static QUOTE_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[^\S\n]*(?:>[^\S\n]*)+").expect("valid regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Strip markup from a model reply and cap its length
///
/// Removes `*`, `_`, `~`, backticks, `#` and `|`, drops quote markers at the
/// start of lines, collapses whitespace runs to a single space and trims.
/// The result is at most [`MAX_REPLY_CHARS`] characters and applying the
/// function again leaves it unchanged.
#[must_use]
pub fn sanitize(text: &str) -> String {
    let stripped = MARKUP.replace_all(text, "");
    let unquoted = QUOTE_MARKERS.replace_all(&stripped, "");
    let collapsed = WHITESPACE.replace_all(&unquoted, " ");
    let trimmed = collapsed.trim();

    if trimmed.chars().count() <= MAX_REPLY_CHARS {
        return trimmed.to_string();
    }

    let truncated: String = trimmed.chars().take(MAX_REPLY_CHARS).collect();
    truncated.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(
            sanitize("Uma variável guarda um valor."),
            "Uma variável guarda um valor."
        );
    }

    #[test]
    fn strips_markdown_punctuation() {
        let input = "**Pense** no _nome_ da `caixa` ~~agora~~ | ok ### fim";
        assert_eq!(sanitize(input), "Pense no nome da caixa agora ok fim");
    }

    #[test]
    fn strips_leading_quote_markers_only() {
        let input = "> citação\n>> outra\nx > y";
        assert_eq!(sanitize(input), "citação outra x > y");
    }

    #[test]
    fn collapses_whitespace_and_trims() {
        assert_eq!(sanitize("  um\n\n  dois\ttrês  "), "um dois três");
    }

    #[test]
    fn only_markup_becomes_empty() {
        assert_eq!(sanitize("***\n> ##"), "");
    }

    #[test]
    fn truncates_to_limit_in_chars() {
        let input = "é".repeat(MAX_REPLY_CHARS + 50);
        let out = sanitize(&input);
        assert_eq!(out.chars().count(), MAX_REPLY_CHARS);
    }

    #[test]
    fn truncation_does_not_leave_trailing_space() {
        let mut input = "a".repeat(MAX_REPLY_CHARS - 1);
        input.push_str(" bbbb");
        let out = sanitize(&input);
        assert!(!out.ends_with(' '));
        assert!(out.chars().count() <= MAX_REPLY_CHARS);
    }

    #[test]
    fn idempotent_on_awkward_inputs() {
        let inputs = [
            "#> título\n> * item",
            "  > > > aninhado",
            "x\r\n> y",
            "__a__ |b| `c`",
            &"palavra ".repeat(200),
            "",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "input: {input:?}");
            assert!(once.chars().count() <= MAX_REPLY_CHARS);
        }
    }
}
