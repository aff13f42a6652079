use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use voice_tutor::speech::{AudioCache, AudioSink, SilentSink, SpeakerSink};
use voice_tutor::{Config, Level, TurnOutcome, TutorSession};

/// Tutor - spoken programming tutor backed by a remote language model
#[derive(Parser)]
#[command(name = "tutor", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to the TOML config file
    #[arg(long, global = true, env = "TUTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Path to a KEY=VALUE env file with credentials
    #[arg(long, global = true, default_value = ".env")]
    env_file: PathBuf,

    /// Learning level to start at (beginner, intermediate, advanced)
    #[arg(short, long, global = true)]
    level: Option<Level>,

    /// Do not open an audio device; clips are decoded but not played
    #[arg(long, global = true, env = "TUTOR_NO_AUDIO")]
    no_audio: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive tutoring session (default)
    Chat,
    /// Speak a line of text through the cache
    Say {
        /// Text to speak
        text: String,
    },
    /// Transcribe a WAV recording
    Transcribe {
        /// 16-bit PCM WAV file
        file: PathBuf,
    },
    /// Inspect or clear the audio cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show entry count and size
    Stats,
    /// Delete every cached clip
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,voice_tutor=info",
        1 => "info,voice_tutor=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref(), Some(cli.env_file.as_path()))?;
    if let Some(level) = cli.level {
        config.level = level;
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat(&config, cli.no_audio).await,
        Command::Say { text } => say(&config, cli.no_audio, &text).await,
        Command::Transcribe { file } => transcribe(&config, &file).await,
        Command::Cache { action } => cache(&config, &action),
    }
}

/// Pick the speaker, falling back to silent output on headless machines
fn open_sink(no_audio: bool) -> Arc<dyn AudioSink> {
    if no_audio {
        return Arc::new(SilentSink);
    }
    match SpeakerSink::new() {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            tracing::warn!(error = %e, "audio output unavailable, continuing without sound");
            Arc::new(SilentSink)
        }
    }
}

async fn chat(config: &Config, no_audio: bool) -> anyhow::Result<()> {
    let session = TutorSession::from_config(config, open_sink(no_audio), true)?;

    println!("Tutor pronto. Nível: {}", session.manager().level().await);
    println!("Comandos: /level <nível>, /repeat, /listen <arquivo.wav>, /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, arg) = line.split_once(' ').map_or((line, ""), |(c, a)| (c, a.trim()));

        match command {
            "/quit" | "/exit" => break,
            "/level" => match arg.parse::<Level>() {
                Ok(level) => session.set_level(level).await,
                Err(e) => println!("{e}"),
            },
            "/repeat" => {
                if let Err(e) = session.repeat_last().await {
                    tracing::warn!(error = %e, "repeat failed");
                }
            }
            "/listen" => {
                if arg.is_empty() {
                    println!("uso: /listen <arquivo.wav>");
                    continue;
                }
                let wav = match tokio::fs::read(arg).await {
                    Ok(wav) => wav,
                    Err(e) => {
                        println!("não foi possível ler {arg}: {e}");
                        continue;
                    }
                };
                match session.handle_speech(&wav).await {
                    Ok(outcome) => report(&outcome),
                    Err(e) => tracing::warn!(error = %e, "transcription failed"),
                }
            }
            _ => report(&session.handle_text(line).await),
        }
    }

    Ok(())
}

fn report(outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Busy => println!("Aguarde a resposta anterior."),
        TurnOutcome::Ignored => tracing::debug!("nothing to send"),
        TurnOutcome::Replied(_) | TurnOutcome::Failed(_) => {}
    }
}

async fn say(config: &Config, no_audio: bool, text: &str) -> anyhow::Result<()> {
    let session = TutorSession::from_config(config, open_sink(no_audio), false)?;

    let source = session.speech().speak(text, false).await?;
    println!("spoke {} characters ({source:?})", text.chars().count());

    // keep the process alive while the clip plays
    while session.speech().is_speaking() {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }

    Ok(())
}

async fn transcribe(config: &Config, file: &Path) -> anyhow::Result<()> {
    let session = TutorSession::from_config(config, Arc::new(SilentSink), false)?;
    let wav = tokio::fs::read(file).await?;

    match session.transcribe(&wav).await? {
        Some(text) => println!("{text}"),
        None => println!("(nenhuma fala reconhecida)"),
    }

    Ok(())
}

fn cache(config: &Config, action: &CacheAction) -> anyhow::Result<()> {
    let mut cache = AudioCache::open(&config.speech.cache_dir, config.speech.cache_capacity_bytes)?;

    match action {
        CacheAction::Stats => {
            let stats = cache.stats();
            println!("directory: {}", cache.dir().display());
            println!("entries:   {}", stats.entries);
            println!(
                "size:      {} / {} bytes",
                stats.total_bytes, stats.capacity_bytes
            );
        }
        CacheAction::Clear => {
            let removed = cache.clear()?;
            println!("removed {removed} cached clips");
        }
    }

    Ok(())
}
