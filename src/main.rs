//! GuessNet - Word-Guessing Game Client
//!
//! A terminal client for a small binary protocol: authenticate, find opponents,
//! request matches, and trade guesses and hints with a game server.

mod config;
mod engine;
mod network;
mod protocol;
mod session;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;
use engine::{spawn_line_reader, ConsoleTerminal, FrameSink, ProtocolEngine, Terminal};
use network::{Connection, ConnectionMode, Endpoint};
use protocol::{CommandCode, FrameDecoder};
use session::{Session, SessionEnd};

const CANNOT_CONNECT: &str =
    "Cannot connect to server. Please make sure the server is running and try again.\n";
const RECONNECT_PROMPT: &str = "Do you want to try reconnecting? (Y/N): ";
const PROGRAM_TERMINATED: &str = "Program has been terminated. You can restart it using \"guessnet connect\".\n";

/// GuessNet - Word-guessing game client
#[derive(Parser)]
#[command(name = "guessnet")]
#[command(author = "GuessNet Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Play the word-guessing game against other players", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a game server and play
    Connect {
        /// Connect over a Unix socket (local) or TCP (network)
        #[arg(short, long, value_enum)]
        mode: Option<ConnectionMode>,

        /// Socket path in local mode, host[:port] in network mode
        #[arg(short, long)]
        address: Option<String>,
    },

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show protocol information
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default()?
    };

    // Initialize logging on stderr so it does not tangle with the prompt
    let filter = if cli.verbose || config.general.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Connect { mode, address } => {
            run_client(config, mode, address).await?;
        }
        Commands::Config { generate, output } => {
            if generate {
                let sample = config::generate_sample_config()?;
                if let Some(path) = output {
                    std::fs::write(&path, &sample)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", sample);
                }
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
        Commands::Info => {
            print_protocol_info(&config);
        }
    }

    Ok(())
}

/// Connect, play one session, and offer to retry while the server is unreachable
async fn run_client(
    config: Config,
    mode: Option<ConnectionMode>,
    address: Option<String>,
) -> anyhow::Result<()> {
    let endpoint = config.network.endpoint(mode, address.as_deref())?;
    let timeout = Duration::from_millis(config.network.connect_timeout_ms);

    let mut terminal = ConsoleTerminal::new();
    let mut lines = spawn_line_reader(16);

    let connection = loop {
        terminal.show("Connecting to server...");
        match Connection::connect(&endpoint, timeout).await {
            Ok(connection) => break connection,
            Err(e) if e.is_retryable() && config.network.reconnect_prompt => {
                tracing::warn!("Connection to {} failed: {}", endpoint, e);
                terminal.show(&format!("Error: {}", e));
                terminal.show(CANNOT_CONNECT);
                if !ask_reconnect(&mut terminal, &mut lines).await {
                    terminal.show(PROGRAM_TERMINATED);
                    anyhow::bail!("could not connect to {}", endpoint);
                }
            }
            Err(e) => return Err(e.into()),
        }
    };

    show_banner(&mut terminal, &endpoint);

    let (reader, mut handle, writer) = connection.into_parts();
    let engine = ProtocolEngine::new(config.game.command_rules());
    let mut session = Session::new(
        engine,
        FrameDecoder::with_max_frame_size(config.game.max_frame_size),
    );

    let outcome = tokio::select! {
        result = session.run(reader, &mut handle, &mut terminal, &mut lines) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    handle.close();
    let sent = writer.await?;
    let received = session.stats();
    tracing::info!(
        frames_received = received.frames_received,
        bytes_received = received.bytes_received,
        frames_sent = sent.frames_sent,
        bytes_sent = sent.bytes_sent,
        anomalies = session.engine().anomalies(),
        "session finished"
    );

    match outcome {
        None => {
            terminal.show("\nDisconnecting...");
        }
        Some(Ok(SessionEnd::Terminated)) => {
            tracing::info!("Session terminated by the server");
        }
        Some(Ok(SessionEnd::ServerClosed)) => {
            tracing::info!("Server closed the connection");
        }
        Some(Ok(SessionEnd::InputClosed)) => {
            tracing::info!("Input closed");
        }
        Some(Err(e)) => {
            tracing::error!("Session error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}

/// Ask whether to dial again; anything but Y (or end of input) means no
async fn ask_reconnect<T: Terminal>(terminal: &mut T, lines: &mut mpsc::Receiver<String>) -> bool {
    terminal.prompt(RECONNECT_PROMPT);
    match lines.recv().await {
        Some(answer) => {
            terminal.line_entered();
            answer.trim().eq_ignore_ascii_case("y")
        }
        None => false,
    }
}

fn show_banner<T: Terminal>(terminal: &mut T, endpoint: &Endpoint) {
    let how = match endpoint.mode() {
        ConnectionMode::Local => "Unix socket",
        ConnectionMode::Network => "TCP",
    };

    terminal.show("\n========================================");
    terminal.show("  GuessNet Client Connected");
    terminal.show("========================================");
    terminal.show(&format!("  Server: {} ({})", endpoint, how));
    terminal.show("========================================\n");
}

/// Print protocol information
fn print_protocol_info(config: &Config) {
    println!("GuessNet Protocol Information");
    println!("=============================\n");

    println!("Default Port: {}", protocol::DEFAULT_PORT);
    println!("Default Socket: {}", protocol::DEFAULT_SOCKET_PATH);
    println!("Max word/guess/hint length: {}", config.game.max_text_length);
    println!("Max buffered frame: {} bytes", config.game.max_frame_size);

    println!("\nCommand codes:");
    for value in 0x01..=0x11u8 {
        if let Ok(code) = CommandCode::try_from(value) {
            println!("  0x{:02X}  {:<20} {:?}", value, code.name(), code.direction());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::testing::RecordingTerminal;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["guessnet", "info"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_connect_arguments() {
        let cli = Cli::try_parse_from(["guessnet", "connect", "-m", "local", "-a", "/tmp/game.sock"]).unwrap();
        match cli.command {
            Commands::Connect { mode, address } => {
                assert_eq!(mode, Some(ConnectionMode::Local));
                assert_eq!(address.as_deref(), Some("/tmp/game.sock"));
            }
            _ => panic!("expected connect"),
        }

        assert!(Cli::try_parse_from(["guessnet", "connect", "--mode", "carrier-pigeon"]).is_err());
    }

    #[tokio::test]
    async fn test_ask_reconnect() {
        let mut terminal = RecordingTerminal::new();
        let (tx, mut lines) = mpsc::channel(4);

        tx.send(" y ".to_string()).await.unwrap();
        assert!(ask_reconnect(&mut terminal, &mut lines).await);

        tx.send("N".to_string()).await.unwrap();
        assert!(!ask_reconnect(&mut terminal, &mut lines).await);

        drop(tx);
        assert!(!ask_reconnect(&mut terminal, &mut lines).await);
        assert_eq!(terminal.prompts(), vec![RECONNECT_PROMPT; 3]);
    }
}
