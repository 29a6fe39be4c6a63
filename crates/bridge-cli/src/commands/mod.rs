//! CLI command definitions and handlers.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;

/// Load configuration with graceful fallback to defaults.
///
/// A missing file yields the defaults. A file that cannot be parsed is
/// reported once and then ignored.
pub fn load_config() -> bridge_core::config::Config {
    bridge_core::config::Config::load().unwrap_or_else(|e| {
        tracing::warn!("Ignoring configuration file: {}", e);
        bridge_core::config::Config::default()
    })
}

/// Fire `token` when the user presses Ctrl-C.
pub fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Interrupt received, cancelling");
            token.cancel();
        }
    });
}

pub mod completions;
pub mod config;
pub mod receive;
pub mod send;

/// Bridge - direct peer-to-peer file transfer over TCP
#[derive(Parser)]
#[command(name = "bridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Verbosity requested by the command, if it has output flags.
    pub const fn verbosity(&self) -> Verbosity {
        match &self.command {
            Command::Send(args) => Verbosity::from_flags(args.flags.quiet, args.flags.verbose),
            Command::Receive(args) => {
                Verbosity::from_flags(args.flags.quiet, args.flags.verbose)
            }
            Command::Config(_) | Command::Completions(_) => Verbosity::Normal,
        }
    }
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Send a file to a listening receiver
    Send(SendArgs),

    /// Listen for a sender and save the file it sends
    Receive(ReceiveArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Output flags shared by the transfer commands
#[derive(Parser, Clone, Copy)]
pub struct OutputArgs {
    /// Minimal output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Detailed logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

impl OutputArgs {
    /// Whether human-readable progress and messages should be printed.
    pub const fn interactive(&self) -> bool {
        !self.quiet && !self.json
    }
}

/// Arguments for the send command
#[derive(Parser)]
pub struct SendArgs {
    /// Receiver address: IP or IP:PORT (e.g., 192.168.1.20, [::1]:5000)
    pub host: String,

    /// File to send
    pub file: PathBuf,

    /// Receiver port (overrides the port in HOST and the configured default)
    #[arg(short, long)]
    pub port: Option<u16>,

    #[command(flatten)]
    pub flags: OutputArgs,
}

/// Arguments for the receive command
#[derive(Parser)]
pub struct ReceiveArgs {
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Output directory for received files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep serving senders one after another until interrupted
    #[arg(long)]
    pub keep_listening: bool,

    #[command(flatten)]
    pub flags: OutputArgs,
}

/// Arguments for the config command
#[derive(Parser)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand, Clone, Copy)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Arguments for the completions command
#[derive(Parser, Clone, Copy)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,
}

/// Supported shell types for completions
#[derive(Clone, Copy, ValueEnum, Debug)]
pub enum ShellType {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// How much the CLI should log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verbosity {
    /// Warnings and errors only
    Quiet,
    /// Informational messages
    Normal,
    /// Debug messages
    Verbose,
}

impl Verbosity {
    const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if verbose {
            Self::Verbose
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    /// Default `EnvFilter` directive for this level.
    pub const fn filter(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Normal => "warn,bridge=info,bridge_core=info",
            Self::Verbose => "warn,bridge=debug,bridge_core=debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_send() {
        let cli = Cli::try_parse_from([
            "bridge",
            "send",
            "192.168.1.20",
            "report.pdf",
            "-p",
            "5000",
        ])
        .expect("parse");
        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.host, "192.168.1.20");
                assert_eq!(args.file, PathBuf::from("report.pdf"));
                assert_eq!(args.port, Some(5000));
                assert!(!args.flags.json);
            }
            _ => panic!("Expected send command"),
        }
    }

    #[test]
    fn test_parse_receive() {
        let cli = Cli::try_parse_from([
            "bridge",
            "receive",
            "--output",
            "/tmp/in",
            "--keep-listening",
            "--json",
        ])
        .expect("parse");
        match cli.command {
            Command::Receive(args) => {
                assert_eq!(args.output, Some(PathBuf::from("/tmp/in")));
                assert!(args.keep_listening);
                assert!(args.flags.json);
                assert!(!args.flags.interactive());
            }
            _ => panic!("Expected receive command"),
        }
    }

    #[test]
    fn test_quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["bridge", "receive", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_verbosity_filter() {
        let cli = Cli::try_parse_from(["bridge", "receive", "-v"]).expect("parse");
        assert_eq!(cli.verbosity(), Verbosity::Verbose);
        assert!(cli.verbosity().filter().contains("bridge_core=debug"));

        let cli = Cli::try_parse_from(["bridge", "config", "path"]).expect("parse");
        assert_eq!(cli.verbosity(), Verbosity::Normal);
    }
}
