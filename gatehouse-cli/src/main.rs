//! gatehouse: configure, run and pair with a local gateway.
//!
//! # Usage
//!
//! ```text
//! gatehouse configure [--section workspace,model,gateway,daemon,health]
//! gatehouse daemon install [--port N] [--runtime node|bun] [--force]
//! gatehouse daemon uninstall|restart
//! gatehouse daemon status [--json]
//! gatehouse node pair --gateway <host:port> [--name <display name>]
//! gatehouse node connect --gateway <host:port>...
//! gatehouse config show [--json]
//! ```

mod commands;
mod prompter;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    config::ConfigCommand, configure::ConfigureArgs, daemon::DaemonCommand, node::NodeCommand,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "gatehouse",
    version,
    about = "Configure, supervise and pair with a local gateway",
    long_about = None,
)]
struct Cli {
    /// Log debug output to stderr (overrides RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive setup: workspace, model/auth, gateway, daemon, health.
    Configure(ConfigureArgs),

    /// Manage the gateway background service.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },

    /// Pair this machine with a gateway as a node.
    Node {
        #[command(subcommand)]
        command: NodeCommand,
    },

    /// Inspect the config file.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Configure(args) => args.run(),
        Commands::Daemon { command } => commands::daemon::run(command),
        Commands::Node { command } => commands::node::run(command),
        Commands::Config { command } => commands::config::run(command),
    }
}

/// Interactive commands keep stderr quiet unless asked.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
