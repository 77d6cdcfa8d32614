//! Productivity CLI - named pomodoro timers run by a local daemon
//!
//! Each timer alternates between a work interval and a break interval.
//! The daemon owns the countdowns; this binary talks to it over a Unix
//! socket.

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};

use productivity::cli::{Cli, Commands, Display, IpcClient};
use productivity::store::JsonFileStore;
use productivity::types::TimerParams;
use productivity::{config, daemon};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins; otherwise `-v` raises the level to debug.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        tracing::debug!("Verbose mode enabled");
    }

    let Some(command) = cli.command else {
        // No command provided, show help
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Daemon(args) => {
            let socket_path = config::socket_path(cli.socket)?;
            let data_path = config::data_path(args.data)?;
            let store = JsonFileStore::open(data_path)?;
            daemon::run(&socket_path, Box::new(store)).await?;
        }
        Commands::Completions { shell } => {
            generate_completions(shell);
        }
        Commands::List => Display::show_list(&client(cli.socket)?.list().await?),
        Commands::Show { id } => Display::show_timer(&client(cli.socket)?.get(id).await?),
        Commands::Create(args) => {
            let response = client(cli.socket)?.create(TimerParams::from(&args)).await?;
            Display::show_action(&response);
        }
        Commands::Edit(args) => {
            let response = client(cli.socket)?
                .update(args.id, TimerParams::from(&args))
                .await?;
            Display::show_action(&response);
        }
        Commands::Delete { id } => Display::show_action(&client(cli.socket)?.delete(id).await?),
        Commands::Start { id } => Display::show_action(&client(cli.socket)?.start(id).await?),
        Commands::Pause { id } => Display::show_action(&client(cli.socket)?.pause(id).await?),
        Commands::Resume { id } => Display::show_action(&client(cli.socket)?.resume(id).await?),
        Commands::Reset { id } => Display::show_action(&client(cli.socket)?.reset(id).await?),
        Commands::Watch { id } => watch(&client(cli.socket)?, id).await?,
    }

    Ok(())
}

/// Builds a client for the given or default socket.
fn client(socket: Option<PathBuf>) -> Result<IpcClient> {
    Ok(IpcClient::with_socket_path(config::socket_path(socket)?))
}

/// Follows a timer until the daemon closes the stream or Ctrl-C.
async fn watch(client: &IpcClient, id: u32) -> Result<()> {
    let mut session = client.watch(id).await?;
    Display::show_timer(&session.response);

    loop {
        tokio::select! {
            frame = session.next_frame() => match frame? {
                Some(frame) => Display::show_frame(&frame),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!();
    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
