use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;

use crate::commands;
use crate::config::AppConfig;
use crate::dispatch::{CommandRegistry, Dispatcher, HandlerContext};
use crate::help::HelpTable;
use crate::server::{CommandServer, ServerState};
use crate::slash::{ParsedCommand, ValueCasing};
use crate::tracker::RestTracker;

#[derive(Parser)]
#[command(name = "slashops")]
#[command(about = "Slash-command gateway for chat-driven issue tracking", version)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Serve(ServeArgs),
    Parse(ParseArgs),
}

#[derive(Parser)]
#[command(
    about = "Run the HTTP gateway.",
    long_about = "Loads the YAML config, the help table, and the built-in command set, then \
                  serves slash commands until interrupted."
)]
struct ServeArgs {
    /// Path to the YAML config file.
    #[arg(long, default_value = "slashops.yaml")]
    config: PathBuf,
    /// Listen address, overriding the config file.
    #[arg(long)]
    listen: Option<String>,
}

#[derive(Parser)]
#[command(about = "Parse invocation text and print the command path and parameters as JSON.")]
struct ParseArgs {
    /// Lower-case parameter values instead of preserving them.
    #[arg(long)]
    lowercase_values: bool,
    /// The invocation text, exactly as it would follow the slash command.
    #[arg(trailing_var_arg = true)]
    text: Vec<String>,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Command::Serve(args) => serve(args),
            Command::Parse(args) => parse(args),
        }
    }
}

fn serve(args: ServeArgs) -> Result<()> {
    let mut config = AppConfig::load(&args.config)?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    config.validate_for_serve()?;
    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("bad listen address {}", config.listen_addr))?;
    let help = HelpTable::load_or_stub(Path::new(&config.help_path));
    let config = Arc::new(config);
    let tracker = RestTracker::new(&config.tracker)?;
    let ctx = HandlerContext {
        config: config.clone(),
        tracker: Arc::new(tracker),
    };
    let registry = CommandRegistry::new(commands::built_in());
    let dispatcher = Dispatcher::new(Arc::new(registry), Arc::new(help), Arc::new(ctx));
    let state = Arc::new(ServerState { config, dispatcher });

    let server = CommandServer::start(addr, state)?;
    println!(
        "slashops listening on http://{}; press Ctrl+C to stop.",
        server.addr()
    );
    let runtime = Runtime::new()?;
    runtime.block_on(async {
        tokio::signal::ctrl_c().await?;
        Ok::<(), anyhow::Error>(())
    })?;
    println!("shutting down...");
    server.stop()
}

fn parse(args: ParseArgs) -> Result<()> {
    let casing = if args.lowercase_values {
        ValueCasing::Lowercase
    } else {
        ValueCasing::Preserve
    };
    let text = args.text.join(" ");
    let command = ParsedCommand::parse_with(&text, casing)?;
    println!("{}", serde_json::to_string_pretty(&command)?);
    Ok(())
}
