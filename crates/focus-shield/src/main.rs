//! focus-shield - Block distracting sites and silence notifications
//!
//! Usage:
//!   focus-shield                 Interactive session prompt
//!   focus-shield restore         Undo a block left behind by a crash
//!   focus-shield list            Print the blocklist
//!
//! Editing the hosts file needs root, so sessions run under sudo.

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use shield_core::process::is_root;
use shield_core::{Config, Paths};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use focus_shield::dnd::{DndBackend, NotificationSilencer};
use focus_shield::dns::{DnsCacheFlusher, DnsFlushBackend};
use focus_shield::hosts::HostsFile;
use focus_shield::repl::{self, Repl};
use focus_shield::ui::{self, color, BOLD, MAGENTA};
use focus_shield::{BlocklistStore, Shield, ShieldStore};

/// focus-shield - Block distracting sites and silence notifications
#[derive(Parser)]
#[command(name = "focus-shield")]
#[command(about = "Block distracting sites and silence notifications for a timed focus session")]
#[command(version)]
#[command(after_help = r#"WHEN TO USE:
    Before deep work. Distracting sites resolve to loopback and
    notifications are muted until the timer runs out.

EXAMPLES:
    sudo focus-shield                  # Interactive prompt
    sudo focus-shield --no-dnd         # Block sites, leave notifications alone
    sudo focus-shield restore          # Clean up after a crash
    focus-shield list                  # Show the blocklist

FILES:
    ~/.focus-shield/blocklist.txt      One domain per line
    ~/.focus-shield/config.json        Defaults (hosts path, session length)
    /etc/hosts.focus-shield.bak        Hosts backup during a session

LOGGING:
    RUST_LOG=focus_shield=debug focus-shield
"#)]
struct Cli {
    /// Hosts file to patch (default: /etc/hosts)
    #[arg(long, value_name = "PATH")]
    hosts: Option<PathBuf>,

    /// Config file (default: ~/.focus-shield/config.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Don't toggle Do Not Disturb
    #[arg(long)]
    no_dnd: bool,

    /// Don't flush the DNS cache
    #[arg(long)]
    no_flush: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Restore the hosts file after an unclean exit
    Restore,

    /// Print the blocklist
    #[command(alias = "ls")]
    List,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Warnings from DND/DNS backends reach the user without RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let paths = Paths::new()?;
    let config_path = cli.config.clone().unwrap_or_else(|| paths.config());
    let mut config = Config::load(&config_path)?;
    if let Some(hosts) = cli.hosts {
        config.hosts_path = hosts;
    }
    if cli.no_dnd {
        config.do_not_disturb = false;
    }
    if cli.no_flush {
        config.flush_dns = false;
    }

    let mut shield = build_shield(&paths, &config)?;

    match cli.command {
        Some(Commands::Restore) => cmd_restore(&mut shield),
        Some(Commands::List) => {
            repl::print_blocklist(shield.blocklist());
            Ok(ExitCode::SUCCESS)
        }
        None => cmd_interactive(&mut shield, &config).await,
    }
}

fn build_shield(paths: &Paths, config: &Config) -> Result<Shield> {
    let silencer: Box<dyn NotificationSilencer> = if config.do_not_disturb {
        Box::new(DndBackend::detect())
    } else {
        Box::new(DndBackend::Disabled)
    };
    let flusher: Box<dyn DnsCacheFlusher> = if config.flush_dns {
        Box::new(DnsFlushBackend::detect())
    } else {
        Box::new(DnsFlushBackend::Disabled)
    };
    let hosts = HostsFile::with_redirects(
        &config.hosts_path,
        config.redirect_v4,
        config.redirect_v6,
    );

    Shield::new(
        BlocklistStore::new(&paths.blocklist()),
        ShieldStore::new(&paths.data)?,
        Box::new(hosts),
        silencer,
        flusher,
    )
}

/// One-shot crash recovery
fn cmd_restore(shield: &mut Shield) -> Result<ExitCode> {
    match shield.recover(Utc::now()) {
        Ok(true) => ui::ok(&format!("Restored {}", shield.hosts_path().display())),
        Ok(false) => ui::info("Nothing to restore"),
        Err(e) => {
            repl::report(&e);
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Interactive prompt
async fn cmd_interactive(shield: &mut Shield, config: &Config) -> Result<ExitCode> {
    println!("{}", color(&format!("{}{}", BOLD, MAGENTA), "focus-shield"));
    println!("Block distracting sites and silence notifications.");
    println!();
    println!("{}", repl::HELP);
    println!();

    if !is_root() {
        ui::warning("Not running as root: 'start' will fail. Re-run with: sudo focus-shield");
    }

    match shield.recover(Utc::now()) {
        Ok(true) => ui::ok("Restored a hosts file left patched by an earlier run"),
        Ok(false) => {}
        Err(e) => {
            ui::warning("A previous session left the hosts file patched and it could not be restored");
            repl::report(&e);
        }
    }

    let (tx, rx) = mpsc::unbounded_channel();
    repl::spawn_stdin(tx.clone());
    repl::spawn_signals(tx);

    let exit = Repl::new(shield, rx, config.default_minutes).run().await;
    Ok(ExitCode::from(exit.code()))
}
