//! Interactive command loop
//!
//! Input and signals arrive as [`Event`]s on one channel. Idle, the loop
//! waits for the next line; during a timed session it also ticks the
//! countdown once per second, so `stop`, `status` and friends keep working
//! while the clock runs.

use chrono::Utc;
use shield_core::format;
use std::io::{BufRead, Write};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::blocklist::{AddOutcome, Blocklist, RemoveOutcome};
use crate::command::Command;
use crate::controller::{Shield, Status};
use crate::error::ShieldError;
use crate::session::{Outcome, Session};
use crate::stats::HistoryStats;
use crate::timer::{display_seconds, Tick, TICK_INTERVAL};
use crate::ui::{self, color, BOLD, CYAN, GREEN, MAGENTA};

pub const HELP: &str = "Commands:
  start [minutes]   Start a focus session (default: 25)
  stop              End the session early
  add <domain>      Add a domain to the blocklist
  remove <domain>   Remove a domain from the blocklist
  list              Show the blocklist
  status            Show session status
  test              Apply the block without a timer (diagnostics)
  history [days]    Show session statistics (default: 7 days)
  help              Show this help
  quit              End any session and exit";

const COUNTDOWN_HINT: &str =
    "A session is running. Available: stop, quit, status, list, add, remove, help";

/// Something the loop reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Line(String),
    /// Standard input closed
    Eof,
    /// SIGINT, SIGTERM or SIGHUP
    Interrupt,
}

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    Interrupted,
}

impl Exit {
    pub fn code(&self) -> u8 {
        match self {
            Exit::Quit => 0,
            Exit::Interrupted => 130,
        }
    }
}

enum Flow {
    Continue,
    /// A timed session just started
    Countdown,
    Exit(Exit),
}

/// Read stdin lines on a dedicated thread.
///
/// A blocking thread rather than a runtime task, so a pending read never
/// holds up shutdown.
pub fn spawn_stdin(tx: UnboundedSender<Event>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(Event::Line(line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    break;
                }
            }
        }
        let _ = tx.send(Event::Eof);
    });
}

/// Forward termination signals as [`Event::Interrupt`]
pub fn spawn_signals(tx: UnboundedSender<Event>) {
    tokio::spawn(async move {
        if let Err(e) = forward_signals(tx).await {
            warn!("Signal handling unavailable: {}", e);
        }
    });
}

#[cfg(unix)]
async fn forward_signals(tx: UnboundedSender<Event>) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    loop {
        tokio::select! {
            _ = interrupt.recv() => debug!("SIGINT"),
            _ = terminate.recv() => debug!("SIGTERM"),
            _ = hangup.recv() => debug!("SIGHUP"),
        }
        if tx.send(Event::Interrupt).is_err() {
            return Ok(());
        }
    }
}

#[cfg(not(unix))]
async fn forward_signals(tx: UnboundedSender<Event>) -> std::io::Result<()> {
    loop {
        tokio::signal::ctrl_c().await?;
        if tx.send(Event::Interrupt).is_err() {
            return Ok(());
        }
    }
}

/// The interactive loop
pub struct Repl<'a> {
    shield: &'a mut Shield,
    events: UnboundedReceiver<Event>,
    default_minutes: u32,
}

impl<'a> Repl<'a> {
    pub fn new(shield: &'a mut Shield, events: UnboundedReceiver<Event>, default_minutes: u32) -> Self {
        Self {
            shield,
            events,
            default_minutes,
        }
    }

    /// Run until `quit`, end of input or a signal. Any active session is
    /// stopped (hosts restored) before returning.
    pub async fn run(&mut self) -> Exit {
        loop {
            prompt();

            let flow = match self.events.recv().await.unwrap_or(Event::Eof) {
                Event::Line(line) => self.handle(&line),
                Event::Eof => self.leave(Outcome::Stopped, Exit::Quit),
                Event::Interrupt => {
                    println!();
                    self.leave(Outcome::Interrupted, Exit::Interrupted)
                }
            };

            let flow = match flow {
                Flow::Countdown => self.countdown().await,
                other => other,
            };

            if let Flow::Exit(exit) = flow {
                return exit;
            }
        }
    }

    /// Tick the active session until it expires, is stopped, or the
    /// program is told to exit
    async fn countdown(&mut self) -> Flow {
        let Some(countdown) = self.shield.countdown() else {
            return Flow::Continue;
        };

        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => match countdown.poll(Utc::now()) {
                    Tick::Remaining(left) => draw_countdown(display_seconds(left)),
                    Tick::Expired => {
                        println!();
                        self.complete();
                        return Flow::Continue;
                    }
                    Tick::Cancelled => {
                        println!();
                        return Flow::Continue;
                    }
                },
                event = self.events.recv() => {
                    let flow = match event.unwrap_or(Event::Eof) {
                        Event::Line(line) => self.handle_during_countdown(&line),
                        Event::Eof => {
                            println!();
                            self.leave(Outcome::Stopped, Exit::Quit)
                        }
                        Event::Interrupt => {
                            println!();
                            self.leave(Outcome::Interrupted, Exit::Interrupted)
                        }
                    };

                    if let Flow::Exit(_) = flow {
                        return flow;
                    }
                    if self.shield.session().is_none() {
                        return Flow::Continue;
                    }
                }
            }
        }
    }

    /// Execute one line of input
    fn handle(&mut self, line: &str) -> Flow {
        match Command::parse(line) {
            Ok(command) => self.execute(command),
            Err(e) => {
                report(&e);
                Flow::Continue
            }
        }
    }

    /// Like [`Repl::handle`], restricted to commands that make sense while
    /// the clock runs
    fn handle_during_countdown(&mut self, line: &str) -> Flow {
        match Command::parse(line) {
            Ok(command) if command.allowed_during_countdown() => self.execute(command),
            Ok(_) => {
                ui::info(COUNTDOWN_HINT);
                Flow::Continue
            }
            Err(e) => {
                report(&e);
                Flow::Continue
            }
        }
    }

    fn execute(&mut self, command: Command) -> Flow {
        match command {
            Command::Start(minutes) => {
                let minutes = minutes.unwrap_or(self.default_minutes);
                match self.shield.start(minutes, Utc::now()) {
                    Ok(session) => {
                        print_started(session);
                        return Flow::Countdown;
                    }
                    Err(e) => report(&e),
                }
            }
            Command::Stop => self.stop(),
            Command::Add(domain) => self.add(&domain),
            Command::Remove(domain) => self.remove(&domain),
            Command::List => print_blocklist(self.shield.blocklist()),
            Command::Status => print_status(self.shield.status(Utc::now())),
            Command::Test => self.test_block(),
            Command::History(days) => self.history(days),
            Command::Help => println!("{}", HELP),
            Command::Quit => return self.leave(Outcome::Stopped, Exit::Quit),
            Command::Empty => {}
        }

        Flow::Continue
    }

    fn stop(&mut self) {
        let now = Utc::now();
        match self.shield.stop(Outcome::Stopped, now) {
            Ok(Some(session)) => {
                ui::ok("Focus session ended");
                if let Some(planned) = session.duration {
                    println!(
                        "Blocked for {} of {} minutes",
                        session.elapsed_minutes(now).min(planned),
                        planned
                    );
                }
            }
            Ok(None) => ui::info("No active focus session"),
            Err(e) => report(&e),
        }
    }

    /// The timer ran out
    fn complete(&mut self) {
        match self.shield.stop(Outcome::Completed, Utc::now()) {
            Ok(_) => {
                ui::ok("Focus session complete");
                println!("Great work! Take a break.");
            }
            Err(e) => {
                report(&e);
                ui::warning("Sites are still blocked. Type 'stop' to retry.");
            }
        }
    }

    /// Stop any session and exit
    fn leave(&mut self, outcome: Outcome, exit: Exit) -> Flow {
        match self.shield.stop(outcome, Utc::now()) {
            Ok(Some(_)) => ui::ok("Focus session ended, hosts file restored"),
            Ok(None) => {}
            Err(e) => {
                report(&e);
                ui::warning("Hosts file still patched. Run 'focus-shield restore' to clean up.");
            }
        }

        if exit == Exit::Quit {
            println!("Goodbye!");
        }
        Flow::Exit(exit)
    }

    fn add(&mut self, domain: &str) {
        match self.shield.add(domain) {
            Ok(AddOutcome::Added(entries)) => ui::ok(&format!("Added {}", entries.join(", "))),
            Ok(AddOutcome::AlreadyBlocked(root)) => {
                ui::warning(&format!("{} is already blocked", root))
            }
            Err(e) => report(&e),
        }
    }

    fn remove(&mut self, domain: &str) {
        match self.shield.remove(domain) {
            Ok(RemoveOutcome::Removed(entries)) => {
                ui::ok(&format!("Removed {}", entries.join(", ")))
            }
            Ok(RemoveOutcome::NotBlocked(root)) => {
                ui::warning(&format!("{} is not in the blocklist", root))
            }
            Err(e) => report(&e),
        }
    }

    fn test_block(&mut self) {
        match self.shield.test_block(Utc::now()) {
            Ok(session) => {
                ui::ok(&format!(
                    "Diagnostic block applied for {} hostnames",
                    session.domains
                ));
                println!("Check {} and try a blocked site.", self.shield.hosts_path().display());
                println!("Type 'stop' to remove the block.");
            }
            Err(e) => report(&e),
        }
    }

    fn history(&self, days: u32) {
        match self.shield.history(Utc::now(), days) {
            Ok(records) => {
                print_history(days, &HistoryStats::from_records(&records));
                if let Some(last) = records.last() {
                    println!(
                        "  {}      {} ({})",
                        color(CYAN, "Last session:"),
                        format::relative_time(last.end),
                        last.outcome.as_str()
                    );
                }
            }
            Err(e) => report(&e),
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn draw_countdown(seconds: u64) {
    print!("\r{} {} remaining... ", color(MAGENTA, "[focus]"), format::clock(seconds));
    let _ = std::io::stdout().flush();
}

fn print_started(session: &Session) {
    ui::ok("Focus session started");
    println!();
    println!("{}", color(&format!("{}{}", BOLD, MAGENTA), "FOCUS MODE"));
    println!();
    if let Some(minutes) = session.duration {
        println!("  {}  {} minutes", color(CYAN, "Duration:"), minutes);
    }
    println!("  {}  {} hostnames", color(CYAN, "Blocking:"), session.domains);
    if let Some(end) = session.end_time() {
        println!("  {}   {}", color(CYAN, "Ends at:"), format::time(end));
    }
    println!();
    println!("Type 'stop' to end early");
}

/// Print the blocklist grouped by root domain
pub fn print_blocklist(list: &Blocklist) {
    let roots = list.roots();
    println!(
        "{} ({} sites, {} hostnames):",
        color(BOLD, "Blocklist"),
        roots.len(),
        list.len()
    );
    for root in roots {
        if list.contains(&format!("www.{}", root)) {
            println!("  - {} (+www)", root);
        } else {
            println!("  - {}", root);
        }
    }
}

fn print_status(status: Status) {
    match status {
        Status::Inactive => println!("No active focus session"),
        Status::Timed { remaining, ends_at } => {
            println!("{}", color(&format!("{}{}", BOLD, MAGENTA), "FOCUS MODE ACTIVE"));
            println!(
                "  {} {}",
                color(CYAN, "Remaining:"),
                format::duration(remaining.num_seconds() as f64)
            );
            println!("  {}   {}", color(CYAN, "Ends at:"), format::time(ends_at));
        }
        Status::Diagnostic { since } => {
            println!(
                "Diagnostic block active since {} (no timer)",
                format::time(since)
            );
            println!("Type 'stop' to remove it.");
        }
    }
}

fn print_history(days: u32, stats: &HistoryStats) {
    let (hours, mins) = stats.total_time();

    println!("{}", color(BOLD, &format!("Focus History (last {} days)", days)));
    println!();
    println!("  {}    {}", color(CYAN, "Total Sessions:"), stats.total_sessions);
    println!(
        "  {}         {} ({}%)",
        color(GREEN, "Completed:"),
        stats.completed_sessions,
        stats.completion_rate
    );
    println!("  {}       {}", color(CYAN, "Ended early:"), stats.ended_early);
    println!("  {}  {}h {}m", color(CYAN, "Total Time Blocked:"), hours, mins);
    if stats.total_sessions > 0 {
        println!(
            "  {}   {} minutes",
            color(CYAN, "Average Session:"),
            stats.average_minutes
        );
    }
}

/// Print an error, plus a hint when it has a known fix
pub fn report(err: &anyhow::Error) {
    ui::error(err);
    if let Some(hint) = hint(err) {
        println!("{}", hint);
    }
}

/// Help text for errors that have a known fix
pub fn hint(err: &anyhow::Error) -> Option<&'static str> {
    match err.downcast_ref::<ShieldError>() {
        Some(ShieldError::NotPrivileged(_)) => Some("Re-run with: sudo focus-shield"),
        _ => None,
    }
}
