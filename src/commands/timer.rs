//! Session timer and turn clock commands
//!
//! Timer state lives in the store's `timer_slots` tree, so every invocation
//! resumes from the last snapshot with drift correction applied.

use colored::Colorize;
use prettytable::{format, row, Table};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use super::active_settings;
use crate::cli::{TimerCommand, TurnCommand};
use crate::config::Config;
use crate::error::{CheckInError, Result};
use crate::storage::SledStore;
use crate::timer::{Partner, SessionTimer, SystemClock, TickDriver, TimerStatus, TurnClock};

pub async fn handle_timer(
    config: &Config,
    store: Arc<SledStore>,
    command: TimerCommand,
) -> Result<()> {
    let settings = active_settings(config, store.clone()).await;
    let mut timer = SessionTimer::from_settings(
        config.timer.session_key.as_str(),
        &settings,
        store,
        Arc::new(SystemClock),
    );

    match command {
        TimerCommand::Start => timer.start(),
        TimerCommand::Pause => timer.pause(),
        TimerCommand::Resume => timer.resume(),
        TimerCommand::Reset => timer.reset(),
        TimerCommand::Status => {}
        TimerCommand::Watch => return watch(timer).await,
    }

    print_timer(&timer);
    Ok(())
}

fn print_timer(timer: &SessionTimer) {
    let status = match timer.status() {
        TimerStatus::Running => timer.status().as_str().green(),
        TimerStatus::Paused => timer.status().as_str().yellow(),
        TimerStatus::Expired => timer.status().as_str().red(),
        TimerStatus::Idle => timer.status().as_str().normal(),
    };
    println!("{} {}", timer.formatted_time().bold(), status);
}

async fn watch(timer: SessionTimer) -> Result<()> {
    if timer.status() != TimerStatus::Running {
        print_timer(&timer);
        println!("Start or resume the timer to watch it.");
        return Ok(());
    }

    let time_up = Arc::new(Notify::new());
    let notifier = time_up.clone();
    let timer = Arc::new(Mutex::new(timer.on_time_up(move || notifier.notify_one())));
    let mut driver = TickDriver::spawn(timer.clone());
    let mut refresh = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = time_up.notified() => {
                println!("\r{}      ", "Time's up!".red().bold());
                break;
            }
            _ = refresh.tick() => {
                let formatted = timer
                    .lock()
                    .map_err(|_| CheckInError::Storage("timer lock poisoned".to_string()))?
                    .formatted_time();
                print!("\r{}", formatted.bold());
                std::io::stdout().flush()?;
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    driver.stop();
    Ok(())
}

pub async fn handle_turn(config: &Config, store: Arc<SledStore>, command: TurnCommand) -> Result<()> {
    let settings = active_settings(config, store.clone()).await;
    let mut clock = TurnClock::new(
        config.timer.turn_key.as_str(),
        &settings,
        config.turn.clock_options(),
        store,
        Arc::new(SystemClock),
    );

    match command {
        TurnCommand::Timeout { partner } => {
            match clock.take_timeout(partner) {
                Some(secs) => println!(
                    "{} takes a {} timeout ({} left)",
                    partner.as_str().cyan(),
                    crate::timer::format_time(secs),
                    clock.timeouts_remaining(partner)
                ),
                None => println!("{} has no timeouts left", partner.as_str().yellow()),
            }
            return Ok(());
        }
        _ if !clock.is_active() => {
            println!(
                "{}",
                "Turn-based mode is off for this couple. Apply a template with turns (e.g. deep-dive)."
                    .yellow()
            );
            return Ok(());
        }
        TurnCommand::Start => clock.start(),
        TurnCommand::Switch => clock.switch_turn(),
        TurnCommand::Extend => {
            if !clock.extend_turn() {
                println!("{}", "No extensions available.".yellow());
            }
        }
        TurnCommand::Status => {}
    }

    print_turn(&clock);
    Ok(())
}

fn print_turn(clock: &TurnClock) {
    let state = clock.state();
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row!["Turn".bold(), state.current_turn.as_str().cyan()]);
    table.add_row(row![
        "Remaining".bold(),
        format!("{} {}", clock.formatted_time(), clock.status())
    ]);
    table.add_row(row![
        "Extensions".bold(),
        format!("{}/{}", state.extensions_used, state.max_extensions)
    ]);
    for partner in [Partner::PartnerA, Partner::PartnerB] {
        table.add_row(row![
            format!("Timeouts ({})", partner),
            clock.timeouts_remaining(partner)
        ]);
    }
    table.printstd();
}
