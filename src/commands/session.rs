//! Check-in session commands

use colored::Colorize;
use prettytable::{format, row, Table};
use std::sync::Arc;

use crate::checkin::{CheckInContext, CheckInSession, Step, STEP_SEQUENCE};
use crate::cli::{NoteCommand, StepCommand};
use crate::config::Config;
use crate::error::{CheckInError, Result};
use crate::storage::SledStore;
use crate::timer::SystemClock;

async fn load_context(config: &Config, store: Arc<SledStore>) -> CheckInContext {
    let mut ctx = CheckInContext::new(
        store,
        config.workspace.couple_id.as_str(),
        config.workspace.user_id.as_str(),
        Arc::new(SystemClock),
    );
    ctx.load().await;
    ctx
}

/// Turn a recorded persistence error into a command failure
fn check(ctx: &CheckInContext) -> Result<()> {
    match ctx.error() {
        Some(message) => {
            eprintln!("{}", message.yellow());
            Err(CheckInError::Storage(message.to_string()).into())
        }
        None => Ok(()),
    }
}

fn active(ctx: &CheckInContext) -> Result<&CheckInSession> {
    ctx.session().ok_or_else(|| CheckInError::NoActiveSession.into())
}

pub async fn start(
    config: &Config,
    store: Arc<SledStore>,
    categories: Vec<String>,
    mood: Option<u8>,
) -> Result<()> {
    let mut ctx = load_context(config, store).await;
    check(&ctx)?;
    ctx.start_check_in(categories, mood).await?;
    check(&ctx)?;

    let session = active(&ctx)?;
    println!(
        "{} {}",
        "Started check-in".green(),
        session.id.as_str().cyan()
    );
    print_session(session);
    Ok(())
}

pub async fn status(config: &Config, store: Arc<SledStore>) -> Result<()> {
    let ctx = load_context(config, store).await;
    check(&ctx)?;
    match ctx.session() {
        Some(session) => print_session(session),
        None => println!("{}", "No check-in in progress.".yellow()),
    }
    Ok(())
}

pub async fn step(config: &Config, store: Arc<SledStore>, command: StepCommand) -> Result<()> {
    let mut ctx = load_context(config, store).await;
    check(&ctx)?;
    let current = active(&ctx)?.progress.current_step;

    match command {
        StepCommand::Complete { step } => {
            let step = step.unwrap_or(current);
            ctx.complete_step(step).await?;
            check(&ctx)?;
            println!("{} {}", "Completed".green(), step.title());
        }
        StepCommand::Goto { step } => {
            if !ctx.go_to_step(step).await {
                return Err(CheckInError::Navigation(format!(
                    "cannot go to '{}' from '{}'",
                    step, current
                ))
                .into());
            }
            check(&ctx)?;
        }
    }

    print_session(active(&ctx)?);
    Ok(())
}

pub async fn note(config: &Config, store: Arc<SledStore>, command: NoteCommand) -> Result<()> {
    let mut ctx = load_context(config, store).await;
    check(&ctx)?;
    active(&ctx)?;

    match command {
        NoteCommand::Add { content, category } => {
            let note = ctx.add_draft_note(content, category)?;
            ctx.save_session().await?;
            check(&ctx)?;
            println!("{} {}", "Added note".green(), note.id.as_str().cyan());
        }
        NoteCommand::Remove { id } => {
            let known = active(&ctx)?.draft_notes.iter().any(|n| n.id == id);
            if !known {
                return Err(CheckInError::NotFound(format!("note {}", id)).into());
            }
            ctx.remove_draft_note(&id).await?;
            check(&ctx)?;
            println!("{} {}", "Removed note".green(), id.cyan());
        }
    }
    Ok(())
}

pub async fn save(config: &Config, store: Arc<SledStore>) -> Result<()> {
    let mut ctx = load_context(config, store).await;
    check(&ctx)?;
    ctx.save_session().await?;
    check(&ctx)?;
    println!("{}", "Check-in saved.".green());
    Ok(())
}

pub async fn complete(
    config: &Config,
    store: Arc<SledStore>,
    mood: Option<u8>,
    reflection: Option<String>,
) -> Result<()> {
    let mut ctx = load_context(config, store).await;
    check(&ctx)?;
    match ctx.complete_check_in(mood, reflection).await? {
        Some(record) => {
            println!(
                "{} {}",
                "Completed check-in".green(),
                record.id.as_str().cyan()
            );
            Ok(())
        }
        None => check(&ctx),
    }
}

pub async fn abandon(config: &Config, store: Arc<SledStore>) -> Result<()> {
    let mut ctx = load_context(config, store).await;
    check(&ctx)?;
    ctx.abandon_check_in().await?;
    check(&ctx)?;
    println!("{}", "Check-in abandoned.".yellow());
    Ok(())
}

fn print_session(session: &CheckInSession) {
    let progress = &session.progress;
    println!(
        "\n{} {} ({}%)",
        "Step:".bold(),
        progress.current_step.title(),
        progress.percentage
    );

    let mut steps = Table::new();
    steps.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    for step in STEP_SEQUENCE {
        let marker = step_marker(session, step);
        steps.add_row(row![marker, step.as_str()]);
    }
    steps.printstd();

    if !session.category_progress.is_empty() {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
        table.add_row(row!["Category".bold(), "Done".bold(), "Time".bold()]);
        for entry in &session.category_progress {
            let done = if entry.is_completed { "yes" } else { "no" };
            table.add_row(row![
                entry.category_id,
                done,
                crate::timer::format_time(entry.time_spent)
            ]);
        }
        table.printstd();
    }

    if !session.draft_notes.is_empty() {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
        table.add_row(row!["ID".bold(), "Category".bold(), "Note".bold()]);
        for note in &session.draft_notes {
            let category = note.category_id.clone().unwrap_or_else(|| "-".to_string());
            table.add_row(row![note.id.as_str().cyan(), category, note.content]);
        }
        table.printstd();
    }
    println!();
}

fn step_marker(session: &CheckInSession, step: Step) -> String {
    if step == session.progress.current_step {
        "▶".cyan().to_string()
    } else if session.progress.completed_steps.contains(&step) {
        "✓".green().to_string()
    } else {
        " ".to_string()
    }
}
