//! Settings commands

use colored::Colorize;
use prettytable::{format, row, Table};
use std::sync::Arc;

use crate::cli::SettingsCommand;
use crate::config::Config;
use crate::error::Result;
use crate::settings::{SessionSettings, SettingsCatalogue};
use crate::storage::SledStore;

pub async fn handle_settings(
    config: &Config,
    store: Arc<SledStore>,
    command: SettingsCommand,
) -> Result<()> {
    let mut catalogue = SettingsCatalogue::new(store, config.workspace.couple_id.as_str());
    catalogue.load().await;

    match command {
        SettingsCommand::List => {
            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
            table.add_row(row![
                "".bold(),
                "Template".bold(),
                "Session".bold(),
                "Turns".bold(),
                "Description".bold()
            ]);
            for template in catalogue.templates() {
                let marker = if catalogue.active_template() == Some(template.name.as_str()) {
                    "*".green().to_string()
                } else {
                    String::new()
                };
                let turns = if template.settings.turn_based_mode {
                    format!("{}s", template.settings.turn_duration)
                } else {
                    "off".to_string()
                };
                table.add_row(row![
                    marker,
                    template.name.as_str().cyan(),
                    format!("{} min", template.settings.session_duration),
                    turns,
                    template.description
                ]);
            }
            table.printstd();
        }
        SettingsCommand::Show => {
            let name = catalogue.active_template().unwrap_or("default").to_string();
            println!("{} {}", "Based on:".bold(), name.cyan());
            print_settings(catalogue.active());
        }
        SettingsCommand::Apply { template } => {
            catalogue.propose(&template)?;
            let active = catalogue.promote().await?.clone();
            println!("{} {}", "Applied template".green(), template.cyan());
            print_settings(&active);
        }
    }

    Ok(())
}

fn print_settings(settings: &SessionSettings) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row!["Session duration", format!("{} min", settings.session_duration)]);
    table.add_row(row!["Timeouts per partner", settings.timeouts_per_partner]);
    table.add_row(row!["Timeout duration", format!("{} min", settings.timeout_duration)]);
    table.add_row(row!["Turn-based mode", settings.turn_based_mode]);
    table.add_row(row!["Turn duration", format!("{} s", settings.turn_duration)]);
    table.add_row(row!["Allow extensions", settings.allow_extensions]);
    table.add_row(row!["Warm-up questions", settings.warm_up_questions]);
    table.add_row(row!["Cool-down time", format!("{} min", settings.cool_down_time)]);
    table.printstd();
}
