//! Session settings and named templates
//!
//! The settings actually consumed by the timers are the *active* settings:
//! a base (a named template, or the hard-coded default before the couple has
//! chosen anything) with the couple's persisted override row laid on top.
//! See [`SettingsCatalogue`] for how they are loaded.

use serde::{Deserialize, Serialize};

pub mod catalogue;

pub use catalogue::SettingsCatalogue;

/// Timing knobs for one couple's check-ins
///
/// Units: `session_duration`, `timeout_duration` and `cool_down_time` are
/// minutes; `turn_duration` is seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub couple_id: String,
    pub session_duration: u32,
    pub timeouts_per_partner: u32,
    pub timeout_duration: u32,
    pub turn_based_mode: bool,
    pub turn_duration: u32,
    pub allow_extensions: bool,
    pub warm_up_questions: bool,
    pub cool_down_time: u32,
}

impl SessionSettings {
    /// The zero-state used before a couple has chosen anything
    ///
    /// ```
    /// use checkin::settings::SessionSettings;
    ///
    /// let settings = SessionSettings::default_for("c-1");
    /// assert_eq!(settings.session_duration, 30);
    /// assert!(!settings.turn_based_mode);
    /// ```
    pub fn default_for(couple_id: impl Into<String>) -> Self {
        Self {
            couple_id: couple_id.into(),
            session_duration: 30,
            timeouts_per_partner: 2,
            timeout_duration: 5,
            turn_based_mode: false,
            turn_duration: 90,
            allow_extensions: true,
            warm_up_questions: false,
            cool_down_time: 5,
        }
    }
}

/// A couple's persisted settings row
///
/// Every field is optional; present fields replace the matching fields of the
/// base settings. `template` names the template the row was derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeouts_per_partner: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_based_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_extensions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warm_up_questions: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cool_down_time: Option<u32>,
}

impl SettingsOverride {
    /// A row carrying every field of `template`
    pub fn from_template(template: &SettingsTemplate) -> Self {
        let s = &template.settings;
        Self {
            template: Some(template.name.clone()),
            session_duration: Some(s.session_duration),
            timeouts_per_partner: Some(s.timeouts_per_partner),
            timeout_duration: Some(s.timeout_duration),
            turn_based_mode: Some(s.turn_based_mode),
            turn_duration: Some(s.turn_duration),
            allow_extensions: Some(s.allow_extensions),
            warm_up_questions: Some(s.warm_up_questions),
            cool_down_time: Some(s.cool_down_time),
        }
    }

    /// Lay this row over `base`
    pub fn apply(&self, mut base: SessionSettings) -> SessionSettings {
        if let Some(v) = self.session_duration {
            base.session_duration = v;
        }
        if let Some(v) = self.timeouts_per_partner {
            base.timeouts_per_partner = v;
        }
        if let Some(v) = self.timeout_duration {
            base.timeout_duration = v;
        }
        if let Some(v) = self.turn_based_mode {
            base.turn_based_mode = v;
        }
        if let Some(v) = self.turn_duration {
            base.turn_duration = v;
        }
        if let Some(v) = self.allow_extensions {
            base.allow_extensions = v;
        }
        if let Some(v) = self.warm_up_questions {
            base.warm_up_questions = v;
        }
        if let Some(v) = self.cool_down_time {
            base.cool_down_time = v;
        }
        base
    }
}

/// A named, complete settings preset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsTemplate {
    pub name: String,
    pub description: String,
    pub settings: SessionSettings,
}

impl SettingsTemplate {
    /// The template's settings bound to a couple
    pub fn settings_for(&self, couple_id: &str) -> SessionSettings {
        SessionSettings {
            couple_id: couple_id.to_string(),
            ..self.settings.clone()
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn template(
    name: &str,
    description: &str,
    session_duration: u32,
    timeouts_per_partner: u32,
    timeout_duration: u32,
    turn_based_mode: bool,
    turn_duration: u32,
    allow_extensions: bool,
    warm_up_questions: bool,
    cool_down_time: u32,
) -> SettingsTemplate {
    SettingsTemplate {
        name: name.to_string(),
        description: description.to_string(),
        settings: SessionSettings {
            couple_id: String::new(),
            session_duration,
            timeouts_per_partner,
            timeout_duration,
            turn_based_mode,
            turn_duration,
            allow_extensions,
            warm_up_questions,
            cool_down_time,
        },
    }
}

/// The fixed template list: `quick`, `standard`, `deep-dive`
pub fn builtin_templates() -> Vec<SettingsTemplate> {
    vec![
        template(
            "quick",
            "A short check-in for busy days",
            15, 1, 2, false, 60, true, false, 2,
        ),
        template(
            "standard",
            "A balanced weekly check-in",
            30, 2, 5, false, 90, true, true, 5,
        ),
        template(
            "deep-dive",
            "A long, turn-based conversation for bigger topics",
            60, 3, 10, true, 180, true, true, 10,
        ),
    ]
}
