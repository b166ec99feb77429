//! Template catalogue and active-settings resolution

use std::sync::Arc;

use super::{builtin_templates, SessionSettings, SettingsOverride, SettingsTemplate};
use crate::error::{CheckInError, Result};
use crate::storage::SettingsRepository;

/// Resolves the active settings for one couple
///
/// Loading never fails: a missing row yields the hard-coded default, and an
/// unreadable or malformed row falls back to it with a warning. Templates
/// only become active through [`SettingsCatalogue::promote`].
pub struct SettingsCatalogue {
    repository: Arc<dyn SettingsRepository>,
    couple_id: String,
    templates: Vec<SettingsTemplate>,
    active_template: Option<String>,
    active: SessionSettings,
    proposal: Option<SettingsTemplate>,
}

impl SettingsCatalogue {
    pub fn new(repository: Arc<dyn SettingsRepository>, couple_id: impl Into<String>) -> Self {
        let couple_id = couple_id.into();
        Self {
            repository,
            active: SessionSettings::default_for(couple_id.as_str()),
            couple_id,
            templates: builtin_templates(),
            active_template: None,
            proposal: None,
        }
    }

    pub fn templates(&self) -> &[SettingsTemplate] {
        &self.templates
    }

    pub fn template(&self, name: &str) -> Option<&SettingsTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }

    pub fn active(&self) -> &SessionSettings {
        &self.active
    }

    /// Name of the template the active settings are based on, if any
    pub fn active_template(&self) -> Option<&str> {
        self.active_template.as_deref()
    }

    /// Reload the couple's row and recompute the active settings
    pub async fn load(&mut self) -> &SessionSettings {
        let default = SessionSettings::default_for(self.couple_id.as_str());

        let row = match self.repository.fetch_settings(&self.couple_id).await {
            Ok(Some(raw)) => match serde_json::from_value::<SettingsOverride>(raw) {
                Ok(row) => Some(row),
                Err(e) => {
                    tracing::warn!(couple_id = %self.couple_id, "Malformed settings row, using defaults: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(couple_id = %self.couple_id, "Failed to load settings, using defaults: {}", e);
                None
            }
        };

        match row {
            Some(row) => {
                let named = row
                    .template
                    .as_deref()
                    .and_then(|name| self.template(name))
                    .map(|t| t.name.clone());
                if named.is_some() {
                    self.active_template = named;
                }
                let base = self
                    .active_template
                    .as_deref()
                    .and_then(|name| self.template(name))
                    .map(|t| t.settings_for(&self.couple_id))
                    .unwrap_or(default);
                self.active = row.apply(base);
            }
            None => {
                self.active_template = None;
                self.active = default;
            }
        }

        tracing::debug!(
            couple_id = %self.couple_id,
            template = ?self.active_template,
            "Active settings resolved"
        );
        &self.active
    }

    /// Stage a template without activating it
    ///
    /// # Errors
    ///
    /// Returns `CheckInError::Settings` for an unknown template name.
    pub fn propose(&mut self, name: &str) -> Result<&SettingsTemplate> {
        let template = self
            .template(name)
            .cloned()
            .ok_or_else(|| CheckInError::Settings(format!("unknown template '{}'", name)))?;
        Ok(&*self.proposal.insert(template))
    }

    pub fn proposal(&self) -> Option<&SettingsTemplate> {
        self.proposal.as_ref()
    }

    pub fn discard_proposal(&mut self) {
        self.proposal = None;
    }

    /// Make the proposed template active and persist it as the couple's row
    ///
    /// # Errors
    ///
    /// Returns `CheckInError::Settings` when nothing is proposed, or the
    /// repository error when the row cannot be saved. On failure the
    /// proposal stays staged and the active settings are unchanged.
    pub async fn promote(&mut self) -> Result<&SessionSettings> {
        let template = self
            .proposal
            .clone()
            .ok_or_else(|| CheckInError::Settings("no template proposed".to_string()))?;

        let row = SettingsOverride::from_template(&template);
        self.repository.save_settings(&self.couple_id, &row).await?;

        self.proposal = None;
        self.active = template.settings_for(&self.couple_id);
        self.active_template = Some(template.name.clone());
        tracing::info!(couple_id = %self.couple_id, template = %template.name, "Settings template promoted");
        Ok(&self.active)
    }
}
