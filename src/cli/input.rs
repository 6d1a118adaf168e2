use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm, Password};
use tracing::warn;

use crate::access_coordinator::ManualPasswordSource;
use crate::domain::SessionPassword;

pub fn prompt_container_password() -> Result<String> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Container Password")
        .interact()
        .context("Failed to read container password")
}

pub fn prompt_new_container_password() -> Result<String> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt("New Container Password")
        .with_confirmation("Confirm Container Password", "Passwords do not match")
        .interact()
        .context("Failed to read container password")
}

pub fn confirm_biometric_enrollment() -> Result<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Use your fingerprint to unlock the container next time?")
        .default(true)
        .interact()
        .context("Failed to read confirmation")
}

pub fn confirm_remove(alias: &str) -> Result<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Remove '{}' from the container?", alias))
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

/// Terminal prompts behind the access coordinator's manual fallback.
pub struct TerminalPasswordSource {
    creating: bool,
    offer_enrollment: bool,
}

impl TerminalPasswordSource {
    pub fn new(creating: bool, offer_enrollment: bool) -> Self {
        Self {
            creating,
            offer_enrollment,
        }
    }
}

impl ManualPasswordSource for TerminalPasswordSource {
    fn next_password(
        &mut self,
        _failed_attempts: u32,
        last_error: Option<&str>,
    ) -> Option<SessionPassword> {
        if let Some(message) = last_error {
            eprintln!("✗ {}", message);
        }

        let result = if self.creating {
            println!("No container yet. Choose a password to create one.");
            prompt_new_container_password()
        } else {
            prompt_container_password()
        };

        match result {
            Ok(password) => Some(SessionPassword::new(password)),
            Err(e) => {
                warn!(error = %e, "password prompt aborted");
                None
            }
        }
    }

    fn offer_enrollment(&mut self) -> bool {
        if !self.offer_enrollment {
            return false;
        }
        confirm_biometric_enrollment().unwrap_or(false)
    }
}
