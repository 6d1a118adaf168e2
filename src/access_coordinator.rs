use std::fmt::Display;

use tracing::{debug, info, warn};

use crate::domain::{BiometricError, SessionPassword};

/// Biometric side of password acquisition.
pub trait PasswordGate {
    fn has_wrapped_secret(&self) -> bool;
    fn biometric_available(&self) -> bool;
    fn unwrap_password(&self) -> Result<SessionPassword, BiometricError>;
    fn wrap_password(&self, password: &SessionPassword) -> Result<(), BiometricError>;
}

/// Interactive fallback used when no cached or biometric password exists.
pub trait ManualPasswordSource {
    /// Returns `None` when the user gives up.
    fn next_password(&mut self, failed_attempts: u32, last_error: Option<&str>)
        -> Option<SessionPassword>;
    fn offer_enrollment(&mut self) -> bool;
}

/// Exactly one of these is invoked per `request_password` call.
pub trait PasswordCallback {
    fn on_password(self, password: &SessionPassword);
    fn on_cancelled(self);
    fn on_error(self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    Uninitialized,
    AwaitingBiometric,
    AwaitingManualPassword,
    Ready,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualAttempt {
    Accepted,
    Rejected { remaining: u32 },
    Denied,
}

#[derive(Debug)]
pub enum PasswordOutcome {
    Password(SessionPassword),
    Cancelled,
    Error(String),
}

struct Collect<'a>(&'a mut Option<PasswordOutcome>);

impl PasswordCallback for Collect<'_> {
    fn on_password(self, password: &SessionPassword) {
        *self.0 = Some(PasswordOutcome::Password(password.clone()));
    }

    fn on_cancelled(self) {
        *self.0 = Some(PasswordOutcome::Cancelled);
    }

    fn on_error(self, message: &str) {
        *self.0 = Some(PasswordOutcome::Error(message.to_string()));
    }
}

pub struct AccessCoordinator<G: PasswordGate> {
    gate: G,
    state: AccessState,
    cached: Option<SessionPassword>,
    failed_attempts: u32,
    max_attempts: u32,
    biometric_enabled: bool,
}

impl<G: PasswordGate> AccessCoordinator<G> {
    pub fn new(gate: G, max_attempts: u32, biometric_enabled: bool) -> Self {
        Self {
            gate,
            state: AccessState::Uninitialized,
            cached: None,
            failed_attempts: 0,
            max_attempts: max_attempts.max(1),
            biometric_enabled,
        }
    }

    pub fn state(&self) -> AccessState {
        self.state
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    pub fn cached_password(&self) -> Option<&SessionPassword> {
        self.cached.as_ref()
    }

    /// Picks the entry state from what is available right now.
    pub fn begin(&mut self) -> AccessState {
        self.state = if self.cached.is_some() {
            AccessState::Ready
        } else if self.biometric_enabled
            && self.gate.has_wrapped_secret()
            && self.gate.biometric_available()
        {
            AccessState::AwaitingBiometric
        } else {
            AccessState::AwaitingManualPassword
        };

        if self.state != AccessState::Ready {
            self.failed_attempts = 0;
        }
        debug!(state = ?self.state, "password acquisition started");
        self.state
    }

    pub fn attempt_biometric(&mut self) -> Result<(), BiometricError> {
        if self.state != AccessState::AwaitingBiometric {
            return Err(BiometricError::BiometricUnavailable(
                "biometric unlock was not offered".to_string(),
            ));
        }

        match self.gate.unwrap_password() {
            Ok(password) => {
                self.cache(password);
                Ok(())
            }
            Err(e) => {
                self.state = AccessState::AwaitingManualPassword;
                Err(e)
            }
        }
    }

    pub fn submit_manual<V, E>(
        &mut self,
        password: SessionPassword,
        verify: V,
    ) -> Result<ManualAttempt, E>
    where
        V: FnOnce(&SessionPassword) -> Result<bool, E>,
    {
        if self.state == AccessState::Denied {
            return Ok(ManualAttempt::Denied);
        }

        if verify(&password)? {
            self.cache(password);
            return Ok(ManualAttempt::Accepted);
        }

        self.failed_attempts += 1;
        if self.failed_attempts >= self.max_attempts {
            self.state = AccessState::Denied;
            warn!(attempts = self.failed_attempts, "too many failed password attempts");
            Ok(ManualAttempt::Denied)
        } else {
            self.state = AccessState::AwaitingManualPassword;
            Ok(ManualAttempt::Rejected {
                remaining: self.max_attempts - self.failed_attempts,
            })
        }
    }

    pub fn abandon_manual(&mut self) {
        self.state = AccessState::Denied;
    }

    pub fn should_offer_enrollment(&self) -> bool {
        self.state == AccessState::Ready
            && self.biometric_enabled
            && !self.gate.has_wrapped_secret()
            && self.gate.biometric_available()
    }

    pub fn enroll(&self) -> Result<(), BiometricError> {
        let password = self.cached.as_ref().ok_or(BiometricError::NoWrappedSecret)?;
        self.gate.wrap_password(password)?;
        info!("biometric unlock enabled");
        Ok(())
    }

    /// Drives the whole acquisition: cache, then biometric, then manual entry.
    pub fn request_password<S, V, E, C>(&mut self, source: &mut S, mut verify: V, callback: C)
    where
        S: ManualPasswordSource,
        V: FnMut(&SessionPassword) -> Result<bool, E>,
        E: Display,
        C: PasswordCallback,
    {
        match self.begin() {
            AccessState::Ready => return self.deliver(callback),
            AccessState::AwaitingBiometric => match self.attempt_biometric() {
                Ok(()) => return self.deliver(callback),
                Err(e) if e.is_cancellation() => {
                    info!("biometric prompt cancelled, asking for the password")
                }
                Err(e) => warn!(error = %e, "biometric unlock failed, asking for the password"),
            },
            _ => {}
        }

        let mut last_error: Option<String> = None;
        loop {
            let Some(password) = source.next_password(self.failed_attempts, last_error.as_deref())
            else {
                self.abandon_manual();
                return callback.on_cancelled();
            };

            match self.submit_manual(password, &mut verify) {
                Ok(ManualAttempt::Accepted) => {
                    if self.should_offer_enrollment() && source.offer_enrollment() {
                        if let Err(e) = self.enroll() {
                            warn!(error = %e, "biometric enrollment failed");
                        }
                    }
                    return self.deliver(callback);
                }
                Ok(ManualAttempt::Rejected { remaining }) => {
                    last_error = Some(format!(
                        "Incorrect password ({} attempt{} left)",
                        remaining,
                        if remaining == 1 { "" } else { "s" }
                    ));
                }
                Ok(ManualAttempt::Denied) => {
                    return callback.on_error("Too many failed password attempts");
                }
                Err(e) => return callback.on_error(&e.to_string()),
            }
        }
    }

    /// `request_password` with the callback folded into a return value.
    pub fn acquire<S, V, E>(&mut self, source: &mut S, verify: V) -> PasswordOutcome
    where
        S: ManualPasswordSource,
        V: FnMut(&SessionPassword) -> Result<bool, E>,
        E: Display,
    {
        let mut outcome = None;
        self.request_password(source, verify, Collect(&mut outcome));
        outcome.unwrap_or_else(|| PasswordOutcome::Error("no password outcome".to_string()))
    }

    pub fn teardown(&mut self) {
        if let Some(mut password) = self.cached.take() {
            password.wipe();
        }
        self.failed_attempts = 0;
        self.state = AccessState::Uninitialized;
    }

    fn cache(&mut self, password: SessionPassword) {
        if let Some(mut previous) = self.cached.replace(password) {
            previous.wipe();
        }
        self.failed_attempts = 0;
        self.state = AccessState::Ready;
    }

    fn deliver<C: PasswordCallback>(&self, callback: C) {
        match &self.cached {
            Some(password) => callback.on_password(password),
            None => callback.on_error("no password available"),
        }
    }
}

impl<G: PasswordGate> Drop for AccessCoordinator<G> {
    fn drop(&mut self) {
        self.teardown();
    }
}
