use anyhow::{anyhow, Result};
use std::time::Duration;

use crate::access_coordinator::{AccessCoordinator, PasswordOutcome};
use crate::cli::input::TerminalPasswordSource;
use crate::config::Config;
use crate::credential_manager::CredentialManager;
use crate::domain::SessionPassword;
use crate::infrastructure::{
    get_biometric_auth, ContainerStorage, CryptoServiceImpl, KeyringHardwareKey, SecretWrapper,
    SignatureRegistry, WrappedSecretStore,
};

pub type Manager = CredentialManager<CryptoServiceImpl, SignatureRegistry>;
pub type Wrapper = SecretWrapper<KeyringHardwareKey>;

/// Everything a command needs: configuration, the credential manager and
/// the password coordinator for this process.
pub struct StoreContext {
    pub config: Config,
    pub manager: Manager,
    coordinator: AccessCoordinator<Wrapper>,
}

impl StoreContext {
    pub fn new(config: Config, registry: SignatureRegistry) -> Self {
        let storage = ContainerStorage::new(CryptoServiceImpl::new(), &config.container_path)
            .recreate_on_load_failure(config.recreate_on_load_failure);
        let manager = CredentialManager::new(storage, registry);

        let wrapper = SecretWrapper::new(
            KeyringHardwareKey::new(),
            get_biometric_auth(),
            WrappedSecretStore::new(&config.wrapped_secret_path),
            Duration::from_secs(config.biometric_timeout_seconds),
        );
        let coordinator = AccessCoordinator::new(
            wrapper,
            config.max_password_attempts,
            config.enable_biometric,
        );

        Self {
            config,
            manager,
            coordinator,
        }
    }

    pub fn wrapper(&self) -> &Wrapper {
        self.coordinator.gate()
    }

    /// Container password from cache, fingerprint or prompt. After a typed
    /// password the user is offered fingerprint unlock.
    pub fn password(&mut self) -> Result<SessionPassword> {
        self.acquire(true)
    }

    pub fn password_without_enrollment(&mut self) -> Result<SessionPassword> {
        self.acquire(false)
    }

    /// Wraps the current session password for fingerprint unlock.
    pub fn enable_biometric(&mut self) -> Result<()> {
        self.password_without_enrollment()?;
        self.coordinator
            .enroll()
            .map_err(|e| anyhow!("Failed to enable fingerprint unlock: {}", e))
    }

    fn acquire(&mut self, offer_enrollment: bool) -> Result<SessionPassword> {
        let mut source =
            TerminalPasswordSource::new(!self.manager.container_exists(), offer_enrollment);
        let manager = &self.manager;

        match self
            .coordinator
            .acquire(&mut source, |candidate| manager.check_password(candidate.expose()))
        {
            PasswordOutcome::Password(password) => Ok(password),
            PasswordOutcome::Cancelled => Err(anyhow!("Password entry cancelled")),
            PasswordOutcome::Error(message) => Err(anyhow!(message)),
        }
    }
}
