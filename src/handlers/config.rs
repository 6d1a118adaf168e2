use anyhow::Result;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use crate::cli::ConfigCommands;
use crate::config::{expand_home, Config};

pub fn handle_config(subcommand: Option<ConfigCommands>, config_dir: &Path) -> Result<()> {
    let mut config = Config::load(config_dir)?;

    match subcommand {
        None => {
            println!("\nCurrent Configuration:");
            println!("  Container Path: {}", config.container_path.display());
            println!(
                "  Wrapped Secret Path: {}",
                config.wrapped_secret_path.display()
            );
            println!("  Fingerprint Unlock: {}", config.enable_biometric);
            println!(
                "  Fingerprint Timeout: {} seconds",
                config.biometric_timeout_seconds
            );
            println!("  Max Password Attempts: {}", config.max_password_attempts);
            println!(
                "  Recreate On Load Failure: {}",
                config.recreate_on_load_failure
            );
            println!("  Log Level: {}", config.log_level);
        }
        Some(ConfigCommands::ContainerPath { path }) => {
            let expanded_path = expand_home(&path)?;
            config.container_path = expanded_path.clone();
            config.save(config_dir)?;
            println!("✓ Container path updated to: {}", expanded_path.display());
        }
        Some(ConfigCommands::Biometric { enabled }) => {
            config.enable_biometric = enabled;
            config.save(config_dir)?;
            println!("✓ Fingerprint unlock {}", if enabled { "enabled" } else { "disabled" });
        }
        Some(ConfigCommands::BiometricTimeout { seconds }) => {
            if seconds == 0 {
                return Err(anyhow::anyhow!("Timeout must be at least one second"));
            }
            config.biometric_timeout_seconds = seconds;
            config.save(config_dir)?;
            println!("✓ Fingerprint timeout updated to: {} seconds", seconds);
        }
        Some(ConfigCommands::MaxAttempts { attempts }) => {
            if attempts == 0 {
                return Err(anyhow::anyhow!("At least one attempt must be allowed"));
            }
            config.max_password_attempts = attempts;
            config.save(config_dir)?;
            println!("✓ Max password attempts updated to: {}", attempts);
        }
        Some(ConfigCommands::RecreateOnLoadFailure { enabled }) => {
            config.recreate_on_load_failure = enabled;
            config.save(config_dir)?;
            if enabled {
                println!("⚠️  An unreadable container will now be replaced by an empty one on the next write.");
            }
            println!("✓ Recreate on load failure: {}", enabled);
        }
        Some(ConfigCommands::LogLevel { level }) => {
            EnvFilter::try_new(&level)
                .map_err(|e| anyhow::anyhow!("Invalid log level '{}': {}", level, e))?;
            config.log_level = level.clone();
            config.save(config_dir)?;
            println!("✓ Log level updated to: {}", level);
        }
    }

    Ok(())
}
