use anyhow::{anyhow, Result};

use crate::cli::BiometricCommands;
use crate::context::StoreContext;

pub fn handle_biometric(subcommand: BiometricCommands, ctx: &mut StoreContext) -> Result<()> {
    match subcommand {
        BiometricCommands::Enable => {
            if !ctx.config.enable_biometric {
                return Err(anyhow!(
                    "Fingerprint unlock is turned off. Run 'pcs config biometric true' first."
                ));
            }
            if !ctx.wrapper().is_available() {
                return Err(anyhow!("No fingerprint sensor is available on this device"));
            }

            ctx.enable_biometric()?;
            println!("✓ Fingerprint unlock enabled");
        }
        BiometricCommands::Disable => {
            ctx.wrapper()
                .clear()
                .map_err(|e| anyhow!("Failed to disable fingerprint unlock: {}", e))?;
            println!("✓ Fingerprint unlock disabled");
        }
        BiometricCommands::Status => {
            let wrapper = ctx.wrapper();
            println!("\nFingerprint unlock:");
            println!("  Enabled in config: {}", ctx.config.enable_biometric);
            println!("  Sensor available:  {}", wrapper.is_available());
            println!("  Password stored:   {}", wrapper.has_wrapped_secret());
        }
    }

    Ok(())
}
