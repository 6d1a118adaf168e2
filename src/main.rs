mod access_coordinator;
mod cli;
mod config;
mod context;
mod credential_manager;
mod domain;
mod handlers;
mod infrastructure;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use config::{get_config_dir, Config};
use context::StoreContext;
use handlers::{
    biometric::handle_biometric,
    completion::handle_completion,
    config::handle_config,
    credential::{handle_import, handle_list, handle_rm, handle_trust},
    keygen::handle_keygen,
    sign::handle_sign,
    verify::{handle_validate, handle_verify},
};
use infrastructure::{init_logging, SignatureRegistry};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_dir = get_config_dir()?;
    let config = Config::load(&config_dir)?;
    init_logging(&config.log_level)?;

    let registry = SignatureRegistry::with_default_backends();

    match cli.command {
        Commands::Import {
            cert,
            key,
            ca,
            alias,
        } => handle_import(&mut StoreContext::new(config, registry), &cert, &key, &ca, &alias),
        Commands::Trust { cert, alias } => {
            handle_trust(&mut StoreContext::new(config, registry), &cert, &alias)
        }
        Commands::List => handle_list(&mut StoreContext::new(config, registry)),
        Commands::Rm { alias } => handle_rm(&mut StoreContext::new(config, registry), &alias),
        Commands::Sign {
            alias,
            input,
            output,
        } => handle_sign(&mut StoreContext::new(config, registry), &alias, &input, output),
        Commands::Verify {
            cert,
            input,
            signature,
        } => handle_verify(
            &StoreContext::new(config, registry).manager,
            &cert,
            &input,
            &signature,
        ),
        Commands::Validate { cert, ca } => handle_validate(
            &StoreContext::new(config, registry).manager,
            &cert,
            ca.as_deref(),
        ),
        Commands::Keygen { algorithm, output } => handle_keygen(&registry, &algorithm, &output),
        Commands::Biometric { subcommand } => {
            handle_biometric(subcommand, &mut StoreContext::new(config, registry))
        }
        Commands::Config { subcommand } => handle_config(subcommand, &config_dir),
        Commands::Completion { shell } => handle_completion(&shell),
    }
}
