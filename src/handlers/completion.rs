use anyhow::Result;
use clap::CommandFactory;
use clap_complete::{generate, shells};
use std::io;

use crate::cli::Cli;

pub fn handle_completion(shell: &str) -> Result<()> {
    let mut cmd = Cli::command();

    match shell.to_lowercase().as_str() {
        "bash" => {
            generate(shells::Bash, &mut cmd, "pcs", &mut io::stdout());
            println!();
            println!("# To enable completion, add the following to ~/.bashrc:");
            println!("#   eval \"$(pcs completion bash)\"");
        }
        "zsh" => {
            generate(shells::Zsh, &mut cmd, "pcs", &mut io::stdout());
            println!();
            println!("# To enable completion, add the following to ~/.zshrc:");
            println!("#   eval \"$(pcs completion zsh)\"");
        }
        "fish" => {
            generate(shells::Fish, &mut cmd, "pcs", &mut io::stdout());
            println!();
            println!("# To enable completion, save to ~/.config/fish/completions/pcs.fish:");
            println!("#   pcs completion fish > ~/.config/fish/completions/pcs.fish");
        }
        _ => {
            return Err(anyhow::anyhow!(
                "Unsupported shell: {}. Supported shells: bash, zsh, fish",
                shell
            ));
        }
    }

    Ok(())
}
