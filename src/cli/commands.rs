use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pcs")]
#[command(about = "Local credential store for post-quantum signing certificates", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Import a signing certificate, its private key and the issuing CA")]
    Import {
        #[arg(long, help = "Subject certificate (PEM)")]
        cert: PathBuf,

        #[arg(long, help = "Unencrypted PKCS#8 private key (PEM)")]
        key: PathBuf,

        #[arg(long, help = "Issuing CA certificate (PEM)")]
        ca: PathBuf,

        #[arg(short, long, help = "Alias to store the credential under")]
        alias: String,
    },

    #[command(about = "Store a certificate without a private key")]
    Trust {
        #[arg(long, help = "Certificate (PEM)")]
        cert: PathBuf,

        #[arg(short, long, help = "Alias to store the certificate under")]
        alias: String,
    },

    #[command(about = "List stored certificates")]
    List,

    #[command(about = "Remove a stored entry")]
    Rm {
        #[arg(help = "Alias")]
        alias: String,
    },

    #[command(about = "Sign a document with a stored credential")]
    Sign {
        #[arg(short, long, help = "Alias of the signing credential")]
        alias: String,

        #[arg(short, long, help = "Document to sign")]
        input: PathBuf,

        #[arg(short, long, help = "Signature output file")]
        output: Option<PathBuf>,
    },

    #[command(about = "Verify a detached signature against a certificate")]
    Verify {
        #[arg(long, help = "Signer certificate (PEM)")]
        cert: PathBuf,

        #[arg(short, long, help = "Signed document")]
        input: PathBuf,

        #[arg(short, long, help = "Detached signature file")]
        signature: PathBuf,
    },

    #[command(about = "Check whether a certificate is suitable for signing")]
    Validate {
        #[arg(long, help = "Certificate to check (PEM)")]
        cert: PathBuf,

        #[arg(long, help = "Issuing CA certificate (PEM)")]
        ca: Option<PathBuf>,
    },

    #[command(about = "Generate a key pair as PKCS#8 PEM")]
    Keygen {
        #[arg(short, long, default_value = "ML-DSA-65", help = "ML-DSA-44, ML-DSA-65, ML-DSA-87 or Ed25519")]
        algorithm: String,

        #[arg(short, long, help = "Output file for the private key")]
        output: PathBuf,
    },

    #[command(about = "Manage fingerprint unlock")]
    Biometric {
        #[command(subcommand)]
        subcommand: BiometricCommands,
    },

    #[command(about = "Show or change configuration")]
    Config {
        #[command(subcommand)]
        subcommand: Option<ConfigCommands>,
    },

    #[command(about = "Generate shell completion script")]
    Completion {
        #[arg(help = "Shell type (bash, zsh, fish)")]
        shell: String,
    },
}

#[derive(Subcommand)]
pub enum BiometricCommands {
    #[command(about = "Store the container password for fingerprint unlock")]
    Enable,

    #[command(about = "Forget the stored password")]
    Disable,

    #[command(about = "Show fingerprint unlock status")]
    Status,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Set the container file location")]
    ContainerPath {
        #[arg(help = "Path to the container file")]
        path: String,
    },

    #[command(about = "Turn fingerprint unlock on or off")]
    Biometric {
        #[arg(action = clap::ArgAction::Set, help = "true or false")]
        enabled: bool,
    },

    #[command(about = "Seconds to wait for a fingerprint")]
    BiometricTimeout {
        #[arg(help = "Timeout in seconds")]
        seconds: u64,
    },

    #[command(about = "Password attempts before access is denied")]
    MaxAttempts {
        #[arg(help = "Number of attempts")]
        attempts: u32,
    },

    #[command(about = "Start empty instead of failing when the container cannot be opened")]
    RecreateOnLoadFailure {
        #[arg(action = clap::ArgAction::Set, help = "true or false")]
        enabled: bool,
    },

    #[command(about = "Default log level (error, warn, info, debug, trace)")]
    LogLevel {
        #[arg(help = "Log level or filter directive")]
        level: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sign_without_output() {
        let cli = Cli::parse_from(["pcs", "sign", "--alias", "client-1", "--input", "doc.txt"]);
        match cli.command {
            Commands::Sign { alias, output, .. } => {
                assert_eq!(alias, "client-1");
                assert!(output.is_none());
            }
            _ => panic!("expected sign"),
        }
    }

    #[test]
    fn test_parse_config_flag() {
        let cli = Cli::parse_from(["pcs", "config", "biometric", "false"]);
        assert!(matches!(
            cli.command,
            Commands::Config {
                subcommand: Some(ConfigCommands::Biometric { enabled: false })
            }
        ));
    }
}
