use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use zeroize::Zeroizing;

use crate::domain::{SignatureAlgorithm, SignatureProvider};
use crate::infrastructure::SignatureRegistry;

pub fn handle_keygen(registry: &SignatureRegistry, algorithm: &str, output: &Path) -> Result<()> {
    if output.exists() {
        return Err(anyhow::anyhow!(
            "{} already exists; refusing to overwrite a key file",
            output.display()
        ));
    }

    let pair = registry.generate_keypair(algorithm).with_context(|| {
        let known: Vec<&str> = registry
            .algorithms()
            .into_iter()
            .map(|a: SignatureAlgorithm| a.name())
            .collect();
        format!("Supported algorithms: {}", known.join(", "))
    })?;

    let pem = Zeroizing::new(pem::encode(&pem::Pem::new(
        "PRIVATE KEY",
        pair.pkcs8_der.to_vec(),
    )));
    write_private(output, pem.as_bytes())?;

    println!("✓ {} key pair written to {}", pair.algorithm, output.display());
    println!("  Public key: {} bytes", pair.public_key.len());
    println!("  Have a CA issue a certificate for it, then run 'pcs import'.");
    Ok(())
}

fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .context("Failed to set key file permissions")?;
    }
    Ok(())
}
