use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::credential::read_input;
use crate::context::StoreContext;

pub fn handle_sign(
    ctx: &mut StoreContext,
    alias: &str,
    input: &Path,
    output: Option<PathBuf>,
) -> Result<()> {
    let document = read_input(input)?;
    let output = output.unwrap_or_else(|| default_signature_path(alias, input));

    let password = ctx.password()?;
    let signature = ctx.manager.sign(alias, password.expose(), &document)?;

    fs::write(&output, &signature)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "✓ Signed {} with '{}' ({} bytes) -> {}",
        input.display(),
        alias,
        signature.len(),
        output.display()
    );
    Ok(())
}

/// `signature_<alias>_<document stem>.bin`, next to the document.
pub fn default_signature_path(alias: &str, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string());

    let file_name = format!("signature_{}_{}.bin", alias, stem);
    match input.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}
