use anyhow::{Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};

pub struct SwiftOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stderr: String,
}

/// Pipes a script into `swift -` and collects its exit status.
pub fn run_swift(script: &str) -> Result<SwiftOutput> {
    let mut child = Command::new("swift")
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .context("Failed to spawn swift")?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(script.as_bytes())
            .context("Failed to send script to swift")?;
    }

    let output = child
        .wait_with_output()
        .context("Failed to wait for swift")?;
    Ok(SwiftOutput {
        success: output.status.success(),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}
