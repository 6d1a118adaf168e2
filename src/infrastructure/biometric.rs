use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BiometricOutcome {
    Success,
    Cancelled,
    Error(String),
}

pub trait BiometricAuth: Send + Sync {
    fn is_available(&self) -> bool;
    fn authenticate(&self, reason: &str) -> BiometricOutcome;
}

/// A prompt running on a worker thread. The worker sends exactly one outcome;
/// dropping the request (or calling `cancel`) discards it.
pub struct BiometricRequest {
    receiver: Receiver<BiometricOutcome>,
}

impl BiometricRequest {
    pub fn start(auth: Arc<dyn BiometricAuth>, reason: &str) -> Self {
        let (sender, receiver) = mpsc::sync_channel(1);
        let reason = reason.to_string();

        thread::spawn(move || {
            let outcome = auth.authenticate(&reason);
            // Receiver may be gone after a cancel or timeout.
            let _ = sender.send(outcome);
        });

        Self { receiver }
    }

    pub fn wait(self, timeout: Duration) -> BiometricOutcome {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                debug!(timeout_secs = timeout.as_secs(), "biometric prompt timed out");
                BiometricOutcome::Error(format!(
                    "no response within {} seconds",
                    timeout.as_secs()
                ))
            }
            Err(RecvTimeoutError::Disconnected) => {
                BiometricOutcome::Error("biometric prompt ended without a result".to_string())
            }
        }
    }

    pub fn cancel(self) {
        drop(self.receiver);
    }
}

/// Runs one prompt and waits for it.
pub fn authenticate_with_timeout(
    auth: Arc<dyn BiometricAuth>,
    reason: &str,
    timeout: Duration,
) -> BiometricOutcome {
    BiometricRequest::start(auth, reason).wait(timeout)
}

#[cfg(target_os = "macos")]
pub struct MacOSBiometric;

#[cfg(target_os = "macos")]
const EXIT_CANCELLED: i32 = 2;

#[cfg(target_os = "macos")]
impl BiometricAuth for MacOSBiometric {
    fn is_available(&self) -> bool {
        let script = r#"
import Foundation
import LocalAuthentication

let context = LAContext()
var error: NSError?
let available = context.canEvaluatePolicy(.deviceOwnerAuthenticationWithBiometrics, error: &error)
exit(available ? 0 : 1)
"#;
        super::swift_runner::run_swift(script)
            .map(|o| o.success)
            .unwrap_or(false)
    }

    fn authenticate(&self, reason: &str) -> BiometricOutcome {
        let escaped_reason = reason.replace('\\', "\\\\").replace('"', "\\\"");
        let script = format!(
            r#"
import Foundation
import LocalAuthentication

let context = LAContext()
var error: NSError?

guard context.canEvaluatePolicy(.deviceOwnerAuthenticationWithBiometrics, error: &error) else {{
    FileHandle.standardError.write((error?.localizedDescription ?? "unavailable").data(using: .utf8)!)
    exit(1)
}}

let semaphore = DispatchSemaphore(value: 0)
var code: Int32 = 1

context.evaluatePolicy(.deviceOwnerAuthenticationWithBiometrics, localizedReason: "{escaped_reason}") {{ success, evalError in
    if success {{
        code = 0
    }} else if let laError = evalError as? LAError,
              [.userCancel, .appCancel, .systemCancel, .userFallback].contains(laError.code) {{
        code = 2
    }} else {{
        FileHandle.standardError.write((evalError?.localizedDescription ?? "failed").data(using: .utf8)!)
    }}
    semaphore.signal()
}}

semaphore.wait()
exit(code)
"#
        );

        match super::swift_runner::run_swift(&script) {
            Ok(output) if output.success => BiometricOutcome::Success,
            Ok(output) if output.code == Some(EXIT_CANCELLED) => BiometricOutcome::Cancelled,
            Ok(output) => BiometricOutcome::Error(if output.stderr.is_empty() {
                "authentication failed".to_string()
            } else {
                output.stderr
            }),
            Err(e) => BiometricOutcome::Error(e.to_string()),
        }
    }
}

#[cfg(not(target_os = "macos"))]
pub struct StubBiometric;

#[cfg(not(target_os = "macos"))]
impl BiometricAuth for StubBiometric {
    fn is_available(&self) -> bool {
        false
    }

    fn authenticate(&self, _reason: &str) -> BiometricOutcome {
        BiometricOutcome::Error("biometric authentication is not supported on this platform".to_string())
    }
}

pub fn get_biometric_auth() -> Arc<dyn BiometricAuth> {
    #[cfg(target_os = "macos")]
    {
        Arc::new(MacOSBiometric)
    }
    #[cfg(not(target_os = "macos"))]
    {
        Arc::new(StubBiometric)
    }
}
