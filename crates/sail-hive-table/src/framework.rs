//! Process-wide registration of the frameworks taking part in a job

use parking_lot::Mutex;
use std::sync::Once;
use tracing::info;

/// Name and version this crate registers itself under
pub const FRAMEWORK_NAME: &str = concat!(env!("CARGO_PKG_NAME"), ":", env!("CARGO_PKG_VERSION"));

static FRAMEWORKS: Mutex<Vec<String>> = Mutex::new(Vec::new());
static REGISTER: Once = Once::new();

/// Register this crate with the host process; only the first call has an effect
pub fn register() {
    REGISTER.call_once(|| {
        add_framework(FRAMEWORK_NAME);
        info!("Registered framework: {}", FRAMEWORK_NAME);
    });
}

/// Add a framework to the process-wide list, ignoring duplicates
pub fn add_framework(name: &str) {
    let mut frameworks = FRAMEWORKS.lock();
    if !frameworks.iter().any(|f| f == name) {
        frameworks.push(name.to_string());
    }
}

/// Frameworks registered so far, in registration order
pub fn registered() -> Vec<String> {
    FRAMEWORKS.lock().clone()
}
