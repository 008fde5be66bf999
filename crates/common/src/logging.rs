use std::{env, sync::Once};

use tracing::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const SVC_LABEL_ENVVAR: &str = "SETTLE_SVC_LABEL";

pub struct LoggerConfig {
    whoami: String,
}

impl LoggerConfig {
    /// Creates a new instance with whoami set.
    pub fn new(whoami: String) -> Self {
        Self { whoami }
    }

    pub fn with_base_name(s: &str) -> Self {
        Self::new(get_whoami_string(s))
    }

    pub fn whoami(&self) -> &str {
        &self.whoami
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::with_base_name("(settle-service)")
    }
}

/// Initializes the logging subsystem with the provided config.
///
/// Panics if a global subscriber was already installed.
pub fn init(config: LoggerConfig) {
    let filt = EnvFilter::from_default_env();
    let stdout_sub = tracing_subscriber::fmt::layer().compact().with_filter(filt);
    tracing_subscriber::registry().with(stdout_sub).init();

    info!(whoami = %config.whoami, "logging started");
}

static TEST_INIT: Once = Once::new();

/// Installs a test writer subscriber, once per process.
pub fn init_for_tests() {
    TEST_INIT.call_once(|| {
        let filt = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let test_sub = tracing_subscriber::fmt::layer()
            .compact()
            .with_test_writer()
            .with_filter(filt);
        // another harness may have installed one already
        let _ = tracing_subscriber::registry().with(test_sub).try_init();
    });
}

/// Gets the service label from the standard envvar, which should be included
/// in the whoami string.
pub fn get_service_label_from_env() -> Option<String> {
    env::var(SVC_LABEL_ENVVAR).ok()
}

/// Computes a standard whoami string.
pub fn get_whoami_string(base: &str) -> String {
    format_whoami(base, get_service_label_from_env().as_deref())
}

fn format_whoami(base: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{base}%{label}"),
        None => base.to_owned(),
    }
}
