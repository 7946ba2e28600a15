//! Runtime environment detection.
//!
//! Single source of truth for the runtime environment, read from the
//! `PUSHCOUNT_ENV` environment variable.
//!
//! Set `PUSHCOUNT_ENV` to one of:
//! - `test` - Test mode (config and data live under the repo's `tmp/`)
//! - `development` or `dev` - Development mode (verbose default logging)
//! - (anything else or unset) - Production mode

/// Runtime environment for the binary and library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Production environment (default).
    Production,
    /// Development environment.
    Development,
    /// Test environment.
    Test,
}

impl Environment {
    /// Detect current environment from `PUSHCOUNT_ENV`.
    #[must_use]
    pub fn current() -> Self {
        Self::parse(std::env::var("PUSHCOUNT_ENV").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("test") => Self::Test,
            Some("development" | "dev") => Self::Development,
            _ => Self::Production,
        }
    }

    /// Returns `true` if this is the test environment.
    #[must_use]
    pub fn is_test(self) -> bool {
        self == Self::Test
    }

    /// Default `env_logger` filter for this environment.
    ///
    /// `RUST_LOG` still takes precedence when set.
    #[must_use]
    pub fn default_log_filter(self) -> &'static str {
        match self {
            Self::Production => "info",
            Self::Development | Self::Test => "debug",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Development => write!(f, "development"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Convenience function to check if running in test mode.
#[must_use]
pub fn is_test_mode() -> bool {
    Environment::current().is_test()
}
