//! Warning and error reporting, gated by the client configuration.

use crate::config::ClientConfig;
use crate::error::BusApiError;

/// Which diagnostics the client emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostics {
    pub print_warnings: bool,
    pub print_full_errors: bool,
}

impl Diagnostics {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            print_warnings: config.print_warnings,
            print_full_errors: config.print_full_errors,
        }
    }

    /// Log a recoverable problem.
    pub fn warn(&self, message: impl std::fmt::Display) {
        if self.print_warnings {
            tracing::warn!("{message}");
        }
    }

    /// Log the detail of a critical error, then hand it back.
    pub fn report(&self, err: BusApiError) -> BusApiError {
        if self.print_full_errors
            && let BusApiError::Critical { detail } = &err
        {
            tracing::error!(%detail, "Critical API failure");
        }
        err
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}
