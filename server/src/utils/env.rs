//! Environment variable utilities for safe and validated access.
//!
//! Every lookup trims whitespace and treats an empty value the same way as a
//! missing one, so `SAS_VALUE=` in a `.env` file is reported instead of being
//! signed with.

use std::env::VarError;
use thiserror::Error;

/// Errors that can occur when accessing environment variables.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvVarError {
    /// Environment variable is not set
    #[error(
        "Environment variable '{name}' not found. Please set this variable in your .env file or environment."
    )]
    NotFound { name: String },

    /// Environment variable contains invalid UTF-8 characters
    #[error(
        "Environment variable '{name}' contains invalid UTF-8 characters. Please check the value."
    )]
    InvalidUtf8 { name: String },

    /// Environment variable is set but contains only whitespace or is empty
    #[error("Environment variable '{name}' is empty. Please provide a valid value.")]
    Empty { name: String },

    /// Environment variable is set but cannot be parsed into the expected type
    #[error("Environment variable '{name}' has invalid value '{value}': expected {expected}.")]
    Invalid {
        name: String,
        value: String,
        expected: String,
    },
}

/// Source of raw variable values.
///
/// [`EnvUtils`] reads the process environment through [`ProcessEnv`]; tests
/// hand in a map instead of mutating global state.
pub trait EnvSource {
    fn var(&self, name: &str) -> Result<String, VarError>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Result<String, VarError> {
        std::env::var(name)
    }
}

impl<F> EnvSource for F
where
    F: Fn(&str) -> Option<String>,
{
    fn var(&self, name: &str) -> Result<String, VarError> {
        self(name).ok_or(VarError::NotPresent)
    }
}

/// Utility functions for safe environment variable handling.
///
/// # Examples
///
/// ```no_run
/// use server::utils::{EnvUtils, ProcessEnv};
///
/// let namespace = EnvUtils::validated_from(&ProcessEnv, "SB_NAMESPACE")?;
/// let queue = EnvUtils::optional_from(&ProcessEnv, "QUEUE_NAME")
///     .unwrap_or_else(|| "test_queue".to_string());
/// ```
pub struct EnvUtils;

impl EnvUtils {
    /// Reads a required variable from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvVarError`] if:
    /// - The variable is not set ([`EnvVarError::NotFound`])
    /// - The variable is empty or contains only whitespace ([`EnvVarError::Empty`])
    /// - The variable contains invalid UTF-8 ([`EnvVarError::InvalidUtf8`])
    pub fn validated_from(source: &dyn EnvSource, name: &str) -> Result<String, EnvVarError> {
        match source.var(name) {
            Ok(value) => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    Err(EnvVarError::Empty {
                        name: name.to_string(),
                    })
                } else {
                    Ok(trimmed.to_string())
                }
            }
            Err(VarError::NotPresent) => Err(EnvVarError::NotFound {
                name: name.to_string(),
            }),
            Err(VarError::NotUnicode(_)) => Err(EnvVarError::InvalidUtf8 {
                name: name.to_string(),
            }),
        }
    }

    /// Reads an optional variable; unset, empty and invalid values all yield `None`.
    pub fn optional_from(source: &dyn EnvSource, name: &str) -> Option<String> {
        Self::validated_from(source, name).ok()
    }

    /// Reads a boolean flag. Only a case-insensitive `true` enables it.
    pub fn flag_from(source: &dyn EnvSource, name: &str) -> bool {
        Self::optional_from(source, name)
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Reads an unsigned integer, returning `Ok(None)` when the variable is unset.
    ///
    /// # Errors
    ///
    /// Returns [`EnvVarError::Invalid`] when the value is present but not a number.
    pub fn u32_from(source: &dyn EnvSource, name: &str) -> Result<Option<u32>, EnvVarError> {
        match Self::optional_from(source, name) {
            Some(value) => value
                .parse::<u32>()
                .map(Some)
                .map_err(|_| EnvVarError::Invalid {
                    name: name.to_string(),
                    value,
                    expected: "a non-negative integer".to_string(),
                }),
            None => Ok(None),
        }
    }
}
