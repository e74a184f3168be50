//! # Server Utilities Module
//!
//! Validated access to environment variables, used by
//! [`WorkerConfig`](crate::config::WorkerConfig) when the worker starts.
//!
//! ```no_run
//! use server::utils::{EnvUtils, ProcessEnv};
//!
//! let namespace = EnvUtils::validated_from(&ProcessEnv, "SB_NAMESPACE")?;
//! let level = EnvUtils::optional_from(&ProcessEnv, "LOGLEVEL")
//!     .unwrap_or_else(|| "debug".to_string());
//! ```

pub mod env;

pub use env::{EnvSource, EnvUtils, EnvVarError, ProcessEnv};
