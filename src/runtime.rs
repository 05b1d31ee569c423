//! Process environment seam.
//!
//! Library code never calls `std::env` directly; configuration loaders take an
//! [`Env`] so tests can supply their own values.

use std::env;

#[cfg_attr(test, mockall::automock)]
pub trait Env: Send + Sync {
    fn env_var(&self, key: &str) -> Result<String, env::VarError>;
}

/// Reads the real process environment.
pub struct RealEnv;

impl Env for RealEnv {
    #[tracing::instrument(skip(self))]
    fn env_var(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }
}
