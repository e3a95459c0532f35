//! # Caller Identity
//!
//! Every public operation takes an explicit [`Caller`]. There is no ambient
//! "current user": the identity travels with the call, together with an
//! optional [`CancelToken`] that the caller may trip from another thread.
//!
//! Cancellation is cooperative. Long walks and the commit step poll the token
//! and bail out with [`ForgeError::Cancelled`]; since nothing is persisted
//! before commit, a cancelled operation leaves the store untouched.

use crate::error::{ForgeError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Name of the built-in identity that is always treated as an admin.
pub const SYSTEM_USER: &str = "system";

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct Caller {
    user: String,
    cancel: Option<CancelToken>,
}

impl Caller {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            cancel: None,
        }
    }

    pub fn system() -> Self {
        Self::new(SYSTEM_USER)
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn is_system(&self) -> bool {
        self.user == SYSTEM_USER
    }

    pub fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(ForgeError::Cancelled),
            _ => Ok(()),
        }
    }
}
