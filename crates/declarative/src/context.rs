//! Progress and confirmation hooks
//!
//! These traits keep the engine free of any terminal dependency; the binary
//! plugs in its spinner and prompt implementations.

use crate::types::{Address, ApplyResult};
use anyhow::Result;

/// Progress callback for execution operations
///
/// Callbacks are invoked from worker threads, hence `&self` and `Sync`.
pub trait ProgressCallback: Send + Sync {
    /// Called once before any resource is processed
    fn on_start(&self, count: usize);

    /// Called when a worker picks up a resource
    fn on_resource_start(&self, address: &Address, description: &str);

    /// Called when a resource finishes
    fn on_resource_complete(&self, address: &Address, result: &ApplyResult);

    /// Called after every resource has been processed
    fn on_complete(&self);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback {
    /// Ask the user to confirm an action
    ///
    /// Returns `true` if the user confirmed.
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_start(&self, _count: usize) {}
    fn on_resource_start(&self, _address: &Address, _description: &str) {}
    fn on_resource_complete(&self, _address: &Address, _result: &ApplyResult) {}
    fn on_complete(&self) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}
