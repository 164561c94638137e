//! Single-slot buffer for a pending user interjection.

use crate::error::{BanterError, Result};

/// Holds at most one user-authored turn awaiting its splice point.
///
/// The engine consumes the slot exactly once per splice via [`take`], so a
/// slow generation cycle can never splice the same text twice.
///
/// [`take`]: InjectionSlot::take
#[derive(Debug, Default)]
pub struct InjectionSlot {
    pending: Option<String>,
}

impl InjectionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an interjection.
    ///
    /// # Errors
    ///
    /// Returns `InjectionBusy` while a previous interjection is still
    /// waiting to be consumed.
    pub fn set(&mut self, text: impl Into<String>) -> Result<()> {
        if self.pending.is_some() {
            return Err(BanterError::InjectionBusy);
        }
        self.pending = Some(text.into());
        Ok(())
    }

    /// Returns and clears the pending interjection, if any.
    pub fn take(&mut self) -> Option<String> {
        self.pending.take()
    }

    pub fn is_occupied(&self) -> bool {
        self.pending.is_some()
    }

    /// Drops any pending interjection without consuming it.
    pub fn clear(&mut self) {
        self.pending = None;
    }
}
