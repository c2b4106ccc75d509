//! Spent claim identifiers.
//!
//! Nullifier hashes and ring key images share one registry. Marking is
//! gated by [`GateCapability`], which only this crate can mint, so nothing
//! outside the privacy gate can burn an identifier.

use std::collections::HashSet;

use veilswap_privacy::{Nullifier, PrivacyError};

/// Proof that the caller is the privacy gate.
pub struct GateCapability {
    _private: (),
}

impl GateCapability {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

#[derive(Debug, Default)]
pub struct NullifierRegistry {
    spent: HashSet<Nullifier>,
}

impl NullifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_spent(spent: impl IntoIterator<Item = Nullifier>) -> Self {
        Self {
            spent: spent.into_iter().collect(),
        }
    }

    pub fn is_spent(&self, id: &Nullifier) -> bool {
        self.spent.contains(id)
    }

    pub fn mark_spent(&mut self, _cap: &GateCapability, id: Nullifier) -> Result<(), PrivacyError> {
        if !self.spent.insert(id) {
            return Err(PrivacyError::AlreadyUsed);
        }
        Ok(())
    }

    /// Journal rollback only.
    pub(crate) fn unmark(&mut self, id: &Nullifier) {
        self.spent.remove(id);
    }

    pub fn len(&self) -> usize {
        self.spent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spent.is_empty()
    }
}
