//! Value bookkeeping.
//!
//! ```text
//!   deposit ──► Vault[currency] ──release──► Ledger[router]
//!                                              │ exchange
//!                                              ▼
//!              Ledger[stealth] ◄──settle── Ledger[gate]
//!              Ledger[relayer] ◄──fee──────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use veilswap_account::{Address, Currency};

use crate::error::GateError;

/// Pool-held value per currency
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vault {
    balances: BTreeMap<Currency, u128>,
}

impl Vault {
    pub fn balance(&self, currency: &Currency) -> u128 {
        self.balances.get(currency).copied().unwrap_or(0)
    }

    pub fn credit(&mut self, currency: Currency, amount: u128) -> Result<(), GateError> {
        let entry = self.balances.entry(currency).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or(GateError::BalanceOverflow)?;
        Ok(())
    }

    pub fn debit(&mut self, currency: Currency, amount: u128) -> Result<(), GateError> {
        let available = self.balance(&currency);
        if available < amount {
            return Err(GateError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        self.balances.insert(currency, available - amount);
        Ok(())
    }

    /// Journal rollback only.
    pub(crate) fn restore(&mut self, currency: Currency, amount: u128) {
        self.balances.insert(currency, amount);
    }

    pub(crate) fn entries(&self) -> Vec<(Currency, u128)> {
        self.balances.iter().map(|(c, a)| (*c, *a)).collect()
    }

    pub(crate) fn from_entries(entries: impl IntoIterator<Item = (Currency, u128)>) -> Self {
        Self {
            balances: entries.into_iter().collect(),
        }
    }
}

/// One holder balance, as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub holder: Address,
    pub currency: Currency,
    pub amount: u128,
}

/// Balances of accounts outside the pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    balances: BTreeMap<(Address, Currency), u128>,
}

impl Ledger {
    pub fn balance_of(&self, holder: &Address, currency: &Currency) -> u128 {
        self.balances
            .get(&(*holder, *currency))
            .copied()
            .unwrap_or(0)
    }

    pub fn credit(
        &mut self,
        holder: Address,
        currency: Currency,
        amount: u128,
    ) -> Result<(), GateError> {
        let entry = self.balances.entry((holder, currency)).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or(GateError::BalanceOverflow)?;
        Ok(())
    }

    pub fn debit(
        &mut self,
        holder: Address,
        currency: Currency,
        amount: u128,
    ) -> Result<(), GateError> {
        let available = self.balance_of(&holder, &currency);
        if available < amount {
            return Err(GateError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        self.balances.insert((holder, currency), available - amount);
        Ok(())
    }

    /// Journal rollback only.
    pub(crate) fn restore(&mut self, holder: Address, currency: Currency, amount: u128) {
        self.balances.insert((holder, currency), amount);
    }

    pub(crate) fn entries(&self) -> Vec<LedgerEntry> {
        self.balances
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|((holder, currency), amount)| LedgerEntry {
                holder: *holder,
                currency: *currency,
                amount: *amount,
            })
            .collect()
    }

    pub(crate) fn from_entries(entries: impl IntoIterator<Item = LedgerEntry>) -> Self {
        Self {
            balances: entries
                .into_iter()
                .map(|e| ((e.holder, e.currency), e.amount))
                .collect(),
        }
    }
}
