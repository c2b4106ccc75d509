//! Relayer and release-gateway allowlists.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use veilswap_account::Address;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allowlists {
    relayers: BTreeSet<Address>,
    routers: BTreeSet<Address>,
}

impl Allowlists {
    pub fn new(
        relayers: impl IntoIterator<Item = Address>,
        routers: impl IntoIterator<Item = Address>,
    ) -> Self {
        Self {
            relayers: relayers.into_iter().collect(),
            routers: routers.into_iter().collect(),
        }
    }

    pub fn is_relayer(&self, relayer: &Address) -> bool {
        self.relayers.contains(relayer)
    }

    pub fn is_router(&self, router: &Address) -> bool {
        self.routers.contains(router)
    }

    /// Returns the previous membership.
    pub fn set_relayer(&mut self, relayer: Address, allowed: bool) -> bool {
        toggle(&mut self.relayers, relayer, allowed)
    }

    /// Returns the previous membership.
    pub fn set_router(&mut self, router: Address, authorized: bool) -> bool {
        toggle(&mut self.routers, router, authorized)
    }
}

fn toggle(set: &mut BTreeSet<Address>, addr: Address, member: bool) -> bool {
    if member {
        !set.insert(addr)
    } else {
        set.remove(&addr)
    }
}
