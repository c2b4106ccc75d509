use std::collections::BTreeMap;

use veilswap_account::Address;

use super::StealthMetaAddress;

/// Meta-addresses published by recipient identities
#[derive(Debug, Clone, Default)]
pub struct StealthRegistry {
    entries: BTreeMap<Address, StealthMetaAddress>,
}

impl StealthRegistry {
    /// Returns the meta-address previously registered, if any.
    pub fn register(
        &mut self,
        identity: Address,
        meta: StealthMetaAddress,
    ) -> Option<StealthMetaAddress> {
        self.entries.insert(identity, meta)
    }

    pub fn meta_address_of(&self, identity: &Address) -> Option<&StealthMetaAddress> {
        self.entries.get(identity)
    }

    /// Journal rollback only.
    pub(crate) fn restore(&mut self, identity: Address, previous: Option<StealthMetaAddress>) {
        match previous {
            Some(meta) => {
                self.entries.insert(identity, meta);
            }
            None => {
                self.entries.remove(&identity);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &StealthMetaAddress)> {
        self.entries.iter()
    }
}

impl FromIterator<(Address, StealthMetaAddress)> for StealthRegistry {
    fn from_iter<T: IntoIterator<Item = (Address, StealthMetaAddress)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
