use std::{collections::BTreeSet, sync::Arc};

use crate::{DeliveryError, lookup::RecipientLookup};

/// Local mailbox identifiers a message goes to. Never empty once resolved.
pub type ResolvedRecipientSet = BTreeSet<String>;

/// Turns candidate addresses into a deduplicated set of local mailboxes.
#[derive(Clone)]
pub struct RecipientResolver {
    lookup: Arc<dyn RecipientLookup>,
}

impl RecipientResolver {
    pub fn new(lookup: Arc<dyn RecipientLookup>) -> Self {
        Self { lookup }
    }

    /// Resolve every address, skipping (with a warning) those without a
    /// mapping. Several addresses may map to one mailbox; it appears once.
    ///
    /// # Errors
    ///
    /// [`DeliveryError::RecipientResolution`] if nothing resolved, or
    /// [`DeliveryError::Lookup`] if the lookup itself failed.
    pub async fn resolve(&self, addresses: &[String]) -> Result<ResolvedRecipientSet, DeliveryError> {
        let mut resolved = ResolvedRecipientSet::new();

        for address in addresses {
            match self.lookup.lookup(address).await? {
                Some(mailbox) => {
                    tracing::debug!(%address, %mailbox, "Resolved recipient");
                    resolved.insert(mailbox);
                }
                None => {
                    tracing::warn!(%address, "Recipient lookup returned no result");
                }
            }
        }

        if resolved.is_empty() {
            return Err(DeliveryError::RecipientResolution {
                candidates: addresses.len(),
            });
        }

        Ok(resolved)
    }
}
