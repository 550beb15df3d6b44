//! In-process exclusion for objects being delivered.
//!
//! The push endpoint and the retry worker can receive the same object at
//! the same time. A claim keeps the second one from opening a parallel LMTP
//! session for it. Separate processes are not coordinated.

use std::sync::Arc;

use dashmap::DashSet;

type ObjectKey = (String, String);

#[derive(Debug, Clone, Default)]
pub struct ClaimSet {
    claimed: Arc<DashSet<ObjectKey>>,
}

impl ClaimSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `(bucket, key)`, or `None` if someone already holds it.
    ///
    /// The claim is released when the returned guard is dropped.
    #[must_use]
    pub fn try_claim(&self, bucket: &str, key: &str) -> Option<Claim> {
        let object = (bucket.to_string(), key.to_string());
        self.claimed.insert(object.clone()).then(|| Claim {
            claimed: Arc::clone(&self.claimed),
            object,
        })
    }
}

/// Held for the duration of one delivery.
#[derive(Debug)]
pub struct Claim {
    claimed: Arc<DashSet<ObjectKey>>,
    object: ObjectKey,
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.claimed.remove(&self.object);
    }
}
