//! Consumer identity and the sources that mint it.
//!
//! The identity only namespaces claimed filenames inside `working/` so that
//! concurrent claimants never collide. A random identity makes it harder to
//! trace "lost" files back to a failed node; a stable host-derived name gives
//! each instance a consistent trail. Both strategies are available behind
//! [`IdentitySource`], and tests can pin an identity with [`FixedIdentity`].

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque per-instance identity, unique among concurrent claimants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsumerId(String);

impl ConsumerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where identities come from. Injectable so tests stay deterministic.
pub trait IdentitySource {
    fn next(&self) -> ConsumerId;
}

/// Random identity: a dashless UUIDv4 per call.
pub struct RandomIdentity;

impl IdentitySource for RandomIdentity {
    fn next(&self) -> ConsumerId {
        ConsumerId::new(Uuid::new_v4().simple().to_string())
    }
}

/// Fixed identity: always the same name, e.g. a hostname or `node-1` in tests.
pub struct FixedIdentity(ConsumerId);

impl FixedIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(ConsumerId::new(name))
    }
}

impl IdentitySource for FixedIdentity {
    fn next(&self) -> ConsumerId {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_identities_are_unique_and_dashless() {
        let source = RandomIdentity;
        let a = source.next();
        let b = source.next();

        assert_ne!(a, b);
        assert!(!a.as_str().contains('-'));
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn fixed_identity_is_stable() {
        let source = FixedIdentity::new("node-1");
        assert_eq!(source.next(), source.next());
        assert_eq!(source.next().as_str(), "node-1");
    }
}
