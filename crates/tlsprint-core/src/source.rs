//! Source traits: the three collaborators the engine reconciles against
//!
//! Registry, capability lookup and model inventory are all "sources of
//! truth" for one implementation. [`InMemorySource`] implements all three so
//! the engine can run without network or filesystem access.
use crate::data_model::{Combination, Implementation, Protocol, VersionTag};
use crate::error::SourceError;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// Lists the version tags published for an implementation
#[async_trait]
pub trait RegistryGateway: Send + Sync {
    async fn list_tags(
        &self,
        implementation: &Implementation,
    ) -> Result<BTreeSet<VersionTag>, SourceError>;
}

/// Protocols supported by one version of an implementation.
///
/// Must be a pure function of its arguments. An empty set is a valid answer.
#[async_trait]
pub trait CapabilityResolver: Send + Sync {
    async fn capabilities(
        &self,
        implementation: &Implementation,
        version: &VersionTag,
    ) -> Result<BTreeSet<Protocol>, SourceError>;
}

/// Combinations that already have a learned model.
///
/// An implementation that was never learned yields the empty set, not an error.
#[async_trait]
pub trait ModelInventory: Send + Sync {
    async fn learned(
        &self,
        implementation: &Implementation,
    ) -> Result<BTreeSet<Combination>, SourceError>;
}

/// In-memory registry, capability table and inventory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    tags: HashMap<Implementation, Result<BTreeSet<VersionTag>, SourceError>>,
    capabilities: HashMap<(Implementation, VersionTag), BTreeSet<Protocol>>,
    failing_capabilities: HashMap<Implementation, SourceError>,
    learned: HashMap<Implementation, BTreeSet<Combination>>,
    delays: HashMap<Implementation, Duration>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(mut self, implementation: &str, tags: &[&str]) -> Self {
        self.tags.insert(
            Implementation::new(implementation),
            Ok(tags.iter().map(|t| VersionTag::new(*t)).collect()),
        );
        self
    }

    pub fn with_registry_failure(mut self, implementation: &str, error: SourceError) -> Self {
        self.tags.insert(Implementation::new(implementation), Err(error));
        self
    }

    pub fn with_capabilities(mut self, implementation: &str, version: &str, protocols: &[&str]) -> Self {
        self.capabilities.insert(
            (Implementation::new(implementation), VersionTag::new(version)),
            protocols.iter().map(|p| Protocol::new(*p)).collect(),
        );
        self
    }

    pub fn with_capability_failure(mut self, implementation: &str, error: SourceError) -> Self {
        self.failing_capabilities
            .insert(Implementation::new(implementation), error);
        self
    }

    pub fn with_learned(mut self, implementation: &str, version: &str, protocol: &str) -> Self {
        self.learned
            .entry(Implementation::new(implementation))
            .or_default()
            .insert((VersionTag::new(version), Protocol::new(protocol)));
        self
    }

    /// Delay every registry answer for `implementation`
    pub fn with_registry_delay(mut self, implementation: &str, delay: Duration) -> Self {
        self.delays.insert(Implementation::new(implementation), delay);
        self
    }
}

#[async_trait]
impl RegistryGateway for InMemorySource {
    async fn list_tags(
        &self,
        implementation: &Implementation,
    ) -> Result<BTreeSet<VersionTag>, SourceError> {
        if let Some(delay) = self.delays.get(implementation) {
            tokio::time::sleep(*delay).await;
        }
        self.tags
            .get(implementation)
            .cloned()
            .unwrap_or_else(|| Err(SourceError::UnknownImplementation(implementation.to_string())))
    }
}

#[async_trait]
impl CapabilityResolver for InMemorySource {
    async fn capabilities(
        &self,
        implementation: &Implementation,
        version: &VersionTag,
    ) -> Result<BTreeSet<Protocol>, SourceError> {
        if let Some(error) = self.failing_capabilities.get(implementation) {
            return Err(error.clone());
        }
        Ok(self
            .capabilities
            .get(&(implementation.clone(), version.clone()))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ModelInventory for InMemorySource {
    async fn learned(
        &self,
        implementation: &Implementation,
    ) -> Result<BTreeSet<Combination>, SourceError> {
        Ok(self.learned.get(implementation).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_implementation_fails_registry() {
        let source = InMemorySource::new();
        let err = source
            .list_tags(&Implementation::new("nope"))
            .await
            .unwrap_err();
        assert_eq!(err, SourceError::UnknownImplementation("nope".to_string()));
    }

    #[tokio::test]
    async fn test_missing_entries_are_empty() {
        let source = InMemorySource::new().with_tags("x", &["1.0"]);
        let x = Implementation::new("x");
        assert!(source
            .capabilities(&x, &VersionTag::new("1.0"))
            .await
            .unwrap()
            .is_empty());
        assert!(source.learned(&x).await.unwrap().is_empty());
    }
}
