//! Reconciliation Engine: registry tags × capabilities − learned models → ordered targets
use crate::context::RunContext;
use crate::data_model::{
    Combination, Implementation, ImplementationReport, ImplementationStatus, Protocol,
    Reconciliation, Target, VersionTag,
};
use crate::error::{ReconcileError, SourceError};
use crate::source::{CapabilityResolver, ModelInventory, RegistryGateway};
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn, Instrument};

pub struct ReconciliationEngine {
    registry: Arc<dyn RegistryGateway>,
    capabilities: Arc<dyn CapabilityResolver>,
    inventory: Arc<dyn ModelInventory>,
}

/// What one implementation adds to the run
struct Contribution {
    report: ImplementationReport,
    targets: Vec<Target>,
}

impl Contribution {
    fn skipped(implementation: &Implementation, err: &SourceError) -> Self {
        Self {
            report: ImplementationReport::skipped(implementation.clone(), err.to_string()),
            targets: Vec::new(),
        }
    }
}

impl ReconciliationEngine {
    pub fn new(
        registry: Arc<dyn RegistryGateway>,
        capabilities: Arc<dyn CapabilityResolver>,
        inventory: Arc<dyn ModelInventory>,
    ) -> Self {
        Self {
            registry,
            capabilities,
            inventory,
        }
    }

    /// Use one value as registry, capability resolver and inventory
    pub fn from_source<S>(source: Arc<S>) -> Self
    where
        S: RegistryGateway + CapabilityResolver + ModelInventory + 'static,
    {
        Self {
            registry: source.clone(),
            capabilities: source.clone(),
            inventory: source,
        }
    }

    /// Compute the targets for `implementations`, in the order given.
    ///
    /// Registry and capability failures (timeouts included) skip the affected
    /// implementation. Inventory failures other than timeouts abort the run.
    pub async fn reconcile(
        &self,
        implementations: &[Implementation],
        ctx: &RunContext,
    ) -> Result<Reconciliation, ReconcileError> {
        let span = info_span!("reconcile", run_id = %ctx.run_id);
        async {
            let start = Instant::now();

            let contributions = if ctx.concurrent {
                join_all(
                    implementations
                        .iter()
                        .map(|implementation| self.reconcile_implementation(implementation, ctx)),
                )
                .await
            } else {
                let mut contributions = Vec::with_capacity(implementations.len());
                for implementation in implementations {
                    contributions.push(self.reconcile_implementation(implementation, ctx).await);
                }
                contributions
            };

            // join_all yields in input order, never completion order
            let mut targets = Vec::new();
            let mut reports = Vec::with_capacity(contributions.len());
            for contribution in contributions {
                let contribution = contribution?;
                targets.extend(contribution.targets);
                reports.push(contribution.report);
            }

            let skipped = reports.iter().filter(|r| r.is_skipped()).count();
            info!(
                total = targets.len(),
                implementations = reports.len(),
                skipped,
                latency_ms = start.elapsed().as_millis() as u64,
                "found {} tag-protocol combinations to learn in total",
                targets.len()
            );

            Ok::<_, ReconcileError>(Reconciliation {
                run_id: ctx.run_id.clone(),
                targets,
                reports,
            })
        }
        .instrument(span)
        .await
    }

    async fn reconcile_implementation(
        &self,
        implementation: &Implementation,
        ctx: &RunContext,
    ) -> Result<Contribution, ReconcileError> {
        let span = info_span!("implementation", implementation = %implementation);
        async {
            let tags = match bounded(ctx.call_timeout, self.registry.list_tags(implementation)).await {
                Ok(tags) => tags,
                Err(err) => {
                    warn!(error = %err, "failed to retrieve tags for '{}'", implementation);
                    return Ok(Contribution::skipped(implementation, &err));
                }
            };
            info!(tags = tags.len(), "found {} tags in registry", tags.len());

            let lookups = tags.iter().map(|tag| async move {
                bounded(
                    ctx.call_timeout,
                    self.capabilities.capabilities(implementation, tag),
                )
                .await
                .map(|protocols| (tag, protocols))
            });
            let mut capability_map: BTreeMap<&VersionTag, BTreeSet<Protocol>> = BTreeMap::new();
            for lookup in join_all(lookups).await {
                match lookup {
                    Ok((tag, protocols)) => {
                        capability_map.insert(tag, protocols);
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to resolve capabilities for '{}'", implementation);
                        return Ok(Contribution::skipped(implementation, &err));
                    }
                }
            }

            let possible: BTreeSet<Combination> = capability_map
                .iter()
                .flat_map(|(tag, protocols)| {
                    protocols
                        .iter()
                        .map(move |protocol| ((*tag).clone(), protocol.clone()))
                })
                .collect();
            info!(
                possible = possible.len(),
                "found {} possible tag-protocol combinations",
                possible.len()
            );

            let learned = match bounded(ctx.call_timeout, self.inventory.learned(implementation)).await {
                Ok(learned) => learned,
                Err(err @ SourceError::Timeout(_)) => {
                    warn!(error = %err, "model inventory timed out for '{}'", implementation);
                    return Ok(Contribution::skipped(implementation, &err));
                }
                Err(source) => {
                    return Err(ReconcileError::Inventory {
                        implementation: implementation.to_string(),
                        source,
                    })
                }
            };
            info!(
                learned = learned.len(),
                "found {} learned tag-protocol combinations",
                learned.len()
            );

            // Set difference over a BTreeSet comes out version-then-protocol ascending
            let targets: Vec<Target> = possible
                .difference(&learned)
                .map(|(version, protocol)| Target {
                    implementation: implementation.clone(),
                    version: version.clone(),
                    protocol: protocol.clone(),
                    capabilities: capability_map.get(version).cloned().unwrap_or_default(),
                })
                .collect();
            info!(
                to_learn = targets.len(),
                "found {} tag-protocol combinations to learn",
                targets.len()
            );

            Ok(Contribution {
                report: ImplementationReport {
                    implementation: implementation.clone(),
                    status: ImplementationStatus::Reconciled,
                    tags: tags.len(),
                    possible: possible.len(),
                    learned: learned.len(),
                    to_learn: targets.len(),
                },
                targets,
            })
        }
        .instrument(span)
        .await
    }
}

/// Bound a collaborator call; running out of time is reported as [`SourceError::Timeout`]
async fn bounded<T, F>(limit: Option<Duration>, call: F) -> Result<T, SourceError>
where
    F: Future<Output = Result<T, SourceError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(SourceError::Timeout(limit))),
        None => call.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySource;

    fn imps(names: &[&str]) -> Vec<Implementation> {
        names.iter().map(|n| Implementation::new(n)).collect()
    }

    fn pairs(reconciliation: &Reconciliation, implementation: &str) -> Vec<(String, String)> {
        let implementation = Implementation::new(implementation);
        reconciliation
            .targets_for(&implementation)
            .map(|t| (t.version.to_string(), t.protocol.to_string()))
            .collect()
    }

    fn example_source() -> InMemorySource {
        InMemorySource::new()
            .with_tags("x", &["1.0.2", "1.0.1"])
            .with_capabilities("x", "1.0.1", &["A"])
            .with_capabilities("x", "1.0.2", &["A", "B"])
            .with_learned("x", "1.0.1", "A")
    }

    #[tokio::test]
    async fn test_example_scenario() {
        let engine = ReconciliationEngine::from_source(Arc::new(example_source()));
        let result = engine
            .reconcile(&imps(&["x"]), &RunContext::new())
            .await
            .unwrap();

        assert_eq!(
            pairs(&result, "x"),
            vec![
                ("1.0.2".to_string(), "A".to_string()),
                ("1.0.2".to_string(), "B".to_string())
            ]
        );
        let first = &result.targets[0];
        assert_eq!(
            first.capabilities.iter().map(Protocol::as_str).collect::<Vec<_>>(),
            vec!["A", "B"]
        );
        assert_eq!(result.count_for(&Implementation::new("x")), 2);
    }

    #[tokio::test]
    async fn test_registry_failure_is_isolated() {
        let source = example_source()
            .with_registry_failure("y", SourceError::Transport("connection refused".into()));
        let engine = ReconciliationEngine::from_source(Arc::new(source));
        let result = engine
            .reconcile(&imps(&["y", "x"]), &RunContext::new())
            .await
            .unwrap();

        assert!(pairs(&result, "y").is_empty());
        assert_eq!(pairs(&result, "x").len(), 2);
        assert_eq!(result.skipped().count(), 1);
        assert!(result.reports[0].is_skipped());
    }

    #[tokio::test]
    async fn test_capability_failure_skips_implementation() {
        let source = example_source()
            .with_tags("z", &["3.0"])
            .with_capability_failure("z", SourceError::Malformed("bad table".into()));
        let engine = ReconciliationEngine::from_source(Arc::new(source));
        let result = engine
            .reconcile(&imps(&["x", "z"]), &RunContext::new())
            .await
            .unwrap();

        assert_eq!(result.total(), 2);
        assert!(result.reports[1].is_skipped());
    }

    #[tokio::test]
    async fn test_empty_capabilities_contribute_nothing() {
        let source = InMemorySource::new()
            .with_tags("x", &["0.9", "1.0"])
            .with_capabilities("x", "1.0", &["TLS12"]);
        let engine = ReconciliationEngine::from_source(Arc::new(source));
        let result = engine
            .reconcile(&imps(&["x"]), &RunContext::new())
            .await
            .unwrap();

        assert_eq!(pairs(&result, "x"), vec![("1.0".to_string(), "TLS12".to_string())]);
        assert_eq!(result.reports[0].tags, 2);
        assert_eq!(result.reports[0].possible, 1);
    }

    #[tokio::test]
    async fn test_no_tags_is_not_an_error() {
        let source = InMemorySource::new().with_tags("x", &[]);
        let engine = ReconciliationEngine::from_source(Arc::new(source));
        let result = engine
            .reconcile(&imps(&["x"]), &RunContext::new())
            .await
            .unwrap();

        assert_eq!(result.total(), 0);
        assert_eq!(result.reports[0].status, ImplementationStatus::Reconciled);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let source = example_source()
            .with_tags("slow", &["1.0"])
            .with_capabilities("slow", "1.0", &["TLS12"])
            .with_registry_delay("slow", Duration::from_millis(500));
        let engine = ReconciliationEngine::from_source(Arc::new(source));
        let ctx = RunContext::new().with_timeout(Some(Duration::from_millis(50)));
        let result = engine.reconcile(&imps(&["slow", "x"]), &ctx).await.unwrap();

        assert!(pairs(&result, "slow").is_empty());
        assert_eq!(pairs(&result, "x").len(), 2);
        match &result.reports[0].status {
            ImplementationStatus::Skipped { reason } => assert!(reason.starts_with("TIMEOUT/")),
            other => panic!("expected skipped, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_output_order_ignores_completion_order() {
        // "a" answers last but must still come first
        let source = InMemorySource::new()
            .with_tags("a", &["1.0"])
            .with_capabilities("a", "1.0", &["TLS12"])
            .with_registry_delay("a", Duration::from_millis(100))
            .with_tags("b", &["1.0"])
            .with_capabilities("b", "1.0", &["TLS12"]);
        let engine = ReconciliationEngine::from_source(Arc::new(source));

        let concurrent = engine
            .reconcile(&imps(&["a", "b"]), &RunContext::new())
            .await
            .unwrap();
        let sequential = engine
            .reconcile(&imps(&["a", "b"]), &RunContext::new().sequential())
            .await
            .unwrap();

        let names = |r: &Reconciliation| {
            r.targets
                .iter()
                .map(|t| t.implementation.to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&concurrent), vec!["a", "b"]);
        assert_eq!(concurrent.targets, sequential.targets);
    }
}
