//! tlsprint core: version ordering, source traits and the reconciliation engine
//!
//! Given the tags a registry publishes for each implementation, the protocols
//! each tag supports and the models already learned, the engine produces the
//! ordered list of (implementation, version, protocol) targets still to learn.

pub mod context;
pub mod data_model;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod source;
pub mod version;

pub use context::RunContext;
pub use data_model::{
    Combination, Implementation, ImplementationReport, ImplementationStatus, LearnedEntry,
    Protocol, Reconciliation, Target, VersionTag, MODEL_FILE_NAME,
};
pub use engine::ReconciliationEngine;
pub use error::{ReconcileError, SourceError};
pub use inventory::{discover_implementations, ModelDirectory};
pub use source::{CapabilityResolver, InMemorySource, ModelInventory, RegistryGateway};
pub use version::{compare_versions, VersionRange};
