//! tlsprint registry: where tags and capabilities come from
pub mod capabilities;
pub mod docker;

pub use capabilities::{CapabilityMatrix, CapabilityRule, CapabilityTable, CAPABILITIES_FILE};
pub use docker::{parse_tag_listing, DockerRegistry, RegistryConfig, TagPage};
