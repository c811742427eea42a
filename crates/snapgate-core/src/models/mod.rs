//! Domain models

pub mod artifact;
pub mod resource;

pub use artifact::{ArtifactLocation, Encoding};
pub use resource::ResourceKey;
