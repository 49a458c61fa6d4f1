//! Appliance descriptor model, parsing, defaults, and identity for Strata.
//!
//! This crate defines the schema layer: the fixed-shape [`Descriptor`] that
//! every configuration layer and every composed result is expressed in, raw
//! on-disk documents (`DescriptorDocument`, YAML or TOML), the defaults table
//! applied at creation time ([`Defaults`]), and the deterministic identity
//! used to detect whether an effective descriptor changed between builds.

pub mod defaults;
pub mod descriptor;
pub mod document;
pub mod identity;
pub mod types;

pub use defaults::Defaults;
pub use descriptor::{
    host_arch, Descriptor, DescriptorPaths, HardwareSection, OsSection, PackagesSection,
    Partition, Repo,
};
pub use document::{parse_descriptor_file, parse_document_str, DescriptorDocument, DescriptorFormat};
pub use identity::{compute_identity, DescriptorIdentity};
pub use types::{DescriptorId, ShortId};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("failed to read descriptor file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML descriptor: {0}")]
    ParseYaml(#[from] serde_yaml::Error),
    #[error("failed to parse TOML descriptor: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("unsupported file format for appliance descriptor '{path}'")]
    UnsupportedFormat { path: String },
    #[error("reading XML descriptors is not supported: '{path}'")]
    UnsupportedXml { path: String },
    #[error("descriptor file '{path}' is empty")]
    Empty { path: String },
    #[error("invalid defaults file: {0}")]
    Defaults(String),
}
