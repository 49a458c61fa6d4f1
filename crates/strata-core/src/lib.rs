//! Hierarchy flattening, field composition, and variable resolution for Strata.
//!
//! A root descriptor names the descriptors it includes; [`Hierarchy`] walks that
//! tree through a [`DescriptorSource`] and flattens it into one ordered
//! sequence. [`Composer`] folds the sequence into a target descriptor with a
//! per-field strategy (override, numeric max, list union, merge by key) and
//! resolves `#NAME#` variable placeholders, yielding the effective descriptor
//! a build works from.

pub mod compose;
pub mod hierarchy;
pub mod resolve;

pub use compose::{compose, Composer};
pub use hierarchy::{DescriptorSource, FileSource, Hierarchy, MemorySource};
pub use resolve::{placeholder, resolve, substitute, ResolveError};

use std::path::Path;
use strata_schema::{Defaults, Descriptor};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("descriptor error: {0}")]
    Descriptor(#[from] strata_schema::DescriptorError),
    #[error("appliance descriptor not found: {0}")]
    DescriptorNotFound(String),
    #[error("appliance include cycle: {}", .chain.join(" -> "))]
    IncludeCycle { chain: Vec<String> },
    #[error(transparent)]
    VariableCycle(#[from] ResolveError),
}

/// Load the inclusion tree rooted at `root` and compose its effective descriptor.
pub fn compose_file(root: &Path, defaults: &Defaults) -> Result<Descriptor, CoreError> {
    let hierarchy = Hierarchy::load_file(root, defaults.clone())?;
    let (ancestors, target) = hierarchy.into_parts();
    Composer::new(&ancestors)
        .with_defaults(defaults)
        .compose(target)
}
