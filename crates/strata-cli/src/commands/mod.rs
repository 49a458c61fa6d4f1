pub mod completions;
pub mod compose;
pub mod identity;
pub mod man_pages;
pub mod paths;
pub mod tree;
pub mod vars;

use std::path::Path;
use strata_core::{Composer, FileSource, Hierarchy};
use strata_schema::{Defaults, Descriptor};
use tracing::debug;

pub const BIN_NAME: &str = "strata";

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_DESCRIPTOR_ERROR: u8 = 2;
pub const EXIT_VARIABLE_ERROR: u8 = 3;

/// Settings shared by every descriptor command.
#[derive(Debug, Clone)]
pub struct Context {
    pub defaults: Defaults,
    pub content_type: Option<String>,
    pub json: bool,
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn yaml(value: &impl serde::Serialize) -> Result<String, String> {
    serde_yaml::to_string(value).map_err(|e| format!("YAML serialization failed: {e}"))
}

pub fn load_hierarchy(ctx: &Context, root: &Path) -> Result<Hierarchy, String> {
    debug!("loading descriptor tree from {}", root.display());
    let (mut source, name) =
        FileSource::for_root(root, ctx.defaults.clone()).map_err(|e| e.to_string())?;
    if let Some(content_type) = &ctx.content_type {
        source = source.with_content_type(content_type.clone());
    }
    Hierarchy::load(&source, &name).map_err(|e| e.to_string())
}

pub fn load_effective(ctx: &Context, root: &Path) -> Result<Descriptor, String> {
    let (ancestors, target) = load_hierarchy(ctx, root)?.into_parts();
    Composer::new(&ancestors)
        .with_defaults(&ctx.defaults)
        .compose(target)
        .map_err(|e| e.to_string())
}
