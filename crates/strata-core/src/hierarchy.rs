//! Discovery and flattening of the descriptor inclusion tree.

use crate::CoreError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use strata_schema::{parse_descriptor_file, Defaults, Descriptor, DescriptorFormat};
use tracing::debug;

/// Anything that can produce a descriptor given the name it is included under.
pub trait DescriptorSource {
    fn load(&self, name: &str) -> Result<Descriptor, CoreError>;
}

/// Loads `<dir>/<name>.<ext>` files, all sharing the root file's directory and extension.
#[derive(Debug, Clone)]
pub struct FileSource {
    dir: PathBuf,
    extension: Option<String>,
    content_type: Option<String>,
    defaults: Defaults,
}

impl FileSource {
    /// Build a source for the tree rooted at `root`, returning it together with
    /// the root's lookup name (its file stem).
    pub fn for_root(root: &Path, defaults: Defaults) -> Result<(Self, String), CoreError> {
        let name = root
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CoreError::DescriptorNotFound(root.display().to_string()))?
            .to_owned();
        let dir = root
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let extension = root
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_owned);

        Ok((
            Self {
                dir,
                extension,
                content_type: None,
                defaults,
            },
            name,
        ))
    }

    /// Format hint for files whose extension does not identify one.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        match &self.extension {
            Some(ext) => self.dir.join(format!("{name}.{ext}")),
            None => self.dir.join(name),
        }
    }

    pub fn format(&self) -> Result<DescriptorFormat, CoreError> {
        Ok(DescriptorFormat::detect(
            &self.path_for("_"),
            self.content_type.as_deref(),
        )?)
    }
}

impl DescriptorSource for FileSource {
    fn load(&self, name: &str) -> Result<Descriptor, CoreError> {
        let path = self.path_for(name);
        debug!("reading descriptor '{name}' from {}", path.display());
        if !path.is_file() {
            return Err(CoreError::DescriptorNotFound(path.display().to_string()));
        }
        Ok(parse_descriptor_file(
            &path,
            self.content_type.as_deref(),
            name,
            &self.defaults,
        )?)
    }
}

/// In-memory descriptors keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    descriptors: BTreeMap<String, Descriptor>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under its own name, replacing any previous one.
    pub fn insert(&mut self, descriptor: Descriptor) -> &mut Self {
        self.descriptors
            .insert(descriptor.name.clone(), descriptor);
        self
    }
}

impl FromIterator<Descriptor> for MemorySource {
    fn from_iter<I: IntoIterator<Item = Descriptor>>(iter: I) -> Self {
        let mut source = Self::new();
        for d in iter {
            source.insert(d);
        }
        source
    }
}

impl DescriptorSource for MemorySource {
    fn load(&self, name: &str) -> Result<Descriptor, CoreError> {
        debug!("loading descriptor '{name}' from memory");
        self.descriptors
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::DescriptorNotFound(name.to_owned()))
    }
}

/// A flattened inclusion tree.
///
/// The root comes first. Children of a node are visited in reverse of their
/// declaration order, and every child is followed directly by its own
/// flattened subtree. For `a -> [b1, b2]`, `b1 -> [c1]`, `b2 -> [c2]` the
/// order is `[a, b2, c2, b1, c1]`. A descriptor reachable along two paths
/// appears once per path.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    descriptors: Vec<Descriptor>,
}

impl Hierarchy {
    pub fn load(source: &impl DescriptorSource, root: &str) -> Result<Self, CoreError> {
        let mut descriptors = Vec::new();
        let mut path = Vec::new();
        flatten(source, root, &mut path, &mut descriptors)?;
        debug!(
            "flattened hierarchy of '{root}': {} descriptor(s)",
            descriptors.len()
        );
        Ok(Self { descriptors })
    }

    /// Load the tree rooted at a descriptor file.
    pub fn load_file(root: &Path, defaults: Defaults) -> Result<Self, CoreError> {
        let (source, name) = FileSource::for_root(root, defaults)?;
        Self::load(&source, &name)
    }

    /// All descriptors in flattening order, root first.
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn root(&self) -> &Descriptor {
        &self.descriptors[0]
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn into_parts(self) -> (Vec<Descriptor>, Descriptor) {
        let root = self.descriptors[0].clone();
        (self.descriptors, root)
    }
}

fn flatten(
    source: &impl DescriptorSource,
    name: &str,
    path: &mut Vec<String>,
    out: &mut Vec<Descriptor>,
) -> Result<(), CoreError> {
    if path.iter().any(|p| p == name) {
        let mut chain = path.clone();
        chain.push(name.to_owned());
        return Err(CoreError::IncludeCycle { chain });
    }

    let descriptor = source.load(name)?;
    let children = descriptor.appliances.clone();
    out.push(descriptor);

    path.push(name.to_owned());
    for child in children.iter().rev() {
        flatten(source, child, path, out)?;
    }
    path.pop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, children: &[&str]) -> Descriptor {
        let mut d = Descriptor::new(name, &Defaults::default());
        d.appliances = children.iter().map(|c| (*c).to_owned()).collect();
        d
    }

    #[test]
    fn single_descriptor() {
        let source: MemorySource = [node("a", &[])].into_iter().collect();
        let h = Hierarchy::load(&source, "a").unwrap();
        assert_eq!(h.names(), vec!["a"]);
        assert_eq!(h.root().name, "a");
    }

    #[test]
    fn chain_of_two() {
        let source: MemorySource = [node("a", &["b"]), node("b", &[])].into_iter().collect();
        let h = Hierarchy::load(&source, "a").unwrap();
        assert_eq!(h.names(), vec!["a", "b"]);
    }

    #[test]
    fn tree_is_flattened_depth_first_in_reverse_declaration_order() {
        let source: MemorySource = [
            node("a", &["b1", "b2"]),
            node("b1", &["c1"]),
            node("b2", &["c2"]),
            node("c1", &[]),
            node("c2", &[]),
        ]
        .into_iter()
        .collect();

        let h = Hierarchy::load(&source, "a").unwrap();
        assert_eq!(h.names(), vec!["a", "b2", "c2", "b1", "c1"]);
    }

    #[test]
    fn shared_descendant_appears_once_per_path() {
        let source: MemorySource = [
            node("a", &["b", "c"]),
            node("b", &["base"]),
            node("c", &["base"]),
            node("base", &[]),
        ]
        .into_iter()
        .collect();

        let h = Hierarchy::load(&source, "a").unwrap();
        assert_eq!(h.names(), vec!["a", "c", "base", "b", "base"]);
    }

    #[test]
    fn include_cycle_is_rejected() {
        let source: MemorySource = [node("a", &["b"]), node("b", &["c"]), node("c", &["a"])]
            .into_iter()
            .collect();

        match Hierarchy::load(&source, "a") {
            Err(CoreError::IncludeCycle { chain }) => {
                assert_eq!(chain, vec!["a", "b", "c", "a"]);
            }
            other => panic!("expected include cycle, got {other:?}"),
        }
    }

    #[test]
    fn missing_include_is_reported() {
        let source: MemorySource = [node("a", &["ghost"])].into_iter().collect();
        let err = Hierarchy::load(&source, "a").unwrap_err();
        assert!(matches!(err, CoreError::DescriptorNotFound(ref n) if n == "ghost"));
    }

    #[test]
    fn into_parts_returns_root_separately() {
        let source: MemorySource = [node("a", &["b"]), node("b", &[])].into_iter().collect();
        let (all, root) = Hierarchy::load(&source, "a").unwrap().into_parts();
        assert_eq!(all.len(), 2);
        assert_eq!(root.name, "a");
        assert_eq!(all[0], root);
    }

    #[test]
    fn file_source_resolves_siblings_with_root_extension() {
        let (source, name) =
            FileSource::for_root(Path::new("/defs/jeos.appl"), Defaults::default()).unwrap();
        assert_eq!(name, "jeos");
        assert_eq!(source.path_for("base"), PathBuf::from("/defs/base.appl"));
        assert_eq!(source.format().unwrap(), DescriptorFormat::Yaml);
    }

    #[test]
    fn file_source_content_type_fallback() {
        let (source, _) =
            FileSource::for_root(Path::new("/defs/jeos"), Defaults::default()).unwrap();
        assert!(source.format().is_err());
        let source = source.with_content_type("text/yaml");
        assert_eq!(source.path_for("base"), PathBuf::from("/defs/base"));
        assert_eq!(source.format().unwrap(), DescriptorFormat::Yaml);
    }
}
