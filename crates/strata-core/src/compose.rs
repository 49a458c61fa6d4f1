//! Folding a flattened hierarchy into one effective descriptor.

use crate::resolve::{resolve, substitute};
use crate::CoreError;
use std::collections::BTreeMap;
use strata_schema::defaults::DEFAULT_OS_PASSWORD;
use strata_schema::{Defaults, Descriptor, Partition};
use tracing::{debug, info};

/// Composes a target descriptor from its flattened ancestors.
///
/// Ancestors are folded in reverse of the order [`Hierarchy`](crate::Hierarchy)
/// produces them, so the deepest, earliest-declared includes are applied
/// first and the requesting descriptor itself last. Override-style fields
/// therefore end up with the value closest to the root.
#[derive(Debug, Clone)]
pub struct Composer<'a> {
    layers: Vec<&'a Descriptor>,
    default_password: String,
}

impl<'a> Composer<'a> {
    pub fn new(ancestors: &'a [Descriptor]) -> Self {
        Self {
            layers: ancestors.iter().rev().collect(),
            default_password: DEFAULT_OS_PASSWORD.to_owned(),
        }
    }

    #[must_use]
    pub fn with_defaults(mut self, defaults: &Defaults) -> Self {
        self.default_password.clone_from(&defaults.os_password);
        self
    }

    /// Ancestors in the order they are folded into the target.
    pub fn precedence(&self) -> impl Iterator<Item = &'a Descriptor> + '_ {
        self.layers.iter().copied()
    }

    /// Fold every ancestor into `target` and return it.
    ///
    /// Fails only when the merged variable table contains a reference cycle;
    /// the target is consumed in that case.
    pub fn compose(&self, mut target: Descriptor) -> Result<Descriptor, CoreError> {
        info!(
            "composing '{}' from {} layer(s)",
            target.name,
            self.layers.len()
        );

        self.merge_os(&mut target);
        self.merge_appliances(&mut target);
        self.merge_variables(&mut target)?;
        self.merge_hardware(&mut target);
        self.merge_repos(&mut target);
        self.merge_default_repos(&mut target);
        self.merge_packages(&mut target);
        self.merge_post(&mut target);

        Ok(target)
    }

    /// Feed `apply` the value `get` extracts from every layer that has one.
    fn merge_field<T: ?Sized + 'a>(
        &self,
        get: impl Fn(&'a Descriptor) -> Option<&'a T>,
        mut apply: impl FnMut(&'a T),
    ) {
        for &layer in &self.layers {
            if let Some(value) = get(layer) {
                apply(value);
            }
        }
    }

    fn merge_os(&self, target: &mut Descriptor) {
        let os = &mut target.os;
        self.merge_field(|d| d.os.name.as_deref(), |v| os.name = Some(v.to_owned()));
        self.merge_field(|d| d.os.version.as_deref(), |v| os.version = Some(v.to_owned()));
        self.merge_field(|d| d.os.password.as_deref(), |v| os.password = Some(v.to_owned()));

        if os.password.is_none() {
            os.password = Some(self.default_password.clone());
        }
        debug!(
            "os: {} {}",
            os.name.as_deref().unwrap_or("?"),
            os.version.as_deref().unwrap_or("?")
        );
    }

    fn merge_appliances(&self, target: &mut Descriptor) {
        let own_name = target.name.clone();
        target.appliances = self
            .precedence()
            .filter(|d| d.name != own_name)
            .map(|d| d.name.clone())
            .collect();
    }

    fn merge_variables(&self, target: &mut Descriptor) -> Result<(), CoreError> {
        let vars = &mut target.variables;
        self.merge_field(
            |d| Some(&d.variables),
            |layer| {
                for (key, value) in layer {
                    vars.insert(key.clone(), value.clone());
                }
            },
        );

        let synthetic = [
            ("OS_NAME", target.os.name.clone().unwrap_or_default()),
            ("OS_VERSION", target.os.version.clone().unwrap_or_default()),
            ("ARCH", target.hardware.arch.clone()),
            ("BASE_ARCH", target.hardware.base_arch.clone()),
        ];
        for (key, value) in synthetic {
            vars.insert(key.to_owned(), value);
        }

        resolve(vars)?;
        debug!("resolved {} variable(s)", vars.len());
        Ok(())
    }

    fn merge_hardware(&self, target: &mut Descriptor) {
        let hw = &mut target.hardware;

        self.merge_field(
            |d| Some(&d.hardware.cpus),
            |&cpus| hw.cpus = hw.cpus.max(cpus),
        );

        let mut partitions: BTreeMap<String, Partition> = BTreeMap::new();
        self.merge_field(
            |d| Some(&d.hardware.partitions),
            |layer| {
                for (mount, incoming) in layer {
                    match partitions.get_mut(mount) {
                        Some(recorded) => merge_partition(recorded, incoming),
                        None => {
                            partitions.insert(mount.clone(), incoming.clone());
                        }
                    }
                }
            },
        );
        hw.partitions = partitions;

        self.merge_field(
            |d| Some(&d.hardware.memory),
            |&memory| hw.memory = hw.memory.max(memory),
        );

        debug!(
            "hardware: {} cpu(s), {} MB, {} partition(s)",
            hw.cpus,
            hw.memory,
            hw.partitions.len()
        );
    }

    fn merge_repos(&self, target: &mut Descriptor) {
        let vars = &target.variables;
        let repos = &mut target.repos;
        repos.clear();

        self.merge_field(
            |d| Some(d.repos.as_slice()),
            |layer| {
                for repo in layer {
                    let mut repo = repo.clone();
                    repo.name = substitute(&repo.name, vars);
                    repo.baseurl = repo.baseurl.as_deref().map(|u| substitute(u, vars));
                    repo.mirrorlist = repo.mirrorlist.as_deref().map(|u| substitute(u, vars));
                    repos.push(repo);
                }
            },
        );
    }

    fn merge_default_repos(&self, target: &mut Descriptor) {
        let disabled = self.precedence().any(|d| d.default_repos == Some(false));
        target.default_repos = Some(!disabled);
    }

    fn merge_packages(&self, target: &mut Descriptor) {
        let packages = &mut target.packages;
        packages.includes.clear();
        packages.excludes.clear();

        self.merge_field(
            |d| Some(&d.packages),
            |layer| {
                packages.includes.extend(layer.includes.iter().cloned());
                packages.excludes.extend(layer.excludes.iter().cloned());
            },
        );
    }

    fn merge_post(&self, target: &mut Descriptor) {
        let vars = &target.variables;
        let post = &mut target.post;
        for cmds in post.values_mut() {
            cmds.clear();
        }

        self.merge_field(
            |d| Some(&d.post),
            |layer| {
                for (platform, cmds) in layer {
                    post.entry(platform.clone())
                        .or_default()
                        .extend(cmds.iter().map(|cmd| substitute(cmd, vars)));
                }
            },
        );
    }
}

/// Compose `target` from `ancestors` with built-in defaults.
pub fn compose(target: Descriptor, ancestors: &[Descriptor]) -> Result<Descriptor, CoreError> {
    Composer::new(ancestors).compose(target)
}

/// Merge one layer's partition into the recorded one for the same mount path.
///
/// Options belong to the filesystem type they were written for: a type change
/// drops recorded options, and an absent incoming `options` keeps them.
fn merge_partition(recorded: &mut Partition, incoming: &Partition) {
    recorded.size = recorded.size.max(incoming.size);

    if let Some(fs_type) = &incoming.fs_type {
        if recorded.fs_type.as_ref() != Some(fs_type) {
            recorded.options = None;
            recorded.fs_type = Some(fs_type.clone());
        }
    }
    if let Some(options) = &incoming.options {
        recorded.options = Some(options.clone());
    }
}
