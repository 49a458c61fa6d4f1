use crate::document::{DescriptorDocument, HardwareDocument, OsDocument, PackagesDocument};
use crate::Defaults;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One appliance configuration layer, or the effective result of composing several.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Descriptor {
    pub name: String,
    pub summary: String,
    pub version: String,
    pub release: String,
    pub variables: BTreeMap<String, String>,
    pub os: OsSection,
    pub hardware: HardwareSection,
    pub packages: PackagesSection,
    pub repos: Vec<Repo>,
    pub post: BTreeMap<String, Vec<String>>,
    /// Names of included descriptors. After composition: every merged ancestor except self.
    pub appliances: Vec<String>,
    /// `None` means the layer expresses no opinion.
    pub default_repos: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OsSection {
    pub name: Option<String>,
    pub version: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HardwareSection {
    pub arch: String,
    pub base_arch: String,
    pub cpus: u32,
    /// Memory in megabytes.
    pub memory: u64,
    pub network: String,
    /// Keyed by mount path.
    pub partitions: BTreeMap<String, Partition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Partition {
    /// Size in gigabytes.
    pub size: u64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub fs_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackagesSection {
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
}

/// A package repository. Keys other than `name`, `baseurl` and `mirrorlist`
/// are carried through untouched in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseurl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirrorlist: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Repo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            baseurl: None,
            mirrorlist: None,
            extra: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_baseurl(mut self, url: impl Into<String>) -> Self {
        self.baseurl = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_mirrorlist(mut self, url: impl Into<String>) -> Self {
        self.mirrorlist = Some(url.into());
        self
    }
}

/// Build-tree locations derived from a descriptor's OS, architecture and name.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DescriptorPaths {
    /// `<os name>/<os version>`
    pub os: PathBuf,
    /// `<arch>/<os>`
    pub main: PathBuf,
    /// `appliances/<main>/<name>`
    pub appliance: PathBuf,
    /// `build/<appliance>`
    pub build: PathBuf,
}

impl Descriptor {
    /// An empty descriptor with hardware defaults applied and the host architecture detected.
    pub fn new(name: impl Into<String>, defaults: &Defaults) -> Self {
        let mut descriptor = Self::blank(name.into(), defaults);
        descriptor.init_arch();
        descriptor
    }

    fn blank(name: String, defaults: &Defaults) -> Self {
        Self {
            name,
            summary: String::new(),
            version: "1".to_owned(),
            release: "0".to_owned(),
            variables: BTreeMap::new(),
            os: OsSection::default(),
            hardware: HardwareSection {
                arch: String::new(),
                base_arch: String::new(),
                cpus: defaults.cpus,
                memory: defaults.memory,
                network: defaults.network.clone(),
                partitions: BTreeMap::new(),
            },
            packages: PackagesSection::default(),
            repos: Vec::new(),
            post: BTreeMap::new(),
            appliances: Vec::new(),
            default_repos: None,
        }
    }

    /// Build a descriptor from a parsed document, filling absent fields from `defaults`.
    ///
    /// `fallback_name` is used when the document carries no `name`; sources
    /// pass the lookup key the document was found under.
    pub fn from_document(doc: DescriptorDocument, fallback_name: &str, defaults: &Defaults) -> Self {
        let mut d = Self::blank(
            doc.name.unwrap_or_else(|| fallback_name.to_owned()),
            defaults,
        );

        if let Some(summary) = doc.summary {
            d.summary = summary;
        }
        if let Some(version) = doc.version {
            d.version = version;
        }
        if let Some(release) = doc.release {
            d.release = release;
        }
        if let Some(variables) = doc.variables {
            d.variables = variables;
        }
        if let Some(OsDocument {
            name,
            version,
            password,
        }) = doc.os
        {
            d.os = OsSection {
                name,
                version,
                password,
            };
        }
        if let Some(hw) = doc.hardware {
            apply_hardware(&mut d.hardware, hw);
        }
        if let Some(PackagesDocument { includes, excludes }) = doc.packages {
            d.packages.includes = includes.unwrap_or_default();
            d.packages.excludes = excludes.unwrap_or_default();
        }
        if let Some(repos) = doc.repos {
            d.repos = repos;
        }
        if let Some(post) = doc.post {
            d.post = post;
        }
        if let Some(appliances) = doc.appliances {
            d.appliances = appliances;
        }
        d.default_repos = doc.default_repos;

        d.init_arch();
        d
    }

    /// Fill in `hardware.arch` from the host when unset, then derive `base_arch`.
    pub fn init_arch(&mut self) -> &mut Self {
        if self.hardware.arch.is_empty() {
            self.hardware.arch = host_arch().to_owned();
        }
        if self.hardware.base_arch.is_empty() {
            self.hardware.base_arch = if self.is_64bit() { "x86_64" } else { "i386" }.to_owned();
        }
        self
    }

    pub fn is_64bit(&self) -> bool {
        self.hardware.arch == "x86_64"
    }

    pub fn uses_default_repos(&self) -> bool {
        self.default_repos.unwrap_or(true)
    }

    pub fn paths(&self) -> DescriptorPaths {
        let os = PathBuf::from(self.os.name.as_deref().unwrap_or_default())
            .join(self.os.version.as_deref().unwrap_or_default());
        let main = PathBuf::from(&self.hardware.arch).join(&os);
        let appliance = PathBuf::from("appliances").join(&main).join(&self.name);
        let build = PathBuf::from("build").join(&appliance);
        DescriptorPaths {
            os,
            main,
            appliance,
            build,
        }
    }

    /// Two descriptors are equivalent when their build-relevant identity matches.
    pub fn is_equivalent(&self, other: &Descriptor) -> bool {
        crate::compute_identity(self) == crate::compute_identity(other)
    }
}

fn apply_hardware(hw: &mut HardwareSection, doc: HardwareDocument) {
    if let Some(arch) = doc.arch {
        hw.arch = arch;
    }
    if let Some(base_arch) = doc.base_arch {
        hw.base_arch = base_arch;
    }
    if let Some(cpus) = doc.cpus {
        hw.cpus = cpus;
    }
    if let Some(memory) = doc.memory {
        hw.memory = memory;
    }
    if let Some(network) = doc.network {
        hw.network = network;
    }
    if let Some(partitions) = doc.partitions {
        hw.partitions = partitions;
    }
}

/// Host machine architecture in `uname -m` spelling.
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "i686",
        "arm" => "armv7l",
        other => other,
    }
}
