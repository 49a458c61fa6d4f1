//! Raw descriptor documents as written on disk, before defaults are applied.
//!
//! Every field is optional so that "absent" can be told apart from "set to the
//! default value". [`Descriptor::from_document`](crate::Descriptor::from_document)
//! turns a document into a [`Descriptor`](crate::Descriptor).

use crate::descriptor::{Partition, Repo};
use crate::{Defaults, Descriptor, DescriptorError};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DescriptorDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub release: Option<String>,
    #[serde(default, deserialize_with = "scalar_map")]
    pub variables: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub os: Option<OsDocument>,
    #[serde(default)]
    pub hardware: Option<HardwareDocument>,
    #[serde(default)]
    pub packages: Option<PackagesDocument>,
    #[serde(default)]
    pub repos: Option<Vec<Repo>>,
    #[serde(default)]
    pub post: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    pub appliances: Option<Vec<String>>,
    #[serde(default)]
    pub default_repos: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OsDocument {
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HardwareDocument {
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub base_arch: Option<String>,
    #[serde(default)]
    pub cpus: Option<u32>,
    #[serde(default)]
    pub memory: Option<u64>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub partitions: Option<BTreeMap<String, Partition>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PackagesDocument {
    #[serde(default)]
    pub includes: Option<Vec<String>>,
    #[serde(default)]
    pub excludes: Option<Vec<String>>,
}

/// Serialization format of a descriptor document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorFormat {
    Yaml,
    Toml,
    Xml,
}

impl DescriptorFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "appl" | "yml" | "yaml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "application/x-yaml" | "text/yaml" => Some(Self::Yaml),
            "application/toml" => Some(Self::Toml),
            "application/xml" | "text/xml" | "application/x-xml" => Some(Self::Xml),
            _ => None,
        }
    }

    /// Pick the format from the file extension, falling back to the content type.
    pub fn detect(path: &Path, content_type: Option<&str>) -> Result<Self, DescriptorError> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .or_else(|| content_type.and_then(Self::from_content_type))
            .ok_or_else(|| DescriptorError::UnsupportedFormat {
                path: path.display().to_string(),
            })
    }
}

pub fn parse_document_str(
    input: &str,
    format: DescriptorFormat,
) -> Result<Option<DescriptorDocument>, DescriptorError> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    match format {
        DescriptorFormat::Yaml => Ok(serde_yaml::from_str(input)?),
        DescriptorFormat::Toml => Ok(Some(toml::from_str(input)?)),
        DescriptorFormat::Xml => Err(DescriptorError::UnsupportedXml {
            path: "<inline>".to_owned(),
        }),
    }
}

/// Read and parse one descriptor file.
///
/// `fallback_name` names the descriptor when the document has no `name` key.
pub fn parse_descriptor_file(
    path: &Path,
    content_type: Option<&str>,
    fallback_name: &str,
    defaults: &Defaults,
) -> Result<Descriptor, DescriptorError> {
    let format = DescriptorFormat::detect(path, content_type)?;
    if format == DescriptorFormat::Xml {
        return Err(DescriptorError::UnsupportedXml {
            path: path.display().to_string(),
        });
    }

    let content = fs::read_to_string(path)?;
    let doc = parse_document_str(&content, format)?.ok_or_else(|| DescriptorError::Empty {
        path: path.display().to_string(),
    })?;
    Ok(Descriptor::from_document(doc, fallback_name, defaults))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format!("{f:?}"),
            Self::Str(s) => s,
        }
    }
}

/// Accept strings, numbers and booleans as a string.
///
/// Integers and booleans keep their written form and floats keep a fractional
/// part (`6.0` stays `"6.0"`). Floats are still parsed as numbers, so a version
/// like `13.10` arrives as `"13.1"` and must be quoted in the document.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(Scalar::into_string))
}

fn scalar_map<'de, D>(deserializer: D) -> Result<Option<BTreeMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Scalar>>::deserialize(deserializer)?;
    Ok(raw.map(|m| m.into_iter().map(|(k, v)| (k, v.into_string())).collect()))
}
