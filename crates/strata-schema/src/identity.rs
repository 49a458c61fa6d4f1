use crate::types::{DescriptorId, ShortId};
use crate::Descriptor;
use serde::Serialize;

/// Deterministic identity of a descriptor's build-relevant content.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DescriptorIdentity {
    pub id: DescriptorId,
    pub short_id: ShortId,
}

/// Hash the fields that decide whether an appliance must be rebuilt.
///
/// Covers name, summary, version, release, the three OS fields, cpus,
/// memory, partitions and the merged appliance list. Repos, packages,
/// variables and post commands are not part of the identity.
pub fn compute_identity(descriptor: &Descriptor) -> DescriptorIdentity {
    let mut hasher = blake3::Hasher::new();

    field(&mut hasher, "name", &descriptor.name);
    field(&mut hasher, "summary", &descriptor.summary);
    field(&mut hasher, "version", &descriptor.version);
    field(&mut hasher, "release", &descriptor.release);

    let os = &descriptor.os;
    for (key, value) in [
        ("os.name", &os.name),
        ("os.version", &os.version),
        ("os.password", &os.password),
    ] {
        optional_field(&mut hasher, key, value.as_deref());
    }

    field(&mut hasher, "cpus", &descriptor.hardware.cpus.to_string());
    field(&mut hasher, "memory", &descriptor.hardware.memory.to_string());

    for (mount, part) in &descriptor.hardware.partitions {
        field(&mut hasher, "part.mount", mount);
        field(&mut hasher, "part.size", &part.size.to_string());
        optional_field(&mut hasher, "part.type", part.fs_type.as_deref());
        optional_field(&mut hasher, "part.options", part.options.as_deref());
    }
    for appliance in &descriptor.appliances {
        field(&mut hasher, "appliance", appliance);
    }

    let hex = hasher.finalize().to_hex().to_string();
    let short = hex[..12].to_owned();

    DescriptorIdentity {
        id: DescriptorId::new(hex),
        short_id: ShortId::new(short),
    }
}

// Length-prefixed so that adjacent fields cannot run into each other.
fn field(hasher: &mut blake3::Hasher, key: &str, value: &str) {
    hasher.update(format!("{key}:{}:", value.len()).as_bytes());
    hasher.update(value.as_bytes());
    hasher.update(b"\n");
}

fn optional_field(hasher: &mut blake3::Hasher, key: &str, value: Option<&str>) {
    field(hasher, key, value.unwrap_or("\0none"));
}
