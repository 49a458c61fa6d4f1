//! Descriptor trees read from disk.

use std::fs;
use std::path::{Path, PathBuf};
use strata_core::{compose_file, CoreError, Hierarchy};
use strata_schema::{Defaults, DescriptorError};

fn write(dir: &Path, file: &str, content: &str) -> PathBuf {
    let path = dir.join(file);
    fs::write(&path, content).unwrap();
    path
}

fn jeos_tree(dir: &Path) -> PathBuf {
    write(
        dir,
        "base.appl",
        r#"
name: base
os:
  name: fedora
  version: 13
hardware:
  cpus: 2
  partitions:
    "/":
      size: 2
      type: ext3
      options: noatime
packages:
  includes:
    - bash
repos:
  - name: fedora-#OS_VERSION#
    mirrorlist: "https://mirrors.fedoraproject.org/metalink?repo=fedora-#OS_VERSION#&arch=#BASE_ARCH#"
post:
  base:
    - "echo base on #OS_NAME#"
"#,
    );
    write(
        dir,
        "jeos.appl",
        r#"
name: jeos
summary: Just Enough Operating System
appliances:
  - base
hardware:
  arch: x86_64
  memory: 1024
  partitions:
    "/":
      size: 4
      type: ext4
variables:
  GREETING: "hello from #OS_NAME#"
packages:
  includes:
    - openssh-server
post:
  base:
    - "echo #GREETING#"
"#,
    )
}

#[test]
fn composes_tree_from_yaml_files() {
    let dir = tempfile::tempdir().unwrap();
    let root = jeos_tree(dir.path());

    let d = compose_file(&root, &Defaults::default()).unwrap();
    assert_eq!(d.name, "jeos");
    assert_eq!(d.os.name.as_deref(), Some("fedora"));
    assert_eq!(d.os.version.as_deref(), Some("13"));
    assert_eq!(d.hardware.cpus, 2);
    assert_eq!(d.hardware.memory, 1024);
    assert_eq!(d.appliances, vec!["base"]);

    let root_part = &d.hardware.partitions["/"];
    assert_eq!(root_part.size, 4);
    assert_eq!(root_part.fs_type.as_deref(), Some("ext4"));
    assert!(root_part.options.is_none());

    assert_eq!(d.packages.includes, vec!["bash", "openssh-server"]);
    assert_eq!(d.repos[0].name, "fedora-13");
    assert_eq!(
        d.repos[0].mirrorlist.as_deref(),
        Some("https://mirrors.fedoraproject.org/metalink?repo=fedora-13&arch=x86_64")
    );
    assert_eq!(
        d.post["base"],
        vec!["echo base on fedora", "echo hello from fedora"]
    );
    assert_eq!(d.variables["GREETING"], "hello from fedora");
}

#[test]
fn hierarchy_reads_siblings_in_flattening_order() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.yml", "name: a\nappliances: [b1, b2]\n");
    write(dir.path(), "b1.yml", "name: b1\nappliances: [c1]\n");
    write(dir.path(), "b2.yml", "name: b2\nappliances: [c2]\n");
    write(dir.path(), "c1.yml", "name: c1\n");
    write(dir.path(), "c2.yml", "name: c2\n");

    let h = Hierarchy::load_file(&dir.path().join("a.yml"), Defaults::default()).unwrap();
    assert_eq!(h.names(), vec!["a", "b2", "c2", "b1", "c1"]);
}

#[test]
fn toml_trees_are_supported() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "app.toml",
        "name = \"app\"\nappliances = [\"core\"]\n[hardware]\ncpus = 3\n",
    );
    write(
        dir.path(),
        "core.toml",
        "name = \"core\"\n[os]\nname = \"centos\"\nversion = 5\n",
    );

    let d = compose_file(&dir.path().join("app.toml"), &Defaults::default()).unwrap();
    assert_eq!(d.hardware.cpus, 3);
    assert_eq!(d.os.version.as_deref(), Some("5"));
    assert_eq!(d.variables["OS_NAME"], "centos");
}

#[test]
fn defaults_fill_missing_hardware() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(dir.path(), "tiny.appl", "name: tiny\n");
    let defaults = Defaults {
        cpus: 2,
        memory: 512,
        os_password: "changeme".to_owned(),
        ..Defaults::default()
    };

    let d = compose_file(&root, &defaults).unwrap();
    assert_eq!(d.hardware.cpus, 2);
    assert_eq!(d.hardware.memory, 512);
    assert_eq!(d.os.password.as_deref(), Some("changeme"));
}

#[test]
fn missing_include_fails() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(dir.path(), "a.appl", "name: a\nappliances: [missing]\n");

    let err = compose_file(&root, &Defaults::default()).unwrap_err();
    match err {
        CoreError::DescriptorNotFound(path) => assert!(path.ends_with("missing.appl")),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn include_cycle_across_files_fails() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(dir.path(), "a.appl", "name: a\nappliances: [b]\n");
    write(dir.path(), "b.appl", "name: b\nappliances: [a]\n");

    let err = compose_file(&root, &Defaults::default()).unwrap_err();
    assert!(matches!(err, CoreError::IncludeCycle { .. }));
}

#[test]
fn xml_root_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(dir.path(), "a.xml", "<appliance name=\"a\"/>");

    let err = compose_file(&root, &Defaults::default()).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Descriptor(DescriptorError::UnsupportedXml { .. })
    ));
}

#[test]
fn malformed_partition_fails_with_field_name() {
    let dir = tempfile::tempdir().unwrap();
    let root = write(dir.path(), "a.appl", "name: a\nappliances: [b]\n");
    write(
        dir.path(),
        "b.appl",
        "name: b\nhardware:\n  partitions:\n    \"/\":\n      type: ext4\n",
    );

    let err = compose_file(&root, &Defaults::default()).unwrap_err();
    assert!(matches!(err, CoreError::Descriptor(DescriptorError::ParseYaml(_))));
    assert!(err.to_string().contains("size"));
}
