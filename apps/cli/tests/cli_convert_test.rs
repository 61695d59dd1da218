//! Integration tests for the `boxcar` binary.

use assert_cmd::Command;
use flate2::write::GzEncoder;
use flate2::Compression;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tar::{Builder, EntryType, Header};
use tempfile::TempDir;

const IMAGE_LEN: usize = 2 * 2 * 3;

const CONFIG: &str = r#"
[dataset.geometry]
height = 2
width = 2
channels = 3
num_classes = 10

[dataset.splits]
train = ["data_batch_1.bin", "data_batch_2.bin"]
validation = ["data_batch_3.bin"]
eval = ["test_batch.bin"]
"#;

fn batch_bytes(labels: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for &label in labels {
        bytes.push(label);
        bytes.extend(std::iter::repeat_n(label.wrapping_mul(7), IMAGE_LEN));
    }
    bytes
}

fn create_test_archive(dir: &Path) -> PathBuf {
    let archive_path = dir.join("dataset.tar.gz");
    let enc = GzEncoder::new(fs::File::create(&archive_path).unwrap(), Compression::default());
    let mut tar = Builder::new(enc);

    let batches = [
        ("data_batch_1.bin", batch_bytes(&[0, 1, 2])),
        ("data_batch_2.bin", batch_bytes(&[3, 4])),
        ("data_batch_3.bin", batch_bytes(&[5])),
        ("test_batch.bin", batch_bytes(&[6, 7])),
    ];
    for (batch, bytes) in &batches {
        let mut header = Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(EntryType::Regular);
        header.set_cksum();
        tar.append_data(&mut header, format!("cifar-10-batches-bin/{batch}"), bytes.as_slice()).unwrap();
    }
    tar.into_inner().unwrap().finish().unwrap();
    archive_path
}

fn setup() -> (TempDir, PathBuf, PathBuf) {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("boxcar.toml");
    fs::write(&config, CONFIG).unwrap();
    let archive = create_test_archive(temp.path());
    (temp, config, archive)
}

fn boxcar(temp: &TempDir, config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("boxcar").unwrap();
    cmd.current_dir(temp.path()).arg("--config").arg(config);
    cmd
}

#[test]
fn test_help_lists_commands() {
    let mut cmd = Command::cargo_bin("boxcar").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("convert"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("train"));
}

#[test]
fn test_convert_then_inspect() {
    let (temp, config, archive) = setup();
    let out = temp.path().join("out");

    let output = boxcar(&temp, &config)
        .arg("convert")
        .arg("--source")
        .arg(&archive)
        .arg("--output")
        .arg(&out)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["splits"]["train"], 5);
    assert_eq!(report["splits"]["validation"], 1);
    assert_eq!(report["splits"]["eval"], 2);
    assert_eq!(report["total"], 8);

    assert!(out.join("train.records").is_file());
    assert!(out.join("manifest.json").is_file());

    let output = boxcar(&temp, &config).arg("inspect").arg(&out).arg("--json").output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let summaries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let summaries = summaries.as_array().unwrap();
    assert_eq!(summaries.len(), 3);
    assert_eq!(summaries[0]["records"], 5);
    assert_eq!(summaries[0]["manifest_match"], true);
    assert_eq!(summaries[2]["labels"]["7"], 1);
}

#[test]
fn test_split_flags_override_config() {
    let (temp, config, archive) = setup();
    let out = temp.path().join("out");

    boxcar(&temp, &config)
        .arg("convert")
        .arg("--source")
        .arg(&archive)
        .arg("--output")
        .arg(&out)
        .args(["--train", "test_batch.bin", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total\": 2"));

    assert!(out.join("train.records").is_file());
    assert!(!out.join("eval.records").exists());
}

#[test]
fn test_inspect_detects_tampered_split() {
    let (temp, config, archive) = setup();
    let out = temp.path().join("out");
    boxcar(&temp, &config)
        .args(["convert", "--json", "--source"])
        .arg(&archive)
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    let path = out.join("eval.records");
    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 5;
    bytes[last] ^= 0xff;
    fs::write(&path, bytes).unwrap();

    boxcar(&temp, &config)
        .arg("inspect")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("checksum"));
}

#[test]
fn test_convert_missing_source_fails() {
    let (temp, config, _archive) = setup();
    let out = temp.path().join("out");

    boxcar(&temp, &config)
        .arg("convert")
        .arg("--source")
        .arg(temp.path().join("missing.tar.gz"))
        .arg("--output")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));

    assert!(!out.exists());
}

#[cfg(unix)]
#[test]
fn test_build_failure_passes_tool_exit_code_through() {
    use std::os::unix::fs::PermissionsExt;

    let (temp, config, _archive) = setup();
    let runtime = temp.path().join("fake-docker");
    fs::write(&runtime, "#!/bin/sh\necho \"no such context\" >&2\nexit 5\n").unwrap();
    fs::set_permissions(&runtime, fs::Permissions::from_mode(0o755)).unwrap();

    boxcar(&temp, &config)
        .arg("build")
        .arg("--runtime")
        .arg(&runtime)
        .assert()
        .code(5)
        .stderr(predicate::str::contains("no such context"));
}

#[test]
fn test_push_without_registry_fails() {
    let (temp, config, _archive) = setup();
    boxcar(&temp, &config)
        .args(["push", "--runtime", "true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("registry"));
}
