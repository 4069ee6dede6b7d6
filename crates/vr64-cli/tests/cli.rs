use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

const RESET_PC: usize = 0x1000;
const ADD_R1_R0_R0: u32 = 0x0000_0820;

/// Big-endian cartridge titled `CLI DEMO` with `words` at the reset vector.
fn write_image(dir: &Path, words: &[u32]) -> PathBuf {
    let mut bytes = vec![0u8; RESET_PC + words.len() * 4];
    bytes[..4].copy_from_slice(&[0x80, 0x37, 0x12, 0x40]);
    bytes[0x20..0x28].copy_from_slice(b"CLI DEMO");
    for (i, word) in words.iter().enumerate() {
        let at = RESET_PC + i * 4;
        bytes[at..at + 4].copy_from_slice(&word.to_be_bytes());
    }
    let path = dir.join("demo.z64");
    std::fs::write(&path, bytes).unwrap();
    path
}

fn vr64() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vr64"));
    cmd.env("VR64_RAM_WORDS", "4096");
    cmd
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths should be UTF-8")
}

#[test]
fn runs_until_end_of_image_and_prints_summary() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), &[ADD_R1_R0_R0; 4]);

    vr64()
        .args(["--image", path_arg(&image), "--iterations", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("frames=4 pc=0x00001010 title=CLI DEMO md5="));
}

#[test]
fn iteration_budget_is_respected() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), &[ADD_R1_R0_R0; 8]);

    vr64()
        .args(["--image", path_arg(&image), "--iterations", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("frames=2 pc=0x00001008"));
}

#[test]
fn worker_mode_stops_at_end_of_image() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), &[ADD_R1_R0_R0; 3]);

    vr64()
        .args([
            "--image",
            path_arg(&image),
            "--max-ms",
            "5000",
            "--speed",
            "20",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("frames=3 pc=0x0000100c"));
}

#[test]
fn writes_png_of_final_frame() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), &[ADD_R1_R0_R0]);
    let png = dir.path().join("frame.png");

    vr64()
        .args([
            "--image",
            path_arg(&image),
            "--iterations",
            "1",
            "--png",
            path_arg(&png),
        ])
        .assert()
        .success();

    let bytes = std::fs::read(&png).expect("expected frame.png to be written");
    assert!(
        bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
        "frame.png did not look like a PNG (first bytes = {:?})",
        bytes.get(..8)
    );
}

#[test]
fn snapshot_file_resumes_a_later_run() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), &[ADD_R1_R0_R0; 6]);
    let snap = dir.path().join("state.vr64snap");

    vr64()
        .args([
            "--image",
            path_arg(&image),
            "--iterations",
            "2",
            "--snapshot-save",
            path_arg(&snap),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("frames=2"));
    assert!(snap.exists());

    vr64()
        .args([
            "--image",
            path_arg(&image),
            "--iterations",
            "1",
            "--snapshot-load",
            path_arg(&snap),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("frames=3 pc=0x0000100c"));
}

#[test]
fn disk_images_use_file_name_as_title() {
    let dir = tempfile::tempdir().unwrap();
    let disk = dir.path().join("expansion.ndd");
    std::fs::write(&disk, vec![0u8; RESET_PC + 8]).unwrap();

    vr64()
        .args(["--disk", path_arg(&disk), "--iterations", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("frames=2 pc=0x00001008 title=expansion.ndd"));
}

#[test]
fn rejects_invalid_cheat() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), &[ADD_R1_R0_R0]);

    vr64()
        .args([
            "--image",
            path_arg(&image),
            "--iterations",
            "1",
            "--cheat",
            "not-hex",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid cheat code"));
}

#[test]
fn rejects_out_of_range_speed() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), &[ADD_R1_R0_R0]);

    vr64()
        .args(["--image", path_arg(&image), "--iterations", "1", "--speed", "50"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside 0.5..=20.0"));
}

#[test]
fn rejects_bad_environment_override() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), &[ADD_R1_R0_R0]);

    vr64()
        .env("VR64_SEED", "not-a-number")
        .args(["--image", path_arg(&image), "--iterations", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("VR64_SEED"));
}

#[test]
fn config_file_rejects_unknown_fields() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), &[ADD_R1_R0_R0]);
    let config = dir.path().join("vr64.json");
    std::fs::write(&config, r#"{ "speed": 2.0, "turbo": true }"#).unwrap();

    vr64()
        .args([
            "--image",
            path_arg(&image),
            "--iterations",
            "1",
            "--config",
            path_arg(&config),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config"));
}

#[test]
fn requires_a_program_and_a_stop_condition() {
    vr64().args(["--iterations", "1"]).assert().failure();

    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), &[ADD_R1_R0_R0]);
    vr64()
        .args(["--image", path_arg(&image)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--iterations"));
}
