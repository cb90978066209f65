use assert_fs::prelude::*;
use assert_fs::TempDir;
use std::process::{Command, Output};

fn batch_mover(tmp: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("batch_mover"));
    // Keep any real user config out of the picture.
    cmd.env("BATCH_MOVER_CONFIG", tmp.path().join("absent.xml"));
    cmd
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn print_config_succeeds_without_sources() {
    let tmp = TempDir::new().unwrap();
    let out = batch_mover(&tmp).arg("--print-config").output().expect("spawn binary");
    assert!(out.status.success());
    assert!(stdout(&out).contains("absent.xml"));
}

#[test]
fn moves_and_renames_sources() {
    let tmp = TempDir::new().unwrap();
    let a = tmp.child("in/a1.mkv");
    a.write_binary(&[1u8; 64]).unwrap();
    let b = tmp.child("in/notes.txt");
    b.write_str("notes").unwrap();
    let dest = tmp.child("out");

    let out = batch_mover(&tmp)
        .arg("--dest")
        .arg(dest.path())
        .arg(format!("{}=Show.S01E01.mkv", a.path().display()))
        .arg(b.path())
        .output()
        .expect("spawn binary");

    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(dest.child("Show.S01E01.mkv").path().is_file());
    assert!(dest.child("notes.txt").path().is_file());
    assert!(!a.path().exists());
    assert_eq!(stdout(&out).matches("moved:").count(), 2);
}

#[test]
fn directory_source_moves_every_file() {
    let tmp = TempDir::new().unwrap();
    tmp.child("in/season/e1.mkv").write_str("1").unwrap();
    tmp.child("in/season/e2.mkv").write_str("2").unwrap();
    let dest = tmp.child("out");

    let out = batch_mover(&tmp)
        .arg("--dest")
        .arg(dest.path())
        .arg(tmp.child("in").path())
        .output()
        .expect("spawn binary");

    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(dest.child("e1.mkv").path().is_file());
    assert!(dest.child("e2.mkv").path().is_file());
}

#[test]
fn missing_source_fails_the_run() {
    let tmp = TempDir::new().unwrap();
    let present = tmp.child("in/here.txt");
    present.write_str("x").unwrap();
    let dest = tmp.child("out");

    let out = batch_mover(&tmp)
        .arg("--dest")
        .arg(dest.path())
        .arg(tmp.child("in/not-here.txt").path())
        .arg(present.path())
        .output()
        .expect("spawn binary");

    assert!(!out.status.success());
    let text = stdout(&out);
    assert!(text.contains("missing:"), "stdout: {text}");
    assert!(text.contains("moved:"), "stdout: {text}");
    assert!(dest.child("here.txt").path().is_file());
}

#[test]
fn no_sources_is_a_usage_error() {
    let tmp = TempDir::new().unwrap();
    let out = batch_mover(&tmp).output().expect("spawn binary");
    assert!(!out.status.success());
}
