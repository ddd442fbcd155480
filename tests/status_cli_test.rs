use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn status_reports_paths_and_latest_revisions() {
    let tmp = tempdir().expect("tempdir");
    let dist = tmp.path().join("dist");
    fs::create_dir_all(&dist).expect("mkdir");
    fs::write(dist.join("US_IT_2024_Sommer_FIAE_D_2024_abKW12.pdf"), "d").expect("seed");

    assert_cmd::cargo::cargo_bin_cmd!("timetable-archive")
        .current_dir(tmp.path())
        .env("TIMETABLE_HOME", tmp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("status: ok"))
        .stdout(predicate::str::contains("archive_files=1"))
        .stdout(predicate::str::contains(
            "latest.D=period:12 revisions:1 file:US_IT_2024_Sommer_FIAE_D_2024_abKW12.pdf",
        ))
        .stdout(predicate::str::contains("env_overrides=TIMETABLE_HOME"));
}

#[test]
fn status_flags_invalid_config() {
    let tmp = tempdir().expect("tempdir");
    fs::write(
        tmp.path().join("timetable.toml"),
        "[selection]\nmode = \"regex\"\npattern = \"[DE\"\n",
    )
    .expect("config");

    assert_cmd::cargo::cargo_bin_cmd!("timetable-archive")
        .current_dir(tmp.path())
        .env("TIMETABLE_HOME", tmp.path())
        .args(["status", "--json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"ok\": false"))
        .stdout(predicate::str::contains("config invalid"));
}
