
use predicates::prelude::*;
use test_env::{new_cmd, setup_test_env};

const DAY: [&str; 4] = ["from", "2024-03-13", "until", "2024-03-14"];

#[test]
fn test_start_and_finish_record() {
    let (temp_dir, _guard) = setup_test_env();

    new_cmd(&temp_dir).args(["project", "add", "Work"]).assert().success();
    new_cmd(&temp_dir)
        .args(["work", "on", "Work", "at", "2024-03-13_09:00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Started record 1 on Work"));
    new_cmd(&temp_dir)
        .args(["work", "done", "at", "2024-03-13_10:30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ended record(s) 1"));

    new_cmd(&temp_dir)
        .arg("show")
        .args(DAY)
        .assert()
        .success()
        .stdout(predicate::str::contains("Work"))
        .stdout(predicate::str::contains("1:30:00"));
}

#[test]
fn test_done_without_ongoing_record() {
    let (temp_dir, _guard) = setup_test_env();

    new_cmd(&temp_dir)
        .args(["work", "done"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no ongoing project to terminate."));
}

#[test]
fn test_overlap_refused_then_forced() {
    let (temp_dir, _guard) = setup_test_env();

    new_cmd(&temp_dir).args(["project", "add", "Work"]).assert().success();
    new_cmd(&temp_dir)
        .args(["work", "on", "Work", "at", "2024-03-13_09:00", "for", "2h"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Inserted record 1"));

    new_cmd(&temp_dir)
        .args(["work", "on", "Work", "at", "2024-03-13_10:00", "for", "1h"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("1 record(s) overlap"));

    new_cmd(&temp_dir)
        .args(["work", "on", "Work", "at", "2024-03-13_10:00", "for", "1h", "force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ended record(s) 1"));

    new_cmd(&temp_dir)
        .arg("show")
        .args(DAY)
        .args(["json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"duration\": 3600").count(2));
}

#[test]
fn test_unknown_project_suggests() {
    let (temp_dir, _guard) = setup_test_env();

    new_cmd(&temp_dir).args(["project", "add", "Work"]).assert().success();
    new_cmd(&temp_dir)
        .args(["work", "on", "Wrok"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("did you mean: Work"));
}

#[test]
fn test_invalid_tokens() {
    let (temp_dir, _guard) = setup_test_env();

    new_cmd(&temp_dir)
        .args(["work", "sometime"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid option sometime"));
    new_cmd(&temp_dir)
        .args(["work", "at"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("option at must have a value"));
    new_cmd(&temp_dir)
        .args(["work", "at", "tomorrow"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown date format 'tomorrow'"));
}

#[test]
fn test_edit_and_remove_record() {
    let (temp_dir, _guard) = setup_test_env();

    new_cmd(&temp_dir)
        .args(["work", "at", "2024-03-13_09:00", "until", "2024-03-13_10:00"])
        .assert()
        .success();
    new_cmd(&temp_dir).args(["project", "add", "Home"]).assert().success();

    new_cmd(&temp_dir)
        .args(["edit", "id", "1", "project", "Home", "to", "+30m"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Home"))
        .stdout(predicate::str::contains("1:30:00"));

    new_cmd(&temp_dir).args(["rm", "id", "1"]).assert().success();
    new_cmd(&temp_dir)
        .args(["rm", "id", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no record with id 1"));
}

#[test]
fn test_running_record_blocks_new_start_without_force() {
    let (temp_dir, _guard) = setup_test_env();

    new_cmd(&temp_dir).args(["project", "add", "Work"]).assert().success();
    new_cmd(&temp_dir)
        .args(["work", "at", "2024-03-13_09:00"])
        .assert()
        .success();
    new_cmd(&temp_dir)
        .args(["work", "on", "Work", "at", "2024-03-13_10:00"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("use force"));

    new_cmd(&temp_dir)
        .arg("show")
        .args(DAY)
        .args(["json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"end_ts\": null").count(1))
        .stdout(predicate::str::contains("\"project\": \"Not assigned\""));

    new_cmd(&temp_dir)
        .args(["work", "on", "Work", "at", "2024-03-13_10:00", "force"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Warning:"));
}
