
use predicates::prelude::*;
use tempfile::TempDir;
use test_env::{new_cmd, setup_test_env};

fn record(temp_dir: &TempDir, project: &str, from: &str, until: &str) {
    new_cmd(temp_dir)
        .args(["work", "on", project, "at", from, "until", until])
        .assert()
        .success();
}

fn seed(temp_dir: &TempDir) {
    for path in ["Work", "Work.Email", "Home"] {
        new_cmd(temp_dir).args(["project", "add", path]).assert().success();
    }
    record(temp_dir, "Work", "2024-03-13_08:00", "2024-03-13_09:00");
    record(temp_dir, "Work.Email", "2024-03-13_09:00", "2024-03-13_09:30");
    record(temp_dir, "Home", "2024-03-13_18:00", "2024-03-13_19:00");
    record(temp_dir, "Home", "2024-03-12_18:00", "2024-03-12_19:00");
}

#[test]
fn test_show_window_and_scope() {
    let (temp_dir, _guard) = setup_test_env();
    seed(&temp_dir);

    new_cmd(&temp_dir)
        .args(["show", "from", "2024-03-13", "for", "1d"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Showing from"))
        .stdout(predicate::str::contains("Work.Email"))
        .stdout(predicate::str::contains("2024-03-12").not());

    new_cmd(&temp_dir)
        .args(["show", "from", "2024-03-12", "for", "2d", "on", "Home", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"project\": \"Home\"").count(2))
        .stdout(predicate::str::contains("Work").not());
}

#[test]
fn test_stats_roll_up_descendants() {
    let (temp_dir, _guard) = setup_test_env();
    seed(&temp_dir);

    new_cmd(&temp_dir)
        .args(["stats", "from", "2024-03-13", "for", "1d"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stats from"))
        .stdout(predicate::str::contains("1:30:00"))
        .stdout(predicate::str::contains("2:30:00"))
        .stdout(predicate::str::contains("[All projects]"));

    new_cmd(&temp_dir)
        .args(["stats", "from", "2024-03-13_08:30", "until", "2024-03-13_09:15", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_seconds\": 2700"));
}

#[test]
fn test_empty_window_refused() {
    let (temp_dir, _guard) = setup_test_env();

    new_cmd(&temp_dir)
        .args(["show", "from", "2024-03-13", "until", "2024-03-12"])
        .assert()
        .failure()
        .code(1);
}
