use chrono::{TimeDelta, Utc};
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

const MAILBOX: &str = "15183332220";

fn vmtidy(tmp: &TempDir) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("vmtidy");
    cmd.current_dir(tmp.path())
        .env("VMTIDY_CONFIG_PATH", tmp.path().join("absent.toml"))
        .env("VMTIDY_VOICEMAIL_ROOT", tmp.path().join("vm"))
        .env("VMTIDY_HOME", tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path().join("xdg"))
        .env_remove("VMTIDY_LOGS_DIR")
        .env_remove("VMTIDY_MAX_AGE_DAYS")
        .env_remove("VMTIDY_TIMEZONE")
        .env_remove("VMTIDY_IGNORED_DIRS")
        .env_remove("VMTIDY_LOG");
    cmd
}

fn write_message(dir: &Path, number: u32, age_days: i64, caller: &str) {
    let origdate = (Utc::now() - TimeDelta::days(age_days)).format("%Y-%m-%d %H:%M:%S +0000");
    fs::write(dir.join(format!("msg{number:04}.wav")), caller.as_bytes()).expect("write wav");
    fs::write(
        dir.join(format!("msg{number:04}.txt")),
        format!("[message]\ncallerid=\"{caller}\" <5185550100>\norigdate={origdate}\nduration=12\n"),
    )
    .expect("write txt");
}

/// `<tmp>/vm/518/15183332220` with INBOX and Old holding msg0000..msg0010,
/// message `i` being `4 * (i + 1)` days old.
fn fixture() -> (TempDir, PathBuf) {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path().join("vm").join("518").join(MAILBOX);
    for dir in ["INBOX", "Old", "tmp"] {
        fs::create_dir_all(root.join(dir)).expect("mkdir");
    }
    for folder in ["INBOX", "Old"] {
        for i in 0..=10u32 {
            write_message(&root.join(folder), i, 4 * (i as i64 + 1), &format!("caller {i}"));
        }
    }
    (tmp, root)
}

fn numbers(dir: &Path, ext: &str) -> Vec<u32> {
    let mut out = fs::read_dir(dir)
        .expect("read dir")
        .filter_map(|e| {
            let name = e.expect("entry").file_name().to_string_lossy().into_owned();
            let stem = name.strip_suffix(&format!(".{ext}"))?;
            stem.strip_prefix("msg")?.parse::<u32>().ok()
        })
        .collect::<Vec<_>>();
    out.sort_unstable();
    out
}

#[test]
fn sort_compacts_gaps_and_keeps_order() {
    let (tmp, root) = fixture();
    let inbox = root.join("INBOX");
    for i in [2u32, 4, 5, 8] {
        fs::remove_file(inbox.join(format!("msg{i:04}.wav"))).expect("rm wav");
        fs::remove_file(inbox.join(format!("msg{i:04}.txt"))).expect("rm txt");
    }

    vmtidy(&tmp)
        .args(["sort", MAILBOX])
        .assert()
        .success()
        .stdout(contains("inbox: 7 message(s), 5 renumbered"))
        .stdout(contains("old: 11 message(s), already in order"));

    assert_eq!(numbers(&inbox, "wav"), (0..7).collect::<Vec<_>>());
    assert_eq!(numbers(&inbox, "txt"), (0..7).collect::<Vec<_>>());
    let survivors = [0u32, 1, 3, 6, 7, 9, 10];
    for (target, source) in survivors.iter().enumerate() {
        let audio = fs::read_to_string(inbox.join(format!("msg{target:04}.wav"))).expect("wav");
        assert_eq!(audio, format!("caller {source}"));
        let info = fs::read_to_string(inbox.join(format!("msg{target:04}.txt"))).expect("txt");
        assert!(info.contains(&format!("caller {source}")));
    }
}

#[test]
fn sort_is_idempotent() {
    let (tmp, root) = fixture();
    fs::remove_file(root.join("Old").join("msg0000.wav")).expect("rm");
    fs::remove_file(root.join("Old").join("msg0000.txt")).expect("rm");

    vmtidy(&tmp).args(["sort", MAILBOX]).assert().success();
    let first = numbers(&root.join("Old"), "wav");
    vmtidy(&tmp)
        .args(["sort", MAILBOX, "--folder", "old"])
        .assert()
        .success()
        .stdout(contains("old: 10 message(s), already in order"));
    assert_eq!(numbers(&root.join("Old"), "wav"), first);
}

#[test]
fn sort_finishes_an_interrupted_renumber() {
    let (tmp, root) = fixture();
    let inbox = root.join("INBOX");
    for i in 1..=10u32 {
        if i == 3 || i == 5 {
            continue;
        }
        fs::remove_file(inbox.join(format!("msg{i:04}.wav"))).expect("rm wav");
        fs::remove_file(inbox.join(format!("msg{i:04}.txt"))).expect("rm txt");
    }
    // msg0003 was staged towards msg0001 before the previous run stopped.
    for ext in ["wav", "txt"] {
        fs::rename(
            inbox.join(format!("msg0003.{ext}")),
            inbox.join(format!("stage-msg0001-from-msg0003.{ext}")),
        )
        .expect("stage");
    }

    vmtidy(&tmp)
        .args(["sort", MAILBOX, "--folder", "INBOX"])
        .assert()
        .success()
        .stdout(contains("committed"));

    assert_eq!(numbers(&inbox, "wav"), vec![0, 1, 2]);
    let moved = fs::read_to_string(inbox.join("msg0001.wav")).expect("wav");
    assert_eq!(moved, "caller 3");
    let last = fs::read_to_string(inbox.join("msg0002.wav")).expect("wav");
    assert_eq!(last, "caller 5");
    assert!(
        fs::read_dir(&inbox)
            .expect("read")
            .all(|e| !e.expect("entry").file_name().to_string_lossy().starts_with("stage-"))
    );
}

#[test]
fn clean_ghosts_removes_lone_siblings_then_renumbers() {
    let (tmp, root) = fixture();
    let inbox = root.join("INBOX");
    for (i, ext) in [(2u32, "wav"), (4, "txt"), (0, "wav"), (5, "txt")] {
        fs::remove_file(inbox.join(format!("msg{i:04}.{ext}"))).expect("make ghost");
    }

    vmtidy(&tmp)
        .args(["clean-ghosts", MAILBOX])
        .assert()
        .success()
        .stdout(contains("inbox: removed 4 ghost file(s); 7 message(s)"))
        .stdout(contains("old: removed 0 ghost file(s)"));

    assert_eq!(numbers(&inbox, "wav"), (0..7).collect::<Vec<_>>());
    assert_eq!(numbers(&inbox, "txt"), (0..7).collect::<Vec<_>>());
}

#[test]
fn clean_ghosts_without_sort_leaves_gaps() {
    let (tmp, root) = fixture();
    let inbox = root.join("INBOX");
    fs::remove_file(inbox.join("msg0003.wav")).expect("make ghost");

    vmtidy(&tmp)
        .args(["clean-ghosts", MAILBOX, "--no-sort"])
        .assert()
        .success();

    let left = numbers(&inbox, "wav");
    assert_eq!(left.len(), 10);
    assert!(!left.contains(&3));
    assert!(!inbox.join("msg0003.txt").exists());
}

#[test]
fn clean_stale_uses_a_strict_threshold() {
    let (tmp, root) = fixture();

    vmtidy(&tmp)
        .args(["clean-stale", MAILBOX])
        .assert()
        .success()
        .stdout(contains("max age: 30 day(s)"))
        .stdout(contains("inbox: removed 4 stale message(s)"));
    assert_eq!(numbers(&root.join("INBOX"), "wav"), (0..7).collect::<Vec<_>>());
    assert_eq!(numbers(&root.join("Old"), "wav"), (0..7).collect::<Vec<_>>());

    vmtidy(&tmp)
        .args(["clean-stale", MAILBOX, "--folder", "Old", "--max-age-days", "10"])
        .assert()
        .success()
        .stdout(contains("old: removed 5 stale message(s)"));
    assert_eq!(numbers(&root.join("Old"), "wav"), vec![0, 1]);
    assert_eq!(numbers(&root.join("INBOX"), "wav").len(), 7);
}

#[test]
fn clean_stale_honors_env_retention() {
    let (tmp, root) = fixture();

    vmtidy(&tmp)
        .env("VMTIDY_MAX_AGE_DAYS", "22")
        .args(["clean-stale", MAILBOX, "--folder", "inbox", "--no-sort"])
        .assert()
        .success()
        .stdout(contains("max age: 22 day(s)"));
    // ages 4..=20 days survive
    assert_eq!(numbers(&root.join("INBOX"), "wav"), vec![0, 1, 2, 3, 4]);
}

#[test]
fn purge_empties_folders_but_keeps_them() {
    let (tmp, root) = fixture();
    fs::write(root.join("INBOX").join(".DS_Store"), b"").expect("dotfile");
    fs::write(root.join("INBOX").join("msg0042.wav"), b"").expect("stray");

    vmtidy(&tmp)
        .args(["purge", MAILBOX])
        .assert()
        .success()
        .stdout(contains("inbox: removed 24 file(s)"))
        .stdout(contains("old: removed 22 file(s)"));

    for folder in ["INBOX", "Old"] {
        let dir = root.join(folder);
        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).expect("read").count(), 0);
    }
}

#[test]
fn ghost_on_target_name_fails_only_that_folder() {
    let (tmp, root) = fixture();
    let inbox = root.join("INBOX");
    for i in 3..=10u32 {
        fs::remove_file(inbox.join(format!("msg{i:04}.wav"))).expect("rm wav");
        fs::remove_file(inbox.join(format!("msg{i:04}.txt"))).expect("rm txt");
    }
    fs::remove_file(inbox.join("msg0001.txt")).expect("make ghost");
    let old = root.join("Old");
    fs::remove_file(old.join("msg0004.wav")).expect("rm wav");
    fs::remove_file(old.join("msg0004.txt")).expect("rm txt");

    vmtidy(&tmp)
        .args(["sort", MAILBOX])
        .assert()
        .failure()
        .stdout(contains("renumber: 1 folder(s) completed"))
        .stdout(contains("! inbox: refusing to rename"))
        .stderr(contains("sort reported 1 issue(s)"));

    assert_eq!(numbers(&inbox, "txt"), vec![0, 2]);
    assert_eq!(numbers(&old, "wav"), (0..10).collect::<Vec<_>>());
}

#[test]
fn clean_ghosts_keeps_pairs_of_an_interrupted_renumber() {
    let (tmp, root) = fixture();
    let inbox = root.join("INBOX");
    for i in [0u32, 2] {
        fs::remove_file(inbox.join(format!("msg{i:04}.wav"))).expect("rm wav");
        fs::remove_file(inbox.join(format!("msg{i:04}.txt"))).expect("rm txt");
    }
    for ext in ["wav", "txt"] {
        fs::rename(
            inbox.join(format!("msg0001.{ext}")),
            inbox.join(format!("stage-msg0000-from-msg0001.{ext}")),
        )
        .expect("stage 1");
    }
    fs::rename(
        inbox.join("msg0003.wav"),
        inbox.join("stage-msg0001-from-msg0003.wav"),
    )
    .expect("stage half of 3");

    vmtidy(&tmp)
        .args(["status", MAILBOX, "--folder", "inbox"])
        .assert()
        .success()
        .stdout(contains("ghost").not())
        .stdout(contains("3 staged file(s)"));

    vmtidy(&tmp)
        .args(["clean-ghosts", MAILBOX, "--folder", "inbox"])
        .assert()
        .success()
        .stdout(contains(
            "inbox: removed 0 ghost file(s) after committing 2 staged message(s)",
        ));

    assert_eq!(numbers(&inbox, "wav"), (0..9).collect::<Vec<_>>());
    assert_eq!(numbers(&inbox, "txt"), (0..9).collect::<Vec<_>>());
    let info = fs::read_to_string(inbox.join("msg0001.txt")).expect("txt");
    assert!(info.contains("caller 3"));
}
