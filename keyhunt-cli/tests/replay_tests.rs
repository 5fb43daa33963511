/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */


//! Full replays through a live session, on paused time.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use keyhunt_cli::cli_args::{Mode, Opt, Replay};
use keyhunt_cli::modes::replay::replay;
use keyhunt_tracker::KeyState;

const CENTERED_42: &str = r#"{"width":640,"height":480,"markers":[{"id":42,"corners":[[160,80],[480,80],[480,400],[160,400]]}]}"#;
const CENTERED_7: &str = r#"{"width":640,"height":480,"markers":[{"id":7,"corners":[[160,80],[480,80],[480,400],[160,400]]}]}"#;
const EMPTY: &str = r#"{"width":640,"height":480,"markers":[]}"#;

fn write_script(name: &str, lines: &[&str]) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "keyhunt-replay-{name}-{}.jsonl",
        std::process::id()
    ));
    fs::write(&path, lines.join("\n")).unwrap();
    path
}

fn args(script: &PathBuf, extra: &[&str]) -> Replay {
    let script = script.to_str().unwrap();
    let mut argv = vec!["keyhunt-cli", "replay", "--script", script, "--poll-ms", "100"];
    argv.extend_from_slice(extra);
    match Opt::try_parse_from(argv).unwrap().mode {
        Mode::Replay(replay) => replay,
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn replayed_marker_is_targeted_and_rendered() {
    let script = write_script("targeted", &[CENTERED_42, CENTERED_42, CENTERED_42, EMPTY]);

    let report = replay(args(&script, &[])).await.unwrap();

    assert_eq!(report.frames, 4);
    assert_eq!(report.total, 3);
    let key = &report.keys[0];
    assert_eq!(key.marker_id, 42);
    assert_eq!(key.state, KeyState::Targeted);
    assert!(key.rendered);
    let [x, y, z] = key.position.unwrap();
    assert!(x.abs() < 1e-6 && y.abs() < 1e-6);
    assert!((-2.0..=-0.5).contains(&z));
    assert!(report.keys[1..].iter().all(|k| k.state == KeyState::Hidden));
    assert_eq!(report.events.shown, 1);
    assert_eq!(report.events.targeted, 1);
    assert_eq!(report.events.hidden, 0);

    fs::remove_file(script).unwrap();
}

#[tokio::test(start_paused = true)]
async fn collect_answers_the_open_riddle() {
    let script = write_script("collect", &[CENTERED_42, CENTERED_42, CENTERED_42, EMPTY]);

    let report = replay(args(&script, &["--collect"])).await.unwrap();

    assert_eq!(report.collected, 1);
    assert_eq!(report.keys[0].state, KeyState::Collected);
    assert_eq!(report.events.collected, 1);
    assert!(!report.events.all_collected);

    fs::remove_file(script).unwrap();
}

#[tokio::test(start_paused = true)]
async fn collecting_the_only_key_finishes_the_hunt() {
    let script = write_script("finish", &[CENTERED_42, CENTERED_42, EMPTY]);

    let report = replay(args(&script, &["--markers", "42", "--collect"])).await.unwrap();

    assert_eq!(report.total, 1);
    assert_eq!(report.collected, 1);
    assert!(report.events.all_collected);
    assert!(report.to_string().ends_with("all keys collected"));

    fs::remove_file(script).unwrap();
}

#[tokio::test(start_paused = true)]
async fn stale_marker_hides_during_the_script() {
    let mut lines = vec![CENTERED_42];
    lines.extend([EMPTY; 6]);
    let script = write_script("stale", &lines);

    let report = replay(args(&script, &[])).await.unwrap();

    let key = &report.keys[0];
    assert_eq!(key.state, KeyState::Hidden);
    assert!(!key.rendered);
    assert!(key.last_seen_ms.is_some());
    assert_eq!(report.events.shown, 1);
    assert_eq!(report.events.hidden, 1);

    fs::remove_file(script).unwrap();
}

#[tokio::test(start_paused = true)]
async fn unknown_marker_only_tracked_when_lazy() {
    let script = write_script("lazy", &[CENTERED_7, EMPTY]);

    let strict = replay(args(&script, &[])).await.unwrap();
    assert_eq!(strict.total, 3);
    assert!(strict.keys.iter().all(|k| k.marker_id != 7));
    assert_eq!(strict.events.shown, 0);

    let lazy = replay(args(&script, &["--policy", "lazy"])).await.unwrap();
    assert_eq!(lazy.total, 4);
    let key = lazy.keys.iter().find(|k| k.marker_id == 7).unwrap();
    assert!(key.state.is_visible());
    assert_eq!(lazy.events.shown, 1);

    fs::remove_file(script).unwrap();
}

#[tokio::test(start_paused = true)]
async fn empty_script_is_an_error() {
    let script = write_script("empty", &["", "  "]);
    assert!(replay(args(&script, &[])).await.is_err());
    fs::remove_file(script).unwrap();
}
