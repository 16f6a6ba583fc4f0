#![cfg(feature = "cli")]

use assert_cmd::Command;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use pagescan::core::Pose;
use pagescan::replay::{FrameImage, ReplayFrame, ReplaySession, TrackerEvent};
use pagescan::source::{ReferenceLibrary, TrackingState};
use pagescan::ScanConfig;
use predicates::prelude::*;

fn overhead() -> Pose {
    Pose::new(
        Point3::new(0.0, 0.5, 0.0),
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 90f32.to_radians()),
    )
}

fn frame(events: Vec<TrackerEvent>) -> ReplayFrame {
    ReplayFrame {
        dt: 1.0 / 60.0,
        camera: overhead(),
        background: Some(FrameImage::Solid {
            width: 27,
            height: 48,
            rgba: [200, 180, 160, 255],
        }),
        display_matrix: None,
        events,
        reset: vec![],
        request_capture: vec![],
    }
}

fn recording() -> ReplaySession {
    let page = Pose::new(Point3::origin(), UnitQuaternion::identity());
    ReplaySession {
        screen: [270, 480],
        vertical_fov_deg: 60.0,
        config: Some(ScanConfig {
            output_resolution: 16,
            max_camera_feed_resolution: 64,
            ..Default::default()
        }),
        library: ReferenceLibrary::default(),
        frames: vec![
            frame(vec![TrackerEvent::Added {
                id: 7,
                name: String::new(),
                guid: None,
                size: [0.2, 0.3],
                pose: page,
            }]),
            frame(vec![TrackerEvent::Updated {
                id: 7,
                name: "Page1".into(),
                guid: None,
                size: [0.2, 0.3],
                pose: page,
                state: TrackingState::Tracking,
            }]),
            frame(vec![]),
        ],
    }
}

#[test]
fn config_prints_defaults() {
    Command::cargo_bin("pagescan")
        .unwrap()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"capture_threshold\": 0.85"))
        .stdout(predicate::str::contains("rgb565"));
}

#[test]
fn config_check_accepts_valid_and_rejects_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.json");
    ScanConfig::default().write_json(&good).unwrap();
    Command::cargo_bin("pagescan")
        .unwrap()
        .args(["config", "--check"])
        .arg(&good)
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"));

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, r#"{"capture_threshold": 3.0}"#).unwrap();
    Command::cargo_bin("pagescan")
        .unwrap()
        .args(["config", "--check"])
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ThresholdOutOfRange"));
}

#[test]
fn replay_reports_capture_and_lock() {
    let dir = tempfile::tempdir().unwrap();
    let session = dir.path().join("session.json");
    recording().write_json(&session).unwrap();
    let out = dir.path().join("report.json");

    Command::cargo_bin("pagescan")
        .unwrap()
        .args(["replay", "--session"])
        .arg(&session)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(report["frames"], 3);
    let captures = report["captures"].as_array().unwrap();
    assert_eq!(captures.len(), 1);
    assert_eq!(captures[0]["target"], "Page1");
    assert_eq!(captures[0]["frame"], 2);
    assert_eq!(report["locks"][0][1], "Page1");
    assert_eq!(report["targets"][0]["phase"], "locked");
    assert_eq!(report["released_textures"], 1);
    // Nothing but the report lands on disk.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[test]
fn replay_missing_session_fails() {
    Command::cargo_bin("pagescan")
        .unwrap()
        .args(["replay", "--session", "/definitely/not/here.json"])
        .assert()
        .failure();
}
