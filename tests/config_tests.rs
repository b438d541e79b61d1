use std::path::PathBuf;
use std::time::Duration;

use flipbook_hero::config::{Configuration, HexColor};
use flipbook_hero::overlay::beats::BeatAlign;

#[test]
fn defaults_match_the_original_page() {
    let cfg = Configuration::default().validated().unwrap();
    assert_eq!(cfg.frames.count, 192);
    assert_eq!(cfg.frames.directory, PathBuf::from("public/frames"));
    assert_eq!(cfg.fog_color, HexColor::rgb(0xE8, 0xE8, 0xE8));
    assert_eq!(cfg.fog_color.to_string(), "#E8E8E8");
    assert!((cfg.frame_blend - 0.7).abs() < f32::EPSILON);
    assert_eq!(cfg.beats.len(), 4);
    assert_eq!(cfg.beats[2].align, BeatAlign::Right);
    assert_eq!(cfg.loading.ready_grace, Duration::from_millis(700));
    assert_eq!(cfg.loading.label, "Loading Sahil's Portfolio…");
}

#[test]
fn frame_sources_follow_numbering() {
    let cfg = Configuration::default();
    let sources = cfg.frame_sources();
    assert_eq!(sources.len(), 192);
    assert_eq!(sources[0].path, PathBuf::from("public/frames/00001.webp"));
    assert_eq!(sources[191].path, PathBuf::from("public/frames/00192.webp"));
}

#[test]
fn parse_kebab_case_config() {
    let yaml = r##"
frames:
  directory: "/srv/frames"
  count: 24
  extension: png
fog-color: "#101010"
frame-blend: 0.5
loader-max-concurrent-decodes: 2
loading:
  ready-grace: 1s
  label: "Loading frames…"
nudge:
  idle-delay: 5s
  toggle-interval: 250ms
beats:
  - from: 0.1
    to: 0.4
    text: "Hello."
    align: left
"##;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.frames.directory, PathBuf::from("/srv/frames"));
    assert_eq!(cfg.frames.count, 24);
    assert_eq!(cfg.frames.pad_width, 5);
    assert_eq!(cfg.fog_color, HexColor::rgb(0x10, 0x10, 0x10));
    assert_eq!(cfg.loading.ready_grace, Duration::from_secs(1));
    assert_eq!(cfg.loading.fade_duration, Duration::from_millis(600));
    assert_eq!(cfg.loading.spin_period, Duration::from_millis(750));
    assert_eq!(cfg.loading.label, "Loading frames…");
    assert_eq!(cfg.nudge.toggle_interval, Duration::from_millis(250));
    assert_eq!(cfg.beats.len(), 1);
    assert_eq!(cfg.beats[0].sub, "");
    assert_eq!(cfg.beats[0].align, BeatAlign::Left);
}

#[test]
fn reads_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flipbook.yaml");
    std::fs::write(&path, "frames:\n  count: 3\nwindow:\n  fullscreen: true\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path)
        .unwrap()
        .validated()
        .unwrap();
    assert_eq!(cfg.frames.count, 3);
    assert!(cfg.window.fullscreen);
    assert_eq!(cfg.window.width, 1600);
}

#[test]
fn unknown_keys_are_rejected() {
    let yaml = "frames:\n  cuont: 3\n";
    assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
    assert!(serde_yaml::from_str::<Configuration>("zoom: 2\n").is_err());
}

#[test]
fn bad_colour_is_rejected() {
    assert!(serde_yaml::from_str::<Configuration>("fog-color: \"grey\"\n").is_err());
}

fn invalid(yaml: &str) -> bool {
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    cfg.validated().is_err()
}

#[test]
fn validation_rejects_out_of_range_values() {
    assert!(invalid("frames:\n  count: 0\n"));
    assert!(invalid("crop:\n  top: 0.6\n  bottom: 0.5\n"));
    assert!(invalid("focal-point: [1.5, 0.5]\n"));
    assert!(invalid("frame-blend: 1.2\n"));
    assert!(invalid("spring:\n  stiffness: 0\n"));
    assert!(invalid("scroll:\n  height-multiple: 1.0\n"));
    assert!(invalid("exit:\n  fade-from: 0.9\n  fade-to: 0.9\n"));
    assert!(invalid("portrait-background:\n  opacity: 2\n"));
    assert!(invalid("loader-max-concurrent-decodes: 0\n"));
    assert!(invalid("loading:\n  spin-period: 0s\n"));
    assert!(invalid("beats:\n  - from: 0.5\n    to: 0.4\n    text: x\n"));
}
