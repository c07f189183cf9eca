//! The `image-toolbox` binary run against a temp root.
//!
//! `--root` points config, preferences and the cache at the temp directory so
//! nothing leaks into the working tree.

use image::{GenericImageView, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbaImage::from_pixel(width, height, Rgba([90, 120, 200, 255]))
        .save(&path)
        .unwrap();
    path
}

fn run(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_image-toolbox"))
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .unwrap()
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| entries.map(|e| e.unwrap().path()).collect())
        .unwrap_or_default();
    files.sort();
    files
}

#[test]
fn resize_counts_an_undecodable_first_input_and_saves_the_rest() {
    let root = TempDir::new().unwrap();
    let bad = root.path().join("a_bad.jpg");
    std::fs::write(&bad, b"definitely not a jpeg").unwrap();
    let good = write_png(root.path(), "b_good.png", 40, 20);
    let also_good = write_png(root.path(), "c_good.png", 30, 30);
    let out = root.path().join("out");

    let output = run(
        root.path(),
        &[
            "resize",
            "--width",
            "10",
            "--height",
            "10",
            "--format",
            "png",
            "-o",
            out.to_str().unwrap(),
            bad.to_str().unwrap(),
            good.to_str().unwrap(),
            also_good.to_str().unwrap(),
        ],
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(stdout.matches("Failed:").count(), 1, "{stdout}");
    assert!(stdout.contains("1 failed"), "{stdout}");

    let written = files_in(&out);
    assert_eq!(written.len(), 2, "{stdout}");
    for path in &written {
        assert_eq!(image::open(path).unwrap().dimensions(), (10, 10));
    }
}

#[test]
fn filter_counts_an_undecodable_first_input_and_saves_the_rest() {
    let root = TempDir::new().unwrap();
    let bad = root.path().join("a_bad.png");
    std::fs::write(&bad, b"nope").unwrap();
    let good = write_png(root.path(), "b_good.png", 12, 6);
    let out = root.path().join("out");

    let output = run(
        root.path(),
        &[
            "filter",
            "-f",
            "grayscale",
            "--format",
            "png",
            "-o",
            out.to_str().unwrap(),
            bad.to_str().unwrap(),
            good.to_str().unwrap(),
        ],
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(stdout.matches("Failed:").count(), 1, "{stdout}");

    let written = files_in(&out);
    assert_eq!(written.len(), 1);
    assert_eq!(image::open(&written[0]).unwrap().dimensions(), (12, 6));
}

#[test]
fn clear_cache_on_launch_empties_the_preview_cache() {
    let root = TempDir::new().unwrap();
    let src = write_png(root.path(), "x.png", 16, 16);
    let previews = root.path().join(".image-toolbox-cache").join("previews");
    let out = root.path().join("out");

    let output = run(
        root.path(),
        &[
            "filter",
            "-f",
            "negative",
            "-o",
            out.to_str().unwrap(),
            src.to_str().unwrap(),
        ],
    );
    assert!(output.status.success());
    assert!(!files_in(&previews).is_empty());

    let output = run(root.path(), &["settings", "set", "clear_cache_on_launch", "true"]);
    assert!(output.status.success());
    // The flag takes effect from the next launch
    assert!(!files_in(&previews).is_empty());

    let output = run(root.path(), &["screens"]);
    assert!(output.status.success());
    assert!(files_in(&previews).is_empty());
}
