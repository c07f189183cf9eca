//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## resize / filter
//!
//! ```text
//! Processing 3 images
//! 001 /photos/dawn.jpg
//!     Saved: resized/dawn.jpg
//! 002 /photos/dusk.jpg
//!     Skipped: already within limits
//! 003 /photos/broken.jpg
//!     Failed: decode error
//! Done: 1 skipped, 1 failed → resized
//! ```
//!
//! ## palette
//!
//! ```text
//! 001 #c81e1e  74.8%
//! 002 #1414dc  25.2%
//! ```
//!
//! ## screens
//!
//! ```text
//! 001 [6] filter (multiple)
//! 002 [2] resize_and_convert (multiple)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchOutcome, ItemStatus};
use crate::palette::Swatch;
use crate::screen::{PayloadKind, Screen};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Batches
// ============================================================================

/// Format one batch progress event as display lines.
///
/// `Progress` events print nothing; the per-item line already says where
/// the batch is.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => {
            let noun = if *total == 1 { "image" } else { "images" };
            vec![format!("Processing {} {}", total, noun)]
        }
        BatchEvent::Item { index, uri, status } => {
            let detail = match status {
                ItemStatus::Saved(path) => format!("Saved: {}", path.display()),
                ItemStatus::Skipped => "Skipped: already within limits".to_string(),
                ItemStatus::Failed(reason) => format!("Failed: {}", reason),
            };
            vec![
                format!("{} {}", format_index(index + 1), uri),
                format!("    {}", detail),
            ]
        }
        BatchEvent::Progress { .. } => Vec::new(),
        BatchEvent::Finished(outcome) => format_batch_outcome(outcome),
    }
}

/// Format the final summary of a batch.
pub fn format_batch_outcome(outcome: &BatchOutcome) -> Vec<String> {
    match outcome {
        BatchOutcome::Completed {
            failed,
            skipped,
            saving_path,
        } if *failed == 0 && *skipped == 0 => {
            vec![format!("Done → {}", saving_path)]
        }
        BatchOutcome::Completed {
            failed,
            skipped,
            saving_path,
        } => vec![format!(
            "Done: {} skipped, {} failed → {}",
            skipped, failed, saving_path
        )],
        BatchOutcome::MissingPermissions => {
            vec!["Stopped: missing permission to write to the output folder".to_string()]
        }
        BatchOutcome::Cancelled { done } => vec![format!("Cancelled after {} images", done)],
        BatchOutcome::Rejected => {
            vec!["Nothing to do: target width and height must be non-zero".to_string()]
        }
    }
}

pub fn print_batch_event(event: &BatchEvent) {
    print_lines(format_batch_event(event));
}

// ============================================================================
// Palette
// ============================================================================

/// One line per swatch: index, hex color, share of the sampled pixels.
pub fn format_palette(swatches: &[Swatch]) -> Vec<String> {
    let total: usize = swatches.iter().map(|s| s.population).sum();
    swatches
        .iter()
        .enumerate()
        .map(|(i, swatch)| {
            let share = if total == 0 {
                0.0
            } else {
                swatch.population as f64 * 100.0 / total as f64
            };
            format!(
                "{} {}  {:.1}%",
                format_index(i + 1),
                swatch.color.to_hex(),
                share
            )
        })
        .collect()
}

pub fn print_palette(swatches: &[Swatch]) {
    print_lines(format_palette(swatches));
}

// ============================================================================
// Settings
// ============================================================================

/// `key = value` lines with keys aligned.
pub fn format_settings(entries: &[(&'static str, String)]) -> Vec<String> {
    let width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    entries
        .iter()
        .map(|(key, value)| format!("{:<width$} = {}", key, value, width = width))
        .collect()
}

pub fn print_settings(entries: &[(&'static str, String)]) {
    print_lines(format_settings(entries));
}

// ============================================================================
// Screens
// ============================================================================

fn payload_label(kind: PayloadKind) -> &'static str {
    match kind {
        PayloadKind::None => "none",
        PayloadKind::Single => "single",
        PayloadKind::Multiple => "multiple",
        PayloadKind::Url => "url",
    }
}

/// Tools in display order with their persisted id and accepted payload.
pub fn format_screens(screens: &[Screen]) -> Vec<String> {
    screens
        .iter()
        .enumerate()
        .map(|(i, screen)| {
            format!(
                "{} [{}] {} ({})",
                format_index(i + 1),
                screen.id(),
                screen.name(),
                payload_label(screen.payload_kind())
            )
        })
        .collect()
}

pub fn print_screens(screens: &[Screen]) {
    print_lines(format_screens(screens));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Color, Uri};
    use std::path::PathBuf;

    #[test]
    fn format_index_pads_to_three_digits() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(1234), "1234");
    }

    // =========================================================================
    // Batches
    // =========================================================================

    #[test]
    fn started_pluralizes() {
        assert_eq!(
            format_batch_event(&BatchEvent::Started { total: 1 }),
            vec!["Processing 1 image"]
        );
        assert_eq!(
            format_batch_event(&BatchEvent::Started { total: 4 }),
            vec!["Processing 4 images"]
        );
    }

    #[test]
    fn item_shows_uri_then_status() {
        let lines = format_batch_event(&BatchEvent::Item {
            index: 0,
            uri: Uri::new("/photos/dawn.jpg"),
            status: ItemStatus::Saved(PathBuf::from("out/dawn.jpg")),
        });
        assert_eq!(lines, vec!["001 /photos/dawn.jpg", "    Saved: out/dawn.jpg"]);

        let lines = format_batch_event(&BatchEvent::Item {
            index: 2,
            uri: Uri::new("x.png"),
            status: ItemStatus::Failed("boom".into()),
        });
        assert_eq!(lines[1], "    Failed: boom");
    }

    #[test]
    fn progress_is_silent() {
        assert!(format_batch_event(&BatchEvent::Progress { done: 1, total: 2 }).is_empty());
    }

    #[test]
    fn outcome_summaries() {
        let clean = BatchOutcome::Completed {
            failed: 0,
            skipped: 0,
            saving_path: "out".into(),
        };
        assert_eq!(format_batch_outcome(&clean), vec!["Done → out"]);

        let partial = BatchOutcome::Completed {
            failed: 1,
            skipped: 2,
            saving_path: "out".into(),
        };
        assert_eq!(
            format_batch_outcome(&partial),
            vec!["Done: 2 skipped, 1 failed → out"]
        );

        assert!(format_batch_outcome(&BatchOutcome::Cancelled { done: 3 })[0].contains('3'));
        assert!(format_batch_outcome(&BatchOutcome::MissingPermissions)[0].contains("permission"));
    }

    // =========================================================================
    // Palette, settings, screens
    // =========================================================================

    #[test]
    fn palette_shows_share_of_population() {
        let swatches = [
            Swatch {
                color: Color::rgb(255, 0, 0),
                population: 3,
            },
            Swatch {
                color: Color::rgb(0, 0, 255),
                population: 1,
            },
        ];
        let lines = format_palette(&swatches);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("001 "));
        assert!(lines[0].ends_with("75.0%"), "{}", lines[0]);
        assert!(lines[1].ends_with("25.0%"), "{}", lines[1]);
    }

    #[test]
    fn settings_keys_are_aligned() {
        let lines = format_settings(&[("a", "1".into()), ("long_key", "2".into())]);
        assert_eq!(lines, vec!["a        = 1", "long_key = 2"]);
    }

    #[test]
    fn screens_show_id_and_payload() {
        let lines = format_screens(&[Screen::Filter(Vec::new()), Screen::Crop(None)]);
        assert_eq!(lines[0], "001 [6] filter (multiple)");
        assert_eq!(lines[1], "002 [5] crop (single)");
    }
}
