//! Console output for generation progress.
//!
//! The library never prints on its own. Hosts that want progress lines
//! subscribe [`print_event`] as a wildcard observer:
//!
//! ```text
//! Generating PWA assets
//! Generating icons for Weather...
//!     icon-96x96.webp (2.1 KB)
//!     icon-96x96.png (4.7 KB)
//!     ...
//! Generating Apple Touch Icon...
//!     apple-touch-icon.png (9.3 KB)
//! Generating Microsoft Tile Icons...
//!     ...
//! Done
//! ```
//!
//! Artifact lines show the name a stage proposed, before hooks and
//! fingerprinting. [`format_event`] is pure (no I/O) for testability;
//! `print_event` is the stdout wrapper.

use crate::events::{Event, EventName};

/// Human-readable byte count: bytes below 1 KiB, otherwise one decimal.
fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

/// Format one event as display lines. Stage ends produce no output.
pub fn format_event(event: &Event<'_>) -> Vec<String> {
    match event {
        Event::Start => vec!["Generating PWA assets".to_string()],
        Event::StageStart { message, .. } => vec![message.to_string()],
        Event::Generated { artifact, .. } => vec![format!(
            "    {} ({})",
            artifact.filename,
            format_size(artifact.content.len())
        )],
        Event::StageEnd { .. } => Vec::new(),
        Event::End => vec!["Done".to_string()],
    }
}

/// Wildcard observer that writes [`format_event`] lines to stdout.
pub fn print_event(_name: EventName, event: &Event<'_>) {
    for line in format_event(event) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{PendingArtifact, Stage};

    #[test]
    fn format_size_bytes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn format_size_kilobytes() {
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(2150), "2.1 KB");
    }

    #[test]
    fn format_size_megabytes() {
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn start_and_end_lines() {
        assert_eq!(format_event(&Event::Start), vec!["Generating PWA assets"]);
        assert_eq!(format_event(&Event::End), vec!["Done"]);
    }

    #[test]
    fn stage_start_shows_message() {
        let event = Event::StageStart {
            stage: Stage::Favicon,
            message: "Generating favicons...",
        };
        assert_eq!(format_event(&event), vec!["Generating favicons..."]);
    }

    #[test]
    fn generated_shows_indented_name_and_size() {
        let artifact = PendingArtifact {
            stage: Stage::MsTile,
            filename: "mstile-70x70.png".to_string(),
            content: vec![0; 2048],
        };
        let event = Event::Generated {
            stage: Stage::MsTile,
            artifact: &artifact,
        };
        assert_eq!(format_event(&event), vec!["    mstile-70x70.png (2.0 KB)"]);
    }

    #[test]
    fn stage_end_is_silent() {
        let event = Event::StageEnd {
            stage: Stage::Screenshots,
        };
        assert!(format_event(&event).is_empty());
    }
}
