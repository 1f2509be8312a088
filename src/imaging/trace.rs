//! Monochrome vector tracing for Safari pinned-tab icons.
//!
//! Safari's `mask-icon` is a single-color SVG silhouette. The tracer reduces
//! an RGBA raster to a 1-bit mask and emits the mask as a single SVG path:
//!
//! 1. **Mask**: if the image has transparent regions, a pixel is ink when it
//!    is at least half opaque (the icon's shape). A fully opaque image has
//!    no shape in its alpha channel, so ink is every pixel darker than the
//!    mean luminance instead.
//! 2. **Runs**: each row becomes horizontal runs of ink.
//! 3. **Rectangles**: runs with identical extents on consecutive rows are
//!    merged vertically, so solid areas cost one subpath instead of one per
//!    row.
//!
//! Output is deterministic for identical input.

/// Alpha at or above which a pixel counts as opaque.
const ALPHA_CUTOFF: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

/// Rec. 601 luma of an RGB triple.
fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

/// 1-bit ink mask in row-major order.
fn ink_mask(rgba: &[u8]) -> Vec<bool> {
    let has_transparency = rgba.chunks_exact(4).any(|p| p[3] < ALPHA_CUTOFF);
    if has_transparency {
        return rgba
            .chunks_exact(4)
            .map(|p| p[3] >= ALPHA_CUTOFF)
            .collect();
    }

    let count = (rgba.len() / 4).max(1) as f64;
    let mean = rgba
        .chunks_exact(4)
        .map(|p| luminance(p[0], p[1], p[2]))
        .sum::<f64>()
        / count;
    rgba.chunks_exact(4)
        .map(|p| luminance(p[0], p[1], p[2]) < mean)
        .collect()
}

/// Half-open `[start, end)` runs of ink in one row.
fn row_runs(row: &[bool]) -> Vec<(u32, u32)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (x, &ink) in row.iter().enumerate() {
        match (ink, start) {
            (true, None) => start = Some(x as u32),
            (false, Some(s)) => {
                runs.push((s, x as u32));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, row.len() as u32));
    }
    runs
}

/// Merge row runs into maximal vertical stacks of identical extent.
fn merge_runs(mask: &[bool], width: u32, height: u32) -> Vec<Rect> {
    let mut done = Vec::new();
    let mut open: Vec<Rect> = Vec::new();

    for y in 0..height {
        let start = (y * width) as usize;
        let row = &mask[start..start + width as usize];
        let mut continued = Vec::new();
        for (x0, x1) in row_runs(row) {
            let w = x1 - x0;
            match open.iter().position(|r| r.x == x0 && r.w == w) {
                Some(pos) => {
                    let mut rect = open.swap_remove(pos);
                    rect.h += 1;
                    continued.push(rect);
                }
                None => continued.push(Rect { x: x0, y, w, h: 1 }),
            }
        }
        done.append(&mut open);
        open = continued;
    }
    done.append(&mut open);
    done.sort_by_key(|r| (r.y, r.x));
    done
}

/// Trace an RGBA buffer into a monochrome SVG document.
///
/// `rgba` must hold `width * height * 4` bytes; shorter buffers are traced
/// as far as they go.
pub fn posterize(rgba: &[u8], width: u32, height: u32) -> String {
    let pixel_count = (width as usize * height as usize).min(rgba.len() / 4);
    let height = if width == 0 {
        0
    } else {
        (pixel_count / width as usize) as u32
    };
    let mask = ink_mask(&rgba[..(width * height) as usize * 4]);

    let mut d = String::new();
    for r in merge_runs(&mask, width, height) {
        d.push_str(&format!("M{} {}h{}v{}h-{}z", r.x, r.y, r.w, r.h, r.w));
    }

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    if !d.is_empty() {
        svg.push_str(&format!(r#"<path d="{d}" stroke="none" fill="black"/>"#));
    }
    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an RGBA buffer from a picture where `#` is opaque black and
    /// `.` is fully transparent.
    fn picture(rows: &[&str]) -> (Vec<u8>, u32, u32) {
        let width = rows[0].len() as u32;
        let mut buf = Vec::new();
        for row in rows {
            for c in row.chars() {
                if c == '#' {
                    buf.extend_from_slice(&[0, 0, 0, 255]);
                } else {
                    buf.extend_from_slice(&[0, 0, 0, 0]);
                }
            }
        }
        (buf, width, rows.len() as u32)
    }

    #[test]
    fn row_runs_finds_all_segments() {
        let row = [true, true, false, true, false, false, true];
        assert_eq!(row_runs(&row), vec![(0, 2), (3, 4), (6, 7)]);
    }

    #[test]
    fn solid_square_merges_into_one_rect() {
        let (buf, w, h) = picture(&["....", ".##.", ".##.", "...."]);
        let svg = posterize(&buf, w, h);
        assert!(svg.contains(r#"d="M1 1h2v2h-2z""#), "{svg}");
    }

    #[test]
    fn differing_runs_stay_separate() {
        let (buf, w, h) = picture(&["##..", "###."]);
        let svg = posterize(&buf, w, h);
        assert!(svg.contains("M0 0h2v1h-2z"), "{svg}");
        assert!(svg.contains("M0 1h3v1h-3z"), "{svg}");
    }

    #[test]
    fn empty_mask_has_no_path() {
        let (buf, w, h) = picture(&["...", "..."]);
        let svg = posterize(&buf, w, h);
        assert!(!svg.contains("<path"));
        assert!(svg.contains(r#"viewBox="0 0 3 2""#));
    }

    #[test]
    fn opaque_image_uses_luminance_threshold() {
        // Left half black, right half white, all opaque.
        let mut buf = Vec::new();
        for _ in 0..2 {
            buf.extend_from_slice(&[0, 0, 0, 255, 0, 0, 0, 255]);
            buf.extend_from_slice(&[255, 255, 255, 255, 255, 255, 255, 255]);
        }
        let svg = posterize(&buf, 4, 2);
        assert!(svg.contains(r#"d="M0 0h2v2h-2z""#), "{svg}");
    }

    #[test]
    fn output_is_deterministic() {
        let (buf, w, h) = picture(&["#.#.", ".#.#", "#.#."]);
        assert_eq!(posterize(&buf, w, h), posterize(&buf, w, h));
    }

    #[test]
    fn short_buffer_does_not_panic() {
        let svg = posterize(&[0, 0, 0, 255], 4, 4);
        assert!(svg.starts_with("<svg"));
    }
}
