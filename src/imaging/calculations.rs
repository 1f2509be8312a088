//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Dimensions that fit `source` inside `target` while keeping its aspect
/// ratio. One edge matches the target exactly, the other is at most the
/// target. Never returns a zero edge.
///
/// ```text
/// (1000, 500) into (100, 100) → (100, 50)
/// (300, 600) into (100, 100)  → (50, 100)
/// ```
pub fn calculate_contain_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;
    if src_w == 0 || src_h == 0 {
        return target;
    }

    let scale = f64::min(tgt_w as f64 / src_w as f64, tgt_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).clamp(1, tgt_w.max(1));
    let h = ((src_h as f64 * scale).round() as u32).clamp(1, tgt_h.max(1));
    (w, h)
}

/// Offset that centers an `inner` box inside an `outer` box.
pub fn centered_offset(inner: (u32, u32), outer: (u32, u32)) -> (i64, i64) {
    (
        (outer.0 as i64 - inner.0 as i64) / 2,
        (outer.1 as i64 - inner.1 as i64) / 2,
    )
}

/// Edge length of the content square left after insetting `padding` on
/// both sides of a `size` square. `None` if nothing would remain.
pub fn padded_inner_size(size: u32, padding: u32) -> Option<u32> {
    size.checked_sub(padding.checked_mul(2)?)
        .filter(|inner| *inner > 0)
}

/// Dimensions scaled so the longer edge equals `edge`, keeping aspect ratio.
pub fn scale_to_long_edge(source: (f32, f32), edge: u32) -> (u32, u32) {
    let (w, h) = source;
    let long = w.max(h);
    if long <= 0.0 {
        return (edge, edge);
    }
    let scale = edge as f32 / long;
    (
        ((w * scale).round() as u32).max(1),
        ((h * scale).round() as u32).max(1),
    )
}

/// Source alpha-composited over an opaque background, one channel.
pub fn blend_channel(src: u8, alpha: u8, background: u8) -> u8 {
    let a = alpha as u32;
    ((src as u32 * a + background as u32 * (255 - a) + 127) / 255) as u8
}
