use crate::render::gradient::Rgb;
use crate::render::histogram::ColorHistogram;

pub const MAX_CANDIDATES: usize = 5;

/// Used when no pixel qualifies.
pub const FALLBACK_PRIMARY: Rgb = Rgb::new(24, 24, 27);
/// Used when no candidate is far enough from the primary. Differs from
/// [`FALLBACK_PRIMARY`] so the gradient stays visible.
pub const FALLBACK_SECONDARY: Rgb = Rgb::new(9, 9, 11);

/// The most frequent colors, most frequent first. Ties keep first-seen order.
pub fn candidates(hist: &ColorHistogram) -> Vec<Rgb> {
    let mut entries: Vec<(Rgb, u32)> = hist.entries().to_vec();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.into_iter().take(MAX_CANDIDATES).map(|(c, _)| c).collect()
}

/// Picks `(primary, secondary)` from the histogram.
pub fn select(hist: &ColorHistogram, min_contrast: f64) -> (Rgb, Rgb) {
    let candidates = candidates(hist);
    let primary = candidates.first().copied().unwrap_or(FALLBACK_PRIMARY);
    let secondary = candidates
        .iter()
        .skip(1)
        .find(|c| c.distance(&primary) > min_contrast)
        .copied()
        .unwrap_or(FALLBACK_SECONDARY);
    (primary, secondary)
}
