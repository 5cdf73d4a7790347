use crate::render::gradient::Rgb;
use crate::render::sampler::PixelSample;
use std::collections::HashMap;

/// Samples below this alpha are anti-aliased edges or background and never count.
pub const MIN_ALPHA: u8 = 200;

/// Occurrence counts per color, remembering the order colors were first seen.
#[derive(Debug, Default, Clone)]
pub struct ColorHistogram {
    entries: Vec<(Rgb, u32)>,
    index: HashMap<Rgb, usize>,
}

impl ColorHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts the opaque samples at or below `luminance_threshold`.
    pub fn build<I>(samples: I, luminance_threshold: f64) -> Self
    where
        I: IntoIterator<Item = PixelSample>,
    {
        let mut hist = Self::new();
        for s in samples {
            if s.a < MIN_ALPHA {
                continue;
            }
            let color = Rgb::new(s.r, s.g, s.b);
            if color.luminance() > luminance_threshold {
                continue;
            }
            hist.add(color);
        }
        hist
    }

    pub fn add(&mut self, color: Rgb) {
        match self.index.get(&color) {
            Some(&i) => self.entries[i].1 = self.entries[i].1.saturating_add(1),
            None => {
                self.index.insert(color, self.entries.len());
                self.entries.push((color, 1));
            }
        }
    }

    pub fn count(&self, color: Rgb) -> u32 {
        self.index.get(&color).map(|&i| self.entries[i].1).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-seen order.
    pub fn entries(&self) -> &[(Rgb, u32)] {
        &self.entries
    }
}
