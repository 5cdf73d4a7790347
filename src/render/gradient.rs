use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An RGB triple. Its `"r,g,b"` text form is the histogram bucket identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Rec. 709 luma on the 0–255 scale.
    pub fn luminance(&self) -> f64 {
        0.2126 * self.r as f64 + 0.7152 * self.g as f64 + 0.0722 * self.b as f64
    }

    /// Plain Euclidean distance in RGB space, no perceptual weighting.
    pub fn distance(&self, other: &Rgb) -> f64 {
        let dr = self.r as f64 - other.r as f64;
        let dg = self.g as f64 - other.g as f64;
        let db = self.b as f64 - other.b as f64;
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color key {0:?}, expected \"r,g,b\"")]
pub struct ParseRgbError(String);

impl FromStr for Rgb {
    type Err = ParseRgbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',').map(|p| p.trim().parse::<u8>());
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(r)), Some(Ok(g)), Some(Ok(b)), None) => Ok(Rgb::new(r, g, b)),
            _ => Err(ParseRgbError(s.to_string())),
        }
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Tuning knobs for one extraction. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientOptions {
    pub luminance_threshold: f64,
    pub sample_rate: u32,
    pub angle: f64,
    pub min_contrast: f64,
}

impl Default for GradientOptions {
    fn default() -> Self {
        Self {
            luminance_threshold: 115.0,
            sample_rate: 6,
            angle: 135.0,
            min_contrast: 40.0,
        }
    }
}

impl GradientOptions {
    /// Defaults with any provided field replaced.
    pub fn with_overrides(overrides: &GradientOverrides) -> Self {
        Self::default().merge(overrides)
    }

    pub fn merge(self, overrides: &GradientOverrides) -> Self {
        Self {
            luminance_threshold: overrides.luminance_threshold.unwrap_or(self.luminance_threshold),
            sample_rate: overrides.sample_rate.unwrap_or(self.sample_rate).max(1),
            angle: overrides.angle.unwrap_or(self.angle),
            min_contrast: overrides.min_contrast.unwrap_or(self.min_contrast).max(0.0),
        }
    }
}

/// Partial options as supplied by a caller; unset fields fall back to defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientOverrides {
    pub luminance_threshold: Option<f64>,
    pub sample_rate: Option<u32>,
    pub angle: Option<f64>,
    pub min_contrast: Option<f64>,
}

impl GradientOverrides {
    /// Fields set in `other` win over fields set in `self`.
    pub fn layered(self, other: &GradientOverrides) -> Self {
        Self {
            luminance_threshold: other.luminance_threshold.or(self.luminance_threshold),
            sample_rate: other.sample_rate.or(self.sample_rate),
            angle: other.angle.or(self.angle),
            min_contrast: other.min_contrast.or(self.min_contrast),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradientResult {
    pub colors: (Rgb, Rgb),
    pub gradient: String,
}

impl GradientResult {
    pub fn new(angle: f64, primary: Rgb, secondary: Rgb) -> Self {
        Self {
            colors: (primary, secondary),
            gradient: compose(angle, primary, secondary),
        }
    }

    pub fn primary(&self) -> Rgb {
        self.colors.0
    }

    pub fn secondary(&self) -> Rgb {
        self.colors.1
    }
}

pub fn compose(angle: f64, primary: Rgb, secondary: Rgb) -> String {
    format!("linear-gradient({angle}deg, rgb({primary}), rgb({secondary}))")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_formats_angle_and_both_stops() {
        let g = compose(135.0, Rgb::new(10, 10, 10), Rgb::new(200, 10, 10));
        assert_eq!(g, "linear-gradient(135deg, rgb(10,10,10), rgb(200,10,10))");
    }

    #[test]
    fn compose_keeps_fractional_angles() {
        let g = compose(22.5, Rgb::new(0, 0, 0), Rgb::new(9, 9, 11));
        assert_eq!(g, "linear-gradient(22.5deg, rgb(0,0,0), rgb(9,9,11))");
    }

    #[test]
    fn color_key_text_form() {
        assert_eq!(Rgb::new(24, 24, 27).to_string(), "24,24,27");
        assert_eq!("24, 24,27".parse::<Rgb>(), Ok(Rgb::new(24, 24, 27)));
        assert!("24,24".parse::<Rgb>().is_err());
        assert!("24,24,27,1".parse::<Rgb>().is_err());
        assert!("256,0,0".parse::<Rgb>().is_err());
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Rgb::new(10, 10, 10);
        let b = Rgb::new(200, 10, 10);
        assert_eq!(a.distance(&b), 190.0);
        assert_eq!(Rgb::new(0, 0, 0).distance(&Rgb::new(3, 4, 0)), 5.0);
    }

    #[test]
    fn luminance_weights() {
        assert_eq!(Rgb::new(0, 0, 0).luminance(), 0.0);
        assert!((Rgb::new(200, 10, 10).luminance() - 50.394).abs() < 1e-9);
        assert!((Rgb::new(255, 255, 255).luminance() - 255.0).abs() < 1e-9);
    }

    #[test]
    fn overrides_fill_only_given_fields() {
        let o = GradientOptions::with_overrides(&GradientOverrides {
            angle: Some(90.0),
            ..Default::default()
        });
        assert_eq!(o.angle, 90.0);
        assert_eq!(o.sample_rate, 6);
        assert_eq!(o.luminance_threshold, 115.0);
        assert_eq!(o.min_contrast, 40.0);
    }

    #[test]
    fn overrides_are_clamped() {
        let o = GradientOptions::with_overrides(&GradientOverrides {
            sample_rate: Some(0),
            min_contrast: Some(-5.0),
            ..Default::default()
        });
        assert_eq!(o.sample_rate, 1);
        assert_eq!(o.min_contrast, 0.0);
    }

    #[test]
    fn layered_overrides_prefer_later_layer() {
        let base = GradientOverrides { angle: Some(90.0), sample_rate: Some(2), ..Default::default() };
        let top = GradientOverrides { angle: Some(45.0), ..Default::default() };
        let merged = base.layered(&top);
        assert_eq!(merged.angle, Some(45.0));
        assert_eq!(merged.sample_rate, Some(2));
        assert_eq!(merged.min_contrast, None);
    }

    #[test]
    fn result_serializes_colors_as_keys() {
        let r = GradientResult::new(135.0, Rgb::new(0, 0, 0), Rgb::new(9, 9, 11));
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(
            json,
            r#"{"colors":["0,0,0","9,9,11"],"gradient":"linear-gradient(135deg, rgb(0,0,0), rgb(9,9,11))"}"#
        );
        let back: GradientResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
