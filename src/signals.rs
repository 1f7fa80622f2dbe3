use crate::pixel_analysis::PixelFeatures;

/// A ranked classification produced by the vision backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Normalized identifier (separators replaced with spaces, title-cased)
    pub identifier: String,
    /// Backend confidence in [0, 1]
    pub confidence: f32,
}

impl Classification {
    pub fn new<S: Into<String>>(identifier: S, confidence: f32) -> Self {
        Self {
            identifier: identifier.into(),
            confidence,
        }
    }
}

/// Density bucket for recognized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextDensity {
    #[default]
    None,
    Sparse,
    Moderate,
    Substantial,
}

impl TextDensity {
    /// Bucket a line count the way the caption templates expect.
    pub fn from_line_count(lines: usize) -> Self {
        match lines {
            0 => TextDensity::None,
            1..=2 => TextDensity::Sparse,
            3..=6 => TextDensity::Moderate,
            _ => TextDensity::Substantial,
        }
    }

    pub fn describe(&self) -> Option<&'static str> {
        match self {
            TextDensity::None => None,
            TextDensity::Sparse => Some("a bit of text"),
            TextDensity::Moderate => Some("visible text"),
            TextDensity::Substantial => Some("substantial text"),
        }
    }
}

/// Evidence extracted for a single captioning call.
///
/// Every field is optional; the synthesizer omits clauses whose underlying
/// signal is empty. Constructed and consumed within one call, never stored.
#[derive(Debug, Clone, Default)]
pub struct AnalysisSignals {
    /// Ranked classifications, highest confidence first
    pub classifications: Vec<Classification>,
    /// Number of detected faces
    pub face_count: usize,
    /// Human-readable description of the detected people, if any
    pub face_description: Option<String>,
    /// Recognized text lines
    pub text_lines: Vec<String>,
    /// Density bucket derived from the text lines
    pub text_density: TextDensity,
    /// Scene/environment tags (e.g. "outdoor scene with visible horizon")
    pub scene_tags: Vec<String>,
    /// Pixel-derived features, present whenever the image had readable pixels
    pub pixel_features: Option<PixelFeatures>,
}

impl AnalysisSignals {
    /// True when no signal carries any content.
    pub fn is_empty(&self) -> bool {
        self.classifications.is_empty()
            && self.face_count == 0
            && self.text_lines.is_empty()
            && self.scene_tags.is_empty()
            && self.pixel_features.is_none()
    }

    /// Top classification identifier, if any.
    pub fn top_classification(&self) -> Option<&Classification> {
        self.classifications.first()
    }

    /// Highest classification confidence, 0.0 when there are none.
    pub fn top_confidence(&self) -> f32 {
        self.classifications
            .first()
            .map(|c| c.confidence)
            .unwrap_or(0.0)
    }
}
