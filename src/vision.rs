use async_trait::async_trait;
use tracing::{debug, trace};

use crate::error::{PhotocapError, Result};
use crate::image_source::DecodedImage;
use crate::signals::Classification;

/// Normalized rectangle within the image, coordinates in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Raw classification as reported by the backend, before filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct RawClassification {
    pub identifier: String,
    pub confidence: f32,
}

impl RawClassification {
    pub fn new<S: Into<String>>(identifier: S, confidence: f32) -> Self {
        Self {
            identifier: identifier.into(),
            confidence,
        }
    }
}

/// A detected face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceObservation {
    pub bounds: Region,
    pub confidence: f32,
}

/// A recognized text line.
#[derive(Debug, Clone, PartialEq)]
pub struct TextObservation {
    pub text: String,
    pub confidence: f32,
}

/// A detected horizon line, evidence of an outdoor scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizonObservation {
    pub angle_degrees: f32,
}

/// The platform vision facility.
///
/// Each method submits exactly one request and resolves exactly once by
/// construction (an `async fn` returning `Result` cannot double-fire the way
/// a raw completion callback can). Implementations may be unavailable or
/// degraded at any time; callers own failure classification.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    async fn classify(&self, image: &DecodedImage) -> Result<Vec<RawClassification>>;
    async fn detect_faces(&self, image: &DecodedImage) -> Result<Vec<FaceObservation>>;
    async fn recognize_text(&self, image: &DecodedImage) -> Result<Vec<TextObservation>>;
    async fn detect_horizon(&self, image: &DecodedImage) -> Result<Option<HorizonObservation>>;
}

/// Generic identifiers that carry no captioning value at any confidence.
const GENERIC_TERMS: &[&str] = &["image", "photo", "object", "scene", "outdoor", "indoor"];

/// Confidence floor for the comprehensive strategy.
pub const SELECTIVE_CONFIDENCE: f32 = 0.6;
/// Confidence floor for the detailed multi-signal strategy.
pub const PERMISSIVE_CONFIDENCE: f32 = 0.1;

/// Replace separators with spaces and title-case each word:
/// `"suspension_bridge"` -> `"Suspension Bridge"`.
pub fn normalize_identifier(identifier: &str) -> String {
    identifier
        .split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resilience wrapper over a [`VisionBackend`].
///
/// Owns request composition and result conditioning: confidence filtering,
/// the generic-term blocklist, identifier normalization, and uniform
/// translation of every backend error into a `Model` error. It never
/// classifies failures itself; the ladder does that from the message.
pub struct VisionAdapter<'a> {
    backend: &'a dyn VisionBackend,
}

impl<'a> VisionAdapter<'a> {
    pub fn new(backend: &'a dyn VisionBackend) -> Self {
        Self { backend }
    }

    /// Classification with a given confidence floor. Generic terms are
    /// excluded regardless of confidence; survivors are normalized and
    /// ranked highest-confidence first.
    pub async fn classify(
        &self,
        image: &DecodedImage,
        min_confidence: f32,
    ) -> Result<Vec<Classification>> {
        let raw = self
            .backend
            .classify(image)
            .await
            .map_err(wrap_backend_error)?;
        trace!("Backend returned {} raw classifications", raw.len());

        let mut kept: Vec<Classification> = raw
            .into_iter()
            .filter(|c| c.confidence >= min_confidence)
            .filter(|c| {
                let lower = c.identifier.to_lowercase();
                !GENERIC_TERMS.iter().any(|t| lower == *t)
            })
            .map(|c| Classification::new(normalize_identifier(&c.identifier), c.confidence))
            .collect();
        kept.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            "Kept {} classifications at confidence >= {:.2}",
            kept.len(),
            min_confidence
        );
        Ok(kept)
    }

    pub async fn detect_faces(&self, image: &DecodedImage) -> Result<Vec<FaceObservation>> {
        self.backend
            .detect_faces(image)
            .await
            .map_err(wrap_backend_error)
    }

    /// Recognized text lines, empty or whitespace-only lines dropped.
    pub async fn recognize_text(&self, image: &DecodedImage) -> Result<Vec<String>> {
        let observations = self
            .backend
            .recognize_text(image)
            .await
            .map_err(wrap_backend_error)?;
        Ok(observations
            .into_iter()
            .map(|o| o.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect())
    }

    pub async fn detect_horizon(&self, image: &DecodedImage) -> Result<Option<HorizonObservation>> {
        self.backend
            .detect_horizon(image)
            .await
            .map_err(wrap_backend_error)
    }
}

/// Human-readable summary of detected faces, with a prominence qualifier
/// taken from the largest face's share of the frame. `None` when no faces
/// were observed.
pub fn describe_faces(faces: &[FaceObservation]) -> Option<String> {
    if faces.is_empty() {
        return None;
    }

    let count = match faces.len() {
        1 => "one person".to_string(),
        2 => "two people".to_string(),
        n => format!("a group of {} people", n),
    };

    let largest = faces
        .iter()
        .map(|f| f.bounds.width * f.bounds.height)
        .fold(0.0f32, f32::max);

    Some(if largest >= 0.25 {
        format!("{} in close-up", count)
    } else if largest < 0.02 {
        format!("{} in the distance", count)
    } else {
        count
    })
}

/// Every failure crossing the adapter boundary becomes a `Model` error so
/// the ladder sees one uniform shape. No timeout is applied here: a hung
/// backend call stalls the throttle slot until the platform resolves it.
fn wrap_backend_error(error: PhotocapError) -> PhotocapError {
    match error {
        already @ PhotocapError::Model { .. } => already,
        other => PhotocapError::model(other.to_string()),
    }
}

/// Backend for hosts without a platform vision facility: every request
/// resolves successfully with no observations, so captioning always lands on
/// the pixel-statistics rung.
#[derive(Debug, Default)]
pub struct NullVisionBackend;

#[async_trait]
impl VisionBackend for NullVisionBackend {
    async fn classify(&self, _image: &DecodedImage) -> Result<Vec<RawClassification>> {
        Ok(Vec::new())
    }

    async fn detect_faces(&self, _image: &DecodedImage) -> Result<Vec<FaceObservation>> {
        Ok(Vec::new())
    }

    async fn recognize_text(&self, _image: &DecodedImage) -> Result<Vec<TextObservation>> {
        Ok(Vec::new())
    }

    async fn detect_horizon(&self, _image: &DecodedImage) -> Result<Option<HorizonObservation>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedBackend {
        classifications: Vec<RawClassification>,
    }

    #[async_trait]
    impl VisionBackend for CannedBackend {
        async fn classify(&self, _image: &DecodedImage) -> Result<Vec<RawClassification>> {
            Ok(self.classifications.clone())
        }

        async fn detect_faces(&self, _image: &DecodedImage) -> Result<Vec<FaceObservation>> {
            Err(PhotocapError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "detector crashed",
            )))
        }

        async fn recognize_text(&self, _image: &DecodedImage) -> Result<Vec<TextObservation>> {
            Ok(vec![
                TextObservation {
                    text: "  OPEN 24 HOURS  ".to_string(),
                    confidence: 0.9,
                },
                TextObservation {
                    text: "   ".to_string(),
                    confidence: 0.4,
                },
            ])
        }

        async fn detect_horizon(
            &self,
            _image: &DecodedImage,
        ) -> Result<Option<HorizonObservation>> {
            Ok(None)
        }
    }

    fn test_image() -> DecodedImage {
        DecodedImage::from_rgba(2, 2, vec![0u8; 16]).unwrap()
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("suspension_bridge"), "Suspension Bridge");
        assert_eq!(normalize_identifier("golden-gate"), "Golden Gate");
        assert_eq!(normalize_identifier("mountain"), "Mountain");
        assert_eq!(normalize_identifier("sea.shore  cliff"), "Sea Shore Cliff");
    }

    fn face_at(width: f32, height: f32) -> FaceObservation {
        FaceObservation {
            bounds: Region {
                x: 0.1,
                y: 0.1,
                width,
                height,
            },
            confidence: 0.9,
        }
    }

    #[test]
    fn test_describe_faces_counts_and_prominence() {
        assert_eq!(describe_faces(&[]), None);
        assert_eq!(
            describe_faces(&[face_at(0.3, 0.3)]),
            Some("one person".to_string())
        );
        assert_eq!(
            describe_faces(&[face_at(0.6, 0.6)]),
            Some("one person in close-up".to_string())
        );
        assert_eq!(
            describe_faces(&[face_at(0.1, 0.1), face_at(0.05, 0.05)]),
            Some("two people in the distance".to_string())
        );
        // Prominence follows the largest face only
        assert_eq!(
            describe_faces(&[face_at(0.05, 0.05), face_at(0.5, 0.6), face_at(0.1, 0.1)]),
            Some("a group of 3 people in close-up".to_string())
        );
    }

    #[tokio::test]
    async fn test_confidence_filtering_and_blocklist() {
        let backend = CannedBackend {
            classifications: vec![
                RawClassification::new("mountain", 0.8),
                RawClassification::new("outdoor", 0.95),
                RawClassification::new("pine_tree", 0.65),
                RawClassification::new("rock", 0.3),
            ],
        };
        let adapter = VisionAdapter::new(&backend);

        let selective = adapter
            .classify(&test_image(), SELECTIVE_CONFIDENCE)
            .await
            .unwrap();
        let names: Vec<&str> = selective.iter().map(|c| c.identifier.as_str()).collect();
        assert_eq!(names, vec!["Mountain", "Pine Tree"]);

        let permissive = adapter
            .classify(&test_image(), PERMISSIVE_CONFIDENCE)
            .await
            .unwrap();
        assert_eq!(permissive.len(), 3);
        // Ranked by confidence, blocklisted term still excluded
        assert_eq!(permissive[0].identifier, "Mountain");
        assert_eq!(permissive[2].identifier, "Rock");
    }

    #[tokio::test]
    async fn test_backend_errors_become_model_errors() {
        let backend = CannedBackend {
            classifications: Vec::new(),
        };
        let adapter = VisionAdapter::new(&backend);

        let result = adapter.detect_faces(&test_image()).await;
        match result {
            Err(PhotocapError::Model { message }) => {
                assert!(message.contains("detector crashed"));
            }
            other => panic!("expected Model error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_text_lines_trimmed_and_filtered() {
        let backend = CannedBackend {
            classifications: Vec::new(),
        };
        let adapter = VisionAdapter::new(&backend);

        let lines = adapter.recognize_text(&test_image()).await.unwrap();
        assert_eq!(lines, vec!["OPEN 24 HOURS".to_string()]);
    }

    #[tokio::test]
    async fn test_null_backend_is_silent() {
        let backend = NullVisionBackend;
        let adapter = VisionAdapter::new(&backend);

        assert!(adapter
            .classify(&test_image(), PERMISSIVE_CONFIDENCE)
            .await
            .unwrap()
            .is_empty());
        assert!(adapter.detect_faces(&test_image()).await.unwrap().is_empty());
        assert!(adapter.recognize_text(&test_image()).await.unwrap().is_empty());
        assert!(adapter.detect_horizon(&test_image()).await.unwrap().is_none());
    }
}
