pub mod caption;
pub mod conditions;
pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod image_source;
pub mod pixel_analysis;
pub mod signals;
pub mod throttle;
pub mod vision;

pub use caption::{
    error_caption, synthesize, CaptionStyle, FixedSelector, PhraseSelector, ThreadRngSelector,
    PENDING_PLACEHOLDER,
};
pub use conditions::{
    should_bypass_vision, FixedConditions, HostConditions, SystemConditionsProvider, ThermalTier,
    MIN_VISION_MEMORY_BYTES,
};
pub use config::PhotocapConfig;
pub use engine::CaptionEngine;
pub use error::{FailureClass, PhotocapError, Result};
pub use health::{HealthSettings, VisionHealth};
pub use image_source::{DecodedImage, MAX_VISION_EDGE};
pub use pixel_analysis::{analyze, PixelFeatures};
pub use signals::{AnalysisSignals, Classification, TextDensity};
pub use throttle::VisionThrottle;
pub use vision::{
    describe_faces, normalize_identifier, FaceObservation, HorizonObservation, NullVisionBackend,
    RawClassification, Region, TextObservation, VisionAdapter, VisionBackend,
};
