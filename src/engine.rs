use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::caption::{self, CaptionStyle, PhraseSelector, ThreadRngSelector};
use crate::conditions::{self, HostConditions, SystemConditionsProvider};
use crate::config::PhotocapConfig;
use crate::error::{FailureClass, Result};
use crate::health::VisionHealth;
use crate::image_source::DecodedImage;
use crate::pixel_analysis::{self, PixelFeatures};
use crate::signals::{AnalysisSignals, TextDensity};
use crate::throttle::VisionThrottle;
use crate::vision::{self, VisionAdapter, VisionBackend};

/// Ranked captioning strategies, richest first. The pixel-statistics rung is
/// the guaranteed-success terminal stage and is not listed: it runs whenever
/// everything above it has been exhausted or skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// Pixel features + selective classification + face/text/horizon
    /// detection, sequentially inside one throttle slot
    Comprehensive,
    /// Four detection sub-tasks fanned out inside one throttle slot, with
    /// permissive classification
    Intelligent,
    /// Text recognition alone; cheapest backend-dependent rung, does not
    /// touch health bookkeeping
    TextOnly,
}

/// Strategies attempted in descending fidelity order.
const LADDER: &[Strategy] = &[
    Strategy::Comprehensive,
    Strategy::Intelligent,
    Strategy::TextOnly,
];

/// The adaptive captioning orchestrator.
///
/// Owns the health gatekeeper, the concurrency throttle, and the fallback
/// ladder. One instance serves any number of concurrent
/// [`generate_caption`](Self::generate_caption) calls; heavy vision work is
/// serialized to a single in-flight operation.
pub struct CaptionEngine {
    backend: Arc<dyn VisionBackend>,
    health: Mutex<VisionHealth>,
    throttle: VisionThrottle,
    conditions: Box<dyn SystemConditionsProvider>,
    selector: Box<dyn PhraseSelector>,
    config: PhotocapConfig,
}

impl CaptionEngine {
    /// Engine with default configuration, host conditions, and random
    /// creative phrasing.
    pub fn new(backend: Arc<dyn VisionBackend>) -> Self {
        Self::with_config(backend, PhotocapConfig::default())
    }

    pub fn with_config(backend: Arc<dyn VisionBackend>, config: PhotocapConfig) -> Self {
        Self {
            backend,
            health: Mutex::new(VisionHealth::with_settings(config.health_settings())),
            throttle: VisionThrottle::new(),
            conditions: Box::new(HostConditions::probe()),
            selector: Box::new(ThreadRngSelector),
            config,
        }
    }

    /// Replace the system-conditions probe (tests, platform integrations).
    pub fn with_conditions(mut self, conditions: Box<dyn SystemConditionsProvider>) -> Self {
        self.conditions = conditions;
        self
    }

    /// Replace the creative phrase selector (deterministic tests).
    pub fn with_selector(mut self, selector: Box<dyn PhraseSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Replace the gatekeeper wholesale, e.g. to install a cleanup hook or
    /// start from a degraded score.
    pub fn with_health(mut self, health: VisionHealth) -> Self {
        self.health = Mutex::new(health);
        self
    }

    /// Current health score, for observability.
    pub async fn health_score(&self) -> f32 {
        self.health.lock().await.score()
    }

    /// Caption an image. Never fails: every vision failure descends the
    /// ladder, terminating in a pixel-statistics caption. The only degraded
    /// output is an explanatory string for an image with no readable pixels.
    pub async fn generate_caption(&self, image: &DecodedImage, style: CaptionStyle) -> String {
        if image.is_degenerate() {
            return caption::error_caption("no decodable pixel buffer");
        }

        // Pixel statistics are computed up front; every rung reuses them.
        let features = pixel_analysis::analyze(image);

        if conditions::should_bypass_vision(
            self.conditions.as_ref(),
            self.config.conditions.min_memory_bytes,
        ) {
            info!("System conditions force vision bypass, using pixel-only caption");
            return self.pixel_only_caption(&features, style);
        }

        if !self.health.lock().await.is_available() {
            info!("Vision subsystem unavailable, using pixel-only caption");
            return self.pixel_only_caption(&features, style);
        }

        let prepared = image.prepare_for_vision(self.config.vision.max_edge);

        for &strategy in LADDER {
            match self.run_strategy(strategy, &prepared, &features).await {
                Ok(signals) => {
                    if strategy.affects_health() {
                        self.health.lock().await.record_success();
                    }
                    debug!("Strategy {:?} succeeded", strategy);
                    return caption::synthesize(&signals, style, self.selector.as_ref());
                }
                Err(error) => {
                    let class = FailureClass::classify(&error);
                    warn!(
                        "Strategy {:?} failed ({:?}): {}, descending ladder",
                        strategy, class, error
                    );
                    if strategy.affects_health() {
                        self.health.lock().await.record_failure(class);
                    }
                }
            }
        }

        self.pixel_only_caption(&features, style)
    }

    async fn run_strategy(
        &self,
        strategy: Strategy,
        image: &DecodedImage,
        features: &PixelFeatures,
    ) -> Result<AnalysisSignals> {
        match strategy {
            Strategy::Comprehensive => self.comprehensive(image, features).await,
            Strategy::Intelligent => self.intelligent(image, features).await,
            Strategy::TextOnly => self.text_only(image, features).await,
        }
    }

    /// Full sequential analysis in one exclusive slot. Any sub-request
    /// failure fails the strategy.
    async fn comprehensive(
        &self,
        image: &DecodedImage,
        features: &PixelFeatures,
    ) -> Result<AnalysisSignals> {
        let adapter = VisionAdapter::new(self.backend.as_ref());
        let min_confidence = self.config.vision.selective_confidence;

        self.throttle
            .run_exclusive(async {
                let classifications = adapter.classify(image, min_confidence).await?;
                let faces = adapter.detect_faces(image).await?;
                let text_lines = adapter.recognize_text(image).await?;
                let horizon = adapter.detect_horizon(image).await?;

                Ok(AnalysisSignals {
                    classifications,
                    face_count: faces.len(),
                    face_description: vision::describe_faces(&faces),
                    text_density: TextDensity::from_line_count(text_lines.len()),
                    text_lines,
                    scene_tags: horizon
                        .map(|h| vec![scene_tag_for_horizon(h.angle_degrees)])
                        .unwrap_or_default(),
                    pixel_features: Some(features.clone()),
                })
            })
            .await
    }

    /// Four detection sub-tasks fanned out inside one throttle slot.
    /// Individual misses are tolerated; the parent fails only when every
    /// sub-task failed.
    async fn intelligent(
        &self,
        image: &DecodedImage,
        features: &PixelFeatures,
    ) -> Result<AnalysisSignals> {
        let adapter = VisionAdapter::new(self.backend.as_ref());
        let min_confidence = self.config.vision.permissive_confidence;

        self.throttle
            .run_exclusive(async {
                let (faces, objects, text_lines, horizon) = tokio::join!(
                    adapter.detect_faces(image),
                    adapter.classify(image, min_confidence),
                    adapter.recognize_text(image),
                    adapter.detect_horizon(image),
                );

                if let (Err(e), Err(_), Err(_), Err(_)) = (&faces, &objects, &text_lines, &horizon)
                {
                    return Err(crate::error::PhotocapError::model(e.to_string()));
                }

                let text_lines = text_lines.unwrap_or_default();
                Ok(AnalysisSignals {
                    classifications: objects.unwrap_or_default(),
                    face_count: faces.as_ref().map(|f| f.len()).unwrap_or(0),
                    face_description: faces.ok().as_deref().and_then(vision::describe_faces),
                    text_density: TextDensity::from_line_count(text_lines.len()),
                    text_lines,
                    scene_tags: horizon
                        .ok()
                        .flatten()
                        .map(|h| vec![scene_tag_for_horizon(h.angle_degrees)])
                        .unwrap_or_default(),
                    pixel_features: Some(features.clone()),
                })
            })
            .await
    }

    /// Cheapest backend rung: text recognition only. Failures here are
    /// per-call misses and never touch health.
    async fn text_only(
        &self,
        image: &DecodedImage,
        features: &PixelFeatures,
    ) -> Result<AnalysisSignals> {
        let adapter = VisionAdapter::new(self.backend.as_ref());

        self.throttle
            .run_exclusive(async {
                let text_lines = adapter.recognize_text(image).await?;
                Ok(AnalysisSignals {
                    text_density: TextDensity::from_line_count(text_lines.len()),
                    text_lines,
                    pixel_features: Some(features.clone()),
                    ..AnalysisSignals::default()
                })
            })
            .await
    }

    /// Terminal rung: pure pixel statistics, cannot fail.
    fn pixel_only_caption(&self, features: &PixelFeatures, style: CaptionStyle) -> String {
        let signals = AnalysisSignals {
            pixel_features: Some(features.clone()),
            ..AnalysisSignals::default()
        };
        caption::synthesize(&signals, style, self.selector.as_ref())
    }
}

impl Strategy {
    /// Only the two rich strategies feed the health gatekeeper; the text-only
    /// rung is a per-call convenience and the terminal rung never fails.
    fn affects_health(&self) -> bool {
        matches!(self, Strategy::Comprehensive | Strategy::Intelligent)
    }
}

fn scene_tag_for_horizon(angle_degrees: f32) -> String {
    if angle_degrees.abs() > 5.0 {
        "an outdoor scene with a tilted horizon".to_string()
    } else {
        "an outdoor scene with a visible horizon".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::FixedSelector;
    use crate::conditions::{FixedConditions, ThermalTier};
    use crate::error::PhotocapError;
    use crate::vision::{
        FaceObservation, HorizonObservation, NullVisionBackend, RawClassification, Region,
        TextObservation,
    };
    use async_trait::async_trait;

    fn red_square() -> DecodedImage {
        let mut data = Vec::new();
        for _ in 0..(64 * 64) {
            data.extend_from_slice(&[230, 20, 20, 255]);
        }
        DecodedImage::from_rgba(64, 64, data).unwrap()
    }

    /// Backend whose four requests succeed or fail per flags.
    struct ScriptedBackend {
        classify_ok: bool,
        faces_ok: bool,
        text_ok: bool,
        horizon_ok: bool,
        error_message: &'static str,
    }

    impl ScriptedBackend {
        fn healthy() -> Self {
            Self {
                classify_ok: true,
                faces_ok: true,
                text_ok: true,
                horizon_ok: true,
                error_message: "request failed",
            }
        }

        fn broken(message: &'static str) -> Self {
            Self {
                classify_ok: false,
                faces_ok: false,
                text_ok: false,
                horizon_ok: false,
                error_message: message,
            }
        }
    }

    #[async_trait]
    impl VisionBackend for ScriptedBackend {
        async fn classify(&self, _image: &DecodedImage) -> Result<Vec<RawClassification>> {
            if self.classify_ok {
                Ok(vec![RawClassification::new("mountain", 0.8)])
            } else {
                Err(PhotocapError::model(self.error_message))
            }
        }

        async fn detect_faces(&self, _image: &DecodedImage) -> Result<Vec<FaceObservation>> {
            if self.faces_ok {
                Ok(vec![FaceObservation {
                    bounds: Region {
                        x: 0.2,
                        y: 0.2,
                        width: 0.3,
                        height: 0.3,
                    },
                    confidence: 0.95,
                }])
            } else {
                Err(PhotocapError::model(self.error_message))
            }
        }

        async fn recognize_text(&self, _image: &DecodedImage) -> Result<Vec<TextObservation>> {
            if self.text_ok {
                Ok(Vec::new())
            } else {
                Err(PhotocapError::model(self.error_message))
            }
        }

        async fn detect_horizon(
            &self,
            _image: &DecodedImage,
        ) -> Result<Option<HorizonObservation>> {
            if self.horizon_ok {
                Ok(Some(HorizonObservation { angle_degrees: 1.0 }))
            } else {
                Err(PhotocapError::model(self.error_message))
            }
        }
    }

    fn test_engine(backend: Arc<dyn VisionBackend>) -> CaptionEngine {
        CaptionEngine::new(backend)
            .with_conditions(Box::new(FixedConditions::default()))
            .with_selector(Box::new(FixedSelector(0)))
    }

    #[tokio::test]
    async fn test_healthy_backend_factual_caption() {
        let engine = test_engine(Arc::new(ScriptedBackend::healthy()));
        let caption = engine
            .generate_caption(&red_square(), CaptionStyle::Factual)
            .await;

        assert!(caption.contains("Content: Mountain"), "{}", caption);
        assert!(caption.contains("Subjects: one person"), "{}", caption);
        assert!(caption.contains(". Subjects:"), "{}", caption);
        assert!((engine.health_score().await - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_broken_backend_falls_to_pixels() {
        let engine = test_engine(Arc::new(ScriptedBackend::broken("request failed")));
        let caption = engine
            .generate_caption(&red_square(), CaptionStyle::Creative)
            .await;

        assert!(caption.contains("vibrant warm"), "{}", caption);
        assert!(!caption.contains("Mountain"), "{}", caption);
        // Transient failures leave the score untouched
        assert!((engine.health_score().await - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_critical_failures_degrade_health() {
        let engine = test_engine(Arc::new(ScriptedBackend::broken(
            "vision context became corrupt",
        )));
        let caption = engine
            .generate_caption(&red_square(), CaptionStyle::Creative)
            .await;

        assert!(!caption.is_empty());
        // Comprehensive and intelligent both failed critically
        assert!((engine.health_score().await - 0.4).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_unavailable_health_skips_backend() {
        let mut health = VisionHealth::new();
        for _ in 0..5 {
            health.record_failure(FailureClass::Critical);
        }
        assert_eq!(health.score(), 0.0);

        let engine =
            test_engine(Arc::new(ScriptedBackend::healthy())).with_health(health);
        let caption = engine
            .generate_caption(&red_square(), CaptionStyle::Creative)
            .await;

        // Pixel-only output: no classification vocabulary
        assert!(caption.contains("vibrant warm"), "{}", caption);
        assert!(!caption.contains("Mountain"), "{}", caption);
    }

    #[tokio::test]
    async fn test_critical_thermal_bypasses_backend() {
        let engine = test_engine(Arc::new(ScriptedBackend::healthy())).with_conditions(
            Box::new(FixedConditions {
                thermal: ThermalTier::Critical,
                ..FixedConditions::default()
            }),
        );
        let caption = engine
            .generate_caption(&red_square(), CaptionStyle::Factual)
            .await;

        assert!(!caption.contains("Mountain"), "{}", caption);
        assert!(caption.contains("Palette:"), "{}", caption);
    }

    #[tokio::test]
    async fn test_null_backend_never_fails() {
        let engine = test_engine(Arc::new(NullVisionBackend));
        for style in [CaptionStyle::Creative, CaptionStyle::Factual] {
            let caption = engine.generate_caption(&red_square(), style).await;
            assert!(!caption.is_empty());
        }
    }

    #[tokio::test]
    async fn test_degenerate_image_gets_error_caption() {
        let engine = test_engine(Arc::new(NullVisionBackend));
        let empty = DecodedImage::from_rgba(0, 0, Vec::new()).unwrap();
        let caption = engine.generate_caption(&empty, CaptionStyle::Creative).await;
        assert!(caption.contains("Unable to analyze"), "{}", caption);
    }

    #[tokio::test]
    async fn test_close_up_face_described_in_caption() {
        struct CloseUpBackend;

        #[async_trait]
        impl VisionBackend for CloseUpBackend {
            async fn classify(&self, _image: &DecodedImage) -> Result<Vec<RawClassification>> {
                Ok(Vec::new())
            }

            async fn detect_faces(&self, _image: &DecodedImage) -> Result<Vec<FaceObservation>> {
                Ok(vec![FaceObservation {
                    bounds: Region {
                        x: 0.2,
                        y: 0.1,
                        width: 0.6,
                        height: 0.7,
                    },
                    confidence: 0.99,
                }])
            }

            async fn recognize_text(&self, _image: &DecodedImage) -> Result<Vec<TextObservation>> {
                Ok(Vec::new())
            }

            async fn detect_horizon(
                &self,
                _image: &DecodedImage,
            ) -> Result<Option<HorizonObservation>> {
                Ok(None)
            }
        }

        let engine = test_engine(Arc::new(CloseUpBackend));
        let caption = engine
            .generate_caption(&red_square(), CaptionStyle::Factual)
            .await;

        // Face prominence flows from the observation bounds into the clause
        assert!(
            caption.contains("Subjects: one person in close-up"),
            "{}",
            caption
        );
    }

    #[tokio::test]
    async fn test_intelligent_tolerates_partial_failures() {
        // Classification broken, everything else healthy: comprehensive
        // fails on its first sub-request, intelligent still delivers
        let backend = ScriptedBackend {
            classify_ok: false,
            faces_ok: true,
            text_ok: true,
            horizon_ok: true,
            error_message: "no result for classification request",
        };
        let engine = test_engine(Arc::new(backend));
        let caption = engine
            .generate_caption(&red_square(), CaptionStyle::Factual)
            .await;

        assert!(caption.contains("Subjects: one person"), "{}", caption);
        assert!(caption.contains("Scene: an outdoor scene"), "{}", caption);
        // Intelligent succeeded, so health recovered to full
        assert!((engine.health_score().await - 1.0).abs() < 1e-6);
    }
}
