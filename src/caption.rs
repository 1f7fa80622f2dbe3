use rand::Rng;

use crate::signals::AnalysisSignals;

/// Caption style requested by the caller.
///
/// `pending`/`error` display states never reach the synthesizer; callers
/// render [`PENDING_PLACEHOLDER`] or [`error_caption`] themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptionStyle {
    #[default]
    Creative,
    Factual,
}

impl std::str::FromStr for CaptionStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "creative" => Ok(CaptionStyle::Creative),
            "factual" => Ok(CaptionStyle::Factual),
            other => Err(format!("unknown caption style: {}", other)),
        }
    }
}

/// Caller-side placeholder while a caption is being computed.
pub const PENDING_PLACEHOLDER: &str = "Analyzing photo...";

/// Caller-side caption for an image that could not be decoded at all. The
/// only path where a failure surfaces to the user as an explicit error.
pub fn error_caption(details: &str) -> String {
    format!("Unable to analyze this photo: {}", details)
}

/// Neutral factual sentence when every signal is empty.
const EMPTY_FACTUAL: &str = "A photograph with no distinguishing features detected.";
/// Neutral creative sentence when every signal is empty.
const EMPTY_CREATIVE: &str = "A moment captured in time, waiting to tell its story.";

const OPENERS: &[&str] = &[
    "A captivating shot",
    "A striking image",
    "A beautifully captured moment",
    "An evocative frame",
    "A quiet study",
];

const TONE_DESCRIPTORS: &[&str] = &[
    "bathed in",
    "washed with",
    "rendered in",
    "glowing with",
    "steeped in",
];

/// Chooses an index into a phrase table. The production selector is
/// random; tests inject a fixed one for deterministic phrasing.
pub trait PhraseSelector: Send + Sync {
    fn pick(&self, len: usize) -> usize;
}

/// Uniformly random phrase selection.
#[derive(Debug, Default)]
pub struct ThreadRngSelector;

impl PhraseSelector for ThreadRngSelector {
    fn pick(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..len)
    }
}

/// Always picks the same slot (clamped to the table), for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedSelector(pub usize);

impl PhraseSelector for FixedSelector {
    fn pick(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            self.0.min(len - 1)
        }
    }
}

/// Render a caption from the gathered signals. Pure apart from phrase
/// selection; the factual family uses no selection at all and is fully
/// deterministic.
pub fn synthesize(
    signals: &AnalysisSignals,
    style: CaptionStyle,
    selector: &dyn PhraseSelector,
) -> String {
    match style {
        CaptionStyle::Factual => synthesize_factual(signals),
        CaptionStyle::Creative => synthesize_creative(signals, selector),
    }
}

fn people_phrase(count: usize) -> String {
    match count {
        1 => "one person".to_string(),
        2 => "two people".to_string(),
        n => format!("a group of {} people", n),
    }
}

fn join_natural(items: &[String]) -> String {
    match items.len() {
        0 => String::new(),
        1 => items[0].clone(),
        2 => format!("{} and {}", items[0], items[1]),
        _ => format!(
            "{} and {}",
            items[..items.len() - 1].join(", "),
            items[items.len() - 1]
        ),
    }
}

fn synthesize_factual(signals: &AnalysisSignals) -> String {
    let mut clauses: Vec<String> = Vec::new();

    if !signals.classifications.is_empty() {
        let names: Vec<String> = signals
            .classifications
            .iter()
            .take(3)
            .map(|c| c.identifier.clone())
            .collect();
        clauses.push(format!("Content: {}", join_natural(&names)));
    }

    if signals.face_count > 0 {
        let subject = signals
            .face_description
            .clone()
            .unwrap_or_else(|| people_phrase(signals.face_count));
        clauses.push(format!("Subjects: {}", subject));
    }

    if let Some(density) = signals.text_density.describe() {
        match signals.text_lines.first() {
            Some(line) => clauses.push(format!("Text: {} including \"{}\"", density, line)),
            None => clauses.push(format!("Text: {}", density)),
        }
    }

    if !signals.scene_tags.is_empty() {
        clauses.push(format!("Scene: {}", signals.scene_tags.join(", ")));
    }

    if let Some(ref features) = signals.pixel_features {
        clauses.push(format!(
            "Composition: {}, {}, {}, {}",
            features.composition.describe(),
            features.brightness_tier.describe(),
            features.contrast_tier.describe(),
            features.edge_tier.describe(),
        ));
        clauses.push(format!(
            "Palette: {} with {}",
            features.dominant_tone,
            features.color_complexity.describe(),
        ));
    }

    if clauses.is_empty() {
        return EMPTY_FACTUAL.to_string();
    }
    format!("{}.", clauses.join(". "))
}

fn synthesize_creative(signals: &AnalysisSignals, selector: &dyn PhraseSelector) -> String {
    if signals.is_empty() {
        return EMPTY_CREATIVE.to_string();
    }

    let opener = OPENERS[selector.pick(OPENERS.len())];
    let mut sentence = String::from(opener);

    if let Some(ref features) = signals.pixel_features {
        sentence.push_str(&format!(" in {}", features.framing.describe()));
        let descriptor = TONE_DESCRIPTORS[selector.pick(TONE_DESCRIPTORS.len())];
        sentence.push_str(&format!(", {} {}", descriptor, features.dominant_tone));
    }

    let mut subjects: Vec<String> = Vec::new();
    if signals.face_count > 0 {
        subjects.push(
            signals
                .face_description
                .clone()
                .unwrap_or_else(|| people_phrase(signals.face_count)),
        );
    }
    subjects.extend(signals.classifications.iter().map(|c| c.identifier.clone()));
    if !subjects.is_empty() {
        sentence.push_str(&format!(", featuring {}", join_natural(&subjects)));
    }

    if !signals.scene_tags.is_empty() {
        let tags: Vec<String> = signals.scene_tags.clone();
        sentence.push_str(&format!(" in {}", join_natural(&tags)));
    }

    if let Some(density) = signals.text_density.describe() {
        match signals.text_lines.first() {
            Some(line) => sentence.push_str(&format!(", with {} reading \"{}\"", density, line)),
            None => sentence.push_str(&format!(", with {}", density)),
        }
    }

    sentence.push_str(quality_modifier(signals));
    sentence.push('.');
    sentence
}

/// Closing flourish derived from classification confidence and contrast.
fn quality_modifier(signals: &AnalysisSignals) -> &'static str {
    use crate::pixel_analysis::ContrastTier;

    if signals.top_confidence() > 0.8 {
        return ", captured with striking clarity";
    }
    if let Some(ref features) = signals.pixel_features {
        if features.contrast_tier == ContrastTier::High {
            return ", full of bold contrast";
        }
    }
    if signals.top_confidence() > 0.5 {
        ", with a pleasing balance"
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_analysis::PixelFeatures;
    use crate::signals::{Classification, TextDensity};

    fn rich_signals() -> AnalysisSignals {
        AnalysisSignals {
            classifications: vec![
                Classification::new("Mountain", 0.85),
                Classification::new("Pine Tree", 0.7),
            ],
            face_count: 2,
            face_description: None,
            text_lines: vec!["TRAILHEAD".to_string()],
            text_density: TextDensity::Sparse,
            scene_tags: vec!["an outdoor scene with a visible horizon".to_string()],
            pixel_features: Some(PixelFeatures::neutral()),
        }
    }

    #[test]
    fn test_factual_is_deterministic() {
        let signals = rich_signals();
        let a = synthesize(&signals, CaptionStyle::Factual, &FixedSelector(0));
        let b = synthesize(&signals, CaptionStyle::Factual, &FixedSelector(3));
        assert_eq!(a, b);
    }

    #[test]
    fn test_factual_contains_labeled_clauses() {
        let caption = synthesize(&rich_signals(), CaptionStyle::Factual, &FixedSelector(0));

        assert!(caption.contains("Content: Mountain and Pine Tree"));
        assert!(caption.contains("Subjects: two people"));
        assert!(caption.contains("Text: a bit of text including \"TRAILHEAD\""));
        assert!(caption.contains("Scene: an outdoor scene"));
        assert!(caption.contains("Composition: square orientation"));
        assert!(caption.ends_with('.'));
        // Clauses are period-separated
        assert!(caption.contains(". Subjects:"));
    }

    #[test]
    fn test_factual_omits_empty_clauses() {
        let mut signals = rich_signals();
        signals.face_count = 0;
        signals.text_lines.clear();
        signals.text_density = TextDensity::None;

        let caption = synthesize(&signals, CaptionStyle::Factual, &FixedSelector(0));
        assert!(!caption.contains("Subjects:"));
        assert!(!caption.contains("Text:"));
        assert!(caption.contains("Content: Mountain"));
    }

    #[test]
    fn test_face_description_overrides_count_phrase() {
        let mut signals = rich_signals();
        signals.face_description = Some("two people in close-up".to_string());

        let factual = synthesize(&signals, CaptionStyle::Factual, &FixedSelector(0));
        assert!(factual.contains("Subjects: two people in close-up"), "{}", factual);

        let creative = synthesize(&signals, CaptionStyle::Creative, &FixedSelector(0));
        assert!(creative.contains("two people in close-up"), "{}", creative);
    }

    #[test]
    fn test_empty_signals_neutral_sentences() {
        let signals = AnalysisSignals::default();
        assert_eq!(
            synthesize(&signals, CaptionStyle::Factual, &FixedSelector(0)),
            EMPTY_FACTUAL
        );
        assert_eq!(
            synthesize(&signals, CaptionStyle::Creative, &FixedSelector(0)),
            EMPTY_CREATIVE
        );
    }

    #[test]
    fn test_creative_contains_all_signal_content() {
        let signals = rich_signals();
        // Every selector slot must still surface every non-empty signal
        for slot in 0..5 {
            let caption = synthesize(&signals, CaptionStyle::Creative, &FixedSelector(slot));
            assert!(caption.contains("Mountain"), "{}", caption);
            assert!(caption.contains("Pine Tree"), "{}", caption);
            assert!(caption.contains("two people"), "{}", caption);
            assert!(caption.contains("TRAILHEAD"), "{}", caption);
            assert!(caption.contains("outdoor scene"), "{}", caption);
            assert!(caption.ends_with('.'), "{}", caption);
        }
    }

    #[test]
    fn test_creative_quality_modifier_from_confidence() {
        let signals = rich_signals();
        let caption = synthesize(&signals, CaptionStyle::Creative, &FixedSelector(1));
        assert!(caption.contains("captured with striking clarity"));
    }

    #[test]
    fn test_pixel_only_creative_mentions_tone() {
        let mut features = PixelFeatures::neutral();
        features.dominant_tone = "vibrant warm tones";
        let signals = AnalysisSignals {
            pixel_features: Some(features),
            ..AnalysisSignals::default()
        };

        let caption = synthesize(&signals, CaptionStyle::Creative, &FixedSelector(2));
        assert!(caption.contains("vibrant warm tones"));
        assert!(!caption.contains("featuring"));
    }

    #[test]
    fn test_style_parsing() {
        assert_eq!("creative".parse::<CaptionStyle>().unwrap(), CaptionStyle::Creative);
        assert_eq!("Factual".parse::<CaptionStyle>().unwrap(), CaptionStyle::Factual);
        assert!("pending".parse::<CaptionStyle>().is_err());
    }

    #[test]
    fn test_error_caption_embeds_details() {
        let caption = error_caption("decode failed: truncated file");
        assert!(caption.contains("decode failed: truncated file"));
    }
}
