use crate::image_source::DecodedImage;

/// Sampling stride for brightness/contrast/edge passes. Full-resolution scans
/// are unnecessary for bucketed statistics.
const LUMA_STRIDE: u32 = 10;
/// Coarser stride for the color-complexity pass, which is the most expensive
/// per-pixel categorization.
const COLOR_STRIDE: u32 = 15;

/// Summed-RGB difference above which two neighboring pixels count as an edge.
const EDGE_DELTA: i32 = 30;

/// Brightness tier over mean luma.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrightnessTier {
    BrightlyLit,
    WellLit,
    ModeratelyLit,
    DimlyLit,
    DarklyLit,
}

impl BrightnessTier {
    fn from_luma(luma: f32) -> Self {
        if luma > 0.8 {
            BrightnessTier::BrightlyLit
        } else if luma > 0.6 {
            BrightnessTier::WellLit
        } else if luma > 0.4 {
            BrightnessTier::ModeratelyLit
        } else if luma > 0.2 {
            BrightnessTier::DimlyLit
        } else {
            BrightnessTier::DarklyLit
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            BrightnessTier::BrightlyLit => "brightly lit",
            BrightnessTier::WellLit => "well lit",
            BrightnessTier::ModeratelyLit => "moderately lit",
            BrightnessTier::DimlyLit => "dimly lit",
            BrightnessTier::DarklyLit => "darkly lit",
        }
    }
}

/// Contrast tier over the luma standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContrastTier {
    High,
    Moderate,
    Low,
}

impl ContrastTier {
    fn from_std_dev(std_dev: f32) -> Self {
        if std_dev > 0.3 {
            ContrastTier::High
        } else if std_dev > 0.15 {
            ContrastTier::Moderate
        } else {
            ContrastTier::Low
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            ContrastTier::High => "high contrast",
            ContrastTier::Moderate => "moderate contrast",
            ContrastTier::Low => "low contrast",
        }
    }
}

/// Edge-density tier: how busy the composition reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeTier {
    Intricate,
    Balanced,
    Smooth,
}

impl EdgeTier {
    fn from_density(density: f32) -> Self {
        if density > 0.3 {
            EdgeTier::Intricate
        } else if density > 0.15 {
            EdgeTier::Balanced
        } else {
            EdgeTier::Smooth
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            EdgeTier::Intricate => "intricate detail",
            EdgeTier::Balanced => "balanced detail",
            EdgeTier::Smooth => "smooth composition",
        }
    }
}

/// Distinct-color-bucket tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorComplexity {
    Rich,
    Varied,
    Simple,
}

impl ColorComplexity {
    fn from_bucket_count(count: usize) -> Self {
        if count > 8 {
            ColorComplexity::Rich
        } else if count > 4 {
            ColorComplexity::Varied
        } else {
            ColorComplexity::Simple
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            ColorComplexity::Rich => "a rich color palette",
            ColorComplexity::Varied => "a varied color palette",
            ColorComplexity::Simple => "a simple color palette",
        }
    }
}

/// Orientation bucket used by the creative templates. Thresholds are tuned
/// for framing language and intentionally differ from [`Composition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    TallPortrait,
    Portrait,
    Square,
    Landscape,
    WideLandscape,
}

impl Framing {
    fn from_aspect(aspect: f32) -> Self {
        if aspect < 0.7 {
            Framing::TallPortrait
        } else if aspect < 0.8 {
            Framing::Portrait
        } else if aspect > 1.5 {
            Framing::WideLandscape
        } else if aspect > 1.2 {
            Framing::Landscape
        } else {
            Framing::Square
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Framing::TallPortrait => "a tall portrait frame",
            Framing::Portrait => "a portrait frame",
            Framing::Square => "a square frame",
            Framing::Landscape => "a landscape frame",
            Framing::WideLandscape => "a wide panoramic frame",
        }
    }
}

/// Orientation bucket used by the factual templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composition {
    Portrait,
    Square,
    Landscape,
}

impl Composition {
    fn from_aspect(aspect: f32) -> Self {
        if aspect < 0.75 {
            Composition::Portrait
        } else if aspect > 1.33 {
            Composition::Landscape
        } else {
            Composition::Square
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Composition::Portrait => "portrait orientation",
            Composition::Square => "square orientation",
            Composition::Landscape => "landscape orientation",
        }
    }
}

/// Named color bucket used for complexity counting and dominant colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ColorBucket {
    Red,
    Orange,
    Yellow,
    Green,
    Cyan,
    Blue,
    Purple,
    Pink,
    White,
    Gray,
    Black,
}

const COLOR_BUCKET_COUNT: usize = 11;

impl ColorBucket {
    fn index(&self) -> usize {
        *self as usize
    }

    fn from_index(index: usize) -> Self {
        match index {
            0 => ColorBucket::Red,
            1 => ColorBucket::Orange,
            2 => ColorBucket::Yellow,
            3 => ColorBucket::Green,
            4 => ColorBucket::Cyan,
            5 => ColorBucket::Blue,
            6 => ColorBucket::Purple,
            7 => ColorBucket::Pink,
            8 => ColorBucket::White,
            9 => ColorBucket::Gray,
            _ => ColorBucket::Black,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ColorBucket::Red => "red",
            ColorBucket::Orange => "orange",
            ColorBucket::Yellow => "yellow",
            ColorBucket::Green => "green",
            ColorBucket::Cyan => "cyan",
            ColorBucket::Blue => "blue",
            ColorBucket::Purple => "purple",
            ColorBucket::Pink => "pink",
            ColorBucket::White => "white",
            ColorBucket::Gray => "gray",
            ColorBucket::Black => "black",
        }
    }

    /// Categorize a pixel by hue/saturation/lightness.
    fn categorize(r: u8, g: u8, b: u8) -> Self {
        let (hue, saturation, lightness) = rgb_to_hsl(r, g, b);

        if lightness > 0.92 {
            return ColorBucket::White;
        }
        if lightness < 0.08 {
            return ColorBucket::Black;
        }
        if saturation < 0.12 {
            return ColorBucket::Gray;
        }

        match hue as u32 {
            0..=19 | 340..=360 => ColorBucket::Red,
            20..=44 => ColorBucket::Orange,
            45..=69 => ColorBucket::Yellow,
            70..=159 => ColorBucket::Green,
            160..=199 => ColorBucket::Cyan,
            200..=259 => ColorBucket::Blue,
            260..=289 => ColorBucket::Purple,
            _ => ColorBucket::Pink,
        }
    }
}

/// Complete pixel-derived feature set for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelFeatures {
    /// Mean luma in [0, 1]
    pub brightness: f32,
    pub brightness_tier: BrightnessTier,
    /// Luma standard deviation
    pub contrast: f32,
    pub contrast_tier: ContrastTier,
    /// Edge pixels / sampled pixels
    pub edge_density: f32,
    pub edge_tier: EdgeTier,
    /// Dominant tone phrase from the 10x10 downsample average
    pub dominant_tone: &'static str,
    pub color_complexity: ColorComplexity,
    /// Top-3 named color buckets by sample frequency
    pub dominant_colors: Vec<&'static str>,
    pub framing: Framing,
    pub composition: Composition,
}

impl PixelFeatures {
    /// Neutral feature set used when pixel access is unavailable. Captioning
    /// must still produce a plausible string.
    pub fn neutral() -> Self {
        Self {
            brightness: 0.5,
            brightness_tier: BrightnessTier::ModeratelyLit,
            contrast: 0.0,
            contrast_tier: ContrastTier::Low,
            edge_density: 0.0,
            edge_tier: EdgeTier::Smooth,
            dominant_tone: "muted gray tones",
            color_complexity: ColorComplexity::Simple,
            dominant_colors: vec!["gray"],
            framing: Framing::Square,
            composition: Composition::Square,
        }
    }
}

fn luma(r: u8, g: u8, b: u8) -> f32 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) / 255.0
}

/// RGB -> (hue degrees [0,360], saturation [0,1], lightness [0,1]).
fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let lightness = (max + min) / 2.0;

    if delta < f32::EPSILON {
        return (0.0, 0.0, lightness);
    }

    let saturation = if lightness > 0.5 {
        delta / (2.0 - max - min)
    } else {
        delta / (max + min)
    };

    let hue = if (max - r).abs() < f32::EPSILON {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if (max - g).abs() < f32::EPSILON {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    (hue, saturation, lightness)
}

/// Run the full pixel-statistics pass. Pure, deterministic, and infallible:
/// degenerate images produce the neutral feature set.
pub fn analyze(image: &DecodedImage) -> PixelFeatures {
    if image.is_degenerate() {
        return PixelFeatures::neutral();
    }

    let (brightness, contrast) = luma_statistics(image);
    let edge_density = edge_density(image);
    let (complexity, dominant_colors) = color_statistics(image);
    let aspect = image.aspect_ratio();

    PixelFeatures {
        brightness,
        brightness_tier: BrightnessTier::from_luma(brightness),
        contrast,
        contrast_tier: ContrastTier::from_std_dev(contrast),
        edge_density,
        edge_tier: EdgeTier::from_density(edge_density),
        dominant_tone: dominant_tone(image),
        color_complexity: complexity,
        dominant_colors,
        framing: Framing::from_aspect(aspect),
        composition: Composition::from_aspect(aspect),
    }
}

/// Mean and standard deviation of sampled luma values.
fn luma_statistics(image: &DecodedImage) -> (f32, f32) {
    let mut values = Vec::new();
    let mut y = 0;
    while y < image.height() {
        let mut x = 0;
        while x < image.width() {
            if let Some([r, g, b, _]) = image.pixel_rgba(x, y) {
                values.push(luma(r, g, b));
            }
            x += LUMA_STRIDE;
        }
        y += LUMA_STRIDE;
    }

    if values.is_empty() {
        return (0.5, 0.0);
    }

    let mean = values.iter().sum::<f32>() / values.len() as f32;
    let variance =
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / values.len() as f32;
    (mean, variance.sqrt())
}

/// Fraction of sampled interior pixels whose summed-RGB difference against
/// the right or below neighbor exceeds the edge delta.
fn edge_density(image: &DecodedImage) -> f32 {
    let mut sampled = 0u32;
    let mut edges = 0u32;

    let mut y = 0;
    while y + 1 < image.height() {
        let mut x = 0;
        while x + 1 < image.width() {
            if let (Some(here), Some(right), Some(below)) = (
                image.pixel_rgba(x, y),
                image.pixel_rgba(x + 1, y),
                image.pixel_rgba(x, y + 1),
            ) {
                sampled += 1;
                let sum = |p: [u8; 4]| p[0] as i32 + p[1] as i32 + p[2] as i32;
                if (sum(here) - sum(right)).abs() > EDGE_DELTA
                    || (sum(here) - sum(below)).abs() > EDGE_DELTA
                {
                    edges += 1;
                }
            }
            x += LUMA_STRIDE;
        }
        y += LUMA_STRIDE;
    }

    if sampled == 0 {
        return 0.0;
    }
    edges as f32 / sampled as f32
}

/// Dominant tone phrase from the average RGB of a 10x10 downsample.
fn dominant_tone(image: &DecodedImage) -> &'static str {
    let grid = 10u32;
    let step_x = (image.width() / grid).max(1);
    let step_y = (image.height() / grid).max(1);

    let (mut sum_r, mut sum_g, mut sum_b) = (0u64, 0u64, 0u64);
    let mut count = 0u64;
    let mut y = 0;
    while y < image.height() {
        let mut x = 0;
        while x < image.width() {
            if let Some([r, g, b, _]) = image.pixel_rgba(x, y) {
                sum_r += r as u64;
                sum_g += g as u64;
                sum_b += b as u64;
                count += 1;
            }
            x += step_x;
        }
        y += step_y;
    }

    if count == 0 {
        return "muted gray tones";
    }

    let r = (sum_r / count) as u8;
    let g = (sum_g / count) as u8;
    let b = (sum_b / count) as u8;
    let (_, saturation, _) = rgb_to_hsl(r, g, b);

    if saturation < 0.15 {
        // Near-gray: tier by luminance instead of hue
        let l = luma(r, g, b);
        if l > 0.8 {
            "bright white tones"
        } else if l > 0.55 {
            "light gray tones"
        } else if l > 0.3 {
            "muted gray tones"
        } else {
            "deep black tones"
        }
    } else if r >= g && r >= b {
        "vibrant warm tones"
    } else if g >= r && g >= b {
        "natural green tones"
    } else {
        "cool blue tones"
    }
}

/// Distinct-bucket complexity tier and top-3 color names by frequency.
fn color_statistics(image: &DecodedImage) -> (ColorComplexity, Vec<&'static str>) {
    let mut counts = [0u32; COLOR_BUCKET_COUNT];

    let mut y = 0;
    while y < image.height() {
        let mut x = 0;
        while x < image.width() {
            if let Some([r, g, b, _]) = image.pixel_rgba(x, y) {
                counts[ColorBucket::categorize(r, g, b).index()] += 1;
            }
            x += COLOR_STRIDE;
        }
        y += COLOR_STRIDE;
    }

    let distinct = counts.iter().filter(|&&c| c > 0).count();
    let complexity = ColorComplexity::from_bucket_count(distinct);

    let mut ranked: Vec<(usize, u32)> = counts
        .iter()
        .copied()
        .enumerate()
        .filter(|&(_, c)| c > 0)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let dominant = ranked
        .into_iter()
        .take(3)
        .map(|(i, _)| ColorBucket::from_index(i).name())
        .collect();

    (complexity, dominant)
}
