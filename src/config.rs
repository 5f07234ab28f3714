//! Configuration types for background-to-alpha operations

use crate::color::{Color, ColorFamily};
use crate::error::{BgAlphaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default Lab ΔE threshold for auto-detected backgrounds
pub const DEFAULT_THRESHOLD: f32 = 8.0;

/// Default feather radius in pixels
pub const DEFAULT_FEATHER_RADIUS: f32 = 1.5;

/// Default image acquisition timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default cap on the number of items a single batch will process
pub const DEFAULT_MAX_ITEMS: usize = 20;

/// Bilateral filter spatial sigma used when smoothing is enabled
pub const SMOOTH_SPATIAL_SIGMA: f32 = 2.0;

/// Bilateral filter intensity sigma used when smoothing is enabled
pub const SMOOTH_INTENSITY_SIGMA: f32 = 30.0;

/// Durations travel as integer milliseconds in serialized configs
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Configuration for one pipeline invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Lab ΔE below which a pixel counts as background (not RGB units)
    pub threshold: f32,

    /// Run the bilateral filter over the color channels
    pub smooth: bool,

    /// Feather radius in pixels (0 disables feathering)
    pub feather_radius: f32,

    /// Background color to remove; detected from the corners when absent
    pub target_color: Option<Color>,

    /// Deadline for the image acquisition step
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            smooth: true,
            feather_radius: DEFAULT_FEATHER_RADIUS,
            target_color: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ProcessingConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bgalpha::{Color, ProcessingConfig};
    ///
    /// let config = ProcessingConfig::builder()
    ///     .threshold(12.0)
    ///     .feather_radius(2.0)
    ///     .target_color(Color::new(0, 255, 0))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.threshold, 12.0);
    /// ```
    #[must_use]
    pub fn builder() -> ProcessingConfigBuilder {
        ProcessingConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Negative or non-finite threshold
    /// - Negative or non-finite feather radius
    /// - Zero timeout
    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(BgAlphaError::config_value_error(
                "threshold",
                self.threshold,
                ">= 0 (Lab ΔE units)",
                Some(DEFAULT_THRESHOLD),
            ));
        }

        if !self.feather_radius.is_finite() || self.feather_radius < 0.0 {
            return Err(BgAlphaError::config_value_error(
                "feather radius",
                self.feather_radius,
                ">= 0 pixels",
                Some(DEFAULT_FEATHER_RADIUS),
            ));
        }

        if self.timeout.is_zero() {
            return Err(BgAlphaError::invalid_config("timeout must be greater than zero"));
        }

        Ok(())
    }

    /// Apply caller overrides on top of this configuration
    #[must_use]
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(threshold) = overrides.threshold {
            self.threshold = threshold;
        }
        if let Some(smooth) = overrides.smooth {
            self.smooth = smooth;
        }
        if let Some(radius) = overrides.feather_radius {
            self.feather_radius = radius;
        }
        if let Some(color) = overrides.target_color {
            self.target_color = Some(color);
        }
        if let Some(timeout) = overrides.timeout {
            self.timeout = timeout;
        }
        self
    }
}

/// Builder for `ProcessingConfig`
#[derive(Debug, Default)]
pub struct ProcessingConfigBuilder {
    config: ProcessingConfig,
}

impl ProcessingConfigBuilder {
    #[must_use]
    pub fn threshold(mut self, threshold: f32) -> Self {
        self.config.threshold = threshold;
        self
    }

    #[must_use]
    pub fn smooth(mut self, smooth: bool) -> Self {
        self.config.smooth = smooth;
        self
    }

    #[must_use]
    pub fn feather_radius(mut self, radius: f32) -> Self {
        self.config.feather_radius = radius;
        self
    }

    #[must_use]
    pub fn target_color(mut self, color: Color) -> Self {
        self.config.target_color = Some(color);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// - Any rule checked by [`ProcessingConfig::validate`]
    pub fn build(self) -> Result<ProcessingConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Optional per-field overrides applied on top of a preset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub threshold: Option<f32>,
    pub smooth: Option<bool>,
    pub feather_radius: Option<f32>,
    pub target_color: Option<Color>,
    #[serde(with = "option_duration_ms")]
    pub timeout: Option<Duration>,
}

mod option_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(d).map(|ms| ms.map(Duration::from_millis))
    }
}

/// Named background-color presets
///
/// Each preset fixes a target color together with a threshold and feather
/// radius tuned for that color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Detect the background from the image corners
    #[default]
    Auto,
    White,
    Red,
    Green,
    Blue,
    Black,
    Gray,
    Cyan,
    Magenta,
    Yellow,
}

impl Preset {
    pub const ALL: [Preset; 10] = [
        Preset::Auto,
        Preset::White,
        Preset::Red,
        Preset::Green,
        Preset::Blue,
        Preset::Black,
        Preset::Gray,
        Preset::Cyan,
        Preset::Magenta,
        Preset::Yellow,
    ];

    /// Target color removed by this preset (`None` means auto-detect)
    #[must_use]
    pub fn target_color(self) -> Option<Color> {
        match self {
            Preset::Auto => None,
            Preset::White => Some(Color::new(255, 255, 255)),
            Preset::Red => Some(Color::new(255, 0, 0)),
            Preset::Green => Some(Color::new(0, 255, 0)),
            Preset::Blue => Some(Color::new(0, 0, 255)),
            Preset::Black => Some(Color::new(0, 0, 0)),
            Preset::Gray => Some(Color::new(128, 128, 128)),
            Preset::Cyan => Some(Color::new(0, 255, 255)),
            Preset::Magenta => Some(Color::new(255, 0, 255)),
            Preset::Yellow => Some(Color::new(255, 255, 0)),
        }
    }

    /// Tuned default threshold in Lab ΔE units
    #[must_use]
    pub fn default_threshold(self) -> f32 {
        match self {
            Preset::Auto | Preset::White => 8.0,
            // Black is hard to separate from shadows
            Preset::Black => 15.0,
            Preset::Gray => 20.0,
            Preset::Cyan | Preset::Magenta => 10.0,
            Preset::Red | Preset::Green | Preset::Blue | Preset::Yellow => 12.0,
        }
    }

    /// Tuned default feather radius in pixels
    #[must_use]
    pub fn default_feather_radius(self) -> f32 {
        match self {
            Preset::Auto | Preset::Red | Preset::Green | Preset::Blue => 1.5,
            Preset::Cyan | Preset::Magenta => 1.5,
            Preset::White | Preset::Yellow => 1.8,
            Preset::Black => 2.0,
            Preset::Gray => 2.5,
        }
    }

    /// Resolve the preset into a full processing configuration
    #[must_use]
    pub fn config(self) -> ProcessingConfig {
        ProcessingConfig {
            threshold: self.default_threshold(),
            smooth: true,
            feather_radius: self.default_feather_radius(),
            target_color: self.target_color(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Preset::Auto => "auto",
            Preset::White => "white",
            Preset::Red => "red",
            Preset::Green => "green",
            Preset::Blue => "blue",
            Preset::Black => "black",
            Preset::Gray => "gray",
            Preset::Cyan => "cyan",
            Preset::Magenta => "magenta",
            Preset::Yellow => "yellow",
        }
    }

    /// Preset whose target color family matches `color`
    #[must_use]
    pub fn suggest_for(color: Color) -> Self {
        Self::from(ColorFamily::of(color))
    }
}

impl From<ColorFamily> for Preset {
    fn from(family: ColorFamily) -> Self {
        match family {
            ColorFamily::White => Preset::White,
            ColorFamily::Black => Preset::Black,
            ColorFamily::Gray => Preset::Gray,
            ColorFamily::Red => Preset::Red,
            ColorFamily::Yellow => Preset::Yellow,
            ColorFamily::Green => Preset::Green,
            ColorFamily::Cyan => Preset::Cyan,
            ColorFamily::Blue => Preset::Blue,
            ColorFamily::Magenta => Preset::Magenta,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = BgAlphaError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        match wanted.as_str() {
            "grey" => return Ok(Preset::Gray),
            "" => return Ok(Preset::Auto),
            _ => {},
        }
        Preset::ALL
            .into_iter()
            .find(|preset| preset.name() == wanted)
            .ok_or_else(|| {
                BgAlphaError::invalid_config(format!(
                    "Unknown preset '{}'. Valid presets: {}",
                    s,
                    Preset::ALL.map(Preset::name).join(", ")
                ))
            })
    }
}

/// Auto-detect tuning bundles for different kinds of source images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityProfile {
    /// Conservative threshold to protect generated foreground subjects
    AiOptimized,
    /// No smoothing or feathering, fastest
    Simple,
    /// Wide feathering for very soft edges
    SuperSmooth,
    /// Balanced settings for photographs
    PhotoGrade,
}

impl QualityProfile {
    pub const ALL: [QualityProfile; 4] = [
        QualityProfile::AiOptimized,
        QualityProfile::Simple,
        QualityProfile::SuperSmooth,
        QualityProfile::PhotoGrade,
    ];

    #[must_use]
    pub fn config(self) -> ProcessingConfig {
        let (threshold, smooth, feather_radius) = match self {
            QualityProfile::AiOptimized => (6.0, true, 1.5),
            QualityProfile::Simple => (8.0, false, 0.0),
            QualityProfile::SuperSmooth => (7.0, true, 3.0),
            QualityProfile::PhotoGrade => (8.0, true, 2.0),
        };

        ProcessingConfig {
            threshold,
            smooth,
            feather_radius,
            target_color: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            QualityProfile::AiOptimized => "ai_optimized",
            QualityProfile::Simple => "simple",
            QualityProfile::SuperSmooth => "super_smooth",
            QualityProfile::PhotoGrade => "photo_grade",
        }
    }
}

impl FromStr for QualityProfile {
    type Err = BgAlphaError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        QualityProfile::ALL
            .into_iter()
            .find(|profile| profile.name() == wanted)
            .ok_or_else(|| {
                BgAlphaError::invalid_config(format!(
                    "Unknown quality profile '{}'. Valid profiles: {}",
                    s,
                    QualityProfile::ALL.map(QualityProfile::name).join(", ")
                ))
            })
    }
}

impl fmt::Display for QualityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options for one batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Preset every item is processed with
    pub preset: Preset,

    /// Overrides applied on top of the preset defaults
    pub overrides: ConfigOverrides,

    /// Inputs beyond this count are dropped with a warning
    pub max_items: usize,

    /// Pause between items, zero just yields to the runtime
    #[serde(with = "duration_ms")]
    pub inter_item_delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            preset: Preset::Auto,
            overrides: ConfigOverrides::default(),
            max_items: DEFAULT_MAX_ITEMS,
            inter_item_delay: Duration::ZERO,
        }
    }
}

impl BatchOptions {
    #[must_use]
    pub fn with_preset(preset: Preset) -> Self {
        Self {
            preset,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    #[must_use]
    pub fn max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    #[must_use]
    pub fn inter_item_delay(mut self, delay: Duration) -> Self {
        self.inter_item_delay = delay;
        self
    }

    /// Resolve the configuration every item of the batch will use
    ///
    /// # Errors
    /// - Overrides producing an invalid configuration
    /// - `max_items` of zero
    pub fn resolve_config(&self) -> Result<ProcessingConfig> {
        if self.max_items == 0 {
            return Err(BgAlphaError::config_value_error(
                "max items",
                self.max_items,
                ">= 1",
                Some(DEFAULT_MAX_ITEMS),
            ));
        }

        let config = self.preset.config().with_overrides(&self.overrides);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ProcessingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert!(config.smooth);
        assert!(config.target_color.is_none());
    }

    #[test]
    fn test_builder_rejects_negative_values() {
        let err = ProcessingConfig::builder().threshold(-1.0).build().unwrap_err();
        assert!(matches!(err, BgAlphaError::InvalidConfig(_)));
        assert!(err.to_string().contains("threshold"));

        let err = ProcessingConfig::builder()
            .feather_radius(-0.5)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("feather radius"));

        assert!(ProcessingConfig::builder()
            .threshold(f32::NAN)
            .build()
            .is_err());
        assert!(ProcessingConfig::builder()
            .timeout(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn test_preset_table() {
        let white = Preset::White.config();
        assert_eq!(white.target_color, Some(Color::WHITE));
        assert_eq!(white.threshold, 8.0);
        assert_eq!(white.feather_radius, 1.8);

        let black = Preset::Black.config();
        assert_eq!(black.target_color, Some(Color::BLACK));
        assert_eq!(black.threshold, 15.0);

        let gray = Preset::Gray.config();
        assert_eq!(gray.target_color, Some(Color::new(128, 128, 128)));
        assert_eq!(gray.threshold, 20.0);
        assert_eq!(gray.feather_radius, 2.5);

        assert!(Preset::Auto.config().target_color.is_none());

        for preset in Preset::ALL {
            assert!(preset.config().validate().is_ok(), "{} invalid", preset);
        }
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!("WHITE".parse::<Preset>().unwrap(), Preset::White);
        assert_eq!(" grey ".parse::<Preset>().unwrap(), Preset::Gray);
        assert_eq!("".parse::<Preset>().unwrap(), Preset::Auto);
        let err = "purple".parse::<Preset>().unwrap_err();
        assert!(err.to_string().contains("magenta"));

        for preset in Preset::ALL {
            assert_eq!(preset.name().parse::<Preset>().unwrap(), preset);
        }
    }

    #[test]
    fn test_preset_suggestion() {
        assert_eq!(Preset::suggest_for(Color::new(250, 250, 250)), Preset::White);
        assert_eq!(Preset::suggest_for(Color::new(0, 240, 10)), Preset::Green);
        assert_eq!(Preset::suggest_for(Color::new(5, 5, 5)), Preset::Black);
    }

    #[test]
    fn test_quality_profiles() {
        let simple = QualityProfile::Simple.config();
        assert!(!simple.smooth);
        assert_eq!(simple.feather_radius, 0.0);

        assert_eq!(QualityProfile::AiOptimized.config().threshold, 6.0);
        assert_eq!(QualityProfile::SuperSmooth.config().feather_radius, 3.0);
        assert_eq!(
            "photo-grade".parse::<QualityProfile>().unwrap(),
            QualityProfile::PhotoGrade
        );
        assert!("ultra".parse::<QualityProfile>().is_err());
    }

    #[test]
    fn test_overrides_and_batch_resolution() {
        let options = BatchOptions::with_preset(Preset::Red).overrides(ConfigOverrides {
            threshold: Some(20.0),
            smooth: Some(false),
            ..ConfigOverrides::default()
        });

        let config = options.resolve_config().unwrap();
        assert_eq!(config.threshold, 20.0);
        assert!(!config.smooth);
        assert_eq!(config.feather_radius, 1.5);
        assert_eq!(config.target_color, Some(Color::new(255, 0, 0)));

        let bad = BatchOptions::default().overrides(ConfigOverrides {
            feather_radius: Some(-3.0),
            ..ConfigOverrides::default()
        });
        assert!(bad.resolve_config().is_err());
        assert!(BatchOptions::default().max_items(0).resolve_config().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Preset::Cyan.config();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"timeout\":10000"));

        let restored: ProcessingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);

        let partial: ProcessingConfig = serde_json::from_str(r#"{"threshold": 3.5}"#).unwrap();
        assert_eq!(partial.threshold, 3.5);
        assert_eq!(partial.timeout, DEFAULT_TIMEOUT);

        let options: BatchOptions = serde_json::from_str(r#"{"preset": "magenta"}"#).unwrap();
        assert_eq!(options.preset, Preset::Magenta);
        assert_eq!(options.max_items, DEFAULT_MAX_ITEMS);
    }
}
