//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::Cli;
use crate::{
    color::Color,
    config::{BatchOptions, ConfigOverrides, Preset, QualityProfile},
};
use anyhow::{Context, Result};
use std::time::Duration;

/// Convert CLI arguments to batch options
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build `BatchOptions` from CLI arguments
    ///
    /// A quality profile seeds the overrides; explicit flags win over it.
    pub(crate) fn from_cli(cli: &Cli) -> Result<BatchOptions> {
        let preset: Preset = cli.preset.parse()?;

        let mut overrides = match &cli.profile {
            Some(profile) => {
                let profile: QualityProfile = profile.parse()?;
                let config = profile.config();
                ConfigOverrides {
                    threshold: Some(config.threshold),
                    smooth: Some(config.smooth),
                    feather_radius: Some(config.feather_radius),
                    ..ConfigOverrides::default()
                }
            },
            None => ConfigOverrides::default(),
        };

        if let Some(threshold) = cli.threshold {
            overrides.threshold = Some(threshold);
        }
        if let Some(radius) = cli.feather_radius {
            overrides.feather_radius = Some(radius);
        }
        if cli.no_smooth {
            overrides.smooth = Some(false);
        }
        if let Some(color) = &cli.target_color {
            let color: Color = color
                .parse()
                .with_context(|| format!("Invalid target color '{}'", color))?;
            overrides.target_color = Some(color);
        }
        if let Some(ms) = cli.timeout_ms {
            overrides.timeout = Some(Duration::from_millis(ms));
        }

        let options = BatchOptions::with_preset(preset)
            .overrides(overrides)
            .max_items(cli.max_files)
            .inter_item_delay(Duration::from_millis(cli.delay_ms));

        options.resolve_config()?;
        Ok(options)
    }

    /// Validate CLI arguments that clap cannot check on its own
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        if cli.profile.is_some() && !cli.preset.trim().eq_ignore_ascii_case("auto") {
            anyhow::bail!("--profile only applies to the auto preset");
        }

        if cli.max_files == 0 {
            anyhow::bail!("--max-files must be at least 1");
        }

        if cli.timeout_ms == Some(0) {
            anyhow::bail!("--timeout-ms must be greater than zero");
        }

        if let Some(pattern) = &cli.pattern {
            glob::Pattern::new(pattern)
                .with_context(|| format!("Invalid file pattern '{}'", pattern))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("bgalpha").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_map_to_auto_preset() {
        let options = CliConfigBuilder::from_cli(&cli(&["in.jpg"])).unwrap();
        assert_eq!(options.preset, Preset::Auto);
        assert_eq!(options.overrides, ConfigOverrides::default());
        assert_eq!(options.max_items, 20);
        assert!(options.inter_item_delay.is_zero());
    }

    #[test]
    fn test_flags_become_overrides() {
        let args = cli(&[
            "in.jpg",
            "--preset",
            "green",
            "--threshold",
            "14",
            "--feather-radius",
            "0",
            "--no-smooth",
            "--target-color",
            "#10ff10",
            "--timeout-ms",
            "2500",
        ]);
        let options = CliConfigBuilder::from_cli(&args).unwrap();
        let config = options.resolve_config().unwrap();

        assert_eq!(options.preset, Preset::Green);
        assert_eq!(config.threshold, 14.0);
        assert_eq!(config.feather_radius, 0.0);
        assert!(!config.smooth);
        assert_eq!(config.target_color, Some(Color::new(16, 255, 16)));
        assert_eq!(config.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_profile_seeds_overrides() {
        let options = CliConfigBuilder::from_cli(&cli(&["in.jpg", "--profile", "simple"])).unwrap();
        let config = options.resolve_config().unwrap();
        assert!(!config.smooth);
        assert_eq!(config.feather_radius, 0.0);

        let options = CliConfigBuilder::from_cli(&cli(&[
            "in.jpg",
            "--profile",
            "simple",
            "--feather-radius",
            "1",
        ]))
        .unwrap();
        assert_eq!(options.resolve_config().unwrap().feather_radius, 1.0);
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(CliConfigBuilder::from_cli(&cli(&["in.jpg", "--preset", "plaid"])).is_err());
        assert!(CliConfigBuilder::from_cli(&cli(&["in.jpg", "--target-color", "nope"])).is_err());
        assert!(CliConfigBuilder::from_cli(&cli(&["in.jpg", "--threshold=-3"])).is_err());

        assert!(CliConfigBuilder::validate_cli(&cli(&["in.jpg", "--max-files", "0"])).is_err());
        assert!(CliConfigBuilder::validate_cli(&cli(&["in.jpg", "--timeout-ms", "0"])).is_err());
        assert!(CliConfigBuilder::validate_cli(&cli(&[
            "in.jpg",
            "--preset",
            "red",
            "--profile",
            "simple"
        ]))
        .is_err());
        assert!(CliConfigBuilder::validate_cli(&cli(&["in.jpg", "--pattern", "["])).is_err());
        assert!(CliConfigBuilder::validate_cli(&cli(&["in.jpg", "-r", "--pattern", "*.jpg"])).is_ok());
    }
}
