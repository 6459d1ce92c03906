//! Application configuration, loaded from JSON.
//!
//! ```json
//! {
//!   "tick": { "tick_rate": 60.0, "max_ticks": 120 },
//!   "world": { "strategy": "per_type", "default": 64, "overrides": { "Position": 4096 } },
//!   "demo": { "movers": 1000, "gravity_every": 4 }
//! }
//! ```
//!
//! Every section and field is optional.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use engine_ecs::CapacityConfig;
use serde::{Deserialize, Serialize};

/// Configuration for the tick loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl TickConfig {
    /// Fixed timestep in seconds.
    #[must_use]
    pub fn dt(&self) -> f64 {
        1.0 / self.tick_rate
    }

    /// Fixed timestep as a [`Duration`].
    ///
    /// Fails when the rate is not positive or so small that the timestep
    /// overflows a `Duration`.
    pub fn tick_duration(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.dt())
            .with_context(|| format!("tick_rate {} gives no usable timestep", self.tick_rate))
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

/// What the demo binary spawns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Number of moving entities.
    pub movers: usize,
    /// Every n-th mover is affected by gravity (0 = none).
    pub gravity_every: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            movers: 100,
            gravity_every: 2,
        }
    }
}

/// Top-level configuration of the binary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Tick loop settings.
    pub tick: TickConfig,
    /// Capacity strategy of the world.
    pub world: CapacityConfig,
    /// Demo population.
    pub demo: DemoConfig,
}

impl AppConfig {
    /// Reads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parses and validates a config document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.tick.tick_rate.is_finite() && self.tick.tick_rate > 0.0,
            "tick_rate must be a positive number, got {}",
            self.tick.tick_rate
        );
        self.tick.tick_duration()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use engine_ecs::PerTypeCapacity;

    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.tick.tick_rate, 60.0);
    }

    #[test]
    fn test_full_document() {
        let config = AppConfig::from_json(
            r#"{
                "tick": { "tick_rate": 30.0, "max_ticks": 10 },
                "world": { "strategy": "per_type", "default": 8, "overrides": { "Position": 512 } },
                "demo": { "movers": 3, "gravity_every": 0 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.tick.max_ticks, 10);
        assert!((config.tick.dt() - 1.0 / 30.0).abs() < f64::EPSILON);
        assert_eq!(
            config.world,
            CapacityConfig::PerType(PerTypeCapacity::new(8).with("Position", 512))
        );
        assert_eq!(config.demo.movers, 3);
    }

    #[test]
    fn test_rejects_non_positive_tick_rate() {
        assert!(AppConfig::from_json(r#"{ "tick": { "tick_rate": 0.0 } }"#).is_err());
    }

    #[test]
    fn test_rejects_tick_rate_without_duration() {
        let err = AppConfig::from_json(r#"{ "tick": { "tick_rate": 1e-20 } }"#).unwrap_err();
        assert!(format!("{err:#}").contains("tick_rate"));
    }

    #[test]
    fn test_tick_duration() {
        let tick = TickConfig {
            tick_rate: 4.0,
            max_ticks: 0,
        };
        assert_eq!(tick.tick_duration().unwrap(), Duration::from_millis(250));

        for tick_rate in [0.0, -1.0, 1e-20, f64::NAN] {
            let tick = TickConfig {
                tick_rate,
                max_ticks: 0,
            };
            assert!(tick.tick_duration().is_err(), "tick_rate {tick_rate}");
        }
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = AppConfig::load("/nonexistent/engine.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/engine.json"));
    }
}
