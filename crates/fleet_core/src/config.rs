use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::error::{FleetError, FleetResult};
use crate::model::{Agent, AgentId, Position};

/// Closed interval a generated value is drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn check(&self, what: &str) -> FleetResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(FleetError::InvalidConfiguration(format!(
                "{what} range must be finite, got [{}, {}]",
                self.min, self.max
            )));
        }
        if self.min > self.max {
            return Err(FleetError::InvalidConfiguration(format!(
                "{what} range is inverted: min {} > max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.min..=self.max)
    }
}

/// Everything fixed at process start. Nothing here changes at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetConfig {
    pub num_agents: usize,
    pub position_range: ValueRange,
    pub charge_range: ValueRange,
    /// Distance covered per tick; also the arrival threshold.
    pub speed: f64,
    pub tick_interval: Duration,
    pub snapshot_interval: Duration,
    /// Upper bound on the delay between retries after failed ticks.
    pub max_backoff: Duration,
    /// Seed for agent generation. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            num_agents: 25,
            position_range: ValueRange::new(1.0, 5.0),
            charge_range: ValueRange::new(80.0, 100.0),
            speed: 0.1,
            tick_interval: Duration::from_millis(100),
            snapshot_interval: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            seed: None,
        }
    }
}

impl FleetConfig {
    /// Rejects any setting the simulation cannot run with.
    pub fn validate(self) -> FleetResult<Self> {
        if self.num_agents == 0 {
            return Err(FleetError::InvalidConfiguration(
                "agent count must be positive".into(),
            ));
        }
        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(FleetError::InvalidConfiguration(format!(
                "speed must be a positive finite number, got {}",
                self.speed
            )));
        }
        if self.tick_interval.is_zero() {
            return Err(FleetError::InvalidConfiguration(
                "tick interval must be positive".into(),
            ));
        }
        if self.snapshot_interval.is_zero() {
            return Err(FleetError::InvalidConfiguration(
                "snapshot interval must be positive".into(),
            ));
        }
        // Readers may lag the table by at most one tick.
        if self.snapshot_interval > self.tick_interval {
            return Err(FleetError::InvalidConfiguration(format!(
                "snapshot interval {:?} is longer than the tick interval {:?}",
                self.snapshot_interval, self.tick_interval
            )));
        }
        if self.max_backoff < self.tick_interval {
            return Err(FleetError::InvalidConfiguration(format!(
                "max backoff {:?} is shorter than the tick interval {:?}",
                self.max_backoff, self.tick_interval
            )));
        }
        self.position_range.check("position")?;
        self.charge_range.check("charge")?;
        Ok(self)
    }

    /// Creates `BOT_1..=BOT_n` with uniformly drawn positions and charge.
    pub fn generate_agents(&self) -> Vec<Agent> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        (1..=self.num_agents)
            .map(|i| {
                let x = self.position_range.sample(&mut rng);
                let y = self.position_range.sample(&mut rng);
                Agent {
                    id: AgentId(format!("BOT_{i}")),
                    position: Position::new(x, y),
                    charge: self.charge_range.sample(&mut rng),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(config: FleetConfig) -> String {
        match config.validate() {
            Err(FleetError::InvalidConfiguration(reason)) => reason,
            other => panic!("expected InvalidConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(FleetConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_speed() {
        for speed in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            let reason = rejected(FleetConfig {
                speed,
                ..FleetConfig::default()
            });
            assert!(reason.contains("speed"), "{reason}");
        }
    }

    #[test]
    fn rejects_zero_agents_and_intervals() {
        assert!(rejected(FleetConfig {
            num_agents: 0,
            ..FleetConfig::default()
        })
        .contains("agent count"));
        assert!(rejected(FleetConfig {
            tick_interval: Duration::ZERO,
            ..FleetConfig::default()
        })
        .contains("tick interval"));
        assert!(rejected(FleetConfig {
            snapshot_interval: Duration::ZERO,
            ..FleetConfig::default()
        })
        .contains("snapshot interval"));
    }

    #[test]
    fn rejects_snapshot_interval_longer_than_tick() {
        let reason = rejected(FleetConfig {
            snapshot_interval: Duration::from_secs(60),
            max_backoff: Duration::from_secs(60),
            ..FleetConfig::default()
        });
        assert!(reason.contains("snapshot interval"), "{reason}");

        let faster = FleetConfig {
            snapshot_interval: Duration::from_millis(50),
            ..FleetConfig::default()
        };
        assert!(faster.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_ranges() {
        let reason = rejected(FleetConfig {
            charge_range: ValueRange::new(100.0, 80.0),
            ..FleetConfig::default()
        });
        assert!(reason.contains("charge"), "{reason}");
    }

    #[test]
    fn generated_agents_respect_ranges_and_names() {
        let config = FleetConfig {
            num_agents: 50,
            seed: Some(7),
            ..FleetConfig::default()
        };
        let agents = config.generate_agents();
        assert_eq!(agents.len(), 50);
        assert_eq!(agents[0].id.as_str(), "BOT_1");
        assert_eq!(agents[49].id.as_str(), "BOT_50");
        for agent in &agents {
            assert!((1.0..=5.0).contains(&agent.position.x));
            assert!((1.0..=5.0).contains(&agent.position.y));
            assert!((80.0..=100.0).contains(&agent.charge));
        }
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let config = FleetConfig {
            seed: Some(42),
            ..FleetConfig::default()
        };
        assert_eq!(config.generate_agents(), config.generate_agents());
    }
}
