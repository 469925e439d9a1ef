use crate::errors::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Weights must sum to 1.0 within this tolerance.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Runtime knobs for the batch pipeline, loaded from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Minimum EV (in R) for a row to be recommended as a trade.
    pub take_threshold: f64,
    /// Loss R-multiple used when a row does not supply `loss_r`.
    pub default_loss_r: f64,
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let take_threshold = env_var_or("EV_TAKE_THRESHOLD", "0.3")
            .parse::<f64>()
            .map_err(|e| EngineError::Config(format!("EV_TAKE_THRESHOLD: {e}")))?;

        let default_loss_r = env_var_or("DEFAULT_LOSS_R", "-1.0")
            .parse::<f64>()
            .map_err(|e| EngineError::Config(format!("DEFAULT_LOSS_R: {e}")))?;

        Ok(Self {
            take_threshold,
            default_loss_r,
        })
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Weight and delta cap for one signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalSpec {
    pub weight: f64,
    pub max_delta: f64,
}

/// The five-signal weight/cap table. A model configuration, not user data:
/// defaults match the published blend, and any override is validated at
/// scorer construction rather than per record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub analysts_ratings: SignalSpec,
    pub smart_score: SignalSpec,
    pub net_options_sentiment: SignalSpec,
    pub net_social_sentiment: SignalSpec,
    pub upside_breakout: SignalSpec,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            analysts_ratings: SignalSpec {
                weight: 0.25,
                max_delta: 30.0,
            },
            smart_score: SignalSpec {
                weight: 0.15,
                max_delta: 20.0,
            },
            net_options_sentiment: SignalSpec {
                weight: 0.20,
                max_delta: 20.0,
            },
            net_social_sentiment: SignalSpec {
                weight: 0.20,
                max_delta: 20.0,
            },
            upside_breakout: SignalSpec {
                weight: 0.20,
                max_delta: 20.0,
            },
        }
    }
}

impl ScoringConfig {
    /// Load a weight/cap override from a JSON file. Missing keys fall back
    /// to the defaults via `#[serde(default)]`.
    pub fn from_json_file(path: &Path) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("weights file {}: {e}", path.display())))?;
        let cfg: ScoringConfig = serde_json::from_str(&raw)?;
        Ok(cfg)
    }

    /// All five entries with their wire names, in scoring order.
    pub fn specs(&self) -> [(&'static str, SignalSpec); 5] {
        [
            ("analysts_ratings", self.analysts_ratings),
            ("smart_score", self.smart_score),
            ("net_options_sentiment", self.net_options_sentiment),
            ("net_social_sentiment", self.net_social_sentiment),
            ("upside_breakout", self.upside_breakout),
        ]
    }

    /// Internal consistency check, run once at scorer construction.
    pub fn validate(&self) -> EngineResult<()> {
        let sum: f64 = self.specs().iter().map(|(_, s)| s.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(EngineError::Config(format!(
                "signal weights must sum to 1.0, got {sum}"
            )));
        }
        for (name, spec) in self.specs() {
            if spec.weight < 0.0 {
                return Err(EngineError::Config(format!(
                    "{name}: weight must be non-negative, got {}",
                    spec.weight
                )));
            }
            if spec.max_delta <= 0.0 {
                return Err(EngineError::Config(format!(
                    "{name}: max_delta must be positive, got {}",
                    spec.max_delta
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        assert!(ScoringConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let mut cfg = ScoringConfig::default();
        cfg.analysts_ratings.weight = 0.15; // sum becomes 0.9
        let err = cfg.validate().unwrap_err();
        assert!(
            matches!(err, EngineError::Config(_)),
            "expected config error, got {err}"
        );
    }

    #[test]
    fn rejects_nonpositive_cap() {
        let mut cfg = ScoringConfig::default();
        cfg.smart_score.max_delta = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_override_keeps_defaults() {
        let cfg: ScoringConfig =
            serde_json::from_str(r#"{"analysts_ratings": {"weight": 0.25, "max_delta": 25.0}}"#)
                .unwrap();
        assert_eq!(cfg.analysts_ratings.max_delta, 25.0);
        assert_eq!(cfg.smart_score.weight, 0.15);
    }
}
