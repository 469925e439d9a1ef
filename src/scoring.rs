/// Blended P_win scoring.
///
/// Five raw signals are normalized into percentage deltas, each clamped to
/// its own cap BEFORE weighting, then combined:
///
///   total_delta = sum(capped_delta_i * weight_i)
///   z = total_delta / 100
///   p_win = 1 / (1 + e^(-z))
///
/// The per-signal clamp bounds the influence of any single noisy input; the
/// sigmoid keeps p_win in the open interval (0, 1) with saturation at the
/// extremes and p_win = 0.5 exactly when total_delta = 0.
///
/// score() is a pure function: deterministic output from inputs only.
use crate::config::ScoringConfig;
use crate::errors::EngineResult;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use statrs::function::logistic::logistic;

/// One evaluation's raw signals. Stack-allocated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalInput {
    pub buy_ratings: u32,
    pub total_ratings: u32,
    /// TipRanks Smart Score, expected 0-10.
    pub smart_score: f64,
    /// Net Options Sentiment, expected 0-100.
    pub net_options_sentiment: f64,
    /// Net Social Sentiment, expected 0-100.
    pub net_social_sentiment: f64,
    /// Upside Breakout score, expected 0-100.
    pub upside_breakout: f64,
}

/// The contribution of a single signal to the blended score.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WeightedDelta {
    pub name: &'static str,
    pub raw_delta: f64,
    pub weight: f64,
    pub capped_delta: f64,
}

/// Result of the scoring pipeline, with the per-signal breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    pub total_delta: f64,
    pub p_win: f64,
    pub deltas: SmallVec<[WeightedDelta; 5]>,
}

/// A raw input outside its documented range. Not an error: the delta clamp
/// keeps scoring well-defined, but the anomaly points at stale or malformed
/// upstream data and must surface in the logs.
#[derive(Debug, Clone, Copy)]
pub struct RangeFlag {
    pub field: &'static str,
    pub value: f64,
}

pub struct SignalScorer {
    config: ScoringConfig,
}

impl SignalScorer {
    /// Weight-sum and cap checks run here, once; bad weights are a
    /// configuration mistake, not a data error.
    pub fn new(config: ScoringConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_defaults() -> Self {
        // Default table sums to 1.0 by construction.
        Self {
            config: ScoringConfig::default(),
        }
    }

    /// Score one set of signals. Never panics, never errors: out-of-range
    /// inputs flow through the normal delta/clamp pipeline.
    pub fn score(&self, input: &SignalInput) -> ScoreResult {
        let cfg = &self.config;

        // Analysts' ratings: buy proportion scaled by coverage depth.
        // No ratings means no signal from this input.
        let analysts_raw = if input.total_ratings > 0 {
            let buy_proportion = f64::from(input.buy_ratings) / f64::from(input.total_ratings);
            buy_proportion * (f64::from(input.total_ratings) / 20.0) * 30.0
        } else {
            0.0
        };

        let raw_deltas = [
            ("analysts_ratings", analysts_raw),
            ("smart_score", ((input.smart_score - 5.0) / 5.0) * 20.0),
            (
                "net_options_sentiment",
                ((input.net_options_sentiment - 50.0) / 50.0) * 20.0,
            ),
            (
                "net_social_sentiment",
                ((input.net_social_sentiment - 50.0) / 50.0) * 20.0,
            ),
            (
                "upside_breakout",
                ((input.upside_breakout - 50.0) / 50.0) * 20.0,
            ),
        ];

        let mut deltas: SmallVec<[WeightedDelta; 5]> = SmallVec::new();
        let mut total_delta = 0.0;

        for ((name, raw_delta), (_, spec)) in raw_deltas.into_iter().zip(cfg.specs()) {
            // Clamp per signal, before weighting.
            let capped_delta = raw_delta.clamp(-spec.max_delta, spec.max_delta);
            total_delta += capped_delta * spec.weight;
            deltas.push(WeightedDelta {
                name,
                raw_delta,
                weight: spec.weight,
                capped_delta,
            });
        }

        let p_win = logistic(total_delta / 100.0);

        ScoreResult {
            total_delta,
            p_win,
            deltas,
        }
    }
}

/// Check raw inputs against their documented ranges. Pure function; the
/// batch layer turns each flag into a warning with the record index.
pub fn range_flags(input: &SignalInput) -> SmallVec<[RangeFlag; 5]> {
    let mut flags: SmallVec<[RangeFlag; 5]> = SmallVec::new();

    if input.buy_ratings > input.total_ratings {
        flags.push(RangeFlag {
            field: "buy_ratings",
            value: f64::from(input.buy_ratings),
        });
    }
    for (field, value, lo, hi) in [
        ("smart_score", input.smart_score, 0.0, 10.0),
        ("net_options_sentiment", input.net_options_sentiment, 0.0, 100.0),
        ("net_social_sentiment", input.net_social_sentiment, 0.0, 100.0),
        ("upside_breakout", input.upside_breakout, 0.0, 100.0),
    ] {
        if !(lo..=hi).contains(&value) {
            flags.push(RangeFlag { field, value });
        }
    }

    flags
}
