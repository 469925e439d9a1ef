/// Expectancy in R-multiples.
///
/// avg_win_r = reward_to_risk * capture_rate
/// ev = (p_win * avg_win_r) + ((1 - p_win) * loss_r)
///
/// where:
///   p_win          = blended win probability from the scorer
///   reward_to_risk = planned profit target over planned risk
///   capture_rate   = fraction of the planned reward realized on wins
///   loss_r         = average R-multiple on losses (negative, default -1.0)
///
/// This is the expectancy identity from Van Tharp's position-sizing work: a
/// linear combination of the win and loss buckets weighted by their
/// probabilities, valid because R-multiples normalize every outcome against
/// the same unit of initial risk.
///
/// All inputs are f64. Pure functions, no side effects, no allocations.
use crate::errors::{EngineError, EngineResult};

/// Parameters for expectancy computation. Stack-allocated.
#[derive(Debug, Clone, Copy)]
pub struct ExpectancyInput {
    pub p_win: f64,
    /// Planned reward:risk, must be > 0.
    pub reward_to_risk: f64,
    /// Must lie in [0, 1].
    pub capture_rate: f64,
    /// Typically in [-1.2, -1.0] to model cost/slippage drag.
    pub loss_r: f64,
}

/// Result of expectancy computation. Stack-allocated.
#[derive(Debug, Clone, Copy)]
pub struct ExpectancyResult {
    pub avg_win_r: f64,
    pub ev: f64,
}

/// Compute expectancy from planning parameters.
///
/// Planning parameters are explicit trading-plan assumptions, not noisy
/// market signals: out-of-range values are rejected, never clamped, so a
/// usage mistake cannot pass silently.
#[inline]
pub fn expectancy(input: &ExpectancyInput) -> EngineResult<ExpectancyResult> {
    if !(input.reward_to_risk > 0.0) || !input.reward_to_risk.is_finite() {
        return Err(EngineError::validation(
            "reward_to_risk",
            format!("must be finite and > 0, got {}", input.reward_to_risk),
        ));
    }
    if !(0.0..=1.0).contains(&input.capture_rate) {
        return Err(EngineError::validation(
            "capture_rate",
            format!("must be in [0, 1], got {}", input.capture_rate),
        ));
    }
    if !input.loss_r.is_finite() {
        return Err(EngineError::validation(
            "loss_r",
            format!("must be finite, got {}", input.loss_r),
        ));
    }

    let avg_win_r = input.reward_to_risk * input.capture_rate;
    Ok(ExpectancyResult {
        avg_win_r,
        ev: ev_in_r(input.p_win, avg_win_r, input.loss_r),
    })
}

/// The raw expectancy identity, for callers that already model the average
/// win directly (e.g. a per-row `win_r` column).
#[inline]
pub fn ev_in_r(p_win: f64, win_r: f64, loss_r: f64) -> f64 {
    (p_win * win_r) + ((1.0 - p_win) * loss_r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readme_example_matches_documented_ev() {
        // P_win=0.48, R:R=3.0, capture=0.75, loss_r=-1.05
        // avg_win_r = 2.25; ev = 0.48*2.25 + 0.52*(-1.05) = 0.534
        let result = expectancy(&ExpectancyInput {
            p_win: 0.48,
            reward_to_risk: 3.0,
            capture_rate: 0.75,
            loss_r: -1.05,
        })
        .unwrap();
        assert!((result.avg_win_r - 2.25).abs() < 1e-12);
        assert!((result.ev - 0.534).abs() < 1e-12, "ev: {}", result.ev);
    }

    #[test]
    fn zero_capture_leaves_pure_loss_expectancy() {
        let result = expectancy(&ExpectancyInput {
            p_win: 0.6,
            reward_to_risk: 2.0,
            capture_rate: 0.0,
            loss_r: -1.0,
        })
        .unwrap();
        assert_eq!(result.avg_win_r, 0.0);
        assert!((result.ev - (-0.4)).abs() < 1e-12, "ev: {}", result.ev);
    }

    #[test]
    fn rejects_out_of_range_planning_parameters() {
        let base = ExpectancyInput {
            p_win: 0.5,
            reward_to_risk: 2.0,
            capture_rate: 0.8,
            loss_r: -1.0,
        };

        let err = expectancy(&ExpectancyInput {
            reward_to_risk: 0.0,
            ..base
        })
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation {
                field: "reward_to_risk",
                ..
            }
        ));

        // inf * capture_rate of 0 would give a NaN avg_win_r.
        let err = expectancy(&ExpectancyInput {
            reward_to_risk: f64::INFINITY,
            capture_rate: 0.0,
            ..base
        })
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation {
                field: "reward_to_risk",
                ..
            }
        ));

        let err = expectancy(&ExpectancyInput {
            capture_rate: 1.5,
            ..base
        })
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation {
                field: "capture_rate",
                ..
            }
        ));

        assert!(expectancy(&ExpectancyInput {
            loss_r: f64::NAN,
            ..base
        })
        .is_err());
    }

    #[test]
    fn ev_identity_signs() {
        // EV = 0.6*2.0 - 0.4*1.0 = 0.8
        assert!((ev_in_r(0.6, 2.0, -1.0) - 0.8).abs() < 1e-12);
        // EV = 0.3*1.5 - 0.7*1.0 = -0.25
        assert!((ev_in_r(0.3, 1.5, -1.0) + 0.25).abs() < 1e-12);
        // Symmetric payout at even odds is flat.
        assert!(ev_in_r(0.5, 2.0, -2.0).abs() < 1e-12);
    }
}
