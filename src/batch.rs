//! CSV batch transform.
//!
//! Reads rows of named numeric signal fields, scores each one, computes
//! expectancy, and writes the union of input and computed fields back out.
//! Rows are independent: a malformed row is reported and skipped while the
//! rest of the batch proceeds. The `row` output column carries the 0-based
//! input index so results can be re-associated if a caller fans rows out to
//! workers.

use crate::config::AppConfig;
use crate::errors::{EngineError, EngineResult};
use crate::expectancy::{ev_in_r, expectancy, ExpectancyInput};
use crate::scoring::{range_flags, SignalInput, SignalScorer};
use serde::Serialize;
use std::io::{Read, Write};
use std::str::FromStr;
use tracing::warn;

/// Columns every input row must carry.
const REQUIRED_COLUMNS: [&str; 6] = [
    "buy_ratings",
    "total_ratings",
    "smart_score",
    "net_options_sentiment",
    "net_social_sentiment",
    "upside_breakout",
];

/// Output header, kept in sync with the field order of [`OutputRow`].
const OUTPUT_COLUMNS: [&str; 16] = [
    "row",
    "buy_ratings",
    "total_ratings",
    "smart_score",
    "net_options_sentiment",
    "net_social_sentiment",
    "upside_breakout",
    "reward_to_risk",
    "capture_rate",
    "win_r",
    "loss_r",
    "total_delta",
    "p_win",
    "avg_win_r",
    "ev",
    "recommendation",
];

#[derive(Debug, Serialize)]
struct OutputRow {
    row: usize,
    buy_ratings: u32,
    total_ratings: u32,
    smart_score: f64,
    net_options_sentiment: f64,
    net_social_sentiment: f64,
    upside_breakout: f64,
    reward_to_risk: Option<f64>,
    capture_rate: Option<f64>,
    win_r: Option<f64>,
    loss_r: f64,
    total_delta: f64,
    p_win: f64,
    avg_win_r: f64,
    ev: f64,
    recommendation: &'static str,
}

/// Outcome of one batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub rows_read: usize,
    pub rows_scored: usize,
    pub takes: usize,
    pub skipped: Vec<EngineError>,
    ev_sum: f64,
    p_win_sum: f64,
}

impl BatchReport {
    pub fn mean_ev(&self) -> Option<f64> {
        (self.rows_scored > 0).then(|| self.ev_sum / self.rows_scored as f64)
    }

    pub fn mean_p_win(&self) -> Option<f64> {
        (self.rows_scored > 0).then(|| self.p_win_sum / self.rows_scored as f64)
    }
}

/// Column positions resolved from the header once, up front. A required
/// column missing from the header aborts the whole batch; per-row problems
/// do not.
struct ColumnMap {
    required: [usize; 6],
    reward_to_risk: Option<usize>,
    capture_rate: Option<usize>,
    win_r: Option<usize>,
    loss_r: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> EngineResult<Self> {
        let find = |name: &str| headers.iter().position(|h| h == name);

        let mut required = [0usize; 6];
        for (slot, name) in required.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = find(name)
                .ok_or_else(|| EngineError::Config(format!("required column '{name}' not found")))?;
        }

        Ok(Self {
            required,
            reward_to_risk: find("reward_to_risk"),
            capture_rate: find("capture_rate"),
            win_r: find("win_r"),
            loss_r: find("loss_r"),
        })
    }
}

fn parse_field<T: FromStr>(
    record: &csv::StringRecord,
    pos: usize,
    field: &'static str,
) -> EngineResult<T>
where
    T::Err: std::fmt::Display,
{
    let raw = record.get(pos).unwrap_or("").trim();
    if raw.is_empty() {
        return Err(EngineError::validation(field, "missing value"));
    }
    raw.parse::<T>()
        .map_err(|e| EngineError::validation(field, format!("'{raw}': {e}")))
}

/// Parse a numeric field, rejecting NaN and infinities: a non-finite value
/// would poison the delta clamp and every downstream figure.
fn parse_finite(
    record: &csv::StringRecord,
    pos: usize,
    field: &'static str,
) -> EngineResult<f64> {
    let value = parse_field::<f64>(record, pos, field)?;
    if !value.is_finite() {
        return Err(EngineError::validation(
            field,
            format!("must be finite, got {value}"),
        ));
    }
    Ok(value)
}

fn parse_optional(
    record: &csv::StringRecord,
    pos: Option<usize>,
    field: &'static str,
) -> EngineResult<Option<f64>> {
    match pos {
        Some(p) if !record.get(p).unwrap_or("").trim().is_empty() => {
            parse_finite(record, p, field).map(Some)
        }
        _ => Ok(None),
    }
}

fn parse_signals(record: &csv::StringRecord, cols: &ColumnMap) -> EngineResult<SignalInput> {
    let [buy, total, smart, options, social, breakout] = cols.required;
    Ok(SignalInput {
        buy_ratings: parse_field(record, buy, "buy_ratings")?,
        total_ratings: parse_field(record, total, "total_ratings")?,
        smart_score: parse_finite(record, smart, "smart_score")?,
        net_options_sentiment: parse_finite(record, options, "net_options_sentiment")?,
        net_social_sentiment: parse_finite(record, social, "net_social_sentiment")?,
        upside_breakout: parse_finite(record, breakout, "upside_breakout")?,
    })
}

/// Process one row end to end: parse, score, evaluate expectancy.
fn process_row(
    scorer: &SignalScorer,
    cfg: &AppConfig,
    cols: &ColumnMap,
    index: usize,
    record: &csv::StringRecord,
) -> EngineResult<OutputRow> {
    let signals = parse_signals(record, cols)?;

    for flag in range_flags(&signals) {
        warn!(
            row = index,
            field = flag.field,
            value = flag.value,
            "signal outside documented range; delta will be capped"
        );
    }

    let score = scorer.score(&signals);

    let reward_to_risk = parse_optional(record, cols.reward_to_risk, "reward_to_risk")?;
    let capture_rate = parse_optional(record, cols.capture_rate, "capture_rate")?;
    let win_r = parse_optional(record, cols.win_r, "win_r")?;
    let loss_r =
        parse_optional(record, cols.loss_r, "loss_r")?.unwrap_or(cfg.default_loss_r);

    // Planning parameters come either as reward:risk + capture rate or as a
    // direct average-win R-multiple.
    let (avg_win_r, ev) = match (reward_to_risk, capture_rate) {
        (Some(rr), Some(capture)) => {
            let result = expectancy(&ExpectancyInput {
                p_win: score.p_win,
                reward_to_risk: rr,
                capture_rate: capture,
                loss_r,
            })?;
            (result.avg_win_r, result.ev)
        }
        (Some(_), None) => {
            return Err(EngineError::validation(
                "capture_rate",
                "required when reward_to_risk is given",
            ));
        }
        (None, Some(_)) => {
            return Err(EngineError::validation(
                "reward_to_risk",
                "required when capture_rate is given",
            ));
        }
        (None, None) => {
            let win_r = win_r.ok_or_else(|| {
                EngineError::validation(
                    "win_r",
                    "missing; supply win_r or reward_to_risk + capture_rate",
                )
            })?;
            (win_r, ev_in_r(score.p_win, win_r, loss_r))
        }
    };

    let recommendation = if ev >= cfg.take_threshold {
        "take_trade"
    } else {
        "skip_trade"
    };

    Ok(OutputRow {
        row: index,
        buy_ratings: signals.buy_ratings,
        total_ratings: signals.total_ratings,
        smart_score: signals.smart_score,
        net_options_sentiment: signals.net_options_sentiment,
        net_social_sentiment: signals.net_social_sentiment,
        upside_breakout: signals.upside_breakout,
        reward_to_risk,
        capture_rate,
        win_r,
        loss_r,
        total_delta: score.total_delta,
        p_win: score.p_win,
        avg_win_r,
        ev,
        recommendation,
    })
}

/// Run the batch transform from `input` CSV to `output` CSV.
pub fn process_batch<R: Read, W: Write>(
    scorer: &SignalScorer,
    cfg: &AppConfig,
    input: R,
    output: W,
) -> EngineResult<BatchReport> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
    let cols = ColumnMap::from_headers(rdr.headers()?)?;

    // Header is written explicitly so an empty batch still produces one.
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);
    wtr.write_record(OUTPUT_COLUMNS)?;

    let mut report = BatchReport::default();

    for (index, record) in rdr.records().enumerate() {
        report.rows_read += 1;

        let outcome = record
            .map_err(EngineError::from)
            .and_then(|rec| process_row(scorer, cfg, &cols, index, &rec));

        match outcome {
            Ok(row) => {
                report.rows_scored += 1;
                report.ev_sum += row.ev;
                report.p_win_sum += row.p_win;
                if row.recommendation == "take_trade" {
                    report.takes += 1;
                }
                wtr.serialize(&row)?;
            }
            Err(e) => {
                let e = e.at_record(index);
                warn!("skipping row: {e}");
                report.skipped.push(e);
            }
        }
    }

    wtr.flush()?;
    Ok(report)
}
