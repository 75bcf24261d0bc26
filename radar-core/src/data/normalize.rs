//! Raw provider table → canonical candle series.
//!
//! Reconciles column names (English and localized), date representations and
//! numeric formats, then derives `amount` and `volume_ratio` where the source
//! omits them. The last step zero-fills anything still missing. That step is
//! lossy on purpose: downstream code never sees NaN or null.

use super::provider::{DataError, RawTable};
use crate::domain::{Candle, Series};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Date,
    Open,
    High,
    Low,
    Close,
    Volume,
    Amount,
    VolumeRatio,
}

const ALIASES: &[(&str, Field)] = &[
    ("date", Field::Date),
    ("datetime", Field::Date),
    ("timestamp", Field::Date),
    ("trade_date", Field::Date),
    ("日期", Field::Date),
    ("净值日期", Field::Date),
    ("open", Field::Open),
    ("开盘", Field::Open),
    ("开盘价", Field::Open),
    ("high", Field::High),
    ("最高", Field::High),
    ("最高价", Field::High),
    ("low", Field::Low),
    ("最低", Field::Low),
    ("最低价", Field::Low),
    ("close", Field::Close),
    ("收盘", Field::Close),
    ("收盘价", Field::Close),
    ("price", Field::Close),
    ("nav", Field::Close),
    ("单位净值", Field::Close),
    ("volume", Field::Volume),
    ("vol", Field::Volume),
    ("成交量", Field::Volume),
    ("交易量", Field::Volume),
    ("amount", Field::Amount),
    ("turnover", Field::Amount),
    ("成交额", Field::Amount),
    ("volume_ratio", Field::VolumeRatio),
    ("量比", Field::VolumeRatio),
];

fn field_for(header: &str) -> Option<Field> {
    let key = header.trim().to_lowercase();
    ALIASES.iter().find(|(alias, _)| *alias == key).map(|(_, f)| *f)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Number of prior sessions averaged for the derived volume ratio.
    pub volume_ratio_lookback: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            volume_ratio_lookback: 5,
        }
    }
}

/// What the normalizer had to discard or invent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub rows_in: usize,
    pub unparsable_dates: usize,
    pub duplicate_dates: usize,
    pub zero_filled_cells: usize,
}

impl NormalizeReport {
    pub fn rows_out(&self) -> usize {
        self.rows_in - self.unparsable_dates - self.duplicate_dates
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

/// Column positions resolved from the header row. First match wins.
#[derive(Debug, Default)]
struct Layout {
    date: Option<usize>,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    close: Option<usize>,
    volume: Option<usize>,
    amount: Option<usize>,
    volume_ratio: Option<usize>,
}

impl Layout {
    fn from_columns(columns: &[String]) -> Self {
        let mut layout = Layout::default();
        for (idx, header) in columns.iter().enumerate() {
            let slot = match field_for(header) {
                Some(Field::Date) => &mut layout.date,
                Some(Field::Open) => &mut layout.open,
                Some(Field::High) => &mut layout.high,
                Some(Field::Low) => &mut layout.low,
                Some(Field::Close) => &mut layout.close,
                Some(Field::Volume) => &mut layout.volume,
                Some(Field::Amount) => &mut layout.amount,
                Some(Field::VolumeRatio) => &mut layout.volume_ratio,
                None => continue,
            };
            slot.get_or_insert(idx);
        }
        layout
    }
}

struct PartialRow {
    date: NaiveDate,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
    amount: Option<f64>,
    volume_ratio: Option<f64>,
}

fn cell(row: &[Value], idx: Option<usize>) -> Option<f64> {
    idx.and_then(|i| row.get(i)).and_then(parse_number)
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Fails only when the table has no recognizable date or close column;
    /// bad cells degrade to zero instead.
    pub fn normalize(&self, table: &RawTable) -> Result<(Series, NormalizeReport), DataError> {
        let layout = Layout::from_columns(&table.columns);
        let date_idx = layout
            .date
            .ok_or_else(|| DataError::Parse("no date column".into()))?;
        if layout.close.is_none() {
            return Err(DataError::Parse("no close column".into()));
        }

        let mut report = NormalizeReport {
            rows_in: table.rows.len(),
            ..Default::default()
        };

        let mut rows: Vec<PartialRow> = Vec::with_capacity(table.rows.len());
        for raw in &table.rows {
            let Some(date) = raw.get(date_idx).and_then(parse_date) else {
                report.unparsable_dates += 1;
                continue;
            };
            let close = cell(raw, layout.close);
            // NAV-only sources carry no intraday range.
            let backfill = |idx: Option<usize>| match idx {
                Some(_) => cell(raw, idx),
                None => close,
            };
            rows.push(PartialRow {
                date,
                open: backfill(layout.open),
                high: backfill(layout.high),
                low: backfill(layout.low),
                close,
                volume: cell(raw, layout.volume),
                amount: cell(raw, layout.amount),
                volume_ratio: cell(raw, layout.volume_ratio),
            });
        }

        // Stable sort keeps the first occurrence of a duplicated date in front.
        rows.sort_by_key(|r| r.date);
        let before = rows.len();
        rows.dedup_by_key(|r| r.date);
        report.duplicate_dates = before - rows.len();

        for r in rows.iter_mut() {
            if r.amount.is_none() {
                r.amount = match (r.close, r.volume) {
                    (Some(c), Some(v)) => Some(c * v),
                    _ => None,
                };
            }
        }

        if rows.iter().all(|r| r.volume_ratio.is_none()) {
            let volumes: Vec<Option<f64>> = rows.iter().map(|r| r.volume).collect();
            for (r, ratio) in rows
                .iter_mut()
                .zip(volume_ratios(&volumes, self.config.volume_ratio_lookback))
            {
                r.volume_ratio = Some(ratio);
            }
        }

        let mut fill = |v: Option<f64>| match v {
            Some(x) if x.is_finite() => x,
            _ => {
                report.zero_filled_cells += 1;
                0.0
            }
        };
        let series = rows
            .into_iter()
            .map(|r| Candle {
                date: r.date,
                open: fill(r.open),
                high: fill(r.high),
                low: fill(r.low),
                close: fill(r.close),
                volume: fill(r.volume),
                amount: fill(r.amount),
                volume_ratio: fill(r.volume_ratio),
            })
            .collect();

        Ok((series, report))
    }
}

/// Normalize with default settings.
pub fn normalize(table: &RawTable) -> Result<Series, DataError> {
    Normalizer::default().normalize(table).map(|(series, _)| series)
}

/// `volume[i] / mean(previous up to `lookback` present volumes)`.
///
/// Undefined, zero-mean and non-finite results are 0.
pub fn volume_ratios(volumes: &[Option<f64>], lookback: usize) -> Vec<f64> {
    let lookback = lookback.max(1);
    (0..volumes.len())
        .map(|i| {
            let prior: Vec<f64> = volumes[i.saturating_sub(lookback)..i]
                .iter()
                .flatten()
                .copied()
                .collect();
            let Some(current) = volumes[i] else {
                return 0.0;
            };
            if prior.is_empty() {
                return 0.0;
            }
            let mean = prior.iter().sum::<f64>() / prior.len() as f64;
            if mean == 0.0 {
                return 0.0;
            }
            let ratio = current / mean;
            if ratio.is_finite() {
                ratio
            } else {
                0.0
            }
        })
        .collect()
}

/// Coerce a cell to a finite number.
///
/// Strips grouping separators and `%`, honours `K`/`M`/`B` magnitude
/// suffixes, and treats `-`, blanks and non-finite values as missing.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|x| x.is_finite()),
        Value::String(s) => parse_number_str(s),
        _ => None,
    }
}

fn parse_number_str(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' ' | '%'))
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '-') {
        return None;
    }
    let upper = cleaned.to_ascii_uppercase();
    let (digits, scale) = match upper.chars().last() {
        Some('K') => (&upper[..upper.len() - 1], 1e3),
        Some('M') => (&upper[..upper.len() - 1], 1e6),
        Some('B') => (&upper[..upper.len() - 1], 1e9),
        _ => (upper.as_str(), 1.0),
    };
    digits
        .parse::<f64>()
        .ok()
        .map(|x| x * scale)
        .filter(|x| x.is_finite())
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%Y年%m月%d日", "%Y.%m.%d"];

/// Parse a cell into a bare calendar date.
///
/// Eight-digit integers are `YYYYMMDD`; other integers are epoch seconds
/// (milliseconds when too large for seconds).
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => n.as_i64().and_then(date_from_integer),
        Value::String(s) => parse_date_str(s.trim()),
        _ => None,
    }
}

fn date_from_integer(v: i64) -> Option<NaiveDate> {
    if (10_000_000..=99_999_999).contains(&v) {
        return NaiveDate::from_ymd_opt((v / 10_000) as i32, (v / 100 % 100) as u32, (v % 100) as u32);
    }
    date_from_epoch(v)
}

fn date_from_epoch(ts: i64) -> Option<NaiveDate> {
    let secs = if ts.abs() >= 100_000_000_000 { ts / 1000 } else { ts };
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc().date())
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(date_from_integer);
    }
    None
}
