//! Report-window slicing of a full-history series.

use crate::domain::{Candle, DateWindow};

/// Rows whose date lies in the inclusive `window`, in input order.
///
/// Indicators are computed on the full history first; an empty slice is a
/// display matter, not a fetch failure.
pub fn slice_window(series: &[Candle], window: DateWindow) -> Vec<Candle> {
    if !window.is_valid() {
        return Vec::new();
    }
    // Ascending input lets us bound the slice with two binary searches.
    let lo = series.partition_point(|c| c.date < window.start);
    let hi = series.partition_point(|c| c.date <= window.end);
    series[lo..hi.max(lo)].to_vec()
}
