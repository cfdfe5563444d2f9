//! Derived price analytics.

use serde::{Deserialize, Serialize};

use crate::PriceRecord;

/// Number of price changes in a window and their mean relative size in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceVolatility {
    pub changes: u32,
    pub volatility: f64,
}

/// Computes volatility over price points in chronological order.
///
/// Each consecutive pair whose price moved contributes
/// `|Δprice| / previous × 100`; the result is the mean of those
/// contributions. Unchanged pairs and pairs starting from a zero price are
/// skipped. Fewer than two points yields zero changes and zero volatility.
pub fn price_volatility(points: &[PriceRecord]) -> PriceVolatility {
    if points.len() < 2 {
        return PriceVolatility::default();
    }

    let mut ordered: Vec<&PriceRecord> = points.iter().collect();
    ordered.sort_by_key(|p| p.timestamp);

    let (changes, total) = ordered
        .windows(2)
        .filter_map(|pair| {
            let previous = pair[0].price.as_f64();
            let diff = (pair[1].price.as_f64() - previous).abs();
            (diff > 0.0 && previous > 0.0).then(|| diff * 100.0 / previous)
        })
        .fold((0u32, 0.0f64), |(n, sum), pct| (n + 1, sum + pct));

    PriceVolatility {
        changes,
        volatility: if changes > 0 {
            total / f64::from(changes)
        } else {
            0.0
        },
    }
}
