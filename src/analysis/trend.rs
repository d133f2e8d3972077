//! Linear market trend: price as a function of area.

use serde::Serialize;
use tracing::debug;

use super::valid_records;
use crate::model::PropertyRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendDirection {
    Rising,
    Falling,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trend {
    pub slope: f64,
    pub intercept: f64,
    /// Share of price variance explained by the fit; 0 for flat trends.
    pub r_squared: f64,
    pub sample_size: usize,
    /// True when the input could not support a slope and the trend is just the mean price.
    pub degenerate: bool,
}

impl Trend {
    pub fn flat(mean_price: f64, sample_size: usize) -> Self {
        Trend {
            slope: 0.0,
            intercept: mean_price,
            r_squared: 0.0,
            sample_size,
            degenerate: true,
        }
    }

    pub fn predict(&self, area: f64) -> f64 {
        self.slope * area + self.intercept
    }

    pub fn direction(&self) -> TrendDirection {
        if self.slope > 0.0 {
            TrendDirection::Rising
        } else if self.slope < 0.0 {
            TrendDirection::Falling
        } else {
            TrendDirection::Flat
        }
    }
}

/// Ordinary least squares over every valid record.
///
/// Fewer than two distinct areas yields a flat trend at the mean price
/// (intercept 0 for empty input) instead of an error.
pub fn fit_trend(records: &[PropertyRecord]) -> Trend {
    let points: Vec<(f64, f64)> = valid_records(records).map(|r| (r.area, r.price)).collect();
    let n = points.len();

    if n == 0 {
        return Trend::flat(0.0, 0);
    }

    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n as f64;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n as f64;

    let first_x = points[0].0;
    if points.iter().all(|(x, _)| *x == first_x) {
        debug!(points = n, "all areas identical, using flat trend");
        return Trend::flat(mean_y, n);
    }

    let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
        let dx = x - mean_x;
        (sxx + dx * dx, sxy + dx * (y - mean_y))
    });

    if sxx <= 0.0 || !sxx.is_finite() || !sxy.is_finite() {
        debug!(points = n, "area variance unusable, using flat trend");
        return Trend::flat(mean_y, n);
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let (ss_res, ss_tot) = points.iter().fold((0.0, 0.0), |(res, tot), (x, y)| {
        let fitted = slope * x + intercept;
        (res + (y - fitted).powi(2), tot + (y - mean_y).powi(2))
    });
    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    Trend {
        slope,
        intercept,
        r_squared,
        sample_size: n,
        degenerate: false,
    }
}
