//! Market value analysis.
//!
//! Pure functions over a dataset snapshot:
//! - trend: least-squares price-over-area fit
//! - value: per-listing deviation from trend, value categories, best deals
//! - groups: neighborhood affordability ranking and market statistics
//!
//! Records without a positive finite price and area are ignored throughout.

pub mod groups;
pub mod trend;
pub mod value;

pub use groups::{market_stats, rank_groups, GroupRank, MarketStats};
pub use trend::{fit_trend, Trend, TrendDirection};
pub use value::{
    best_deals, categorize, score, score_all, value_distribution, value_score, ScoredRecord,
    ValueCategory, ValueScore,
};

use crate::model::PropertyRecord;

fn valid_records(records: &[PropertyRecord]) -> impl Iterator<Item = &PropertyRecord> {
    records.iter().filter(|r| r.is_valid())
}

/// Median of a non-empty slice; sorts in place.
fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
