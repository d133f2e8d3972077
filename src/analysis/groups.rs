//! Neighborhood affordability ranking and whole-market statistics.

use serde::Serialize;
use std::collections::BTreeMap;

use super::{median, valid_records};
use crate::model::PropertyRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRank {
    pub label: String,
    pub median_price_per_area: f64,
    pub count: usize,
}

/// Rank neighborhoods by median price per area, most affordable first.
///
/// Records without a neighborhood or without a valid price and area do not
/// count, so a neighborhood with no valid records is left out entirely. Equal
/// medians are ordered by label.
pub fn rank_groups(records: &[PropertyRecord]) -> Vec<GroupRank> {
    let mut by_label: BTreeMap<&str, Vec<f64>> = BTreeMap::new();

    for record in valid_records(records) {
        let Some(label) = record.neighborhood.as_deref().map(str::trim) else { continue };
        if label.is_empty() {
            continue;
        }
        by_label
            .entry(label)
            .or_default()
            .push(record.price / record.area);
    }

    let mut ranks: Vec<GroupRank> = by_label
        .into_iter()
        .filter_map(|(label, mut ratios)| {
            let count = ratios.len();
            median(&mut ratios).map(|median_price_per_area| GroupRank {
                label: label.to_string(),
                median_price_per_area,
                count,
            })
        })
        .collect();

    ranks.sort_by(|a, b| {
        a.median_price_per_area
            .total_cmp(&b.median_price_per_area)
            .then_with(|| a.label.cmp(&b.label))
    });

    ranks
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketStats {
    pub count: usize,
    pub mean_price: f64,
    pub median_price: f64,
    pub median_price_per_area: f64,
    pub mean_area: f64,
}

/// Summary statistics over valid records; None when there are none.
pub fn market_stats(records: &[PropertyRecord]) -> Option<MarketStats> {
    let valid: Vec<&PropertyRecord> = valid_records(records).collect();
    if valid.is_empty() {
        return None;
    }

    let count = valid.len();
    let mut prices: Vec<f64> = valid.iter().map(|r| r.price).collect();
    let mut ratios: Vec<f64> = valid.iter().map(|r| r.price / r.area).collect();

    let mean_price = prices.iter().sum::<f64>() / count as f64;
    let mean_area = valid.iter().map(|r| r.area).sum::<f64>() / count as f64;

    Some(MarketStats {
        count,
        mean_price,
        median_price: median(&mut prices)?,
        median_price_per_area: median(&mut ratios)?,
        mean_area,
    })
}
