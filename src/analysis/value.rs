//! Per-listing value scoring against the market trend.

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

use super::trend::{fit_trend, Trend};
use crate::model::PropertyRecord;

// upper bounds, inclusive: a boundary value lands in the more favorable bucket
pub const EXCELLENT_DEAL_MAX: f64 = -15.0;
pub const GOOD_DEAL_MAX: f64 = -5.0;
pub const FAIR_PRICE_MAX: f64 = 5.0;
pub const ABOVE_MARKET_MAX: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueCategory {
    ExcellentDeal,
    GoodDeal,
    FairPrice,
    AboveMarket,
    Overpriced,
}

impl ValueCategory {
    pub const ALL: [ValueCategory; 5] = [
        ValueCategory::ExcellentDeal,
        ValueCategory::GoodDeal,
        ValueCategory::FairPrice,
        ValueCategory::AboveMarket,
        ValueCategory::Overpriced,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ValueCategory::ExcellentDeal => "Excellent Deal",
            ValueCategory::GoodDeal => "Good Deal",
            ValueCategory::FairPrice => "Fair Price",
            ValueCategory::AboveMarket => "Above Market",
            ValueCategory::Overpriced => "Overpriced",
        }
    }
}

// json carries the same label the tables print
impl Serialize for ValueCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl fmt::Display for ValueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueScore {
    /// Percent above (+) or below (-) the trend price.
    pub deviation_pct: f64,
    pub category: ValueCategory,
    pub predicted_price: f64,
    /// Trend price minus asking price; positive means cheaper than the market.
    pub savings: f64,
    pub slope: f64,
    pub intercept: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredRecord<'a> {
    pub record: &'a PropertyRecord,
    pub score: ValueScore,
}

pub fn categorize(deviation_pct: f64) -> ValueCategory {
    if !deviation_pct.is_finite() {
        return ValueCategory::FairPrice;
    }

    if deviation_pct <= EXCELLENT_DEAL_MAX {
        ValueCategory::ExcellentDeal
    } else if deviation_pct <= GOOD_DEAL_MAX {
        ValueCategory::GoodDeal
    } else if deviation_pct <= FAIR_PRICE_MAX {
        ValueCategory::FairPrice
    } else if deviation_pct <= ABOVE_MARKET_MAX {
        ValueCategory::AboveMarket
    } else {
        ValueCategory::Overpriced
    }
}

/// Percent deviation of the asking price from the trend price.
///
/// None for invalid records, or where the trend predicts a non-positive
/// price and a percentage would be meaningless.
pub fn score(record: &PropertyRecord, trend: &Trend) -> Option<f64> {
    if !record.is_valid() {
        return None;
    }

    let predicted = trend.predict(record.area);
    if !predicted.is_finite() || predicted <= 0.0 {
        return None;
    }

    let deviation = (record.price - predicted) / predicted * 100.0;
    deviation.is_finite().then_some(deviation)
}

pub fn value_score(record: &PropertyRecord, trend: &Trend) -> Option<ValueScore> {
    let deviation_pct = score(record, trend)?;
    let predicted_price = trend.predict(record.area);

    Some(ValueScore {
        deviation_pct,
        category: categorize(deviation_pct),
        predicted_price,
        savings: predicted_price - record.price,
        slope: trend.slope,
        intercept: trend.intercept,
    })
}

/// Fit a trend over `records` and score every record it can, in input order.
pub fn score_all(records: &[PropertyRecord]) -> (Trend, Vec<ScoredRecord<'_>>) {
    let trend = fit_trend(records);
    let scored = records
        .iter()
        .filter_map(|record| {
            value_score(record, &trend).map(|score| ScoredRecord { record, score })
        })
        .collect();
    (trend, scored)
}

fn deal_order(a: &ScoredRecord, b: &ScoredRecord) -> Ordering {
    a.score
        .deviation_pct
        .total_cmp(&b.score.deviation_pct)
        .then_with(|| a.record.price.abs().total_cmp(&b.record.price.abs()))
        .then_with(|| a.record.id.cmp(&b.record.id))
}

/// The `top_n` most underpriced listings.
///
/// Ordered by deviation, then cheaper asking price, then identity.
pub fn best_deals(records: &[PropertyRecord], top_n: usize) -> Vec<ScoredRecord<'_>> {
    let (_, mut scored) = score_all(records);
    scored.sort_by(deal_order);
    scored.truncate(top_n);
    scored
}

/// Listing count per category; every category is present, even at zero.
pub fn value_distribution(records: &[PropertyRecord]) -> Vec<(ValueCategory, usize)> {
    let (_, scored) = score_all(records);

    ValueCategory::ALL
        .iter()
        .map(|category| {
            let count = scored.iter().filter(|s| s.score.category == *category).count();
            (*category, count)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, area: f64, price: f64) -> PropertyRecord {
        PropertyRecord::new(id, price, area)
    }

    fn scenario() -> Vec<PropertyRecord> {
        vec![
            rec("a", 50.0, 500_000.0),
            rec("b", 100.0, 900_000.0),
            rec("c", 150.0, 1_400_000.0),
            rec("d", 100.0, 700_000.0),
        ]
    }

    #[test]
    fn category_thresholds_use_lower_bucket_at_boundaries() {
        assert_eq!(categorize(-15.0), ValueCategory::ExcellentDeal);
        assert_eq!(categorize(-15.0001), ValueCategory::ExcellentDeal);
        assert_eq!(categorize(-14.9999), ValueCategory::GoodDeal);
        assert_eq!(categorize(-5.0), ValueCategory::GoodDeal);
        assert_eq!(categorize(-4.9999), ValueCategory::FairPrice);
        assert_eq!(categorize(0.0), ValueCategory::FairPrice);
        assert_eq!(categorize(5.0), ValueCategory::FairPrice);
        assert_eq!(categorize(5.0001), ValueCategory::AboveMarket);
        assert_eq!(categorize(15.0), ValueCategory::AboveMarket);
        assert_eq!(categorize(15.0001), ValueCategory::Overpriced);
        assert_eq!(categorize(f64::NAN), ValueCategory::FairPrice);
    }

    #[test]
    fn score_is_percent_from_trend() {
        let trend = Trend {
            slope: 10_000.0,
            intercept: 0.0,
            r_squared: 1.0,
            sample_size: 3,
            degenerate: false,
        };

        let deviation = score(&rec("x", 100.0, 900_000.0), &trend).unwrap();
        assert!((deviation - -10.0).abs() < 1e-9);
        assert_eq!(score(&rec("bad", 100.0, -1.0), &trend), None);
    }

    #[test]
    fn non_positive_prediction_is_not_scored() {
        let trend = Trend::flat(0.0, 0);
        assert_eq!(score(&rec("x", 100.0, 900_000.0), &trend), None);
    }

    #[test]
    fn underpriced_listing_is_a_deal_and_tops_the_list() {
        let records = scenario();
        let (trend, scored) = score_all(&records);
        let d = scored.iter().find(|s| s.record.id == "d").unwrap();

        assert!(d.score.deviation_pct < -5.0);
        assert!(matches!(d.score.category, ValueCategory::ExcellentDeal | ValueCategory::GoodDeal));
        assert!(d.score.savings > 0.0);
        assert_eq!(d.score.slope, trend.slope);
        assert_eq!(d.score.intercept, trend.intercept);

        let top = best_deals(&records, 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].record.id, "d");
    }

    #[test]
    fn best_deal_ties_break_on_price_then_identity() {
        // flat trend at the mean; identical deviations only when prices match
        let records = vec![
            rec("z", 80.0, 1_000_000.0),
            rec("a", 80.0, 1_000_000.0),
            rec("m", 80.0, 1_300_000.0),
        ];
        let deals = best_deals(&records, 3);
        let ids: Vec<&str> = deals.iter().map(|s| s.record.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "z", "m"]);
    }

    #[test]
    fn best_deals_is_deterministic() {
        let records = scenario();
        let first: Vec<String> = best_deals(&records, 4).iter().map(|s| s.record.id.clone()).collect();
        for _ in 0..5 {
            let again: Vec<String> = best_deals(&records, 4).iter().map(|s| s.record.id.clone()).collect();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn best_deals_handles_small_inputs() {
        assert!(best_deals(&[], 5).is_empty());
        assert_eq!(best_deals(&scenario(), 10).len(), 4);
        assert!(best_deals(&scenario(), 0).is_empty());
    }

    #[test]
    fn category_serializes_as_its_label() {
        assert_eq!(serde_json::to_value(ValueCategory::ExcellentDeal).unwrap(), "Excellent Deal");
        for category in ValueCategory::ALL {
            assert_eq!(serde_json::to_value(category).unwrap(), category.to_string());
        }
    }

    #[test]
    fn distribution_lists_every_category() {
        let distribution = value_distribution(&scenario());
        assert_eq!(distribution.len(), 5);
        assert_eq!(distribution.iter().map(|(_, n)| n).sum::<usize>(), 4);

        let empty = value_distribution(&[]);
        assert!(empty.iter().all(|(_, n)| *n == 0));
    }
}
