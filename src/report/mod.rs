pub mod json;
pub mod table;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::analysis::{self, MarketStats, Trend, ValueCategory, ValueScore};
use crate::model::{Condition, Dataset};
use crate::novelty::{self, seen::SeenIndex, ClassifiedRecord, NoveltySummary};
use crate::store::quota::StorageQuota;
use crate::store::DatasetInfo;

#[derive(Debug, Clone, Serialize)]
pub struct ListingRow {
    pub id: String,
    pub neighborhood: Option<String>,
    pub price: f64,
    pub area: f64,
    pub rooms: Option<f64>,
    pub price_per_area: Option<f64>,
    pub condition: Condition,
    pub is_new: bool,
    pub first_seen_at: Option<DateTime<Utc>>,
    pub score: Option<ValueScore>,
    pub url: Option<String>,
}

impl ListingRow {
    fn from_classified(classified: ClassifiedRecord, trend: &Trend) -> Self {
        let score = analysis::value_score(&classified.record, trend);
        let record = classified.record;

        ListingRow {
            price_per_area: record.price_per_area(),
            id: record.id,
            neighborhood: record.neighborhood,
            price: record.price,
            area: record.area,
            rooms: record.rooms,
            condition: record.condition,
            is_new: classified.novelty.is_new,
            first_seen_at: classified.novelty.first_seen_at,
            score,
            url: record.url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionRow {
    pub category: ValueCategory,
    pub count: usize,
}

/// Everything the `report` command prints.
#[derive(Debug, Clone, Serialize)]
pub struct MarketReport {
    pub saved_at: DateTime<Utc>,
    pub trend: Trend,
    pub stats: Option<MarketStats>,
    pub novelty: NoveltySummary,
    pub distribution: Vec<DistributionRow>,
    pub listings: Vec<ListingRow>,
}

impl MarketReport {
    /// Score the dataset against its own trend and flag new listings.
    ///
    /// The trend and statistics always cover the whole dataset; `new_only`
    /// only filters the listing rows.
    pub fn build(
        dataset: Dataset,
        index: &mut SeenIndex,
        window: Duration,
        now: DateTime<Utc>,
        new_only: bool,
    ) -> Self {
        let trend = analysis::fit_trend(&dataset.records);
        let stats = analysis::market_stats(&dataset.records);
        let distribution = analysis::value_distribution(&dataset.records)
            .into_iter()
            .map(|(category, count)| DistributionRow { category, count })
            .collect();

        let classified = novelty::classify(index, dataset.records, window, now);
        let summary = novelty::summarize(&classified);

        let listings = classified
            .into_iter()
            .filter(|c| !new_only || c.novelty.is_new)
            .map(|c| ListingRow::from_classified(c, &trend))
            .collect();

        MarketReport {
            saved_at: dataset.saved_at,
            trend,
            stats,
            novelty: summary,
            distribution,
            listings,
        }
    }
}

/// Everything the `info` command prints.
#[derive(Debug, Clone, Serialize)]
pub struct InfoReport {
    #[serde(flatten)]
    pub dataset: DatasetInfo,
    pub usage_percent: f64,
    pub recommendation: Option<&'static str>,
    pub seen_identities: usize,
}

impl InfoReport {
    pub fn new(dataset: DatasetInfo, seen_identities: usize) -> Self {
        InfoReport {
            usage_percent: dataset.quota.usage_percent(),
            recommendation: dataset.quota.recommendation(),
            dataset,
            seen_identities,
        }
    }
}

/// One-line outcome of an import, for stdout.
pub fn import_summary(saved: usize, skipped: usize, summary: &NoveltySummary, quota: &StorageQuota) -> String {
    let mut line = format!("saved {saved} listings ({} new, {} known)", summary.new, summary.known);
    if skipped > 0 {
        line.push_str(&format!(", skipped {skipped} unreadable"));
    }
    line.push_str(&format!(
        "\nstorage: {} of {} ({:.1}%)",
        crate::util::format_bytes(quota.used_bytes),
        crate::util::format_bytes(quota.ceiling_bytes),
        quota.usage_percent()
    ));
    if let Some(advice) = quota.recommendation() {
        line.push_str(&format!("\n{advice}"));
    }
    line
}
