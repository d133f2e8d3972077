//! Plain terminal tables for the listing, deal, group and info views.
//!
//! Column widths are fixed; long neighborhood names and ids are truncated.

use super::{InfoReport, MarketReport};
use crate::analysis::{GroupRank, ScoredRecord, TrendDirection};
use crate::util::{format_bytes, format_percent, format_price, truncate};

pub fn render_report(report: &MarketReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\nMarket ({} listings, saved {})\n",
        report.stats.as_ref().map_or(0, |s| s.count),
        report.saved_at.format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str(&"-".repeat(60));
    output.push('\n');

    if let Some(stats) = &report.stats {
        output.push_str(&format!("  {:28} {:>14}\n", "mean price", format_price(stats.mean_price)));
        output.push_str(&format!("  {:28} {:>14}\n", "median price", format_price(stats.median_price)));
        output.push_str(&format!(
            "  {:28} {:>14}\n",
            "median price / m2",
            format_price(stats.median_price_per_area)
        ));
        output.push_str(&format!("  {:28} {:>14.1}\n", "mean area (m2)", stats.mean_area));
    }

    let direction = match report.trend.direction() {
        TrendDirection::Rising => "rising",
        TrendDirection::Falling => "falling",
        TrendDirection::Flat => "flat",
    };
    output.push_str(&format!(
        "  {:28} {:>14}\n",
        "trend price / m2",
        format!("{} ({direction})", format_price(report.trend.slope))
    ));
    if report.trend.degenerate {
        output.push_str("  trend is the mean price: not enough distinct areas to fit a slope\n");
    } else {
        output.push_str(&format!("  {:28} {:>14.3}\n", "trend fit (r2)", report.trend.r_squared));
    }

    output.push_str(&format!(
        "  {:28} {:>14}\n",
        "new / known",
        format!("{} / {}", report.novelty.new, report.novelty.known)
    ));

    output.push_str("\nValue distribution\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    for row in &report.distribution {
        output.push_str(&format!("  {:28} {:>14}\n", row.category.label(), row.count));
    }

    if report.listings.is_empty() {
        output.push_str("\nNo listings to show.\n");
        return output;
    }

    output.push_str(&format!(
        "\n  {:3} {:14} {:18} {:>12} {:>7} {:>5} {:>8}  {}\n",
        "", "id", "neighborhood", "price", "m2", "rooms", "vs trend", "category"
    ));
    output.push_str(&"-".repeat(90));
    output.push('\n');

    for row in &report.listings {
        let marker = if row.is_new { "*" } else { "" };
        let rooms = row.rooms.map(|r| format!("{r}")).unwrap_or_else(|| "-".to_string());
        let (deviation, category) = match &row.score {
            Some(score) => (format_percent(score.deviation_pct), score.category.label()),
            None => ("-".to_string(), "-"),
        };

        output.push_str(&format!(
            "  {:3} {:14} {:18} {:>12} {:>7.1} {:>5} {:>8}  {}\n",
            marker,
            truncate(&row.id, 14),
            truncate(row.neighborhood.as_deref().unwrap_or("-"), 18),
            format_price(row.price),
            row.area,
            rooms,
            deviation,
            category
        ));
    }

    output.push_str("\n  * new listing\n");
    output
}

pub fn render_deals(deals: &[ScoredRecord]) -> String {
    if deals.is_empty() {
        return String::from("No listings could be scored.\n");
    }

    let mut output = String::new();
    output.push_str(&format!(
        "\n  {:>3} {:14} {:18} {:>12} {:>12} {:>8} {:>12}  {}\n",
        "#", "id", "neighborhood", "price", "trend", "vs trend", "savings", "category"
    ));
    output.push_str(&"-".repeat(100));
    output.push('\n');

    for (rank, deal) in deals.iter().enumerate() {
        output.push_str(&format!(
            "  {:>3} {:14} {:18} {:>12} {:>12} {:>8} {:>12}  {}\n",
            rank + 1,
            truncate(&deal.record.id, 14),
            truncate(deal.record.neighborhood.as_deref().unwrap_or("-"), 18),
            format_price(deal.record.price),
            format_price(deal.score.predicted_price),
            format_percent(deal.score.deviation_pct),
            format_price(deal.score.savings),
            deal.score.category
        ));
    }

    output
}

pub fn render_groups(groups: &[GroupRank]) -> String {
    if groups.is_empty() {
        return String::from("No neighborhoods with valid listings.\n");
    }

    let mut output = String::new();
    output.push_str(&format!("\n  {:>3} {:30} {:>16} {:>8}\n", "#", "neighborhood", "median / m2", "count"));
    output.push_str(&"-".repeat(62));
    output.push('\n');

    for (rank, group) in groups.iter().enumerate() {
        output.push_str(&format!(
            "  {:>3} {:30} {:>16} {:>8}\n",
            rank + 1,
            truncate(&group.label, 30),
            format_price(group.median_price_per_area),
            group.count
        ));
    }

    output
}

pub fn render_info(info: &InfoReport) -> String {
    let mut output = String::new();
    let dataset = &info.dataset;

    if dataset.has_data {
        let saved = dataset
            .saved_at
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        output.push_str(&format!("{:20} {}\n", "listings", dataset.record_count));
        output.push_str(&format!("{:20} {saved}\n", "saved at"));
    } else {
        output.push_str("No saved dataset.\n");
    }

    output.push_str(&format!(
        "{:20} {} of {} ({:.1}%)\n",
        "storage",
        format_bytes(dataset.quota.used_bytes),
        format_bytes(dataset.quota.ceiling_bytes),
        info.usage_percent
    ));
    output.push_str(&format!("{:20} {}\n", "tracked listings", info.seen_identities));

    if !dataset.durable {
        output.push_str("warning: storage is unavailable, nothing will be kept after exit\n");
    }
    if let Some(advice) = info.recommendation {
        output.push_str(&format!("{advice}\n"));
    }

    output
}
