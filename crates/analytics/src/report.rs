use core_types::ImpactRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Orders records by event time, then by reaction speed. Records without a
/// reaction time sort after those with one.
pub fn rank_impacts(mut records: Vec<ImpactRecord>) -> Vec<ImpactRecord> {
    records.sort_by(|a, b| {
        a.event_time_utc
            .cmp(&b.event_time_utc)
            .then_with(|| compare_defined_first(a.reaction_minutes, b.reaction_minutes))
    });
    records
}

fn compare_defined_first(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Average reaction of one asset to one category of events.
///
/// Each mean and the median skip records where that metric is undefined, and are
/// `None` when no record defines it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub asset: String,
    pub events: usize,
    pub mean_post_return: Option<f64>,
    pub mean_abs_post_return: Option<f64>,
    pub mean_vol_change: Option<f64>,
    pub median_reaction_minutes: Option<f64>,
}

/// Groups records by (category, asset), sorted by both.
pub fn summarize_by_category(records: &[ImpactRecord]) -> Vec<CategorySummary> {
    let mut groups: BTreeMap<(&str, &str), Vec<&ImpactRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.category.as_str(), record.asset.as_str()))
            .or_default()
            .push(record);
    }

    groups
        .into_iter()
        .map(|((category, asset), rows)| {
            let post: Vec<f64> = rows.iter().filter_map(|r| r.post_return).collect();
            let abs_post: Vec<f64> = post.iter().map(|r| r.abs()).collect();
            let vol: Vec<f64> = rows.iter().filter_map(|r| r.vol_change).collect();
            let reaction: Vec<f64> = rows.iter().filter_map(|r| r.reaction_minutes).collect();

            CategorySummary {
                category: category.to_string(),
                asset: asset.to_string(),
                events: rows.len(),
                mean_post_return: mean(&post),
                mean_abs_post_return: mean(&abs_post),
                mean_vol_change: mean(&vol),
                median_reaction_minutes: median(reaction),
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
