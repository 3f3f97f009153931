use serde_json::Value;

use crate::model::{
    GeographyRecord, MetricMap, USAGE_PCT, USAGE_PER_CAPITA_INDEX, USAGE_RANK, USAGE_TIER,
};

/// Assigns rank, tier, and the usage-per-capita index to every record of one
/// geography kind, sorting the collection descending by `usage_pct` along
/// the way. Missing `usage_pct` ranks as 0; ties keep their pre-sort order
/// (stable sort). An empty collection is a no-op.
///
/// The per-capita index divides `usage_pct` by a uniform equal-share
/// baseline of `100 / n`, not by true population share; population figures
/// are not a pipeline input, and downstream consumers expect exactly this
/// approximation.
pub fn compute_tiers_and_ranks(records: &mut [GeographyRecord]) {
    let n = records.len();
    if n == 0 {
        return;
    }

    records.sort_by(|a, b| b.metric(USAGE_PCT).total_cmp(&a.metric(USAGE_PCT)));

    let baseline = 100.0 / n as f64;

    for (position, record) in records.iter_mut().enumerate() {
        let rank = (position + 1) as u64;
        let percentile = (position + 1) as f64 / n as f64;
        let pct = record.metric(USAGE_PCT);

        record
            .metrics
            .insert(USAGE_RANK.to_string(), Value::from(rank));
        record
            .metrics
            .insert(USAGE_TIER.to_string(), Value::from(tier_for(percentile)));
        record.metrics.insert(
            USAGE_PER_CAPITA_INDEX.to_string(),
            Value::from(pct / baseline),
        );

        if record.metrics.get(USAGE_PCT).and_then(Value::as_f64).is_none() {
            record.metrics.insert(USAGE_PCT.to_string(), Value::from(0));
        }
    }
}

/// Fixed percentile buckets: 4 = Leading, 3 = Upper middle, 2 = Lower
/// middle, 1 = Emerging, 0 = Minimal.
fn tier_for(percentile: f64) -> u64 {
    if percentile <= 0.25 {
        4
    } else if percentile <= 0.50 {
        3
    } else if percentile <= 0.75 {
        2
    } else if percentile <= 0.90 {
        1
    } else {
        0
    }
}

/// Backfills the metric keys the presentation layer reads unconditionally.
/// Ranked collections get real values from `compute_tiers_and_ranks`; the
/// global and platform records, which are never ranked, get numeric zeros.
pub fn ensure_consumer_defaults(metrics: &mut MetricMap) {
    for key in [USAGE_PCT, USAGE_RANK, USAGE_TIER, USAGE_PER_CAPITA_INDEX] {
        if metrics.get(key).and_then(Value::as_f64).is_none() {
            metrics.insert(key.to_string(), Value::from(0));
        }
    }
}
