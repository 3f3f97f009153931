use std::path::Path;

use serde_json::Value;

use super::{grouper, occupations, parser, ranker};
use crate::model::{
    Facet, Geography, GeographyRecord, MetricMap, ONET_TASK_COUNT, ONET_TASK_PCT, RawRow,
    TaskEntry, TaxonomyEntry, USAGE_PCT, USAGE_PER_CAPITA_INDEX, USAGE_RANK, USAGE_TIER,
};

fn row(
    geo_id: &str,
    geography: Geography,
    facet: Facet,
    variable: &str,
    cluster_name: &str,
    value: Option<f64>,
) -> RawRow {
    RawRow {
        geo_id: geo_id.to_string(),
        geography,
        facet,
        level: Some(0),
        variable: variable.to_string(),
        cluster_name: cluster_name.to_string(),
        value,
    }
}

fn country_record(geo_id: &str, usage_pct: Option<f64>) -> GeographyRecord {
    let mut record = GeographyRecord::new(geo_id, Geography::Country);
    if let Some(pct) = usage_pct {
        record
            .metrics
            .insert(USAGE_PCT.to_string(), Value::from(pct));
    }
    record
}

fn task_entry(task: &str, count: Option<f64>, pct: Option<f64>) -> TaskEntry {
    let mut metrics = MetricMap::new();
    if let Some(count) = count {
        metrics.insert(ONET_TASK_COUNT.to_string(), Value::from(count));
    }
    if let Some(pct) = pct {
        metrics.insert(ONET_TASK_PCT.to_string(), Value::from(pct));
    }
    TaskEntry {
        task: task.to_string(),
        metrics,
    }
}

fn taxonomy(entries: Vec<(&str, &str, &str)>) -> occupations::TaxonomyMapping {
    entries
        .into_iter()
        .map(|(task, soc_code, title)| {
            let entry = TaxonomyEntry {
                task: task.to_string(),
                soc_code: soc_code.to_string(),
                occupation_title: title.to_string(),
                soc_major_group: soc_code.chars().take(2).collect(),
            };
            (occupations::normalize_task(task), entry)
        })
        .collect()
}

#[test]
fn parser_infers_numbers_and_preserves_row_order() {
    let source = "\
geo_id,geography,facet,level,variable,cluster_name,value,platform_and_product
US,country,country,,usage_count,,1000,Claude AI
US,country,country,,usage_pct,,0.5,Claude AI
CA,country,country,,usage_count,,,Claude AI
";

    let parsed = parser::parse_reader(source.as_bytes(), "test.csv").unwrap();

    assert!(parsed.warnings.is_empty());
    assert_eq!(parsed.rows.len(), 3);
    assert_eq!(parsed.rows[0].geo_id, "US");
    assert_eq!(parsed.rows[0].value, Some(1000.0));
    assert_eq!(parsed.rows[1].value, Some(0.5));
    assert_eq!(parsed.rows[2].geo_id, "CA");
    assert_eq!(parsed.rows[2].value, None);
}

#[test]
fn parser_collects_warnings_without_aborting_the_batch() {
    let source = "\
geo_id,geography,facet,level,variable,cluster_name,value
US,country,country,,usage_count,,abc
US,planet,country,,usage_count,,10
US,country,unknown_facet,,usage_count,,10
GB,country,country,,usage_count,,42
";

    let parsed = parser::parse_reader(source.as_bytes(), "test.csv").unwrap();

    assert_eq!(parsed.warnings.len(), 3);
    assert_eq!(parsed.rows.len(), 1);
    assert_eq!(parsed.rows[0].geo_id, "GB");
    assert!(parsed.warnings[0].contains("non-numeric value"));
    assert!(parsed.warnings[1].contains("unknown geography"));
    assert!(parsed.warnings[2].contains("unknown facet"));
}

#[test]
fn parser_requires_the_core_columns() {
    let source = "geo_id,geography,level,variable,cluster_name,value\nUS,country,,x,,1\n";

    let err = parser::parse_reader(source.as_bytes(), "test.csv").unwrap_err();
    assert!(err.to_string().contains("facet"));
}

#[test]
fn parser_fails_for_missing_source_file() {
    assert!(parser::parse_file(Path::new("/nonexistent/source.csv")).is_err());
}

#[test]
fn grouper_drops_not_classified_geographies_entirely() {
    let rows = vec![
        row(
            "not_classified",
            Geography::Country,
            Facet::Country,
            "usage_count",
            "",
            Some(10.0),
        ),
        row(
            "not_classified",
            Geography::StateUs,
            Facet::OnetTask,
            "onet_task_count",
            "write code",
            Some(10.0),
        ),
    ];

    let grouped = grouper::group_rows(&rows);
    assert!(grouped.countries.is_empty());
    assert!(grouped.states.is_empty());
    assert!(grouped.global.is_none());
}

#[test]
fn grouper_drops_not_classified_cluster_entries() {
    let rows = vec![
        row(
            "US",
            Geography::StateUs,
            Facet::OnetTask,
            "onet_task_count",
            "not_classified",
            Some(10.0),
        ),
        row(
            "US",
            Geography::StateUs,
            Facet::Collaboration,
            "collaboration_count",
            "not_classified",
            Some(10.0),
        ),
        row(
            "US",
            Geography::StateUs,
            Facet::Request,
            "request_count",
            "not_classified",
            Some(10.0),
        ),
    ];

    let grouped = grouper::group_rows(&rows);
    let record = &grouped.states[0];
    assert!(record.tasks.is_empty());
    assert!(record.requests.is_empty());
    assert!(record.collaboration.is_empty());
}

#[test]
fn repeated_cluster_rows_merge_into_a_single_entry() {
    let rows = vec![
        row(
            "US",
            Geography::StateUs,
            Facet::OnetTask,
            "onet_task_count",
            "write code",
            Some(100.0),
        ),
        row(
            "US",
            Geography::StateUs,
            Facet::OnetTask,
            "onet_task_pct",
            "write code",
            Some(0.01),
        ),
    ];

    let grouped = grouper::group_rows(&rows);
    let record = &grouped.states[0];
    assert_eq!(record.tasks.len(), 1);

    let task = &record.tasks[0];
    assert_eq!(task.task, "write code");
    assert_eq!(task.metrics.get("onet_task_count"), Some(&Value::from(100.0)));
    assert_eq!(task.metrics.get("onet_task_pct"), Some(&Value::from(0.01)));
}

#[test]
fn request_entries_keep_the_level_of_the_creating_row() {
    let mut first = row(
        "GLOBAL",
        Geography::Global,
        Facet::Request,
        "request_count",
        "debugging",
        Some(5.0),
    );
    first.level = Some(0);
    let mut second = row(
        "GLOBAL",
        Geography::Global,
        Facet::Request,
        "request_pct",
        "debugging",
        Some(0.2),
    );
    second.level = Some(1);

    let grouped = grouper::group_rows(&[first, second]);
    let record = grouped.global.unwrap();
    assert_eq!(record.requests.len(), 1);
    assert_eq!(record.requests[0].level, Some(0));
    assert_eq!(record.requests[0].metrics.len(), 2);
}

#[test]
fn cross_facet_rows_are_accepted_but_not_materialized() {
    let rows = vec![
        row(
            "GLOBAL",
            Geography::Global,
            Facet::OnetTaskCollaboration,
            "onet_task_collaboration_count",
            "write code::directive",
            Some(7.0),
        ),
        row(
            "GLOBAL",
            Geography::Global,
            Facet::OnetTaskCost,
            "cost_count",
            "write code",
            Some(1.5),
        ),
        row(
            "GLOBAL",
            Geography::Global,
            Facet::RequestCollaboration,
            "request_collaboration_count",
            "debugging::learning",
            Some(3.0),
        ),
    ];

    let grouped = grouper::group_rows(&rows);
    let record = grouped.global.unwrap();
    assert!(record.metrics.is_empty());
    assert!(record.tasks.is_empty());
    assert!(record.requests.is_empty());
    assert!(record.collaboration.is_empty());
}

#[test]
fn summary_facets_write_metrics_with_last_write_winning() {
    let rows = vec![
        row(
            "US",
            Geography::Country,
            Facet::Country,
            "usage_count",
            "",
            Some(100.0),
        ),
        row(
            "US",
            Geography::Country,
            Facet::Country,
            "usage_count",
            "",
            Some(250.0),
        ),
        row(
            "US",
            Geography::Country,
            Facet::Country,
            "usage_pct",
            "",
            None,
        ),
    ];

    let grouped = grouper::group_rows(&rows);
    let record = &grouped.countries[0];
    assert_eq!(record.metrics.get("usage_count"), Some(&Value::from(250.0)));
    assert_eq!(record.metrics.get("usage_pct"), Some(&Value::Null));
}

#[test]
fn records_are_created_lazily_in_first_seen_order() {
    let rows = vec![
        row("BR", Geography::Country, Facet::Country, "usage_pct", "", Some(0.1)),
        row("US", Geography::Country, Facet::Country, "usage_pct", "", Some(0.4)),
        row("BR", Geography::Country, Facet::Country, "usage_count", "", Some(50.0)),
    ];

    let grouped = grouper::group_rows(&rows);
    assert_eq!(grouped.countries.len(), 2);
    assert_eq!(grouped.countries[0].geo_id, "BR");
    assert_eq!(grouped.countries[1].geo_id, "US");
    assert_eq!(grouped.countries[0].metrics.len(), 2);
}

#[test]
fn platform_record_routes_entry_facets_only() {
    let rows = vec![
        row(
            "GLOBAL",
            Geography::Global,
            Facet::Country,
            "usage_count",
            "",
            Some(9000.0),
        ),
        row(
            "GLOBAL",
            Geography::Global,
            Facet::OnetTask,
            "onet_task_count",
            "write code",
            Some(500.0),
        ),
        row(
            "GLOBAL",
            Geography::Global,
            Facet::Collaboration,
            "collaboration_count",
            "directive",
            Some(120.0),
        ),
    ];

    let record = grouper::build_platform_record(&rows, "GLOBAL", "1P API");
    assert_eq!(record.platform.as_deref(), Some("1P API"));
    assert!(!record.metrics.contains_key("usage_count"));
    assert_eq!(record.tasks.len(), 1);
    assert_eq!(record.collaboration.len(), 1);
}

#[test]
fn three_geography_scenario_assigns_expected_ranks_and_tiers() {
    let mut records = vec![
        country_record("B", Some(0.3)),
        country_record("C", Some(0.2)),
        country_record("A", Some(0.5)),
    ];

    ranker::compute_tiers_and_ranks(&mut records);

    assert_eq!(records[0].geo_id, "A");
    assert_eq!(records[0].metric(USAGE_RANK), 1.0);
    assert_eq!(records[0].metric(USAGE_TIER), 3.0);

    assert_eq!(records[1].geo_id, "B");
    assert_eq!(records[1].metric(USAGE_RANK), 2.0);
    assert_eq!(records[1].metric(USAGE_TIER), 2.0);

    assert_eq!(records[2].geo_id, "C");
    assert_eq!(records[2].metric(USAGE_RANK), 3.0);
    assert_eq!(records[2].metric(USAGE_TIER), 0.0);

    // Uniform equal-share baseline: 100 / 3 per geography.
    let baseline = 100.0 / 3.0;
    assert!((records[0].metric(USAGE_PER_CAPITA_INDEX) - 0.5 / baseline).abs() < 1e-12);
    assert!((records[2].metric(USAGE_PER_CAPITA_INDEX) - 0.2 / baseline).abs() < 1e-12);
}

#[test]
fn ranks_are_a_permutation_and_tiers_never_increase() {
    let pcts = [4.0, 12.5, 0.2, 7.1, 0.0, 3.3, 9.9, 1.4, 2.8, 6.6];
    let mut records: Vec<GeographyRecord> = pcts
        .iter()
        .enumerate()
        .map(|(i, &pct)| country_record(&format!("G{i}"), Some(pct)))
        .collect();

    ranker::compute_tiers_and_ranks(&mut records);

    let mut ranks: Vec<u64> = records
        .iter()
        .map(|record| record.metric(USAGE_RANK) as u64)
        .collect();
    ranks.sort_unstable();
    assert_eq!(ranks, (1..=10).collect::<Vec<u64>>());

    let mut previous_tier = u64::MAX;
    for record in &records {
        let tier = record.metric(USAGE_TIER) as u64;
        assert!(tier <= previous_tier);
        previous_tier = tier;
    }
}

#[test]
fn tied_usage_keeps_table_order() {
    let mut records = vec![
        country_record("FIRST", Some(1.0)),
        country_record("SECOND", Some(1.0)),
        country_record("THIRD", Some(1.0)),
    ];

    ranker::compute_tiers_and_ranks(&mut records);

    assert_eq!(records[0].geo_id, "FIRST");
    assert_eq!(records[1].geo_id, "SECOND");
    assert_eq!(records[2].geo_id, "THIRD");
}

#[test]
fn empty_collection_is_a_noop() {
    let mut records: Vec<GeographyRecord> = Vec::new();
    ranker::compute_tiers_and_ranks(&mut records);
    assert!(records.is_empty());
}

#[test]
fn missing_usage_pct_ranks_last_with_numeric_default() {
    let mut records = vec![
        country_record("NONE", None),
        country_record("SOME", Some(2.0)),
    ];

    ranker::compute_tiers_and_ranks(&mut records);

    assert_eq!(records[0].geo_id, "SOME");
    assert_eq!(records[1].geo_id, "NONE");
    assert_eq!(records[1].metric(USAGE_RANK), 2.0);
    assert_eq!(records[1].metrics.get(USAGE_PCT), Some(&Value::from(0)));
}

#[test]
fn consumer_defaults_backfill_unranked_records() {
    let mut record = GeographyRecord::new("GLOBAL", Geography::Global);
    record
        .metrics
        .insert(USAGE_PCT.to_string(), Value::from(100.0));

    ranker::ensure_consumer_defaults(&mut record.metrics);

    assert_eq!(record.metric(USAGE_PCT), 100.0);
    assert_eq!(record.metrics.get(USAGE_RANK), Some(&Value::from(0)));
    assert_eq!(record.metrics.get(USAGE_TIER), Some(&Value::from(0)));
    assert_eq!(
        record.metrics.get(USAGE_PER_CAPITA_INDEX),
        Some(&Value::from(0))
    );
}

#[test]
fn occupation_aggregation_round_trips_a_mapped_task() {
    let tasks = vec![task_entry("Gather Information", Some(500.0), Some(0.021))];
    let mapping = taxonomy(vec![("gather information", "15", "Computer Occupations")]);

    let aggregates = occupations::aggregate_occupations(&tasks, &mapping);

    assert_eq!(aggregates.len(), 1);
    let aggregate = &aggregates[0];
    assert_eq!(aggregate.soc_code, "15");
    assert_eq!(aggregate.tasks.len(), 1);
    assert_eq!(aggregate.tasks[0].task, "Gather Information");
    assert!(aggregate.total_usage_count >= 500.0);
    assert!(aggregate.total_usage_pct >= 0.021);
}

#[test]
fn unmatched_tasks_contribute_to_no_aggregate() {
    let tasks = vec![
        task_entry("completely unknown task", Some(900.0), Some(0.5)),
        task_entry("write code", Some(100.0), Some(0.1)),
    ];
    let mapping = taxonomy(vec![("write code", "15", "Computer Occupations")]);

    let aggregates = occupations::aggregate_occupations(&tasks, &mapping);

    assert_eq!(aggregates.len(), 1);
    assert!((aggregates[0].total_usage_pct - 0.1).abs() < 1e-12);
    assert!(
        aggregates[0]
            .tasks
            .iter()
            .all(|task| task.task != "completely unknown task")
    );
}

#[test]
fn normalization_joins_casing_and_whitespace_variants() {
    let tasks = vec![
        task_entry("  WRITE CODE  ", Some(100.0), Some(0.1)),
        task_entry("write code", Some(50.0), Some(0.05)),
    ];
    let mapping = taxonomy(vec![("write code", "15", "Computer Occupations")]);

    let aggregates = occupations::aggregate_occupations(&tasks, &mapping);

    assert_eq!(aggregates.len(), 1);
    assert_eq!(aggregates[0].tasks.len(), 2);
    assert!((aggregates[0].total_usage_count - 150.0).abs() < 1e-12);
}

#[test]
fn aggregates_sort_descending_by_total_usage_pct() {
    let tasks = vec![
        task_entry("file reports", Some(10.0), Some(0.02)),
        task_entry("write code", Some(100.0), Some(0.4)),
        task_entry("review code", Some(40.0), Some(0.1)),
    ];
    let mapping = taxonomy(vec![
        ("file reports", "43", "Office Support"),
        ("write code", "15", "Computer Occupations"),
        ("review code", "15", "Computer Occupations"),
    ]);

    let aggregates = occupations::aggregate_occupations(&tasks, &mapping);

    assert_eq!(aggregates.len(), 2);
    assert_eq!(aggregates[0].soc_code, "15");
    assert!((aggregates[0].total_usage_pct - 0.5).abs() < 1e-12);
    assert_eq!(aggregates[1].soc_code, "43");
}

#[test]
fn missing_task_metrics_count_as_zero() {
    let tasks = vec![task_entry("write code", None, None)];
    let mapping = taxonomy(vec![("write code", "15", "Computer Occupations")]);

    let aggregates = occupations::aggregate_occupations(&tasks, &mapping);

    assert_eq!(aggregates.len(), 1);
    assert_eq!(aggregates[0].total_usage_count, 0.0);
    assert_eq!(aggregates[0].total_usage_pct, 0.0);
}

#[test]
fn missing_mapping_file_is_an_error_for_the_caller_to_degrade() {
    assert!(occupations::load_mapping(Path::new("/nonexistent/mapping.json")).is_err());
}
