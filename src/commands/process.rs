mod grouper;
mod occupations;
mod parser;
mod ranker;
#[cfg(test)]
mod tests;

use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::ProcessArgs;
use crate::model::{
    DateRange, Geography, GeographyCounts, GeographyRecord, RunMetadata,
};
use crate::util::{ensure_directory, now_utc_string, write_json_pretty};

use self::parser::ParsedSource;

const GLOBAL_GEO_ID: &str = "GLOBAL";
const API_PLATFORM: &str = "1P API";

pub fn run(args: ProcessArgs) -> Result<()> {
    ensure_directory(&args.out_dir)?;

    let claude_path = args.claude_path();
    let api_path = args.api_path();

    // Both sources must parse before anything is written; a missing source
    // file aborts the run with no partially regenerated artifacts.
    let claude = load_source(&claude_path)?;
    let api = load_source(&api_path)?;

    let mut grouped = grouper::group_rows(&claude.rows);
    info!(
        countries = grouped.countries.len(),
        states = grouped.states.len(),
        "grouped geography records"
    );

    ranker::compute_tiers_and_ranks(&mut grouped.countries);
    ranker::compute_tiers_and_ranks(&mut grouped.states);
    info!(
        ranked = grouped.countries.len() + grouped.states.len(),
        "calculated usage tiers and ranks"
    );

    let mut global = grouped.global.unwrap_or_else(|| {
        warn!(path = %claude_path.display(), "source contains no global geography rows");
        GeographyRecord::new(GLOBAL_GEO_ID, Geography::Global)
    });
    ranker::ensure_consumer_defaults(&mut global.metrics);

    let mut api_record = grouper::build_platform_record(&api.rows, GLOBAL_GEO_ID, API_PLATFORM);
    ranker::ensure_consumer_defaults(&mut api_record.metrics);

    let mapping_path = args.mapping_path();
    let mapping = match occupations::load_mapping(&mapping_path) {
        Ok(mapping) => mapping,
        Err(err) => {
            warn!(
                path = %mapping_path.display(),
                error = %err,
                "taxonomy mapping unavailable; occupation aggregates will be empty"
            );
            occupations::TaxonomyMapping::new()
        }
    };
    let occupation_aggregates = occupations::aggregate_occupations(&global.tasks, &mapping);
    info!(
        occupations = occupation_aggregates.len(),
        tasks = global.tasks.len(),
        "aggregated task usage by occupation"
    );

    let countries_path = args.out_dir.join("countries.json");
    write_json_pretty(&countries_path, &grouped.countries)?;
    info!(path = %countries_path.display(), count = grouped.countries.len(), "wrote countries document");

    let states_path = args.out_dir.join("states.json");
    write_json_pretty(&states_path, &grouped.states)?;
    info!(path = %states_path.display(), count = grouped.states.len(), "wrote states document");

    let global_path = args.out_dir.join("global.json");
    write_json_pretty(&global_path, &global)?;
    info!(path = %global_path.display(), "wrote global document");

    let api_doc_path = args.out_dir.join("api.json");
    write_json_pretty(&api_doc_path, &api_record)?;
    info!(path = %api_doc_path.display(), "wrote api platform document");

    let occupations_path = args.out_dir.join("occupations.json");
    write_json_pretty(&occupations_path, &occupation_aggregates)?;
    info!(path = %occupations_path.display(), count = occupation_aggregates.len(), "wrote occupations document");

    let metadata = RunMetadata {
        generated: now_utc_string(),
        date_range: DateRange {
            start: args.date_start.clone(),
            end: args.date_end.clone(),
        },
        counts: GeographyCounts {
            countries: grouped.countries.len(),
            states: grouped.states.len(),
        },
        parse_warnings: claude.warnings.len() + api.warnings.len(),
    };
    let metadata_path = args.out_dir.join("metadata.json");
    write_json_pretty(&metadata_path, &metadata)?;
    info!(path = %metadata_path.display(), "wrote run metadata");

    info!("processing complete");
    Ok(())
}

fn load_source(path: &Path) -> Result<ParsedSource> {
    let parsed = parser::parse_file(path)?;

    for warning in &parsed.warnings {
        warn!(warning = %warning, "row parse warning");
    }
    info!(
        path = %path.display(),
        rows = parsed.rows.len(),
        warnings = parsed.warnings.len(),
        "loaded source export"
    );

    Ok(parsed)
}
