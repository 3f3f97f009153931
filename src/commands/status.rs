use std::fs;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::RunMetadata;

const ARTIFACTS: [&str; 6] = [
    "countries.json",
    "states.json",
    "global.json",
    "api.json",
    "occupations.json",
    "task-occupation-mapping.json",
];

pub fn run(args: StatusArgs) -> Result<()> {
    let metadata_path = args.out_dir.join("metadata.json");

    info!(out_dir = %args.out_dir.display(), "status requested");

    if metadata_path.exists() {
        let raw = fs::read(&metadata_path)
            .with_context(|| format!("failed to read {}", metadata_path.display()))?;
        let metadata: RunMetadata = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", metadata_path.display()))?;

        info!(
            generated = %metadata.generated,
            date_start = %metadata.date_range.start,
            date_end = %metadata.date_range.end,
            countries = metadata.counts.countries,
            states = metadata.counts.states,
            parse_warnings = metadata.parse_warnings,
            "loaded run metadata"
        );
    } else {
        warn!(path = %metadata_path.display(), "run metadata missing");
    }

    for artifact in ARTIFACTS {
        let path = args.out_dir.join(artifact);
        if path.exists() {
            info!(path = %path.display(), "artifact present");
        } else {
            warn!(path = %path.display(), "artifact missing");
        }
    }

    Ok(())
}
