use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use tracing::info;

use crate::cli::TaxonomyArgs;
use crate::model::{OccupationSummary, TaxonomyEntry};
use crate::util::{ensure_directory, write_json_pretty};

/// One row of the O*NET "Task Statements" table that carries the columns the
/// mapping needs. Rows missing any of the three are skipped.
struct TaskStatement {
    task: String,
    soc_code: String,
    title: String,
}

pub fn run(args: TaxonomyArgs) -> Result<()> {
    ensure_directory(&args.out_dir)?;

    let source_path = args.source_path();
    info!(path = %source_path.display(), "loading task statements table");

    let file = File::open(&source_path)
        .with_context(|| format!("failed to open task statements table: {}", source_path.display()))?;
    let statements = read_statements(file, delimiter_for(&source_path), &source_path)?;
    info!(statements = statements.len(), "loaded task statements");

    let mapping = build_mapping(&statements);
    let mapping_path = args.out_dir.join("task-occupation-mapping.json");
    write_json_pretty(&mapping_path, &mapping)?;
    info!(path = %mapping_path.display(), tasks = mapping.len(), "wrote task-occupation mapping");

    let occupations = summarize_occupations(&statements);
    let occupations_path = args.out_dir.join("onet-occupations.json");
    write_json_pretty(&occupations_path, &occupations)?;
    info!(path = %occupations_path.display(), occupations = occupations.len(), "wrote occupations summary");

    Ok(())
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("tsv") | Some("txt") => b'\t',
        _ => b',',
    }
}

fn read_statements<R: std::io::Read>(
    reader: R,
    delimiter: u8,
    source_path: &Path,
) -> Result<Vec<TaskStatement>> {
    let mut csv = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = csv
        .headers()
        .with_context(|| format!("failed to read header row: {}", source_path.display()))?
        .clone();
    let position = |name: &str| headers.iter().position(|header| header.trim() == name);

    let task_column = position("Task");
    let soc_column = position("O*NET-SOC Code");
    let title_column = position("Title");

    let mut statements = Vec::new();
    for result in csv.records() {
        let record =
            result.with_context(|| format!("failed to read record: {}", source_path.display()))?;
        let cell = |column: Option<usize>| {
            column
                .and_then(|column| record.get(column))
                .unwrap_or("")
                .trim()
                .to_string()
        };

        statements.push(TaskStatement {
            task: cell(task_column),
            soc_code: cell(soc_column),
            title: cell(title_column),
        });
    }

    Ok(statements)
}

/// Builds the normalized-task → occupation mapping. Later statements with
/// the same normalized task text overwrite earlier ones in place, so the
/// output keeps first-seen order with last-seen values.
fn build_mapping(statements: &[TaskStatement]) -> Vec<TaxonomyEntry> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut entries: Vec<TaxonomyEntry> = Vec::new();

    for statement in statements {
        if statement.task.is_empty() || statement.soc_code.is_empty() || statement.title.is_empty()
        {
            continue;
        }

        let normalized = statement.task.trim().to_lowercase();
        let entry = TaxonomyEntry {
            task: normalized.clone(),
            soc_code: statement.soc_code.clone(),
            occupation_title: statement.title.clone(),
            soc_major_group: soc_major_group(&statement.soc_code),
        };

        match index.get(&normalized) {
            Some(&slot) => entries[slot] = entry,
            None => {
                entries.push(entry);
                index.insert(normalized, entries.len() - 1);
            }
        }
    }

    entries
}

fn summarize_occupations(statements: &[TaskStatement]) -> Vec<OccupationSummary> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut occupations: Vec<OccupationSummary> = Vec::new();

    for statement in statements {
        if statement.soc_code.is_empty() || statement.title.is_empty() {
            continue;
        }

        let slot = match index.get(&statement.soc_code) {
            Some(&slot) => slot,
            None => {
                occupations.push(OccupationSummary {
                    soc_code: statement.soc_code.clone(),
                    occupation_title: statement.title.clone(),
                    soc_major_group: soc_major_group(&statement.soc_code),
                    task_count: 0,
                });
                let slot = occupations.len() - 1;
                index.insert(statement.soc_code.clone(), slot);
                slot
            }
        };
        occupations[slot].task_count += 1;
    }

    occupations
}

/// SOC major group is the leading two characters of the SOC code.
fn soc_major_group(soc_code: &str) -> String {
    soc_code.chars().take(2).collect()
}
