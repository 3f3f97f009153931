use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "aui",
    version,
    about = "Batch pipeline turning AI-usage survey exports into per-geography JSON documents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Process(ProcessArgs),
    Taxonomy(TaxonomyArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    #[arg(long, default_value = "aei_v3_download")]
    pub data_dir: PathBuf,

    #[arg(long, default_value = "public/data")]
    pub out_dir: PathBuf,

    #[arg(long, default_value = "2025-08-04")]
    pub date_start: String,

    #[arg(long, default_value = "2025-08-11")]
    pub date_end: String,

    /// Claude-AI platform export; defaults to
    /// `<data-dir>/aei_raw_claude_ai_<start>_to_<end>.csv`.
    #[arg(long)]
    pub claude_path: Option<PathBuf>,

    /// 1P-API platform export; defaults to
    /// `<data-dir>/aei_raw_1p_api_<start>_to_<end>.csv`.
    #[arg(long)]
    pub api_path: Option<PathBuf>,

    /// Task→occupation mapping produced by `aui taxonomy`; defaults to
    /// `<out-dir>/task-occupation-mapping.json`.
    #[arg(long)]
    pub mapping_path: Option<PathBuf>,
}

impl ProcessArgs {
    pub fn claude_path(&self) -> PathBuf {
        self.claude_path.clone().unwrap_or_else(|| {
            self.data_dir.join(format!(
                "aei_raw_claude_ai_{}_to_{}.csv",
                self.date_start, self.date_end
            ))
        })
    }

    pub fn api_path(&self) -> PathBuf {
        self.api_path.clone().unwrap_or_else(|| {
            self.data_dir.join(format!(
                "aei_raw_1p_api_{}_to_{}.csv",
                self.date_start, self.date_end
            ))
        })
    }

    pub fn mapping_path(&self) -> PathBuf {
        self.mapping_path
            .clone()
            .unwrap_or_else(|| self.out_dir.join("task-occupation-mapping.json"))
    }
}

#[derive(Args, Debug, Clone)]
pub struct TaxonomyArgs {
    #[arg(long, default_value = "aei_v3_download")]
    pub data_dir: PathBuf,

    #[arg(long, default_value = "public/data")]
    pub out_dir: PathBuf,

    /// Delimited export of the O*NET "Task Statements" table; defaults to
    /// `<data-dir>/onet_task_statements.tsv`. Tab-delimited for `.tsv`/`.txt`
    /// extensions, comma-delimited otherwise.
    #[arg(long)]
    pub source_path: Option<PathBuf>,
}

impl TaxonomyArgs {
    pub fn source_path(&self) -> PathBuf {
        self.source_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("onet_task_statements.tsv"))
    }
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "public/data")]
    pub out_dir: PathBuf,
}
