use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// On-disk layout of `rapid_run.json`: four header keys followed by one object per job.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobTableDto {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub runoff_dir: PathBuf,
    pub date: String,
    #[serde(flatten)]
    pub jobs: IndexMap<String, JobEntryDto>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JobEntryDto {
    pub runoff: PathBuf,
    pub vpu: String,
    pub ensemble: u32,
    pub input_dir: PathBuf,
    pub output_file: PathBuf,
    pub init_flows: bool,
}
