use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::api::job_table_dto::{JobEntryDto, JobTableDto};
use crate::domain::utils::fs::write_atomic;
use crate::domain::utils::id::{BasinId, JobId, job_id};
use crate::error::{Error, Result};
use crate::loader::parser::{list_subdirectories, parse_json_file};

/// File name of the job table inside the workspace.
pub const JOB_TABLE_FILE: &str = "rapid_run.json";

const RUNOFF_PATTERN: &str = "*.runoff.*nc";
const LEGACY_RUNOFF_SUFFIX: &str = ".205.runoff.grib.runoff.netcdf";

/// Parameters of one RAPID run, looked up by the worker task via its `JOB_ID`.
#[derive(Debug, Clone, PartialEq)]
pub struct JobEntry {
    pub job_id: JobId,
    pub runoff: PathBuf,
    pub basin: BasinId,
    pub ensemble: u32,
    pub input_dir: PathBuf,
    pub output_file: PathBuf,
    pub initialize_flows: bool,
}

/// Where [`JobTable::prepare`] reads from and writes to.
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    /// Contains one RAPID input directory per basin.
    pub rapid_input: PathBuf,
    /// Receives one `Qout_{basin}_{member}.nc` per job.
    pub rapid_output: PathBuf,
    /// Holds the runoff files of the forecast cycle. Its name is the forecast date.
    pub runoff_dir: PathBuf,
    pub initialize_flows: bool,
}

impl PrepareOptions {
    pub fn for_workspace(workspace: &Path) -> Self {
        PrepareOptions {
            rapid_input: workspace.join("input"),
            rapid_output: workspace.join("output"),
            runoff_dir: workspace.to_path_buf(),
            initialize_flows: true,
        }
    }
}

/// The side-table handed from the preparation stage to every ensemble task.
#[derive(Debug, Clone, PartialEq)]
pub struct JobTable {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub runoff_dir: PathBuf,
    pub date: String,
    jobs: IndexMap<JobId, JobEntry>,
}

impl JobTable {
    /// Builds the table from the basins below `rapid_input` and the runoff files in
    /// `runoff_dir`. Creates the output directory.
    ///
    /// Jobs are ordered by basin, then by ensemble number descending so the high-resolution
    /// member comes first.
    pub fn prepare(options: &PrepareOptions) -> Result<Self> {
        let basins = list_subdirectories(&options.rapid_input)?;
        let runoff_files = list_runoff_files(&options.runoff_dir)?;
        log::info!("Found {} basin(s) and {} runoff file(s).", basins.len(), runoff_files.len());

        fs::create_dir_all(&options.rapid_output).map_err(|e| Error::io(&options.rapid_output, e))?;

        let mut jobs = IndexMap::new();
        for basin in &basins {
            for (ensemble, runoff) in &runoff_files {
                let id = job_id(basin, *ensemble);
                let entry = JobEntry {
                    job_id: id.clone(),
                    runoff: runoff.clone(),
                    basin: BasinId::new(basin.as_str()),
                    ensemble: *ensemble,
                    input_dir: options.rapid_input.join(basin),
                    output_file: options.rapid_output.join(format!("Qout_{}_{}.nc", basin, ensemble)),
                    initialize_flows: options.initialize_flows,
                };
                jobs.insert(id, entry);
            }
        }

        let date = options.runoff_dir.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();

        Ok(JobTable {
            input_dir: options.rapid_input.clone(),
            output_dir: options.rapid_output.clone(),
            runoff_dir: options.runoff_dir.clone(),
            date,
            jobs,
        })
    }

    /// Writes the table to `{workspace}/rapid_run.json` atomically.
    ///
    /// # Returns
    /// The path written.
    pub fn write(&self, workspace: &Path) -> Result<PathBuf> {
        let path = workspace.join(JOB_TABLE_FILE);
        let text = serde_json::to_string_pretty(&self.to_dto())?;
        write_atomic(&path, text.as_bytes())?;
        log::info!("Wrote {} job(s) to '{}'.", self.jobs.len(), path.display());
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let dto: JobTableDto = parse_json_file(path)?;
        Ok(JobTable::from_dto(dto))
    }

    pub fn job(&self, id: &str) -> Result<&JobEntry> {
        self.jobs.get(&JobId::new(id)).ok_or_else(|| Error::JobNotFoundError(id.to_string()))
    }

    pub fn jobs(&self) -> impl Iterator<Item = &JobEntry> {
        self.jobs.values()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn to_dto(&self) -> JobTableDto {
        let jobs = self
            .jobs
            .values()
            .map(|entry| {
                let dto = JobEntryDto {
                    runoff: entry.runoff.clone(),
                    vpu: entry.basin.to_string(),
                    ensemble: entry.ensemble,
                    input_dir: entry.input_dir.clone(),
                    output_file: entry.output_file.clone(),
                    init_flows: entry.initialize_flows,
                };
                (entry.job_id.to_string(), dto)
            })
            .collect();

        JobTableDto {
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            runoff_dir: self.runoff_dir.clone(),
            date: self.date.clone(),
            jobs,
        }
    }

    fn from_dto(dto: JobTableDto) -> Self {
        let jobs = dto
            .jobs
            .into_iter()
            .map(|(key, entry)| {
                let id = JobId::new(key);
                let job = JobEntry {
                    job_id: id.clone(),
                    runoff: entry.runoff,
                    basin: BasinId::new(entry.vpu),
                    ensemble: entry.ensemble,
                    input_dir: entry.input_dir,
                    output_file: entry.output_file,
                    initialize_flows: entry.init_flows,
                };
                (id, job)
            })
            .collect();

        JobTable { input_dir: dto.input_dir, output_dir: dto.output_dir, runoff_dir: dto.runoff_dir, date: dto.date, jobs }
    }
}

/// Reads the ensemble number from a runoff file name.
///
/// The number is the first dot-separated field (`52.runoff.nc`), or the third one for the
/// legacy `*.205.runoff.grib.runoff.netcdf` naming.
pub fn ensemble_number(path: &Path) -> Result<u32> {
    let file_name = path.file_name().and_then(|name| name.to_str()).ok_or_else(|| Error::RunoffFileError(path.to_path_buf()))?;

    let field = if file_name.ends_with(LEGACY_RUNOFF_SUFFIX) { 2 } else { 0 };
    file_name
        .split('.')
        .nth(field)
        .and_then(|value| value.parse::<u32>().ok())
        .ok_or_else(|| Error::RunoffFileError(path.to_path_buf()))
}

/// All runoff files in `dir` with their ensemble numbers, highest number first.
pub fn list_runoff_files(dir: &Path) -> Result<Vec<(u32, PathBuf)>> {
    if !dir.is_dir() {
        return Err(Error::io(dir, std::io::Error::new(std::io::ErrorKind::NotFound, "runoff directory does not exist")));
    }

    let pattern = format!("{}/{}", glob::Pattern::escape(&dir.to_string_lossy()), RUNOFF_PATTERN);
    let mut files = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = entry?;
        files.push((ensemble_number(&path)?, path));
    }

    files.sort_by(|(a, path_a), (b, path_b)| b.cmp(a).then_with(|| path_a.cmp(path_b)));
    Ok(files)
}
