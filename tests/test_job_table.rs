use std::fs;
use std::path::Path;

use geoglows_suite::domain::forecast::job_table::{JOB_TABLE_FILE, JobTable, PrepareOptions};
use geoglows_suite::domain::forecast::qinit::{ForecastChronometry, QinitSource, resolve_qinit};
use geoglows_suite::error::Error;

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"").unwrap();
}

#[test]
fn test_prepare_write_and_look_up_job() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = dir.path();
    let runoff_dir = workspace.join("2024010112");
    for member in [1, 51, 52] {
        touch(&runoff_dir.join(format!("{}.runoff.nc", member)));
    }
    touch(&workspace.join("input/102/rapid_connect.csv"));
    touch(&workspace.join("input/102/Qinit_2023123112.nc"));
    touch(&workspace.join("input/103/seasonal_qinit_01.nc"));

    let mut options = PrepareOptions::for_workspace(workspace);
    options.runoff_dir = runoff_dir.clone();

    let table = JobTable::prepare(&options).unwrap();
    assert_eq!(table.len(), 6);
    assert!(workspace.join("output").is_dir());

    let path = table.write(workspace).unwrap();
    assert_eq!(path, workspace.join(JOB_TABLE_FILE));

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["date"], "2024010112");
    assert_eq!(raw["job_102_52"]["vpu"], "102");
    assert_eq!(raw["job_102_52"]["ensemble"], 52);

    let loaded = JobTable::load(&path).unwrap();
    assert_eq!(loaded, table);

    let ids: Vec<String> = loaded.jobs().map(|job| job.job_id.to_string()).collect();
    assert_eq!(ids, vec!["job_102_52", "job_102_51", "job_102_1", "job_103_52", "job_103_51", "job_103_1"]);

    let high_res = loaded.job("job_102_52").unwrap();
    assert_eq!(high_res.output_file, workspace.join("output/Qout_102_52.nc"));
    assert_eq!(ForecastChronometry::for_member(high_res.ensemble, 52).time_steps(), 240);

    let qinit = resolve_qinit(&high_res.input_dir, &loaded.date, high_res.initialize_flows).unwrap();
    assert_eq!(qinit, QinitSource::Previous(workspace.join("input/102/Qinit_2023123112.nc")));

    let perturbed = loaded.job("job_103_1").unwrap();
    assert_eq!(ForecastChronometry::for_member(perturbed.ensemble, 52).time_steps(), 120);
    let qinit = resolve_qinit(&perturbed.input_dir, &loaded.date, perturbed.initialize_flows).unwrap();
    assert_eq!(qinit, QinitSource::SeasonalAverage(workspace.join("input/103/seasonal_qinit_01.nc")));

    assert!(matches!(loaded.job("job_104_52"), Err(Error::JobNotFoundError(_))));
}

#[test]
fn test_disabled_initialization_skips_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = dir.path();
    let runoff_dir = workspace.join("2024010100");
    touch(&runoff_dir.join("52.runoff.nc"));
    fs::create_dir_all(workspace.join("input/718")).unwrap();

    let mut options = PrepareOptions::for_workspace(workspace);
    options.runoff_dir = runoff_dir;
    options.initialize_flows = false;

    let table = JobTable::prepare(&options).unwrap();
    let job = table.job("job_718_52").unwrap();
    assert!(!job.initialize_flows);

    let qinit = resolve_qinit(&job.input_dir, "not-a-date", job.initialize_flows).unwrap();
    assert_eq!(qinit, QinitSource::Disabled);
    assert!(!qinit.is_warm_start());
}

#[test]
fn test_load_missing_table_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = JobTable::load(&dir.path().join(JOB_TABLE_FILE));
    assert!(matches!(result, Err(Error::IoError { .. })));
}
