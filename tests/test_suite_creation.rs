use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;

use geoglows_suite::{
    create_definition, discover_basins,
    domain::forecast::config::RunMode,
    error::{Error, Result},
    generate_suite, load_config,
};

/// Creates a workspace with one input directory per basin and returns the config JSON for it.
fn mock_deployment(basins: &[&str], local_run: bool) -> (TempDir, Value) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    for basin in basins {
        fs::create_dir_all(root.join("workspace/input").join(basin)).unwrap();
    }

    let config = json!({
        "python_exec": "/opt/conda/bin/python",
        "ecflow_home": root.join("ecflow"),
        "ecflow_bin": "/opt/ecflow/bin",
        "workspace": root.join("workspace"),
        "local_run": local_run,
        "suite": { "name": "geoglows_forecast", "logs": root.join("logs") },
        "scripts_dir": "/opt/geoglows/resources",
        "rapid_exec": "/opt/rapid/rapid",
        "rapid_exec_dir": "/data/exec",
        "rapid_subprocess_dir": "/data/subprocess",
        "forecast_records_dir": "/data/records",
        "nces_exec": "/usr/bin/nces",
        "aws_config": "/etc/aws.json"
    });
    (dir, config)
}

fn write_config(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_create_definition_writes_def_file() {
    let (dir, config) = mock_deployment(&["102", "103"], true);
    let config_path = write_config(dir.path(), "config.json", &config.to_string());

    let forecast_config = load_config(&config_path).unwrap();
    assert_eq!(forecast_config.mode, RunMode::Local);

    let text = create_definition(&forecast_config, None, false).unwrap();
    let def_path = dir.path().join("ecflow/geoglows_forecast.def");
    assert_eq!(fs::read_to_string(&def_path).unwrap(), text);

    assert!(text.starts_with("suite geoglows_forecast\n"));
    assert!(text.contains("  family ensemble_family\n    trigger /geoglows_forecast/prep_task == complete\n"));
    assert!(text.contains("    task ens_102_52\n      edit JOB_ID 'job_102_52'\n"));
    assert!(text.contains("    task ens_103_51\n      trigger ens_103_52 == complete\n"));
    assert!(text.trim_end().ends_with("endsuite"));
}

#[test]
fn test_local_chain_links_basins() {
    let (dir, config) = mock_deployment(&["102", "103"], true);
    let config_path = write_config(dir.path(), "config.json", &config.to_string());

    let text = create_definition(&load_config(&config_path).unwrap(), None, true).unwrap();
    assert!(text.contains("    task ens_103_52\n      trigger ens_102_1 == complete\n"));
}

#[test]
fn test_dry_run_writes_nothing() {
    let (dir, config) = mock_deployment(&["102"], false);
    let config_path = write_config(dir.path(), "config.json", &config.to_string());

    let text = create_definition(&load_config(&config_path).unwrap(), None, true).unwrap();

    assert!(text.contains("task ens_102_52"));
    assert!(!dir.path().join("ecflow/geoglows_forecast.def").exists());
}

#[test]
fn test_explicit_output_path() {
    let (dir, config) = mock_deployment(&["102"], false);
    let config_path = write_config(dir.path(), "config.json", &config.to_string());
    let output = dir.path().join("out/custom.def");

    create_definition(&load_config(&config_path).unwrap(), Some(&output), false).unwrap();
    assert!(output.is_file());
}

#[test]
fn test_yaml_config_is_accepted() {
    let (dir, config) = mock_deployment(&["102"], false);
    let yaml = serde_yaml::to_string(&config).unwrap();
    let config_path = write_config(dir.path(), "config.yml", &yaml);

    let suite = generate_suite(&load_config(&config_path).unwrap()).unwrap();
    assert!(suite.stage("ensemble_family").is_some());
}

#[test]
fn test_basins_are_discovered_sorted() {
    let (dir, config) = mock_deployment(&["718", "102", "305"], false);
    let config_path = write_config(dir.path(), "config.json", &config.to_string());

    let basins = discover_basins(&load_config(&config_path).unwrap()).unwrap();
    let ids: Vec<&str> = basins.iter().map(|basin| basin.as_str()).collect();
    assert_eq!(ids, vec!["102", "305", "718"]);
}

#[test]
fn test_explicit_basins_override_discovery() {
    let (dir, mut config) = mock_deployment(&["102"], false);
    config["basins"] = json!(["999"]);
    let config_path = write_config(dir.path(), "config.json", &config.to_string());

    let text = create_definition(&load_config(&config_path).unwrap(), None, true).unwrap();
    assert!(text.contains("task ens_999_52"));
    assert!(!text.contains("ens_102_52"));
}

#[test]
fn test_empty_input_dir_builds_empty_families() {
    let (dir, config) = mock_deployment(&[], false);
    fs::create_dir_all(dir.path().join("workspace/input")).unwrap();
    let config_path = write_config(dir.path(), "config.json", &config.to_string());

    let text = create_definition(&load_config(&config_path).unwrap(), None, true).unwrap();
    assert!(text.contains("  family ensemble_family\n"));
    assert!(!text.contains("task ens_"));
}

#[test]
fn test_missing_input_dir_is_io_error() {
    let (dir, config) = mock_deployment(&[], false);
    let config_path = write_config(dir.path(), "config.json", &config.to_string());

    let result: Result<String> = create_definition(&load_config(&config_path).unwrap(), None, true);
    assert!(matches!(result, Err(Error::IoError { .. })));
}

#[test]
fn test_load_config_errors() {
    let dir = tempfile::tempdir().unwrap();

    let missing = load_config(&dir.path().join("missing.json"));
    assert!(matches!(missing, Err(Error::IoError { .. })));

    let malformed = write_config(dir.path(), "broken.json", "{ not json");
    assert!(matches!(load_config(&malformed), Err(Error::DeserializationError(_))));

    let unsupported = write_config(dir.path(), "config.toml", "");
    assert!(matches!(load_config(&unsupported), Err(Error::ConfigError { .. })));

    let (_deployment, mut config) = mock_deployment(&["102"], false);
    config["nces_exec"] = json!("");
    let empty_value = write_config(dir.path(), "empty.json", &config.to_string());
    match load_config(&empty_value) {
        Err(Error::ConfigError { key, .. }) => assert_eq!(key, "nces_exec"),
        other => panic!("Expected ConfigError, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_quote_in_configured_path_fails_validation() {
    let (dir, mut config) = mock_deployment(&["102"], false);
    config["basins"] = json!(["102"]);
    config["forecast_records_dir"] = json!("/data/o'brien");
    let config_path = write_config(dir.path(), "config.json", &config.to_string());

    let result = create_definition(&load_config(&config_path).unwrap(), None, false);
    match result {
        Err(Error::ValidationError(issues)) => {
            assert_eq!(issues.len(), 1);
            assert_eq!(issues[0].node_path, "/geoglows_forecast/day_one_family/day_one_102");
        }
        other => panic!("Expected ValidationError, got {:?}", other),
    }
    assert!(!dir.path().join("ecflow/geoglows_forecast.def").exists());
}
