use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Parses a JSON file into a given type `T`.
///
/// Errors are converted into `crate::error::Error` variants:
/// - `Error::IoError` if the file cannot be read.
/// - `Error::DeserializationError` if the JSON is malformed.
pub fn parse_json_file<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let data = fs::read_to_string(file_path).map_err(|e| Error::io(file_path, e))?;

    let parsed_data: T = serde_json::from_str(&data)?;

    Ok(parsed_data)
}

/// Parses a YAML file into a given type `T`.
pub fn parse_yaml_file<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let data = fs::read_to_string(file_path).map_err(|e| Error::io(file_path, e))?;

    let parsed_data: T = serde_yaml::from_str(&data)?;

    Ok(parsed_data)
}

/// Parses a configuration file, picking the format from its extension.
///
/// `.json` is read as JSON, `.yaml` and `.yml` as YAML. Anything else is rejected
/// with `Error::ConfigError` before the file is opened.
pub fn parse_config_file<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let extension = file_path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => parse_json_file(file_path),
        Some("yaml") | Some("yml") => parse_yaml_file(file_path),
        _ => Err(Error::config(
            file_path.display().to_string(),
            "unsupported configuration format, expected a .json, .yaml or .yml file",
        )),
    }
}

/// Lists the names of all direct subdirectories of `dir`, sorted lexicographically.
///
/// Plain files are skipped. Names that are not valid UTF-8 are skipped with a warning.
pub fn list_subdirectories(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| Error::io(entry.path(), e))?;
        if !file_type.is_dir() {
            log::debug!("'{}' is not a directory. Skipping.", entry.path().display());
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => log::warn!("Skipping directory with non UTF-8 name {:?}.", raw),
        }
    }

    names.sort();
    Ok(names)
}
