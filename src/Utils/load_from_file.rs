//! Loading of JSON configuration and network files.
//!
//! A file holds either a bare JSON document or a text document in which the JSON follows
//! a header line (`MICROPHYSICS`/`CONFIG` for configurations, `NETWORK` for networks) and
//! runs up to the next all-caps header or the end of the file. Parse errors are logged
//! with the line of the file and a pointer to the offending column.
use crate::Network::network_table::{NetworkSpec, NetworkTable};
use crate::microphysics::{ConfigError, MicrophysicsConfig};
use log::{error, info};
use serde::de::DeserializeOwned;
use std::path::Path;

const CONFIG_HEADERS: [&str; 2] = ["MICROPHYSICS", "CONFIG"];
const NETWORK_HEADERS: [&str; 1] = ["NETWORK"];

pub struct LoadData {
    pub file_name: String,
}

impl LoadData {
    pub fn new(file_name: String) -> Self {
        LoadData { file_name }
    }
    pub fn load_config(&self) -> Result<MicrophysicsConfig, ConfigError> {
        load_config(&self.file_name)
    }
    pub fn load_network(&self) -> Result<NetworkTable, ConfigError> {
        load_network(&self.file_name)
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(content.lines().map(str::to_string).collect())
}

fn is_header(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_uppercase() || c == '_')
}

/// Index of the first line of the JSON section and the section itself.
fn extract_section(lines: &[String], headers: &[&str]) -> (usize, String) {
    let start = lines
        .iter()
        .position(|line| headers.contains(&line.trim().to_uppercase().as_str()))
        .map(|i| i + 1);
    let Some(start) = start else {
        return (0, lines.join("\n"));
    };
    let end = lines[start..]
        .iter()
        .position(|line| is_header(line))
        .map_or(lines.len(), |i| start + i);
    (start, lines[start..end].join("\n"))
}

fn parse_section<T: DeserializeOwned>(
    path: &Path,
    headers: &[&str],
    what: &str,
) -> Result<T, ConfigError> {
    let lines = read_lines(path)?;
    let (start, section) = extract_section(&lines, headers);
    match serde_json::from_str(&section) {
        Ok(value) => Ok(value),
        Err(e) => {
            let error_line = e.line();
            let error_column = e.column();
            let actual_line = start + error_line.saturating_sub(1);
            error!(
                "Error parsing {} in '{}' at line {}, column {}: {}",
                what,
                path.display(),
                actual_line + 1,
                error_column,
                e
            );
            if let Some(problem_line) = lines.get(actual_line) {
                error!("Problematic line: {}", problem_line);
                if error_column <= problem_line.len() {
                    error!("{}^", " ".repeat(error_column.saturating_sub(1)));
                }
            }
            Err(ConfigError::Json(e))
        }
    }
}

/// Read a `MicrophysicsConfig`; fields absent from the file keep their defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<MicrophysicsConfig, ConfigError> {
    let path = path.as_ref();
    let config: MicrophysicsConfig = parse_section(path, &CONFIG_HEADERS, "configuration")?;
    info!("configuration loaded from '{}'", path.display());
    Ok(config)
}

/// Read a `NetworkSpec` and build the validated network table from it.
pub fn load_network(path: impl AsRef<Path>) -> Result<NetworkTable, ConfigError> {
    let path = path.as_ref();
    let spec: NetworkSpec = parse_section(path, &NETWORK_HEADERS, "network")?;
    let table = NetworkTable::new(spec)?;
    info!(
        "network '{}' loaded from '{}': {} species, {} reactions",
        table.name(),
        path.display(),
        table.num_species(),
        table.num_reactions()
    );
    Ok(table)
}
