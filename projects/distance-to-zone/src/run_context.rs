use crate::pipeline::types::EngineConfig;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RunMetadata {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub plays_root: PathBuf,
    pub config: EngineConfig,
    #[serde(skip)]
    pub output_dir: PathBuf,
}

/// Discover saved play files (`*.json`) under a root directory.
pub fn list_play_files(plays_root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(plays_root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|s| s.to_lowercase() == "json")
                .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

/// Create a timestamped run directory under `output_root` and persist the run
/// metadata (including the config the batch was analyzed with).
pub fn create_run(
    output_root: &Path,
    plays_root: &Path,
    config: &EngineConfig,
) -> Result<RunMetadata> {
    let created_at = Utc::now();
    let run_id = format!("run_{}", created_at.format("%Y%m%d_%H%M%S"));

    let output_dir = output_root.join(&run_id);
    if output_dir.exists() {
        return Err(anyhow::anyhow!(
            "Output directory already exists for: {}",
            run_id
        ));
    }
    fs::create_dir_all(&output_dir)?;

    let metadata = RunMetadata {
        run_id,
        created_at,
        plays_root: plays_root.to_path_buf(),
        config: config.clone(),
        output_dir: output_dir.clone(),
    };

    let metadata_path = output_dir.join("metadata.json");
    let content = serde_json::to_string_pretty(&metadata)?;
    fs::write(metadata_path, content)?;

    Ok(metadata)
}

/// List prior runs under `output_root`, newest last.
pub fn list_runs(output_root: &Path) -> Result<Vec<RunMetadata>> {
    let mut runs = Vec::new();

    if !output_root.exists() {
        return Ok(runs);
    }

    for entry in fs::read_dir(output_root)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            let metadata_path = path.join("metadata.json");
            if metadata_path.exists() {
                let content = fs::read_to_string(metadata_path)?;
                let mut metadata: RunMetadata = serde_json::from_str(&content)?;
                metadata.output_dir = path.clone();
                runs.push(metadata);
            }
        }
    }

    runs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(runs)
}
