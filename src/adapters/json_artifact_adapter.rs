//! JSON artifact writer for model runs.

use crate::domain::error::SharpefolioError;
use crate::ports::artifact_port::ArtifactPort;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Writes `weights_<id>.json` and `allocation_<id>.json` into one directory.
pub struct JsonArtifactAdapter {
    dir: PathBuf,
}

impl JsonArtifactAdapter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn weights_path(&self, model_id: i64) -> PathBuf {
        self.dir.join(format!("weights_{model_id}.json"))
    }

    pub fn allocation_path(&self, model_id: i64) -> PathBuf {
        self.dir.join(format!("allocation_{model_id}.json"))
    }

    fn write_json<T: Serialize>(&self, path: PathBuf, value: &T) -> Result<String, SharpefolioError> {
        fs::create_dir_all(&self.dir)?;
        let mut file = fs::File::create(&path)?;
        serde_json::to_writer_pretty(&mut file, value)?;
        file.write_all(b"\n")?;
        Ok(path.display().to_string())
    }
}

impl ArtifactPort for JsonArtifactAdapter {
    fn write_weights(
        &self,
        model_id: i64,
        weights: &BTreeMap<String, f64>,
    ) -> Result<String, SharpefolioError> {
        self.write_json(self.weights_path(model_id), weights)
    }

    fn write_allocation(
        &self,
        model_id: i64,
        allocation: &BTreeMap<String, i64>,
    ) -> Result<String, SharpefolioError> {
        self.write_json(self.allocation_path(model_id), allocation)
    }
}
