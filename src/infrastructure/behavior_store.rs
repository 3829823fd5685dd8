//! JSON files for raw (`uhg_full.json`) and reduced (`uhg.json`) behaviors.
//!
//! Writes go to a `.tmp` sibling first and are renamed into place, so an
//! interrupted run never leaves a truncated file under the final name.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::common::{EngineError, Result};
use crate::domain::behavior::{RawBehavior, ReducedBehaviors, ReducedEntry};
use crate::infrastructure::layout::AppLayout;
use crate::ports::BehaviorStore;

pub struct JsonBehaviorStore {
    raw_path: PathBuf,
    reduced_path: PathBuf,
}

impl JsonBehaviorStore {
    pub fn new(layout: &AppLayout) -> Self {
        Self {
            raw_path: layout.raw_behaviors(),
            reduced_path: layout.reduced_behaviors(),
        }
    }

    pub fn raw_path(&self) -> &Path {
        &self.raw_path
    }

    pub fn reduced_path(&self) -> &Path {
        &self.reduced_path
    }
}

fn non_empty(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

fn write_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let file = File::create(&tmp).map_err(|e| EngineError::io(&tmp, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value).map_err(|source| EngineError::Json {
        path: tmp.clone(),
        source,
    })?;
    writer.flush().map_err(|e| EngineError::io(&tmp, e))?;
    drop(writer);
    fs::rename(&tmp, path).map_err(|e| EngineError::io(path, e))
}

impl BehaviorStore for JsonBehaviorStore {
    fn load_raw(&self) -> Result<Option<Vec<RawBehavior>>> {
        if !non_empty(&self.raw_path) {
            return Ok(None);
        }
        let file = File::open(&self.raw_path).map_err(|e| EngineError::io(&self.raw_path, e))?;
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(behaviors) => Ok(Some(behaviors)),
            Err(err) => {
                warn!(path = %self.raw_path.display(), error = %err, "raw behaviors unreadable, rebuilding");
                Ok(None)
            }
        }
    }

    fn save_raw(&self, behaviors: &[RawBehavior]) -> Result<()> {
        write_atomic(&self.raw_path, behaviors)?;
        debug!(path = %self.raw_path.display(), count = behaviors.len(), "raw behaviors written");
        Ok(())
    }

    fn remove_raw(&self) -> Result<()> {
        match fs::remove_file(&self.raw_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineError::io(&self.raw_path, e)),
        }
    }

    fn has_raw(&self) -> bool {
        self.raw_path.exists()
    }

    fn load_reduced(&self) -> Result<ReducedBehaviors> {
        let file =
            File::open(&self.reduced_path).map_err(|e| EngineError::io(&self.reduced_path, e))?;
        let entries: Vec<ReducedEntry> =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| EngineError::Json {
                path: self.reduced_path.clone(),
                source,
            })?;
        Ok(ReducedBehaviors::from_entries(entries))
    }

    fn save_reduced(&self, reduced: ReducedBehaviors) -> Result<()> {
        let count = reduced.behaviors.len();
        write_atomic(&self.reduced_path, &reduced.into_entries())?;
        debug!(path = %self.reduced_path.display(), count, "reduced behaviors written");
        Ok(())
    }

    fn has_reduced(&self) -> bool {
        non_empty(&self.reduced_path)
    }
}
