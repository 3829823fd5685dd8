//! Readers for the auxiliary inputs: branch coverage, layout resource ids and
//! widget context. Unusable auxiliary data degrades to "absent" with a
//! warning; it never fails the app.

use std::fs;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::common::{EngineError, Result};
use crate::domain::auxiliary::{BranchCoverage, ResourceTable, UiContext};
use crate::infrastructure::layout::AppLayout;

/// Everything the reducer needs besides the KG.
#[derive(Debug, Clone, Default)]
pub struct AuxiliaryData {
    pub coverage: BranchCoverage,
    pub resources: ResourceTable,
    pub ui_context: UiContext,
}

impl AuxiliaryData {
    /// Load all auxiliary inputs of `layout`. Missing files are absent, not errors.
    pub fn load(layout: &AppLayout, max_bytes: u64, with_ui_context: bool) -> Self {
        let app = layout.name();
        let coverage: BranchCoverage = or_absent(&app, read_json_capped(&layout.branch_coverage(), max_bytes));
        // resource ids only matter when there is coverage to key into
        let resources = if coverage.is_empty() {
            ResourceTable::default()
        } else {
            or_absent(&app, read_resource_table(&layout.public_resources()))
        };
        let ui_context = if with_ui_context {
            or_absent(&app, read_json_capped(&layout.ui_context(), max_bytes))
        } else {
            UiContext::default()
        };
        Self {
            coverage,
            resources,
            ui_context,
        }
    }
}

fn or_absent<T: Default>(app: &str, loaded: Result<T>) -> T {
    match loaded {
        Ok(value) => value,
        Err(EngineError::MissingInput { .. }) => T::default(),
        Err(err) => {
            warn!(app, error = %err, "ignoring auxiliary input");
            T::default()
        }
    }
}

/// Parse a JSON file, refusing anything larger than `max_bytes`.
pub fn read_json_capped<T: DeserializeOwned>(path: &Path, max_bytes: u64) -> Result<T> {
    let len = fs::metadata(path).map_err(|e| EngineError::io(path, e))?.len();
    if len > max_bytes {
        return Err(EngineError::MalformedAuxiliary {
            path: path.to_path_buf(),
            message: format!("{len} bytes exceeds the {max_bytes} byte limit"),
        });
    }
    let bytes = fs::read(path).map_err(|e| EngineError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| EngineError::MalformedAuxiliary {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Layout entries of `public.xml`: `<public type="layout" name=".." id="0x.."/>`.
pub fn read_resource_table(path: &Path) -> Result<ResourceTable> {
    let text = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
    parse_resource_table(&text).map_err(|message| EngineError::Xml {
        path: path.to_path_buf(),
        message,
    })
}

pub fn parse_resource_table(text: &str) -> std::result::Result<ResourceTable, String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut table = ResourceTable::default();
    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"public" => {
                let mut kind = None;
                let mut name = None;
                let mut id = None;
                for attr in e.attributes() {
                    let attr = attr.map_err(|err| err.to_string())?;
                    let value = attr.unescape_value().map_err(|err| err.to_string())?.into_owned();
                    match attr.key.as_ref() {
                        b"type" => kind = Some(value),
                        b"name" => name = Some(value),
                        b"id" => id = Some(value),
                        _ => {}
                    }
                }
                if kind.as_deref() != Some("layout") {
                    continue;
                }
                if let (Some(name), Some(id)) = (name, id) {
                    let digits = id.trim_start_matches("0x").trim_start_matches("0X");
                    let value = i64::from_str_radix(digits, 16)
                        .map_err(|_| format!("layout {name} has a bad id {id:?}"))?;
                    table.insert(name, value);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(format!("at byte {}: {err}", reader.buffer_position()));
            }
        }
    }
    Ok(table)
}
