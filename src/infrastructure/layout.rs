//! Where an app's inputs and outputs live on disk.

use std::path::{Path, PathBuf};

/// Paths of one app directory under the batch root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLayout {
    root: PathBuf,
}

impl AppLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory name, used as the app label in logs and summaries.
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string())
    }

    pub fn encoding_dir(&self) -> PathBuf {
        self.root.join("encoding")
    }

    pub fn node_table(&self) -> PathBuf {
        self.encoding_dir().join("node.csv")
    }

    pub fn edge_table(&self) -> PathBuf {
        self.encoding_dir().join("edge.csv")
    }

    pub fn raw_behaviors(&self) -> PathBuf {
        self.encoding_dir().join("uhg_full.json")
    }

    pub fn reduced_behaviors(&self) -> PathBuf {
        self.encoding_dir().join("uhg.json")
    }

    pub fn branch_coverage(&self) -> PathBuf {
        self.root.join("add_info.json")
    }

    pub fn public_resources(&self) -> PathBuf {
        self.root.join("values").join("public.xml")
    }

    pub fn ui_context(&self) -> PathBuf {
        self.root.join("ui_context.json")
    }
}
