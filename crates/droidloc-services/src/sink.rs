use crate::Result;
use droidloc_core::ResourceDocument;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Persists rendered documents. Shared by all language workers.
pub trait OutputSink: Sync {
    fn persist(&self, path: &Path, doc: &ResourceDocument) -> Result<()>;

    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Writes straight to the filesystem, creating `values*/` directories as needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSink;

impl OutputSink for FsSink {
    fn persist(&self, path: &Path, doc: &ResourceDocument) -> Result<()> {
        droidloc_export_xml::write_resources_xml(path, doc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub path: PathBuf,
    pub bytes: usize,
    /// The file already exists with exactly these bytes.
    pub unchanged: bool,
}

/// Renders documents without touching disk and remembers what would be written.
#[derive(Debug, Default)]
pub struct DryRunSink {
    planned: Mutex<Vec<PlannedFile>>,
}

impl DryRunSink {
    /// Planned files sorted by path.
    pub fn planned(&self) -> Vec<PlannedFile> {
        let mut out = self
            .planned
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }
}

impl OutputSink for DryRunSink {
    fn persist(&self, path: &Path, doc: &ResourceDocument) -> Result<()> {
        let bytes = droidloc_export_xml::render_resources(doc)?;
        let unchanged = std::fs::read(path).map(|b| b == bytes).unwrap_or(false);
        self.planned
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(PlannedFile {
                path: path.to_path_buf(),
                bytes: bytes.len(),
                unchanged,
            });
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}
