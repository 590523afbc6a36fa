//! Export dispatch: form parameters in, saved artifact out.
//!
//! Exports are independent of the analysis state machine. A failure here is
//! reported to the caller directly and never touches the session's error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::info;

use crate::client::Backend;
use crate::error::ExportError;
use crate::request::{export_payload, FormState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 2] = [ExportFormat::Csv, ExportFormat::Pdf];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn endpoint(&self) -> String {
        format!("/export/{}", self.extension())
    }

    /// Name of the saved artifact, e.g. `sip_analysis.csv`.
    pub fn artifact_name(&self) -> String {
        format!("sip_analysis.{}", self.extension())
    }

    pub fn cycle(&self) -> Self {
        match self {
            ExportFormat::Csv => ExportFormat::Pdf,
            ExportFormat::Pdf => ExportFormat::Csv,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(format!("unsupported export format '{}' (expected csv or pdf)", other)),
        }
    }
}

/// Save an export payload as `sip_analysis.<format>` in the given directory.
pub fn save_artifact(dir: &Path, format: ExportFormat, bytes: &[u8]) -> Result<PathBuf, ExportError> {
    let path = dir.join(format.artifact_name());
    std::fs::write(&path, bytes).map_err(|source| ExportError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Request an export for the current form and save it into `dir`.
pub fn export_as<B: Backend + ?Sized>(
    backend: &B,
    format: ExportFormat,
    form: &FormState,
    dir: &Path,
) -> Result<PathBuf, ExportError> {
    let payload = export_payload(form)?;
    let bytes = backend.export(format, &payload)?;
    let path = save_artifact(dir, format, &bytes)?;
    info!("Saved {} export ({} bytes) to {}", format, bytes.len(), path.display());
    Ok(path)
}
