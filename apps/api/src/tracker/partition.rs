use std::path::{Path, PathBuf};

use crate::tracker::TrackerError;

pub const SHORTLISTED_DIR: &str = "Shortlisted";
pub const TRACKER_DIR: &str = "Tracker";
pub const TRACKER_FILE_NAME: &str = "Candidates_Tracker.xlsx";

const NOT_FOUND_COMPONENT: &str = "Not_Found";

/// One job position under one base folder. Owns exactly one tracker file:
///
/// ```text
/// <base>/<Position>_Candidates/
///     Shortlisted/
///     Tracker/Candidates_Tracker.xlsx
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    position: Option<String>,
    folder: PathBuf,
}

impl Partition {
    pub fn new(base_folder: impl AsRef<Path>, position: Option<&str>) -> Self {
        let position = position
            .map(str::trim)
            .filter(|p| !crate::tracker::identity::is_unknown(p))
            .map(str::to_string);
        let component = position
            .as_deref()
            .map(clean_path_component)
            .filter(|c| !c.is_empty() && c != NOT_FOUND_COMPONENT)
            .unwrap_or_else(|| NOT_FOUND_COMPONENT.to_string());
        Self {
            folder: base_folder
                .as_ref()
                .join(format!("{component}_Candidates")),
            position,
        }
    }

    /// The position as submitted; `None` when it could not be determined.
    pub fn position(&self) -> Option<&str> {
        self.position.as_deref()
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn shortlisted_dir(&self) -> PathBuf {
        self.folder().join(SHORTLISTED_DIR)
    }

    pub fn tracker_dir(&self) -> PathBuf {
        self.folder().join(TRACKER_DIR)
    }

    pub fn store_path(&self) -> PathBuf {
        self.tracker_dir().join(TRACKER_FILE_NAME)
    }

    /// Creates `Shortlisted/` and `Tracker/` if missing.
    pub fn ensure_layout(&self) -> Result<(), TrackerError> {
        for dir in [self.shortlisted_dir(), self.tracker_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| TrackerError::io(&dir, e))?;
        }
        Ok(())
    }

    /// Where a shortlisted candidate's source document is copied:
    /// `Shortlisted/<Position>_<CandidateName><ext>`.
    pub fn shortlisted_cv_path(&self, candidate_name: Option<&str>, extension: Option<&str>) -> PathBuf {
        let position = self
            .position
            .as_deref()
            .map(clean_path_component)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| NOT_FOUND_COMPONENT.to_string());
        let name = candidate_name
            .map(clean_path_component)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let ext = extension
            .map(|e| e.trim_start_matches('.'))
            .filter(|e| !e.is_empty())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        self.shortlisted_dir()
            .join(format!("{position}_{name}{ext}"))
    }
}

/// Keeps word characters, whitespace and `-`; spaces become `_`; outer `_` trimmed.
pub fn clean_path_component(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .map(|c| if c == ' ' { '_' } else { c })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}
