use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::tracker::identity::is_unknown;
use crate::tracker::schema::{self, columns};
use crate::tracker::table::Row;

/// Text written for an extracted field the upstream extractor could not find.
pub const NOT_FOUND: &str = "Not Found";

// ────────────────────────────────────────────────────────────────────────────
// Enumerations
// ────────────────────────────────────────────────────────────────────────────

/// The decision a reviewer (or the auto-decision thresholds) asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Shortlisted,
    Rejected,
}

/// Stored screening status. `DuplicateProfile` is never requested by a caller;
/// the engine assigns it to cross-vendor resubmissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreeningStatus {
    Shortlisted,
    Rejected,
    DuplicateProfile,
}

impl ScreeningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreeningStatus::Shortlisted => "Shortlisted",
            ScreeningStatus::Rejected => "Rejected",
            ScreeningStatus::DuplicateProfile => "Duplicate Profile",
        }
    }

    /// Parses the on-disk text, case-insensitively. Unknown text yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "shortlisted" => Some(ScreeningStatus::Shortlisted),
            "rejected" => Some(ScreeningStatus::Rejected),
            "duplicate profile" | "duplicateprofile" => Some(ScreeningStatus::DuplicateProfile),
            _ => None,
        }
    }
}

impl From<Decision> for ScreeningStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Shortlisted => ScreeningStatus::Shortlisted,
            Decision::Rejected => ScreeningStatus::Rejected,
        }
    }
}

impl std::fmt::Display for ScreeningStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a record is the first submission of its identity in the partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileRemark {
    UniqueProfile,
    DuplicateProfile,
}

impl ProfileRemark {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileRemark::UniqueProfile => "Unique Profile",
            ProfileRemark::DuplicateProfile => "Duplicate Profile",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "unique profile" | "uniqueprofile" => Some(ProfileRemark::UniqueProfile),
            "duplicate profile" | "duplicateprofile" => Some(ProfileRemark::DuplicateProfile),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProfileRemark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Candidate fields (input boundary)
// ────────────────────────────────────────────────────────────────────────────

/// Fields the resume extractor produced for one candidate.
///
/// Extractors report missing values as `"Not Found"`, `"nan"`, `"none"` or an
/// empty string. `normalized` folds all of these into `None` so nothing past
/// this boundary has to know the sentinel list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateFields {
    #[serde(default, alias = "Candidate_Name")]
    pub candidate_name: Option<String>,
    #[serde(default, alias = "Email_ID")]
    pub email: Option<String>,
    #[serde(default, alias = "Contact_Number")]
    pub phone: Option<String>,
    #[serde(default, alias = "Total_Experience")]
    pub total_experience: Option<String>,
    #[serde(default, alias = "Location")]
    pub location: Option<String>,
}

impl CandidateFields {
    pub fn normalized(self) -> Self {
        Self {
            candidate_name: known(self.candidate_name),
            email: known(self.email),
            phone: known(self.phone),
            total_experience: known(self.total_experience),
            location: known(self.location),
        }
    }
}

/// Keeps a value only if it carries information; trims surrounding whitespace.
pub fn known(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !is_unknown(v))
}

fn or_not_found(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| NOT_FOUND.to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// Auto decision
// ────────────────────────────────────────────────────────────────────────────

/// Score thresholds used when a submission does not carry an explicit decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub similarity: f64,
    pub average: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            similarity: 0.7,
            average: 0.6,
        }
    }
}

impl Thresholds {
    /// Shortlists only when both scores meet their threshold.
    pub fn decide(&self, similarity_score: f64, average_score: f64) -> Decision {
        if similarity_score >= self.similarity && average_score >= self.average {
            Decision::Shortlisted
        } else {
            Decision::Rejected
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stored record
// ────────────────────────────────────────────────────────────────────────────

/// Interview-tracking columns filled in by people, never by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualFields {
    pub r1_schedule_date: String,
    pub r1_panel_name: String,
    pub r1_feedback: String,
    pub r1_status: String,
    pub r2_schedule_date: String,
    pub r2_panel_name: String,
    pub r2_feedback: String,
    pub r2_status: String,
    pub cv_conversion_status: String,
    pub cv_converted_path: String,
}

/// One row of a partition's tracker: a single (candidate, vendor submission) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub vendor_name: Option<String>,
    pub profile_shared_date: Option<NaiveDate>,
    pub profile_remark: Option<ProfileRemark>,
    pub candidate_name: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub total_experience: Option<String>,
    pub location: Option<String>,
    pub screening_feedback: String,
    pub similarity_score: f64,
    pub average_score: f64,
    pub shortlisted_cv_path: Option<String>,
    pub screening_status: Option<ScreeningStatus>,
    pub screening_date: Option<NaiveDate>,
    pub manual: ManualFields,
}

impl CandidateRecord {
    /// Cells for a freshly appended row, in first-seen column order.
    /// Manual columns are always written empty.
    pub fn to_cells(&self) -> Vec<(String, String)> {
        let mut cells = vec![
            (
                columns::VENDOR_NAME,
                self.vendor_name.clone().unwrap_or_default(),
            ),
            (
                columns::PROFILE_SHARED_DATE,
                format_date(self.profile_shared_date),
            ),
            (
                columns::PROFILE_REMARK,
                self.profile_remark
                    .map(|r| r.as_str().to_string())
                    .unwrap_or_default(),
            ),
            (columns::CANDIDATE_NAME, or_not_found(&self.candidate_name)),
            (columns::EMAIL, or_not_found(&self.email)),
            (columns::CONTACT_NUMBER, or_not_found(&self.phone)),
            (columns::TOTAL_EXPERIENCE, or_not_found(&self.total_experience)),
            (columns::LOCATION, or_not_found(&self.location)),
            (columns::POSITION, or_not_found(&self.position)),
            (columns::SCREENING_FEEDBACK, self.screening_feedback.clone()),
            (columns::SIMILARITY_SCORE, self.similarity_score.to_string()),
            (columns::AVERAGE_SCORE, self.average_score.to_string()),
            (
                columns::SHORTLISTED_CV_PATH,
                self.shortlisted_cv_path.clone().unwrap_or_default(),
            ),
            (
                columns::SCREENING_STATUS,
                self.screening_status
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_default(),
            ),
            (columns::SCREENING_DATE, format_date(self.screening_date)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect::<Vec<_>>();

        cells.extend(
            schema::MANUAL_COLUMNS
                .iter()
                .map(|c| (c.to_string(), String::new())),
        );
        cells
    }

    /// Typed view over a stored row. Unparseable cells degrade to `None`/zero.
    pub fn from_row(row: &Row) -> Self {
        let text = |col: &str| known(Some(row.get(col).to_string()));
        let score = |col: &str| row.get(col).trim().parse::<f64>().unwrap_or(0.0);
        let manual = |col: &str| row.get(col).trim().to_string();

        Self {
            vendor_name: text(columns::VENDOR_NAME),
            profile_shared_date: parse_date(row.get(columns::PROFILE_SHARED_DATE)),
            profile_remark: ProfileRemark::parse(row.get(columns::PROFILE_REMARK)),
            candidate_name: text(columns::CANDIDATE_NAME),
            email: text(columns::EMAIL),
            position: text(columns::POSITION),
            phone: text(columns::CONTACT_NUMBER),
            total_experience: text(columns::TOTAL_EXPERIENCE),
            location: text(columns::LOCATION),
            screening_feedback: row.get(columns::SCREENING_FEEDBACK).to_string(),
            similarity_score: score(columns::SIMILARITY_SCORE),
            average_score: score(columns::AVERAGE_SCORE),
            shortlisted_cv_path: text(columns::SHORTLISTED_CV_PATH),
            screening_status: ScreeningStatus::parse(row.get(columns::SCREENING_STATUS)),
            screening_date: parse_date(row.get(columns::SCREENING_DATE)),
            manual: ManualFields {
                r1_schedule_date: manual(columns::R1_SCHEDULE_DATE),
                r1_panel_name: manual(columns::R1_PANEL_NAME),
                r1_feedback: manual(columns::R1_FEEDBACK),
                r1_status: manual(columns::R1_STATUS),
                r2_schedule_date: manual(columns::R2_SCHEDULE_DATE),
                r2_panel_name: manual(columns::R2_PANEL_NAME),
                r2_feedback: manual(columns::R2_FEEDBACK),
                r2_status: manual(columns::R2_STATUS),
                cv_conversion_status: manual(columns::CV_CONVERSION_STATUS),
                cv_converted_path: manual(columns::CV_CONVERTED_PATH),
            },
        }
    }
}

pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
