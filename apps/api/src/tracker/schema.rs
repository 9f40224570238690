//! Column contract for tracker sheets.
//!
//! Every table goes through [`conform`] after load and before persist, so older
//! trackers pick up renamed and newly introduced columns the first time they
//! are touched. Output order is:
//!
//! `[Vendor_Name, Profile_Shared_Date, Profile_Remark]` + other columns in
//! first-seen order (with `Position` directly after `Email_ID`) + manual columns.

use crate::models::candidate::ProfileRemark;
use crate::models::candidate::ScreeningStatus;
use crate::tracker::table::Table;

pub mod columns {
    pub const VENDOR_NAME: &str = "Vendor_Name";
    pub const PROFILE_SHARED_DATE: &str = "Profile_Shared_Date";
    pub const PROFILE_REMARK: &str = "Profile_Remark";
    pub const CANDIDATE_NAME: &str = "Candidate_Name";
    pub const EMAIL: &str = "Email_ID";
    pub const POSITION: &str = "Position";
    pub const CONTACT_NUMBER: &str = "Contact_Number";
    pub const TOTAL_EXPERIENCE: &str = "Total_Experience";
    pub const LOCATION: &str = "Location";
    pub const SCREENING_FEEDBACK: &str = "Resume_Screening_Feedback";
    pub const SIMILARITY_SCORE: &str = "Similarity_Score";
    pub const AVERAGE_SCORE: &str = "Average_Score";
    pub const SHORTLISTED_CV_PATH: &str = "Shortlisted_CV_Path";
    pub const SCREENING_STATUS: &str = "Resume_Screening_Status";
    pub const SCREENING_DATE: &str = "Screening_Date";

    pub const R1_SCHEDULE_DATE: &str = "R1_Schedule_Date";
    pub const R1_PANEL_NAME: &str = "R1_Panel_Name";
    pub const R1_FEEDBACK: &str = "R1_Feedback";
    pub const R1_STATUS: &str = "R1_Status";
    pub const R2_SCHEDULE_DATE: &str = "R2_Schedule_Date";
    pub const R2_PANEL_NAME: &str = "R2_Panel_Name";
    pub const R2_FEEDBACK: &str = "R2_Feedback";
    pub const R2_STATUS: &str = "R2_Status";
    pub const CV_CONVERSION_STATUS: &str = "CV_Conversion_Status";
    pub const CV_CONVERTED_PATH: &str = "CV_Converted_Path";
}

pub const LEADING_COLUMNS: [&str; 3] = [
    columns::VENDOR_NAME,
    columns::PROFILE_SHARED_DATE,
    columns::PROFILE_REMARK,
];

pub const MANUAL_COLUMNS: [&str; 10] = [
    columns::R1_SCHEDULE_DATE,
    columns::R1_PANEL_NAME,
    columns::R1_FEEDBACK,
    columns::R1_STATUS,
    columns::R2_SCHEDULE_DATE,
    columns::R2_PANEL_NAME,
    columns::R2_FEEDBACK,
    columns::R2_STATUS,
    columns::CV_CONVERSION_STATUS,
    columns::CV_CONVERTED_PATH,
];

/// Score columns are stored as numeric cells.
pub const NUMERIC_COLUMNS: [&str; 2] = [columns::SIMILARITY_SCORE, columns::AVERAGE_SCORE];

/// (legacy name, current name)
const LEGACY_RENAMES: &[(&str, &str)] = &[("Date_Shortlisted", columns::SCREENING_DATE)];

/// Brings a table onto the current column contract. Idempotent.
pub fn conform(table: &mut Table) {
    for (legacy, current) in LEGACY_RENAMES {
        if !table.has_column(legacy) {
            continue;
        }
        if table.has_column(current) {
            table.drop_column(legacy);
        } else {
            table.rename_column(legacy, current);
        }
    }

    for column in LEADING_COLUMNS.iter().chain(MANUAL_COLUMNS.iter()) {
        table.add_column(column);
    }

    normalize_duplicate_status(table);

    let order = ordered_columns(table.columns());
    table.set_column_order(order);
}

/// A row remarked as a duplicate always carries the duplicate status.
fn normalize_duplicate_status(table: &mut Table) {
    if !table.has_column(columns::SCREENING_STATUS) {
        return;
    }
    for row in table.rows_mut() {
        if ProfileRemark::parse(row.get(columns::PROFILE_REMARK))
            == Some(ProfileRemark::DuplicateProfile)
        {
            row.set(
                columns::SCREENING_STATUS,
                ScreeningStatus::DuplicateProfile.as_str(),
            );
        }
    }
}

fn ordered_columns(current: &[String]) -> Vec<String> {
    let is_fixed = |c: &str| LEADING_COLUMNS.contains(&c) || MANUAL_COLUMNS.contains(&c);

    let mut middle: Vec<String> = current
        .iter()
        .filter(|c| !is_fixed(c.as_str()))
        .cloned()
        .collect();

    if let Some(pos_idx) = middle.iter().position(|c| c == columns::POSITION) {
        if middle.iter().any(|c| c == columns::EMAIL) {
            let position = middle.remove(pos_idx);
            let email_idx = middle
                .iter()
                .position(|c| c == columns::EMAIL)
                .unwrap_or(middle.len());
            middle.insert(email_idx + 1, position);
        }
    }

    LEADING_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(middle)
        .chain(MANUAL_COLUMNS.iter().map(|c| c.to_string()))
        .collect()
}
