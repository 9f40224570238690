//! Status Assignment Engine: first-come-first-serve decisions per (identity, vendor).
//!
//! | existing state          | override | effect                                        |
//! |-------------------------|----------|-----------------------------------------------|
//! | none                    | any      | append, remark Unique, status = decision      |
//! | same vendor             | false    | blocked, nothing written                      |
//! | same vendor             | true     | overwrite that row's decision in place        |
//! | same vendor, duplicate  | true     | refused, nothing written                      |
//! | other vendors only      | any      | append, remark + status = Duplicate Profile   |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::models::candidate::{
    format_date, known, CandidateFields, CandidateRecord, Decision, ManualFields, ProfileRemark,
    ScreeningStatus,
};
use crate::tracker::classifier::{classify, Classification, ExistingMatch, ReasonCode};
use crate::tracker::identity::{normalize_vendor, Identity, IdentityResolver, MatchTier, Resolution, RowKey};
use crate::tracker::lock::PartitionLocks;
use crate::tracker::partition::Partition;
use crate::tracker::schema::{self, columns};
use crate::tracker::store::{RecordStore, XlsxStore};
use crate::tracker::table::Table;
use crate::tracker::TrackerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSettings {
    /// Fail on an unreadable tracker file instead of treating it as empty.
    pub strict_load: bool,
    /// Enable the name + vendor identity tier for phone-less candidates.
    pub name_vendor_fallback: bool,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            strict_load: false,
            name_vendor_fallback: true,
        }
    }
}

/// One screening decision to record.
#[derive(Debug, Clone)]
pub struct Submission {
    pub fields: CandidateFields,
    pub decision: Decision,
    pub vendor_name: Option<String>,
    pub profile_shared_date: Option<NaiveDate>,
    pub admin_override: bool,
    pub similarity_score: f64,
    pub average_score: f64,
    pub feedback: String,
    /// Where the caller copied the source document. Stored only on Shortlisted rows.
    pub shortlisted_cv_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitOutcome {
    pub store_path: PathBuf,
    pub was_added: bool,
    pub reason_code: ReasonCode,
    pub profile_remark: Option<ProfileRemark>,
    /// Existing status for blocked submissions, the new status after an override,
    /// and the first prior status for cross-vendor duplicates.
    pub current_status: Option<ScreeningStatus>,
    /// Status written by this call, if anything was written.
    pub recorded_status: Option<ScreeningStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCheck {
    pub store_path: PathBuf,
    pub exists: bool,
    pub current_status: Option<ScreeningStatus>,
    pub reason_code: ReasonCode,
    pub profile_remark: Option<ProfileRemark>,
}

pub struct Tracker {
    store: Arc<dyn RecordStore>,
    locks: PartitionLocks,
    resolver: IdentityResolver,
    settings: TrackerSettings,
}

impl Tracker {
    pub fn new(store: Arc<dyn RecordStore>, settings: TrackerSettings) -> Self {
        Self {
            store,
            locks: PartitionLocks::new(),
            resolver: IdentityResolver::new(settings.name_vendor_fallback),
            settings,
        }
    }

    pub fn xlsx(settings: TrackerSettings) -> Self {
        Self::new(Arc::new(XlsxStore), settings)
    }

    pub(crate) fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub(crate) fn locks(&self) -> &PartitionLocks {
        &self.locks
    }

    /// Loads and conforms a partition table, applying the unreadable-store policy.
    pub(crate) fn load_table(&self, store_path: &Path) -> Result<Table, TrackerError> {
        let mut table = match self.store.load(store_path) {
            Ok(table) => table,
            Err(TrackerError::StoreUnreadable { path, reason }) if !self.settings.strict_load => {
                warn!(
                    "Tracker {} is unreadable ({reason}); treating it as empty",
                    path.display()
                );
                Table::default()
            }
            Err(e) => return Err(e),
        };
        schema::conform(&mut table);
        Ok(table)
    }

    /// Read-only: would this candidate be treated as new, blocked or a duplicate?
    pub fn check_status(
        &self,
        partition: &Partition,
        fields: &CandidateFields,
        vendor_name: Option<&str>,
    ) -> Result<StatusCheck, TrackerError> {
        let store_path = partition.store_path();
        let table = self.load_table(&store_path)?;
        let vendor = normalize_vendor(vendor_name);
        let resolution = self
            .resolver
            .resolve(&table, &Identity::from_fields(fields), vendor.as_deref());
        let classification = classify(&table, resolution.as_ref(), vendor.as_deref());

        let (exists, current_status, profile_remark) = match &classification {
            Classification::Unique => (false, None, None),
            Classification::SameVendorDuplicate(m) | Classification::DifferentVendorDuplicate(m) => {
                (true, m.status, m.remark)
            }
        };

        Ok(StatusCheck {
            store_path,
            exists,
            current_status,
            reason_code: classification.reason(),
            profile_remark,
        })
    }

    /// Records a screening decision for one candidate in `partition`.
    pub fn submit(
        &self,
        partition: &Partition,
        submission: &Submission,
    ) -> Result<SubmitOutcome, TrackerError> {
        validate_score("similarity_score", submission.similarity_score)?;
        validate_score("average_score", submission.average_score)?;

        partition.ensure_layout()?;
        let store_path = partition.store_path();

        self.locks.with_lock(&store_path, || {
            let mut table = self.load_table(&store_path)?;
            let vendor = normalize_vendor(submission.vendor_name.as_deref());
            let identity = Identity::from_fields(&submission.fields);
            let resolution = self.resolver.resolve(&table, &identity, vendor.as_deref());
            let classification = classify(&table, resolution.as_ref(), vendor.as_deref());

            match classification {
                Classification::Unique => {
                    let status = ScreeningStatus::from(submission.decision);
                    self.append(
                        &mut table,
                        &store_path,
                        partition,
                        submission,
                        status,
                        ProfileRemark::UniqueProfile,
                    )?;
                    info!(
                        "Recorded {status} for {} in {}",
                        display_name(&submission.fields),
                        store_path.display()
                    );
                    Ok(SubmitOutcome {
                        store_path: store_path.clone(),
                        was_added: true,
                        reason_code: ReasonCode::None,
                        profile_remark: Some(ProfileRemark::UniqueProfile),
                        current_status: None,
                        recorded_status: Some(status),
                    })
                }

                Classification::SameVendorDuplicate(existing) if !submission.admin_override => {
                    info!(
                        "Blocked resubmission of {} by the same vendor ({}); already {}",
                        display_name(&submission.fields),
                        existing.tier.key(),
                        existing
                            .status
                            .map(|s| s.as_str())
                            .unwrap_or("Unknown")
                    );
                    Ok(blocked(&store_path, ReasonCode::SameVendor(existing.tier), &existing))
                }

                Classification::SameVendorDuplicate(existing) => {
                    let resolution = resolution.as_ref();
                    let target = resolution.and_then(|r| relocate_for_override(&table, r, vendor.as_deref()));
                    let Some(row) = target else {
                        warn!(
                            "Override for {} could not pin a single row by {}; leaving tracker unchanged",
                            display_name(&submission.fields),
                            existing.tier.key()
                        );
                        return Ok(blocked(&store_path, ReasonCode::SameVendor(existing.tier), &existing));
                    };

                    // A duplicate-remarked row always carries the duplicate status.
                    let target_remark = table
                        .row(row)
                        .and_then(|r| ProfileRemark::parse(r.get(columns::PROFILE_REMARK)));
                    if target_remark == Some(ProfileRemark::DuplicateProfile) {
                        warn!(
                            "Override for {} refused: the vendor's row is a duplicate profile",
                            display_name(&submission.fields)
                        );
                        return Ok(blocked(&store_path, ReasonCode::AlreadyExists, &existing));
                    }

                    let requested = ScreeningStatus::from(submission.decision);
                    if !table.update_in_place(row, override_cells(submission, requested)) {
                        return Err(TrackerError::CandidateNotFound);
                    }
                    schema::conform(&mut table);
                    self.store.persist(&store_path, &table)?;

                    let persisted = table
                        .row(row)
                        .and_then(|r| ScreeningStatus::parse(r.get(columns::SCREENING_STATUS)));
                    warn!(
                        "Admin override: {} changed from {} to {} in {}",
                        display_name(&submission.fields),
                        existing
                            .status
                            .map(|s| s.as_str())
                            .unwrap_or("Unknown"),
                        persisted.map(|s| s.as_str()).unwrap_or("Unknown"),
                        store_path.display()
                    );
                    Ok(SubmitOutcome {
                        store_path: store_path.clone(),
                        was_added: true,
                        reason_code: ReasonCode::StatusUpdated,
                        profile_remark: target_remark,
                        current_status: persisted,
                        recorded_status: persisted,
                    })
                }

                Classification::DifferentVendorDuplicate(existing) => {
                    self.append(
                        &mut table,
                        &store_path,
                        partition,
                        submission,
                        ScreeningStatus::DuplicateProfile,
                        ProfileRemark::DuplicateProfile,
                    )?;
                    info!(
                        "Recorded {} as a duplicate profile (matched by {}) in {}",
                        display_name(&submission.fields),
                        existing.tier.key(),
                        store_path.display()
                    );
                    Ok(SubmitOutcome {
                        store_path: store_path.clone(),
                        was_added: true,
                        reason_code: ReasonCode::DifferentVendor(existing.tier),
                        profile_remark: Some(ProfileRemark::DuplicateProfile),
                        current_status: existing.status,
                        recorded_status: Some(ScreeningStatus::DuplicateProfile),
                    })
                }
            }
        })
    }

    fn append(
        &self,
        table: &mut Table,
        store_path: &Path,
        partition: &Partition,
        submission: &Submission,
        status: ScreeningStatus,
        remark: ProfileRemark,
    ) -> Result<(), TrackerError> {
        let record = new_record(partition, submission, status, remark);
        table.append(record.to_cells());
        schema::conform(table);
        self.store.persist(store_path, table)
    }
}

fn validate_score(name: &str, value: f64) -> Result<(), TrackerError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(TrackerError::InvalidInput(format!(
            "{name} must be between 0 and 1, got {value}"
        )))
    }
}

fn blocked(store_path: &Path, reason: ReasonCode, existing: &ExistingMatch) -> SubmitOutcome {
    SubmitOutcome {
        store_path: store_path.to_path_buf(),
        was_added: false,
        reason_code: reason,
        profile_remark: existing.remark,
        current_status: existing.status,
        recorded_status: None,
    }
}

/// Finds the one row an override may rewrite: the same-vendor row of the
/// resolved tier. Email and name + phone are exact keys, so the first such row
/// is taken. A name + vendor hit is only trusted when it is unambiguous.
fn relocate_for_override(table: &Table, resolution: &Resolution, vendor: Option<&str>) -> Option<usize> {
    let same_vendor: Vec<usize> = resolution
        .rows
        .iter()
        .copied()
        .filter(|&idx| {
            table
                .row(idx)
                .map(|row| RowKey::of(row).vendor.as_deref() == vendor)
                .unwrap_or(false)
        })
        .collect();

    match resolution.tier {
        MatchTier::NameAndVendor if same_vendor.len() != 1 => None,
        _ => same_vendor.first().copied(),
    }
}

fn override_cells(submission: &Submission, status: ScreeningStatus) -> Vec<(String, String)> {
    let mut cells = vec![
        (columns::SCREENING_STATUS, status.as_str().to_string()),
        (columns::SCREENING_DATE, format_date(Some(today()))),
        (columns::SCREENING_FEEDBACK, submission.feedback.clone()),
        (columns::SIMILARITY_SCORE, submission.similarity_score.to_string()),
        (columns::AVERAGE_SCORE, submission.average_score.to_string()),
    ];
    match (status, &submission.shortlisted_cv_path) {
        (ScreeningStatus::Shortlisted, Some(path)) => {
            cells.push((columns::SHORTLISTED_CV_PATH, path.clone()));
        }
        (ScreeningStatus::Shortlisted, None) => {}
        _ => cells.push((columns::SHORTLISTED_CV_PATH, String::new())),
    }
    cells
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn new_record(
    partition: &Partition,
    submission: &Submission,
    status: ScreeningStatus,
    remark: ProfileRemark,
) -> CandidateRecord {
    let fields = submission.fields.clone().normalized();
    CandidateRecord {
        vendor_name: known(submission.vendor_name.clone()),
        profile_shared_date: submission.profile_shared_date,
        profile_remark: Some(remark),
        candidate_name: fields.candidate_name,
        email: fields.email,
        position: partition.position().map(str::to_string),
        phone: fields.phone,
        total_experience: fields.total_experience,
        location: fields.location,
        screening_feedback: submission.feedback.clone(),
        similarity_score: submission.similarity_score,
        average_score: submission.average_score,
        shortlisted_cv_path: match status {
            ScreeningStatus::Shortlisted => known(submission.shortlisted_cv_path.clone()),
            _ => None,
        },
        screening_status: Some(status),
        screening_date: Some(today()),
        manual: ManualFields::default(),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn display_name(fields: &CandidateFields) -> &str {
    fields
        .candidate_name
        .as_deref()
        .or(fields.email.as_deref())
        .unwrap_or("candidate")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    use crate::tracker::schema::{LEADING_COLUMNS, MANUAL_COLUMNS};

    fn setup() -> (TempDir, Tracker, Partition) {
        let dir = tempdir().unwrap();
        let partition = Partition::new(dir.path(), Some("Rust Engineer"));
        (dir, Tracker::xlsx(TrackerSettings::default()), partition)
    }

    fn fields(email: Option<&str>, name: Option<&str>, phone: Option<&str>) -> CandidateFields {
        CandidateFields {
            candidate_name: name.map(String::from),
            email: email.map(String::from),
            phone: phone.map(String::from),
            total_experience: Some("5 years".to_string()),
            location: Some("Pune".to_string()),
        }
    }

    fn submission(fields: CandidateFields, vendor: &str, decision: Decision) -> Submission {
        Submission {
            fields,
            decision,
            vendor_name: Some(vendor.to_string()).filter(|v| !v.is_empty()),
            profile_shared_date: NaiveDate::from_ymd_opt(2026, 10, 1),
            admin_override: false,
            similarity_score: 0.8,
            average_score: 0.7,
            feedback: "Strong systems background".to_string(),
            shortlisted_cv_path: None,
        }
    }

    fn stored(tracker: &Tracker, partition: &Partition) -> Table {
        tracker.store().load(&partition.store_path()).unwrap()
    }

    fn jane() -> CandidateFields {
        fields(Some("a@x.com"), Some("Jane Doe"), None)
    }

    #[test]
    fn test_first_submission_is_unique() {
        let (_dir, tracker, partition) = setup();
        let outcome = tracker
            .submit(&partition, &submission(jane(), "Acme", Decision::Shortlisted))
            .unwrap();

        assert!(outcome.was_added);
        assert_eq!(outcome.reason_code, ReasonCode::None);
        assert_eq!(outcome.profile_remark, Some(ProfileRemark::UniqueProfile));
        assert_eq!(outcome.store_path, partition.store_path());

        let table = stored(&tracker, &partition);
        assert_eq!(table.len(), 1);
        let row = &table.rows()[0];
        assert_eq!(row.get(columns::PROFILE_REMARK), "Unique Profile");
        assert_eq!(row.get(columns::SCREENING_STATUS), "Shortlisted");
        assert_eq!(row.get(columns::POSITION), "Rust Engineer");
        assert_eq!(row.get(columns::CONTACT_NUMBER), "Not Found");
        assert_eq!(row.get(columns::PROFILE_SHARED_DATE), "2026-10-01");
        assert_eq!(row.get(columns::SCREENING_DATE), format_date(Some(today())));
    }

    #[test]
    fn test_scenario_block_then_cross_vendor_duplicate() {
        let (_dir, tracker, partition) = setup();
        tracker
            .submit(&partition, &submission(jane(), "Acme", Decision::Shortlisted))
            .unwrap();

        let again = tracker
            .submit(&partition, &submission(jane(), "Acme", Decision::Rejected))
            .unwrap();
        assert!(!again.was_added);
        assert_eq!(again.reason_code.to_string(), "email_same_vendor");
        assert_eq!(again.current_status, Some(ScreeningStatus::Shortlisted));
        let table = stored(&tracker, &partition);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].get(columns::SCREENING_STATUS), "Shortlisted");

        let beta = tracker
            .submit(&partition, &submission(jane(), "Beta", Decision::Rejected))
            .unwrap();
        assert!(beta.was_added);
        assert_eq!(beta.reason_code.to_string(), "email_different_vendor");
        let table = stored(&tracker, &partition);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].get(columns::SCREENING_STATUS), "Duplicate Profile");
        assert_eq!(table.rows()[1].get(columns::PROFILE_REMARK), "Duplicate Profile");
    }

    #[test]
    fn test_duplicate_fan_out_discards_requested_decision() {
        let (_dir, tracker, partition) = setup();
        tracker
            .submit(&partition, &submission(jane(), "Acme", Decision::Rejected))
            .unwrap();
        let mut dup = submission(jane(), "Beta", Decision::Shortlisted);
        dup.shortlisted_cv_path = Some("/cv/jane.pdf".to_string());
        let outcome = tracker.submit(&partition, &dup).unwrap();

        assert_eq!(outcome.recorded_status, Some(ScreeningStatus::DuplicateProfile));
        assert_eq!(outcome.current_status, Some(ScreeningStatus::Rejected));
        let table = stored(&tracker, &partition);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].get(columns::SHORTLISTED_CV_PATH), "");
        // The original record is untouched.
        assert_eq!(table.rows()[0].get(columns::SCREENING_STATUS), "Rejected");
    }

    #[test]
    fn test_same_vendor_blocks_even_after_fan_out() {
        let (_dir, tracker, partition) = setup();
        tracker
            .submit(&partition, &submission(jane(), "Acme", Decision::Shortlisted))
            .unwrap();
        tracker
            .submit(&partition, &submission(jane(), "Beta", Decision::Rejected))
            .unwrap();

        let outcome = tracker
            .submit(&partition, &submission(jane(), "Beta", Decision::Shortlisted))
            .unwrap();
        assert!(!outcome.was_added);
        assert!(outcome.reason_code.to_string().ends_with("_same_vendor"));
        assert_eq!(outcome.current_status, Some(ScreeningStatus::DuplicateProfile));
        assert_eq!(stored(&tracker, &partition).len(), 2);
    }

    #[test]
    fn test_override_updates_in_place() {
        let (_dir, tracker, partition) = setup();
        let mut first = submission(jane(), "Acme", Decision::Shortlisted);
        first.shortlisted_cv_path = Some("/cv/jane.pdf".to_string());
        tracker.submit(&partition, &first).unwrap();

        let mut fix = submission(jane(), "acme ", Decision::Rejected);
        fix.admin_override = true;
        fix.feedback = "Missing required clearance".to_string();
        fix.similarity_score = 0.4;
        fix.average_score = 0.3;
        let outcome = tracker.submit(&partition, &fix).unwrap();

        assert!(outcome.was_added);
        assert_eq!(outcome.reason_code, ReasonCode::StatusUpdated);
        assert_eq!(outcome.current_status, Some(ScreeningStatus::Rejected));

        let table = stored(&tracker, &partition);
        assert_eq!(table.len(), 1);
        let row = &table.rows()[0];
        assert_eq!(row.get(columns::SCREENING_STATUS), "Rejected");
        assert_eq!(row.get(columns::SCREENING_FEEDBACK), "Missing required clearance");
        assert_eq!(row.get(columns::SIMILARITY_SCORE), "0.4");
        assert_eq!(row.get(columns::AVERAGE_SCORE), "0.3");
        assert_eq!(row.get(columns::SHORTLISTED_CV_PATH), "");
        assert_eq!(row.get(columns::PROFILE_REMARK), "Unique Profile");
    }

    #[test]
    fn test_override_does_not_touch_other_vendor_rows() {
        let (_dir, tracker, partition) = setup();
        tracker
            .submit(&partition, &submission(jane(), "Acme", Decision::Rejected))
            .unwrap();
        tracker
            .submit(&partition, &submission(jane(), "Beta", Decision::Rejected))
            .unwrap();

        let mut fix = submission(jane(), "Acme", Decision::Shortlisted);
        fix.admin_override = true;
        fix.shortlisted_cv_path = Some("/cv/jane.pdf".to_string());
        let outcome = tracker.submit(&partition, &fix).unwrap();
        assert_eq!(outcome.recorded_status, Some(ScreeningStatus::Shortlisted));

        let table = stored(&tracker, &partition);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].get(columns::SCREENING_STATUS), "Shortlisted");
        assert_eq!(table.rows()[0].get(columns::SHORTLISTED_CV_PATH), "/cv/jane.pdf");
        assert_eq!(table.rows()[1].get(columns::SCREENING_STATUS), "Duplicate Profile");
        assert_eq!(table.rows()[1].get(columns::SHORTLISTED_CV_PATH), "");
    }

    #[test]
    fn test_override_of_duplicate_row_is_refused() {
        let (_dir, tracker, partition) = setup();
        tracker
            .submit(&partition, &submission(jane(), "Acme", Decision::Rejected))
            .unwrap();
        tracker
            .submit(&partition, &submission(jane(), "Beta", Decision::Rejected))
            .unwrap();

        let mut fix = submission(jane(), "Beta", Decision::Shortlisted);
        fix.admin_override = true;
        fix.shortlisted_cv_path = Some("/cv/jane.pdf".to_string());
        let outcome = tracker.submit(&partition, &fix).unwrap();

        assert!(!outcome.was_added);
        assert_eq!(outcome.reason_code, ReasonCode::AlreadyExists);
        assert_eq!(outcome.current_status, Some(ScreeningStatus::DuplicateProfile));
        assert_eq!(outcome.recorded_status, None);

        let table = stored(&tracker, &partition);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].get(columns::SCREENING_STATUS), "Rejected");
        assert_eq!(table.rows()[1].get(columns::SCREENING_STATUS), "Duplicate Profile");
        assert_eq!(table.rows()[1].get(columns::SHORTLISTED_CV_PATH), "");
    }

    #[test]
    fn test_ambiguous_name_vendor_override_changes_nothing() {
        let (_dir, tracker, partition) = setup();
        // Two phone-less rows for the same name and vendor, written by hand.
        let mut table = Table::default();
        for email in ["one@x.com", "two@x.com"] {
            table.append(vec![
                (columns::VENDOR_NAME.to_string(), "Acme".to_string()),
                (columns::CANDIDATE_NAME.to_string(), "Sam Lee".to_string()),
                (columns::EMAIL.to_string(), email.to_string()),
                (columns::SCREENING_STATUS.to_string(), "Rejected".to_string()),
            ]);
        }
        schema::conform(&mut table);
        partition.ensure_layout().unwrap();
        tracker.store().persist(&partition.store_path(), &table).unwrap();

        let mut fix = submission(fields(None, Some("Sam Lee"), None), "Acme", Decision::Shortlisted);
        fix.admin_override = true;
        let outcome = tracker.submit(&partition, &fix).unwrap();

        assert!(!outcome.was_added);
        assert_eq!(outcome.reason_code.to_string(), "name_and_vendor_same_vendor");
        assert_eq!(outcome.current_status, Some(ScreeningStatus::Rejected));
        let after = stored(&tracker, &partition);
        assert_eq!(after.len(), 2);
        assert!(after
            .rows()
            .iter()
            .all(|r| r.get(columns::SCREENING_STATUS) == "Rejected"));
    }

    #[test]
    fn test_tiered_matching_properties() {
        let (_dir, tracker, partition) = setup();
        let base = fields(None, Some("Ravi Kumar"), Some("+91 98765-43210"));
        tracker
            .submit(&partition, &submission(base, "Acme", Decision::Rejected))
            .unwrap();

        // No email, same name + phone from another vendor: duplicate.
        let by_phone = tracker
            .submit(
                &partition,
                &submission(
                    fields(Some("Not Found"), Some("ravi kumar"), Some("+919876543210")),
                    "Beta",
                    Decision::Shortlisted,
                ),
            )
            .unwrap();
        assert_eq!(by_phone.reason_code.to_string(), "name_and_phone_different_vendor");

        let (_dir2, tracker, partition) = setup();
        tracker
            .submit(
                &partition,
                &submission(fields(None, Some("Ravi Kumar"), None), "Acme", Decision::Rejected),
            )
            .unwrap();

        // No email, no phone, same name + vendor: blocked.
        let same_vendor = tracker
            .submit(
                &partition,
                &submission(fields(None, Some("Ravi Kumar"), None), "Acme", Decision::Shortlisted),
            )
            .unwrap();
        assert!(!same_vendor.was_added);
        assert_eq!(same_vendor.reason_code.to_string(), "name_and_vendor_same_vendor");

        // No email, no phone, same name, other vendor: unique.
        let other_vendor = tracker
            .submit(
                &partition,
                &submission(fields(None, Some("Ravi Kumar"), None), "Beta", Decision::Shortlisted),
            )
            .unwrap();
        assert!(other_vendor.was_added);
        assert_eq!(other_vendor.reason_code, ReasonCode::None);
        assert_eq!(other_vendor.profile_remark, Some(ProfileRemark::UniqueProfile));
    }

    #[test]
    fn test_name_vendor_fallback_disabled_allows_resubmission() {
        let dir = tempdir().unwrap();
        let partition = Partition::new(dir.path(), Some("QA"));
        let tracker = Tracker::xlsx(TrackerSettings {
            name_vendor_fallback: false,
            ..TrackerSettings::default()
        });
        let s = submission(fields(None, Some("Ravi Kumar"), None), "Acme", Decision::Rejected);
        tracker.submit(&partition, &s).unwrap();
        let second = tracker.submit(&partition, &s).unwrap();
        assert!(second.was_added);
        assert_eq!(stored(&tracker, &partition).len(), 2);
    }

    #[test]
    fn test_column_contract_after_mixed_operations() {
        let (_dir, tracker, partition) = setup();
        tracker
            .submit(&partition, &submission(jane(), "Acme", Decision::Shortlisted))
            .unwrap();
        tracker
            .submit(&partition, &submission(jane(), "Beta", Decision::Rejected))
            .unwrap();
        let mut fix = submission(jane(), "Acme", Decision::Rejected);
        fix.admin_override = true;
        tracker.submit(&partition, &fix).unwrap();

        let table = stored(&tracker, &partition);
        let cols = table.columns();
        assert_eq!(&cols[..3], &LEADING_COLUMNS.map(String::from));
        assert_eq!(
            &cols[cols.len() - MANUAL_COLUMNS.len()..],
            &MANUAL_COLUMNS.map(String::from)
        );
        let email = cols.iter().position(|c| c == columns::EMAIL).unwrap();
        assert_eq!(cols[email + 1], columns::POSITION);
    }

    #[test]
    fn test_manual_columns_survive_appends() {
        let (_dir, tracker, partition) = setup();
        tracker
            .submit(&partition, &submission(jane(), "Acme", Decision::Shortlisted))
            .unwrap();

        let path = partition.store_path();
        let mut table = tracker.store().load(&path).unwrap();
        table.update_in_place(0, vec![(columns::R1_STATUS.to_string(), "Selected".to_string())]);
        tracker.store().persist(&path, &table).unwrap();

        tracker
            .submit(
                &partition,
                &submission(fields(Some("b@x.com"), Some("Bob"), None), "Acme", Decision::Rejected),
            )
            .unwrap();
        let table = stored(&tracker, &partition);
        assert_eq!(table.rows()[0].get(columns::R1_STATUS), "Selected");
        assert_eq!(table.rows()[1].get(columns::R1_STATUS), "");
    }

    #[test]
    fn test_legacy_tracker_is_migrated_on_write() {
        let (_dir, tracker, partition) = setup();
        partition.ensure_layout().unwrap();
        let mut legacy = Table::default();
        legacy.append(vec![
            (columns::CANDIDATE_NAME.to_string(), "Old Timer".to_string()),
            (columns::EMAIL.to_string(), "old@x.com".to_string()),
            ("Date_Shortlisted".to_string(), "2023-01-05".to_string()),
            (columns::SCREENING_STATUS.to_string(), "Shortlisted".to_string()),
        ]);
        tracker.store().persist(&partition.store_path(), &legacy).unwrap();

        tracker
            .submit(&partition, &submission(jane(), "Acme", Decision::Rejected))
            .unwrap();

        let table = stored(&tracker, &partition);
        assert!(!table.has_column("Date_Shortlisted"));
        assert_eq!(table.rows()[0].get(columns::SCREENING_DATE), "2023-01-05");
        for column in MANUAL_COLUMNS {
            assert!(table.has_column(column));
        }
    }

    #[test]
    fn test_corrupt_store_policy() {
        let (_dir, tracker, partition) = setup();
        partition.ensure_layout().unwrap();
        std::fs::write(partition.store_path(), b"garbage").unwrap();

        let strict = Tracker::xlsx(TrackerSettings {
            strict_load: true,
            ..TrackerSettings::default()
        });
        let err = strict
            .submit(&partition, &submission(jane(), "Acme", Decision::Rejected))
            .unwrap_err();
        assert!(matches!(err, TrackerError::StoreUnreadable { .. }));

        let outcome = tracker
            .submit(&partition, &submission(jane(), "Acme", Decision::Rejected))
            .unwrap();
        assert!(outcome.was_added);
        assert_eq!(stored(&tracker, &partition).len(), 1);
    }

    #[test]
    fn test_out_of_range_score_is_rejected() {
        let (_dir, tracker, partition) = setup();
        let mut s = submission(jane(), "Acme", Decision::Rejected);
        s.similarity_score = 1.5;
        let err = tracker.submit(&partition, &s).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidInput(_)));
        assert!(!partition.store_path().exists());
    }

    #[test]
    fn test_check_status_is_read_only() {
        let (_dir, tracker, partition) = setup();
        let before = tracker.check_status(&partition, &jane(), Some("Acme")).unwrap();
        assert!(!before.exists);
        assert!(!partition.store_path().exists());

        tracker
            .submit(&partition, &submission(jane(), "Acme", Decision::Shortlisted))
            .unwrap();
        let same = tracker.check_status(&partition, &jane(), Some("ACME")).unwrap();
        assert!(same.exists);
        assert_eq!(same.reason_code.to_string(), "email_same_vendor");
        assert_eq!(same.current_status, Some(ScreeningStatus::Shortlisted));

        let other = tracker.check_status(&partition, &jane(), Some("Beta")).unwrap();
        assert_eq!(other.reason_code.to_string(), "email_different_vendor");
        assert_eq!(stored(&tracker, &partition).len(), 1);
    }

    #[test]
    fn test_partitions_are_independent() {
        let dir = tempdir().unwrap();
        let tracker = Tracker::xlsx(TrackerSettings::default());
        let rust = Partition::new(dir.path(), Some("Rust Engineer"));
        let qa = Partition::new(dir.path(), Some("QA Engineer"));

        tracker
            .submit(&rust, &submission(jane(), "Acme", Decision::Shortlisted))
            .unwrap();
        let outcome = tracker
            .submit(&qa, &submission(jane(), "Acme", Decision::Shortlisted))
            .unwrap();
        assert!(outcome.was_added);
        assert_eq!(outcome.reason_code, ReasonCode::None);
    }

    #[test]
    fn test_concurrent_submissions_are_not_lost() {
        let (_dir, tracker, partition) = setup();
        std::thread::scope(|s| {
            for i in 0..12 {
                let tracker = &tracker;
                let partition = &partition;
                s.spawn(move || {
                    let email = format!("c{i}@x.com");
                    let name = format!("Batch Candidate {i}");
                    tracker
                        .submit(
                            partition,
                            &submission(
                                fields(Some(email.as_str()), Some(name.as_str()), None),
                                "Acme",
                                Decision::Rejected,
                            ),
                        )
                        .unwrap();
                });
            }
        });
        assert_eq!(stored(&tracker, &partition).len(), 12);
    }

    #[test]
    fn test_name_vendor_tier_blocks_phoneless_resubmission_with_new_email() {
        let (_dir, tracker, partition) = setup();
        tracker
            .submit(
                &partition,
                &submission(fields(Some("first@x.com"), Some("Batch"), None), "Acme", Decision::Rejected),
            )
            .unwrap();

        let second = tracker
            .submit(
                &partition,
                &submission(fields(Some("second@x.com"), Some("Batch"), None), "Acme", Decision::Shortlisted),
            )
            .unwrap();
        assert!(!second.was_added);
        assert_eq!(second.reason_code.to_string(), "name_and_vendor_same_vendor");
        assert_eq!(stored(&tracker, &partition).len(), 1);
    }

    /// Store whose writes always fail; used to check error propagation.
    struct ReadOnlyStore {
        loads: Mutex<usize>,
    }

    impl RecordStore for ReadOnlyStore {
        fn load(&self, _path: &Path) -> Result<Table, TrackerError> {
            *self.loads.lock().unwrap() += 1;
            Ok(Table::default())
        }

        fn persist(&self, path: &Path, _table: &Table) -> Result<(), TrackerError> {
            Err(TrackerError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ))
        }
    }

    #[test]
    fn test_persist_failure_propagates() {
        let dir = tempdir().unwrap();
        let partition = Partition::new(dir.path(), Some("Ops"));
        let store = Arc::new(ReadOnlyStore {
            loads: Mutex::new(0),
        });
        let tracker = Tracker::new(store.clone(), TrackerSettings::default());

        let err = tracker
            .submit(&partition, &submission(jane(), "Acme", Decision::Shortlisted))
            .unwrap_err();
        assert!(matches!(err, TrackerError::Io { .. }));
        assert_eq!(*store.loads.lock().unwrap(), 1);
    }
}
