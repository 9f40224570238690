//! CV-conversion bookkeeping on top of the tracker.
//!
//! Conversion never creates records. It looks a candidate up by the
//! deterministic tiers only (email, then name + phone) and stamps the first
//! matching row.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::candidate::{CandidateFields, CandidateRecord};
use crate::tracker::engine::Tracker;
use crate::tracker::identity::{is_unknown, Identity, IdentityResolver, MatchTier};
use crate::tracker::partition::Partition;
use crate::tracker::schema::{self, columns};
use crate::tracker::TrackerError;

pub const CONVERTED: &str = "Converted";

/// Identifiers a converter has for a candidate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversionLookup {
    pub email: Option<String>,
    pub candidate_name: Option<String>,
    pub contact_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionUpdate {
    pub row: usize,
    pub matched_by: MatchTier,
    pub candidate_name: Option<String>,
}

impl Tracker {
    /// Marks one candidate as converted and records where the output went.
    pub fn mark_cv_converted(
        &self,
        store_path: &Path,
        lookup: &ConversionLookup,
        converted_path: Option<&str>,
    ) -> Result<ConversionUpdate, TrackerError> {
        self.locks().with_lock(store_path, || {
            if !store_path.exists() {
                return Err(TrackerError::StoreMissing(store_path.to_path_buf()));
            }
            // Unreadable is always an error here, whatever the load policy.
            let mut table = self.store().load(store_path)?;
            if table.is_empty() {
                return Err(TrackerError::StoreEmpty(store_path.to_path_buf()));
            }
            schema::conform(&mut table);

            let identity = Identity::from_fields(&CandidateFields {
                candidate_name: lookup.candidate_name.clone(),
                email: lookup.email.clone(),
                phone: lookup.contact_number.clone(),
                ..Default::default()
            });
            let resolution = IdentityResolver::strict()
                .resolve(&table, &identity, None)
                .ok_or(TrackerError::CandidateNotFound)?;
            let row = *resolution
                .rows
                .first()
                .ok_or(TrackerError::CandidateNotFound)?;

            let mut cells = vec![(columns::CV_CONVERSION_STATUS.to_string(), CONVERTED.to_string())];
            if let Some(path) = converted_path.map(str::trim).filter(|p| !p.is_empty()) {
                cells.push((columns::CV_CONVERTED_PATH.to_string(), path.to_string()));
            }
            if !table.update_in_place(row, cells) {
                return Err(TrackerError::CandidateNotFound);
            }
            schema::conform(&mut table);
            self.store().persist(store_path, &table)?;

            let candidate_name = table
                .row(row)
                .map(|r| r.get(columns::CANDIDATE_NAME).to_string())
                .filter(|n| !is_unknown(n));
            info!(
                "Marked CV of {} as converted in {}",
                candidate_name.as_deref().unwrap_or("candidate"),
                store_path.display()
            );
            Ok(ConversionUpdate {
                row,
                matched_by: resolution.tier,
                candidate_name,
            })
        })
    }

    /// Candidates cleared in round two whose CV has not been converted yet.
    pub fn pending_conversions(&self, partition: &Partition) -> Result<Vec<CandidateRecord>, TrackerError> {
        let table = self.load_table(&partition.store_path())?;
        Ok(table
            .rows()
            .iter()
            .filter(|row| row.get(columns::R2_STATUS).trim().eq_ignore_ascii_case("selected"))
            .filter(|row| is_unknown(row.get(columns::CV_CONVERSION_STATUS)))
            .map(CandidateRecord::from_row)
            .collect())
    }
}
