//! Conflict Classifier: interprets resolver matches against the submitting vendor.

use serde::{Serialize, Serializer};

use crate::models::candidate::{ProfileRemark, ScreeningStatus};
use crate::tracker::identity::{MatchTier, Resolution, RowKey};
use crate::tracker::schema::columns;
use crate::tracker::table::Table;

/// The existing row a duplicate classification points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingMatch {
    pub tier: MatchTier,
    pub row: usize,
    pub status: Option<ScreeningStatus>,
    pub remark: Option<ProfileRemark>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Unique,
    /// Same identity already submitted by this vendor: first decision stands.
    SameVendorDuplicate(ExistingMatch),
    /// Same identity known only through other vendors. The match is the first
    /// matched row and is informational only.
    DifferentVendorDuplicate(ExistingMatch),
}

impl Classification {
    pub fn reason(&self) -> ReasonCode {
        match self {
            Classification::Unique => ReasonCode::None,
            Classification::SameVendorDuplicate(m) => ReasonCode::SameVendor(m.tier),
            Classification::DifferentVendorDuplicate(m) => ReasonCode::DifferentVendor(m.tier),
        }
    }
}

/// Machine-readable outcome reason handed back to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    /// Serialized as the empty string.
    None,
    AlreadyExists,
    SameVendor(MatchTier),
    DifferentVendor(MatchTier),
    StatusUpdated,
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReasonCode::None => Ok(()),
            ReasonCode::AlreadyExists => f.write_str("already_exists"),
            ReasonCode::SameVendor(tier) => write!(f, "{}_same_vendor", tier.key()),
            ReasonCode::DifferentVendor(tier) => write!(f, "{}_different_vendor", tier.key()),
            ReasonCode::StatusUpdated => f.write_str("status_updated"),
        }
    }
}

impl Serialize for ReasonCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A same-vendor row anywhere in the match set wins over different-vendor rows.
///
/// Vendors compare after normalization; two house (vendor-less) submissions
/// count as the same vendor. Earlier trackers never matched an empty vendor,
/// so a repeated house submission there became a duplicate-profile row; here
/// it is blocked like any other same-vendor resubmission.
pub fn classify(table: &Table, resolution: Option<&Resolution>, vendor: Option<&str>) -> Classification {
    let Some(resolution) = resolution else {
        return Classification::Unique;
    };
    let Some(&first) = resolution.rows.first() else {
        return Classification::Unique;
    };

    let existing = |row: usize| {
        let stored = table.row(row);
        ExistingMatch {
            tier: resolution.tier,
            row,
            status: stored.and_then(|r| ScreeningStatus::parse(r.get(columns::SCREENING_STATUS))),
            remark: stored.and_then(|r| ProfileRemark::parse(r.get(columns::PROFILE_REMARK))),
        }
    };

    let same_vendor = resolution.rows.iter().copied().find(|&idx| {
        table
            .row(idx)
            .map(|row| RowKey::of(row).vendor.as_deref() == vendor)
            .unwrap_or(false)
    });

    match same_vendor {
        Some(idx) => Classification::SameVendorDuplicate(existing(idx)),
        None => Classification::DifferentVendorDuplicate(existing(first)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(&str, &str, &str)]) -> Table {
        let mut table = Table::default();
        for (email, vendor, status) in rows {
            table.append(vec![
                (columns::EMAIL.to_string(), email.to_string()),
                (columns::VENDOR_NAME.to_string(), vendor.to_string()),
                (columns::SCREENING_STATUS.to_string(), status.to_string()),
            ]);
        }
        table
    }

    fn resolution(rows: Vec<usize>) -> Resolution {
        Resolution {
            tier: MatchTier::Email,
            rows,
        }
    }

    #[test]
    fn test_no_resolution_is_unique() {
        let t = table(&[]);
        assert_eq!(classify(&t, None, Some("acme")), Classification::Unique);
        assert_eq!(classify(&t, None, Some("acme")).reason().to_string(), "");
    }

    #[test]
    fn test_same_vendor_wins_in_mixed_match_set() {
        let t = table(&[
            ("a@x.com", "Beta", "Duplicate Profile"),
            ("a@x.com", "Acme", "Shortlisted"),
        ]);
        let c = classify(&t, Some(&resolution(vec![0, 1])), Some("acme"));
        match &c {
            Classification::SameVendorDuplicate(m) => {
                assert_eq!(m.row, 1);
                assert_eq!(m.status, Some(ScreeningStatus::Shortlisted));
            }
            other => panic!("expected same vendor, got {other:?}"),
        }
        assert_eq!(c.reason().to_string(), "email_same_vendor");
    }

    #[test]
    fn test_different_vendor_reports_first_match() {
        let t = table(&[
            ("a@x.com", "Beta", "Rejected"),
            ("a@x.com", "Gamma", "Duplicate Profile"),
        ]);
        let c = classify(&t, Some(&resolution(vec![0, 1])), Some("acme"));
        match &c {
            Classification::DifferentVendorDuplicate(m) => {
                assert_eq!(m.row, 0);
                assert_eq!(m.status, Some(ScreeningStatus::Rejected));
            }
            other => panic!("expected different vendor, got {other:?}"),
        }
        assert_eq!(c.reason().to_string(), "email_different_vendor");
    }

    #[test]
    fn test_house_submissions_share_a_vendor() {
        let t = table(&[("a@x.com", "", "Rejected")]);
        let c = classify(&t, Some(&resolution(vec![0])), None);
        assert!(matches!(c, Classification::SameVendorDuplicate(_)));
    }

    #[test]
    fn test_reason_code_serializes_as_string() {
        let json = serde_json::to_string(&ReasonCode::SameVendor(MatchTier::NameAndPhone)).unwrap();
        assert_eq!(json, "\"name_and_phone_same_vendor\"");
        assert_eq!(serde_json::to_string(&ReasonCode::None).unwrap(), "\"\"");
    }
}
