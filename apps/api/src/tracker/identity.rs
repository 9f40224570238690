//! Identity Resolver: decides which existing rows describe the same candidate.
//!
//! Matching runs in strict tier order and stops at the first tier with any hit:
//! 1. email
//! 2. name + phone (both required)
//! 3. name + submitting vendor, only when no phone was extracted
//!
//! Tier 3 trades false positives on common names for catching same-vendor
//! resubmissions of phone-less resumes. It can be switched off per tracker.

use serde::Serialize;

use crate::models::candidate::CandidateFields;
use crate::tracker::schema::columns;
use crate::tracker::table::{Row, Table};

/// Values the extractor or a spreadsheet round-trip uses for "no value".
const UNKNOWN_SENTINELS: [&str; 4] = ["", "not found", "nan", "none"];

pub fn is_unknown(raw: &str) -> bool {
    UNKNOWN_SENTINELS.contains(&raw.trim().to_lowercase().as_str())
}

/// Trimmed, lowercased text; `None` for sentinels.
pub fn normalize_text(raw: &str) -> Option<String> {
    let value = raw.trim().to_lowercase();
    (!UNKNOWN_SENTINELS.contains(&value.as_str())).then_some(value)
}

/// Like [`normalize_text`], then drops whitespace, parentheses and hyphens.
pub fn normalize_phone(raw: &str) -> Option<String> {
    normalize_text(raw)
        .map(|v| {
            v.chars()
                .filter(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | '-'))
                .collect::<String>()
        })
        .filter(|v| !v.is_empty())
}

/// Normalized vendor; `None` is a house (vendor-less) submission.
pub fn normalize_vendor(raw: Option<&str>) -> Option<String> {
    raw.and_then(normalize_text)
}

/// Matching key of a candidate, normalized once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl Identity {
    pub fn from_fields(fields: &CandidateFields) -> Self {
        Self {
            email: fields.email.as_deref().and_then(normalize_text),
            name: fields.candidate_name.as_deref().and_then(normalize_text),
            phone: fields.phone.as_deref().and_then(normalize_phone),
        }
    }

    pub fn from_row(row: &Row) -> Self {
        Self {
            email: normalize_text(row.get(columns::EMAIL)),
            name: normalize_text(row.get(columns::CANDIDATE_NAME)),
            phone: normalize_phone(row.get(columns::CONTACT_NUMBER)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.name.is_none() && self.phone.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Email,
    NameAndPhone,
    NameAndVendor,
}

impl MatchTier {
    /// Prefix used in reason codes, e.g. `email_same_vendor`.
    pub fn key(&self) -> &'static str {
        match self {
            MatchTier::Email => "email",
            MatchTier::NameAndPhone => "name_and_phone",
            MatchTier::NameAndVendor => "name_and_vendor",
        }
    }
}

/// Rows matched by the first tier that produced any hit, in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub tier: MatchTier,
    pub rows: Vec<usize>,
}

/// Normalized identity and vendor of a stored row.
#[derive(Debug, Clone)]
pub struct RowKey {
    pub identity: Identity,
    pub vendor: Option<String>,
}

impl RowKey {
    pub fn of(row: &Row) -> Self {
        Self {
            identity: Identity::from_row(row),
            vendor: normalize_vendor(Some(row.get(columns::VENDOR_NAME))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IdentityResolver {
    name_vendor_fallback: bool,
}

impl IdentityResolver {
    pub fn new(name_vendor_fallback: bool) -> Self {
        Self {
            name_vendor_fallback,
        }
    }

    /// Only the deterministic tiers (email, name + phone).
    pub fn strict() -> Self {
        Self::new(false)
    }

    pub fn resolve(
        &self,
        table: &Table,
        identity: &Identity,
        vendor: Option<&str>,
    ) -> Option<Resolution> {
        if table.is_empty() || identity.is_empty() {
            return None;
        }
        let keys: Vec<RowKey> = table.rows().iter().map(RowKey::of).collect();

        if let Some(email) = &identity.email {
            let rows = matching(&keys, |k| k.identity.email.as_ref() == Some(email));
            if !rows.is_empty() {
                return Some(Resolution {
                    tier: MatchTier::Email,
                    rows,
                });
            }
        }

        if let (Some(name), Some(phone)) = (&identity.name, &identity.phone) {
            let rows = matching(&keys, |k| {
                k.identity.name.as_ref() == Some(name) && k.identity.phone.as_ref() == Some(phone)
            });
            if !rows.is_empty() {
                return Some(Resolution {
                    tier: MatchTier::NameAndPhone,
                    rows,
                });
            }
        }

        if !self.name_vendor_fallback || identity.phone.is_some() {
            return None;
        }
        match (&identity.name, vendor) {
            (Some(name), Some(vendor)) => {
                let rows = matching(&keys, |k| {
                    k.identity.name.as_ref() == Some(name) && k.vendor.as_deref() == Some(vendor)
                });
                (!rows.is_empty()).then_some(Resolution {
                    tier: MatchTier::NameAndVendor,
                    rows,
                })
            }
            _ => None,
        }
    }
}

fn matching(keys: &[RowKey], pred: impl Fn(&RowKey) -> bool) -> Vec<usize> {
    keys.iter()
        .enumerate()
        .filter(|&(_, k)| pred(k))
        .map(|(i, _)| i)
        .collect()
}
