#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical cybercrime category taxonomy.
//!
//! This crate defines the small, fixed set of crime types that every
//! synthesized monthly record is broken down into. Raw labels from the
//! source category table are normalized into this taxonomy before any
//! proportions are computed.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Pseudo-category label meaning "no category filter".
pub const ALL_TYPES: &str = "All Types";

/// Canonical crime types.
///
/// Declaration order is the display order used by category listings and
/// by the per-category columns of every incident record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum CrimeType {
    /// Credential harvesting through deceptive messages or sites
    #[serde(rename = "Phishing")]
    #[strum(serialize = "Phishing")]
    Phishing,
    /// Malicious software and service disruption
    #[serde(rename = "Malware")]
    #[strum(serialize = "Malware")]
    Malware,
    /// Payment fraud over the unified payments interface
    #[serde(rename = "UPI Fraud")]
    #[strum(serialize = "UPI Fraud")]
    UpiFraud,
    /// Extortion by encrypting or withholding data
    #[serde(rename = "Ransomware")]
    #[strum(serialize = "Ransomware")]
    Ransomware,
    /// Theft or illicit trade of information
    #[serde(rename = "Data Breach")]
    #[strum(serialize = "Data Breach")]
    DataBreach,
    /// Impersonation and misuse of personal identity
    #[serde(rename = "Identity Theft")]
    #[strum(serialize = "Identity Theft")]
    IdentityTheft,
    /// Scams and exploitation carried out on social platforms
    #[serde(rename = "Social Media Scam")]
    #[strum(serialize = "Social Media Scam")]
    SocialMediaScam,
}

impl CrimeType {
    /// The category raw labels fall back to when they have no explicit
    /// mapping.
    pub const FALLBACK: Self = Self::Phishing;

    /// Returns all variants of this enum in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Phishing,
            Self::Malware,
            Self::UpiFraud,
            Self::Ransomware,
            Self::DataBreach,
            Self::IdentityTheft,
            Self::SocialMediaScam,
        ]
    }

    /// Number of canonical crime types.
    #[must_use]
    pub const fn count() -> usize {
        Self::all().len()
    }

    /// Parses a category filter string.
    ///
    /// Returns `None` for the [`ALL_TYPES`] pseudo-category and for labels
    /// that are not part of the taxonomy; callers treat both as "no
    /// category-specific data".
    #[must_use]
    pub fn from_filter(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.is_empty() || label == ALL_TYPES {
            return None;
        }
        label.parse().ok()
    }
}

/// Returns the category listing exposed to consumers: [`ALL_TYPES`] first,
/// then every canonical type in display order.
#[must_use]
pub fn category_labels() -> Vec<String> {
    std::iter::once(ALL_TYPES.to_string())
        .chain(CrimeType::all().iter().map(ToString::to_string))
        .collect()
}
