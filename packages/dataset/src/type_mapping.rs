//! Raw category label mapping.
//!
//! Maps the motive-style labels of the category counts table to the
//! canonical [`CrimeType`] taxonomy. The mapping is many-to-one; labels
//! without an entry fall back to [`CrimeType::FALLBACK`].

use crime_forecast_crime_models::CrimeType;

/// Known raw labels and their canonical type.
const RAW_LABELS: &[(&str, CrimeType)] = &[
    ("Fraud", CrimeType::UpiFraud),
    ("Personal Revenge", CrimeType::IdentityTheft),
    ("Sexual Exploitation", CrimeType::SocialMediaScam),
    ("Anger", CrimeType::Phishing),
    ("Extortion", CrimeType::Ransomware),
    ("Causing Disrepute", CrimeType::Phishing),
    ("Prank", CrimeType::SocialMediaScam),
    ("Disrupt Public Service", CrimeType::Malware),
    ("Sale purchase illegal drugs", CrimeType::DataBreach),
    ("Developing own business", CrimeType::DataBreach),
    ("Spreading Piracy", CrimeType::DataBreach),
    ("Psycho or Pervert", CrimeType::IdentityTheft),
    ("Steal Information", CrimeType::DataBreach),
    ("Abetment to Suicide", CrimeType::IdentityTheft),
    ("Others", CrimeType::Phishing),
];

/// Maps a raw category label to its canonical crime type.
///
/// Matching ignores surrounding whitespace and ASCII case. Returns
/// [`CrimeType::FALLBACK`] when the label is unknown.
#[must_use]
pub fn map_raw_label(raw: &str) -> CrimeType {
    let raw = raw.trim();
    RAW_LABELS
        .iter()
        .find(|(label, _)| label.eq_ignore_ascii_case(raw))
        .map_or_else(
            || {
                log::debug!("Unmapped raw category '{raw}', using {}", CrimeType::FALLBACK);
                CrimeType::FALLBACK
            },
            |(_, crime_type)| *crime_type,
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_labels() {
        assert_eq!(map_raw_label("Fraud"), CrimeType::UpiFraud);
        assert_eq!(map_raw_label("Extortion"), CrimeType::Ransomware);
        assert_eq!(map_raw_label("Disrupt Public Service"), CrimeType::Malware);
        assert_eq!(map_raw_label("Steal Information"), CrimeType::DataBreach);
        assert_eq!(map_raw_label("Prank"), CrimeType::SocialMediaScam);
        assert_eq!(map_raw_label("Psycho or Pervert"), CrimeType::IdentityTheft);
    }

    #[test]
    fn matching_ignores_case_and_whitespace() {
        assert_eq!(map_raw_label("  personal revenge "), CrimeType::IdentityTheft);
    }

    #[test]
    fn unknown_fallback() {
        assert_eq!(map_raw_label("Political Motives"), CrimeType::Phishing);
    }

    #[test]
    fn every_type_has_a_source_label() {
        for crime_type in CrimeType::all() {
            assert!(
                RAW_LABELS.iter().any(|(_, t)| t == crime_type),
                "{crime_type:?} has no raw label"
            );
        }
    }
}
