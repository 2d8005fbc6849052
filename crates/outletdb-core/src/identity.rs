//! Candidate validation and the identity key used for deduplication.

use sha2::{Digest, Sha256};

use crate::outlet::{CandidateRecord, NewOutlet, RejectReason};
use crate::text::{clean_display_text, collapse_whitespace, fold_key};

/// Derives the stable identity key for an outlet.
///
/// The key is the SHA-256 hex digest of the case-folded, whitespace-collapsed
/// name and address joined by a NUL byte. Contact details, facilities and
/// the map link never contribute.
#[must_use]
pub fn make_identity_key(name: &str, address: &str) -> String {
    let input = format!("{}\x00{}", fold_key(name), fold_key(address));
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Cleans a scraped candidate into a [`NewOutlet`].
///
/// Display fields keep their original casing. A blank telephone becomes
/// `None`; facility labels are collapsed, blanks dropped and repeats removed
/// keeping first-seen order. Map links that are not `http(s)` URLs are dropped.
///
/// # Errors
///
/// Returns [`RejectReason::EmptyName`] or [`RejectReason::EmptyAddress`] when
/// the field is empty after cleanup.
pub fn normalize_candidate(candidate: &CandidateRecord) -> Result<NewOutlet, RejectReason> {
    let name = clean_display_text(&candidate.name);
    if name.is_empty() {
        return Err(RejectReason::EmptyName);
    }
    let address = clean_display_text(&candidate.address);
    if address.is_empty() {
        return Err(RejectReason::EmptyAddress);
    }

    let telephone = candidate
        .telephone
        .as_deref()
        .map(collapse_whitespace)
        .filter(|t| !t.is_empty());

    let mut facilities: Vec<String> = Vec::with_capacity(candidate.facilities.len());
    for label in candidate.facilities.iter().map(String::as_str).map(collapse_whitespace) {
        if !label.is_empty() && !facilities.contains(&label) {
            facilities.push(label);
        }
    }

    let map_link = candidate
        .map_link
        .as_deref()
        .map(str::trim)
        .filter(|link| link.starts_with("https://") || link.starts_with("http://"))
        .map(str::to_string);

    Ok(NewOutlet {
        identity_key: make_identity_key(&name, &address),
        name,
        address,
        telephone,
        facilities,
        map_link,
    })
}
