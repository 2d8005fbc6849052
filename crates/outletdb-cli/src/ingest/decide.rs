//! Insert, skip, or reject for one extracted candidate.

use outletdb_core::{normalize_candidate, CandidateRecord, Decision, SkipReason};
use outletdb_db::{DbError, OutletStore};

/// Normalizes `candidate` and checks its identity key against `store`.
///
/// Rejection and duplicate detection are ordinary outcomes; only a failed
/// storage lookup is an error.
pub(crate) async fn process<St>(candidate: &CandidateRecord, store: &St) -> Result<Decision, DbError>
where
    St: OutletStore + ?Sized,
{
    let outlet = match normalize_candidate(candidate) {
        Ok(outlet) => outlet,
        Err(reason) => return Ok(Decision::Reject(reason)),
    };

    if store.identity_exists(&outlet.identity_key).await? {
        return Ok(Decision::Skip(SkipReason::DuplicateIdentity {
            identity_key: outlet.identity_key,
        }));
    }

    Ok(Decision::Insert(outlet))
}
