use crate::models::award::AwardableRecord;

/// Whether `current` should be credited now.
///
/// Only the current image is consulted: the decision is keyed on the
/// terminal `coins_awarded` flag, never on what the state used to be, so a
/// record created already confirmed, a collapsed multi-step change, or a
/// duplicate/reordered delivery all resolve the same way. `previous` is
/// accepted for callers that have it and for logging.
pub fn should_award<R: AwardableRecord>(_previous: Option<&R>, current: &R) -> bool {
    current.is_qualifying() && !current.coins_awarded()
}
