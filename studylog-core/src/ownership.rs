use crate::{CardId, EngineError, ReviewStore, UserId};
use std::collections::BTreeSet;

/// Confirms every referenced card belongs to `user_id` and is not
/// soft-deleted. One store read for the whole (de-duplicated) set; if any id
/// is missing the batch fails as a unit and the error enumerates the
/// offending ids so the caller can say which cards were rejected.
pub async fn verify_ownership(
    store: &dyn ReviewStore,
    user_id: UserId,
    card_ids: &[CardId],
) -> Result<(), EngineError> {
    let distinct: BTreeSet<CardId> = card_ids.iter().copied().collect();
    if distinct.is_empty() {
        return Ok(());
    }

    let ids: Vec<CardId> = distinct.into_iter().collect();
    let owned = store.owned_card_ids(user_id, &ids).await?;

    let missing: Vec<CardId> = ids.into_iter().filter(|id| !owned.contains(id)).collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(EngineError::CardsNotFound(missing))
    }
}
