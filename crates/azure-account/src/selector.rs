//! Subscription selection
//!
//! Selection is additive: a call marks matching subscriptions as selected
//! and leaves every other flag alone, so repeated calls accumulate. Callers
//! wanting a clean slate reset the flags themselves. The selected view is
//! recomputed on every call, with or without requested IDs.

use tracing::debug;

use crate::entity::AccountEntity;

/// Mark subscriptions matching `requested_ids` (case-insensitive) as
/// selected and recompute the selected view.
pub fn select_subscriptions(entity: &mut AccountEntity, requested_ids: &[String]) {
    if !requested_ids.is_empty() && !entity.subscriptions.is_empty() {
        for subscription in &mut entity.subscriptions {
            if requested_ids
                .iter()
                .any(|id| id.eq_ignore_ascii_case(&subscription.id))
            {
                subscription.selected = true;
            }
        }
    }
    entity.selected_subscriptions = entity
        .subscriptions
        .iter()
        .filter(|s| s.selected)
        .cloned()
        .collect();
    debug!(
        selected = entity.selected_subscriptions.len(),
        total = entity.subscriptions.len(),
        "recomputed subscription selection"
    );
}
