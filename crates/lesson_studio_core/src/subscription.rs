//! crates/lesson_studio_core/src/subscription.rs
//!
//! The single reducer that merges `usage_limits` metadata from generation
//! responses into the subscription state. Every response that carries the
//! metadata goes through here; nothing else recomputes quota client-side.

use tracing::info;

use crate::domain::{SubscriptionState, UsageLimits};

/// Applies one `usage_limits` payload to the subscription state.
///
/// Within the sequentially processed fan-out this is a deterministic
/// last-writer merge. `downloads_remaining` is untouched; the outline
/// contract does not carry it.
pub fn apply_usage_limits(state: &mut SubscriptionState, limits: &UsageLimits) {
    state.generations_left = limits.generations_left;
    state.is_premium = limits.is_premium;
    if limits.reset_time.is_some() {
        state.reset_time = limits.reset_time;
    }
    if limits.user_tier.is_some() {
        state.user_tier = limits.user_tier.clone();
    }
    info!(
        generations_left = state.generations_left,
        is_premium = state.is_premium,
        "Applied usage limits from response"
    );
}
