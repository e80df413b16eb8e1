//! Security-relevant events, emitted on the `audit` tracing target so they can
//! be filtered or routed separately (`LOG_LEVEL=audit=info`).
//!
//! Secrets never appear here. Session handles are reduced to a short prefix.

use crate::catalog::Tier;
use tracing::{error, info, warn};

pub fn login_accepted(identity: &str, account_id: usize) {
    info!(target: "audit", identity, account_id, "login accepted");
}

pub fn login_rejected(identity: &str, reason: &str) {
    warn!(target: "audit", identity, reason, "login rejected");
}

pub fn login_failed(identity: &str, cause: &str) {
    error!(target: "audit", identity, cause, "login could not be evaluated");
}

pub fn duplicate_identity(identity: &str, matches: usize) {
    error!(
        target: "audit",
        identity,
        matches,
        "identity matches more than one account"
    );
}

pub fn session_created(handle_prefix: &str, identity: &str, tier: Tier) {
    info!(
        target: "audit",
        session = handle_prefix,
        identity,
        tier = %tier,
        "session created"
    );
}

pub fn session_destroyed(handle_prefix: &str) {
    info!(target: "audit", session = handle_prefix, "session destroyed");
}

pub fn session_expired(handle_prefix: &str, identity: &str) {
    info!(target: "audit", session = handle_prefix, identity, "session expired");
}

pub fn sessions_pruned(count: usize) {
    info!(target: "audit", count, "expired sessions pruned");
}
