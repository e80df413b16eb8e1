//! Tier-based routing and identity-scoped data fetching.

mod router;

pub use router::{AccessError, AccessRouter, Fetch, HomeContent, HomeView, ViewPlan};
