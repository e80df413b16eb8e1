use crate::catalog::{ContentItem, ContentKind, Playlist, Tier};
use crate::session::{Session, SessionLookup};
use crate::store::{CredentialStore, StoreError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum AccessError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("the plan has no content to fetch")]
    LoginRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HomeView {
    FreeHome,
    PremiumHome,
}

impl HomeView {
    pub fn for_tier(tier: Tier) -> HomeView {
        match tier {
            Tier::Free => HomeView::FreeHome,
            Tier::Premium => HomeView::PremiumHome,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            HomeView::FreeHome => "/home/free",
            HomeView::PremiumHome => "/home/premium",
        }
    }
}

/// A data requirement of a view. Playlists carry no identity: they are
/// always fetched for the session executing the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fetch {
    Tracks,
    Podcasts,
    OwnPlaylists,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewPlan {
    Login,
    Home { view: HomeView, fetches: Vec<Fetch> },
}

/// Data handed to the presenter for a home view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HomeContent {
    pub view: HomeView,
    pub identity: String,
    pub tier: Tier,
    pub tracks: Vec<ContentItem>,
    pub podcasts: Vec<ContentItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlists: Option<Vec<Playlist>>,
}

#[derive(Clone)]
pub struct AccessRouter {
    store: Arc<dyn CredentialStore>,
}

impl AccessRouter {
    pub fn new(store: Arc<dyn CredentialStore>) -> AccessRouter {
        AccessRouter { store }
    }

    pub fn route(&self, lookup: &SessionLookup) -> ViewPlan {
        let Some(session) = lookup.session() else {
            return ViewPlan::Login;
        };
        let view = HomeView::for_tier(session.tier);
        let fetches = match session.tier {
            Tier::Free => vec![Fetch::Tracks, Fetch::Podcasts],
            Tier::Premium => vec![Fetch::Tracks, Fetch::Podcasts, Fetch::OwnPlaylists],
        };
        ViewPlan::Home { view, fetches }
    }

    pub fn execute(&self, plan: &ViewPlan, session: &Session) -> Result<HomeContent, AccessError> {
        let ViewPlan::Home { view, fetches } = plan else {
            return Err(AccessError::LoginRequired);
        };

        let mut content = HomeContent {
            view: *view,
            identity: session.identity.clone(),
            tier: session.tier,
            tracks: vec![],
            podcasts: vec![],
            playlists: None,
        };
        for fetch in fetches {
            match fetch {
                Fetch::Tracks => content.tracks = self.fetch_tracks()?,
                Fetch::Podcasts => content.podcasts = self.fetch_podcasts()?,
                Fetch::OwnPlaylists => content.playlists = self.fetch_playlists(session)?,
            }
        }
        debug!(
            "Executed {:?} for {}: {} tracks, {} podcasts",
            view,
            session.handle.short(),
            content.tracks.len(),
            content.podcasts.len()
        );
        Ok(content)
    }

    pub fn fetch_tracks(&self) -> Result<Vec<ContentItem>, AccessError> {
        Ok(self.store.list_content_by_kind(ContentKind::Track)?)
    }

    pub fn fetch_podcasts(&self) -> Result<Vec<ContentItem>, AccessError> {
        Ok(self.store.list_content_by_kind(ContentKind::Podcast)?)
    }

    /// Playlists owned by the session's identity. `None` for free sessions.
    pub fn fetch_playlists(&self, session: &Session) -> Result<Option<Vec<Playlist>>, AccessError> {
        if session.tier != Tier::Premium {
            warn!(
                "Refusing playlists to free session {}",
                session.handle.short()
            );
            return Ok(None);
        }
        Ok(Some(self.store.list_playlists_by_owner(&session.identity)?))
    }
}
