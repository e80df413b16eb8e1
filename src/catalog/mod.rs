mod models;

pub use models::{ContentItem, ContentKind, Playlist, Tier};
