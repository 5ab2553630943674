//! Database query operations organized by entity

pub mod collections;
pub mod positions;
pub mod tracks;

pub use collections::{
    create_collection, delete_collection, get_collection, get_favorite_collections,
    list_collections, set_favorite, update_skip_settings,
};
pub use positions::{delete_position, get_latest_position, get_position, upsert_position};
pub use tracks::{
    create_track, delete_track, get_collection_tracks, get_track, update_track_duration,
    update_track_ordinal,
};
