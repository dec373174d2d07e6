//! Battlegrounds card catalog mirror: paginated listing, per-card image
//! enrichment and artwork download, written to a local snapshot tree.

pub mod catalog;
pub mod config;
pub mod docs;
pub mod enrich;
pub mod media;
pub mod model;
pub mod oauth;
pub mod paged;
pub mod pipeline;
pub mod pool;
pub mod snapshot;
