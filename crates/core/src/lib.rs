//! Pure domain layer for the favicon cache auditor.
//!
//! Holds the deterministic favicon-cache request convention, the offscreen
//! raster surface used to compare icon bitmaps, and the bookmark tree
//! traversal. Everything here is synchronous and host-independent; the
//! browser seams live in `favlens-browser`.

pub mod bookmarks;
pub mod raster;
pub mod types;
