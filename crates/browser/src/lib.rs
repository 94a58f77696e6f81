//! Host-browser seams for the favicon cache auditor.
//!
//! The auditor never talks to a real browser directly. It consumes three
//! narrow contracts (a bookmark source, a favicon cache resolver, and a
//! tab lifecycle service) plus an image handle with a single-shot load
//! signal. [`sim::SimBrowser`] is the in-process host implementation used
//! by the application and the tests.

pub mod bookmarks;
pub mod icon_cache;
pub mod image;
pub mod probe;
pub mod recovery;
pub mod sim;
pub mod tabs;
