use favlens_core::types::IconRequest;

use crate::image::IconImage;

/// Favicon cache resolver exposed by the host browser.
///
/// Resolution always yields an image: a real cached favicon or the host's
/// built-in placeholder bitmap. There is no explicit "not found" signal;
/// that ambiguity is the entire reason [`crate::probe::IconProbe`] exists.
pub trait IconCache {
    fn fetch_icon(&self, request: &IconRequest) -> IconImage;
}
