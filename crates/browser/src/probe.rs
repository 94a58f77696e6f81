use tracing::debug;

use favlens_core::raster::RasterSurface;
use favlens_core::types::{IconRequest, RasterSample, Verdict};

use crate::icon_cache::IconCache;
use crate::image::IconImage;

/// Missing-icon detector: calibrates the host's placeholder bitmap once,
/// then classifies candidate icons against it by exact raster comparison.
///
/// The probe owns one fixed-size raster surface for its whole lifetime and
/// the calibrated placeholder sample is immutable after construction, so a
/// probe can never classify before calibration. `classify` takes `&mut
/// self`: overlapping classifications on one probe do not compile, which is
/// what keeps draw and readback atomic on the shared surface.
pub struct IconProbe {
    surface: RasterSurface,
    placeholder: RasterSample,
}

/// Classification result together with the sample fingerprint used in logs
/// and patches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub verdict: Verdict,
    pub fingerprint: String,
}

impl IconProbe {
    /// Calibrates a probe for `size_px` icons against `cache`.
    ///
    /// Requests the favicon of the empty domain, a guaranteed cache miss,
    /// and rasterizes the placeholder the host answers with. The load wait
    /// has no timeout: if the host never completes the placeholder image,
    /// calibration never resolves.
    pub async fn calibrate<C: IconCache>(cache: &C, size_px: u32) -> Self {
        let mut surface = RasterSurface::square(size_px);
        let image = cache.fetch_icon(&IconRequest::empty(size_px));
        let pixels = image.pixels().await;
        let placeholder = surface.draw(&pixels);
        debug!(
            size_px,
            fingerprint = %placeholder.fingerprint(),
            "placeholder calibrated"
        );
        Self {
            surface,
            placeholder,
        }
    }

    /// The calibrated placeholder sample, ground truth for this run.
    pub fn placeholder(&self) -> &RasterSample {
        &self.placeholder
    }

    /// Classifies `image`, waiting for its load signal when it is still in
    /// flight.
    ///
    /// Never fails for a valid, eventually-loading image; an image whose
    /// load never completes makes the call never resolve, mirroring the
    /// calibration contract.
    pub async fn classify(&mut self, image: &IconImage) -> Verdict {
        self.inspect(image).await.verdict
    }

    /// [`IconProbe::classify`] plus the sample fingerprint.
    pub async fn inspect(&mut self, image: &IconImage) -> Inspection {
        let pixels = image.pixels().await;
        let sample = self.surface.draw(&pixels);
        let verdict = if sample == self.placeholder {
            Verdict::Missing
        } else {
            Verdict::Icon
        };
        Inspection {
            verdict,
            fingerprint: sample.fingerprint(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{solid_icon, SimBrowser};
    use std::time::Duration;

    async fn probe_for(sim: &SimBrowser) -> IconProbe {
        IconProbe::calibrate(sim, 16).await
    }

    #[tokio::test]
    async fn placeholder_request_classifies_as_missing() {
        let sim = SimBrowser::new();
        let mut probe = probe_for(&sim).await;

        let image = sim.fetch_icon(&IconRequest::empty(16));
        assert_eq!(probe.classify(&image).await, Verdict::Missing);
    }

    #[tokio::test]
    async fn uncached_domain_classifies_as_missing() {
        let sim = SimBrowser::new();
        let mut probe = probe_for(&sim).await;

        let image = sim.fetch_icon(&IconRequest::new("nowhere.example", 16));
        assert_eq!(probe.classify(&image).await, Verdict::Missing);
    }

    #[tokio::test]
    async fn distinct_real_icons_classify_as_found() {
        let sim = SimBrowser::new();
        sim.install_icon("red.example", solid_icon([255, 0, 0]));
        sim.install_icon("blue.example", solid_icon([0, 0, 255]));
        let mut probe = probe_for(&sim).await;

        let red = sim.fetch_icon(&IconRequest::new("red.example", 16));
        let blue = sim.fetch_icon(&IconRequest::new("blue.example", 16));
        let red_inspection = probe.inspect(&red).await;
        let blue_inspection = probe.inspect(&blue).await;

        assert_eq!(red_inspection.verdict, Verdict::Icon);
        assert_eq!(blue_inspection.verdict, Verdict::Icon);
        assert_ne!(red_inspection.fingerprint, blue_inspection.fingerprint);
    }

    #[tokio::test]
    async fn classify_is_idempotent_for_a_loaded_image() {
        let sim = SimBrowser::new();
        sim.install_icon("stable.example", solid_icon([9, 9, 9]));
        let mut probe = probe_for(&sim).await;

        let image = sim.fetch_icon(&IconRequest::new("stable.example", 16));
        let first = probe.classify(&image).await;
        let second = probe.classify(&image).await;
        assert_eq!(first, second);
        assert_eq!(first, Verdict::Icon);
    }

    #[tokio::test(start_paused = true)]
    async fn classify_waits_for_a_still_loading_image() {
        let sim = SimBrowser::with_delays(
            Duration::from_millis(10),
            Some(Duration::from_millis(25)),
        );
        sim.install_icon("slow.example", solid_icon([5, 5, 5]));
        let mut probe = probe_for(&sim).await;

        let image = sim.fetch_icon(&IconRequest::new("slow.example", 16));
        assert!(!image.is_complete());
        assert_eq!(probe.classify(&image).await, Verdict::Icon);
    }

    #[tokio::test]
    async fn placeholder_sample_is_stable_across_calibrations() {
        let sim = SimBrowser::new();
        let first = probe_for(&sim).await;
        let second = probe_for(&sim).await;
        assert_eq!(first.placeholder(), second.placeholder());
    }
}
