use image::RgbaImage;
use tokio::sync::watch;

/// Drawable image handle tied to a favicon request URL.
///
/// The handle is either already complete or still loading. Completion is a
/// single-shot signal: [`IconImage::pixels`] returns immediately for a
/// complete image and otherwise suspends on a watch channel scoped to the
/// call, so the registration disappears with the call itself instead of
/// lingering on the handle.
#[derive(Debug, Clone)]
pub struct IconImage {
    url: String,
    state: watch::Receiver<Option<RgbaImage>>,
}

impl IconImage {
    /// Wraps pixel data that is already fully loaded.
    pub fn completed(url: impl Into<String>, pixels: RgbaImage) -> Self {
        let (_, state) = watch::channel(Some(pixels));
        Self {
            url: url.into(),
            state,
        }
    }

    /// Creates a still-loading handle together with the loader side that
    /// completes it.
    pub fn pending(url: impl Into<String>) -> (Self, IconLoad) {
        let (sender, state) = watch::channel(None);
        (
            Self {
                url: url.into(),
                state,
            },
            IconLoad { sender },
        )
    }

    /// The favicon request URL this image was resolved from.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns `true` when the image data is ready to rasterize.
    pub fn is_complete(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Returns the pixel data, waiting for the load signal when the image
    /// is still in flight.
    ///
    /// There is no timeout: if the loader is dropped without ever
    /// completing, this future never resolves. Callers that need a deadline
    /// must impose their own.
    pub async fn pixels(&self) -> RgbaImage {
        let mut state = self.state.clone();
        {
            let current = state.borrow_and_update();
            if let Some(pixels) = current.as_ref() {
                return pixels.clone();
            }
        }
        loop {
            if state.changed().await.is_err() {
                // The loader went away without completing the image; the
                // load signal can never fire now.
                std::future::pending::<()>().await;
            }
            let current = state.borrow_and_update();
            if let Some(pixels) = current.as_ref() {
                return pixels.clone();
            }
        }
    }
}

/// Loader side of a pending [`IconImage`]. Completing consumes the loader,
/// so the signal can fire at most once.
#[derive(Debug)]
pub struct IconLoad {
    sender: watch::Sender<Option<RgbaImage>>,
}

impl IconLoad {
    /// Marks the image as fully loaded and wakes every pending
    /// [`IconImage::pixels`] call.
    pub fn complete(self, pixels: RgbaImage) {
        let _ = self.sender.send(Some(pixels));
    }
}
