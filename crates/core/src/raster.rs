use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::RgbaImage;

use crate::types::RasterSample;

/// Fixed-size offscreen RGBA surface used to rasterize candidate icons into
/// comparable samples.
///
/// One surface is owned by one classifier for its entire lifetime: the
/// buffer is allocated once, cleared between draws, and never resized, so
/// every sample it produces is comparable with every other. Drawing takes
/// `&mut self`, which makes overlapping draw/readback on a shared surface
/// unrepresentable rather than a documented caller obligation.
#[derive(Debug)]
pub struct RasterSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterSurface {
    /// Allocates a surface of `width` x `height` pixels, cleared to
    /// transparent black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize) * 4],
        }
    }

    /// Square surface helper matching the favicon request size.
    pub fn square(size_px: u32) -> Self {
        Self::new(size_px, size_px)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Clears the surface, blits `image` at the top-left corner clipped to
    /// the surface bounds (no scaling), and serializes the result.
    pub fn draw(&mut self, image: &RgbaImage) -> RasterSample {
        self.pixels.fill(0);

        let rows = image.height().min(self.height);
        let cols = image.width().min(self.width);
        for y in 0..rows {
            for x in 0..cols {
                let src = image.get_pixel(x, y).0;
                let offset = ((y * self.width + x) * 4) as usize;
                self.pixels[offset..offset + 4].copy_from_slice(&src);
            }
        }

        RasterSample::new(format!(
            "{}x{}:{}",
            self.width,
            self.height,
            BASE64.encode(&self.pixels)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(rgba))
    }

    #[test]
    fn identical_images_produce_identical_samples() {
        let mut surface = RasterSurface::square(16);
        let icon = solid(16, 16, [10, 20, 30, 255]);
        let first = surface.draw(&icon);
        let second = surface.draw(&icon);
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_images_produce_distinct_samples() {
        let mut surface = RasterSurface::square(16);
        let red = surface.draw(&solid(16, 16, [255, 0, 0, 255]));
        let blue = surface.draw(&solid(16, 16, [0, 0, 255, 255]));
        assert_ne!(red, blue);
    }

    #[test]
    fn surface_is_cleared_between_draws() {
        let mut surface = RasterSurface::square(16);
        // A large opaque draw followed by a small one must not leak pixels
        // from the first into the second sample.
        let _ = surface.draw(&solid(16, 16, [255, 255, 255, 255]));
        let small_after_big = surface.draw(&solid(4, 4, [9, 9, 9, 255]));

        let mut fresh = RasterSurface::square(16);
        let small_on_fresh = fresh.draw(&solid(4, 4, [9, 9, 9, 255]));
        assert_eq!(small_after_big, small_on_fresh);
    }

    #[test]
    fn oversized_images_are_clipped_not_scaled() {
        let mut surface = RasterSurface::square(8);
        let sample = surface.draw(&solid(32, 32, [1, 2, 3, 255]));
        let mut reference = RasterSurface::square(8);
        let expected = reference.draw(&solid(8, 8, [1, 2, 3, 255]));
        assert_eq!(sample, expected);
    }

    #[test]
    fn sample_embeds_surface_dimensions() {
        let mut a = RasterSurface::square(16);
        let mut b = RasterSurface::square(32);
        let icon = solid(8, 8, [1, 1, 1, 255]);
        assert!(a.draw(&icon).as_str().starts_with("16x16:"));
        assert!(b.draw(&icon).as_str().starts_with("32x32:"));
        assert_ne!(a.draw(&icon), b.draw(&icon));
    }
}
