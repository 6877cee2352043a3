//! Sample grids: `N` images tiled `per_row` to a row with zero padding.
//!
//! ```text
//! width  = cols · (w + pad) + pad
//! height = rows · (h + pad) + pad
//! ```
//!
//! Pixel values in `[0, 1]` map to `u8` as `clamp(v · 255 + 0.5, 0, 255)`.

use std::path::Path;

use candle_core::{DType, Tensor};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

use gan_common::{GanError, GanResult, ImageShape};
use gan_train::SampleSink;

/// Writes sample batches as one PNG grid.
#[derive(Debug, Clone)]
pub struct PngGridWriter {
    per_row: usize,
    padding: u32,
}

impl Default for PngGridWriter {
    fn default() -> Self {
        Self {
            per_row: 8,
            padding: 2,
        }
    }
}

impl PngGridWriter {
    pub fn new(per_row: usize, padding: u32) -> Self {
        Self {
            per_row: per_row.max(1),
            padding,
        }
    }

    /// `(width, height)` of the grid for `n` images of `shape`.
    pub fn grid_size(&self, n: usize, shape: ImageShape) -> (u32, u32) {
        let cols = n.min(self.per_row).max(1) as u32;
        let rows = n.div_ceil(self.per_row).max(1) as u32;
        (
            cols * (shape.width as u32 + self.padding) + self.padding,
            rows * (shape.height as u32 + self.padding) + self.padding,
        )
    }

    /// Tile `images` (`[N, P]`) into a grayscale (C = 1) or RGB (C = 3) image.
    pub fn render(&self, images: &Tensor, shape: ImageShape) -> GanResult<DynamicImage> {
        let n = match images.dims() {
            [n, p] if *p == shape.dim() => *n,
            dims => {
                return Err(GanError::shape_mismatch(
                    format!("[N, {}]", shape.dim()),
                    format!("{dims:?}"),
                ))
            }
        };
        let pixels = images.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
        let (width, height) = self.grid_size(n, shape);

        match shape.channels {
            1 => {
                let mut grid = GrayImage::from_pixel(width, height, Luma([0]));
                self.for_each_pixel(n, shape, |k, x, y, gx, gy| {
                    let v = pixels[k * shape.dim() + y * shape.width + x];
                    grid.put_pixel(gx, gy, Luma([to_u8(v)]));
                });
                Ok(DynamicImage::ImageLuma8(grid))
            }
            3 => {
                let plane = shape.height * shape.width;
                let mut grid = RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
                self.for_each_pixel(n, shape, |k, x, y, gx, gy| {
                    let base = k * shape.dim() + y * shape.width + x;
                    let rgb = [0, 1, 2].map(|c| to_u8(pixels[base + c * plane]));
                    grid.put_pixel(gx, gy, Rgb(rgb));
                });
                Ok(DynamicImage::ImageRgb8(grid))
            }
            c => Err(GanError::image(format!(
                "cannot render {c}-channel samples (expected 1 or 3)"
            ))),
        }
    }

    /// Calls `f(image, x, y, grid_x, grid_y)` for every source pixel.
    fn for_each_pixel(
        &self,
        n: usize,
        shape: ImageShape,
        mut f: impl FnMut(usize, usize, usize, u32, u32),
    ) {
        let pad = self.padding;
        let (w, h) = (shape.width as u32, shape.height as u32);
        for k in 0..n {
            let col = (k % self.per_row) as u32;
            let row = (k / self.per_row) as u32;
            let x0 = pad + col * (w + pad);
            let y0 = pad + row * (h + pad);
            for y in 0..shape.height {
                for x in 0..shape.width {
                    f(k, x, y, x0 + x as u32, y0 + y as u32);
                }
            }
        }
    }
}

fn to_u8(v: f32) -> u8 {
    (v * 255.0 + 0.5).clamp(0.0, 255.0) as u8
}

impl SampleSink for PngGridWriter {
    fn save_samples(&mut self, images: &Tensor, shape: ImageShape, path: &Path) -> GanResult<()> {
        let grid = self.render(images, shape)?;
        grid.save(path)
            .map_err(|e| GanError::image(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "Saved sample grid");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn grid_size_for_default_sample_count() {
        let w = PngGridWriter::default();
        assert_eq!(w.grid_size(64, ImageShape::MNIST), (242, 242));
        assert_eq!(w.grid_size(3, ImageShape::MNIST), (92, 32));
        assert_eq!(w.grid_size(9, ImageShape::MNIST), (242, 62));
    }

    #[test]
    fn pixels_land_inside_padding() {
        let images = Tensor::ones((2, 784), DType::F32, &Device::Cpu).unwrap();
        let grid = PngGridWriter::default()
            .render(&images, ImageShape::MNIST)
            .unwrap()
            .into_luma8();
        assert_eq!(grid.dimensions(), (62, 32));
        assert_eq!(grid.get_pixel(0, 0).0, [0]);
        assert_eq!(grid.get_pixel(2, 2).0, [255]);
        assert_eq!(grid.get_pixel(29, 29).0, [255]);
        assert_eq!(grid.get_pixel(30, 10).0, [0]);
        assert_eq!(grid.get_pixel(32, 2).0, [255]);
    }

    #[test]
    fn values_are_rounded_and_clamped() {
        assert_eq!(to_u8(0.0), 0);
        assert_eq!(to_u8(0.5), 128);
        assert_eq!(to_u8(1.0), 255);
        assert_eq!(to_u8(1.7), 255);
        assert_eq!(to_u8(-0.3), 0);
    }

    #[test]
    fn rgb_samples_render() {
        let shape = ImageShape {
            channels: 3,
            height: 2,
            width: 2,
        };
        // red plane 1, green 0, blue 0.5
        let mut pixels = vec![1.0f32; 4];
        pixels.extend([0.0f32; 4]);
        pixels.extend([0.5f32; 4]);
        let images = Tensor::from_vec(pixels, (1, 12), &Device::Cpu).unwrap();
        let grid = PngGridWriter::new(8, 1)
            .render(&images, shape)
            .unwrap()
            .into_rgb8();
        assert_eq!(grid.dimensions(), (4, 4));
        assert_eq!(grid.get_pixel(1, 1).0, [255, 0, 128]);
    }

    #[test]
    fn unsupported_channels_are_rejected() {
        let shape = ImageShape {
            channels: 2,
            height: 2,
            width: 2,
        };
        let images = Tensor::zeros((1, 8), DType::F32, &Device::Cpu).unwrap();
        assert!(matches!(
            PngGridWriter::default().render(&images, shape),
            Err(GanError::Image(_))
        ));
    }

    #[test]
    fn wrong_width_is_a_shape_mismatch() {
        let images = Tensor::zeros((4, 10), DType::F32, &Device::Cpu).unwrap();
        assert!(matches!(
            PngGridWriter::default().render(&images, ImageShape::MNIST),
            Err(GanError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn saves_a_readable_png() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sample_GAN_1.png");
        let images = Tensor::rand(0f32, 1f32, (64, 784), &Device::Cpu).unwrap();
        PngGridWriter::default()
            .save_samples(&images, ImageShape::MNIST, &path)
            .unwrap();
        let reopened = image::open(&path).unwrap();
        assert_eq!((reopened.width(), reopened.height()), (242, 242));
    }
}
