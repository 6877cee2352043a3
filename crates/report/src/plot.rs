//! Line charts of per-epoch losses, rasterised straight to PNG.
//!
//! The canvas has a white background, a centred title, black axes with one
//! numbered tick per epoch (thinned when there are many), light horizontal
//! grid lines labelled with their loss value, one polyline per series with a
//! marker per point, and a legend (swatch plus series name) in the top-right
//! corner in series order. The y-axis label reads bottom to top.
//!
//! Text uses DejaVu Sans, embedded at compile time.

use std::path::Path;

use ab_glyph::{FontRef, PxScale};
use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use gan_common::{GanError, GanResult};
use gan_train::{LossChart, LossPlotter};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);

/// Series colours, cycled: blue, orange, green, red.
pub const PALETTE: [Rgb<u8>; 4] = [
    Rgb([0x1f, 0x77, 0xb4]),
    Rgb([0xff, 0x7f, 0x0e]),
    Rgb([0x2c, 0xa0, 0x2c]),
    Rgb([0xd6, 0x27, 0x28]),
];

const MARGIN_LEFT: u32 = 90;
const MARGIN_RIGHT: u32 = 20;
const MARGIN_TOP: u32 = 44;
const MARGIN_BOTTOM: u32 = 60;
const Y_GRID_LINES: u32 = 5;
const MAX_X_TICKS: usize = 20;

const TITLE_SCALE: f32 = 20.0;
const LABEL_SCALE: f32 = 16.0;
const TICK_SCALE: f32 = 13.0;
const SWATCH_W: u32 = 24;

const FONT_DATA: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

fn font() -> GanResult<FontRef<'static>> {
    FontRef::try_from_slice(FONT_DATA)
        .map_err(|e| GanError::image(format!("embedded chart font: {e}")))
}

/// Tick text with precision suited to the axis span.
fn tick_label(v: f64, span: f64) -> String {
    if span >= 10.0 {
        format!("{v:.1}")
    } else if span >= 1.0 {
        format!("{v:.2}")
    } else {
        format!("{v:.3}")
    }
}

/// Canvas plus the font every label is drawn with.
struct Pen<'a> {
    img: &'a mut RgbImage,
    font: FontRef<'static>,
}

impl Pen<'_> {
    fn width(&self, scale: f32, text: &str) -> f32 {
        text_size(PxScale::from(scale), &self.font, text).0 as f32
    }

    /// `text` with its top-left at `(x, y)`.
    fn text(&mut self, scale: f32, x: f32, y: f32, text: &str) {
        let (x, y) = (x.round() as i32, y.round() as i32);
        draw_text_mut(&mut *self.img, BLACK, x, y, PxScale::from(scale), &self.font, text);
    }

    /// `text` horizontally centred on `cx`, top at `y`.
    fn centred(&mut self, scale: f32, cx: f32, y: f32, text: &str) {
        let w = self.width(scale, text);
        self.text(scale, cx - w / 2.0, y, text);
    }

    /// `text` ending at `right`, vertically centred on `cy`.
    fn right_aligned(&mut self, scale: f32, right: f32, cy: f32, text: &str) {
        let w = self.width(scale, text);
        self.text(scale, right - w, cy - scale / 2.0, text);
    }

    /// `text` rotated a quarter turn anticlockwise, centred on `(cx, cy)`.
    fn vertical(&mut self, scale: f32, cx: f32, cy: f32, text: &str) {
        if text.is_empty() {
            return;
        }
        let w = self.width(scale, text) as u32 + 2;
        let h = scale.ceil() as u32 + 2;
        let mut label = RgbImage::from_pixel(w, h, WHITE);
        draw_text_mut(&mut label, BLACK, 1, 1, PxScale::from(scale), &self.font, text);
        let label = imageops::rotate270(&label);
        let x = (cx - h as f32 / 2.0).round() as i64;
        let y = (cy - w as f32 / 2.0).round() as i64;
        imageops::overlay(&mut *self.img, &label, x, y);
    }
}

/// Renders [`LossChart`]s as PNG files.
#[derive(Debug, Clone)]
pub struct PngLossPlotter {
    width: u32,
    height: u32,
}

impl Default for PngLossPlotter {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

/// Maps (epoch index, loss) to canvas coordinates.
struct Frame {
    left: f32,
    top: f32,
    plot_w: f32,
    plot_h: f32,
    points: usize,
    lo: f64,
    hi: f64,
}

impl Frame {
    fn x(&self, i: usize) -> f32 {
        if self.points <= 1 {
            return self.left + self.plot_w / 2.0;
        }
        self.left + self.plot_w * i as f32 / (self.points - 1) as f32
    }

    fn y(&self, v: f64) -> f32 {
        let t = ((self.hi - v) / (self.hi - self.lo)) as f32;
        self.top + self.plot_h * t
    }

    fn right(&self) -> f32 {
        self.left + self.plot_w
    }

    fn bottom(&self) -> f32 {
        self.top + self.plot_h
    }
}

impl PngLossPlotter {
    pub fn new(width: u32, height: u32) -> GanResult<Self> {
        if width <= MARGIN_LEFT + MARGIN_RIGHT || height <= MARGIN_TOP + MARGIN_BOTTOM {
            return Err(GanError::invalid_config(format!(
                "chart size {width}x{height} leaves no plotting area"
            )));
        }
        Ok(Self { width, height })
    }

    fn frame(&self, chart: &LossChart) -> Frame {
        let (lo, hi) = match chart.value_range() {
            Some((lo, hi)) if hi > lo => {
                let pad = (hi - lo) * 0.05;
                (lo - pad, hi + pad)
            }
            Some((v, _)) => (v - 0.5, v + 0.5),
            None => (0.0, 1.0),
        };
        Frame {
            left: MARGIN_LEFT as f32,
            top: MARGIN_TOP as f32,
            plot_w: (self.width - MARGIN_LEFT - MARGIN_RIGHT) as f32,
            plot_h: (self.height - MARGIN_TOP - MARGIN_BOTTOM) as f32,
            points: chart.num_points(),
            lo,
            hi,
        }
    }

    /// Draw `chart` onto a fresh canvas.
    pub fn render(&self, chart: &LossChart) -> GanResult<RgbImage> {
        let mut img = RgbImage::from_pixel(self.width, self.height, WHITE);
        let frame = self.frame(chart);

        // Grid + axes
        for k in 0..=Y_GRID_LINES {
            let y = frame.top + frame.plot_h * k as f32 / Y_GRID_LINES as f32;
            draw_line_segment_mut(&mut img, (frame.left, y), (frame.right(), y), GRID);
            draw_line_segment_mut(&mut img, (frame.left - 5.0, y), (frame.left, y), BLACK);
        }
        draw_line_segment_mut(
            &mut img,
            (frame.left, frame.top),
            (frame.left, frame.bottom()),
            BLACK,
        );
        draw_line_segment_mut(
            &mut img,
            (frame.left, frame.bottom()),
            (frame.right(), frame.bottom()),
            BLACK,
        );
        let stride = frame.points.div_ceil(MAX_X_TICKS).max(1);
        for i in (0..frame.points).step_by(stride) {
            let x = frame.x(i);
            draw_line_segment_mut(
                &mut img,
                (x, frame.bottom()),
                (x, frame.bottom() + 5.0),
                BLACK,
            );
        }

        // Series
        for (s, series) in chart.series.iter().enumerate() {
            let colour = PALETTE[s % PALETTE.len()];
            let points: Vec<(f32, f32)> = series
                .values
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite())
                .map(|(i, v)| (frame.x(i), frame.y(*v)))
                .collect();
            for pair in points.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                draw_line_segment_mut(&mut img, a, b, colour);
                draw_line_segment_mut(&mut img, (a.0, a.1 + 1.0), (b.0, b.1 + 1.0), colour);
            }
            for (x, y) in points {
                draw_filled_rect_mut(
                    &mut img,
                    Rect::at(x.round() as i32 - 2, y.round() as i32 - 2).of_size(5, 5),
                    colour,
                );
            }
        }

        // Legend
        let mut pen = Pen {
            img: &mut img,
            font: font()?,
        };
        let name_w = chart
            .series
            .iter()
            .map(|s| pen.width(TICK_SCALE, &s.name))
            .fold(0.0f32, f32::max);
        let swatch_x = frame.right() - 10.0 - name_w - 6.0 - SWATCH_W as f32;
        for (s, series) in chart.series.iter().enumerate() {
            let y = frame.top + 10.0 + 18.0 * s as f32;
            draw_filled_rect_mut(
                &mut *pen.img,
                Rect::at(swatch_x.round() as i32, y.round() as i32 + 4).of_size(SWATCH_W, 6),
                PALETTE[s % PALETTE.len()],
            );
            pen.text(TICK_SCALE, swatch_x + SWATCH_W as f32 + 6.0, y, &series.name);
        }

        // Labels
        pen.centred(TITLE_SCALE, self.width as f32 / 2.0, 10.0, &chart.title);
        let span = frame.hi - frame.lo;
        for k in 0..=Y_GRID_LINES {
            let t = k as f32 / Y_GRID_LINES as f32;
            let y = frame.top + frame.plot_h * t;
            let value = frame.hi - span * t as f64;
            pen.right_aligned(TICK_SCALE, frame.left - 8.0, y, &tick_label(value, span));
        }
        for i in (0..frame.points).step_by(stride) {
            pen.centred(TICK_SCALE, frame.x(i), frame.bottom() + 8.0, &(i + 1).to_string());
        }
        pen.centred(
            LABEL_SCALE,
            frame.left + frame.plot_w / 2.0,
            frame.bottom() + 30.0,
            &chart.x_label,
        );
        pen.vertical(LABEL_SCALE, 16.0, frame.top + frame.plot_h / 2.0, &chart.y_label);
        Ok(img)
    }
}

impl LossPlotter for PngLossPlotter {
    fn plot(&mut self, chart: &LossChart, path: &Path) -> GanResult<()> {
        self.render(chart)?
            .save(path)
            .map_err(|e| GanError::image(format!("{}: {e}", path.display())))?;
        tracing::info!(
            title = %chart.title,
            path = %path.display(),
            "Saved loss chart"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gan_train::LossSeries;

    fn chart(disc: Vec<f64>, gen: Vec<f64>) -> LossChart {
        LossChart {
            title: "Training Loss".into(),
            x_label: "Epoch".into(),
            y_label: "Loss".into(),
            series: vec![
                LossSeries {
                    name: "Disc".into(),
                    values: disc,
                },
                LossSeries {
                    name: "Gen".into(),
                    values: gen,
                },
            ],
        }
    }

    fn contains(img: &RgbImage, colour: Rgb<u8>) -> bool {
        img.pixels().any(|p| *p == colour)
    }

    /// Whether any pixel in `xs × ys` is not background.
    fn inked(img: &RgbImage, xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) -> bool {
        ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
            .any(|(x, y)| *img.get_pixel(x, y) != WHITE)
    }

    #[test]
    fn draws_both_series_in_palette_order() {
        let img = PngLossPlotter::default()
            .render(&chart(vec![1.3, 1.1, 0.9], vec![0.7, 1.0, 1.4]))
            .unwrap();
        assert_eq!(img.dimensions(), (640, 480));
        assert_eq!(*img.get_pixel(0, 0), WHITE);
        assert!(contains(&img, PALETTE[0]));
        assert!(contains(&img, PALETTE[1]));
        assert!(!contains(&img, PALETTE[2]));
    }

    #[test]
    fn single_epoch_is_still_visible() {
        let img = PngLossPlotter::default().render(&chart(vec![1.0], vec![1.0])).unwrap();
        let mid_x = MARGIN_LEFT + (640 - MARGIN_LEFT - MARGIN_RIGHT) / 2;
        let mid_y = MARGIN_TOP + (480 - MARGIN_TOP - MARGIN_BOTTOM) / 2;
        // Both markers sit on the same spot; the later series wins.
        assert_eq!(*img.get_pixel(mid_x, mid_y), PALETTE[1]);
    }

    #[test]
    fn empty_chart_renders_axes_only() {
        let img = PngLossPlotter::default().render(&chart(vec![], vec![])).unwrap();
        assert!(contains(&img, BLACK));
        // Legend swatches are drawn even with no data.
        assert!(contains(&img, PALETTE[0]));
    }

    #[test]
    fn non_finite_values_are_skipped() {
        let img = PngLossPlotter::default()
            .render(&chart(vec![1.0, f64::NAN, 2.0], vec![0.5, 0.6, 0.7]))
            .unwrap();
        assert_eq!(img.dimensions(), (640, 480));
    }

    #[test]
    fn title_is_drawn_above_the_plot() {
        let plotter = PngLossPlotter::default();
        let titled = plotter.render(&chart(vec![1.0, 0.8], vec![0.9, 1.2])).unwrap();
        assert!(inked(&titled, 0..640, 0..30));

        let mut untitled = chart(vec![1.0, 0.8], vec![0.9, 1.2]);
        untitled.title.clear();
        let untitled = plotter.render(&untitled).unwrap();
        assert!(!inked(&untitled, 0..640, 0..30));
    }

    #[test]
    fn axis_labels_and_tick_values_are_drawn() {
        let img = PngLossPlotter::default()
            .render(&chart(vec![1.0, 0.8], vec![0.9, 1.2]))
            .unwrap();
        let bottom = 480 - MARGIN_BOTTOM;
        // y tick value beside the top grid line
        assert!(inked(&img, 30..MARGIN_LEFT - 8, MARGIN_TOP - 8..MARGIN_TOP + 8));
        // epoch numbers under the x axis
        assert!(inked(&img, MARGIN_LEFT - 10..MARGIN_LEFT + 10, bottom + 8..bottom + 24));
        // "Epoch" below them
        assert!(inked(&img, 300..400, bottom + 30..480));
        // "Loss" along the left edge
        assert!(inked(&img, 0..28, 200..300));

        assert_eq!(tick_label(1.23456, 0.5), "1.235");
        assert_eq!(tick_label(1.23456, 2.0), "1.23");
        assert_eq!(tick_label(123.456, 50.0), "123.5");
    }

    #[test]
    fn legend_names_sit_next_to_swatches() {
        let plotter = PngLossPlotter::default();
        let named = plotter.render(&chart(vec![1.0, 0.8], vec![0.9, 1.2])).unwrap();
        let mut unnamed = chart(vec![1.0, 0.8], vec![0.9, 1.2]);
        for series in &mut unnamed.series {
            series.name.clear();
        }
        let unnamed = plotter.render(&unnamed).unwrap();

        let legend_left = 640 - MARGIN_RIGHT - 120;
        let legend_bottom = MARGIN_TOP + 50;
        let mut differs = false;
        for (x, y, p) in named.enumerate_pixels() {
            if p != unnamed.get_pixel(x, y) {
                assert!(x >= legend_left && y < legend_bottom, "({x}, {y}) changed");
                differs = true;
            }
        }
        assert!(differs);
    }

    #[test]
    fn tiny_canvas_is_rejected() {
        assert!(PngLossPlotter::new(50, 50).is_err());
        assert!(PngLossPlotter::new(100, 480).is_err());
        assert!(PngLossPlotter::new(320, 240).is_ok());
    }

    #[test]
    fn writes_png_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("GAN_Train_loss.png");
        PngLossPlotter::default()
            .plot(&chart(vec![1.0, 0.8], vec![0.9, 1.2]), &path)
            .unwrap();
        let reopened = image::open(&path).unwrap();
        assert_eq!((reopened.width(), reopened.height()), (640, 480));
    }
}
