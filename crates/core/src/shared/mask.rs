use std::collections::BTreeSet;

use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::region_labelling::{connected_components, Connectivity};
use ndarray::ArrayView2;

use super::contour::Contour;

pub const FOREGROUND: Luma<u8> = Luma([255]);
pub const BACKGROUND: Luma<u8> = Luma([0]);

/// Binary membership grid for one region, same size as the aligned image.
///
/// Any non-zero pixel is a member; constructors normalize members to 255.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionMask {
    image: GrayImage,
}

impl RegionMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::new(width, height),
        }
    }

    pub fn from_image(mut image: GrayImage) -> Self {
        for p in image.pixels_mut() {
            if p[0] != 0 {
                *p = FOREGROUND;
            }
        }
        Self { image }
    }

    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> Self {
        Self {
            image: GrayImage::from_fn(width, height, |x, y| {
                if f(x, y) {
                    FOREGROUND
                } else {
                    BACKGROUND
                }
            }),
        }
    }

    /// Rasterizes a closed contour (boundary included) into a new mask.
    pub fn from_contour(contour: &Contour, width: u32, height: u32) -> Self {
        let mut image = GrayImage::new(width, height);
        let points = contour.points();
        if points.len() >= 3 {
            imageproc::drawing::draw_polygon_mut(&mut image, points, FOREGROUND);
        } else {
            for p in points {
                if p.x >= 0 && p.y >= 0 && (p.x as u32) < width && (p.y as u32) < height {
                    image.put_pixel(p.x as u32, p.y as u32, FOREGROUND);
                }
            }
        }
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }

    /// `(rows, cols)` view over the raw pixels.
    pub fn as_ndarray(&self) -> ArrayView2<'_, u8> {
        ArrayView2::from_shape(
            (self.image.height() as usize, self.image.width() as usize),
            self.image.as_raw(),
        )
        .expect("mask data length must match dimensions")
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width() && y < self.height() && self.image.get_pixel(x, y)[0] != 0
    }

    pub fn set(&mut self, x: u32, y: u32) {
        if x < self.width() && y < self.height() {
            self.image.put_pixel(x, y, FOREGROUND);
        }
    }

    pub fn area(&self) -> usize {
        self.image.as_raw().iter().filter(|&&v| v != 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.image.as_raw().iter().all(|&v| v == 0)
    }

    /// Pixels in `self` but not in `other`.
    pub fn subtract(&self, other: &RegionMask) -> RegionMask {
        self.combine(other, |a, b| a && !b)
    }

    pub fn intersect(&self, other: &RegionMask) -> RegionMask {
        self.combine(other, |a, b| a && b)
    }

    fn combine(&self, other: &RegionMask, op: impl Fn(bool, bool) -> bool) -> RegionMask {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        let (w, h) = self.dimensions();
        RegionMask::from_fn(w, h, |x, y| op(self.contains(x, y), other.contains(x, y)))
    }

    /// Keeps members whose row lies in `start..end`.
    pub fn restrict_rows(&self, start: u32, end: u32) -> RegionMask {
        let mut out = self.clone();
        for (_, y, p) in out.image.enumerate_pixels_mut() {
            if y < start || y >= end {
                *p = BACKGROUND;
            }
        }
        out
    }

    /// Keeps members inside the rectangle `[x0, x1) x [y0, y1)`.
    pub fn restrict_rect(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> RegionMask {
        let mut out = self.clone();
        for (x, y, p) in out.image.enumerate_pixels_mut() {
            if x < x0 || x >= x1 || y < y0 || y >= y1 {
                *p = BACKGROUND;
            }
        }
        out
    }

    /// Leftmost member column, rightmost member column and member count of a row.
    pub fn row_span(&self, y: u32) -> Option<(u32, u32, u32)> {
        if y >= self.height() {
            return None;
        }
        let view = self.as_ndarray();
        let row = view.row(y as usize);
        let mut first = None;
        let mut last = 0;
        let mut count = 0;
        for (x, &v) in row.iter().enumerate() {
            if v != 0 {
                first.get_or_insert(x as u32);
                last = x as u32;
                count += 1;
            }
        }
        first.map(|f| (f, last, count))
    }

    /// The largest 8-connected component, or an empty mask.
    pub fn largest_component(&self) -> RegionMask {
        let labels = connected_components(&self.image, Connectivity::Eight, BACKGROUND);
        let sizes = component_sizes(&labels);
        let Some((best, _)) = sizes
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, &n)| n > 0)
            .max_by_key(|(label, &n)| (n, std::cmp::Reverse(*label)))
        else {
            return RegionMask::new(self.width(), self.height());
        };
        self.keep_labels(&labels, |label| label as usize == best)
    }

    /// Drops 8-connected components smaller than `min_area` pixels.
    pub fn without_small_components(&self, min_area: usize) -> RegionMask {
        let labels = connected_components(&self.image, Connectivity::Eight, BACKGROUND);
        let sizes = component_sizes(&labels);
        self.keep_labels(&labels, |label| sizes[label as usize] >= min_area)
    }

    fn keep_labels(
        &self,
        labels: &ImageBuffer<Luma<u32>, Vec<u32>>,
        keep: impl Fn(u32) -> bool,
    ) -> RegionMask {
        let (w, h) = self.dimensions();
        RegionMask::from_fn(w, h, |x, y| {
            let label = labels.get_pixel(x, y)[0];
            label != 0 && keep(label)
        })
    }
}

fn component_sizes(labels: &ImageBuffer<Luma<u32>, Vec<u32>>) -> Vec<usize> {
    let max_label = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;
    let mut sizes = vec![0usize; max_label + 1];
    for p in labels.pixels() {
        sizes[p[0] as usize] += 1;
    }
    sizes
}

/// Coarse per-pixel region colors. Black is background.
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentationMask {
    image: RgbImage,
}

pub const BACKGROUND_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

impl SegmentationMask {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Wraps a single-channel label map; label `v` becomes color `(v, v, v)`.
    pub fn from_labels(labels: &GrayImage) -> Self {
        let image = RgbImage::from_fn(labels.width(), labels.height(), |x, y| {
            let v = labels.get_pixel(x, y)[0];
            Rgb([v, v, v])
        });
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }

    /// Distinct colors in lexicographic order.
    pub fn distinct_colors(&self) -> Vec<Rgb<u8>> {
        let set: BTreeSet<[u8; 3]> = self.image.pixels().map(|p| p.0).collect();
        set.into_iter().map(Rgb).collect()
    }
}
