use std::ops::RangeInclusive;
use std::path::Path;

use image::{ImageBuffer, ImageResult, Rgb, RgbImage, Rgba};
use log::{debug, trace};
use palette::{Gradient, LinSrgb};

use crate::curve::Curve;
use crate::error::{MaskError, Result};
use crate::field::{Surface, SurfaceField};

pub const CHANNELS: usize = 4;

// Map a normalized height to the 16-bit range, clamping first
pub fn quantize(height: f64) -> u16 {
    (height.clamp(0.0, 1.0) * 65535.0).round() as u16
}

// Dense per-cell target of the rasterizer.
// Cells hold [`CHANNELS`] independent 16-bit values and are addressed as
// `(x, y, channel)`. Whoever owns the GPU copy decides what
// `push_rows` does; the rasterizer only promises the CPU side is
// complete before asking.
pub trait ReliefBuffer {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn get(&self, x: usize, y: usize, channel: usize) -> u16;
    fn set(&mut self, x: usize, y: usize, channel: usize, value: u16);
    fn push_rows(&mut self, rows: RangeInclusive<usize>);
}

// Relief mask raster backed by a 16-bit RGBA image. Uploads are recorded
// as a pending row band for the host to pick up.
#[derive(Debug, Clone)]
pub struct ReliefMask {
    image: ImageBuffer<Rgba<u16>, Vec<u16>>,
    pending: Option<RangeInclusive<usize>>,
}

impl ReliefMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            image: ImageBuffer::new(width as u32, height as u32),
            pending: None,
        }
    }

    pub fn image(&self) -> &ImageBuffer<Rgba<u16>, Vec<u16>> {
        &self.image
    }

    // Rows pushed since the last call, merged into one band.
    pub fn take_pending_rows(&mut self) -> Option<RangeInclusive<usize>> {
        self.pending.take()
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        self.image.save(path)
    }

    // Colour preview of a row band: grey where the cell is unmasked,
    // shading towards pink as the two surfaces close in.
    pub fn preview_rows(&self, rows: RangeInclusive<usize>) -> RgbImage {
        let gradient = Gradient::with_domain(vec![
            (0.0, LinSrgb::new(0.08, 0.08, 0.1)),
            (0.5, LinSrgb::new(0.45, 0.2, 0.5)),
            (1.0, LinSrgb::new(0.96, 0.33, 0.94)),
        ]);

        let width = self.width() as u32;
        let start = *rows.start();
        let end = (*rows.end()).min(self.height().saturating_sub(1));
        let band = (end + 1).saturating_sub(start) as u32;

        let mut img = RgbImage::new(width, band);
        for (x, y, px) in img.enumerate_pixels_mut() {
            let cell = self.image.get_pixel(x, y + start as u32);
            let top = cell.0[Surface::Top.channel()] as f32 / 65535.0;
            let bottom = cell.0[Surface::Bottom.channel()] as f32 / 65535.0;
            let covered = (top + bottom).min(1.0);
            let col: LinSrgb = gradient.get(covered);
            let rgb = col.into_format::<u8>();
            *px = Rgb([rgb.red, rgb.green, rgb.blue]);
        }
        img
    }
}

impl ReliefBuffer for ReliefMask {
    fn width(&self) -> usize {
        self.image.width() as usize
    }

    fn height(&self) -> usize {
        self.image.height() as usize
    }

    fn get(&self, x: usize, y: usize, channel: usize) -> u16 {
        self.image.get_pixel(x as u32, y as u32).0[channel]
    }

    fn set(&mut self, x: usize, y: usize, channel: usize, value: u16) {
        self.image.get_pixel_mut(x as u32, y as u32).0[channel] = value;
    }

    fn push_rows(&mut self, rows: RangeInclusive<usize>) {
        self.pending = Some(match self.pending.take() {
            Some(prev) => (*prev.start()).min(*rows.start())..=(*prev.end()).max(*rows.end()),
            None => rows,
        });
    }
}

impl SurfaceField {
    // Rasterizes the field into `mask`, quantizing the top surface into
    // channel 2 and the bottom surface into channel 0.
    // `rows` limits the work to a band (the whole grid when `None`), and
    // `push` asks the buffer to upload that band afterwards. If the buffer
    // dimensions differ from the field, only the overlapping cells are
    // written and `SizeMismatch` is returned once the write is done.
    pub fn copy_to_relief_mask<B: ReliefBuffer>(
        &self,
        mask: &mut B,
        rows: Option<RangeInclusive<usize>>,
        push: bool,
    ) -> Result<()> {
        let (buffer_width, buffer_height) = (mask.width(), mask.height());
        let mismatch = (self.xdim(), self.ydim()) != (buffer_width, buffer_height);
        let mismatch_error = || MaskError::SizeMismatch {
            field_width: self.xdim(),
            field_height: self.ydim(),
            buffer_width,
            buffer_height,
        };
        if mismatch {
            mismatch_error().reported("SurfaceField::copy_to_relief_mask");
        }

        let width = self.xdim().min(buffer_width);
        let height = self.ydim().min(buffer_height);
        if width == 0 || height == 0 {
            return Err(mismatch_error());
        }

        let (start, end) = match rows {
            Some(r) => (*r.start(), (*r.end()).min(self.ydim() - 1)),
            None => (0, self.ydim() - 1),
        };
        let end = end.min(height - 1);
        if start <= end {
            debug!("rasterizing rows {start}..={end}");
            for y in start..=end {
                for surface in Surface::BOTH {
                    let profile = self.mask_profile(y, surface);
                    write_profile(mask, &profile, y, surface.channel(), width);
                }
            }
            if push {
                mask.push_rows(start..=end);
            }
        }

        if mismatch {
            Err(mismatch_error())
        } else {
            Ok(())
        }
    }
}

// Walk consecutive control points, filling the half-open span between
// them, then write the last column explicitly.
fn write_profile<B: ReliefBuffer>(
    mask: &mut B,
    profile: &Curve,
    y: usize,
    channel: usize,
    width: usize,
) {
    let (mut prev_loc, mut prev_height) = (0, profile.height(0));
    for (curr_loc, curr_height) in profile.points().filter(|&(loc, _)| loc != 0) {
        let slope = (curr_height - prev_height) / (curr_loc - prev_loc) as f64;
        for x in prev_loc..curr_loc.min(width) {
            let height = prev_height + slope * (x - prev_loc) as f64;
            mask.set(x, y, channel, quantize(height));
        }
        prev_loc = curr_loc;
        prev_height = curr_height;
    }

    let last = profile.size() - 1;
    if last < width {
        trace!("row {y} channel {channel}: final column {last}");
        mask.set(last, y, channel, quantize(profile.height(last)));
    }
}
