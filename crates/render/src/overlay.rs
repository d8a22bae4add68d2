use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use rmhf_core::BandRect;

/// Draws `bands` (in points) on a transparent layer the size of `page` and
/// alpha-composites that layer over the page.
pub fn composite_bands(mut page: RgbaImage, bands: &[BandRect], scale: f32, color: [u8; 4]) -> RgbaImage {
    let (width, height) = page.dimensions();
    let mut layer = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    let fill = Rgba(color);

    for band in bands {
        let px = band.scaled(scale);
        let x0 = (px.x0.floor().max(0.0) as u32).min(width);
        let y0 = (px.y0.floor().max(0.0) as u32).min(height);
        let x1 = (px.x1.ceil().max(0.0) as u32).min(width);
        let y1 = (px.y1.ceil().max(0.0) as u32).min(height);
        let w = x1.saturating_sub(x0);
        let h = y1.saturating_sub(y0);

        if w > 0 && h > 0 {
            draw_filled_rect_mut(&mut layer, Rect::at(x0 as i32, y0 as i32).of_size(w, h), fill);
            log::debug!("[Preview] {} band at ({}, {}, {}, {}) px", band.band, x0, y0, w, h);
        }
    }

    imageops::overlay(&mut page, &layer, 0, 0);
    page
}
