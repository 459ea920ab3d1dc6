use crate::grid::Method;
use crate::map::CongestionMap;
use eda_common::util::visualization::heat_color;
use image::{ImageResult, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect as ImageRect;
use std::collections::BTreeMap;
use std::path::Path;

const GAP: u32 = 8;

/// Renders one map as a heatmap, row 0 at the bottom.
pub fn render_map(map: &CongestionMap, size: u32) -> RgbImage {
    let mut img = RgbImage::from_pixel(size, size, Rgb([20, 20, 20]));
    if map.x_bins == 0 || map.y_bins == 0 || size == 0 {
        return img;
    }

    let bin_px = (size as f64 / map.x_bins as f64).min(size as f64 / map.y_bins as f64);
    for (i, bin) in map.bins().iter().enumerate() {
        let coord = map.coord_of(i);
        let x0 = (coord.x as f64 * bin_px) as i32;
        let x1 = ((coord.x + 1) as f64 * bin_px) as i32;
        let y1 = size as i32 - (coord.y as f64 * bin_px) as i32;
        let y0 = size as i32 - ((coord.y + 1) as f64 * bin_px) as i32;
        let w = (x1 - x0).max(1) as u32;
        let h = (y1 - y0).max(1) as u32;
        draw_filled_rect_mut(
            &mut img,
            ImageRect::at(x0, y0).of_size(w, h),
            heat_color(bin.congestion),
        );
    }
    img
}

/// Writes a 2x2 panel with one heatmap per method, in [`Method::ALL`] order.
/// Missing methods leave their panel dark.
pub fn draw_comparison(
    maps: &BTreeMap<Method, CongestionMap>,
    filename: &Path,
    panel_size: u32,
) -> ImageResult<()> {
    let side = 2 * panel_size + 3 * GAP;
    let mut img = RgbImage::from_pixel(side, side, Rgb([40, 40, 40]));

    for (slot, method) in Method::ALL.into_iter().enumerate() {
        let ox = GAP + (slot as u32 % 2) * (panel_size + GAP);
        let oy = GAP + (slot as u32 / 2) * (panel_size + GAP);
        if let Some(map) = maps.get(&method) {
            image::imageops::overlay(&mut img, &render_map(map, panel_size), ox as i64, oy as i64);
        }
        draw_hollow_rect_mut(
            &mut img,
            ImageRect::at(ox as i32, oy as i32).of_size(panel_size.max(1), panel_size.max(1)),
            Rgb([255, 255, 255]),
        );
    }

    log::info!("Saving congestion comparison to {}", filename.display());
    img.save(filename)
}
