use crate::db::core::{CellRole, Design};
use image::{ImageResult, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect as ImageRect;
use std::path::Path;

/// Maps `value` in `[0,1]` onto a blue-cyan-yellow-red ramp.
pub fn heat_color(value: f64) -> Rgb<u8> {
    const STOPS: [(f64, [f64; 3]); 4] = [
        (0.0, [20.0, 30.0, 120.0]),
        (0.35, [0.0, 180.0, 200.0]),
        (0.7, [250.0, 220.0, 30.0]),
        (1.0, [200.0, 20.0, 20.0]),
    ];
    let v = if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    };
    for pair in STOPS.windows(2) {
        let (lo, c0) = pair[0];
        let (hi, c1) = pair[1];
        if v <= hi {
            let t = (v - lo) / (hi - lo);
            let mix = |i: usize| (c0[i] + (c1[i] - c0[i]) * t).round() as u8;
            return Rgb([mix(0), mix(1), mix(2)]);
        }
    }
    Rgb([200, 20, 20])
}

/// Renders rows, standard cells, macros and pins. The view is padded so that
/// pins outside the die stay visible.
pub fn draw_design(design: &Design, filename: &Path, width: u32, height: u32) -> ImageResult<()> {
    let mut img = RgbImage::from_pixel(width, height, Rgb([20, 20, 20]));

    let die = design.die_area;
    let pad_x = die.width() * 0.05;
    let pad_y = die.height() * 0.05;
    let view_w = die.width() + 2.0 * pad_x;
    let view_h = die.height() + 2.0 * pad_y;
    if view_w <= 0.0 || view_h <= 0.0 {
        return img.save(filename);
    }

    let scale_x = width as f64 / view_w;
    let scale_y = height as f64 / view_h;
    let map = |x: f64, y: f64| {
        (
            (x - die.min.x + pad_x) * scale_x,
            height as f64 - (y - die.min.y + pad_y) * scale_y,
        )
    };
    let to_rect = |lx: f64, ly: f64, w: f64, h: f64, min_px: f64| {
        let (x, y_bot) = map(lx, ly);
        let w = (w * scale_x).max(min_px);
        let h = (h * scale_y).max(min_px);
        ImageRect::at(x as i32, (y_bot - h) as i32).of_size(w as u32, h as u32)
    };

    let color_row = Rgb([70, 70, 70]);
    for row in &design.rows {
        let rect = to_rect(row.lx(), row.ly(), row.width(), row.height, 1.0);
        draw_hollow_rect_mut(&mut img, rect, color_row);
    }

    let color_cell = Rgb([180, 60, 60]);
    let color_macro = Rgb([180, 120, 40]);
    let color_pin = Rgb([240, 240, 240]);
    for cell in &design.cells {
        let (color, min_px) = match cell.role {
            CellRole::Standard => (color_cell, 1.0),
            CellRole::Macro => (color_macro, 2.0),
            CellRole::Pin => (color_pin, 3.0),
        };
        let rect = to_rect(cell.lx(), cell.ly(), cell.width, cell.height, min_px);
        draw_filled_rect_mut(&mut img, rect, color);
    }

    let die_rect = to_rect(die.min.x, die.min.y, die.width(), die.height(), 1.0);
    draw_hollow_rect_mut(&mut img, die_rect, Rgb([255, 255, 255]));

    img.save(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heat_ramp_endpoints() {
        assert_eq!(heat_color(0.0), Rgb([20, 30, 120]));
        assert_eq!(heat_color(1.0), Rgb([200, 20, 20]));
        assert_eq!(heat_color(7.0), heat_color(1.0));
        assert_eq!(heat_color(f64::NAN), heat_color(0.0));
    }
}
