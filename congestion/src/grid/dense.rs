use super::{BinRecord, DemandField};
use crate::error::{EstimatorError, Result};
use eda_common::geom::coord::GridCoord;
use eda_common::geom::point::Point;
use eda_common::geom::rect::Rect;

const LARGE_GRID_BINS: u64 = 50_000_000;

/// Closed range of bin columns and rows, already clipped to the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinRange {
    pub col_lo: u32,
    pub col_hi: u32,
    pub row_lo: u32,
    pub row_hi: u32,
}

impl BinRange {
    pub fn count(&self) -> usize {
        (self.col_hi - self.col_lo + 1) as usize * (self.row_hi - self.row_lo + 1) as usize
    }
}

/// Uniform `grid_size` binning of the die, anchored at its lower-left corner.
/// Bins are stored row-major.
pub struct DemandGrid {
    grid_size: f64,
    x_bins: u32,
    y_bins: u32,
    origin: Point<f64>,
    bins: Vec<BinRecord>,
}

impl DemandGrid {
    pub fn new(die: Rect, grid_size: f64) -> Result<Self> {
        if !(grid_size > 0.0) || !grid_size.is_finite() {
            return Err(EstimatorError::InvalidConfig(format!(
                "grid_size must be a positive number, got {}",
                grid_size
            )));
        }
        let (width, height) = (die.width(), die.height());
        if !(width >= 0.0 && height >= 0.0) || !width.is_finite() || !height.is_finite() {
            return Err(EstimatorError::EmptyDesign { width, height });
        }

        let x_bins = (width / grid_size).floor() + 1.0;
        let y_bins = (height / grid_size).floor() + 1.0;
        if x_bins > u32::MAX as f64 || y_bins > u32::MAX as f64 {
            return Err(EstimatorError::InvalidConfig(format!(
                "grid_size {} is too fine for a {} x {} die",
                grid_size, width, height
            )));
        }
        let (x_bins, y_bins) = (x_bins as u32, y_bins as u32);

        let size = x_bins as u64 * y_bins as u64;
        if size > LARGE_GRID_BINS {
            log::warn!(
                "Allocating large DemandGrid: {} bins. Ensure sufficient RAM.",
                size
            );
        }

        Ok(Self {
            grid_size,
            x_bins,
            y_bins,
            origin: die.min,
            bins: vec![BinRecord::default(); size as usize],
        })
    }

    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }
    pub fn x_bins(&self) -> u32 {
        self.x_bins
    }
    pub fn y_bins(&self) -> u32 {
        self.y_bins
    }
    pub fn origin(&self) -> Point<f64> {
        self.origin
    }
    pub fn len(&self) -> usize {
        self.bins.len()
    }
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    #[inline(always)]
    fn index(&self, coord: GridCoord) -> usize {
        (coord.y as usize) * (self.x_bins as usize) + (coord.x as usize)
    }

    pub fn bin(&self, coord: GridCoord) -> &BinRecord {
        &self.bins[self.index(coord)]
    }

    pub fn bins(&self) -> &[BinRecord] {
        &self.bins
    }

    /// Bins covered by the closed rectangle, clipped to the grid.
    /// `None` when the rectangle lies entirely outside it.
    pub fn bin_range(&self, rect: &Rect) -> Option<BinRange> {
        let (col_lo, col_hi) =
            axis_span(rect.min.x, rect.max.x, self.origin.x, self.grid_size, self.x_bins)?;
        let (row_lo, row_hi) =
            axis_span(rect.min.y, rect.max.y, self.origin.y, self.grid_size, self.y_bins)?;
        Some(BinRange {
            col_lo,
            col_hi,
            row_lo,
            row_hi,
        })
    }

    /// The bin containing `p`, or `None` outside the grid.
    pub fn point_bin(&self, p: Point<f64>) -> Option<GridCoord> {
        let col = ((p.x - self.origin.x) / self.grid_size).floor();
        let row = ((p.y - self.origin.y) / self.grid_size).floor();
        let inside = col >= 0.0
            && col < self.x_bins as f64
            && row >= 0.0
            && row < self.y_bins as f64;
        inside.then(|| GridCoord::new(col as u32, row as u32))
    }

    /// A zeroed layer with this grid's shape.
    pub fn layer(&self) -> DemandLayer {
        DemandLayer {
            x_bins: self.x_bins,
            values: vec![0.0; self.bins.len()],
        }
    }

    /// Replaces one demand field with the layer's values.
    pub fn store(&mut self, field: DemandField, layer: DemandLayer) {
        debug_assert_eq!(layer.values.len(), self.bins.len());
        for (bin, value) in self.bins.iter_mut().zip(layer.values) {
            *bin.demand_mut(field) = value;
        }
    }

    pub fn reset(&mut self) {
        self.bins.fill(BinRecord::default());
    }

    /// Largest value of `field` over all bins; 0 for an empty grid.
    pub fn max(&self, field: DemandField) -> f64 {
        self.bins
            .iter()
            .map(|b| b.demand(field))
            .fold(0.0, f64::max)
    }
}

fn axis_span(lo: f64, hi: f64, origin: f64, step: f64, bins: u32) -> Option<(u32, u32)> {
    let first = ((lo - origin) / step).floor();
    let last = ((hi - origin) / step).floor();
    if !(first <= last) || last < 0.0 || first >= bins as f64 {
        return None;
    }
    Some((first.max(0.0) as u32, last.min((bins - 1) as f64) as u32))
}

/// One demand field's worth of per-bin values. Passes fill layers
/// independently and sum them before storing into the grid.
#[derive(Clone, Debug)]
pub struct DemandLayer {
    x_bins: u32,
    values: Vec<f64>,
}

impl DemandLayer {
    pub fn add_range(&mut self, range: &BinRange, weight: f64) {
        let stride = self.x_bins as usize;
        for row in range.row_lo..=range.row_hi {
            let base = row as usize * stride;
            for v in &mut self.values[base + range.col_lo as usize..=base + range.col_hi as usize] {
                *v += weight;
            }
        }
    }

    pub fn add_at(&mut self, coord: GridCoord, weight: f64) {
        self.values[coord.y as usize * self.x_bins as usize + coord.x as usize] += weight;
    }

    pub fn get(&self, coord: GridCoord) -> f64 {
        self.values[coord.y as usize * self.x_bins as usize + coord.x as usize]
    }

    /// Field-wise sum of two partial layers of the same grid.
    pub fn merge(mut self, other: DemandLayer) -> DemandLayer {
        for (a, b) in self.values.iter_mut().zip(other.values) {
            *a += b;
        }
        self
    }
}
