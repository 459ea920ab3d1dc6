use crate::error::{EstimatorError, Result};
use crate::grid::{BinRecord, DemandField, DemandGrid, Method};
use eda_common::geom::coord::GridCoord;
use eda_common::geom::point::Point;
use eda_common::util::config::BlendWeights;
use std::collections::BTreeMap;

/// Per-bin congestion for one method, carrying every raw demand field too.
#[derive(Clone, Debug)]
pub struct CongestionMap {
    pub method: Method,
    pub grid_size: f64,
    pub x_bins: u32,
    pub y_bins: u32,
    pub origin: Point<f64>,
    bins: Vec<BinRecord>,
}

impl CongestionMap {
    pub fn bin(&self, coord: GridCoord) -> &BinRecord {
        &self.bins[coord.y as usize * self.x_bins as usize + coord.x as usize]
    }

    /// Row-major bins.
    pub fn bins(&self) -> &[BinRecord] {
        &self.bins
    }

    pub fn coord_of(&self, index: usize) -> GridCoord {
        GridCoord::new(
            (index % self.x_bins as usize) as u32,
            (index / self.x_bins as usize) as u32,
        )
    }

    /// Flattened congestion scores in row-major order.
    pub fn congestion_values(&self) -> Vec<f64> {
        self.bins.iter().map(|b| b.congestion).collect()
    }
}

/// Maximum of each demand field over the grid. A field that is zero
/// everywhere normalizes against 1 so ratios stay defined.
#[derive(Clone, Copy, Debug)]
pub struct FieldMaxima([f64; 5]);

impl FieldMaxima {
    /// Fails when a field holds a non-finite value, which no ratio can bound.
    pub fn of(grid: &DemandGrid) -> Result<Self> {
        let mut maxima = [1.0; 5];
        for (slot, field) in maxima.iter_mut().zip(DemandField::ALL) {
            if let Some(bad) = grid
                .bins()
                .iter()
                .map(|b| b.demand(field))
                .find(|v| !v.is_finite())
            {
                return Err(EstimatorError::InvalidConfig(format!(
                    "{} demand overflowed to {}",
                    field, bad
                )));
            }
            let max = grid.max(field);
            if max > 0.0 {
                *slot = max;
            }
        }
        Ok(Self(maxima))
    }

    pub fn get(&self, field: DemandField) -> f64 {
        self.0[field as usize]
    }

    #[inline]
    pub fn ratio(&self, bin: &BinRecord, field: DemandField) -> f64 {
        bin.demand(field) / self.get(field)
    }
}

/// `demand_weight * demand/demand_max + pin_weight * pin/pin_max`.
#[inline]
pub fn blend_score(bin: &BinRecord, method: Method, maxima: &FieldMaxima, weights: BlendWeights) -> f64 {
    weights.demand_weight * maxima.ratio(bin, method.field())
        + weights.pin_weight * maxima.ratio(bin, DemandField::PinDensity)
}

/// Normalizes the fully accumulated grid and produces one map per method.
pub fn build_maps(
    grid: &DemandGrid,
    weights: BlendWeights,
) -> Result<BTreeMap<Method, CongestionMap>> {
    let maxima = FieldMaxima::of(grid)?;
    log::debug!(
        "Normalization maxima: {}",
        DemandField::ALL
            .iter()
            .map(|f| format!("{}={:.4}", f, maxima.get(*f)))
            .collect::<Vec<_>>()
            .join(" ")
    );

    let maps = Method::ALL
        .into_iter()
        .map(|method| {
            let bins = grid
                .bins()
                .iter()
                .map(|bin| BinRecord {
                    congestion: blend_score(bin, method, &maxima, weights),
                    ..*bin
                })
                .collect();
            let map = CongestionMap {
                method,
                grid_size: grid.grid_size(),
                x_bins: grid.x_bins(),
                y_bins: grid.y_bins(),
                origin: grid.origin(),
                bins,
            };
            (method, map)
        })
        .collect();
    Ok(maps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::DemandLayer;
    use eda_common::geom::rect::Rect;

    fn layer_with(grid: &DemandGrid, values: &[(u32, u32, f64)]) -> DemandLayer {
        let mut layer = grid.layer();
        for &(x, y, v) in values {
            layer.add_at(GridCoord::new(x, y), v);
        }
        layer
    }

    #[test]
    fn blend_uses_field_maxima() {
        let mut grid = DemandGrid::new(Rect::from_corners(0.0, 0.0, 10.0, 0.0), 5.0).unwrap();
        assert_eq!((grid.x_bins(), grid.y_bins()), (3, 1));

        let pins = layer_with(&grid, &[(0, 0, 4.0), (1, 0, 2.0)]);
        grid.store(DemandField::PinDensity, pins);
        let standard = layer_with(&grid, &[(0, 0, 1.0), (1, 0, 3.0), (2, 0, 3.0)]);
        grid.store(DemandField::Standard, standard);

        let maps = build_maps(&grid, BlendWeights::default()).unwrap();
        assert_eq!(maps.len(), 4);

        let std_map = &maps[&Method::Standard];
        let c = std_map.congestion_values();
        assert!((c[0] - (0.6 / 3.0 + 0.4)).abs() < 1e-12);
        assert!((c[1] - (0.6 + 0.2)).abs() < 1e-12);
        assert!((c[2] - 0.6).abs() < 1e-12);
        assert_eq!(std_map.bin(GridCoord::new(0, 0)).pin_density, 4.0);

        // Rent demand is zero everywhere: only the pin share remains.
        let rents = maps[&Method::Rents].congestion_values();
        assert!((rents[0] - 0.4).abs() < 1e-12);
        assert!((rents[2] - 0.0).abs() < 1e-12);
    }

    #[test]
    fn empty_grid_normalizes_to_zero() {
        let grid = DemandGrid::new(Rect::from_corners(0.0, 0.0, 30.0, 30.0), 10.0).unwrap();
        let maps = build_maps(&grid, BlendWeights::default()).unwrap();
        for map in maps.values() {
            assert!(map.congestion_values().iter().all(|&c| c == 0.0));
        }
    }

    #[test]
    fn weights_are_overridable() {
        let mut grid = DemandGrid::new(Rect::from_corners(0.0, 0.0, 5.0, 5.0), 10.0).unwrap();
        grid.store(DemandField::Span, layer_with(&grid, &[(0, 0, 2.0)]));
        grid.store(DemandField::PinDensity, layer_with(&grid, &[(0, 0, 1.0)]));
        let weights = BlendWeights {
            demand_weight: 0.25,
            pin_weight: 0.5,
        };
        let maps = build_maps(&grid, weights).unwrap();
        assert!((maps[&Method::Span].bins()[0].congestion - 0.75).abs() < 1e-12);
    }

    #[test]
    fn non_finite_demand_is_rejected() {
        let mut grid = DemandGrid::new(Rect::from_corners(0.0, 0.0, 10.0, 0.0), 5.0).unwrap();
        grid.store(DemandField::Rents, layer_with(&grid, &[(1, 0, f64::INFINITY)]));
        assert!(matches!(
            build_maps(&grid, BlendWeights::default()),
            Err(EstimatorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn coord_of_inverts_row_major_index() {
        let grid = DemandGrid::new(Rect::from_corners(0.0, 0.0, 20.0, 10.0), 10.0).unwrap();
        let maps = build_maps(&grid, BlendWeights::default()).unwrap();
        let map = &maps[&Method::Weighted];
        assert_eq!((map.x_bins, map.y_bins), (3, 2));
        assert_eq!(map.coord_of(4), GridCoord::new(1, 1));
        assert_eq!(map.coord_of(2), GridCoord::new(2, 0));
    }
}
