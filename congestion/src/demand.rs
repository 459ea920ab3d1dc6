//! Demand accumulation passes. Each pass reads the design, fills one
//! [`DemandLayer`] and never touches the other fields.

use crate::grid::{DemandField, DemandGrid, DemandLayer};
use eda_common::db::core::{CellData, Design, NetData};
use eda_common::util::config::{EstimatorConfig, RentParams};
use rayon::prelude::*;

/// Items handed to one rayon task before a new partial layer is started.
const PAR_MIN_ITEMS: usize = 4096;

/// Computes `field` from scratch over `grid`'s geometry.
pub fn accumulate(
    field: DemandField,
    design: &Design,
    grid: &DemandGrid,
    config: &EstimatorConfig,
) -> DemandLayer {
    let parallel = config.parallel;
    match field {
        DemandField::PinDensity => pin_density(design, grid, parallel),
        DemandField::Standard => net_demand(design, grid, parallel, |_| 1.0),
        DemandField::Weighted => {
            net_demand(design, grid, parallel, |net| (net.degree() as f64).ln_1p())
        }
        DemandField::Rents => rents_rule(design, grid, parallel, config.rent),
        DemandField::Span => {
            let grid_size = grid.grid_size();
            net_demand(design, grid, parallel, move |net| {
                (net.bbox.width() + net.bbox.height()) / grid_size
            })
        }
    }
}

/// Runs `visit` over every item into a layer. In parallel mode each rayon
/// task fills a private layer and the partial layers are summed.
fn fill<T, F>(items: &[T], grid: &DemandGrid, parallel: bool, visit: F) -> DemandLayer
where
    T: Sync,
    F: Fn(&T, &mut DemandLayer) + Sync + Send,
{
    if parallel {
        items
            .par_iter()
            .with_min_len(PAR_MIN_ITEMS)
            .fold(
                || grid.layer(),
                |mut layer, item| {
                    visit(item, &mut layer);
                    layer
                },
            )
            .reduce(|| grid.layer(), DemandLayer::merge)
    } else {
        let mut layer = grid.layer();
        for item in items {
            visit(item, &mut layer);
        }
        layer
    }
}

/// Spreads each non-terminal cell's pin exposure evenly over the bins its
/// footprint covers.
pub fn pin_density(design: &Design, grid: &DemandGrid, parallel: bool) -> DemandLayer {
    fill(&design.cells, grid, parallel, |cell: &CellData, layer| {
        if cell.is_macro() || cell.is_pin() {
            return;
        }
        if let Some(range) = grid.bin_range(&cell.rect()) {
            layer.add_range(&range, cell.pin_exposure as f64 / range.count() as f64);
        }
    })
}

/// Adds `weight(net)` to every bin under each net's bounding box.
pub fn net_demand<W>(
    design: &Design,
    grid: &DemandGrid,
    parallel: bool,
    weight: W,
) -> DemandLayer
where
    W: Fn(&NetData) -> f64 + Sync + Send,
{
    fill(&design.nets, grid, parallel, |net: &NetData, layer| {
        match grid.bin_range(&net.bbox) {
            Some(range) => layer.add_range(&range, weight(net)),
            None => log::debug!("Net {} lies outside the demand grid", net.name),
        }
    })
}

/// Rent's-rule demand `k * fanout^p`, deposited in the bin holding each
/// cell's lower-left corner. Cells whose corner is off-grid contribute nothing.
pub fn rents_rule(
    design: &Design,
    grid: &DemandGrid,
    parallel: bool,
    rent: RentParams,
) -> DemandLayer {
    fill(&design.cells, grid, parallel, |cell: &CellData, layer| {
        if let Some(coord) = grid.point_bin(cell.origin) {
            layer.add_at(coord, rent.k * (cell.nets.len() as f64).powf(rent.p));
        }
    })
}
