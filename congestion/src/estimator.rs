use crate::demand;
use crate::error::{EstimatorError, Result};
use crate::grid::{DemandField, DemandGrid, Method};
use crate::map::{self, CongestionMap};
use eda_common::db::core::Design;
use eda_common::util::config::EstimatorConfig;
use eda_common::util::profiler::ScopedTimer;
use std::collections::BTreeMap;
use std::time::Duration;

/// Runs the demand passes over a finished [`Design`] and blends them into one
/// congestion map per [`Method`].
///
/// The grid is built by [`initialize`](Self::initialize); every pass fails with
/// [`EstimatorError::GridNotInitialized`] until then.
pub struct CongestionEstimator<'a> {
    design: &'a Design,
    config: EstimatorConfig,
    grid: Option<DemandGrid>,
    maps: BTreeMap<Method, CongestionMap>,
    runtimes: BTreeMap<DemandField, Duration>,
}

impl<'a> CongestionEstimator<'a> {
    pub fn new(design: &'a Design, config: EstimatorConfig) -> Result<Self> {
        validate(&config)?;
        Ok(Self {
            design,
            config,
            grid: None,
            maps: BTreeMap::new(),
            runtimes: BTreeMap::new(),
        })
    }

    pub fn grid(&self) -> Option<&DemandGrid> {
        self.grid.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.grid.is_some()
    }

    /// Builds the demand grid over the die. Does nothing if already built.
    pub fn initialize(&mut self) -> Result<()> {
        if self.grid.is_some() {
            return Ok(());
        }
        let grid = DemandGrid::new(self.design.die_area, self.config.grid_size)?;
        log::info!(
            "Demand grid: {} x {} bins of size {}",
            grid.x_bins(),
            grid.y_bins(),
            grid.grid_size()
        );
        self.grid = Some(grid);
        Ok(())
    }

    /// Recomputes one demand field from scratch and records its runtime.
    pub fn run_pass(&mut self, field: DemandField) -> Result<Duration> {
        let grid = self
            .grid
            .as_mut()
            .ok_or(EstimatorError::GridNotInitialized(field.name()))?;

        log::debug!("Accumulating {} demand", field);
        let timer = ScopedTimer::new(field.name());
        let layer = demand::accumulate(field, self.design, grid, &self.config);
        grid.store(field, layer);
        let elapsed = timer.finish();

        self.runtimes.insert(field, elapsed);
        Ok(elapsed)
    }

    /// Normalizes whatever the grid currently holds and rebuilds all maps.
    pub fn blend(&mut self) -> Result<&BTreeMap<Method, CongestionMap>> {
        let grid = self
            .grid
            .as_ref()
            .ok_or(EstimatorError::GridNotInitialized("blend"))?;
        self.maps = map::build_maps(grid, self.config.blend)?;
        Ok(&self.maps)
    }

    /// Initializes if needed, clears the grid, runs all five passes and
    /// blends them into the four method maps.
    pub fn generate_all_congestion_maps(&mut self) -> Result<&BTreeMap<Method, CongestionMap>> {
        self.initialize()?;
        if let Some(grid) = self.grid.as_mut() {
            grid.reset();
        }
        self.runtimes.clear();

        for field in DemandField::ALL {
            self.run_pass(field)?;
        }
        self.blend()?;
        log::info!(
            "Generated {} congestion maps in {:.3}s",
            self.maps.len(),
            self.runtimes.values().sum::<Duration>().as_secs_f64()
        );
        Ok(&self.maps)
    }

    pub fn congestion_maps(&self) -> &BTreeMap<Method, CongestionMap> {
        &self.maps
    }

    pub fn congestion_map(&self, method: Method) -> Option<&CongestionMap> {
        self.maps.get(&method)
    }

    /// Pass runtimes in seconds keyed by field name ("pin", "standard", ...).
    pub fn runtimes_secs(&self) -> BTreeMap<&'static str, f64> {
        self.runtimes
            .iter()
            .map(|(field, d)| (field.name(), d.as_secs_f64()))
            .collect()
    }
}

fn validate(config: &EstimatorConfig) -> Result<()> {
    let invalid = |msg: String| Err(EstimatorError::InvalidConfig(msg));

    if !(config.grid_size > 0.0) || !config.grid_size.is_finite() {
        return invalid(format!(
            "grid_size must be a positive number, got {}",
            config.grid_size
        ));
    }
    let blend = config.blend;
    if !(blend.demand_weight >= 0.0 && blend.pin_weight >= 0.0) {
        return invalid(format!(
            "blend weights must be non-negative, got {} / {}",
            blend.demand_weight, blend.pin_weight
        ));
    }
    if blend.demand_weight + blend.pin_weight > 1.0 + 1e-9 {
        return invalid(format!(
            "blend weights must sum to at most 1, got {}",
            blend.demand_weight + blend.pin_weight
        ));
    }
    // A negative exponent sends zero-fanout cells to infinity.
    let rent = config.rent;
    if !(rent.k >= 0.0 && rent.p >= 0.0) || !rent.k.is_finite() || !rent.p.is_finite() {
        return invalid(format!(
            "Rent constants must be finite and non-negative, got k={} p={}",
            config.rent.k, config.rent.p
        ));
    }
    Ok(())
}
