use anyhow::Context;
use clap::{Parser, Subcommand};
use eda_common::db::core::Design;
use eda_common::db::parser::bookshelf;
use eda_common::util::config::Config;
use eda_common::util::generator::{self, BenchmarkSpec};
use eda_common::util::profiler::ScopedTimer;
use eda_common::util::{logger, visualization};
use eda_congestion::{CongestionEstimator, Method, report};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build all four congestion maps and report how they compare.
    Estimate {
        /// Benchmark directory or `.aux` file; overrides the config.
        benchmark: Option<PathBuf>,
        #[arg(long)]
        grid_size: Option<f64>,
        #[arg(long)]
        output_dir: Option<String>,
        /// Accumulate demand on a single thread.
        #[arg(long)]
        serial: bool,
        #[arg(long)]
        no_plots: bool,
    },
    /// Print design statistics and pin-distance levels.
    Inspect {
        benchmark: Option<PathBuf>,
        /// Also render the placement to `<output_dir>/<design>_layout.png`.
        #[arg(long)]
        plot: bool,
    },
    /// Write a random legalized Bookshelf benchmark.
    Generate {
        #[arg(long, default_value = "random")]
        name: String,
        #[arg(long, default_value_t = 1000)]
        cells: usize,
        #[arg(long, default_value_t = 1000)]
        nets: usize,
        #[arg(long, default_value_t = 4)]
        macros: usize,
        #[arg(long, default_value_t = 32)]
        io_pins: usize,
        #[arg(long, default_value_t = 0.50)]
        utilization: f64,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = "inputs")]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse();
    let mut config = load_config(&args.config)?;

    let command = args.command.unwrap_or(Commands::Estimate {
        benchmark: None,
        grid_size: None,
        output_dir: None,
        serial: false,
        no_plots: false,
    });

    match command {
        Commands::Estimate {
            benchmark,
            grid_size,
            output_dir,
            serial,
            no_plots,
        } => {
            if let Some(size) = grid_size {
                config.estimator.grid_size = size;
            }
            if let Some(dir) = output_dir {
                config.input.output_dir = dir;
            }
            if serial {
                config.estimator.parallel = false;
            }
            if no_plots {
                config.visualization.enabled = false;
            }
            let path = benchmark_path(benchmark, &config)?;
            run_estimate(&path, &config)?;
        }
        Commands::Inspect { benchmark, plot } => {
            let path = benchmark_path(benchmark, &config)?;
            let mut design = load_design(&path)?;
            design.summary();
            report_levels(&mut design);
            if plot {
                let out = prepare_output_dir(&config.input.output_dir)?;
                let file = out.join(format!("{}_layout.png", design.name));
                let size = config.visualization.image_size;
                visualization::draw_design(&design, &file, size, size)
                    .with_context(|| format!("Failed to write {}", file.display()))?;
                log::info!("Layout written to {}", file.display());
            }
        }
        Commands::Generate {
            name,
            cells,
            nets,
            macros,
            io_pins,
            utilization,
            seed,
            output,
        } => {
            let safe_util = utilization.clamp(0.05, 0.95);
            if (safe_util - utilization).abs() > f64::EPSILON {
                log::warn!(
                    "Requested utilization {:.2} is unsafe. Clamped to {:.2}",
                    utilization,
                    safe_util
                );
            }
            let spec = BenchmarkSpec {
                name,
                cells,
                nets,
                macros,
                io_pins,
                utilization: safe_util,
                seed,
            };
            std::fs::create_dir_all(&output)?;
            let dir = generator::generate_bookshelf(&output, &spec)
                .with_context(|| format!("Failed to generate benchmark in {}", output.display()))?;
            log::info!("Generated: {}", dir.display());
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        log::warn!(
            "Configuration file {:?} not found. Using internal defaults.",
            path
        );
        return Ok(Config::default());
    }
    log::info!("Loading configuration from {:?}", path);
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    parse_config(&text).with_context(|| format!("Failed to parse config TOML {:?}", path))
}

fn parse_config(text: &str) -> anyhow::Result<Config> {
    Ok(toml::from_str(text)?)
}

fn benchmark_path(arg: Option<PathBuf>, config: &Config) -> anyhow::Result<PathBuf> {
    let path = arg
        .or_else(|| config.input.benchmark.as_ref().map(PathBuf::from))
        .context("No benchmark given: pass a path or set input.benchmark in the config")?;
    if !path.exists() {
        anyhow::bail!("Benchmark path missing: {}", path.display());
    }
    Ok(path)
}

fn prepare_output_dir(dir: &str) -> anyhow::Result<PathBuf> {
    let path = PathBuf::from(dir);
    if !path.exists() {
        log::info!("Creating output directory: {:?}", path);
        std::fs::create_dir_all(&path)?;
    }
    Ok(path)
}

fn load_design(path: &Path) -> anyhow::Result<Design> {
    log::info!("Parsing Bookshelf benchmark: {}", path.display());
    let timer = ScopedTimer::new("Design assembly");
    let records = bookshelf::read(path)
        .with_context(|| format!("Invalid Bookshelf input '{}'", path.display()))?;
    let design = Design::from_records(records)
        .with_context(|| format!("Inconsistent design in '{}'", path.display()))?;
    timer.finish();
    Ok(design)
}

fn run_estimate(path: &Path, config: &Config) -> anyhow::Result<()> {
    let design = load_design(path)?;
    design.summary();

    let mut estimator = CongestionEstimator::new(&design, config.estimator.clone())?;
    estimator.generate_all_congestion_maps()?;
    let maps = estimator.congestion_maps();
    let runtimes = estimator.runtimes_secs();

    let summaries = report::summarize(maps, &runtimes, config.report.hotspot_threshold);
    log::info!("Congestion summary:");
    for summary in &summaries {
        log::info!("  {}", summary);
    }
    if let Some(pin) = runtimes.get("pin") {
        log::info!("  pin density pass shared by all methods: {:.4}s", pin);
    }

    let matrix = report::correlation_matrix(maps);
    log::info!("Correlation matrix:\n{}", matrix);

    if config.report.write_csv {
        let out = prepare_output_dir(&config.input.output_dir)?;
        export_tables(&out, &design.name, &summaries, &matrix)?;
    }

    if let (Some(a), Some(b)) = (maps.get(&Method::Standard), maps.get(&Method::Rents)) {
        let top = report::top_divergence(a, b, config.report.divergence_top_n);
        log::info!(
            "Top {} bins where standard and rents disagree (first 10 shown):",
            top.len()
        );
        for d in top.iter().take(10) {
            log::info!(
                "  bin ({:>4},{:>4}) standard={:.4} rents={:.4} |diff|={:.4}",
                d.coord.x,
                d.coord.y,
                d.a,
                d.b,
                d.delta
            );
        }
    }

    if config.visualization.enabled {
        let out = prepare_output_dir(&config.input.output_dir)?;
        let size = config.visualization.image_size;

        let layout = out.join(format!("{}_layout.png", design.name));
        visualization::draw_design(&design, &layout, size, size)
            .with_context(|| format!("Failed to write {}", layout.display()))?;

        let comparison = out.join(format!("{}_congestion.png", design.name));
        eda_congestion::visualization::draw_comparison(maps, &comparison, size / 2)
            .with_context(|| format!("Failed to write {}", comparison.display()))?;
    }

    Ok(())
}

/// Writes `metrics_<design>_<unix secs>.csv` and the matching correlation table.
fn export_tables(
    dir: &Path,
    design: &str,
    summaries: &[report::MethodSummary],
    matrix: &report::CorrelationMatrix,
) -> anyhow::Result<(PathBuf, PathBuf)> {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let metrics = dir.join(format!("metrics_{}_{}.csv", design, stamp));
    let mut w = BufWriter::new(
        File::create(&metrics).with_context(|| format!("Failed to create {:?}", metrics))?,
    );
    report::write_summary_csv(&mut w, summaries)?;
    w.flush()?;

    let correlation = dir.join(format!("correlation_{}_{}.csv", design, stamp));
    let mut w = BufWriter::new(
        File::create(&correlation)
            .with_context(|| format!("Failed to create {:?}", correlation))?,
    );
    matrix.write_csv(&mut w)?;
    w.flush()?;

    log::info!(
        "Report tables written to {} and {}",
        metrics.display(),
        correlation.display()
    );
    Ok((metrics, correlation))
}

fn report_levels(design: &mut Design) {
    design.compute_levels();
    let mut histogram: BTreeMap<u32, usize> = BTreeMap::new();
    let mut unreached = 0;
    for cell in &design.cells {
        match cell.level {
            Some(level) => *histogram.entry(level).or_default() += 1,
            None => unreached += 1,
        }
    }
    log::info!("Cells per level (hops from nearest pin):");
    for (level, count) in &histogram {
        log::info!("  {:>3}: {}", level, count);
    }
    if unreached > 0 {
        log::warn!("{} cells have no net path to any pin", unreached);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = parse_config(
            r#"
            [input]
            benchmark = "inputs/adaptec1"

            [estimator]
            grid_size = 25.0

            [estimator.blend]
            pin_weight = 0.3
            "#,
        )
        .unwrap();
        assert_eq!(config.input.benchmark.as_deref(), Some("inputs/adaptec1"));
        assert_eq!(config.input.output_dir, "output");
        assert_eq!(config.estimator.grid_size, 25.0);
        assert_eq!(config.estimator.blend.demand_weight, 0.6);
        assert_eq!(config.estimator.blend.pin_weight, 0.3);
        assert_eq!(config.estimator.rent.k, 0.5);
        assert!(config.estimator.parallel);
        assert_eq!(config.report.divergence_top_n, 100);
        assert!(config.report.write_csv);
    }

    #[test]
    fn empty_config_is_all_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.estimator.grid_size, 10.0);
        assert_eq!(config.report.hotspot_threshold, 0.8);
        assert!(config.visualization.enabled);
    }

    #[test]
    fn benchmark_argument_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        assert!(benchmark_path(None, &config).is_err());

        config.input.benchmark = Some("/nonexistent/bench".to_string());
        assert!(benchmark_path(None, &config).is_err());
        let chosen = benchmark_path(Some(dir.path().to_path_buf()), &config).unwrap();
        assert_eq!(chosen, dir.path());
    }

    #[test]
    fn report_tables_land_in_output_dir() {
        use eda_common::geom::rect::Rect;
        use eda_congestion::grid::{DemandField, DemandGrid};
        use eda_congestion::map::build_maps;

        let mut grid = DemandGrid::new(Rect::from_corners(0.0, 0.0, 20.0, 0.0), 10.0).unwrap();
        let mut layer = grid.layer();
        layer.add_at(eda_common::geom::coord::GridCoord::new(1, 0), 2.0);
        grid.store(DemandField::Standard, layer);
        let maps = build_maps(&grid, Default::default()).unwrap();

        let summaries = report::summarize(&maps, &BTreeMap::new(), 0.8);
        let matrix = report::correlation_matrix(&maps);
        let dir = tempfile::tempdir().unwrap();
        let (metrics, correlation) =
            export_tables(dir.path(), "bench", &summaries, &matrix).unwrap();

        let text = std::fs::read_to_string(&metrics).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(text.starts_with("method,mean,"));
        let name = correlation.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("correlation_bench_") && name.ends_with(".csv"));
        let text = std::fs::read_to_string(&correlation).unwrap();
        assert_eq!(text.lines().next(), Some("method,standard,weighted,rents,span"));
    }
}
