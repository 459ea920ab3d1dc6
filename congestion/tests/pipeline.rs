use eda_common::db::core::Design;
use eda_common::db::parser::bookshelf;
use eda_common::util::config::EstimatorConfig;
use eda_common::util::generator::{BenchmarkSpec, generate_bookshelf};
use eda_congestion::grid::DemandField;
use eda_congestion::{CongestionEstimator, Method, report, visualization};
use std::path::Path;

fn benchmark(dir: &Path, seed: u64) -> Design {
    let spec = BenchmarkSpec {
        name: "bench".to_string(),
        cells: 400,
        nets: 350,
        macros: 2,
        io_pins: 16,
        utilization: 0.6,
        seed: Some(seed),
    };
    let bench_dir = generate_bookshelf(dir, &spec).unwrap();
    let records = bookshelf::read(&bench_dir.join("bench.aux")).unwrap();
    Design::from_records(records).unwrap()
}

#[test]
fn generated_benchmark_produces_four_bounded_maps() {
    let tmp = tempfile::tempdir().unwrap();
    let design = benchmark(tmp.path(), 11);
    assert_eq!(design.num_cells(), 418);

    let mut est = CongestionEstimator::new(&design, EstimatorConfig::default()).unwrap();
    let maps = est.generate_all_congestion_maps().unwrap();
    assert_eq!(maps.keys().copied().collect::<Vec<_>>(), Method::ALL.to_vec());

    let grid = est.grid().unwrap();
    for map in est.congestion_maps().values() {
        assert_eq!((map.x_bins, map.y_bins), (grid.x_bins(), grid.y_bins()));
        assert_eq!(map.grid_size, 10.0);
        let values = map.congestion_values();
        assert_eq!(values.len(), grid.len());
        assert!(values.iter().all(|c| (0.0..=1.0).contains(c)));
        assert!(values.iter().any(|&c| c > 0.0));
    }

    let runtimes = est.runtimes_secs();
    for field in DemandField::ALL {
        assert!(runtimes.contains_key(field.name()));
    }

    let summaries = report::summarize(est.congestion_maps(), &runtimes, 0.8);
    assert_eq!(summaries.len(), 4);
    for s in &summaries {
        assert!(s.min <= s.mean && s.mean <= s.max);
        assert!(s.p95 <= s.max);
    }
    let matrix = report::correlation_matrix(est.congestion_maps());
    assert_eq!(matrix.get(Method::Standard, Method::Standard), Some(1.0));

    let png = tmp.path().join("comparison.png");
    visualization::draw_comparison(est.congestion_maps(), &png, 128).unwrap();
    assert!(png.exists());
}

#[test]
fn parallel_and_serial_runs_agree() {
    let tmp = tempfile::tempdir().unwrap();
    let design = benchmark(tmp.path(), 3);

    let serial = EstimatorConfig {
        parallel: false,
        grid_size: 7.5,
        ..EstimatorConfig::default()
    };
    let parallel = EstimatorConfig {
        grid_size: 7.5,
        ..EstimatorConfig::default()
    };

    let mut a = CongestionEstimator::new(&design, serial).unwrap();
    let mut b = CongestionEstimator::new(&design, parallel).unwrap();
    a.generate_all_congestion_maps().unwrap();
    b.generate_all_congestion_maps().unwrap();

    for method in Method::ALL {
        let ma = a.congestion_map(method).unwrap();
        let mb = b.congestion_map(method).unwrap();
        for (x, y) in ma.bins().iter().zip(mb.bins()) {
            assert!((x.congestion - y.congestion).abs() < 1e-9);
        }
    }
}

#[test]
fn finer_grid_never_has_fewer_bins() {
    let tmp = tempfile::tempdir().unwrap();
    let design = benchmark(tmp.path(), 5);

    let mut previous = 0;
    for grid_size in [40.0, 20.0, 10.0, 5.0] {
        let config = EstimatorConfig {
            grid_size,
            ..EstimatorConfig::default()
        };
        let mut est = CongestionEstimator::new(&design, config).unwrap();
        est.initialize().unwrap();
        let bins = est.grid().unwrap().x_bins();
        assert!(bins >= previous);
        previous = bins;
    }
}
