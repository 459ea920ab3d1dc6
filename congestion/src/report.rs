//! Summary statistics and cross-method comparison of finished congestion maps.

use crate::grid::Method;
use crate::map::CongestionMap;
use eda_common::geom::coord::GridCoord;
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};

#[derive(Clone, Debug, PartialEq)]
pub struct MethodSummary {
    pub method: Method,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
    /// Fraction of bins whose congestion exceeds the hotspot threshold.
    pub hotspot_ratio: f64,
    pub runtime_secs: f64,
}

impl MethodSummary {
    pub fn of(map: &CongestionMap, hotspot_threshold: f64, runtime_secs: f64) -> Self {
        let values = map.congestion_values();
        let n = values.len().max(1) as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let hot = values.iter().filter(|&&v| v > hotspot_threshold).count();

        let mut sorted = values;
        sorted.sort_by(f64::total_cmp);

        Self {
            method: map.method,
            mean,
            std_dev: variance.sqrt(),
            min: sorted.first().copied().unwrap_or(0.0),
            max: sorted.last().copied().unwrap_or(0.0),
            p95: percentile(&sorted, 0.95),
            hotspot_ratio: hot as f64 / n,
            runtime_secs,
        }
    }
}

impl fmt::Display for MethodSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<9} mean={:.4} std={:.4} min={:.4} max={:.4} p95={:.4} hot={:>6.2}% t={:.4}s",
            self.method.name(),
            self.mean,
            self.std_dev,
            self.min,
            self.max,
            self.p95,
            self.hotspot_ratio * 100.0,
            self.runtime_secs
        )
    }
}

/// Writes one CSV row per summary, preceded by a header.
pub fn write_summary_csv<W: Write>(out: &mut W, summaries: &[MethodSummary]) -> io::Result<()> {
    writeln!(out, "method,mean,std_dev,min,max,p95,hotspot_ratio,runtime_secs")?;
    for s in summaries {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            s.method.name(),
            s.mean,
            s.std_dev,
            s.min,
            s.max,
            s.p95,
            s.hotspot_ratio,
            s.runtime_secs
        )?;
    }
    Ok(())
}

/// Linearly interpolated percentile of an ascending slice, `q` in `[0,1]`.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

/// One summary per map, with runtimes looked up by method name.
pub fn summarize(
    maps: &BTreeMap<Method, CongestionMap>,
    runtimes: &BTreeMap<&'static str, f64>,
    hotspot_threshold: f64,
) -> Vec<MethodSummary> {
    maps.values()
        .map(|map| {
            let runtime = runtimes.get(map.method.name()).copied().unwrap_or(0.0);
            MethodSummary::of(map, hotspot_threshold, runtime)
        })
        .collect()
}

/// Pearson correlation of two equally long samples. A constant sample has no
/// defined correlation and is reported as 0.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    (cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0)
}

/// Symmetric matrix of pairwise correlations over flattened congestion.
#[derive(Clone, Debug)]
pub struct CorrelationMatrix {
    pub methods: Vec<Method>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: Method, b: Method) -> Option<f64> {
        let i = self.methods.iter().position(|&m| m == a)?;
        let j = self.methods.iter().position(|&m| m == b)?;
        Some(self.values[i][j])
    }

    /// Square CSV table with method names as the header row and first column.
    pub fn write_csv<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "method")?;
        for m in &self.methods {
            write!(out, ",{}", m.name())?;
        }
        writeln!(out)?;
        for (m, row) in self.methods.iter().zip(&self.values) {
            write!(out, "{}", m.name())?;
            for v in row {
                write!(out, ",{}", v)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

impl fmt::Display for CorrelationMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<9}", "")?;
        for m in &self.methods {
            write!(f, " {:>9}", m.name())?;
        }
        for (m, row) in self.methods.iter().zip(&self.values) {
            write!(f, "\n{:<9}", m.name())?;
            for v in row {
                write!(f, " {:>9.4}", v)?;
            }
        }
        Ok(())
    }
}

pub fn correlation_matrix(maps: &BTreeMap<Method, CongestionMap>) -> CorrelationMatrix {
    let methods: Vec<Method> = maps.keys().copied().collect();
    let flat: Vec<Vec<f64>> = maps.values().map(|m| m.congestion_values()).collect();

    let values = (0..flat.len())
        .map(|i| {
            (0..flat.len())
                .map(|j| if i == j { 1.0 } else { pearson(&flat[i], &flat[j]) })
                .collect()
        })
        .collect();

    CorrelationMatrix { methods, values }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Divergence {
    pub coord: GridCoord,
    pub a: f64,
    pub b: f64,
    pub delta: f64,
}

/// The `n` bins where the two maps disagree most, largest `|a - b|` first.
/// Ties keep row-major order.
pub fn top_divergence(a: &CongestionMap, b: &CongestionMap, n: usize) -> Vec<Divergence> {
    let mut diffs: Vec<Divergence> = a
        .bins()
        .iter()
        .zip(b.bins())
        .enumerate()
        .map(|(i, (x, y))| Divergence {
            coord: a.coord_of(i),
            a: x.congestion,
            b: y.congestion,
            delta: (x.congestion - y.congestion).abs(),
        })
        .collect();
    diffs.sort_by(|l, r| r.delta.total_cmp(&l.delta));
    diffs.truncate(n);
    diffs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{DemandField, DemandGrid};
    use crate::map::build_maps;
    use eda_common::geom::rect::Rect;
    use eda_common::util::config::BlendWeights;

    /// Five bins in a row with distinct standard/rent profiles.
    fn maps() -> BTreeMap<Method, CongestionMap> {
        let mut grid = DemandGrid::new(Rect::from_corners(0.0, 0.0, 40.0, 0.0), 10.0).unwrap();
        let put = |grid: &mut DemandGrid, field, values: [f64; 5]| {
            let mut layer = grid.layer();
            for (x, v) in values.into_iter().enumerate() {
                layer.add_at(GridCoord::new(x as u32, 0), v);
            }
            grid.store(field, layer);
        };
        put(&mut grid, DemandField::Standard, [1.0, 2.0, 3.0, 4.0, 5.0]);
        put(&mut grid, DemandField::Weighted, [2.0, 4.0, 6.0, 8.0, 10.0]);
        put(&mut grid, DemandField::Rents, [5.0, 4.0, 3.0, 2.0, 1.0]);
        let weights = BlendWeights {
            demand_weight: 1.0,
            pin_weight: 0.0,
        };
        build_maps(&grid, weights).unwrap()
    }

    #[test]
    fn summary_statistics() {
        let maps = maps();
        let s = MethodSummary::of(&maps[&Method::Standard], 0.7, 0.25);
        assert!((s.mean - 0.6).abs() < 1e-12);
        assert!((s.min - 0.2).abs() < 1e-12);
        assert!((s.max - 1.0).abs() < 1e-12);
        assert!((s.std_dev - 0.08f64.sqrt()).abs() < 1e-12);
        assert!((s.p95 - 0.96).abs() < 1e-12);
        assert!((s.hotspot_ratio - 0.4).abs() < 1e-12);
        assert_eq!(s.runtime_secs, 0.25);

        // Span is zero everywhere.
        let s = MethodSummary::of(&maps[&Method::Span], 0.8, 0.0);
        assert_eq!((s.mean, s.std_dev, s.max, s.hotspot_ratio), (0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn summarize_attaches_runtimes_by_name() {
        let maps = maps();
        let runtimes = BTreeMap::from([("standard", 1.5), ("rents", 0.5)]);
        let summaries = summarize(&maps, &runtimes, 0.8);
        assert_eq!(summaries.len(), 4);
        let rents = summaries.iter().find(|s| s.method == Method::Rents).unwrap();
        assert_eq!(rents.runtime_secs, 0.5);
        let span = summaries.iter().find(|s| s.method == Method::Span).unwrap();
        assert_eq!(span.runtime_secs, 0.0);
    }

    #[test]
    fn correlation_signs_and_constant_maps() {
        let m = correlation_matrix(&maps());
        let get = |a, b| m.get(a, b).unwrap();
        assert!((get(Method::Standard, Method::Weighted) - 1.0).abs() < 1e-12);
        assert!((get(Method::Standard, Method::Rents) + 1.0).abs() < 1e-12);
        assert_eq!(get(Method::Span, Method::Standard), 0.0);
        assert_eq!(get(Method::Span, Method::Span), 1.0);
        assert_eq!(get(Method::Rents, Method::Weighted), get(Method::Weighted, Method::Rents));
    }

    #[test]
    fn divergence_is_sorted_descending() {
        let maps = maps();
        let top = top_divergence(&maps[&Method::Standard], &maps[&Method::Rents], 3);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].coord, GridCoord::new(0, 0));
        assert!((top[0].delta - 0.8).abs() < 1e-12);
        assert_eq!(top[1].coord, GridCoord::new(4, 0));
        assert!(top[2].delta <= top[1].delta);

        let all = top_divergence(&maps[&Method::Standard], &maps[&Method::Rents], 100);
        assert_eq!(all.len(), 5);
        assert_eq!(all[4].coord, GridCoord::new(2, 0));
        assert_eq!(all[4].delta, 0.0);
    }

    #[test]
    fn tables_export_as_csv() {
        let maps = maps();
        let summaries = summarize(&maps, &BTreeMap::from([("standard", 0.5)]), 0.8);
        let mut buf = Vec::new();
        write_summary_csv(&mut buf, &summaries).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "method,mean,std_dev,min,max,p95,hotspot_ratio,runtime_secs");
        assert!(lines[1].starts_with("standard,"));
        assert!(lines[1].ends_with(",0.5"));
        assert_eq!(lines[1].split(',').count(), 8);

        let mut buf = Vec::new();
        correlation_matrix(&maps).write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "method,standard,weighted,rents,span");
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("standard,1,"));
        assert!(lines[4].ends_with(",1"));
    }
}
