use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const ROW_HEIGHT: u32 = 12;

/// Shape of a synthetic row-based benchmark.
#[derive(Clone, Debug)]
pub struct BenchmarkSpec {
    pub name: String,
    pub cells: usize,
    pub nets: usize,
    pub macros: usize,
    pub io_pins: usize,
    pub utilization: f64,
    pub seed: Option<u64>,
}

struct Placed {
    name: String,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    terminal: bool,
    outside: bool,
}

/// Writes `<out_dir>/<name>/<name>.{aux,nodes,pl,nets,scl}` describing a
/// legalized placement: standard cells snapped to rows, macros inside the die,
/// I/O pins just outside it. Returns the benchmark directory.
pub fn generate_bookshelf(out_dir: &Path, spec: &BenchmarkSpec) -> std::io::Result<PathBuf> {
    let mut rng = match spec.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let util = spec.utilization.clamp(0.05, 0.95);
    let num_cells = spec.cells.max(1);

    let widths: Vec<u32> = (0..num_cells).map(|_| rng.gen_range(2..=8)).collect();
    let total_sites: u64 = widths.iter().map(|&w| w as u64).sum();
    let required = total_sites as f64 / util;
    let num_rows = ((required / ROW_HEIGHT as f64).sqrt().ceil() as u32).max(2);
    let per_row = num_cells.div_ceil(num_rows as usize);
    let widest_row = widths
        .chunks(per_row)
        .map(|chunk| chunk.iter().sum::<u32>())
        .max()
        .unwrap_or(0);
    let row_sites = ((required / num_rows as f64).ceil() as u32)
        .max(widest_row)
        .max(16);

    log::info!(
        "Generating Bookshelf benchmark '{}': {} cells, {} nets, {} macros, {} pins, {} rows x {} sites (Target Util: {:.1}%)",
        spec.name,
        num_cells,
        spec.nets,
        spec.macros,
        spec.io_pins,
        num_rows,
        row_sites,
        util * 100.0
    );

    let mut placed: Vec<Placed> = Vec::with_capacity(num_cells + spec.macros + spec.io_pins);

    for (row_idx, chunk) in widths.chunks(per_row).enumerate() {
        let y = row_idx as u32 * ROW_HEIGHT;
        let used: u32 = chunk.iter().sum();
        let mut free = row_sites.saturating_sub(used);
        let avg_gap = free / (chunk.len() as u32 + 1);

        let mut x = 0;
        for &w in chunk {
            let gap = rng.gen_range(0..=(2 * avg_gap)).min(free);
            free -= gap;
            x += gap;
            placed.push(Placed {
                name: format!("o{}", placed.len()),
                x,
                y,
                w,
                h: ROW_HEIGHT,
                terminal: false,
                outside: false,
            });
            x += w;
        }
    }

    let die_w = row_sites;
    let die_h = num_rows * ROW_HEIGHT;

    for i in 0..spec.macros {
        let w = rng.gen_range(ROW_HEIGHT..=ROW_HEIGHT * 4).min(die_w);
        let h = ROW_HEIGHT * rng.gen_range(1..=3u32).min(num_rows);
        placed.push(Placed {
            name: format!("m{}", i),
            x: rng.gen_range(0..=die_w - w),
            // Half-row offset keeps macros out of row membership.
            y: ROW_HEIGHT * rng.gen_range(0..=num_rows - h / ROW_HEIGHT) + ROW_HEIGHT / 2,
            w,
            h,
            terminal: true,
            outside: false,
        });
    }

    for i in 0..spec.io_pins {
        // Pins sit one unit outside a random die edge, side pins mid-row.
        let mid_row = ROW_HEIGHT * rng.gen_range(0..num_rows) + ROW_HEIGHT / 2;
        let (x, y) = match rng.gen_range(0..4) {
            0 => (rng.gen_range(0..die_w), die_h + 1),
            1 => (die_w + 1, mid_row),
            2 => (rng.gen_range(0..die_w), 0),
            _ => (0, mid_row),
        };
        placed.push(Placed {
            name: format!("p{}", i),
            x,
            y,
            w: 1,
            h: 1,
            terminal: true,
            outside: true,
        });
    }

    let dir = out_dir.join(&spec.name);
    fs::create_dir_all(&dir)?;
    let path = |ext: &str| dir.join(format!("{}.{}", spec.name, ext));

    let mut aux = File::create(path("aux"))?;
    writeln!(
        aux,
        "RowBasedPlacement : {0}.nodes {0}.nets {0}.wts {0}.pl {0}.scl",
        spec.name
    )?;

    let terminals = placed.iter().filter(|p| p.terminal).count();
    let mut nodes = BufWriter::new(File::create(path("nodes"))?);
    writeln!(nodes, "UCLA nodes 1.0\n")?;
    writeln!(nodes, "NumNodes : {}", placed.len())?;
    writeln!(nodes, "NumTerminals : {}", terminals)?;
    for p in &placed {
        if p.terminal {
            writeln!(nodes, "  {} {} {} terminal", p.name, p.w, p.h)?;
        } else {
            writeln!(nodes, "  {} {} {}", p.name, p.w, p.h)?;
        }
    }

    let mut pl = BufWriter::new(File::create(path("pl"))?);
    writeln!(pl, "UCLA pl 1.0\n")?;
    for p in &placed {
        // Bottom/left pins get pushed below/left of the origin.
        let (x, y) = match (p.outside, p.x, p.y) {
            (true, 0, y) => (-1, y as i64),
            (true, x, 0) => (x as i64, -1),
            (_, x, y) => (x as i64, y as i64),
        };
        if p.terminal {
            writeln!(pl, "{} {} {} : N /FIXED", p.name, x, y)?;
        } else {
            writeln!(pl, "{} {} {} : N", p.name, x, y)?;
        }
    }

    let nets = random_nets(&mut rng, spec.nets, num_cells, spec.macros, spec.io_pins);
    let num_pins: usize = nets.iter().map(|n| n.len()).sum();
    let mut nets_file = BufWriter::new(File::create(path("nets"))?);
    writeln!(nets_file, "UCLA nets 1.0\n")?;
    writeln!(nets_file, "NumNets : {}", nets.len())?;
    writeln!(nets_file, "NumPins : {}", num_pins)?;
    for (i, members) in nets.iter().enumerate() {
        writeln!(nets_file, "NetDegree : {} n{}", members.len(), i)?;
        for &m in members {
            writeln!(nets_file, "  {} B : 0.0 0.0", placed[m].name)?;
        }
    }

    let mut scl = BufWriter::new(File::create(path("scl"))?);
    writeln!(scl, "UCLA scl 1.0\n")?;
    writeln!(scl, "NumRows : {}\n", num_rows)?;
    for r in 0..num_rows {
        writeln!(scl, "CoreRow Horizontal")?;
        writeln!(scl, "  Coordinate : {}", r * ROW_HEIGHT)?;
        writeln!(scl, "  Height : {}", ROW_HEIGHT)?;
        writeln!(scl, "  Sitewidth : 1")?;
        writeln!(scl, "  Sitespacing : 1")?;
        writeln!(scl, "  Siteorient : 1")?;
        writeln!(scl, "  Sitesymmetry : 1")?;
        writeln!(scl, "  SubrowOrigin : 0 NumSites : {}", row_sites)?;
        writeln!(scl, "End")?;
    }

    nodes.flush()?;
    pl.flush()?;
    nets_file.flush()?;
    scl.flush()?;
    Ok(dir)
}

/// Nets mostly connect index-neighbouring cells (which the row packing keeps
/// spatially close), with occasional macros and pins mixed in.
fn random_nets(
    rng: &mut StdRng,
    num_nets: usize,
    num_cells: usize,
    num_macros: usize,
    num_pins: usize,
) -> Vec<Vec<usize>> {
    const WINDOW: usize = 64;
    let mut nets = Vec::with_capacity(num_nets);

    for _ in 0..num_nets {
        let degree = if rng.gen_bool(0.1) {
            rng.gen_range(6..=24)
        } else {
            rng.gen_range(2..=5)
        };

        let anchor = rng.gen_range(0..num_cells);
        let lo = anchor.saturating_sub(WINDOW);
        let hi = (anchor + WINDOW).min(num_cells - 1);

        let mut members = BTreeSet::new();
        members.insert(anchor);
        for _ in 1..degree {
            members.insert(rng.gen_range(lo..=hi));
        }
        if num_macros > 0 && rng.gen_bool(0.05) {
            members.insert(num_cells + rng.gen_range(0..num_macros));
        }
        if num_pins > 0 && rng.gen_bool(0.1) {
            members.insert(num_cells + num_macros + rng.gen_range(0..num_pins));
        }
        nets.push(members.into_iter().collect());
    }
    nets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::core::Design;
    use crate::db::parser::bookshelf;

    #[test]
    fn generated_benchmark_round_trips_into_a_design() {
        let tmp = tempfile::tempdir().unwrap();
        let spec = BenchmarkSpec {
            name: "synthetic".to_string(),
            cells: 300,
            nets: 250,
            macros: 3,
            io_pins: 12,
            utilization: 0.6,
            seed: Some(7),
        };
        let dir = generate_bookshelf(tmp.path(), &spec).unwrap();

        let records = bookshelf::read(&dir).unwrap();
        assert_eq!(records.declared_nodes, Some(315));

        let design = Design::from_records(records).unwrap();
        assert_eq!(design.num_cells(), 315);
        assert_eq!(design.num_nets(), 250);
        assert_eq!(design.macros.len(), 3);
        assert_eq!(design.pins.len(), 12);
        assert!(design.rows.iter().all(|r| r.density <= 1.0));

        let placed_in_rows: usize = design.rows.iter().map(|r| r.cells.len()).sum();
        assert!(placed_in_rows >= 300);
    }
}
