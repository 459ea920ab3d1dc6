use crate::db::records::{LayoutRecords, NetRecord, NodeRecord, PlacementRecord, RowRecord};
use anyhow::{Context, Result, anyhow, bail};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;

struct BenchmarkFiles {
    name: String,
    nodes: PathBuf,
    pl: PathBuf,
    nets: PathBuf,
    scl: PathBuf,
}

/// Reads a benchmark given either its directory (`<dir>/<dir name>.{nodes,pl,nets,scl}`)
/// or its `.aux` file.
pub fn read(path: &Path) -> Result<LayoutRecords> {
    let files = if path.is_dir() {
        files_from_dir(path)?
    } else {
        files_from_aux(path)?
    };
    read_files(&files)
}

fn files_from_dir(dir: &Path) -> Result<BenchmarkFiles> {
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Benchmark directory has no usable name: {:?}", dir))?
        .to_string();
    Ok(BenchmarkFiles {
        nodes: dir.join(format!("{name}.nodes")),
        pl: dir.join(format!("{name}.pl")),
        nets: dir.join(format!("{name}.nets")),
        scl: dir.join(format!("{name}.scl")),
        name,
    })
}

fn files_from_aux(aux_path: &Path) -> Result<BenchmarkFiles> {
    let parent_dir = aux_path.parent().unwrap_or(Path::new("."));
    let file = File::open(aux_path).context(format!("Failed to open AUX file: {:?}", aux_path))?;
    let reader = BufReader::new(file);

    let mut nodes_file = None;
    let mut nets_file = None;
    let mut pl_file = None;
    let mut scl_file = None;

    for line in reader.lines() {
        let line = line?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() || !parts[0].starts_with("RowBasedPlacement") {
            continue;
        }
        for part in parts.iter().skip(1) {
            let target = if part.ends_with(".nodes") {
                &mut nodes_file
            } else if part.ends_with(".nets") {
                &mut nets_file
            } else if part.ends_with(".pl") {
                &mut pl_file
            } else if part.ends_with(".scl") {
                &mut scl_file
            } else {
                continue;
            };
            *target = Some(parent_dir.join(part));
        }
    }

    let require = |file: Option<PathBuf>, ext: &str| {
        file.ok_or_else(|| anyhow!("AUX file {:?} lists no .{} file", aux_path, ext))
    };
    Ok(BenchmarkFiles {
        name: aux_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("design")
            .to_string(),
        nodes: require(nodes_file, "nodes")?,
        pl: require(pl_file, "pl")?,
        nets: require(nets_file, "nets")?,
        scl: require(scl_file, "scl")?,
    })
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).context(format!("Failed to open {:?}", path))?;
    Ok(BufReader::new(file))
}

fn read_files(files: &BenchmarkFiles) -> Result<LayoutRecords> {
    log::info!("Parsing PL: {:?}", files.pl);
    let placements =
        parse_pl(open(&files.pl)?).context(format!("Invalid PL file {:?}", files.pl))?;

    log::info!("Parsing Nodes: {:?}", files.nodes);
    let (declared_nodes, nodes) = parse_nodes(open(&files.nodes)?)
        .context(format!("Invalid Nodes file {:?}", files.nodes))?;

    log::info!("Parsing Nets: {:?}", files.nets);
    let nets =
        parse_nets(open(&files.nets)?).context(format!("Invalid Nets file {:?}", files.nets))?;

    log::info!("Parsing SCL: {:?}", files.scl);
    let rows = parse_scl(open(&files.scl)?).context(format!("Invalid SCL file {:?}", files.scl))?;

    Ok(LayoutRecords {
        name: files.name.clone(),
        declared_nodes,
        placements,
        nodes,
        nets,
        rows,
    })
}

fn is_skippable(line: &str) -> bool {
    line.is_empty() || line.starts_with('#') || line.starts_with("UCLA")
}

fn field<T: FromStr>(parts: &[&str], idx: usize, what: &str) -> Result<T> {
    let raw = parts
        .get(idx)
        .ok_or_else(|| anyhow!("missing {}", what))?;
    raw.parse()
        .map_err(|_| anyhow!("cannot parse {} from '{}'", what, raw))
}

pub fn parse_pl<R: BufRead>(reader: R) -> Result<Vec<PlacementRecord>> {
    let mut placements = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if is_skippable(line) {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let x = field(&parts, 1, "x").with_context(|| format!("line {}", lineno + 1))?;
        let y = field(&parts, 2, "y").with_context(|| format!("line {}", lineno + 1))?;

        let mut orientation = None;
        let mut rest = parts[3..].iter();
        while let Some(&token) = rest.next() {
            if token == ":" {
                orientation = rest.next().map(|o| o.to_string());
            }
        }

        placements.push(PlacementRecord {
            name: parts[0].to_string(),
            x,
            y,
            orientation,
            fixed: line.contains("/FIXED"),
        });
    }
    Ok(placements)
}

/// Returns the declared `NumNodes` (if present) with the node records.
pub fn parse_nodes<R: BufRead>(reader: R) -> Result<(Option<usize>, Vec<NodeRecord>)> {
    let mut declared = None;
    let mut nodes = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if is_skippable(line) {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts[0].starts_with("NumNodes") {
            let count = field(&parts, parts.len() - 1, "NumNodes")
                .with_context(|| format!("line {}", lineno + 1))?;
            declared = Some(count);
            continue;
        }
        if parts[0].starts_with("Num") {
            continue;
        }

        let width = field(&parts, 1, "width").with_context(|| format!("line {}", lineno + 1))?;
        let height = field(&parts, 2, "height").with_context(|| format!("line {}", lineno + 1))?;
        nodes.push(NodeRecord {
            name: parts[0].to_string(),
            width,
            height,
            terminal: parts.get(3).is_some_and(|t| t.starts_with("terminal")),
        });
    }
    Ok((declared, nodes))
}

/// Nets are named `n<k>` in file order.
pub fn parse_nets<R: BufRead>(reader: R) -> Result<Vec<NetRecord>> {
    let mut nets: Vec<NetRecord> = Vec::new();
    let mut expected_degree: Option<usize> = None;

    let check_degree = |net: Option<&NetRecord>, expected: Option<usize>| {
        if let (Some(net), Some(expected)) = (net, expected)
            && net.cells.len() != expected
        {
            log::warn!(
                "Net {} declares degree {} but lists {} pins",
                net.name,
                expected,
                net.cells.len()
            );
        }
    };

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if is_skippable(line) || line.starts_with("Num") {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts[0] == "NetDegree" {
            check_degree(nets.last(), expected_degree);
            expected_degree = Some(
                field(&parts, 2, "NetDegree").with_context(|| format!("line {}", lineno + 1))?,
            );
            nets.push(NetRecord {
                name: format!("n{}", nets.len()),
                cells: Vec::new(),
            });
        } else if let Some(net) = nets.last_mut() {
            net.cells.push(parts[0].to_string());
        }
    }
    check_degree(nets.last(), expected_degree);
    Ok(nets)
}

#[derive(Default)]
struct PendingRow {
    y: Option<f64>,
    height: Option<f64>,
    site_width: Option<f64>,
    site_spacing: Option<f64>,
    origin: Option<(f64, u32)>,
}

impl PendingRow {
    fn finish(self, index: usize) -> Result<RowRecord> {
        let missing = |what: &str| anyhow!("row {} has no {}", index, what);
        let (origin_x, site_count) = self.origin.ok_or_else(|| missing("SubrowOrigin"))?;
        Ok(RowRecord {
            y: self.y.ok_or_else(|| missing("Coordinate"))?,
            height: self.height.ok_or_else(|| missing("Height"))?,
            site_spacing: self
                .site_spacing
                .or(self.site_width)
                .ok_or_else(|| missing("Sitespacing"))?,
            origin_x,
            site_count,
        })
    }
}

pub fn parse_scl<R: BufRead>(reader: R) -> Result<Vec<RowRecord>> {
    let mut rows = Vec::new();
    let mut current: Option<PendingRow> = None;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if is_skippable(line) {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let at = || format!("line {}", lineno + 1);

        if parts[0] == "CoreRow" {
            if let Some(row) = current.take() {
                rows.push(row.finish(rows.len())?);
            }
            current = Some(PendingRow::default());
            continue;
        }
        if parts[0] == "End" {
            if let Some(row) = current.take() {
                rows.push(row.finish(rows.len())?);
            }
            continue;
        }

        let Some(row) = current.as_mut() else {
            continue;
        };
        match parts[0] {
            "Coordinate" => row.y = Some(field(&parts, 2, "Coordinate").with_context(at)?),
            "Height" => row.height = Some(field(&parts, 2, "Height").with_context(at)?),
            "Sitewidth" => row.site_width = Some(field(&parts, 2, "Sitewidth").with_context(at)?),
            "Sitespacing" => {
                row.site_spacing = Some(field(&parts, 2, "Sitespacing").with_context(at)?)
            }
            "SubrowOrigin" => {
                let origin = field(&parts, 2, "SubrowOrigin").with_context(at)?;
                let sites = field(&parts, 5, "NumSites").with_context(at)?;
                row.origin = Some((origin, sites));
            }
            _ => {}
        }
    }
    if let Some(row) = current.take() {
        rows.push(row.finish(rows.len())?);
    }

    if rows.is_empty() {
        bail!("no CoreRow entries found");
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn pl_reads_orientation_and_fixed() {
        let text = "UCLA pl 1.0\n# comment\n\no0 10 20 : N\no1 1.5 2 : FS /FIXED\no2 3 4\n";
        let pl = parse_pl(Cursor::new(text)).unwrap();
        assert_eq!(pl.len(), 3);
        assert_eq!(pl[0].name, "o0");
        assert_eq!((pl[0].x, pl[0].y), (10.0, 20.0));
        assert_eq!(pl[0].orientation.as_deref(), Some("N"));
        assert!(!pl[0].fixed);
        assert_eq!(pl[1].orientation.as_deref(), Some("FS"));
        assert!(pl[1].fixed);
        assert_eq!(pl[2].orientation, None);
    }

    #[test]
    fn pl_rejects_bad_coordinates() {
        let err = parse_pl(Cursor::new("o0 ten 20 : N\n")).unwrap_err();
        assert!(format!("{:#}", err).contains("line 1"));
    }

    #[test]
    fn nodes_reads_declared_count_and_terminals() {
        let text = "UCLA nodes 1.0\nNumNodes : 3\nNumTerminals : 2\n  a 4 12\n  b 10 24 terminal\n  c 1 1 terminal_NI\n";
        let (declared, nodes) = parse_nodes(Cursor::new(text)).unwrap();
        assert_eq!(declared, Some(3));
        assert_eq!(nodes.len(), 3);
        assert!(!nodes[0].terminal);
        assert!(nodes[1].terminal);
        assert!(nodes[2].terminal);
        assert_eq!((nodes[1].width, nodes[1].height), (10.0, 24.0));
    }

    #[test]
    fn nets_are_numbered_in_file_order() {
        let text = "UCLA nets 1.0\nNumNets : 2\nNumPins : 5\nNetDegree : 2 foo\n a I : 0 0\n b O : 0.5 0.5\nNetDegree : 3\n c I\n a O\n b I\n";
        let nets = parse_nets(Cursor::new(text)).unwrap();
        assert_eq!(nets.len(), 2);
        assert_eq!(nets[0].name, "n0");
        assert_eq!(nets[0].cells, vec!["a", "b"]);
        assert_eq!(nets[1].name, "n1");
        assert_eq!(nets[1].cells, vec!["c", "a", "b"]);
    }

    #[test]
    fn scl_reads_rows() {
        let text = "UCLA scl 1.0\nNumRows : 2\n\nCoreRow Horizontal\n  Coordinate : 0\n  Height : 12\n  Sitewidth : 1\n  Sitespacing : 2\n  Siteorient : 1\n  Sitesymmetry : 1\n  SubrowOrigin : 5 NumSites : 100\nEnd\nCoreRow Horizontal\n  Coordinate : 12\n  Height : 12\n  Sitewidth : 1\n  SubrowOrigin : 0 NumSites : 50\nEnd\n";
        let rows = parse_scl(Cursor::new(text)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            RowRecord {
                y: 0.0,
                height: 12.0,
                site_spacing: 2.0,
                origin_x: 5.0,
                site_count: 100
            }
        );
        assert_eq!(rows[1].site_spacing, 1.0);
        assert_eq!(rows[1].site_count, 50);
    }

    #[test]
    fn scl_requires_complete_rows() {
        let text = "CoreRow Horizontal\n  Height : 12\n  SubrowOrigin : 0 NumSites : 5\nEnd\n";
        let err = parse_scl(Cursor::new(text)).unwrap_err();
        assert!(err.to_string().contains("Coordinate"));
    }

    #[test]
    fn reads_benchmark_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("tiny");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("tiny.nodes"), "NumNodes : 2\na 1 1\nb 1 1 terminal\n").unwrap();
        std::fs::write(dir.join("tiny.pl"), "a 0 0 : N\nb 9 9 : N /FIXED\n").unwrap();
        std::fs::write(dir.join("tiny.nets"), "NetDegree : 2\na I\nb O\n").unwrap();
        std::fs::write(
            dir.join("tiny.scl"),
            "CoreRow Horizontal\nCoordinate : 0\nHeight : 1\nSitespacing : 1\nSubrowOrigin : 0 NumSites : 4\nEnd\n",
        )
        .unwrap();

        let records = read(&dir).unwrap();
        assert_eq!(records.name, "tiny");
        assert_eq!(records.declared_nodes, Some(2));
        assert_eq!(records.placements.len(), 2);
        assert_eq!(records.nets.len(), 1);
        assert_eq!(records.rows.len(), 1);

        std::fs::write(
            dir.join("tiny.aux"),
            "RowBasedPlacement : tiny.nodes tiny.nets tiny.wts tiny.pl tiny.scl\n",
        )
        .unwrap();
        let via_aux = read(&dir.join("tiny.aux")).unwrap();
        assert_eq!(via_aux.nodes, records.nodes);
    }
}
