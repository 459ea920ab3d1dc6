use crate::db::error::{DesignError, Result};
use crate::db::indices::*;
use crate::db::records::{CellRecord, LayoutRecords, NetRecord, RowRecord, merge_cell_records};
use crate::geom::point::Point;
use crate::geom::rect::Rect;
use std::collections::{HashMap, VecDeque};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellKind {
    Standard,
    Terminal,
}

/// Classification derived from the kind and the die area. A terminal inside
/// the die is a macro, outside it is an I/O pin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CellRole {
    #[default]
    Standard,
    Macro,
    Pin,
}

#[derive(Clone, Debug)]
pub struct CellData {
    pub name: String,
    pub origin: Point<f64>,
    pub width: f64,
    pub height: f64,
    pub kind: CellKind,
    pub orientation: Option<String>,
    pub is_fixed: bool,
    pub role: CellRole,
    /// Sum over this cell's nets of the pin cells on each net.
    pub pin_exposure: usize,
    pub nets: Vec<NetId>,
    /// Net-adjacency hops from the nearest pin, see [`Design::compute_levels`].
    pub level: Option<u32>,
}

impl CellData {
    #[inline]
    pub fn lx(&self) -> f64 {
        self.origin.x
    }
    #[inline]
    pub fn ly(&self) -> f64 {
        self.origin.y
    }
    #[inline]
    pub fn rx(&self) -> f64 {
        self.origin.x + self.width
    }
    #[inline]
    pub fn hy(&self) -> f64 {
        self.origin.y + self.height
    }

    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.lx(), self.ly(), self.rx(), self.hy())
    }

    pub fn is_macro(&self) -> bool {
        self.role == CellRole::Macro
    }
    pub fn is_pin(&self) -> bool {
        self.role == CellRole::Pin
    }
    pub fn is_terminal(&self) -> bool {
        self.kind == CellKind::Terminal
    }
}

#[derive(Clone, Debug)]
pub struct RowData {
    pub y: f64,
    pub height: f64,
    pub origin_x: f64,
    pub site_spacing: f64,
    pub site_count: u32,
    /// Members ordered by ascending `lx`.
    pub cells: Vec<CellId>,
    pub density: f64,
}

impl RowData {
    pub fn lx(&self) -> f64 {
        self.origin_x
    }
    pub fn ly(&self) -> f64 {
        self.y
    }
    pub fn rx(&self) -> f64 {
        self.origin_x + self.site_count as f64 * self.site_spacing
    }
    pub fn hy(&self) -> f64 {
        self.y + self.height
    }
    pub fn width(&self) -> f64 {
        self.rx() - self.lx()
    }

    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.lx(), self.ly(), self.rx(), self.hy())
    }
}

#[derive(Clone, Debug)]
pub struct NetData {
    pub name: String,
    /// Distinct members in first-seen order.
    pub cells: Vec<CellId>,
    pub bbox: Rect,
    pub hpwl: f64,
}

impl NetData {
    pub fn degree(&self) -> usize {
        self.cells.len()
    }
}

/// Cross-linked placement database. Owns every cell, row and net; relations
/// between cells and nets are stored as handles into the owned arenas.
pub struct Design {
    pub name: String,
    pub cells: Vec<CellData>,
    pub rows: Vec<RowData>,
    pub nets: Vec<NetData>,

    pub cell_name_map: HashMap<String, CellId>,
    pub net_name_map: HashMap<String, NetId>,

    pub pins: Vec<CellId>,
    pub macros: Vec<CellId>,

    pub die_area: Rect,
    pub mean_density: f64,
    pub total_hpwl: f64,
}

impl Design {
    /// Reads merged cell records and builds the full model.
    pub fn from_records(records: LayoutRecords) -> Result<Self> {
        let cells =
            merge_cell_records(records.placements, records.nodes, records.declared_nodes)?;
        Self::build(records.name, cells, records.rows, records.nets)
    }

    /// Assembles the model: cells, rows, nets, die geometry, classification,
    /// then pin exposure. Each step relies on the ones before it.
    pub fn build(
        name: impl Into<String>,
        cells: Vec<CellRecord>,
        rows: Vec<RowRecord>,
        nets: Vec<NetRecord>,
    ) -> Result<Self> {
        let mut design = Self {
            name: name.into(),
            cells: Vec::with_capacity(cells.len()),
            rows: Vec::with_capacity(rows.len()),
            nets: Vec::with_capacity(nets.len()),
            cell_name_map: HashMap::with_capacity(cells.len()),
            net_name_map: HashMap::with_capacity(nets.len()),
            pins: Vec::new(),
            macros: Vec::new(),
            die_area: Rect::default(),
            mean_density: 0.0,
            total_hpwl: 0.0,
        };

        for record in cells {
            design.add_cell(record)?;
        }
        let by_row_y = design.cells_by_y();
        for record in rows {
            design.add_row(record, &by_row_y)?;
        }
        for record in nets {
            design.add_net(record)?;
        }
        design.compute_global_geometry()?;
        design.classify_cells();
        design.accumulate_pin_exposure();

        log::info!(
            "Design '{}': {} cells ({} macros, {} pins), {} nets, {} rows",
            design.name,
            design.num_cells(),
            design.macros.len(),
            design.pins.len(),
            design.num_nets(),
            design.num_rows()
        );
        Ok(design)
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }
    pub fn num_nets(&self) -> usize {
        self.nets.len()
    }
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
    /// Cells placed with `/FIXED` in the placement file.
    pub fn num_fixed(&self) -> usize {
        self.cells.iter().filter(|c| c.is_fixed).count()
    }

    pub fn width(&self) -> f64 {
        self.die_area.width()
    }
    pub fn height(&self) -> f64 {
        self.die_area.height()
    }

    pub fn cell(&self, id: CellId) -> &CellData {
        &self.cells[id.index()]
    }
    pub fn net(&self, id: NetId) -> &NetData {
        &self.nets[id.index()]
    }
    pub fn row(&self, id: RowId) -> &RowData {
        &self.rows[id.index()]
    }

    pub fn cell_by_name(&self, name: &str) -> Option<&CellData> {
        self.cell_name_map.get(name).map(|&id| self.cell(id))
    }
    pub fn net_by_name(&self, name: &str) -> Option<&NetData> {
        self.net_name_map.get(name).map(|&id| self.net(id))
    }

    fn add_cell(&mut self, record: CellRecord) -> Result<CellId> {
        if self.cell_name_map.contains_key(&record.name) {
            return Err(DesignError::DuplicateCell(record.name));
        }
        let id = CellId::new(self.cells.len());
        self.cell_name_map.insert(record.name.clone(), id);
        self.cells.push(CellData {
            name: record.name,
            origin: Point::new(record.x, record.y),
            width: record.width,
            height: record.height,
            kind: if record.terminal {
                CellKind::Terminal
            } else {
                CellKind::Standard
            },
            orientation: record.orientation,
            is_fixed: record.fixed,
            role: CellRole::Standard,
            pin_exposure: 0,
            nets: Vec::new(),
            level: None,
        });
        Ok(id)
    }

    /// Groups cells by exact lower y so rows can pick members without a full scan.
    fn cells_by_y(&self) -> HashMap<u64, Vec<CellId>> {
        let mut groups: HashMap<u64, Vec<CellId>> = HashMap::new();
        for id in CellId::range(self.cells.len()) {
            groups.entry(y_key(self.cell(id).ly())).or_default().push(id);
        }
        groups
    }

    fn add_row(
        &mut self,
        record: RowRecord,
        by_row_y: &HashMap<u64, Vec<CellId>>,
    ) -> Result<RowId> {
        let id = RowId::new(self.rows.len());
        let mut row = RowData {
            y: record.y,
            height: record.height,
            origin_x: record.origin_x,
            site_spacing: record.site_spacing,
            site_count: record.site_count,
            cells: Vec::new(),
            density: 0.0,
        };

        let width = row.width();
        if !(width > 0.0) {
            return Err(DesignError::DegenerateRow {
                index: id.index(),
                y: row.y,
                width,
            });
        }

        row.cells = by_row_y.get(&y_key(row.y)).cloned().unwrap_or_default();
        row.cells
            .sort_by(|&a, &b| self.cell(a).lx().total_cmp(&self.cell(b).lx()));

        let used: f64 = row.cells.iter().map(|&c| self.cell(c).width).sum();
        row.density = used / width;
        if row.density > 1.0 {
            log::warn!(
                "Row {} at y={} is overfilled (density {:.3})",
                id.index(),
                row.y,
                row.density
            );
        }

        self.rows.push(row);
        Ok(id)
    }

    fn add_net(&mut self, record: NetRecord) -> Result<NetId> {
        let id = NetId::new(self.nets.len());

        let mut members: Vec<CellId> = Vec::with_capacity(record.cells.len());
        for cell_name in &record.cells {
            let Some(&cell_id) = self.cell_name_map.get(cell_name) else {
                return Err(DesignError::UnknownCell {
                    net: record.name.clone(),
                    cell: cell_name.clone(),
                });
            };
            if !members.contains(&cell_id) {
                members.push(cell_id);
            }
        }
        if members.is_empty() {
            return Err(DesignError::EmptyNet(record.name));
        }

        let mut bbox = Rect::inverted();
        for &c in &members {
            bbox.expand(&self.cell(c).rect());
            self.cells[c.index()].nets.push(id);
        }

        self.net_name_map.insert(record.name.clone(), id);
        self.nets.push(NetData {
            name: record.name,
            cells: members,
            bbox,
            hpwl: bbox.half_perimeter(),
        });
        Ok(id)
    }

    fn compute_global_geometry(&mut self) -> Result<()> {
        if self.rows.is_empty() {
            return Err(DesignError::NoRows);
        }

        let mut die = Rect::inverted();
        for row in &self.rows {
            die.expand(&row.rect());
        }
        self.die_area = die;

        self.mean_density =
            self.rows.iter().map(|r| r.density).sum::<f64>() / self.rows.len() as f64;
        self.total_hpwl = self.nets.iter().map(|n| n.hpwl).sum();
        Ok(())
    }

    fn classify_cells(&mut self) {
        let die = self.die_area;
        for (i, cell) in self.cells.iter_mut().enumerate() {
            if !cell.is_terminal() {
                continue;
            }
            // A terminal sitting exactly on the die edge counts as inside.
            if die.contains(cell.origin) {
                cell.role = CellRole::Macro;
                self.macros.push(CellId::new(i));
            } else {
                cell.role = CellRole::Pin;
                self.pins.push(CellId::new(i));
            }
        }
    }

    fn accumulate_pin_exposure(&mut self) {
        for net in &self.nets {
            let pin_count = net
                .cells
                .iter()
                .filter(|&&c| self.cells[c.index()].is_pin())
                .count();
            if pin_count == 0 {
                continue;
            }
            for &c in &net.cells {
                let cell = &mut self.cells[c.index()];
                if !cell.is_pin() {
                    cell.pin_exposure += pin_count;
                }
            }
        }
    }

    /// Multi-source BFS from every pin (level 0) across net adjacency.
    /// Cells with no path to a pin keep `level == None`.
    pub fn compute_levels(&mut self) {
        for cell in &mut self.cells {
            cell.level = None;
        }

        let mut queue = VecDeque::with_capacity(self.pins.len());
        for &pin in &self.pins {
            self.cells[pin.index()].level = Some(0);
            queue.push_back(pin);
        }

        while let Some(current) = queue.pop_front() {
            let Some(level) = self.cells[current.index()].level else {
                continue;
            };
            for net_idx in 0..self.cells[current.index()].nets.len() {
                let net = self.cells[current.index()].nets[net_idx];
                for &neighbor in &self.nets[net.index()].cells {
                    let cell = &mut self.cells[neighbor.index()];
                    if cell.level.is_none() {
                        cell.level = Some(level + 1);
                        queue.push_back(neighbor);
                    }
                }
            }
        }
    }

    pub fn summary(&self) {
        log::info!("Design: {}", self.name);
        log::info!(
            "Die: lx={} ly={} rx={} hy={} (width={} height={})",
            self.die_area.min.x,
            self.die_area.min.y,
            self.die_area.max.x,
            self.die_area.max.y,
            self.width(),
            self.height()
        );
        log::info!(
            "Mean row density: {:.4}, total HPWL: {:.1}",
            self.mean_density,
            self.total_hpwl
        );
        log::info!(
            "Cells: {} (macros {}, pins {}, fixed {}), nets: {}, rows: {}",
            self.num_cells(),
            self.macros.len(),
            self.pins.len(),
            self.num_fixed(),
            self.num_nets(),
            self.num_rows()
        );
    }
}

/// Hash key for exact float equality; folds -0.0 onto 0.0.
fn y_key(y: f64) -> u64 {
    if y == 0.0 { 0 } else { y.to_bits() }
}
