pub mod dense;

pub use dense::{BinRange, DemandGrid, DemandLayer};

use std::fmt;
use std::str::FromStr;

/// The five demand signals accumulated in every bin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DemandField {
    PinDensity,
    Standard,
    Weighted,
    Rents,
    Span,
}

impl DemandField {
    pub const ALL: [DemandField; 5] = [
        DemandField::PinDensity,
        DemandField::Standard,
        DemandField::Weighted,
        DemandField::Rents,
        DemandField::Span,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DemandField::PinDensity => "pin",
            DemandField::Standard => "standard",
            DemandField::Weighted => "weighted",
            DemandField::Rents => "rents",
            DemandField::Span => "span",
        }
    }
}

impl fmt::Display for DemandField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A congestion estimation method: one net-demand field blended with pin density.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    Standard,
    Weighted,
    Rents,
    Span,
}

impl Method {
    pub const ALL: [Method; 4] = [Method::Standard, Method::Weighted, Method::Rents, Method::Span];

    pub fn field(self) -> DemandField {
        match self {
            Method::Standard => DemandField::Standard,
            Method::Weighted => DemandField::Weighted,
            Method::Rents => DemandField::Rents,
            Method::Span => DemandField::Span,
        }
    }

    pub fn name(self) -> &'static str {
        self.field().name()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown method '{}' (expected standard, weighted, rents or span)", s)
            })
    }
}

/// Raw demand of one bin plus the blended score of the map it belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BinRecord {
    pub pin_density: f64,
    pub net_demand_standard: f64,
    pub net_demand_weighted: f64,
    pub rent_demand: f64,
    pub span_demand: f64,
    pub congestion: f64,
}

impl BinRecord {
    #[inline]
    pub fn demand(&self, field: DemandField) -> f64 {
        match field {
            DemandField::PinDensity => self.pin_density,
            DemandField::Standard => self.net_demand_standard,
            DemandField::Weighted => self.net_demand_weighted,
            DemandField::Rents => self.rent_demand,
            DemandField::Span => self.span_demand,
        }
    }

    #[inline]
    pub fn demand_mut(&mut self, field: DemandField) -> &mut f64 {
        match field {
            DemandField::PinDensity => &mut self.pin_density,
            DemandField::Standard => &mut self.net_demand_standard,
            DemandField::Weighted => &mut self.net_demand_weighted,
            DemandField::Rents => &mut self.rent_demand,
            DemandField::Span => &mut self.span_demand,
        }
    }
}
