use thiserror::Error;

pub type Result<T> = std::result::Result<T, DesignError>;

/// Fatal conditions raised while assembling a [`Design`](super::core::Design).
/// Assembly stops at the first one; no partial design is returned.
#[derive(Debug, Error, PartialEq)]
pub enum DesignError {
    #[error("net '{net}' references unknown cell '{cell}'")]
    UnknownCell { net: String, cell: String },

    #[error("declared node count {declared} does not match the {actual} merged cell records")]
    NodeCountMismatch { declared: usize, actual: usize },

    #[error("cell '{0}' is placed but has no node geometry")]
    MissingGeometry(String),

    #[error("cell '{0}' has node geometry but no placement")]
    MissingPlacement(String),

    #[error("cell '{0}' is defined more than once")]
    DuplicateCell(String),

    #[error("design has no placement rows; die area is undefined")]
    NoRows,

    #[error("net '{0}' has no members; its bounding box is undefined")]
    EmptyNet(String),

    #[error("row {index} at y={y} has non-positive width {width}")]
    DegenerateRow { index: usize, y: f64, width: f64 },
}

impl DesignError {
    /// True for inconsistent input records, false for geometry that cannot be derived.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            DesignError::UnknownCell { .. }
                | DesignError::NodeCountMismatch { .. }
                | DesignError::MissingGeometry(_)
                | DesignError::MissingPlacement(_)
                | DesignError::DuplicateCell(_)
        )
    }
}
