use super::point::Point;

/// Axis-aligned box; `min` is the lower-left corner, `max` the upper-right.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub min: Point<f64>,
    pub max: Point<f64>,
}

impl Rect {
    pub fn new(min: Point<f64>, max: Point<f64>) -> Self {
        Self { min, max }
    }

    pub fn from_corners(lx: f64, ly: f64, rx: f64, hy: f64) -> Self {
        Self::new(Point::new(lx, ly), Point::new(rx, hy))
    }

    /// An empty accumulator for `expand`; every real box absorbs it.
    pub fn inverted() -> Self {
        Self::from_corners(
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        )
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn half_perimeter(&self) -> f64 {
        self.width() + self.height()
    }

    pub fn expand(&mut self, other: &Rect) {
        self.min.x = self.min.x.min(other.min.x);
        self.min.y = self.min.y.min(other.min.y);
        self.max.x = self.max.x.max(other.max.x);
        self.max.y = self.max.y.max(other.max.y);
    }

    /// Inclusive on all four edges.
    pub fn contains(&self, p: Point<f64>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}
