//! Common value types for the 3D placement engine.
//!
//! Everything in here is an immutable `Copy` value: extents, reference
//! corners, forbidden boxes and sweep events. The engine only ever derives new
//! values from them, it never mutates them in place.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Global numerical tolerance for floating-point comparisons in tests and
/// fit checks.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// One of the three container axes.
///
/// `Depth` runs back to front (x), `Width` left to right (y) and `Height`
/// bottom to top (z).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Depth,
    Width,
    Height,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Depth, Axis::Width, Axis::Height];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Axis::Depth => 0,
            Axis::Width => 1,
            Axis::Height => 2,
        }
    }

    /// The two axes whose extents are exchanged when rotating about `self`.
    #[inline]
    pub const fn rotation_plane(self) -> (usize, usize) {
        let i = self.index();
        ((i + 1) % 3, (i + 2) % 3)
    }
}

/// Extents of a block or of the container: (depth, width, height).
///
/// # Examples
/// ```
/// use strip_stack::types::Shape;
///
/// let shape = Shape::new(10.0, 20.0, 30.0);
/// assert_eq!(shape.volume(), 6000.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub depth: f64,
    pub width: f64,
    pub height: f64,
}

impl Shape {
    #[inline]
    pub const fn new(depth: f64, width: f64, height: f64) -> Self {
        Self {
            depth,
            width,
            height,
        }
    }

    /// Creates a shape after checking that every extent is positive and finite.
    pub fn try_new(depth: f64, width: f64, height: f64) -> Result<Self, String> {
        validation::validate_dimensions_3d((depth, width, height))?;
        Ok(Self::new(depth, width, height))
    }

    #[inline]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.depth, self.width, self.height)
    }

    #[inline]
    pub const fn from_tuple(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }

    #[inline]
    pub const fn as_array(&self) -> [f64; 3] {
        [self.depth, self.width, self.height]
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.depth * self.width * self.height
    }

    #[inline]
    pub fn extent(&self, axis: Axis) -> f64 {
        self.as_array()[axis.index()]
    }

    /// Checks whether the footprint (depth × width) fits inside `container`.
    ///
    /// Height is not compared: the container has no ceiling.
    #[inline]
    pub fn fits_footprint(&self, container: &Self, tolerance: f64) -> bool {
        self.depth <= container.depth + tolerance && self.width <= container.width + tolerance
    }
}

impl From<(f64, f64, f64)> for Shape {
    #[inline]
    fn from(tuple: (f64, f64, f64)) -> Self {
        Self::from_tuple(tuple)
    }
}

/// Back-left-bottom reference point of a block in container space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Corner {
    /// Back coordinate (depth axis)
    pub x: f64,
    /// Left coordinate (width axis)
    pub y: f64,
    /// Bottom coordinate (height axis)
    pub z: f64,
}

impl Corner {
    pub const ORIGIN: Corner = Corner::new(0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    #[inline]
    pub const fn from_tuple(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }

    /// The opposite (front-right-top) corner of a block of `shape` placed here.
    #[inline]
    pub fn far_corner(&self, shape: &Shape) -> Corner {
        Corner::new(
            self.x + shape.depth,
            self.y + shape.width,
            self.z + shape.height,
        )
    }
}

impl From<(f64, f64, f64)> for Corner {
    #[inline]
    fn from(tuple: (f64, f64, f64)) -> Self {
        Self::from_tuple(tuple)
    }
}

impl From<Corner> for (f64, f64, f64) {
    #[inline]
    fn from(corner: Corner) -> Self {
        corner.as_tuple()
    }
}

/// Forbidden region for a candidate's reference corner (no-fit box).
///
/// A candidate whose corner lies strictly inside the box overlaps the
/// obstacle the box was built from. Touching the boundary is allowed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoFitBox {
    pub back: f64,
    pub front: f64,
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

impl NoFitBox {
    /// Lower and upper bound along `axis`.
    #[inline]
    pub fn bounds(&self, axis: Axis) -> (f64, f64) {
        match axis {
            Axis::Depth => (self.back, self.front),
            Axis::Width => (self.left, self.right),
            Axis::Height => (self.bottom, self.top),
        }
    }

    /// Checks whether `corner` lies strictly inside the box.
    #[inline]
    pub fn contains_strictly(&self, corner: &Corner) -> bool {
        self.back < corner.x
            && corner.x < self.front
            && self.left < corner.y
            && corner.y < self.right
            && self.bottom < corner.z
            && corner.z < self.top
    }
}

/// Whether a sweep event opens or closes a forbidden interval.
///
/// Declared exit-first so that the derived order matches the numeric order
/// of the signs (-1 < +1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sign {
    Exit,
    Enter,
}

/// A boundary of one no-fit box along one axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Event {
    pub coord: f64,
    pub sign: Sign,
    pub obstacle: usize,
}

impl Event {
    #[inline]
    pub const fn new(coord: f64, sign: Sign, obstacle: usize) -> Self {
        Self {
            coord,
            sign,
            obstacle,
        }
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Tuple order on (coordinate, sign, obstacle index).
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.coord
            .total_cmp(&other.coord)
            .then_with(|| self.sign.cmp(&other.sign))
            .then_with(|| self.obstacle.cmp(&other.obstacle))
    }
}

/// Validation helpers shared by the model and the request layer.
pub mod validation {

    /// Validates a single dimension.
    ///
    /// # Parameters
    /// * `value` - The value to validate
    /// * `name` - Name of the dimension for error messages
    ///
    /// # Returns
    /// `Ok(())` for valid values, otherwise error text
    pub fn validate_dimension(value: f64, name: &str) -> Result<(), String> {
        if value.is_nan() {
            return Err(format!("{} must not be NaN", name));
        }
        if value <= 0.0 {
            return Err(format!("{} must be positive, got: {}", name, value));
        }
        if value.is_infinite() {
            return Err(format!("{} must not be infinite", name));
        }
        Ok(())
    }

    /// Validates all three extents (depth, width, height).
    pub fn validate_dimensions_3d(dims: (f64, f64, f64)) -> Result<(), String> {
        validate_dimension(dims.0, "Depth")?;
        validate_dimension(dims.1, "Width")?;
        validate_dimension(dims.2, "Height")?;
        Ok(())
    }
}
