//! Data models for the stacking problem.
//!
//! This module defines the fundamental data structures:
//! - `Block`: a box to be placed, with its orientation state and stacking flags
//! - `Request`: the container plus the blocks to pack
//! - `Response`: the incumbent orientations and corners, indexed like the request

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{PackingError, Result};
use crate::types::{Axis, Corner, EPSILON_GENERAL, Shape};

/// Cosmetic RGB color carried through to consumers. The engine ignores it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u8, pub u8, pub u8);

/// Which canonical extent currently lies along depth, width and height.
///
/// The letters name the canonical extent (d, w, h as given in the request)
/// found along the depth, width and height axis respectively, so `Dwh` is the
/// unrotated state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Dwh,
    Dhw,
    Wdh,
    Whd,
    Hdw,
    Hwd,
}

impl Orientation {
    pub const ALL: [Orientation; 6] = [
        Orientation::Dwh,
        Orientation::Dhw,
        Orientation::Wdh,
        Orientation::Whd,
        Orientation::Hdw,
        Orientation::Hwd,
    ];

    /// Index of the canonical extent placed along each axis.
    pub const fn permutation(self) -> [usize; 3] {
        match self {
            Orientation::Dwh => [0, 1, 2],
            Orientation::Dhw => [0, 2, 1],
            Orientation::Wdh => [1, 0, 2],
            Orientation::Whd => [1, 2, 0],
            Orientation::Hdw => [2, 0, 1],
            Orientation::Hwd => [2, 1, 0],
        }
    }

    /// Orientation after a quarter turn about `axis`: the extents along the
    /// two other axes trade places. Applying the same axis twice is the
    /// identity.
    pub const fn rotated(self, axis: Axis) -> Self {
        use Orientation::*;
        match (axis, self) {
            (Axis::Depth, Dwh) => Dhw,
            (Axis::Depth, Dhw) => Dwh,
            (Axis::Depth, Wdh) => Whd,
            (Axis::Depth, Whd) => Wdh,
            (Axis::Depth, Hdw) => Hwd,
            (Axis::Depth, Hwd) => Hdw,
            (Axis::Width, Dwh) => Hwd,
            (Axis::Width, Hwd) => Dwh,
            (Axis::Width, Dhw) => Whd,
            (Axis::Width, Whd) => Dhw,
            (Axis::Width, Wdh) => Hdw,
            (Axis::Width, Hdw) => Wdh,
            (Axis::Height, Dwh) => Wdh,
            (Axis::Height, Wdh) => Dwh,
            (Axis::Height, Dhw) => Hdw,
            (Axis::Height, Hdw) => Dhw,
            (Axis::Height, Whd) => Hwd,
            (Axis::Height, Hwd) => Whd,
        }
    }

    /// Applies the orientation to canonical extents.
    pub fn apply(self, dims: &Shape) -> Shape {
        let extents = dims.as_array();
        let [a, b, c] = self.permutation();
        Shape::new(extents[a], extents[b], extents[c])
    }
}

/// A box to be packed.
///
/// The canonical extents never change; rotation moves only update the
/// `orientation` state from which the current shape is derived.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    name: String,
    dims: Shape,
    orientation: Orientation,
    stackable: bool,
    right_side_up: bool,
    color: Color,
}

impl Block {
    /// Creates a stackable, freely rotatable block after validating its extents.
    ///
    /// # Examples
    /// ```
    /// use strip_stack::model::Block;
    /// use strip_stack::types::Shape;
    ///
    /// assert!(Block::new("crate", Shape::new(10.0, 20.0, 30.0)).is_ok());
    /// assert!(Block::new("broken", Shape::new(-1.0, 20.0, 30.0)).is_err());
    /// ```
    pub fn new(name: impl Into<String>, dims: Shape) -> Result<Self> {
        let name = name.into();
        Shape::try_new(dims.depth, dims.width, dims.height)
            .map_err(|msg| PackingError::InvalidDimension(format!("block '{}': {}", name, msg)))?;
        Ok(Self {
            name,
            dims,
            orientation: Orientation::Dwh,
            stackable: true,
            right_side_up: false,
            color: Color::default(),
        })
    }

    /// Marks whether other blocks may rest directly on top of this one.
    pub fn with_stackable(mut self, stackable: bool) -> Self {
        self.stackable = stackable;
        self
    }

    /// Restricts rotation to the vertical axis (height stays height).
    pub fn with_right_side_up(mut self, right_side_up: bool) -> Self {
        self.right_side_up = right_side_up;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extents as given at construction.
    pub fn canonical_shape(&self) -> Shape {
        self.dims
    }

    /// Extents in the current orientation.
    pub fn shape(&self) -> Shape {
        self.orientation.apply(&self.dims)
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn is_stackable(&self) -> bool {
        self.stackable
    }

    pub fn is_right_side_up(&self) -> bool {
        self.right_side_up
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn volume(&self) -> f64 {
        self.dims.volume()
    }

    /// Axes this block may be rotated about.
    pub fn rotatable_axes(&self) -> &'static [Axis] {
        if self.right_side_up {
            &[Axis::Height]
        } else {
            &Axis::ALL
        }
    }

    /// Draws one permitted rotation axis uniformly.
    pub fn choose_rotation_axis<R: Rng + ?Sized>(&self, rng: &mut R) -> Axis {
        let axes = self.rotatable_axes();
        axes[rng.gen_range(0..axes.len())]
    }

    /// Quarter turn about `axis`. Volume-preserving and self-inverse.
    pub fn rotate(&mut self, axis: Axis) -> Result<()> {
        if !self.rotatable_axes().contains(&axis) {
            return Err(PackingError::RotationNotAllowed {
                block: self.name.clone(),
                axis,
            });
        }
        self.orientation = self.orientation.rotated(axis);
        Ok(())
    }
}

/// Input of one solve: the container and the ordered blocks.
#[derive(Clone, Debug)]
pub struct Request {
    container: Shape,
    blocks: Vec<Block>,
}

impl Request {
    /// Validates and creates a request.
    ///
    /// Fails on non-positive container extents, an empty block list, or a
    /// block whose initial footprint exceeds the container footprint.
    pub fn new(container: Shape, blocks: Vec<Block>) -> Result<Self> {
        Shape::try_new(container.depth, container.width, container.height)
            .map_err(|msg| PackingError::InvalidDimension(format!("container: {}", msg)))?;
        if blocks.is_empty() {
            return Err(PackingError::EmptyRequest);
        }
        if let Some(block) = blocks
            .iter()
            .find(|b| !b.shape().fits_footprint(&container, EPSILON_GENERAL))
        {
            return Err(PackingError::InvalidConfiguration(format!(
                "block '{}' ({:?}) exceeds the container footprint ({} x {})",
                block.name(),
                block.shape().as_tuple(),
                container.depth,
                container.width
            )));
        }
        Ok(Self { container, blocks })
    }

    pub fn container(&self) -> Shape {
        self.container
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn n_blocks(&self) -> usize {
        self.blocks.len()
    }
}

/// Result of a solve, aligned with the request's block order.
///
/// `corners[i]` is `None` when block `i` could only be placed on top of a
/// non-stackable block in the incumbent configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub blocks: Vec<Block>,
    pub corners: Vec<Option<Corner>>,
    pub score: f64,
}

impl Response {
    /// Iterates over (block, corner) pairs in request order.
    pub fn placements(&self) -> impl Iterator<Item = (&Block, Option<&Corner>)> {
        self.blocks.iter().zip(self.corners.iter().map(Option::as_ref))
    }

    /// Whether every block received a real corner.
    pub fn is_complete(&self) -> bool {
        self.corners.iter().all(Option::is_some)
    }
}
