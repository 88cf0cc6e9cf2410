//! Geometric helpers for the placement engine.
//!
//! This module turns placed obstacles into no-fit boxes for a candidate and
//! the no-fit boxes into the per-axis event sequences the stable-point
//! selector sweeps over. It also carries the plain AABB checks used to verify
//! finished packings.

use crate::types::{Axis, Corner, Event, NoFitBox, Shape, Sign};

/// Sorted event sequences, one per axis.
#[derive(Clone, Debug, PartialEq)]
pub struct AxisEvents {
    pub xs: Vec<Event>,
    pub ys: Vec<Event>,
    pub zs: Vec<Event>,
}

impl AxisEvents {
    pub fn axis(&self, axis: Axis) -> &[Event] {
        match axis {
            Axis::Depth => &self.xs,
            Axis::Width => &self.ys,
            Axis::Height => &self.zs,
        }
    }
}

/// Builds the no-fit box of every obstacle for a candidate of `new_shape`.
///
/// For an obstacle of shape (d, w, h) at corner (back, left, bottom), the
/// candidate's reference corner must stay out of
/// `(back - new_d, back + d) × (left - new_w, left + w) × (bottom - new_h, bottom + h)`.
///
/// # Parameters
/// * `new_shape` - Shape of the block being placed
/// * `obstacles` - Shapes and corners of everything already in the scene
pub fn no_fit_boxes<'a, I>(new_shape: &Shape, obstacles: I) -> Vec<NoFitBox>
where
    I: IntoIterator<Item = (&'a Shape, &'a Corner)>,
{
    obstacles
        .into_iter()
        .map(|(shape, corner)| NoFitBox {
            back: corner.x - new_shape.depth,
            front: corner.x + shape.depth,
            left: corner.y - new_shape.width,
            right: corner.y + shape.width,
            bottom: corner.z - new_shape.height,
            top: corner.z + shape.height,
        })
        .collect()
}

/// Converts no-fit boxes into three sorted event sequences.
///
/// Each box contributes one enter and one exit event per axis. Events are
/// sorted by (coordinate, sign, index), so at equal coordinates an exit comes
/// before an enter and touching faces leave a free cell between them.
pub fn sweep_events(nfps: &[NoFitBox]) -> AxisEvents {
    let axis_events = |axis: Axis| {
        let mut events: Vec<Event> = nfps
            .iter()
            .enumerate()
            .flat_map(|(idx, nfp)| {
                let (low, high) = nfp.bounds(axis);
                [
                    Event::new(low, Sign::Enter, idx),
                    Event::new(high, Sign::Exit, idx),
                ]
            })
            .collect();
        events.sort();
        events
    };

    AxisEvents {
        xs: axis_events(Axis::Depth),
        ys: axis_events(Axis::Width),
        zs: axis_events(Axis::Height),
    }
}

/// Checks whether two placed blocks overlap with positive volume.
///
/// Uses the separating axis test for AABBs: touching faces do not count.
pub fn intersects(a_corner: &Corner, a_shape: &Shape, b_corner: &Corner, b_shape: &Shape) -> bool {
    let a_far = a_corner.far_corner(a_shape);
    let b_far = b_corner.far_corner(b_shape);

    !(a_far.x <= b_corner.x
        || b_far.x <= a_corner.x
        || a_far.y <= b_corner.y
        || b_far.y <= a_corner.y
        || a_far.z <= b_corner.z
        || b_far.z <= a_corner.z)
}

/// Overlap length of two intervals, at least 0.0.
fn overlap_1d(a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    (a2.min(b2) - a1.max(b1)).max(0.0)
}

/// Overlap area of the two footprints in the depth/width plane.
pub fn overlap_area_xy(a_corner: &Corner, a_shape: &Shape, b_corner: &Corner, b_shape: &Shape) -> f64 {
    let over_x = overlap_1d(
        a_corner.x,
        a_corner.x + a_shape.depth,
        b_corner.x,
        b_corner.x + b_shape.depth,
    );
    let over_y = overlap_1d(
        a_corner.y,
        a_corner.y + a_shape.width,
        b_corner.y,
        b_corner.y + b_shape.width,
    );
    over_x * over_y
}

/// Checks whether a placed block lies completely inside the container
/// footprint and above the floor.
pub fn inside_container(corner: &Corner, shape: &Shape, container: &Shape, tolerance: f64) -> bool {
    let far = corner.far_corner(shape);
    corner.x >= -tolerance
        && corner.y >= -tolerance
        && corner.z >= -tolerance
        && far.x <= container.depth + tolerance
        && far.y <= container.width + tolerance
}
