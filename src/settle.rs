//! Stable-point selection on the discretised no-fit grid.
//!
//! The event ranks of all no-fit boxes split every axis into `2n` cells.
//! Each box is written into a difference array as the eight signed corners
//! of its 3D indicator function; prefix sums over the three axes then give,
//! for every cell, how many boxes cover it. A cell is *stable* when it is free
//! while its back, left and bottom neighbours are covered, and *settleable*
//! when it is additionally not resting on the top face of a non-stackable
//! obstacle.

use std::ops::Range;

use thiserror::Error;

use crate::geometry::AxisEvents;
use crate::types::{Axis, EPSILON_GENERAL, Event, Sign};

/// Event ranks of the selected cell, one per axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridPoint {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

/// Why no settleable cell was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SettleFailure {
    /// Stable cells exist, but every one of them sits on a non-stackable obstacle.
    #[error("every stable point rests on a non-stackable obstacle")]
    NoStackablePointFound,
    /// Not a single supported free cell exists.
    #[error("no stable point exists")]
    NoStablePointFound,
}

/// Dense cubic counter grid, stored z-major so the (z, y, x) scan is linear.
struct Grid {
    size: usize,
    cells: Vec<i32>,
}

impl Grid {
    fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![0; size * size * size],
        }
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.size + y) * self.size + x
    }

    #[inline]
    fn add(&mut self, x: usize, y: usize, z: usize, delta: i32) {
        let idx = self.index(x, y, z);
        self.cells[idx] += delta;
    }

    #[inline]
    fn get(&self, x: usize, y: usize, z: usize) -> i32 {
        self.cells[self.index(x, y, z)]
    }

    /// In-place cumulative sum along `axis`.
    fn prefix_sum(&mut self, axis: Axis) {
        let size = self.size;
        let stride = match axis {
            Axis::Depth => 1,
            Axis::Width => size,
            Axis::Height => size * size,
        };
        for idx in 0..self.cells.len() {
            let coord = (idx / stride) % size;
            if coord > 0 {
                self.cells[idx] += self.cells[idx - stride];
            }
        }
    }
}

/// Enter/exit rank of one box along one axis.
#[derive(Clone, Copy, Debug, Default)]
struct Span {
    enter: usize,
    exit: usize,
}

/// Ranks whose coordinate equals the one at `rank`.
///
/// Several boxes can share a top face height. Their exit events then occupy
/// consecutive ranks, and a candidate at any of them rests on all of those faces.
fn coincident_ranks(events: &[Event], rank: usize) -> Range<usize> {
    let coord = events[rank].coord;
    let same = |event: &Event| (event.coord - coord).abs() <= EPSILON_GENERAL;
    let start = events[..rank]
        .iter()
        .rposition(|e| !same(e))
        .map_or(0, |pos| pos + 1);
    let end = events[rank..]
        .iter()
        .position(|e| !same(e))
        .map_or(events.len(), |pos| rank + pos);
    start..end
}

fn spans(n_boxes: usize, events: &[Event]) -> Vec<Span> {
    let mut spans = vec![Span::default(); n_boxes];
    for (rank, event) in events.iter().enumerate() {
        match event.sign {
            Sign::Enter => spans[event.obstacle].enter = rank,
            Sign::Exit => spans[event.obstacle].exit = rank,
        }
    }
    spans
}

/// Finds the canonical settleable cell: lowest z rank, then y rank, then x rank.
///
/// # Parameters
/// * `n_boxes` - Number of no-fit boxes (obstacles)
/// * `events` - Sorted per-axis events, `2 * n_boxes` each
/// * `stackable` - Per-obstacle stackability flag
///
/// # Returns
/// The event ranks of the selected cell, or why none qualifies
pub fn select_stable_point(
    n_boxes: usize,
    events: &AxisEvents,
    stackable: &[bool],
) -> Result<GridPoint, SettleFailure> {
    debug_assert_eq!(stackable.len(), n_boxes);
    debug_assert!(Axis::ALL.iter().all(|&a| events.axis(a).len() == 2 * n_boxes));

    let size = 2 * n_boxes;
    if size == 0 {
        return Err(SettleFailure::NoStablePointFound);
    }

    let xs = spans(n_boxes, &events.xs);
    let ys = spans(n_boxes, &events.ys);
    let zs = spans(n_boxes, &events.zs);

    let mut overlaps = Grid::new(size);
    let mut unstackable = Grid::new(size);
    for idx in 0..n_boxes {
        let (back, front) = (xs[idx].enter, xs[idx].exit);
        let (left, right) = (ys[idx].enter, ys[idx].exit);
        let (bottom, top) = (zs[idx].enter, zs[idx].exit);

        overlaps.add(back, left, bottom, 1);
        overlaps.add(front, left, bottom, -1);
        overlaps.add(back, right, bottom, -1);
        overlaps.add(back, left, top, -1);
        overlaps.add(back, right, top, 1);
        overlaps.add(front, left, top, 1);
        overlaps.add(front, right, bottom, 1);
        overlaps.add(front, right, top, -1);

        if !stackable[idx] {
            // Footprint only, on every plane at the height of its top face.
            for plane in coincident_ranks(&events.zs, top) {
                unstackable.add(back, left, plane, 1);
                unstackable.add(back, right, plane, -1);
                unstackable.add(front, left, plane, -1);
                unstackable.add(front, right, plane, 1);
            }
        }
    }
    for axis in Axis::ALL {
        overlaps.prefix_sum(axis);
    }
    unstackable.prefix_sum(Axis::Depth);
    unstackable.prefix_sum(Axis::Width);

    // Rank 0 never qualifies: the last rank along every axis is always free,
    // so a wrapped-around predecessor would never provide support.
    let mut any_stable = false;
    for z in 1..size {
        for y in 1..size {
            for x in 1..size {
                let stable = overlaps.get(x, y, z) == 0
                    && overlaps.get(x - 1, y, z) > 0
                    && overlaps.get(x, y - 1, z) > 0
                    && overlaps.get(x, y, z - 1) > 0;
                if !stable {
                    continue;
                }
                if unstackable.get(x, y, z) == 0 {
                    return Ok(GridPoint { x, y, z });
                }
                any_stable = true;
            }
        }
    }

    if any_stable {
        Err(SettleFailure::NoStackablePointFound)
    } else {
        Err(SettleFailure::NoStablePointFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::sweep_events;
    use crate::types::NoFitBox;

    fn nfp(back: f64, front: f64, left: f64, right: f64, bottom: f64, top: f64) -> NoFitBox {
        NoFitBox {
            back,
            front,
            left,
            right,
            bottom,
            top,
        }
    }

    /// Back slab, left slab and floor slab meeting at the origin.
    fn corner_slabs() -> Vec<NoFitBox> {
        vec![
            nfp(-10.0, 0.0, -10.0, 10.0, -10.0, 10.0),
            nfp(-10.0, 10.0, -10.0, 0.0, -10.0, 10.0),
            nfp(-10.0, 10.0, -10.0, 10.0, -10.0, 0.0),
        ]
    }

    #[test]
    fn settles_into_the_corner_of_three_slabs() {
        let nfps = corner_slabs();
        let events = sweep_events(&nfps);
        let point = select_stable_point(nfps.len(), &events, &[true, true, true])
            .expect("corner must be stable");
        assert_eq!(events.xs[point.x].coord, 0.0);
        assert_eq!(events.ys[point.y].coord, 0.0);
        assert_eq!(events.zs[point.z].coord, 0.0);
    }

    #[test]
    fn non_stackable_floor_blocks_the_only_stable_point() {
        let nfps = corner_slabs();
        let events = sweep_events(&nfps);
        assert_eq!(
            select_stable_point(nfps.len(), &events, &[true, true, false]),
            Err(SettleFailure::NoStackablePointFound)
        );
    }

    #[test]
    fn shared_top_height_still_counts_as_non_stackable() {
        // Two floor slabs whose tops meet at z = 0. The stackable one has the
        // higher index, so its exit follows the non-stackable exit.
        let nfps = vec![
            nfp(-10.0, 0.0, -10.0, 10.0, -10.0, 10.0),
            nfp(-10.0, 10.0, -10.0, 0.0, -10.0, 10.0),
            nfp(-10.0, 10.0, -10.0, 10.0, -10.0, 0.0),
            nfp(-10.0, 10.0, -10.0, 10.0, -10.0, 0.0),
        ];
        let events = sweep_events(&nfps);
        assert_eq!(coincident_ranks(&events.zs, 4), 4..6);
        assert_eq!(
            select_stable_point(nfps.len(), &events, &[true, true, false, true]),
            Err(SettleFailure::NoStackablePointFound)
        );
        assert_eq!(
            select_stable_point(nfps.len(), &events, &[true, true, true, false]),
            Err(SettleFailure::NoStackablePointFound)
        );
    }

    #[test]
    fn unsupported_scene_has_no_stable_point() {
        let nfps = vec![nfp(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0)];
        let events = sweep_events(&nfps);
        assert_eq!(
            select_stable_point(nfps.len(), &events, &[true]),
            Err(SettleFailure::NoStablePointFound)
        );
        let empty = sweep_events(&[]);
        assert_eq!(
            select_stable_point(0, &empty, &[]),
            Err(SettleFailure::NoStablePointFound)
        );
    }

    #[test]
    fn prefix_sums_recover_box_indicator() {
        let mut grid = Grid::new(4);
        // Box covering ranks [1, 3) on every axis.
        for (x, y, z, v) in [
            (1, 1, 1, 1),
            (3, 1, 1, -1),
            (1, 3, 1, -1),
            (1, 1, 3, -1),
            (1, 3, 3, 1),
            (3, 1, 3, 1),
            (3, 3, 1, 1),
            (3, 3, 3, -1),
        ] {
            grid.add(x, y, z, v);
        }
        for axis in Axis::ALL {
            grid.prefix_sum(axis);
        }
        for z in 0..4 {
            for y in 0..4 {
                for x in 0..4 {
                    let inside = (1..3).contains(&x) && (1..3).contains(&y) && (1..3).contains(&z);
                    assert_eq!(grid.get(x, y, z), i32::from(inside), "cell ({x}, {y}, {z})");
                }
            }
        }
    }
}
