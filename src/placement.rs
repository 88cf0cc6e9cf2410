//! Placement scoring and packing evaluation.
//!
//! A `Scene` starts with the five container walls and grows by one obstacle
//! per placed block. `score_placement` runs no-fit construction, the event
//! sweep and stable-point selection for a single block; `evaluate` replays a
//! whole packing order through a fresh scene.

use crate::error::{PackingError, Result};
use crate::geometry::{no_fit_boxes, sweep_events};
use crate::model::Block;
use crate::settle::{SettleFailure, select_stable_point};
use crate::types::{Corner, EPSILON_GENERAL, Shape};

/// Score assigned to a block that could only rest on a non-stackable block.
///
/// Large enough to dominate any real stack height, but still an ordinary
/// number the annealing comparison can reason about.
pub const INFEASIBLE_SCORE: f64 = 1e9;

/// The five virtual walls bounding the container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Wall {
    Back,
    Left,
    Floor,
    Front,
    Right,
}

impl Wall {
    pub const ALL: [Wall; 5] = [Wall::Back, Wall::Left, Wall::Floor, Wall::Front, Wall::Right];
}

/// What an obstacle in the scene stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObstacleKind {
    ContainerWall(Wall),
    /// Index of the block in the request.
    PlacedBlock(usize),
}

/// A solid the next candidate must not overlap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub shape: Shape,
    pub corner: Corner,
    pub stackable: bool,
}

impl Obstacle {
    /// Builds one container wall.
    ///
    /// Walls are cubes of edge `3 * reach`. `reach` must exceed every
    /// coordinate a block can take, so along the axes the wall does not bound
    /// it behaves like a half-space. Each wall sticks out further along its
    /// own normal than the others extend, which keeps the region outside the
    /// container unsupported.
    pub fn wall(wall: Wall, container: &Shape, reach: f64) -> Self {
        let corner = match wall {
            Wall::Back => Corner::new(-3.0 * reach, -reach, -reach),
            Wall::Left => Corner::new(-reach, -3.0 * reach, -reach),
            Wall::Floor => Corner::new(-reach, -reach, -3.0 * reach),
            Wall::Front => Corner::new(container.depth, -reach, -reach),
            Wall::Right => Corner::new(-reach, container.width, -reach),
        };
        let edge = 3.0 * reach;
        Self {
            kind: ObstacleKind::ContainerWall(wall),
            shape: Shape::new(edge, edge, edge),
            corner,
            stackable: true,
        }
    }

    pub fn is_wall(&self) -> bool {
        matches!(self.kind, ObstacleKind::ContainerWall(_))
    }
}

/// Bound on every coordinate reachable while packing `blocks` into `container`.
///
/// Blocks never leave the footprint and the tallest possible stack is the sum
/// of all extents, so the sum of container and block extents is safely larger.
pub fn scene_reach(container: &Shape, blocks: &[Block]) -> f64 {
    let container_sum = container.depth + container.width + container.height;
    let blocks_sum: f64 = blocks
        .iter()
        .map(|b| {
            let s = b.canonical_shape();
            s.depth + s.width + s.height
        })
        .sum();
    container_sum + blocks_sum
}

/// Outcome of placing one block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Placement {
    /// The block rests at `corner`; `score` is its top height.
    Settled { corner: Corner, score: f64 },
    /// Every supported spot is on a non-stackable block, or the block's
    /// footprint no longer fits the container.
    Infeasible,
}

impl Placement {
    pub fn score(&self) -> f64 {
        match self {
            Placement::Settled { score, .. } => *score,
            Placement::Infeasible => INFEASIBLE_SCORE,
        }
    }

    pub fn corner(&self) -> Option<Corner> {
        match self {
            Placement::Settled { corner, .. } => Some(*corner),
            Placement::Infeasible => None,
        }
    }
}

/// Finds where `candidate` comes to rest among `obstacles`.
///
/// Resting on a non-stackable obstacle is reported as `Placement::Infeasible`
/// rather than an error. A scene without a single stable cell violates the
/// wall invariant and fails with `PackingError::NoStablePointFound`.
pub fn score_placement(candidate: &Block, obstacles: &[Obstacle]) -> Result<Placement> {
    let shape = candidate.shape();
    let nfps = no_fit_boxes(&shape, obstacles.iter().map(|o| (&o.shape, &o.corner)));
    let events = sweep_events(&nfps);
    let stackable: Vec<bool> = obstacles.iter().map(|o| o.stackable).collect();

    match select_stable_point(nfps.len(), &events, &stackable) {
        Ok(point) => {
            let corner = Corner::new(
                events.xs[point.x].coord,
                events.ys[point.y].coord,
                events.zs[point.z].coord,
            );
            Ok(Placement::Settled {
                corner,
                score: corner.z + shape.height,
            })
        }
        Err(SettleFailure::NoStackablePointFound) => Ok(Placement::Infeasible),
        Err(SettleFailure::NoStablePointFound) => Err(PackingError::NoStablePointFound {
            block: candidate.name().to_string(),
        }),
    }
}

/// Obstacles of one evaluation: the walls followed by the blocks placed so far.
#[derive(Clone, Debug)]
pub struct Scene {
    container: Shape,
    obstacles: Vec<Obstacle>,
}

impl Scene {
    /// Creates a scene holding only the container walls.
    pub fn new(container: Shape, reach: f64) -> Self {
        let obstacles = Wall::ALL
            .iter()
            .map(|&wall| Obstacle::wall(wall, &container, reach))
            .collect();
        Self {
            container,
            obstacles,
        }
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Blocks placed so far, in placement order.
    pub fn placed(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter().filter(|o| !o.is_wall())
    }

    /// Scores `block` against the current scene and, if it settles, adds it
    /// as an obstacle for the blocks that follow.
    pub fn place(&mut self, index: usize, block: &Block) -> Result<Placement> {
        let shape = block.shape();
        if !shape.fits_footprint(&self.container, EPSILON_GENERAL) {
            return Ok(Placement::Infeasible);
        }

        let placement = score_placement(block, &self.obstacles)?;
        if let Placement::Settled { corner, .. } = placement {
            self.obstacles.push(Obstacle {
                kind: ObstacleKind::PlacedBlock(index),
                shape,
                corner,
                stackable: block.is_stackable(),
            });
        }
        Ok(placement)
    }
}

/// Score and corners of one full packing.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    /// Height of the tallest stack (or `INFEASIBLE_SCORE` if any block failed).
    pub score: f64,
    /// Corners indexed by request position, not packing order.
    pub corners: Vec<Option<Corner>>,
}

/// Places `blocks` one after another in `order` and reports the tallest top.
///
/// # Parameters
/// * `container` - Container extents
/// * `blocks` - Blocks in request order, in their current orientation
/// * `order` - Permutation of `0..blocks.len()`
pub fn evaluate(container: &Shape, blocks: &[Block], order: &[usize]) -> Result<Evaluation> {
    debug_assert_eq!(order.len(), blocks.len());

    let mut scene = Scene::new(*container, scene_reach(container, blocks));
    let mut corners = vec![None; blocks.len()];
    let mut score = 0.0_f64;

    for &idx in order {
        let placement = scene.place(idx, &blocks[idx])?;
        score = score.max(placement.score());
        corners[idx] = placement.corner();
    }

    Ok(Evaluation { score, corners })
}
