//! Simulated annealing over packing order and block orientation.
//!
//! The `Solver` owns the mutable search state: block orientations, the
//! packing order, the current evaluation and a snapshot of the best
//! configuration seen so far. Each transition proposes one local move
//! (swap two order positions or rotate one block), re-evaluates the whole
//! packing and keeps or reverts the move by the Metropolis rule.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::{PackingError, Result};
use crate::model::{Block, Color, Request, Response};
use crate::placement::evaluate;
use crate::types::{Axis, Corner, Shape};

/// A frame is produced every this many iterations.
pub const FRAME_INTERVAL: usize = 10;
/// A progress event is emitted every this many iterations.
pub const PROGRESS_INTERVAL: usize = 100;

const ROTATE_PROBABILITY: f64 = 0.5;
/// Lower bound of the acceptance draw, keeps `ln(u)` finite.
const MIN_UNIFORM: f64 = 1e-9;

/// Parameters of one annealing run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SolveOptions {
    /// Upper bound on the number of transitions.
    pub max_iterations: usize,
    /// Whether rotate moves may be proposed.
    pub allow_rotation: bool,
    /// Metropolis temperature; 0 accepts only non-worsening moves.
    pub temperature: f64,
}

impl SolveOptions {
    pub const DEFAULT_MAX_ITERATIONS: usize = 1000;
    pub const DEFAULT_ALLOW_ROTATION: bool = true;
    pub const DEFAULT_TEMPERATURE: f64 = 1.0;

    pub fn builder() -> SolveOptionsBuilder {
        SolveOptionsBuilder::default()
    }

    /// Rejects negative or non-finite temperatures.
    pub fn validate(&self) -> Result<()> {
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(PackingError::InvalidConfiguration(format!(
                "temperature must be a finite number >= 0, got: {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            allow_rotation: Self::DEFAULT_ALLOW_ROTATION,
            temperature: Self::DEFAULT_TEMPERATURE,
        }
    }
}

/// Builder for `SolveOptions`.
#[derive(Clone, Debug, Default)]
pub struct SolveOptionsBuilder {
    options: SolveOptions,
}

impl SolveOptionsBuilder {
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.options.max_iterations = iterations;
        self
    }

    pub fn allow_rotation(mut self, allow: bool) -> Self {
        self.options.allow_rotation = allow;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.options.temperature = temperature;
        self
    }

    pub fn build(self) -> SolveOptions {
        self.options
    }
}

/// Why a run ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    IterationBudget,
    /// The incumbent fits below the container height.
    TargetReached,
    Cancelled,
}

/// Progress events of a run, suitable for SSE streaming.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum SolveEvent {
    Started {
        blocks: usize,
        initial_score: f64,
    },
    Progress {
        iteration: usize,
        elapsed_ms: u64,
        best_score: f64,
    },
    Finished {
        iterations: usize,
        best_score: f64,
        reason: StopReason,
    },
}

/// One local move. Both kinds are their own inverse.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Move {
    /// Exchange two positions of the packing order.
    Swap(usize, usize),
    /// Quarter turn of one block (request index) about `axis`.
    Rotate { block: usize, axis: Axis },
}

/// Deep copy of the best configuration.
#[derive(Clone, Debug)]
struct Snapshot {
    blocks: Vec<Block>,
    corners: Vec<Option<Corner>>,
    score: f64,
}

/// Result of a run together with its bookkeeping.
#[derive(Clone, Debug)]
pub struct SolveSummary {
    pub response: Response,
    pub initial_score: f64,
    pub iterations: usize,
    pub reason: StopReason,
}

/// Annealing driver.
pub struct Solver<R: Rng = StdRng> {
    container: Shape,
    blocks: Vec<Block>,
    order: Vec<usize>,
    score: f64,
    corners: Vec<Option<Corner>>,
    initial_score: f64,
    optimum: Snapshot,
    rng: R,
    cancel: Arc<AtomicBool>,
}

impl Solver<StdRng> {
    /// Creates a solver with a seeded `StdRng`, or an entropy-seeded one when
    /// `seed` is `None`.
    pub fn with_seed(request: Request, seed: Option<u64>) -> Result<Self> {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(request, rng)
    }
}

impl<R: Rng> Solver<R> {
    /// Sorts blocks by descending volume and evaluates that initial order.
    ///
    /// # Parameters
    /// * `request` - Validated container and blocks
    /// * `rng` - The only random source the run will draw from
    pub fn new(request: Request, rng: R) -> Result<Self> {
        let container = request.container();
        let blocks = request.blocks().to_vec();

        let mut order: Vec<usize> = (0..blocks.len()).collect();
        // Stable sort: equal volumes keep request order.
        order.sort_by(|&a, &b| blocks[b].volume().total_cmp(&blocks[a].volume()));

        let evaluation = evaluate(&container, &blocks, &order)?;
        let optimum = Snapshot {
            blocks: blocks.clone(),
            corners: evaluation.corners.clone(),
            score: evaluation.score,
        };

        Ok(Self {
            container,
            blocks,
            order,
            score: evaluation.score,
            corners: evaluation.corners,
            initial_score: evaluation.score,
            optimum,
            rng,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn container(&self) -> Shape {
        self.container
    }

    /// Blocks in their current orientation, in request order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn corners(&self) -> &[Option<Corner>] {
        &self.corners
    }

    pub fn initial_score(&self) -> f64 {
        self.initial_score
    }

    pub fn optimal_score(&self) -> f64 {
        self.optimum.score
    }

    /// Height the incumbent has to reach for an early stop.
    pub fn target_score(&self) -> f64 {
        self.container.height
    }

    /// Shared flag; storing `true` stops `solve` and `frames` after the
    /// current transition.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// The incumbent optimum as a response.
    pub fn response(&self) -> Response {
        Response {
            blocks: self.optimum.blocks.clone(),
            corners: self.optimum.corners.clone(),
            score: self.optimum.score,
        }
    }

    /// Draws a random move. A single block without rotation yields the
    /// no-op swap `Swap(0, 0)`.
    pub fn propose(&mut self, allow_rotation: bool) -> Move {
        let n = self.blocks.len();
        if allow_rotation && self.rng.gen_bool(ROTATE_PROBABILITY) {
            let block = self.rng.gen_range(0..n);
            let axis = self.blocks[block].choose_rotation_axis(&mut self.rng);
            return Move::Rotate { block, axis };
        }
        if n < 2 {
            return Move::Swap(0, 0);
        }
        let picked = sample(&mut self.rng, n, 2);
        Move::Swap(picked.index(0), picked.index(1))
    }

    /// Applies `mv` to the current state. Calling it twice restores the state.
    pub fn apply_move(&mut self, mv: Move) -> Result<()> {
        match mv {
            Move::Swap(i, j) => {
                self.order.swap(i, j);
                Ok(())
            }
            Move::Rotate { block, axis } => self.blocks[block].rotate(axis),
        }
    }

    /// One annealing step at `temperature`.
    ///
    /// # Returns
    /// Whether the proposed move was accepted
    pub fn transit(&mut self, allow_rotation: bool, temperature: f64) -> Result<bool> {
        let mv = self.propose(allow_rotation);
        self.apply_move(mv)?;

        let evaluation = match evaluate(&self.container, &self.blocks, &self.order) {
            Ok(evaluation) => evaluation,
            Err(err) => {
                self.apply_move(mv)?;
                return Err(err);
            }
        };

        let diff = evaluation.score - self.score;
        let draw = MIN_UNIFORM + self.rng.r#gen::<f64>() * (1.0 - MIN_UNIFORM);
        if draw.ln() * temperature > -diff {
            self.apply_move(mv)?;
            return Ok(false);
        }

        self.score = evaluation.score;
        self.corners = evaluation.corners;
        if self.score <= self.optimum.score {
            self.optimum = Snapshot {
                blocks: self.blocks.clone(),
                corners: self.corners.clone(),
                score: self.score,
            };
        }
        Ok(true)
    }

    /// Runs until the budget is spent, the target height is reached or the
    /// cancel handle is set, and returns the incumbent.
    pub fn solve(&mut self, options: &SolveOptions) -> Result<Response> {
        self.solve_with_progress(options, |_| {})
            .map(|summary| summary.response)
    }

    /// Like `solve`, reporting progress through `on_event`.
    pub fn solve_with_progress(
        &mut self,
        options: &SolveOptions,
        mut on_event: impl FnMut(&SolveEvent),
    ) -> Result<SolveSummary> {
        options.validate()?;

        let started = Instant::now();
        on_event(&SolveEvent::Started {
            blocks: self.blocks.len(),
            initial_score: self.initial_score,
        });

        let mut iterations = 0;
        let reason = loop {
            if self.optimum.score <= self.target_score() {
                break StopReason::TargetReached;
            }
            if self.is_cancelled() {
                break StopReason::Cancelled;
            }
            if iterations >= options.max_iterations {
                break StopReason::IterationBudget;
            }

            self.transit(options.allow_rotation, options.temperature)?;
            iterations += 1;

            if iterations % PROGRESS_INTERVAL == 0 {
                on_event(&SolveEvent::Progress {
                    iteration: iterations,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                    best_score: self.optimum.score,
                });
            }
        };

        on_event(&SolveEvent::Finished {
            iterations,
            best_score: self.optimum.score,
            reason,
        });

        Ok(SolveSummary {
            response: self.response(),
            initial_score: self.initial_score,
            iterations,
            reason,
        })
    }

    /// Lazy run that renders the incumbent optimum at iterations
    /// `FRAME_INTERVAL`, `2 * FRAME_INTERVAL`, ..., before that iteration's
    /// transition.
    ///
    /// Stops after `options.max_iterations` transitions, on cancellation or on
    /// the first evaluation error.
    pub fn frames<V: Visualizer>(
        &mut self,
        options: SolveOptions,
        visualizer: V,
        size: u32,
        padding: u32,
    ) -> Frames<'_, R, V> {
        Frames {
            solver: self,
            options,
            visualizer,
            size,
            padding,
            iteration: 0,
            transit_pending: false,
            done: false,
            reason: None,
        }
    }
}

/// Renders a packing state into some image representation.
pub trait Visualizer {
    type Image;

    fn render(
        &mut self,
        container: &Shape,
        blocks: &[Block],
        corners: &[Option<Corner>],
        size: u32,
        padding: u32,
    ) -> Self::Image;
}

/// One item of `Solver::frames`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Frame<I> {
    /// 1-based iteration the frame precedes; a multiple of `FRAME_INTERVAL`.
    pub iteration: usize,
    pub best_score: f64,
    pub image: I,
}

/// Iterator returned by `Solver::frames`.
pub struct Frames<'a, R: Rng, V: Visualizer> {
    solver: &'a mut Solver<R>,
    options: SolveOptions,
    visualizer: V,
    size: u32,
    padding: u32,
    iteration: usize,
    transit_pending: bool,
    done: bool,
    reason: Option<StopReason>,
}

impl<R: Rng, V: Visualizer> Frames<'_, R, V> {
    /// Transitions performed so far.
    pub fn iterations(&self) -> usize {
        self.iteration
    }

    /// Why the iterator ended; `None` while running or after an error.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.reason
    }
}

impl<R: Rng, V: Visualizer> Iterator for Frames<'_, R, V> {
    type Item = Result<Frame<V::Image>>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.done {
            if let Err(err) = self.options.validate() {
                self.done = true;
                return Some(Err(err));
            }
        }

        while !self.done {
            if self.transit_pending {
                self.transit_pending = false;
                if let Err(err) = self
                    .solver
                    .transit(self.options.allow_rotation, self.options.temperature)
                {
                    self.done = true;
                    return Some(Err(err));
                }
                self.iteration += 1;
            }

            if self.solver.is_cancelled() {
                self.done = true;
                self.reason = Some(StopReason::Cancelled);
                break;
            }
            if self.iteration >= self.options.max_iterations {
                self.done = true;
                self.reason = Some(StopReason::IterationBudget);
                break;
            }

            self.transit_pending = true;
            let step = self.iteration + 1;
            if step % FRAME_INTERVAL == 0 {
                let optimum = &self.solver.optimum;
                let image = self.visualizer.render(
                    &self.solver.container,
                    &optimum.blocks,
                    &optimum.corners,
                    self.size,
                    self.padding,
                );
                return Some(Ok(Frame {
                    iteration: step,
                    best_score: self.solver.optimum.score,
                    image,
                }));
            }
        }
        None
    }
}

/// A block as drawn in a scene.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SceneBlock {
    pub name: String,
    pub shape: Shape,
    pub corner: Option<Corner>,
    pub stackable: bool,
    pub color: Color,
}

/// Serializable description of a packing state, for clients that draw it
/// themselves.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SceneDescription {
    pub container: Shape,
    pub size: u32,
    pub padding: u32,
    pub blocks: Vec<SceneBlock>,
}

/// `Visualizer` producing a `SceneDescription`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SceneVisualizer;

impl Visualizer for SceneVisualizer {
    type Image = SceneDescription;

    fn render(
        &mut self,
        container: &Shape,
        blocks: &[Block],
        corners: &[Option<Corner>],
        size: u32,
        padding: u32,
    ) -> SceneDescription {
        let blocks = blocks
            .iter()
            .zip(corners)
            .map(|(block, corner)| SceneBlock {
                name: block.name().to_string(),
                shape: block.shape(),
                corner: *corner,
                stackable: block.is_stackable(),
                color: block.color(),
            })
            .collect();
        SceneDescription {
            container: *container,
            size,
            padding,
            blocks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{inside_container, intersects};
    use crate::placement::INFEASIBLE_SCORE;
    use crate::types::EPSILON_GENERAL;

    fn cube(name: &str, edge: f64) -> Block {
        Block::new(name, Shape::new(edge, edge, edge)).unwrap()
    }

    fn mixed_request() -> Request {
        // Height 5 is below every stack, so the target is never reached.
        let blocks = vec![
            Block::new("a", Shape::new(20.0, 20.0, 40.0)).unwrap(),
            Block::new("b", Shape::new(10.0, 20.0, 15.0)).unwrap(),
            Block::new("c", Shape::new(15.0, 10.0, 10.0)).unwrap(),
            Block::new("d", Shape::new(10.0, 10.0, 25.0)).unwrap(),
            Block::new("e", Shape::new(5.0, 25.0, 10.0))
                .unwrap()
                .with_stackable(false),
            Block::new("f", Shape::new(12.0, 8.0, 6.0)).unwrap(),
        ];
        Request::new(Shape::new(30.0, 30.0, 5.0), blocks).unwrap()
    }

    fn assert_valid_response(container: &Shape, response: &Response) {
        let placed: Vec<_> = response
            .placements()
            .filter_map(|(block, corner)| corner.map(|c| (block.shape(), *c)))
            .collect();
        for (i, (shape_a, corner_a)) in placed.iter().enumerate() {
            assert!(
                inside_container(corner_a, shape_a, container, EPSILON_GENERAL),
                "corner {:?} outside container",
                corner_a
            );
            for (shape_b, corner_b) in placed.iter().skip(i + 1) {
                assert!(
                    !intersects(corner_a, shape_a, corner_b, shape_b),
                    "{:?} and {:?} overlap",
                    corner_a,
                    corner_b
                );
            }
        }
    }

    #[test]
    fn initial_order_is_descending_volume() {
        let solver = Solver::with_seed(mixed_request(), Some(1)).unwrap();
        let volumes: Vec<f64> = solver
            .order()
            .iter()
            .map(|&i| solver.blocks()[i].volume())
            .collect();
        assert!(volumes.windows(2).all(|w| w[0] >= w[1]), "order {:?}", volumes);
        assert_eq!(solver.optimal_score(), solver.initial_score());
    }

    #[test]
    fn same_seed_reproduces_the_run() {
        let run = |seed| {
            let mut solver = Solver::with_seed(mixed_request(), Some(seed)).unwrap();
            let trajectory: Vec<f64> = (0..150)
                .map(|_| {
                    solver.transit(true, 2.0).unwrap();
                    solver.score()
                })
                .collect();
            (trajectory, solver.response())
        };

        let (first_trajectory, first_response) = run(99);
        let (second_trajectory, second_response) = run(99);
        assert_eq!(first_trajectory, second_trajectory);
        assert_eq!(first_response, second_response);
    }

    #[test]
    fn rejected_moves_leave_state_untouched() {
        let mut solver = Solver::with_seed(mixed_request(), Some(5)).unwrap();
        let mut rejected = 0;
        for _ in 0..200 {
            let order = solver.order().to_vec();
            let blocks = solver.blocks().to_vec();
            let score = solver.score();
            if !solver.transit(true, 0.0).unwrap() {
                rejected += 1;
                assert_eq!(solver.order(), order.as_slice());
                assert_eq!(solver.blocks(), blocks.as_slice());
                assert_eq!(solver.score(), score);
            }
        }
        assert!(rejected > 0, "a 40-high block tipped over never fits, some moves must fail");
    }

    #[test]
    fn zero_temperature_never_worsens_current_score() {
        let mut solver = Solver::with_seed(mixed_request(), Some(11)).unwrap();
        for _ in 0..200 {
            let before = solver.score();
            solver.transit(true, 0.0).unwrap();
            assert!(solver.score() <= before);
        }
    }

    #[test]
    fn moves_are_self_inverse() {
        let mut solver = Solver::with_seed(mixed_request(), Some(3)).unwrap();
        let order = solver.order().to_vec();
        let blocks = solver.blocks().to_vec();
        for mv in [
            Move::Swap(0, 4),
            Move::Rotate {
                block: 2,
                axis: Axis::Width,
            },
        ] {
            solver.apply_move(mv).unwrap();
            solver.apply_move(mv).unwrap();
            assert_eq!(solver.order(), order.as_slice());
            assert_eq!(solver.blocks(), blocks.as_slice());
        }
    }

    #[test]
    fn incumbent_never_worse_than_initial() {
        let mut solver = Solver::with_seed(mixed_request(), Some(21)).unwrap();
        let initial = solver.initial_score();
        let options = SolveOptions::builder()
            .max_iterations(300)
            .temperature(5.0)
            .build();
        let response = solver.solve(&options).unwrap();
        assert!(response.score <= initial);
        assert_valid_response(&solver.container(), &response);
    }

    #[test]
    fn three_cubes_form_a_single_layer() {
        let container = Shape::new(100.0, 100.0, 100.0);
        let blocks = vec![cube("a", 10.0), cube("b", 10.0), cube("c", 10.0)];
        let mut solver = Solver::with_seed(Request::new(container, blocks).unwrap(), Some(0)).unwrap();
        let summary = solver
            .solve_with_progress(&SolveOptions::default(), |_| {})
            .unwrap();
        assert_eq!(summary.response.score, 10.0);
        assert_eq!(summary.reason, StopReason::TargetReached);
        assert!(summary.response.is_complete());
        assert_valid_response(&container, &summary.response);
    }

    #[test]
    fn annealing_moves_fragile_block_to_the_top() {
        let container = Shape::new(10.0, 10.0, 100.0);
        let blocks = vec![cube("fragile", 10.0).with_stackable(false), cube("solid", 10.0)];
        let mut solver = Solver::with_seed(Request::new(container, blocks).unwrap(), Some(4)).unwrap();
        assert_eq!(solver.initial_score(), INFEASIBLE_SCORE);

        let options = SolveOptions::builder()
            .allow_rotation(false)
            .max_iterations(10)
            .build();
        let response = solver.solve(&options).unwrap();
        assert_eq!(response.score, 20.0);
        assert_eq!(response.corners[1], Some(Corner::ORIGIN));
        assert_eq!(response.corners[0], Some(Corner::new(0.0, 0.0, 10.0)));
    }

    #[test]
    fn right_side_up_blocks_keep_their_height() {
        let blocks = vec![
            Block::new("up", Shape::new(10.0, 20.0, 30.0))
                .unwrap()
                .with_right_side_up(true),
            Block::new("free", Shape::new(10.0, 20.0, 30.0)).unwrap(),
        ];
        let request = Request::new(Shape::new(40.0, 40.0, 1.0), blocks).unwrap();
        let mut solver = Solver::with_seed(request, Some(8)).unwrap();
        for _ in 0..100 {
            solver.transit(true, 10.0).unwrap();
            assert_eq!(solver.blocks()[0].shape().height, 30.0);
        }
    }

    #[test]
    fn progress_events_follow_the_run() {
        let mut solver = Solver::with_seed(mixed_request(), Some(2)).unwrap();
        let mut events = Vec::new();
        let options = SolveOptions::builder().max_iterations(250).build();
        let summary = solver
            .solve_with_progress(&options, |event| events.push(event.clone()))
            .unwrap();

        assert_eq!(summary.iterations, 250);
        assert_eq!(summary.reason, StopReason::IterationBudget);
        assert!(matches!(events.first(), Some(SolveEvent::Started { blocks: 6, .. })));
        let progress = events
            .iter()
            .filter(|e| matches!(e, SolveEvent::Progress { .. }))
            .count();
        assert_eq!(progress, 2);
        assert!(matches!(
            events.last(),
            Some(SolveEvent::Finished {
                iterations: 250,
                reason: StopReason::IterationBudget,
                ..
            })
        ));
    }

    #[test]
    fn cancelled_solve_returns_incumbent() {
        let mut solver = Solver::with_seed(mixed_request(), Some(6)).unwrap();
        solver.cancel_handle().store(true, Ordering::Relaxed);
        let summary = solver
            .solve_with_progress(&SolveOptions::default(), |_| {})
            .unwrap();
        assert_eq!(summary.reason, StopReason::Cancelled);
        assert_eq!(summary.iterations, 0);
        assert_eq!(summary.response.score, summary.initial_score);
    }

    #[test]
    fn negative_temperature_is_rejected() {
        let mut solver = Solver::with_seed(mixed_request(), Some(6)).unwrap();
        let options = SolveOptions::builder().temperature(-1.0).build();
        assert!(matches!(
            solver.solve(&options),
            Err(PackingError::InvalidConfiguration(_))
        ));
    }

    struct CountingVisualizer;

    impl Visualizer for CountingVisualizer {
        type Image = usize;

        fn render(
            &mut self,
            _container: &Shape,
            blocks: &[Block],
            _corners: &[Option<Corner>],
            _size: u32,
            _padding: u32,
        ) -> usize {
            blocks.len()
        }
    }

    #[test]
    fn frames_yield_every_ten_iterations() {
        let mut solver = Solver::with_seed(mixed_request(), Some(13)).unwrap();
        let options = SolveOptions::builder().max_iterations(35).build();
        let frames: Vec<_> = solver
            .frames(options, CountingVisualizer, 256, 8)
            .collect::<Result<_>>()
            .unwrap();

        let iterations: Vec<_> = frames.iter().map(|f| f.iteration).collect();
        assert_eq!(iterations, vec![10, 20, 30]);
        assert!(frames.iter().all(|f| f.image == 6));
        assert!(frames.windows(2).all(|w| w[1].best_score <= w[0].best_score));
    }

    #[test]
    fn frames_report_iterations_and_stop_reason() {
        let mut solver = Solver::with_seed(mixed_request(), Some(13)).unwrap();
        let cancel = solver.cancel_handle();
        let options = SolveOptions::builder().max_iterations(35).build();

        let mut frames = solver.frames(options, CountingVisualizer, 64, 0);
        let mut yielded = 0;
        while let Some(frame) = frames.next() {
            frame.unwrap();
            yielded += 1;
        }
        assert_eq!(yielded, 3);
        assert_eq!(frames.iterations(), 35);
        assert_eq!(frames.stop_reason(), Some(StopReason::IterationBudget));

        cancel.store(true, Ordering::Relaxed);
        let mut frames = solver.frames(options, CountingVisualizer, 64, 0);
        assert!(frames.next().is_none());
        assert_eq!(frames.stop_reason(), Some(StopReason::Cancelled));
    }

    /// Renders the height of the tallest drawn stack.
    struct HeightVisualizer;

    impl Visualizer for HeightVisualizer {
        type Image = f64;

        fn render(
            &mut self,
            _container: &Shape,
            blocks: &[Block],
            corners: &[Option<Corner>],
            _size: u32,
            _padding: u32,
        ) -> f64 {
            blocks.iter().zip(corners).fold(0.0_f64, |top, (block, corner)| match corner {
                Some(corner) => top.max(corner.z + block.shape().height),
                None => top.max(INFEASIBLE_SCORE),
            })
        }
    }

    #[test]
    fn frames_draw_the_incumbent_not_the_current_state() {
        let mut solver = Solver::with_seed(mixed_request(), Some(23)).unwrap();
        // A hot run accepts many worsening moves, so the current state
        // regularly drifts away from the best one.
        let options = SolveOptions::builder()
            .max_iterations(200)
            .temperature(1000.0)
            .build();
        let frames: Vec<_> = solver
            .frames(options, HeightVisualizer, 64, 0)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(frames.len(), 20);
        for frame in &frames {
            assert_eq!(
                frame.image, frame.best_score,
                "frame {} draws a configuration other than the best one",
                frame.iteration
            );
        }
        assert!(frames.windows(2).all(|w| w[1].best_score <= w[0].best_score));
        assert!(frames.iter().all(|f| solver.optimal_score() <= f.best_score));
    }

    #[test]
    fn scene_visualizer_describes_the_incumbent() {
        let mut solver = Solver::with_seed(mixed_request(), Some(17)).unwrap();
        let options = SolveOptions::builder().max_iterations(10).build();
        let frame = solver
            .frames(options, SceneVisualizer, 512, 16)
            .next()
            .expect("a frame is rendered before the tenth transition")
            .unwrap();
        assert_eq!(frame.image.blocks.len(), 6);
        assert_eq!(frame.image.size, 512);
        assert_eq!(frame.image.blocks[4].name, "e");
        assert!(!frame.image.blocks[4].stackable);
    }
}
