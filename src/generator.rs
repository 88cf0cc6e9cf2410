//! Seeded random requests for demos and benchmarks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{PackingError, Result};
use crate::model::{Block, Color, Request};
use crate::types::Shape;

/// Parameters of a generated request.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerateParams {
    /// Nominal edge length; every extent is drawn from `[size / 2, 3 * size / 2]`.
    pub block_size: u32,
    pub n_stackable: usize,
    pub n_unstackable: usize,
    pub container: Shape,
    /// `None` draws a fresh seed from entropy.
    pub seed: Option<u64>,
}

impl Default for GenerateParams {
    fn default() -> Self {
        Self {
            block_size: 40,
            n_stackable: 10,
            n_unstackable: 10,
            container: Shape::new(200.0, 100.0, 100.0),
            seed: None,
        }
    }
}

fn random_shape<R: Rng + ?Sized>(block_size: u32, rng: &mut R) -> Shape {
    let min = block_size / 2;
    let max = 3 * block_size / 2;
    Shape::new(
        f64::from(rng.gen_range(min..=max)),
        f64::from(rng.gen_range(min..=max)),
        f64::from(rng.gen_range(min..=max)),
    )
}

fn random_color<R: Rng + ?Sized>(rng: &mut R) -> Color {
    Color(rng.r#gen(), rng.r#gen(), rng.r#gen())
}

/// Builds a random request: stackable blocks first, named `block0`, `block1`, ...
///
/// Extents are integers so generated scenes stay exactly representable.
/// Fails like `Request::new` does, e.g. when a drawn footprint is wider than
/// the container.
pub fn generate_request(params: &GenerateParams) -> Result<Request> {
    if params.block_size < 2 {
        return Err(PackingError::InvalidConfiguration(format!(
            "block_size must be at least 2, got: {}",
            params.block_size
        )));
    }

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let total = params.n_stackable + params.n_unstackable;
    let mut blocks = Vec::with_capacity(total);
    for i in 0..total {
        let shape = random_shape(params.block_size, &mut rng);
        let color = random_color(&mut rng);
        let block = Block::new(format!("block{i}"), shape)?
            .with_color(color)
            .with_stackable(i < params.n_stackable);
        blocks.push(block);
    }

    Request::new(params.container, blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(seed: u64) -> GenerateParams {
        GenerateParams {
            block_size: 20,
            n_stackable: 4,
            n_unstackable: 3,
            container: Shape::new(100.0, 60.0, 60.0),
            seed: Some(seed),
        }
    }

    #[test]
    fn same_seed_same_request() {
        let a = generate_request(&params(12)).unwrap();
        let b = generate_request(&params(12)).unwrap();
        assert_eq!(a.blocks(), b.blocks());
    }

    #[test]
    fn stackable_blocks_come_first() {
        let request = generate_request(&params(3)).unwrap();
        let flags: Vec<_> = request.blocks().iter().map(|b| b.is_stackable()).collect();
        assert_eq!(flags, vec![true, true, true, true, false, false, false]);
        let names: Vec<_> = request.blocks().iter().map(|b| b.name().to_string()).collect();
        assert_eq!(names[0], "block0");
        assert_eq!(names[6], "block6");
    }

    #[test]
    fn extents_stay_in_range() {
        let request = generate_request(&params(77)).unwrap();
        for block in request.blocks() {
            for extent in block.canonical_shape().as_array() {
                assert!((10.0..=30.0).contains(&extent), "extent {} out of range", extent);
                assert_eq!(extent.fract(), 0.0);
            }
        }
    }

    #[test]
    fn rejects_degenerate_parameters() {
        let mut tiny = params(1);
        tiny.block_size = 1;
        assert!(matches!(
            generate_request(&tiny),
            Err(PackingError::InvalidConfiguration(_))
        ));

        let mut empty = params(1);
        empty.n_stackable = 0;
        empty.n_unstackable = 0;
        assert!(matches!(generate_request(&empty), Err(PackingError::EmptyRequest)));

        let mut oversized = params(1);
        oversized.container = Shape::new(5.0, 5.0, 5.0);
        assert!(matches!(
            generate_request(&oversized),
            Err(PackingError::InvalidConfiguration(_))
        ));
    }
}
