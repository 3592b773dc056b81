use std::marker::PhantomData;

use rand::Rng;
use thiserror::Error;

use super::{DiscreteAction, Space};

#[derive(Debug, Error, PartialEq)]
#[error("invalid box bounds [{low}, {high}]")]
pub struct BoundsError {
    pub low: f32,
    pub high: f32,
}

/// Integers in `0..n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discrete {
    pub n: usize,
}

impl Discrete {
    pub fn new(n: usize) -> Self {
        Discrete { n }
    }
}

impl Space for Discrete {
    type Element = usize;

    fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        rng.gen_range(0..self.n.max(1))
    }

    fn contains(&self, element: &usize) -> bool {
        *element < self.n
    }
}

/// Flat float vectors with every entry bounded by `[low, high]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSpace {
    low: f32,
    high: f32,
    shape: Vec<usize>,
}

impl BoxSpace {
    /// Bounds must be finite with `low <= high`.
    pub fn new(low: f32, high: f32, shape: Vec<usize>) -> Result<Self, BoundsError> {
        if !(low.is_finite() && high.is_finite() && low <= high) {
            return Err(BoundsError { low, high });
        }
        Ok(BoxSpace { low, high, shape })
    }

    /// Entries in `[-1, 1]`.
    pub fn unit(shape: Vec<usize>) -> Self {
        BoxSpace {
            low: -1.0,
            high: 1.0,
            shape,
        }
    }

    pub fn low(&self) -> f32 {
        self.low
    }

    pub fn high(&self) -> f32 {
        self.high
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Space for BoxSpace {
    type Element = Vec<f32>;

    fn sample<R: Rng>(&self, rng: &mut R) -> Vec<f32> {
        (0..self.len())
            .map(|_| rng.gen_range(self.low..=self.high))
            .collect()
    }

    fn contains(&self, element: &Vec<f32>) -> bool {
        element.len() == self.len()
            && element.iter().all(|x| *x >= self.low && *x <= self.high)
    }
}

/// Space over every variant of a [`DiscreteAction`].
#[derive(Debug)]
pub struct Enumerated<A> {
    _action: PhantomData<A>,
}

impl<A> Enumerated<A> {
    pub fn new() -> Self {
        Enumerated {
            _action: PhantomData,
        }
    }
}

impl<A> Default for Enumerated<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for Enumerated<A> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<A: DiscreteAction + Clone> Space for Enumerated<A> {
    type Element = A;

    fn sample<R: Rng>(&self, rng: &mut R) -> A {
        A::from_index(rng.gen_range(0..A::count()))
    }

    fn contains(&self, element: &A) -> bool {
        element.index() < A::count()
    }
}
