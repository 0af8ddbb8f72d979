//! Feature similarity metrics.
//!
//! A metric scores a pair of features and declares a fixed **polarity**:
//! `+1` when a larger score means "more similar", `-1` when a larger score
//! means "further apart". The index layer uses the polarity to normalise
//! every score into a "smaller is closer" key before handing it to the
//! graph engine.

use crate::simd::{dot_product, l2_distance, l2_distance_squared, norm};

/// A similarity (or distance) function over a feature type.
pub trait Similarity {
    /// Feature representation this metric scores.
    type Feature: ?Sized + Sync;

    /// `+1` if larger scores are closer, `-1` otherwise.
    const POLARITY: i32;

    /// Short name used by logs and the CLI.
    const NAME: &'static str;

    fn apply(a: &Self::Feature, b: &Self::Feature) -> f32;

    /// Map a raw score into "smaller is closer" space.
    #[inline]
    fn rank(raw: f32) -> f32 {
        -(Self::POLARITY as f32) * raw
    }
}

/// Euclidean distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct L2;

impl Similarity for L2 {
    type Feature = [f32];
    const POLARITY: i32 = -1;
    const NAME: &'static str = "l2";

    #[inline]
    fn apply(a: &[f32], b: &[f32]) -> f32 {
        l2_distance(a, b)
    }
}

/// Squared Euclidean distance. Same ordering as [`L2`] without the sqrt.
#[derive(Debug, Clone, Copy, Default)]
pub struct L2Squared;

impl Similarity for L2Squared {
    type Feature = [f32];
    const POLARITY: i32 = -1;
    const NAME: &'static str = "l2sq";

    #[inline]
    fn apply(a: &[f32], b: &[f32]) -> f32 {
        l2_distance_squared(a, b)
    }
}

/// Inner product.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotProduct;

impl Similarity for DotProduct {
    type Feature = [f32];
    const POLARITY: i32 = 1;
    const NAME: &'static str = "dot";

    #[inline]
    fn apply(a: &[f32], b: &[f32]) -> f32 {
        dot_product(a, b)
    }
}

/// Cosine similarity in `[-1, 1]`. Zero vectors score 0 against everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cosine;

impl Similarity for Cosine {
    type Feature = [f32];
    const POLARITY: i32 = 1;
    const NAME: &'static str = "cosine";

    #[inline]
    fn apply(a: &[f32], b: &[f32]) -> f32 {
        let denom = norm(a) * norm(b);
        if denom <= f32::EPSILON {
            return 0.0;
        }
        (dot_product(a, b) / denom).clamp(-1.0, 1.0)
    }
}
