//! Plot-scale sampling.

use polars::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;

/// Uniform sample of at most `n` rows with a fixed seed.
///
/// Frames with `n` rows or fewer are returned unchanged. Sampled rows keep
/// their original relative order, so the same input and seed always give the
/// same frame.
pub fn uniform_sample(df: &DataFrame, n: usize, seed: u64) -> PolarsResult<DataFrame> {
    let len = df.height();
    if len <= n {
        return Ok(df.clone());
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, len, n).into_vec();
    picked.sort_unstable();

    let idx: Vec<IdxSize> = picked.into_iter().map(|i| i as IdxSize).collect();
    df.take(&IdxCa::from_vec("idx".into(), idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(rows: usize) -> DataFrame {
        let ids: Vec<u32> = (0..rows as u32).collect();
        df!["row" => ids].unwrap()
    }

    #[test]
    fn test_small_frame_unchanged() {
        let df = frame(10);
        let sample = uniform_sample(&df, 50, 42).unwrap();
        assert!(sample.equals(&df));
    }

    #[test]
    fn test_sample_is_reproducible() {
        let df = frame(100_000);

        let first = uniform_sample(&df, 50_000, 42).unwrap();
        let second = uniform_sample(&df, 50_000, 42).unwrap();

        assert_eq!(first.height(), 50_000);
        assert!(first.equals(&second));
    }

    #[test]
    fn test_sample_keeps_row_order_and_has_no_duplicates() {
        let df = frame(1_000);
        let sample = uniform_sample(&df, 100, 7).unwrap();

        let rows: Vec<u32> = sample
            .column("row")
            .unwrap()
            .as_materialized_series()
            .u32()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(rows.len(), 100);
        assert!(rows.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_different_seeds_differ() {
        let df = frame(1_000);
        let a = uniform_sample(&df, 100, 1).unwrap();
        let b = uniform_sample(&df, 100, 2).unwrap();
        assert!(!a.equals(&b));
    }
}
