//! Tree descent over binarized feature buckets.

use ndarray::Array2;

use crate::core::constants::EVALUATION_BLOCK_SIZE;
use crate::core::types::{CatHash, FeatureValue, LeafValue};
use crate::ctr::CtrProvider;
use crate::features::{CatFeature, FloatFeature};
use crate::prediction::binarize_features;
use crate::tree::ObliviousTrees;

/// Walk trees `[tree_start, tree_end)` for one binarized block and
/// accumulate leaf values into `results` (block-local, object-major,
/// `block_len * approx_dimension` entries).
///
/// Level `l` of a tree contributes bit `l` of the leaf index: the first
/// split is the least significant bit, matching the leaf value layout
/// produced at training time.
pub(crate) fn calc_trees_for_block(
    trees: &ObliviousTrees,
    buckets: &Array2<u8>,
    block_len: usize,
    tree_start: usize,
    tree_end: usize,
    results: &mut [LeafValue],
) {
    let dim = trees.approx_dimension;
    let repacked = trees.repacked_bins();
    for tree_id in tree_start..tree_end {
        let depth = trees.tree_sizes[tree_id];
        let offset = trees.tree_start_offsets[tree_id];
        let splits = &trees.tree_splits[offset..offset + depth];
        let leaves = &trees.leaf_values[tree_id];
        for col in 0..block_len {
            let mut leaf_idx = 0usize;
            for (level, &split) in splits.iter().enumerate() {
                let bin = &repacked[split as usize];
                let bucket = buckets[[bin.bucket_index as usize, col]];
                let outcome = ((bucket ^ bin.xor_mask) >= bin.split_idx) as usize;
                leaf_idx |= outcome << level;
            }
            let leaf = &leaves[leaf_idx * dim..(leaf_idx + 1) * dim];
            let out = &mut results[col * dim..(col + 1) * dim];
            for (acc, &value) in out.iter_mut().zip(leaf) {
                *acc += value;
            }
        }
    }
}

/// Shared driver behind every `calc*` entry point: zero the results buffer,
/// then binarize and evaluate block by block. Input layouts differ only in
/// the accessors.
///
/// # Panics
///
/// Panics if `results.len() != object_count * approx_dimension`, if the tree
/// range is not `tree_start <= tree_end <= tree_count()`, or if metadata has
/// not been computed since the last structural change.
pub(crate) fn calc_generic<F, C>(
    trees: &ObliviousTrees,
    ctr_provider: Option<&dyn CtrProvider>,
    float_accessor: F,
    cat_accessor: C,
    object_count: usize,
    tree_start: usize,
    tree_end: usize,
    results: &mut [LeafValue],
) where
    F: Fn(&FloatFeature, usize) -> FeatureValue,
    C: Fn(&CatFeature, usize) -> CatHash,
{
    validate_tree_range(trees, tree_start, tree_end);
    let dim = trees.approx_dimension;
    assert_eq!(
        results.len(),
        object_count * dim,
        "results buffer must hold object_count * approx_dimension ({} * {}) values, found {}",
        object_count,
        dim,
        results.len(),
    );
    results.fill(0.0);

    let bucket_count = trees.effective_bin_features_buckets_count();
    let mut buckets = Array2::zeros((bucket_count, EVALUATION_BLOCK_SIZE));
    let mut block_start = 0;
    while block_start < object_count {
        let block_end = (block_start + EVALUATION_BLOCK_SIZE).min(object_count);
        binarize_features(
            trees,
            ctr_provider,
            &float_accessor,
            &cat_accessor,
            block_start,
            block_end,
            &mut buckets,
        );
        calc_trees_for_block(
            trees,
            &buckets,
            block_end - block_start,
            tree_start,
            tree_end,
            &mut results[block_start * dim..block_end * dim],
        );
        block_start = block_end;
    }
}

/// Staged evaluation: one result vector per window of `increment_step`
/// trees, where stage `i` covers trees `[0, min((i + 1) * step, count))`.
/// Each block is binarized once and reused across all stages.
///
/// # Panics
///
/// Panics if `increment_step` is zero, or on any [`calc_generic`]
/// precondition violation.
pub(crate) fn calc_tree_intervals_generic<F, C>(
    trees: &ObliviousTrees,
    ctr_provider: Option<&dyn CtrProvider>,
    float_accessor: F,
    cat_accessor: C,
    object_count: usize,
    increment_step: usize,
) -> Vec<Vec<LeafValue>>
where
    F: Fn(&FloatFeature, usize) -> FeatureValue,
    C: Fn(&CatFeature, usize) -> CatHash,
{
    assert!(increment_step > 0, "increment_step must be positive");
    let dim = trees.approx_dimension;
    let tree_count = trees.tree_count();
    let stage_count = tree_count.div_ceil(increment_step);
    let mut results = vec![vec![0.0; object_count * dim]; stage_count];

    let bucket_count = trees.effective_bin_features_buckets_count();
    let mut buckets = Array2::zeros((bucket_count, EVALUATION_BLOCK_SIZE));
    let mut running = vec![0.0; EVALUATION_BLOCK_SIZE * dim];
    let mut block_start = 0;
    while block_start < object_count {
        let block_end = (block_start + EVALUATION_BLOCK_SIZE).min(object_count);
        let block_len = block_end - block_start;
        binarize_features(
            trees,
            ctr_provider,
            &float_accessor,
            &cat_accessor,
            block_start,
            block_end,
            &mut buckets,
        );
        running[..block_len * dim].fill(0.0);
        for (stage, stage_results) in results.iter_mut().enumerate() {
            let window_start = stage * increment_step;
            let window_end = ((stage + 1) * increment_step).min(tree_count);
            calc_trees_for_block(
                trees,
                &buckets,
                block_len,
                window_start,
                window_end,
                &mut running[..block_len * dim],
            );
            stage_results[block_start * dim..block_end * dim]
                .copy_from_slice(&running[..block_len * dim]);
        }
        block_start = block_end;
    }
    results
}

fn validate_tree_range(trees: &ObliviousTrees, tree_start: usize, tree_end: usize) {
    let tree_count = trees.tree_count();
    assert!(
        tree_start <= tree_end && tree_end <= tree_count,
        "invalid tree range [{}, {}) for a model with {} trees",
        tree_start,
        tree_end,
        tree_count,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FloatFeature;

    /// One float feature with border 0.5; two depth-1 trees with leaf values
    /// [0, 1] and [0, 2].
    fn two_tree_model() -> ObliviousTrees {
        let mut trees = ObliviousTrees::default();
        trees.float_features.push(FloatFeature {
            feature_index: 0,
            flat_feature_index: 0,
            borders: vec![0.5],
            ..FloatFeature::default()
        });
        trees.add_bin_tree(&[0]);
        trees.leaf_values.push(vec![0.0, 1.0]);
        trees.add_bin_tree(&[0]);
        trees.leaf_values.push(vec![0.0, 2.0]);
        trees.update_metadata();
        trees
    }

    #[test]
    fn test_leaf_selection_and_accumulation() {
        let trees = two_tree_model();
        let values = [0.7f32, 0.3];
        let mut results = vec![0.0; 2];
        calc_generic(
            &trees,
            None,
            |_f, doc| values[doc],
            |_c, _doc| 0,
            2,
            0,
            2,
            &mut results,
        );
        assert_eq!(results, vec![3.0, 0.0]);
    }

    #[test]
    fn test_range_evaluation_restricts_trees() {
        let trees = two_tree_model();
        let mut results = vec![0.0; 1];
        calc_generic(&trees, None, |_f, _doc| 0.7, |_c, _doc| 0, 1, 1, 2, &mut results);
        assert_eq!(results, vec![2.0]);
    }

    #[test]
    fn test_calc_overwrites_stale_results() {
        let trees = two_tree_model();
        let mut results = vec![42.0; 1];
        calc_generic(&trees, None, |_f, _doc| 0.3, |_c, _doc| 0, 1, 0, 2, &mut results);
        assert_eq!(results, vec![0.0]);
    }

    #[test]
    #[should_panic(expected = "results buffer")]
    fn test_result_size_mismatch_fails() {
        let trees = two_tree_model();
        let mut results = vec![0.0; 3];
        calc_generic(&trees, None, |_f, _doc| 0.7, |_c, _doc| 0, 2, 0, 2, &mut results);
    }

    #[test]
    #[should_panic(expected = "invalid tree range")]
    fn test_tree_range_past_end_fails() {
        let trees = two_tree_model();
        let mut results = vec![0.0; 1];
        calc_generic(&trees, None, |_f, _doc| 0.7, |_c, _doc| 0, 1, 0, 3, &mut results);
    }
}
