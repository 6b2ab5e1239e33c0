//! Feature binarization: raw object features to per-bucket byte values.

use ndarray::Array2;

use crate::core::types::{CatHash, FeatureValue};
use crate::ctr::CtrProvider;
use crate::features::{CatFeature, FloatFeature};
use crate::tree::ObliviousTrees;

/// Binarize objects `[block_start, block_end)` into `buckets`.
///
/// `buckets` is bucket-major: row `b` holds the byte value of effective
/// bucket `b` for every object of the block, in block-column order. Bucket
/// rows follow the metadata layout: float features first, then one-hot
/// features, then CTR features. Each bucket is computed once per object and
/// amortized across all trees that reference it.
///
/// # Panics
///
/// Panics if the model has CTR features but `ctr_provider` is `None`.
pub(crate) fn binarize_features<F, C>(
    trees: &ObliviousTrees,
    ctr_provider: Option<&dyn CtrProvider>,
    float_accessor: &F,
    cat_accessor: &C,
    block_start: usize,
    block_end: usize,
    buckets: &mut Array2<u8>,
) where
    F: Fn(&FloatFeature, usize) -> FeatureValue,
    C: Fn(&CatFeature, usize) -> CatHash,
{
    let block_len = block_end - block_start;
    let mut bucket_idx = 0;

    for feature in &trees.float_features {
        for col in 0..block_len {
            let value = float_accessor(feature, block_start + col);
            let mut bin = 0u8;
            for &border in &feature.borders {
                bin += (value > border) as u8;
            }
            buckets[[bucket_idx, col]] = bin;
        }
        bucket_idx += 1;
    }

    if trees.one_hot_features.is_empty() && trees.ctr_features.is_empty() {
        return;
    }

    // One-hot lookups and CTR providers consume hashed categorical values
    // indexed by categorical-space feature index, materialized once per
    // block in object-major order.
    let num_cat = trees.num_cat_features();
    let mut hashed_cats: Vec<CatHash> = vec![0; block_len * num_cat];
    for feature in &trees.cat_features {
        for col in 0..block_len {
            hashed_cats[col * num_cat + feature.feature_index] =
                cat_accessor(feature, block_start + col);
        }
    }

    for feature in &trees.one_hot_features {
        for col in 0..block_len {
            let value = hashed_cats[col * num_cat + feature.cat_feature_index];
            let mut bin = 0u8;
            for (value_idx, &candidate) in feature.values.iter().enumerate() {
                if candidate == value {
                    bin = (value_idx + 1) as u8;
                    break;
                }
            }
            buckets[[bucket_idx, col]] = bin;
        }
        bucket_idx += 1;
    }

    if trees.ctr_features.is_empty() {
        return;
    }
    let provider = ctr_provider.expect(
        "model uses CTR features but no CTR provider is attached: \
         check has_valid_ctr_provider() before evaluation",
    );
    for feature in &trees.ctr_features {
        for col in 0..block_len {
            let object_cats = &hashed_cats[col * num_cat..(col + 1) * num_cat];
            let value = provider.calc_ctr(&feature.ctr, object_cats);
            let mut bin = 0u8;
            for &border in &feature.borders {
                bin += (value > border) as u8;
            }
            buckets[[bucket_idx, col]] = bin;
        }
        bucket_idx += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::OneHotFeature;

    fn float_only_trees() -> ObliviousTrees {
        let mut trees = ObliviousTrees::default();
        trees.float_features.push(FloatFeature {
            feature_index: 0,
            flat_feature_index: 0,
            borders: vec![0.5, 1.5, 2.5],
            ..FloatFeature::default()
        });
        trees
    }

    #[test]
    fn test_float_threshold_bucketing() {
        let trees = float_only_trees();
        let values = [0.0f32, 0.5, 0.7, 2.0, 3.0];
        let mut buckets = Array2::zeros((1, values.len()));
        binarize_features(
            &trees,
            None,
            &|_f: &FloatFeature, doc| values[doc],
            &|_c: &CatFeature, _doc| 0,
            0,
            values.len(),
            &mut buckets,
        );
        // value > border counts: 0.5 sits on the first border and stays in bucket 0
        assert_eq!(buckets.row(0).to_vec(), vec![0, 0, 1, 2, 3]);
    }

    #[test]
    fn test_one_hot_bucket_is_match_position_plus_one() {
        let mut trees = ObliviousTrees::default();
        trees.cat_features.push(CatFeature {
            feature_index: 0,
            flat_feature_index: 0,
            feature_id: String::new(),
        });
        trees.one_hot_features.push(OneHotFeature {
            cat_feature_index: 0,
            values: vec![10, 20, 30],
        });
        let cats = [20, 99, 30];
        let mut buckets = Array2::zeros((1, cats.len()));
        binarize_features(
            &trees,
            None,
            &|_f: &FloatFeature, _doc| 0.0,
            &|_c: &CatFeature, doc| cats[doc],
            0,
            cats.len(),
            &mut buckets,
        );
        assert_eq!(buckets.row(0).to_vec(), vec![2, 0, 3]);
    }
}
