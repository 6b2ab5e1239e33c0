//! Derived model metadata: the binary-feature index.
//!
//! [`TreesMetadata`] is a pure function of a model's feature lists. It is
//! rebuilt explicitly through [`crate::ObliviousTrees::update_metadata`]
//! after any structural change; nothing here recomputes implicitly on read.

use crate::core::constants::MAX_BUCKET_SPLIT_COUNT;
use crate::ctr::ModelCtr;
use crate::features::{
    CtrFeature, CtrSplit, FloatFeature, FloatSplit, ModelSplit, OneHotFeature, OneHotSplit,
};

/// Split position stored for one-hot conditions. The bucket value for a
/// one-hot feature is `value_idx + 1` on match and `0` otherwise, so the
/// equality test `bucket == v` is expressed as `(bucket ^ !v) >= 0xff`,
/// which is the same comparison shape as a threshold split.
const ONE_HOT_SPLIT_IDX: u8 = u8::MAX;

/// Packed per-binary-feature evaluation descriptor.
///
/// One lookup yields everything the evaluator needs for a tree level: which
/// bucket to read, the xor-mask to apply, and the split position to compare
/// against. The level outcome is `(bucket ^ xor_mask) >= split_idx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepackedBin {
    /// Which effective feature bucket holds the binarized value
    pub bucket_index: u32,
    /// Mask applied to the bucket value before comparison
    pub xor_mask: u8,
    /// Split position within the bucket, compared with `>=`
    pub split_idx: u8,
}

/// Metadata derived from a model's feature lists.
///
/// `bin_features` is the ordered, deduplicated binary split list that tree
/// split indexes refer to; `repacked_bins` carries one [`RepackedBin`] per
/// entry of `bin_features`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreesMetadata {
    /// Every distinct CTR used by the model, in encounter order
    pub used_model_ctrs: Vec<ModelCtr>,
    /// Ordered binary split list; tree split values index into it
    pub bin_features: Vec<ModelSplit>,
    /// Packed evaluation descriptor per entry of `bin_features`
    pub repacked_bins: Vec<RepackedBin>,
    /// Number of effective feature buckets binarized per object
    pub effective_bin_features_bucket_count: usize,
}

impl TreesMetadata {
    /// Build metadata from the feature lists.
    ///
    /// Bin features are laid out in split-type order: all float splits,
    /// then all one-hot splits, then all CTR splits, each source feature
    /// occupying one effective bucket.
    ///
    /// # Panics
    ///
    /// Panics if any single feature carries more than
    /// [`MAX_BUCKET_SPLIT_COUNT`] splits; bucket values are single bytes and
    /// larger features are unsupported.
    pub(crate) fn build(
        float_features: &[FloatFeature],
        one_hot_features: &[OneHotFeature],
        ctr_features: &[CtrFeature],
    ) -> Self {
        let mut meta = TreesMetadata::default();

        for feature in float_features {
            assert!(
                feature.borders.len() <= MAX_BUCKET_SPLIT_COUNT,
                "float feature {} has {} borders, at most {} splits per feature are supported",
                feature.feature_index,
                feature.borders.len(),
                MAX_BUCKET_SPLIT_COUNT,
            );
            for (border_idx, &border) in feature.borders.iter().enumerate() {
                meta.bin_features.push(ModelSplit::Float(FloatSplit {
                    float_feature_index: feature.feature_index,
                    border,
                }));
                meta.repacked_bins.push(RepackedBin {
                    bucket_index: meta.effective_bin_features_bucket_count as u32,
                    xor_mask: 0,
                    split_idx: (border_idx + 1) as u8,
                });
            }
            meta.effective_bin_features_bucket_count += 1;
        }

        for feature in one_hot_features {
            assert!(
                feature.values.len() <= MAX_BUCKET_SPLIT_COUNT,
                "one-hot feature {} has {} values, at most {} splits per feature are supported",
                feature.cat_feature_index,
                feature.values.len(),
                MAX_BUCKET_SPLIT_COUNT,
            );
            for (value_idx, &value) in feature.values.iter().enumerate() {
                meta.bin_features.push(ModelSplit::OneHot(OneHotSplit {
                    cat_feature_index: feature.cat_feature_index,
                    value,
                }));
                meta.repacked_bins.push(RepackedBin {
                    bucket_index: meta.effective_bin_features_bucket_count as u32,
                    xor_mask: !((value_idx + 1) as u8),
                    split_idx: ONE_HOT_SPLIT_IDX,
                });
            }
            meta.effective_bin_features_bucket_count += 1;
        }

        for feature in ctr_features {
            if !meta.used_model_ctrs.contains(&feature.ctr) {
                meta.used_model_ctrs.push(feature.ctr.clone());
            }
            assert!(
                feature.borders.len() <= MAX_BUCKET_SPLIT_COUNT,
                "ctr feature has {} borders, at most {} splits per feature are supported",
                feature.borders.len(),
                MAX_BUCKET_SPLIT_COUNT,
            );
            for (border_idx, &border) in feature.borders.iter().enumerate() {
                meta.bin_features.push(ModelSplit::OnlineCtr(CtrSplit {
                    ctr: feature.ctr.clone(),
                    border,
                }));
                meta.repacked_bins.push(RepackedBin {
                    bucket_index: meta.effective_bin_features_bucket_count as u32,
                    xor_mask: 0,
                    split_idx: (border_idx + 1) as u8,
                });
            }
            meta.effective_bin_features_bucket_count += 1;
        }

        meta
    }
}
