//! Oblivious tree ensemble container.
//!
//! An oblivious tree is symmetric: every node at a given depth level shares
//! the same binary condition, so a leaf index is just the bit vector of
//! per-level condition outcomes. The whole ensemble is stored flattened in
//! three parallel arrays plus a per-tree leaf value table:
//!
//! - `tree_splits` holds the binary feature indexes of all trees back to back
//! - `tree_sizes[t]` is the depth of tree `t`
//! - `tree_start_offsets[t]` is the offset of tree `t`'s first entry in
//!   `tree_splits`
//!
//! Derived metadata (the binary-feature index) lives in a cache that must be
//! rebuilt with [`ObliviousTrees::update_metadata`] after any structural
//! change; reads before the first rebuild fail loudly.

mod metadata;

pub use metadata::{RepackedBin, TreesMetadata};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::constants::MAX_TREE_DEPTH;
use crate::core::error::OblivTreeError;
use crate::core::types::{BinFeatureIndex, LeafValue};
use crate::ctr::{ModelCtr, ModelCtrBase};
use crate::features::{CatFeature, CtrFeature, FloatFeature, ModelSplit, OneHotFeature};

/// Oblivious tree ensemble: flattened tree structure, leaf values and the
/// feature descriptor lists, plus a cached binary-feature index.
///
/// Fields are public value data; the metadata cache is private and excluded
/// from equality and serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "RawObliviousTrees", try_from = "RawObliviousTrees")]
pub struct ObliviousTrees {
    /// Number of output dimensions per leaf, 1 for most models
    pub approx_dimension: usize,
    /// Binary feature indexes of all trees, back to back
    pub tree_splits: Vec<BinFeatureIndex>,
    /// Depth of each tree
    pub tree_sizes: Vec<usize>,
    /// Offset of each tree's first entry in `tree_splits`
    pub tree_start_offsets: Vec<usize>,
    /// Per tree: `approx_dimension * 2^depth` leaf values, laid out
    /// `[leaf_index * approx_dimension + dimension]`
    pub leaf_values: Vec<Vec<LeafValue>>,
    /// Categorical features used in one-hot conditions and/or CTR combinations
    pub cat_features: Vec<CatFeature>,
    /// Float features used in the model
    pub float_features: Vec<FloatFeature>,
    /// One-hot encoded features used in the model
    pub one_hot_features: Vec<OneHotFeature>,
    /// CTR features used in the model
    pub ctr_features: Vec<CtrFeature>,
    metadata: Option<TreesMetadata>,
}

impl Default for ObliviousTrees {
    fn default() -> Self {
        ObliviousTrees {
            approx_dimension: 1,
            tree_splits: Vec::new(),
            tree_sizes: Vec::new(),
            tree_start_offsets: Vec::new(),
            leaf_values: Vec::new(),
            cat_features: Vec::new(),
            float_features: Vec::new(),
            one_hot_features: Vec::new(),
            ctr_features: Vec::new(),
            metadata: None,
        }
    }
}

impl PartialEq for ObliviousTrees {
    /// Cached metadata is derivable state and excluded from comparison.
    fn eq(&self, other: &Self) -> bool {
        self.approx_dimension == other.approx_dimension
            && self.tree_splits == other.tree_splits
            && self.tree_sizes == other.tree_sizes
            && self.tree_start_offsets == other.tree_start_offsets
            && self.leaf_values == other.leaf_values
            && self.cat_features == other.cat_features
            && self.float_features == other.float_features
            && self.one_hot_features == other.one_hot_features
            && self.ctr_features == other.ctr_features
    }
}

impl ObliviousTrees {
    /// Number of trees in the ensemble.
    pub fn tree_count(&self) -> usize {
        self.tree_sizes.len()
    }

    /// Append one tree's binary split sequence, deriving its size and start
    /// offset. Leaf values for the new tree are appended separately by the
    /// caller. Invalidates cached metadata.
    ///
    /// # Panics
    ///
    /// Panics if the size and offset arrays are out of sync, or if the tree
    /// is deeper than [`MAX_TREE_DEPTH`].
    pub fn add_bin_tree(&mut self, bin_splits: &[BinFeatureIndex]) {
        assert_eq!(
            self.tree_sizes.len(),
            self.tree_start_offsets.len(),
            "tree size and start offset arrays are out of sync",
        );
        assert!(
            bin_splits.len() <= MAX_TREE_DEPTH,
            "tree depth {} exceeds the supported maximum of {}",
            bin_splits.len(),
            MAX_TREE_DEPTH,
        );
        self.tree_start_offsets.push(self.tree_splits.len());
        self.tree_splits.extend_from_slice(bin_splits);
        self.tree_sizes.push(bin_splits.len());
        self.metadata = None;
    }

    /// Keep only trees `[begin, end)`, rewriting start offsets from zero and
    /// slicing `tree_splits` and `leaf_values` to the retained range. The
    /// feature lists are untouched, so the retained split indexes stay
    /// valid. Invalidates cached metadata.
    ///
    /// # Panics
    ///
    /// Panics unless `begin <= end <= tree_count()`.
    pub fn truncate(&mut self, begin: usize, end: usize) {
        let tree_count = self.tree_count();
        assert!(
            begin <= end && end <= tree_count,
            "invalid tree range [{}, {}) for a model with {} trees",
            begin,
            end,
            tree_count,
        );
        let split_begin = if begin < tree_count {
            self.tree_start_offsets[begin]
        } else {
            self.tree_splits.len()
        };
        let split_end = if end > begin {
            self.tree_start_offsets[end - 1] + self.tree_sizes[end - 1]
        } else {
            split_begin
        };
        self.tree_splits = self.tree_splits[split_begin..split_end].to_vec();
        self.tree_sizes = self.tree_sizes[begin..end].to_vec();
        self.leaf_values = self.leaf_values[begin..end].to_vec();
        self.tree_start_offsets = rebuild_start_offsets(&self.tree_sizes);
        self.metadata = None;
    }

    /// Recompute the cached binary-feature index from the current feature
    /// lists. Must be called after any structural change and before the next
    /// metadata read or evaluation. Idempotent.
    ///
    /// # Panics
    ///
    /// Panics if a feature exceeds the per-bucket split capacity, if a tree
    /// split references a binary feature that does not exist, or if a tree's
    /// leaf value table does not hold `approx_dimension * 2^depth` entries.
    pub fn update_metadata(&mut self) {
        assert!(self.approx_dimension >= 1, "approx dimension must be positive");
        let meta = TreesMetadata::build(
            &self.float_features,
            &self.one_hot_features,
            &self.ctr_features,
        );
        if let Some(&max_split) = self.tree_splits.iter().max() {
            assert!(
                (max_split as usize) < meta.bin_features.len(),
                "tree split index {} references a missing binary feature ({} known)",
                max_split,
                meta.bin_features.len(),
            );
        }
        for (tree_id, (size, leaves)) in self
            .tree_sizes
            .iter()
            .zip(self.leaf_values.iter())
            .enumerate()
        {
            let expected = self.approx_dimension << size;
            assert_eq!(
                leaves.len(),
                expected,
                "tree {} of depth {} must hold {} leaf values, found {}",
                tree_id,
                size,
                expected,
                leaves.len(),
            );
        }
        log::debug!(
            "rebuilt trees metadata: {} binary features in {} buckets, {} ctrs",
            meta.bin_features.len(),
            meta.effective_bin_features_bucket_count,
            meta.used_model_ctrs.len(),
        );
        self.metadata = Some(meta);
    }

    fn metadata(&self) -> &TreesMetadata {
        self.metadata
            .as_ref()
            .expect("metadata is not initialized: call update_metadata() after structural changes")
    }

    /// Every distinct CTR used by the model, in encounter order.
    ///
    /// # Panics
    ///
    /// Panics if metadata has not been computed since the last structural
    /// change.
    pub fn used_model_ctrs(&self) -> &[ModelCtr] {
        &self.metadata().used_model_ctrs
    }

    /// Ordered binary split list; `tree_splits` values index into it.
    ///
    /// # Panics
    ///
    /// Panics if metadata has not been computed since the last structural
    /// change.
    pub fn bin_features(&self) -> &[ModelSplit] {
        &self.metadata().bin_features
    }

    /// Packed evaluation descriptors, one per entry of [`Self::bin_features`].
    ///
    /// # Panics
    ///
    /// Panics if metadata has not been computed since the last structural
    /// change.
    pub fn repacked_bins(&self) -> &[RepackedBin] {
        &self.metadata().repacked_bins
    }

    /// Number of effective feature buckets binarized per object.
    ///
    /// # Panics
    ///
    /// Panics if metadata has not been computed since the last structural
    /// change.
    pub fn effective_bin_features_buckets_count(&self) -> usize {
        self.metadata().effective_bin_features_bucket_count
    }

    /// Distinct CTR bases used by the model, sorted.
    ///
    /// # Panics
    ///
    /// Panics if metadata has not been computed since the last structural
    /// change.
    pub fn used_model_ctr_bases(&self) -> Vec<ModelCtrBase> {
        let bases: BTreeSet<ModelCtrBase> = self
            .used_model_ctrs()
            .iter()
            .map(|ctr| ctr.base.clone())
            .collect();
        bases.into_iter().collect()
    }

    /// Total number of binary features in the model.
    ///
    /// # Panics
    ///
    /// Panics if metadata has not been computed since the last structural
    /// change.
    pub fn binary_features_full_count(&self) -> usize {
        self.bin_features().len()
    }

    /// Minimal float feature vector length for this model. Feature indexes
    /// need not be contiguous: the expected length is the maximum index
    /// plus one, not the count of present features.
    pub fn num_float_features(&self) -> usize {
        self.float_features
            .iter()
            .map(|f| f.feature_index + 1)
            .max()
            .unwrap_or(0)
    }

    /// Minimal categorical feature vector length for this model, sparse-safe
    /// like [`Self::num_float_features`].
    pub fn num_cat_features(&self) -> usize {
        self.cat_features
            .iter()
            .map(|f| f.feature_index + 1)
            .max()
            .unwrap_or(0)
    }

    /// Minimal length of a mixed flat feature vector for this model.
    pub fn flat_feature_vector_expected_size(&self) -> usize {
        self.num_float_features() + self.num_cat_features()
    }
}

fn rebuild_start_offsets(tree_sizes: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(tree_sizes.len());
    let mut offset = 0;
    for &size in tree_sizes {
        offsets.push(offset);
        offset += size;
    }
    offsets
}

/// Wire-layout mirror of [`ObliviousTrees`]: leaf values travel as one flat
/// stream and are re-chunked per tree on load using
/// `approx_dimension * 2^tree_sizes[t]`. Fields absent in a payload default
/// to empty containers.
#[derive(Serialize, Deserialize)]
pub(crate) struct RawObliviousTrees {
    #[serde(default = "default_approx_dimension")]
    approx_dimension: usize,
    #[serde(default)]
    tree_splits: Vec<BinFeatureIndex>,
    #[serde(default)]
    tree_sizes: Vec<usize>,
    #[serde(default)]
    tree_start_offsets: Vec<usize>,
    #[serde(default)]
    leaf_values: Vec<LeafValue>,
    #[serde(default)]
    cat_features: Vec<CatFeature>,
    #[serde(default)]
    float_features: Vec<FloatFeature>,
    #[serde(default)]
    one_hot_features: Vec<OneHotFeature>,
    #[serde(default)]
    ctr_features: Vec<CtrFeature>,
}

fn default_approx_dimension() -> usize {
    1
}

impl From<ObliviousTrees> for RawObliviousTrees {
    fn from(trees: ObliviousTrees) -> Self {
        RawObliviousTrees {
            approx_dimension: trees.approx_dimension,
            tree_splits: trees.tree_splits,
            tree_sizes: trees.tree_sizes,
            tree_start_offsets: trees.tree_start_offsets,
            leaf_values: trees.leaf_values.into_iter().flatten().collect(),
            cat_features: trees.cat_features,
            float_features: trees.float_features,
            one_hot_features: trees.one_hot_features,
            ctr_features: trees.ctr_features,
        }
    }
}

impl TryFrom<RawObliviousTrees> for ObliviousTrees {
    type Error = OblivTreeError;

    fn try_from(raw: RawObliviousTrees) -> Result<Self, Self::Error> {
        use crate::core::constants::MAX_BUCKET_SPLIT_COUNT;

        if raw.approx_dimension == 0 {
            return Err(OblivTreeError::model("approx dimension must be positive"));
        }
        let split_counts = raw
            .float_features
            .iter()
            .map(|f| f.borders.len())
            .chain(raw.one_hot_features.iter().map(|f| f.values.len()))
            .chain(raw.ctr_features.iter().map(|f| f.borders.len()));
        let mut bin_feature_count = 0usize;
        for count in split_counts {
            if count > MAX_BUCKET_SPLIT_COUNT {
                return Err(OblivTreeError::model(format!(
                    "a feature carries {} splits, at most {} are supported",
                    count, MAX_BUCKET_SPLIT_COUNT,
                )));
            }
            bin_feature_count += count;
        }
        if let Some(&max_split) = raw.tree_splits.iter().max() {
            if max_split as usize >= bin_feature_count {
                return Err(OblivTreeError::model(format!(
                    "tree split index {} references a missing binary feature ({} known)",
                    max_split, bin_feature_count,
                )));
            }
        }
        if raw.tree_sizes.len() != raw.tree_start_offsets.len() {
            return Err(OblivTreeError::model(format!(
                "tree size and start offset arrays differ in length: {} vs {}",
                raw.tree_sizes.len(),
                raw.tree_start_offsets.len(),
            )));
        }
        if raw.tree_start_offsets != rebuild_start_offsets(&raw.tree_sizes) {
            return Err(OblivTreeError::model(
                "tree start offsets are not the running sum of tree sizes",
            ));
        }
        let total_splits: usize = raw.tree_sizes.iter().sum();
        if raw.tree_splits.len() != total_splits {
            return Err(OblivTreeError::model(format!(
                "tree splits array holds {} entries, tree sizes sum to {}",
                raw.tree_splits.len(),
                total_splits,
            )));
        }
        if let Some(&depth) = raw.tree_sizes.iter().max() {
            if depth > MAX_TREE_DEPTH {
                return Err(OblivTreeError::model(format!(
                    "tree depth {} exceeds the supported maximum of {}",
                    depth, MAX_TREE_DEPTH,
                )));
            }
        }

        let mut leaf_values = Vec::with_capacity(raw.tree_sizes.len());
        let mut leaf_stream = raw.leaf_values.as_slice();
        for (tree_id, &size) in raw.tree_sizes.iter().enumerate() {
            let tree_leaf_count = raw.approx_dimension << size;
            if leaf_stream.len() < tree_leaf_count {
                return Err(OblivTreeError::model(format!(
                    "leaf value stream exhausted at tree {}: need {} more values, found {}",
                    tree_id,
                    tree_leaf_count,
                    leaf_stream.len(),
                )));
            }
            leaf_values.push(leaf_stream[..tree_leaf_count].to_vec());
            leaf_stream = &leaf_stream[tree_leaf_count..];
        }
        if !leaf_stream.is_empty() {
            return Err(OblivTreeError::model(format!(
                "leaf value stream carries {} values past the last tree",
                leaf_stream.len(),
            )));
        }

        Ok(ObliviousTrees {
            approx_dimension: raw.approx_dimension,
            tree_splits: raw.tree_splits,
            tree_sizes: raw.tree_sizes,
            tree_start_offsets: raw.tree_start_offsets,
            leaf_values,
            cat_features: raw.cat_features,
            float_features: raw.float_features,
            one_hot_features: raw.one_hot_features,
            ctr_features: raw.ctr_features,
            metadata: None,
        })
    }
}
