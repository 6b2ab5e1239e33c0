//! Full model container: trees, model info and the CTR provider handle.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;

use crate::core::constants::EVALUATION_BLOCK_SIZE;
use crate::core::error::Result;
use crate::core::types::{CatHash, LeafValue};
use crate::ctr::CtrProvider;
use crate::features::{float_bits_to_cat_hash, hash_cat_feature};
use crate::io;
use crate::prediction::{calc_generic, calc_tree_intervals_generic};
use crate::tree::ObliviousTrees;

/// Full model: oblivious trees plus free-form model information and an
/// optionally attached CTR provider.
///
/// The provider is shared ownership — model copies produced by
/// [`FullModel::copy_tree_range`] reuse the same provider instance. Equality
/// compares trees and model info only.
///
/// Evaluation is read-only and safe for unlimited concurrent callers as long
/// as no mutation ([`ObliviousTrees::truncate`],
/// [`ObliviousTrees::add_bin_tree`], [`FullModel::update_dynamic_data`]) is
/// in flight; the crate enforces no locking of its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FullModel {
    /// Tree structure, leaf values and feature descriptors
    pub oblivious_trees: ObliviousTrees,
    /// Free-form model information key-value storage
    #[serde(default)]
    pub model_info: HashMap<String, String>,
    /// CTR value provider, shared across model copies
    #[serde(skip)]
    pub ctr_provider: Option<Arc<dyn CtrProvider>>,
}

impl PartialEq for FullModel {
    fn eq(&self, other: &Self) -> bool {
        self.oblivious_trees == other.oblivious_trees && self.model_info == other.model_info
    }
}

impl FullModel {
    /// Number of trees in the model.
    pub fn tree_count(&self) -> usize {
        self.oblivious_trees.tree_count()
    }

    /// Minimal float features vector length for this model.
    pub fn num_float_features(&self) -> usize {
        self.oblivious_trees.num_float_features()
    }

    /// Minimal categorical features vector length for this model.
    pub fn num_cat_features(&self) -> usize {
        self.oblivious_trees.num_cat_features()
    }

    /// Whether the model uses categorical features in one-hot conditions
    /// and/or CTR feature combinations.
    pub fn has_categorical_features(&self) -> bool {
        !self.oblivious_trees.cat_features.is_empty()
    }

    /// Whether an attached CTR provider can supply every CTR the trees
    /// require. Returns `false` when no provider is attached; callers must
    /// check this before any evaluation path that touches CTR features.
    ///
    /// # Panics
    ///
    /// Panics if metadata has not been computed since the last structural
    /// change.
    pub fn has_valid_ctr_provider(&self) -> bool {
        match &self.ctr_provider {
            None => false,
            Some(provider) => provider.has_needed_ctrs(self.oblivious_trees.used_model_ctrs()),
        }
    }

    /// Recompute derived state after any structural mutation of trees or
    /// features: rebuilds the trees metadata and re-aligns the CTR
    /// provider's bin-feature index with the (possibly renumbered) binary
    /// feature layout.
    pub fn update_dynamic_data(&mut self) {
        self.oblivious_trees.update_metadata();
        if let Some(provider) = &self.ctr_provider {
            provider.setup_bin_feature_indexes(
                &self.oblivious_trees.float_features,
                &self.oblivious_trees.one_hot_features,
                &self.oblivious_trees.cat_features,
            );
        }
    }

    /// Copy of this model retaining only trees `[begin, end)`.
    ///
    /// The copy shares no mutable state with the original beyond the CTR
    /// provider handle. Its metadata is left invalidated by the truncation:
    /// call [`FullModel::update_dynamic_data`] on the copy before evaluating
    /// it.
    ///
    /// # Panics
    ///
    /// Panics unless `begin <= end <= tree_count()`.
    pub fn copy_tree_range(&self, begin: usize, end: usize) -> FullModel {
        let mut result = self.clone();
        result.oblivious_trees.truncate(begin, end);
        result
    }

    /// Evaluate trees `[tree_start, tree_end)` on flat feature vectors:
    /// one row per object, float and categorical values interleaved in
    /// flat-feature-index order. Categorical cells carry hashed values
    /// bit-packed into `f32`.
    ///
    /// `results` is written as `[object_index * approx_dimension + dimension]`.
    ///
    /// # Panics
    ///
    /// Panics on any size or tree-range precondition violation, or if
    /// metadata has not been computed.
    pub fn calc_flat_range<R: AsRef<[f32]>>(
        &self,
        features: &[R],
        tree_start: usize,
        tree_end: usize,
        results: &mut [LeafValue],
    ) {
        self.validate_flat_rows(features);
        calc_generic(
            &self.oblivious_trees,
            self.ctr_provider.as_deref(),
            |f, doc| features[doc].as_ref()[f.flat_feature_index],
            |c, doc| float_bits_to_cat_hash(features[doc].as_ref()[c.flat_feature_index]),
            features.len(),
            tree_start,
            tree_end,
            results,
        );
    }

    /// [`FullModel::calc_flat_range`] over all model trees.
    pub fn calc_flat<R: AsRef<[f32]>>(&self, features: &[R], results: &mut [LeafValue]) {
        self.calc_flat_range(features, 0, self.tree_count(), results);
    }

    /// Parallel [`FullModel::calc_flat`]: objects are split into evaluation
    /// blocks processed on the rayon thread pool, each block writing its own
    /// disjoint slice of `results`.
    pub fn calc_flat_parallel<R>(&self, features: &[R], results: &mut [LeafValue])
    where
        R: AsRef<[f32]> + Sync,
    {
        self.validate_flat_rows(features);
        let dim = self.oblivious_trees.approx_dimension;
        assert_eq!(
            results.len(),
            features.len() * dim,
            "results buffer must hold object_count * approx_dimension ({} * {}) values, found {}",
            features.len(),
            dim,
            results.len(),
        );
        let tree_count = self.tree_count();
        results
            .par_chunks_mut(EVALUATION_BLOCK_SIZE * dim)
            .zip(features.par_chunks(EVALUATION_BLOCK_SIZE))
            .for_each(|(result_block, feature_block)| {
                calc_generic(
                    &self.oblivious_trees,
                    self.ctr_provider.as_deref(),
                    |f, doc| feature_block[doc].as_ref()[f.flat_feature_index],
                    |c, doc| float_bits_to_cat_hash(feature_block[doc].as_ref()[c.flat_feature_index]),
                    feature_block.len(),
                    0,
                    tree_count,
                    result_block,
                );
            });
    }

    /// Evaluate on a transposed flat layout: one column per flat feature
    /// index, one entry per object. Used when the caller already has
    /// columnar data; same algorithm as [`FullModel::calc_flat_range`] with
    /// a different stride pattern.
    ///
    /// The object count is taken from `results.len() / approx_dimension`.
    ///
    /// # Panics
    ///
    /// Panics on any size or tree-range precondition violation, or if
    /// metadata has not been computed.
    pub fn calc_flat_transposed_range<R: AsRef<[f32]>>(
        &self,
        transposed_features: &[R],
        tree_start: usize,
        tree_end: usize,
        results: &mut [LeafValue],
    ) {
        let dim = self.oblivious_trees.approx_dimension;
        assert_eq!(
            results.len() % dim,
            0,
            "results buffer length {} is not a multiple of approx_dimension {}",
            results.len(),
            dim,
        );
        let object_count = results.len() / dim;
        let expected = self.oblivious_trees.flat_feature_vector_expected_size();
        assert!(
            transposed_features.len() >= expected,
            "transposed features hold {} columns, the model expects at least {}",
            transposed_features.len(),
            expected,
        );
        for (idx, column) in transposed_features[..expected].iter().enumerate() {
            assert!(
                column.as_ref().len() >= object_count,
                "feature column {} holds {} values for {} objects",
                idx,
                column.as_ref().len(),
                object_count,
            );
        }
        calc_generic(
            &self.oblivious_trees,
            self.ctr_provider.as_deref(),
            |f, doc| transposed_features[f.flat_feature_index].as_ref()[doc],
            |c, doc| float_bits_to_cat_hash(transposed_features[c.flat_feature_index].as_ref()[doc]),
            object_count,
            tree_start,
            tree_end,
            results,
        );
    }

    /// [`FullModel::calc_flat_transposed_range`] over all model trees.
    pub fn calc_flat_transposed<R: AsRef<[f32]>>(
        &self,
        transposed_features: &[R],
        results: &mut [LeafValue],
    ) {
        self.calc_flat_transposed_range(transposed_features, 0, self.tree_count(), results);
    }

    /// Single-object [`FullModel::calc_flat_range`]; `results` is indexed by
    /// output dimension.
    pub fn calc_flat_single_range(
        &self,
        features: &[f32],
        tree_start: usize,
        tree_end: usize,
        results: &mut [LeafValue],
    ) {
        self.calc_flat_range(std::slice::from_ref(&features), tree_start, tree_end, results);
    }

    /// Single-object [`FullModel::calc_flat`].
    pub fn calc_flat_single(&self, features: &[f32], results: &mut [LeafValue]) {
        self.calc_flat_single_range(features, 0, self.tree_count(), results);
    }

    /// Evaluate trees `[tree_start, tree_end)` on separated inputs: float
    /// feature rows indexed by float-space feature index and hashed
    /// categorical rows indexed by categorical-space feature index.
    ///
    /// # Panics
    ///
    /// Panics on any size or tree-range precondition violation, or if
    /// metadata has not been computed.
    pub fn calc_range<F, C>(
        &self,
        float_features: &[F],
        cat_features: &[C],
        tree_start: usize,
        tree_end: usize,
        results: &mut [LeafValue],
    ) where
        F: AsRef<[f32]>,
        C: AsRef<[CatHash]>,
    {
        self.validate_separated_rows(float_features, cat_features.len());
        for (idx, row) in cat_features.iter().enumerate() {
            assert!(
                row.as_ref().len() >= self.num_cat_features(),
                "categorical feature vector {} holds {} values, the model expects at least {}",
                idx,
                row.as_ref().len(),
                self.num_cat_features(),
            );
        }
        calc_generic(
            &self.oblivious_trees,
            self.ctr_provider.as_deref(),
            |f, doc| float_features[doc].as_ref()[f.feature_index],
            |c, doc| cat_features[doc].as_ref()[c.feature_index],
            float_features.len(),
            tree_start,
            tree_end,
            results,
        );
    }

    /// [`FullModel::calc_range`] over all model trees.
    pub fn calc<F, C>(&self, float_features: &[F], cat_features: &[C], results: &mut [LeafValue])
    where
        F: AsRef<[f32]>,
        C: AsRef<[CatHash]>,
    {
        self.calc_range(float_features, cat_features, 0, self.tree_count(), results);
    }

    /// Single-object [`FullModel::calc`]; `results` is indexed by output
    /// dimension.
    pub fn calc_single(
        &self,
        float_features: &[f32],
        cat_features: &[CatHash],
        results: &mut [LeafValue],
    ) {
        self.calc(
            std::slice::from_ref(&float_features),
            std::slice::from_ref(&cat_features),
            results,
        );
    }

    /// Evaluate trees `[tree_start, tree_end)` with string categorical
    /// values, hashed through [`hash_cat_feature`]. The hash is the same
    /// pure function applied when the model's one-hot values and CTR tables
    /// were captured at training time.
    ///
    /// # Panics
    ///
    /// Panics on any size or tree-range precondition violation, or if
    /// metadata has not been computed.
    pub fn calc_str_range<F, R, S>(
        &self,
        float_features: &[F],
        cat_features: &[R],
        tree_start: usize,
        tree_end: usize,
        results: &mut [LeafValue],
    ) where
        F: AsRef<[f32]>,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        self.validate_separated_rows(float_features, cat_features.len());
        for (idx, row) in cat_features.iter().enumerate() {
            assert!(
                row.as_ref().len() >= self.num_cat_features(),
                "categorical feature vector {} holds {} values, the model expects at least {}",
                idx,
                row.as_ref().len(),
                self.num_cat_features(),
            );
        }
        calc_generic(
            &self.oblivious_trees,
            self.ctr_provider.as_deref(),
            |f, doc| float_features[doc].as_ref()[f.feature_index],
            |c, doc| hash_cat_feature(cat_features[doc].as_ref()[c.feature_index].as_ref()),
            float_features.len(),
            tree_start,
            tree_end,
            results,
        );
    }

    /// [`FullModel::calc_str_range`] over all model trees.
    pub fn calc_str<F, R, S>(
        &self,
        float_features: &[F],
        cat_features: &[R],
        results: &mut [LeafValue],
    ) where
        F: AsRef<[f32]>,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        self.calc_str_range(float_features, cat_features, 0, self.tree_count(), results);
    }

    /// Staged evaluation on separated inputs: stage `i` of the returned
    /// vector holds the predictions of trees
    /// `[0, min((i + 1) * increment_step, tree_count))`, indexed
    /// `[object_index * approx_dimension + dimension]`. Used to inspect how
    /// predictions evolve as trees are added.
    ///
    /// # Panics
    ///
    /// Panics if `increment_step` is zero or on any input-size violation.
    pub fn calc_tree_intervals<F, C>(
        &self,
        float_features: &[F],
        cat_features: &[C],
        increment_step: usize,
    ) -> Vec<Vec<LeafValue>>
    where
        F: AsRef<[f32]>,
        C: AsRef<[CatHash]>,
    {
        self.validate_separated_rows(float_features, cat_features.len());
        for (idx, row) in cat_features.iter().enumerate() {
            assert!(
                row.as_ref().len() >= self.num_cat_features(),
                "categorical feature vector {} holds {} values, the model expects at least {}",
                idx,
                row.as_ref().len(),
                self.num_cat_features(),
            );
        }
        calc_tree_intervals_generic(
            &self.oblivious_trees,
            self.ctr_provider.as_deref(),
            |f, doc| float_features[doc].as_ref()[f.feature_index],
            |c, doc| cat_features[doc].as_ref()[c.feature_index],
            float_features.len(),
            increment_step,
        )
    }

    /// [`FullModel::calc_tree_intervals`] for flat feature vectors.
    pub fn calc_tree_intervals_flat<R: AsRef<[f32]>>(
        &self,
        features: &[R],
        increment_step: usize,
    ) -> Vec<Vec<LeafValue>> {
        self.validate_flat_rows(features);
        calc_tree_intervals_generic(
            &self.oblivious_trees,
            self.ctr_provider.as_deref(),
            |f, doc| features[doc].as_ref()[f.flat_feature_index],
            |c, doc| float_bits_to_cat_hash(features[doc].as_ref()[c.flat_feature_index]),
            features.len(),
            increment_step,
        )
    }

    /// Serialize the model into a length-prefixed binary container.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        io::write_model_stream(self, writer)
    }

    /// Deserialize a model from a length-prefixed binary container. The
    /// returned model has its trees metadata recomputed and is ready for
    /// evaluation; a CTR provider is never restored and must be re-attached
    /// by the caller.
    pub fn load<R: Read>(reader: &mut R) -> Result<FullModel> {
        io::read_model_stream(reader)
    }

    fn validate_flat_rows<R: AsRef<[f32]>>(&self, features: &[R]) {
        let expected = self.oblivious_trees.flat_feature_vector_expected_size();
        for (idx, row) in features.iter().enumerate() {
            assert!(
                row.as_ref().len() >= expected,
                "flat feature vector {} holds {} values, the model expects at least {}",
                idx,
                row.as_ref().len(),
                expected,
            );
        }
    }

    fn validate_separated_rows<F: AsRef<[f32]>>(&self, float_features: &[F], cat_row_count: usize) {
        assert_eq!(
            float_features.len(),
            cat_row_count,
            "float and categorical inputs must describe the same objects: {} vs {}",
            float_features.len(),
            cat_row_count,
        );
        let expected = self.num_float_features();
        for (idx, row) in float_features.iter().enumerate() {
            assert!(
                row.as_ref().len() >= expected,
                "float feature vector {} holds {} values, the model expects at least {}",
                idx,
                row.as_ref().len(),
                expected,
            );
        }
    }
}
