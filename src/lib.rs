//! # oblivtree
//!
//! In-memory representation and fast evaluation engine for ensembles of
//! oblivious (symmetric) decision trees.
//!
//! An oblivious tree applies the same binary condition to every node of a
//! depth level, so selecting a leaf for an object is a direct bit-index
//! operation: one comparison per level, one bit per outcome. This crate
//! stores an ensemble in a compact flattened layout, derives a packed
//! binary-feature index that makes those comparisons single-byte tests, and
//! evaluates batches of objects in cache-friendly blocks.
//!
//! ## Quick Start
//!
//! ```rust
//! use oblivtree::{FloatFeature, FullModel};
//!
//! // One float feature with border 0.5, one depth-1 tree.
//! let mut model = FullModel::default();
//! model.oblivious_trees.float_features.push(FloatFeature {
//!     feature_index: 0,
//!     flat_feature_index: 0,
//!     borders: vec![0.5],
//!     ..FloatFeature::default()
//! });
//! model.oblivious_trees.add_bin_tree(&[0]);
//! model.oblivious_trees.leaf_values.push(vec![0.0, 1.0]);
//! model.update_dynamic_data();
//!
//! let mut predictions = vec![0.0; 2];
//! model.calc_flat(&[vec![0.7f32], vec![0.3]], &mut predictions);
//! assert_eq!(predictions, vec![1.0, 0.0]);
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: fundamental types, constants and error handling
//! - [`features`]: feature and binary split descriptors
//! - [`ctr`]: CTR definitions and the external provider contract
//! - [`tree`]: the oblivious trees container and its derived metadata
//! - [`io`]: model persistence in a length-prefixed binary container
//! - [`FullModel`]: the public evaluation API
//!
//! ## Concurrency
//!
//! Evaluation is read-only and lock-free; derived metadata is only written
//! during explicit [`FullModel::update_dynamic_data`] /
//! [`ObliviousTrees::update_metadata`] calls. Callers enforce
//! single-writer/multiple-reader discipline and may evaluate disjoint object
//! ranges from any number of threads, or use
//! [`FullModel::calc_flat_parallel`] to let rayon do the splitting.

#![warn(missing_docs)]
#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

// Core infrastructure module
pub mod core;

// Feature and split descriptors
pub mod features;

// CTR definitions and provider contract
pub mod ctr;

// Oblivious trees container
pub mod tree;

// Model persistence
pub mod io;

// Full model container and evaluation API
pub mod model;

// Evaluation engine internals
mod prediction;

// Re-export core functionality for convenience
pub use crate::core::{
    constants::*,
    error::{OblivTreeError, Result},
    types::*,
};

// Re-export the data model
pub use crate::ctr::{CtrProvider, CtrType, FeatureCombination, ModelCtr, ModelCtrBase};
pub use crate::features::{
    cat_hash_to_float_bits, float_bits_to_cat_hash, hash_cat_feature, CatFeature, CtrFeature,
    CtrSplit, FloatFeature, FloatSplit, ModelSplit, OneHotFeature, OneHotSplit, SplitType,
};
pub use crate::tree::{ObliviousTrees, RepackedBin, TreesMetadata};

// Re-export the model API
pub use crate::io::{
    deserialize_model, model_info_to_json, output_model, read_model, serialize_model,
};
pub use crate::model::FullModel;
