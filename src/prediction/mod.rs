//! Evaluation engine for oblivious tree ensembles.
//!
//! Evaluation runs in blocks of [`crate::core::constants::EVALUATION_BLOCK_SIZE`]
//! objects. Per block, every effective feature bucket of the model is
//! binarized exactly once into a bucket-major byte matrix — float features by
//! threshold search, one-hot features by equality lookup, CTR features
//! through the attached provider — and every tree in the requested range then
//! selects its leaf with one byte comparison per level against the packed
//! [`crate::RepackedBin`] descriptors.
//!
//! The whole path is read-only over the model: no locking, no I/O, no
//! mutation of cached state. Callers parallelize across object ranges.

mod binarize;
mod evaluate;

pub(crate) use binarize::binarize_features;
pub(crate) use evaluate::{calc_generic, calc_tree_intervals_generic};
