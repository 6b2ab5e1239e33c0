//! Core data types for the oblivtree evaluation engine.
//!
//! These aliases pin down the numeric widths used throughout the model data
//! layout and the evaluation loop, so that the intent of a value is visible
//! at the type level even where the representation is a plain integer.

/// Raw feature value type as supplied by callers.
pub type FeatureValue = f32;

/// Leaf output and accumulated prediction type.
pub type LeafValue = f64;

/// Hashed categorical feature value.
///
/// Categorical values enter evaluation either pre-hashed as `CatHash`, or as
/// strings that are hashed with [`crate::features::hash_cat_feature`], or
/// bit-packed into `f32` cells of a flat feature vector.
pub type CatHash = i32;

/// CTR statistic value returned by a CTR provider.
pub type CtrValue = f32;

/// Index of a feature within its own kind (float-space or categorical-space).
pub type FeatureIndex = usize;

/// Index into the deduplicated binary feature list of a model.
pub type BinFeatureIndex = u32;

/// Index of a tree within the ensemble.
pub type TreeIndex = usize;
