//! Feature descriptors for oblivious tree models.
//!
//! A model references four kinds of feature sources: float features with
//! threshold borders, categorical features (descriptive only), one-hot
//! conditions over hashed categorical values, and CTR features whose values
//! come from an external [`crate::ctr::CtrProvider`]. Descriptors are
//! immutable value records; mutating a model's feature lists requires a
//! [`crate::FullModel::update_dynamic_data`] call before the next read of
//! derived metadata.

mod hash;
mod split;

pub use hash::{cat_hash_to_float_bits, float_bits_to_cat_hash, hash_cat_feature};
pub use split::{CtrSplit, FloatSplit, ModelSplit, OneHotSplit, SplitType};

use serde::{Deserialize, Serialize};

use crate::core::types::{CatHash, FeatureIndex};
use crate::ctr::ModelCtr;

/// Float feature with ascending borders; each border is one binary
/// condition of the form `value > border`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FloatFeature {
    /// Whether NaN values were seen for this feature at training time
    #[serde(default)]
    pub has_nans: bool,
    /// Index within float-feature space
    pub feature_index: FeatureIndex,
    /// Index within the mixed flat feature vector
    pub flat_feature_index: FeatureIndex,
    /// Ascending split thresholds
    #[serde(default)]
    pub borders: Vec<f32>,
    /// Optional human-readable name
    #[serde(default)]
    pub feature_id: String,
}

/// Categorical feature descriptor. Purely descriptive: it ties a
/// categorical-space index to a flat-vector position and feeds one-hot and
/// CTR feature resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatFeature {
    /// Index within categorical-feature space
    pub feature_index: FeatureIndex,
    /// Index within the mixed flat feature vector
    pub flat_feature_index: FeatureIndex,
    /// Optional human-readable name
    #[serde(default)]
    pub feature_id: String,
}

/// One-hot encoded categorical feature; each listed hashed value is one
/// binary condition of the form `hashed input == value`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OneHotFeature {
    /// Categorical-space index of the source feature
    pub cat_feature_index: FeatureIndex,
    /// Hashed values captured at training time
    #[serde(default)]
    pub values: Vec<CatHash>,
}

/// CTR feature: a CTR definition plus ascending borders; each border is one
/// binary condition of the form `ctr value > border`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CtrFeature {
    /// CTR definition whose value is thresholded
    pub ctr: ModelCtr,
    /// Ascending split thresholds
    #[serde(default)]
    pub borders: Vec<f32>,
}
