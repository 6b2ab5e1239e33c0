//! Binary split descriptors.
//!
//! A split is one yes/no condition used as a level of an oblivious tree.
//! The variant order of [`SplitType`] and [`ModelSplit`] fixes the bucket
//! layout of the whole model: in the derived binary-feature list every float
//! split precedes every one-hot split, which precedes every CTR split.

use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

use crate::core::types::{CatHash, FeatureIndex};
use crate::ctr::ModelCtr;

/// Kind of a binary split, in bucket-layout order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SplitType {
    /// Float threshold condition
    FloatFeature = 0,
    /// One-hot equality condition
    OneHotFeature = 1,
    /// CTR threshold condition
    OnlineCtr = 2,
}

// SplitType must represent the bin feature order in the model.
const_assert!((SplitType::FloatFeature as u8) < (SplitType::OneHotFeature as u8));
const_assert!((SplitType::OneHotFeature as u8) < (SplitType::OnlineCtr as u8));

/// Float threshold split: `value > border`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatSplit {
    /// Float-space index of the source feature
    pub float_feature_index: FeatureIndex,
    /// Threshold
    pub border: f32,
}

/// One-hot equality split: `hashed value == value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotSplit {
    /// Categorical-space index of the source feature
    pub cat_feature_index: FeatureIndex,
    /// Hashed value to compare against
    pub value: CatHash,
}

/// CTR threshold split: `ctr value > border`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtrSplit {
    /// CTR whose computed value is thresholded
    pub ctr: ModelCtr,
    /// Threshold
    pub border: f32,
}

/// One evaluable binary condition. Variant order matches [`SplitType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelSplit {
    /// Float threshold condition
    Float(FloatSplit),
    /// One-hot equality condition
    OneHot(OneHotSplit),
    /// CTR threshold condition
    OnlineCtr(CtrSplit),
}

impl ModelSplit {
    /// Kind of this split.
    pub fn split_type(&self) -> SplitType {
        match self {
            ModelSplit::Float(_) => SplitType::FloatFeature,
            ModelSplit::OneHot(_) => SplitType::OneHotFeature,
            ModelSplit::OnlineCtr(_) => SplitType::OnlineCtr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_type_order() {
        assert!(SplitType::FloatFeature < SplitType::OneHotFeature);
        assert!(SplitType::OneHotFeature < SplitType::OnlineCtr);
    }

    #[test]
    fn test_split_type_of_variants() {
        let float = ModelSplit::Float(FloatSplit {
            float_feature_index: 0,
            border: 0.5,
        });
        let one_hot = ModelSplit::OneHot(OneHotSplit {
            cat_feature_index: 1,
            value: 42,
        });
        assert_eq!(float.split_type(), SplitType::FloatFeature);
        assert_eq!(one_hot.split_type(), SplitType::OneHotFeature);
    }
}
