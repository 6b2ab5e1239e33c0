//! CTR (categorical target statistic) definitions and the provider contract.
//!
//! A CTR is a float statistic derived from one or more categorical feature
//! values at evaluation time. Computing the statistic is the job of an
//! external [`CtrProvider`]; this module only defines what a CTR *is* — the
//! feature combination and statistic type identifying it — and the small
//! capability set the evaluation engine needs from a provider.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::types::{CatHash, CtrValue};
use crate::features::{CatFeature, FloatFeature, OneHotFeature};

/// Statistic kind computed over a feature combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CtrType {
    /// Per-border target share statistic
    Borders,
    /// Per-bucket target statistic
    Buckets,
    /// Mean of the binarized target
    BinarizedTargetMeanValue,
    /// Appearance counter
    Counter,
}

impl Default for CtrType {
    fn default() -> Self {
        CtrType::Borders
    }
}

impl fmt::Display for CtrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CtrType::Borders => write!(f, "borders"),
            CtrType::Buckets => write!(f, "buckets"),
            CtrType::BinarizedTargetMeanValue => write!(f, "binarized_target_mean_value"),
            CtrType::Counter => write!(f, "counter"),
        }
    }
}

/// Combination of categorical features a CTR is computed over.
///
/// Indexes refer to categorical-space feature indexes, i.e. the
/// `feature_index` of [`CatFeature`] entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureCombination {
    /// Categorical feature indexes participating in the combination
    pub cat_feature_indexes: Vec<usize>,
}

/// Identity of a CTR table: the feature combination plus the statistic type.
///
/// Bases carry no float fields, so they are `Eq + Ord + Hash` and can be
/// deduplicated and sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelCtrBase {
    /// Feature combination the statistic is computed over
    pub projection: FeatureCombination,
    /// Statistic kind
    pub ctr_type: CtrType,
}

/// Full CTR definition used by a model: a base plus the target border and
/// prior/scaling parameters fixed at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCtr {
    /// CTR table identity
    pub base: ModelCtrBase,
    /// Index of the target border this CTR was computed against
    pub target_border_idx: usize,
    /// Prior numerator
    pub prior_num: f32,
    /// Prior denominator
    pub prior_denom: f32,
    /// Additive shift applied to the raw statistic
    pub shift: f32,
    /// Multiplicative scale applied to the raw statistic
    pub scale: f32,
}

impl Default for ModelCtr {
    fn default() -> Self {
        ModelCtr {
            base: ModelCtrBase::default(),
            target_border_idx: 0,
            prior_num: 0.0,
            prior_denom: 1.0,
            shift: 0.0,
            scale: 1.0,
        }
    }
}

impl ModelCtr {
    /// Turn raw counter values into the final statistic, applying the prior
    /// and the shift/scale normalization.
    pub fn calc(&self, count_in_class: f32, total_count: f32) -> CtrValue {
        ((count_in_class + self.prior_num) / (total_count + self.prior_denom) + self.shift)
            * self.scale
    }
}

/// External collaborator that supplies CTR values during evaluation.
///
/// Implementations own whatever lookup tables the statistics come from.
/// [`setup_bin_feature_indexes`](CtrProvider::setup_bin_feature_indexes) is
/// invoked through [`crate::FullModel::update_dynamic_data`] after any change
/// to the model's feature lists, before the next CTR-dependent evaluation;
/// implementations that maintain an internal bin-feature index use interior
/// mutability, since providers are shared between model copies.
pub trait CtrProvider: Send + Sync + fmt::Debug {
    /// Whether this provider can supply a value for every CTR in `used_ctrs`.
    fn has_needed_ctrs(&self, used_ctrs: &[ModelCtr]) -> bool;

    /// Re-align the provider's internal bin-feature index with the model's
    /// current feature lists.
    fn setup_bin_feature_indexes(
        &self,
        float_features: &[FloatFeature],
        one_hot_features: &[OneHotFeature],
        cat_features: &[CatFeature],
    );

    /// Compute the CTR statistic for one object.
    ///
    /// `hashed_cat_values` is indexed by categorical-space feature index and
    /// covers every categorical feature of the model.
    fn calc_ctr(&self, ctr: &ModelCtr, hashed_cat_values: &[CatHash]) -> CtrValue;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_ctr_calc_applies_prior_and_scale() {
        let ctr = ModelCtr {
            prior_num: 1.0,
            prior_denom: 2.0,
            shift: -0.5,
            scale: 2.0,
            ..ModelCtr::default()
        };
        // ((3 + 1) / (6 + 2) - 0.5) * 2 = 0.0
        assert_abs_diff_eq!(ctr.calc(3.0, 6.0), 0.0);
        // ((7 + 1) / (6 + 2) - 0.5) * 2 = 1.0
        assert_abs_diff_eq!(ctr.calc(7.0, 6.0), 1.0);
    }

    #[test]
    fn test_ctr_base_ordering_is_stable() {
        let a = ModelCtrBase {
            projection: FeatureCombination {
                cat_feature_indexes: vec![0],
            },
            ctr_type: CtrType::Borders,
        };
        let b = ModelCtrBase {
            projection: FeatureCombination {
                cat_feature_indexes: vec![0, 1],
            },
            ctr_type: CtrType::Borders,
        };
        assert!(a < b);
        assert_eq!(a, a.clone());
    }
}
