//! Common test utilities for oblivtree integration tests.

use oblivtree::*;
use rand::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Initialize env_logger once for test output.
#[allow(dead_code)]
pub fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// CTR provider backed by a fixed lookup table, keyed by the CTR base and
/// the categorical values of its projection.
#[derive(Debug, Default)]
pub struct TableCtrProvider {
    values: HashMap<(ModelCtrBase, Vec<CatHash>), f32>,
    default_value: f32,
    supported: Vec<ModelCtrBase>,
    setup_calls: AtomicUsize,
}

impl TableCtrProvider {
    #[allow(dead_code)]
    pub fn new(default_value: f32) -> Self {
        TableCtrProvider {
            default_value,
            ..TableCtrProvider::default()
        }
    }

    /// Register a base as supported without adding values.
    #[allow(dead_code)]
    pub fn support(&mut self, base: ModelCtrBase) {
        if !self.supported.contains(&base) {
            self.supported.push(base);
        }
    }

    /// Store the statistic returned for `base` over `projection_values`.
    #[allow(dead_code)]
    pub fn insert(&mut self, base: ModelCtrBase, projection_values: Vec<CatHash>, value: f32) {
        self.support(base.clone());
        self.values.insert((base, projection_values), value);
    }

    /// Number of `setup_bin_feature_indexes` calls seen so far.
    #[allow(dead_code)]
    pub fn setup_calls(&self) -> usize {
        self.setup_calls.load(Ordering::SeqCst)
    }
}

impl CtrProvider for TableCtrProvider {
    fn has_needed_ctrs(&self, used_ctrs: &[ModelCtr]) -> bool {
        used_ctrs
            .iter()
            .all(|ctr| self.supported.contains(&ctr.base))
    }

    fn setup_bin_feature_indexes(
        &self,
        _float_features: &[FloatFeature],
        _one_hot_features: &[OneHotFeature],
        _cat_features: &[CatFeature],
    ) {
        self.setup_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn calc_ctr(&self, ctr: &ModelCtr, hashed_cat_values: &[CatHash]) -> CtrValue {
        let projection_values: Vec<CatHash> = ctr
            .base
            .projection
            .cat_feature_indexes
            .iter()
            .map(|&idx| hashed_cat_values[idx])
            .collect();
        self.values
            .get(&(ctr.base.clone(), projection_values))
            .copied()
            .unwrap_or(self.default_value)
    }
}

/// The reference scenario: one float feature with border 0.5 and two
/// depth-1 trees with leaf values [0, 1] and [0, 2].
#[allow(dead_code)]
pub fn two_tree_float_model() -> FullModel {
    let mut model = FullModel::default();
    model.oblivious_trees.float_features.push(FloatFeature {
        feature_index: 0,
        flat_feature_index: 0,
        borders: vec![0.5],
        ..FloatFeature::default()
    });
    model.oblivious_trees.add_bin_tree(&[0]);
    model.oblivious_trees.leaf_values.push(vec![0.0, 1.0]);
    model.oblivious_trees.add_bin_tree(&[0]);
    model.oblivious_trees.leaf_values.push(vec![0.0, 2.0]);
    model.update_dynamic_data();
    model
}

/// Model mixing float and one-hot conditions, with the categorical feature
/// sitting between the two float features in the flat layout.
///
/// Binary features: 0..2 are the borders of float 0, 2 is the border of
/// float 1, 3..5 are the one-hot values ("red", "blue").
#[allow(dead_code)]
pub fn mixed_model() -> FullModel {
    let mut model = FullModel::default();
    let trees = &mut model.oblivious_trees;
    trees.float_features.push(FloatFeature {
        feature_index: 0,
        flat_feature_index: 0,
        borders: vec![0.5, 1.5],
        feature_id: "age".to_string(),
        ..FloatFeature::default()
    });
    trees.float_features.push(FloatFeature {
        feature_index: 1,
        flat_feature_index: 2,
        borders: vec![0.0],
        feature_id: "delta".to_string(),
        ..FloatFeature::default()
    });
    trees.cat_features.push(CatFeature {
        feature_index: 0,
        flat_feature_index: 1,
        feature_id: "color".to_string(),
    });
    trees.one_hot_features.push(OneHotFeature {
        cat_feature_index: 0,
        values: vec![hash_cat_feature("red"), hash_cat_feature("blue")],
    });
    trees.add_bin_tree(&[0, 3]);
    trees.leaf_values.push(vec![1.0, 2.0, 3.0, 4.0]);
    trees.add_bin_tree(&[2]);
    trees.leaf_values.push(vec![10.0, 20.0]);
    trees.add_bin_tree(&[4, 1]);
    trees.leaf_values.push(vec![100.0, 200.0, 300.0, 400.0]);
    model.update_dynamic_data();
    model
}

/// Model with a single CTR condition over one categorical feature, plus the
/// table provider that backs it: "hot" maps to 0.9, "cold" to 0.1, anything
/// else to 0.0, thresholded at 0.5 into leaves [0, 5].
#[allow(dead_code)]
pub fn ctr_model() -> (FullModel, Arc<TableCtrProvider>) {
    let base = ModelCtrBase {
        projection: FeatureCombination {
            cat_feature_indexes: vec![0],
        },
        ctr_type: CtrType::Borders,
    };
    let ctr = ModelCtr {
        base: base.clone(),
        ..ModelCtr::default()
    };

    let mut provider = TableCtrProvider::new(0.0);
    provider.insert(base.clone(), vec![hash_cat_feature("hot")], 0.9);
    provider.insert(base, vec![hash_cat_feature("cold")], 0.1);
    let provider = Arc::new(provider);

    let mut model = FullModel::default();
    let trees = &mut model.oblivious_trees;
    trees.cat_features.push(CatFeature {
        feature_index: 0,
        flat_feature_index: 0,
        feature_id: "weather".to_string(),
    });
    trees.ctr_features.push(CtrFeature {
        ctr,
        borders: vec![0.5],
    });
    trees.add_bin_tree(&[0]);
    trees.leaf_values.push(vec![0.0, 5.0]);
    model.ctr_provider = Some(provider.clone());
    model.update_dynamic_data();
    (model, provider)
}

/// Two-dimensional model: one float feature with border 0.5 and two depth-1
/// trees whose leaves carry two output dimensions each.
#[allow(dead_code)]
pub fn multiclass_model() -> FullModel {
    let mut model = FullModel::default();
    let trees = &mut model.oblivious_trees;
    trees.approx_dimension = 2;
    trees.float_features.push(FloatFeature {
        feature_index: 0,
        flat_feature_index: 0,
        borders: vec![0.5],
        ..FloatFeature::default()
    });
    trees.add_bin_tree(&[0]);
    trees.leaf_values.push(vec![1.0, 2.0, 3.0, 4.0]);
    trees.add_bin_tree(&[0]);
    trees.leaf_values.push(vec![0.5, 0.25, 0.125, 0.0625]);
    model.update_dynamic_data();
    model
}

/// Randomized float-only model for structural and equivalence tests.
#[allow(dead_code)]
pub fn random_float_model(seed: u64, num_trees: usize) -> FullModel {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut model = FullModel::default();
    let trees = &mut model.oblivious_trees;

    let mut bin_feature_count = 0;
    for feature_index in 0..3 {
        let mut borders: Vec<f32> = (0..rng.gen_range(1..=4))
            .map(|_| rng.gen_range(-2.0..2.0))
            .collect();
        borders.sort_by(|a, b| a.partial_cmp(b).unwrap());
        bin_feature_count += borders.len();
        trees.float_features.push(FloatFeature {
            feature_index,
            flat_feature_index: feature_index,
            borders,
            ..FloatFeature::default()
        });
    }

    for _ in 0..num_trees {
        let depth = rng.gen_range(1..=4);
        let splits: Vec<BinFeatureIndex> = (0..depth)
            .map(|_| rng.gen_range(0..bin_feature_count as BinFeatureIndex))
            .collect();
        trees.add_bin_tree(&splits);
        let leaves = (0..(1usize << depth))
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect();
        trees.leaf_values.push(leaves);
    }
    model.update_dynamic_data();
    model
}

/// Random feature rows for [`random_float_model`].
#[allow(dead_code)]
pub fn random_float_rows(seed: u64, num_objects: usize) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_objects)
        .map(|_| (0..3).map(|_| rng.gen_range(-3.0..3.0)).collect())
        .collect()
}

/// Interleave separated float and categorical values into a flat row using
/// the model's flat feature indexes.
#[allow(dead_code)]
pub fn flat_row(model: &FullModel, floats: &[f32], cats: &[CatHash]) -> Vec<f32> {
    let mut row = vec![0.0; model.oblivious_trees.flat_feature_vector_expected_size()];
    for feature in &model.oblivious_trees.float_features {
        row[feature.flat_feature_index] = floats[feature.feature_index];
    }
    for feature in &model.oblivious_trees.cat_features {
        row[feature.flat_feature_index] = cat_hash_to_float_bits(cats[feature.feature_index]);
    }
    row
}
