//! High-level model wrapper.
//!
//! Combines training, prediction, and persistence into one interface.
//!
//! # Example
//!
//! ```ignore
//! use copse::model::RandomForestModel;
//! use copse::training::{RandomForestParams, SplitCriterion};
//!
//! let params = RandomForestParams { n_trees: 200, ..Default::default() };
//! let model = RandomForestModel::train(&dataset, SplitCriterion::Gini, params)?;
//!
//! let (label, prob) = model.predict_label(&sample, &mut rng);
//!
//! model.save("model.cpse")?;
//! let loaded = RandomForestModel::load("model.cpse")?;
//! ```

use std::fs;
use std::path::Path;

use rand::Rng;

use crate::data::{Dataset, LabelIndex, Sample};
use crate::error::Error;
use crate::io::native::{DeserializeError, NativeCodec, SerializeError};
use crate::predict::MarginScope;
use crate::repr::Forest;
use crate::training::{RandomForestParams, RandomForestTrainer, SplitCriterion};

// ============================================================================
// ModelMeta
// ============================================================================

/// Model metadata carried alongside the forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelMeta {
    /// Number of distinct classes in the training set.
    pub n_classes: u32,
    /// Number of trees.
    pub n_trees: u32,
}

// ============================================================================
// RandomForestModel
// ============================================================================

/// A trained random forest classifier.
pub struct RandomForestModel {
    forest: Forest,
    meta: ModelMeta,
}

impl RandomForestModel {
    /// Train a new model.
    pub fn train(
        dataset: &Dataset,
        criterion: SplitCriterion,
        params: RandomForestParams,
    ) -> Result<Self, Error> {
        let trainer = RandomForestTrainer::new(criterion, params);
        let forest = trainer.fit(dataset)?;

        let meta = ModelMeta {
            n_classes: LabelIndex::from_dataset(dataset).n_classes() as u32,
            n_trees: forest.n_trees() as u32,
        };

        Ok(Self { forest, meta })
    }

    /// Wrap an existing forest.
    pub fn from_forest(forest: Forest, meta: ModelMeta) -> Self {
        Self { forest, meta }
    }

    /// Get reference to the underlying forest.
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Get the model metadata.
    pub fn meta(&self) -> ModelMeta {
        self.meta
    }

    /// Discard OOB arrays once evaluation is done.
    pub fn drop_oob(&mut self) {
        self.forest.drop_oob();
    }

    // ------------------------------------------------------------------
    // Prediction passthroughs
    // ------------------------------------------------------------------

    /// Probability distribution over labels for one sample.
    pub fn predict_proba(&self, sample: &Sample) -> Vec<(u32, f64)> {
        self.forest.predict_proba(sample)
    }

    /// Hard label for one sample.
    pub fn predict_label<R: Rng>(&self, sample: &Sample, rng: &mut R) -> (u32, f64) {
        self.forest.predict_label(sample, rng)
    }

    /// Hard label with margin for one sample.
    pub fn predict_label_margin<R: Rng>(
        &self,
        sample: &Sample,
        rng: &mut R,
        scope: MarginScope,
    ) -> (u32, f64, f64) {
        self.forest.predict_label_margin(sample, rng, scope)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Serialize the model to bytes in the native format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializeError> {
        NativeCodec::new().serialize_forest(&self.forest, self.meta.n_classes)
    }

    /// Deserialize a model from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeserializeError> {
        let (header, forest) = NativeCodec::new().deserialize_forest(bytes)?;
        let meta = ModelMeta {
            n_classes: header.n_classes,
            n_trees: header.n_trees,
        };
        Ok(Self { forest, meta })
    }

    /// Save the model to a file.
    ///
    /// OOB arrays are never written; the file round-trips to the in-memory
    /// forest with OOB dropped.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SerializeError> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Load a model from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DeserializeError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::and_dataset;
    use crate::training::SubsetSize;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn and_params() -> RandomForestParams {
        RandomForestParams {
            n_trees: 101,
            max_features: SubsetSize::Count(2),
            max_samples: SubsetSize::Count(4),
            min_node_size: 1,
            seed: 12345,
            n_threads: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_separable_training_set_memorized() {
        let dataset = and_dataset();
        let model =
            RandomForestModel::train(&dataset, SplitCriterion::Gini, and_params()).unwrap();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let mut correct = 0;
        for row in 0..dataset.n_rows() as u32 {
            let (label, _) = model.predict_label(dataset.sample(row), &mut rng);
            if label == dataset.label(row) {
                correct += 1;
            }
        }
        assert_eq!(correct, dataset.n_rows());
    }

    #[test]
    fn test_proba_sums_to_one_on_trained_model() {
        let dataset = and_dataset();
        let model =
            RandomForestModel::train(&dataset, SplitCriterion::Gini, and_params()).unwrap();

        for row in 0..dataset.n_rows() as u32 {
            let proba = model.predict_proba(dataset.sample(row));
            let sum: f64 = proba.iter().map(|&(_, p)| p).sum();
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_meta_reflects_training() {
        let dataset = and_dataset();
        let model =
            RandomForestModel::train(&dataset, SplitCriterion::Gini, and_params()).unwrap();

        assert_eq!(model.meta().n_trees, 101);
        assert_eq!(model.meta().n_classes, 2);
    }

    #[test]
    fn test_persistence_roundtrip_equals_drop_oob() {
        let dataset = and_dataset();
        let model =
            RandomForestModel::train(&dataset, SplitCriterion::Gini, and_params()).unwrap();

        let bytes = model.to_bytes().unwrap();
        let loaded = RandomForestModel::from_bytes(&bytes).unwrap();

        let mut stripped = model.forest().clone();
        stripped.drop_oob();
        assert_eq!(loaded.forest(), &stripped);
        assert_eq!(loaded.meta(), model.meta());
    }

    #[test]
    fn test_loaded_model_predicts_identically() {
        let dataset = and_dataset();
        let model =
            RandomForestModel::train(&dataset, SplitCriterion::Gini, and_params()).unwrap();

        let bytes = model.to_bytes().unwrap();
        let loaded = RandomForestModel::from_bytes(&bytes).unwrap();

        for row in 0..dataset.n_rows() as u32 {
            assert_eq!(
                model.predict_proba(dataset.sample(row)),
                loaded.predict_proba(dataset.sample(row))
            );
        }
    }
}
