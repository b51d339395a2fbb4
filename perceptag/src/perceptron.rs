use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::tagset::Tagset;
use crate::weights::{AverageTable, FeatureVector, WeightTable};

/// A training example: the features of one token and its gold tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub vector: FeatureVector,
    pub gold: String,
}

impl Example {
    pub fn new(vector: FeatureVector, gold: impl Into<String>) -> Self {
        Example {
            vector,
            gold: gold.into(),
        }
    }
}

/// How the average table is accumulated during training.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Averaging {
    /// Add the whole weight table into the average after every example.
    #[default]
    Eager,
    /// Credit each weight entry with its value times the number of steps it was
    /// held, only when it changes and at the end of each epoch.
    ///
    /// Exact only while every weight is an integer, which holds for the binary
    /// vectors built by the extractor. With fractional activations `w * steps`
    /// rounds differently from repeated additions.
    Lazy,
}

/// Averaged perceptron training parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptronParams {
    /// Number of passes over the examples.
    pub max_epochs: usize,
    /// Seed for the shuffling generator. `None` seeds from the operating system.
    pub seed: Option<u64>,
    pub averaging: Averaging,
}

impl Default for PerceptronParams {
    fn default() -> Self {
        PerceptronParams {
            max_epochs: 1,
            seed: None,
            averaging: Averaging::default(),
        }
    }
}

/// Per-epoch training statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub examples: usize,
    pub mistakes: usize,
}

/// Summary of a training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingSummary {
    pub epochs: Vec<EpochStats>,
    /// Total number of per-example steps, i.e. how many weight snapshots the
    /// average table sums.
    pub steps: u64,
    pub num_features: usize,
    pub num_entries: usize,
    pub interrupted: bool,
    pub elapsed_secs: f64,
}

/// The result of training: the accumulated table and how it was obtained.
#[derive(Debug, Clone)]
pub struct TrainOutput {
    pub average: AverageTable,
    pub summary: TrainingSummary,
}

/// Computes the score of `tag` for `vector`: the sum over the features of
/// `vector` of their weight for `tag` times their activation.
pub fn score(vector: &FeatureVector, weights: &WeightTable, tag: &str) -> f64 {
    vector
        .iter()
        .map(|(feature, value)| weights.weight(feature, tag) * value)
        .sum()
}

/// Predicts the tag maximizing `(score, tag)`: the highest score wins, and a tie
/// goes to the lexicographically greatest tag.
///
/// # Errors
/// Returns [`Error::EmptyTagset`] if there is no candidate tag.
///
/// # Example
/// ```
/// use perceptag::perceptron::predict;
/// use perceptag::tagset::Tagset;
/// use perceptag::weights::{FeatureVector, WeightTable};
///
/// let tagset = Tagset::new(["DET", "NOUN", "VERB"]).unwrap();
/// let vector: FeatureVector = ["word=chat"].into_iter().collect();
/// let mut weights = WeightTable::new();
///
/// // All scores are 0: the greatest tag wins the tie.
/// assert_eq!(predict(&vector, &weights, &tagset).unwrap(), "VERB");
///
/// weights.add("word=chat", "NOUN", 1.0);
/// assert_eq!(predict(&vector, &weights, &tagset).unwrap(), "NOUN");
/// ```
pub fn predict<'a>(
    vector: &FeatureVector,
    weights: &WeightTable,
    tagset: &'a Tagset,
) -> Result<&'a str> {
    tagset
        .iter()
        .map(|tag| (score(vector, weights, tag), tag))
        .max_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(CmpOrdering::Equal)
                .then_with(|| a.1.cmp(b.1))
        })
        .map(|(_, tag)| tag)
        .ok_or(Error::EmptyTagset)
}

/// Averaged perceptron learner for multiclass tagging.
///
/// Each epoch starts from an empty weight table, visits the examples in a
/// freshly shuffled order, updates the weights on every misprediction and adds
/// the current weights into a running sum after every example. That sum,
/// carried across epochs, is the trained model.
#[derive(Debug, Clone, Default)]
pub struct AveragedPerceptron {
    pub params: PerceptronParams,
}

impl AveragedPerceptron {
    /// Creates a new instance of [`AveragedPerceptron`].
    ///
    /// # Arguments
    /// * `params` - Epoch count, shuffle seed and averaging strategy.
    pub fn new(params: PerceptronParams) -> Self {
        AveragedPerceptron { params }
    }

    /// Trains on `examples` and returns the undivided sum of all weight snapshots.
    ///
    /// # Arguments
    /// * `examples` - The training examples. They are not reordered; shuffling
    ///   happens on an index permutation.
    /// * `tagset` - The tags that can be predicted.
    /// * `running` - Checked before each epoch. Once false, training stops and
    ///   the sum accumulated so far is returned.
    ///
    /// # Errors
    /// Returns [`Error::EmptyTagset`] if the scorer has no candidate tag.
    ///
    /// # Example
    /// ```
    /// use std::sync::atomic::AtomicBool;
    /// use std::sync::Arc;
    ///
    /// use perceptag::perceptron::{AveragedPerceptron, Example, PerceptronParams};
    /// use perceptag::tagset::Tagset;
    ///
    /// let examples = vec![
    ///     Example::new(["word=Le"].into_iter().collect(), "DET"),
    ///     Example::new(["word=chat"].into_iter().collect(), "NOUN"),
    /// ];
    /// let tagset = Tagset::new(["DET", "NOUN"]).unwrap();
    /// let params = PerceptronParams { seed: Some(42), ..Default::default() };
    ///
    /// let learner = AveragedPerceptron::new(params);
    /// let output = learner.train(&examples, &tagset, Arc::new(AtomicBool::new(true))).unwrap();
    /// assert!(output.average.weight("word=Le", "DET") > 0.0);
    /// assert_eq!(output.summary.steps, 2);
    /// ```
    pub fn train(
        &self,
        examples: &[Example],
        tagset: &Tagset,
        running: Arc<AtomicBool>,
    ) -> Result<TrainOutput> {
        let start = Instant::now();
        let mut average = AverageTable::new();
        let mut summary = TrainingSummary::default();

        warn_unknown_tags(examples, tagset);

        let mut order: Vec<usize> = (0..examples.len()).collect();
        let mut rng = match self.params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        for epoch in 0..self.params.max_epochs {
            if !running.load(Ordering::SeqCst) {
                info!("training interrupted before epoch {}", epoch + 1);
                summary.interrupted = true;
                break;
            }

            info!("epoch: {}/{}", epoch + 1, self.params.max_epochs);
            order.shuffle(&mut rng);

            let mistakes = match self.params.averaging {
                Averaging::Eager => eager_epoch(examples, &order, tagset, &mut average)?,
                Averaging::Lazy => lazy_epoch(examples, &order, tagset, &mut average)?,
            };
            debug!(
                "epoch {} - mistakes: {}/{}",
                epoch + 1,
                mistakes,
                examples.len()
            );

            summary.steps += examples.len() as u64;
            summary.epochs.push(EpochStats {
                epoch: epoch + 1,
                examples: examples.len(),
                mistakes,
            });
        }

        summary.num_features = average.num_features();
        summary.num_entries = average.num_entries();
        summary.elapsed_secs = start.elapsed().as_secs_f64();

        Ok(TrainOutput { average, summary })
    }
}

/// One epoch where the average receives the full weight table after every example.
fn eager_epoch(
    examples: &[Example],
    order: &[usize],
    tagset: &Tagset,
    average: &mut AverageTable,
) -> Result<usize> {
    let mut weights = WeightTable::new();
    let mut mistakes = 0;

    for &i in order {
        let example = &examples[i];
        let predicted = predict(&example.vector, &weights, tagset)?;
        if predicted != example.gold {
            weights.add_vector(&example.vector, predicted, -1.0);
            weights.add_vector(&example.vector, &example.gold, 1.0);
            mistakes += 1;
        }
        average.accumulate(&weights);
    }

    Ok(mistakes)
}

/// One epoch producing the same average as [`eager_epoch`] without walking the
/// whole weight table at every step.
fn lazy_epoch(
    examples: &[Example],
    order: &[usize],
    tagset: &Tagset,
    average: &mut AverageTable,
) -> Result<usize> {
    let mut weights = WeightTable::new();
    let mut averager = LazyAverager::default();
    let mut mistakes = 0;
    let mut step = 0u64;

    for &i in order {
        step += 1;
        let example = &examples[i];
        let predicted = predict(&example.vector, &weights, tagset)?;
        if predicted != example.gold {
            averager.touch(average, &weights, &example.vector, predicted, step);
            weights.add_vector(&example.vector, predicted, -1.0);
            averager.touch(average, &weights, &example.vector, &example.gold, step);
            weights.add_vector(&example.vector, &example.gold, 1.0);
            mistakes += 1;
        }
    }
    averager.flush(average, &weights, step);

    Ok(mistakes)
}

/// Tracks, for every weight entry, the last step before its current value was set.
#[derive(Debug, Default)]
struct LazyAverager {
    held_since: HashMap<String, HashMap<String, u64>>,
}

impl LazyAverager {
    /// Credits the entries of `vector` for `tag` with the value they held
    /// through the previous step, just before `step` modifies them.
    fn touch(
        &mut self,
        average: &mut AverageTable,
        weights: &WeightTable,
        vector: &FeatureVector,
        tag: &str,
        step: u64,
    ) {
        let held_until = step - 1;
        for feature in vector.names() {
            let since = self
                .held_since
                .entry(feature.to_string())
                .or_default()
                .insert(tag.to_string(), held_until);
            if let Some(since) = since {
                let w = weights.weight(feature, tag);
                average.add(feature, tag, w * (held_until - since) as f64);
            }
        }
    }

    /// Credits every entry with its final value up to and including `last_step`.
    fn flush(&mut self, average: &mut AverageTable, weights: &WeightTable, last_step: u64) {
        for (feature, tags) in self.held_since.drain() {
            for (tag, since) in tags {
                let w = weights.weight(&feature, &tag);
                average.add(&feature, &tag, w * (last_step - since) as f64);
            }
        }
    }
}

fn warn_unknown_tags(examples: &[Example], tagset: &Tagset) {
    let unknown: BTreeSet<&str> = examples
        .iter()
        .map(|e| e.gold.as_str())
        .filter(|tag| !tagset.contains(tag))
        .collect();
    for tag in unknown {
        warn!("gold tag {:?} is not in the tagset and can never be predicted", tag);
    }
}
