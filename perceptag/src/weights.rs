use std::collections::{BTreeMap, HashMap};

/// Sparse feature vector: feature name to activation.
/// Features produced by the extractor are binary indicators bound to 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    features: BTreeMap<String, f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        FeatureVector::default()
    }

    /// Binds the indicator `name` to 1. Inserting an existing name keeps a single entry.
    pub fn insert(&mut self, name: impl Into<String>) {
        self.features.insert(name.into(), 1.0);
    }

    pub fn insert_value(&mut self, name: impl Into<String>, value: f64) {
        self.features.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.features.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Iterates over `(name, activation)` pairs in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.features.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut vector = FeatureVector::new();
        for name in iter {
            vector.insert(name);
        }
        vector
    }
}

/// Multiclass linear model: feature name to tag to weight.
///
/// A missing feature or tag is a weight of 0. Entries are created on first
/// write and never removed, even when their value returns to 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightTable {
    weights: HashMap<String, HashMap<String, f64>>,
}

/// Running sum of weight table snapshots. Same shape as [`WeightTable`].
pub type AverageTable = WeightTable;

impl WeightTable {
    pub fn new() -> Self {
        WeightTable::default()
    }

    /// Returns the weight of `feature` for `tag`, or 0 if either is absent.
    pub fn weight(&self, feature: &str, tag: &str) -> f64 {
        self.weights
            .get(feature)
            .and_then(|tags| tags.get(tag))
            .copied()
            .unwrap_or(0.0)
    }

    /// Returns whether an entry exists for `feature` and `tag`, whatever its value.
    pub fn contains(&self, feature: &str, tag: &str) -> bool {
        self.weights
            .get(feature)
            .is_some_and(|tags| tags.contains_key(tag))
    }

    /// Adds `delta` to the entry for `feature` and `tag`, creating it at 0 first.
    pub fn add(&mut self, feature: &str, tag: &str, delta: f64) {
        if let Some(tags) = self.weights.get_mut(feature) {
            match tags.get_mut(tag) {
                Some(w) => *w += delta,
                None => {
                    tags.insert(tag.to_string(), delta);
                }
            }
            return;
        }
        let mut tags = HashMap::new();
        tags.insert(tag.to_string(), delta);
        self.weights.insert(feature.to_string(), tags);
    }

    /// Perceptron update: adds `vector[f] * factor` to the weight of every
    /// feature `f` of `vector` for `tag`.
    ///
    /// # Arguments
    /// * `vector` - The features of the example being learned.
    /// * `tag` - The tag whose weights are moved.
    /// * `factor` - `-1.0` to penalize a predicted tag, `+1.0` to promote a gold tag.
    ///
    /// # Example
    /// ```
    /// use perceptag::weights::{FeatureVector, WeightTable};
    ///
    /// let vector: FeatureVector = ["word=chat"].into_iter().collect();
    /// let mut weights = WeightTable::new();
    /// weights.add_vector(&vector, "VERB", -1.0);
    /// weights.add_vector(&vector, "NOUN", 1.0);
    /// assert_eq!(weights.weight("word=chat", "NOUN"), 1.0);
    /// assert_eq!(weights.weight("word=chat", "VERB"), -1.0);
    /// ```
    pub fn add_vector(&mut self, vector: &FeatureVector, tag: &str, factor: f64) {
        for (feature, value) in vector.iter() {
            self.add(feature, tag, value * factor);
        }
    }

    /// Averaging step: adds every entry of `weights` into this table.
    /// Entries present in `weights` are created here if absent, even with a value of 0.
    pub fn accumulate(&mut self, weights: &WeightTable) {
        for (feature, tags) in &weights.weights {
            for (tag, &w) in tags {
                self.add(feature, tag, w);
            }
        }
    }

    /// Returns a copy with every weight divided by `steps`.
    ///
    /// Training returns the undivided sum; dividing by the number of steps to
    /// obtain a textbook average is left to the caller. Zero steps returns an
    /// unchanged copy.
    pub fn normalized(&self, steps: u64) -> WeightTable {
        let mut table = self.clone();
        if steps == 0 {
            return table;
        }
        let steps = steps as f64;
        for tags in table.weights.values_mut() {
            for w in tags.values_mut() {
                *w /= steps;
            }
        }
        table
    }

    /// Number of distinct features with at least one entry.
    pub fn num_features(&self) -> usize {
        self.weights.len()
    }

    /// Number of (feature, tag) entries.
    pub fn num_entries(&self) -> usize {
        self.weights.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Returns every `(feature, tag, weight)` entry sorted by feature then tag.
    pub fn entries(&self) -> Vec<(&str, &str, f64)> {
        let mut entries: Vec<(&str, &str, f64)> = self
            .weights
            .iter()
            .flat_map(|(f, tags)| tags.iter().map(move |(t, &w)| (f.as_str(), t.as_str(), w)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.cmp(b.1)));
        entries
    }
}
