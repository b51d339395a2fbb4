use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::info;

use crate::corpus::read_corpus;
use crate::error::Result;
use crate::extractor::{read_examples, vectorize};
use crate::perceptron::{AveragedPerceptron, Example, PerceptronParams, TrainOutput};
use crate::tagset::Tagset;

/// Trainer struct for managing the averaged perceptron training process.
/// It collects training examples from features files or annotated corpora
/// and runs the learner over them.
pub struct Trainer {
    learner: AveragedPerceptron,
    tagset: Tagset,
    examples: Vec<Example>,
}

impl Trainer {
    /// Creates a new instance of [`Trainer`] with no examples.
    ///
    /// # Arguments
    /// * `params` - The training parameters.
    /// * `tagset` - The tags the model chooses from.
    pub fn new(params: PerceptronParams, tagset: Tagset) -> Self {
        Trainer {
            learner: AveragedPerceptron::new(params),
            tagset,
            examples: Vec::new(),
        }
    }

    /// Loads examples from a features file written by the extractor.
    ///
    /// # Returns
    /// The number of examples loaded.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or contains a malformed line.
    pub fn load_examples(&mut self, features_path: &Path) -> Result<usize> {
        let examples = read_examples(features_path)?;
        info!(
            "loaded {} examples from {}",
            examples.len(),
            features_path.display()
        );
        Ok(self.add_examples(examples))
    }

    /// Loads and vectorizes examples from a CoNLL-U corpus.
    ///
    /// # Returns
    /// The number of examples loaded.
    ///
    /// # Errors
    /// Returns an error if the corpus cannot be read or parsed.
    pub fn load_corpus(&mut self, corpus_path: &Path) -> Result<usize> {
        let sentences = read_corpus(corpus_path)?;
        let examples = vectorize(&sentences)?;
        info!(
            "loaded {} examples from {} sentences in {}",
            examples.len(),
            sentences.len(),
            corpus_path.display()
        );
        Ok(self.add_examples(examples))
    }

    pub fn add_examples<I: IntoIterator<Item = Example>>(&mut self, examples: I) -> usize {
        let before = self.examples.len();
        self.examples.extend(examples);
        self.examples.len() - before
    }

    pub fn num_examples(&self) -> usize {
        self.examples.len()
    }

    /// Trains the averaged perceptron on every loaded example.
    ///
    /// # Arguments
    /// * `running` - Cleared to stop training before the next epoch.
    ///
    /// # Errors
    /// Returns an error if training fails.
    pub fn train(&self, running: Arc<AtomicBool>) -> Result<TrainOutput> {
        let output = self.learner.train(&self.examples, &self.tagset, running)?;
        info!(
            "trained on {} steps: {} features, {} entries",
            output.summary.steps, output.summary.num_features, output.summary.num_entries
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::NamedTempFile;

    fn create_corpus_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file for corpus");
        writeln!(file, "1\tLe\tle\tDET\t_\t_\t2\tdet\t_\t_").expect("Failed to write corpus");
        writeln!(file, "2\tchat\tchat\tNOUN\t_\t_\t3\tnsubj\t_\t_").expect("Failed to write corpus");
        writeln!(file, "3\tdort\tdormir\tVERB\t_\t_\t0\troot\t_\t_").expect("Failed to write corpus");
        file
    }

    fn create_features_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file for features");
        writeln!(file, "DET\tis_first\tword=Le").expect("Failed to write features");
        writeln!(file, "NOUN\tword=chat").expect("Failed to write features");
        file
    }

    fn params() -> PerceptronParams {
        PerceptronParams {
            max_epochs: 2,
            seed: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn test_load_corpus_and_train() -> Result<()> {
        let corpus_file = create_corpus_file();
        let mut trainer = Trainer::new(params(), Tagset::universal());
        assert_eq!(trainer.load_corpus(corpus_file.path())?, 3);

        let output = trainer.train(Arc::new(AtomicBool::new(true)))?;
        assert!(output.average.weight("word=chat", "NOUN") > 0.0);
        assert_eq!(output.summary.steps, 6);
        assert_eq!(output.summary.epochs.len(), 2);
        Ok(())
    }

    #[test]
    fn test_load_examples_and_train() -> Result<()> {
        let features_file = create_features_file();
        let mut trainer = Trainer::new(params(), Tagset::new(["DET", "NOUN"])?);
        assert_eq!(trainer.load_examples(features_file.path())?, 2);
        assert_eq!(trainer.num_examples(), 2);

        let output = trainer.train(Arc::new(AtomicBool::new(true)))?;
        assert!(output.average.weight("word=Le", "DET") > 0.0);
        // NOUN is the default prediction for features without weights.
        assert!(!output.average.contains("word=chat", "NOUN"));
        Ok(())
    }

    #[test]
    fn test_train_stopped() -> Result<()> {
        let features_file = create_features_file();
        let mut trainer = Trainer::new(params(), Tagset::universal());
        trainer.load_examples(features_file.path())?;

        // Set AtomicBool to false and immediately exit the training loop
        let output = trainer.train(Arc::new(AtomicBool::new(false)))?;
        assert!(output.summary.interrupted);
        assert!(output.average.is_empty());
        Ok(())
    }
}
