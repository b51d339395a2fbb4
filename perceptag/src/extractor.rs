use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::corpus::{read_corpus, Sentence, Token};
use crate::error::{Error, Result};
use crate::perceptron::Example;
use crate::weights::FeatureVector;

/// Builds the feature vector of the word at `index` in `sentence`.
///
/// # Arguments
/// * `sentence` - The words of the sentence, in order.
/// * `word` - The word being tagged.
/// * `index` - The 0-based position of `word` in `sentence`.
///
/// # Returns
/// A binary feature vector with the following indicators:
/// - `is_first`, `is_last` for the sentence boundaries
/// - `is_capitalized`, `is_uppercase` when the first character, or the whole
///   word, is unchanged by uppercasing
/// - `word=` for the word, and `word-1=` for both the previous and the next
///   word (empty at the boundaries)
/// - `prefix1=`..`prefix3=` and `suffix1=`..`suffix3=` affix slots, empty when
///   the word is too short
///
/// The affix slots reproduce the trained model's template exactly: `prefix2=`
/// is always empty, and the suffix slots hold the first 1, 2 and 3 characters.
///
/// # Errors
/// Returns [`Error::IndexOutOfBounds`] if `index` is not a position in `sentence`.
///
/// # Example
/// ```
/// use perceptag::extractor::word_features;
///
/// let sentence = ["Le", "chat", "dort"];
/// let vector = word_features(&sentence, "chat", 1).unwrap();
/// assert!(vector.contains("word=chat"));
/// assert!(vector.contains("word-1=Le"));
/// assert!(vector.contains("word-1=dort"));
/// assert!(!vector.contains("is_first"));
/// assert!(word_features(&sentence, "chat", 3).is_err());
/// ```
pub fn word_features<S: AsRef<str>>(
    sentence: &[S],
    word: &str,
    index: usize,
) -> Result<FeatureVector> {
    let len = sentence.len();
    if index >= len {
        return Err(Error::IndexOutOfBounds { index, len });
    }

    let previous = if index != 0 {
        sentence[index - 1].as_ref()
    } else {
        ""
    };
    let next = if index < len - 1 {
        sentence[index + 1].as_ref()
    } else {
        ""
    };
    let length = word.chars().count();
    let head_if_longer = |n: usize, min: usize| if length > min { head(word, n) } else { "" };

    let mut vector: FeatureVector = [
        format!("word-1={}", previous),
        format!("word={}", word),
        // The next word shares the `word-1=` namespace with the previous one.
        format!("word-1={}", next),
        format!("prefix1={}", head_if_longer(1, 0)),
        "prefix2=".to_string(),
        format!("prefix3={}", head_if_longer(3, 2)),
        format!("suffix1={}", head_if_longer(1, 0)),
        format!("suffix2={}", head_if_longer(2, 1)),
        format!("suffix3={}", head_if_longer(3, 2)),
    ]
    .into_iter()
    .collect();

    if index == 0 {
        vector.insert("is_first");
    }
    if index == len - 1 {
        vector.insert("is_last");
    }
    if is_capitalized(word) {
        vector.insert("is_capitalized");
    }
    if is_uppercase(word) {
        vector.insert("is_uppercase");
    }

    Ok(vector)
}

/// The first `n` characters of `word`, or all of it if shorter.
fn head(word: &str, n: usize) -> &str {
    match word.char_indices().nth(n) {
        Some((end, _)) => &word[..end],
        None => word,
    }
}

fn is_capitalized(word: &str) -> bool {
    word.chars()
        .next()
        .is_some_and(|c| c.to_uppercase().eq(std::iter::once(c)))
}

fn is_uppercase(word: &str) -> bool {
    !word.is_empty() && word.to_uppercase() == word
}

/// Turns the tokens of one sentence into examples, one per token.
/// Tokens are located by their position in the sentence, not by their corpus index.
pub fn vectorize_sentence(sentence: &[Token]) -> Result<Vec<Example>> {
    let words: Vec<&str> = sentence.iter().map(|t| t.word.as_str()).collect();
    if let Some((position, token)) = sentence
        .iter()
        .enumerate()
        .find(|(position, token)| token.index != position + 1)
    {
        debug!(
            "token {:?} has corpus index {} but position {} in its sentence",
            token.word,
            token.index,
            position + 1
        );
    }
    sentence
        .iter()
        .enumerate()
        .map(|(position, token)| {
            let vector = word_features(&words, &token.word, position)?;
            Ok(Example::new(vector, token.gold_pos.clone()))
        })
        .collect()
}

/// Turns a corpus into a flat list of examples, in corpus order.
///
/// Sentences are vectorized in parallel; sentence boundaries are not kept.
pub fn vectorize(sentences: &[Sentence]) -> Result<Vec<Example>> {
    let per_sentence: Vec<Vec<Example>> = sentences
        .par_iter()
        .map(|sentence| vectorize_sentence(sentence))
        .collect::<Result<_>>()?;
    Ok(per_sentence.into_iter().flatten().collect())
}

/// Writes examples as `tag\tfeature\tfeature...` lines.
/// Activations are not written; every feature is read back as 1.
pub fn write_examples<W: Write>(examples: &[Example], writer: &mut W) -> Result<()> {
    for example in examples {
        let mut line = vec![example.gold.as_str()];
        line.extend(example.vector.names());
        writeln!(writer, "{}", line.join("\t"))?;
    }
    Ok(())
}

/// Reads examples written by [`write_examples`]. Blank lines are skipped.
///
/// # Errors
/// Returns [`Error::MalformedRecord`] if a line has an empty tag.
pub fn parse_examples<R: BufRead>(reader: R) -> Result<Vec<Example>> {
    let mut examples = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut parts = line.split('\t');
        let gold = parts.next().unwrap_or_default();
        if gold.is_empty() {
            return Err(Error::MalformedRecord {
                line: i + 1,
                reason: "missing gold tag".to_string(),
            });
        }
        let vector: FeatureVector = parts.filter(|f| !f.is_empty()).collect();
        examples.push(Example::new(vector, gold));
    }
    Ok(examples)
}

/// Reads a features file.
pub fn read_examples(path: &Path) -> Result<Vec<Example>> {
    let file = File::open(path)?;
    parse_examples(BufReader::new(file))
}

/// Extracts features from a CoNLL-U corpus and writes them to a features file.
///
/// # Arguments
/// * `corpus_path` - The annotated corpus to read.
/// * `features_path` - The features file to create.
///
/// # Returns
/// The number of examples written.
///
/// # Errors
/// Returns an error if the corpus cannot be read or parsed, or if the
/// features file cannot be written.
pub fn extract(corpus_path: &Path, features_path: &Path) -> Result<usize> {
    let sentences = read_corpus(corpus_path)?;
    let examples = vectorize(&sentences)?;
    info!(
        "extracted {} examples from {} sentences",
        examples.len(),
        sentences.len()
    );

    let mut writer = BufWriter::new(File::create(features_path)?);
    write_examples(&examples, &mut writer)?;
    writer.flush()?;

    Ok(examples.len())
}
