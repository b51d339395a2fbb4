use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// Value of the tag column meaning that no tag is available.
pub const PLACEHOLDER: &str = "_";

/// An annotated token of a CoNLL-U sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// 1-based position as given by the corpus.
    pub index: usize,
    pub word: String,
    pub gold_pos: String,
}

pub type Sentence = Vec<Token>;

/// Parses an annotated corpus in CoNLL-U format.
///
/// Sentences are separated by blank lines and lines starting with `#` are
/// ignored. The ID, FORM and UPOS columns (1st, 2nd and 4th) of each
/// tab-separated line are kept. Multi-word token ranges (`1-2`) and empty
/// nodes (`8.1`) are skipped whatever their UPOS, and tokens whose UPOS is `_`
/// are dropped.
///
/// # Errors
/// Returns [`Error::MalformedRecord`] for a line with fewer than 4 columns or
/// a tagged token whose ID is not a number.
///
/// # Example
/// ```
/// use perceptag::corpus::parse_corpus;
///
/// let corpus = "# sent_id = 1\n1\tLe\tle\tDET\n2\tchat\tchat\tNOUN\n\n1\tOui\toui\tINTJ\n";
/// let sentences = parse_corpus(corpus.as_bytes()).unwrap();
/// assert_eq!(sentences.len(), 2);
/// assert_eq!(sentences[0][1].word, "chat");
/// assert_eq!(sentences[0][1].gold_pos, "NOUN");
/// ```
pub fn parse_corpus<R: BufRead>(reader: R) -> Result<Vec<Sentence>> {
    let mut sentences = Vec::new();
    let mut sentence = Sentence::new();
    let mut dropped = 0;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            if !sentence.is_empty() {
                sentences.push(std::mem::take(&mut sentence));
            }
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 4 {
            return Err(Error::MalformedRecord {
                line: i + 1,
                reason: format!("expected at least 4 tab-separated fields, found {}", fields.len()),
            });
        }
        if fields[0].contains(|c: char| c == '-' || c == '.') {
            continue;
        }
        if fields[3] == PLACEHOLDER {
            dropped += 1;
            continue;
        }
        let index = fields[0].parse().map_err(|_| Error::MalformedRecord {
            line: i + 1,
            reason: format!("token index {:?} is not a number", fields[0]),
        })?;

        sentence.push(Token {
            index,
            word: fields[1].to_string(),
            gold_pos: fields[3].to_string(),
        });
    }
    if !sentence.is_empty() {
        sentences.push(sentence);
    }

    debug!(
        "parsed {} sentences, dropped {} untagged tokens",
        sentences.len(),
        dropped
    );
    Ok(sentences)
}

/// Reads a CoNLL-U corpus file. See [`parse_corpus`].
pub fn read_corpus(path: &Path) -> Result<Vec<Sentence>> {
    let file = File::open(path)?;
    parse_corpus(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
# sent_id = fr-1
# text = Au chat.
1-2\tAu\t_\t_\t_\t_\t_\t_\t_\t_
1\tÀ\tà\tADP\t_\t_\t3\tcase\t_\t_
2\tle\tle\tDET\t_\t_\t3\tdet\t_\t_
3\tchat\tchat\tNOUN\t_\t_\t0\troot\t_\t_
4\t.\t.\tPUNCT\t_\t_\t3\tpunct\t_\t_

# sent_id = fr-2
1\tDort\tdormir\tVERB\t_\t_\t0\troot\t_\t_
1.1\tvide\t_\t_\t_\t_\t_\t_\t_\t_
";

    #[test]
    fn test_parse_corpus() {
        let sentences = parse_corpus(SAMPLE.as_bytes()).unwrap();
        assert_eq!(sentences.len(), 2);

        let words: Vec<&str> = sentences[0].iter().map(|t| t.word.as_str()).collect();
        assert_eq!(words, vec!["À", "le", "chat", "."]);
        assert_eq!(
            sentences[0][2],
            Token {
                index: 3,
                word: "chat".to_string(),
                gold_pos: "NOUN".to_string(),
            }
        );
        assert_eq!(sentences[1].len(), 1);
        assert_eq!(sentences[1][0].gold_pos, "VERB");
    }

    #[test]
    fn test_parse_corpus_skips_tagged_empty_nodes() {
        let input = "1\tIl\til\tPRON\n8.1\tdort\tdormir\tVERB\n1-2\tdu\t_\tADP\n2\tdort\tdormir\tVERB\n";
        let sentences = parse_corpus(input.as_bytes()).unwrap();
        let words: Vec<&str> = sentences[0].iter().map(|t| t.word.as_str()).collect();
        assert_eq!(words, vec!["Il", "dort"]);
    }

    #[test]
    fn test_parse_corpus_skips_empty_sentences() {
        let input = "\n\n# only a comment\n\n1\tOui\toui\tINTJ\n\n\n";
        let sentences = parse_corpus(input.as_bytes()).unwrap();
        assert_eq!(sentences.len(), 1);
    }

    #[test]
    fn test_parse_corpus_missing_columns() {
        let input = "1\tLe\tle\tDET\n2\tchat\n";
        let result = parse_corpus(input.as_bytes());
        assert!(matches!(result, Err(Error::MalformedRecord { line: 2, .. })));
    }

    #[test]
    fn test_parse_corpus_invalid_index() {
        let input = "x\tLe\tle\tDET\n";
        let result = parse_corpus(input.as_bytes());
        assert!(matches!(result, Err(Error::MalformedRecord { line: 1, .. })));
    }

    #[test]
    fn test_read_corpus() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, "{}", SAMPLE)?;
        file.as_file().sync_all()?;

        let sentences = read_corpus(file.path())?;
        assert_eq!(sentences.iter().map(Vec::len).sum::<usize>(), 5);
        Ok(())
    }

    #[test]
    fn test_read_corpus_missing_file() {
        let result = read_corpus(Path::new("/nonexistent/corpus.conllu"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
