//! Passage metadata - JSONL, one passage per line in ingestion order

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, RagResult};

/// A single line of the knowledge base
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// 1-based position among non-blank corpus lines
    pub line_no: usize,
    pub text: String,
}

impl Passage {
    /// Split newline-delimited text into passages, skipping blank lines
    pub fn from_text(text: &str) -> Vec<Passage> {
        Self::from_lines(text.lines())
    }

    /// Trim each entry, drop blanks and number the survivors from 1
    pub fn from_lines<I, S>(lines: I) -> Vec<Passage>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        lines
            .into_iter()
            .filter_map(|line| {
                let trimmed = line.as_ref().trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .enumerate()
            .map(|(i, text)| Passage {
                line_no: i + 1,
                text,
            })
            .collect()
    }
}

/// Write passages as JSON lines
pub fn write_passages(path: &Path, passages: &[Passage]) -> RagResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for passage in passages {
        serde_json::to_writer(&mut writer, passage)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Read passages back in file order, checking `line_no` runs 1..=n
pub fn read_passages(path: &Path) -> RagResult<Vec<Passage>> {
    let reader = BufReader::new(File::open(path)?);
    let mut passages = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let passage: Passage = serde_json::from_str(&line)?;
        let expected = passages.len() + 1;
        if passage.line_no != expected {
            return Err(RagError::corrupt(
                path,
                format!("expected line_no {}, found {}", expected, passage.line_no),
            ));
        }
        passages.push(passage);
    }

    Ok(passages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_skips_blank_lines() {
        let passages = Passage::from_text("Go to Orders.\n\n   \n  Click Track Package.  \r\nEnter your order ID.\n");
        assert_eq!(passages.len(), 3);
        assert_eq!(passages[0], Passage { line_no: 1, text: "Go to Orders.".into() });
        assert_eq!(passages[1], Passage { line_no: 2, text: "Click Track Package.".into() });
        assert_eq!(passages[2], Passage { line_no: 3, text: "Enter your order ID.".into() });
    }

    #[test]
    fn test_from_text_empty() {
        assert!(Passage::from_text("").is_empty());
        assert!(Passage::from_text("\n \n\t\n").is_empty());
    }

    #[test]
    fn test_jsonl_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passages.jsonl");
        let passages = Passage::from_lines(["first", "second \"quoted\"", "third\twith tab"]);

        write_passages(&path, &passages).unwrap();
        assert_eq!(read_passages(&path).unwrap(), passages);
    }

    #[test]
    fn test_read_rejects_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passages.jsonl");
        std::fs::write(
            &path,
            "{\"line_no\":1,\"text\":\"a\"}\n{\"line_no\":3,\"text\":\"c\"}\n",
        )
        .unwrap();

        assert!(matches!(read_passages(&path), Err(RagError::IndexCorrupt { .. })));
    }
}
