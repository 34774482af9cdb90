pub mod blocks;
pub mod delimited;
pub mod fields;
pub mod tuple;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::Path;

use anyhow::{Context, Result};

/// A record shape. Parsers are fed one raw line at a time and decide on their
/// own whether a line is data, a marker, or something to drop.
pub trait LineParser {
    type Record;

    /// Feed one line. Returns a record when this line completes one.
    fn parse_line(&mut self, line: &str) -> Option<Self::Record>;

    /// Flush the record still pending at end of stream, if any.
    fn finish(&mut self) -> Option<Self::Record> {
        None
    }
}

/// Lazy, single forward pass over a document.
pub struct Records<R, P> {
    lines: Lines<R>,
    parser: P,
    done: bool,
}

impl<R: BufRead, P: LineParser> Records<R, P> {
    pub fn new(reader: R, parser: P) -> Self {
        Records {
            lines: reader.lines(),
            parser,
            done: false,
        }
    }
}

impl<R: BufRead, P: LineParser> Iterator for Records<R, P> {
    type Item = io::Result<P::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    if let Some(record) = self.parser.parse_line(&line) {
                        return Some(Ok(record));
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return self.parser.finish().map(Ok);
                }
            }
        }
    }
}

pub fn read_records<P: LineParser>(path: &Path, parser: P) -> Result<Records<BufReader<File>, P>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(Records::new(BufReader::new(file), parser))
}

/// Read a whole document into memory. I/O failures halt; malformed lines were
/// already dropped by the parser.
pub fn collect_records<P: LineParser>(path: &Path, parser: P) -> Result<Vec<P::Record>> {
    read_records(path, parser)?
        .collect::<io::Result<Vec<_>>>()
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// True for blank lines and for format-specific header/marker lines.
pub fn is_skipped(line: &str, prefixes: &[&str]) -> bool {
    line.is_empty() || prefixes.iter().any(|p| line.starts_with(p))
}

#[cfg(test)]
pub fn parse_str<P: LineParser>(text: &str, parser: P) -> Vec<P::Record> {
    Records::new(text.as_bytes(), parser)
        .collect::<io::Result<Vec<_>>>()
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Joins lines until a blank one.
    #[derive(Default)]
    struct Paragraphs {
        pending: Vec<String>,
    }

    impl LineParser for Paragraphs {
        type Record = String;

        fn parse_line(&mut self, line: &str) -> Option<String> {
            if line.trim().is_empty() {
                return self.finish();
            }
            self.pending.push(line.trim().to_string());
            None
        }

        fn finish(&mut self) -> Option<String> {
            if self.pending.is_empty() {
                None
            } else {
                Some(std::mem::take(&mut self.pending).join(" "))
            }
        }
    }

    #[test]
    fn lazy_iteration_flushes_at_end() {
        let records = parse_str("a\nb\n\nc", Paragraphs::default());
        assert_eq!(records, vec!["a b", "c"]);
    }

    #[test]
    fn finish_called_once() {
        let mut it = Records::new("x".as_bytes(), Paragraphs::default());
        assert_eq!(it.next().unwrap().unwrap(), "x");
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }

    #[test]
    fn skip_prefixes() {
        assert!(is_skipped("", &["quran["]));
        assert!(is_skipped("quran[6236]{c,v,text}:", &["quran["]));
        assert!(!is_skipped("1,1,text", &["quran["]));
    }

    #[test]
    fn missing_document_is_an_error() {
        let err = collect_records(Path::new("tests/fixtures/does-not-exist.toon"), Paragraphs::default());
        assert!(err.is_err());
    }
}
