//! Pre-deployed map/reduce job code, keyed by a `job_kind` identifier shipped
//! over the wire instead of the callable itself.

use std::collections::HashMap;
use std::io;

use crate::record::{RecordReader, RecordWriter};

/// A worker-side job. `map` runs once per input chunk on a Daemon; `reduce`
/// runs once on the Job Client against the concatenated map output.
pub trait MapReduceJob: Send + Sync {
    fn map(&self, reader: &mut dyn RecordReader, writer: &mut dyn RecordWriter) -> io::Result<()>;
    fn reduce(&self, reader: &mut dyn RecordReader, writer: &mut dyn RecordWriter)
        -> io::Result<()>;
}

/// Counts word occurrences. Map emits `(word, 1)` per occurrence on a line;
/// reduce sums counts per word.
pub struct WordCountJob;

impl MapReduceJob for WordCountJob {
    fn map(&self, reader: &mut dyn RecordReader, writer: &mut dyn RecordWriter) -> io::Result<()> {
        while let Some(raw) = reader.read_record()? {
            let line = String::from_utf8_lossy(&raw);
            for word in line.split_whitespace() {
                writer.write_record(format!("{}\t1\n", word).as_bytes())?;
            }
        }
        writer.flush()
    }

    fn reduce(
        &self,
        reader: &mut dyn RecordReader,
        writer: &mut dyn RecordWriter,
    ) -> io::Result<()> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        while let Some(raw) = reader.read_record()? {
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches('\n');
            if let Some((word, count)) = line.split_once('\t') {
                let count: u64 = count.parse().unwrap_or(0);
                *counts.entry(word.to_string()).or_insert(0) += count;
            }
        }
        let mut entries: Vec<_> = counts.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (word, count) in entries {
            writer.write_record(format!("{}\t{}\n", word, count).as_bytes())?;
        }
        writer.flush()
    }
}

/// Looks up job implementations by the identifier shipped in place of the
/// callable itself. Workers must have the corresponding code pre-deployed.
pub fn resolve_job(job_kind: &str) -> Option<Box<dyn MapReduceJob>> {
    match job_kind {
        "word_count" => Some(Box::new(WordCountJob)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{LineReader, LineWriter};
    use std::path::PathBuf;

    fn tmp(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dfs-common-mr-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn word_count_map_then_reduce() {
        let input = tmp("wc-in.line");
        std::fs::write(&input, "a b a\nb c\n").unwrap();
        let mapped = tmp("wc-mapped.kv");
        {
            let mut reader = LineReader::open(&input).unwrap();
            let mut writer = LineWriter::create(&mapped).unwrap();
            WordCountJob.map(&mut reader, &mut writer).unwrap();
        }
        let reduced = tmp("wc-reduced.kv");
        {
            let mut reader = LineReader::open(&mapped).unwrap();
            let mut writer = LineWriter::create(&reduced).unwrap();
            WordCountJob.reduce(&mut reader, &mut writer).unwrap();
        }
        let out = std::fs::read_to_string(&reduced).unwrap();
        assert_eq!(out, "a\t2\nb\t2\nc\t1\n");
    }

    #[test]
    fn resolve_unknown_kind_is_none() {
        assert!(resolve_job("no_such_job").is_none());
    }
}
