//! Concrete implementations of the record-format abstraction (LINE and KV).
//! The chunk-splitting and read-reassembly code in `dfs-client` only needs
//! `read()`/`index()`; job map/reduce code additionally wants typed
//! key-value access for KV streams, which is layered on top as a thin
//! parse/format helper.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// One record's raw bytes, including its trailing delimiter. Chunk
/// boundaries never fall inside a record, so the delimiter stays with the
/// record it terminates.
pub type RawRecord = Vec<u8>;

/// A record-format adapter over a local file: `read()` returns the next
/// record or `None` at EOF, `index()` reports the byte offset consumed so
/// far.
pub trait RecordReader {
    fn read_record(&mut self) -> io::Result<Option<RawRecord>>;
    fn index(&self) -> u64;
}

pub trait RecordWriter {
    fn write_record(&mut self, record: &[u8]) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// Stands in for "no reader" in a generator job: immediately at EOF.
pub struct NullReader;

impl RecordReader for NullReader {
    fn read_record(&mut self) -> io::Result<Option<RawRecord>> {
        Ok(None)
    }

    fn index(&self) -> u64 {
        0
    }
}

/// Newline-delimited text records.
pub struct LineReader {
    inner: BufReader<File>,
    index: u64,
}

impl LineReader {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            inner: BufReader::new(File::open(path)?),
            index: 0,
        })
    }
}

impl RecordReader for LineReader {
    fn read_record(&mut self) -> io::Result<Option<RawRecord>> {
        let mut buf = Vec::new();
        let n = self.inner.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.index += n as u64;
        Ok(Some(buf))
    }

    fn index(&self) -> u64 {
        self.index
    }
}

pub struct LineWriter {
    inner: BufWriter<File>,
}

impl LineWriter {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            inner: BufWriter::new(File::create(path)?),
        })
    }
}

impl RecordWriter for LineWriter {
    fn write_record(&mut self, record: &[u8]) -> io::Result<()> {
        self.inner.write_all(record)?;
        if record.last() != Some(&b'\n') {
            self.inner.write_all(b"\n")?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// `key\tvalue` records, one per line. Used for map output / reduce input
/// and output.
pub struct KvReader(LineReader);

impl KvReader {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self(LineReader::open(path)?))
    }

    pub fn read_kv(&mut self) -> io::Result<Option<(String, String)>> {
        match self.0.read_record()? {
            Some(raw) => Ok(Some(parse_kv_line(&raw))),
            None => Ok(None),
        }
    }
}

impl RecordReader for KvReader {
    fn read_record(&mut self) -> io::Result<Option<RawRecord>> {
        self.0.read_record()
    }

    fn index(&self) -> u64 {
        self.0.index()
    }
}

pub struct KvWriter(LineWriter);

impl KvWriter {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self(LineWriter::create(path)?))
    }

    pub fn write_kv(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.0.write_record(format_kv_line(key, value).as_bytes())
    }
}

impl RecordWriter for KvWriter {
    fn write_record(&mut self, record: &[u8]) -> io::Result<()> {
        self.0.write_record(record)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

fn parse_kv_line(raw: &[u8]) -> (String, String) {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches('\n');
    match line.split_once('\t') {
        Some((k, v)) => (k.to_string(), v.to_string()),
        None => (line.to_string(), String::new()),
    }
}

fn format_kv_line(key: &str, value: &str) -> String {
    format!("{}\t{}\n", key, value)
}

/// The record format named in a file's metadata / CLI invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordFormat {
    Line,
    Kv,
}

impl RecordFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "line" => Some(RecordFormat::Line),
            "kv" => Some(RecordFormat::Kv),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordFormat::Line => "line",
            RecordFormat::Kv => "kv",
        }
    }

    pub fn open_reader(&self, path: impl AsRef<Path>) -> io::Result<Box<dyn RecordReader>> {
        match self {
            RecordFormat::Line => Ok(Box::new(LineReader::open(path)?)),
            RecordFormat::Kv => Ok(Box::new(KvReader::open(path)?)),
        }
    }

    pub fn create_writer(&self, path: impl AsRef<Path>) -> io::Result<Box<dyn RecordWriter>> {
        match self {
            RecordFormat::Line => Ok(Box::new(LineWriter::create(path)?)),
            RecordFormat::Kv => Ok(Box::new(KvWriter::create(path)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_reader_yields_one_record_per_line() {
        let dir = tempfile_dir();
        let path = dir.join("in.line");
        std::fs::write(&path, "a b a\nb c\na\n").unwrap();

        let mut reader = LineReader::open(&path).unwrap();
        let mut lines = Vec::new();
        while let Some(r) = reader.read_record().unwrap() {
            lines.push(String::from_utf8(r).unwrap());
        }
        assert_eq!(lines, vec!["a b a\n", "b c\n", "a\n"]);
        assert_eq!(reader.index(), 12);
    }

    #[test]
    fn kv_round_trip() {
        let dir = tempfile_dir();
        let path = dir.join("out.kv");
        {
            let mut w = KvWriter::create(&path).unwrap();
            w.write_kv("a", "4").unwrap();
            w.write_kv("b", "3").unwrap();
            w.flush().unwrap();
        }
        let mut r = KvReader::open(&path).unwrap();
        assert_eq!(r.read_kv().unwrap(), Some(("a".into(), "4".into())));
        assert_eq!(r.read_kv().unwrap(), Some(("b".into(), "3".into())));
        assert_eq!(r.read_kv().unwrap(), None);
    }

    fn tempfile_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("dfs-common-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
