// src/store.rs
//! Gzip-compressed, newline-delimited JSON append logs.
//!
//! Each [`AppendLog::append`] writes one record as its own complete gzip
//! member, so the file is always a valid multi-member stream up to the last
//! finished append. Readers stop quietly at a truncated trailing member or an
//! unterminated last line: that record is simply not there yet.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::LogError;

#[derive(Clone, Debug)]
pub struct AppendLog {
    path: PathBuf,
}

impl AppendLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn io_err(&self, source: io::Error) -> LogError {
        LogError::Io { path: self.path.clone(), source }
    }

    /// Append one record as a single compact JSON line.
    ///
    /// The line is encoded and compressed in memory first and lands in one
    /// write, so there is never a half-written record from this process.
    pub fn append<T: Serialize + ?Sized>(&self, record: &T) -> Result<(), LogError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut enc = GzEncoder::new(Vec::with_capacity(line.len() / 2 + 32), Compression::default());
        enc.write_all(&line).map_err(|e| self.io_err(e))?;
        let member = enc.finish().map_err(|e| self.io_err(e))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        file.write_all(&member).map_err(|e| self.io_err(e))?;
        file.flush().map_err(|e| self.io_err(e))?;
        Ok(())
    }

    /// Drop all records. Used for fresh receipt dumps.
    pub fn truncate(&self) -> Result<(), LogError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }

    /// Lazily decode every complete record. A missing file reads as empty.
    pub fn read_all<T: DeserializeOwned>(&self) -> Result<LogReader<T>, LogError> {
        let inner = match File::open(&self.path) {
            Ok(f) => Some(BufReader::new(MultiGzDecoder::new(BufReader::new(f)))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(self.io_err(e)),
        };
        Ok(LogReader { path: self.path.clone(), inner, line_no: 0, buf: Vec::new(), _record: PhantomData })
    }

    /// Number of complete lines.
    pub fn count(&self) -> Result<usize, LogError> {
        let mut n = 0;
        for rec in self.read_all::<serde::de::IgnoredAny>()? {
            rec?;
            n += 1;
        }
        Ok(n)
    }
}

/// Iterator over the records of one log.
pub struct LogReader<T> {
    path: PathBuf,
    inner: Option<BufReader<MultiGzDecoder<BufReader<File>>>>,
    line_no: usize,
    buf: Vec<u8>,
    _record: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Iterator for LogReader<T> {
    type Item = Result<T, LogError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let reader = self.inner.as_mut()?;
            self.buf.clear();
            match reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.inner = None;
                    return None;
                }
                Ok(_) if self.buf.last() != Some(&b'\n') => {
                    // unterminated tail: the writer has not finished it
                    self.inner = None;
                    return None;
                }
                Ok(_) => {}
                Err(e) if is_short_read(&e) => {
                    self.inner = None;
                    return None;
                }
                Err(e) => {
                    self.inner = None;
                    return Some(Err(LogError::Io { path: self.path.clone(), source: e }));
                }
            }

            self.line_no += 1;
            let line = trim_line(&self.buf);
            if line.is_empty() {
                continue;
            }
            return Some(serde_json::from_slice(line).map_err(|source| LogError::Decode {
                path: self.path.clone(),
                line: self.line_no,
                source,
            }));
        }
    }
}

fn trim_line(buf: &[u8]) -> &[u8] {
    let mut end = buf.len();
    while end > 0 && matches!(buf[end - 1], b'\n' | b'\r' | b' ' | b'\t') {
        end -= 1;
    }
    &buf[..end]
}

// A member cut off mid-write surfaces as EOF inside the deflate stream or a
// garbled header/trailer.
fn is_short_read(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData)
}
