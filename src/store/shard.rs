//! On-disk shard files: 256 append-only files, one per top-8-bit value
//! of `signature[0]`. Each record is fixed width within a store: the
//! signature's words followed by a payload (a 32-bit ordinal or a
//! packed `v`-bit user value); there is no per-record framing.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::hash::Signature;

pub const NUM_SHARDS: usize = 256;

#[derive(Clone, Copy, Debug)]
pub enum Payload {
    Ordinal(u32),
    Value(u64),
}

pub struct ShardWriter {
    file: BufWriter<File>,
    pub sig_words: u8,
    pub value_width: u8,
    pub count: u64,
}

impl ShardWriter {
    fn open(path: &Path, sig_words: u8, value_width: u8) -> Result<Self> {
        let file = File::create(path).map_err(Error::TempIo)?;
        Ok(Self { file: BufWriter::new(file), sig_words, value_width, count: 0 })
    }

    pub fn write_record<S: Signature>(&mut self, sig: &S, payload: Payload) -> Result<()> {
        for &w in &sig.words()[..self.sig_words as usize] {
            self.file.write_all(&w.to_le_bytes()).map_err(Error::TempIo)?;
        }
        let v = match payload {
            Payload::Ordinal(o) => o as u64,
            Payload::Value(v) => v,
        };
        let bytes = ((self.value_width as u32 + 7) / 8).max(1) as usize;
        self.file.write_all(&v.to_le_bytes()[..bytes]).map_err(Error::TempIo)?;
        self.count += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file.flush().map_err(Error::TempIo)
    }
}

pub struct ShardSet {
    dir: PathBuf,
    sig_words: u8,
    value_width: u8,
    writers: Vec<Option<ShardWriter>>,
}

impl ShardSet {
    pub fn create(dir: &Path, sig_words: u8, value_width: u8) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(Error::TempIo)?;
        Ok(Self { dir: dir.to_path_buf(), sig_words, value_width, writers: (0..NUM_SHARDS).map(|_| None).collect() })
    }

    fn path_for(&self, shard: usize) -> PathBuf {
        self.dir.join(format!("shard_{shard:03}.bin"))
    }

    pub fn write<S: Signature>(&mut self, shard: usize, sig: &S, payload: Payload) -> Result<()> {
        if self.writers[shard].is_none() {
            let path = self.path_for(shard);
            self.writers[shard] = Some(ShardWriter::open(&path, self.sig_words, self.value_width)?);
        }
        self.writers[shard].as_mut().unwrap().write_record(sig, payload)
    }

    pub fn finish(&mut self) -> Result<()> {
        for w in self.writers.iter_mut().flatten() {
            w.flush()?;
        }
        Ok(())
    }

    /// Read back all records of one shard as `(signature words, value)`.
    pub fn read_shard(&self, shard: usize) -> Result<Vec<(Vec<u64>, u64)>> {
        let path = self.path_for(shard);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::TempIo(e)),
        };
        let mut reader = BufReader::new(file);
        let value_bytes = ((self.value_width as u32 + 7) / 8).max(1) as usize;
        let record_bytes = self.sig_words as usize * 8 + value_bytes;
        let mut buf = vec![0u8; record_bytes];
        let mut out = Vec::new();
        loop {
            match reader.read_exact(&mut buf) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(Error::TempIo(e)),
            }
            let mut words = Vec::with_capacity(self.sig_words as usize);
            for i in 0..self.sig_words as usize {
                let w = u64::from_le_bytes(buf[i * 8..i * 8 + 8].try_into().unwrap());
                words.push(w);
            }
            let mut vbuf = [0u8; 8];
            vbuf[..value_bytes].copy_from_slice(&buf[self.sig_words as usize * 8..]);
            let value = u64::from_le_bytes(vbuf);
            out.push((words, value));
        }
        Ok(out)
    }

    pub fn close(self) -> Result<()> {
        for shard in 0..NUM_SHARDS {
            let path = self.path_for(shard);
            if path.exists() {
                std::fs::remove_file(&path).map_err(Error::TempIo)?;
            }
        }
        Ok(())
    }

    /// Truncate every shard file back to empty, for `reset()`.
    pub fn truncate_all(&mut self) -> Result<()> {
        self.writers = (0..NUM_SHARDS).map(|_| None).collect();
        for shard in 0..NUM_SHARDS {
            let path = self.path_for(shard);
            if path.exists() {
                std::fs::remove_file(&path).map_err(Error::TempIo)?;
            }
        }
        Ok(())
    }
}
