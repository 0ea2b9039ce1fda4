//! Raw stream recording.
//!
//! A session appends every raw datagram, undecoded and without framing,
//! to a file named `<prefix>recording-<YYYY-mm-dd_HH-MM-SS>.gt7`. At most
//! one session is open; starting a new one closes the previous first.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::core::{RECORDING_EXTENSION, RECORDING_TIMESTAMP_FORMAT, RecordError};

/// Upper bound on `-N` suffixes tried when a file name is taken.
const MAX_NAME_COLLISIONS: u32 = 1000;

/// What a finished session wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSummary {
    /// File the session wrote to.
    pub path: PathBuf,
    /// Datagrams appended.
    pub datagrams: u64,
    /// Bytes appended.
    pub bytes: u64,
}

#[derive(Debug)]
struct Session {
    path: PathBuf,
    writer: BufWriter<File>,
    datagrams: u64,
    bytes: u64,
}

impl Session {
    fn finish(mut self) -> Result<RecordingSummary, RecordError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(RecordingSummary {
            path: self.path,
            datagrams: self.datagrams,
            bytes: self.bytes,
        })
    }
}

/// Recording sink owned by the receive loop.
#[derive(Debug)]
pub struct RecordingSink {
    dir: PathBuf,
    session: Option<Session>,
}

impl RecordingSink {
    /// Create an idle sink that writes sessions into `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            session: None,
        }
    }

    /// Check if a session is open.
    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Path of the open session's file.
    pub fn current_path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.path.as_path())
    }

    /// Open a new session named after `prefix` and the current local time.
    ///
    /// Any open session is closed first; its summary is returned alongside
    /// the new file's path.
    pub fn start(
        &mut self,
        prefix: &str,
    ) -> Result<(PathBuf, Option<RecordingSummary>), RecordError> {
        let previous = self.stop()?;

        let base = file_stem(prefix, Local::now());
        let (path, file) = self.create_unique(&base)?;
        self.session = Some(Session {
            path: path.clone(),
            writer: BufWriter::new(file),
            datagrams: 0,
            bytes: 0,
        });
        Ok((path, previous))
    }

    /// Flush and close the open session, if any.
    pub fn stop(&mut self) -> Result<Option<RecordingSummary>, RecordError> {
        match self.session.take() {
            Some(session) => session.finish().map(Some),
            None => Ok(None),
        }
    }

    /// Append one raw datagram. Does nothing when idle.
    ///
    /// A write error closes the session.
    pub fn write(&mut self, datagram: &[u8]) -> Result<(), RecordError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        if let Err(e) = session.writer.write_all(datagram) {
            self.session = None;
            return Err(e.into());
        }
        session.datagrams += 1;
        session.bytes += datagram.len() as u64;
        Ok(())
    }

    fn create_unique(&self, base: &str) -> Result<(PathBuf, File), RecordError> {
        for n in 0..MAX_NAME_COLLISIONS {
            let name = match n {
                0 => format!("{base}.{RECORDING_EXTENSION}"),
                n => format!("{base}-{n}.{RECORDING_EXTENSION}"),
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free recording name for {base}"),
        )
        .into())
    }
}

/// File name without extension for a session started at `now`.
pub fn file_stem(prefix: &str, now: DateTime<Local>) -> String {
    format!(
        "{prefix}recording-{}",
        now.format(RECORDING_TIMESTAMP_FORMAT)
    )
}
