//! Log output sink: stdout, optionally mirrored into an append-only file.
//!
//! # Design
//! - One formatted line goes to both destinations, so the file holds exactly what
//!   the console showed.
//! - A failing file write never fails the stdout write; the file is best-effort.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tracing_subscriber::fmt::MakeWriter;

use crate::error::{Result, TelemetryError};

/// `tracing_subscriber` writer factory for stdout plus an optional log file.
#[derive(Clone, Default)]
pub struct LogSink {
    file: Option<Arc<Mutex<File>>>,
}

impl LogSink {
    /// Sink that writes to stdout only.
    #[must_use]
    pub fn stdout() -> Self {
        Self::default()
    }

    /// Sink that writes to stdout and appends to `path`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened for appending.
    pub fn with_file(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| TelemetryError::LogFileOpen {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| TelemetryError::LogFileOpen {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            file: Some(Arc::new(Mutex::new(file))),
        })
    }

    /// Whether a file destination is attached.
    #[must_use]
    pub const fn has_file(&self) -> bool {
        self.file.is_some()
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogSinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogSinkWriter {
            stdout: io::stdout(),
            file: self.file.clone(),
        }
    }
}

/// Writer handed out per log event by [`LogSink`].
pub struct LogSinkWriter {
    stdout: io::Stdout,
    file: Option<Arc<Mutex<File>>>,
}

impl Write for LogSinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stdout.write_all(buf)?;
        if let Some(file) = &self.file {
            let mut file = file.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = file.write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = &self.file {
            let mut file = file.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = file.flush();
        }
        self.stdout.flush()
    }
}
