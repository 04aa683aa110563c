//! Session output sink.
//!
//! The server's stdout/stderr and the client's own progress lines all end up
//! in one append-only text destination. Without a sink every line is
//! mirrored to the `log` facade at warn level so an operator still sees it.

use crate::ELS_SERVER_LOG_FILE;

use std::fs::{File, OpenOptions, create_dir_all};
use std::io::{Result as IoResult, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{debug, warn};

/// Append-only text destination.
pub trait LogSink: Send + Sync {
    /// Append `text` as-is. Must not fail observably.
    fn append(&self, text: &str);
}

/// Appends to a file, creating it (and its directory) on open.
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    pub fn open(dir: &Path) -> IoResult<Self> {
        create_dir_all(dir)?;
        let path = dir.join(ELS_SERVER_LOG_FILE);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn append(&self, text: &str) {
        let Ok(mut file) = self.file.lock() else {
            return;
        };
        if let Err(e) = file.write_all(text.as_bytes()).and_then(|_| file.flush()) {
            warn!("Failed appending to {}: {e}", self.path.display());
        }
    }
}

/// Keeps everything in memory.
#[derive(Default, Clone)]
pub struct MemorySink {
    buffer: Arc<Mutex<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.buffer
            .lock()
            .map(|b| b.clone())
            .unwrap_or_default()
    }
}

impl LogSink for MemorySink {
    fn append(&self, text: &str) {
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.push_str(text);
        }
    }
}

/// Line-oriented front of an optional sink.
#[derive(Clone, Default)]
pub struct SessionLog {
    sink: Option<Arc<dyn LogSink>>,
}

impl SessionLog {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// No sink: lines go to the console only.
    pub fn console() -> Self {
        Self { sink: None }
    }

    /// Log one line, newline-terminated in the sink.
    pub fn line(&self, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        match &self.sink {
            Some(sink) => {
                debug!("{msg}");
                sink.append(&format!("{msg}\n"));
            }
            None => warn!("{msg}"),
        }
    }

    /// Forward raw server output unchanged.
    pub fn raw(&self, text: &str) {
        match &self.sink {
            Some(sink) => sink.append(text),
            None => warn!("{}", text.trim_end()),
        }
    }
}
