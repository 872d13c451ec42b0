use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::ProfilerError;

/// Raw-query mirror: one observed query per line, in fetch order.
pub struct DumpSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl DumpSink {
    /// Truncates any existing file. An unwritable path is a startup error.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ProfilerError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|err| {
            ProfilerError::Configuration(format!(
                "cannot open dump file {}: {err}",
                path.display()
            ))
        })?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn write_line(&mut self, text: &str) -> Result<(), ProfilerError> {
        self.writer.write_all(text.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ProfilerError> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
