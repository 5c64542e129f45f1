//! Request-scoped temporary files.
//!
//! Decoders read uploads from disk (pdfium in particular wants a path), so
//! every file-backed upload is first written to a [`ScratchFile`]. The file is
//! owned by exactly one request and is removed when the guard is dropped:
//! normal return, early `?` return, or unwinding panic. [`ScratchFile::close`]
//! removes it eagerly and reports a failed deletion as
//! [`FormServeError::TempFileIo`] instead of swallowing it.

use crate::error::FormServeError;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

pub struct ScratchFile {
    file: NamedTempFile,
}

impl ScratchFile {
    /// Write `bytes` to a fresh, uniquely named file in `dir` (or the system
    /// temp dir when `None`).
    pub fn create(bytes: &[u8], dir: Option<&Path>) -> Result<Self, FormServeError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("formserve-");
        let mut file = match dir {
            Some(d) => builder.tempfile_in(d),
            None => builder.tempfile(),
        }
        .map_err(FormServeError::temp_io)?;

        file.write_all(bytes).map_err(FormServeError::temp_io)?;
        file.flush().map_err(FormServeError::temp_io)?;

        debug!("Scratch file {} ({} bytes)", file.path().display(), bytes.len());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the file now, surfacing any I/O error.
    pub fn close(self) -> Result<(), FormServeError> {
        let path = self.file.path().to_path_buf();
        self.file.close().map_err(FormServeError::temp_io)?;
        debug!("Removed scratch file {}", path.display());
        Ok(())
    }
}
