use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Mode given to files written by [`AtomicFileWriter`].
#[cfg(unix)]
const PUBLISHED_MODE: u32 = 0o644;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("{}: {reason}", path.display())]
    OutputDir { path: PathBuf, reason: String },
    #[error("writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Create `dir` (and parents) if needed and check that files can be created in it.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    let unusable = |reason: String| PersistError::OutputDir {
        path: dir.to_path_buf(),
        reason,
    };
    match std::fs::metadata(dir) {
        Ok(meta) if !meta.is_dir() => return Err(unusable("not a directory".to_string())),
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            std::fs::create_dir_all(dir).map_err(|e| unusable(e.to_string()))?;
        }
        Err(err) => return Err(unusable(err.to_string())),
    }
    tempfile::tempfile_in(dir)
        .map(drop)
        .map_err(|e| unusable(format!("not writable: {e}")))
}

/// Writes whole files into one directory via temp file + rename, so readers
/// never observe a half-written manifest.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Replace `{dir}/{filename}` with `content`; returns the final path.
    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let target = self.dir.join(filename);
        let failed = |source: io::Error| PersistError::Write {
            path: target.clone(),
            source,
        };

        let mut staged = tempfile::Builder::new()
            .prefix(&format!(".{filename}."))
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(failed)?;
        staged.write_all(content).map_err(failed)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // tempfile creates the staging file as 0600.
            staged
                .as_file()
                .set_permissions(std::fs::Permissions::from_mode(PUBLISHED_MODE))
                .map_err(failed)?;
        }
        staged.as_file().sync_all().map_err(failed)?;
        staged.persist(&target).map_err(|e| failed(e.error))?;
        Ok(target)
    }
}
