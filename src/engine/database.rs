//! Database image lifecycle: load a file into memory, flush the whole image back, close.
//!
//! The in-memory connection is the source of truth while open. The file on disk is only
//! rewritten by [`Database::flush`], which every mutating operation calls before returning.

use log::{debug, warn};
use rusqlite::backup::Backup;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::config::BACKUP_PAGES_PER_STEP;
use crate::{Error, Result};

/// One open database file and its in-memory image.
///
/// Not thread-safe: callers issue one operation at a time per file.
pub struct Database {
    path: PathBuf,
    conn: Option<Connection>,
    dirty: bool,
}

impl Database {
    /// Load the file at `path` into a fresh in-memory image.
    ///
    /// Fails with [`Error::Io`] when the file cannot be read and [`Error::Open`] when it is
    /// not a database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = load_image(&path)?;
        debug!("Opened {}", path.display());
        Ok(Self {
            path,
            conn: Some(conn),
            dirty: false,
        })
    }

    /// Flush if dirty, then release the image. Later calls fail with [`Error::NotOpen`].
    pub fn close(&mut self) -> Result<()> {
        if self.conn.is_none() {
            return Ok(());
        }
        if self.dirty {
            self.flush()?;
        }
        self.conn = None;
        debug!("Closed {}", self.path.display());
        Ok(())
    }

    /// Write the whole image to the backing file and clear the dirty flag.
    pub fn flush(&mut self) -> Result<()> {
        let conn = self.conn.as_ref().ok_or(Error::NotOpen)?;
        backup_to_file(conn, &self.path)?;
        self.dirty = false;
        Ok(())
    }

    /// Mark the image as diverged from disk and flush it immediately.
    pub(crate) fn persist(&mut self) -> Result<()> {
        self.dirty = true;
        self.flush()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(Error::NotOpen)
    }

    pub(crate) fn conn_mut(&mut self) -> Result<&mut Connection> {
        self.conn.as_mut().ok_or(Error::NotOpen)
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if self.dirty && self.conn.is_some() {
            warn!(
                "{} dropped with unflushed changes; flushing",
                self.path.display()
            );
            if let Err(e) = self.flush() {
                warn!("flush on drop failed: {}", e);
            }
        }
    }
}

/// Copy the file at `path` into a new in-memory connection.
fn load_image(path: &Path) -> Result<Connection> {
    // Surface missing/unreadable files as plain io errors before SQLite gets a chance to
    // report them less precisely.
    std::fs::File::open(path)?;

    let open_err = |source| Error::Open {
        path: path.to_path_buf(),
        source,
    };
    let source = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(open_err)?;
    // Reading the catalog forces SQLite to validate the header.
    source
        .query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(open_err)?;

    let mut image = Connection::open_in_memory().map_err(open_err)?;
    {
        let backup = Backup::new(&source, &mut image).map_err(open_err)?;
        backup
            .run_to_completion(BACKUP_PAGES_PER_STEP, Duration::from_millis(0), None)
            .map_err(open_err)?;
    }
    Ok(image)
}

/// Copy the source image to a file. Destination content is replaced entirely.
pub fn backup_to_file(source: &Connection, path: &Path) -> Result<()> {
    let flush_err = |source| Error::Flush {
        path: path.to_path_buf(),
        source,
    };
    let mut dest = Connection::open(path).map_err(flush_err)?;
    {
        let backup = Backup::new(source, &mut dest).map_err(flush_err)?;
        backup
            .run_to_completion(BACKUP_PAGES_PER_STEP, Duration::from_millis(0), None)
            .map_err(flush_err)?;
    }
    if let Ok(meta) = std::fs::metadata(path) {
        debug!("Flushed {} ({} bytes)", path.display(), meta.len());
    }
    Ok(())
}
