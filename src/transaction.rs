use crate::backend::{
    BackendError, BinaryBackend, ContainerFormat, GridBackend, MemoryBackend, WriteContext,
    XmlBackend,
};
use crate::options::WriteOptions;
use crate::Error;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// An output file that is either completely written or not there at all.
///
/// The backend writing the file is reached through [`FileTransaction::backend`].
/// [`FileTransaction::commit`] closes the file and keeps it. If the transaction is
/// dropped without a commit, for example because an error was propagated with `?`,
/// the file is closed and the partial file is removed.
///
/// ```no_run
/// use gridwrite::{FileTransaction, WriteOptions};
///
/// let mut transaction = FileTransaction::open("empty.grid", &WriteOptions::default())?;
/// transaction.backend().write_base("Base", 3, 3).unwrap();
/// transaction.commit()?;
/// # Ok::<(), gridwrite::Error>(())
/// ```
pub struct FileTransaction {
    path: PathBuf,
    backend: Box<dyn GridBackend>,
    committed: bool,
}

impl FileTransaction {
    /// create (or truncate) the file at `path` and start writing the container
    /// selected in `options`
    pub fn open<P: AsRef<Path>>(path: P, options: &WriteOptions) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        let file = File::create(&path).map_err(|source| Error::FileOpenFailed {
            path: path.clone(),
            source,
        })?;
        let writer = BufWriter::new(file);

        let backend: Result<Box<dyn GridBackend>, BackendError> = match options.format {
            ContainerFormat::Xml => XmlBackend::new(writer, options.encoding, options.index_width)
                .map(|backend| Box::new(backend) as Box<dyn GridBackend>),
            ContainerFormat::Binary => BinaryBackend::new(writer, options.index_width)
                .map(|backend| Box::new(backend) as Box<dyn GridBackend>),
        };

        let backend = match backend {
            Ok(backend) => backend,
            Err(e) => {
                remove_partial(&path);
                return Err(e).context(|| "open".to_string());
            }
        };

        tracing::debug!("opened {} for writing ({:?})", path.display(), options.format);

        Ok(Self {
            path,
            backend,
            committed: false,
        })
    }

    pub fn backend(&mut self) -> &mut dyn GridBackend {
        self.backend.as_mut()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the file and keep it on disk.
    ///
    /// If closing fails the file is removed and the error is returned.
    pub fn commit(mut self) -> Result<(), Error> {
        let result = self.backend.close().context(|| "close".to_string());

        // release the file handle before the file is touched again
        self.backend = Box::new(MemoryBackend::new());

        if result.is_ok() {
            self.committed = true;
        }

        result
    }
}

impl Drop for FileTransaction {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        let mut backend = std::mem::replace(&mut self.backend, Box::new(MemoryBackend::new()));
        if let Err(e) = backend.close() {
            tracing::debug!("closing abandoned file {} failed: {e}", self.path.display());
        }
        drop(backend);

        remove_partial(&self.path);
    }
}

fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::warn!("removed partially written file {}", path.display()),
        Err(e) => tracing::warn!(
            "could not remove partially written file {}: {e}",
            path.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_keeps_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kept.grid");

        let mut transaction = FileTransaction::open(&path, &WriteOptions::default()).unwrap();
        transaction.backend().write_base("Base", 3, 3).unwrap();
        transaction.commit().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("<Base name=\"Base\""));
        assert!(text.trim_end().ends_with("</GridFile>"));
    }

    #[test]
    fn drop_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abandoned.grid");

        {
            let mut transaction =
                FileTransaction::open(&path, &WriteOptions::default()).unwrap();
            transaction.backend().write_base("Base", 3, 3).unwrap();
            assert!(path.exists());
        }

        assert!(!path.exists());
    }

    #[test]
    fn unopenable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.grid");

        match FileTransaction::open(&path, &WriteOptions::default()) {
            Err(Error::FileOpenFailed { path: failed, .. }) => assert_eq!(failed, path),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("opened a file in a missing directory"),
        }
    }
}
