//! A [`StorageBackend`] that serves files from a directory on the host's local filesystem.

use crate::auth::UserDetail;
use crate::storage::path::physical_path;
use crate::storage::{Error, ErrorKind, Fileinfo, Metadata, Result, StorageBackend};
use async_trait::async_trait;
use std::{
    fmt::Debug,
    path::{Path, PathBuf},
    time::SystemTime,
};
use tokio::io::AsyncSeekExt;

/// Serves files from `root` on the local disk. Paths handed to this backend are always
/// virtual, rooted paths already clamped by [`crate::storage::path::virtual_join`]; this
/// backend only needs to splice them onto `root`.
#[derive(Debug)]
pub struct Filesystem {
    root: PathBuf,
}

impl Filesystem {
    /// Creates a new backend rooted at `root`. No operation can read or write outside of it.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Filesystem { root: root.into() }
    }

    fn full_path<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        physical_path(&self.root, path.as_ref())
    }
}

#[async_trait]
impl<User: UserDetail> StorageBackend<User> for Filesystem {
    type Metadata = std::fs::Metadata;

    fn supported_features(&self) -> u32 {
        crate::storage::FEATURE_RESTART
    }

    #[tracing_attributes::instrument]
    async fn metadata<P: AsRef<Path> + Send + Debug>(&self, _user: &User, path: P) -> Result<Self::Metadata> {
        Ok(tokio::fs::symlink_metadata(self.full_path(path)).await?)
    }

    #[tracing_attributes::instrument]
    async fn list<P>(&self, _user: &User, path: P) -> Result<Vec<Fileinfo<PathBuf, Self::Metadata>>>
    where
        P: AsRef<Path> + Send + Debug,
    {
        let full_path = self.full_path(path);
        let mut rd = tokio::fs::read_dir(full_path).await?;

        let mut infos = Vec::new();
        while let Some(entry) = rd.next_entry().await? {
            let metadata = tokio::fs::symlink_metadata(entry.path()).await?;
            infos.push(Fileinfo {
                path: PathBuf::from(entry.file_name()),
                metadata,
            });
        }
        Ok(infos)
    }

    #[tracing_attributes::instrument]
    async fn get<P: AsRef<Path> + Send + Debug>(&self, _user: &User, path: P, start_pos: u64) -> Result<Box<dyn tokio::io::AsyncRead + Send + Sync + Unpin>> {
        let mut file = tokio::fs::File::open(self.full_path(path)).await?;
        if start_pos > 0 {
            file.seek(std::io::SeekFrom::Start(start_pos)).await?;
        }
        Ok(Box::new(file))
    }

    #[tracing_attributes::instrument]
    async fn put<P: AsRef<Path> + Send + Debug, R: tokio::io::AsyncRead + Send + Sync + Unpin + 'static>(
        &self,
        _user: &User,
        mut input: R,
        path: P,
        start_pos: u64,
    ) -> Result<u64> {
        let full_path = self.full_path(path);
        let mut file = tokio::fs::OpenOptions::new().write(true).create(true).open(full_path).await?;
        file.set_len(start_pos).await?;
        file.seek(std::io::SeekFrom::Start(start_pos)).await?;
        Ok(tokio::io::copy(&mut input, &mut file).await?)
    }

    #[tracing_attributes::instrument]
    async fn del<P: AsRef<Path> + Send + Debug>(&self, _user: &User, path: P) -> Result<()> {
        Ok(tokio::fs::remove_file(self.full_path(path)).await?)
    }

    #[tracing_attributes::instrument]
    async fn mkd<P: AsRef<Path> + Send + Debug>(&self, _user: &User, path: P) -> Result<()> {
        Ok(tokio::fs::create_dir(self.full_path(path)).await?)
    }

    #[tracing_attributes::instrument]
    async fn rename<P: AsRef<Path> + Send + Debug>(&self, _user: &User, from: P, to: P) -> Result<()> {
        let from = self.full_path(from);
        let to = self.full_path(to);
        tokio::fs::symlink_metadata(&from).await?;
        Ok(tokio::fs::rename(from, to).await?)
    }

    #[tracing_attributes::instrument]
    async fn rmd<P: AsRef<Path> + Send + Debug>(&self, _user: &User, path: P) -> Result<()> {
        Ok(tokio::fs::remove_dir(self.full_path(path)).await?)
    }

    #[tracing_attributes::instrument]
    async fn cwd<P: AsRef<Path> + Send + Debug>(&self, _user: &User, path: P) -> Result<()> {
        let full_path = self.full_path(path);
        let metadata = tokio::fs::symlink_metadata(&full_path).await?;
        if metadata.is_dir() {
            Ok(())
        } else {
            Err(Error::from(ErrorKind::PermanentDirectoryNotAvailable))
        }
    }
}

impl Metadata for std::fs::Metadata {
    fn len(&self) -> u64 {
        self.len()
    }

    fn is_dir(&self) -> bool {
        self.is_dir()
    }

    fn is_file(&self) -> bool {
        self.is_file()
    }

    fn is_symlink(&self) -> bool {
        self.file_type().is_symlink()
    }

    fn modified(&self) -> Result<SystemTime> {
        self.modified().map_err(Error::from)
    }

    fn gid(&self) -> u32 {
        0
    }

    fn uid(&self) -> u32 {
        0
    }
}

/// Metadata type alias kept for callers that want to name the concrete type returned by
/// [`Filesystem`] without spelling out `std::fs::Metadata`.
pub type FilesystemMetadata = std::fs::Metadata;
