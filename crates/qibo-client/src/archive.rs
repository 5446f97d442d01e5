//! Result archive unpacking.
//!
//! The result endpoint streams a gzip-compressed tar archive. The bytes are
//! spooled into a scratch file inside the target folder, validated, and then
//! extracted next to it. The scratch file is removed on every path; when the
//! bytes turn out not to be an archive they are kept as
//! [`RAW_ARCHIVE_NAME`] for manual inspection.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use futures::{Stream, StreamExt};
use tar::Archive;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

/// File name under which undecodable response bytes are kept.
pub const RAW_ARCHIVE_NAME: &str = "result.tar.gz.raw";

/// Prefix of the scratch files created while downloading.
pub const SCRATCH_PREFIX: &str = ".archive-";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors that can occur while unpacking a result archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The bytes are not a valid gzip-compressed tar stream.
    #[error("Not a valid gzip-compressed tar archive: {0}")]
    Format(String),

    /// Reading the stream or writing to disk failed.
    #[error("Archive I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ArchiveError {
    /// Whether this error reports a corrupt archive rather than an I/O failure.
    pub fn is_format(&self) -> bool {
        matches!(self, ArchiveError::Format(_))
    }
}

/// Scratch file receiving a downloaded archive.
///
/// Exclusive to one unpack call. Dropping the sink removes the file.
#[derive(Debug)]
pub struct ArchiveSink {
    file: NamedTempFile,
    target: PathBuf,
    bytes_written: u64,
}

impl ArchiveSink {
    /// Create a fresh scratch file inside `target`, creating `target` if needed.
    ///
    /// A [`RAW_ARCHIVE_NAME`] left by an earlier failed retrieval is removed.
    pub fn create(target: &Path) -> ArchiveResult<Self> {
        fs::create_dir_all(target)?;
        match fs::remove_file(target.join(RAW_ARCHIVE_NAME)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        let file = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .suffix(".part")
            .tempfile_in(target)?;

        Ok(Self {
            file,
            target: target.to_path_buf(),
            bytes_written: 0,
        })
    }

    /// Location of the scratch file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of bytes spooled so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Append a chunk. Empty chunks are skipped.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> ArchiveResult<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        self.file.write_all(chunk)?;
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    /// Validate the spooled bytes and extract them into the target folder.
    ///
    /// Consumes the sink, so the scratch file is gone once this returns.
    pub fn unpack(mut self) -> ArchiveResult<()> {
        self.file.flush()?;
        debug!(
            "Unpacking {} bytes into {}",
            self.bytes_written,
            self.target.display()
        );

        if let Err(err) = validate(self.file.path()) {
            if err.is_format() {
                self.retain_raw();
            }
            return Err(err);
        }

        let mut archive = Archive::new(GzDecoder::new(BufReader::new(File::open(
            self.file.path(),
        )?)));
        archive.unpack(&self.target)?;
        Ok(())
    }

    /// Move the scratch file to [`RAW_ARCHIVE_NAME`] inside the target.
    fn retain_raw(self) {
        let raw = self.target.join(RAW_ARCHIVE_NAME);
        if let Err(e) = self.file.persist(&raw) {
            warn!("Could not keep raw result at {}: {}", raw.display(), e.error);
        }
    }
}

/// Check that the file is a readable gzip-compressed tar archive.
///
/// Walks every header and entry body without writing anything.
fn validate(path: &Path) -> ArchiveResult<()> {
    let mut file = File::open(path)?;

    let mut magic = [0u8; 2];
    if file.read_exact(&mut magic).is_err() || magic != GZIP_MAGIC {
        return Err(ArchiveError::Format("missing gzip header".into()));
    }
    file.seek(SeekFrom::Start(0))?;

    let format = |e: io::Error| ArchiveError::Format(e.to_string());

    let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));
    for entry in archive.entries().map_err(format)? {
        let mut entry = entry.map_err(format)?;
        entry.path().map_err(format)?;
        io::copy(&mut entry, &mut io::sink()).map_err(format)?;
    }
    Ok(())
}

/// Spool a sequence of byte chunks to a scratch file and extract it into
/// `target`, preserving the archive's relative paths.
///
/// Fails with [`ArchiveError::Format`] when the bytes are not a
/// gzip-compressed tar archive.
pub fn unpack_stream_to_folder<I, B>(chunks: I, target: &Path) -> ArchiveResult<()>
where
    I: IntoIterator<Item = io::Result<B>>,
    B: AsRef<[u8]>,
{
    let mut sink = ArchiveSink::create(target)?;
    for chunk in chunks {
        sink.write_chunk(chunk?.as_ref())?;
    }
    sink.unpack()
}

/// Async counterpart of [`unpack_stream_to_folder`] for response bodies.
///
/// Extraction runs on the blocking pool.
pub async fn unpack_byte_stream_to_folder<S, B>(stream: S, target: &Path) -> ArchiveResult<()>
where
    S: Stream<Item = io::Result<B>>,
    B: AsRef<[u8]>,
{
    let mut sink = ArchiveSink::create(target)?;
    let mut stream = std::pin::pin!(stream);
    while let Some(chunk) = stream.next().await {
        sink.write_chunk(chunk?.as_ref())?;
    }

    tokio::task::spawn_blocking(move || sink.unpack())
        .await
        .map_err(|e| ArchiveError::Io(io::Error::other(e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn build_archive(files: &[(&str, &[u8])]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn scratch_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(SCRATCH_PREFIX))
            })
            .collect()
    }

    fn chunked(bytes: &[u8], size: usize) -> Vec<io::Result<Vec<u8>>> {
        bytes.chunks(size).map(|c| Ok(c.to_vec())).collect()
    }

    #[test]
    fn test_unpack_valid_archive() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_archive(&[
            ("results.npy", b"payload".as_slice()),
            ("logs/run.log", b"ok".as_slice()),
        ]);

        unpack_stream_to_folder(chunked(&bytes, 7), dir.path()).unwrap();

        assert_eq!(fs::read(dir.path().join("results.npy")).unwrap(), b"payload");
        assert_eq!(fs::read(dir.path().join("logs/run.log")).unwrap(), b"ok");
        assert!(scratch_files(dir.path()).is_empty());
        assert!(!dir.path().join(RAW_ARCHIVE_NAME).exists());
    }

    #[test]
    fn test_empty_chunks_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_archive(&[("results.npy", b"abc".as_slice())]);
        let (head, tail) = bytes.split_at(10);
        let empty: &[u8] = &[];
        let chunks: Vec<io::Result<&[u8]>> = vec![Ok(empty), Ok(head), Ok(empty), Ok(tail), Ok(empty)];

        unpack_stream_to_folder(chunks, dir.path()).unwrap();
        assert_eq!(fs::read(dir.path().join("results.npy")).unwrap(), b"abc");
    }

    #[test]
    fn test_garbage_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let garbage = b"Job still in progress".to_vec();

        let err = unpack_stream_to_folder(chunked(&garbage, 4), dir.path()).unwrap_err();

        assert!(err.is_format(), "unexpected error: {err}");
        assert!(scratch_files(dir.path()).is_empty());
        assert_eq!(fs::read(dir.path().join(RAW_ARCHIVE_NAME)).unwrap(), garbage);
    }

    #[test]
    fn test_gzip_of_non_tar_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&[0xAB; 1024]).unwrap();
        let bytes = encoder.finish().unwrap();

        let err = unpack_stream_to_folder(chunked(&bytes, 64), dir.path()).unwrap_err();
        assert!(err.is_format());
        assert!(scratch_files(dir.path()).is_empty());
    }

    #[test]
    fn test_truncated_archive_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_archive(&[("results.npy", [7u8; 4096].as_slice())]);
        let truncated = &bytes[..bytes.len() / 2];

        let err = unpack_stream_to_folder(chunked(truncated, 128), dir.path()).unwrap_err();
        assert!(err.is_format());
        assert!(scratch_files(dir.path()).is_empty());
    }

    #[test]
    fn test_stream_error_removes_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        let chunks: Vec<io::Result<Vec<u8>>> = vec![
            Ok(vec![0x1f, 0x8b]),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];

        let err = unpack_stream_to_folder(chunks, dir.path()).unwrap_err();
        assert!(matches!(err, ArchiveError::Io(ref e) if e.kind() == io::ErrorKind::ConnectionReset));
        assert!(scratch_files(dir.path()).is_empty());
        assert!(!dir.path().join(RAW_ARCHIVE_NAME).exists());
    }

    #[test]
    fn test_sink_path_is_removed_after_unpack() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_archive(&[("results.npy", b"x".as_slice())]);

        let mut sink = ArchiveSink::create(dir.path()).unwrap();
        let scratch = sink.path().to_path_buf();
        assert!(scratch.exists());
        sink.write_chunk(&bytes).unwrap();
        assert_eq!(sink.bytes_written(), bytes.len() as u64);
        sink.unpack().unwrap();

        assert!(!scratch.exists());
    }

    #[test]
    fn test_creates_missing_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("pid-1");
        let bytes = build_archive(&[("results.npy", b"x".as_slice())]);

        unpack_stream_to_folder(chunked(&bytes, 16), &target).unwrap();
        assert!(target.join("results.npy").exists());
    }

    #[test]
    fn test_successful_retry_clears_raw_copy() {
        let dir = tempfile::tempdir().unwrap();
        let garbage = b"<html>bad gateway</html>".to_vec();
        unpack_stream_to_folder(chunked(&garbage, 8), dir.path()).unwrap_err();
        assert!(dir.path().join(RAW_ARCHIVE_NAME).exists());

        let bytes = build_archive(&[("results.npy", b"x".as_slice())]);
        unpack_stream_to_folder(chunked(&bytes, 16), dir.path()).unwrap();

        assert!(dir.path().join("results.npy").exists());
        assert!(!dir.path().join(RAW_ARCHIVE_NAME).exists());
    }

    #[tokio::test]
    async fn test_unpack_byte_stream() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_archive(&[("results.npy", b"streamed".as_slice())]);
        let stream = futures::stream::iter(chunked(&bytes, 5));

        unpack_byte_stream_to_folder(stream, dir.path()).await.unwrap();

        assert_eq!(fs::read(dir.path().join("results.npy")).unwrap(), b"streamed");
        assert!(scratch_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_unpack_byte_stream_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let stream = futures::stream::iter(chunked(b"not an archive at all", 3));

        let err = unpack_byte_stream_to_folder(stream, dir.path())
            .await
            .unwrap_err();
        assert!(err.is_format());
        assert!(scratch_files(dir.path()).is_empty());
    }
}
