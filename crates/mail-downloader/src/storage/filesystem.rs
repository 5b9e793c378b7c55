use std::fs::{DirBuilder, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, FixedOffset};
use tracing::debug;

use crate::email::{sanitize_filename, Attachment, Mail};
use crate::error::StorageError;

/// Used for a path segment that has nothing usable left after sanitizing.
const UNKNOWN_SEGMENT: &str = "unknown";

#[cfg(unix)]
const FILE_MODE: u32 = 0o644;
#[cfg(unix)]
const DIR_MODE: u32 = 0o755;

/// Relative directory for a mail: `{username}/{Month}-{year}/{host}`.
///
/// Depends only on its arguments. The month is the English month name in the
/// date's own offset.
pub fn directory_name(username: &str, date: &DateTime<FixedOffset>, host: &str) -> PathBuf {
    let month = format!("{}-{}", date.format("%B"), date.year());
    [path_segment(username), month, path_segment(host)]
        .iter()
        .collect()
}

fn path_segment(value: &str) -> String {
    sanitize_filename(value.trim()).unwrap_or_else(|| UNKNOWN_SEGMENT.to_string())
}

/// Writes attachments and rendered PDFs below the output root.
///
/// Existing files are overwritten, so running the same range twice gives the
/// same tree.
pub struct FileStorage {
    output_directory: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Destination directory for `mail`. Nothing is created here.
    pub fn mail_directory(&self, username: &str, mail: &Mail) -> PathBuf {
        let host = mail
            .primary_sender()
            .and_then(|sender| sender.host.as_deref())
            .unwrap_or_default();
        self.output_directory
            .join(directory_name(username, &mail.date, host))
    }

    pub fn write_attachment(
        &self,
        directory: &Path,
        attachment: &Attachment,
    ) -> Result<PathBuf, StorageError> {
        self.write_file(directory, &attachment.filename, &attachment.body)
    }

    /// Writes `mail-{uid}.pdf`.
    pub fn write_pdf(
        &self,
        directory: &Path,
        uid: u32,
        pdf: &[u8],
    ) -> Result<PathBuf, StorageError> {
        self.write_file(directory, &pdf_filename(uid), pdf)
    }

    fn write_file(
        &self,
        directory: &Path,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        self.ensure_directory(directory)?;

        let path = directory.join(filename);
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(FILE_MODE);
        }

        options
            .open(&path)
            .and_then(|mut file| file.write_all(content))
            .map_err(|e| StorageError::WriteFile {
                path: path.clone(),
                source: e,
            })?;

        debug!(path = %path.display(), bytes = content.len(), "Wrote file");
        Ok(path)
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if path.is_dir() {
            return Ok(());
        }

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(DIR_MODE);
        }

        builder
            .create(path)
            .map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        debug!(path = %path.display(), "Created directory");
        Ok(())
    }
}

pub fn pdf_filename(uid: u32) -> String {
    format!("mail-{}.pdf", uid)
}
