//! Upload validation and temporary storage.

use std::fs;
use std::io::Write;
use std::path::Path;

use image::ImageFormat;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::VisionError;

/// Lower-cased extension of `file_name`, if it has one.
pub fn file_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Checks size, declared extension and decoded format of an upload.
///
/// Runs before anything touches disk or the models.
pub fn validate_upload(
    file_name: Option<&str>,
    bytes: &[u8],
    max_bytes: usize,
    allowed_extensions: &[&str],
) -> Result<ImageFormat, VisionError> {
    if bytes.is_empty() {
        return Err(VisionError::EmptyUpload);
    }
    if bytes.len() > max_bytes {
        return Err(VisionError::TooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }

    let extension = file_name
        .and_then(file_extension)
        .ok_or_else(|| VisionError::UnsupportedFormat("missing file extension".into()))?;
    if !allowed_extensions.contains(&extension.as_str()) {
        return Err(VisionError::UnsupportedFormat(format!(".{extension}")));
    }

    let format = image::guess_format(bytes)
        .map_err(|_| VisionError::UnsupportedFormat("unrecognised image data".into()))?;
    match format {
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP => Ok(format),
        other => Err(VisionError::UnsupportedFormat(format!("{other:?}"))),
    }
}

/// An uploaded image on disk, removed when dropped.
#[derive(Debug)]
pub struct TempUpload {
    file: NamedTempFile,
}

impl TempUpload {
    pub fn write(dir: &Path, bytes: &[u8], extension: &str) -> Result<Self, VisionError> {
        fs::create_dir_all(dir)?;
        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&format!(".{extension}"))
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;
        debug!(path = %file.path().display(), bytes = bytes.len(), "Stored upload");
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
