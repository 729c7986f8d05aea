use crate::error::{RestError, Result};
use crate::params::Params;
use crate::response::{error_from_response, Payload};
use crate::rest::RestContext;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use url::Url;

/// Function called by [`RestContext::upload_file`]
pub const UPLOAD_FUNCTION: &str = "upload_multipart";

/// Default multipart field name for the file
pub const DEFAULT_FILE_FIELD: &str = "file";

/// File content to attach to a multipart request.
///
/// A request carries at most one file. It is sent as a file part and is
/// never part of the signed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Form field name
    pub field: String,
    /// File name reported to the server; also selects the MIME type
    pub file_name: String,
    /// File content
    pub content: Vec<u8>,
}

impl FileUpload {
    /// Create an upload from in-memory bytes
    pub fn from_bytes(file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        FileUpload {
            field: DEFAULT_FILE_FIELD.to_string(),
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    /// Read the whole reader into an upload
    pub fn from_reader<R: Read>(file_name: impl Into<String>, mut reader: R) -> Result<Self> {
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        Ok(Self::from_bytes(file_name, content))
    }

    /// Read a local file, using its file name
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| RestError::validation(format!("no file name in {}", path.display())))?
            .to_string();
        let content = fs::read(path)?;
        Ok(Self::from_bytes(file_name, content))
    }

    /// Use a different form field name
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }
}

impl RestContext {
    /// Upload a file through the `upload_multipart` function
    ///
    /// # Arguments
    /// * `file` - File content, sent as the multipart file part
    /// * `params` - Function arguments, sent unchanged as form fields
    pub fn upload_file(&self, file: FileUpload, params: Params) -> Result<Payload> {
        self.upload(UPLOAD_FUNCTION, file, params)
    }

    /// Download an asset URL to a local file
    ///
    /// The request is not signed: `url` is a fully-qualified asset location,
    /// usually built from a path returned by a previous call. The body is
    /// written verbatim. The destination is replaced atomically and missing
    /// parent directories are created.
    pub fn download_file(&self, url: &str, destination: impl AsRef<Path>) -> Result<bool> {
        let parsed = Url::parse(url).map_err(|e| {
            RestError::validation(format!("download URL must be absolute: {}", url)).with_source(e)
        })?;

        let response = self.fetch_raw(parsed.as_str())?;
        if !response.is_success() {
            return Err(error_from_response(&response));
        }

        let destination = destination.as_ref();
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&response.body)?;
        file.flush()?;
        file.persist(destination).map_err(|e| RestError::from(e.error))?;

        Ok(true)
    }
}
