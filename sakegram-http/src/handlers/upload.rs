//! Multipart parsing and storage of uploaded images.

use axum::extract::Multipart;
use sakegram::studio::Fields;
use sakegram::SakegramError;
use std::path::{Path, PathBuf};

/// URL prefix (and relative directory) uploads are reachable under.
pub const UPLOADS_PREFIX: &str = "uploads";

pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Extension of the original file name including the dot, or empty.
    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default()
    }

    /// MIME type for data URLs: the declared type when it is an image,
    /// otherwise guessed from the extension.
    pub fn mime(&self) -> String {
        if let Some(ct) = self.content_type.as_deref().filter(|ct| ct.starts_with("image/")) {
            return ct.to_string();
        }
        match self.extension().as_str() {
            ".png" => "image/png",
            ".webp" => "image/webp",
            ".gif" => "image/gif",
            _ => "image/jpeg",
        }
        .to_string()
    }
}

/// A form with at most one file part named `image` and any number of text fields.
#[derive(Default)]
pub struct UploadForm {
    pub image: Option<UploadedFile>,
    pub fields: Fields,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, SakegramError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| SakegramError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(String::from);
                let bytes = field.bytes().await.map_err(|e| {
                    SakegramError::InvalidRequest(format!("Could not read image: {}", e))
                })?;
                form.image = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            } else {
                let value = field.text().await.map_err(|e| {
                    SakegramError::InvalidRequest(format!("Could not read field {}: {}", name, e))
                })?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    pub fn take_image(&mut self) -> Result<UploadedFile, SakegramError> {
        self.image
            .take()
            .filter(|f| !f.bytes.is_empty())
            .ok_or_else(|| SakegramError::MissingField("image".into()))
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// A file written to the uploads directory.
pub struct SavedUpload {
    pub path: PathBuf,
    /// `uploads/{file}`, the form stored in posts and returned to clients.
    pub relative: String,
    /// File name without extension, used to name studio output.
    pub stem: String,
}

/// Store as `{millis}{ext}`. The name is bumped if that file already exists.
pub async fn save_upload(dir: &Path, file: &UploadedFile) -> Result<SavedUpload, SakegramError> {
    tokio::fs::create_dir_all(dir).await?;

    let ext = file.extension();
    let mut millis = chrono::Utc::now().timestamp_millis();
    let mut path = dir.join(format!("{}{}", millis, ext));
    while tokio::fs::try_exists(&path).await.unwrap_or(false) {
        millis += 1;
        path = dir.join(format!("{}{}", millis, ext));
    }

    tokio::fs::write(&path, &file.bytes).await?;
    let stem = millis.to_string();
    let relative = relative_path(&format!("{}{}", stem, ext));
    tracing::info!("Saved upload {} ({} bytes)", relative, file.bytes.len());

    Ok(SavedUpload {
        path,
        relative,
        stem,
    })
}

pub fn relative_path(file_name: &str) -> String {
    format!("{}/{}", UPLOADS_PREFIX, file_name)
}
