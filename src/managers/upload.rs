use crate::constants::limits::UPLOAD_CHUNK_BYTES;
use crate::errors::ToolError;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Component, Path};
use tokio::io::AsyncReadExt;

/// One file entry of a multipart upload request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpload {
    pub field_name: String,
    pub file_path: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

/// Rejects any path carrying a `..` segment. Checked as a path
/// component, so filenames that merely contain dots pass.
fn check_traversal(file_path: &str) -> Result<(), ToolError> {
    let has_parent = Path::new(file_path)
        .components()
        .any(|component| matches!(component, Component::ParentDir));
    if has_parent {
        return Err(ToolError::path_traversal(format!(
            "Path traversal detected in file path: {}",
            file_path
        )));
    }
    Ok(())
}

/// Validates every upload entry before any bytes are sent. Checks run
/// in order (traversal, existence/readability, size) and stop at the
/// first failure; a file exactly at the limit passes.
pub async fn validate_files(files: &[FileUpload], size_limit: u64) -> Result<(), ToolError> {
    for file in files {
        check_traversal(&file.file_path)?;
        // Opening (not just stat-ing) catches permission problems here
        // rather than mid-upload.
        let handle = tokio::fs::File::open(&file.file_path).await.map_err(|_| {
            ToolError::file_not_found(format!(
                "File does not exist or is not readable: {}",
                file.file_path
            ))
        })?;
        let metadata = handle.metadata().await.map_err(|_| {
            ToolError::file_not_found(format!(
                "File does not exist or is not readable: {}",
                file.file_path
            ))
        })?;
        if !metadata.is_file() {
            return Err(ToolError::file_not_found(format!(
                "File does not exist or is not readable: {}",
                file.file_path
            )));
        }
        if metadata.len() > size_limit {
            return Err(ToolError::file_too_large(format!(
                "File exceeds size limit: {} bytes > {} bytes ({})",
                metadata.len(),
                size_limit,
                file.file_path
            )));
        }
    }
    Ok(())
}

/// Assembles the multipart form: file parts first, then plain form
/// fields, then top-level body properties rendered as text (strings
/// verbatim, everything else as JSON).
pub async fn build_form(
    files: &[FileUpload],
    form_fields: Option<&BTreeMap<String, String>>,
    body: Option<&Value>,
) -> Result<Form, ToolError> {
    let mut form = Form::new();
    for file in files {
        let handle = tokio::fs::File::open(&file.file_path).await.map_err(|_| {
            ToolError::file_not_found(format!(
                "File does not exist or is not readable: {}",
                file.file_path
            ))
        })?;
        let file_name = match &file.file_name {
            Some(name) => name.clone(),
            None => Path::new(&file.file_path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.file_path.clone()),
        };
        let mut part = Part::stream(file_body(handle)).file_name(file_name);
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type).map_err(|_| {
                ToolError::invalid_params(format!(
                    "Invalid contentType for file {}: {}",
                    file.file_path, content_type
                ))
            })?;
        }
        form = form.part(file.field_name.clone(), part);
    }
    if let Some(fields) = form_fields {
        for (key, value) in fields {
            form = form.text(key.clone(), value.clone());
        }
    }
    if let Some(Value::Object(props)) = body {
        for (key, value) in props {
            let rendered = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            form = form.text(key.clone(), rendered);
        }
    }
    Ok(form)
}

fn file_body(file: tokio::fs::File) -> reqwest::Body {
    let stream = futures::stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; UPLOAD_CHUNK_BYTES];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            Ok::<Option<(Bytes, tokio::fs::File)>, std::io::Error>(None)
        } else {
            Ok(Some((Bytes::copy_from_slice(&buf[..n]), file)))
        }
    });
    reqwest::Body::wrap_stream(stream)
}

#[cfg(test)]
mod tests {
    use super::check_traversal;

    #[test]
    fn parent_segments_are_rejected() {
        assert!(check_traversal("../etc/passwd").is_err());
        assert!(check_traversal("uploads/../secret.txt").is_err());
        assert!(check_traversal("..").is_err());
    }

    #[test]
    fn dotted_filenames_are_allowed() {
        assert!(check_traversal("report..final.pdf").is_ok());
        assert!(check_traversal("uploads/archive.tar.gz").is_ok());
        assert!(check_traversal("/var/data/file.txt").is_ok());
    }
}
