//! Multipart body assembly
//!
//! Encoding is delegated to `reqwest::multipart`; the encoded stream is then
//! collected into a single buffer so the body is complete before sending.

use crate::error::{Error, Result};
use crate::traits::FileAttachment;
use bytes::Bytes;
use http_body_util::BodyExt;
use reqwest::multipart::{Form, Part};

/// Filename reported for every file part.
pub const MULTIPART_FILENAME: &str = "file";

/// An encoded multipart body and the content type carrying its boundary.
#[derive(Debug, Clone)]
pub struct EncodedMultipart {
    /// `multipart/form-data; boundary=...`
    pub content_type: String,
    /// Serialized parts
    pub bytes: Bytes,
}

/// Build the multipart form: one part per file, then one per plain field.
pub fn build_form(files: &[FileAttachment], fields: &[(String, String)]) -> Form {
    let form = files.iter().fold(Form::new(), |form, file| {
        form.part(
            file.field.clone(),
            Part::bytes(file.content.to_vec()).file_name(MULTIPART_FILENAME),
        )
    });
    fields
        .iter()
        .fold(form, |form, (name, value)| form.text(name.clone(), value.clone()))
}

/// Placeholder target for the request the encoder is driven through; never sent.
const ENCODER_URL: &str = "http://localhost/";

/// Encode files and fields into a buffered multipart body.
///
/// Independent of the eventual request URL and method.
pub async fn encode(
    client: &reqwest::Client,
    files: &[FileAttachment],
    fields: &[(String, String)],
) -> Result<EncodedMultipart> {
    let form = build_form(files, fields);
    let content_type = format!("multipart/form-data; boundary={}", form.boundary());

    let mut request = client
        .post(ENCODER_URL)
        .multipart(form)
        .build()
        .map_err(|e| Error::InvalidRequest(format!("cannot build multipart body: {e}")))?;

    let body = request
        .body_mut()
        .take()
        .ok_or_else(|| Error::InvalidRequest("multipart encoder produced no body".into()))?;
    let bytes = body
        .collect()
        .await
        .map_err(|e| Error::InvalidRequest(format!("cannot encode multipart body: {e}")))?
        .to_bytes();

    tracing::trace!("Encoded multipart body of {} bytes", bytes.len());
    Ok(EncodedMultipart {
        content_type,
        bytes,
    })
}
