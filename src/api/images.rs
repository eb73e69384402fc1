//! Inline image intake: data-URL decoding and handoff to the content store.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use thiserror::Error;
use uuid::Uuid;

use super::error::ApiError;
use crate::storage::ImageStore;

#[derive(Debug, Error)]
pub enum DataUrlError {
    #[error("missing MIME type delimiter")]
    MissingMime,
    #[error("missing base64 payload delimiter")]
    MissingPayload,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[derive(Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Decode a `data:<mime>;base64,<payload>` string.
///
/// The file extension is the MIME subtype truncated at `+` (`image/svg+xml`
/// becomes `svg`). Spaces in the payload are restored to `+` first: transport
/// layers that URL-decode the body turn `+` into a space.
pub fn decode_data_url(url: &str) -> Result<DecodedImage, DataUrlError> {
    let colon = url.find(':').ok_or(DataUrlError::MissingMime)?;
    let semi = url.find(';').ok_or(DataUrlError::MissingMime)?;
    if semi <= colon {
        return Err(DataUrlError::MissingMime);
    }

    let mime = &url[colon + 1..semi];
    let subtype = mime.split('/').nth(1).ok_or(DataUrlError::MissingMime)?;
    let extension = subtype.split('+').next().unwrap_or(subtype);
    if extension.is_empty() {
        return Err(DataUrlError::MissingMime);
    }

    let comma = url.find(',').ok_or(DataUrlError::MissingPayload)?;
    let body = url[comma + 1..].replace(' ', "+");
    let bytes = BASE64.decode(body.as_bytes())?;

    Ok(DecodedImage {
        extension: extension.to_string(),
        bytes,
    })
}

/// Decode an inline image and store it under a fresh name in `namespace`,
/// returning the issued URL. Names are never reused, so a replacement can
/// never overwrite the file it replaces.
pub async fn ingest(
    store: &ImageStore,
    namespace: &str,
    data_url: &str,
) -> Result<String, ApiError> {
    let decoded = decode_data_url(data_url).map_err(|e| {
        tracing::debug!(error = %e, "Rejected image payload");
        ApiError::conflict_field("logo_url", "El campo logo no es una imagen válida")
    })?;

    let name = format!("{}.{}", Uuid::new_v4(), decoded.extension);
    store.put(namespace, &name, &decoded.bytes).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to store image");
        ApiError::internal()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_url(mime: &str, bytes: &[u8]) -> String {
        format!("data:{};base64,{}", mime, BASE64.encode(bytes))
    }

    #[test]
    fn test_extension_inference() {
        let png = decode_data_url(&data_url("image/png", b"x")).unwrap();
        assert_eq!(png.extension, "png");

        let jpeg = decode_data_url(&data_url("image/jpeg", b"x")).unwrap();
        assert_eq!(jpeg.extension, "jpeg");

        let svg = decode_data_url(&data_url("image/svg+xml", b"x")).unwrap();
        assert_eq!(svg.extension, "svg");
    }

    #[test]
    fn test_decode_recovers_original_bytes() {
        let original: Vec<u8> = (0u8..=255).collect();
        let decoded = decode_data_url(&data_url("image/png", &original)).unwrap();
        assert_eq!(decoded.bytes, original);
    }

    #[test]
    fn test_spaces_are_restored_to_plus() {
        let bytes = vec![0xfb, 0xef, 0xbe];
        let encoded = BASE64.encode(&bytes);
        assert!(encoded.contains('+'));

        let mangled = format!("data:image/png;base64,{}", encoded.replace('+', " "));
        let decoded = decode_data_url(&mangled).unwrap();
        assert_eq!(decoded.bytes, bytes);
    }

    #[test]
    fn test_malformed_inputs_are_rejected() {
        assert!(decode_data_url("").is_err());
        assert!(decode_data_url("not a data url").is_err());
        assert!(decode_data_url("data:image/png;base64").is_err());
        assert!(decode_data_url("data:image/png;base64,!!!").is_err());
    }

    #[tokio::test]
    async fn test_ingest_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().to_path_buf());
        let original = b"fake png bytes".to_vec();

        let url = ingest(&store, "imagen-empresa", &data_url("image/png", &original))
            .await
            .unwrap();
        assert!(url.starts_with("img/imagen-empresa/"));
        assert!(url.ends_with(".png"));

        let stored = store.read_by_url("imagen-empresa", &url).await.unwrap();
        assert_eq!(stored, original);
    }

    #[tokio::test]
    async fn test_ingest_generates_fresh_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().to_path_buf());
        let payload = data_url("image/png", b"same bytes");

        let first = ingest(&store, "imagen-empresa", &payload).await.unwrap();
        let second = ingest(&store, "imagen-empresa", &payload).await.unwrap();
        assert_ne!(first, second);
    }
}
