use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::error::{AppError, AppResult};

pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Checks that `value` is a `data:image/png;base64,...` URI carrying a PNG.
///
/// Consumers treat the image as an opaque blob, so nothing beyond the
/// header is inspected.
pub fn validate_signature(field: &'static str, value: &str) -> AppResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(field, "signature is required"));
    }

    let payload = value
        .strip_prefix(PNG_DATA_URI_PREFIX)
        .ok_or_else(|| AppError::validation(field, "signature must be a PNG data URI"))?;

    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| AppError::validation(field, "signature payload is not valid base64"))?;

    if !bytes.starts_with(&PNG_MAGIC) {
        return Err(AppError::validation(field, "signature payload is not a PNG image"));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn sample_signature() -> String {
    let mut bytes = PNG_MAGIC.to_vec();
    bytes.extend_from_slice(b"\0\0\0\rIHDR");
    format!("{PNG_DATA_URI_PREFIX}{}", STANDARD.encode(bytes))
}
