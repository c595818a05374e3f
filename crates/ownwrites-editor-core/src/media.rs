//! Image bytes to `data:` URIs. Images never leave the client here.

use base64::{Engine, engine::general_purpose::STANDARD};
use mime_sniffer::MimeTypeSniffer;

/// Encode file bytes as a data URI, with the MIME type sniffed from the content.
pub fn data_uri(bytes: &[u8]) -> String {
    let mime_type = bytes.sniff_mime_type().unwrap_or("application/octet-stream");
    data_uri_with_mime(mime_type, bytes)
}

pub fn data_uri_with_mime(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

pub fn is_data_uri(src: &str) -> bool {
    src.starts_with("data:")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    #[test]
    fn test_png_is_sniffed() {
        let uri = data_uri(PNG_HEADER);
        assert!(uri.starts_with("data:image/png;base64,"));
        assert!(is_data_uri(&uri));
    }

    #[test]
    fn test_explicit_mime() {
        assert_eq!(data_uri_with_mime("image/jpeg", b"abc"), "data:image/jpeg;base64,YWJj");
        assert!(!is_data_uri("https://example.com/a.png"));
    }
}
