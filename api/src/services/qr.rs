//! Renders attendance QR images.
//!
//! The image encodes the session payload JSON as its literal content, so a
//! scanner produces exactly the string the mark endpoint expects back.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use qrcode::QrCode;
use qrcode::render::svg;

/// Renders `payload_json` as an SVG QR image wrapped in a data URL,
/// suitable for direct use as an `<img src>`.
pub fn payload_data_url(payload_json: &str) -> Result<String, qrcode::types::QrError> {
    let code = QrCode::new(payload_json.as_bytes())?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(240, 240)
        .build();
    Ok(format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(image.as_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_svg_data_url() {
        let url = payload_data_url(r#"{"eventId":"1","token":"abc","type":"attendance"}"#).unwrap();
        assert!(url.starts_with("data:image/svg+xml;base64,"));

        let encoded = url.trim_start_matches("data:image/svg+xml;base64,");
        let bytes = STANDARD.decode(encoded).unwrap();
        let svg = String::from_utf8(bytes).unwrap();
        assert!(svg.contains("<svg"));
    }
}
