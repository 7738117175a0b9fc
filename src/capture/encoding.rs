//! Encoded image payloads.
//!
//! Captures travel through the session as data URLs
//! (`data:image/jpeg;base64,...`). Formats the `image` crate can read are
//! identified from their content and fully decoded once, so corrupt input is
//! rejected at capture time. Other `image/*` content (HEIC, AVIF, ...) passes
//! through opaquely under its media type for the identification service.

use base64::{engine::general_purpose::STANDARD, Engine};
use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// An image payload in data-URL form.
///
/// Construction always validates the payload. `format` is set when the
/// content was decoded locally and `None` for pass-through media types.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EncodedImage {
    media_type: String,
    format: Option<ImageFormat>,
    dimensions: Option<(u32, u32)>,
    data_url: String,
}

impl EncodedImage {
    /// Encode raw file bytes, identifying the format from the content.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CaptureError> {
        Self::encode(bytes, None)
    }

    /// Encode file bytes labelled with the media type reported by the file
    /// picker. The label only matters when the content is not readable here.
    pub fn from_bytes_with_type(bytes: &[u8], media_type: &str) -> Result<Self, CaptureError> {
        let declared = normalize_media_type(media_type);
        Self::encode(bytes, Some(declared.as_str()).filter(|m| !m.is_empty()))
    }

    /// Accept an existing `data:<mime>[;param]*;base64,<payload>` string.
    pub fn from_data_url(data_url: &str) -> Result<Self, CaptureError> {
        let rest = data_url
            .trim()
            .strip_prefix(DATA_URL_PREFIX)
            .ok_or_else(|| CaptureError::decode("not a data URL"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| CaptureError::decode("data URL has no payload"))?;

        let mut params = header.split(';');
        let declared = params.next().map(normalize_media_type).unwrap_or_default();
        if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
            return Err(CaptureError::decode("data URL is not base64 encoded"));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| CaptureError::decode(format!("invalid base64 payload: {e}")))?;
        Self::encode(&bytes, Some(declared.as_str()).filter(|m| !m.is_empty()))
    }

    fn encode(bytes: &[u8], declared: Option<&str>) -> Result<Self, CaptureError> {
        let identified = identify(bytes, declared)?;
        let data_url = format!(
            "{}{}{}{}",
            DATA_URL_PREFIX,
            identified.media_type,
            BASE64_MARKER,
            STANDARD.encode(bytes)
        );
        Ok(Self {
            media_type: identified.media_type,
            format: identified.format,
            dimensions: identified.dimensions,
            data_url,
        })
    }

    /// Locally decoded format; `None` for pass-through content.
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Width and height, known for decoded formats only.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    /// File extension for upload part names.
    pub fn extension(&self) -> &str {
        if let Some(ext) = self.format.and_then(|f| f.extensions_str().first().copied()) {
            return ext;
        }
        let subtype = self
            .media_type
            .split_once('/')
            .map(|(_, subtype)| subtype)
            .unwrap_or_default();
        let subtype = subtype.split(['+', ';']).next().unwrap_or_default();
        if !subtype.is_empty()
            && subtype
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            subtype
        } else {
            "bin"
        }
    }

    pub fn as_data_url(&self) -> &str {
        &self.data_url
    }

    /// Binary content, for multipart upload.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Validated at construction.
        STANDARD.decode(self.payload()).unwrap_or_default()
    }

    /// Size of the decoded content in bytes, without decoding.
    pub fn byte_len(&self) -> usize {
        let payload = self.payload();
        let padding = payload.bytes().rev().take_while(|b| *b == b'=').count();
        (payload.len() / 4) * 3 - padding
    }

    fn payload(&self) -> &str {
        self.data_url
            .split_once(BASE64_MARKER)
            .map(|(_, payload)| payload)
            .unwrap_or_default()
    }
}

struct Identified {
    media_type: String,
    format: Option<ImageFormat>,
    dimensions: Option<(u32, u32)>,
}

impl Identified {
    fn opaque(media_type: &str) -> Self {
        Self {
            media_type: media_type.to_string(),
            format: None,
            dimensions: None,
        }
    }
}

fn identify(bytes: &[u8], declared: Option<&str>) -> Result<Identified, CaptureError> {
    if bytes.is_empty() {
        return Err(CaptureError::decode("capture input is empty"));
    }

    if let Ok(format) = image::guess_format(bytes) {
        if !format.reading_enabled() {
            return Ok(Identified::opaque(format.to_mime_type()));
        }
        let decoded = image::load_from_memory_with_format(bytes, format).map_err(|e| {
            CaptureError::decode(format!("{} content does not decode: {e}", format.to_mime_type()))
        })?;
        return Ok(Identified {
            media_type: format.to_mime_type().to_string(),
            format: Some(format),
            dimensions: Some((decoded.width(), decoded.height())),
        });
    }

    if let Some(media_type) = heif_media_type(bytes) {
        return Ok(Identified::opaque(media_type));
    }

    match declared {
        Some(mime) if is_pass_through(mime) => Ok(Identified::opaque(mime)),
        Some(mime) if mime.starts_with("image/") => Err(CaptureError::decode(format!(
            "content is not a valid {mime} image"
        ))),
        _ => Err(CaptureError::decode("unrecognised image format")),
    }
}

/// `image/*` types this crate cannot decode; trusted on the label alone.
fn is_pass_through(mime: &str) -> bool {
    mime.starts_with("image/")
        && !ImageFormat::from_mime_type(mime).is_some_and(|f| f.reading_enabled())
}

/// HEIF/HEIC containers, identified by their ISO-BMFF `ftyp` brand.
fn heif_media_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.get(4..8)? != b"ftyp" {
        return None;
    }
    match bytes.get(8..12)? {
        b"heic" | b"heix" | b"heim" | b"heis" | b"hevc" | b"hevx" => Some("image/heic"),
        b"mif1" | b"msf1" | b"heif" => Some("image/heif"),
        _ => None,
    }
}

fn normalize_media_type(raw: &str) -> String {
    let mime = raw.trim().to_ascii_lowercase();
    match mime.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => mime,
    }
}

impl std::fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedImage")
            .field("media_type", &self.media_type)
            .field("format", &self.format)
            .field("dimensions", &self.dimensions)
            .field("bytes", &self.byte_len())
            .finish()
    }
}

impl TryFrom<String> for EncodedImage {
    type Error = CaptureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_data_url(&value)
    }
}

impl From<EncodedImage> for String {
    fn from(value: EncodedImage) -> Self {
        value.data_url
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    /// A real, decodable image `tag + 1` pixels wide.
    pub(crate) fn encoded_as(tag: u8, format: ImageFormat) -> Vec<u8> {
        let pixels = image::RgbImage::from_pixel(
            u32::from(tag) + 1,
            1,
            image::Rgb([tag, tag.wrapping_mul(7), 255 - tag]),
        );
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(pixels)
            .write_to(&mut out, format)
            .unwrap();
        out.into_inner()
    }

    pub(crate) fn jpeg_bytes(tag: u8) -> Vec<u8> {
        encoded_as(tag, ImageFormat::Jpeg)
    }

    pub(crate) fn png_bytes(tag: u8) -> Vec<u8> {
        encoded_as(tag, ImageFormat::Png)
    }

    fn heic_bytes() -> Vec<u8> {
        let mut bytes = b"\0\0\0\x18ftypheic\0\0\0\0mif1heic".to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        bytes
    }

    fn data_url(mime_and_params: &str, bytes: &[u8]) -> String {
        format!("data:{mime_and_params};base64,{}", STANDARD.encode(bytes))
    }

    #[test]
    fn test_from_bytes_decodes_content() {
        let image = EncodedImage::from_bytes(&jpeg_bytes(7)).unwrap();
        assert_eq!(image.format(), Some(ImageFormat::Jpeg));
        assert_eq!(image.media_type(), "image/jpeg");
        assert_eq!(image.extension(), "jpg");
        assert_eq!(image.dimensions(), Some((8, 1)));
        assert!(image.as_data_url().starts_with("data:image/jpeg;base64,"));
        assert_eq!(image.to_bytes(), jpeg_bytes(7));
        assert_eq!(image.byte_len(), jpeg_bytes(7).len());
    }

    #[test]
    fn test_tiff_is_accepted() {
        let image = EncodedImage::from_bytes(&encoded_as(3, ImageFormat::Tiff)).unwrap();
        assert_eq!(image.format(), Some(ImageFormat::Tiff));
        assert_eq!(image.media_type(), "image/tiff");
    }

    #[test]
    fn test_corrupt_content_is_rejected() {
        let truncated_jpeg = {
            let bytes = jpeg_bytes(4);
            bytes[..bytes.len() / 2].to_vec()
        };
        for input in [
            Vec::new(),
            b"definitely not an image".to_vec(),
            b"BM this is a plain text note".to_vec(),
            vec![0xFF, 0xD8, 0xFF],
            truncated_jpeg,
        ] {
            assert!(
                matches!(
                    EncodedImage::from_bytes(&input),
                    Err(CaptureError::Decode { .. })
                ),
                "accepted {input:?}"
            );
        }
    }

    #[test]
    fn test_heic_passes_through() {
        let image = EncodedImage::from_bytes(&heic_bytes()).unwrap();
        assert_eq!(image.format(), None);
        assert_eq!(image.media_type(), "image/heic");
        assert_eq!(image.extension(), "heic");
        assert_eq!(image.dimensions(), None);
        assert_eq!(image.to_bytes(), heic_bytes());
    }

    #[test]
    fn test_labelled_unknown_image_passes_through() {
        let image = EncodedImage::from_bytes_with_type(b"opaque raster", "image/x-custom").unwrap();
        assert_eq!(image.media_type(), "image/x-custom");
        assert_eq!(image.extension(), "x-custom");

        // A label naming a decodable format does not excuse corrupt content
        assert!(EncodedImage::from_bytes_with_type(b"opaque raster", "image/png").is_err());
        assert!(EncodedImage::from_bytes_with_type(b"opaque raster", "text/plain").is_err());
    }

    #[test]
    fn test_from_data_url_round_trip() {
        let original = EncodedImage::from_bytes(&png_bytes(3)).unwrap();
        let parsed = EncodedImage::from_data_url(original.as_data_url()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_from_data_url_accepts_parameters_and_generic_labels() {
        let jpeg = jpeg_bytes(5);
        let expected = EncodedImage::from_bytes(&jpeg).unwrap();

        for header in [
            "image/jpeg;charset=utf-8",
            "image/JPG",
            "application/octet-stream",
            "image/png",
        ] {
            let parsed = EncodedImage::from_data_url(&data_url(header, &jpeg)).unwrap();
            assert_eq!(parsed, expected, "header {header}");
        }

        let heic = EncodedImage::from_data_url(&data_url("image/heic", b"ftyp-less heic")).unwrap();
        assert_eq!(heic.media_type(), "image/heic");
    }

    #[test]
    fn test_from_data_url_rejects_corrupt_input() {
        assert!(EncodedImage::from_data_url("image/png;base64,AAAA").is_err());
        assert!(EncodedImage::from_data_url("data:image/png,rawtext").is_err());
        assert!(EncodedImage::from_data_url("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(EncodedImage::from_data_url("data:image/png;base64,!!!notbase64").is_err());
        assert!(EncodedImage::from_data_url(&data_url("image/jpeg", &[0xFF, 0xD8, 0xFF])).is_err());
    }

    #[test]
    fn test_debug_omits_payload() {
        let image = EncodedImage::from_bytes(&jpeg_bytes(9)).unwrap();
        let rendered = format!("{image:?}");
        assert!(rendered.contains("Jpeg"));
        assert!(!rendered.contains("base64"));
    }
}
