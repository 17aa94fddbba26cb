use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// An uploaded image: format, pixel metrics and a BLAKE3 digest of the bytes.
///
/// The bytes themselves are never serialized; stores persist them separately and
/// rehydrate with [`ImageRef::with_data`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub format: ImageFormat,
    pub width_px: u32,
    pub height_px: u32,
    pub components: u8,
    pub digest: String,
    #[serde(skip)]
    data: Arc<Vec<u8>>,
}

impl ImageRef {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, DomainError> {
        let probe = probe(&bytes)?;
        Ok(Self {
            format: probe.format,
            width_px: probe.width,
            height_px: probe.height,
            components: probe.components,
            digest: blake3::hash(&bytes).to_hex().to_string(),
            data: Arc::new(bytes),
        })
    }

    /// Reattaches bytes to metadata loaded from a snapshot, checking the digest.
    pub fn with_data(mut self, bytes: Vec<u8>) -> Result<Self, DomainError> {
        let digest = blake3::hash(&bytes).to_hex().to_string();
        if digest != self.digest {
            return Err(DomainError::invalid_input(format!(
                "image bytes do not match digest {}",
                self.digest
            )));
        }
        self.data = Arc::new(bytes);
        Ok(self)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    /// Height over width.
    pub fn aspect_ratio(&self) -> f32 {
        self.height_px as f32 / self.width_px.max(1) as f32
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.digest, self.format.extension())
    }

    /// The stream payload and dictionary entries needed to embed this image.
    pub fn embedding(&self) -> Result<ImageEmbedding, DomainError> {
        match self.format {
            ImageFormat::Jpeg => Ok(ImageEmbedding {
                color_space: color_space(self.components)?,
                filter: "DCTDecode",
                decode_parms: None,
                stream: self.data.as_ref().clone(),
            }),
            ImageFormat::Png => {
                let stream = png_idat(&self.data)?;
                Ok(ImageEmbedding {
                    color_space: color_space(self.components)?,
                    filter: "FlateDecode",
                    decode_parms: Some(format!(
                        "<< /Predictor 15 /Colors {} /BitsPerComponent 8 /Columns {} >>",
                        self.components, self.width_px
                    )),
                    stream,
                })
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageEmbedding {
    pub color_space: &'static str,
    pub filter: &'static str,
    pub decode_parms: Option<String>,
    pub stream: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageProbe {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub components: u8,
}

pub fn probe(bytes: &[u8]) -> Result<ImageProbe, DomainError> {
    let probe = if bytes.starts_with(&[0xFF, 0xD8]) {
        probe_jpeg(bytes)?
    } else if bytes.starts_with(&PNG_SIGNATURE) {
        probe_png(bytes)?
    } else {
        return Err(DomainError::invalid_input("image must be a JPEG or PNG file"));
    };
    if probe.width == 0 || probe.height == 0 {
        return Err(DomainError::invalid_input("image has zero width or height"));
    }
    Ok(probe)
}

fn color_space(components: u8) -> Result<&'static str, DomainError> {
    match components {
        1 => Ok("/DeviceGray"),
        3 => Ok("/DeviceRGB"),
        4 => Ok("/DeviceCMYK"),
        other => Err(DomainError::invalid_input(format!(
            "unsupported image colour component count {other}"
        ))),
    }
}

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_be_bytes([*bytes.get(at)?, *bytes.get(at + 1)?]))
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let slice = bytes.get(at..at + 4)?;
    Some(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

fn probe_jpeg(bytes: &[u8]) -> Result<ImageProbe, DomainError> {
    let truncated = || DomainError::invalid_input("JPEG data is truncated");
    let mut cursor = 2;
    loop {
        while bytes.get(cursor) == Some(&0xFF) {
            cursor += 1;
        }
        let marker = *bytes.get(cursor).ok_or_else(truncated)?;
        cursor += 1;
        match marker {
            0xD8 | 0x01 | 0xD0..=0xD7 => continue,
            0xD9 | 0xDA => {
                return Err(DomainError::invalid_input("JPEG has no frame header"));
            }
            _ => {}
        }
        let length = read_u16(bytes, cursor).ok_or_else(truncated)? as usize;
        let is_frame = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_frame {
            let height = read_u16(bytes, cursor + 3).ok_or_else(truncated)?;
            let width = read_u16(bytes, cursor + 5).ok_or_else(truncated)?;
            let components = *bytes.get(cursor + 7).ok_or_else(truncated)?;
            color_space(components)?;
            return Ok(ImageProbe {
                format: ImageFormat::Jpeg,
                width: u32::from(width),
                height: u32::from(height),
                components,
            });
        }
        if length < 2 {
            return Err(truncated());
        }
        cursor += length;
    }
}

fn probe_png(bytes: &[u8]) -> Result<ImageProbe, DomainError> {
    let truncated = || DomainError::invalid_input("PNG data is truncated");
    if bytes.get(12..16) != Some(b"IHDR".as_slice()) {
        return Err(DomainError::invalid_input("PNG is missing its IHDR chunk"));
    }
    let width = read_u32(bytes, 16).ok_or_else(truncated)?;
    let height = read_u32(bytes, 20).ok_or_else(truncated)?;
    let bit_depth = *bytes.get(24).ok_or_else(truncated)?;
    let color_type = *bytes.get(25).ok_or_else(truncated)?;
    let interlace = *bytes.get(28).ok_or_else(truncated)?;

    let components = match color_type {
        0 => 1,
        2 => 3,
        _ => {
            return Err(DomainError::invalid_input(
                "only greyscale and RGB PNG images without alpha are supported",
            ));
        }
    };
    if bit_depth != 8 {
        return Err(DomainError::invalid_input("only 8-bit PNG images are supported"));
    }
    if interlace != 0 {
        return Err(DomainError::invalid_input("interlaced PNG images are not supported"));
    }

    Ok(ImageProbe { format: ImageFormat::Png, width, height, components })
}

/// Concatenated IDAT payloads, i.e. the zlib stream PDF can consume directly.
fn png_idat(bytes: &[u8]) -> Result<Vec<u8>, DomainError> {
    let truncated = || DomainError::invalid_input("PNG data is truncated");
    let mut cursor = PNG_SIGNATURE.len();
    let mut data = Vec::new();
    while cursor < bytes.len() {
        let length = read_u32(bytes, cursor).ok_or_else(truncated)? as usize;
        let kind = bytes.get(cursor + 4..cursor + 8).ok_or_else(truncated)?;
        let body = bytes.get(cursor + 8..cursor + 8 + length).ok_or_else(truncated)?;
        match kind {
            b"IDAT" => data.extend_from_slice(body),
            b"IEND" => break,
            _ => {}
        }
        cursor += 12 + length;
    }
    if data.is_empty() {
        return Err(DomainError::invalid_input("PNG has no image data"));
    }
    Ok(data)
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// A 2x1 RGB PNG (red, blue) with a stored (uncompressed) zlib stream.
    pub fn tiny_png() -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        let mut ihdr = Vec::new();
        ihdr.extend_from_slice(&2u32.to_be_bytes());
        ihdr.extend_from_slice(&1u32.to_be_bytes());
        ihdr.extend_from_slice(&[8, 2, 0, 0, 0]);
        push_chunk(&mut bytes, b"IHDR", &ihdr);
        let raw = [0u8, 255, 0, 0, 0, 0, 255];
        let mut zlib = vec![0x78, 0x01, 0x01, raw.len() as u8, 0x00, !(raw.len() as u8), 0xFF];
        zlib.extend_from_slice(&raw);
        zlib.extend_from_slice(&[0, 0, 0, 0]);
        push_chunk(&mut bytes, b"IDAT", &zlib);
        push_chunk(&mut bytes, b"IEND", &[]);
        bytes
    }

    /// Minimal JPEG header stream: SOI, an APP0 segment and a baseline SOF0 frame.
    pub fn tiny_jpeg(width: u16, height: u16) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x4A, 0x46];
        bytes.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&[0x03, 1, 0x22, 0, 2, 0x11, 1, 3, 0x11, 1]);
        bytes.extend_from_slice(&[0xFF, 0xD9]);
        bytes
    }

    fn push_chunk(bytes: &mut Vec<u8>, kind: &[u8; 4], body: &[u8]) {
        bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
        bytes.extend_from_slice(kind);
        bytes.extend_from_slice(body);
        // CRC is not checked by the prober or by PDF readers of the IDAT stream.
        bytes.extend_from_slice(&[0, 0, 0, 0]);
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{tiny_jpeg, tiny_png};
    use super::{probe, ImageFormat, ImageRef};

    #[test]
    fn jpeg_dimensions_are_read_from_the_frame_header() {
        let image = ImageRef::from_bytes(tiny_jpeg(640, 480)).expect("valid jpeg");
        assert_eq!(image.format, ImageFormat::Jpeg);
        assert_eq!((image.width_px, image.height_px), (640, 480));
        assert_eq!(image.components, 3);
        assert!((image.aspect_ratio() - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn png_dimensions_and_idat_are_extracted() {
        let image = ImageRef::from_bytes(tiny_png()).expect("valid png");
        assert_eq!(image.format, ImageFormat::Png);
        assert_eq!((image.width_px, image.height_px), (2, 1));

        let embedding = image.embedding().expect("embeddable");
        assert_eq!(embedding.filter, "FlateDecode");
        assert_eq!(embedding.color_space, "/DeviceRGB");
        assert!(embedding.decode_parms.as_deref().is_some_and(|parms| parms.contains("/Columns 2")));
        assert_eq!(embedding.stream.first(), Some(&0x78));
    }

    #[test]
    fn unknown_formats_are_rejected() {
        assert!(probe(b"GIF89a....").is_err());
        assert!(probe(&[]).is_err());
    }

    #[test]
    fn alpha_png_is_rejected() {
        let mut bytes = tiny_png();
        bytes[25] = 6;
        assert!(ImageRef::from_bytes(bytes).is_err());
    }

    #[test]
    fn rehydration_checks_the_digest() {
        let image = ImageRef::from_bytes(tiny_jpeg(10, 10)).expect("valid jpeg");
        let json = serde_json::to_string(&image).expect("serialize");
        let restored: ImageRef = serde_json::from_str(&json).expect("deserialize");
        assert!(!restored.has_data());

        assert!(restored.clone().with_data(tiny_png()).is_err());
        let rehydrated = restored.with_data(tiny_jpeg(10, 10)).expect("same bytes");
        assert_eq!(rehydrated, image);
    }
}
