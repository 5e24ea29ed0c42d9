use image::{ExtendedColorType, ImageEncoder, codecs::png::PngEncoder};
use utsushi_core::http::HttpError;
use utsushi_core::{EngineError, EngineRegistry};
use utsushi_types::RawImage;

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("image is empty ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("image buffer has {actual} bytes, expected {expected}")]
    InvalidBuffer { expected: usize, actual: usize },

    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(#[from] HttpError),

    #[error("response contained no text")]
    EmptyResponse,

    #[error("recognition failed: {0}")]
    Recognition(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Text recognition over a captured region.
#[async_trait::async_trait]
pub trait OcrEngine: Send + Sync {
    async fn predict(&self, image: &RawImage) -> Result<String, OcrError>;
}

pub type BoxedOcrEngine = Box<dyn OcrEngine>;
pub type OcrRegistry = EngineRegistry<BoxedOcrEngine>;

pub(crate) fn ensure_image(image: &RawImage) -> Result<(), OcrError> {
    if image.width == 0 || image.height == 0 {
        return Err(OcrError::EmptyImage {
            width: image.width,
            height: image.height,
        });
    }
    let expected = image.width as usize * image.height as usize * RawImage::CHANNELS;
    if image.data.len() != expected {
        return Err(OcrError::InvalidBuffer {
            expected,
            actual: image.data.len(),
        });
    }
    Ok(())
}

pub(crate) fn encode_png(image: &RawImage) -> Result<Vec<u8>, OcrError> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer).write_image(
        &image.data,
        image.width,
        image.height,
        ExtendedColorType::Rgba8,
    )?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn backend_failures_share_the_http_mapping() {
        let err = OcrError::from(HttpError::from_status(StatusCode::BAD_REQUEST, "bad image".into()));
        assert_eq!(err.to_string(), "API error: 400 Bad Request: bad image");

        let err = OcrError::from(HttpError::from_status(StatusCode::UNAUTHORIZED, String::new()));
        assert!(matches!(err, OcrError::Api(HttpError::Unauthorized(_))));
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        let image = RawImage {
            width: 2,
            height: 2,
            data: vec![0; 3],
        };
        assert!(matches!(
            ensure_image(&image),
            Err(OcrError::InvalidBuffer { expected: 16, actual: 3 })
        ));
    }

    #[test]
    fn encode_png_writes_png_signature() {
        let png = encode_png(&RawImage::blank(4, 3)).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
