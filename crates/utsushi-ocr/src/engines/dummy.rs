use utsushi_types::RawImage;

use crate::engine::{OcrEngine, OcrError};

pub const NAME: &str = "Dummy";
pub const DUMMY_TEXT: &str = "Dummy OCR'd Text";

/// Returns fixed text for any image.
pub struct DummyOcr;

#[async_trait::async_trait]
impl OcrEngine for DummyOcr {
    async fn predict(&self, _image: &RawImage) -> Result<String, OcrError> {
        Ok(DUMMY_TEXT.to_string())
    }
}
