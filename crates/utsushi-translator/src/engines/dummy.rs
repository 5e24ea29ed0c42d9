use crate::{TranslateError, Translator};

pub const NAME: &str = "Dummy";
pub const DUMMY_TRANSLATION: &str = "This is dummy translation";

pub struct DummyTranslator;

#[async_trait::async_trait]
impl Translator for DummyTranslator {
    async fn translate(&self, _text: &str) -> Result<String, TranslateError> {
        Ok(DUMMY_TRANSLATION.to_string())
    }
}
