pub mod llm;
pub mod ocr;

pub use llm::LlmClient;
pub use ocr::OcrClient;
