pub mod db;
pub mod hf_summarizer;
pub mod openai_summarizer;
pub mod pdf;

pub use db::DbAdapter;
pub use hf_summarizer::HuggingFaceSummarizer;
pub use openai_summarizer::OpenAiSummarizer;
pub use pdf::LopdfExtractor;
