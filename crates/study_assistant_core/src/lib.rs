pub mod chunking;
pub mod documents;
pub mod domain;
pub mod extraction;
pub mod normalizer;
pub mod ports;
pub mod prompt;
pub mod summarizer;

pub use documents::{DocumentService, StoredUpload};
pub use domain::{
    BrowserSession, ContentKind, Document, ExtractedContent, GeneratedContent, NewDocument,
    NewGeneratedContent, PageRange, SummaryPayload,
};
pub use extraction::{Extraction, ExtractionCache};
pub use ports::{
    DatabaseService, GenerationParams, GenerationRequest, PageTextExtractor, PortError,
    PortResult, SummarizationBackend,
};
pub use summarizer::{SummaryOutcome, SummaryRequest, SummaryService, SummarySettings};
