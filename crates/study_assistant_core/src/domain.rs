//! crates/study_assistant_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or transport format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::ports::{PortError, PortResult};

/// An anonymous browser session. Every document and generated artifact is
/// owned by the session that created it.
#[derive(Debug, Clone)]
pub struct BrowserSession {
    pub id: Uuid,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub is_active: bool,
}

/// An uploaded PDF. Immutable after creation apart from the access
/// timestamp and the soft-delete flag.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub session_id: Uuid,
    pub original_filename: String,
    pub stored_filename: String,
    pub file_path: PathBuf,
    pub file_size: i64,
    pub page_count: u32,
    pub uploaded_at: DateTime<Utc>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
}

/// The fields a caller supplies when registering a freshly stored upload.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub session_id: Uuid,
    pub original_filename: String,
    pub stored_filename: String,
    pub file_path: PathBuf,
    pub file_size: i64,
    pub page_count: u32,
}

/// An inclusive, 1-indexed page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRange {
    start: u32,
    end: u32,
}

impl PageRange {
    /// Validates the shape of a range. Whether it fits a particular document
    /// is checked separately with [`PageRange::ensure_within`].
    pub fn new(start: i64, end: i64) -> PortResult<Self> {
        if start < 1 || end < start || end > i64::from(u32::MAX) {
            return Err(PortError::InvalidRange {
                start,
                end,
                reason: "start page must be at least 1 and end page must not precede it"
                    .to_string(),
            });
        }
        Ok(Self {
            start: start as u32,
            end: end as u32,
        })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn pages(&self) -> std::ops::RangeInclusive<u32> {
        self.start..=self.end
    }

    pub fn ensure_within(&self, page_count: u32) -> PortResult<()> {
        if self.end > page_count {
            return Err(PortError::InvalidRange {
                start: i64::from(self.start),
                end: i64::from(self.end),
                reason: format!(
                    "end page {} exceeds document pages {}",
                    self.end, page_count
                ),
            });
        }
        Ok(())
    }
}

/// Formats as `start-end`, the form stored alongside generated content.
impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A cached extraction, keyed by the exact `(document_id, range)` pair.
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub document_id: Uuid,
    pub range: PageRange,
    pub content: String,
    pub extraction_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// What kind of study material a generated record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Summary,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Summary => "summary",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "summary" => Some(ContentKind::Summary),
            _ => None,
        }
    }
}

/// The stored output of a summary generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryPayload {
    pub summary: String,
    pub pages: String,
    pub academic_level: String,
}

/// A generated study artifact. Written once, never mutated.
#[derive(Debug, Clone)]
pub struct GeneratedContent {
    pub id: Uuid,
    pub session_id: Uuid,
    pub document_id: Uuid,
    pub kind: ContentKind,
    pub academic_level: String,
    pub input_pages: String,
    pub output: SummaryPayload,
    pub model: String,
    pub generation_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// A generated artifact before the store assigns its id and timestamp.
#[derive(Debug, Clone)]
pub struct NewGeneratedContent {
    pub session_id: Uuid,
    pub document_id: Uuid,
    pub kind: ContentKind,
    pub academic_level: String,
    pub input_pages: String,
    pub output: SummaryPayload,
    pub model: String,
    pub generation_ms: u64,
}
