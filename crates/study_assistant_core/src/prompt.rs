//! crates/study_assistant_core/src/prompt.rs
//!
//! Builds the instruction-prefixed prompt sent to the summarizer.

/// The reader the summary is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudienceLevel {
    HighSchool,
    Undergraduate,
    Graduate,
    /// Any unrecognised or empty level.
    General,
}

impl AudienceLevel {
    pub fn parse(value: &str) -> Self {
        match value {
            "high_school" => AudienceLevel::HighSchool,
            "undergraduate" => AudienceLevel::Undergraduate,
            "graduate" => AudienceLevel::Graduate,
            _ => AudienceLevel::General,
        }
    }

    /// The instruction placed ahead of the text. Each ends with a space.
    pub fn instruction(&self) -> &'static str {
        match self {
            AudienceLevel::HighSchool => "Summarize this textbook content for high school students. Use clear, plain language and focus on the main events, key people and important dates. Explain cause and effect. Ignore citations and web references. ",
            AudienceLevel::Undergraduate => "Summarize this textbook content for undergraduate college students. Focus on key concepts, significant events and figures, and their impact, including the context that connects them. Ignore citations and web references. ",
            AudienceLevel::Graduate => "Summarize this textbook content for graduate students. Emphasize analytical perspectives, scholarly significance and the complex relationships between events and themes. Ignore citations and web references. ",
            AudienceLevel::General => "Summarize this educational textbook content. Focus on key concepts, events and important facts, keeping the summary accurate and clear. Ignore citations and web references. ",
        }
    }
}

/// Prefixes `text` with the instruction for `academic_level`.
pub fn build_prompt(text: &str, academic_level: &str) -> String {
    let instruction = AudienceLevel::parse(academic_level).instruction();
    let mut prompt = String::with_capacity(instruction.len() + text.len());
    prompt.push_str(instruction);
    prompt.push_str(text);
    prompt
}
