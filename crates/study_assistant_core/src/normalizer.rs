//! crates/study_assistant_core/src/normalizer.rs
//!
//! Repairs the artifacts PDF text extraction leaves behind.
//!
//! The repairs are an ordered table of regex rules applied to each page on its
//! own, so no rule can match across a `--- Page N ---` marker. Order matters:
//! the stray-character repairs run before URL stripping because URLs
//! themselves can contain the stray-character pattern.

use regex::Regex;
use std::sync::LazyLock;

/// One `(pattern, replacement)` step of the pipeline.
pub struct RepairRule {
    pub name: &'static str,
    pattern: Regex,
    replacement: &'static str,
}

impl RepairRule {
    fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("repair rule pattern must compile"),
            replacement,
        }
    }

    pub fn apply(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, self.replacement)
            .into_owned()
    }
}

static PAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-{3}\s*Page\s+(\d+)\s*-{3}").expect("page marker pattern must compile")
});

static RULES: LazyLock<Vec<RepairRule>> = LazyLock::new(|| {
    vec![
        // "nationsiAnd" -> "nations And"
        RepairRule::new("stray_before_capital", r"([a-z])i([A-Z])", "$1 $2"),
        // "Spanishiforce" -> "Spanish force". 'n' is excluded so "-ishing" words survive.
        RepairRule::new(
            "fused_nish",
            r"(nish)i([bcdfghjklmpqrstvwxyz])",
            "$1 $2",
        ),
        // "Cortésihoped" -> "Cortés hoped"
        RepairRule::new(
            "fused_accented_s",
            r"([éáíóúàèìòùñ]s)i([bcdfghjklmnpqrstvwxyz])",
            "$1 $2",
        ),
        RepairRule::new(
            "stray_after_sentence_end",
            r"([a-z])\.i([A-Z])",
            "$1. $2",
        ),
        RepairRule::new("stray_after_separator", r"([,;:])i([A-Z])", "$1 $2"),
        // "andi " -> "and "
        RepairRule::new(
            "stray_after_short_word",
            r"\b(the|and|to|of|in|for|with|from)i\s",
            "$1 ",
        ),
        // "timid,malleable" -> "timid, malleable"
        RepairRule::new("space_after_comma", r"([a-z]),([a-z])", "$1, $2"),
        RepairRule::new(
            "call_to_action_link",
            r"\b(?:Explore|Visit|Check out|See)\s[^.!?]*?https?://[^\s)]+\)?[^.!?]*[.!?]?",
            "",
        ),
        RepairRule::new("parenthesized_url", r"\(\s*https?://[^)]*\)", ""),
        RepairRule::new("bare_url", r"https?://[^\s)]+", ""),
        RepairRule::new("figure_reference", r"FIGURE\s*\d+\.\d+", ""),
        RepairRule::new("collapse_whitespace", r"\s+", " "),
        RepairRule::new("space_before_punctuation", r"\s([.,;:])", "$1"),
    ]
});

/// The rule table in evaluation order.
pub fn rules() -> &'static [RepairRule] {
    &RULES
}

/// Runs the full repair pipeline over `raw`.
///
/// Text is split at `--- Page N ---` markers and every page is repaired
/// separately. Markers are rewritten in canonical form; a page that repairs
/// down to nothing loses its marker too, so text holding no readable page
/// normalizes to the empty string.
pub fn normalize(raw: &str) -> String {
    let mut pages: Vec<String> = Vec::new();
    let mut marker: Option<&str> = None;
    let mut last = 0;
    for caps in PAGE_MARKER.captures_iter(raw) {
        let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_page(&mut pages, marker, &raw[last..whole.start()]);
        marker = Some(number.as_str());
        last = whole.end();
    }
    push_page(&mut pages, marker, &raw[last..]);
    pages.join(" ")
}

fn push_page(pages: &mut Vec<String>, marker: Option<&str>, body: &str) {
    let body = repair(body);
    if body.is_empty() {
        return;
    }
    match marker {
        Some(number) => pages.push(format!("--- Page {} --- {}", number, body)),
        None => pages.push(body),
    }
}

/// Re-runs the rule table until the text stops changing.
///
/// One pass is not always enough: a rule can expose a match for an earlier
/// one (e.g. "a ,b" only becomes "a, b" on the second pass). Every rule but
/// `space_after_comma` never lengthens the text, and that one fires at most
/// once per comma, so the loop terminates.
fn repair(text: &str) -> String {
    let mut current = run_once(text);
    loop {
        let next = run_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn run_once(text: &str) -> String {
    let repaired = RULES
        .iter()
        .fold(text.to_string(), |acc, rule| rule.apply(&acc));
    repaired.trim().to_string()
}
