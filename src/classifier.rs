//! Ingredient text segmentation and non-vegan keyword flagging.
//!
//! This is a heuristic. Ingredient lists are split on `,`, `;` and `.` only, so
//! parenthetical sub-lists are not kept together with their parent term.

use std::sync::LazyLock;

use regex::Regex;

use crate::keywords::KeywordSet;

/// Label prefixes removed before segmentation. Only the first occurrence of
/// each is removed.
static LABEL_PREFIXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["ingredients:", "contains:", "may contain:", "allergens:"]
        .iter()
        .map(|label| Regex::new(&format!("(?i){}", regex::escape(label))).expect("valid label"))
        .collect()
});

const DELIMITERS: &[char] = &[',', ';', '.'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientSegment {
    /// Segment as it appears in the source text, trimmed.
    pub display_text: String,
    pub flagged: bool,
    /// Keyword that caused the flag.
    pub matched_keyword: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No ingredient text, or nothing left after segmentation.
    Unparseable,
    Parsed(Vec<IngredientSegment>),
}

impl Classification {
    pub fn segments(&self) -> &[IngredientSegment] {
        match self {
            Classification::Unparseable => &[],
            Classification::Parsed(segments) => segments,
        }
    }

    pub fn is_unparseable(&self) -> bool {
        matches!(self, Classification::Unparseable)
    }

    /// True iff at least one segment is flagged.
    pub fn is_potentially_non_vegan(&self) -> bool {
        self.segments().iter().any(|s| s.flagged)
    }

    pub fn flagged_count(&self) -> usize {
        self.segments().iter().filter(|s| s.flagged).count()
    }

    /// Display texts joined back into a single list.
    pub fn rejoined(&self) -> String {
        self.segments()
            .iter()
            .map(|s| s.display_text.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub fn strip_labels(text: &str) -> String {
    LABEL_PREFIXES
        .iter()
        .fold(text.to_string(), |acc, re| re.replacen(&acc, 1, "").into_owned())
}

pub fn segment(text: &str) -> Vec<&str> {
    text.split(DELIMITERS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split `text` into segments and flag each one against `keywords`.
pub fn classify(text: Option<&str>, keywords: &KeywordSet) -> Classification {
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        return Classification::Unparseable;
    };

    let cleaned = strip_labels(text);
    let segments: Vec<IngredientSegment> = segment(&cleaned)
        .into_iter()
        .map(|part| {
            let lower = part.to_lowercase();
            let matched_keyword = keywords.first_match(&lower).map(str::to_string);
            IngredientSegment {
                display_text: part.to_string(),
                flagged: matched_keyword.is_some(),
                matched_keyword,
            }
        })
        .collect();

    if segments.is_empty() {
        tracing::debug!("ingredient text produced no segments");
        return Classification::Unparseable;
    }

    tracing::debug!(
        segments = segments.len(),
        flagged = segments.iter().filter(|s| s.flagged).count(),
        "classified ingredients"
    );
    Classification::Parsed(segments)
}
