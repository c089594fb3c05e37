//! Reduces language model output to a [`SearchIntent`].
//!
//! Model output is untrusted. Parsing is staged: strict JSON decode of the
//! whole text, then JSON fragments embedded in prose, then a heuristic scan
//! for a place type and a location phrase. If none of those finds a type or a
//! location the parse fails instead of guessing.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::types::intent::{SearchIntent, PLACE_TYPE_VOCABULARY, UNKNOWN_PLACE_TYPE};

/// Bytes of model output considered. Anything past this is dropped.
pub const MAX_MODEL_OUTPUT: usize = 16 * 1024;

/// Upper bound on embedded fragments tried before falling back to heuristics.
const MAX_FRAGMENT_ATTEMPTS: usize = 64;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("no_locations_found")]
    NoLocationsFound,
}

impl ParseError {
    pub fn reason(&self) -> &'static str {
        match self {
            ParseError::NoLocationsFound => "no_locations_found",
        }
    }
}

/// Capitalised words that follow "in" in refusals and meta replies rather
/// than naming a place.
const NOT_A_LOCATION: &[&str] = &[
    "english", "spanish", "french", "german", "chinese", "japanese", "json", "i", "my",
    "this", "that", "the", "a", "an", "order", "general", "particular", "fact", "addition",
    "case", "summary", "short",
];

#[derive(Deserialize)]
struct RawIntent {
    #[serde(rename = "type", alias = "placeType", alias = "place_type", default)]
    place_type: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    keywords: Option<RawKeywords>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawKeywords {
    List(Vec<String>),
    Text(String),
}

impl RawKeywords {
    fn into_terms(self) -> Vec<String> {
        match self {
            RawKeywords::List(terms) => terms,
            RawKeywords::Text(text) => text.split(',').map(str::to_string).collect(),
        }
    }
}

#[instrument(skip(raw), fields(len = raw.len()))]
pub fn parse(raw: &str) -> Result<SearchIntent, ParseError> {
    let text = bounded(raw).trim();
    if text.is_empty() {
        return Err(ParseError::NoLocationsFound);
    }

    if let Some(intent) = strict(text) {
        debug!("strict decode succeeded");
        return Ok(intent);
    }
    if let Some(intent) = embedded_fragment(text) {
        debug!("recovered embedded json fragment");
        return Ok(intent);
    }
    let intent = heuristic(text).ok_or(ParseError::NoLocationsFound)?;
    debug!(?intent, "heuristic fallback");
    Ok(intent)
}

fn bounded(raw: &str) -> &str {
    if raw.len() <= MAX_MODEL_OUTPUT {
        return raw;
    }
    let mut end = MAX_MODEL_OUTPUT;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    &raw[..end]
}

/// Decode `text` as the expected object, requiring a non-empty type and location.
fn strict(text: &str) -> Option<SearchIntent> {
    let raw: RawIntent = serde_json::from_str(text).ok()?;
    let place_type = raw.place_type.filter(|t| !t.trim().is_empty())?;
    let location = raw.location.filter(|l| !l.trim().is_empty())?;
    let keywords = raw.keywords.map(RawKeywords::into_terms).unwrap_or_default();
    Some(SearchIntent::new(&place_type, &location, keywords))
}

/// Try each balanced `{...}` substring, innermost first, in one pass over the text.
fn embedded_fragment(text: &str) -> Option<SearchIntent> {
    let mut open: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut attempts = 0;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if !open.is_empty() => in_string = true,
            '{' => open.push(i),
            '}' => {
                let Some(start) = open.pop() else { continue };
                if let Some(intent) = strict(&text[start..=i]) {
                    return Some(intent);
                }
                attempts += 1;
                if attempts >= MAX_FRAGMENT_ATTEMPTS {
                    return None;
                }
            }
            _ => {}
        }
    }
    None
}

fn field_regex() -> &'static Regex {
    static FIELD: OnceLock<Regex> = OnceLock::new();
    FIELD.get_or_init(|| {
        Regex::new(r#""(type|placeType|place_type|location)"\s*:\s*"([^"\\]{1,200})""#)
            .expect("valid field regex")
    })
}

fn vocabulary_regex() -> &'static Regex {
    static VOCABULARY: OnceLock<Regex> = OnceLock::new();
    VOCABULARY.get_or_init(|| {
        let terms = PLACE_TYPE_VOCABULARY
            .iter()
            .map(|(term, _)| regex::escape(term))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"(?i)\b({terms})\b")).expect("valid vocabulary regex")
    })
}

fn location_regex() -> &'static Regex {
    static LOCATION: OnceLock<Regex> = OnceLock::new();
    LOCATION.get_or_init(|| {
        Regex::new(r"\b(?i:in|near|around)\s+(\p{Lu}[\w'.-]*(?:\s+\p{Lu}[\w'.-]*){0,5})")
            .expect("valid location regex")
    })
}

/// Rejects phrases whose first word is a language or filler word.
fn is_place_name(phrase: &str) -> bool {
    let first = phrase.split_whitespace().next().unwrap_or_default();
    !first.is_empty()
        && !NOT_A_LOCATION
            .iter()
            .any(|word| first.eq_ignore_ascii_case(word))
}

/// Best-effort scan of free text. The first location phrase wins when several are present.
fn heuristic(text: &str) -> Option<SearchIntent> {
    let mut place_type: Option<String> = None;
    let mut location: Option<String> = None;

    for caps in field_regex().captures_iter(text) {
        let value = caps[2].trim();
        if value.is_empty() {
            continue;
        }
        match &caps[1] {
            "location" if location.is_none() => location = Some(value.to_string()),
            "type" | "placeType" | "place_type"
                if place_type.is_none() && !value.eq_ignore_ascii_case(UNKNOWN_PLACE_TYPE) =>
            {
                place_type = Some(value.to_string())
            }
            _ => {}
        }
    }

    if place_type.is_none() {
        place_type = vocabulary_regex().captures(text).and_then(|caps| {
            let found = caps[1].to_lowercase();
            PLACE_TYPE_VOCABULARY
                .iter()
                .find(|(term, _)| *term == found)
                .map(|(_, canonical)| canonical.to_string())
        });
    }

    if location.is_none() {
        location = location_regex()
            .captures_iter(text)
            .map(|caps| caps[1].trim_end_matches(['.', '\'', '-']).to_string())
            .find(|phrase| is_place_name(phrase));
    }

    let intent = SearchIntent::new(
        place_type.as_deref().unwrap_or(UNKNOWN_PLACE_TYPE),
        location.as_deref().unwrap_or_default(),
        vec![],
    );
    if !intent.has_place_type() && intent.location.is_empty() {
        return None;
    }
    Some(intent)
}
