use serde::{Deserialize, Serialize};

/// Place type used when the model gave no usable type.
pub const UNKNOWN_PLACE_TYPE: &str = "unknown";

/// Vocabulary the heuristic parser recognises in free text, mapped to the
/// canonical place type. Longer phrases come before their substrings.
pub const PLACE_TYPE_VOCABULARY: &[(&str, &str)] = &[
    ("coffee shop", "cafe"),
    ("restaurants", "restaurant"),
    ("restaurant", "restaurant"),
    ("places to eat", "restaurant"),
    ("parks", "park"),
    ("park", "park"),
    ("hotels", "hotel"),
    ("hotel", "hotel"),
    ("motel", "hotel"),
    ("cafes", "cafe"),
    ("cafe", "cafe"),
    ("coffee", "cafe"),
    ("bars", "bar"),
    ("bar", "bar"),
    ("pub", "bar"),
    ("museums", "museum"),
    ("museum", "museum"),
    ("bakery", "bakery"),
    ("gym", "gym"),
    ("library", "library"),
    ("pharmacy", "pharmacy"),
    ("supermarket", "supermarket"),
];

/// What the user is looking for, reduced from the language model's output.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchIntent {
    pub place_type: String,
    pub location: String,
    pub keywords: Vec<String>,
}

impl SearchIntent {
    pub fn new(place_type: &str, location: &str, keywords: Vec<String>) -> Self {
        let place_type = place_type.trim().to_lowercase();
        Self {
            place_type: if place_type.is_empty() {
                UNKNOWN_PLACE_TYPE.to_string()
            } else {
                place_type
            },
            location: location.trim().to_string(),
            keywords: keywords
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn has_place_type(&self) -> bool {
        self.place_type != UNKNOWN_PLACE_TYPE
    }

    /// Whether the type is one of the documented vocabulary types.
    pub fn is_known_type(&self) -> bool {
        PLACE_TYPE_VOCABULARY
            .iter()
            .any(|(_, canonical)| *canonical == self.place_type)
    }

    /// Free-text query for the place provider, e.g. `tacos restaurant in Austin`.
    pub fn text_query(&self) -> String {
        let mut parts: Vec<&str> = self.keywords.iter().map(String::as_str).collect();
        if self.has_place_type() {
            parts.push(&self.place_type);
        }
        let mut query = parts.join(" ");
        if !self.location.is_empty() {
            if !query.is_empty() {
                query.push(' ');
            }
            query.push_str("in ");
            query.push_str(&self.location);
        }
        query
    }

    /// Provider type filter for known vocabulary. Free-text types only go
    /// through the text query.
    pub fn provider_type(&self) -> Option<&'static str> {
        match self.place_type.as_str() {
            "restaurant" => Some("restaurant"),
            "park" => Some("park"),
            "hotel" => Some("lodging"),
            "cafe" => Some("cafe"),
            "bar" => Some("bar"),
            "museum" => Some("museum"),
            "bakery" => Some("bakery"),
            "gym" => Some("gym"),
            "library" => Some("library"),
            "pharmacy" => Some("pharmacy"),
            "supermarket" => Some("supermarket"),
            _ => None,
        }
    }
}
