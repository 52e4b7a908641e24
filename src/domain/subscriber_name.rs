use unicode_segmentation::UnicodeSegmentation;

const MAX_CHAR_LENGTH: usize = 100;
const FORBIDDEN_CHARS: [char; 9] = ['/', '{', '}', '"', '>', '<', '\\', '(', ')'];

/// Display name used in the digest greeting.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SubscriberName(String);

impl SubscriberName {
    pub fn parse(name: String) -> Result<SubscriberName, String> {
        let trimmed = name.trim();
        let is_empty = trimmed.is_empty();
        let is_too_long = trimmed.graphemes(true).count() > MAX_CHAR_LENGTH;
        let contains_forbidden_chars = trimmed.chars().any(|char| FORBIDDEN_CHARS.contains(&char));

        if is_empty || is_too_long || contains_forbidden_chars {
            return Err(format!("{} is not a valid subscriber name", name));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// The name is optional on the subscribe form: missing or blank input means
    /// no name, anything else has to be a valid name.
    pub fn parse_optional(name: Option<String>) -> Result<Option<SubscriberName>, String> {
        match name {
            Some(name) if !name.trim().is_empty() => Self::parse(name).map(Some),
            _ => Ok(None),
        }
    }
}

impl AsRef<str> for SubscriberName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
