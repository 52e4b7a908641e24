use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

const MAX_NAME_LENGTH: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 200;

/// Unique name of an art form. Subscriber preferences refer to art forms by it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct ArtFormName(String);

impl ArtFormName {
    pub fn parse(name: String) -> Result<ArtFormName, String> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(String::from("Art form name is required"));
        }

        if trimmed.graphemes(true).count() > MAX_NAME_LENGTH {
            return Err(format!("{} is not a valid art form name", name));
        }

        Ok(Self(trimmed.to_string()))
    }
}

impl AsRef<str> for ArtFormName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ArtForm {
    pub id: Uuid,
    pub name: ArtFormName,
    pub keywords: Vec<String>,
    pub active: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewArtForm {
    pub name: ArtFormName,
    pub keywords: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct NewArtFormBody {
    pub name: String,
    pub description: Option<String>,
    /// Comma separated, as typed in the admin form.
    #[serde(default)]
    pub keywords: String,
}

impl TryFrom<NewArtFormBody> for NewArtForm {
    type Error = String;

    fn try_from(body: NewArtFormBody) -> Result<Self, Self::Error> {
        let name = ArtFormName::parse(body.name)?;
        let description = match body.description {
            Some(description) if !description.trim().is_empty() => {
                let description = description.trim().to_string();
                if description.graphemes(true).count() > MAX_DESCRIPTION_LENGTH {
                    return Err(String::from("Art form description is too long"));
                }
                Some(description)
            }
            _ => None,
        };

        Ok(NewArtForm {
            name,
            keywords: parse_keywords(&body.keywords),
            description,
        })
    }
}

pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|keyword| !keyword.is_empty())
        .map(String::from)
        .collect()
}

/// Name, search keywords and description of the seven classic art forms.
pub const DEFAULT_ART_FORMS: [(&str, &[&str], &str); 7] = [
    (
        "Architecture",
        &["architecture", "building design", "urban planning", "architectural"],
        "The art of designing and constructing buildings",
    ),
    (
        "Sculpture",
        &["sculpture", "sculptural", "installation art", "public art"],
        "Three-dimensional art forms and installations",
    ),
    (
        "Painting",
        &["painting", "visual art", "contemporary art", "fine art"],
        "Visual art created with pigments and brushes",
    ),
    (
        "Music",
        &["music", "classical music", "contemporary music", "composer"],
        "The art of organized sound and rhythm",
    ),
    (
        "Poetry",
        &["poetry", "literature", "poet", "literary"],
        "Literary art using language and verse",
    ),
    (
        "Dance",
        &["dance", "ballet", "contemporary dance", "choreography"],
        "Movement and choreography as artistic expression",
    ),
    (
        "Theater",
        &["theater", "theatre", "drama", "performance art"],
        "Live performance and dramatic arts",
    ),
];

pub fn default_art_forms() -> Vec<NewArtForm> {
    DEFAULT_ART_FORMS
        .iter()
        .map(|(name, keywords, description)| NewArtForm {
            name: ArtFormName(name.to_string()),
            keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
            description: Some(description.to_string()),
        })
        .collect()
}
