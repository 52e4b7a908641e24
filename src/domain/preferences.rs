use std::collections::BTreeSet;

use crate::domain::art_form::ArtFormName;

/// Art forms a subscriber wants to hear about. Empty means no filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Preferences(BTreeSet<ArtFormName>);

impl Preferences {
    pub fn parse(names: Vec<String>) -> Result<Preferences, String> {
        names
            .into_iter()
            .map(ArtFormName::parse)
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArtFormName> {
        self.0.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|art_form| art_form.as_ref() == name)
    }
}

impl FromIterator<ArtFormName> for Preferences {
    fn from_iter<I: IntoIterator<Item = ArtFormName>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
