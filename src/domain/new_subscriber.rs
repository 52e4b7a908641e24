use serde::Deserialize;

use crate::domain::preferences::Preferences;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_name::SubscriberName;

#[derive(Debug)]
pub struct NewSubscriber {
    pub email: SubscriberEmail,
    pub name: Option<SubscriberName>,
    pub preferences: Preferences,
}

#[derive(Deserialize, Debug)]
pub struct NewSubscriberBody {
    pub email: String,
    pub name: Option<String>,
    #[serde(default)]
    pub art_forms: Vec<String>,
}

impl TryFrom<NewSubscriberBody> for NewSubscriber {
    type Error = String;

    fn try_from(body: NewSubscriberBody) -> Result<Self, Self::Error> {
        let email = SubscriberEmail::parse(body.email)?;
        let name = SubscriberName::parse_optional(body.name)?;
        let preferences = Preferences::parse(body.art_forms)?;

        Ok(NewSubscriber {
            email,
            name,
            preferences,
        })
    }
}
