mod art_forms;
mod dashboard;
mod health_check;
mod newsletters;
mod subscriptions;

pub use art_forms::*;
pub use dashboard::*;
pub use health_check::*;
pub use newsletters::*;
pub use subscriptions::*;

/// Body of every response that only carries a status message for the user.
#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct StatusMessage {
    pub message: String,
}

impl StatusMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
