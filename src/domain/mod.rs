pub mod art_form;
pub mod article;
pub mod new_subscriber;
pub mod newsletter_sent;
pub mod preferences;
pub mod send_status;
pub mod subscriber;
pub mod subscriber_email;
pub mod subscriber_name;
