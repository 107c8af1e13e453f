pub mod oauth_api;

pub use oauth_api::{configure_oauth_api, health_check, ApiEnvelope, OAuthApiHandler, OAuthQuery};
