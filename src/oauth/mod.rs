//! OAuth2 token endpoint configurations
//!
//! Per-project, per-environment descriptions of how to call a token endpoint,
//! the request builder and validator that call it, and the refresh jobs that
//! keep calling it.

pub mod request;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod template;
pub mod types;
pub mod validator;

pub use request::{PreparedRequest, RequestBody};
pub use scheduler::{JobScheduler, JobStatus, RefreshScheduler};
pub use service::OAuthService;
pub use store::{MemoryOAuthStore, OAuthStore};
pub use template::{resolve, PlaceholderMode, TemplateResolver, TIME_PLACEHOLDER};
pub use types::{
    BodyEncoding, ConfigKey, HttpMethod, KeyValue, OAuthConfig, StoredConfig, TokenPayload,
    TokenRequestSpec,
};
pub use validator::TokenEndpointValidator;
