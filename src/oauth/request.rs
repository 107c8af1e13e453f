//! Outbound token request construction
//!
//! Turns a [`TokenRequestSpec`] into a [`PreparedRequest`]: every string field is
//! run through one [`TemplateResolver`], empty keys are dropped, and exactly one
//! body encoding is selected.

use super::template::TemplateResolver;
use super::types::{BodyEncoding, HttpMethod, KeyValue, TokenRequestSpec};

pub const ACCEPT_ENCODING: &str = "Accept-Encoding";
pub const ACCEPT_ENCODING_VALUE: &str = "gzip, deflate";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// Request body, one variant per encoding path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// GET: parameters travel in the query string
    None,
    /// POST form; pairs are joined verbatim as `k=v&k=v`
    UrlEncodedForm(Vec<(String, String)>),
    /// POST with a pre-serialized JSON string
    RawJson(String),
}

impl RequestBody {
    /// Content type implied by the encoding
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            RequestBody::None => None,
            RequestBody::UrlEncodedForm(_) => Some(CONTENT_TYPE_FORM),
            RequestBody::RawJson(_) => Some(CONTENT_TYPE_JSON),
        }
    }

    /// Wire representation of the body
    pub fn encode(&self) -> Option<String> {
        match self {
            RequestBody::None => None,
            RequestBody::UrlEncodedForm(pairs) => Some(
                pairs
                    .iter()
                    .map(|(key, value)| format!("{}={}", key, value))
                    .collect::<Vec<_>>()
                    .join("&"),
            ),
            RequestBody::RawJson(raw) => Some(raw.clone()),
        }
    }
}

/// Fully resolved outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl PreparedRequest {
    /// Build the outbound request for `spec`, resolving placeholders with `resolver`
    pub fn build(spec: &TokenRequestSpec, resolver: &TemplateResolver) -> Self {
        let mut headers = Vec::new();
        for (key, value) in resolved_pairs(&spec.headers_data, resolver) {
            upsert(&mut headers, key, value);
        }
        replace_header(&mut headers, ACCEPT_ENCODING, ACCEPT_ENCODING_VALUE);

        let url = resolver.resolve(&spec.url);

        let (query, body) = match spec.method {
            HttpMethod::Get => {
                let mut query = Vec::new();
                for (key, value) in resolved_pairs(&spec.params, resolver) {
                    upsert(&mut query, key, value);
                }
                (query, RequestBody::None)
            }
            HttpMethod::Post => match spec.encoding {
                BodyEncoding::RawJson => (Vec::new(), RequestBody::RawJson(resolver.resolve(&spec.data_json))),
                BodyEncoding::UrlEncodedForm | BodyEncoding::None => (
                    Vec::new(),
                    RequestBody::UrlEncodedForm(resolved_pairs(&spec.form_data, resolver).collect()),
                ),
            },
        };

        if let Some(content_type) = body.content_type() {
            replace_header(&mut headers, CONTENT_TYPE, content_type);
        }

        Self {
            method: spec.method,
            url,
            query,
            headers,
            body,
        }
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

fn resolved_pairs<'a>(
    entries: &'a [KeyValue],
    resolver: &'a TemplateResolver,
) -> impl Iterator<Item = (String, String)> + 'a {
    entries
        .iter()
        .filter(|entry| !entry.key.is_empty())
        .map(move |entry| (entry.key.clone(), resolver.resolve(&entry.value)))
}

/// Later entries with the same key overwrite earlier ones in place
fn upsert(pairs: &mut Vec<(String, String)>, key: String, value: String) {
    match pairs.iter_mut().find(|(existing, _)| *existing == key) {
        Some(slot) => slot.1 = value,
        None => pairs.push((key, value)),
    }
}

/// Drop every case-insensitive match of `name`, then set it
fn replace_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value.to_string()));
}
