use serde::Serialize;

/// Acknowledgement returned for requests that passed the access policy.
#[derive(Debug, Serialize)]
pub struct ForwardedResponse {
    pub method: String,
    pub path: String,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub authorities: Vec<String>,
}
