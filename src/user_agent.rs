//! User-Agent sent with every request.

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/page-loader";

/// Default User-Agent for page and resource requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("page-loader/{version} (+{PROJECT_UA_URL})")
}
