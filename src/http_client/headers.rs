//! Request headers required by the archive's access policy.

use url::Url;

/// Default client identifier appended to the contact email.
pub const DEFAULT_CLIENT_ID: &str = concat!("filingacquire/", env!("CARGO_PKG_VERSION"));

/// Build the contact-identifying User-Agent: `"<contact-email> <client-id>"`.
pub fn archive_user_agent(contact_email: &str, client_id: &str) -> String {
    format!("{} {}", contact_email.trim(), client_id.trim())
}

/// Fixed header set sent with every archive request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeaders {
    user_agent: String,
    archive_host: String,
}

impl RequestHeaders {
    pub fn new(user_agent: impl Into<String>, archive_host: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            archive_host: archive_host.into(),
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Headers for a request to `url`.
    ///
    /// `Host` names the URL's own host; the configured archive host is used
    /// only when the URL has none.
    pub fn for_url(&self, url: &str) -> Vec<(String, String)> {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| self.archive_host.clone());

        [
            ("User-Agent", self.user_agent.clone()),
            ("Accept-Encoding", "gzip, deflate".to_string()),
            ("Host", host),
            ("Accept", "application/json".to_string()),
            ("Accept-Language", "en-US,en;q=0.5".to_string()),
            ("Connection", "keep-alive".to_string()),
            ("Cache-Control", "max-age=0".to_string()),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_user_agent_format() {
        assert_eq!(
            archive_user_agent(" ops@example.com ", "research-bot/1.0"),
            "ops@example.com research-bot/1.0"
        );
    }

    #[test]
    fn test_default_client_id_names_crate() {
        assert!(DEFAULT_CLIENT_ID.starts_with("filingacquire/"));
    }

    #[test]
    fn test_header_set() {
        let headers = RequestHeaders::new("ops@example.com bot/1", "www.sec.gov");
        let set = headers.for_url("https://www.sec.gov/Archives/edgar/full-index/2024/QTR1/master.idx");

        assert_eq!(set.len(), 7);
        assert_eq!(lookup(&set, "user-agent"), Some("ops@example.com bot/1"));
        assert_eq!(lookup(&set, "accept-encoding"), Some("gzip, deflate"));
        assert_eq!(lookup(&set, "host"), Some("www.sec.gov"));
        assert_eq!(lookup(&set, "accept"), Some("application/json"));
        assert_eq!(lookup(&set, "accept-language"), Some("en-US,en;q=0.5"));
        assert_eq!(lookup(&set, "connection"), Some("keep-alive"));
        assert_eq!(lookup(&set, "cache-control"), Some("max-age=0"));
    }

    #[test]
    fn test_host_follows_url() {
        let headers = RequestHeaders::new("ua", "www.sec.gov");
        let set = headers.for_url("https://data.sec.gov/submissions/CIK0000320193.json");
        assert_eq!(lookup(&set, "host"), Some("data.sec.gov"));

        let set = headers.for_url("not a url");
        assert_eq!(lookup(&set, "host"), Some("www.sec.gov"));
    }
}
