//! User-Agent string sent with every robots.txt request.
//!
//! Site operators reading their access logs should be able to tell what
//! fetched their robots.txt and where to find out more (RFC 9309 §2.2.1).

/// Product token used in the User-Agent header.
const PRODUCT_TOKEN: &str = "robots-harvester";

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/robots-harvester";

/// Default User-Agent for robots.txt fetches.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT_TOKEN}/{version} (robots.txt survey; +{PROJECT_UA_URL})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_version_and_url() {
        let ua = default_user_agent();
        assert!(ua.contains(PROJECT_UA_URL), "UA must contain project URL: {ua}");
        assert_eq!(
            Some(env!("CARGO_PKG_VERSION")),
            ua.strip_prefix("robots-harvester/")
                .and_then(|s| s.split(' ').next()),
            "UA must contain crate version"
        );
    }

    #[test]
    fn test_user_agent_product_token_is_ascii() {
        // Product tokens in robots.txt matching are compared case-insensitively as ASCII.
        assert!(PRODUCT_TOKEN.is_ascii());
        assert!(!PRODUCT_TOKEN.contains(' '));
    }
}
