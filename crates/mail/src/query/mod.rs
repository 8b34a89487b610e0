//! Canned Gmail search queries
//!
//! The presets exposed over HTTP and the query run by the hourly check.

/// Maintenance notices: planned works (ППР), emergency recovery (АВР), outages
pub const KEYWORDS_QUERY: &str = r#"("ППР" OR "АВР" OR "Работы" OR "Аварийные" OR "Плановые")"#;

/// Default query for the message listing
pub const UNREAD_QUERY: &str = "is:unread";

/// Messages received in the last 24 hours
pub const LAST_24_HOURS_QUERY: &str = "newer_than:1d";

/// Messages carrying at least one attachment
pub const WITH_ATTACHMENTS_QUERY: &str = "has:attachment";

/// Messages sent from `domain`
pub fn from_domain_query(domain: &str) -> String {
    format!("from:{}", domain.trim())
}

/// Keyword matches received within the last hour
pub fn hourly_keywords_query() -> String {
    format!("{} newer_than:1h", KEYWORDS_QUERY)
}
