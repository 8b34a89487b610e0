//! Hourly keyword check
//!
//! Counts maintenance notices received during the last hour. The count is
//! only logged; nothing is cached or sent.

use log::{error, info};

use crate::query::hourly_keywords_query;
use crate::service::MailService;
use crate::MailError;

/// Upper bound on messages counted per run
pub const HOURLY_CHECK_MAX_RESULTS: u32 = 50;

/// Count keyword matches newer than one hour
pub fn hourly_check(service: &MailService) -> Result<usize, MailError> {
    let list = service.search(&hourly_keywords_query(), HOURLY_CHECK_MAX_RESULTS)?;
    Ok(list.len())
}

/// Run [`hourly_check`] and log the outcome
///
/// Errors are logged and returned so the scheduler can record them too.
pub fn run_hourly_check(service: &MailService) -> Result<usize, MailError> {
    match hourly_check(service) {
        Ok(count) => {
            info!("[hourly] found {} matching messages in last hour.", count);
            Ok(count)
        }
        Err(e) => {
            error!("[hourly] error: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheScope;
    use crate::gmail::api::GmailMessage;
    use crate::provider::InMemoryProvider;
    use std::sync::Arc;

    fn message(id: &str) -> GmailMessage {
        GmailMessage {
            id: id.to_string(),
            thread_id: None,
            label_ids: None,
            snippet: None,
            internal_date: None,
            payload: None,
        }
    }

    #[test]
    fn test_hourly_check_counts_and_uses_keyword_query() {
        let provider = Arc::new(InMemoryProvider::new("me@example.com"));
        provider.insert(message("a"));
        provider.insert(message("b"));
        let service = MailService::new(provider.clone(), CacheScope::Global);

        assert_eq!(run_hourly_check(&service).unwrap(), 2);
        assert_eq!(provider.queries(), vec![hourly_keywords_query()]);
    }

    #[test]
    fn test_hourly_check_does_not_touch_cache() {
        let provider = Arc::new(InMemoryProvider::new("me@example.com"));
        provider.insert(message("a"));
        let service = MailService::new(provider, CacheScope::Global);

        hourly_check(&service).unwrap();
        assert!(service.message_by_position(1, None).is_err());
    }

    #[test]
    fn test_hourly_check_reports_provider_failure() {
        let provider = Arc::new(InMemoryProvider::new("me@example.com"));
        provider.fail_with(Some("token expired"));
        let service = MailService::new(provider, CacheScope::Global);

        assert!(matches!(run_hourly_check(&service), Err(MailError::Upstream { .. })));
    }
}
