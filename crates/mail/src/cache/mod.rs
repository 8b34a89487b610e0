//! Position-indexed cache of the last listed messages
//!
//! Lets a caller address a just-listed message by its 1-based position
//! instead of its Gmail id. Each slot holds at most
//! [`POSITION_CACHE_CAPACITY`] messages and is replaced wholesale by the
//! next list call. Nothing expires by time and nothing is persisted.
//!
//! With [`CacheScope::Global`] every caller shares one slot, so concurrent
//! list calls overwrite each other's results. [`CacheScope::Session`] gives
//! each session key its own slot. Session slots are held in an LRU map
//! capped at [`MAX_SESSION_SLOTS`].

use lru::LruCache;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::models::ParsedMessage;

/// Maximum number of messages kept per slot
pub const POSITION_CACHE_CAPACITY: usize = 10;

/// Failed position lookups
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("No messages in cache. List messages first to populate cache.")]
    Empty,

    #[error("Position must be between 1 and {len}")]
    OutOfRange { position: i64, len: usize },
}

/// Single slot holding the most recent list result
///
/// `replace` swaps the whole sequence under a write lock, so readers see
/// either the previous list or the new one, never a mix.
#[derive(Debug, Default)]
pub struct PositionCache {
    slot: RwLock<Arc<Vec<ParsedMessage>>>,
}

impl PositionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the first [`POSITION_CACHE_CAPACITY`] messages, dropping previous content
    pub fn replace(&self, messages: impl IntoIterator<Item = ParsedMessage>) {
        let fresh: Vec<ParsedMessage> = messages
            .into_iter()
            .take(POSITION_CACHE_CAPACITY)
            .collect();
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Arc::new(fresh);
    }

    /// Return the message at 1-based `position`
    pub fn get_by_position(&self, position: i64) -> Result<ParsedMessage, CacheError> {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return Err(CacheError::Empty);
        }
        if position < 1 || position > snapshot.len() as i64 {
            return Err(CacheError::OutOfRange {
                position,
                len: snapshot.len(),
            });
        }
        Ok(snapshot[(position - 1) as usize].clone())
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Arc<Vec<ParsedMessage>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// How cache slots are shared between callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheScope {
    /// One slot for the whole process
    #[default]
    Global,
    /// One slot per session key; callers without a key share the global slot
    Session,
}

impl FromStr for CacheScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(CacheScope::Global),
            "session" => Ok(CacheScope::Session),
            other => Err(format!("unknown cache scope '{}' (expected global or session)", other)),
        }
    }
}

/// Most session slots kept at once; the least recently used is evicted first
pub const MAX_SESSION_SLOTS: NonZeroUsize = NonZeroUsize::new(1024).unwrap();

/// Routes each caller to its cache slot according to the configured scope
///
/// Session slots are created only by [`PositionCaches::replace`]; lookups
/// for an unknown session never allocate.
pub struct PositionCaches {
    scope: CacheScope,
    global: PositionCache,
    sessions: Mutex<LruCache<String, Arc<PositionCache>>>,
}

impl PositionCaches {
    pub fn new(scope: CacheScope) -> Self {
        Self::with_session_capacity(scope, MAX_SESSION_SLOTS)
    }

    pub fn with_session_capacity(scope: CacheScope, capacity: NonZeroUsize) -> Self {
        Self {
            scope,
            global: PositionCache::new(),
            sessions: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn scope(&self) -> CacheScope {
        self.scope
    }

    /// Replace the slot for `key` with the first [`POSITION_CACHE_CAPACITY`] messages
    pub fn replace(&self, key: Option<&str>, messages: impl IntoIterator<Item = ParsedMessage>) {
        let Some(key) = self.session_key(key) else {
            self.global.replace(messages);
            return;
        };

        let slot = {
            let mut sessions = self.lock_sessions();
            if let Some(slot) = sessions.get(key).cloned() {
                slot
            } else {
                let slot = Arc::new(PositionCache::new());
                sessions.put(key.to_string(), Arc::clone(&slot));
                slot
            }
        };
        slot.replace(messages);
    }

    /// Message at 1-based `position` in the slot for `key`
    pub fn get_by_position(&self, key: Option<&str>, position: i64) -> Result<ParsedMessage, CacheError> {
        match self.session_key(key) {
            None => self.global.get_by_position(position),
            Some(key) => {
                let slot = self.lock_sessions().get(key).cloned();
                slot.ok_or(CacheError::Empty)?.get_by_position(position)
            }
        }
    }

    /// Number of live session slots
    pub fn session_count(&self) -> usize {
        self.lock_sessions().len()
    }

    fn session_key<'a>(&self, key: Option<&'a str>) -> Option<&'a str> {
        match (self.scope, key) {
            (CacheScope::Session, Some(k)) if !k.is_empty() => Some(k),
            _ => None,
        }
    }

    fn lock_sessions(&self) -> MutexGuard<'_, LruCache<String, Arc<PositionCache>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageId;

    fn msg(n: usize) -> ParsedMessage {
        ParsedMessage {
            id: MessageId::new(format!("m{}", n)),
            thread_id: None,
            snippet: None,
            headers: vec![],
            text_plain: format!("body {}", n),
            text_html: String::new(),
            attachments: vec![],
        }
    }

    #[test]
    fn test_empty_cache_is_out_of_range() {
        let cache = PositionCache::new();
        assert_eq!(cache.get_by_position(1), Err(CacheError::Empty));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_replace_keeps_first_ten() {
        let cache = PositionCache::new();
        cache.replace((1..=15).map(msg));

        assert_eq!(cache.len(), 10);
        assert_eq!(cache.get_by_position(1).unwrap(), msg(1));
        assert_eq!(cache.get_by_position(10).unwrap(), msg(10));
        assert_eq!(
            cache.get_by_position(11),
            Err(CacheError::OutOfRange { position: 11, len: 10 })
        );
    }

    #[test]
    fn test_position_below_one() {
        let cache = PositionCache::new();
        cache.replace(vec![msg(1)]);
        assert!(matches!(cache.get_by_position(0), Err(CacheError::OutOfRange { .. })));
        assert!(matches!(cache.get_by_position(-3), Err(CacheError::OutOfRange { .. })));
    }

    #[test]
    fn test_replace_discards_previous_content() {
        let cache = PositionCache::new();
        cache.replace((1..=5).map(msg));
        cache.replace(vec![msg(42)]);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_by_position(1).unwrap(), msg(42));
        assert!(cache.get_by_position(2).is_err());
    }

    #[test]
    fn test_replace_with_empty_list_empties_cache() {
        let cache = PositionCache::new();
        cache.replace((1..=3).map(msg));
        cache.replace(Vec::new());
        assert_eq!(cache.get_by_position(1), Err(CacheError::Empty));
    }

    #[test]
    fn test_out_of_range_message_names_valid_range() {
        let err = CacheError::OutOfRange { position: 7, len: 3 };
        assert_eq!(err.to_string(), "Position must be between 1 and 3");
    }

    #[test]
    fn test_readers_never_see_partial_replace() {
        let cache = Arc::new(PositionCache::new());
        cache.replace((0..10).map(|_| msg(1)));

        let writer = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for round in 0..200 {
                    let n = if round % 2 == 0 { 2 } else { 1 };
                    cache.replace((0..10).map(|_| msg(n)));
                }
            })
        };

        for _ in 0..200 {
            let first = cache.get_by_position(1).unwrap();
            let snapshot = cache.snapshot();
            assert!(snapshot.iter().all(|m| m == &snapshot[0]));
            assert!(first == msg(1) || first == msg(2));
        }
        writer.join().unwrap();
    }

    #[test]
    fn test_global_scope_shares_slot() {
        let caches = PositionCaches::new(CacheScope::Global);
        caches.replace(Some("alice"), vec![msg(1)]);
        assert_eq!(caches.get_by_position(Some("bob"), 1).unwrap(), msg(1));
        assert_eq!(caches.get_by_position(None, 1).unwrap(), msg(1));
        assert_eq!(caches.session_count(), 0);
    }

    #[test]
    fn test_session_scope_isolates_slots() {
        let caches = PositionCaches::new(CacheScope::Session);
        caches.replace(Some("alice"), vec![msg(1)]);
        caches.replace(Some("bob"), vec![msg(2), msg(3)]);

        assert_eq!(caches.get_by_position(Some("alice"), 1).unwrap(), msg(1));
        assert!(caches.get_by_position(Some("alice"), 2).is_err());
        assert_eq!(caches.get_by_position(Some("bob"), 2).unwrap(), msg(3));
        assert_eq!(caches.get_by_position(None, 1), Err(CacheError::Empty));
    }

    #[test]
    fn test_unknown_session_lookup_does_not_allocate() {
        let caches = PositionCaches::new(CacheScope::Session);
        for i in 0..10_000 {
            let key = format!("session-{}", i);
            assert_eq!(caches.get_by_position(Some(&key), 1), Err(CacheError::Empty));
        }
        assert_eq!(caches.session_count(), 0);
    }

    #[test]
    fn test_session_slots_are_bounded() {
        let capacity = NonZeroUsize::new(4).unwrap();
        let caches = PositionCaches::with_session_capacity(CacheScope::Session, capacity);
        for i in 0..100 {
            caches.replace(Some(&format!("session-{}", i)), vec![msg(i)]);
        }

        assert_eq!(caches.session_count(), 4);
        assert_eq!(caches.get_by_position(Some("session-99"), 1).unwrap(), msg(99));
        assert_eq!(caches.get_by_position(Some("session-0"), 1), Err(CacheError::Empty));
    }

    #[test]
    fn test_recently_used_session_survives_eviction() {
        let capacity = NonZeroUsize::new(2).unwrap();
        let caches = PositionCaches::with_session_capacity(CacheScope::Session, capacity);
        caches.replace(Some("a"), vec![msg(1)]);
        caches.replace(Some("b"), vec![msg(2)]);
        caches.get_by_position(Some("a"), 1).unwrap();
        caches.replace(Some("c"), vec![msg(3)]);

        assert!(caches.get_by_position(Some("a"), 1).is_ok());
        assert!(caches.get_by_position(Some("b"), 1).is_err());
    }

    #[test]
    fn test_cache_scope_parse() {
        assert_eq!("global".parse::<CacheScope>(), Ok(CacheScope::Global));
        assert_eq!("Session".parse::<CacheScope>(), Ok(CacheScope::Session));
        assert!("user".parse::<CacheScope>().is_err());
    }
}
