// Turn-scoped identity cache. Gives each logical channel a stable id while
// its content keeps growing across re-parses of the same stream.

use std::{collections::HashMap, fmt};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::channel_parser::types::ChannelType;

/// Content-independent key for a channel: `{type}:{order}:{recipient}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelSignature(String);

impl ChannelSignature {
    pub fn new(channel_type: ChannelType, order: usize, recipient: Option<&str>) -> Self {
        Self(format!(
            "{}:{}:{}",
            channel_type,
            order,
            recipient.unwrap_or_default()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Signature to id map for one response.
///
/// Create one when a turn starts and drop it when the turn completes. Entries
/// are never removed while the turn is live, so a signature resolves to the
/// same id for the cache's whole lifetime. Lookups go through a mutex, which
/// keeps get-or-create atomic if callers share the cache across threads.
#[derive(Debug, Default)]
pub struct ChannelIdCache {
    ids: Mutex<HashMap<String, Uuid>>,
}

impl ChannelIdCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `signature`, generating a random one on first use.
    pub fn get_or_create_channel_id(&self, signature: &ChannelSignature) -> Uuid {
        let mut ids = self.ids.lock();
        if let Some(id) = ids.get(signature.as_str()) {
            return *id;
        }

        let id = Uuid::new_v4();
        tracing::trace!(signature = %signature, %id, "Assigned new channel id");
        ids.insert(signature.as_str().to_string(), id);
        id
    }

    /// Look up an id without creating one.
    pub fn get(&self, signature: &ChannelSignature) -> Option<Uuid> {
        self.ids.lock().get(signature.as_str()).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn test_signature_format() {
        let sig = ChannelSignature::new(ChannelType::Tool, 2, Some("functions.search"));
        assert_eq!(sig.as_str(), "tool:2:functions.search");

        let sig = ChannelSignature::new(ChannelType::Final, 0, None);
        assert_eq!(sig.to_string(), "final:0:");
    }

    #[test]
    fn test_same_signature_same_id() {
        let cache = ChannelIdCache::new();
        let sig = ChannelSignature::new(ChannelType::Analysis, 0, None);

        let first = cache.get_or_create_channel_id(&sig);
        let second = cache.get_or_create_channel_id(&sig);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&sig), Some(first));
    }

    #[test]
    fn test_distinct_signatures_distinct_ids() {
        let cache = ChannelIdCache::new();
        let a = cache.get_or_create_channel_id(&ChannelSignature::new(ChannelType::Final, 0, None));
        let b = cache.get_or_create_channel_id(&ChannelSignature::new(ChannelType::Final, 1, None));
        let c = cache.get_or_create_channel_id(&ChannelSignature::new(
            ChannelType::Final,
            1,
            Some("functions.x"),
        ));
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_fresh_cache_per_turn() {
        let sig = ChannelSignature::new(ChannelType::Final, 0, None);
        let turn1 = ChannelIdCache::new();
        let turn2 = ChannelIdCache::new();
        assert!(turn2.get(&sig).is_none());
        assert_ne!(
            turn1.get_or_create_channel_id(&sig),
            turn2.get_or_create_channel_id(&sig)
        );
    }

    #[test]
    fn test_concurrent_get_or_create() {
        let cache = Arc::new(ChannelIdCache::new());
        let sig = ChannelSignature::new(ChannelType::Commentary, 0, None);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let sig = sig.clone();
                thread::spawn(move || cache.get_or_create_channel_id(&sig))
            })
            .collect();

        let ids: Vec<Uuid> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(cache.len(), 1);
    }
}
