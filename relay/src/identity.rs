use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Whether an identifier names a room with read-write or read-only privileges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    Canonical,
    ReadOnly,
}

/// The two external names of a single room
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomIdentity {
    pub canonical: String,
    pub read_only: String,
}

#[derive(Debug, Default)]
struct Aliases {
    read_only_by_canonical: HashMap<String, String>,
    canonical_by_read_only: HashMap<String, String>,
}

impl Aliases {
    fn is_taken(&self, id: &str) -> bool {
        self.read_only_by_canonical.contains_key(id) || self.canonical_by_read_only.contains_key(id)
    }
}

/// [RoomIdentityMap] keeps the bijection between canonical room ids and their generated read-only ids.
///
/// Pairs are created lazily the first time a canonical id is resolved and live as long as the process.
/// Both directions are updated under one lock, so concurrent lookups of a new canonical id
/// can never allocate two different read-only ids for it.
#[derive(Debug, Default)]
pub struct RoomIdentityMap {
    aliases: Mutex<Aliases>,
}

impl RoomIdentityMap {
    pub fn new() -> Self {
        RoomIdentityMap::default()
    }

    /// Returns `id` unchanged if it is a read-only id, otherwise the read-only id paired with
    /// canonical id `id`, creating the pair on first use.
    pub fn resolve_read_only(&self, id: &str) -> String {
        self.resolve(id).0.read_only
    }

    /// Returns the canonical id paired with `read_only_id`, if there is one
    pub fn resolve_canonical(&self, read_only_id: &str) -> Option<String> {
        self.aliases
            .lock()
            .canonical_by_read_only
            .get(read_only_id)
            .cloned()
    }

    /// Anything that is not a known read-only id is a canonical id
    pub fn classify(&self, id: &str) -> IdentityKind {
        if self.aliases.lock().canonical_by_read_only.contains_key(id) {
            IdentityKind::ReadOnly
        } else {
            IdentityKind::Canonical
        }
    }

    /// Resolves any identifier to both names of its room along with the kind of `id` itself.
    /// Unknown identifiers are treated as new canonical ids.
    pub fn resolve(&self, id: &str) -> (RoomIdentity, IdentityKind) {
        let mut aliases = self.aliases.lock();

        if let Some(canonical) = aliases.canonical_by_read_only.get(id) {
            let identity = RoomIdentity {
                canonical: canonical.clone(),
                read_only: id.to_string(),
            };

            return (identity, IdentityKind::ReadOnly);
        }

        if let Some(read_only) = aliases.read_only_by_canonical.get(id) {
            let identity = RoomIdentity {
                canonical: id.to_string(),
                read_only: read_only.clone(),
            };

            return (identity, IdentityKind::Canonical);
        }

        // v4 uuids come from the OS CSPRNG, a clash with any known id is retried anyway
        let read_only = loop {
            let candidate = Uuid::new_v4().to_string();

            if candidate != id && !aliases.is_taken(&candidate) {
                break candidate;
            }
        };

        aliases
            .read_only_by_canonical
            .insert(id.to_string(), read_only.clone());
        aliases
            .canonical_by_read_only
            .insert(read_only.clone(), id.to_string());

        debug!(canonical = id, "created read-only alias");

        (
            RoomIdentity {
                canonical: id.to_string(),
                read_only,
            },
            IdentityKind::Canonical,
        )
    }

    /// Canonical id of any identifier without creating a new pair.
    /// Read-only ids with no pair cannot happen, unknown ids are canonical by definition.
    pub fn canonical_of(&self, id: &str) -> String {
        self.resolve_canonical(id).unwrap_or_else(|| id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc};

    use super::*;

    #[test]
    fn test_read_only_round_trip() {
        let map = RoomIdentityMap::new();

        for canonical in ["board", "another-board", ""] {
            let read_only = map.resolve_read_only(canonical);

            assert_eq!(map.resolve_canonical(&read_only).as_deref(), Some(canonical));
            assert_eq!(map.resolve_read_only(canonical), read_only);
            assert_eq!(map.resolve_canonical(&map.resolve_read_only(canonical)).as_deref(), Some(canonical));
        }
    }

    #[test]
    fn test_classify() {
        let map = RoomIdentityMap::new();
        let read_only = map.resolve_read_only("board");

        assert_eq!(map.classify("board"), IdentityKind::Canonical);
        assert_eq!(map.classify(&read_only), IdentityKind::ReadOnly);
        assert_eq!(map.classify("never-seen"), IdentityKind::Canonical);
    }

    #[test]
    fn test_read_only_id_resolves_to_itself() {
        let map = RoomIdentityMap::new();
        let read_only = map.resolve_read_only("board");

        assert_eq!(map.resolve_read_only(&read_only), read_only);
        assert_eq!(map.canonical_of(&read_only), "board");
        assert_eq!(map.canonical_of("board"), "board");
    }

    #[test]
    fn test_unknown_read_only_id() {
        let map = RoomIdentityMap::new();

        assert_eq!(map.resolve_canonical("no-such-alias"), None);
    }

    #[test]
    fn test_read_only_ids_are_distinct_and_opaque() {
        let map = RoomIdentityMap::new();
        let ids: HashSet<String> = (0..100)
            .map(|i| map.resolve_read_only(&format!("board-{}", i)))
            .collect();

        assert_eq!(ids.len(), 100);
        assert!(ids.iter().all(|id| Uuid::parse_str(id).is_ok()));
    }

    #[test]
    fn test_concurrent_creation_allocates_once() {
        let map = Arc::new(RoomIdentityMap::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let map = map.clone();
                std::thread::spawn(move || map.resolve_read_only("contended"))
            })
            .collect();

        let ids: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(ids.len(), 1);
    }
}
