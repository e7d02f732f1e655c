use super::*;

/// Minimal tracked item for exercising the store on its own.
#[derive(Debug, Clone, PartialEq)]
struct Item {
    id: MatchId,
    label: &'static str,
}

impl Tracked for Item {
    type Id = MatchId;
    type Snapshot = String;

    fn id(&self) -> MatchId {
        self.id
    }

    fn snapshot(&self) -> String {
        self.label.to_string()
    }

    fn not_found(id: MatchId) -> ArenaError {
        ArenaError::MatchNotFound(id)
    }
}

fn item(label: &'static str) -> Item {
    Item {
        id: MatchId::new(),
        label,
    }
}

#[test]
fn test_create_get_list_remove() {
    let registry = Registry::new();
    let a = item("a");
    let b = item("b");
    let c = item("c");
    registry.create(a.clone());
    registry.create(b.clone());
    registry.create(c.clone());

    assert_eq!(registry.get(b.id).unwrap(), "b");
    assert_eq!(registry.list(), vec!["a", "b", "c"]);

    assert_eq!(registry.remove(b.id).unwrap(), b);
    assert_eq!(registry.list(), vec!["a", "c"]);
    assert_eq!(registry.len(), 2);
    assert!(!registry.contains(b.id));
}

#[test]
fn test_missing_ids_are_not_found() {
    let registry: Registry<Item> = Registry::new();
    let id = MatchId::new();
    assert_eq!(registry.get(id).unwrap_err(), ArenaError::MatchNotFound(id));
    assert!(registry.remove(id).unwrap_err().is_not_found());
    assert!(registry.is_empty());
}

#[test]
fn test_recreate_keeps_position_in_listing() {
    let registry = Registry::new();
    let a = item("a");
    registry.create(a.clone());
    registry.create(item("b"));
    registry.create(Item { label: "a2", ..a });
    assert_eq!(registry.list(), vec!["a2", "b"]);
}

#[test]
fn test_concurrent_creates() {
    let registry = std::sync::Arc::new(Registry::new());
    let threads: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            std::thread::spawn(move || {
                for _ in 0..50 {
                    registry.create(item("x"));
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }
    assert_eq!(registry.len(), 400);
    assert_eq!(registry.list().len(), 400);
}
