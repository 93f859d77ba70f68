//! Merge-by-id reconciliation of a local collection with a fetched one.

use std::collections::HashMap;

use crate::record::Record;

/// Merge `incoming` into `existing`, keyed by record id.
///
/// Ids keep the position where they were first seen: `existing` order first,
/// ids new in `incoming` appended after. For an id present in both, the
/// output holds the `incoming` record unchanged. A later duplicate inside
/// either input overwrites the earlier one in place.
pub fn merge_by_id<R: Record>(existing: &[R], incoming: &[R]) -> Vec<R> {
    merge_with(
        existing.iter().cloned(),
        incoming.iter().cloned(),
        |record| record.id().to_string(),
        |_, incoming| incoming,
    )
}

/// Ordered upsert of `incoming` over `existing` by `key`.
///
/// `resolve(old, new)` produces the value stored when a key is seen again.
pub(crate) fn merge_with<T, K, F>(
    existing: impl IntoIterator<Item = T>,
    incoming: impl IntoIterator<Item = T>,
    key: K,
    mut resolve: F,
) -> Vec<T>
where
    K: Fn(&T) -> String,
    F: FnMut(T, T) -> T,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut slots: Vec<Option<T>> = Vec::new();

    for item in existing.into_iter().chain(incoming) {
        let id = key(&item);
        match index.get(&id) {
            Some(&position) => {
                let merged = match slots[position].take() {
                    Some(previous) => resolve(previous, item),
                    None => item,
                };
                slots[position] = Some(merged);
            }
            None => {
                index.insert(id, slots.len());
                slots.push(Some(item));
            }
        }
    }

    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::HashSet;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Post {
        id: String,
        content: String,
    }

    impl Record for Post {
        const COLLECTION: &'static str = "posts";
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn post(id: &str, content: &str) -> Post {
        Post {
            id: id.into(),
            content: content.into(),
        }
    }

    fn ids(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.id()).collect()
    }

    #[test]
    fn incoming_wins_on_collision() {
        let existing = vec![post("1", "local"), post("2", "local")];
        let incoming = vec![post("2", "server")];

        let merged = merge_by_id(&existing, &incoming);
        assert_eq!(merged, vec![post("1", "local"), post("2", "server")]);
    }

    #[test]
    fn new_ids_are_appended_in_incoming_order() {
        let existing = vec![post("b", "x"), post("a", "x")];
        let incoming = vec![post("d", "y"), post("a", "y"), post("c", "y")];

        let merged = merge_by_id(&existing, &incoming);
        assert_eq!(ids(&merged), vec!["b", "a", "d", "c"]);
        assert_eq!(merged[1].content, "y");
    }

    #[test]
    fn merge_is_idempotent() {
        let a = vec![post("1", "a1"), post("2", "a2"), post("3", "a3")];
        let b = vec![post("3", "b3"), post("4", "b4"), post("1", "b1")];

        let once = merge_by_id(&a, &b);
        let twice = merge_by_id(&once, &b);
        assert_eq!(once, twice);
    }

    #[test]
    fn output_ids_are_the_union_without_duplicates() {
        let a = vec![post("1", "a"), post("2", "a"), post("2", "dup")];
        let b = vec![post("2", "b"), post("5", "b"), post("5", "b again")];

        let merged = merge_by_id(&a, &b);
        let seen: HashSet<&str> = ids(&merged).into_iter().collect();
        assert_eq!(merged.len(), seen.len());
        assert_eq!(seen, ["1", "2", "5"].into_iter().collect());
        assert_eq!(merged[1], post("2", "b"));
        assert_eq!(merged[2], post("5", "b again"));
    }

    #[test]
    fn empty_inputs() {
        let merged = merge_by_id::<Post>(&[], &[]);
        assert!(merged.is_empty());

        let only_incoming = merge_by_id(&[], &[post("1", "x")]);
        assert_eq!(only_incoming, vec![post("1", "x")]);
    }

    #[test]
    fn created_then_edited_on_server() {
        let local = vec![post("1001", "hello")];
        let merged = merge_by_id(&local, &[post("1001", "hello (edited)")]);
        assert_eq!(merged, vec![post("1001", "hello (edited)")]);
    }
}
