//! Change-set engine: diff source posts against stored headers.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::domain::{BlogKey, BlogPost, BlogPostBase};
use crate::error::DomainError;

/// Partition of a source fetch against what storage holds.
///
/// `unchanged` holds source posts identical to their stored copy. They are not
/// changes, but a full-replace commit has to write them back, so the engine
/// hands them over instead of discarding them.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub inserted: Vec<BlogPost>,
    pub updated: Vec<BlogPost>,
    pub deleted: Vec<BlogPostBase>,
    pub unchanged: Vec<BlogPost>,
}

impl ChangeSet {
    /// True when nothing needs to be written.
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Compute the change set for one blog.
///
/// Every source post leaves with its `hash` set. A post is updated when its
/// fingerprint differs from the stored hash, or, for stored rows without a
/// hash, when any header field differs. Duplicate source ids collapse to the
/// last occurrence.
///
/// Deletions: with no watermark the source snapshot is authoritative and every
/// stored post it lacks is deleted. With a watermark the fetch is incremental,
/// so a post is only deleted when the source enumerated its `live_ids` and the
/// id is missing from them.
pub fn diff(
    blog_key: &BlogKey,
    source_posts: Vec<BlogPost>,
    stored_posts: &[BlogPostBase],
    last_updated_at: Option<DateTime<Utc>>,
    live_ids: Option<&[String]>,
) -> Result<ChangeSet, DomainError> {
    if blog_key.is_all() {
        return Err(DomainError::Validation(
            "Cannot diff against the all-blogs key".to_string(),
        ));
    }
    if let Some(stray) = source_posts.iter().find(|p| p.blog_key != *blog_key) {
        return Err(DomainError::Validation(format!(
            "Source post {} belongs to blog '{}', expected '{}'",
            stray.id, stray.blog_key, blog_key
        )));
    }

    let mut unique: Vec<BlogPost> = Vec::with_capacity(source_posts.len());
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(source_posts.len());
    for post in source_posts {
        match positions.get(&post.id) {
            Some(&idx) => unique[idx] = post,
            None => {
                positions.insert(post.id.clone(), unique.len());
                unique.push(post);
            }
        }
    }

    let stored: HashMap<&str, &BlogPostBase> =
        stored_posts.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut change_set = ChangeSet::default();
    for mut post in unique {
        post.ensure_hash();
        match stored.get(post.id.as_str()) {
            None => change_set.inserted.push(post),
            Some(existing) => {
                let changed = match &existing.hash {
                    Some(hash) => post.hash.as_ref() != Some(hash),
                    None => !existing.same_fields(&post.base()),
                };
                if changed {
                    change_set.updated.push(post);
                } else {
                    change_set.unchanged.push(post);
                }
            }
        }
    }

    change_set.deleted = match (last_updated_at, live_ids) {
        (None, _) => stored_posts
            .iter()
            .filter(|p| !positions.contains_key(&p.id))
            .cloned()
            .collect(),
        (Some(_), Some(live)) => {
            let live: HashSet<&str> = live.iter().map(String::as_str).collect();
            stored_posts
                .iter()
                .filter(|p| !live.contains(p.id.as_str()) && !positions.contains_key(&p.id))
                .cloned()
                .collect()
        }
        (Some(_), None) => Vec::new(),
    };

    Ok(change_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn key() -> BlogKey {
        BlogKey::new("blog").unwrap()
    }

    fn post(id: &str, content: &str) -> BlogPost {
        let mut post = BlogPost::new(key(), id);
        post.title = format!("Post {id}");
        post.content = content.to_string();
        post.published_at = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        post.updated_at = post.published_at;
        post
    }

    fn stored(id: &str, content: &str) -> BlogPostBase {
        let mut p = post(id, content);
        p.ensure_hash();
        p.base()
    }

    fn ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> BTreeSet<String> {
        items.iter().map(|i| id(i).to_string()).collect()
    }

    #[test]
    fn test_full_sync_inserts_and_updates() {
        let source = vec![
            post("1", "a"),
            post("2", "changed"),
            post("3", "c"),
            post("4", "d"),
        ];
        let existing = vec![stored("2", "b"), stored("3", "c")];

        let set = diff(&key(), source, &existing, None, None).unwrap();

        assert_eq!(
            ids(&set.inserted, |p| p.id.as_str()),
            BTreeSet::from(["1".to_string(), "4".to_string()])
        );
        assert_eq!(set.updated.len(), 1);
        assert_eq!(set.updated[0].id, "2");
        assert_eq!(set.unchanged.len(), 1);
        assert_eq!(set.unchanged[0].id, "3");
        assert!(set.deleted.is_empty());
    }

    #[test]
    fn test_full_sync_deletes_missing() {
        let source = vec![post("2", "b")];
        let existing = vec![stored("1", "a"), stored("2", "b"), stored("3", "c")];

        let set = diff(&key(), source, &existing, None, None).unwrap();

        assert_eq!(
            ids(&set.deleted, |p| p.id.as_str()),
            BTreeSet::from(["1".to_string(), "3".to_string()])
        );
    }

    #[test]
    fn test_incremental_never_infers_deletions() {
        let source = vec![post("2", "new"), post("3", "c")];
        let existing = vec![
            stored("1", "a"),
            stored("2", "b"),
            stored("3", "c"),
            stored("4", "d"),
        ];
        let watermark = Some(Utc::now());

        let set = diff(&key(), source, &existing, watermark, None).unwrap();

        assert!(set.deleted.is_empty());
        assert_eq!(set.updated.len(), 1);
    }

    #[test]
    fn test_incremental_uses_live_ids() {
        let source = vec![post("2", "new")];
        let existing = vec![stored("1", "a"), stored("2", "b"), stored("3", "c")];
        let live = vec!["2".to_string(), "3".to_string()];

        let set = diff(&key(), source, &existing, Some(Utc::now()), Some(live.as_slice())).unwrap();

        assert_eq!(set.deleted.len(), 1);
        assert_eq!(set.deleted[0].id, "1");
    }

    #[test]
    fn test_duplicate_source_ids_last_wins() {
        let source = vec![post("1", "first"), post("1", "second")];

        let set = diff(&key(), source, &[], None, None).unwrap();

        assert_eq!(set.inserted.len(), 1);
        assert_eq!(set.inserted[0].content, "second");
    }

    #[test]
    fn test_stored_without_hash_compares_fields() {
        let mut unhashed = post("1", "a").base();
        unhashed.hash = None;
        let same = diff(
            &key(),
            vec![post("1", "whatever")],
            &[unhashed.clone()],
            None,
            None,
        )
        .unwrap();
        assert_eq!(same.unchanged.len(), 1);

        let mut retitled = post("1", "a");
        retitled.title = "Renamed".to_string();
        let changed = diff(&key(), vec![retitled], &[unhashed], None, None).unwrap();
        assert_eq!(changed.updated.len(), 1);
    }

    #[test]
    fn test_every_output_post_is_hashed() {
        let set = diff(&key(), vec![post("1", "a")], &[], None, None).unwrap();
        assert_eq!(set.inserted[0].hash.as_deref(), Some(post("1", "a").fingerprint().as_str()));
    }

    #[test]
    fn test_empty_inputs_are_valid() {
        let set = diff(&key(), Vec::new(), &[], None, None).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_rejects_sentinel_and_foreign_posts() {
        assert!(diff(&BlogKey::all(), Vec::new(), &[], None, None).is_err());

        let mut foreign = post("1", "a");
        foreign.blog_key = BlogKey::new("other").unwrap();
        assert!(matches!(
            diff(&key(), vec![foreign], &[], None, None),
            Err(DomainError::Validation(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_full_sync_partitions_source(
            source_ids in proptest::collection::btree_set(0u8..40, 0..25),
            stored_ids in proptest::collection::btree_set(0u8..40, 0..25),
            edits in proptest::collection::vec(any::<bool>(), 40),
        ) {
            let source: Vec<BlogPost> = source_ids
                .iter()
                .map(|id| post(&id.to_string(), if edits[*id as usize] { "edited" } else { "same" }))
                .collect();
            let existing: Vec<BlogPostBase> = stored_ids
                .iter()
                .map(|id| stored(&id.to_string(), "same"))
                .collect();

            let set = diff(&key(), source, &existing, None, None).unwrap();

            let to_s = |s: &BTreeSet<u8>| s.iter().map(|i| i.to_string()).collect::<BTreeSet<_>>();
            let src = to_s(&source_ids);
            let sto = to_s(&stored_ids);

            let inserted = ids(&set.inserted, |p| p.id.as_str());
            let updated = ids(&set.updated, |p| p.id.as_str());
            let unchanged = ids(&set.unchanged, |p| p.id.as_str());
            let deleted = ids(&set.deleted, |p| p.id.as_str());

            prop_assert_eq!(&inserted, &src.difference(&sto).cloned().collect::<BTreeSet<_>>());
            prop_assert!(updated.is_disjoint(&unchanged));
            prop_assert_eq!(
                &updated.union(&unchanged).cloned().collect::<BTreeSet<_>>(),
                &src.intersection(&sto).cloned().collect::<BTreeSet<_>>()
            );
            for id in &updated {
                let n: usize = id.parse().unwrap();
                prop_assert!(edits[n]);
            }
            prop_assert_eq!(&deleted, &sto.difference(&src).cloned().collect::<BTreeSet<_>>());
        }

        #[test]
        fn prop_incremental_without_live_ids_deletes_nothing(
            source_ids in proptest::collection::btree_set(0u8..40, 0..25),
            stored_ids in proptest::collection::btree_set(0u8..40, 0..25),
        ) {
            let source: Vec<BlogPost> = source_ids.iter().map(|id| post(&id.to_string(), "x")).collect();
            let existing: Vec<BlogPostBase> = stored_ids.iter().map(|id| stored(&id.to_string(), "y")).collect();

            let set = diff(&key(), source, &existing, Some(Utc::now()), None).unwrap();

            prop_assert!(set.deleted.is_empty());
        }
    }
}
