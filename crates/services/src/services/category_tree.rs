//! Parent/child category hierarchy: root resolution, descendant expansion,
//! display trees and grouping of posts under their root category.

use std::collections::{HashMap, HashSet, VecDeque};

use db::models::{
    locale::Locale,
    post_category::{PostCategory, PostCategoryTranslation},
};
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;
use utils::text::collate;
use uuid::Uuid;

use super::listing::Listing;

pub const UNCATEGORIZED_SLUG: &str = "uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryTreeError {
    #[error("malformed category graph: parent chain from {start} loops back on itself after {} steps", .path.len())]
    Cycle { start: Uuid, path: Vec<Uuid> },
}

/// Immutable id → parent adjacency built from a flat category list.
#[derive(Debug, Clone, Default)]
pub struct CategoryForest {
    parents: HashMap<Uuid, Option<Uuid>>,
    children: HashMap<Uuid, Vec<Uuid>>,
}

impl CategoryForest {
    pub fn from_links<I>(links: I) -> Self
    where
        I: IntoIterator<Item = (Uuid, Option<Uuid>)>,
    {
        let mut parents = HashMap::new();
        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (id, parent) in links {
            parents.insert(id, parent);
            if let Some(parent) = parent {
                children.entry(parent).or_default().push(id);
            }
        }
        Self { parents, children }
    }

    pub fn from_categories(categories: &[PostCategory]) -> Self {
        Self::from_links(categories.iter().map(|c| (c.id, c.parent_id)))
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.parents.contains_key(&id)
    }

    pub fn parent_of(&self, id: Uuid) -> Option<Uuid> {
        self.parents.get(&id).copied().flatten()
    }

    pub fn children_of(&self, id: Uuid) -> &[Uuid] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Walks parent pointers from `id` up to the top-level category.
    ///
    /// An id that is not in the forest is its own root, and so is a parent id
    /// that points outside the forest.
    pub fn resolve_root(&self, id: Uuid) -> Result<Uuid, CategoryTreeError> {
        self.ancestors(id)
            .map(|chain| *chain.last().unwrap_or(&id))
    }

    /// The chain `[id, parent, grandparent, .., root]`.
    pub fn ancestors(&self, id: Uuid) -> Result<Vec<Uuid>, CategoryTreeError> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = id;
        loop {
            if !seen.insert(current) {
                return Err(CategoryTreeError::Cycle { start: id, path: chain });
            }
            chain.push(current);
            match self.parents.get(&current) {
                Some(Some(parent)) => current = *parent,
                _ => return Ok(chain),
            }
        }
    }

    /// `id` together with every category below it.
    pub fn descendants(&self, id: Uuid) -> HashSet<Uuid> {
        let mut found = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            for child in self.children_of(next) {
                if found.insert(*child) {
                    queue.push_back(*child);
                }
            }
        }
        found
    }

    /// Union of [`Self::descendants`] over every selected id.
    pub fn expand_selection<'a, I>(&self, selected: I) -> HashSet<Uuid>
    where
        I: IntoIterator<Item = &'a Uuid>,
    {
        selected
            .into_iter()
            .flat_map(|id| self.descendants(*id))
            .collect()
    }

    /// True if making `new_parent` the parent of `id` would close a loop.
    pub fn would_create_cycle(&self, id: Uuid, new_parent: Uuid) -> bool {
        new_parent == id || self.descendants(id).contains(&new_parent)
    }

    /// Fails on the first category whose parent chain loops.
    pub fn validate(&self) -> Result<(), CategoryTreeError> {
        for id in self.parents.keys() {
            self.resolve_root(*id)?;
        }
        Ok(())
    }
}

/// Localized display fields of a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
pub struct CategoryLabel {
    pub name: String,
    pub slug: String,
}

/// Picks each category's translation for `locale`, falling back to the
/// default locale. Categories with no translation at all get no label.
pub fn labels_for_locale(
    translations: &[PostCategoryTranslation],
    locale: Locale,
) -> HashMap<Uuid, CategoryLabel> {
    let mut labels: HashMap<Uuid, (Locale, CategoryLabel)> = HashMap::new();
    for t in translations {
        let rank = |l: Locale| {
            if l == locale {
                0
            } else if l == Locale::default() {
                1
            } else {
                2
            }
        };
        let candidate = CategoryLabel {
            name: t.name.clone(),
            slug: t.slug.clone(),
        };
        match labels.get(&t.category_id) {
            Some((existing, _)) if rank(*existing) <= rank(t.locale) => {}
            _ => {
                labels.insert(t.category_id, (t.locale, candidate));
            }
        }
    }
    labels.into_iter().map(|(id, (_, label))| (id, label)).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
pub struct CategoryNode {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub position: i32,
    /// Posts filed under this category or any category below it.
    pub post_count: usize,
    pub children: Vec<CategoryNode>,
}

/// Nests the flat category list into display trees ordered by position and
/// then name. A category whose parent is missing from the list is shown as a
/// root.
pub fn build_tree(
    categories: &[PostCategory],
    labels: &HashMap<Uuid, CategoryLabel>,
    direct_counts: &HashMap<Uuid, usize>,
) -> Result<Vec<CategoryNode>, CategoryTreeError> {
    let forest = CategoryForest::from_categories(categories);
    forest.validate()?;

    let by_id: HashMap<Uuid, &PostCategory> = categories.iter().map(|c| (c.id, c)).collect();

    fn node(
        category: &PostCategory,
        forest: &CategoryForest,
        by_id: &HashMap<Uuid, &PostCategory>,
        labels: &HashMap<Uuid, CategoryLabel>,
        direct_counts: &HashMap<Uuid, usize>,
    ) -> CategoryNode {
        let mut children: Vec<CategoryNode> = forest
            .children_of(category.id)
            .iter()
            .filter_map(|id| by_id.get(id))
            .map(|child| node(child, forest, by_id, labels, direct_counts))
            .collect();
        sort_nodes(&mut children);

        let (name, slug) = match labels.get(&category.id) {
            Some(label) => (label.name.clone(), label.slug.clone()),
            None => (category.slug.clone(), category.slug.clone()),
        };
        let own = direct_counts.get(&category.id).copied().unwrap_or(0);
        let post_count = own + children.iter().map(|c| c.post_count).sum::<usize>();

        CategoryNode {
            id: category.id,
            parent_id: category.parent_id,
            name,
            slug,
            position: category.position,
            post_count,
            children,
        }
    }

    let mut roots: Vec<CategoryNode> = categories
        .iter()
        .filter(|c| c.parent_id.is_none_or(|parent| !by_id.contains_key(&parent)))
        .map(|c| node(c, &forest, &by_id, labels, direct_counts))
        .collect();
    sort_nodes(&mut roots);
    Ok(roots)
}

fn sort_nodes(nodes: &mut [CategoryNode]) {
    nodes.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| collate(&a.name, &b.name)));
}

/// Posts sharing one root category.
#[derive(Debug, Clone, Serialize)]
pub struct PostGroup<'a, T> {
    /// `None` for the placeholder group.
    pub root_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub posts: Vec<&'a T>,
}

/// Groups `posts` under their resolved root category, keeping the incoming
/// post order inside each group and ordering groups by first appearance.
///
/// Posts without a category, and posts whose root has no label, share a
/// single placeholder group named for `locale`.
pub fn group_by_root<'a, T, I>(
    forest: &CategoryForest,
    labels: &HashMap<Uuid, CategoryLabel>,
    posts: I,
    locale: Locale,
) -> Result<Vec<PostGroup<'a, T>>, CategoryTreeError>
where
    T: Listing,
    I: IntoIterator<Item = &'a T>,
{
    let mut groups: Vec<PostGroup<'a, T>> = Vec::new();
    let mut index: HashMap<Option<Uuid>, usize> = HashMap::new();

    for post in posts {
        let root = match post.category_id() {
            Some(leaf) => Some(forest.resolve_root(leaf)?),
            None => None,
        };
        let label = root.and_then(|r| labels.get(&r).map(|l| (r, l)));
        let key = label.map(|(r, _)| r);

        let slot = *index.entry(key).or_insert_with(|| {
            let (name, slug) = match label {
                Some((_, l)) => (l.name.clone(), l.slug.clone()),
                None => (
                    locale.uncategorized_label().to_string(),
                    UNCATEGORIZED_SLUG.to_string(),
                ),
            };
            groups.push(PostGroup {
                root_id: key,
                name,
                slug,
                posts: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].posts.push(post);
    }

    Ok(groups)
}

/// Number of posts filed directly under each category.
pub fn direct_post_counts<'a, T, I>(posts: I) -> HashMap<Uuid, usize>
where
    T: Listing + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut counts = HashMap::new();
    for post in posts {
        if let Some(id) = post.category_id() {
            *counts.entry(id).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;

    use super::*;

    struct Item {
        id: u32,
        category_id: Option<Uuid>,
    }

    impl Listing for Item {
        fn title(&self) -> &str {
            ""
        }

        fn search_fields(&self) -> Vec<&str> {
            Vec::new()
        }

        fn published_at(&self) -> Option<DateTime<Utc>> {
            None
        }

        fn category_id(&self) -> Option<Uuid> {
            self.category_id
        }
    }

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn label(name: &str) -> CategoryLabel {
        CategoryLabel {
            name: name.to_string(),
            slug: utils::text::slugify(name),
        }
    }

    fn category(n: u128, parent: Option<u128>, position: i32) -> PostCategory {
        PostCategory {
            id: id(n),
            parent_id: parent.map(id),
            slug: format!("cat-{n}"),
            position,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn resolves_three_level_chain_to_root() {
        let (a, b, c) = (id(1), id(2), id(3));
        let forest = CategoryForest::from_links([(a, None), (b, Some(a)), (c, Some(b))]);
        assert_eq!(forest.resolve_root(c).unwrap(), a);
        assert_eq!(forest.resolve_root(a).unwrap(), a);
        assert_eq!(forest.ancestors(c).unwrap(), vec![c, b, a]);
    }

    #[test]
    fn missing_category_is_its_own_root() {
        let forest = CategoryForest::from_links([(id(1), None)]);
        assert_eq!(forest.resolve_root(id(99)).unwrap(), id(99));
    }

    #[test]
    fn dangling_parent_becomes_the_root() {
        let forest = CategoryForest::from_links([(id(2), Some(id(7)))]);
        assert_eq!(forest.resolve_root(id(2)).unwrap(), id(7));
    }

    #[test]
    fn cycle_is_reported_not_looped() {
        let forest = CategoryForest::from_links([
            (id(1), Some(id(3))),
            (id(2), Some(id(1))),
            (id(3), Some(id(2))),
        ]);
        let err = forest.resolve_root(id(2)).unwrap_err();
        assert!(matches!(err, CategoryTreeError::Cycle { start, ref path } if start == id(2) && path.len() == 3));
        assert!(err.to_string().contains("malformed category graph"));
        assert!(forest.validate().is_err());
        // Descendant expansion terminates on the same graph.
        assert_eq!(forest.descendants(id(1)).len(), 3);
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let forest = CategoryForest::from_links([(id(1), Some(id(1)))]);
        assert!(forest.resolve_root(id(1)).is_err());
    }

    #[test]
    fn expand_selection_covers_depth_three() {
        let forest = CategoryForest::from_links([
            (id(1), None),
            (id(2), Some(id(1))),
            (id(3), Some(id(2))),
            (id(4), None),
        ]);
        let expanded = forest.expand_selection(&[id(1)]);
        assert_eq!(expanded, HashSet::from([id(1), id(2), id(3)]));
        assert!(forest.would_create_cycle(id(1), id(3)));
        assert!(!forest.would_create_cycle(id(3), id(4)));
    }

    #[test]
    fn groups_fixture_post_under_root() {
        let (a, b, c) = (id(1), id(2), id(3));
        let forest = CategoryForest::from_links([(a, None), (b, Some(a)), (c, Some(b))]);
        let labels = HashMap::from([(a, label("Corporate"))]);
        let posts = vec![Item { id: 1, category_id: Some(c) }];

        let groups = group_by_root(&forest, &labels, &posts, Locale::En).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].root_id, Some(a));
        assert_eq!(groups[0].name, "Corporate");
        assert_eq!(groups[0].posts[0].id, 1);
    }

    #[test]
    fn unlabeled_and_uncategorized_share_placeholder() {
        let forest = CategoryForest::from_links([(id(1), None), (id(2), None)]);
        let labels = HashMap::from([(id(1), label("Tax"))]);
        let posts = vec![
            Item { id: 1, category_id: Some(id(2)) },
            Item { id: 2, category_id: Some(id(1)) },
            Item { id: 3, category_id: None },
        ];

        let groups = group_by_root(&forest, &labels, &posts, Locale::Fr).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].root_id, None);
        assert_eq!(groups[0].name, "Sans catégorie");
        assert_eq!(groups[0].slug, UNCATEGORIZED_SLUG);
        assert_eq!(groups[0].posts.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(groups[1].name, "Tax");
    }

    #[test]
    fn build_tree_aggregates_counts_and_orders_children() {
        let categories = vec![
            category(1, None, 0),
            category(2, Some(1), 1),
            category(3, Some(1), 0),
            category(4, Some(2), 0),
        ];
        let labels = HashMap::from([(id(1), label("Litigation")), (id(3), label("Appeals"))]);
        let counts = HashMap::from([(id(1), 1), (id(4), 2), (id(3), 1)]);

        let tree = build_tree(&categories, &labels, &counts).unwrap();
        assert_eq!(tree.len(), 1);
        let root = &tree[0];
        assert_eq!(root.name, "Litigation");
        assert_eq!(root.post_count, 4);
        assert_eq!(root.children[0].id, id(3));
        assert_eq!(root.children[1].id, id(2));
        assert_eq!(root.children[1].name, "cat-2");
        assert_eq!(root.children[1].post_count, 2);
    }

    #[test]
    fn build_tree_rejects_cycles() {
        let categories = vec![category(1, Some(2), 0), category(2, Some(1), 0)];
        assert!(build_tree(&categories, &HashMap::new(), &HashMap::new()).is_err());
    }

    #[test]
    fn labels_prefer_requested_then_default_locale() {
        let t = |n: u128, locale, name: &str| PostCategoryTranslation {
            category_id: id(n),
            locale,
            name: name.to_string(),
            slug: utils::text::slugify(name),
        };
        let translations = vec![
            t(1, Locale::Fr, "Fiscalité"),
            t(1, Locale::En, "Tax"),
            t(1, Locale::De, "Steuern"),
            t(2, Locale::Fr, "Travail"),
            t(2, Locale::En, "Employment"),
        ];
        let labels = labels_for_locale(&translations, Locale::De);
        assert_eq!(labels[&id(1)].name, "Steuern");
        assert_eq!(labels[&id(2)].name, "Employment");
    }

    /// Forest where node `i` points at a parent with a smaller index, so it is
    /// acyclic by construction.
    fn acyclic_forest() -> impl Strategy<Value = Vec<(u128, Option<u128>)>> {
        prop::collection::vec(any::<prop::sample::Index>(), 1..40).prop_map(|picks| {
            picks
                .iter()
                .enumerate()
                .map(|(i, pick)| {
                    let parent = if i == 0 { None } else {
                        let p = pick.index(i + 1);
                        (p < i).then_some(p as u128)
                    };
                    (i as u128, parent)
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn resolved_root_has_no_parent_and_is_idempotent(links in acyclic_forest()) {
            let forest = CategoryForest::from_links(links.iter().map(|(i, p)| (id(*i), p.map(id))));
            for (leaf, _) in &links {
                let root = forest.resolve_root(id(*leaf)).unwrap();
                prop_assert!(forest.parent_of(root).is_none());
                prop_assert_eq!(forest.resolve_root(root).unwrap(), root);
                prop_assert!(forest.descendants(root).contains(&id(*leaf)));
            }
        }
    }
}
