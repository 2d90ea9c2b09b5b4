//! Filter-then-sort over a set of candidate posts, shared by both stores

use rayon::prelude::*;
use std::collections::HashMap;

use crate::model::{Post, PostId};
use crate::query::{Predicate, SortSpec};

/// Ids of matching posts in `sort` order
///
/// Filtering runs in parallel; the output order depends only on the posts and
/// the sort, never on scheduling. A pool-sequence sort walks the stored
/// sequence instead, so a post listed twice appears twice.
#[must_use]
pub fn scan_posts(posts: &[Post], predicate: &Predicate, sort: &SortSpec) -> Vec<PostId> {
    if let Some(sequence) = sort.pool_sequence() {
        let by_id: HashMap<PostId, &Post> = posts.iter().map(|p| (p.id, p)).collect();
        return sequence
            .iter()
            .filter(|id| by_id.get(*id).is_some_and(|post| predicate.matches(post)))
            .copied()
            .collect();
    }

    let mut matched: Vec<&Post> = posts
        .par_iter()
        .filter(|post| predicate.matches(post))
        .collect();
    matched.sort_by(|a, b| sort.compare(a, b));
    matched.into_iter().map(|post| post.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Direction, SortField};

    fn posts() -> Vec<Post> {
        vec![
            Post::builder(1).score(5).tag_string("a").build(),
            Post::builder(2).score(9).tag_string("a b").build(),
            Post::builder(3).score(1).tag_string("b").build(),
        ]
    }

    #[test]
    fn test_filters_and_sorts() {
        let ids = scan_posts(
            &posts(),
            &Predicate::Tag("a".into()),
            &SortSpec::new(SortField::Score, Direction::Desc),
        );
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_pool_sequence_keeps_duplicates() {
        let sort = SortSpec::new(SortField::PoolSequence(vec![3, 1, 3, 9]), Direction::Asc);
        assert_eq!(scan_posts(&posts(), &Predicate::True, &sort), vec![3, 1, 3]);
        assert_eq!(
            scan_posts(&posts(), &Predicate::Tag("a".into()), &sort),
            vec![1]
        );
    }
}
