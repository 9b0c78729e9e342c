//! Lightweight trie hits, the bounded per-criterion queues that collect
//! them, and the promoted candidate record.
//!
//! A hit is cheap: key, rank byte, point, matched language, and the two
//! distances precomputed against the viewport center and the user position.
//! Promotion to a full [`Candidate`] (name, country, types) happens only for
//! hits that survive the queues.

use crate::geometry::Point;
use crate::interface::{FeatureKey, SearchResult};
use crate::models::{FeatureType, Geometry, LangCode};

/// Number of ranking criteria; one bounded queue per criterion.
pub(crate) const CRITERIA_COUNT: usize = 3;

/// A feature reached through the trie walk.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TrieHit {
    pub key: FeatureKey,
    pub rank: u8,
    pub point: Point,
    pub lang: LangCode,
    pub viewport_distance: f64,
    pub user_distance: f64,
}

impl TrieHit {
    pub(crate) fn new(
        key: FeatureKey,
        rank: u8,
        point: Point,
        lang: LangCode,
        viewport_center: Point,
        position: Option<Point>,
    ) -> Self {
        Self {
            key,
            rank,
            point,
            lang,
            viewport_distance: point.distance_sq(viewport_center),
            user_distance: position.map_or(f64::INFINITY, |p| point.distance_sq(p)),
        }
    }
}

/// `true` when `a` strictly precedes `b` under one criterion.
type HitCmp = fn(&TrieHit, &TrieHit) -> bool;

fn less_rank(a: &TrieHit, b: &TrieHit) -> bool {
    a.rank > b.rank
}

fn less_viewport_distance(a: &TrieHit, b: &TrieHit) -> bool {
    a.viewport_distance < b.viewport_distance
}

fn less_user_distance(a: &TrieHit, b: &TrieHit) -> bool {
    a.user_distance < b.user_distance
}

static HIT_COMPARATORS: [HitCmp; CRITERIA_COUNT] =
    [less_rank, less_viewport_distance, less_user_distance];

/// Keeps the best `capacity` hits under one ordering. Insertion deduplicates
/// by feature key; overflow displaces the current worst.
#[derive(Debug)]
struct BoundedQueue {
    capacity: usize,
    better: HitCmp,
    items: Vec<TrieHit>,
}

impl BoundedQueue {
    fn new(capacity: usize, better: HitCmp) -> Self {
        Self { capacity, better, items: Vec::with_capacity(capacity) }
    }

    fn push(&mut self, hit: TrieHit) {
        if self.capacity == 0 || self.items.iter().any(|h| h.key == hit.key) {
            return;
        }
        if self.items.len() < self.capacity {
            self.items.push(hit);
            return;
        }
        let mut worst = 0;
        for i in 1..self.items.len() {
            if (self.better)(&self.items[worst], &self.items[i]) {
                worst = i;
            }
        }
        if (self.better)(&hit, &self.items[worst]) {
            self.items[worst] = hit;
        }
    }
}

/// The candidate store: one bounded queue per criterion, filled in lockstep
/// by the trie matcher. The same hit may enter several queues; the union is
/// deduplicated on drain.
pub(crate) struct CandidateQueues {
    queues: [BoundedQueue; CRITERIA_COUNT],
    viewport_center: Point,
    position: Option<Point>,
}

impl CandidateQueues {
    pub(crate) fn new(capacity: usize, viewport_center: Point, position: Option<Point>) -> Self {
        let queues = [
            BoundedQueue::new(capacity, HIT_COMPARATORS[0]),
            BoundedQueue::new(capacity, HIT_COMPARATORS[1]),
            BoundedQueue::new(capacity, HIT_COMPARATORS[2]),
        ];
        Self { queues, viewport_center, position }
    }

    /// Build a hit from a trie value and offer it to every queue.
    pub(crate) fn push_hit(&mut self, key: FeatureKey, rank: u8, point: Point, lang: LangCode) {
        let hit = TrieHit::new(key, rank, point, lang, self.viewport_center, self.position);
        for queue in &mut self.queues {
            queue.push(hit);
        }
    }

    /// Union of all queues, deduplicated by feature key, in key order.
    pub(crate) fn drain_unique(self) -> Vec<TrieHit> {
        let mut hits: Vec<TrieHit> =
            self.queues.into_iter().flat_map(|q| q.items).collect();
        hits.sort_by_key(|h| h.key);
        hits.dedup_by_key(|h| h.key);
        hits
    }
}

/// A hit promoted to a full result candidate.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub key: FeatureKey,
    pub rank: u8,
    pub name: String,
    pub penalty: u32,
    pub country: String,
    pub point: Point,
    pub types: Vec<FeatureType>,
    pub geometry: Geometry,
    pub viewport_distance: f64,
    pub user_distance: f64,
}

impl Candidate {
    pub(crate) fn into_result(self) -> SearchResult {
        SearchResult::Feature {
            key: self.key,
            name: self.name,
            country: self.country,
            point: self.point,
            types: self.types,
            geometry: self.geometry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(offset: u32) -> FeatureKey {
        FeatureKey::new(offset, 0)
    }

    fn queues(capacity: usize) -> CandidateQueues {
        CandidateQueues::new(capacity, Point::new(0.0, 0.0), None)
    }

    #[test]
    fn test_push_dedupes_by_key() {
        let mut q = queues(4);
        q.push_hit(key(1), 10, Point::new(1.0, 0.0), 1);
        q.push_hit(key(1), 99, Point::new(2.0, 0.0), 3);
        let hits = q.drain_unique();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].rank, 10, "first insertion wins");
    }

    #[test]
    fn test_overflow_displaces_worst_rank() {
        let mut q = queues(2);
        q.push_hit(key(1), 10, Point::new(0.0, 0.0), 1);
        q.push_hit(key(2), 30, Point::new(0.0, 0.0), 1);
        q.push_hit(key(3), 20, Point::new(0.0, 0.0), 1);

        let ranks: Vec<u8> = {
            let mut r: Vec<u8> = q.queues[0].items.iter().map(|h| h.rank).collect();
            r.sort_unstable();
            r
        };
        assert_eq!(ranks, vec![20, 30], "rank 10 displaced");
    }

    #[test]
    fn test_overflow_keeps_closest_to_viewport() {
        let mut q = queues(2);
        q.push_hit(key(1), 0, Point::new(9.0, 0.0), 1);
        q.push_hit(key(2), 0, Point::new(1.0, 0.0), 1);
        q.push_hit(key(3), 0, Point::new(2.0, 0.0), 1);

        let mut dists: Vec<f64> =
            q.queues[1].items.iter().map(|h| h.viewport_distance).collect();
        dists.sort_by(f64::total_cmp);
        assert_eq!(dists, vec![1.0, 4.0]);
    }

    #[test]
    fn test_worse_hit_does_not_displace() {
        let mut q = queues(1);
        q.push_hit(key(1), 50, Point::new(0.0, 0.0), 1);
        q.push_hit(key(2), 10, Point::new(0.0, 0.0), 1);
        assert_eq!(q.queues[0].items[0].key, key(1));
    }

    #[test]
    fn test_unknown_position_queue_still_functions() {
        let mut q = queues(2);
        q.push_hit(key(1), 1, Point::new(1.0, 1.0), 1);
        q.push_hit(key(2), 2, Point::new(2.0, 2.0), 1);
        q.push_hit(key(3), 3, Point::new(3.0, 3.0), 1);
        // All user distances are infinite; the queue holds capacity items
        // without preference and never panics.
        assert_eq!(q.queues[2].items.len(), 2);
        assert!(q.queues[2].items.iter().all(|h| h.user_distance.is_infinite()));
    }

    #[test]
    fn test_drain_unique_unions_queues() {
        let mut q = queues(2);
        // key 1: best rank, far from viewport. key 2: close, low rank.
        q.push_hit(key(1), 200, Point::new(50.0, 0.0), 1);
        q.push_hit(key(2), 1, Point::new(0.1, 0.0), 1);
        q.push_hit(key(3), 100, Point::new(5.0, 0.0), 1);
        let hits = q.drain_unique();
        let keys: Vec<FeatureKey> = hits.iter().map(|h| h.key).collect();
        assert_eq!(keys, vec![key(1), key(2), key(3)]);
    }

    #[test]
    fn test_zero_capacity() {
        let mut q = queues(0);
        q.push_hit(key(1), 10, Point::new(0.0, 0.0), 1);
        assert!(q.drain_unique().is_empty());
    }
}
