use bio::data_structures::interval_tree::IntervalTree;
use std::collections::HashMap;

use crate::containers::{BreakendPoint, ReadSpan};

/// Genomic interval intersection between read spans and cluster breakend points.
///
/// Both inputs are expected sorted by (contig, start). Every pair whose half-open
/// intervals overlap on the same contig is returned, ordered by span.
pub trait IntervalIntersector: Sync {
    fn intersect<'a>(
        &self,
        spans: &'a [ReadSpan],
        points: &'a [BreakendPoint],
    ) -> Vec<(&'a ReadSpan, &'a BreakendPoint)>;
}

/// Intersector backed by one interval tree of breakend points per contig
#[derive(Debug, Default, Clone, Copy)]
pub struct IntervalTreeIntersector;

impl IntervalIntersector for IntervalTreeIntersector {
    fn intersect<'a>(
        &self,
        spans: &'a [ReadSpan],
        points: &'a [BreakendPoint],
    ) -> Vec<(&'a ReadSpan, &'a BreakendPoint)> {
        let mut point_trees: HashMap<&str, IntervalTree<i64, usize>> = HashMap::new();
        for (point_idx, point) in points.iter().enumerate() {
            if point.end <= point.start {
                continue;
            }
            point_trees
                .entry(point.contig.as_str())
                .or_insert_with(IntervalTree::new)
                .insert(point.start..point.end, point_idx);
        }

        let mut overlaps = Vec::new();
        for span in spans.iter().filter(|span| span.end > span.start) {
            let tree = match point_trees.get(span.contig.as_str()) {
                Some(tree) => tree,
                None => continue,
            };
            let mut hits: Vec<usize> = tree
                .find(span.start..span.end)
                .map(|entry| *entry.data())
                .collect();
            // tree iteration order is not positional
            hits.sort_unstable();
            overlaps.extend(hits.into_iter().map(|point_idx| (span, &points[point_idx])));
        }
        overlaps
    }
}
