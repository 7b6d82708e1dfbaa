use log::debug;
use std::collections::{HashMap, HashSet};
use std::time::SystemTime;

use crate::containers::{BreakendPoint, CoordinateCluster, ReadEvidenceId, ReadSpan, SvType};
use crate::interval_intersector::IntervalIntersector;
use crate::utils;

/// Shrink read alignments so that reads merely touching a breakend with their
/// clipped ends are not counted as overlapping it.
pub fn trim_read_spans(spans: Vec<ReadSpan>) -> Vec<ReadSpan> {
    let mut trimmed: Vec<ReadSpan> = spans
        .into_iter()
        .filter_map(|mut span| {
            span.end -= utils::SPAN_TRIM;
            if span.start > utils::SPAN_TRIM_MIN_START {
                span.start += utils::SPAN_TRIM;
            }
            if span.end - span.start <= 0 {
                return None;
            }
            Some(span)
        })
        .collect();
    trimmed.sort();
    trimmed
}

/// Trimmed read spans keyed by contig, each list sorted by start
pub type SpansByContig = HashMap<String, Vec<ReadSpan>>;

/// Split sorted read spans by contig so each window only intersects the contigs it touches
pub fn group_spans_by_contig(spans: Vec<ReadSpan>) -> SpansByContig {
    let mut spans_by_contig = SpansByContig::new();
    for span in spans {
        spans_by_contig
            .entry(span.contig.clone())
            .or_default()
            .push(span);
    }
    spans_by_contig
}

/// Single-base points for both sides of every cluster, sorted by contig then start
pub fn breakend_points(clusters: &[CoordinateCluster]) -> Vec<BreakendPoint> {
    let mut points = Vec::new();
    for (cluster_idx, cluster) in clusters.iter().enumerate() {
        let sides = std::iter::once(&cluster.first).chain(cluster.second.iter());
        for (side, pos) in (1u8..).zip(sides) {
            points.push(BreakendPoint {
                contig: pos.contig.clone(),
                start: pos.pos,
                end: pos.pos + 1,
                sv_type: cluster.sv_type,
                side,
                cluster_idx,
            });
        }
    }
    points.sort_by(|a, b| {
        (a.contig.as_str(), a.start, a.cluster_idx, a.side)
            .cmp(&(b.contig.as_str(), b.start, b.cluster_idx, b.side))
    });
    points
}

/// Set the normal coverage tally of each cluster from the reads that overlap its
/// breakends without supporting it.
///
/// Spans should already be trimmed with [`trim_read_spans`]. Only the contigs holding
/// a breakend of these clusters are intersected.
pub fn compute_normal_coverage(
    clusters: &mut [CoordinateCluster],
    spans_by_contig: &SpansByContig,
    intersector: &dyn IntervalIntersector,
) {
    let start_time = SystemTime::now();
    let points = breakend_points(clusters);

    let mut overlaps = Vec::new();
    let mut begin_iter: usize = 0;
    while begin_iter < points.len() {
        let contig = &points[begin_iter].contig;
        let end_iter = begin_iter
            + points[begin_iter..]
                .iter()
                .take_while(|point| &point.contig == contig)
                .count();
        if let Some(spans) = spans_by_contig.get(contig) {
            overlaps.extend(intersector.intersect(spans, &points[begin_iter..end_iter]));
        }
        begin_iter = end_iter;
    }

    let member_reads: Vec<HashSet<&str>> = clusters
        .iter()
        .map(|cluster| cluster.physical_reads())
        .collect();
    let mut side_reads: HashMap<(usize, u8), HashSet<String>> = HashMap::new();
    for (span, point) in overlaps {
        let physical = ReadEvidenceId::from(span.name.as_str()).physical;
        if member_reads[point.cluster_idx].contains(physical.as_str()) {
            continue;
        }
        side_reads
            .entry((point.cluster_idx, point.side))
            .or_default()
            .insert(physical);
    }

    let empty = HashSet::new();
    for (cluster_idx, cluster) in clusters.iter_mut().enumerate() {
        let first = side_reads.get(&(cluster_idx, 1)).unwrap_or(&empty);
        let second = side_reads.get(&(cluster_idx, 2)).unwrap_or(&empty);
        cluster.normal_coverage = aggregate_tally(cluster, first, second);
        debug!(
            "{} {} normal coverage {}",
            cluster.label(),
            cluster.sv_type,
            cluster.normal_coverage
        );
    }
    debug!(
        "Normal coverage: {}s",
        start_time.elapsed().unwrap_or_default().as_secs()
    );
}

/// Combine the per-side tallies according to how the SV type's breakends relate
fn aggregate_tally(
    cluster: &CoordinateCluster,
    first: &HashSet<String>,
    second: &HashSet<String>,
) -> u32 {
    if !cluster.is_paired() || cluster.sv_type == SvType::BpNovIns {
        return first.len() as u32;
    }
    match cluster.sv_type {
        SvType::Del | SvType::Inv | SvType::InvPair | SvType::NovIns => {
            utils::round_mean(&[first.len() as i64, second.len() as i64]) as u32
        }
        SvType::TDupl => first.intersection(second).count() as u32,
        _ => std::cmp::min(first.len(), second.len()) as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::ContigPos;
    use crate::interval_intersector::IntervalTreeIntersector;
    use std::collections::BTreeSet;

    fn create_test_span(start: i64, end: i64, name: &str) -> ReadSpan {
        ReadSpan::new("chr1".to_string(), start, end, name.to_string())
    }

    fn create_test_cluster(
        first: i64,
        second: Option<i64>,
        sv_type: SvType,
        reads: &[&str],
    ) -> CoordinateCluster {
        let members: BTreeSet<ReadEvidenceId> =
            reads.iter().map(|read| ReadEvidenceId::from(*read)).collect();
        CoordinateCluster {
            first: ContigPos::new("chr1".to_string(), first),
            second: second.map(|pos| ContigPos::new("chr1".to_string(), pos)),
            lead: ReadEvidenceId::from(reads[0]),
            members,
            sv_type,
            normal_coverage: 0,
        }
    }

    fn names(set: &[&str]) -> HashSet<String> {
        set.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_trim_read_spans() {
        let spans = vec![
            create_test_span(500, 5000, "a"),
            create_test_span(150, 5000, "b"),
            create_test_span(250, 400, "c"),
            create_test_span(0, 100, "d"),
        ];
        let trimmed = trim_read_spans(spans);
        assert_eq!(
            trimmed,
            vec![
                create_test_span(150, 4900, "b"),
                create_test_span(600, 4900, "a"),
            ]
        );
    }

    #[test]
    fn test_breakend_points_sides() {
        let clusters = vec![
            create_test_cluster(3000, Some(5000), SvType::Del, &["r1", "r2"]),
            create_test_cluster(1000, None, SvType::BpNovIns, &["r3", "r4"]),
        ];
        let points = breakend_points(&clusters);
        assert_eq!(points.len(), 3);
        assert_eq!((points[0].start, points[0].side, points[0].cluster_idx), (1000, 1, 1));
        assert_eq!((points[1].start, points[1].side, points[1].cluster_idx), (3000, 1, 0));
        assert_eq!((points[2].start, points[2].side, points[2].cluster_idx), (5000, 2, 0));
        assert_eq!(points[2].end, 5001);
        assert_eq!(points[2].sv_type, SvType::Del);
    }

    #[test]
    fn test_members_are_not_counted() {
        let mut clusters = vec![create_test_cluster(
            1010,
            Some(3005),
            SvType::Del,
            &["r1~mL", "r1~mR", "r2"],
        )];
        let spans = group_spans_by_contig(trim_read_spans(vec![
            create_test_span(0, 4000, "r1"),
            create_test_span(0, 4000, "r2"),
            create_test_span(0, 4000, "n1"),
            create_test_span(0, 2000, "n2"),
            create_test_span(2500, 6000, "n3"),
        ]));
        compute_normal_coverage(&mut clusters, &spans, &IntervalTreeIntersector);
        // side 1: n1, n2; side 2: n1, n3
        assert_eq!(clusters[0].normal_coverage, 2);
    }

    #[test]
    fn test_spans_grouped_by_contig() {
        let spans = group_spans_by_contig(trim_read_spans(vec![
            create_test_span(0, 4000, "n1"),
            ReadSpan::new("chr2".to_string(), 0, 4000, "n2".to_string()),
            ReadSpan::new("chr2".to_string(), 500, 4000, "n3".to_string()),
        ]));
        assert_eq!(spans.len(), 2);
        let chr2_names: Vec<&str> = spans["chr2"].iter().map(|s| s.name.as_str()).collect();
        assert_eq!(chr2_names, vec!["n2", "n3"]);

        // a translocation reaches the spans of both of its contigs
        let mut clusters = vec![CoordinateCluster {
            first: ContigPos::new("chr1".to_string(), 1000),
            second: Some(ContigPos::new("chr2".to_string(), 2000)),
            members: BTreeSet::from([ReadEvidenceId::from("r1")]),
            sv_type: SvType::InterTx,
            lead: ReadEvidenceId::from("r1"),
            normal_coverage: 0,
        }];
        compute_normal_coverage(&mut clusters, &spans, &IntervalTreeIntersector);
        // side 1: n1; side 2: n2, n3
        assert_eq!(clusters[0].normal_coverage, 1);

        let mut unrelated = vec![create_test_cluster(1000, None, SvType::BpNovIns, &["r1"])];
        let chr2_only: SpansByContig = spans
            .into_iter()
            .filter(|(contig, _)| contig == "chr2")
            .collect();
        compute_normal_coverage(&mut unrelated, &chr2_only, &IntervalTreeIntersector);
        assert_eq!(unrelated[0].normal_coverage, 0);
    }

    #[test]
    fn test_aggregate_by_sv_type() {
        let first = names(&["a", "b", "c"]);
        let second = names(&["c", "d"]);
        let expected = [
            (SvType::Del, 2),
            (SvType::Inv, 2),
            (SvType::TDupl, 1),
            (SvType::InterTx, 2),
            (SvType::IntraIns, 2),
        ];
        for (sv_type, tally) in expected {
            let cluster = create_test_cluster(1000, Some(2000), sv_type, &["r1"]);
            assert_eq!(aggregate_tally(&cluster, &first, &second), tally, "{sv_type}");
        }

        // means are rounded half to even
        let second = names(&["d"]);
        let cluster = create_test_cluster(1000, Some(2000), SvType::Del, &["r1"]);
        assert_eq!(aggregate_tally(&cluster, &first, &second), 2);
        let cluster = create_test_cluster(1000, Some(2000), SvType::InterIns, &["r1"]);
        assert_eq!(aggregate_tally(&cluster, &first, &second), 1);

        let unpaired = create_test_cluster(1000, None, SvType::NovIns, &["r1"]);
        assert_eq!(aggregate_tally(&unpaired, &first, &HashSet::new()), 3);
    }
}
