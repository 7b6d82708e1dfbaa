use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::time::SystemTime;

use crate::containers::{
    Anchor, Breakend, BreakendEvidence, ClusterKey, ClusterParams, ContigPos, Orientation,
    ReadEvidenceId, SvType,
};
use crate::errors::{ClusterError, Result};
use crate::utils;

/// Breakend clusters of one window, split by anchor group, plus the reverse
/// lookup from each read to the one or two clusters it was assigned to.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ClusterAssignment {
    pub left: BTreeMap<ContigPos, Vec<ReadEvidenceId>>,
    pub right: BTreeMap<ContigPos, Vec<ReadEvidenceId>>,
    pub read_clusters: BTreeMap<ReadEvidenceId, Vec<ClusterKey>>,
}

impl ClusterAssignment {
    /// Union of the left and right anchor memberships found at one position
    pub fn combined_members(&self, pos: &ContigPos) -> BTreeSet<ReadEvidenceId> {
        let mut combined = BTreeSet::new();
        for group in [&self.left, &self.right] {
            if let Some(reads) = group.get(pos) {
                combined.extend(reads.iter().cloned());
            }
        }
        combined
    }
}

/// Cluster the breakends of every evidence record. For each contig and anchor group
/// independently, breakend coordinates are sorted and chained together whenever the gap
/// to the previous coordinate is at most `params.buffer`. Each chain becomes one cluster
/// placed at the rounded mean of its coordinates.
pub fn find_breaks(
    evidence: &[BreakendEvidence],
    params: &ClusterParams,
) -> Result<ClusterAssignment> {
    let start_time = SystemTime::now();
    let mut anchored_positions: BTreeMap<(String, Anchor), Vec<(i64, ReadEvidenceId)>> =
        BTreeMap::new();

    for record in evidence {
        if let Some(breakend) = record
            .breakends
            .iter()
            .find(|b| !params.is_valid_contig(&b.pos.contig))
        {
            debug!(
                "Skipping {}: contig {} not in analysis contigs",
                record.id, breakend.pos.contig
            );
            continue;
        }
        for (anchor, breakend) in assign_anchors(record)? {
            anchored_positions
                .entry((breakend.pos.contig.clone(), anchor))
                .or_default()
                .push((breakend.pos.pos, record.id.clone()));
        }
    }

    let mut assignment = ClusterAssignment::default();
    for ((contig, anchor), mut positions) in anchored_positions {
        positions.sort();
        for (pos, reads) in cluster_via_buffer(&positions, params.buffer) {
            let cluster_pos = ContigPos::new(contig.clone(), pos);
            for read in reads.iter() {
                assignment
                    .read_clusters
                    .entry(read.clone())
                    .or_default()
                    .push(ClusterKey::new(cluster_pos.clone(), anchor));
            }
            let group = match anchor {
                Anchor::Left => &mut assignment.left,
                Anchor::Right => &mut assignment.right,
            };
            group.insert(cluster_pos, reads);
        }
    }

    for (read, clusters) in assignment.read_clusters.iter_mut() {
        clusters.sort();
        clusters.dedup();
        if clusters.is_empty() || clusters.len() > 2 {
            return Err(ClusterError::InvalidClusterCount {
                read: read.to_string(),
                count: clusters.len(),
            });
        }
    }

    debug!(
        "{} left and {} right anchor clusters from {} evidence records",
        assignment.left.len(),
        assignment.right.len(),
        evidence.len()
    );
    for (break_location, support) in assignment.left.iter() {
        debug!("{} L (support={})", break_location, support.len());
    }
    for (break_location, support) in assignment.right.iter() {
        debug!("{} R (support={})", break_location, support.len());
    }
    debug!(
        "Finding breaks: {}s",
        start_time.elapsed().unwrap_or_default().as_secs()
    );
    Ok(assignment)
}

/// Decide which anchor group each breakend of a record is clustered in.
///
/// Single-breakend insertions use their start/end marker, stranded types use the
/// strand of each side, and everything else puts the lower coordinate on the left.
fn assign_anchors(record: &BreakendEvidence) -> Result<Vec<(Anchor, &Breakend)>> {
    let malformed = || ClusterError::MalformedBreakendLabel {
        read: record.id.to_string(),
        label: record.raw_label.clone(),
    };
    match record.breakends.as_slice() {
        [breakend] => match record.raw_label.as_str() {
            "S-Nov_Ins_bp" => Ok(vec![(Anchor::Left, breakend)]),
            "E-Nov_Ins_bp" => Ok(vec![(Anchor::Right, breakend)]),
            _ => Err(malformed()),
        },
        [first, second] => {
            if record.sv_type() == Some(SvType::BpNovIns) || record.raw_label.ends_with("Nov_Ins_bp")
            {
                return Err(malformed());
            }
            let stranded = record.sv_type().map(|t| t.is_stranded()).unwrap_or(false);
            if stranded
                && first.orientation != Orientation::Missing
                && second.orientation != Orientation::Missing
            {
                return Ok(vec![
                    (strand_anchor(first.orientation), first),
                    (strand_anchor(second.orientation), second),
                ]);
            }
            if second.pos < first.pos {
                Ok(vec![(Anchor::Left, second), (Anchor::Right, first)])
            } else {
                Ok(vec![(Anchor::Left, first), (Anchor::Right, second)])
            }
        }
        breakends => Err(ClusterError::InvalidClusterCount {
            read: record.id.to_string(),
            count: breakends.len(),
        }),
    }
}

fn strand_anchor(orientation: Orientation) -> Anchor {
    match orientation {
        Orientation::Reverse => Anchor::Right,
        _ => Anchor::Left,
    }
}

/// Walk through the sorted positions linearly and close a cluster whenever the
/// next position is more than `buffer` past the previous one.
fn cluster_via_buffer(
    positions: &[(i64, ReadEvidenceId)],
    buffer: i64,
) -> Vec<(i64, Vec<ReadEvidenceId>)> {
    let mut clusters = Vec::new();
    if positions.is_empty() {
        return clusters;
    }
    let mut begin_iter: usize = 0;
    for end_iter in 1..positions.len() {
        if positions[end_iter].0 - positions[end_iter - 1].0 > buffer {
            clusters.push(get_clust_middle(&positions[begin_iter..end_iter]));
            begin_iter = end_iter;
        }
    }
    //add the last cluster
    clusters.push(get_clust_middle(&positions[begin_iter..]));
    clusters
}

/// Given the members of one cluster, return its averaged position and the
/// de-duplicated, sorted reads that support it.
fn get_clust_middle(cluster_positions: &[(i64, ReadEvidenceId)]) -> (i64, Vec<ReadEvidenceId>) {
    let coords: Vec<i64> = cluster_positions.iter().map(|(pos, _)| *pos).collect();
    let mut reads: Vec<ReadEvidenceId> = cluster_positions
        .iter()
        .map(|(_, read)| read.clone())
        .collect();
    reads.sort();
    reads.dedup();
    (utils::round_mean(&coords), reads)
}
