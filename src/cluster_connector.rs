use log::debug;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::SystemTime;

use crate::cluster_finder::ClusterAssignment;
use crate::containers::{
    ClusterKey, ClusterParams, CoordinateCluster, EvidenceIndex, ReadEvidenceId, SvType,
};
use crate::errors::Result;
use crate::svtype_arbiter::arbitrate;
use crate::utils;

/// Physical reads already attributed to an admitted cluster. Only the linker writes to it,
/// during its single pass over the linked clusters.
#[derive(Debug, Default)]
pub struct ConsumedReads {
    reads: HashSet<String>,
}

impl ConsumedReads {
    pub fn contains(&self, id: &ReadEvidenceId) -> bool {
        self.reads.contains(&id.physical)
    }

    fn consume<'a>(&mut self, ids: impl Iterator<Item = &'a ReadEvidenceId>) {
        self.reads.extend(ids.map(|id| id.physical.clone()));
    }
}

/// Whether a one-sided read may join a paired cluster of a given type
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Absorption {
    Allowed,
    /// insertion-like clusters take in at most one translocation read
    OneTime,
    Refused,
}

/// Link clusters through the reads they share and build one candidate SV per link.
///
/// Each read's smaller cluster points to its other cluster. Unpaired clusters become
/// single-breakend candidates, linked pairs become two-sided candidates supported by
/// the reads present at both ends. Every physical read is attributed to at most one
/// admitted candidate.
pub fn connect_clusters(
    assignment: &ClusterAssignment,
    evidence_index: &EvidenceIndex,
    params: &ClusterParams,
) -> Result<Vec<CoordinateCluster>> {
    let start_time = SystemTime::now();
    let links = build_cluster_links(&assignment.read_clusters);
    let mut consumed = ConsumedReads::default();
    let mut clusters = Vec::new();

    for (first, seconds) in links.iter() {
        if seconds.is_empty() {
            if let Some(cluster) =
                link_unpaired(first, assignment, evidence_index, params, &mut consumed)?
            {
                clusters.push(cluster);
            }
            continue;
        }
        for second in seconds {
            if let Some(cluster) =
                link_pair(first, second, assignment, evidence_index, params, &mut consumed)?
            {
                clusters.push(cluster);
            }
        }
    }

    let link_count = links.len();
    if link_count == 1 {
        debug!("{link_count} linked cluster, {} candidate SVs", clusters.len());
    } else {
        debug!("{link_count} linked clusters, {} candidate SVs", clusters.len());
    }
    for cluster in clusters.iter() {
        debug!(
            "{} {} (support={}, lead={})",
            cluster.label(),
            cluster.sv_type,
            cluster.read_count(),
            cluster.lead
        );
    }
    debug!(
        "Cluster linking: {}s",
        start_time.elapsed().unwrap_or_default().as_secs()
    );
    Ok(clusters)
}

/// Map each read's first cluster to the list of its second clusters.
///
/// First clusters that only ever show up as someone else's second are dropped so the
/// same SV is not represented twice. Lists are sorted and de-duplicated.
pub fn build_cluster_links(
    read_clusters: &BTreeMap<ReadEvidenceId, Vec<ClusterKey>>,
) -> BTreeMap<ClusterKey, Vec<ClusterKey>> {
    let mut links: BTreeMap<ClusterKey, Vec<ClusterKey>> = BTreeMap::new();
    for clusters in read_clusters.values() {
        if let Some(first) = clusters.first() {
            let seconds = links.entry(first.clone()).or_default();
            if let Some(second) = clusters.get(1) {
                seconds.push(second.clone());
            }
        }
    }
    let all_seconds: HashSet<ClusterKey> = links.values().flatten().cloned().collect();
    links.retain(|first, seconds| !(seconds.is_empty() && all_seconds.contains(first)));
    for seconds in links.values_mut() {
        seconds.sort();
        seconds.dedup();
    }
    links
}

/// Single-breakend candidate from the combined left and right membership at one position
fn link_unpaired(
    first: &ClusterKey,
    assignment: &ClusterAssignment,
    evidence_index: &EvidenceIndex,
    params: &ClusterParams,
    consumed: &mut ConsumedReads,
) -> Result<Option<CoordinateCluster>> {
    let members: BTreeSet<ReadEvidenceId> = assignment
        .combined_members(&first.pos)
        .into_iter()
        .filter(|read| !consumed.contains(read))
        .collect();
    if members.is_empty() {
        return Ok(None);
    }
    let label = first.pos.to_string();
    let (sv_type, lead) = arbitrate(members.iter(), evidence_index, params.hsb, &label)?;
    let read_count = utils::count_physical_reads(members.iter());
    let lead_size = evidence_index.size(&lead);
    let size_rescue = !params.hsb && lead_size >= utils::SIZE_RESCUE_MIN;
    if !has_linker_support(read_count, params) && !size_rescue {
        debug!("{label} {sv_type} unlinked: {read_count} supporting reads");
        return Ok(None);
    }
    consumed.consume(members.iter());
    Ok(Some(CoordinateCluster {
        first: first.pos.clone(),
        second: None,
        members,
        sv_type,
        lead,
        normal_coverage: 0,
    }))
}

/// Two-sided candidate supported by the reads both clusters share. One-sided single-breakend
/// insertion reads are absorbed, and after realignment so are one-sided reads compatible
/// with the shared reads' SV type.
fn link_pair(
    first: &ClusterKey,
    second: &ClusterKey,
    assignment: &ClusterAssignment,
    evidence_index: &EvidenceIndex,
    params: &ClusterParams,
    consumed: &mut ConsumedReads,
) -> Result<Option<CoordinateCluster>> {
    let first_members: BTreeSet<ReadEvidenceId> = assignment
        .combined_members(&first.pos)
        .into_iter()
        .filter(|read| !consumed.contains(read))
        .collect();
    let second_members: BTreeSet<ReadEvidenceId> = assignment
        .combined_members(&second.pos)
        .into_iter()
        .filter(|read| !consumed.contains(read))
        .collect();
    let shared: BTreeSet<ReadEvidenceId> = first_members
        .intersection(&second_members)
        .cloned()
        .collect();
    if shared.is_empty() {
        return Ok(None);
    }

    let label = format!("{}-{}", first.pos, second.pos);
    let (shared_type, _) = arbitrate(shared.iter(), evidence_index, params.hsb, &label)?;

    let mut members = shared.clone();
    let mut one_time_allowance = true;
    for read in first_members.symmetric_difference(&second_members) {
        let read_type = match evidence_index.sv_type(read) {
            Some(read_type) => read_type,
            None => continue,
        };
        let absorption = if read_type == SvType::BpNovIns {
            Absorption::Allowed
        } else if params.hsb {
            absorption_rule(shared_type, read_type)
        } else {
            Absorption::Refused
        };
        match absorption {
            Absorption::Allowed => {
                members.insert(read.clone());
            }
            Absorption::OneTime if one_time_allowance => {
                members.insert(read.clone());
                one_time_allowance = false;
            }
            _ => {}
        }
    }

    let (sv_type, lead) = arbitrate(members.iter(), evidence_index, params.hsb, &label)?;
    let read_count = utils::count_physical_reads(members.iter());
    let lead_size = evidence_index.size(&lead);
    let size_rescue = !params.hsb
        && (sv_type == SvType::Del || sv_type.is_insertion_like())
        && lead_size >= utils::SIZE_RESCUE_MIN;
    if !has_linker_support(read_count, params) && !size_rescue {
        debug!("{label} {sv_type} unlinked: {read_count} supporting reads");
        return Ok(None);
    }
    consumed.consume(members.iter());
    Ok(Some(CoordinateCluster {
        first: first.pos.clone(),
        second: Some(second.pos.clone()),
        members,
        sv_type,
        lead,
        normal_coverage: 0,
    }))
}

/// Read support needed to keep a linked candidate, min(2, mincov)
fn has_linker_support(read_count: usize, params: &ClusterParams) -> bool {
    read_count >= std::cmp::min(utils::MIN_READ_SUPPORT, params.mincov)
}

/// Compatibility of a one-sided read with the SV type of a paired cluster
fn absorption_rule(cluster_type: SvType, read_type: SvType) -> Absorption {
    let compatible = match cluster_type {
        SvType::Del => read_type == SvType::Del,
        SvType::TDupl => read_type == SvType::TDupl,
        SvType::InterTx => read_type == SvType::InterTx,
        SvType::Inv | SvType::InvPair => read_type.is_inversion(),
        _ if cluster_type.is_insertion_like() => {
            if read_type == SvType::InterTx {
                return Absorption::OneTime;
            }
            read_type.is_insertion_like()
        }
        _ => false,
    };
    if compatible {
        Absorption::Allowed
    } else {
        Absorption::Refused
    }
}
