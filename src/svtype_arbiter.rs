use std::str::FromStr;

use crate::containers::{EvidenceIndex, ReadEvidenceId, SvType, Tier};
use crate::errors::{ClusterError, Result};

/// Tiers in the order they take precedence
const TIER_PRECEDENCE: [Tier; 4] = [Tier::Three, Tier::X, Tier::Two, Tier::One];

/// Pick the representative SV type of a cluster and its lead read.
///
/// Labels are tallied in first-seen order over `members`. The highest tier present wins,
/// and within that tier the most frequent type, with ties going to the type seen first.
/// The lead read is the member of the winning type with the largest SV size, again
/// first-seen on ties.
pub fn arbitrate<'a>(
    members: impl IntoIterator<Item = &'a ReadEvidenceId>,
    evidence_index: &EvidenceIndex,
    hsb: bool,
    cluster_label: &str,
) -> Result<(SvType, ReadEvidenceId)> {
    let members: Vec<&ReadEvidenceId> = members.into_iter().collect();
    let tally = tally_sv_types(&members, evidence_index, cluster_label)?;

    let sv_type = select_sv_type(&tally, hsb).ok_or_else(|| ClusterError::UnrecognizedSvType {
        label: String::from("<none>"),
        cluster: cluster_label.to_string(),
    })?;
    let lead = select_lead_read(&members, evidence_index, sv_type).ok_or_else(|| {
        ClusterError::NoLeadRead {
            sv_type: sv_type.to_string(),
            cluster: cluster_label.to_string(),
        }
    })?;
    Ok((sv_type, lead))
}

/// Count each SV type among the members, keeping first-seen order.
/// Any label outside the known vocabulary is fatal.
fn tally_sv_types(
    members: &[&ReadEvidenceId],
    evidence_index: &EvidenceIndex,
    cluster_label: &str,
) -> Result<Vec<(SvType, usize)>> {
    let mut tally: Vec<(SvType, usize)> = Vec::new();
    for member in members {
        let record = match evidence_index.get(member) {
            Some(record) => record,
            None => continue,
        };
        let sv_type =
            SvType::from_str(&record.sv_label).map_err(|_| ClusterError::UnrecognizedSvType {
                label: record.sv_label.clone(),
                cluster: cluster_label.to_string(),
            })?;
        match tally.iter_mut().find(|(seen, _)| *seen == sv_type) {
            Some((_, count)) => *count += 1,
            None => tally.push((sv_type, 1)),
        }
    }
    Ok(tally)
}

fn select_sv_type(tally: &[(SvType, usize)], hsb: bool) -> Option<SvType> {
    for tier in TIER_PRECEDENCE {
        let mut best: Option<(SvType, usize)> = None;
        for (sv_type, count) in tally.iter().filter(|(t, _)| t.tier(hsb) == tier) {
            match best {
                Some((_, best_count)) if *count <= best_count => {}
                _ => best = Some((*sv_type, *count)),
            }
        }
        if let Some((sv_type, _)) = best {
            return Some(sv_type);
        }
    }
    None
}

fn select_lead_read(
    members: &[&ReadEvidenceId],
    evidence_index: &EvidenceIndex,
    sv_type: SvType,
) -> Option<ReadEvidenceId> {
    let mut lead: Option<(&ReadEvidenceId, u64)> = None;
    for member in members {
        if evidence_index.sv_type(member) != Some(sv_type) {
            continue;
        }
        let size = evidence_index.size(member);
        match lead {
            Some((_, lead_size)) if size <= lead_size => {}
            _ => lead = Some((*member, size)),
        }
    }
    lead.map(|(member, _)| member.clone())
}
