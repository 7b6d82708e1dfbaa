use log::debug;

use crate::containers::{BreakendEvidence, ClusterParams, CoordinateCluster, EvidenceIndex, SvType};
use crate::utils::{self, PairOrderMode};

/// Admit the clusters that satisfy the coverage and overlap thresholds, keeping their order.
/// This is the only place `mincov` and `maxovl` are enforced.
pub fn apply_filters(
    clusters: Vec<CoordinateCluster>,
    evidence_index: &EvidenceIndex,
    params: &ClusterParams,
) -> Vec<CoordinateCluster> {
    let cluster_count = clusters.len();
    let admitted: Vec<CoordinateCluster> = clusters
        .into_iter()
        .filter(|cluster| {
            let lead_size = evidence_index.size(&cluster.lead);
            let keep = passes_filters(cluster, lead_size, params);
            if !keep {
                debug!(
                    "Filtered {} {} (support={}, normal coverage={}, lead size={})",
                    cluster.label(),
                    cluster.sv_type,
                    cluster.read_count(),
                    cluster.normal_coverage,
                    lead_size
                );
            }
            keep
        })
        .collect();
    debug!("{} of {} clusters admitted", admitted.len(), cluster_count);
    admitted
}

pub fn passes_filters(cluster: &CoordinateCluster, lead_size: u64, params: &ClusterParams) -> bool {
    let read_count = cluster.read_count();
    let normal_coverage = cluster.normal_coverage as usize;
    if read_count < params.mincov || read_count > params.maxovl || normal_coverage > params.maxovl {
        return false;
    }
    let min_support = std::cmp::max(params.mincov, utils::MIN_READ_SUPPORT);
    match cluster.sv_type {
        SvType::NovIns | SvType::Del => {
            !(lead_size <= utils::SMALL_SV_MAX_SIZE && read_count < min_support)
        }
        SvType::BpNovIns => read_count >= min_support,
        _ => true,
    }
}

/// Reported coordinate label of an admitted cluster.
///
/// Translocation and insertion pairs are ordered relative to the lead read's own first
/// breakend, other pairs report `contig:min-max`, single breakends `contig:pos-(pos+1)`.
pub fn report_coordinates(cluster: &CoordinateCluster, lead: &BreakendEvidence) -> String {
    let second = match &cluster.second {
        Some(second) => second,
        None => {
            return format!(
                "{}:{}-{}",
                cluster.first.contig,
                cluster.first.pos,
                cluster.first.pos + 1
            )
        }
    };
    let mode = match cluster.sv_type {
        SvType::InterTx | SvType::InterIns => Some(PairOrderMode::Inter),
        SvType::IntraIns | SvType::IntraInsPair => Some(PairOrderMode::Intra),
        _ => None,
    };
    match (mode, lead.breakends.first()) {
        (Some(mode), Some(reference)) => {
            let (a, b) = utils::order_cluster_pair(&cluster.first, second, &reference.pos, mode);
            format!("{a}-{b}")
        }
        _ => {
            let low = std::cmp::min(cluster.first.pos, second.pos);
            let high = std::cmp::max(cluster.first.pos, second.pos);
            format!("{}:{}-{}", cluster.first.contig, low, high)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::{ContigPos, ReadEvidenceId};
    use crate::ingester::parse_evidence_line;
    use std::collections::BTreeSet;

    fn create_test_evidence(label: &str, size: u64, descriptor: &str, read: &str) -> BreakendEvidence {
        let line = format!("chr1\t0\t10000\t{label}\t{size}\t60\t{descriptor}\t.\t{read}");
        parse_evidence_line(&line, 1).unwrap()
    }

    fn create_test_cluster(
        first: ContigPos,
        second: Option<ContigPos>,
        sv_type: SvType,
        reads: &[&str],
    ) -> CoordinateCluster {
        let members: BTreeSet<ReadEvidenceId> =
            reads.iter().map(|read| ReadEvidenceId::from(*read)).collect();
        CoordinateCluster {
            first,
            second,
            lead: ReadEvidenceId::from(reads[0]),
            members,
            sv_type,
            normal_coverage: 0,
        }
    }

    fn pos(contig: &str, pos: i64) -> ContigPos {
        ContigPos::new(contig.to_string(), pos)
    }

    #[test]
    fn test_coverage_bounds() {
        let params = ClusterParams::new(400, 2, 3, true);
        let mut cluster = create_test_cluster(
            pos("chr1", 1000),
            Some(pos("chr1", 3000)),
            SvType::Inv,
            &["r1", "r2"],
        );
        assert!(passes_filters(&cluster, 2000, &params));
        cluster.normal_coverage = 4;
        assert!(!passes_filters(&cluster, 2000, &params));

        let crowded = create_test_cluster(
            pos("chr1", 1000),
            Some(pos("chr1", 3000)),
            SvType::Inv,
            &["r1", "r2", "r3", "r4"],
        );
        assert!(!passes_filters(&crowded, 2000, &params));
    }

    #[test]
    fn test_small_deletion_needs_two_reads() {
        let params = ClusterParams::new(400, 1, 400, false);
        let single = create_test_cluster(
            pos("chr1", 1000),
            Some(pos("chr1", 1150)),
            SvType::Del,
            &["r1"],
        );
        assert!(!passes_filters(&single, 150, &params));
        assert!(passes_filters(&single, 250, &params));

        let inversion = create_test_cluster(
            pos("chr1", 1000),
            Some(pos("chr1", 1150)),
            SvType::Inv,
            &["r1"],
        );
        assert!(passes_filters(&inversion, 150, &params));
    }

    #[test]
    fn test_lone_single_breakend_dropped() {
        for hsb in [false, true] {
            let params = ClusterParams::new(400, 1, 400, hsb);
            let cluster = create_test_cluster(pos("chr1", 5000), None, SvType::BpNovIns, &["r1"]);
            assert!(!passes_filters(&cluster, 0, &params));
            let supported =
                create_test_cluster(pos("chr1", 5000), None, SvType::BpNovIns, &["r1", "r2"]);
            assert!(passes_filters(&supported, 0, &params));
        }
    }

    #[test]
    fn test_apply_filters_keeps_order() {
        let evidence = vec![
            create_test_evidence("Del 5000", 5000, "r1~chr1:1000-3000", "r1"),
            create_test_evidence("Del 5200", 5200, "r2~chr1:1020-3010", "r2"),
            create_test_evidence("S-Nov_Ins_bp x", 0, "r3~chr1:9000", "r3"),
        ];
        let index = EvidenceIndex::new(&evidence);
        let clusters = vec![
            create_test_cluster(pos("chr1", 9000), None, SvType::BpNovIns, &["r3"]),
            create_test_cluster(
                pos("chr1", 1010),
                Some(pos("chr1", 3005)),
                SvType::Del,
                &["r2", "r1"],
            ),
        ];
        let admitted = apply_filters(clusters, &index, &ClusterParams::new(400, 2, 400, false));
        assert_eq!(admitted.len(), 1);
        assert_eq!(admitted[0].sv_type, SvType::Del);
    }

    #[test]
    fn test_report_coordinates_simple() {
        let lead = create_test_evidence("Del 5200", 5200, "r2~chr1:1020-3010", "r2");
        let paired = create_test_cluster(
            pos("chr1", 3005),
            Some(pos("chr1", 1010)),
            SvType::Del,
            &["r2"],
        );
        assert_eq!(report_coordinates(&paired, &lead), "chr1:1010-3005");

        let unpaired = create_test_cluster(pos("chr1", 9000), None, SvType::BpNovIns, &["r2"]);
        assert_eq!(report_coordinates(&unpaired, &lead), "chr1:9000-9001");
    }

    #[test]
    fn test_report_coordinates_translocation() {
        let lead = create_test_evidence("InterTx +-", 0, "r1~chr2:500~chr1:1000", "r1");
        let cluster = create_test_cluster(
            pos("chr1", 1004),
            Some(pos("chr2", 498)),
            SvType::InterTx,
            &["r1"],
        );
        assert_eq!(report_coordinates(&cluster, &lead), "chr2:498-chr1:1004");

        let lead = create_test_evidence("Intra-Ins ++", 0, "r1~chr1:9000-1000", "r1");
        let cluster = create_test_cluster(
            pos("chr1", 1004),
            Some(pos("chr1", 8990)),
            SvType::IntraIns,
            &["r1"],
        );
        assert_eq!(report_coordinates(&cluster, &lead), "chr1:8990-chr1:1004");
    }
}
