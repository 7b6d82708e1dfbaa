use log::debug;
use std::time::SystemTime;

use crate::call_filter::apply_filters;
use crate::cluster_connector::connect_clusters;
use crate::cluster_finder::find_breaks;
use crate::containers::{BreakendEvidence, ClusterParams, CoordinateCluster, EvidenceIndex};
use crate::coverage_reconciler::{compute_normal_coverage, SpansByContig};
use crate::errors::Result;
use crate::interval_intersector::IntervalIntersector;

/// Trimmed read spans and the intersector used for normal coverage in hsb mode
#[derive(Clone, Copy)]
pub struct CoverageSource<'a> {
    pub spans: &'a SpansByContig,
    pub intersector: &'a dyn IntervalIntersector,
}

/// Run one analysis window from raw evidence to admitted clusters.
///
/// Normal coverage is only computed in hsb mode and only when a coverage source is given,
/// otherwise every tally stays at zero. Any error aborts this window alone.
pub fn process_window(
    window: &str,
    evidence: &[BreakendEvidence],
    params: &ClusterParams,
    coverage_source: Option<CoverageSource>,
) -> Result<Vec<CoordinateCluster>> {
    let start_time = SystemTime::now();
    let evidence_index = EvidenceIndex::new(evidence);

    let assignment = find_breaks(evidence, params)?;
    let mut clusters = connect_clusters(&assignment, &evidence_index, params)?;

    if let (true, Some(source)) = (params.hsb, coverage_source) {
        compute_normal_coverage(&mut clusters, source.spans, source.intersector);
    }

    let admitted = apply_filters(clusters, &evidence_index, params);
    debug!(
        "Window {}: {} evidence records, {} calls in {}s",
        window,
        evidence.len(),
        admitted.len(),
        start_time.elapsed().unwrap_or_default().as_secs()
    );
    Ok(admitted)
}
