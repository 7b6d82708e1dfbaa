use std::collections::HashSet;
use std::time::SystemTime;

use log::{debug, error, info, warn, LevelFilter};
use rayon::prelude::*;
use std::env;
use svcluster::cli::{get_args, Arguments};
use svcluster::containers::{BreakendEvidence, CoordinateCluster, EvidenceIndex, SvIndex};
use svcluster::coverage_reconciler::{group_spans_by_contig, trim_read_spans, SpansByContig};
use svcluster::errors::ClusterError;
use svcluster::ingester::{
    get_contigs_from_bam, get_read_spans_from_bam, group_by_window, load_contigs, load_evidence,
    load_read_spans,
};
use svcluster::interval_intersector::IntervalTreeIntersector;
use svcluster::result_writer::{self, SvCall};
use svcluster::utils::is_local_file;
use svcluster::window_processor::{process_window, CoverageSource};

fn set_up() -> Arguments {
    let args = get_args();
    let filter_level: LevelFilter = match args.verbose {
        false => LevelFilter::Info,
        true => LevelFilter::Debug,
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    let version = env!("CARGO_PKG_VERSION");
    info!("\nRunning svcluster v{version}\n");

    let cmd: Vec<String> = env::args().collect();
    let cmd_str = cmd.join(" ");
    debug!("Run command: {cmd_str}");

    if !is_local_file(&args.evidence_path) {
        error!("Evidence file {} not found", args.evidence_path);
        std::process::exit(exitcode::NOINPUT);
    }
    for path in [&args.read_spans_path, &args.contigs_path].into_iter().flatten() {
        if !is_local_file(path) {
            error!("Input file {} not found", path);
            std::process::exit(exitcode::NOINPUT);
        }
    }
    if args.hsb && args.read_spans_path.is_none() && args.bam_filename.is_none() {
        warn!("`--hsb` without `--read-spans` or `--bam`, normal coverage will not be computed");
    }
    if args.threads == 0 {
        error!("`--threads` must be at least 1");
        std::process::exit(exitcode::CONFIG);
    }

    let path = std::path::Path::new(&args.outdir);
    if !path.exists() || !path.is_dir() {
        error!("outdir {} does not exist", args.outdir,);
        std::process::exit(exitcode::CONFIG);
    }

    args
}

fn log_time(start_time: SystemTime) {
    let elapsed_time = start_time.elapsed().unwrap_or_default().as_secs();
    let hours = elapsed_time / 3600;
    let minutes = (elapsed_time % 3600) / 60;
    let seconds = elapsed_time % 60;
    debug!("Running time: {hours}h:{minutes}m:{seconds}s");
}

/// Log an input failure and exit with the matching code
fn exit_on_input_error(error: ClusterError, source: &str) -> ! {
    error!("Error reading {}\n{}", source, error);
    let code = match error {
        ClusterError::MalformedRecord { .. } => exitcode::DATAERR,
        _ => exitcode::IOERR,
    };
    std::process::exit(code);
}

/// Contigs allowed in clustering, from `--contigs`, else the BAM header, else unrestricted
fn get_analysis_contigs(args: &Arguments) -> Option<HashSet<String>> {
    let contigs_result = if let Some(contigs_path) = &args.contigs_path {
        load_contigs(contigs_path)
    } else if let Some(bam_filename) = &args.bam_filename {
        get_contigs_from_bam(bam_filename)
    } else {
        return None;
    };
    match contigs_result {
        Ok(contigs) => {
            debug!("{} analysis contigs", contigs.len());
            Some(contigs)
        }
        Err(error) => exit_on_input_error(error, "analysis contigs"),
    }
}

/// Trimmed read spans for normal coverage grouped by contig, only loaded in hsb mode
fn get_read_spans(args: &Arguments) -> Option<SpansByContig> {
    if !args.hsb {
        return None;
    }
    let spans_result = if let Some(read_spans_path) = &args.read_spans_path {
        load_read_spans(read_spans_path)
    } else if let Some(bam_filename) = &args.bam_filename {
        get_read_spans_from_bam(bam_filename)
    } else {
        return None;
    };
    match spans_result {
        Ok(spans) => Some(group_spans_by_contig(trim_read_spans(spans))),
        Err(error) => exit_on_input_error(error, "read spans"),
    }
}

/// Name the admitted clusters of every window with running SV indices, in window order
fn assign_sv_indices(
    windows: &[(String, Vec<BreakendEvidence>)],
    window_clusters: Vec<Option<Vec<CoordinateCluster>>>,
    index_seed: u64,
) -> Vec<SvCall> {
    let mut sv_index = SvIndex::new(index_seed);
    let mut calls = Vec::new();
    for ((window, evidence), clusters_opt) in windows.iter().zip(window_clusters) {
        let clusters = match clusters_opt {
            Some(clusters) => clusters,
            None => continue,
        };
        let evidence_index = EvidenceIndex::new(evidence);
        match result_writer::build_calls(&clusters, &evidence_index, &mut sv_index) {
            Ok(mut window_calls) => calls.append(&mut window_calls),
            Err(error) => {
                error!("Failed to format calls of window {}\n{}", window, error);
                std::process::exit(exitcode::SOFTWARE);
            }
        }
    }
    calls
}

fn main() {
    ///////////////////////////////////////////////////////////////////////////
    // Set up
    let args = set_up();
    let start_time = SystemTime::now();
    let mut params = args.cluster_params();
    params.contigs = get_analysis_contigs(&args);

    ///////////////////////////////////////////////////////////////////////////
    // Get evidence and read data
    let evidence = match load_evidence(&args.evidence_path) {
        Ok(evidence) => evidence,
        Err(error) => exit_on_input_error(error, "breakend evidence"),
    };
    let windows: Vec<(String, Vec<BreakendEvidence>)> =
        group_by_window(evidence).into_iter().collect();
    info!("{} analysis windows", windows.len());

    let read_spans = get_read_spans(&args);
    let intersector = IntervalTreeIntersector;
    let coverage_source = read_spans.as_ref().map(|spans| CoverageSource {
        spans,
        intersector: &intersector,
    });

    ///////////////////////////////////////////////////////////////////////////
    // Cluster, link, and filter each window independently
    let worker_pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build()
    {
        Ok(worker_pool) => worker_pool,
        Err(error) => {
            error!("Failed to start worker threads\n{}", error);
            std::process::exit(exitcode::OSERR);
        }
    };
    let params = &params;
    let window_results = worker_pool.install(|| {
        windows
            .par_iter()
            .map(|(window, window_evidence)| {
                process_window(window, window_evidence, params, coverage_source)
            })
            .collect::<Vec<_>>()
    });

    let mut window_clusters = Vec::with_capacity(window_results.len());
    for ((window, _), result) in windows.iter().zip(window_results) {
        match result {
            Ok(clusters) => window_clusters.push(Some(clusters)),
            Err(error) if args.skip_failed_windows => {
                warn!("Skipping window {}: {}", window, error);
                window_clusters.push(None);
            }
            Err(error) => {
                error!("Failed to process window {}\n{}", window, error);
                std::process::exit(exitcode::DATAERR);
            }
        }
    }

    ///////////////////////////////////////////////////////////////////////////
    // Name and write results
    let calls = assign_sv_indices(&windows, window_clusters, args.index_seed);
    result_writer::write_results(&calls, args.outdir, args.prefix, args.write_unzipped);
    log_time(start_time);
}
