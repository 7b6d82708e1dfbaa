use bgzip::{BGZFWriter, Compression};
use flate2::write::GzEncoder;
use log::{debug, error, info};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use crate::call_filter::report_coordinates;
use crate::containers::{BreakendEvidence, CoordinateCluster, EvidenceIndex, SvIndex, SvType};
use crate::errors::{ClusterError, Result};

/// Columns of the lead record copied ahead of the synthesized SV name
const LEADING_COLUMNS: usize = 6;

/// One emitted SV call, the formatted output line plus its parts for the JSON summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SvCall {
    pub sv_id: String,
    pub sv_type: SvType,
    pub coordinates: String,
    pub lead_read: String,
    pub support: usize,
    pub other_reads: Vec<String>,
    pub normal_coverage: u32,
    #[serde(skip)]
    pub record: String,
}

/// Format the admitted clusters of one window, taking SV indices from `sv_index` in order
pub fn build_calls(
    clusters: &[CoordinateCluster],
    evidence_index: &EvidenceIndex,
    sv_index: &mut SvIndex,
) -> Result<Vec<SvCall>> {
    let mut calls = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        let lead = evidence_index
            .get(&cluster.lead)
            .ok_or_else(|| ClusterError::NoLeadRead {
                sv_type: cluster.sv_type.to_string(),
                cluster: cluster.label(),
            })?;
        calls.push(format_call(cluster, lead, sv_index.next_index()));
    }
    Ok(calls)
}

/// Build the output record of a cluster:
/// `<lead cols 0-5> nv_SV<N>-<lead read id>~<coords> <lead cols 7+> <support> <other reads> <normal coverage>`
pub fn format_call(cluster: &CoordinateCluster, lead: &BreakendEvidence, index: u64) -> SvCall {
    let coordinates = report_coordinates(cluster, lead);
    let sv_id = format!("nv_SV{}-{}~{}", index, lead.id, coordinates);
    let other_reads: Vec<String> = cluster
        .members
        .iter()
        .filter(|member| **member != cluster.lead)
        .map(|member| member.to_string())
        .collect();
    let other_reads_string = if other_reads.is_empty() {
        String::from(".")
    } else {
        other_reads.join(",")
    };
    let support = cluster.read_count();

    let mut columns: Vec<&str> = lead
        .fields
        .iter()
        .take(LEADING_COLUMNS)
        .map(|field| field.as_str())
        .collect();
    columns.push(&sv_id);
    columns.extend(lead.fields.iter().skip(LEADING_COLUMNS + 1).map(|f| f.as_str()));
    let record = format!(
        "{}\t{}\t{}\t{}",
        columns.join("\t"),
        support,
        other_reads_string,
        cluster.normal_coverage
    );

    SvCall {
        sv_id,
        sv_type: cluster.sv_type,
        coordinates,
        lead_read: cluster.lead.to_string(),
        support,
        other_reads,
        normal_coverage: cluster.normal_coverage,
        record,
    }
}

/// Writes the call records and a JSON summary of them into `outdir`.
/// Both are compressed unless `write_unzipped` is set.
pub fn write_results(calls: &[SvCall], outdir: String, prefix: String, write_unzipped: bool) {
    debug!("{} SV calls to write", calls.len());
    let (tsv_path, json_path) = generate_output_paths(&outdir, &prefix, write_unzipped);
    let json_string = calls_to_json(calls);

    if let Err(error) = write_json(json_string, json_path.clone()) {
        error!("Error writing JSON result to outdir {}\n{}", outdir, error);
        std::process::exit(exitcode::IOERR);
    }

    let write_result = if write_unzipped {
        write_unzipped_records(calls, tsv_path.clone())
    } else {
        write_gzipped_records(calls, tsv_path.clone())
    };
    if let Err(error) = write_result {
        error!("Error writing SV records to outdir {}\n{}", outdir, error);
        std::process::exit(exitcode::IOERR);
    }
    info!("JSON written to {}", json_path);
    info!("SV records written to {}", tsv_path);
}

fn calls_to_json(calls: &[SvCall]) -> String {
    match serde_json::to_string_pretty(calls) {
        Ok(json) => json,
        Err(_) => {
            error!("Failed to write SV calls as JSON");
            std::process::exit(exitcode::IOERR);
        }
    }
}

fn write_json(json_string: String, json_name: String) -> io::Result<()> {
    let json_outfile = PathBuf::from(json_name);
    let file_handle = File::create(&json_outfile)?;

    if json_outfile.extension().and_then(|ext| ext.to_str()) == Some("gz") {
        let mut gzip_filehandle = GzEncoder::new(file_handle, flate2::Compression::default());
        gzip_filehandle.write_all(json_string.as_bytes())?;
        gzip_filehandle.finish()?;
    } else {
        let mut writer = BufWriter::new(file_handle);
        writer.write_all(json_string.as_bytes())?;
        writer.flush()?
    }

    Ok(())
}

/// Given an already-validated output directory and filename prefix,
/// generate the record and JSON filenames.
fn generate_output_paths(outdir: &str, prefix: &str, write_unzipped: bool) -> (String, String) {
    let outdir = outdir.trim_end_matches('/');
    if write_unzipped {
        (
            format!("{outdir}/{prefix}.svcluster.tsv"),
            format!("{outdir}/{prefix}.svcluster.json"),
        )
    } else {
        (
            format!("{outdir}/{prefix}.svcluster.tsv.gz"),
            format!("{outdir}/{prefix}.svcluster.json.gz"),
        )
    }
}

fn header() -> String {
    format!("#svcluster v{}\n", env!("CARGO_PKG_VERSION"))
}

fn write_unzipped_records(calls: &[SvCall], tsv_name: String) -> io::Result<()> {
    let file_handle = File::create(PathBuf::from(tsv_name))?;
    let mut writer = BufWriter::new(file_handle);
    writer.write_all(header().as_bytes())?;
    for call in calls {
        writeln!(writer, "{}", call.record)?;
    }
    writer.flush()
}

fn write_gzipped_records(calls: &[SvCall], tsv_name: String) -> io::Result<()> {
    let file_handle = File::create(PathBuf::from(tsv_name))?;
    let mut buf_writer = BufWriter::new(file_handle);
    let mut writer = BGZFWriter::new(&mut buf_writer, Compression::default());
    writer.write_all(header().as_bytes())?;
    for call in calls {
        writer.write_all(format!("{}\n", call.record).as_bytes())?;
    }
    writer.close()?;
    buf_writer.flush()
}
