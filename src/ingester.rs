use log::debug;
use rust_htslib::bam::{self, ext::BamRecordExtensions, Read};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::SystemTime;

use crate::containers::{Breakend, BreakendEvidence, ContigPos, Orientation, ReadEvidenceId, ReadSpan};
use crate::errors::{ClusterError, Result};
use crate::utils;

/// Column holding `<SV label> <detail>`
const LABEL_COLUMN: usize = 3;
const SIZE_COLUMN: usize = 4;
/// Column holding the `~`-delimited positional descriptor
const DESCRIPTOR_COLUMN: usize = 6;
const READ_ID_COLUMN: usize = 8;

/// Parse one tab-separated breakend evidence line.
///
/// The positional descriptor in column 6 is `<name>~<contig>:<pos>` for single
/// breakends, `<name>~<contig>:<pos1>-<pos2>` for intra-contig records and
/// `<name>~<contigA>:<posA>~<contigB>:<posB>` for inter-contig records. Strands of
/// stranded SV types are the first two characters of the column 3 detail.
pub fn parse_evidence_line(line: &str, line_number: usize) -> Result<BreakendEvidence> {
    let malformed = |reason: String| ClusterError::MalformedRecord {
        line: line_number,
        reason,
    };
    let fields: Vec<String> = line.split('\t').map(|s| s.to_string()).collect();
    if fields.len() <= READ_ID_COLUMN {
        return Err(malformed(format!(
            "expected at least {} columns, found {}",
            READ_ID_COLUMN + 1,
            fields.len()
        )));
    }

    let mut label_words = fields[LABEL_COLUMN].split_whitespace();
    let raw_label = match label_words.next() {
        Some(label) => label.to_string(),
        None => return Err(malformed("empty SV label".to_string())),
    };
    let detail_opt = label_words.next();

    let segments: Vec<&str> = fields[DESCRIPTOR_COLUMN].split('~').collect();
    let positions: Vec<ContigPos> = match segments.len() {
        2 => parse_intra_descriptor(segments[1]),
        3 => match (parse_contig_pos(segments[1]), parse_contig_pos(segments[2])) {
            (Some(first), Some(second)) => Some(vec![first, second]),
            _ => None,
        },
        _ => None,
    }
    .ok_or_else(|| {
        malformed(format!(
            "unrecognized positional descriptor `{}`",
            fields[DESCRIPTOR_COLUMN]
        ))
    })?;

    let orientations = match (positions.len(), detail_opt) {
        (2, Some(detail)) => parse_strands(detail),
        _ => None,
    }
    .unwrap_or((Orientation::Missing, Orientation::Missing));
    let breakends: Vec<Breakend> = positions
        .into_iter()
        .zip([orientations.0, orientations.1])
        .map(|(pos, orientation)| Breakend::new(pos, orientation))
        .collect();

    Ok(BreakendEvidence {
        id: ReadEvidenceId::from(fields[READ_ID_COLUMN].as_str()),
        sv_label: utils::canonicalize_sv_type(&raw_label),
        raw_label,
        size: utils::normalize_size(&fields[SIZE_COLUMN]),
        breakends,
        fields,
    })
}

/// `chrom:pos` or `chrom:pos1-pos2`
fn parse_intra_descriptor(descriptor: &str) -> Option<Vec<ContigPos>> {
    let (contig, positions) = descriptor.rsplit_once(':')?;
    match positions.split_once('-') {
        Some((first, second)) => Some(vec![
            ContigPos::new(contig.to_string(), first.parse().ok()?),
            ContigPos::new(contig.to_string(), second.parse().ok()?),
        ]),
        None => Some(vec![ContigPos::new(
            contig.to_string(),
            positions.parse().ok()?,
        )]),
    }
}

fn parse_contig_pos(descriptor: &str) -> Option<ContigPos> {
    let (contig, pos) = descriptor.rsplit_once(':')?;
    Some(ContigPos::new(contig.to_string(), pos.parse().ok()?))
}

/// Two leading strand characters of a label detail, e.g. `+-`
fn parse_strands(detail: &str) -> Option<(Orientation, Orientation)> {
    let mut chars = detail.chars();
    let first = Orientation::from_str(&chars.next()?.to_string()).ok()?;
    let second = Orientation::from_str(&chars.next()?.to_string()).ok()?;
    Some((first, second))
}

/// Load every evidence record from a plain or gzipped file, skipping blank and `#` lines
pub fn load_evidence(evidence_path: &String) -> Result<Vec<BreakendEvidence>> {
    let start_time = SystemTime::now();
    let mut evidence = Vec::new();
    for (i, line) in utils::read_file_from_path(evidence_path)?.iter().enumerate() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        evidence.push(parse_evidence_line(line, i + 1)?);
    }
    debug!(
        "{} evidence records loaded in {}s",
        evidence.len(),
        start_time.elapsed().unwrap_or_default().as_secs()
    );
    Ok(evidence)
}

/// Split evidence into analysis windows keyed by the contig in column 0
pub fn group_by_window(evidence: Vec<BreakendEvidence>) -> BTreeMap<String, Vec<BreakendEvidence>> {
    let mut windows: BTreeMap<String, Vec<BreakendEvidence>> = BTreeMap::new();
    for record in evidence {
        windows.entry(record.fields[0].clone()).or_default().push(record);
    }
    windows
}

/// Parse a `contig start end name` BED line
pub fn parse_read_span_line(line: &str, line_number: usize) -> Result<ReadSpan> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 4 {
        return Err(ClusterError::MalformedRecord {
            line: line_number,
            reason: format!("expected 4 BED columns, found {}", fields.len()),
        });
    }
    let parse_coord = |value: &str| {
        value
            .parse::<i64>()
            .map_err(|_| ClusterError::MalformedRecord {
                line: line_number,
                reason: format!("invalid BED coordinate `{value}`"),
            })
    };
    Ok(ReadSpan::new(
        fields[0].to_string(),
        parse_coord(fields[1])?,
        parse_coord(fields[2])?,
        fields[3].to_string(),
    ))
}

pub fn load_read_spans(bed_path: &String) -> Result<Vec<ReadSpan>> {
    let mut spans = Vec::new();
    for (i, line) in utils::read_file_from_path(bed_path)?.iter().enumerate() {
        if line.trim().is_empty() || line.starts_with('#') || line.starts_with("track") {
            continue;
        }
        spans.push(parse_read_span_line(line, i + 1)?);
    }
    debug!("{} read spans loaded from {}", spans.len(), bed_path);
    Ok(spans)
}

/// Collect the reference span of every mapped primary or supplementary alignment in a BAM
pub fn get_read_spans_from_bam(bam_filename: &PathBuf) -> Result<Vec<ReadSpan>> {
    let start_time = SystemTime::now();
    let mut bam_reader = bam::Reader::from_path(bam_filename)?;
    let target_names: Vec<String> = bam_reader
        .header()
        .target_names()
        .iter()
        .map(|name| String::from_utf8_lossy(name).to_string())
        .collect();

    let mut spans = Vec::new();
    // while more verbose, reading into an existing record rather than allocating new ones should
    // improve efficiency, since this method will only allocate memory for one record
    let mut record: bam::Record = bam::Record::new();
    while let Some(result) = bam_reader.read(&mut record) {
        result?;
        if record.is_unmapped() || record.is_secondary() || record.tid() < 0 {
            continue;
        }
        let contig = match target_names.get(record.tid() as usize) {
            Some(contig) => contig.clone(),
            None => continue,
        };
        let readname = String::from_utf8_lossy(record.qname()).to_string();
        spans.push(ReadSpan::new(
            contig,
            record.pos(),
            record.reference_end(),
            readname,
        ));
    }
    debug!(
        "{} read spans extracted from BAM in {}s",
        spans.len(),
        start_time.elapsed().unwrap_or_default().as_secs()
    );
    Ok(spans)
}

/// Contig names from the first column of a plain list or FASTA index
pub fn load_contigs(contigs_path: &String) -> Result<HashSet<String>> {
    Ok(utils::read_file_from_path(contigs_path)?
        .iter()
        .filter_map(|line| line.split('\t').next())
        .map(|contig| contig.trim().to_string())
        .filter(|contig| !contig.is_empty() && !contig.starts_with('#'))
        .collect())
}

pub fn get_contigs_from_bam(bam_filename: &PathBuf) -> Result<HashSet<String>> {
    let bam_reader = bam::Reader::from_path(bam_filename)?;
    Ok(bam_reader
        .header()
        .target_names()
        .iter()
        .map(|name| String::from_utf8_lossy(name).to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_intra_evidence_line() {
        let line = "chr1\t900\t4000\tDel 2000\t2000\t60\tr1~chr1:1000-3000\t15000\tr1~mL";
        let record = parse_evidence_line(line, 1).unwrap();
        assert_eq!(record.raw_label, "Del");
        assert_eq!(record.sv_label, "Del");
        assert_eq!(record.size, 2000);
        assert_eq!(record.breakends.len(), 2);
        assert_eq!(record.breakends[0].pos, ContigPos::new("chr1".to_string(), 1000));
        assert_eq!(record.breakends[1].pos, ContigPos::new("chr1".to_string(), 3000));
        assert_eq!(record.id, ReadEvidenceId::from("r1~mL"));
        assert_eq!(record.fields.len(), 9);
    }

    #[test]
    fn test_parse_inter_evidence_line() {
        let line = "chr1\t900\t4000\tInterTx(1) -+\t.\t60\tr1~chr1:1000~chr7:55000\t15000\tr1";
        let record = parse_evidence_line(line, 1).unwrap();
        assert_eq!(record.raw_label, "InterTx(1)");
        assert_eq!(record.sv_label, "InterTx");
        assert_eq!(record.size, 0);
        assert_eq!(record.breakends[0].orientation, Orientation::Reverse);
        assert_eq!(record.breakends[1].orientation, Orientation::Forward);
        assert_eq!(record.breakends[1].pos.contig, "chr7");
    }

    #[test]
    fn test_parse_single_breakend_line() {
        let line = "chr2\t100\t900\tE-Nov_Ins_bp 4\t.\t60\tr9~chr2:850\t9000\tr9~b";
        let record = parse_evidence_line(line, 1).unwrap();
        assert_eq!(record.sv_label, "bp_Nov_Ins");
        assert_eq!(record.breakends.len(), 1);
        assert_eq!(record.breakends[0].orientation, Orientation::Missing);
    }

    #[test]
    fn test_parse_malformed_lines() {
        assert!(matches!(
            parse_evidence_line("chr1\t1\t2", 3),
            Err(ClusterError::MalformedRecord { line: 3, .. })
        ));
        let bad_descriptor = "chr1\t900\t4000\tDel 1\t1\t60\tr1~chr1:abc\t1\tr1";
        assert!(parse_evidence_line(bad_descriptor, 1).is_err());
        let too_many_segments = "chr1\t900\t4000\tDel 1\t1\t60\tr1~chr1:1~chr1:2~chr1:3\t1\tr1";
        assert!(parse_evidence_line(too_many_segments, 1).is_err());
    }

    #[test]
    fn test_parse_read_span_line() {
        let span = parse_read_span_line("chr1\t100\t5000\tr1\t60", 1).unwrap();
        assert_eq!(span, ReadSpan::new("chr1".to_string(), 100, 5000, "r1".to_string()));
        assert!(parse_read_span_line("chr1\tx\t5000\tr1", 1).is_err());
        assert!(parse_read_span_line("chr1\t5000", 1).is_err());
    }

    #[test]
    fn test_group_by_window() {
        let lines = [
            "chr2\t1\t2\tDel 1\t1\t60\tr1~chr2:10-20\t1\tr1",
            "chr1\t1\t2\tDel 1\t1\t60\tr2~chr1:10-20\t1\tr2",
            "chr2\t1\t2\tDel 1\t1\t60\tr3~chr2:10-20\t1\tr3",
        ];
        let evidence: Vec<BreakendEvidence> = lines
            .iter()
            .enumerate()
            .map(|(i, line)| parse_evidence_line(line, i + 1).unwrap())
            .collect();
        let windows = group_by_window(evidence);
        let names: Vec<&String> = windows.keys().collect();
        assert_eq!(names, vec!["chr1", "chr2"]);
        assert_eq!(windows["chr2"].len(), 2);
    }

    #[test]
    fn test_load_contigs_from_fai() {
        let path = std::env::temp_dir().join("svcluster_ingester_contigs.fai");
        std::fs::write(&path, "chr1\t248956422\t112\nchr2\t242193529\t253\n").unwrap();
        let contigs = load_contigs(&path.to_string_lossy().to_string()).unwrap();
        assert_eq!(contigs.len(), 2);
        assert!(contigs.contains("chr2"));
        std::fs::remove_file(path).unwrap();
    }
}
