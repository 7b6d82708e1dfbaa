use std::io::{BufRead, BufReader};
use std::str::FromStr;

use crate::containers::{ContigPos, ReadEvidenceId};
use crate::errors::{ClusterError, Result};

/// Smallest SV size that lets a cluster with low read support
/// through the linker before realignment
pub const SIZE_RESCUE_MIN: u64 = 100;

/// Deletions and novel insertions at or below this size need
/// full read support to be reported
pub const SMALL_SV_MAX_SIZE: u64 = 200;

/// Read support floor, combined with mincov as min(2, mincov) in the
/// linker and max(mincov, 2) in the final filter
pub const MIN_READ_SUPPORT: usize = 2;

/// Length trimmed from each end of a read span before overlap counting
pub const SPAN_TRIM: i64 = 100;

/// Read spans starting at or before this position keep their start untrimmed
pub const SPAN_TRIM_MIN_START: i64 = 200;

/// first two bytes of a gzip file that indicatee the compression algorithm used
const GZIP_INDICATOR: [u8; 2] = [0x1F, 0x8B];

/// Parse an SV size field. Anything that is not a non-negative integer,
/// including `.` placeholders, becomes 0.
pub fn normalize_size(value: &str) -> u64 {
    value.trim().parse::<u64>().unwrap_or(0)
}

/// Map historical and alternate SV label spellings onto one canonical label.
/// Unknown labels are returned unchanged.
pub fn canonicalize_sv_type(raw_label: &str) -> String {
    let canonical = match raw_label {
        "S-Nov_Ins_bp" | "E-Nov_Ins_bp" => "bp_Nov_Ins",
        "InterTx(1)" | "InterTx(2)" => "InterTx",
        "Inv(1)" | "Inv(2)" => "Inv2",
        "Intra-Ins(1)" | "Intra-Ins(2)" => "Intra-Ins2",
        "Inter-Ins(1)" | "Inter-Ins(2)" => "Inter-Ins",
        other => other,
    };
    canonical.to_string()
}

/// Rule used by `order_cluster_pair`
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PairOrderMode {
    Intra,
    Inter,
}

impl FromStr for PairOrderMode {
    type Err = ClusterError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Intra" => Ok(PairOrderMode::Intra),
            "Inter" => Ok(PairOrderMode::Inter),
            _ => Err(ClusterError::UnrecognizedPairMode(s.to_string())),
        }
    }
}

/// Order the two coordinates of a paired cluster relative to a reference position.
///
/// In `Intra` mode the coordinate closest to the reference position comes first.
/// In `Inter` mode the same distance rule applies to same-contig pairs, otherwise
/// the coordinate on the reference contig comes first. Ties keep the input order.
pub fn order_cluster_pair(
    first: &ContigPos,
    second: &ContigPos,
    reference: &ContigPos,
    mode: PairOrderMode,
) -> (ContigPos, ContigPos) {
    let closest_first = || {
        let first_dist = (first.pos - reference.pos).abs();
        let second_dist = (second.pos - reference.pos).abs();
        if second_dist < first_dist {
            (second.clone(), first.clone())
        } else {
            (first.clone(), second.clone())
        }
    };
    match mode {
        PairOrderMode::Intra => closest_first(),
        PairOrderMode::Inter => {
            if first.contig == second.contig {
                closest_first()
            } else if second.contig == reference.contig {
                (second.clone(), first.clone())
            } else {
                (first.clone(), second.clone())
            }
        }
    }
}

/// Arithmetic mean rounded to the nearest integer, ties to even
pub fn round_mean(values: &[i64]) -> i64 {
    if values.is_empty() {
        return 0;
    }
    let count = values.len() as i128;
    let sum: i128 = values.iter().map(|v| *v as i128).sum();
    let quotient = sum.div_euclid(count);
    let twice_remainder = 2 * sum.rem_euclid(count);
    let rounded = if twice_remainder > count || (twice_remainder == count && quotient % 2 != 0) {
        quotient + 1
    } else {
        quotient
    };
    rounded as i64
}

/// Count distinct physical reads, ignoring side and method suffixes
pub fn count_physical_reads<'a>(ids: impl Iterator<Item = &'a ReadEvidenceId>) -> usize {
    let mut physical: Vec<&str> = ids.map(|id| id.physical.as_str()).collect();
    physical.sort_unstable();
    physical.dedup();
    physical.len()
}

pub fn is_local_file(filepath: &String) -> bool {
    let path = std::path::Path::new(filepath);

    match std::fs::metadata(path) {
        Ok(metadata) => metadata.is_file(),
        Err(_) => false, // If there is an error (e.g., path doesn't exist), return false
    }
}

/// Check if a file is a gzipped file from a String path
pub fn is_gzipped(path: &String) -> Result<bool> {
    if !is_local_file(path) {
        return Ok(false);
    }
    let file_handle = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file_handle);
    let mut gzip_indicator_bytes = [0; 2];
    let _ = std::io::Read::read_exact(&mut reader, &mut gzip_indicator_bytes);
    let _ = std::io::Seek::rewind(&mut reader);
    Ok(gzip_indicator_bytes == GZIP_INDICATOR)
}

/// Read a plain text or gzipped text file into vector of Strings by line
pub fn read_file_from_path(file_path: &String) -> Result<Vec<String>> {
    let path = std::path::Path::new(file_path);
    let file = std::fs::File::open(path)?;

    let lines = match is_gzipped(file_path)? {
        true => {
            let bgzf_reader = rust_htslib::bgzf::Reader::from_path(file_path)?;
            let reader = BufReader::new(bgzf_reader);
            reader.lines().collect::<std::io::Result<Vec<String>>>()?
        }
        false => {
            let reader = BufReader::new(file);
            reader.lines().collect::<std::io::Result<Vec<String>>>()?
        }
    };
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(contig: &str, pos: i64) -> ContigPos {
        ContigPos::new(contig.to_string(), pos)
    }

    #[test]
    fn test_normalize_size() {
        assert_eq!(normalize_size("5000"), 5000);
        assert_eq!(normalize_size("0"), 0);
        assert_eq!(normalize_size("."), 0);
        assert_eq!(normalize_size(""), 0);
        assert_eq!(normalize_size("-20"), 0);
        assert_eq!(normalize_size("12.5"), 0);
    }

    #[test]
    fn test_canonicalize_sv_type() {
        assert_eq!(canonicalize_sv_type("S-Nov_Ins_bp"), "bp_Nov_Ins");
        assert_eq!(canonicalize_sv_type("E-Nov_Ins_bp"), "bp_Nov_Ins");
        assert_eq!(canonicalize_sv_type("TDupl"), "TDupl");
        assert_eq!(canonicalize_sv_type("Inv(1)"), "Inv2");
        assert_eq!(canonicalize_sv_type("Intra-Ins(2)"), "Intra-Ins2");
        assert_eq!(canonicalize_sv_type("Inter-Ins(1)"), "Inter-Ins");
        assert_eq!(canonicalize_sv_type("InterTx(2)"), "InterTx");
        assert_eq!(canonicalize_sv_type("Mystery"), "Mystery");
    }

    #[test]
    fn test_canonicalize_sv_type_idempotent() {
        for label in [
            "S-Nov_Ins_bp",
            "E-Nov_Ins_bp",
            "bp_Nov_Ins",
            "Nov_Ins",
            "Del",
            "Inv",
            "Inv(1)",
            "Inv(2)",
            "TDupl",
            "Intra-Ins",
            "Intra-Ins(1)",
            "Inter-Ins(2)",
            "InterTx",
            "InterTx(1)",
            "Unknown",
        ] {
            let once = canonicalize_sv_type(label);
            assert_eq!(canonicalize_sv_type(&once), once);
        }
    }

    #[test]
    fn test_order_cluster_pair_intra() {
        let (first, second) = order_cluster_pair(
            &pos("chr1", 1000),
            &pos("chr1", 5000),
            &pos("chr1", 4900),
            PairOrderMode::Intra,
        );
        assert_eq!(first, pos("chr1", 5000));
        assert_eq!(second, pos("chr1", 1000));

        // equal distance keeps input order
        let (first, _) = order_cluster_pair(
            &pos("chr1", 1000),
            &pos("chr1", 3000),
            &pos("chr1", 2000),
            PairOrderMode::Intra,
        );
        assert_eq!(first, pos("chr1", 1000));
    }

    #[test]
    fn test_order_cluster_pair_inter() {
        let (first, second) = order_cluster_pair(
            &pos("chr1", 1000),
            &pos("chr5", 200),
            &pos("chr5", 900_000),
            PairOrderMode::Inter,
        );
        assert_eq!(first, pos("chr5", 200));
        assert_eq!(second, pos("chr1", 1000));

        // same-contig pairs fall back to distance
        let (first, _) = order_cluster_pair(
            &pos("chr2", 100),
            &pos("chr2", 9000),
            &pos("chr2", 8800),
            PairOrderMode::Inter,
        );
        assert_eq!(first, pos("chr2", 9000));
    }

    #[test]
    fn test_pair_order_mode_parsing() {
        assert_eq!(PairOrderMode::from_str("Intra").ok(), Some(PairOrderMode::Intra));
        assert_eq!(PairOrderMode::from_str("Inter").ok(), Some(PairOrderMode::Inter));
        assert!(matches!(
            PairOrderMode::from_str("Sideways"),
            Err(ClusterError::UnrecognizedPairMode(_))
        ));
    }

    #[test]
    fn test_round_mean() {
        assert_eq!(round_mean(&[1000, 1020]), 1010);
        assert_eq!(round_mean(&[3000, 3010]), 3005);
        assert_eq!(round_mean(&[1, 2]), 2);
        assert_eq!(round_mean(&[2, 3]), 2);
        assert_eq!(round_mean(&[1, 1, 2]), 1);
        assert_eq!(round_mean(&[7]), 7);
        assert_eq!(round_mean(&[]), 0);
    }

    #[test]
    fn test_count_physical_reads() {
        let ids = vec![
            ReadEvidenceId::from("read1~mL"),
            ReadEvidenceId::from("read1~mR"),
            ReadEvidenceId::from("read2~b"),
        ];
        assert_eq!(count_physical_reads(ids.iter()), 2);
    }

    #[test]
    fn test_read_file_from_path_plain() {
        let path = std::env::temp_dir().join("svcluster_utils_plain.txt");
        std::fs::write(&path, "line1\nline2\n").unwrap();
        let path_str = path.to_string_lossy().to_string();
        assert!(!is_gzipped(&path_str).unwrap());
        let lines = read_file_from_path(&path_str).unwrap();
        assert_eq!(lines, vec!["line1".to_string(), "line2".to_string()]);
        std::fs::remove_file(path).unwrap();
    }
}
