use thiserror::Error;

/// Failures raised while clustering one analysis window, plus the I/O failures
/// of the ingestion layer. None of these are retried inside the crate.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Malformed single-breakend label `{label}` for read {read}")]
    /// Single-breakend record whose label carries no usable start/end marker
    MalformedBreakendLabel { read: String, label: String },

    #[error("Read {read} assigned to {count} clusters, expected 1 or 2")]
    /// Read evidence landed in an impossible number of clusters
    InvalidClusterCount { read: String, count: usize },

    #[error("Unrecognized SV type `{label}` in cluster {cluster}")]
    /// SV label outside of the known vocabulary reached arbitration
    UnrecognizedSvType { label: String, cluster: String },

    #[error("Unrecognized cluster pair ordering mode `{0}`, expected Intra or Inter")]
    UnrecognizedPairMode(String),

    #[error("No lead read of type {sv_type} found in cluster {cluster}")]
    /// Arbitrated type has no matching member
    NoLeadRead { sv_type: String, cluster: String },

    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not read/process the BAM file: {0}")]
    Bam(#[from] rust_htslib::errors::Error),
}

pub type Result<T> = std::result::Result<T, ClusterError>;
