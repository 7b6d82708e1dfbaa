use chrono::Datelike;
use clap::Parser;
use std::path::PathBuf;

use crate::containers::ClusterParams;

#[derive(Clone, Parser)]
#[clap(author, version, about,
    after_help = format!("Copyright (C) 2004-{}     Pacific Biosciences of California, Inc.
This program comes with ABSOLUTELY NO WARRANTY; it is intended for
Research Use Only and not for use in diagnostic procedures.", chrono::Utc::now().year()))]
pub struct Arguments {
    /// Per-read SV breakend evidence, tab-separated. GZIP files allowed.
    #[clap(required = true)]
    #[clap(long = "evidence")]
    #[clap(value_name = "TSV")]
    pub evidence_path: String,

    /// BED file of read alignment spans used for normal coverage with `--hsb`. GZIP files allowed.
    #[clap(required = false)]
    #[clap(long = "read-spans")]
    #[clap(value_name = "BED")]
    #[clap(conflicts_with = "bam_filename")]
    pub read_spans_path: Option<String>,

    /// Aligned BAM filename, an alternative source of read spans and contig names.
    #[clap(required = false)]
    #[clap(long = "bam")]
    #[clap(value_name = "BAM")]
    pub bam_filename: Option<PathBuf>,

    /// File listing the contigs to analyze, one per line or a FASTA index.
    /// Defaults to the BAM header contigs when `--bam` is given, otherwise all contigs.
    #[clap(required = false)]
    #[clap(long = "contigs")]
    #[clap(value_name = "FILE")]
    pub contigs_path: Option<String>,

    /// Output directory path
    #[clap(required = true)]
    #[clap(long = "outdir")]
    #[clap(value_name = "STRING")]
    pub outdir: String,

    /// Sample or project ID used to name output files.
    #[clap(required = true)]
    #[clap(long = "prefix")]
    #[clap(value_name = "STRING")]
    pub prefix: String,

    /// Greatest distance in bp between chained breakends of one cluster
    #[clap(long = "buffer")]
    #[clap(value_name = "INT")]
    #[clap(default_value = "400")]
    pub buffer: u32,

    /// Minimum number of supporting reads for a call
    #[clap(long = "mincov")]
    #[clap(value_name = "INT")]
    #[clap(default_value = "2")]
    pub mincov: usize,

    /// Maximum number of supporting reads, and of overlapping non-supporting reads, for a call
    #[clap(long = "maxovl")]
    #[clap(value_name = "INT")]
    #[clap(default_value = "400")]
    pub maxovl: usize,

    /// Flag for evidence that went through blast realignment. Enables normal coverage
    /// estimation and absorption of compatible one-sided reads.
    #[clap(long = "hsb")]
    pub hsb: bool,

    /// Number of threads used to process windows in parallel
    #[clap(long = "threads")]
    #[clap(value_name = "INT")]
    #[clap(default_value = "1")]
    pub threads: usize,

    /// First SV index used to name calls
    #[clap(long = "index-seed", hide = true)]
    #[clap(value_name = "INT")]
    #[clap(default_value = "1")]
    pub index_seed: u64,

    /// Flag to output results in unzipped format
    #[clap(long = "write-unzipped", hide = true)]
    pub write_unzipped: bool,

    /// Flag to drop windows with malformed evidence instead of exiting
    #[clap(long = "skip-failed-windows")]
    pub skip_failed_windows: bool,

    /// Optional flag to print verbose output for debugging purposes.
    #[clap(long = "verbose")]
    pub verbose: bool,
}

impl Arguments {
    /// Clustering settings without the contig restriction, which is loaded separately
    pub fn cluster_params(&self) -> ClusterParams {
        ClusterParams::new(self.buffer as i64, self.mincov, self.maxovl, self.hsb)
    }
}

pub fn get_args() -> Arguments {
    Arguments::parse()
}
