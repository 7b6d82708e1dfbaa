use core::fmt;
use serde::Serialize;
use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap, HashSet},
    str::FromStr,
};

use crate::utils;

/// Single genomic position, the typed form of a `chrom:pos` string
#[derive(Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct ContigPos {
    pub contig: String,
    pub pos: i64,
}

impl ContigPos {
    pub fn new(contig: String, pos: i64) -> Self {
        ContigPos { contig, pos }
    }
}

impl fmt::Display for ContigPos {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", &self.contig, &self.pos)
    }
}

/// Strand-relative group a breakend is clustered in. Left and right anchor
/// points are swept independently.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub enum Anchor {
    Left,
    Right,
}

/// Key of one coordinate cluster: the averaged position plus the anchor group it came from
#[derive(Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct ClusterKey {
    pub pos: ContigPos,
    pub anchor: Anchor,
}

impl ClusterKey {
    pub fn new(pos: ContigPos, anchor: Anchor) -> Self {
        ClusterKey { pos, anchor }
    }
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let anchor_label = match self.anchor {
            Anchor::Left => "L",
            Anchor::Right => "R",
        };
        write!(formatter, "{}({})", &self.pos, anchor_label)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Orientation {
    Missing,
    Reverse,
    Forward,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseOrientationError;

impl FromStr for Orientation {
    type Err = ParseOrientationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "." => Ok(Orientation::Missing),
            "+" => Ok(Orientation::Forward),
            "-" => Ok(Orientation::Reverse),
            _ => Err(ParseOrientationError),
        }
    }
}

/// Which alignment pass produced a piece of read evidence
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum AlignmentMethod {
    Primary,
    Blast,
}

impl AlignmentMethod {
    fn marker(&self) -> char {
        match self {
            AlignmentMethod::Primary => 'm',
            AlignmentMethod::Blast => 'b',
        }
    }

    fn from_marker(marker: char) -> Option<Self> {
        match marker {
            'm' => Some(AlignmentMethod::Primary),
            'b' => Some(AlignmentMethod::Blast),
            _ => None,
        }
    }
}

/// Disambiguates the two evidence records a physical read produces for a two-sided SV
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ReadSide {
    Left,
    Right,
}

impl ReadSide {
    fn marker(&self) -> char {
        match self {
            ReadSide::Left => 'L',
            ReadSide::Right => 'R',
        }
    }

    fn from_marker(marker: char) -> Option<Self> {
        match marker {
            'L' => Some(ReadSide::Left),
            'R' => Some(ReadSide::Right),
            _ => None,
        }
    }
}

/// Identifier of one breakend evidence record, in text form `<physical>[~<method><side>]`.
///
/// The method marker is a single character (`m` primary, `b` blast realignment),
/// the side marker is optional (`L` or `R`). An identifier without a `~` suffix
/// is a primary alignment with no side.
///
/// Identifiers order by their text form, so sorted member lists match a plain string
/// sort of the input read ids.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ReadEvidenceId {
    pub physical: String,
    pub method: Option<AlignmentMethod>,
    pub side: Option<ReadSide>,
}

impl ReadEvidenceId {
    pub fn new(physical: &str) -> Self {
        ReadEvidenceId {
            physical: physical.to_string(),
            method: None,
            side: None,
        }
    }

    pub fn with_suffix(physical: &str, method: AlignmentMethod, side: Option<ReadSide>) -> Self {
        ReadEvidenceId {
            physical: physical.to_string(),
            method: Some(method),
            side,
        }
    }
}

impl From<&str> for ReadEvidenceId {
    /// Suffixes that do not follow the marker grammar are kept as part of the physical id
    fn from(s: &str) -> Self {
        if let Some((physical, suffix)) = s.rsplit_once('~') {
            let mut markers = suffix.chars();
            let method_opt = markers.next().and_then(AlignmentMethod::from_marker);
            let side_marker = markers.next();
            let side_opt = side_marker.and_then(ReadSide::from_marker);
            let well_formed = markers.next().is_none() && (side_marker.is_none() || side_opt.is_some());
            if let (Some(method), true) = (method_opt, well_formed) {
                return ReadEvidenceId::with_suffix(physical, method, side_opt);
            }
        }
        ReadEvidenceId::new(s)
    }
}

impl Ord for ReadEvidenceId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string()
            .cmp(&other.to_string())
            .then_with(|| self.physical.cmp(&other.physical))
            .then_with(|| self.method.map(|m| m.marker()).cmp(&other.method.map(|m| m.marker())))
            .then_with(|| self.side.map(|s| s.marker()).cmp(&other.side.map(|s| s.marker())))
    }
}

impl PartialOrd for ReadEvidenceId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReadEvidenceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", &self.physical)?;
        if let Some(method) = self.method {
            write!(formatter, "~{}", method.marker())?;
            if let Some(side) = self.side {
                write!(formatter, "{}", side.marker())?;
            }
        }
        Ok(())
    }
}

/// Precedence class used to arbitrate between differing SV labels in one cluster
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Tier {
    One,
    Two,
    X,
    Three,
}

/// Fixed SV type vocabulary, displayed with its canonical label
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize)]
pub enum SvType {
    BpNovIns,
    NovIns,
    Del,
    Inv,
    TDupl,
    IntraIns,
    InterTx,
    InvPair,
    IntraInsPair,
    InterIns,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseSvTypeError;

impl SvType {
    pub fn label(&self) -> &'static str {
        match self {
            SvType::BpNovIns => "bp_Nov_Ins",
            SvType::NovIns => "Nov_Ins",
            SvType::Del => "Del",
            SvType::Inv => "Inv",
            SvType::TDupl => "TDupl",
            SvType::IntraIns => "Intra-Ins",
            SvType::InterTx => "InterTx",
            SvType::InvPair => "Inv2",
            SvType::IntraInsPair => "Intra-Ins2",
            SvType::InterIns => "Inter-Ins",
        }
    }

    /// Tandem duplications are promoted to tier 3 before realignment only
    pub fn tier(&self, hsb: bool) -> Tier {
        match self {
            SvType::BpNovIns => Tier::One,
            SvType::NovIns | SvType::Del | SvType::Inv => Tier::Two,
            SvType::TDupl => {
                if hsb {
                    Tier::Two
                } else {
                    Tier::Three
                }
            }
            SvType::IntraIns | SvType::InterTx => Tier::X,
            SvType::InvPair | SvType::IntraInsPair | SvType::InterIns => Tier::Three,
        }
    }

    /// Types whose breakend anchors follow the per-side strand
    pub fn is_stranded(&self) -> bool {
        matches!(
            self,
            SvType::IntraIns | SvType::IntraInsPair | SvType::InterIns | SvType::InterTx
        )
    }

    pub fn is_insertion_like(&self) -> bool {
        matches!(
            self,
            SvType::NovIns
                | SvType::BpNovIns
                | SvType::IntraIns
                | SvType::IntraInsPair
                | SvType::InterIns
        )
    }

    pub fn is_inversion(&self) -> bool {
        matches!(self, SvType::Inv | SvType::InvPair)
    }
}

impl FromStr for SvType {
    type Err = ParseSvTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match utils::canonicalize_sv_type(s).as_str() {
            "bp_Nov_Ins" => Ok(SvType::BpNovIns),
            "Nov_Ins" => Ok(SvType::NovIns),
            "Del" => Ok(SvType::Del),
            "Inv" => Ok(SvType::Inv),
            "TDupl" => Ok(SvType::TDupl),
            "Intra-Ins" => Ok(SvType::IntraIns),
            "InterTx" => Ok(SvType::InterTx),
            "Inv2" => Ok(SvType::InvPair),
            "Intra-Ins2" => Ok(SvType::IntraInsPair),
            "Inter-Ins" => Ok(SvType::InterIns),
            _ => Err(ParseSvTypeError),
        }
    }
}

impl fmt::Display for SvType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.label())
    }
}

/// One side of an SV as seen by a single read
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Breakend {
    pub pos: ContigPos,
    pub orientation: Orientation,
}

impl Breakend {
    pub fn new(pos: ContigPos, orientation: Orientation) -> Self {
        Breakend { pos, orientation }
    }
}

/// One line of upstream per-read SV evidence. Immutable once parsed.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct BreakendEvidence {
    /// read id from column 8, also used in the output SV name
    pub id: ReadEvidenceId,

    /// SV label exactly as provided, needed to tell start and end insertion breakends apart
    pub raw_label: String,
    pub sv_label: String,
    pub size: u64,

    /// one breakend for single-breakend insertions, two for everything else
    pub breakends: Vec<Breakend>,

    /// all tab-separated input columns, passed through to the output record
    pub fields: Vec<String>,
}

impl BreakendEvidence {
    pub fn sv_type(&self) -> Option<SvType> {
        SvType::from_str(&self.sv_label).ok()
    }
}

/// Per-read SV type and size lookup for one window
#[derive(Debug, Default)]
pub struct EvidenceIndex<'a> {
    records: HashMap<&'a ReadEvidenceId, &'a BreakendEvidence>,
}

impl<'a> EvidenceIndex<'a> {
    pub fn new(evidence: &'a [BreakendEvidence]) -> Self {
        EvidenceIndex {
            records: evidence.iter().map(|record| (&record.id, record)).collect(),
        }
    }

    pub fn get(&self, id: &ReadEvidenceId) -> Option<&'a BreakendEvidence> {
        self.records.get(id).copied()
    }

    pub fn sv_type(&self, id: &ReadEvidenceId) -> Option<SvType> {
        self.get(id).and_then(|record| record.sv_type())
    }

    pub fn size(&self, id: &ReadEvidenceId) -> u64 {
        self.get(id).map(|record| record.size).unwrap_or(0)
    }
}

/// Read alignment span, a 4-column BED record
#[derive(Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct ReadSpan {
    pub contig: String,
    pub start: i64,
    pub end: i64,
    pub name: String,
}

impl ReadSpan {
    pub fn new(contig: String, start: i64, end: i64, name: String) -> Self {
        ReadSpan {
            contig,
            start,
            end,
            name,
        }
    }
}

/// Single-base interval standing for one side of a coordinate cluster
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct BreakendPoint {
    pub contig: String,
    pub start: i64,
    pub end: i64,
    pub sv_type: SvType,
    /// 1 for the first breakend, 2 for the second
    pub side: u8,
    /// index of the owning cluster in the window's cluster list
    pub cluster_idx: usize,
}

/// Consensus SV candidate built from clustered breakend evidence
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CoordinateCluster {
    pub first: ContigPos,
    pub second: Option<ContigPos>,
    pub members: BTreeSet<ReadEvidenceId>,
    pub sv_type: SvType,
    pub lead: ReadEvidenceId,

    /// reads overlapping the breakends without supporting them, only set in hsb mode
    pub normal_coverage: u32,
}

impl CoordinateCluster {
    pub fn label(&self) -> String {
        match &self.second {
            Some(second) => format!("{}-{}", self.first, second),
            None => self.first.to_string(),
        }
    }

    pub fn is_paired(&self) -> bool {
        self.second.is_some()
    }

    pub fn physical_reads(&self) -> HashSet<&str> {
        self.members.iter().map(|id| id.physical.as_str()).collect()
    }

    /// Number of distinct physical reads, ignoring side suffixes
    pub fn read_count(&self) -> usize {
        utils::count_physical_reads(self.members.iter())
    }
}

/// Settings shared by every stage of window processing
#[derive(Debug, Clone)]
pub struct ClusterParams {
    /// greatest gap in bp between chained breakend coordinates of one cluster
    pub buffer: i64,
    pub mincov: usize,
    pub maxovl: usize,
    /// post-realignment mode
    pub hsb: bool,
    /// contigs allowed in clustering, all contigs are allowed when unset
    pub contigs: Option<HashSet<String>>,
}

impl ClusterParams {
    pub fn new(buffer: i64, mincov: usize, maxovl: usize, hsb: bool) -> Self {
        ClusterParams {
            buffer,
            mincov,
            maxovl,
            hsb,
            contigs: None,
        }
    }

    pub fn is_valid_contig(&self, contig: &str) -> bool {
        match &self.contigs {
            Some(contigs) => contigs.contains(contig),
            None => true,
        }
    }
}

/// Running SV index used to name emitted calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SvIndex(u64);

impl SvIndex {
    pub fn new(seed: u64) -> Self {
        SvIndex(seed)
    }

    /// Return the next unused index
    pub fn next_index(&mut self) -> u64 {
        let index = self.0;
        self.0 += 1;
        index
    }
}
