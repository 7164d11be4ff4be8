//! Library for reading DVD-Video navigation data: the `.IFO` information files of the video
//! manager and title sets, and the PCI/DSI navigation packets embedded in VOB streams.
//!
//! # Usage
//! Simply add this crate as a dependency in your `Cargo.toml`.
//!
//! ```toml
//! [dependencies]
//! dvdread-io = "~0.1.0"
//! ```
//!
//! IFO files are opened through an [`InfoFileProvider`] such as [`VideoTsDir`]:
//!
//! ```no_run
//! use dvdread_io::{IfoHandle, VideoTsDir};
//!
//! let mut disc = VideoTsDir::new("/media/dvd").expect("no VIDEO_TS directory");
//! let vmg = IfoHandle::open(&mut disc, 0).expect("unreadable video manager");
//! for title in vmg.title_search_table.as_ref().unwrap().titles.iter() {
//!     println!("title set {} has {} chapters", title.title_set_nr, title.nr_of_ptts);
//! }
//! ```
//!
//! Navigation packets are decoded independently with [`decode_pci`], [`decode_dsi`] or
//! [`decode_nav_pack`].

use std::fmt::{Display, Formatter};
use std::result;

mod slice_reader;
use slice_reader::SliceReader;

mod bit_reader;
pub use bit_reader::BitReader;

pub mod validation;
pub use validation::{ParseOptions, Quirks, ValidationMode, Validator, Violation};

pub mod source;
pub use source::{BlockSource, InfoFileKind, InfoFileProvider, VideoTsDir};

pub mod ifo;
pub use ifo::{IfoHandle, IfoHeader};

pub mod nav;
pub use nav::{decode_dsi, decode_nav_pack, decode_nav_pack_with, decode_pci, Dsi, Pci};

/// Size of one logical block. Table locations stored as sector numbers are multiplied by this.
pub const DVD_BLOCK_LEN: u64 = 2048;

/// Names every table (and packet) the parser reads, for errors and log lines.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TableId {
    VmgiMat,
    VtsiMat,
    FirstPlayPgc,
    TitleSearch,
    MenuLanguageUnits,
    ParentalManagement,
    VtsAttributes,
    TextData,
    PttSearch,
    Pgcit,
    Pgc,
    CommandTable,
    ProgramMap,
    CellPlayback,
    CellPosition,
    TimeMap,
    CellAddress,
    VobuAddressMap,
    Pci,
    Dsi,
    NavPack,
}

impl TableId {
    /// Name of the table as used in the DVD-Video layout.
    pub fn name(&self) -> &'static str {
        match self {
            TableId::VmgiMat => "VMGI_MAT",
            TableId::VtsiMat => "VTSI_MAT",
            TableId::FirstPlayPgc => "FP_PGC",
            TableId::TitleSearch => "TT_SRPT",
            TableId::MenuLanguageUnits => "PGCI_UT",
            TableId::ParentalManagement => "PTL_MAIT",
            TableId::VtsAttributes => "VTS_ATRT",
            TableId::TextData => "TXTDT_MGI",
            TableId::PttSearch => "VTS_PTT_SRPT",
            TableId::Pgcit => "PGCIT",
            TableId::Pgc => "PGC",
            TableId::CommandTable => "PGC_CMD_TBL",
            TableId::ProgramMap => "PGC_PGMAP",
            TableId::CellPlayback => "C_PBIT",
            TableId::CellPosition => "C_POSIT",
            TableId::TimeMap => "VTS_TMAPT",
            TableId::CellAddress => "C_ADT",
            TableId::VobuAddressMap => "VOBU_ADMAP",
            TableId::Pci => "PCI",
            TableId::Dsi => "DSI",
            TableId::NavPack => "NV_PCK",
        }
    }
}

impl Display for TableId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What went wrong while reading.
#[derive(Debug, thiserror::Error)]
pub enum ErrorDetails {
    /// Seeking or reading the underlying source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A record extended this many bytes past the data that was read for it.
    #[error("table overrun by {0} bytes")]
    TableOverrun(usize),
    /// The 12-byte identifier is neither `DVDVIDEO-VMG` nor `DVDVIDEO-VTS`.
    #[error("unknown IFO identifier {0:x?}")]
    BadIdentifier([u8; 12]),
    /// Title index outside the range accepted by the opener.
    #[error("invalid title number {0}")]
    InvalidTitle(u32),
    /// A table that is mandatory for this kind of IFO is absent.
    #[error("mandatory table {0} is missing")]
    MissingTable(TableId),
    /// An offset would leave the table that contains it.
    #[error("offset {offset:#x} leaves {table} (limit {limit:#x})")]
    OffsetOutOfRange {
        table: TableId,
        offset: u64,
        limit: u64,
    },
    /// A soft check failed while parsing in [`ValidationMode::Strict`].
    #[error("invariant violated in {table}: {check}")]
    InvariantViolation { table: TableId, check: String },
    /// A navigation pack does not have the expected start codes or sub-stream ids.
    #[error("malformed navigation pack")]
    BadNavPack,
}

/// An error and the absolute byte offset where it was detected.
#[derive(Debug, thiserror::Error)]
#[error("{details} (at byte {location:#x})")]
pub struct Error {
    location: u64,
    details: ErrorDetails,
}

impl Error {
    pub fn new(location: u64, details: ErrorDetails) -> Self {
        Self { location, details }
    }

    pub fn location(&self) -> u64 {
        self.location
    }

    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    pub fn into_details(self) -> ErrorDetails {
        self.details
    }
}

pub type Result<T> = result::Result<T, Error>;
