//! IFO file reading.
//!
//! [`IfoHandle`] identifies the file kind from the 12-byte identifier, reads the header and then
//! every table the header points at. Mandatory tables must read cleanly or the whole open fails;
//! optional ones are skipped with a warning. Table locations stored as sectors are multiplied by
//! [`DVD_BLOCK_LEN`]; every reader receives an absolute byte offset.

pub mod address;
pub mod attributes;
pub mod pgc;
pub mod vmgi;
pub mod vtsi;

pub use address::{CellAddress, CellAddressTable, VobuAddressMap};
pub use attributes::{DvdTime, LanguageCode};
pub use pgc::{MenuLanguageUnitTable, MenuType, Pgc, Pgcit};
pub use vmgi::{
    ParentalManagementTable, TextDataManager, TitleSearchTable, VmgiMat, VtsAttributeTable,
};
pub use vtsi::{PttSearchTable, TimeMapTable, VtsiMat};

use crate::source::{BlockSource, InfoFileKind, InfoFileProvider};
use crate::validation::{ParseOptions, Validator, Violation};
use crate::{Error, ErrorDetails, Result, SliceReader, TableId, DVD_BLOCK_LEN};
use log::{debug, warn};

/// Positioned reads against a [`BlockSource`], plus the validator for the current parse.
pub(crate) struct IfoReader<S> {
    source: S,
    pub(crate) validator: Validator,
}

impl<S: BlockSource> IfoReader<S> {
    pub(crate) fn new(source: S, options: ParseOptions) -> Self {
        Self {
            source,
            validator: Validator::new(options),
        }
    }

    /// Reads exactly `len` bytes at absolute byte `offset`.
    ///
    /// The buffer grows one block at a time, so a bogus length fails on the first short read
    /// instead of allocating up front.
    pub(crate) fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.source
            .seek(offset)
            .map_err(|e| Error::new(offset, ErrorDetails::Io(e)))?;
        let mut buf = Vec::with_capacity(len.min(DVD_BLOCK_LEN as usize));
        while buf.len() < len {
            let start = buf.len();
            let end = (start + DVD_BLOCK_LEN as usize).min(len);
            buf.resize(end, 0);
            self.source
                .read_exact(&mut buf[start..end])
                .map_err(|e| Error::new(offset + start as u64, ErrorDetails::Io(e)))?;
        }
        Ok(buf)
    }

    pub(crate) fn into_source(self) -> S {
        self.source
    }
}

/// Header of an opened IFO file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IfoHeader {
    Vmg(Box<VmgiMat>),
    Vts(Box<VtsiMat>),
}

impl IfoHeader {
    pub fn vmg(&self) -> Option<&VmgiMat> {
        match self {
            IfoHeader::Vmg(mat) => Some(mat),
            IfoHeader::Vts(_) => None,
        }
    }

    pub fn vts(&self) -> Option<&VtsiMat> {
        match self {
            IfoHeader::Vts(mat) => Some(mat),
            IfoHeader::Vmg(_) => None,
        }
    }
}

fn table_sector(sector: Option<u32>, table: TableId) -> Result<u32> {
    match sector {
        Some(sector) if sector != 0 => Ok(sector),
        _ => Err(Error::new(0, ErrorDetails::MissingTable(table))),
    }
}

/// A parsed video manager (`VIDEO_TS.IFO`) or video title set (`VTS_nn_0.IFO`).
///
/// Tables that were not read, or that were skipped, are `None`. Which tables apply depends on
/// [`IfoHandle::header`]; reading a table the header has no pointer for fails with
/// [`ErrorDetails::MissingTable`].
pub struct IfoHandle<S> {
    pub header: IfoHeader,
    /// Video manager only. `None` when the header has no first play chain.
    pub first_play_pgc: Option<Pgc>,
    /// Video manager only.
    pub title_search_table: Option<TitleSearchTable>,
    pub menu_language_units: Option<MenuLanguageUnitTable>,
    /// Video manager only.
    pub parental_management: Option<ParentalManagementTable>,
    /// Video manager only.
    pub vts_attributes: Option<VtsAttributeTable>,
    /// Video manager only.
    pub text_data: Option<TextDataManager>,
    pub menu_cell_addresses: Option<CellAddressTable>,
    pub menu_vobu_address_map: Option<VobuAddressMap>,
    /// Title set only.
    pub ptt_search_table: Option<PttSearchTable>,
    /// Title set only.
    pub pgcit: Option<Pgcit>,
    /// Title set only.
    pub time_map_table: Option<TimeMapTable>,
    /// Title set only.
    pub title_cell_addresses: Option<CellAddressTable>,
    /// Title set only.
    pub title_vobu_address_map: Option<VobuAddressMap>,
    reader: IfoReader<S>,
}

impl<S> std::fmt::Debug for IfoHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IfoHandle")
            .field("header", &self.header)
            .field("first_play_pgc", &self.first_play_pgc)
            .field("title_search_table", &self.title_search_table)
            .field("menu_language_units", &self.menu_language_units)
            .field("parental_management", &self.parental_management)
            .field("vts_attributes", &self.vts_attributes)
            .field("text_data", &self.text_data)
            .field("menu_cell_addresses", &self.menu_cell_addresses)
            .field("menu_vobu_address_map", &self.menu_vobu_address_map)
            .field("ptt_search_table", &self.ptt_search_table)
            .field("pgcit", &self.pgcit)
            .field("time_map_table", &self.time_map_table)
            .field("title_cell_addresses", &self.title_cell_addresses)
            .field("title_vobu_address_map", &self.title_vobu_address_map)
            .field("violations", &self.reader.validator.violations())
            .finish()
    }
}

impl<S: BlockSource> IfoHandle<S> {
    /// Opens title `title` (0 is the video manager) and reads every table, falling back to the
    /// `.BUP` copy when the `.IFO` cannot be read.
    pub fn open<P>(provider: &mut P, title: u32) -> Result<Self>
    where
        P: InfoFileProvider<File = S>,
    {
        Self::open_with_options(provider, title, ParseOptions::default())
    }

    pub fn open_with_options<P>(provider: &mut P, title: u32, options: ParseOptions) -> Result<Self>
    where
        P: InfoFileProvider<File = S>,
    {
        if title > 99 {
            return Err(Error::new(0, ErrorDetails::InvalidTitle(title)));
        }
        with_backup(provider, title, |source| Self::from_source(source, options))
    }

    /// Opens `VIDEO_TS.IFO` and reads only its header.
    pub fn open_vmg<P>(provider: &mut P) -> Result<Self>
    where
        P: InfoFileProvider<File = S>,
    {
        with_backup(provider, 0, |source| {
            let handle = Self::header_only(source, ParseOptions::default())?;
            match handle.header {
                IfoHeader::Vmg(_) => Ok(handle),
                IfoHeader::Vts(ref mat) => Err(Error::new(
                    0,
                    ErrorDetails::BadIdentifier(mat.vts_identifier),
                )),
            }
        })
    }

    /// Opens `VTS_nn_0.IFO` for title set `title` (1 to 99) and reads only its header.
    pub fn open_vts<P>(provider: &mut P, title: u32) -> Result<Self>
    where
        P: InfoFileProvider<File = S>,
    {
        if title == 0 || title > 99 {
            return Err(Error::new(0, ErrorDetails::InvalidTitle(title)));
        }
        with_backup(provider, title, |source| {
            let handle = Self::header_only(source, ParseOptions::default())?;
            match handle.header {
                IfoHeader::Vts(_) => Ok(handle),
                IfoHeader::Vmg(ref mat) => Err(Error::new(
                    0,
                    ErrorDetails::BadIdentifier(mat.vmg_identifier),
                )),
            }
        })
    }

    /// Parses a complete IFO file from `source`.
    pub fn from_source(source: S, options: ParseOptions) -> Result<Self> {
        let mut handle = Self::header_only(source, options)?;
        handle.read_tables()?;
        Ok(handle)
    }

    /// Identifies `source` and parses its header. Tables are left unread.
    pub fn header_only(source: S, options: ParseOptions) -> Result<Self> {
        let mut reader = IfoReader::new(source, options);
        let identifier = reader.read_at(0, 12)?;
        let header = if identifier[..] == VmgiMat::IDENTIFIER[..] {
            let buf = reader.read_at(0, VmgiMat::SIZE)?;
            let mat = VmgiMat::parse(&mut SliceReader::new(&buf), &mut reader.validator)?;
            debug!("Read VMGI_MAT with {} title sets", mat.vmg_nr_of_title_sets);
            IfoHeader::Vmg(Box::new(mat))
        } else if identifier[..] == VtsiMat::IDENTIFIER[..] {
            let buf = reader.read_at(0, VtsiMat::SIZE)?;
            let mat = VtsiMat::parse(&mut SliceReader::new(&buf), &mut reader.validator)?;
            debug!("Read VTSI_MAT");
            IfoHeader::Vts(Box::new(mat))
        } else {
            let mut id = [0_u8; 12];
            id.copy_from_slice(&identifier);
            return Err(Error::new(0, ErrorDetails::BadIdentifier(id)));
        };

        Ok(Self {
            header,
            first_play_pgc: None,
            title_search_table: None,
            menu_language_units: None,
            parental_management: None,
            vts_attributes: None,
            text_data: None,
            menu_cell_addresses: None,
            menu_vobu_address_map: None,
            ptt_search_table: None,
            pgcit: None,
            time_map_table: None,
            title_cell_addresses: None,
            title_vobu_address_map: None,
            reader,
        })
    }

    fn read_tables(&mut self) -> Result<()> {
        match self.header {
            IfoHeader::Vmg(_) => {
                self.read_first_play_pgc()?;
                self.read_title_search_table()?;
                let result = self.read_menu_language_units().map(drop);
                self.optional(TableId::MenuLanguageUnits, result)?;
                let result = self.read_parental_management().map(drop);
                self.optional(TableId::ParentalManagement, result)?;
                self.read_vts_attributes()?;
                let result = self.read_text_data().map(drop);
                self.optional(TableId::TextData, result)?;
                let result = self.read_menu_cell_addresses().map(drop);
                self.optional(TableId::CellAddress, result)?;
                let result = self.read_menu_vobu_address_map().map(drop);
                self.optional(TableId::VobuAddressMap, result)?;
            }
            IfoHeader::Vts(_) => {
                self.read_ptt_search_table()?;
                self.read_pgcit()?;
                let result = self.read_menu_language_units().map(drop);
                self.optional(TableId::MenuLanguageUnits, result)?;
                let result = self.read_time_map_table().map(drop);
                self.optional(TableId::TimeMap, result)?;
                let result = self.read_menu_cell_addresses().map(drop);
                self.optional(TableId::CellAddress, result)?;
                let result = self.read_menu_vobu_address_map().map(drop);
                self.optional(TableId::VobuAddressMap, result)?;
                self.read_title_cell_addresses()?;
                self.read_title_vobu_address_map()?;
            }
        }
        Ok(())
    }

    /// Swallows the failure of an optional table, unless strict validation rejected it.
    fn optional(&self, table: TableId, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(e) => match e.details() {
                ErrorDetails::MissingTable(_) => {
                    debug!("No {} present", table);
                    Ok(())
                }
                ErrorDetails::InvariantViolation { .. } => Err(e),
                _ => {
                    warn!("Skipping unreadable {}: {}", table, e);
                    Ok(())
                }
            },
        }
    }

    /// Reads the first play chain of a video manager. `None` when the header has no pointer.
    pub fn read_first_play_pgc(&mut self) -> Result<Option<&Pgc>> {
        let mat = self
            .header
            .vmg()
            .ok_or_else(|| Error::new(0, ErrorDetails::MissingTable(TableId::FirstPlayPgc)))?;
        let offset = mat.first_play_pgc;
        if offset == 0 {
            self.first_play_pgc = None;
            return Ok(None);
        }
        let pgc = Pgc::read(&mut self.reader, offset as u64)?;
        Ok(Some(self.first_play_pgc.insert(pgc)))
    }

    pub fn read_title_search_table(&mut self) -> Result<&TitleSearchTable> {
        let sector = table_sector(self.header.vmg().map(|m| m.tt_srpt), TableId::TitleSearch)?;
        let table = TitleSearchTable::read(&mut self.reader, sector)?;
        Ok(self.title_search_table.insert(table))
    }

    /// Reads the menu language units of either file kind.
    pub fn read_menu_language_units(&mut self) -> Result<&MenuLanguageUnitTable> {
        let sector = match &self.header {
            IfoHeader::Vmg(mat) => mat.vmgm_pgci_ut,
            IfoHeader::Vts(mat) => mat.vtsm_pgci_ut,
        };
        let sector = table_sector(Some(sector), TableId::MenuLanguageUnits)?;
        let table = MenuLanguageUnitTable::read(&mut self.reader, sector)?;
        Ok(self.menu_language_units.insert(table))
    }

    pub fn read_parental_management(&mut self) -> Result<&ParentalManagementTable> {
        let sector = table_sector(
            self.header.vmg().map(|m| m.ptl_mait),
            TableId::ParentalManagement,
        )?;
        let table = ParentalManagementTable::read(&mut self.reader, sector)?;
        Ok(self.parental_management.insert(table))
    }

    pub fn read_vts_attributes(&mut self) -> Result<&VtsAttributeTable> {
        let sector = table_sector(self.header.vmg().map(|m| m.vts_atrt), TableId::VtsAttributes)?;
        let table = VtsAttributeTable::read(&mut self.reader, sector)?;
        Ok(self.vts_attributes.insert(table))
    }

    pub fn read_text_data(&mut self) -> Result<&TextDataManager> {
        let sector = table_sector(self.header.vmg().map(|m| m.txtdt_mgi), TableId::TextData)?;
        let table = TextDataManager::read(&mut self.reader, sector)?;
        Ok(self.text_data.insert(table))
    }

    /// Reads the cell address table of the menu VOBs of either file kind.
    pub fn read_menu_cell_addresses(&mut self) -> Result<&CellAddressTable> {
        let sector = match &self.header {
            IfoHeader::Vmg(mat) => mat.vmgm_c_adt,
            IfoHeader::Vts(mat) => mat.vtsm_c_adt,
        };
        let sector = table_sector(Some(sector), TableId::CellAddress)?;
        let table = CellAddressTable::read(&mut self.reader, sector)?;
        Ok(self.menu_cell_addresses.insert(table))
    }

    /// Reads the VOBU address map of the menu VOBs of either file kind.
    pub fn read_menu_vobu_address_map(&mut self) -> Result<&VobuAddressMap> {
        let sector = match &self.header {
            IfoHeader::Vmg(mat) => mat.vmgm_vobu_admap,
            IfoHeader::Vts(mat) => mat.vtsm_vobu_admap,
        };
        let sector = table_sector(Some(sector), TableId::VobuAddressMap)?;
        let table = VobuAddressMap::read(&mut self.reader, sector)?;
        Ok(self.menu_vobu_address_map.insert(table))
    }

    pub fn read_ptt_search_table(&mut self) -> Result<&PttSearchTable> {
        let sector = table_sector(self.header.vts().map(|m| m.vts_ptt_srpt), TableId::PttSearch)?;
        let table = PttSearchTable::read(&mut self.reader, sector)?;
        Ok(self.ptt_search_table.insert(table))
    }

    pub fn read_pgcit(&mut self) -> Result<&Pgcit> {
        let sector = table_sector(self.header.vts().map(|m| m.vts_pgcit), TableId::Pgcit)?;
        let table = Pgcit::read(&mut self.reader, sector as u64 * DVD_BLOCK_LEN)?;
        Ok(self.pgcit.insert(table))
    }

    pub fn read_time_map_table(&mut self) -> Result<&TimeMapTable> {
        let sector = table_sector(self.header.vts().map(|m| m.vts_tmapt), TableId::TimeMap)?;
        let table = TimeMapTable::read(&mut self.reader, sector)?;
        Ok(self.time_map_table.insert(table))
    }

    pub fn read_title_cell_addresses(&mut self) -> Result<&CellAddressTable> {
        let sector = table_sector(self.header.vts().map(|m| m.vts_c_adt), TableId::CellAddress)?;
        let table = CellAddressTable::read(&mut self.reader, sector)?;
        Ok(self.title_cell_addresses.insert(table))
    }

    pub fn read_title_vobu_address_map(&mut self) -> Result<&VobuAddressMap> {
        let sector = table_sector(
            self.header.vts().map(|m| m.vts_vobu_admap),
            TableId::VobuAddressMap,
        )?;
        let table = VobuAddressMap::read(&mut self.reader, sector)?;
        Ok(self.title_vobu_address_map.insert(table))
    }

    /// Every check that failed so far, including tolerated quirks.
    pub fn violations(&self) -> &[Violation] {
        self.reader.validator.violations()
    }

    /// Takes the recorded violations, leaving the list empty.
    pub fn take_violations(&mut self) -> Vec<Violation> {
        self.reader.validator.take_violations()
    }

    /// Number of titles on the disc (video manager) or in the set (title set).
    pub fn title_count(&self) -> usize {
        match self.header {
            IfoHeader::Vmg(_) => self
                .title_search_table
                .as_ref()
                .map_or(0, |t| t.titles.len()),
            IfoHeader::Vts(_) => self.ptt_search_table.as_ref().map_or(0, |t| t.titles.len()),
        }
    }

    /// Title program chain number `n`, 1-based.
    pub fn pgc(&self, n: u16) -> Option<&Pgc> {
        self.pgcit.as_ref()?.pgc(n)
    }

    /// Releases every table and returns the source.
    pub fn close(self) -> S {
        self.reader.into_source()
    }
}

/// Runs `parse` on the `.IFO` of `title`, then on the `.BUP` if that fails.
///
/// The `.IFO` error is reported when both fail.
fn with_backup<P, T, F>(provider: &mut P, title: u32, mut parse: F) -> Result<T>
where
    P: InfoFileProvider,
    F: FnMut(P::File) -> Result<T>,
{
    let mut first_error = None;
    for kind in [InfoFileKind::Ifo, InfoFileKind::Backup].iter().copied() {
        let result = provider
            .open_info_file(title, kind)
            .map_err(|e| Error::new(0, ErrorDetails::Io(e)))
            .and_then(&mut parse);
        match result {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("Failed to read {}: {}", kind.file_name(title), e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    Err(first_error.unwrap_or_else(|| Error::new(0, ErrorDetails::InvalidTitle(title))))
}

#[cfg(test)]
pub(crate) mod fixture {
    //! Byte image builders for table tests.

    use super::IfoReader;
    use crate::ParseOptions;
    use std::io::Cursor;

    /// In-memory IFO image with big-endian writers.
    pub(crate) struct Image(pub Vec<u8>);

    impl Image {
        pub(crate) fn new(len: usize) -> Self {
            Self(vec![0; len])
        }

        pub(crate) fn u8(&mut self, at: usize, value: u8) -> &mut Self {
            self.0[at] = value;
            self
        }

        pub(crate) fn u16(&mut self, at: usize, value: u16) -> &mut Self {
            self.bytes(at, &value.to_be_bytes())
        }

        pub(crate) fn u32(&mut self, at: usize, value: u32) -> &mut Self {
            self.bytes(at, &value.to_be_bytes())
        }

        pub(crate) fn bytes(&mut self, at: usize, value: &[u8]) -> &mut Self {
            self.0[at..at + value.len()].copy_from_slice(value);
            self
        }

        pub(crate) fn reader(&self, options: ParseOptions) -> IfoReader<Cursor<Vec<u8>>> {
            IfoReader::new(Cursor::new(self.0.clone()), options)
        }
    }

    /// Writes a chain at `at` with program `p` starting at cell `p + 1` and cell `c` covering
    /// sectors `c * 10` to `c * 10 + 9`. Returns the length of the chain and its sub-tables.
    pub(crate) fn write_pgc(image: &mut Image, at: usize, programs: u8, cells: u8) -> usize {
        image.u8(at + 2, programs).u8(at + 3, cells);
        if programs == 0 {
            return 236;
        }
        let map = 236;
        let playback = map + ((programs as usize + 1) & !1);
        let position = playback + cells as usize * 24;
        let end = position + cells as usize * 4;
        image
            .u16(at + 230, map as u16)
            .u16(at + 232, playback as u16)
            .u16(at + 234, position as u16);
        for p in 0..programs {
            image.u8(at + map + p as usize, p + 1);
        }
        for c in 0..cells as u32 {
            let cell = at + playback + c as usize * 24;
            image
                .u32(cell + 8, c * 10)
                .u32(cell + 12, c * 10 + 9)
                .u32(cell + 16, c * 10 + 5)
                .u32(cell + 20, c * 10 + 9);
            let pos = at + position + c as usize * 4;
            image.u16(pos, 1).u8(pos + 3, c as u8 + 1);
        }
        end
    }

    /// Writes a strictly valid video manager header: one volume, one title set, the title
    /// search table at sector 1 and the title set attributes at sector 2.
    pub(crate) fn write_vmgi(image: &mut Image) {
        image
            .bytes(0, b"DVDVIDEO-VMG")
            .u32(12, 100)
            .u32(28, 10)
            .u16(38, 1)
            .u16(40, 1)
            .u8(42, 1)
            .u16(62, 1)
            .u32(128, 1023)
            .u32(196, 1)
            .u32(208, 2);
    }

    /// Writes a strictly valid title set header: PTT search table at sector 1, PGCIT at 2,
    /// cell addresses at 3 and VOBU address map at 4.
    pub(crate) fn write_vtsi(image: &mut Image) {
        image
            .bytes(0, b"DVDVIDEO-VTS")
            .u32(12, 100)
            .u32(28, 10)
            .u32(128, 1023)
            .u32(200, 1)
            .u32(204, 2)
            .u32(224, 3)
            .u32(228, 4);
    }
}
