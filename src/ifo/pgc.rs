//! Program chains and the tables that index them.

use super::attributes::{DvdTime, LanguageCode, UserOps};
use super::IfoReader;
use crate::validation::Validator;
use crate::{
    check_value, check_zero, read_bitfield, BlockSource, Error, ErrorDetails, Result, SliceReader,
    TableId, DVD_BLOCK_LEN,
};
use log::debug;
use modular_bitfield_msb::prelude::*;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use smallvec::SmallVec;
use std::fmt::{Debug, Formatter};
use std::ops::RangeInclusive;

/// One opaque 8-byte navigation command.
#[derive(Default, Copy, Clone, PartialEq, Eq)]
pub struct VmCommand(pub [u8; 8]);

impl Debug for VmCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "VmCommand(")?;
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

type Commands = SmallVec<[VmCommand; 4]>;

/// Pre, post and cell commands of a program chain.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandTable {
    pub nr_of_pre: u16,
    pub nr_of_post: u16,
    pub nr_of_cell: u16,
    pub last_byte: u16,
    pub pre_commands: Commands,
    pub post_commands: Commands,
    pub cell_commands: Commands,
}

impl CommandTable {
    pub const HEADER_SIZE: usize = 8;

    pub(crate) fn read<S: BlockSource>(ifo: &mut IfoReader<S>, offset: u64) -> Result<Self> {
        let header = ifo.read_at(offset, Self::HEADER_SIZE)?;
        let mut reader = SliceReader::at(&header, offset);
        let nr_of_pre = reader.read_be_u16()?;
        let nr_of_post = reader.read_be_u16()?;
        let nr_of_cell = reader.read_be_u16()?;
        let last_byte = reader.read_be_u16()?;
        let v = &mut ifo.validator;
        check_value!(
            v,
            TableId::CommandTable,
            offset,
            nr_of_pre as u32 + nr_of_post as u32 + nr_of_cell as u32 <= 255
        );

        let total = nr_of_pre as usize + nr_of_post as usize + nr_of_cell as usize;
        let body_offset = offset + Self::HEADER_SIZE as u64;
        let body = ifo.read_at(body_offset, total * 8)?;
        let mut reader = SliceReader::at(&body, body_offset);
        let mut read_commands = |count: u16| -> Result<Commands> {
            (0..count)
                .map(|_| reader.read_array().map(VmCommand))
                .collect()
        };
        Ok(Self {
            nr_of_pre,
            nr_of_post,
            nr_of_cell,
            last_byte,
            pre_commands: read_commands(nr_of_pre)?,
            post_commands: read_commands(nr_of_post)?,
            cell_commands: read_commands(nr_of_cell)?,
        })
    }
}

/// Block membership of a cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
pub enum BlockMode {
    NotInBlock = 0,
    FirstCell = 1,
    InBlock = 2,
    LastCell = 3,
}

/// Kind of block a cell belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
pub enum BlockType {
    None = 0,
    Angle = 1,
}

#[bitfield]
#[derive(Copy, Clone, PartialEq, Eq)]
#[derive(Debug)]
pub struct CellPlaybackFlags {
    pub block_mode: B2,
    pub block_type: B2,
    pub seamless_play: bool,
    pub interleaved: bool,
    pub stc_discontinuity: bool,
    pub seamless_angle: bool,
    pub unknown1: bool,
    pub playback_mode: bool,
    pub restricted: bool,
    pub cell_type: B5,
}

/// Playback information of one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellPlayback {
    pub flags: CellPlaybackFlags,
    pub still_time: u8,
    pub cell_cmd_nr: u8,
    pub playback_time: DvdTime,
    pub first_sector: u32,
    pub first_ilvu_end_sector: u32,
    pub last_vobu_start_sector: u32,
    pub last_sector: u32,
}

impl CellPlayback {
    pub const SIZE: usize = 24;

    fn parse(reader: &mut SliceReader, v: &mut Validator) -> Result<Self> {
        let location = reader.location();
        let flags = read_bitfield!(reader, CellPlaybackFlags);
        let still_time = reader.read_u8()?;
        let cell_cmd_nr = reader.read_u8()?;
        let playback_time = DvdTime::parse(reader)?;
        let first_sector = reader.read_be_u32()?;
        let first_ilvu_end_sector = reader.read_be_u32()?;
        let last_vobu_start_sector = reader.read_be_u32()?;
        let last_sector = reader.read_be_u32()?;

        check_value!(v, TableId::CellPlayback, location, last_vobu_start_sector <= last_sector);
        if last_vobu_start_sector <= last_sector {
            let tolerate = v.quirks().last_vobu_at_last_sector;
            v.check_quirk(
                TableId::CellPlayback,
                location,
                last_vobu_start_sector < last_sector,
                tolerate,
                "last_vobu_start_sector < last_sector",
            )?;
        }
        check_value!(v, TableId::CellPlayback, location, first_sector <= last_vobu_start_sector);

        Ok(Self {
            flags,
            still_time,
            cell_cmd_nr,
            playback_time,
            first_sector,
            first_ilvu_end_sector,
            last_vobu_start_sector,
            last_sector,
        })
    }

    pub fn block_mode(&self) -> Option<BlockMode> {
        BlockMode::from_u8(self.flags.block_mode())
    }

    pub fn block_type(&self) -> Option<BlockType> {
        BlockType::from_u8(self.flags.block_type())
    }
}

/// VOB and cell id of one cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CellPosition {
    pub vob_id_nr: u16,
    pub zero_1: u8,
    pub cell_nr: u8,
}

impl CellPosition {
    pub const SIZE: usize = 4;

    fn parse(reader: &mut SliceReader, v: &mut Validator) -> Result<Self> {
        let location = reader.location();
        let vob_id_nr = reader.read_be_u16()?;
        let zero_1 = reader.read_u8()?;
        let cell_nr = reader.read_u8()?;
        check_zero!(v, TableId::CellPosition, location, zero_1);
        Ok(Self {
            vob_id_nr,
            zero_1,
            cell_nr,
        })
    }
}

/// Program chain.
///
/// The four sub-table offsets are relative to the start of the chain. A zero offset means the
/// sub-table is absent and the matching field below is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pgc {
    pub zero_1: u16,
    pub nr_of_programs: u8,
    pub nr_of_cells: u8,
    pub playback_time: DvdTime,
    pub prohibited_ops: UserOps,
    pub audio_control: [u16; 8],
    pub subp_control: [u32; 32],
    pub next_pgc_nr: u16,
    pub prev_pgc_nr: u16,
    pub goup_pgc_nr: u16,
    pub still_time: u8,
    pub pg_playback_mode: u8,
    pub palette: [u32; 16],
    pub command_tbl_offset: u16,
    pub program_map_offset: u16,
    pub cell_playback_offset: u16,
    pub cell_position_offset: u16,
    pub command_tbl: Option<CommandTable>,
    /// Entry cell number of each program.
    pub program_map: Vec<u8>,
    pub cell_playback: Vec<CellPlayback>,
    pub cell_position: Vec<CellPosition>,
}

impl Pgc {
    pub const SIZE: usize = 236;

    fn parse(reader: &mut SliceReader, v: &mut Validator) -> Result<Self> {
        let location = reader.location();
        let zero_1 = reader.read_be_u16()?;
        let nr_of_programs = reader.read_u8()?;
        let nr_of_cells = reader.read_u8()?;
        let playback_time = DvdTime::parse(reader)?;
        let prohibited_ops = UserOps::parse(reader)?;
        let mut audio_control = [0_u16; 8];
        for control in audio_control.iter_mut() {
            *control = reader.read_be_u16()?;
        }
        let mut subp_control = [0_u32; 32];
        for control in subp_control.iter_mut() {
            *control = reader.read_be_u32()?;
        }
        let next_pgc_nr = reader.read_be_u16()?;
        let prev_pgc_nr = reader.read_be_u16()?;
        let goup_pgc_nr = reader.read_be_u16()?;
        let still_time = reader.read_u8()?;
        let pg_playback_mode = reader.read_u8()?;
        let mut palette = [0_u32; 16];
        for color in palette.iter_mut() {
            *color = reader.read_be_u32()?;
        }
        let command_tbl_offset = reader.read_be_u16()?;
        let program_map_offset = reader.read_be_u16()?;
        let cell_playback_offset = reader.read_be_u16()?;
        let cell_position_offset = reader.read_be_u16()?;

        check_zero!(v, TableId::Pgc, location, zero_1);
        check_value!(v, TableId::Pgc, location, nr_of_programs <= nr_of_cells);
        for (i, control) in audio_control.iter().enumerate() {
            if control & 0x8000 == 0 {
                v.check_zero(TableId::Pgc, location, control, &format!("audio_control[{}]", i))?;
            }
        }
        for (i, control) in subp_control.iter().enumerate() {
            if control & 0x8000_0000 == 0 {
                v.check_zero(TableId::Pgc, location, control, &format!("subp_control[{}]", i))?;
            }
        }
        if nr_of_programs == 0 {
            check_zero!(v, TableId::Pgc, location, still_time);
            check_zero!(v, TableId::Pgc, location, pg_playback_mode);
            check_value!(v, TableId::Pgc, location, program_map_offset == 0);
            check_value!(v, TableId::Pgc, location, cell_playback_offset == 0);
            check_value!(v, TableId::Pgc, location, cell_position_offset == 0);
        } else {
            check_value!(v, TableId::Pgc, location, program_map_offset != 0);
            check_value!(v, TableId::Pgc, location, cell_playback_offset != 0);
            check_value!(v, TableId::Pgc, location, cell_position_offset != 0);
        }

        Ok(Self {
            zero_1,
            nr_of_programs,
            nr_of_cells,
            playback_time,
            prohibited_ops,
            audio_control,
            subp_control,
            next_pgc_nr,
            prev_pgc_nr,
            goup_pgc_nr,
            still_time,
            pg_playback_mode,
            palette,
            command_tbl_offset,
            program_map_offset,
            cell_playback_offset,
            cell_position_offset,
            command_tbl: None,
            program_map: Vec::new(),
            cell_playback: Vec::new(),
            cell_position: Vec::new(),
        })
    }

    /// Reads the chain at absolute byte `offset` together with its sub-tables.
    pub(crate) fn read<S: BlockSource>(ifo: &mut IfoReader<S>, offset: u64) -> Result<Self> {
        let header = ifo.read_at(offset, Self::SIZE)?;
        let mut pgc = Self::parse(&mut SliceReader::at(&header, offset), &mut ifo.validator)?;

        if pgc.command_tbl_offset != 0 {
            pgc.command_tbl = Some(CommandTable::read(
                ifo,
                offset + pgc.command_tbl_offset as u64,
            )?);
        }

        if pgc.program_map_offset != 0 {
            let at = offset + pgc.program_map_offset as u64;
            let map = ifo.read_at(at, pgc.nr_of_programs as usize)?;
            for (i, entry_cell) in map.iter().enumerate() {
                let entry_cell = *entry_cell;
                check_value!(
                    ifo.validator,
                    TableId::ProgramMap,
                    at + i as u64,
                    entry_cell >= 1 && entry_cell <= pgc.nr_of_cells
                );
            }
            pgc.program_map = map;
        }

        if pgc.cell_playback_offset != 0 {
            let at = offset + pgc.cell_playback_offset as u64;
            let buf = ifo.read_at(at, pgc.nr_of_cells as usize * CellPlayback::SIZE)?;
            let mut reader = SliceReader::at(&buf, at);
            pgc.cell_playback = (0..pgc.nr_of_cells)
                .map(|_| CellPlayback::parse(&mut reader, &mut ifo.validator))
                .collect::<Result<_>>()?;
        }

        if pgc.cell_position_offset != 0 {
            let at = offset + pgc.cell_position_offset as u64;
            let buf = ifo.read_at(at, pgc.nr_of_cells as usize * CellPosition::SIZE)?;
            let mut reader = SliceReader::at(&buf, at);
            pgc.cell_position = (0..pgc.nr_of_cells)
                .map(|_| CellPosition::parse(&mut reader, &mut ifo.validator))
                .collect::<Result<_>>()?;
        }

        Ok(pgc)
    }

    /// Stream number mapped to logical audio stream `n`, if that stream is present.
    pub fn audio_stream(&self, n: usize) -> Option<u8> {
        let control = *self.audio_control.get(n)?;
        if control & 0x8000 != 0 {
            Some(((control >> 8) & 0x07) as u8)
        } else {
            None
        }
    }

    pub fn subp_stream_present(&self, n: usize) -> bool {
        self.subp_control
            .get(n)
            .map_or(false, |control| control & 0x8000_0000 != 0)
    }

    /// Cells (1-based) making up the 1-based `program`.
    pub fn program_cells(&self, program: u8) -> Option<RangeInclusive<u8>> {
        let index = (program as usize).checked_sub(1)?;
        let first = *self.program_map.get(index)?;
        let last = match self.program_map.get(index + 1) {
            Some(next) => next.checked_sub(1)?,
            None => self.nr_of_cells,
        };
        Some(first..=last)
    }
}

/// Menu kinds addressed by the low bits of a menu search pointer's entry id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
pub enum MenuType {
    Title = 2,
    Root = 3,
    Subpicture = 4,
    Audio = 5,
    Angle = 6,
    Ptt = 7,
}

#[bitfield]
#[derive(Copy, Clone, PartialEq, Eq)]
#[derive(Debug)]
pub struct PgciBlockFlags {
    pub block_mode: B2,
    pub block_type: B2,
    pub unknown1: B4,
}

/// Search pointer to one chain of a [`Pgcit`], with the chain it points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgciSearchPointer {
    /// Bit 7 marks an entry chain; in menus the low bits hold the [`MenuType`].
    pub entry_id: u8,
    pub flags: PgciBlockFlags,
    pub ptl_id_mask: u16,
    /// Relative to the start of the table.
    pub pgc_start_byte: u32,
    pub pgc: Pgc,
}

impl PgciSearchPointer {
    pub const SIZE: usize = 8;

    pub fn is_entry(&self) -> bool {
        self.entry_id & 0x80 != 0
    }

    pub fn menu_type(&self) -> Option<MenuType> {
        MenuType::from_u8(self.entry_id & 0x0f)
    }
}

/// Program chain information table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pgcit {
    pub nr_of_pgci_srp: u16,
    pub zero_1: u16,
    pub last_byte: u32,
    pub pgci_srp: Vec<PgciSearchPointer>,
}

impl Pgcit {
    pub const HEADER_SIZE: usize = 8;

    /// Reads the table at absolute byte `offset` and every chain it points to.
    pub(crate) fn read<S: BlockSource>(ifo: &mut IfoReader<S>, offset: u64) -> Result<Self> {
        let header = ifo.read_at(offset, Self::HEADER_SIZE)?;
        let mut reader = SliceReader::at(&header, offset);
        let nr_of_pgci_srp = reader.read_be_u16()?;
        let zero_1 = reader.read_be_u16()?;
        let last_byte = reader.read_be_u32()?;
        check_zero!(ifo.validator, TableId::Pgcit, offset, zero_1);
        check_value!(ifo.validator, TableId::Pgcit, offset, nr_of_pgci_srp < 10000);

        let srp_offset = offset + Self::HEADER_SIZE as u64;
        let data = ifo.read_at(srp_offset, nr_of_pgci_srp as usize * PgciSearchPointer::SIZE)?;
        let mut reader = SliceReader::at(&data, srp_offset);
        let mut pointers = Vec::with_capacity(nr_of_pgci_srp as usize);
        for _ in 0..nr_of_pgci_srp {
            let location = reader.location();
            let entry_id = reader.read_u8()?;
            let flags = read_bitfield!(reader, PgciBlockFlags);
            let ptl_id_mask = reader.read_be_u16()?;
            let pgc_start_byte = reader.read_be_u32()?;
            let unknown1 = flags.unknown1();
            check_value!(ifo.validator, TableId::Pgcit, location, unknown1 == 0);
            pointers.push((location, entry_id, flags, ptl_id_mask, pgc_start_byte));
        }

        let limit = last_byte as u64 + 1;
        let mut pgci_srp = Vec::with_capacity(pointers.len());
        for (location, entry_id, flags, ptl_id_mask, pgc_start_byte) in pointers {
            if pgc_start_byte as u64 + Pgc::SIZE as u64 > limit {
                return Err(Error::new(
                    location,
                    ErrorDetails::OffsetOutOfRange {
                        table: TableId::Pgcit,
                        offset: pgc_start_byte as u64,
                        limit,
                    },
                ));
            }
            let pgc = Pgc::read(ifo, offset + pgc_start_byte as u64)?;
            pgci_srp.push(PgciSearchPointer {
                entry_id,
                flags,
                ptl_id_mask,
                pgc_start_byte,
                pgc,
            });
        }
        debug!("Read PGCIT at {:#x} with {} chains", offset, pgci_srp.len());

        Ok(Self {
            nr_of_pgci_srp,
            zero_1,
            last_byte,
            pgci_srp,
        })
    }

    /// Chain with the 1-based program chain number `n`.
    pub fn pgc(&self, n: u16) -> Option<&Pgc> {
        let index = (n as usize).checked_sub(1)?;
        self.pgci_srp.get(index).map(|srp| &srp.pgc)
    }
}

/// Menus of one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuLanguageUnit {
    pub lang_code: LanguageCode,
    pub lang_extension: u8,
    /// Bit mask of the menus present in this unit.
    pub exists: u8,
    /// Relative to the start of the unit table.
    pub lang_start_byte: u32,
    pub pgcit: Pgcit,
}

impl MenuLanguageUnit {
    pub const SIZE: usize = 8;

    /// Entry chain of the given menu.
    pub fn menu(&self, menu: MenuType) -> Option<&Pgc> {
        self.pgcit
            .pgci_srp
            .iter()
            .find(|srp| srp.is_entry() && srp.menu_type() == Some(menu))
            .map(|srp| &srp.pgc)
    }
}

/// Menu language unit table (`PGCI_UT`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuLanguageUnitTable {
    pub nr_of_lus: u16,
    pub zero_1: u16,
    pub last_byte: u32,
    pub lus: Vec<MenuLanguageUnit>,
}

impl MenuLanguageUnitTable {
    pub const HEADER_SIZE: usize = 8;

    pub(crate) fn read<S: BlockSource>(ifo: &mut IfoReader<S>, sector: u32) -> Result<Self> {
        let offset = sector as u64 * DVD_BLOCK_LEN;
        let header = ifo.read_at(offset, Self::HEADER_SIZE)?;
        let mut reader = SliceReader::at(&header, offset);
        let nr_of_lus = reader.read_be_u16()?;
        let zero_1 = reader.read_be_u16()?;
        let last_byte = reader.read_be_u32()?;
        let v = &mut ifo.validator;
        check_zero!(v, TableId::MenuLanguageUnits, offset, zero_1);
        check_value!(v, TableId::MenuLanguageUnits, offset, nr_of_lus != 0);
        check_value!(v, TableId::MenuLanguageUnits, offset, nr_of_lus < 100);
        check_value!(
            v,
            TableId::MenuLanguageUnits,
            offset,
            nr_of_lus as u32 * MenuLanguageUnit::SIZE as u32 <= last_byte
        );

        let lu_offset = offset + Self::HEADER_SIZE as u64;
        let data = ifo.read_at(lu_offset, nr_of_lus as usize * MenuLanguageUnit::SIZE)?;
        let mut reader = SliceReader::at(&data, lu_offset);
        let mut units = Vec::with_capacity(nr_of_lus as usize);
        for _ in 0..nr_of_lus {
            let location = reader.location();
            let lang_code = LanguageCode(reader.read_be_u16()?);
            let lang_extension = reader.read_u8()?;
            let exists = reader.read_u8()?;
            let lang_start_byte = reader.read_be_u32()?;
            let v = &mut ifo.validator;
            check_value!(v, TableId::MenuLanguageUnits, location, exists & 0x07 == 0);
            check_value!(
                v,
                TableId::MenuLanguageUnits,
                location,
                lang_start_byte as u64 + Pgcit::HEADER_SIZE as u64 <= last_byte as u64 + 1
            );
            units.push((lang_code, lang_extension, exists, lang_start_byte));
        }

        let mut lus = Vec::with_capacity(units.len());
        for (lang_code, lang_extension, exists, lang_start_byte) in units {
            let pgcit = Pgcit::read(ifo, offset + lang_start_byte as u64)?;
            lus.push(MenuLanguageUnit {
                lang_code,
                lang_extension,
                exists,
                lang_start_byte,
                pgcit,
            });
        }

        Ok(Self {
            nr_of_lus,
            zero_1,
            last_byte,
            lus,
        })
    }

    pub fn language(&self, lang: LanguageCode) -> Option<&MenuLanguageUnit> {
        self.lus.iter().find(|lu| lu.lang_code == lang)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ifo::fixture::{write_pgc, Image};
    use crate::ParseOptions;

    #[test]
    fn reads_chain_with_sub_tables() {
        let mut image = Image::new(0x400);
        let len = write_pgc(&mut image, 0x100, 2, 3);
        // Command table after the chain: one pre command, one cell command.
        let cmd_at = 0x100 + len;
        image
            .u16(0x100 + 228, len as u16)
            .u16(cmd_at, 1)
            .u16(cmd_at + 4, 1)
            .u16(cmd_at + 6, 8 + 16 - 1)
            .bytes(cmd_at + 8, &[0x30, 0x02, 0, 0, 0, 1, 0, 0])
            .bytes(cmd_at + 16, &[0x20, 0x04, 0, 0, 0, 0, 0, 0x12]);
        let mut ifo = image.reader(ParseOptions::strict());

        let pgc = Pgc::read(&mut ifo, 0x100).unwrap();
        assert_eq!(pgc.nr_of_programs, 2);
        assert_eq!(pgc.program_map, vec![1, 2]);
        assert_eq!(pgc.cell_playback.len(), 3);
        assert_eq!(pgc.cell_position.len(), 3);
        assert_eq!(pgc.cell_playback[2].first_sector, 20);
        assert_eq!(pgc.cell_position[1].cell_nr, 2);
        assert_eq!(pgc.program_cells(1), Some(1..=1));
        assert_eq!(pgc.program_cells(2), Some(2..=3));
        assert_eq!(pgc.program_cells(3), None);

        let commands = pgc.command_tbl.unwrap();
        assert_eq!(commands.pre_commands.len(), 1);
        assert!(commands.post_commands.is_empty());
        assert_eq!(commands.cell_commands[0].0[7], 0x12);
        assert!(ifo.validator.violations().is_empty());
    }

    #[test]
    fn empty_chain_has_no_sub_tables() {
        let mut image = Image::new(0x200);
        write_pgc(&mut image, 0, 0, 0);
        let mut ifo = image.reader(ParseOptions::strict());
        let pgc = Pgc::read(&mut ifo, 0).unwrap();
        assert!(pgc.command_tbl.is_none());
        assert!(pgc.program_map.is_empty());
        assert!(pgc.cell_playback.is_empty());
        assert!(pgc.cell_position.is_empty());
    }

    #[test]
    fn more_programs_than_cells_is_a_violation() {
        let mut image = Image::new(0x400);
        write_pgc(&mut image, 0, 2, 2);
        image.u8(2, 3);

        let mut ifo = image.reader(ParseOptions::default());
        Pgc::read(&mut ifo, 0).unwrap();
        assert!(ifo
            .validator
            .violations()
            .iter()
            .any(|v| v.check == "nr_of_programs <= nr_of_cells"));

        let mut ifo = image.reader(ParseOptions::strict());
        let err = Pgc::read(&mut ifo, 0).unwrap_err();
        assert!(matches!(
            err.details(),
            ErrorDetails::InvariantViolation {
                table: TableId::Pgc,
                ..
            }
        ));
    }

    #[test]
    fn audio_and_subpicture_controls() {
        let mut image = Image::new(0x200);
        write_pgc(&mut image, 0, 0, 0);
        image.u16(12, 0x8200).u32(28 + 4, 0x8000_0101);
        let mut ifo = image.reader(ParseOptions::strict());
        let pgc = Pgc::read(&mut ifo, 0).unwrap();
        assert_eq!(pgc.audio_stream(0), Some(2));
        assert_eq!(pgc.audio_stream(1), None);
        assert_eq!(pgc.audio_stream(8), None);
        assert!(!pgc.subp_stream_present(0));
        assert!(pgc.subp_stream_present(1));
    }

    #[test]
    fn last_vobu_on_last_sector_is_a_quirk() {
        let mut image = Image::new(0x400);
        let len = write_pgc(&mut image, 0, 1, 1);
        let cell_at = len - CellPlayback::SIZE - CellPosition::SIZE;
        image.u32(cell_at + 16, 9).u32(cell_at + 20, 9);

        let mut ifo = image.reader(ParseOptions::strict());
        Pgc::read(&mut ifo, 0).unwrap();
        assert_eq!(ifo.validator.violations().len(), 1);
        assert!(ifo.validator.violations()[0].tolerated);

        let mut options = ParseOptions::strict();
        options.quirks.last_vobu_at_last_sector = false;
        let mut ifo = image.reader(options);
        assert!(Pgc::read(&mut ifo, 0).is_err());
    }

    fn write_pgcit(image: &mut Image, at: usize, starts: &[u32], last_byte: u32) {
        image.u16(at, starts.len() as u16).u32(at + 4, last_byte);
        for (i, start) in starts.iter().enumerate() {
            let srp = at + 8 + i * 8;
            image.u8(srp, 0x80 | (i as u8 + 2)).u32(srp + 4, *start);
        }
    }

    #[test]
    fn reads_pgcit_and_menus() {
        let mut image = Image::new(0x1000);
        // Unit table at sector 1, one language unit whose PGCIT starts 0x10 into it.
        image
            .u16(0x800, 1)
            .u32(0x804, 0x3ff)
            .bytes(0x808, b"en")
            .u8(0x80b, 0x80)
            .u32(0x80c, 0x10);
        write_pgcit(&mut image, 0x810, &[0x20, 0x120], 0x3ef);
        write_pgc(&mut image, 0x830, 0, 0);
        write_pgc(&mut image, 0x930, 1, 1);

        let mut ifo = image.reader(ParseOptions::strict());
        let table = MenuLanguageUnitTable::read(&mut ifo, 1).unwrap();
        let unit = table.language(LanguageCode(u16::from_be_bytes(*b"en"))).unwrap();
        assert_eq!(unit.pgcit.pgci_srp.len(), 2);
        assert_eq!(unit.pgcit.pgci_srp[1].menu_type(), Some(MenuType::Root));
        assert_eq!(unit.menu(MenuType::Root).unwrap().nr_of_cells, 1);
        assert_eq!(unit.menu(MenuType::Title).unwrap().nr_of_cells, 0);
        assert!(unit.menu(MenuType::Audio).is_none());
        assert_eq!(unit.pgcit.pgc(2).unwrap().nr_of_programs, 1);
        assert!(unit.pgcit.pgc(0).is_none());
    }

    #[test]
    fn pgcit_offset_past_last_byte_fails() {
        let mut image = Image::new(0x400);
        write_pgcit(&mut image, 0, &[0x18, 0x100], 0x100 + Pgc::SIZE as u32 - 2);
        write_pgc(&mut image, 0x18, 0, 0);
        write_pgc(&mut image, 0x100, 0, 0);

        let mut ifo = image.reader(ParseOptions::default());
        let err = Pgcit::read(&mut ifo, 0).unwrap_err();
        assert_eq!(err.location(), 16);
        match err.details() {
            ErrorDetails::OffsetOutOfRange {
                table,
                offset,
                limit,
            } => {
                assert_eq!(*table, TableId::Pgcit);
                assert_eq!(*offset, 0x100);
                assert_eq!(*limit, 0x100 + Pgc::SIZE as u64 - 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
