//! Cell address tables and VOBU address maps.
//!
//! Neither table's stored element count is trusted: the number of entries is always derived
//! from `last_byte`.

use super::IfoReader;
use crate::{check_value, check_zero, BlockSource, Result, SliceReader, TableId, DVD_BLOCK_LEN};
use log::debug;

/// Sector range of one cell inside a VOB.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CellAddress {
    pub vob_id: u16,
    pub cell_id: u8,
    pub zero_1: u8,
    pub start_sector: u32,
    pub last_sector: u32,
}

impl CellAddress {
    pub const SIZE: usize = 12;
}

/// Cell address table (`C_ADT`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellAddressTable {
    /// Number of VOBs, clamped to the number of entries actually present.
    pub nr_of_vobs: u16,
    pub zero_1: u16,
    pub last_byte: u32,
    pub cell_adr_table: Vec<CellAddress>,
}

impl CellAddressTable {
    pub const HEADER_SIZE: usize = 8;

    pub(crate) fn read<S: BlockSource>(ifo: &mut IfoReader<S>, sector: u32) -> Result<Self> {
        let offset = sector as u64 * DVD_BLOCK_LEN;
        let header = ifo.read_at(offset, Self::HEADER_SIZE)?;
        let mut reader = SliceReader::at(&header, offset);
        let mut nr_of_vobs = reader.read_be_u16()?;
        let zero_1 = reader.read_be_u16()?;
        let last_byte = reader.read_be_u32()?;

        let v = &mut ifo.validator;
        let info_length = (last_byte as usize + 1).saturating_sub(Self::HEADER_SIZE);
        check_zero!(v, TableId::CellAddress, offset, zero_1);
        check_value!(
            v,
            TableId::CellAddress,
            offset,
            last_byte as usize + 1 >= Self::HEADER_SIZE
        );
        check_value!(v, TableId::CellAddress, offset, info_length % CellAddress::SIZE == 0);
        let nr_of_entries = info_length / CellAddress::SIZE;
        if nr_of_entries < nr_of_vobs as usize {
            let tolerate = v.quirks().oversized_vob_count;
            v.check_quirk(
                TableId::CellAddress,
                offset,
                false,
                tolerate,
                &format!("nr_of_vobs ({}) <= entries ({})", nr_of_vobs, nr_of_entries),
            )?;
            nr_of_vobs = nr_of_entries as u16;
        }

        let entries_offset = offset + Self::HEADER_SIZE as u64;
        let data = ifo.read_at(entries_offset, nr_of_entries * CellAddress::SIZE)?;
        let mut reader = SliceReader::at(&data, entries_offset);
        let mut cell_adr_table = Vec::with_capacity(nr_of_entries);
        for _ in 0..nr_of_entries {
            let location = reader.location();
            let vob_id = reader.read_be_u16()?;
            let cell_id = reader.read_u8()?;
            let zero_1 = reader.read_u8()?;
            let start_sector = reader.read_be_u32()?;
            let last_sector = reader.read_be_u32()?;
            let v = &mut ifo.validator;
            check_zero!(v, TableId::CellAddress, location, zero_1);
            check_value!(v, TableId::CellAddress, location, vob_id > 0);
            check_value!(v, TableId::CellAddress, location, vob_id <= nr_of_vobs);
            check_value!(v, TableId::CellAddress, location, cell_id > 0);
            check_value!(v, TableId::CellAddress, location, start_sector < last_sector);
            cell_adr_table.push(CellAddress {
                vob_id,
                cell_id,
                zero_1,
                start_sector,
                last_sector,
            });
        }
        debug!("Read C_ADT at {:#x} with {} cells", offset, cell_adr_table.len());

        Ok(Self {
            nr_of_vobs,
            zero_1,
            last_byte,
            cell_adr_table,
        })
    }

    pub fn cell(&self, vob_id: u16, cell_id: u8) -> Option<&CellAddress> {
        self.cell_adr_table
            .iter()
            .find(|c| c.vob_id == vob_id && c.cell_id == cell_id)
    }
}

/// VOBU address map (`VOBU_ADMAP`): the start sector of every VOBU, in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VobuAddressMap {
    pub last_byte: u32,
    pub vobu_start_sectors: Vec<u32>,
}

impl VobuAddressMap {
    pub const HEADER_SIZE: usize = 4;

    pub(crate) fn read<S: BlockSource>(ifo: &mut IfoReader<S>, sector: u32) -> Result<Self> {
        let offset = sector as u64 * DVD_BLOCK_LEN;
        let header = ifo.read_at(offset, Self::HEADER_SIZE)?;
        let last_byte = SliceReader::at(&header, offset).read_be_u32()?;
        let info_length = (last_byte as usize + 1).saturating_sub(Self::HEADER_SIZE);
        check_value!(ifo.validator, TableId::VobuAddressMap, offset, info_length % 4 == 0);

        let entries_offset = offset + Self::HEADER_SIZE as u64;
        let count = info_length / 4;
        let data = ifo.read_at(entries_offset, count * 4)?;
        let mut reader = SliceReader::at(&data, entries_offset);
        let vobu_start_sectors = (0..count)
            .map(|_| reader.read_be_u32())
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            last_byte,
            vobu_start_sectors,
        })
    }

    /// Index of the VOBU containing `sector`.
    pub fn vobu_containing(&self, sector: u32) -> Option<usize> {
        let after = self.vobu_start_sectors.partition_point(|s| *s <= sector);
        after.checked_sub(1)
    }
}
