//! Video manager tables.

use super::attributes::{LanguageCode, MenuStreamAttributes, TitleStreamAttributes};
use super::IfoReader;
use crate::validation::Validator;
use crate::{
    check_value, check_zero, read_bitfield, BlockSource, Error, ErrorDetails, Result,
    SliceReader, TableId, DVD_BLOCK_LEN,
};
use log::debug;
use modular_bitfield_msb::prelude::*;

/// Video manager information header (`VMGI_MAT`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmgiMat {
    pub vmg_identifier: [u8; 12],
    pub vmg_last_sector: u32,
    pub zero_1: [u8; 12],
    pub vmgi_last_sector: u32,
    pub zero_2: u8,
    pub specification_version: u8,
    pub vmg_category: u32,
    pub vmg_nr_of_volumes: u16,
    pub vmg_this_volume_nr: u16,
    pub disc_side: u8,
    pub zero_3: [u8; 19],
    pub vmg_nr_of_title_sets: u16,
    pub provider_identifier: [u8; 32],
    pub vmg_pos_code: u64,
    pub zero_4: [u8; 24],
    pub vmgi_last_byte: u32,
    /// Byte offset of the first play chain, 0 when absent.
    pub first_play_pgc: u32,
    pub zero_5: [u8; 56],
    pub vmgm_vobs: u32,
    pub tt_srpt: u32,
    pub vmgm_pgci_ut: u32,
    pub ptl_mait: u32,
    pub vts_atrt: u32,
    pub txtdt_mgi: u32,
    pub vmgm_c_adt: u32,
    pub vmgm_vobu_admap: u32,
    pub zero_6: [u8; 32],
    pub vmgm_streams: MenuStreamAttributes,
}

impl VmgiMat {
    pub const SIZE: usize = 510;
    pub const IDENTIFIER: [u8; 12] = *b"DVDVIDEO-VMG";

    pub(crate) fn parse(reader: &mut SliceReader, v: &mut Validator) -> Result<Self> {
        let location = reader.location();
        let vmg_identifier: [u8; 12] = reader.read_array()?;
        if vmg_identifier != Self::IDENTIFIER {
            return Err(Error::new(location, ErrorDetails::BadIdentifier(vmg_identifier)));
        }
        let vmg_last_sector = reader.read_be_u32()?;
        let zero_1: [u8; 12] = reader.read_array()?;
        let vmgi_last_sector = reader.read_be_u32()?;
        let zero_2 = reader.read_u8()?;
        let specification_version = reader.read_u8()?;
        let vmg_category = reader.read_be_u32()?;
        let vmg_nr_of_volumes = reader.read_be_u16()?;
        let vmg_this_volume_nr = reader.read_be_u16()?;
        let disc_side = reader.read_u8()?;
        let zero_3: [u8; 19] = reader.read_array()?;
        let vmg_nr_of_title_sets = reader.read_be_u16()?;
        let provider_identifier: [u8; 32] = reader.read_array()?;
        let vmg_pos_code = reader.read_be_u64()?;
        let zero_4: [u8; 24] = reader.read_array()?;
        let vmgi_last_byte = reader.read_be_u32()?;
        let first_play_pgc = reader.read_be_u32()?;
        let zero_5: [u8; 56] = reader.read_array()?;
        let vmgm_vobs = reader.read_be_u32()?;
        let tt_srpt = reader.read_be_u32()?;
        let vmgm_pgci_ut = reader.read_be_u32()?;
        let ptl_mait = reader.read_be_u32()?;
        let vts_atrt = reader.read_be_u32()?;
        let txtdt_mgi = reader.read_be_u32()?;
        let vmgm_c_adt = reader.read_be_u32()?;
        let vmgm_vobu_admap = reader.read_be_u32()?;
        let zero_6: [u8; 32] = reader.read_array()?;
        let vmgm_streams = MenuStreamAttributes::parse(reader, v, TableId::VmgiMat)?;

        let t = TableId::VmgiMat;
        check_zero!(v, t, location, zero_1);
        check_zero!(v, t, location, zero_2);
        check_zero!(v, t, location, zero_3);
        check_zero!(v, t, location, zero_4);
        check_zero!(v, t, location, zero_5);
        check_zero!(v, t, location, zero_6);
        check_value!(v, t, location, vmg_last_sector != 0);
        check_value!(v, t, location, vmgi_last_sector != 0);
        check_value!(v, t, location, vmgi_last_sector as u64 * 2 <= vmg_last_sector as u64);
        check_value!(v, t, location, vmg_nr_of_volumes != 0);
        check_value!(v, t, location, vmg_this_volume_nr != 0);
        check_value!(v, t, location, vmg_this_volume_nr <= vmg_nr_of_volumes);
        check_value!(v, t, location, disc_side == 1 || disc_side == 2);
        check_value!(v, t, location, vmg_nr_of_title_sets != 0);
        check_value!(v, t, location, vmgi_last_byte >= 341);
        check_value!(
            v,
            t,
            location,
            vmgi_last_byte as u64 / DVD_BLOCK_LEN <= vmgi_last_sector as u64
        );
        check_value!(v, t, location, first_play_pgc < vmgi_last_byte);
        check_value!(
            v,
            t,
            location,
            vmgm_vobs == 0 || (vmgm_vobs > vmgi_last_sector && vmgm_vobs < vmg_last_sector)
        );
        check_value!(v, t, location, tt_srpt <= vmgi_last_sector);
        check_value!(v, t, location, vmgm_pgci_ut <= vmgi_last_sector);
        check_value!(v, t, location, ptl_mait <= vmgi_last_sector);
        check_value!(v, t, location, vts_atrt <= vmgi_last_sector);
        check_value!(v, t, location, txtdt_mgi <= vmgi_last_sector);
        check_value!(v, t, location, vmgm_c_adt <= vmgi_last_sector);
        check_value!(v, t, location, vmgm_vobu_admap <= vmgi_last_sector);

        Ok(Self {
            vmg_identifier,
            vmg_last_sector,
            zero_1,
            vmgi_last_sector,
            zero_2,
            specification_version,
            vmg_category,
            vmg_nr_of_volumes,
            vmg_this_volume_nr,
            disc_side,
            zero_3,
            vmg_nr_of_title_sets,
            provider_identifier,
            vmg_pos_code,
            zero_4,
            vmgi_last_byte,
            first_play_pgc,
            zero_5,
            vmgm_vobs,
            tt_srpt,
            vmgm_pgci_ut,
            ptl_mait,
            vts_atrt,
            txtdt_mgi,
            vmgm_c_adt,
            vmgm_vobu_admap,
            zero_6,
            vmgm_streams,
        })
    }

    /// Provider identifier with trailing padding removed.
    pub fn provider(&self) -> String {
        let end = self
            .provider_identifier
            .iter()
            .rposition(|b| *b != 0 && *b != b' ')
            .map_or(0, |i| i + 1);
        String::from_utf8_lossy(&self.provider_identifier[..end]).into_owned()
    }
}

/// Playback type of a title.
#[bitfield]
#[derive(Copy, Clone, PartialEq, Eq)]
#[derive(Debug)]
pub struct PlaybackType {
    pub zero_1: bool,
    /// Clear for a title made of one sequential chain.
    pub multi_or_random_pgc_title: bool,
    pub jlc_exists_in_cell_cmd: bool,
    pub jlc_exists_in_prepost_cmd: bool,
    pub jlc_exists_in_button_cmd: bool,
    pub jlc_exists_in_tt_dom: bool,
    pub chapter_search_or_play: bool,
    pub title_or_time_play: bool,
}

/// One entry of the title search table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleInfo {
    pub pb_ty: PlaybackType,
    pub nr_of_angles: u8,
    pub nr_of_ptts: u16,
    pub parental_id: u16,
    pub title_set_nr: u8,
    pub vts_ttn: u8,
    pub title_set_sector: u32,
}

impl TitleInfo {
    pub const SIZE: usize = 12;

    fn parse(reader: &mut SliceReader, v: &mut Validator) -> Result<Self> {
        let location = reader.location();
        let pb_ty = read_bitfield!(reader, PlaybackType);
        let nr_of_angles = reader.read_u8()?;
        let nr_of_ptts = reader.read_be_u16()?;
        let parental_id = reader.read_be_u16()?;
        let title_set_nr = reader.read_u8()?;
        let vts_ttn = reader.read_u8()?;
        let title_set_sector = reader.read_be_u32()?;

        let t = TableId::TitleSearch;
        let zero_1 = pb_ty.zero_1();
        check_value!(v, t, location, !zero_1);
        check_value!(v, t, location, nr_of_angles != 0);
        check_value!(v, t, location, nr_of_angles < 10);
        check_value!(v, t, location, nr_of_ptts < 1000);
        check_value!(v, t, location, title_set_nr != 0);
        check_value!(v, t, location, title_set_nr < 100);
        check_value!(v, t, location, vts_ttn != 0);
        check_value!(v, t, location, vts_ttn < 100);

        Ok(Self {
            pb_ty,
            nr_of_angles,
            nr_of_ptts,
            parental_id,
            title_set_nr,
            vts_ttn,
            title_set_sector,
        })
    }
}

/// Title search pointer table (`TT_SRPT`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleSearchTable {
    pub nr_of_srpts: u16,
    pub zero_1: u16,
    pub last_byte: u32,
    pub titles: Vec<TitleInfo>,
}

impl TitleSearchTable {
    pub const HEADER_SIZE: usize = 8;

    pub(crate) fn read<S: BlockSource>(ifo: &mut IfoReader<S>, sector: u32) -> Result<Self> {
        let offset = sector as u64 * DVD_BLOCK_LEN;
        let header = ifo.read_at(offset, Self::HEADER_SIZE)?;
        let mut reader = SliceReader::at(&header, offset);
        let nr_of_srpts = reader.read_be_u16()?;
        let zero_1 = reader.read_be_u16()?;
        let last_byte = reader.read_be_u32()?;

        let info_length = (last_byte as usize + 1).saturating_sub(Self::HEADER_SIZE);
        let v = &mut ifo.validator;
        let t = TableId::TitleSearch;
        check_zero!(v, t, offset, zero_1);
        check_value!(v, t, offset, nr_of_srpts != 0);
        check_value!(v, t, offset, nr_of_srpts < 100);
        check_value!(v, t, offset, nr_of_srpts as usize * TitleInfo::SIZE <= info_length);
        let count = (nr_of_srpts as usize).min(info_length / TitleInfo::SIZE);

        let titles_offset = offset + Self::HEADER_SIZE as u64;
        let data = ifo.read_at(titles_offset, count * TitleInfo::SIZE)?;
        let mut reader = SliceReader::at(&data, titles_offset);
        let titles = (0..count)
            .map(|_| TitleInfo::parse(&mut reader, &mut ifo.validator))
            .collect::<Result<Vec<_>>>()?;
        debug!("Read TT_SRPT with {} titles", titles.len());

        Ok(Self {
            nr_of_srpts,
            zero_1,
            last_byte,
            titles,
        })
    }

    /// Title with the 1-based title number `n`.
    pub fn title(&self, n: u16) -> Option<&TitleInfo> {
        self.titles.get((n as usize).checked_sub(1)?)
    }
}

/// Parental masks of one country, indexed `[vts][level]`.
///
/// Index 0 of the first dimension covers the video manager itself. Level 0 is the least
/// restrictive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentalCountry {
    /// Two ASCII characters.
    pub country_code: u16,
    pub zero_1: u16,
    pub pf_ptl_mai_start_byte: u16,
    pub zero_2: u16,
    pub pf_ptl_mai: Vec<[u16; 8]>,
}

/// Parental management information table (`PTL_MAIT`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentalManagementTable {
    pub nr_of_countries: u16,
    pub nr_of_vtss: u16,
    pub last_byte: u32,
    pub countries: Vec<ParentalCountry>,
}

impl ParentalManagementTable {
    pub const HEADER_SIZE: usize = 8;
    pub const COUNTRY_SIZE: usize = 8;

    pub(crate) fn read<S: BlockSource>(ifo: &mut IfoReader<S>, sector: u32) -> Result<Self> {
        let offset = sector as u64 * DVD_BLOCK_LEN;
        let header = ifo.read_at(offset, Self::HEADER_SIZE)?;
        let mut reader = SliceReader::at(&header, offset);
        let nr_of_countries = reader.read_be_u16()?;
        let nr_of_vtss = reader.read_be_u16()?;
        let last_byte = reader.read_be_u32()?;

        let v = &mut ifo.validator;
        let t = TableId::ParentalManagement;
        check_value!(v, t, offset, nr_of_countries != 0);
        check_value!(v, t, offset, nr_of_countries < 100);
        check_value!(v, t, offset, nr_of_vtss != 0);
        check_value!(v, t, offset, nr_of_vtss < 100);
        check_value!(
            v,
            t,
            offset,
            nr_of_countries as u64 * Self::COUNTRY_SIZE as u64 + Self::HEADER_SIZE as u64
                <= last_byte as u64 + 1
        );

        let countries_offset = offset + Self::HEADER_SIZE as u64;
        let data = ifo.read_at(countries_offset, nr_of_countries as usize * Self::COUNTRY_SIZE)?;
        let mut reader = SliceReader::at(&data, countries_offset);
        let matrix_len = (nr_of_vtss as usize + 1) * 8;
        let mut countries = Vec::with_capacity(nr_of_countries as usize);
        for _ in 0..nr_of_countries {
            let location = reader.location();
            let country_code = reader.read_be_u16()?;
            let zero_1 = reader.read_be_u16()?;
            let pf_ptl_mai_start_byte = reader.read_be_u16()?;
            let zero_2 = reader.read_be_u16()?;
            let v = &mut ifo.validator;
            check_zero!(v, t, location, zero_1);
            check_zero!(v, t, location, zero_2);
            check_value!(
                v,
                t,
                location,
                pf_ptl_mai_start_byte as u64 + matrix_len as u64 * 2 <= last_byte as u64 + 1
            );

            let matrix_offset = offset + pf_ptl_mai_start_byte as u64;
            let matrix = ifo.read_at(matrix_offset, matrix_len * 2)?;
            let mut matrix_reader = SliceReader::at(&matrix, matrix_offset);
            let raw = (0..matrix_len)
                .map(|_| matrix_reader.read_be_u16())
                .collect::<Result<Vec<_>>>()?;
            // Stored level-major from the most restrictive level down.
            let vtss = nr_of_vtss as usize + 1;
            let pf_ptl_mai = (0..vtss)
                .map(|vts| {
                    let mut levels = [0_u16; 8];
                    for (level, mask) in levels.iter_mut().enumerate() {
                        *mask = raw[(7 - level) * vtss + vts];
                    }
                    levels
                })
                .collect();

            countries.push(ParentalCountry {
                country_code,
                zero_1,
                pf_ptl_mai_start_byte,
                zero_2,
                pf_ptl_mai,
            });
        }

        Ok(Self {
            nr_of_countries,
            nr_of_vtss,
            last_byte,
            countries,
        })
    }

    pub fn country(&self, code: [u8; 2]) -> Option<&ParentalCountry> {
        let code = u16::from_be_bytes(code);
        self.countries.iter().find(|c| c.country_code == code)
    }
}

/// Attributes of one title set, as summarised in the video manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VtsAttributes {
    pub last_byte: u32,
    pub vts_cat: u32,
    pub vtsm_streams: MenuStreamAttributes,
    pub zero_1: [u8; 2],
    pub vtstt_streams: TitleStreamAttributes,
}

impl VtsAttributes {
    pub const SIZE: usize = 542;
    /// Size of a record whose title block holds a single subpicture stream.
    pub const MIN_SIZE: usize = 356;

    fn parse(reader: &mut SliceReader, v: &mut Validator) -> Result<Self> {
        let location = reader.location();
        let t = TableId::VtsAttributes;
        let last_byte = reader.read_be_u32()?;
        let vts_cat = reader.read_be_u32()?;
        let vtsm_streams = MenuStreamAttributes::parse(reader, v, t)?;
        let zero_1: [u8; 2] = reader.read_array()?;
        check_zero!(v, t, location, zero_1);
        check_value!(v, t, location, last_byte as usize + 1 >= Self::MIN_SIZE);
        let coded_subp = ((last_byte as usize + 1).saturating_sub(Self::MIN_SIZE) / 6).min(32);
        let vtstt_streams = TitleStreamAttributes::parse(reader, v, t, coded_subp)?;
        Ok(Self {
            last_byte,
            vts_cat,
            vtsm_streams,
            zero_1,
            vtstt_streams,
        })
    }
}

/// Title set attribute table (`VTS_ATRT`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VtsAttributeTable {
    pub nr_of_vtss: u16,
    pub zero_1: u16,
    pub last_byte: u32,
    pub vts_atrt_offsets: Vec<u32>,
    pub vts: Vec<VtsAttributes>,
}

impl VtsAttributeTable {
    pub const HEADER_SIZE: usize = 8;

    pub(crate) fn read<S: BlockSource>(ifo: &mut IfoReader<S>, sector: u32) -> Result<Self> {
        let offset = sector as u64 * DVD_BLOCK_LEN;
        let header = ifo.read_at(offset, Self::HEADER_SIZE)?;
        let mut reader = SliceReader::at(&header, offset);
        let nr_of_vtss = reader.read_be_u16()?;
        let zero_1 = reader.read_be_u16()?;
        let last_byte = reader.read_be_u32()?;

        let v = &mut ifo.validator;
        let t = TableId::VtsAttributes;
        let table_len = last_byte as u64 + 1;
        check_zero!(v, t, offset, zero_1);
        check_value!(v, t, offset, nr_of_vtss != 0);
        check_value!(v, t, offset, nr_of_vtss < 100);
        check_value!(
            v,
            t,
            offset,
            nr_of_vtss as u64 * (4 + VtsAttributes::MIN_SIZE as u64) + (Self::HEADER_SIZE as u64)
                < table_len
        );

        let offsets_offset = offset + Self::HEADER_SIZE as u64;
        let data = ifo.read_at(offsets_offset, nr_of_vtss as usize * 4)?;
        let mut reader = SliceReader::at(&data, offsets_offset);
        let vts_atrt_offsets = (0..nr_of_vtss)
            .map(|_| reader.read_be_u32())
            .collect::<Result<Vec<_>>>()?;

        let mut vts = Vec::with_capacity(vts_atrt_offsets.len());
        for record_start in vts_atrt_offsets.iter().copied() {
            let v = &mut ifo.validator;
            check_value!(
                v,
                t,
                offset,
                record_start as u64 + (VtsAttributes::MIN_SIZE as u64) < table_len
            );
            // Short records are padded, so the fixed layout always parses.
            let available = table_len.saturating_sub(record_start as u64) as usize;
            let read_len = available.clamp(VtsAttributes::MIN_SIZE, VtsAttributes::SIZE);
            let record_offset = offset + record_start as u64;
            let mut record = ifo.read_at(record_offset, read_len)?;
            record.resize(VtsAttributes::SIZE, 0);
            let attributes =
                VtsAttributes::parse(&mut SliceReader::at(&record, record_offset), &mut ifo.validator)?;
            let record_last_byte = attributes.last_byte;
            check_value!(
                ifo.validator,
                t,
                record_offset,
                record_start as u64 + record_last_byte as u64 <= table_len
            );
            vts.push(attributes);
        }

        Ok(Self {
            nr_of_vtss,
            zero_1,
            last_byte,
            vts_atrt_offsets,
            vts,
        })
    }
}

/// One language unit of the text data manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLanguageUnit {
    pub lang_code: LanguageCode,
    pub char_set: u16,
    /// Relative to the start of the text data manager.
    pub txtdt_start_byte: u32,
}

/// Text data manager (`TXTDT_MGI`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDataManager {
    pub disc_name: [u8; 12],
    pub unknown1: u16,
    pub nr_of_language_units: u16,
    pub last_byte: u32,
    pub lus: Vec<TextLanguageUnit>,
}

impl TextDataManager {
    pub const HEADER_SIZE: usize = 20;
    pub const LU_SIZE: usize = 8;

    pub(crate) fn read<S: BlockSource>(ifo: &mut IfoReader<S>, sector: u32) -> Result<Self> {
        let offset = sector as u64 * DVD_BLOCK_LEN;
        let header = ifo.read_at(offset, Self::HEADER_SIZE)?;
        let mut reader = SliceReader::at(&header, offset);
        let disc_name: [u8; 12] = reader.read_array()?;
        let unknown1 = reader.read_be_u16()?;
        let nr_of_language_units = reader.read_be_u16()?;
        let last_byte = reader.read_be_u32()?;

        let table_len = last_byte as usize + 1;
        let available = table_len.saturating_sub(Self::HEADER_SIZE) / Self::LU_SIZE;
        check_value!(
            ifo.validator,
            TableId::TextData,
            offset,
            nr_of_language_units as usize <= available
        );
        let count = (nr_of_language_units as usize).min(available);

        let lus_offset = offset + Self::HEADER_SIZE as u64;
        let data = ifo.read_at(lus_offset, count * Self::LU_SIZE)?;
        let mut reader = SliceReader::at(&data, lus_offset);
        let mut lus = Vec::with_capacity(count);
        for _ in 0..count {
            lus.push(TextLanguageUnit {
                lang_code: LanguageCode(reader.read_be_u16()?),
                char_set: reader.read_be_u16()?,
                txtdt_start_byte: reader.read_be_u32()?,
            });
        }

        Ok(Self {
            disc_name,
            unknown1,
            nr_of_language_units,
            last_byte,
            lus,
        })
    }

    /// Disc name with trailing padding removed.
    pub fn disc_name(&self) -> String {
        let end = self
            .disc_name
            .iter()
            .rposition(|b| *b != 0 && *b != b' ')
            .map_or(0, |i| i + 1);
        String::from_utf8_lossy(&self.disc_name[..end]).into_owned()
    }
}
