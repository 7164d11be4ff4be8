//! Video title set tables.

use super::attributes::{MenuStreamAttributes, MultichannelExtension, TitleStreamAttributes};
use super::IfoReader;
use crate::validation::Validator;
use crate::{
    check_value, check_zero, BlockSource, Error, ErrorDetails, Result, SliceReader, TableId,
    DVD_BLOCK_LEN,
};
use log::debug;

/// Video title set information header (`VTSI_MAT`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VtsiMat {
    pub vts_identifier: [u8; 12],
    pub vts_last_sector: u32,
    pub zero_1: [u8; 12],
    pub vtsi_last_sector: u32,
    pub zero_2: u8,
    pub specification_version: u8,
    pub vts_category: u32,
    pub zero_3: u16,
    pub zero_4: u16,
    pub zero_5: u8,
    pub zero_6: [u8; 19],
    pub zero_7: u16,
    pub zero_8: [u8; 32],
    pub zero_9: u64,
    pub zero_10: [u8; 24],
    pub vtsi_last_byte: u32,
    pub zero_11: u32,
    pub zero_12: [u8; 56],
    pub vtsm_vobs: u32,
    pub vtstt_vobs: u32,
    pub vts_ptt_srpt: u32,
    pub vts_pgcit: u32,
    pub vtsm_pgci_ut: u32,
    pub vts_tmapt: u32,
    pub vtsm_c_adt: u32,
    pub vtsm_vobu_admap: u32,
    pub vts_c_adt: u32,
    pub vts_vobu_admap: u32,
    pub zero_13: [u8; 24],
    pub vtsm_streams: MenuStreamAttributes,
    pub zero_14: [u8; 2],
    pub vts_streams: TitleStreamAttributes,
    pub zero_15: u16,
    pub vts_mu_audio_attr: [MultichannelExtension; 8],
}

impl VtsiMat {
    pub const SIZE: usize = 984;
    pub const IDENTIFIER: [u8; 12] = *b"DVDVIDEO-VTS";

    pub(crate) fn parse(reader: &mut SliceReader, v: &mut Validator) -> Result<Self> {
        let location = reader.location();
        let vts_identifier: [u8; 12] = reader.read_array()?;
        if vts_identifier != Self::IDENTIFIER {
            return Err(Error::new(location, ErrorDetails::BadIdentifier(vts_identifier)));
        }
        let vts_last_sector = reader.read_be_u32()?;
        let zero_1: [u8; 12] = reader.read_array()?;
        let vtsi_last_sector = reader.read_be_u32()?;
        let zero_2 = reader.read_u8()?;
        let specification_version = reader.read_u8()?;
        let vts_category = reader.read_be_u32()?;
        let zero_3 = reader.read_be_u16()?;
        let zero_4 = reader.read_be_u16()?;
        let zero_5 = reader.read_u8()?;
        let zero_6: [u8; 19] = reader.read_array()?;
        let zero_7 = reader.read_be_u16()?;
        let zero_8: [u8; 32] = reader.read_array()?;
        let zero_9 = reader.read_be_u64()?;
        let zero_10: [u8; 24] = reader.read_array()?;
        let vtsi_last_byte = reader.read_be_u32()?;
        let zero_11 = reader.read_be_u32()?;
        let zero_12: [u8; 56] = reader.read_array()?;
        let vtsm_vobs = reader.read_be_u32()?;
        let vtstt_vobs = reader.read_be_u32()?;
        let vts_ptt_srpt = reader.read_be_u32()?;
        let vts_pgcit = reader.read_be_u32()?;
        let vtsm_pgci_ut = reader.read_be_u32()?;
        let vts_tmapt = reader.read_be_u32()?;
        let vtsm_c_adt = reader.read_be_u32()?;
        let vtsm_vobu_admap = reader.read_be_u32()?;
        let vts_c_adt = reader.read_be_u32()?;
        let vts_vobu_admap = reader.read_be_u32()?;
        let zero_13: [u8; 24] = reader.read_array()?;
        let vtsm_streams = MenuStreamAttributes::parse(reader, v, TableId::VtsiMat)?;
        let zero_14: [u8; 2] = reader.read_array()?;
        let vts_streams = TitleStreamAttributes::parse(reader, v, TableId::VtsiMat, 32)?;
        let zero_15 = reader.read_be_u16()?;
        let mut vts_mu_audio_attr = [MultichannelExtension::default(); 8];
        for attr in vts_mu_audio_attr.iter_mut() {
            *attr = MultichannelExtension::parse(reader)?;
        }

        let t = TableId::VtsiMat;
        check_zero!(v, t, location, zero_1);
        check_zero!(v, t, location, zero_2);
        check_zero!(v, t, location, zero_3);
        check_zero!(v, t, location, zero_4);
        check_zero!(v, t, location, zero_5);
        check_zero!(v, t, location, zero_6);
        check_zero!(v, t, location, zero_7);
        check_zero!(v, t, location, zero_8);
        check_zero!(v, t, location, zero_9);
        check_zero!(v, t, location, zero_10);
        check_zero!(v, t, location, zero_11);
        check_zero!(v, t, location, zero_12);
        check_zero!(v, t, location, zero_13);
        check_zero!(v, t, location, zero_14);
        check_zero!(v, t, location, zero_15);
        check_value!(v, t, location, vtsi_last_sector as u64 * 2 <= vts_last_sector as u64);
        check_value!(
            v,
            t,
            location,
            vtsi_last_byte as u64 / DVD_BLOCK_LEN <= vtsi_last_sector as u64
        );
        check_value!(
            v,
            t,
            location,
            vtsm_vobs == 0 || (vtsm_vobs > vtsi_last_sector && vtsm_vobs < vts_last_sector)
        );
        check_value!(
            v,
            t,
            location,
            vtstt_vobs == 0 || (vtstt_vobs > vtsi_last_sector && vtstt_vobs < vts_last_sector)
        );
        check_value!(v, t, location, vts_ptt_srpt <= vtsi_last_sector);
        check_value!(v, t, location, vts_pgcit <= vtsi_last_sector);
        check_value!(v, t, location, vtsm_pgci_ut <= vtsi_last_sector);
        check_value!(v, t, location, vts_tmapt <= vtsi_last_sector);
        check_value!(v, t, location, vtsm_c_adt <= vtsi_last_sector);
        check_value!(v, t, location, vtsm_vobu_admap <= vtsi_last_sector);
        check_value!(v, t, location, vts_c_adt <= vtsi_last_sector);
        check_value!(v, t, location, vts_vobu_admap <= vtsi_last_sector);
        for (i, attr) in vts_mu_audio_attr.iter().enumerate() {
            v.check_zero(
                t,
                location,
                &attr.reserved_bits(),
                &format!("vts_mu_audio_attr[{}] reserved bits", i),
            )?;
            v.check_zero(
                t,
                location,
                &attr.zero6,
                &format!("vts_mu_audio_attr[{}].zero6", i),
            )?;
        }

        Ok(Self {
            vts_identifier,
            vts_last_sector,
            zero_1,
            vtsi_last_sector,
            zero_2,
            specification_version,
            vts_category,
            zero_3,
            zero_4,
            zero_5,
            zero_6,
            zero_7,
            zero_8,
            zero_9,
            zero_10,
            vtsi_last_byte,
            zero_11,
            zero_12,
            vtsm_vobs,
            vtstt_vobs,
            vts_ptt_srpt,
            vts_pgcit,
            vtsm_pgci_ut,
            vts_tmapt,
            vtsm_c_adt,
            vtsm_vobu_admap,
            vts_c_adt,
            vts_vobu_admap,
            zero_13,
            vtsm_streams,
            zero_14,
            vts_streams,
            zero_15,
            vts_mu_audio_attr,
        })
    }
}

/// Chapter entry point: a program of a program chain.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PartOfTitle {
    pub pgcn: u16,
    pub pgn: u16,
}

/// Part-of-title search pointer table (`VTS_PTT_SRPT`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PttSearchTable {
    pub nr_of_srpts: u16,
    pub zero_1: u16,
    pub last_byte: u32,
    /// Start of each title's parts, relative to the start of the table.
    pub ttu_offset: Vec<u32>,
    /// Parts of each title of the set.
    pub titles: Vec<Vec<PartOfTitle>>,
}

impl PttSearchTable {
    pub const HEADER_SIZE: usize = 8;

    pub(crate) fn read<S: BlockSource>(ifo: &mut IfoReader<S>, sector: u32) -> Result<Self> {
        let offset = sector as u64 * DVD_BLOCK_LEN;
        let header = ifo.read_at(offset, Self::HEADER_SIZE)?;
        let mut reader = SliceReader::at(&header, offset);
        let nr_of_srpts = reader.read_be_u16()?;
        let zero_1 = reader.read_be_u16()?;
        let last_byte = reader.read_be_u32()?;

        let t = TableId::PttSearch;
        let table_len = last_byte as u64 + 1;
        let info_length = table_len.saturating_sub(Self::HEADER_SIZE as u64) as usize;
        let v = &mut ifo.validator;
        check_zero!(v, t, offset, zero_1);
        check_value!(v, t, offset, nr_of_srpts != 0);
        check_value!(v, t, offset, nr_of_srpts < 100);
        check_value!(v, t, offset, nr_of_srpts as usize * 4 <= info_length);

        let data_offset = offset + Self::HEADER_SIZE as u64;
        let data = ifo.read_at(data_offset, info_length)?;
        let mut reader = SliceReader::at(&data, data_offset);
        let count = (nr_of_srpts as usize).min(info_length / 4);
        let ttu_offset = (0..count)
            .map(|_| reader.read_be_u32())
            .collect::<Result<Vec<_>>>()?;

        let mut titles = Vec::with_capacity(count);
        for (i, start) in ttu_offset.iter().copied().enumerate() {
            let start = start as u64;
            let location = data_offset + i as u64 * 4;
            let v = &mut ifo.validator;
            check_value!(v, t, location, start + 4 <= table_len + 4);
            let tolerate = v.quirks().zero_ptt_titles;
            v.check_quirk(
                t,
                location,
                start + 4 <= table_len,
                tolerate,
                "ttu_offset + 4 <= last_byte + 1",
            )?;

            let end = ttu_offset
                .get(i + 1)
                .map_or(table_len, |next| *next as u64);
            let n = end.saturating_sub(start);
            check_value!(v, t, location, n % 4 == 0);

            // Parts are only taken from inside the bytes that were read.
            let first = start.saturating_sub(Self::HEADER_SIZE as u64) as usize;
            let available = data.len().saturating_sub(first) / 4;
            let nr_of_ptts = ((n / 4) as usize).min(available);
            let mut parts = SliceReader::at(data.get(first..).unwrap_or(&[]), offset + start);
            let mut ptt = Vec::with_capacity(nr_of_ptts);
            for _ in 0..nr_of_ptts {
                let location = parts.location();
                let pgcn = parts.read_be_u16()?;
                let pgn = parts.read_be_u16()?;
                let v = &mut ifo.validator;
                check_value!(v, t, location, pgcn != 0);
                check_value!(v, t, location, pgcn < 1000);
                check_value!(v, t, location, pgn != 0);
                check_value!(v, t, location, pgn < 100);
                ptt.push(PartOfTitle { pgcn, pgn });
            }
            check_value!(ifo.validator, t, location, ptt.len() < 1000);
            titles.push(ptt);
        }

        Ok(Self {
            nr_of_srpts,
            zero_1,
            last_byte,
            ttu_offset,
            titles,
        })
    }

    /// Part `part` of title `title`, both 1-based.
    pub fn ptt(&self, title: u16, part: u16) -> Option<&PartOfTitle> {
        let title = self.titles.get((title as usize).checked_sub(1)?)?;
        title.get((part as usize).checked_sub(1)?)
    }
}

/// One time map entry.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct TimeMapEntry(pub u32);

impl TimeMapEntry {
    /// VOBU sector relative to the start of the title VOBs.
    pub fn sector(&self) -> u32 {
        self.0 & 0x7fff_ffff
    }

    pub fn discontinuity(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }
}

impl std::fmt::Debug for TimeMapEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.sector())?;
        if self.discontinuity() {
            write!(f, "*")?;
        }
        Ok(())
    }
}

/// Time map of one program chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeMap {
    /// Time unit in seconds; entry `i` is the VOBU playing at `(i + 1) * tmu` seconds.
    pub tmu: u8,
    pub zero_1: u8,
    pub nr_of_entries: u16,
    pub map_ent: Vec<TimeMapEntry>,
}

impl TimeMap {
    pub const HEADER_SIZE: usize = 4;

    /// Entry covering `seconds` into the chain; `None` before the first time unit.
    pub fn entry_at(&self, seconds: u32) -> Option<TimeMapEntry> {
        if self.tmu == 0 {
            return None;
        }
        let index = (seconds / self.tmu as u32).checked_sub(1)?;
        self.map_ent.get(index as usize).copied()
    }
}

/// Time map table (`VTS_TMAPT`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeMapTable {
    pub nr_of_tmaps: u16,
    pub zero_1: u16,
    pub last_byte: u32,
    /// Start of each map, relative to the start of the table.
    pub tmap_offset: Vec<u32>,
    pub tmap: Vec<TimeMap>,
}

impl TimeMapTable {
    pub const HEADER_SIZE: usize = 8;

    pub(crate) fn read<S: BlockSource>(ifo: &mut IfoReader<S>, sector: u32) -> Result<Self> {
        let offset = sector as u64 * DVD_BLOCK_LEN;
        let header = ifo.read_at(offset, Self::HEADER_SIZE)?;
        let mut reader = SliceReader::at(&header, offset);
        let nr_of_tmaps = reader.read_be_u16()?;
        let zero_1 = reader.read_be_u16()?;
        let last_byte = reader.read_be_u32()?;
        let t = TableId::TimeMap;
        check_zero!(ifo.validator, t, offset, zero_1);

        let offsets_offset = offset + Self::HEADER_SIZE as u64;
        let data = ifo.read_at(offsets_offset, nr_of_tmaps as usize * 4)?;
        let mut reader = SliceReader::at(&data, offsets_offset);
        let tmap_offset = (0..nr_of_tmaps)
            .map(|_| reader.read_be_u32())
            .collect::<Result<Vec<_>>>()?;

        let mut tmap = Vec::with_capacity(tmap_offset.len());
        for start in tmap_offset.iter().copied() {
            let map_offset = offset + start as u64;
            check_value!(
                ifo.validator,
                t,
                map_offset,
                start as u64 + TimeMap::HEADER_SIZE as u64 <= last_byte as u64 + 1
            );
            let header = ifo.read_at(map_offset, TimeMap::HEADER_SIZE)?;
            let mut reader = SliceReader::at(&header, map_offset);
            let tmu = reader.read_u8()?;
            let zero_1 = reader.read_u8()?;
            let nr_of_entries = reader.read_be_u16()?;
            check_zero!(ifo.validator, t, map_offset, zero_1);

            let entries_offset = map_offset + TimeMap::HEADER_SIZE as u64;
            let entries = ifo.read_at(entries_offset, nr_of_entries as usize * 4)?;
            let mut reader = SliceReader::at(&entries, entries_offset);
            let map_ent = (0..nr_of_entries)
                .map(|_| reader.read_be_u32().map(TimeMapEntry))
                .collect::<Result<Vec<_>>>()?;
            tmap.push(TimeMap {
                tmu,
                zero_1,
                nr_of_entries,
                map_ent,
            });
        }
        debug!("Read VTS_TMAPT with {} maps", tmap.len());

        Ok(Self {
            nr_of_tmaps,
            zero_1,
            last_byte,
            tmap_offset,
            tmap,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ifo::fixture::{write_vtsi, Image};
    use crate::ParseOptions;

    #[test]
    fn parses_vtsi_header() {
        let mut image = Image::new(VtsiMat::SIZE);
        write_vtsi(&mut image);
        image.u8(515, 2).u8(516, 0x80).u8(516 + 8, 0x80);
        let mut v = Validator::new(ParseOptions::strict());
        let mat = VtsiMat::parse(&mut SliceReader::new(&image.0), &mut v).unwrap();
        assert_eq!(mat.vts_ptt_srpt, 1);
        assert_eq!(mat.vts_streams.audio_streams().len(), 2);
        assert!(mat.vts_mu_audio_attr.iter().all(|m| m.reserved_bits() == 0));
        assert!(v.violations().is_empty());
    }

    #[test]
    fn multichannel_reserved_bits_are_checked() {
        let mut image = Image::new(VtsiMat::SIZE);
        write_vtsi(&mut image);
        image.u8(792 + 24 + 2, 0x10);
        let mut v = Validator::default();
        VtsiMat::parse(&mut SliceReader::new(&image.0), &mut v).unwrap();
        assert_eq!(v.violations().len(), 1);
        assert!(v.violations()[0]
            .check
            .starts_with("vts_mu_audio_attr[1] reserved bits"));
    }

    #[test]
    fn wrong_identifier_is_rejected() {
        let mut image = Image::new(VtsiMat::SIZE);
        write_vtsi(&mut image);
        image.bytes(0, b"DVDVIDEO-VMG");
        let mut v = Validator::default();
        let err = VtsiMat::parse(&mut SliceReader::new(&image.0), &mut v).unwrap_err();
        assert!(matches!(err.details(), ErrorDetails::BadIdentifier(id) if id == b"DVDVIDEO-VMG"));
    }

    fn write_ptt_table(image: &mut Image, at: usize, offsets: &[u32], last_byte: u32) {
        image.u16(at, offsets.len() as u16).u32(at + 4, last_byte);
        for (i, offset) in offsets.iter().enumerate() {
            image.u32(at + 8 + i * 4, *offset);
        }
    }

    #[test]
    fn reads_ptt_search_table() {
        let mut image = Image::new(0x1000);
        // Two titles: three parts, then one.
        write_ptt_table(&mut image, 0x800, &[16, 28], 31);
        for (i, (pgcn, pgn)) in [(1, 1), (1, 2), (1, 3), (2, 1)].iter().enumerate() {
            image.u16(0x810 + i * 4, *pgcn).u16(0x812 + i * 4, *pgn);
        }
        let mut ifo = image.reader(ParseOptions::strict());
        let table = PttSearchTable::read(&mut ifo, 1).unwrap();
        assert_eq!(table.titles.len(), 2);
        assert_eq!(table.titles[0].len(), 3);
        assert_eq!(table.ptt(1, 3), Some(&PartOfTitle { pgcn: 1, pgn: 3 }));
        assert_eq!(table.ptt(2, 1), Some(&PartOfTitle { pgcn: 2, pgn: 1 }));
        assert_eq!(table.ptt(2, 2), None);
    }

    #[test]
    fn title_pointing_past_the_table_has_no_parts() {
        let mut image = Image::new(0x1000);
        write_ptt_table(&mut image, 0x800, &[16, 20], 19);
        image.u16(0x810, 1).u16(0x812, 1).u32(0x814, 0xdead_beef);

        let mut ifo = image.reader(ParseOptions::strict());
        let table = PttSearchTable::read(&mut ifo, 1).unwrap();
        assert_eq!(table.titles[0].len(), 1);
        assert!(table.titles[1].is_empty());
        let violations = ifo.validator.violations();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].tolerated);

        let mut options = ParseOptions::strict();
        options.quirks.zero_ptt_titles = false;
        let mut ifo = image.reader(options);
        assert!(PttSearchTable::read(&mut ifo, 1).is_err());
    }

    #[test]
    fn reads_time_maps() {
        let mut image = Image::new(0x1000);
        image
            .u16(0x800, 1)
            .u32(0x804, 12 + 4 + 3 * 4 - 1)
            .u32(0x808, 12)
            .u8(0x80c, 10)
            .u16(0x80e, 3)
            .u32(0x810, 0x20)
            .u32(0x814, 0x8000_0040)
            .u32(0x818, 0x60);
        let mut ifo = image.reader(ParseOptions::strict());
        let table = TimeMapTable::read(&mut ifo, 1).unwrap();
        let map = &table.tmap[0];
        assert_eq!(map.tmu, 10);
        assert_eq!(map.map_ent.len(), 3);
        assert!(map.map_ent[1].discontinuity());
        assert_eq!(map.map_ent[1].sector(), 0x40);
        assert_eq!(map.entry_at(5), None);
        assert_eq!(map.entry_at(25).map(|e| e.sector()), Some(0x40));
        assert_eq!(map.entry_at(40), None);
    }
}
