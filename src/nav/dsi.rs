use crate::ifo::attributes::DvdTime;
use crate::validation::Validator;
use crate::{check_zero, BitReader, Result, TableId};
use std::fmt::{Debug, Formatter};

/// General information of a DSI packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsiGeneral {
    pub nv_pck_scr: u32,
    /// Logical block number of this navigation pack.
    pub nv_pck_lbn: u32,
    /// Last sector of the VOBU, relative to this pack.
    pub vobu_ea: u32,
    pub vobu_1stref_ea: u32,
    pub vobu_2ndref_ea: u32,
    pub vobu_3rdref_ea: u32,
    pub vobu_vob_idn: u16,
    pub zero1: u8,
    pub vobu_c_idn: u8,
    /// Elapsed time within the cell.
    pub c_eltm: DvdTime,
}

/// Audio gap of one audio stream at a seamless join.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct AudioGap {
    pub stp_ptm1: u32,
    pub stp_ptm2: u32,
    pub gap_len1: u32,
    pub gap_len2: u32,
}

/// Seamless playback information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeamlessPlayback {
    pub category: u16,
    /// End of the interleaved unit, relative to this pack.
    pub ilvu_ea: u32,
    /// Start of the next interleaved unit, relative to this pack.
    pub ilvu_sa: u32,
    pub size: u16,
    pub vob_v_s_s_ptm: u32,
    pub vob_v_e_e_ptm: u32,
    pub vob_a: [AudioGap; 8],
}

/// Destination of a seamless angle change.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SeamlessAngle {
    pub address: u32,
    pub size: u16,
}

/// Relative address of another VOBU, as stored in the search information.
///
/// The low 30 bits are a sector offset, bit 31 flags a VOBU that contains video.
#[derive(Default, Copy, Clone, PartialEq, Eq)]
pub struct SeekOffset(pub u32);

impl SeekOffset {
    /// Marks a search destination outside the current cell.
    pub const END_OF_CELL: u32 = 0x3fff_ffff;

    pub fn is_end_of_cell(&self) -> bool {
        self.0 == Self::END_OF_CELL
    }

    /// Sector distance to the destination, `None` past the end of the cell.
    pub fn sectors(&self) -> Option<u32> {
        if self.is_end_of_cell() {
            None
        } else {
            Some(self.0 & 0x3fff_ffff)
        }
    }

    pub fn has_video(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }
}

impl Debug for SeekOffset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.sectors() {
            Some(sectors) => write!(f, "{:#x}", sectors),
            None => f.write_str("END_OF_CELL"),
        }
    }
}

/// Search intervals of [`VobuSearch::fwda`], in half seconds. `bwda` holds the same
/// intervals in reverse order.
pub const SEARCH_INTERVALS: [u16; 19] = [240, 120, 60, 20, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1];

/// VOBU search information: relative addresses of VOBUs around this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VobuSearch {
    pub next_video: SeekOffset,
    pub fwda: [SeekOffset; 19],
    pub next_vobu: SeekOffset,
    pub prev_vobu: SeekOffset,
    pub bwda: [SeekOffset; 19],
    pub prev_video: SeekOffset,
}

impl VobuSearch {
    /// VOBU `half_seconds` ahead, if that is one of the [`SEARCH_INTERVALS`].
    pub fn forward(&self, half_seconds: u16) -> Option<SeekOffset> {
        let index = SEARCH_INTERVALS.iter().position(|i| *i == half_seconds)?;
        Some(self.fwda[index])
    }

    /// VOBU `half_seconds` back, if that is one of the [`SEARCH_INTERVALS`].
    pub fn backward(&self, half_seconds: u16) -> Option<SeekOffset> {
        let index = SEARCH_INTERVALS.iter().position(|i| *i == half_seconds)?;
        Some(self.bwda[self.bwda.len() - 1 - index])
    }
}

/// Synchronous information: offsets of the audio and subpicture packs belonging to this VOBU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synchronization {
    pub a_synca: [u16; 8],
    pub sp_synca: [u32; 32],
}

/// Data search information: the second half of a navigation pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsi {
    pub dsi_gi: DsiGeneral,
    pub sml_pbi: SeamlessPlayback,
    pub sml_agli: [SeamlessAngle; 9],
    pub vobu_sri: VobuSearch,
    pub synci: Synchronization,
    pub zero1: [u8; 471],
}

impl Dsi {
    /// Length of the DSI payload, without the sub-stream id.
    pub const SIZE: usize = 1017;

    /// Decodes a DSI payload, recording failed checks in `v`.
    pub fn decode(buf: &[u8], v: &mut Validator) -> Result<Self> {
        super::check_len(buf, Self::SIZE, TableId::Dsi)?;
        Self::read(&mut BitReader::new(buf), v)
    }

    pub(crate) fn read(r: &mut BitReader, v: &mut Validator) -> Result<Self> {
        let dsi_gi = DsiGeneral {
            nv_pck_scr: r.take_u32(),
            nv_pck_lbn: r.take_u32(),
            vobu_ea: r.take_u32(),
            vobu_1stref_ea: r.take_u32(),
            vobu_2ndref_ea: r.take_u32(),
            vobu_3rdref_ea: r.take_u32(),
            vobu_vob_idn: r.take_u16(),
            zero1: r.take_u8(),
            vobu_c_idn: r.take_u8(),
            c_eltm: DvdTime {
                hour: r.take_u8(),
                minute: r.take_u8(),
                second: r.take_u8(),
                frame_u: r.take_u8(),
            },
        };
        check_zero!(v, TableId::Dsi, 0, dsi_gi.zero1);

        let category = r.take_u16();
        let ilvu_ea = r.take_u32();
        let ilvu_sa = r.take_u32();
        let size = r.take_u16();
        let vob_v_s_s_ptm = r.take_u32();
        let vob_v_e_e_ptm = r.take_u32();
        let mut vob_a = [AudioGap::default(); 8];
        for gap in vob_a.iter_mut() {
            *gap = AudioGap {
                stp_ptm1: r.take_u32(),
                stp_ptm2: r.take_u32(),
                gap_len1: r.take_u32(),
                gap_len2: r.take_u32(),
            };
        }
        let sml_pbi = SeamlessPlayback {
            category,
            ilvu_ea,
            ilvu_sa,
            size,
            vob_v_s_s_ptm,
            vob_v_e_e_ptm,
            vob_a,
        };

        let mut sml_agli = [SeamlessAngle::default(); 9];
        for angle in sml_agli.iter_mut() {
            *angle = SeamlessAngle {
                address: r.take_u32(),
                size: r.take_u16(),
            };
        }

        let mut take_offsets = |offsets: &mut [SeekOffset]| {
            for offset in offsets.iter_mut() {
                *offset = SeekOffset(r.take_u32());
            }
        };
        let mut next_video = [SeekOffset::default(); 1];
        let mut fwda = [SeekOffset::default(); 19];
        let mut next_prev = [SeekOffset::default(); 2];
        let mut bwda = [SeekOffset::default(); 19];
        let mut prev_video = [SeekOffset::default(); 1];
        take_offsets(&mut next_video);
        take_offsets(&mut fwda);
        take_offsets(&mut next_prev);
        take_offsets(&mut bwda);
        take_offsets(&mut prev_video);
        let vobu_sri = VobuSearch {
            next_video: next_video[0],
            fwda,
            next_vobu: next_prev[0],
            prev_vobu: next_prev[1],
            bwda,
            prev_video: prev_video[0],
        };

        let mut a_synca = [0_u16; 8];
        for a in a_synca.iter_mut() {
            *a = r.take_u16();
        }
        let mut sp_synca = [0_u32; 32];
        for sp in sp_synca.iter_mut() {
            *sp = r.take_u32();
        }
        let synci = Synchronization { a_synca, sp_synca };
        let zero1 = r.take_array();

        Ok(Self {
            dsi_gi,
            sml_pbi,
            sml_agli,
            vobu_sri,
            synci,
            zero1,
        })
    }

    /// Next VOBU of the cell, as a sector offset from this pack.
    pub fn next_vobu(&self) -> Option<u32> {
        self.vobu_sri.next_vobu.sectors()
    }

    /// Previous VOBU of the cell, as a sector offset back from this pack.
    pub fn prev_vobu(&self) -> Option<u32> {
        self.vobu_sri.prev_vobu.sectors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode_dsi, ParseOptions};

    const SRI: usize = 32 + 148 + 54;

    fn put_u32(buf: &mut [u8], at: usize, value: u32) {
        buf[at..at + 4].copy_from_slice(&value.to_be_bytes());
    }

    #[test]
    fn decodes_general_information() {
        let mut buf = vec![0_u8; Dsi::SIZE];
        put_u32(&mut buf, 4, 0x0004_0000);
        put_u32(&mut buf, 8, 0x1f);
        buf[24..26].copy_from_slice(&7_u16.to_be_bytes());
        buf[27] = 3;
        let dsi = decode_dsi(&buf).unwrap();
        assert_eq!(dsi.dsi_gi.nv_pck_lbn, 0x40000);
        assert_eq!(dsi.dsi_gi.vobu_ea, 0x1f);
        assert_eq!(dsi.dsi_gi.vobu_vob_idn, 7);
        assert_eq!(dsi.dsi_gi.vobu_c_idn, 3);
    }

    #[test]
    fn consumes_whole_payload() {
        let buf = vec![0xff_u8; Dsi::SIZE];
        let mut v = Validator::default();
        let mut r = BitReader::new(&buf);
        let dsi = Dsi::read(&mut r, &mut v).unwrap();
        assert_eq!(r.bits_consumed(), Dsi::SIZE * 8);
        assert_eq!(dsi.synci.sp_synca[31], 0xffff_ffff);
        assert_eq!(v.violations().len(), 1);
        assert_eq!(v.violations()[0].check, "dsi_gi.zero1 = 0xff");
    }

    #[test]
    fn decodes_seek_offsets() {
        let mut buf = vec![0_u8; Dsi::SIZE];
        // fwda[0]: two minutes ahead.
        put_u32(&mut buf, SRI + 4, 0x8000_1000);
        put_u32(&mut buf, SRI + 80, 0x8000_0010);
        put_u32(&mut buf, SRI + 84, SeekOffset::END_OF_CELL);
        // bwda[18]: two minutes back.
        put_u32(&mut buf, SRI + 88 + 18 * 4, 0x0000_2000);

        let mut v = Validator::new(ParseOptions::strict());
        let dsi = Dsi::decode(&buf, &mut v).unwrap();
        assert_eq!(dsi.next_vobu(), Some(0x10));
        assert!(dsi.vobu_sri.next_vobu.has_video());
        assert_eq!(dsi.prev_vobu(), None);
        assert!(dsi.vobu_sri.prev_vobu.is_end_of_cell());
        assert_eq!(dsi.vobu_sri.forward(240).and_then(|o| o.sectors()), Some(0x1000));
        assert_eq!(dsi.vobu_sri.backward(240).and_then(|o| o.sectors()), Some(0x2000));
        assert_eq!(dsi.vobu_sri.backward(1).and_then(|o| o.sectors()), Some(0));
        assert!(dsi.vobu_sri.forward(16).is_none());
    }
}
