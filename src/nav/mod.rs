//! Navigation packet decoding.
//!
//! Every VOBU starts with a navigation pack: a 2048-byte MPEG-2 pack carrying two private
//! stream 2 PES packets. The first holds the [`Pci`] (sub-stream 0x00), the second the [`Dsi`]
//! (sub-stream 0x01). Both payloads are bit-packed and decoded with the [`BitReader`].
//!
//! [`BitReader`]: crate::BitReader

mod dsi;
mod pci;

pub use dsi::{
    AudioGap, Dsi, DsiGeneral, SeamlessAngle, SeamlessPlayback, SeekOffset, Synchronization,
    VobuSearch, SEARCH_INTERVALS,
};
pub use pci::{Button, Highlight, HighlightGeneral, Pci, PciGeneral};

use crate::validation::Validator;
use crate::{check_value, read_bitfield, Error, ErrorDetails, Result, SliceReader, TableId};
use log::debug;
use modular_bitfield_msb::prelude::*;

/// Length of a navigation pack.
pub const NAV_PACK_LEN: usize = 2048;
const PACK_START: [u8; 4] = [0x00, 0x00, 0x01, 0xba];
const SYSTEM_HEADER_START: [u8; 4] = [0x00, 0x00, 0x01, 0xbb];
const SYSTEM_HEADER_OFFSET: usize = 0x0e;
const PRIVATE_STREAM_2: u8 = 0xbf;
const PCI_PES_OFFSET: usize = 0x26;
const DSI_PES_OFFSET: usize = 0x400;

/// Header of one private stream 2 PES packet.
#[bitfield]
#[derive(Debug)]
struct PesHeader {
    start_code: B24,
    stream_id: B8,
    packet_length: B16,
}

fn check_len(buf: &[u8], len: usize, table: TableId) -> Result<()> {
    if buf.len() < len {
        debug!("{} payload is {} bytes, expected {}", table, buf.len(), len);
        Err(Error::new(0, ErrorDetails::TableOverrun(len - buf.len())))
    } else {
        Ok(())
    }
}

/// Decodes a PCI payload (the bytes following the 0x00 sub-stream id).
///
/// Failed checks are logged; use [`Pci::decode`] to collect them or to decode strictly.
pub fn decode_pci(buf: &[u8]) -> Result<Pci> {
    Pci::decode(buf, &mut Validator::default())
}

/// Decodes a DSI payload (the bytes following the 0x01 sub-stream id).
///
/// Failed checks are logged; use [`Dsi::decode`] to collect them or to decode strictly.
pub fn decode_dsi(buf: &[u8]) -> Result<Dsi> {
    Dsi::decode(buf, &mut Validator::default())
}

/// Splits a complete navigation pack into its PCI and DSI.
pub fn decode_nav_pack(buf: &[u8]) -> Result<(Pci, Dsi)> {
    decode_nav_pack_with(buf, &mut Validator::default())
}

/// Like [`decode_nav_pack`], recording failed checks in `v`.
pub fn decode_nav_pack_with(buf: &[u8], v: &mut Validator) -> Result<(Pci, Dsi)> {
    check_len(buf, NAV_PACK_LEN, TableId::NavPack)?;
    if buf[..4] != PACK_START {
        return Err(Error::new(0, ErrorDetails::BadNavPack));
    }
    if buf[SYSTEM_HEADER_OFFSET..SYSTEM_HEADER_OFFSET + 4] != SYSTEM_HEADER_START {
        return Err(Error::new(SYSTEM_HEADER_OFFSET as u64, ErrorDetails::BadNavPack));
    }

    let pci_start = private_stream_payload(buf, PCI_PES_OFFSET, Pci::SIZE, 0x00)?;
    let dsi_start = private_stream_payload(buf, DSI_PES_OFFSET, Dsi::SIZE, 0x01)?;
    let pci = Pci::decode(&buf[pci_start..pci_start + Pci::SIZE], v)?;
    let dsi = Dsi::decode(&buf[dsi_start..dsi_start + Dsi::SIZE], v)?;

    let (pci_lbn, dsi_lbn) = (pci.pci_gi.nv_pck_lbn, dsi.dsi_gi.nv_pck_lbn);
    check_value!(v, TableId::NavPack, 0, pci_lbn == dsi_lbn);
    Ok((pci, dsi))
}

/// Checks the PES header at `offset` and returns where its payload starts.
fn private_stream_payload(buf: &[u8], offset: usize, len: usize, substream: u8) -> Result<usize> {
    let mut reader = SliceReader::at(&buf[offset..], offset as u64);
    let header = read_bitfield!(reader, PesHeader);
    let substream_id = reader.read_u8()?;
    if header.start_code() != 1
        || header.stream_id() != PRIVATE_STREAM_2
        || header.packet_length() as usize != len + 1
        || substream_id != substream
    {
        debug!("Unexpected PES header {:?} sub-stream {:#x}", header, substream_id);
        return Err(reader.make_error(ErrorDetails::BadNavPack));
    }
    Ok(offset + 7)
}
