use dvdread_io::{
    decode_dsi, decode_nav_pack, decode_nav_pack_with, decode_pci, Dsi, ErrorDetails,
    ParseOptions, Pci, TableId, Validator, DVD_BLOCK_LEN,
};

/// Builds a navigation pack carrying the given PCI and DSI payloads.
fn nav_pack(pci: &[u8], dsi: &[u8]) -> Vec<u8> {
    let mut buf = vec![0_u8; DVD_BLOCK_LEN as usize];
    buf[..4].copy_from_slice(&[0, 0, 1, 0xba]);
    buf[0x0e..0x12].copy_from_slice(&[0, 0, 1, 0xbb]);
    for &(offset, payload, substream) in [(0x26, pci, 0_u8), (0x400, dsi, 1)].iter() {
        buf[offset..offset + 4].copy_from_slice(&[0, 0, 1, 0xbf]);
        buf[offset + 4..offset + 6].copy_from_slice(&(payload.len() as u16 + 1).to_be_bytes());
        buf[offset + 6] = substream;
        buf[offset + 7..offset + 7 + payload.len()].copy_from_slice(payload);
    }
    buf
}

fn payloads(lbn: u32) -> (Vec<u8>, Vec<u8>) {
    let mut pci = vec![0_u8; Pci::SIZE];
    pci[..4].copy_from_slice(&lbn.to_be_bytes());
    let mut dsi = vec![0_u8; Dsi::SIZE];
    dsi[4..8].copy_from_slice(&lbn.to_be_bytes());
    (pci, dsi)
}

#[test]
fn pci_without_highlight_has_no_buttons() {
    let (pci, _) = payloads(0x2000);
    let pci = decode_pci(&pci).unwrap();
    assert_eq!(pci.pci_gi.nv_pck_lbn, 0x2000);
    assert_eq!(pci.hli.hl_gi.btngr_ns, 0);
    assert_eq!(pci.hli.hl_gi.btn_ns, 0);
    assert!(!pci.has_highlight());
    assert!((0..3).all(|group| pci.buttons(group).is_empty()));
}

#[test]
fn dsi_locates_neighbouring_vobus() {
    let (_, mut dsi) = payloads(0x2000);
    // Next VOBU 0x30 sectors ahead, previous one past the start of the cell.
    let sri = 32 + 148 + 54;
    dsi[sri + 80..sri + 84].copy_from_slice(&0x8000_0030_u32.to_be_bytes());
    dsi[sri + 84..sri + 88].copy_from_slice(&0x3fff_ffff_u32.to_be_bytes());
    let dsi = decode_dsi(&dsi).unwrap();
    assert_eq!(dsi.dsi_gi.nv_pck_lbn, 0x2000);
    assert_eq!(dsi.next_vobu(), Some(0x30));
    assert_eq!(dsi.prev_vobu(), None);
}

#[test]
fn splits_navigation_pack() {
    let (pci, dsi) = payloads(0x2000);
    let pack = nav_pack(&pci, &dsi);
    let mut v = Validator::new(ParseOptions::strict());
    let (pci, dsi) = decode_nav_pack_with(&pack, &mut v).unwrap();
    assert_eq!(pci.pci_gi.nv_pck_lbn, dsi.dsi_gi.nv_pck_lbn);
    assert!(v.violations().is_empty());
}

#[test]
fn strict_mode_rejects_reserved_bits() {
    let (pci, mut dsi) = payloads(0x2000);
    dsi[26] = 0x01;
    let pack = nav_pack(&pci, &dsi);
    let mut v = Validator::new(ParseOptions::strict());
    let err = decode_nav_pack_with(&pack, &mut v).unwrap_err();
    match err.details() {
        ErrorDetails::InvariantViolation { table, .. } => assert_eq!(*table, TableId::Dsi),
        other => panic!("unexpected error {:?}", other),
    }
    // The default options only record the failed check.
    assert!(decode_nav_pack(&pack).is_ok());
}

#[test]
fn decoding_is_deterministic() {
    let (mut pci, dsi) = payloads(0x2000);
    pci[60..64].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
    let pack = nav_pack(&pci, &dsi);
    let first = decode_nav_pack(&pack).unwrap();
    let second = decode_nav_pack(&pack).unwrap();
    assert_eq!(first, second);
    assert_eq!(decode_pci(&pci).unwrap(), first.0);
}
