use dvdread_io::{
    ErrorDetails, IfoHandle, InfoFileKind, ParseOptions, TableId, DVD_BLOCK_LEN,
};
use std::io::{self, Cursor};

const SECTOR: usize = DVD_BLOCK_LEN as usize;

struct Image(Vec<u8>);

impl Image {
    fn new(sectors: usize) -> Self {
        Self(vec![0; sectors * SECTOR])
    }

    fn bytes(&mut self, at: usize, value: &[u8]) -> &mut Self {
        self.0[at..at + value.len()].copy_from_slice(value);
        self
    }

    fn u8(&mut self, at: usize, value: u8) -> &mut Self {
        self.bytes(at, &[value])
    }

    fn u16(&mut self, at: usize, value: u16) -> &mut Self {
        self.bytes(at, &value.to_be_bytes())
    }

    fn u32(&mut self, at: usize, value: u32) -> &mut Self {
        self.bytes(at, &value.to_be_bytes())
    }
}

/// Video manager with one title in one title set and no first play chain.
fn video_manager() -> Image {
    let mut image = Image::new(3);
    image
        .bytes(0, b"DVDVIDEO-VMG")
        .u32(12, 100)
        .u32(28, 10)
        .u16(38, 1)
        .u16(40, 1)
        .u8(42, 1)
        .u16(62, 1)
        .bytes(64, b"DVDREAD-IO TESTS")
        .u32(128, 1023)
        .u32(196, 1)
        .u32(208, 2);
    // TT_SRPT
    image
        .u16(SECTOR, 1)
        .u32(SECTOR + 4, 8 + 12 - 1)
        .u8(SECTOR + 9, 1)
        .u16(SECTOR + 10, 12)
        .u8(SECTOR + 14, 1)
        .u8(SECTOR + 15, 1)
        .u32(SECTOR + 16, 200);
    // VTS_ATRT with one full-size record.
    let atrt = 2 * SECTOR;
    image
        .u16(atrt, 1)
        .u32(atrt + 4, 8 + 4 + 542 - 1)
        .u32(atrt + 8, 12)
        .u32(atrt + 12, 541);
    image
}

/// Title set with one title of one chapter, one empty chain and one cell.
fn title_set() -> Image {
    let mut image = Image::new(5);
    image
        .bytes(0, b"DVDVIDEO-VTS")
        .u32(12, 100)
        .u32(28, 10)
        .u32(128, 1023)
        .u32(200, 1)
        .u32(204, 2)
        .u32(224, 3)
        .u32(228, 4);
    // VTS_PTT_SRPT
    image
        .u16(SECTOR, 1)
        .u32(SECTOR + 4, 8 + 4 + 4 - 1)
        .u32(SECTOR + 8, 12)
        .u16(SECTOR + 12, 1)
        .u16(SECTOR + 14, 1);
    // VTS_PGCIT pointing at an empty chain.
    let pgcit = 2 * SECTOR;
    image
        .u16(pgcit, 1)
        .u32(pgcit + 4, 16 + 236 - 1)
        .u8(pgcit + 8, 0x81)
        .u32(pgcit + 12, 16);
    // VTS_C_ADT
    let c_adt = 3 * SECTOR;
    image
        .u16(c_adt, 1)
        .u32(c_adt + 4, 8 + 12 - 1)
        .u16(c_adt + 8, 1)
        .u8(c_adt + 10, 1)
        .u32(c_adt + 16, 99);
    // VTS_VOBU_ADMAP
    image.u32(4 * SECTOR, 4 + 2 * 4 - 1).u32(4 * SECTOR + 8, 50);
    image
}

fn provider(image: Image) -> impl FnMut(u32, InfoFileKind) -> io::Result<Cursor<Vec<u8>>> {
    move |_, _| Ok(Cursor::new(image.0.clone()))
}

#[test]
fn opens_video_manager_without_first_play_chain() {
    let mut disc = provider(video_manager());
    let ifo = IfoHandle::open_with_options(&mut disc, 0, ParseOptions::strict()).unwrap();
    let vmg = ifo.header.vmg().unwrap();
    assert_eq!(vmg.vmg_nr_of_title_sets, 1);
    assert_eq!(vmg.provider(), "DVDREAD-IO TESTS");
    assert!(ifo.first_play_pgc.is_none());
    let title = ifo.title_search_table.as_ref().unwrap().title(1).unwrap();
    assert_eq!(title.nr_of_ptts, 12);
    assert_eq!(title.title_set_sector, 200);
    assert_eq!(ifo.vts_attributes.as_ref().unwrap().vts.len(), 1);
    assert!(ifo.violations().is_empty());
}

#[test]
fn unknown_identifier_opens_nothing() {
    let mut image = video_manager();
    image.bytes(0, b"DVDVIDEO-XXX");
    let mut disc = provider(image);
    let err = IfoHandle::open(&mut disc, 0).unwrap_err();
    assert_eq!(err.location(), 0);
    assert!(matches!(err.details(), ErrorDetails::BadIdentifier(id) if id == b"DVDVIDEO-XXX"));
}

#[test]
fn chain_outside_pgcit_fails_the_open() {
    let mut image = title_set();
    let pgcit = 2 * SECTOR;
    // A second chain starting past the end of the table.
    image
        .u16(pgcit, 2)
        .u32(pgcit + 4, 24 + 236 - 1)
        .u32(pgcit + 12, 24)
        .u8(pgcit + 16, 0x82)
        .u32(pgcit + 20, 0x400);
    let mut disc = provider(image);
    let err = IfoHandle::open(&mut disc, 1).unwrap_err();
    assert_eq!(err.location(), pgcit as u64 + 16);
    match err.details() {
        ErrorDetails::OffsetOutOfRange { table, offset, .. } => {
            assert_eq!(*table, TableId::Pgcit);
            assert_eq!(*offset, 0x400);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn oversized_vob_count_uses_entries_present() {
    let mut image = title_set();
    let c_adt = 3 * SECTOR;
    image.u16(c_adt, 4).u32(c_adt + 20, 0xffff_ffff);
    let mut disc = provider(image);
    let ifo = IfoHandle::open(&mut disc, 1).unwrap();
    let cells = ifo.title_cell_addresses.as_ref().unwrap();
    assert_eq!(cells.nr_of_vobs, 1);
    assert_eq!(cells.cell_adr_table.len(), 1);
    assert_eq!(cells.cell(1, 1).unwrap().last_sector, 99);
    let violations = ifo.violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].table, TableId::CellAddress);
    assert!(violations[0].tolerated);
}

#[test]
fn opens_title_set() {
    let mut disc = provider(title_set());
    let ifo = IfoHandle::open_with_options(&mut disc, 1, ParseOptions::strict()).unwrap();
    assert!(ifo.header.vts().is_some());
    assert_eq!(ifo.title_count(), 1);
    let ptt = ifo.ptt_search_table.as_ref().unwrap().ptt(1, 1).unwrap();
    assert_eq!((ptt.pgcn, ptt.pgn), (1, 1));
    assert_eq!(ifo.pgc(1).unwrap().nr_of_cells, 0);
    assert_eq!(
        ifo.title_vobu_address_map.as_ref().unwrap().vobu_start_sectors,
        vec![0, 50]
    );
    let source = ifo.close();
    assert_eq!(source.get_ref().len(), 5 * SECTOR);
}

#[test]
fn falls_back_to_backup_file() {
    let image = video_manager();
    let mut opened = Vec::new();
    let mut disc = |title: u32, kind: InfoFileKind| {
        opened.push((title, kind));
        match kind {
            InfoFileKind::Ifo => Err(io::Error::new(io::ErrorKind::Other, "bad sector")),
            InfoFileKind::Backup => Ok(Cursor::new(image.0.clone())),
        }
    };
    let ifo = IfoHandle::open(&mut disc, 0).unwrap();
    assert!(ifo.title_search_table.is_some());
    assert_eq!(opened, vec![(0, InfoFileKind::Ifo), (0, InfoFileKind::Backup)]);
}

#[test]
fn header_only_openers() {
    let mut disc = provider(video_manager());
    let mut vmg = IfoHandle::open_vmg(&mut disc).unwrap();
    assert!(vmg.title_search_table.is_none());
    assert_eq!(vmg.read_title_search_table().unwrap().titles.len(), 1);

    let mut disc = provider(title_set());
    let mut vts = IfoHandle::open_vts(&mut disc, 3).unwrap();
    assert!(vts.pgcit.is_none());
    assert_eq!(vts.read_pgcit().unwrap().pgci_srp.len(), 1);
    let err = vts.read_vts_attributes().unwrap_err();
    assert!(matches!(
        err.details(),
        ErrorDetails::MissingTable(TableId::VtsAttributes)
    ));

    let mut disc = provider(video_manager());
    assert!(IfoHandle::open_vts(&mut disc, 1).is_err());
}

#[test]
fn title_numbers_are_bounded() {
    let mut disc = provider(title_set());
    let err = IfoHandle::open(&mut disc, 100).unwrap_err();
    assert!(matches!(err.details(), ErrorDetails::InvalidTitle(100)));
    let err = IfoHandle::open_vts(&mut disc, 0).unwrap_err();
    assert!(matches!(err.details(), ErrorDetails::InvalidTitle(0)));
}
