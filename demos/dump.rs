use dvdread_io::{decode_nav_pack, IfoHandle, VideoTsDir, DVD_BLOCK_LEN};
use pretty_env_logger;
use std::env;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

fn dump_vob(path: &Path) {
    let mut file = BufReader::new(File::open(path).expect("unable to open!"));
    let mut pack = [0_u8; DVD_BLOCK_LEN as usize];
    let mut sector = 0_u32;
    while file.read_exact(&mut pack).is_ok() {
        // Navigation packs carry a system header right after the pack header.
        if pack[0x0e..0x12] == [0, 0, 1, 0xbb] {
            match decode_nav_pack(&pack) {
                Ok((pci, dsi)) => println!("{:#x}: {:x?}\n{:x?}", sector, pci.pci_gi, dsi.dsi_gi),
                Err(err) => println!("{:#x}: {}", sector, err),
            }
        }
        sector += 1;
    }
}

fn main() {
    pretty_env_logger::init();
    let args = env::args();
    if args.len() < 2 {
        panic!("No VIDEO_TS directory or VOB file argument");
    }
    let path = args.skip(1).next().unwrap();
    let path = Path::new(&path);
    if path.is_file() {
        dump_vob(path);
        return;
    }

    let mut disc = VideoTsDir::new(path).expect("unable to open VIDEO_TS!");
    let vmg = IfoHandle::open(&mut disc, 0).expect("Parse Error!");
    println!("{:#?}", vmg);
    let title_sets = vmg.header.vmg().map_or(0, |mat| mat.vmg_nr_of_title_sets);
    for title in 1..=u32::from(title_sets) {
        match IfoHandle::open(&mut disc, title) {
            Ok(vts) => println!("{:#?}", vts),
            Err(err) => println!("VTS {}: {}", title, err),
        }
    }
}
