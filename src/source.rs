//! Byte sources the IFO reader pulls tables from.

use log::debug;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Seekable byte source backing one IFO file.
///
/// Every table read is a seek to an absolute byte offset followed by an exact read. Anything that
/// implements [`Read`] and [`Seek`] is a `BlockSource`.
pub trait BlockSource {
    /// Moves to `offset` bytes from the start of the file.
    fn seek(&mut self, offset: u64) -> io::Result<()>;
    /// Fills `buf` completely or fails.
    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()>;
}

impl<T: Read + Seek> BlockSource for T {
    fn seek(&mut self, offset: u64) -> io::Result<()> {
        let position = Seek::seek(self, SeekFrom::Start(offset))?;
        if position == offset {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("seek to {:#x} landed at {:#x}", offset, position),
            ))
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        Read::read_exact(self, buf)
    }
}

/// Which copy of an information file to open.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum InfoFileKind {
    /// `VIDEO_TS.IFO` / `VTS_nn_0.IFO`
    Ifo,
    /// `VIDEO_TS.BUP` / `VTS_nn_0.BUP`
    Backup,
}

impl InfoFileKind {
    /// File name of the information file for `title` (0 is the video manager).
    pub fn file_name(&self, title: u32) -> String {
        let ext = match self {
            InfoFileKind::Ifo => "IFO",
            InfoFileKind::Backup => "BUP",
        };
        if title == 0 {
            format!("VIDEO_TS.{}", ext)
        } else {
            format!("VTS_{:02}_0.{}", title, ext)
        }
    }
}

/// Opens the information files of one disc by title index.
///
/// Closures of the form `FnMut(u32, InfoFileKind) -> io::Result<S>` are providers too.
pub trait InfoFileProvider {
    type File: BlockSource;

    fn open_info_file(&mut self, title: u32, kind: InfoFileKind) -> io::Result<Self::File>;
}

impl<F, S> InfoFileProvider for F
where
    F: FnMut(u32, InfoFileKind) -> io::Result<S>,
    S: BlockSource,
{
    type File = S;

    fn open_info_file(&mut self, title: u32, kind: InfoFileKind) -> io::Result<S> {
        self(title, kind)
    }
}

/// A mounted disc or a copied `VIDEO_TS` directory.
#[derive(Debug, Clone)]
pub struct VideoTsDir {
    dir: PathBuf,
}

impl VideoTsDir {
    /// Accepts either the `VIDEO_TS` directory itself or the disc root that contains it.
    pub fn new<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let is_video_ts = path
            .file_name()
            .map(|n| n.to_string_lossy().eq_ignore_ascii_case("VIDEO_TS"))
            .unwrap_or(false);
        let dir = if is_video_ts {
            path.to_path_buf()
        } else {
            find_entry(path, "VIDEO_TS")?
        };
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", dir.display()),
            ));
        }
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

/// Finds `name` inside `dir`, ignoring case (discs are commonly mounted lower-cased).
fn find_entry(dir: &Path, name: &str) -> io::Result<PathBuf> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().eq_ignore_ascii_case(name) {
            return Ok(entry.path());
        }
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} not found in {}", name, dir.display()),
    ))
}

impl InfoFileProvider for VideoTsDir {
    type File = BufReader<File>;

    fn open_info_file(&mut self, title: u32, kind: InfoFileKind) -> io::Result<Self::File> {
        let path = find_entry(&self.dir, &kind.file_name(title))?;
        debug!("Opening {}", path.display());
        Ok(BufReader::new(File::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn info_file_names() {
        assert_eq!(InfoFileKind::Ifo.file_name(0), "VIDEO_TS.IFO");
        assert_eq!(InfoFileKind::Backup.file_name(0), "VIDEO_TS.BUP");
        assert_eq!(InfoFileKind::Ifo.file_name(7), "VTS_07_0.IFO");
        assert_eq!(InfoFileKind::Backup.file_name(42), "VTS_42_0.BUP");
    }

    #[test]
    fn cursor_is_a_block_source() {
        fn read_at<S: BlockSource>(source: &mut S, offset: u64) -> io::Result<[u8; 2]> {
            let mut buf = [0_u8; 2];
            source.seek(offset)?;
            source.read_exact(&mut buf)?;
            Ok(buf)
        }

        let mut cursor = Cursor::new(vec![1_u8, 2, 3, 4]);
        assert_eq!(read_at(&mut cursor, 2).unwrap(), [3, 4]);
        assert!(read_at(&mut cursor, 3).is_err());
    }

    #[test]
    fn directory_lookup_ignores_case() {
        let root = std::env::temp_dir().join(format!("dvdread-io-src-{}", std::process::id()));
        let video_ts = root.join("video_ts");
        fs::create_dir_all(&video_ts).unwrap();
        fs::write(video_ts.join("vts_01_0.bup"), [0xaa_u8; 4]).unwrap();

        let mut disc = VideoTsDir::new(&root).unwrap();
        assert!(disc.open_info_file(1, InfoFileKind::Ifo).is_err());
        let mut file = disc.open_info_file(1, InfoFileKind::Backup).unwrap();
        let mut buf = [0_u8; 4];
        BlockSource::read_exact(&mut file, &mut buf).unwrap();
        assert_eq!(buf, [0xaa; 4]);

        fs::remove_dir_all(&root).unwrap();
    }
}
