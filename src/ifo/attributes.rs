//! Records shared by the video manager and title set tables: time codes, stream attributes and
//! user operation masks.

use crate::validation::Validator;
use crate::{check_value, check_zero, read_bitfield, Result, SliceReader, TableId};
use modular_bitfield_msb::prelude::*;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::fmt::{Debug, Display, Formatter};
use std::time::Duration;

fn bcd(v: u8) -> u8 {
    (v >> 4) * 10 + (v & 0x0f)
}

fn is_bcd(v: u8) -> bool {
    (v >> 4) < 10 && (v & 0x0f) < 10
}

/// Frame rate encoded in the two high bits of [`DvdTime::frame_u`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
pub enum FrameRate {
    /// 25 Hz
    Pal = 1,
    /// 30000/1001 Hz
    Ntsc = 3,
}

/// Playback time as BCD hours, minutes, seconds and frames.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DvdTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Two high bits are the frame rate, six low bits the BCD frame count.
    pub frame_u: u8,
}

impl DvdTime {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let [hour, minute, second, frame_u] = reader.read_array::<4>()?;
        Ok(Self {
            hour,
            minute,
            second,
            frame_u,
        })
    }

    pub fn frame_rate(&self) -> Option<FrameRate> {
        FrameRate::from_u8(self.frame_u >> 6)
    }

    pub fn frames(&self) -> u8 {
        bcd(self.frame_u & 0x3f)
    }

    /// Whether every field holds valid BCD digits.
    pub fn is_valid(&self) -> bool {
        is_bcd(self.hour) && is_bcd(self.minute) && is_bcd(self.second) && is_bcd(self.frame_u & 0x3f)
    }

    pub fn to_duration(&self) -> Duration {
        let secs = bcd(self.hour) as u64 * 3600 + bcd(self.minute) as u64 * 60 + bcd(self.second) as u64;
        let frame_ms = match self.frame_rate() {
            Some(FrameRate::Pal) => self.frames() as u64 * 40,
            Some(FrameRate::Ntsc) => self.frames() as u64 * 1001 / 30,
            None => 0,
        };
        Duration::from_secs(secs) + Duration::from_millis(frame_ms)
    }
}

/// ISO 639 language code stored as two ASCII bytes.
#[derive(Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LanguageCode(pub u16);

impl LanguageCode {
    pub fn as_bytes(&self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    /// Unset codes are stored as zero or `0xffff`.
    pub fn is_specified(&self) -> bool {
        self.0 != 0 && self.0 != 0xffff
    }
}

impl Display for LanguageCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let [a, b] = self.as_bytes();
        if a.is_ascii_graphic() && b.is_ascii_graphic() {
            write!(f, "{}{}", a as char, b as char)
        } else {
            write!(f, "{:#06x}", self.0)
        }
    }
}

impl Debug for LanguageCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "LanguageCode({})", self)
    }
}

/// Video standard of [`VideoAttributes::video_format`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
pub enum VideoStandard {
    Ntsc = 0,
    Pal = 1,
}

/// Display aspect ratio of [`VideoAttributes::display_aspect_ratio`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
pub enum AspectRatio {
    FourByThree = 0,
    SixteenByNine = 3,
}

/// Video stream attributes.
#[bitfield]
#[derive(Copy, Clone, PartialEq, Eq)]
#[derive(Debug)]
pub struct VideoAttributes {
    pub mpeg_version: B2,
    pub video_format: B2,
    pub display_aspect_ratio: B2,
    pub permitted_df: B2,
    pub line21_cc_1: bool,
    pub line21_cc_2: bool,
    pub unknown1: bool,
    pub bit_rate: bool,
    pub picture_size: B2,
    pub letterboxed: bool,
    pub film_mode: bool,
}

impl VideoAttributes {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        Ok(read_bitfield!(reader, VideoAttributes))
    }

    pub fn standard(&self) -> Option<VideoStandard> {
        VideoStandard::from_u8(self.video_format())
    }

    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        AspectRatio::from_u8(self.display_aspect_ratio())
    }
}

impl Default for VideoAttributes {
    fn default() -> Self {
        Self::new()
    }
}

/// Coding of an audio stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
pub enum AudioFormat {
    Ac3 = 0,
    Mpeg1 = 2,
    Mpeg2Ext = 3,
    Lpcm = 4,
    Dts = 6,
}

/// Audio stream attributes.
#[bitfield]
#[derive(Copy, Clone, PartialEq, Eq)]
#[derive(Debug)]
pub struct AudioAttributes {
    pub audio_format: B3,
    pub multichannel_extension: bool,
    pub lang_type: B2,
    pub application_mode: B2,
    pub quantization: B2,
    pub sample_frequency: B2,
    pub unknown1: bool,
    pub channels: B3,
    pub lang_code: B16,
    pub lang_extension: B8,
    pub code_extension: B8,
    pub unknown3: B8,
    /// Karaoke or surround details depending on `application_mode`.
    pub app_info: B8,
}

impl AudioAttributes {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        Ok(read_bitfield!(reader, AudioAttributes))
    }

    pub fn format(&self) -> Option<AudioFormat> {
        AudioFormat::from_u8(self.audio_format())
    }

    pub fn language(&self) -> LanguageCode {
        LanguageCode(self.lang_code())
    }

    /// Number of channels; the field stores the count minus one.
    pub fn channel_count(&self) -> u8 {
        self.channels() + 1
    }

    pub fn is_empty(&self) -> bool {
        self.into_bytes().iter().all(|b| *b == 0)
    }
}

impl Default for AudioAttributes {
    fn default() -> Self {
        Self::new()
    }
}

/// Subpicture stream attributes.
#[bitfield]
#[derive(Copy, Clone, PartialEq, Eq)]
#[derive(Debug)]
pub struct SubpictureAttributes {
    pub code_mode: B3,
    pub zero1: B3,
    /// 1 when `lang_code` names a language.
    pub language_type: B2,
    pub zero2: B8,
    pub lang_code: B16,
    pub lang_extension: B8,
    pub code_extension: B8,
}

impl SubpictureAttributes {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        Ok(read_bitfield!(reader, SubpictureAttributes))
    }

    pub fn language(&self) -> LanguageCode {
        LanguageCode(self.lang_code())
    }

    pub fn is_empty(&self) -> bool {
        self.into_bytes().iter().all(|b| *b == 0)
    }
}

impl Default for SubpictureAttributes {
    fn default() -> Self {
        Self::new()
    }
}

/// Guide melody / vocal flags of one multichannel (karaoke) audio stream.
#[bitfield]
#[derive(Default, Copy, Clone, PartialEq, Eq)]
#[derive(Debug)]
pub struct MultichannelFlags {
    pub zero1: B7,
    pub ach0_gme: bool,
    pub zero2: B7,
    pub ach1_gme: bool,
    pub zero3: B4,
    pub ach2_gv1e: bool,
    pub ach2_gv2e: bool,
    pub ach2_gm1e: bool,
    pub ach2_gm2e: bool,
    pub zero4: B4,
    pub ach3_gv1e: bool,
    pub ach3_gv2e: bool,
    pub ach3_gmae: bool,
    pub ach3_se2e: bool,
    pub zero5: B4,
    pub ach4_gv1e: bool,
    pub ach4_gv2e: bool,
    pub ach4_gmbe: bool,
    pub ach4_sebe: bool,
}

/// Multichannel extension record of a title set audio stream.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct MultichannelExtension {
    pub flags: MultichannelFlags,
    pub zero6: [u8; 19],
}

impl MultichannelExtension {
    pub const SIZE: usize = 24;

    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        Ok(Self {
            flags: read_bitfield!(reader, MultichannelFlags),
            zero6: reader.read_array()?,
        })
    }

    /// Reserved bits of the flag bytes.
    pub fn reserved_bits(&self) -> u32 {
        let f = &self.flags;
        (f.zero1() as u32) << 24
            | (f.zero2() as u32) << 16
            | (f.zero3() as u32) << 8
            | (f.zero4() as u32) << 4
            | f.zero5() as u32
    }
}

/// Prohibited user operations.
#[bitfield]
#[derive(Copy, Clone, PartialEq, Eq)]
#[derive(Debug)]
pub struct UserOps {
    pub zero: B7,
    pub video_pres_mode_change: bool,
    pub karaoke_audio_pres_mode_change: bool,
    pub angle_change: bool,
    pub subpic_stream_change: bool,
    pub audio_stream_change: bool,
    pub pause_on: bool,
    pub still_off: bool,
    pub button_select_or_activate: bool,
    pub resume: bool,
    pub chapter_menu_call: bool,
    pub angle_menu_call: bool,
    pub audio_menu_call: bool,
    pub subpic_menu_call: bool,
    pub root_menu_call: bool,
    pub title_menu_call: bool,
    pub backward_scan: bool,
    pub forward_scan: bool,
    pub next_pg_search: bool,
    pub prev_or_top_pg_search: bool,
    pub time_or_chapter_search: bool,
    pub go_up: bool,
    pub stop: bool,
    pub title_play: bool,
    pub chapter_search_or_play: bool,
    pub title_or_time_play: bool,
}

impl UserOps {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        Ok(read_bitfield!(reader, UserOps))
    }
}

impl Default for UserOps {
    fn default() -> Self {
        Self::new()
    }
}

/// Menu stream attributes, laid out identically in the VMGI and VTSI headers and in VTS
/// attribute records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuStreamAttributes {
    pub video_attr: VideoAttributes,
    pub zero_1: u8,
    /// 0 or 1.
    pub nr_of_audio_streams: u8,
    pub audio_attr: AudioAttributes,
    pub zero_2: [u8; 56],
    pub zero_3: [u8; 17],
    /// 0 or 1.
    pub nr_of_subp_streams: u8,
    pub subp_attr: SubpictureAttributes,
    pub zero_4: [u8; 162],
}

impl MenuStreamAttributes {
    pub const SIZE: usize = 254;

    pub(crate) fn parse(reader: &mut SliceReader, v: &mut Validator, table: TableId) -> Result<Self> {
        let location = reader.location();
        let video_attr = VideoAttributes::parse(reader)?;
        let zero_1 = reader.read_u8()?;
        let nr_of_audio_streams = reader.read_u8()?;
        let audio_attr = AudioAttributes::parse(reader)?;
        let zero_2: [u8; 56] = reader.read_array()?;
        let zero_3: [u8; 17] = reader.read_array()?;
        let nr_of_subp_streams = reader.read_u8()?;
        let subp_attr = SubpictureAttributes::parse(reader)?;
        let zero_4: [u8; 162] = reader.read_array()?;

        check_zero!(v, table, location, zero_1);
        check_zero!(v, table, location, zero_2);
        check_zero!(v, table, location, zero_3);
        check_zero!(v, table, location, zero_4);
        check_value!(v, table, location, nr_of_audio_streams <= 1);
        check_value!(v, table, location, nr_of_subp_streams <= 1);

        Ok(Self {
            video_attr,
            zero_1,
            nr_of_audio_streams,
            audio_attr,
            zero_2,
            zero_3,
            nr_of_subp_streams,
            subp_attr,
            zero_4,
        })
    }
}

/// Title stream attributes, laid out identically in the VTSI header and in VTS attribute
/// records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleStreamAttributes {
    pub video_attr: VideoAttributes,
    pub zero_1: u8,
    pub nr_of_audio_streams: u8,
    pub audio_attr: [AudioAttributes; 8],
    pub zero_2: [u8; 17],
    pub nr_of_subp_streams: u8,
    pub subp_attr: [SubpictureAttributes; 32],
}

impl TitleStreamAttributes {
    pub const SIZE: usize = 278;

    /// Parses the block. Subpicture records from `coded_subp` on are not checked, since some
    /// attribute tables are shorter than the full block.
    pub(crate) fn parse(
        reader: &mut SliceReader,
        v: &mut Validator,
        table: TableId,
        coded_subp: usize,
    ) -> Result<Self> {
        let location = reader.location();
        let video_attr = VideoAttributes::parse(reader)?;
        let zero_1 = reader.read_u8()?;
        let nr_of_audio_streams = reader.read_u8()?;
        let mut audio_attr = [AudioAttributes::default(); 8];
        for attr in audio_attr.iter_mut() {
            *attr = AudioAttributes::parse(reader)?;
        }
        let zero_2: [u8; 17] = reader.read_array()?;
        let nr_of_subp_streams = reader.read_u8()?;
        let mut subp_attr = [SubpictureAttributes::default(); 32];
        for attr in subp_attr.iter_mut() {
            *attr = SubpictureAttributes::parse(reader)?;
        }

        check_zero!(v, table, location, zero_1);
        check_zero!(v, table, location, zero_2);
        check_value!(v, table, location, nr_of_audio_streams <= 8);
        for (i, attr) in audio_attr.iter().enumerate().skip(nr_of_audio_streams as usize) {
            v.check_zero(table, location, &attr.into_bytes(), &format!("audio_attr[{}]", i))?;
        }
        check_value!(v, table, location, nr_of_subp_streams as usize <= coded_subp.min(32));
        for (i, attr) in subp_attr
            .iter()
            .enumerate()
            .take(coded_subp)
            .skip(nr_of_subp_streams as usize)
        {
            v.check_zero(table, location, &attr.into_bytes(), &format!("subp_attr[{}]", i))?;
        }

        Ok(Self {
            video_attr,
            zero_1,
            nr_of_audio_streams,
            audio_attr,
            zero_2,
            nr_of_subp_streams,
            subp_attr,
        })
    }

    /// Attributes of the declared audio streams.
    pub fn audio_streams(&self) -> &[AudioAttributes] {
        &self.audio_attr[..(self.nr_of_audio_streams as usize).min(8)]
    }

    /// Attributes of the declared subpicture streams.
    pub fn subp_streams(&self) -> &[SubpictureAttributes] {
        &self.subp_attr[..(self.nr_of_subp_streams as usize).min(32)]
    }
}
