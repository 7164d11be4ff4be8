use crate::ifo::attributes::{DvdTime, UserOps};
use crate::ifo::pgc::VmCommand;
use crate::validation::Validator;
use crate::{check_value, check_zero, BitReader, Result, TableId};

/// General information of a PCI packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PciGeneral {
    /// Logical block number of this navigation pack.
    pub nv_pck_lbn: u32,
    pub vobu_cat: u16,
    pub zero1: u16,
    pub vobu_uop_ctl: UserOps,
    /// Presentation start time of the VOBU, 90 kHz.
    pub vobu_s_ptm: u32,
    /// Presentation end time of the VOBU, 90 kHz.
    pub vobu_e_ptm: u32,
    /// End time of the sequence end in this VOBU, 0 when there is none.
    pub vobu_se_e_ptm: u32,
    /// Elapsed time within the cell.
    pub e_eltm: DvdTime,
    pub vobu_isrc: [u8; 32],
}

impl PciGeneral {
    fn read(r: &mut BitReader, v: &mut Validator) -> Result<Self> {
        let gi = Self {
            nv_pck_lbn: r.take_u32(),
            vobu_cat: r.take_u16(),
            zero1: r.take_u16(),
            vobu_uop_ctl: UserOps::from_bytes(r.take_array()),
            vobu_s_ptm: r.take_u32(),
            vobu_e_ptm: r.take_u32(),
            vobu_se_e_ptm: r.take_u32(),
            e_eltm: DvdTime {
                hour: r.take_u8(),
                minute: r.take_u8(),
                second: r.take_u8(),
                frame_u: r.take_u8(),
            },
            vobu_isrc: r.take_array(),
        };
        check_zero!(v, TableId::Pci, 0, gi.zero1);
        Ok(gi)
    }
}

/// General highlight information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightGeneral {
    /// Low two bits non-zero when highlight information is present.
    pub hli_ss: u16,
    pub hli_s_ptm: u32,
    pub hli_e_ptm: u32,
    pub btn_se_e_ptm: u32,
    pub zero1: u8,
    /// Number of button groups, 0 to 3.
    pub btngr_ns: u8,
    pub zero2: u8,
    pub btngr1_dsp_ty: u8,
    pub zero3: u8,
    pub btngr2_dsp_ty: u8,
    pub zero4: u8,
    pub btngr3_dsp_ty: u8,
    pub btn_ofn: u8,
    /// Number of buttons in each group.
    pub btn_ns: u8,
    pub nsl_btn_ns: u8,
    pub zero5: u8,
    pub fosl_btnn: u8,
    pub foac_btnn: u8,
}

impl HighlightGeneral {
    const LOCATION: u64 = 96;

    fn read(r: &mut BitReader, v: &mut Validator) -> Result<Self> {
        let hl_gi = Self {
            hli_ss: r.take_u16(),
            hli_s_ptm: r.take_u32(),
            hli_e_ptm: r.take_u32(),
            btn_se_e_ptm: r.take_u32(),
            zero1: r.take(2) as u8,
            btngr_ns: r.take(2) as u8,
            zero2: r.take(1) as u8,
            btngr1_dsp_ty: r.take(3) as u8,
            zero3: r.take(1) as u8,
            btngr2_dsp_ty: r.take(3) as u8,
            zero4: r.take(1) as u8,
            btngr3_dsp_ty: r.take(3) as u8,
            btn_ofn: r.take_u8(),
            btn_ns: r.take_u8(),
            nsl_btn_ns: r.take_u8(),
            zero5: r.take_u8(),
            fosl_btnn: r.take_u8(),
            foac_btnn: r.take_u8(),
        };

        let (t, loc) = (TableId::Pci, Self::LOCATION);
        check_zero!(v, t, loc, hl_gi.zero1);
        check_zero!(v, t, loc, hl_gi.zero2);
        check_zero!(v, t, loc, hl_gi.zero3);
        check_zero!(v, t, loc, hl_gi.zero4);
        check_zero!(v, t, loc, hl_gi.zero5);
        let (btn_ns, btngr_ns) = (hl_gi.btn_ns, hl_gi.btngr_ns);
        if hl_gi.hli_ss & 0x03 != 0 {
            check_value!(v, t, loc, btn_ns != 0);
            check_value!(v, t, loc, btngr_ns != 0);
        } else {
            check_value!(
                v,
                t,
                loc,
                (btn_ns != 0 && btngr_ns != 0) || (btn_ns == 0 && btngr_ns == 0)
            );
        }
        Ok(hl_gi)
    }
}

/// One highlight button: its rectangle, neighbours and the command it runs.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Button {
    pub btn_coln: u8,
    pub x_start: u16,
    pub zero1: u8,
    pub x_end: u16,
    pub auto_action_mode: u8,
    pub y_start: u16,
    pub zero2: u8,
    pub y_end: u16,
    pub zero3: u8,
    /// Button selected by moving up, 1-based.
    pub up: u8,
    pub zero4: u8,
    pub down: u8,
    pub zero5: u8,
    pub left: u8,
    pub zero6: u8,
    pub right: u8,
    pub cmd: VmCommand,
}

impl Button {
    pub const SIZE: usize = 18;

    fn read(r: &mut BitReader) -> Self {
        Self {
            btn_coln: r.take(2) as u8,
            x_start: r.take(10) as u16,
            zero1: r.take(2) as u8,
            x_end: r.take(10) as u16,
            auto_action_mode: r.take(2) as u8,
            y_start: r.take(10) as u16,
            zero2: r.take(2) as u8,
            y_end: r.take(10) as u16,
            zero3: r.take(2) as u8,
            up: r.take(6) as u8,
            zero4: r.take(2) as u8,
            down: r.take(6) as u8,
            zero5: r.take(2) as u8,
            left: r.take(6) as u8,
            zero6: r.take(2) as u8,
            right: r.take(6) as u8,
            cmd: VmCommand(r.take_array()),
        }
    }

    fn reserved_bits(&self) -> u8 {
        self.zero1 | self.zero2 | self.zero3 | self.zero4 | self.zero5 | self.zero6
    }
}

/// Highlight information: button layout of an interactive menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub hl_gi: HighlightGeneral,
    /// Selection and action colors of the three color sets.
    pub btn_colit: [[u32; 2]; 3],
    /// Button slots, split evenly between the button groups.
    pub btnit: [Button; 36],
}

impl Highlight {
    const BUTTONS_LOCATION: u64 = 142;

    fn read(r: &mut BitReader, v: &mut Validator) -> Result<Self> {
        let hl_gi = HighlightGeneral::read(r, v)?;
        let mut btn_colit = [[0_u32; 2]; 3];
        for color in btn_colit.iter_mut().flat_map(|c| c.iter_mut()) {
            *color = r.take_u32();
        }
        let mut btnit = [Button::default(); 36];
        for button in btnit.iter_mut() {
            *button = Button::read(r);
        }

        let t = TableId::Pci;
        let btn_ns = hl_gi.btn_ns;
        if hl_gi.btngr_ns != 0 {
            let per_group = btnit.len() / hl_gi.btngr_ns as usize;
            for (n, button) in btnit.iter().enumerate().take(per_group * hl_gi.btngr_ns as usize) {
                let loc = Self::BUTTONS_LOCATION + (n * Button::SIZE) as u64;
                v.check_zero(t, loc, &button.reserved_bits(), &format!("btnit[{}] reserved bits", n))?;
                if n % per_group < btn_ns as usize {
                    let Button {
                        x_start,
                        x_end,
                        y_start,
                        y_end,
                        up,
                        down,
                        left,
                        right,
                        ..
                    } = *button;
                    check_value!(v, t, loc, x_start <= x_end);
                    check_value!(v, t, loc, y_start <= y_end);
                    check_value!(v, t, loc, up <= btn_ns);
                    check_value!(v, t, loc, down <= btn_ns);
                    check_value!(v, t, loc, left <= btn_ns);
                    check_value!(v, t, loc, right <= btn_ns);
                } else {
                    v.check(
                        t,
                        loc,
                        *button == Button::default(),
                        &format!("unused btnit[{}] is zero", n),
                    )?;
                }
            }
        }

        Ok(Self {
            hl_gi,
            btn_colit,
            btnit,
        })
    }
}

/// Presentation control information: the first half of a navigation pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pci {
    pub pci_gi: PciGeneral,
    /// Destinations of non-seamless angle changes, one per angle.
    pub nsml_agli: [u32; 9],
    pub hli: Highlight,
    pub zero1: [u8; 189],
}

impl Pci {
    /// Length of the PCI payload, without the sub-stream id.
    pub const SIZE: usize = 979;

    /// Decodes a PCI payload, recording failed checks in `v`.
    pub fn decode(buf: &[u8], v: &mut Validator) -> Result<Self> {
        super::check_len(buf, Self::SIZE, TableId::Pci)?;
        Self::read(&mut BitReader::new(buf), v)
    }

    pub(crate) fn read(r: &mut BitReader, v: &mut Validator) -> Result<Self> {
        let pci_gi = PciGeneral::read(r, v)?;
        let mut nsml_agli = [0_u32; 9];
        for dsta in nsml_agli.iter_mut() {
            *dsta = r.take_u32();
        }
        let hli = Highlight::read(r, v)?;
        let zero1 = r.take_array();
        Ok(Self {
            pci_gi,
            nsml_agli,
            hli,
            zero1,
        })
    }

    /// Whether this VOBU carries highlight information.
    pub fn has_highlight(&self) -> bool {
        self.hli.hl_gi.hli_ss & 0x03 != 0
    }

    /// Buttons of group `group` (0-based), in button number order.
    pub fn buttons(&self, group: u8) -> &[Button] {
        let hl_gi = &self.hli.hl_gi;
        if group >= hl_gi.btngr_ns {
            return &[];
        }
        let per_group = self.hli.btnit.len() / hl_gi.btngr_ns as usize;
        let start = group as usize * per_group;
        let len = (hl_gi.btn_ns as usize).min(per_group);
        &self.hli.btnit[start..start + len]
    }
}
