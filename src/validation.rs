//! Soft invariant checks.
//!
//! Many pressed discs break the nominal layout rules in small, survivable ways, so a failed check
//! is logged and recorded rather than treated as fatal. [`ValidationMode::Strict`] turns every
//! recorded violation (except tolerated [`Quirks`]) into an
//! [`ErrorDetails::InvariantViolation`].

use super::{Error, ErrorDetails, Result, TableId};
use log::warn;
use std::fmt::Write;

/// How invariant violations are handled.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValidationMode {
    /// Log, record and continue. Suitable for playback.
    Permissive,
    /// Fail the current read on the first violation. Suitable for conformance testing.
    Strict,
}

impl Default for ValidationMode {
    fn default() -> Self {
        ValidationMode::Permissive
    }
}

/// Known deviations found on real discs.
///
/// An enabled quirk is still recorded and logged when encountered, but never fails a strict
/// parse. A disabled quirk is checked like any other invariant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Quirks {
    /// PTT search pointers aimed one entry past the end of the table, producing titles with no
    /// parts (seen on "Magic Knight Rayearth").
    pub zero_ptt_titles: bool,
    /// Cell address tables declaring more VOBs than there are entries (seen on
    /// "Enemy of the State"). The count is clamped either way.
    pub oversized_vob_count: bool,
    /// Cells whose last VOBU starts on their last sector (seen on "Pi").
    pub last_vobu_at_last_sector: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Self {
            zero_ptt_titles: true,
            oversized_vob_count: true,
            last_vobu_at_last_sector: true,
        }
    }
}

/// Options controlling how an IFO file is parsed.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub mode: ValidationMode,
    pub quirks: Quirks,
}

impl ParseOptions {
    pub fn strict() -> Self {
        Self {
            mode: ValidationMode::Strict,
            ..Self::default()
        }
    }
}

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Table being read when the check failed.
    pub table: TableId,
    /// Absolute byte offset of the table (or record) the check applies to.
    pub location: u64,
    /// The failed condition, or the name of a non-zero reserved field followed by its bytes.
    pub check: String,
    /// Whether the violation matched an enabled [`Quirks`] entry.
    pub tolerated: bool,
}

/// Types that can be compared against an all-zero pattern.
pub trait ZeroCheck {
    fn is_zero(&self) -> bool;
    fn hex(&self) -> String;
}

macro_rules! zero_check_int {
    ($($t:ty),*) => {
        $(impl ZeroCheck for $t {
            fn is_zero(&self) -> bool {
                *self == 0
            }

            fn hex(&self) -> String {
                format!("{:0width$x}", self, width = std::mem::size_of::<$t>() * 2)
            }
        })*
    };
}

zero_check_int!(u8, u16, u32, u64);

impl ZeroCheck for [u8] {
    fn is_zero(&self) -> bool {
        self.iter().all(|b| *b == 0)
    }

    fn hex(&self) -> String {
        let mut out = String::with_capacity(self.len() * 2);
        for b in self {
            let _ = write!(out, "{:02x}", b);
        }
        out
    }
}

impl<const N: usize> ZeroCheck for [u8; N] {
    fn is_zero(&self) -> bool {
        self[..].is_zero()
    }

    fn hex(&self) -> String {
        self[..].hex()
    }
}

/// Collects and reports invariant violations for one parse.
#[derive(Debug, Default)]
pub struct Validator {
    options: ParseOptions,
    violations: Vec<Violation>,
}

impl Validator {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            violations: Vec::new(),
        }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn quirks(&self) -> &Quirks {
        &self.options.quirks
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub(crate) fn take_violations(&mut self) -> Vec<Violation> {
        std::mem::take(&mut self.violations)
    }

    fn record(&mut self, table: TableId, location: u64, check: String, tolerated: bool) -> Result<()> {
        warn!(
            "{} check failed in {} at {:#x}: {}",
            if tolerated { "Tolerated" } else { "Invariant" },
            table,
            location,
            check
        );
        self.violations.push(Violation {
            table,
            location,
            check: check.clone(),
            tolerated,
        });
        if !tolerated && self.options.mode == ValidationMode::Strict {
            Err(Error::new(
                location,
                ErrorDetails::InvariantViolation { table, check },
            ))
        } else {
            Ok(())
        }
    }

    /// Value check: `cond` must hold.
    pub fn check(&mut self, table: TableId, location: u64, cond: bool, what: &str) -> Result<()> {
        if cond {
            Ok(())
        } else {
            self.record(table, location, what.to_owned(), false)
        }
    }

    /// Zero check: a reserved field must be all-zero.
    pub fn check_zero<Z: ZeroCheck + ?Sized>(
        &mut self,
        table: TableId,
        location: u64,
        field: &Z,
        name: &str,
    ) -> Result<()> {
        if field.is_zero() {
            Ok(())
        } else {
            self.record(table, location, format!("{} = 0x{}", name, field.hex()), false)
        }
    }

    /// Check for a condition covered by a quirk. Tolerated when `enabled`, checked otherwise.
    pub fn check_quirk(
        &mut self,
        table: TableId,
        location: u64,
        cond: bool,
        enabled: bool,
        what: &str,
    ) -> Result<()> {
        if cond {
            Ok(())
        } else {
            self.record(table, location, what.to_owned(), enabled)
        }
    }
}

/// `check_value!(validator, table, location, condition)`
#[macro_export]
macro_rules! check_value {
    ($v:expr, $table:expr, $loc:expr, $cond:expr) => {
        $v.check($table, $loc, $cond, stringify!($cond))?
    };
}

/// `check_zero!(validator, table, location, field)`
#[macro_export]
macro_rules! check_zero {
    ($v:expr, $table:expr, $loc:expr, $field:expr) => {
        $v.check_zero($table, $loc, &$field, stringify!($field))?
    };
}
