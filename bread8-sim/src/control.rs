use std::fmt::{self, Debug, Display, Formatter};
use std::ops::BitOr;

/// Set of control signals asserted during one cycle, stored active-high.
///
/// Bit 0 is `BO`, bit 15 is `CI`, matching the pin order of the two microcode EEPROMs.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct ControlWord(u16);

impl ControlWord {
    pub const NONE: ControlWord = ControlWord(0);

    /// B register out.
    pub const BO: ControlWord = ControlWord(1 << 0);
    /// B register in.
    pub const BI: ControlWord = ControlWord(1 << 1);
    /// A register out.
    pub const AO: ControlWord = ControlWord(1 << 2);
    /// A register in.
    pub const AI: ControlWord = ControlWord(1 << 3);
    /// Memory out.
    pub const RO: ControlWord = ControlWord(1 << 4);
    /// Memory in.
    pub const RI: ControlWord = ControlWord(1 << 5);
    /// Memory address register in.
    pub const MI: ControlWord = ControlWord(1 << 6);
    /// High byte select for 16-bit registers; halt when read by the sequencer.
    pub const HI: ControlWord = ControlWord(1 << 7);
    /// ALU out and flags register in.
    pub const EOFI: ControlWord = ControlWord(1 << 8);
    /// ALU subtract (invert B).
    pub const ES: ControlWord = ControlWord(1 << 9);
    /// ALU carry in.
    pub const EC: ControlWord = ControlWord(1 << 10);
    /// Instruction complete: asynchronous micro-step reset.
    pub const IC: ControlWord = ControlWord(1 << 11);
    /// Instruction register in.
    pub const II: ControlWord = ControlWord(1 << 12);
    /// Count enable for the program counter and the memory address register.
    pub const CEME: ControlWord = ControlWord(1 << 13);
    /// Program counter out.
    pub const CO: ControlWord = ControlWord(1 << 14);
    /// Program counter in.
    pub const CI: ControlWord = ControlWord(1 << 15);

    /// Bits stored inverted in the microcode images. Positions that are 0 here (HI, ES, EC,
    /// CEME) are active-high on the board and stored as they are.
    pub const ACTIVE_LOW: u16 = 0b1101_1001_0111_1111;

    const NAMES: [&'static str; 16] = [
        "BO", "BI", "AO", "AI", "RO", "RI", "MI", "HI",
        "EOFI", "ES", "EC", "IC", "II", "CEME", "CO", "CI"
    ];

    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Converts a word as stored in the microcode EEPROMs into its active-high form.
    pub const fn from_raw(raw: u16) -> Self {
        ControlWord(raw ^ Self::ACTIVE_LOW)
    }

    /// Converts back into the EEPROM encoding; inverse of [`ControlWord::from_raw`].
    pub const fn to_raw(self) -> u16 {
        self.0 ^ Self::ACTIVE_LOW
    }

    /// True if any of the signals in `other` is asserted.
    pub const fn intersects(self, other: ControlWord) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn names(self) -> impl Iterator<Item = &'static str> {
        (0..16)
            .filter(move |&bit| self.0 & (1 << bit) != 0)
            .map(|bit| Self::NAMES[bit])
    }
}
impl BitOr for ControlWord {
    type Output = ControlWord;

    fn bitor(self, rhs: Self) -> Self::Output {
        ControlWord(self.0 | rhs.0)
    }
}
impl Display for ControlWord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "-");
        }
        let names: Vec<&str> = self.names().collect();
        write!(f, "{}", names.join("|"))
    }
}
impl Debug for ControlWord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ControlWord({:#06X}: {})", self.0, self)
    }
}

/// Condition under which a component reacts to the control line.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Mask {
    /// The pin is tied inactive.
    Never,
    /// The pin is tied active.
    Always,
    /// Active when any of the given signals is asserted.
    Any(ControlWord)
}
impl Mask {
    pub fn is_active(self, word: ControlWord) -> bool {
        match self {
            Mask::Never => false,
            Mask::Always => true,
            Mask::Any(signals) => word.intersects(signals)
        }
    }
}

#[cfg(test)]
mod test {
    use crate::control::{ControlWord, Mask};

    #[test]
    fn active_low_mask() {
        let inverted = ControlWord::BO | ControlWord::BI | ControlWord::AO | ControlWord::AI
            | ControlWord::RO | ControlWord::RI | ControlWord::MI | ControlWord::EOFI
            | ControlWord::IC | ControlWord::II | ControlWord::CO | ControlWord::CI;
        assert_eq!(inverted.bits(), ControlWord::ACTIVE_LOW);
        assert_eq!(ControlWord::ACTIVE_LOW, 0xD97F);
    }

    #[test]
    fn raw_conversion() {
        // An EEPROM full of 0xFF asserts exactly the active-high signals.
        assert_eq!(
            ControlWord::from_raw(0xFFFF),
            ControlWord::HI | ControlWord::ES | ControlWord::EC | ControlWord::CEME
        );
        assert_eq!(ControlWord::from_raw(ControlWord::ACTIVE_LOW), ControlWord::NONE);

        let word = ControlWord::CO | ControlWord::MI | ControlWord::HI;
        assert_eq!(ControlWord::from_raw(word.to_raw()), word);
    }

    #[test]
    fn display_names() {
        assert_eq!((ControlWord::CO | ControlWord::MI).to_string(), "MI|CO");
        assert_eq!(ControlWord::NONE.to_string(), "-");
        assert_eq!(format!("{:?}", ControlWord::IC), "ControlWord(0x0800: IC)");
    }

    #[test]
    fn masks() {
        let word = ControlWord::AI | ControlWord::RO;

        assert!(!Mask::Never.is_active(word));
        assert!(Mask::Always.is_active(ControlWord::NONE));
        assert!(Mask::Any(ControlWord::AI).is_active(word));
        assert!(Mask::Any(ControlWord::AI | ControlWord::BI).is_active(word));
        assert!(!Mask::Any(ControlWord::BI).is_active(word));
    }
}
