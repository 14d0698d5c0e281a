//! ARM core registers.

use std::fmt;

/// General-purpose register.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Register {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    R8,
    R9,
    R10,
    R11,
    R12,
    SP,
    LR,
    PC,
}

impl Register {
    pub const ALL: [Self; 16] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
        Self::R8,
        Self::R9,
        Self::R10,
        Self::R11,
        Self::R12,
        Self::SP,
        Self::LR,
        Self::PC,
    ];

    /// Argument registers of the procedure call standard.
    pub const ARGS: [Self; 4] = [Self::R0, Self::R1, Self::R2, Self::R3];

    pub const fn number(self) -> u8 {
        self as u8
    }

    pub const fn from_number(n: u8) -> Option<Self> {
        if n < 16 {
            Some(Self::ALL[n as usize])
        } else {
            None
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::R0 => "R0",
            Self::R1 => "R1",
            Self::R2 => "R2",
            Self::R3 => "R3",
            Self::R4 => "R4",
            Self::R5 => "R5",
            Self::R6 => "R6",
            Self::R7 => "R7",
            Self::R8 => "R8",
            Self::R9 => "R9",
            Self::R10 => "R10",
            Self::R11 => "R11",
            Self::R12 => "R12",
            Self::SP => "SP",
            Self::LR => "LR",
            Self::PC => "PC",
        }
    }

    /// Parse `R0`..`R15`, `SP`, `LR`, `PC` (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        match upper.as_str() {
            "SP" => Some(Self::SP),
            "LR" => Some(Self::LR),
            "PC" => Some(Self::PC),
            _ => upper
                .strip_prefix('R')
                .and_then(|n| n.parse::<u8>().ok())
                .and_then(Self::from_number),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_roundtrip() {
        for reg in Register::ALL {
            assert_eq!(Register::from_number(reg.number()), Some(reg));
        }
        assert_eq!(Register::from_number(16), None);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Register::from_name("r3"), Some(Register::R3));
        assert_eq!(Register::from_name("R13"), Some(Register::SP));
        assert_eq!(Register::from_name("lr"), Some(Register::LR));
        assert_eq!(Register::from_name("R16"), None);
        assert_eq!(Register::from_name("X1"), None);
    }
}
