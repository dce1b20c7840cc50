use std::fmt;
use std::str::FromStr;

use crate::error::PacketError;

/// One of the sixteen 68k registers carried by RPC-v2 packets.
///
/// Declaration order is the canonical wire order: `D7` is index 0 and owns
/// the most significant bit of the register mask, `A0` is index 15 and owns
/// the least significant one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Register {
    D7,
    D6,
    D5,
    D4,
    D3,
    D2,
    D1,
    D0,
    A7,
    A6,
    A5,
    A4,
    A3,
    A2,
    A1,
    A0,
}

impl Register {
    /// All registers in canonical order.
    pub const ALL: [Register; 16] = [
        Register::D7,
        Register::D6,
        Register::D5,
        Register::D4,
        Register::D3,
        Register::D2,
        Register::D1,
        Register::D0,
        Register::A7,
        Register::A6,
        Register::A5,
        Register::A4,
        Register::A3,
        Register::A2,
        Register::A1,
        Register::A0,
    ];

    /// Position in canonical order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Bit owned by this register in the 16-bit register mask.
    pub fn mask_bit(self) -> u16 {
        0x8000 >> self.index()
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::D7 => "D7",
            Register::D6 => "D6",
            Register::D5 => "D5",
            Register::D4 => "D4",
            Register::D3 => "D3",
            Register::D2 => "D2",
            Register::D1 => "D1",
            Register::D0 => "D0",
            Register::A7 => "A7",
            Register::A6 => "A6",
            Register::A5 => "A5",
            Register::A4 => "A4",
            Register::A3 => "A3",
            Register::A2 => "A2",
            Register::A1 => "A1",
            Register::A0 => "A0",
        }
    }
}

impl FromStr for Register {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Register::ALL
            .into_iter()
            .find(|reg| reg.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| PacketError::UnknownRegister(s.to_string()))
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sparse register values; only populated registers go on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterSet {
    values: [Option<u32>; 16],
}

impl RegisterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, reg: Register) -> Option<u32> {
        self.values[reg.index()]
    }

    pub fn set(&mut self, reg: Register, value: u32) {
        self.values[reg.index()] = Some(value);
    }

    pub fn clear(&mut self, reg: Register) {
        self.values[reg.index()] = None;
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// Number of populated registers.
    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Register mask with one bit per populated register.
    pub fn mask(&self) -> u16 {
        self.iter().fold(0, |mask, (reg, _)| mask | reg.mask_bit())
    }

    /// Populated registers in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Register, u32)> + '_ {
        Register::ALL
            .into_iter()
            .filter_map(|reg| self.get(reg).map(|value| (reg, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_bits_follow_canonical_order() {
        assert_eq!(Register::D7.mask_bit(), 0x8000);
        assert_eq!(Register::D0.mask_bit(), 0x0100);
        assert_eq!(Register::A7.mask_bit(), 0x0080);
        assert_eq!(Register::A0.mask_bit(), 0x0001);
    }

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!("d3".parse::<Register>().unwrap(), Register::D3);
        assert_eq!("A6".parse::<Register>().unwrap(), Register::A6);
        assert!(matches!(
            "A8".parse::<Register>(),
            Err(PacketError::UnknownRegister(name)) if name == "A8"
        ));
    }

    #[test]
    fn set_reports_mask_and_canonical_order() {
        let mut regs = RegisterSet::new();
        regs.set(Register::A0, 2);
        regs.set(Register::D0, 1);
        regs.set(Register::A7, 3);

        assert_eq!(regs.mask(), 0x0181);
        assert_eq!(regs.len(), 3);
        let order: Vec<_> = regs.iter().map(|(reg, _)| reg).collect();
        assert_eq!(order, vec![Register::D0, Register::A7, Register::A0]);

        regs.clear(Register::A7);
        assert_eq!(regs.mask(), 0x0101);
    }

    #[test]
    fn empty_set_has_zero_mask() {
        let regs = RegisterSet::new();
        assert!(regs.is_empty());
        assert_eq!(regs.mask(), 0);
        assert_eq!(regs.get(Register::D5), None);
    }
}
