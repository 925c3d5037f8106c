//! Chip personalities.

/// Instruction-set personality of the emulated part.
///
/// A variant selects a complete set of documented opcode, cycle and flag
/// behaviors. The execution core itself is shared; everything that differs
/// between the parts is driven by the decode table built for the variant
/// plus the policy bits below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// The original NMOS 6502 (and its 6510/8502 siblings, which differ
    /// only in I/O wiring handled outside the CPU).
    Nmos6502,
    /// The CMOS 65C02 redesign.
    Cmos65C02,
}

impl Variant {
    /// `JMP ($xxFF)` reads its high byte from `$xx00` on NMOS parts; the
    /// 65C02 fixed the wrap (and spends an extra cycle doing so).
    #[must_use]
    pub const fn has_indirect_jmp_bug(self) -> bool {
        matches!(self, Self::Nmos6502)
    }

    /// Decimal-mode ADC/SBC cost one extra cycle on the 65C02.
    #[must_use]
    pub const fn decimal_extra_cycle(self) -> bool {
        matches!(self, Self::Cmos65C02)
    }

    /// The 65C02 reports N and Z from the decimal result; NMOS parts leak
    /// them from the binary intermediate.
    #[must_use]
    pub const fn decimal_flags_from_result(self) -> bool {
        matches!(self, Self::Cmos65C02)
    }

    /// BRK and interrupt entry clear the D flag on the 65C02; NMOS parts
    /// leave it untouched.
    #[must_use]
    pub const fn interrupts_clear_decimal(self) -> bool {
        matches!(self, Self::Cmos65C02)
    }
}
