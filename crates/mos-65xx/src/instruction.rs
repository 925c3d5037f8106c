//! Per-variant instruction decode tables.
//!
//! Each [`Variant`] gets a 256-slot table from opcode byte to an immutable
//! [`Instruction`] descriptor, built once at startup. Slots a personality
//! leaves undefined decode to `None`, giving the execution core a uniform
//! dispatch surface; what executing one means is variant policy (NMOS
//! faults, the 65C02 fills every slot with its documented no-ops, so its
//! table is total).

use crate::Variant;

/// Instruction mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Bra,
    Brk,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jmp,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Nop,
    Ora,
    Pha,
    Php,
    Phx,
    Phy,
    Pla,
    Plp,
    Plx,
    Ply,
    Rol,
    Ror,
    Rti,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sta,
    Stx,
    Sty,
    Stz,
    Tax,
    Tay,
    Trb,
    Tsb,
    Tsx,
    Txa,
    Txs,
    Tya,
}

/// How an instruction locates its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// No operand.
    Implied,
    /// Operates on the accumulator.
    Accumulator,
    /// `#$nn` - literal byte from the instruction stream.
    Immediate,
    /// `$nn` - address in page zero.
    ZeroPage,
    /// `$nn,X` - page-zero address plus X, wrapping within the page.
    ZeroPageX,
    /// `$nn,Y` - page-zero address plus Y, wrapping within the page.
    ZeroPageY,
    /// `$nnnn` - full 16-bit address.
    Absolute,
    /// `$nnnn,X` - absolute plus X; crossing a page may cost a cycle.
    AbsoluteX,
    /// `$nnnn,Y` - absolute plus Y; crossing a page may cost a cycle.
    AbsoluteY,
    /// `($nnnn)` - JMP only. NMOS parts wrap the high-byte read within the
    /// pointer's page.
    Indirect,
    /// `($nn,X)` - pointer in page zero indexed by X.
    IndexedIndirect,
    /// `($nn),Y` - page-zero pointer, then indexed by Y.
    IndirectIndexed,
    /// `($nn)` - page-zero pointer, 65C02 only.
    ZeroPageIndirect,
    /// `($nnnn,X)` - JMP only, 65C02 only.
    AbsoluteIndexedIndirect,
    /// Branch offset, -128 to +127 from the following instruction.
    Relative,
}

impl AddressingMode {
    /// Number of operand bytes the mode consumes after the opcode.
    #[must_use]
    pub const fn operand_bytes(self) -> u16 {
        match self {
            Self::Implied | Self::Accumulator => 0,
            Self::Immediate
            | Self::ZeroPage
            | Self::ZeroPageX
            | Self::ZeroPageY
            | Self::IndexedIndirect
            | Self::IndirectIndexed
            | Self::ZeroPageIndirect
            | Self::Relative => 1,
            Self::Absolute
            | Self::AbsoluteX
            | Self::AbsoluteY
            | Self::Indirect
            | Self::AbsoluteIndexedIndirect => 2,
        }
    }
}

/// Immutable descriptor for one opcode under one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
    /// Base cycle count before any owed extras.
    pub cycles: u8,
    /// Whether indexing across a page boundary owes one extra cycle.
    /// Store and read-modify-write forms carry the cost in `cycles`
    /// instead, matching the documented quirk table.
    pub page_cross_penalty: bool,
}

const fn op(mnemonic: Mnemonic, mode: AddressingMode, cycles: u8) -> Option<Instruction> {
    Some(Instruction {
        mnemonic,
        mode,
        cycles,
        page_cross_penalty: false,
    })
}

const fn op_px(mnemonic: Mnemonic, mode: AddressingMode, cycles: u8) -> Option<Instruction> {
    Some(Instruction {
        mnemonic,
        mode,
        cycles,
        page_cross_penalty: true,
    })
}

/// Complete decode table for one chip personality.
#[derive(Debug)]
pub struct InstructionSet {
    variant: Variant,
    entries: [Option<Instruction>; 256],
}

impl InstructionSet {
    /// Build the table for `variant`. Built once per session and immutable
    /// thereafter.
    #[must_use]
    pub fn new(variant: Variant) -> Self {
        let mut entries = nmos_entries();
        if variant == Variant::Cmos65C02 {
            apply_cmos(&mut entries);
        }
        Self { variant, entries }
    }

    #[must_use]
    pub const fn variant(&self) -> Variant {
        self.variant
    }

    /// Look up the descriptor for an opcode byte. `None` means the variant
    /// leaves the opcode undefined.
    #[must_use]
    pub fn decode(&self, opcode: u8) -> Option<&Instruction> {
        self.entries[opcode as usize].as_ref()
    }
}

/// The documented NMOS 6502 instruction set: 151 opcodes.
fn nmos_entries() -> [Option<Instruction>; 256] {
    use AddressingMode::*;
    use Mnemonic::*;

    let mut t = [None; 256];

    // Load/store
    t[0xA9] = op(Lda, Immediate, 2);
    t[0xA5] = op(Lda, ZeroPage, 3);
    t[0xB5] = op(Lda, ZeroPageX, 4);
    t[0xAD] = op(Lda, Absolute, 4);
    t[0xBD] = op_px(Lda, AbsoluteX, 4);
    t[0xB9] = op_px(Lda, AbsoluteY, 4);
    t[0xA1] = op(Lda, IndexedIndirect, 6);
    t[0xB1] = op_px(Lda, IndirectIndexed, 5);
    t[0xA2] = op(Ldx, Immediate, 2);
    t[0xA6] = op(Ldx, ZeroPage, 3);
    t[0xB6] = op(Ldx, ZeroPageY, 4);
    t[0xAE] = op(Ldx, Absolute, 4);
    t[0xBE] = op_px(Ldx, AbsoluteY, 4);
    t[0xA0] = op(Ldy, Immediate, 2);
    t[0xA4] = op(Ldy, ZeroPage, 3);
    t[0xB4] = op(Ldy, ZeroPageX, 4);
    t[0xAC] = op(Ldy, Absolute, 4);
    t[0xBC] = op_px(Ldy, AbsoluteX, 4);
    t[0x85] = op(Sta, ZeroPage, 3);
    t[0x95] = op(Sta, ZeroPageX, 4);
    t[0x8D] = op(Sta, Absolute, 4);
    t[0x9D] = op(Sta, AbsoluteX, 5);
    t[0x99] = op(Sta, AbsoluteY, 5);
    t[0x81] = op(Sta, IndexedIndirect, 6);
    t[0x91] = op(Sta, IndirectIndexed, 6);
    t[0x86] = op(Stx, ZeroPage, 3);
    t[0x96] = op(Stx, ZeroPageY, 4);
    t[0x8E] = op(Stx, Absolute, 4);
    t[0x84] = op(Sty, ZeroPage, 3);
    t[0x94] = op(Sty, ZeroPageX, 4);
    t[0x8C] = op(Sty, Absolute, 4);

    // Register transfers
    t[0xAA] = op(Tax, Implied, 2);
    t[0xA8] = op(Tay, Implied, 2);
    t[0x8A] = op(Txa, Implied, 2);
    t[0x98] = op(Tya, Implied, 2);
    t[0xBA] = op(Tsx, Implied, 2);
    t[0x9A] = op(Txs, Implied, 2);

    // Stack
    t[0x48] = op(Pha, Implied, 3);
    t[0x08] = op(Php, Implied, 3);
    t[0x68] = op(Pla, Implied, 4);
    t[0x28] = op(Plp, Implied, 4);

    // Logical
    t[0x29] = op(And, Immediate, 2);
    t[0x25] = op(And, ZeroPage, 3);
    t[0x35] = op(And, ZeroPageX, 4);
    t[0x2D] = op(And, Absolute, 4);
    t[0x3D] = op_px(And, AbsoluteX, 4);
    t[0x39] = op_px(And, AbsoluteY, 4);
    t[0x21] = op(And, IndexedIndirect, 6);
    t[0x31] = op_px(And, IndirectIndexed, 5);
    t[0x09] = op(Ora, Immediate, 2);
    t[0x05] = op(Ora, ZeroPage, 3);
    t[0x15] = op(Ora, ZeroPageX, 4);
    t[0x0D] = op(Ora, Absolute, 4);
    t[0x1D] = op_px(Ora, AbsoluteX, 4);
    t[0x19] = op_px(Ora, AbsoluteY, 4);
    t[0x01] = op(Ora, IndexedIndirect, 6);
    t[0x11] = op_px(Ora, IndirectIndexed, 5);
    t[0x49] = op(Eor, Immediate, 2);
    t[0x45] = op(Eor, ZeroPage, 3);
    t[0x55] = op(Eor, ZeroPageX, 4);
    t[0x4D] = op(Eor, Absolute, 4);
    t[0x5D] = op_px(Eor, AbsoluteX, 4);
    t[0x59] = op_px(Eor, AbsoluteY, 4);
    t[0x41] = op(Eor, IndexedIndirect, 6);
    t[0x51] = op_px(Eor, IndirectIndexed, 5);
    t[0x24] = op(Bit, ZeroPage, 3);
    t[0x2C] = op(Bit, Absolute, 4);

    // Arithmetic
    t[0x69] = op(Adc, Immediate, 2);
    t[0x65] = op(Adc, ZeroPage, 3);
    t[0x75] = op(Adc, ZeroPageX, 4);
    t[0x6D] = op(Adc, Absolute, 4);
    t[0x7D] = op_px(Adc, AbsoluteX, 4);
    t[0x79] = op_px(Adc, AbsoluteY, 4);
    t[0x61] = op(Adc, IndexedIndirect, 6);
    t[0x71] = op_px(Adc, IndirectIndexed, 5);
    t[0xE9] = op(Sbc, Immediate, 2);
    t[0xE5] = op(Sbc, ZeroPage, 3);
    t[0xF5] = op(Sbc, ZeroPageX, 4);
    t[0xED] = op(Sbc, Absolute, 4);
    t[0xFD] = op_px(Sbc, AbsoluteX, 4);
    t[0xF9] = op_px(Sbc, AbsoluteY, 4);
    t[0xE1] = op(Sbc, IndexedIndirect, 6);
    t[0xF1] = op_px(Sbc, IndirectIndexed, 5);

    // Compare
    t[0xC9] = op(Cmp, Immediate, 2);
    t[0xC5] = op(Cmp, ZeroPage, 3);
    t[0xD5] = op(Cmp, ZeroPageX, 4);
    t[0xCD] = op(Cmp, Absolute, 4);
    t[0xDD] = op_px(Cmp, AbsoluteX, 4);
    t[0xD9] = op_px(Cmp, AbsoluteY, 4);
    t[0xC1] = op(Cmp, IndexedIndirect, 6);
    t[0xD1] = op_px(Cmp, IndirectIndexed, 5);
    t[0xE0] = op(Cpx, Immediate, 2);
    t[0xE4] = op(Cpx, ZeroPage, 3);
    t[0xEC] = op(Cpx, Absolute, 4);
    t[0xC0] = op(Cpy, Immediate, 2);
    t[0xC4] = op(Cpy, ZeroPage, 3);
    t[0xCC] = op(Cpy, Absolute, 4);

    // Increment/decrement
    t[0xE6] = op(Inc, ZeroPage, 5);
    t[0xF6] = op(Inc, ZeroPageX, 6);
    t[0xEE] = op(Inc, Absolute, 6);
    t[0xFE] = op(Inc, AbsoluteX, 7);
    t[0xC6] = op(Dec, ZeroPage, 5);
    t[0xD6] = op(Dec, ZeroPageX, 6);
    t[0xCE] = op(Dec, Absolute, 6);
    t[0xDE] = op(Dec, AbsoluteX, 7);
    t[0xE8] = op(Inx, Implied, 2);
    t[0xC8] = op(Iny, Implied, 2);
    t[0xCA] = op(Dex, Implied, 2);
    t[0x88] = op(Dey, Implied, 2);

    // Shifts and rotates
    t[0x0A] = op(Asl, Accumulator, 2);
    t[0x06] = op(Asl, ZeroPage, 5);
    t[0x16] = op(Asl, ZeroPageX, 6);
    t[0x0E] = op(Asl, Absolute, 6);
    t[0x1E] = op(Asl, AbsoluteX, 7);
    t[0x4A] = op(Lsr, Accumulator, 2);
    t[0x46] = op(Lsr, ZeroPage, 5);
    t[0x56] = op(Lsr, ZeroPageX, 6);
    t[0x4E] = op(Lsr, Absolute, 6);
    t[0x5E] = op(Lsr, AbsoluteX, 7);
    t[0x2A] = op(Rol, Accumulator, 2);
    t[0x26] = op(Rol, ZeroPage, 5);
    t[0x36] = op(Rol, ZeroPageX, 6);
    t[0x2E] = op(Rol, Absolute, 6);
    t[0x3E] = op(Rol, AbsoluteX, 7);
    t[0x6A] = op(Ror, Accumulator, 2);
    t[0x66] = op(Ror, ZeroPage, 5);
    t[0x76] = op(Ror, ZeroPageX, 6);
    t[0x6E] = op(Ror, Absolute, 6);
    t[0x7E] = op(Ror, AbsoluteX, 7);

    // Jumps and subroutines
    t[0x4C] = op(Jmp, Absolute, 3);
    t[0x6C] = op(Jmp, Indirect, 5);
    t[0x20] = op(Jsr, Absolute, 6);
    t[0x60] = op(Rts, Implied, 6);

    // Branches: 2 cycles, +1 taken, +1 more on page cross
    t[0x90] = op(Bcc, Relative, 2);
    t[0xB0] = op(Bcs, Relative, 2);
    t[0xF0] = op(Beq, Relative, 2);
    t[0xD0] = op(Bne, Relative, 2);
    t[0x30] = op(Bmi, Relative, 2);
    t[0x10] = op(Bpl, Relative, 2);
    t[0x50] = op(Bvc, Relative, 2);
    t[0x70] = op(Bvs, Relative, 2);

    // Flag manipulation
    t[0x18] = op(Clc, Implied, 2);
    t[0x38] = op(Sec, Implied, 2);
    t[0x58] = op(Cli, Implied, 2);
    t[0x78] = op(Sei, Implied, 2);
    t[0xD8] = op(Cld, Implied, 2);
    t[0xF8] = op(Sed, Implied, 2);
    t[0xB8] = op(Clv, Implied, 2);

    // System
    t[0x00] = op(Brk, Implied, 7);
    t[0x40] = op(Rti, Implied, 6);
    t[0xEA] = op(Nop, Implied, 2);

    t
}

/// Rewrite the table into the 65C02 personality.
fn apply_cmos(t: &mut [Option<Instruction>; 256]) {
    use AddressingMode::*;
    use Mnemonic::*;

    // New instructions
    t[0x80] = op(Bra, Relative, 2);
    t[0x1A] = op(Inc, Accumulator, 2);
    t[0x3A] = op(Dec, Accumulator, 2);
    t[0xDA] = op(Phx, Implied, 3);
    t[0x5A] = op(Phy, Implied, 3);
    t[0xFA] = op(Plx, Implied, 4);
    t[0x7A] = op(Ply, Implied, 4);
    t[0x64] = op(Stz, ZeroPage, 3);
    t[0x74] = op(Stz, ZeroPageX, 4);
    t[0x9C] = op(Stz, Absolute, 4);
    t[0x9E] = op(Stz, AbsoluteX, 5);
    t[0x04] = op(Tsb, ZeroPage, 5);
    t[0x0C] = op(Tsb, Absolute, 6);
    t[0x14] = op(Trb, ZeroPage, 5);
    t[0x1C] = op(Trb, Absolute, 6);
    t[0x89] = op(Bit, Immediate, 2);
    t[0x34] = op(Bit, ZeroPageX, 4);
    t[0x3C] = op_px(Bit, AbsoluteX, 4);
    t[0x7C] = op(Jmp, AbsoluteIndexedIndirect, 6);

    // Zero-page indirect forms of the ALU instructions
    t[0x12] = op(Ora, ZeroPageIndirect, 5);
    t[0x32] = op(And, ZeroPageIndirect, 5);
    t[0x52] = op(Eor, ZeroPageIndirect, 5);
    t[0x72] = op(Adc, ZeroPageIndirect, 5);
    t[0x92] = op(Sta, ZeroPageIndirect, 5);
    t[0xB2] = op(Lda, ZeroPageIndirect, 5);
    t[0xD2] = op(Cmp, ZeroPageIndirect, 5);
    t[0xF2] = op(Sbc, ZeroPageIndirect, 5);

    // The indirect-jump page-wrap bug is fixed; the fix costs a cycle
    t[0x6C] = op(Jmp, Indirect, 6);

    // Shift/rotate absolute,X drop to 6 cycles unless the page crosses
    // (INC and DEC stay at a flat 7)
    t[0x1E] = op_px(Asl, AbsoluteX, 6);
    t[0x5E] = op_px(Lsr, AbsoluteX, 6);
    t[0x3E] = op_px(Rol, AbsoluteX, 6);
    t[0x7E] = op_px(Ror, AbsoluteX, 6);

    // Every remaining slot is a documented no-op of fixed length and
    // timing, so the table is total and decode can never fault.
    for opcode in 0..=0xFF_usize {
        if t[opcode].is_none() {
            t[opcode] = Some(cmos_nop(opcode as u8));
        }
    }
}

/// The 65C02's defined no-op for an otherwise-unassigned opcode. Column
/// determines the length, a handful of rows carry odd timings.
fn cmos_nop(opcode: u8) -> Instruction {
    use AddressingMode::{Absolute, Immediate, Implied};

    let (mode, cycles) = match opcode {
        0x44 => (Immediate, 3),
        0x54 | 0xD4 | 0xF4 => (Immediate, 4),
        0x5C => (Absolute, 8),
        0xDC | 0xFC => (Absolute, 4),
        _ if opcode & 0x0F == 0x02 => (Immediate, 2),
        // Columns $x3, $x7, $xB, $xF: single-byte, single-cycle
        _ => (Implied, 1),
    };

    Instruction {
        mnemonic: Mnemonic::Nop,
        mode,
        cycles,
        page_cross_penalty: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nmos_defines_exactly_the_documented_opcodes() {
        let set = InstructionSet::new(Variant::Nmos6502);
        let defined = (0..=0xFF_u8).filter(|&o| set.decode(o).is_some()).count();
        assert_eq!(defined, 151);
    }

    #[test]
    fn cmos_table_is_total() {
        let set = InstructionSet::new(Variant::Cmos65C02);
        for opcode in 0..=0xFF_u8 {
            assert!(set.decode(opcode).is_some(), "hole at ${opcode:02X}");
        }
    }

    #[test]
    fn operand_byte_counts_follow_the_mode() {
        assert_eq!(AddressingMode::Implied.operand_bytes(), 0);
        assert_eq!(AddressingMode::Immediate.operand_bytes(), 1);
        assert_eq!(AddressingMode::AbsoluteX.operand_bytes(), 2);
        assert_eq!(AddressingMode::Relative.operand_bytes(), 1);
    }
}
