//! Addressing-mode resolution.
//!
//! Given the current PC and a mode, the resolver consumes the operand
//! bytes (and any pointer reads) through the bus and produces the operand
//! location plus a page-cross marker. Whether a crossing actually costs a
//! cycle is the decode table's call, not the resolver's — store and
//! read-modify-write forms carry the cost in their base count.

use emu_core::Bus;

use crate::Mos65xx;
use crate::instruction::AddressingMode;

/// Where an instruction's operand lives once its mode is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// No operand (implied instructions).
    None,
    /// The accumulator itself.
    Accumulator,
    /// A literal byte fetched from the instruction stream.
    Immediate(u8),
    /// An effective memory address (branch targets included).
    Address(u16),
}

/// Outcome of resolving one addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub operand: Operand,
    /// Whether indexing (or a branch target) crossed a page boundary.
    pub page_crossed: bool,
}

impl Resolved {
    const fn at(addr: u16) -> Self {
        Self {
            operand: Operand::Address(addr),
            page_crossed: false,
        }
    }

    const fn crossing(addr: u16, page_crossed: bool) -> Self {
        Self {
            operand: Operand::Address(addr),
            page_crossed,
        }
    }
}

const fn page_of(addr: u16) -> u16 {
    addr & 0xFF00
}

impl Mos65xx {
    /// Fetch the next instruction byte and advance PC.
    pub(crate) fn fetch(&mut self, bus: &mut impl Bus) -> u8 {
        let value = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    /// Fetch a little-endian 16-bit word from the instruction stream.
    pub(crate) fn fetch_word(&mut self, bus: &mut impl Bus) -> u16 {
        let low = self.fetch(bus);
        let high = self.fetch(bus);
        u16::from_le_bytes([low, high])
    }

    /// Read a 16-bit pointer from page zero, wrapping within the page.
    fn read_zp_word(&mut self, bus: &mut impl Bus, pointer: u8) -> u16 {
        let low = bus.read(u16::from(pointer));
        let high = bus.read(u16::from(pointer.wrapping_add(1)));
        u16::from_le_bytes([low, high])
    }

    /// Push a byte onto the stack.
    pub(crate) fn push(&mut self, bus: &mut impl Bus, value: u8) {
        bus.write(0x0100 | u16::from(self.regs.s), value);
        self.regs.s = self.regs.s.wrapping_sub(1);
    }

    /// Pull a byte from the stack.
    pub(crate) fn pull(&mut self, bus: &mut impl Bus) -> u8 {
        self.regs.s = self.regs.s.wrapping_add(1);
        bus.read(0x0100 | u16::from(self.regs.s))
    }

    /// Push a 16-bit word (high byte first, as the hardware does).
    pub(crate) fn push_word(&mut self, bus: &mut impl Bus, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, value as u8);
    }

    /// Pull a 16-bit word (low byte first).
    pub(crate) fn pull_word(&mut self, bus: &mut impl Bus) -> u16 {
        let low = self.pull(bus);
        let high = self.pull(bus);
        u16::from_le_bytes([low, high])
    }

    /// Resolve `mode` against the current PC.
    pub(crate) fn resolve(&mut self, bus: &mut impl Bus, mode: AddressingMode) -> Resolved {
        match mode {
            AddressingMode::Implied => Resolved {
                operand: Operand::None,
                page_crossed: false,
            },
            AddressingMode::Accumulator => Resolved {
                operand: Operand::Accumulator,
                page_crossed: false,
            },
            AddressingMode::Immediate => {
                let value = self.fetch(bus);
                Resolved {
                    operand: Operand::Immediate(value),
                    page_crossed: false,
                }
            }
            AddressingMode::ZeroPage => Resolved::at(u16::from(self.fetch(bus))),
            AddressingMode::ZeroPageX => {
                let base = self.fetch(bus);
                Resolved::at(u16::from(base.wrapping_add(self.regs.x)))
            }
            AddressingMode::ZeroPageY => {
                let base = self.fetch(bus);
                Resolved::at(u16::from(base.wrapping_add(self.regs.y)))
            }
            AddressingMode::Absolute => Resolved::at(self.fetch_word(bus)),
            AddressingMode::AbsoluteX => self.absolute_indexed(bus, self.regs.x),
            AddressingMode::AbsoluteY => self.absolute_indexed(bus, self.regs.y),
            AddressingMode::Indirect => {
                let pointer = self.fetch_word(bus);
                let target = if self.variant().has_indirect_jmp_bug() {
                    // ($xxFF) reads its high byte from $xx00, not $xx00+$100
                    let low = bus.read(pointer);
                    let high_addr = (pointer & 0xFF00) | (pointer.wrapping_add(1) & 0x00FF);
                    let high = bus.read(high_addr);
                    u16::from_le_bytes([low, high])
                } else {
                    bus.read_word(pointer)
                };
                Resolved::at(target)
            }
            AddressingMode::IndexedIndirect => {
                let base = self.fetch(bus);
                let pointer = base.wrapping_add(self.regs.x);
                let addr = self.read_zp_word(bus, pointer);
                Resolved::at(addr)
            }
            AddressingMode::IndirectIndexed => {
                let pointer = self.fetch(bus);
                let base = self.read_zp_word(bus, pointer);
                let addr = base.wrapping_add(u16::from(self.regs.y));
                Resolved::crossing(addr, page_of(base) != page_of(addr))
            }
            AddressingMode::ZeroPageIndirect => {
                let pointer = self.fetch(bus);
                let addr = self.read_zp_word(bus, pointer);
                Resolved::at(addr)
            }
            AddressingMode::AbsoluteIndexedIndirect => {
                let pointer = self.fetch_word(bus).wrapping_add(u16::from(self.regs.x));
                Resolved::at(bus.read_word(pointer))
            }
            AddressingMode::Relative => {
                let offset = self.fetch(bus) as i8;
                let target = self.regs.pc.wrapping_add(offset as u16);
                Resolved::crossing(target, page_of(target) != page_of(self.regs.pc))
            }
        }
    }

    fn absolute_indexed(&mut self, bus: &mut impl Bus, index: u8) -> Resolved {
        let base = self.fetch_word(bus);
        let addr = base.wrapping_add(u16::from(index));
        Resolved::crossing(addr, page_of(base) != page_of(addr))
    }
}
