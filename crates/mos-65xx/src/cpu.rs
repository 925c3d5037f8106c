//! The execution core.
//!
//! Whole-instruction stepping: each `step` services pending interrupts,
//! then fetches, decodes, resolves and executes exactly one instruction,
//! settling the session clock to the instruction's documented total before
//! returning. Real bus accesses advance the clock as they occur; the
//! settlement at the end covers the internal cycles that never touch the
//! bus, so totals stay exact whether or not a mapped device added cost of
//! its own.

use std::rc::Rc;

use thiserror::Error;

use emu_core::{Bus, Clock, Cpu};

use crate::addressing::{Operand, Resolved};
use crate::flags::{C, D, I, N, V, Z};
use crate::instruction::{AddressingMode, Instruction, InstructionSet, Mnemonic};
use crate::Status;
use crate::registers::Registers;
use crate::variant::Variant;

/// NMI vector location.
pub const NMI_VECTOR: u16 = 0xFFFA;
/// Reset vector location.
pub const RESET_VECTOR: u16 = 0xFFFC;
/// IRQ/BRK vector location.
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Reset and interrupt-service sequences both take seven cycles.
const SEQUENCE_CYCLES: u64 = 7;

/// Fatal conditions that halt the execution loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    /// The active personality has no descriptor for the fetched opcode.
    /// `pc` is where the opcode was fetched; no register was mutated.
    #[error("undefined opcode ${opcode:02X} at ${pc:04X}")]
    UndefinedOpcode { opcode: u8, pc: u16 },
}

/// Execution-loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Constructed but never reset; `step` refuses to run.
    Uninitialized,
    /// Executing instructions.
    Running,
    /// Stopped on a fatal fault. The fault is retained for inspection and
    /// every further `step` reports it again.
    Halted(Fault),
}

/// Why a `step` call did not execute an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("step before reset")]
    Uninitialized,
    #[error(transparent)]
    Faulted(#[from] Fault),
}

/// The MOS 6502-family CPU.
///
/// Owns the register file and the decode table for its [`Variant`]; holds
/// the session clock by reference. The bus is passed into `reset`/`step`
/// so it can be shared with the rest of the session.
#[derive(Debug)]
pub struct Mos65xx {
    /// CPU registers.
    pub regs: Registers,
    instructions: InstructionSet,
    state: State,
    clock: Rc<Clock>,
    /// NMI edge latch - one service per latch, re-latching before service
    /// is idempotent.
    nmi_pending: bool,
    /// IRQ level line - stays asserted until the device releases it.
    irq_asserted: bool,
}

impl Mos65xx {
    /// CPU with a private clock (fine when no bus shares the timeline).
    #[must_use]
    pub fn new(variant: Variant) -> Self {
        Self::with_clock(variant, Rc::new(Clock::new()))
    }

    /// CPU sharing `clock` with the rest of a session.
    #[must_use]
    pub fn with_clock(variant: Variant, clock: Rc<Clock>) -> Self {
        Self {
            regs: Registers::new(),
            instructions: InstructionSet::new(variant),
            state: State::Uninitialized,
            clock,
            nmi_pending: false,
            irq_asserted: false,
        }
    }

    #[must_use]
    pub const fn variant(&self) -> Variant {
        self.instructions.variant()
    }

    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub const fn instructions(&self) -> &InstructionSet {
        &self.instructions
    }

    #[must_use]
    pub const fn clock(&self) -> &Rc<Clock> {
        &self.clock
    }

    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.regs.pc
    }

    /// Drive the IRQ line. Level-sensitive: the CPU keeps servicing it at
    /// instruction boundaries (I permitting) until the device releases it.
    pub fn set_irq(&mut self, asserted: bool) {
        self.irq_asserted = asserted;
    }

    /// Latch an NMI edge. Serviced unconditionally at the next instruction
    /// boundary; the latch clears when serviced.
    pub fn nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Run the reset sequence: force post-reset register state, load PC
    /// from the reset vector, consume the fixed seven cycles, and enter
    /// `Running`. No instruction executes during reset.
    pub fn reset(&mut self, bus: &mut impl Bus) {
        let start = self.clock.current_cycle();
        self.regs = Registers::new();
        self.nmi_pending = false;
        self.irq_asserted = false;
        self.regs.pc = bus.read_word(RESET_VECTOR);
        self.state = State::Running;
        self.settle(start, SEQUENCE_CYCLES);
        log::info!("reset: pc=${:04X}", self.regs.pc);
    }

    /// Execute one instruction.
    ///
    /// Pending interrupts are checked first: NMI is serviced
    /// unconditionally, else IRQ when the I flag is clear. Returns the
    /// cycles consumed, including penalties and any device-side bus cost.
    pub fn step(&mut self, bus: &mut impl Bus) -> Result<u64, StepError> {
        match self.state {
            State::Uninitialized => return Err(StepError::Uninitialized),
            State::Halted(fault) => return Err(fault.into()),
            State::Running => {}
        }

        let start = self.clock.current_cycle();

        if self.nmi_pending {
            self.nmi_pending = false;
            self.service_interrupt(bus, NMI_VECTOR);
            return Ok(self.settle(start, SEQUENCE_CYCLES));
        }
        if self.irq_asserted && !self.regs.p.is_set(I) {
            self.service_interrupt(bus, IRQ_VECTOR);
            return Ok(self.settle(start, SEQUENCE_CYCLES));
        }

        let pc = self.regs.pc;
        let opcode = bus.read(pc);
        let Some(instr) = self.instructions.decode(opcode).copied() else {
            let fault = Fault::UndefinedOpcode { opcode, pc };
            log::error!("halting: {fault}");
            self.state = State::Halted(fault);
            return Err(fault.into());
        };
        self.regs.pc = pc.wrapping_add(1);

        let resolved = self.resolve(bus, instr.mode);

        let mut budget = u64::from(instr.cycles);
        if instr.page_cross_penalty && resolved.page_crossed {
            budget += 1;
        }
        budget += self.execute(bus, instr, &resolved);

        Ok(self.settle(start, budget))
    }

    /// Advance the clock until at least `budget` cycles have elapsed since
    /// `start`; return how many actually did. Bus accesses already on the
    /// clock count toward the budget, and device costs may exceed it.
    fn settle(&self, start: u64, budget: u64) -> u64 {
        while self.clock.current_cycle() - start < budget {
            self.clock.wait_for_next_cycle();
        }
        self.clock.current_cycle() - start
    }

    /// Push PC and status, mask IRQs, and chase `vector`.
    fn service_interrupt(&mut self, bus: &mut impl Bus, vector: u16) {
        log::debug!("interrupt: vector=${vector:04X} pc=${:04X}", self.regs.pc);
        self.push_word(bus, self.regs.pc);
        self.push(bus, self.regs.p.for_push(false));
        self.regs.p.set(I);
        if self.variant().interrupts_clear_decimal() {
            self.regs.p.clear(D);
        }
        self.regs.pc = bus.read_word(vector);
    }

    /// Apply the instruction's register/flag/memory effects. Returns extra
    /// cycles owed beyond the descriptor's base count and page-cross
    /// penalty (branches taken, CMOS decimal arithmetic).
    fn execute(&mut self, bus: &mut impl Bus, instr: Instruction, resolved: &Resolved) -> u64 {
        use Mnemonic::*;

        match instr.mnemonic {
            // Loads and stores
            Lda => {
                let value = self.operand_value(bus, resolved);
                self.regs.a = value;
                self.regs.p.update_nz(value);
                0
            }
            Ldx => {
                let value = self.operand_value(bus, resolved);
                self.regs.x = value;
                self.regs.p.update_nz(value);
                0
            }
            Ldy => {
                let value = self.operand_value(bus, resolved);
                self.regs.y = value;
                self.regs.p.update_nz(value);
                0
            }
            Sta => self.store(bus, resolved, self.regs.a),
            Stx => self.store(bus, resolved, self.regs.x),
            Sty => self.store(bus, resolved, self.regs.y),
            Stz => self.store(bus, resolved, 0),

            // Register transfers
            Tax => {
                self.regs.x = self.regs.a;
                self.regs.p.update_nz(self.regs.x);
                0
            }
            Tay => {
                self.regs.y = self.regs.a;
                self.regs.p.update_nz(self.regs.y);
                0
            }
            Txa => {
                self.regs.a = self.regs.x;
                self.regs.p.update_nz(self.regs.a);
                0
            }
            Tya => {
                self.regs.a = self.regs.y;
                self.regs.p.update_nz(self.regs.a);
                0
            }
            Tsx => {
                self.regs.x = self.regs.s;
                self.regs.p.update_nz(self.regs.x);
                0
            }
            Txs => {
                // The one transfer that leaves the flags alone
                self.regs.s = self.regs.x;
                0
            }

            // Stack
            Pha => {
                self.push(bus, self.regs.a);
                0
            }
            Phx => {
                self.push(bus, self.regs.x);
                0
            }
            Phy => {
                self.push(bus, self.regs.y);
                0
            }
            Php => {
                let value = self.regs.p.for_push(true);
                self.push(bus, value);
                0
            }
            Pla => {
                self.regs.a = self.pull(bus);
                self.regs.p.update_nz(self.regs.a);
                0
            }
            Plx => {
                self.regs.x = self.pull(bus);
                self.regs.p.update_nz(self.regs.x);
                0
            }
            Ply => {
                self.regs.y = self.pull(bus);
                self.regs.p.update_nz(self.regs.y);
                0
            }
            Plp => {
                let value = self.pull(bus);
                self.regs.p = Status::from_pull(value);
                0
            }

            // Logical
            And => {
                let value = self.operand_value(bus, resolved);
                self.regs.a &= value;
                self.regs.p.update_nz(self.regs.a);
                0
            }
            Ora => {
                let value = self.operand_value(bus, resolved);
                self.regs.a |= value;
                self.regs.p.update_nz(self.regs.a);
                0
            }
            Eor => {
                let value = self.operand_value(bus, resolved);
                self.regs.a ^= value;
                self.regs.p.update_nz(self.regs.a);
                0
            }
            Bit => {
                let value = self.operand_value(bus, resolved);
                self.regs.p.set_if(Z, self.regs.a & value == 0);
                // The immediate form tests Z only; the others copy N and V
                // straight from the operand
                if instr.mode != AddressingMode::Immediate {
                    self.regs.p.set_if(N, value & 0x80 != 0);
                    self.regs.p.set_if(V, value & 0x40 != 0);
                }
                0
            }
            Trb => {
                let addr = self.address_of(resolved);
                let value = bus.read(addr);
                self.regs.p.set_if(Z, self.regs.a & value == 0);
                bus.write(addr, value & !self.regs.a);
                0
            }
            Tsb => {
                let addr = self.address_of(resolved);
                let value = bus.read(addr);
                self.regs.p.set_if(Z, self.regs.a & value == 0);
                bus.write(addr, value | self.regs.a);
                0
            }

            // Arithmetic
            Adc => {
                let value = self.operand_value(bus, resolved);
                self.adc(value)
            }
            Sbc => {
                let value = self.operand_value(bus, resolved);
                self.sbc(value)
            }
            Cmp => {
                let value = self.operand_value(bus, resolved);
                self.compare(self.regs.a, value);
                0
            }
            Cpx => {
                let value = self.operand_value(bus, resolved);
                self.compare(self.regs.x, value);
                0
            }
            Cpy => {
                let value = self.operand_value(bus, resolved);
                self.compare(self.regs.y, value);
                0
            }

            // Increment/decrement
            Inc => self.modify(bus, resolved, Self::inc_value),
            Dec => self.modify(bus, resolved, Self::dec_value),
            Inx => {
                self.regs.x = self.regs.x.wrapping_add(1);
                self.regs.p.update_nz(self.regs.x);
                0
            }
            Iny => {
                self.regs.y = self.regs.y.wrapping_add(1);
                self.regs.p.update_nz(self.regs.y);
                0
            }
            Dex => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.regs.p.update_nz(self.regs.x);
                0
            }
            Dey => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.regs.p.update_nz(self.regs.y);
                0
            }

            // Shifts and rotates
            Asl => self.modify(bus, resolved, Self::asl_value),
            Lsr => self.modify(bus, resolved, Self::lsr_value),
            Rol => self.modify(bus, resolved, Self::rol_value),
            Ror => self.modify(bus, resolved, Self::ror_value),

            // Jumps and subroutines
            Jmp => {
                self.regs.pc = self.address_of(resolved);
                0
            }
            Jsr => {
                // Return address is the last byte of the JSR itself
                let target = self.address_of(resolved);
                let ret = self.regs.pc.wrapping_sub(1);
                self.push_word(bus, ret);
                self.regs.pc = target;
                0
            }
            Rts => {
                self.regs.pc = self.pull_word(bus).wrapping_add(1);
                0
            }
            Rti => {
                let status = self.pull(bus);
                self.regs.p = Status::from_pull(status);
                self.regs.pc = self.pull_word(bus);
                0
            }
            Brk => {
                // The byte after BRK is a signature byte: fetched, skipped
                let _ = self.fetch(bus);
                self.push_word(bus, self.regs.pc);
                let pushed = self.regs.p.for_push(true);
                self.push(bus, pushed);
                self.regs.p.set(I);
                if self.variant().interrupts_clear_decimal() {
                    self.regs.p.clear(D);
                }
                self.regs.pc = bus.read_word(IRQ_VECTOR);
                0
            }

            // Branches
            Bcc => self.branch(resolved, !self.regs.p.is_set(C)),
            Bcs => self.branch(resolved, self.regs.p.is_set(C)),
            Beq => self.branch(resolved, self.regs.p.is_set(Z)),
            Bne => self.branch(resolved, !self.regs.p.is_set(Z)),
            Bmi => self.branch(resolved, self.regs.p.is_set(N)),
            Bpl => self.branch(resolved, !self.regs.p.is_set(N)),
            Bvc => self.branch(resolved, !self.regs.p.is_set(V)),
            Bvs => self.branch(resolved, self.regs.p.is_set(V)),
            Bra => self.branch(resolved, true),

            // Flag manipulation
            Clc => {
                self.regs.p.clear(C);
                0
            }
            Sec => {
                self.regs.p.set(C);
                0
            }
            Cli => {
                self.regs.p.clear(I);
                0
            }
            Sei => {
                self.regs.p.set(I);
                0
            }
            Cld => {
                self.regs.p.clear(D);
                0
            }
            Sed => {
                self.regs.p.set(D);
                0
            }
            Clv => {
                self.regs.p.clear(V);
                0
            }

            Nop => 0,
        }
    }

    // =========================================================================
    // Operand plumbing
    // =========================================================================

    fn operand_value(&mut self, bus: &mut impl Bus, resolved: &Resolved) -> u8 {
        match resolved.operand {
            Operand::Immediate(value) => value,
            Operand::Address(addr) => bus.read(addr),
            Operand::Accumulator => self.regs.a,
            Operand::None => unreachable!("instruction requires an operand"),
        }
    }

    fn address_of(&self, resolved: &Resolved) -> u16 {
        match resolved.operand {
            Operand::Address(addr) => addr,
            _ => unreachable!("instruction requires a memory operand"),
        }
    }

    fn store(&mut self, bus: &mut impl Bus, resolved: &Resolved, value: u8) -> u64 {
        bus.write(self.address_of(resolved), value);
        0
    }

    /// Read-modify-write plumbing, shared by the memory and accumulator
    /// forms of the shift/rotate/increment/decrement family.
    fn modify(
        &mut self,
        bus: &mut impl Bus,
        resolved: &Resolved,
        f: fn(&mut Self, u8) -> u8,
    ) -> u64 {
        match resolved.operand {
            Operand::Accumulator => {
                let value = self.regs.a;
                self.regs.a = f(self, value);
            }
            Operand::Address(addr) => {
                let value = bus.read(addr);
                let result = f(self, value);
                bus.write(addr, result);
            }
            _ => unreachable!("read-modify-write requires a writable operand"),
        }
        0
    }

    fn branch(&mut self, resolved: &Resolved, taken: bool) -> u64 {
        if !taken {
            return 0;
        }
        self.regs.pc = self.address_of(resolved);
        1 + u64::from(resolved.page_crossed)
    }

    // =========================================================================
    // ALU
    // =========================================================================

    fn compare(&mut self, register: u8, value: u8) {
        let result = register.wrapping_sub(value);
        self.regs.p.set_if(C, register >= value);
        self.regs.p.update_nz(result);
    }

    fn asl_value(&mut self, value: u8) -> u8 {
        self.regs.p.set_if(C, value & 0x80 != 0);
        let result = value << 1;
        self.regs.p.update_nz(result);
        result
    }

    fn lsr_value(&mut self, value: u8) -> u8 {
        self.regs.p.set_if(C, value & 0x01 != 0);
        let result = value >> 1;
        self.regs.p.update_nz(result);
        result
    }

    fn rol_value(&mut self, value: u8) -> u8 {
        let carry_in = u8::from(self.regs.p.is_set(C));
        self.regs.p.set_if(C, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.regs.p.update_nz(result);
        result
    }

    fn ror_value(&mut self, value: u8) -> u8 {
        let carry_in = if self.regs.p.is_set(C) { 0x80 } else { 0 };
        self.regs.p.set_if(C, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.regs.p.update_nz(result);
        result
    }

    fn inc_value(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.regs.p.update_nz(result);
        result
    }

    fn dec_value(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.regs.p.update_nz(result);
        result
    }

    /// ADC - add with carry. Returns the extra cycle the 65C02 spends on
    /// the decimal form.
    fn adc(&mut self, value: u8) -> u64 {
        if self.regs.p.is_set(D) {
            self.adc_decimal(value);
            u64::from(self.variant().decimal_extra_cycle())
        } else {
            self.adc_binary(value);
            0
        }
    }

    fn adc_binary(&mut self, value: u8) {
        let a = self.regs.a;
        let carry = u16::from(self.regs.p.is_set(C));
        let sum = u16::from(a) + u16::from(value) + carry;
        let result = sum as u8;

        self.regs.p.set_if(C, sum > 0xFF);
        self.regs
            .p
            .set_if(V, (a ^ result) & (value ^ result) & 0x80 != 0);
        self.regs.a = result;
        self.regs.p.update_nz(result);
    }

    fn adc_decimal(&mut self, value: u8) {
        let a = self.regs.a;
        let carry = u8::from(self.regs.p.is_set(C));

        let mut low = (a & 0x0F) + (value & 0x0F) + carry;
        if low > 9 {
            low += 6;
        }
        let mut high = (a >> 4) + (value >> 4) + u8::from(low > 0x0F);

        // V always comes from the binary intermediate; N is sampled from
        // the high nibble before its fixup on NMOS parts
        let binary = (u16::from(a) + u16::from(value) + u16::from(carry)) as u8;
        self.regs
            .p
            .set_if(V, (a ^ binary) & (value ^ binary) & 0x80 != 0);
        let nmos_negative = high & 0x08 != 0;

        if high > 9 {
            high += 6;
        }
        self.regs.p.set_if(C, high > 0x0F);
        let result = (high << 4) | (low & 0x0F);
        self.regs.a = result;

        if self.variant().decimal_flags_from_result() {
            self.regs.p.update_nz(result);
        } else {
            self.regs.p.set_if(Z, binary == 0);
            self.regs.p.set_if(N, nmos_negative);
        }
    }

    /// SBC - subtract with borrow. Returns the extra cycle the 65C02
    /// spends on the decimal form.
    fn sbc(&mut self, value: u8) -> u64 {
        if self.regs.p.is_set(D) {
            self.sbc_decimal(value);
            u64::from(self.variant().decimal_extra_cycle())
        } else {
            // SBC is ADC with the operand inverted
            self.adc_binary(!value);
            0
        }
    }

    fn sbc_decimal(&mut self, value: u8) {
        let a = self.regs.a;
        let borrow = i16::from(!self.regs.p.is_set(C));

        // The binary difference drives C and V (and N/Z on NMOS parts)
        let binary = i16::from(a) - i16::from(value) - borrow;
        self.regs.p.set_if(C, binary >= 0);
        self.regs.p.set_if(
            V,
            (i16::from(a) ^ binary) & (i16::from(a) ^ i16::from(value)) & 0x80 != 0,
        );

        let mut low = i16::from(a & 0x0F) - i16::from(value & 0x0F) - borrow;
        let mut high = i16::from(a >> 4) - i16::from(value >> 4);
        if low < 0 {
            low -= 6;
            high -= 1;
        }
        if high < 0 {
            high -= 6;
        }
        let result = ((high << 4) as u8) | ((low & 0x0F) as u8);
        self.regs.a = result;

        if self.variant().decimal_flags_from_result() {
            self.regs.p.update_nz(result);
        } else {
            self.regs.p.set_if(Z, (binary as u8) == 0);
            self.regs.p.set_if(N, binary & 0x80 != 0);
        }
    }
}

impl<B: Bus> Cpu<B> for Mos65xx {
    type Error = StepError;

    fn reset(&mut self, bus: &mut B) {
        Mos65xx::reset(self, bus);
    }

    fn step(&mut self, bus: &mut B) -> Result<u64, StepError> {
        Mos65xx::step(self, bus)
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn set_irq(&mut self, asserted: bool) {
        Mos65xx::set_irq(self, asserted);
    }

    fn nmi(&mut self) {
        Mos65xx::nmi(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat 64 KiB RAM with no clock of its own; the CPU settles every
    /// cycle itself.
    struct FlatBus {
        ram: [u8; 0x10000],
    }

    impl FlatBus {
        fn new() -> Self {
            Self { ram: [0; 0x10000] }
        }
    }

    impl Bus for FlatBus {
        fn read(&mut self, address: u16) -> u8 {
            self.ram[address as usize]
        }

        fn write(&mut self, address: u16, value: u8) {
            self.ram[address as usize] = value;
        }
    }

    fn running_cpu(variant: Variant, bus: &mut FlatBus, program: &[u8]) -> Mos65xx {
        bus.write_range(0xFFFC, &[0x00, 0x02]);
        bus.write_range(0x0200, program);
        let mut cpu = Mos65xx::new(variant);
        cpu.reset(bus);
        cpu
    }

    #[test]
    fn step_before_reset_is_refused() {
        let mut bus = FlatBus::new();
        let mut cpu = Mos65xx::new(Variant::Nmos6502);
        assert_eq!(cpu.step(&mut bus), Err(StepError::Uninitialized));
    }

    #[test]
    fn reset_loads_vector_and_costs_seven_cycles() {
        let mut bus = FlatBus::new();
        let cpu = running_cpu(Variant::Nmos6502, &mut bus, &[]);
        assert_eq!(cpu.pc(), 0x0200);
        assert_eq!(cpu.state(), State::Running);
        assert_eq!(cpu.clock().current_cycle(), 7);
    }

    #[test]
    fn immediate_load_takes_two_cycles() {
        let mut bus = FlatBus::new();
        let mut cpu = running_cpu(Variant::Nmos6502, &mut bus, &[0xA9, 0x42]);
        let cycles = cpu.step(&mut bus).expect("running");
        assert_eq!(cycles, 2);
        assert_eq!(cpu.regs.a, 0x42);
        assert_eq!(cpu.pc(), 0x0202);
    }

    #[test]
    fn cpu_trait_seam_drives_the_core() {
        fn boot_and_step<B: Bus, C: Cpu<B>>(cpu: &mut C, bus: &mut B) -> Result<u64, C::Error> {
            cpu.reset(bus);
            cpu.step(bus)
        }

        let mut bus = FlatBus::new();
        bus.write_range(0xFFFC, &[0x00, 0x02]);
        bus.write_range(0x0200, &[0xEA]);

        let mut cpu = Mos65xx::new(Variant::Cmos65C02);
        let cycles = boot_and_step(&mut cpu, &mut bus).expect("NOP runs");
        assert_eq!(cycles, 2);
    }

    #[test]
    fn undefined_opcode_halts_without_touching_registers() {
        let mut bus = FlatBus::new();
        // $02 is undefined on the NMOS part
        let mut cpu = running_cpu(Variant::Nmos6502, &mut bus, &[0x02]);
        let before = cpu.regs;

        let err = cpu.step(&mut bus).expect_err("must fault");
        assert_eq!(
            err,
            StepError::Faulted(Fault::UndefinedOpcode {
                opcode: 0x02,
                pc: 0x0200
            })
        );
        assert_eq!(cpu.regs, before, "failed decode must not mutate registers");
        assert_eq!(
            cpu.state(),
            State::Halted(Fault::UndefinedOpcode {
                opcode: 0x02,
                pc: 0x0200
            })
        );

        // Halted is sticky
        assert!(cpu.step(&mut bus).is_err());
    }
}
