//! Cycle-count properties: page-cross penalties, branch penalties,
//! store/RMW fixed costs, decimal-mode timing, and device-side bus cost.

use emu_core::Region;
use mos_65xx::{System, Variant};

fn boot(variant: Variant, program: &[u8]) -> System {
    let mut system = System::builder(variant)
        .ram(0x0000, 0x10000)
        .reset_vector(0x0200)
        .load(0x0200, program)
        .build()
        .expect("valid session");
    system.reset();
    system
}

/// Step once and return the cycle count.
fn one(system: &mut System) -> u64 {
    system.step().expect("program must keep running")
}

#[test]
fn absolute_indexed_read_pays_only_on_page_cross() {
    // LDX #$01; LDA $10F0,X (no cross); LDA $10FF,X (cross)
    let mut system = boot(
        Variant::Nmos6502,
        &[0xA2, 0x01, 0xBD, 0xF0, 0x10, 0xBD, 0xFF, 0x10],
    );

    assert_eq!(one(&mut system), 2, "LDX immediate");
    assert_eq!(one(&mut system), 4, "no page cross");
    assert_eq!(one(&mut system), 5, "page cross owes one cycle");
}

#[test]
fn absolute_indexed_store_is_always_five() {
    // STA is write-only: the fixed extra cycle is in the base count and
    // crossing the page costs nothing more
    let mut system = boot(
        Variant::Nmos6502,
        &[0xA2, 0x01, 0x9D, 0xF0, 0x10, 0x9D, 0xFF, 0x10],
    );

    assert_eq!(one(&mut system), 2);
    assert_eq!(one(&mut system), 5, "no cross: still 5");
    assert_eq!(one(&mut system), 5, "cross: still 5");
}

#[test]
fn indirect_indexed_read_pays_only_on_page_cross() {
    let mut system = System::builder(Variant::Nmos6502)
        .ram(0x0000, 0x10000)
        .reset_vector(0x0200)
        .load(0x0040, &[0xF0, 0x10]) // pointer -> $10F0
        .load(
            0x0200,
            &[
                0xA0, 0x01, // LDY #$01
                0xB1, 0x40, // LDA ($40),Y -> $10F1, same page
                0xA0, 0x20, // LDY #$20
                0xB1, 0x40, // LDA ($40),Y -> $1110, crossed
                0x91, 0x40, // STA ($40),Y -> always 6
            ],
        )
        .build()
        .expect("valid session");
    system.reset();

    assert_eq!(one(&mut system), 2);
    assert_eq!(one(&mut system), 5, "same page");
    assert_eq!(one(&mut system), 2);
    assert_eq!(one(&mut system), 6, "page cross owes one cycle");
    assert_eq!(one(&mut system), 6, "store cost is fixed");
}

#[test]
fn branch_costs_two_three_or_four() {
    // BNE not taken (Z set), BEQ taken same page, BEQ taken across a page
    let mut system = boot(
        Variant::Nmos6502,
        &[
            0xA9, 0x00, // LDA #$00        @ $0200
            0xD0, 0x10, // BNE (not taken) @ $0202
            0xF0, 0x02, // BEQ +2          @ $0204
            0xEA, 0xEA, //                 @ $0206
            0xF0, 0x76, // BEQ +$76        @ $0208 -> $0280, same page
        ],
    );

    assert_eq!(one(&mut system), 2);
    assert_eq!(one(&mut system), 2, "branch not taken");
    assert_eq!(one(&mut system), 3, "taken within the page");

    // Land a page-crossing branch: BEQ from $0280 back into page $01
    let mut cross = boot(
        Variant::Nmos6502,
        &[
            0xA9, 0x00, // LDA #$00  @ $0200
            0xF0, 0xFC, // BEQ -4    @ $0202 -> $0200, crosses? no: same page
        ],
    );
    assert_eq!(one(&mut cross), 2);
    assert_eq!(one(&mut cross), 3, "backward within the page");

    let mut far = boot(
        Variant::Nmos6502,
        &[
            0xA9, 0x00, // LDA #$00  @ $0200
            0xF0, 0x80, // BEQ -$80  @ $0202 -> $0184, crosses into page $01
        ],
    );
    assert_eq!(one(&mut far), 2);
    assert_eq!(one(&mut far), 4, "taken across a page");
    assert_eq!(far.cpu().pc(), 0x0184);
}

#[test]
fn rmw_absolute_x_timing_differs_by_variant() {
    let program = [
        0xA2, 0x01, // LDX #$01
        0x1E, 0xF0, 0x10, // ASL $10F0,X (no cross)
        0x1E, 0xFF, 0x10, // ASL $10FF,X (cross)
    ];

    // NMOS: flat 7 regardless of crossing
    let mut nmos = boot(Variant::Nmos6502, &program);
    assert_eq!(one(&mut nmos), 2);
    assert_eq!(one(&mut nmos), 7);
    assert_eq!(one(&mut nmos), 7);

    // 65C02: 6, plus one on a cross
    let mut cmos = boot(Variant::Cmos65C02, &program);
    assert_eq!(one(&mut cmos), 2);
    assert_eq!(one(&mut cmos), 6);
    assert_eq!(one(&mut cmos), 7);

    // INC keeps the flat 7 on both parts
    let inc_program = [0xA2, 0x01, 0xFE, 0xF0, 0x10];
    let mut inc = boot(Variant::Cmos65C02, &inc_program);
    assert_eq!(one(&mut inc), 2);
    assert_eq!(one(&mut inc), 7);
}

#[test]
fn decimal_arithmetic_costs_an_extra_cycle_on_cmos_only() {
    let program = [
        0xF8, // SED
        0xA9, 0x05, // LDA #$05
        0x69, 0x05, // ADC #$05
        0xE9, 0x01, // SBC #$01
    ];

    let mut nmos = boot(Variant::Nmos6502, &program);
    assert_eq!(one(&mut nmos), 2);
    assert_eq!(one(&mut nmos), 2);
    assert_eq!(one(&mut nmos), 2, "NMOS decimal ADC stays at 2");
    assert_eq!(one(&mut nmos), 2, "NMOS decimal SBC stays at 2");

    let mut cmos = boot(Variant::Cmos65C02, &program);
    assert_eq!(one(&mut cmos), 2);
    assert_eq!(one(&mut cmos), 2);
    assert_eq!(one(&mut cmos), 3, "65C02 decimal ADC pays a cycle");
    assert_eq!(one(&mut cmos), 3, "65C02 decimal SBC pays a cycle");
}

#[test]
fn jump_and_subroutine_costs() {
    let mut system = System::builder(Variant::Nmos6502)
        .ram(0x0000, 0x10000)
        .reset_vector(0x0200)
        .load(0x0300, &[0x60]) // RTS
        .load(
            0x0200,
            &[
                0x20, 0x00, 0x03, // JSR $0300
                0x4C, 0x07, 0x02, // JMP $0207
                0xEA,
            ],
        )
        .build()
        .expect("valid session");
    system.reset();

    assert_eq!(one(&mut system), 6, "JSR");
    assert_eq!(one(&mut system), 6, "RTS");
    assert_eq!(one(&mut system), 3, "JMP absolute");
}

#[test]
fn jmp_indirect_is_five_on_nmos_six_on_cmos() {
    let setup = |variant| {
        let mut system = System::builder(variant)
            .ram(0x0000, 0x10000)
            .reset_vector(0x0200)
            .load(0x1000, &[0x00, 0x30])
            .load(0x0200, &[0x6C, 0x00, 0x10])
            .build()
            .expect("valid session");
        system.reset();
        system
    };

    let mut nmos = setup(Variant::Nmos6502);
    assert_eq!(one(&mut nmos), 5);

    let mut cmos = setup(Variant::Cmos65C02);
    assert_eq!(one(&mut cmos), 6);
}

#[test]
fn cmos_defined_nops_have_documented_lengths_and_timings() {
    // $5C: three bytes, eight cycles; $02: two bytes, two cycles;
    // $03: one byte, one cycle
    let mut system = boot(
        Variant::Cmos65C02,
        &[0x5C, 0x00, 0x00, 0x02, 0x00, 0x03, 0xEA],
    );

    assert_eq!(one(&mut system), 8);
    assert_eq!(system.cpu().pc(), 0x0203);

    assert_eq!(one(&mut system), 2);
    assert_eq!(system.cpu().pc(), 0x0205);

    assert_eq!(one(&mut system), 1);
    assert_eq!(system.cpu().pc(), 0x0206);
}

#[test]
fn device_bus_cost_lands_in_the_instruction_total() {
    /// One-byte port that charges three extra cycles per access.
    struct SlowPort;

    impl Region for SlowPort {
        fn read(&mut self, _offset: u16) -> u8 {
            0x77
        }
        fn write(&mut self, _offset: u16, _value: u8) {}
        fn size(&self) -> usize {
            1
        }
        fn access_cycles(&self) -> u64 {
            3
        }
    }

    let mut system = System::builder(Variant::Nmos6502)
        .ram(0x0000, 0xD000)
        .device(0xD000, SlowPort)
        .ram(0xD001, 0x2FFF)
        .load(0x0200, &[0xAD, 0x00, 0xD0, 0x8D, 0x00, 0xD0])
        .reset_vector(0x0200)
        .build()
        .expect("valid session");
    system.reset();

    // LDA $D000: 4 base cycles + 3 device cycles on the data read
    assert_eq!(one(&mut system), 7);
    assert_eq!(system.cpu().regs.a, 0x77);

    // STA $D000: same accounting on the write
    assert_eq!(one(&mut system), 7);
}

#[test]
fn ram_round_trip_pays_the_documented_access_cost() {
    // STA $10 is 3 cycles (opcode, operand, data write); LDA $10 the same
    // shape with a data read
    let mut system = boot(Variant::Nmos6502, &[0xA9, 0x5A, 0x85, 0x10, 0xA5, 0x10]);

    assert_eq!(one(&mut system), 2);
    let before = system.clock().current_cycle();
    assert_eq!(one(&mut system), 3, "write access");
    assert_eq!(one(&mut system), 3, "read access");
    assert_eq!(system.clock().current_cycle() - before, 6);
    assert_eq!(system.cpu().regs.a, 0x5A);
}
