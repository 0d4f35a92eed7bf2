//! Cycle-accuracy spot checks against the WDC listing, including the
//! documented penalties.

use super::{cpu_with, to_native16};

/// Run one instruction from a fresh emulation-mode CPU and return its cycle
/// count.
fn cycles_of(program: &[u8], setup: impl FnOnce(&mut crate::cpu_65816::Cpu65816<crate::cpu_65816::ArrayBus>)) -> u32 {
    let mut cpu = cpu_with(program);
    setup(&mut cpu);
    cpu.step()
}

#[test]
fn test_emulation_mode_cycle_table() {
    // (program, expected cycles) with default registers, D=0, 8-bit widths.
    let table: &[(&[u8], u32)] = &[
        (&[0xEA], 2),             // NOP
        (&[0xA9, 0x01], 2),       // LDA #imm
        (&[0xA5, 0x10], 3),       // LDA dp
        (&[0xB5, 0x10], 4),       // LDA dp,X
        (&[0xAD, 0x00, 0x20], 4), // LDA abs
        (&[0xBD, 0x00, 0x20], 4), // LDA abs,X (no cross)
        (&[0xB2, 0x10], 5),       // LDA (dp)
        (&[0xA1, 0x10], 6),       // LDA (dp,X)
        (&[0xB1, 0x10], 5),       // LDA (dp),Y (no cross)
        (&[0xA7, 0x10], 6),       // LDA [dp]
        (&[0xB7, 0x10], 6),       // LDA [dp],Y
        (&[0xAF, 0x00, 0x20, 0x01], 5), // LDA long
        (&[0xA3, 0x02], 4),       // LDA sr,S
        (&[0xB3, 0x02], 7),       // LDA (sr,S),Y
        (&[0x8D, 0x00, 0x20], 4), // STA abs
        (&[0x9D, 0x00, 0x20], 5), // STA abs,X (write penalty always)
        (&[0x99, 0x00, 0x20], 5), // STA abs,Y
        (&[0x91, 0x10], 6),       // STA (dp),Y
        (&[0x0A], 2),             // ASL A
        (&[0x0E, 0x00, 0x20], 6), // ASL abs
        (&[0x1E, 0x00, 0x20], 7), // ASL abs,X
        (&[0x06, 0x10], 5),       // ASL dp
        (&[0xE6, 0x10], 5),       // INC dp
        (&[0xEE, 0x00, 0x20], 6), // INC abs
        (&[0x04, 0x10], 5),       // TSB dp
        (&[0x1C, 0x00, 0x20], 6), // TRB abs
        (&[0x4C, 0x00, 0x90], 3), // JMP abs
        (&[0x6C, 0x00, 0x30], 5), // JMP (abs)
        (&[0x7C, 0x00, 0x30], 6), // JMP (abs,X)
        (&[0x5C, 0x00, 0x90, 0x02], 4), // JML long
        (&[0xDC, 0x00, 0x30], 6), // JML [abs]
        (&[0x20, 0x00, 0x90], 6), // JSR abs
        (&[0xFC, 0x00, 0x30], 8), // JSR (abs,X)
        (&[0x22, 0x00, 0x90, 0x02], 8), // JSL
        (&[0x48], 3),             // PHA
        (&[0x08], 3),             // PHP
        (&[0x8B], 3),             // PHB
        (&[0x4B], 3),             // PHK
        (&[0x0B], 4),             // PHD
        (&[0x68], 4),             // PLA
        (&[0x28], 4),             // PLP
        (&[0xAB], 4),             // PLB
        (&[0x2B], 5),             // PLD
        (&[0xF4, 0x34, 0x12], 5), // PEA
        (&[0xD4, 0x20], 6),       // PEI
        (&[0x62, 0x10, 0x00], 6), // PER
        (&[0xC2, 0x00], 3),       // REP
        (&[0xE2, 0x00], 3),       // SEP
        (&[0xEB], 3),             // XBA
        (&[0xFB], 2),             // XCE
        (&[0xAA], 2),             // TAX
        (&[0xE8], 2),             // INX
        (&[0x18], 2),             // CLC
        (&[0x80, 0x10], 3),       // BRA taken, same page
        (&[0x82, 0x10, 0x00], 4), // BRL
        (&[0xCB], 3),             // WAI
        (&[0xDB], 3),             // STP
        (&[0xC9, 0x01], 2),       // CMP #imm
        (&[0x89, 0x01], 2),       // BIT #imm
        (&[0x2C, 0x00, 0x20], 4), // BIT abs
    ];

    for (program, expected) in table {
        let got = cycles_of(program, |_| {});
        assert_eq!(
            got, *expected,
            "opcode {:02X} expected {} cycles, got {}",
            program[0], expected, got
        );
    }
}

#[test]
fn test_sixteen_bit_accumulator_adds_one_per_data_byte() {
    let table: &[(&[u8], u32)] = &[
        (&[0xA9, 0x01, 0x00], 3), // LDA #imm16
        (&[0xA5, 0x10], 4),       // LDA dp
        (&[0xAD, 0x00, 0x20], 5), // LDA abs
        (&[0x8D, 0x00, 0x20], 5), // STA abs
        (&[0x0E, 0x00, 0x20], 8), // ASL abs (two reads + two writes)
        (&[0x48], 4),             // PHA
        (&[0x68], 5),             // PLA
    ];
    for (program, expected) in table {
        let got = cycles_of(program, |cpu| to_native16(cpu));
        assert_eq!(
            got, *expected,
            "opcode {:02X} expected {} cycles (16-bit), got {}",
            program[0], expected, got
        );
    }
}

#[test]
fn test_index_page_cross_penalty_on_reads() {
    // LDA $20F0,X with X=$20 crosses into $2110.
    let crossed = cycles_of(&[0xBD, 0xF0, 0x20], |cpu| {
        cpu.regs.x = 0x20;
    });
    assert_eq!(crossed, 5);

    let not_crossed = cycles_of(&[0xBD, 0x00, 0x20], |cpu| {
        cpu.regs.x = 0x20;
    });
    assert_eq!(not_crossed, 4);
}

#[test]
fn test_sixteen_bit_index_always_pays_the_read_penalty() {
    let got = cycles_of(&[0xBD, 0x00, 0x20], |cpu| {
        to_native16(cpu);
        cpu.regs.x = 0x0001;
    });
    // 16-bit A (+1) and 16-bit index (+1) over the 4-cycle base.
    assert_eq!(got, 6);
}

#[test]
fn test_store_never_depends_on_crossing() {
    let crossed = cycles_of(&[0x9D, 0xF0, 0x20], |cpu| {
        cpu.regs.x = 0x20;
    });
    let not_crossed = cycles_of(&[0x9D, 0x00, 0x20], |cpu| {
        cpu.regs.x = 0x20;
    });
    assert_eq!(crossed, 5);
    assert_eq!(not_crossed, 5);
}

#[test]
fn test_direct_page_penalty_applies_across_dp_modes() {
    for program in [&[0xA5, 0x10][..], &[0xB2, 0x10][..], &[0x06, 0x10][..]] {
        let base = cycles_of(program, |_| {});
        let penalized = cycles_of(program, |cpu| {
            cpu.regs.d = 0x0001;
        });
        assert_eq!(
            penalized,
            base + 1,
            "dp penalty missing for opcode {:02X}",
            program[0]
        );
    }
}

#[test]
fn test_decimal_mode_costs_nothing_extra() {
    let binary = cycles_of(&[0x69, 0x01], |_| {});
    let decimal = cycles_of(&[0x69, 0x01], |cpu| {
        cpu.regs.p |= crate::cpu_65816::FLAG_DECIMAL;
    });
    assert_eq!(binary, decimal);
}
