//! M/X width switching, REP/SEP, and the width-safety invariants.

use super::{cpu_with, to_native16};
use crate::cpu_65816::{FLAG_INDEX, FLAG_MEMORY, FLAG_ZERO};

#[test]
fn test_rep_sep_toggle_widths_in_native() {
    let mut cpu = cpu_with(&[0xC2, 0x30, 0xE2, 0x30]); // REP #$30, SEP #$30
    cpu.pins.emulation = false;

    let cycles = cpu.step();
    assert_eq!(cycles, 3);
    assert!(!cpu.get_flag(FLAG_MEMORY));
    assert!(!cpu.get_flag(FLAG_INDEX));

    cpu.step();
    assert!(cpu.get_flag(FLAG_MEMORY));
    assert!(cpu.get_flag(FLAG_INDEX));
}

#[test]
fn test_rep_cannot_clear_m_x_in_emulation() {
    let mut cpu = cpu_with(&[0xC2, 0x30]);
    cpu.step();
    assert!(cpu.get_flag(FLAG_MEMORY));
    assert!(cpu.get_flag(FLAG_INDEX));
}

#[test]
fn test_sep_index_zeroes_high_bytes() {
    let mut cpu = cpu_with(&[0xE2, 0x10]); // SEP #$10
    to_native16(&mut cpu);
    cpu.regs.x = 0x1234;
    cpu.regs.y = 0x5678;
    cpu.step();
    assert_eq!(cpu.regs.x, 0x0034);
    assert_eq!(cpu.regs.y, 0x0078);
}

#[test]
fn test_accumulator_high_byte_survives_8bit_ops() {
    let mut cpu = cpu_with(&[0xA9, 0x42]); // LDA #$42, M=1
    cpu.regs.a = 0xAB00;
    cpu.step();
    assert_eq!(cpu.regs.a, 0xAB42);
}

#[test]
fn test_get_set_accumulator_widths() {
    let mut cpu = cpu_with(&[]);
    cpu.set_a(0x1234);
    assert_eq!(cpu.get_a(), 0x34); // 8-bit in emulation

    to_native16(&mut cpu);
    cpu.set_a(0x1234);
    assert_eq!(cpu.get_a(), 0x1234);
}

#[test]
fn test_ldx_16bit_and_inx_wrap() {
    let mut cpu = cpu_with(&[0xA2, 0xFF, 0xFF, 0xE8]); // LDX #$FFFF, INX
    to_native16(&mut cpu);
    cpu.step();
    assert_eq!(cpu.regs.x, 0xFFFF);
    cpu.step();
    assert_eq!(cpu.regs.x, 0x0000);
    assert!(cpu.get_flag(FLAG_ZERO));
}

#[test]
fn test_inx_wraps_at_8bit_width() {
    let mut cpu = cpu_with(&[0xE8]);
    cpu.regs.x = 0x00FF;
    cpu.step();
    assert_eq!(cpu.regs.x, 0x0000);
    assert!(cpu.get_flag(FLAG_ZERO));
}

#[test]
fn test_pha_pla_balance_8bit() {
    let mut cpu = cpu_with(&[0x48, 0xA9, 0x00, 0x68]); // PHA, LDA #0, PLA
    cpu.regs.a = 0x0042;
    let s_before = cpu.regs.s;
    cpu.step();
    assert_eq!(cpu.regs.s, s_before - 1);
    cpu.step();
    cpu.step();
    assert_eq!(cpu.get_a(), 0x42);
    assert_eq!(cpu.regs.s, s_before);
}

#[test]
fn test_pha_pla_balance_16bit() {
    let mut cpu = cpu_with(&[0x48, 0xA9, 0x00, 0x00, 0x68]);
    to_native16(&mut cpu);
    cpu.regs.a = 0x1234;
    let s_before = cpu.regs.s;
    let push_cycles = cpu.step();
    assert_eq!(push_cycles, 4);
    assert_eq!(cpu.regs.s, s_before - 2);
    cpu.step();
    assert_eq!(cpu.regs.a, 0x0000);
    let pull_cycles = cpu.step();
    assert_eq!(pull_cycles, 5);
    assert_eq!(cpu.regs.a, 0x1234);
    assert_eq!(cpu.regs.s, s_before);
}

#[test]
fn test_phx_ply_transfer_through_stack() {
    let mut cpu = cpu_with(&[0xDA, 0x7A]); // PHX, PLY
    cpu.regs.x = 0x0077;
    cpu.step();
    cpu.step();
    assert_eq!(cpu.regs.y, 0x0077);
}

#[test]
fn test_stack_wraps_within_page1_in_emulation() {
    let mut cpu = cpu_with(&[0x48]); // PHA
    cpu.regs.s = 0x0100;
    cpu.regs.a = 0x0055;
    cpu.step();
    assert_eq!(cpu.bus.peek(0x00, 0x0100), 0x55);
    assert_eq!(cpu.regs.s, 0x01FF); // wrapped inside page 1
}

#[test]
fn test_stack_uses_full_16bits_in_native() {
    let mut cpu = cpu_with(&[0x48]);
    to_native16(&mut cpu);
    cpu.regs.s = 0x2000;
    cpu.regs.a = 0xBEEF;
    cpu.step();
    assert_eq!(cpu.bus.peek(0x00, 0x2000), 0xBE);
    assert_eq!(cpu.bus.peek(0x00, 0x1FFF), 0xEF);
    assert_eq!(cpu.regs.s, 0x1FFE);
}

#[test]
fn test_phd_pld_straddle_page1_in_emulation() {
    // The 65816 lets the D push overrun the page-1 window; only the pointer
    // update wraps.
    let mut cpu = cpu_with(&[0x0B]); // PHD
    cpu.regs.s = 0x0100;
    cpu.regs.d = 0x1234;
    cpu.step();
    assert_eq!(cpu.bus.peek(0x00, 0x0100), 0x12);
    assert_eq!(cpu.bus.peek(0x00, 0x00FF), 0x34); // below the page
    assert_eq!(cpu.regs.s, 0x01FE);
}

#[test]
fn test_plb_sets_dbr_and_flags() {
    let mut cpu = cpu_with(&[0x8B, 0xAB]); // PHB, PLB
    cpu.regs.dbr = 0x80;
    cpu.step();
    cpu.regs.dbr = 0x00;
    cpu.step();
    assert_eq!(cpu.regs.dbr, 0x80);
    assert!(cpu.get_flag(crate::cpu_65816::FLAG_NEGATIVE));
}

#[test]
fn test_pea_pushes_operand() {
    let mut cpu = cpu_with(&[0xF4, 0x34, 0x12]); // PEA $1234
    let s = cpu.regs.s;
    let cycles = cpu.step();
    assert_eq!(cycles, 5);
    assert_eq!(cpu.bus.peek(0x00, s), 0x12);
    assert_eq!(cpu.bus.peek(0x00, s - 1), 0x34);
    assert_eq!(cpu.regs.s, s - 2);
}

#[test]
fn test_per_pushes_pc_relative_address() {
    let mut cpu = cpu_with(&[0x62, 0x10, 0x00]); // PER +$10
    let s = cpu.regs.s;
    let cycles = cpu.step();
    assert_eq!(cycles, 6);
    // target = $8003 + $10
    assert_eq!(cpu.bus.peek(0x00, s), 0x80);
    assert_eq!(cpu.bus.peek(0x00, s - 1), 0x13);
}

#[test]
fn test_pei_pushes_pointer() {
    let mut cpu = cpu_with(&[0xD4, 0x20]); // PEI ($20)
    cpu.bus.poke(0x00, 0x0020, 0xCD);
    cpu.bus.poke(0x00, 0x0021, 0xAB);
    let s = cpu.regs.s;
    cpu.step();
    assert_eq!(cpu.bus.peek(0x00, s), 0xAB);
    assert_eq!(cpu.bus.peek(0x00, s - 1), 0xCD);
}
