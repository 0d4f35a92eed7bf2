//! Power-on, reset, loads, stores, transfers, and the trace hook.

use super::{cpu_with, to_native16};
use crate::cpu_65816::{
    ArrayBus, Cpu65816, CpuState, TraceRecord, FLAG_CARRY, FLAG_INDEX, FLAG_IRQ_DISABLE,
    FLAG_MEMORY, FLAG_NEGATIVE, FLAG_ZERO,
};
use std::sync::mpsc::channel;

#[test]
fn test_cpu_creation() {
    let cpu = Cpu65816::new(ArrayBus::new());
    assert_eq!(cpu.regs.a, 0);
    assert_eq!(cpu.regs.s, 0x01FF);
    assert!(cpu.pins.emulation);
    assert!(cpu.pins.resb_in);
    assert!(cpu.enabled);
    assert_eq!(cpu.state, CpuState::Execute);
}

#[test]
fn test_reset_loads_vector_and_forces_emulation() {
    let mut bus = ArrayBus::new();
    bus.poke(0x00, 0xFFFC, 0x34);
    bus.poke(0x00, 0xFFFD, 0x12);

    let mut cpu = Cpu65816::new(bus);
    cpu.pins.emulation = false;
    cpu.regs.p = 0;
    cpu.regs.x = 0x1234;
    cpu.regs.y = 0x5678;
    cpu.regs.s = 0x7FFF;

    // RESB held low for 3 calls, released, vector on the 4th.
    cpu.reset_for(3);
    for _ in 0..3 {
        cpu.step();
        assert_eq!(cpu.state, CpuState::Reset);
    }
    cpu.step();

    assert_eq!(cpu.regs.pc, 0x1234);
    assert!(cpu.pins.emulation);
    assert!(cpu.get_flag(FLAG_MEMORY));
    assert!(cpu.get_flag(FLAG_INDEX));
    assert!(cpu.get_flag(FLAG_IRQ_DISABLE));
    assert_eq!(cpu.regs.s & 0xFF00, 0x0100);
    assert_eq!(cpu.regs.x & 0xFF00, 0);
    assert_eq!(cpu.regs.y & 0xFF00, 0);
    assert_eq!(cpu.regs.pbr, 0);
    assert_eq!(cpu.regs.dbr, 0);
    assert_eq!(cpu.regs.d, 0);
}

#[test]
fn test_reset_is_idempotent() {
    let mut cpu = cpu_with(&[0xEA]);
    cpu.step();

    cpu.reset();
    cpu.step();
    cpu.step();
    let first = (cpu.regs.pc, cpu.regs.p, cpu.regs.s, cpu.pins.emulation);

    cpu.reset();
    cpu.step();
    cpu.step();
    let second = (cpu.regs.pc, cpu.regs.p, cpu.regs.s, cpu.pins.emulation);

    assert_eq!(first, second);
}

#[test]
fn test_nop() {
    let mut cpu = cpu_with(&[0xEA]);
    let cycles = cpu.step();
    assert_eq!(cycles, 2);
    assert_eq!(cpu.regs.pc, 0x8001);
}

#[test]
fn test_lda_immediate_8bit() {
    let mut cpu = cpu_with(&[0xA9, 0x42]);
    let cycles = cpu.step();
    assert_eq!(cycles, 2);
    assert_eq!(cpu.get_a(), 0x42);
    assert_eq!(cpu.regs.pc, 0x8002);
    assert!(!cpu.get_flag(FLAG_ZERO));
    assert!(!cpu.get_flag(FLAG_NEGATIVE));
}

#[test]
fn test_lda_immediate_16bit() {
    // LDA #$1234 with M=0: A=0x1234, 3 cycles.
    let mut cpu = cpu_with(&[0xA9, 0x34, 0x12]);
    to_native16(&mut cpu);
    let cycles = cpu.step();
    assert_eq!(cycles, 3);
    assert_eq!(cpu.regs.a, 0x1234);
    assert!(!cpu.get_flag(FLAG_ZERO));
    assert!(!cpu.get_flag(FLAG_NEGATIVE));
    assert_eq!(cpu.regs.pc, 0x8003);
}

#[test]
fn test_clc_adc_immediate_wraps_to_zero() {
    // CLC; ADC #$FF with A=1: A=0, C=1, Z=1, 4 cycles total.
    let mut cpu = cpu_with(&[0x18, 0x69, 0xFF]);
    cpu.regs.a = 0x01;
    let mut cycles = cpu.step();
    cycles += cpu.step();
    assert_eq!(cycles, 4);
    assert_eq!(cpu.get_a(), 0x00);
    assert!(cpu.get_flag(FLAG_CARRY));
    assert!(cpu.get_flag(FLAG_ZERO));
    assert!(!cpu.get_flag(FLAG_NEGATIVE));
}

#[test]
fn test_sta_lda_absolute_roundtrip() {
    let mut cpu = cpu_with(&[
        0xA9, 0x7E, // LDA #$7E
        0x8D, 0x00, 0x20, // STA $2000
        0xA9, 0x00, // LDA #$00
        0xAD, 0x00, 0x20, // LDA $2000
    ]);
    cpu.step();
    cpu.step();
    assert_eq!(cpu.bus.peek(0x00, 0x2000), 0x7E);
    cpu.step();
    assert_eq!(cpu.get_a(), 0x00);
    cpu.step();
    assert_eq!(cpu.get_a(), 0x7E);
}

#[test]
fn test_stz_clears_both_bytes_in_16bit() {
    let mut cpu = cpu_with(&[0x9C, 0x00, 0x20]); // STZ $2000
    to_native16(&mut cpu);
    cpu.bus.poke(0x00, 0x2000, 0xAA);
    cpu.bus.poke(0x00, 0x2001, 0xBB);
    cpu.step();
    assert_eq!(cpu.bus.peek(0x00, 0x2000), 0x00);
    assert_eq!(cpu.bus.peek(0x00, 0x2001), 0x00);
}

#[test]
fn test_transfers_set_flags() {
    let mut cpu = cpu_with(&[0xA9, 0x80, 0xAA, 0xA8]); // LDA #$80, TAX, TAY
    cpu.step();
    cpu.step();
    assert_eq!(cpu.regs.x, 0x80);
    assert!(cpu.get_flag(FLAG_NEGATIVE));
    cpu.step();
    assert_eq!(cpu.regs.y, 0x80);
}

#[test]
fn test_txs_latches_page1_in_emulation() {
    let mut cpu = cpu_with(&[0xA2, 0x42, 0x9A]); // LDX #$42, TXS
    cpu.step();
    cpu.step();
    assert_eq!(cpu.regs.s, 0x0142);
}

#[test]
fn test_tcs_full_width_in_native() {
    let mut cpu = cpu_with(&[0x1B]); // TCS
    to_native16(&mut cpu);
    cpu.regs.a = 0x7ABC;
    cpu.step();
    assert_eq!(cpu.regs.s, 0x7ABC);
}

#[test]
fn test_tcd_tdc_are_always_16bit() {
    let mut cpu = cpu_with(&[0x5B, 0x7B]); // TCD, TDC
    cpu.regs.a = 0x1234; // M=1, but D transfers are full width
    cpu.step();
    assert_eq!(cpu.regs.d, 0x1234);
    cpu.regs.a = 0;
    cpu.step();
    assert_eq!(cpu.regs.a, 0x1234);
}

#[test]
fn test_xba_swaps_and_sets_flags_from_low() {
    let mut cpu = cpu_with(&[0xEB]);
    cpu.regs.a = 0x80FF;
    let cycles = cpu.step();
    assert_eq!(cycles, 3);
    assert_eq!(cpu.regs.a, 0xFF80);
    assert!(cpu.get_flag(FLAG_NEGATIVE));
}

#[test]
fn test_flag_instructions() {
    let mut cpu = cpu_with(&[0x18, 0x38, 0x58, 0x78]);
    cpu.step();
    assert!(!cpu.get_flag(FLAG_CARRY));
    cpu.step();
    assert!(cpu.get_flag(FLAG_CARRY));
    cpu.step();
    assert!(!cpu.get_flag(FLAG_IRQ_DISABLE));
    cpu.step();
    assert!(cpu.get_flag(FLAG_IRQ_DISABLE));
}

#[test]
fn test_last_fetch_reports_opcode_address() {
    let mut cpu = cpu_with(&[0xEA, 0xA9, 0x01]);
    cpu.step();
    assert_eq!(cpu.program_counter_of_last_fetch(), (0x00, 0x8000));
    cpu.step();
    assert_eq!(cpu.program_counter_of_last_fetch(), (0x00, 0x8001));
}

#[test]
fn test_trace_hook_fires_per_instruction() {
    let (tx, rx) = channel::<TraceRecord>();
    let mut cpu = cpu_with(&[0xA9, 0x42, 0xEA]);
    cpu.set_trace_hook(Some(Box::new(move |rec| {
        tx.send(rec.clone()).unwrap();
    })));

    cpu.step();
    cpu.step();

    let first = rx.recv().unwrap();
    assert_eq!(first.mnemonic, "LDA");
    assert_eq!(first.operand, "#$42");
    assert_eq!(first.addr, 0x8000);
    assert_eq!(first.opcode, 0xA9);
    assert_eq!(first.cycles, 2);

    let second = rx.recv().unwrap();
    assert_eq!(second.mnemonic, "NOP");
    assert_eq!(second.operand, "");
    assert_eq!(second.cycles, 2);
}

#[test]
fn test_wdm_is_a_two_byte_nop() {
    let mut cpu = cpu_with(&[0x42, 0x01, 0xEA]);
    let cycles = cpu.step();
    assert_eq!(cycles, 2);
    assert_eq!(cpu.regs.pc, 0x8002);
}
