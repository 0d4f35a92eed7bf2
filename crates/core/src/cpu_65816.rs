//! WDC 65C816 CPU core implementation
//!
//! This module provides a reusable, cycle-accurate 65C816 CPU implementation
//! that can be used by any system (Apple IIGS, SNES, etc.) by implementing
//! the `Bus65816` trait.
//!
//! The 65C816 is a 16-bit extension of the 6502 with:
//! - 16-bit accumulator and index registers (switchable to 8-bit via M/X)
//! - 24-bit address space (16MB) split into 64KB banks
//! - A relocatable direct page and a 16-bit stack pointer
//! - A 6502 "emulation" mode with the old stack and register width quirks
//!
//! Every bus access and internal operation charges exactly one cycle, so the
//! per-instruction totals match the published WDC cycle listing including
//! the direct-page, indexing, and branch penalties.

pub mod alu;
pub mod decoder;
mod executor;

pub use decoder::{format_operand, AddrMode, Op, OpcodeDesc, OPCODES};

use crate::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

// Status register flags
pub const FLAG_CARRY: u8 = 0b0000_0001;
pub const FLAG_ZERO: u8 = 0b0000_0010;
pub const FLAG_IRQ_DISABLE: u8 = 0b0000_0100;
pub const FLAG_DECIMAL: u8 = 0b0000_1000;
/// x flag: 0=16-bit X/Y, 1=8-bit X/Y. Doubles as the B (break) bit in the
/// status byte pushed during emulation mode.
pub const FLAG_INDEX: u8 = 0b0001_0000;
/// m flag: 0=16-bit A, 1=8-bit A
pub const FLAG_MEMORY: u8 = 0b0010_0000;
pub const FLAG_OVERFLOW: u8 = 0b0100_0000;
pub const FLAG_NEGATIVE: u8 = 0b1000_0000;

// Interrupt vector addresses in bank 0, low byte first.
pub const VECTOR_RESET: u16 = 0xFFFC;
pub const VECTOR_EMU_COP: u16 = 0xFFF4;
pub const VECTOR_EMU_ABORT: u16 = 0xFFF8;
pub const VECTOR_EMU_NMI: u16 = 0xFFFA;
pub const VECTOR_EMU_IRQBRK: u16 = 0xFFFE;
pub const VECTOR_NATIVE_COP: u16 = 0xFFE4;
pub const VECTOR_NATIVE_BRK: u16 = 0xFFE6;
pub const VECTOR_NATIVE_ABORT: u16 = 0xFFE8;
pub const VECTOR_NATIVE_NMI: u16 = 0xFFEA;
pub const VECTOR_NATIVE_IRQ: u16 = 0xFFEE;

/// Discriminates bus accesses so the memory system can apply side effects
/// (or suppress them) and so traces can label each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// Opcode or operand byte fetched from the program bank
    OpcodeFetch,
    /// Ordinary data access
    Data,
    /// Interrupt vector fetch from bank 0
    VectorPull,
    /// Stack push/pull in bank 0
    Stack,
    /// Read that must not trigger I/O side effects (debugger peeks)
    NoOp,
}

/// Memory interface for the 65C816 CPU.
///
/// Implementors own the bank map, the clock, and the MMIO dispatch. Every
/// call corresponds to exactly one bus (or internal) cycle; the implementor
/// charges its clock with the appropriate fast or slow step.
pub trait Bus65816 {
    /// Read a byte from `bank:addr`.
    fn read(&mut self, bank: u8, addr: u16, kind: AccessKind) -> u8;

    /// Write a byte to `bank:addr`. Writes to read-only or unmapped pages
    /// are dropped by the implementor but still cost a cycle.
    fn write(&mut self, value: u8, bank: u8, addr: u16, kind: AccessKind);

    /// One internal (non-bus) cycle, charged at the current gated speed.
    fn internal_cycle(&mut self);
}

/// The architectural register file.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Registers {
    /// Accumulator (C); low byte is A when M=1
    pub a: u16,
    /// X index; high byte forced to 0 when X=1
    pub x: u16,
    /// Y index; high byte forced to 0 when X=1
    pub y: u16,
    /// Stack pointer; high byte latched to 0x01 in emulation mode
    pub s: u16,
    /// Direct page base
    pub d: u16,
    /// Program counter, wraps within the program bank
    pub pc: u16,
    /// Data bank register
    pub dbr: u8,
    /// Program bank register
    pub pbr: u8,
    /// Status register (NVMXDIZC)
    pub p: u8,
    /// Last fetched opcode
    pub ir: u8,
}

/// Pin-level state visible to the host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pins {
    /// Active-low reset input
    pub resb_in: bool,
    /// Active-low IRQ input
    pub irqb_in: bool,
    /// Lowered by WAI until an interrupt arrives
    pub ready_out: bool,
    /// 6502 emulation mode (true after reset)
    pub emulation: bool,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            resb_in: true,
            irqb_in: true,
            ready_out: true,
            emulation: true,
        }
    }
}

/// Coarse execution state selecting the next step's behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    Reset,
    Irq,
    Nmi,
    Execute,
}

/// Per-instruction trace event handed to the host's hook before the next
/// fetch.
#[derive(Debug, Clone)]
pub struct TraceRecord {
    /// Program bank the opcode was fetched from
    pub pbr: u8,
    /// PC of the opcode byte
    pub addr: u16,
    /// The opcode byte
    pub opcode: u8,
    /// Assembler mnemonic
    pub mnemonic: &'static str,
    /// Formatted operand (empty for implied modes)
    pub operand: String,
    /// Cycles this instruction cost
    pub cycles: u32,
}

pub type TraceHook = Box<dyn FnMut(&TraceRecord) + Send>;

/// Operand capture for the trace record, filled in during dispatch.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct OperandCapture {
    pub value: u16,
    pub bank: u8,
    pub imm8: bool,
}

/// WDC 65C816 CPU state and execution engine.
pub struct Cpu65816<B: Bus65816> {
    pub regs: Registers,
    pub pins: Pins,
    pub state: CpuState,
    /// Cleared by STP; only reset revives the core
    pub enabled: bool,
    /// Total cycles executed (bus + internal)
    pub cycles_spent: u64,
    /// Memory interface
    pub bus: B,

    /// Edge-triggered NMI latch
    nmi_pending: bool,
    /// Auto-deassert countdown for RESB, in held steps
    resb_counter: u32,
    /// PBR:PC of the most recent opcode fetch
    last_fetch: (u8, u16),
    /// Working program counter while an instruction executes
    fetch_pc: u16,
    /// Cycles charged by the current step() call
    cycles_this_step: u32,
    trace_hook: Option<TraceHook>,
}

impl<B: Bus65816> Cpu65816<B> {
    /// Create a new 65C816 CPU with the given bus. The core powers up in
    /// emulation mode with interrupts disabled, like the real part.
    pub fn new(bus: B) -> Self {
        Self {
            regs: Registers {
                s: 0x01FF,
                p: FLAG_MEMORY | FLAG_INDEX | FLAG_IRQ_DISABLE,
                ..Registers::default()
            },
            pins: Pins::default(),
            state: CpuState::Execute,
            enabled: true,
            cycles_spent: 0,
            bus,
            nmi_pending: false,
            resb_counter: 0,
            last_fetch: (0, 0),
            fetch_pc: 0,
            cycles_this_step: 0,
            trace_hook: None,
        }
    }

    /// Assert RESB low; it auto-deasserts after one held step and the reset
    /// microcode runs on the step after that.
    pub fn reset(&mut self) {
        self.reset_for(1);
    }

    /// Assert RESB low with an auto-deassert countdown of `held_steps`.
    pub fn reset_for(&mut self, held_steps: u32) {
        self.pins.resb_in = false;
        self.resb_counter = held_steps;
    }

    /// Drive the IRQB pin: `asserted` pulls the (active-low) line down.
    pub fn set_irq(&mut self, asserted: bool) {
        self.pins.irqb_in = !asserted;
    }

    /// Pulse the NMI line; the edge is latched until serviced.
    pub fn set_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// PBR:PC of the opcode most recently fetched by `step`.
    pub fn program_counter_of_last_fetch(&self) -> (u8, u16) {
        self.last_fetch
    }

    /// Install (or clear) the per-instruction trace hook.
    pub fn set_trace_hook(&mut self, hook: Option<TraceHook>) {
        self.trace_hook = hook;
    }

    /// Advance by exactly one instruction or one reset/interrupt transition.
    /// Returns the cycles charged by this call (0 while waiting in WAI or
    /// stopped by STP).
    pub fn step(&mut self) -> u32 {
        self.cycles_this_step = 0;

        if !self.pins.resb_in {
            // The reset interrupt overrides any other state; start in
            // emulation mode with the 65C02 stack and register widths.
            if self.state != CpuState::Reset {
                self.state = CpuState::Reset;
                self.regs.d = 0x0000;
                self.regs.dbr = 0x00;
                self.regs.pbr = 0x00;
                self.regs.s = 0x0100 | (self.regs.s & 0x00FF);
                self.regs.x &= 0x00FF;
                self.regs.y &= 0x00FF;
                self.regs.p &= !(FLAG_MEMORY
                    | FLAG_INDEX
                    | FLAG_DECIMAL
                    | FLAG_IRQ_DISABLE
                    | FLAG_CARRY);
                self.regs.p |= FLAG_MEMORY | FLAG_INDEX | FLAG_IRQ_DISABLE;
                self.pins.emulation = true;
                self.pins.ready_out = true;
                self.enabled = true;
                self.nmi_pending = false;
                log(LogCategory::Interrupts, LogLevel::Debug, || {
                    "RESB asserted; entering reset".to_string()
                });
                self.cycle(1);
            }
            self.cycle(1);
            if self.resb_counter > 0 {
                self.resb_counter -= 1;
                if self.resb_counter == 0 {
                    self.pins.resb_in = true;
                }
            }
            return self.cycles_this_step;
        }

        if !self.enabled {
            // STP is terminal until the next reset.
            return 0;
        }

        match self.state {
            CpuState::Reset => self.reset_sequence(),
            CpuState::Irq | CpuState::Nmi => self.interrupt_sequence(),
            CpuState::Execute => {
                if !self.pins.ready_out {
                    // WAI: refuse to advance until an interrupt is pending.
                    if self.nmi_pending || !self.pins.irqb_in {
                        self.pins.ready_out = true;
                    } else {
                        return 0;
                    }
                }
                if self.nmi_pending {
                    self.nmi_pending = false;
                    self.state = CpuState::Nmi;
                    self.interrupt_sequence();
                } else if !self.pins.irqb_in && (self.regs.p & FLAG_IRQ_DISABLE) == 0 {
                    self.state = CpuState::Irq;
                    self.interrupt_sequence();
                } else {
                    self.execute_instruction();
                }
            }
        }

        self.cycles_this_step
    }

    /// RESB released while in the reset state: three throwaway stack reads,
    /// then the 6502-style vector pull.
    fn reset_sequence(&mut self) {
        let s = self.regs.s;
        self.bus_read(0x00, s, AccessKind::Stack);
        let next = if self.pins.emulation {
            0x0100 | (s.wrapping_sub(1) & 0x00FF)
        } else {
            s.wrapping_sub(1)
        };
        self.bus_read(0x00, next, AccessKind::Stack);
        self.sp_dec2();
        let s = self.regs.s;
        self.bus_read(0x00, s, AccessKind::Stack);
        self.sp_dec();

        let lo = self.bus_read(0x00, VECTOR_RESET, AccessKind::VectorPull) as u16;
        let hi = self.bus_read(0x00, VECTOR_RESET + 1, AccessKind::VectorPull) as u16;
        self.regs.pc = (hi << 8) | lo;
        self.state = CpuState::Execute;
        log(LogCategory::Interrupts, LogLevel::Debug, || {
            format!("reset vector -> {:04X}", self.regs.pc)
        });
    }

    /// Hardware IRQ/NMI response: two internal cycles, then the frame push
    /// and vector pull shared with BRK/COP.
    fn interrupt_sequence(&mut self) {
        let vector = match (self.state, self.pins.emulation) {
            (CpuState::Nmi, true) => VECTOR_EMU_NMI,
            (CpuState::Nmi, false) => VECTOR_NATIVE_NMI,
            (_, true) => VECTOR_EMU_IRQBRK,
            (_, false) => VECTOR_NATIVE_IRQ,
        };
        log(LogCategory::Interrupts, LogLevel::Debug, || {
            format!(
                "{:?} taken at {:02X}:{:04X}",
                self.state, self.regs.pbr, self.regs.pc
            )
        });
        self.cycle(2);
        let return_pc = self.regs.pc;
        let pc = self.interrupt_entry(vector, false, return_pc);
        self.regs.pc = pc;
        self.state = CpuState::Execute;
    }

    /// Push the interrupt frame (PBR in native mode, PC, status), mask IRQs,
    /// clear decimal, and pull the new PC from `vector`. `software` is true
    /// for BRK/COP, which push B=1 in emulation mode.
    pub(crate) fn interrupt_entry(&mut self, vector: u16, software: bool, return_pc: u16) -> u16 {
        if !self.pins.emulation {
            let pbr = self.regs.pbr;
            self.push8(pbr);
        }
        self.push16(return_pc);
        self.push_status(!software);
        self.regs.p |= FLAG_IRQ_DISABLE;
        self.regs.p &= !FLAG_DECIMAL;
        self.regs.pbr = 0x00;
        let lo = self.bus_read(0x00, vector, AccessKind::VectorPull) as u16;
        let hi = self.bus_read(0x00, vector.wrapping_add(1), AccessKind::VectorPull) as u16;
        (hi << 8) | lo
    }

    fn execute_instruction(&mut self) {
        let opc_pbr = self.regs.pbr;
        let opc_addr = self.regs.pc;
        let cycles_before = self.cycles_spent;
        self.last_fetch = (opc_pbr, opc_addr);
        self.fetch_pc = self.regs.pc;

        let opcode = self.fetch_pb();
        self.regs.ir = opcode;
        let capture = self.dispatch(opcode);
        self.regs.pc = self.fetch_pc;

        if self.trace_hook.is_some() {
            let desc = &OPCODES[opcode as usize];
            let record = TraceRecord {
                pbr: opc_pbr,
                addr: opc_addr,
                opcode,
                mnemonic: desc.op.mnemonic(),
                operand: format_operand(desc, capture.value, capture.bank, capture.imm8),
                cycles: (self.cycles_spent - cycles_before) as u32,
            };
            if let Some(hook) = self.trace_hook.as_mut() {
                hook(&record);
            }
        }
    }

    // --- Cycle-charging bus primitives ---

    pub(crate) fn bus_read(&mut self, bank: u8, addr: u16, kind: AccessKind) -> u8 {
        self.cycles_spent += 1;
        self.cycles_this_step += 1;
        self.bus.read(bank, addr, kind)
    }

    pub(crate) fn bus_write(&mut self, value: u8, bank: u8, addr: u16, kind: AccessKind) {
        self.cycles_spent += 1;
        self.cycles_this_step += 1;
        self.bus.write(value, bank, addr, kind);
    }

    /// Charge `n` internal cycles.
    pub(crate) fn cycle(&mut self, n: u32) {
        for _ in 0..n {
            self.cycles_spent += 1;
            self.cycles_this_step += 1;
            self.bus.internal_cycle();
        }
    }

    // --- Program fetches ---

    /// Fetch one byte at PBR:PC and advance the working PC (wrapping within
    /// the program bank).
    pub(crate) fn fetch_pb(&mut self) -> u8 {
        let byte = self.bus_read(self.regs.pbr, self.fetch_pc, AccessKind::OpcodeFetch);
        self.fetch_pc = self.fetch_pc.wrapping_add(1);
        byte
    }

    pub(crate) fn fetch_pb16(&mut self) -> u16 {
        let lo = self.fetch_pb() as u16;
        let hi = self.fetch_pb() as u16;
        (hi << 8) | lo
    }

    // --- Width and flag helpers ---

    /// True when the accumulator operates at 8 bits.
    pub fn is_8bit_a(&self) -> bool {
        self.pins.emulation || (self.regs.p & FLAG_MEMORY) != 0
    }

    /// True when the index registers operate at 8 bits.
    pub fn is_8bit_xy(&self) -> bool {
        self.pins.emulation || (self.regs.p & FLAG_INDEX) != 0
    }

    pub fn get_flag(&self, mask: u8) -> bool {
        (self.regs.p & mask) != 0
    }

    pub(crate) fn set_flag(&mut self, mask: u8, on: bool) {
        if on {
            self.regs.p |= mask;
        } else {
            self.regs.p &= !mask;
        }
    }

    /// Get accumulator value at the current width.
    pub fn get_a(&self) -> u16 {
        if self.is_8bit_a() {
            self.regs.a & 0x00FF
        } else {
            self.regs.a
        }
    }

    /// Set accumulator at the current width; the high byte survives 8-bit
    /// stores.
    pub fn set_a(&mut self, val: u16) {
        if self.is_8bit_a() {
            self.regs.a = (self.regs.a & 0xFF00) | (val & 0x00FF);
        } else {
            self.regs.a = val;
        }
    }

    pub(crate) fn set_nz8(&mut self, val: u8) {
        self.set_flag(FLAG_ZERO, val == 0);
        self.set_flag(FLAG_NEGATIVE, (val & 0x80) != 0);
    }

    pub(crate) fn set_nz16(&mut self, val: u16) {
        self.set_flag(FLAG_ZERO, val == 0);
        self.set_flag(FLAG_NEGATIVE, (val & 0x8000) != 0);
    }

    pub(crate) fn set_nz(&mut self, val: u16, w8: bool) {
        if w8 {
            self.set_nz8(val as u8);
        } else {
            self.set_nz16(val);
        }
    }

    /// Zero the X/Y high bytes whenever the index width is 8 bits.
    pub(crate) fn apply_index_width(&mut self) {
        if self.is_8bit_xy() {
            self.regs.x &= 0x00FF;
            self.regs.y &= 0x00FF;
        }
    }

    // --- Stack ---

    pub(crate) fn sp_dec(&mut self) {
        if self.pins.emulation {
            self.regs.s = 0x0100 | (self.regs.s.wrapping_sub(1) & 0x00FF);
        } else {
            self.regs.s = self.regs.s.wrapping_sub(1);
        }
    }

    pub(crate) fn sp_dec2(&mut self) {
        self.sp_dec();
        self.sp_dec();
    }

    pub(crate) fn sp_dec3(&mut self) {
        self.sp_dec();
        self.sp_dec();
        self.sp_dec();
    }

    pub(crate) fn sp_inc(&mut self) {
        if self.pins.emulation {
            self.regs.s = 0x0100 | (self.regs.s.wrapping_add(1) & 0x00FF);
        } else {
            self.regs.s = self.regs.s.wrapping_add(1);
        }
    }

    pub(crate) fn sp_inc2(&mut self) {
        self.sp_inc();
        self.sp_inc();
    }

    pub(crate) fn sp_inc3(&mut self) {
        self.sp_inc();
        self.sp_inc();
        self.sp_inc();
    }

    pub(crate) fn push8(&mut self, val: u8) {
        let s = self.regs.s;
        self.bus_write(val, 0x00, s, AccessKind::Stack);
        self.sp_dec();
    }

    pub(crate) fn push16(&mut self, val: u16) {
        self.push8((val >> 8) as u8);
        self.push8(val as u8);
    }

    pub(crate) fn pop8(&mut self) -> u8 {
        self.sp_inc();
        let s = self.regs.s;
        self.bus_read(0x00, s, AccessKind::Stack)
    }

    pub(crate) fn pop16(&mut self) -> u16 {
        let lo = self.pop8() as u16;
        let hi = self.pop8() as u16;
        (hi << 8) | lo
    }

    /// Push the status byte. In emulation mode the X-flag bit position is
    /// the B flag; hardware interrupts push it cleared (`mask_break`).
    pub(crate) fn push_status(&mut self, mask_break: bool) {
        let mut val = self.regs.p;
        if self.pins.emulation && mask_break {
            val &= !FLAG_INDEX;
        }
        self.push8(val);
    }

    /// Pull the status byte (PLP/RTI). Emulation mode keeps M and X forced.
    pub(crate) fn pull_status(&mut self) {
        let mut val = self.pop8();
        if self.pins.emulation {
            val |= FLAG_MEMORY | FLAG_INDEX;
        }
        self.regs.p = val;
        self.apply_index_width();
    }

    // --- Data access with 65816 wrap semantics ---

    /// Read an 8/16-bit value; 16-bit reads crossing 0xFFFF carry into the
    /// next bank.
    pub(crate) fn read_data(&mut self, bank: u8, addr: u16, w8: bool) -> u16 {
        let lo = self.bus_read(bank, addr, AccessKind::Data) as u16;
        if w8 {
            return lo;
        }
        let (hbank, haddr) = if addr == 0xFFFF {
            (bank.wrapping_add(1), 0x0000)
        } else {
            (bank, addr + 1)
        };
        let hi = self.bus_read(hbank, haddr, AccessKind::Data) as u16;
        (hi << 8) | lo
    }

    /// Read an 8/16-bit value pinned to bank 0 (direct page and stack
    /// relative), wrapping at the 64KB boundary.
    pub(crate) fn read_data_bank0(&mut self, addr: u16, w8: bool) -> u16 {
        let lo = self.bus_read(0x00, addr, AccessKind::Data) as u16;
        if w8 {
            return lo;
        }
        let hi = self.bus_read(0x00, addr.wrapping_add(1), AccessKind::Data) as u16;
        (hi << 8) | lo
    }

    pub(crate) fn write_data(&mut self, value: u16, bank: u8, addr: u16, w8: bool) {
        self.bus_write(value as u8, bank, addr, AccessKind::Data);
        if !w8 {
            let (hbank, haddr) = if addr == 0xFFFF {
                (bank.wrapping_add(1), 0x0000)
            } else {
                (bank, addr + 1)
            };
            self.bus_write((value >> 8) as u8, hbank, haddr, AccessKind::Data);
        }
    }

    pub(crate) fn write_data_bank0(&mut self, value: u16, addr: u16, w8: bool) {
        self.bus_write(value as u8, 0x00, addr, AccessKind::Data);
        if !w8 {
            self.bus_write((value >> 8) as u8, 0x00, addr.wrapping_add(1), AccessKind::Data);
        }
    }

    /// Form a 24-bit indexed effective address; the bank byte absorbs the
    /// carry out of the 16-bit offset.
    pub(crate) fn indexed_ea(&self, bank: u8, addr: u16, index: u16, x8: bool) -> (u8, u16, bool) {
        let idx = if x8 { index & 0x00FF } else { index };
        let full = (((bank as u32) << 16) | addr as u32).wrapping_add(idx as u32) & 0x00FF_FFFF;
        let ebank = (full >> 16) as u8;
        let eaddr = (full & 0xFFFF) as u16;
        let crossed = ebank != bank || (addr & 0xFF00) != (eaddr & 0xFF00);
        (ebank, eaddr, crossed)
    }

    /// Indexed read: one extra internal cycle when the index crosses a page
    /// boundary or the index registers are 16-bit.
    pub(crate) fn read_data_indexed(
        &mut self,
        bank: u8,
        addr: u16,
        index: u16,
        w8: bool,
        x8: bool,
    ) -> u16 {
        let (ebank, eaddr, crossed) = self.indexed_ea(bank, addr, index, x8);
        if crossed || !x8 {
            self.cycle(1);
        }
        self.read_data(ebank, eaddr, w8)
    }

    /// Indexed write: the extra cycle is unconditional and charged at the
    /// call site.
    pub(crate) fn write_data_indexed(
        &mut self,
        value: u16,
        bank: u8,
        addr: u16,
        index: u16,
        w8: bool,
        x8: bool,
    ) {
        let (ebank, eaddr, _) = self.indexed_ea(bank, addr, index, x8);
        self.write_data(value, ebank, eaddr, w8);
    }

    // --- Addressing mode resolution ---

    /// Direct-page effective address: operand byte plus D plus an optional
    /// index, charging the +1 penalty when D's low byte is nonzero. With
    /// D.lo == 0 in emulation mode the address wraps within the direct page.
    pub(crate) fn mode_dp(&mut self, index: u16, x8: bool) -> (u16, u8) {
        let offset = self.fetch_pb();
        if (self.regs.d & 0x00FF) != 0 {
            self.cycle(1);
        }
        let idx = if x8 { index & 0x00FF } else { index };
        let addr = if self.pins.emulation && (self.regs.d & 0x00FF) == 0 {
            (self.regs.d & 0xFF00) | ((offset as u16).wrapping_add(idx) & 0x00FF)
        } else {
            self.regs
                .d
                .wrapping_add(offset as u16)
                .wrapping_add(idx)
        };
        (addr, offset)
    }

    /// `(dp)` and `(dp,X)`: resolve the direct-page pointer, then read the
    /// 16-bit address it holds from bank 0.
    pub(crate) fn mode_dp_indirect(&mut self, index: u16, x8: bool) -> (u16, u8) {
        let (ptr, offset) = self.mode_dp(index, x8);
        let lo = self.bus_read(0x00, ptr, AccessKind::Data) as u16;
        let next = if self.pins.emulation && (self.regs.d & 0x00FF) == 0 {
            (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF)
        } else {
            ptr.wrapping_add(1)
        };
        let hi = self.bus_read(0x00, next, AccessKind::Data) as u16;
        ((hi << 8) | lo, offset)
    }

    /// `[dp]`: 24-bit pointer in the direct page.
    pub(crate) fn mode_dp_indirect_long(&mut self, index: u16, x8: bool) -> (u16, u8, u8) {
        let (ptr, offset) = self.mode_dp(index, x8);
        let lo = self.bus_read(0x00, ptr, AccessKind::Data) as u16;
        let hi = self.bus_read(0x00, ptr.wrapping_add(1), AccessKind::Data) as u16;
        let bank = self.bus_read(0x00, ptr.wrapping_add(2), AccessKind::Data);
        (((hi << 8) | lo), bank, offset)
    }

    /// `sr,S`: stack-relative offset in bank 0.
    pub(crate) fn mode_stack_rel(&mut self) -> (u16, u8) {
        let offset = self.fetch_pb();
        self.cycle(1);
        (self.regs.s.wrapping_add(offset as u16), offset)
    }

    /// `(sr,S),Y`: stack-relative pointer, indexed afterwards in the data
    /// bank.
    pub(crate) fn mode_stack_rel_indirect(&mut self) -> (u16, u8) {
        let (ptr, offset) = self.mode_stack_rel();
        let addr = self.read16_bank(0x00, ptr);
        self.cycle(1);
        (addr, offset)
    }
}

impl<B: Bus65816> crate::Cpu for Cpu65816<B> {
    fn reset(&mut self) {
        Cpu65816::reset(self);
    }

    fn step(&mut self) -> u32 {
        Cpu65816::step(self)
    }
}

/// Simple flat-memory bus for unit tests and benchmarks: the whole 16MB
/// space is RAM and every cycle costs one step.
pub struct ArrayBus {
    pub data: Vec<u8>,
}

impl ArrayBus {
    pub fn new() -> Self {
        Self {
            data: vec![0; 16 * 1024 * 1024],
        }
    }

    pub fn poke(&mut self, bank: u8, addr: u16, val: u8) {
        self.data[(((bank as usize) << 16) | addr as usize) & 0xFF_FFFF] = val;
    }

    pub fn peek(&self, bank: u8, addr: u16) -> u8 {
        self.data[(((bank as usize) << 16) | addr as usize) & 0xFF_FFFF]
    }

    /// Write a program image starting at `bank:addr`.
    pub fn load(&mut self, bank: u8, addr: u16, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            self.poke(bank, addr.wrapping_add(i as u16), b);
        }
    }
}

impl Default for ArrayBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus65816 for ArrayBus {
    fn read(&mut self, bank: u8, addr: u16, _kind: AccessKind) -> u8 {
        self.data[(((bank as usize) << 16) | addr as usize) & 0xFF_FFFF]
    }

    fn write(&mut self, value: u8, bank: u8, addr: u16, _kind: AccessKind) {
        self.data[(((bank as usize) << 16) | addr as usize) & 0xFF_FFFF] = value;
    }

    fn internal_cycle(&mut self) {}
}

#[cfg(test)]
mod tests;
