//! Apple IIgs machine emulation built on the reusable 65C816 core from
//! `emu_core`.
//!
//! - **CPU**: WDC 65C816 (2.8 MHz fast side, 1.023 MHz Mega II side)
//! - **Memory**: up to 256 fast RAM banks, slow RAM at $E0/$E1, up to 256KB
//!   ROM in the top banks
//! - **Bank map**: soft-switch driven page mappings (aux bank, language
//!   card, I/O window, video shadowing)
//! - **I/O**: peripheral emulation behind the `MmioDevice` trait
//! - **Loading**: Intel-HEX for test programs, raw page dumps out
//!
//! The machine is single-threaded and cooperatively driven: the host calls
//! `step_one_instruction` (or `step_until`) and wires interrupts through
//! `set_irq`/`set_nmi`.

#![allow(clippy::upper_case_acronyms)]

pub mod bus;
pub mod clock;
pub mod hex;
pub mod mmio;

use std::io;

use serde_json::Value;
use thiserror::Error;

pub use bus::{IIgsBus, BANK_SIZE};
pub use clock::{Clock, ClockSpec};
pub use emu_core::cpu_65816::{
    AccessKind, Cpu65816, CpuState, Pins, Registers, TraceHook, TraceRecord,
};
pub use hex::HexError;
pub use mmio::{MmioDevice, NullMmio, SoftSwitches};

#[derive(Error, Debug)]
pub enum MachineError {
    #[error("no ROM image supplied")]
    MissingRom,
    #[error("ROM image must be a multiple of 64 KiB up to 256 KiB, got {0} bytes")]
    BadRomSize(usize),
    #[error("at least 4 fast RAM banks are required, got {0}")]
    InsufficientRam(usize),
    #[error("invalid clock spec: slow step must be at least the fast step")]
    BadClock,
    #[error("bank {0:#04X} has no loadable RAM")]
    UnknownBank(u8),
    #[error(transparent)]
    Hex(#[from] HexError),
    #[error("malformed save state: {0}")]
    BadState(String),
}

impl MachineError {
    /// Stable negative code identifying the error class, for hosts keeping
    /// the numeric initialization contract.
    pub fn code(&self) -> i32 {
        match self {
            MachineError::MissingRom | MachineError::BadRomSize(_) => -1,
            MachineError::InsufficientRam(_) | MachineError::BadClock => -2,
            MachineError::UnknownBank(_) | MachineError::Hex(_) => -3,
            MachineError::BadState(_) => -4,
        }
    }
}

/// Construction parameters for a full machine.
#[derive(Debug, Clone, Copy)]
pub struct MachineConfig {
    /// Fast RAM bank count, 4..=256
    pub fast_ram_banks: usize,
    pub clock: ClockSpec,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            fast_ram_banks: 16,
            clock: ClockSpec::default(),
        }
    }
}

/// An Apple IIgs: the 65C816 core wired to the banked bus and a peripheral
/// collaborator.
pub struct Machine<M: MmioDevice = NullMmio> {
    cpu: Cpu65816<IIgsBus<M>>,
}

impl<M: MmioDevice> std::fmt::Debug for Machine<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine").finish_non_exhaustive()
    }
}

impl Machine<NullMmio> {
    /// Build a machine with no peripherals attached.
    pub fn new(rom: Vec<u8>, config: MachineConfig) -> Result<Self, MachineError> {
        Self::with_mmio(rom, config, NullMmio::default())
    }

    /// RAM-only machine for CPU-level work: flat fast banks, no ROM, no
    /// I/O window.
    pub fn new_simple(fast_ram_banks: usize) -> Result<Self, MachineError> {
        if fast_ram_banks == 0 {
            return Err(MachineError::InsufficientRam(0));
        }
        let banks = fast_ram_banks.min(256);
        let bus = IIgsBus::new_simple(banks, ClockSpec::default(), NullMmio::default());
        Ok(Self {
            cpu: Cpu65816::new(bus),
        })
    }
}

impl<M: MmioDevice> Machine<M> {
    /// Build a machine around a peripheral collaborator. The ROM lands in
    /// the top banks ($FF downwards); fewer than 4 fast RAM banks or a
    /// missing ROM is a configuration error.
    pub fn with_mmio(rom: Vec<u8>, config: MachineConfig, mmio: M) -> Result<Self, MachineError> {
        if rom.is_empty() {
            return Err(MachineError::MissingRom);
        }
        if rom.len() % BANK_SIZE != 0 || rom.len() > 4 * BANK_SIZE {
            return Err(MachineError::BadRomSize(rom.len()));
        }
        if config.fast_ram_banks < 4 {
            return Err(MachineError::InsufficientRam(config.fast_ram_banks));
        }
        if !config.clock.is_valid() {
            return Err(MachineError::BadClock);
        }

        let rom_banks = rom
            .chunks(BANK_SIZE)
            .map(|chunk| chunk.to_vec().into_boxed_slice())
            .collect();
        let banks = config.fast_ram_banks.min(256);
        let bus = IIgsBus::new(rom_banks, banks, config.clock, mmio);
        Ok(Self {
            cpu: Cpu65816::new(bus),
        })
    }

    /// Assert RESB; the reset microcode runs over the next two steps.
    pub fn reset(&mut self) {
        self.cpu.reset();
    }

    /// Assert RESB with an auto-deassert countdown of `held_steps`.
    pub fn reset_for(&mut self, held_steps: u32) {
        self.cpu.reset_for(held_steps);
    }

    /// Advance by exactly one instruction or interrupt transition,
    /// returning the cycles charged.
    pub fn step_one_instruction(&mut self) -> u32 {
        self.cpu.step()
    }

    /// Step until at least `cycle_budget` cycles have elapsed. Stops early
    /// if the core cannot advance (WAI with no interrupt pending, or STP).
    pub fn step_until(&mut self, cycle_budget: u64) -> u64 {
        let start = self.cpu.cycles_spent;
        while self.cpu.cycles_spent - start < cycle_budget {
            if self.cpu.step() == 0 {
                break;
            }
        }
        self.cpu.cycles_spent - start
    }

    /// Drive the (level-sensitive) IRQ line.
    pub fn set_irq(&mut self, asserted: bool) {
        self.cpu.set_irq(asserted);
    }

    /// Pulse the (edge-triggered) NMI line.
    pub fn set_nmi(&mut self) {
        self.cpu.set_nmi();
    }

    /// Parse Intel-HEX records into a fast RAM bank.
    pub fn load_intel_hex(&mut self, text: &str, bank: u8) -> Result<(), MachineError> {
        let memory = self
            .cpu
            .bus
            .fast_bank_mut(bank)
            .ok_or(MachineError::UnknownBank(bank))?;
        hex::load(text, memory)?;
        Ok(())
    }

    /// Emit the Intel-HEX data-body digits for a memory range, with the
    /// running byte sum for the caller's checksum.
    pub fn hex_data_body(&self, bank: u8, addr: u16, byte_count: usize) -> Option<(String, u8)> {
        let bytes = self.cpu.bus.bank_bytes(bank)?;
        hex::encode_data_body(bytes, addr, byte_count)
    }

    /// Write `page_count` raw 256-byte pages starting at `bank:page`,
    /// wrapping within the bank. Unmapped banks dump as zeros.
    pub fn dump_bank_page(
        &self,
        bank: u8,
        page: u8,
        page_count: usize,
        out: &mut dyn io::Write,
    ) -> io::Result<()> {
        match self.cpu.bus.bank_bytes(bank) {
            Some(bytes) => {
                let mut addr = (page as usize) << 8;
                for _ in 0..page_count {
                    out.write_all(&bytes[addr..addr + 0x100])?;
                    addr = (addr + 0x100) & 0xFFFF;
                }
            }
            None => {
                let zeros = [0u8; 0x100];
                for _ in 0..page_count {
                    out.write_all(&zeros)?;
                }
            }
        }
        Ok(())
    }

    /// Install (or clear) the per-instruction trace hook.
    pub fn set_trace_hook(&mut self, hook: Option<TraceHook>) {
        self.cpu.set_trace_hook(hook);
    }

    pub fn cpu(&self) -> &Cpu65816<IIgsBus<M>> {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu65816<IIgsBus<M>> {
        &mut self.cpu
    }

    pub fn bus(&self) -> &IIgsBus<M> {
        &self.cpu.bus
    }

    pub fn bus_mut(&mut self) -> &mut IIgsBus<M> {
        &mut self.cpu.bus
    }

    /// JSON snapshot of the architectural state for debugging. Memory
    /// contents are the save-state serializer's concern, not ours.
    pub fn save_state(&self) -> Value {
        serde_json::json!({
            "version": 1,
            "cpu": {
                "regs": serde_json::to_value(self.cpu.regs).unwrap_or(Value::Null),
                "pins": serde_json::to_value(self.cpu.pins).unwrap_or(Value::Null),
                "state": serde_json::to_value(self.cpu.state).unwrap_or(Value::Null),
                "enabled": self.cpu.enabled,
                "cycles_spent": self.cpu.cycles_spent,
            },
            "clock": serde_json::to_value(&self.cpu.bus.clock).unwrap_or(Value::Null),
            "switches": serde_json::to_value(self.cpu.bus.switches()).unwrap_or(Value::Null),
        })
    }

    /// Restore a `save_state` snapshot.
    pub fn load_state(&mut self, v: &Value) -> Result<(), MachineError> {
        let bad = |what: &str| MachineError::BadState(what.to_string());

        let cpu = v.get("cpu").ok_or_else(|| bad("missing cpu"))?;
        self.cpu.regs = serde_json::from_value(cpu["regs"].clone())
            .map_err(|_| bad("cpu.regs"))?;
        self.cpu.pins = serde_json::from_value(cpu["pins"].clone())
            .map_err(|_| bad("cpu.pins"))?;
        self.cpu.state = serde_json::from_value(cpu["state"].clone())
            .map_err(|_| bad("cpu.state"))?;
        self.cpu.enabled = cpu["enabled"].as_bool().unwrap_or(true);
        self.cpu.cycles_spent = cpu["cycles_spent"].as_u64().unwrap_or(0);

        self.cpu.bus.clock = serde_json::from_value(v["clock"].clone())
            .map_err(|_| bad("clock"))?;
        let switches: SoftSwitches = serde_json::from_value(v["switches"].clone())
            .map_err(|_| bad("switches"))?;
        self.cpu.bus.refresh_bank_map(&switches);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_image() -> Vec<u8> {
        let mut rom = vec![0u8; BANK_SIZE];
        // Reset vector at the end of the last ROM bank -> $8000
        rom[0xFFFC] = 0x00;
        rom[0xFFFD] = 0x80;
        rom
    }

    #[test]
    fn test_missing_rom_is_an_error() {
        let err = Machine::new(Vec::new(), MachineConfig::default()).unwrap_err();
        assert!(matches!(err, MachineError::MissingRom));
        assert_eq!(err.code(), -1);
    }

    #[test]
    fn test_insufficient_ram_is_an_error() {
        let err = Machine::new(
            rom_image(),
            MachineConfig {
                fast_ram_banks: 3,
                ..MachineConfig::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, MachineError::InsufficientRam(3)));
        assert_eq!(err.code(), -2);
    }

    #[test]
    fn test_odd_rom_size_is_an_error() {
        let err = Machine::new(vec![0u8; 1234], MachineConfig::default()).unwrap_err();
        assert!(matches!(err, MachineError::BadRomSize(1234)));
    }

    #[test]
    fn test_reset_fetches_vector_from_rom() {
        let mut machine = Machine::new(rom_image(), MachineConfig::default()).unwrap();
        machine.reset();
        machine.step_one_instruction();
        machine.step_one_instruction();
        assert_eq!(machine.cpu().regs.pc, 0x8000);
        assert!(machine.cpu().pins.emulation);
    }

    #[test]
    fn test_load_hex_and_run() {
        let mut machine = Machine::new_simple(4).unwrap();
        // LDA #$42 at $8000 plus the reset vector.
        machine
            .load_intel_hex(":02800000A94293\n:02FFFC00008083\n:00000001FF\n", 0)
            .unwrap();
        machine.reset();
        machine.step_one_instruction();
        machine.step_one_instruction();
        machine.step_one_instruction();
        assert_eq!(machine.cpu().get_a(), 0x42);
    }

    #[test]
    fn test_load_hex_rejects_unmapped_bank() {
        let mut machine = Machine::new_simple(4).unwrap();
        let err = machine.load_intel_hex(":00000001FF\n", 0x80).unwrap_err();
        assert!(matches!(err, MachineError::UnknownBank(0x80)));
        assert_eq!(err.code(), -3);
    }

    #[test]
    fn test_dump_bank_page_wraps() {
        let mut machine = Machine::new_simple(4).unwrap();
        {
            let bank = machine.bus_mut().fast_bank_mut(0).unwrap();
            bank[0xFF00] = 0xAA;
            bank[0x0000] = 0xBB;
        }
        let mut out = Vec::new();
        machine.dump_bank_page(0x00, 0xFF, 2, &mut out).unwrap();
        assert_eq!(out.len(), 512);
        assert_eq!(out[0], 0xAA);
        assert_eq!(out[256], 0xBB);
    }

    #[test]
    fn test_dump_unmapped_bank_is_zeros() {
        let machine = Machine::new_simple(4).unwrap();
        let mut out = Vec::new();
        machine.dump_bank_page(0x80, 0x00, 1, &mut out).unwrap();
        assert_eq!(out, vec![0u8; 256]);
    }

    #[test]
    fn test_save_load_state_roundtrip() {
        let mut machine = Machine::new(rom_image(), MachineConfig::default()).unwrap();
        machine.reset();
        machine.step_one_instruction();
        machine.step_one_instruction();
        let state = machine.save_state();

        let mut other = Machine::new(rom_image(), MachineConfig::default()).unwrap();
        other.load_state(&state).unwrap();
        assert_eq!(other.cpu().regs.pc, machine.cpu().regs.pc);
        assert_eq!(other.cpu().regs.p, machine.cpu().regs.p);
        assert_eq!(other.cpu().cycles_spent, machine.cpu().cycles_spent);
    }

    #[test]
    fn test_hex_data_body_reads_memory() {
        let mut machine = Machine::new_simple(4).unwrap();
        {
            let bank = machine.bus_mut().fast_bank_mut(0).unwrap();
            bank[0x2000] = 0xDE;
            bank[0x2001] = 0xAD;
        }
        let (digits, sum) = machine.hex_data_body(0x00, 0x2000, 2).unwrap();
        assert_eq!(digits, "DEAD");
        assert_eq!(sum, 0xDEu8.wrapping_add(0xAD));
    }
}
