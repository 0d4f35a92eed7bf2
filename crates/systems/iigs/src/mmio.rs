//! The memory-mapped I/O seam.
//!
//! Peripheral emulation lives behind `MmioDevice`; the bus forwards every
//! access that lands on an I/O page. The contract is total: implementations
//! must answer every read and accept every write. Hardware faults are
//! signalled through the interrupt lines, never by failing a call.

use emu_core::cpu_65816::AccessKind;
use serde::{Deserialize, Serialize};

/// Soft-switch state that shapes the bank map. The bus rebuilds its page
/// mappings from this whenever an I/O write reports a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftSwitches {
    /// Aux-bank zero page, stack, and language card (ALTZP)
    pub altzp: bool,
    /// Aux-bank reads for main memory (RAMRD)
    pub ramrd: bool,
    /// Aux-bank writes for main memory (RAMWRT)
    pub ramwrt: bool,
    /// Language card reads come from RAM instead of ROM
    pub lc_read_ram: bool,
    /// Language card RAM is write-enabled
    pub lc_write_enable: bool,
    /// Language card bank 2 selected for $D000-$DFFF
    pub lc_bank2: bool,
    /// Inhibit shadowing of video pages into the slow banks
    pub shadow_inhibit: bool,
    /// Disable I/O and language card in banks $00/$01 (they become plain RAM)
    pub iolc_disable: bool,
    /// System speed: fast (2.8 MHz) when set, gated slow otherwise
    pub fast_speed: bool,
}

impl Default for SoftSwitches {
    fn default() -> Self {
        Self {
            altzp: false,
            ramrd: false,
            ramwrt: false,
            lc_read_ram: false,
            lc_write_enable: false,
            lc_bank2: false,
            shadow_inhibit: false,
            iolc_disable: false,
            fast_speed: true,
        }
    }
}

/// Peripheral collaborator invoked for every access on an I/O page.
pub trait MmioDevice {
    /// Read a byte from an I/O location. `kind` is `NoOp` for side-effect
    /// free peeks (debugger views of read-sensitive registers).
    fn mmio_read(&mut self, bank: u8, addr: u16, kind: AccessKind) -> u8;

    /// Write a byte to an I/O location. Returns true when the write may
    /// have altered the bank mapping, prompting the bus to refresh itself
    /// from `soft_switches`.
    fn mmio_write(&mut self, value: u8, bank: u8, addr: u16) -> bool;

    /// Current soft-switch state.
    fn soft_switches(&self) -> SoftSwitches;
}

/// Device used when no peripherals are attached: reads float to zero,
/// writes land nowhere, the switches stay at power-on defaults.
#[derive(Debug, Default)]
pub struct NullMmio {
    switches: SoftSwitches,
}

impl MmioDevice for NullMmio {
    fn mmio_read(&mut self, _bank: u8, _addr: u16, _kind: AccessKind) -> u8 {
        0
    }

    fn mmio_write(&mut self, _value: u8, _bank: u8, _addr: u16) -> bool {
        false
    }

    fn soft_switches(&self) -> SoftSwitches {
        self.switches
    }
}
