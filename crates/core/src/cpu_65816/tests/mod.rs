//! 65C816 core tests, grouped by concern.

mod tests_addressing;
mod tests_basic;
mod tests_cycles;
mod tests_width;

use super::{ArrayBus, Cpu65816};

/// Build a CPU with the program at 00:8000 and the reset vector pointing at
/// it, stepped through the reset sequence.
pub(crate) fn cpu_with(program: &[u8]) -> Cpu65816<ArrayBus> {
    let mut bus = ArrayBus::new();
    bus.load(0x00, 0x8000, program);
    bus.poke(0x00, 0xFFFC, 0x00);
    bus.poke(0x00, 0xFFFD, 0x80);

    let mut cpu = Cpu65816::new(bus);
    cpu.reset();
    cpu.step(); // RESB held
    cpu.step(); // reset sequence, PC <- vector
    assert_eq!(cpu.regs.pc, 0x8000);
    cpu
}

/// Switch a freshly reset CPU into native mode with 16-bit A and X/Y.
pub(crate) fn to_native16(cpu: &mut Cpu65816<ArrayBus>) {
    cpu.pins.emulation = false;
    cpu.regs.p &= !(super::FLAG_MEMORY | super::FLAG_INDEX);
}
