//! The 24-bit segmented memory bus.
//!
//! A flat 256-entry bank map resolves every access to fast RAM, slow RAM
//! (banks $E0/$E1), ROM, the empty sentinel, or the I/O gate. Banks $00,
//! $01, $E0 and $E1 carry per-page mappings that the soft switches reshape:
//! aux-bank zero page and stack, main/aux read and write splits, the
//! language card with its two $D000 banks, the $C0xx I/O window, and video
//! page shadowing into the slow banks.
//!
//! Timing follows the hardware split: slow RAM and I/O charge the Mega II
//! step, everything else the fast step unless the speed gate is engaged.

use crate::clock::{Clock, ClockSpec};
use crate::mmio::{MmioDevice, SoftSwitches};
use emu_core::cpu_65816::{AccessKind, Bus65816};
use emu_core::logging::{log, LogCategory, LogLevel};

pub const BANK_SIZE: usize = 0x1_0000;

type Bank = Box<[u8]>;

fn new_bank() -> Bank {
    vec![0u8; BANK_SIZE].into_boxed_slice()
}

/// Storage a page resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    FastRam(u8),
    SlowRam(u8),
    Rom(u8),
    Io,
    Empty,
}

#[derive(Debug, Clone, Copy)]
struct PageMapping {
    target: Target,
    /// Page within the target bank (language-card bank 2 redirects)
    page: u8,
}

#[derive(Debug, Clone, Copy)]
struct PageEntry {
    read: PageMapping,
    write: PageMapping,
    /// Writes additionally land in this slow bank (video shadowing)
    shadow: Option<u8>,
}

impl PageEntry {
    fn rw(target: Target, page: u8) -> Self {
        Self {
            read: PageMapping { target, page },
            write: PageMapping { target, page },
            shadow: None,
        }
    }
}

/// One bank's resolution rule. Ordinary banks map uniformly; the four
/// special banks carry a full page table.
enum BankDescriptor {
    FastRam(u8),
    SlowRam(u8),
    Rom(u8),
    Empty,
    Paged(Box<[PageEntry; 256]>),
}

/// The machine bus: memory banks, bank map, clock, and the MMIO seam.
pub struct IIgsBus<M: MmioDevice> {
    pub clock: Clock,
    pub mmio: M,
    bank_map: Vec<BankDescriptor>,
    fast_banks: Vec<Bank>,
    slow_banks: [Bank; 2],
    rom: Vec<Bank>,
    /// Flat RAM-only mapping for CPU-level work; soft switches only move
    /// the speed gate
    simple: bool,
    switches: SoftSwitches,
}

impl<M: MmioDevice> IIgsBus<M> {
    /// Full machine bus: ROM banks high, fast RAM low, slow RAM at
    /// $E0/$E1, soft-switch driven page maps.
    pub fn new(rom: Vec<Bank>, fast_bank_count: usize, spec: ClockSpec, mmio: M) -> Self {
        let mut bus = Self {
            clock: Clock::new(spec),
            mmio,
            bank_map: Vec::new(),
            fast_banks: (0..fast_bank_count).map(|_| new_bank()).collect(),
            slow_banks: [new_bank(), new_bank()],
            rom,
            simple: false,
            switches: SoftSwitches::default(),
        };
        let switches = bus.mmio.soft_switches();
        bus.refresh_bank_map(&switches);
        bus
    }

    /// RAM-only bus: every fast bank maps flat, no I/O window, no language
    /// card. Slow banks stay at $E0/$E1 for timing behavior.
    pub fn new_simple(fast_bank_count: usize, spec: ClockSpec, mmio: M) -> Self {
        let mut bus = Self {
            clock: Clock::new(spec),
            mmio,
            bank_map: Vec::new(),
            fast_banks: (0..fast_bank_count).map(|_| new_bank()).collect(),
            slow_banks: [new_bank(), new_bank()],
            rom: Vec::new(),
            simple: true,
            switches: SoftSwitches::default(),
        };
        let switches = bus.mmio.soft_switches();
        bus.refresh_bank_map(&switches);
        bus
    }

    pub fn switches(&self) -> &SoftSwitches {
        &self.switches
    }

    /// Rebuild the bank map from soft-switch state. Called at power-on and
    /// after any I/O write that reports a mapping change.
    pub fn refresh_bank_map(&mut self, switches: &SoftSwitches) {
        self.switches = *switches;
        self.clock.slow_gate = !switches.fast_speed;

        let fast_count = self.fast_banks.len().min(0xE0);
        let rom_base = 0x100 - self.rom.len();
        // Without a ROM there is nothing for the I/O window or language
        // card to resolve against; fall back to the flat mapping.
        let simple = self.simple || self.rom.is_empty();

        let mut map = Vec::with_capacity(256);
        for bank in 0usize..256 {
            let descriptor = if simple {
                match bank {
                    0xE0 | 0xE1 => BankDescriptor::SlowRam((bank & 1) as u8),
                    b if b < fast_count => BankDescriptor::FastRam(b as u8),
                    _ => BankDescriptor::Empty,
                }
            } else {
                match bank {
                    0x00 | 0x01 => {
                        BankDescriptor::Paged(self.build_main_bank(bank as u8, switches))
                    }
                    0xE0 | 0xE1 => {
                        BankDescriptor::Paged(self.build_mega2_bank((bank & 1) as u8, switches))
                    }
                    b if b >= rom_base => BankDescriptor::Rom((b - rom_base) as u8),
                    b if b < fast_count => BankDescriptor::FastRam(b as u8),
                    _ => BankDescriptor::Empty,
                }
            };
            map.push(descriptor);
        }
        self.bank_map = map;
    }

    /// Page table for banks $00/$01. Bank $00 sees the aux bank through
    /// ALTZP/RAMRD/RAMWRT; both banks carry the I/O window, the language
    /// card, and video shadowing into their slow twin.
    fn build_main_bank(&self, me: u8, sw: &SoftSwitches) -> Box<[PageEntry; 256]> {
        let rom_last = (self.rom.len() - 1) as u8;
        let aux = 0x01u8;
        let zp_bank = if me == 0 && sw.altzp { aux } else { me };
        let rd_bank = if me == 0 && sw.ramrd { aux } else { me };
        let wr_bank = if me == 0 && sw.ramwrt { aux } else { me };
        // ALTZP moves the language card along with zero page and stack
        let lc_bank = zp_bank;

        let mut entries = [PageEntry::rw(Target::Empty, 0); 256];
        for page in 0u16..256 {
            let p = page as u8;
            entries[page as usize] = match p {
                0x00..=0x01 => PageEntry::rw(Target::FastRam(zp_bank), p),
                0x02..=0xBF => PageEntry {
                    read: PageMapping {
                        target: Target::FastRam(rd_bank),
                        page: p,
                    },
                    write: PageMapping {
                        target: Target::FastRam(wr_bank),
                        page: p,
                    },
                    shadow: shadowed_page(sw, me, p),
                },
                // NIOLC turns the whole I/O + language card window into
                // plain RAM
                0xC0..=0xFF if sw.iolc_disable => PageEntry::rw(Target::FastRam(me), p),
                0xC0 => PageEntry::rw(Target::Io, p),
                0xC1..=0xCF => PageEntry {
                    read: PageMapping {
                        target: Target::Rom(rom_last),
                        page: p,
                    },
                    write: PageMapping {
                        target: Target::Empty,
                        page: p,
                    },
                    shadow: None,
                },
                0xD0..=0xDF => {
                    // Language card bank 2 stores its 4K under the I/O hole
                    let store = if sw.lc_bank2 { p - 0x10 } else { p };
                    lc_entry(sw, Target::FastRam(lc_bank), Target::Rom(rom_last), p, store)
                }
                0xE0..=0xFF => lc_entry(sw, Target::FastRam(lc_bank), Target::Rom(rom_last), p, p),
            };
        }
        Box::new(entries)
    }

    /// Page table for the slow banks $E0/$E1.
    fn build_mega2_bank(&self, e: u8, sw: &SoftSwitches) -> Box<[PageEntry; 256]> {
        let rom_last = (self.rom.len() - 1) as u8;
        let mut entries = [PageEntry::rw(Target::Empty, 0); 256];
        for page in 0u16..256 {
            let p = page as u8;
            entries[page as usize] = match p {
                0x00..=0xBF => PageEntry::rw(Target::SlowRam(e), p),
                0xC0 => PageEntry::rw(Target::Io, p),
                0xC1..=0xCF => PageEntry {
                    read: PageMapping {
                        target: Target::Rom(rom_last),
                        page: p,
                    },
                    write: PageMapping {
                        target: Target::Empty,
                        page: p,
                    },
                    shadow: None,
                },
                0xD0..=0xDF => {
                    let store = if sw.lc_bank2 { p - 0x10 } else { p };
                    lc_entry(sw, Target::SlowRam(e), Target::Rom(rom_last), p, store)
                }
                0xE0..=0xFF => lc_entry(sw, Target::SlowRam(e), Target::Rom(rom_last), p, p),
            };
        }
        Box::new(entries)
    }

    fn resolve(&self, bank: u8, page: u8) -> PageEntry {
        match &self.bank_map[bank as usize] {
            BankDescriptor::FastRam(b) => PageEntry::rw(Target::FastRam(*b), page),
            BankDescriptor::SlowRam(b) => PageEntry::rw(Target::SlowRam(*b), page),
            BankDescriptor::Rom(b) => PageEntry {
                read: PageMapping {
                    target: Target::Rom(*b),
                    page,
                },
                write: PageMapping {
                    target: Target::Empty,
                    page,
                },
                shadow: None,
            },
            BankDescriptor::Empty => PageEntry::rw(Target::Empty, page),
            BankDescriptor::Paged(map) => map[page as usize],
        }
    }

    fn storage_index(mapping: PageMapping, addr: u16) -> usize {
        ((mapping.page as usize) << 8) | (addr & 0x00FF) as usize
    }

    /// Raw bytes of a fast bank, for test loaders.
    pub fn fast_bank_mut(&mut self, bank: u8) -> Option<&mut [u8]> {
        self.fast_banks
            .get_mut(bank as usize)
            .map(|b| &mut b[..])
    }

    /// Raw bytes backing a bank number the way the memory dumps see them:
    /// slow banks at $E0/$E1, ROM high, fast RAM low. None for unmapped
    /// banks.
    pub fn bank_bytes(&self, bank: u8) -> Option<&[u8]> {
        match bank {
            0xE0 | 0xE1 => Some(&self.slow_banks[(bank & 1) as usize][..]),
            b if (b as usize) < self.fast_banks.len() => {
                Some(&self.fast_banks[b as usize][..])
            }
            b if (b as usize) >= 0x100 - self.rom.len() => {
                Some(&self.rom[b as usize - (0x100 - self.rom.len())][..])
            }
            _ => None,
        }
    }
}

/// Language-card region entry: RAM or ROM read, optional RAM write.
fn lc_entry(sw: &SoftSwitches, ram: Target, rom: Target, page: u8, store: u8) -> PageEntry {
    PageEntry {
        read: if sw.lc_read_ram {
            PageMapping {
                target: ram,
                page: store,
            }
        } else {
            PageMapping {
                target: rom,
                page,
            }
        },
        write: if sw.lc_write_enable {
            PageMapping {
                target: ram,
                page: store,
            }
        } else {
            PageMapping {
                target: Target::Empty,
                page,
            }
        },
        shadow: None,
    }
}

/// Video pages mirrored into the slow banks while shadowing is enabled:
/// text at $0400, hi-res at $2000, and the aux bank's super-hi-res region.
fn shadowed_page(sw: &SoftSwitches, me: u8, page: u8) -> Option<u8> {
    if sw.shadow_inhibit {
        return None;
    }
    let hit = matches!(page, 0x04..=0x07)
        || matches!(page, 0x20..=0x3F)
        || (me == 1 && matches!(page, 0x40..=0x9F));
    if hit {
        Some(me)
    } else {
        None
    }
}

impl<M: MmioDevice> Bus65816 for IIgsBus<M> {
    fn read(&mut self, bank: u8, addr: u16, kind: AccessKind) -> u8 {
        let entry = self.resolve(bank, (addr >> 8) as u8);
        match entry.read.target {
            Target::FastRam(b) => {
                self.clock.charge_fast();
                self.fast_banks[b as usize][Self::storage_index(entry.read, addr)]
            }
            Target::SlowRam(b) => {
                self.clock.charge_slow();
                self.slow_banks[b as usize][Self::storage_index(entry.read, addr)]
            }
            Target::Rom(b) => {
                self.clock.charge_fast();
                self.rom[b as usize][Self::storage_index(entry.read, addr)]
            }
            Target::Io => {
                self.clock.charge_slow();
                self.mmio.mmio_read(bank, addr, kind)
            }
            Target::Empty => {
                self.clock.charge_fast();
                0
            }
        }
    }

    fn write(&mut self, value: u8, bank: u8, addr: u16, _kind: AccessKind) {
        let entry = self.resolve(bank, (addr >> 8) as u8);
        match entry.write.target {
            Target::FastRam(b) => {
                // Shadowed video writes run at the slow rate and land in
                // both banks
                if let Some(slow) = entry.shadow {
                    self.clock.charge_slow();
                    self.slow_banks[slow as usize][Self::storage_index(entry.write, addr)] =
                        value;
                } else {
                    self.clock.charge_fast();
                }
                self.fast_banks[b as usize][Self::storage_index(entry.write, addr)] = value;
            }
            Target::SlowRam(b) => {
                self.clock.charge_slow();
                self.slow_banks[b as usize][Self::storage_index(entry.write, addr)] = value;
            }
            Target::Io => {
                self.clock.charge_slow();
                if self.mmio.mmio_write(value, bank, addr) {
                    let switches = self.mmio.soft_switches();
                    self.refresh_bank_map(&switches);
                }
            }
            Target::Rom(_) | Target::Empty => {
                // Dropped, but the cycle is still charged
                self.clock.charge_fast();
                log(LogCategory::Bus, LogLevel::Trace, || {
                    format!("write {:02X} to protected {:02X}:{:04X} dropped", value, bank, addr)
                });
            }
        }
    }

    fn internal_cycle(&mut self) {
        self.clock.charge_fast();
    }
}
