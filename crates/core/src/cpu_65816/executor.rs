//! Instruction dispatch: one match over the decoded (operation, addressing
//! mode) pair. Operand resolution and cycle charging are shared per mode;
//! the WDC cycle listing falls out of one bus access or internal cycle per
//! call into the helpers.

use super::decoder::{AddrMode, Op, OPCODES};
use super::{
    AccessKind, Bus65816, Cpu65816, OperandCapture, FLAG_CARRY, FLAG_DECIMAL,
    FLAG_INDEX, FLAG_IRQ_DISABLE, FLAG_MEMORY, FLAG_NEGATIVE, FLAG_OVERFLOW, FLAG_ZERO,
    VECTOR_EMU_COP, VECTOR_EMU_IRQBRK, VECTOR_NATIVE_BRK, VECTOR_NATIVE_COP,
};
use crate::logging::{log, LogCategory, LogLevel};

/// Read-modify-write operation selector.
#[derive(Debug, Clone, Copy)]
enum Rmw {
    Asl,
    Lsr,
    Rol,
    Ror,
    Inc,
    Dec,
    Tsb,
    Trb,
}

impl<B: Bus65816> Cpu65816<B> {
    /// Execute the fetched opcode to completion. Returns the operand capture
    /// for the trace record.
    pub(crate) fn dispatch(&mut self, opcode: u8) -> OperandCapture {
        let desc = OPCODES[opcode as usize];
        let m8 = self.is_8bit_a();
        let x8 = self.is_8bit_xy();
        let mut cap = OperandCapture::default();

        match desc.op {
            // --- Accumulator loads and ALU ---
            Op::Adc => {
                let v = self.read_operand(desc.mode, m8, x8, &mut cap);
                if self.get_flag(FLAG_DECIMAL) {
                    self.adc_bcd(v, m8);
                } else {
                    self.adc(v, m8);
                }
            }
            Op::Sbc => {
                let v = self.read_operand(desc.mode, m8, x8, &mut cap);
                if self.get_flag(FLAG_DECIMAL) {
                    self.sbc_bcd(v, m8);
                } else {
                    self.sbc(v, m8);
                }
            }
            Op::And => {
                let v = self.read_operand(desc.mode, m8, x8, &mut cap);
                self.and(v, m8);
            }
            Op::Eor => {
                let v = self.read_operand(desc.mode, m8, x8, &mut cap);
                self.eor(v, m8);
            }
            Op::Ora => {
                let v = self.read_operand(desc.mode, m8, x8, &mut cap);
                self.ora(v, m8);
            }
            Op::Lda => {
                let v = self.read_operand(desc.mode, m8, x8, &mut cap);
                self.lda(v, m8);
            }
            Op::Cmp => {
                let v = self.read_operand(desc.mode, m8, x8, &mut cap);
                let a = self.regs.a;
                self.compare(a, v, m8);
            }
            Op::Bit => {
                let v = self.read_operand(desc.mode, m8, x8, &mut cap);
                if desc.mode == AddrMode::Immediate {
                    self.bit_imm(v, m8);
                } else {
                    self.bit(v, m8);
                }
            }

            // --- Index loads and compares (X-flag width) ---
            Op::Ldx => {
                let v = self.read_operand(desc.mode, x8, x8, &mut cap);
                self.regs.x = if x8 { v & 0x00FF } else { v };
                self.set_nz(v, x8);
            }
            Op::Ldy => {
                let v = self.read_operand(desc.mode, x8, x8, &mut cap);
                self.regs.y = if x8 { v & 0x00FF } else { v };
                self.set_nz(v, x8);
            }
            Op::Cpx => {
                let v = self.read_operand(desc.mode, x8, x8, &mut cap);
                let x = self.regs.x;
                self.compare(x, v, x8);
            }
            Op::Cpy => {
                let v = self.read_operand(desc.mode, x8, x8, &mut cap);
                let y = self.regs.y;
                self.compare(y, v, x8);
            }

            // --- Stores ---
            Op::Sta => {
                let a = self.regs.a;
                self.write_operand(desc.mode, a, m8, x8, &mut cap);
            }
            Op::Stx => {
                let x = self.regs.x;
                self.write_operand(desc.mode, x, x8, x8, &mut cap);
            }
            Op::Sty => {
                let y = self.regs.y;
                self.write_operand(desc.mode, y, x8, x8, &mut cap);
            }
            Op::Stz => {
                self.write_operand(desc.mode, 0x0000, m8, x8, &mut cap);
            }

            // --- Read-modify-write ---
            Op::Asl => self.rmw_operand(Rmw::Asl, desc.mode, m8, x8, &mut cap),
            Op::Lsr => self.rmw_operand(Rmw::Lsr, desc.mode, m8, x8, &mut cap),
            Op::Rol => self.rmw_operand(Rmw::Rol, desc.mode, m8, x8, &mut cap),
            Op::Ror => self.rmw_operand(Rmw::Ror, desc.mode, m8, x8, &mut cap),
            Op::Inc => self.rmw_operand(Rmw::Inc, desc.mode, m8, x8, &mut cap),
            Op::Dec => self.rmw_operand(Rmw::Dec, desc.mode, m8, x8, &mut cap),
            Op::Tsb => self.rmw_operand(Rmw::Tsb, desc.mode, m8, x8, &mut cap),
            Op::Trb => self.rmw_operand(Rmw::Trb, desc.mode, m8, x8, &mut cap),

            // --- Register increments (X-flag width) ---
            Op::Inx => {
                let v = self.regs.x;
                self.regs.x = self.inc_value(v, x8);
                self.cycle(1);
            }
            Op::Iny => {
                let v = self.regs.y;
                self.regs.y = self.inc_value(v, x8);
                self.cycle(1);
            }
            Op::Dex => {
                let v = self.regs.x;
                self.regs.x = self.dec_value(v, x8);
                self.cycle(1);
            }
            Op::Dey => {
                let v = self.regs.y;
                self.regs.y = self.dec_value(v, x8);
                self.cycle(1);
            }

            // --- Branches ---
            Op::Bcc => {
                let c = !self.get_flag(FLAG_CARRY);
                self.branch(c, &mut cap);
            }
            Op::Bcs => {
                let c = self.get_flag(FLAG_CARRY);
                self.branch(c, &mut cap);
            }
            Op::Beq => {
                let c = self.get_flag(FLAG_ZERO);
                self.branch(c, &mut cap);
            }
            Op::Bne => {
                let c = !self.get_flag(FLAG_ZERO);
                self.branch(c, &mut cap);
            }
            Op::Bmi => {
                let c = self.get_flag(FLAG_NEGATIVE);
                self.branch(c, &mut cap);
            }
            Op::Bpl => {
                let c = !self.get_flag(FLAG_NEGATIVE);
                self.branch(c, &mut cap);
            }
            Op::Bvs => {
                let c = self.get_flag(FLAG_OVERFLOW);
                self.branch(c, &mut cap);
            }
            Op::Bvc => {
                let c = !self.get_flag(FLAG_OVERFLOW);
                self.branch(c, &mut cap);
            }
            Op::Bra => {
                self.branch(true, &mut cap);
            }
            Op::Brl => {
                let off = self.fetch_pb16();
                cap.value = off;
                let target = self.fetch_pc.wrapping_add(off);
                self.cycle(1);
                self.fetch_pc = target;
            }

            // --- Jumps and calls ---
            Op::Jmp => match desc.mode {
                AddrMode::PcAbsolute => {
                    let addr = self.fetch_pb16();
                    cap.value = addr;
                    self.fetch_pc = addr;
                }
                AddrMode::PcIndirect => {
                    let addr = self.fetch_pb16();
                    cap.value = addr;
                    self.fetch_pc = self.read16_bank(0x00, addr);
                }
                AddrMode::PcIndirectX => {
                    let addr = self.fetch_pb16();
                    cap.value = addr;
                    let idx = if x8 { self.regs.x & 0x00FF } else { self.regs.x };
                    self.cycle(1);
                    let pbr = self.regs.pbr;
                    self.fetch_pc = self.read16_bank(pbr, addr.wrapping_add(idx));
                }
                _ => self.illegal(opcode),
            },
            Op::Jml => match desc.mode {
                AddrMode::PcLong => {
                    let addr = self.fetch_pb16();
                    let bank = self.fetch_pb();
                    cap.value = addr;
                    cap.bank = bank;
                    self.fetch_pc = addr;
                    self.regs.pbr = bank;
                }
                AddrMode::PcLongIndirect => {
                    let addr = self.fetch_pb16();
                    cap.value = addr;
                    self.fetch_pc = self.read16_bank(0x00, addr);
                    self.regs.pbr =
                        self.bus_read(0x00, addr.wrapping_add(2), AccessKind::Data);
                }
                _ => self.illegal(opcode),
            },
            Op::Jsr => match desc.mode {
                AddrMode::PcAbsolute => {
                    // Pushes the PC of the last operand byte
                    let addr = self.fetch_pb16();
                    cap.value = addr;
                    self.fetch_pc = self.fetch_pc.wrapping_sub(1);
                    self.cycle(1);
                    let ret = self.fetch_pc;
                    self.push16(ret);
                    self.fetch_pc = addr;
                }
                AddrMode::PcIndirectX => {
                    let addr = self.fetch_pb16();
                    cap.value = addr;
                    self.fetch_pc = self.fetch_pc.wrapping_sub(1);
                    self.cycle(1);
                    let ret = self.fetch_pc;
                    self.push16(ret);
                    let idx = if x8 { self.regs.x & 0x00FF } else { self.regs.x };
                    let pbr = self.regs.pbr;
                    self.fetch_pc = self.read16_bank(pbr, addr.wrapping_add(idx));
                }
                _ => self.illegal(opcode),
            },
            Op::Jsl => {
                let addr = self.fetch_pb16();
                // Old PBR goes on first; the frame may straddle page 1 even
                // in emulation mode, but S itself still wraps.
                let s = self.regs.s;
                let pbr = self.regs.pbr;
                self.bus_write(pbr, 0x00, s, AccessKind::Stack);
                self.cycle(1);
                let bank = self.fetch_pb();
                self.fetch_pc = self.fetch_pc.wrapping_sub(1);
                let ret = self.fetch_pc;
                self.bus_write((ret >> 8) as u8, 0x00, s.wrapping_sub(1), AccessKind::Stack);
                self.bus_write(ret as u8, 0x00, s.wrapping_sub(2), AccessKind::Stack);
                self.sp_dec3();
                cap.value = addr;
                cap.bank = bank;
                self.regs.pbr = bank;
                self.fetch_pc = addr;
            }
            Op::Rts => {
                self.cycle(2);
                let s = self.regs.s;
                let mut sp = s.wrapping_add(1);
                if self.pins.emulation {
                    sp = (s & 0xFF00) | (sp & 0x00FF);
                }
                let lo = self.bus_read(0x00, sp, AccessKind::Stack) as u16;
                let mut sp2 = sp.wrapping_add(1);
                if self.pins.emulation {
                    sp2 = (s & 0xFF00) | (sp2 & 0x00FF);
                }
                let hi = self.bus_read(0x00, sp2, AccessKind::Stack) as u16;
                self.cycle(1);
                self.sp_inc2();
                self.fetch_pc = ((hi << 8) | lo).wrapping_add(1);
            }
            Op::Rtl => {
                self.cycle(2);
                // The 65816 reads over the top of page 1 here even in
                // emulation mode
                let s = self.regs.s;
                let lo = self.bus_read(0x00, s.wrapping_add(1), AccessKind::Stack) as u16;
                let hi = self.bus_read(0x00, s.wrapping_add(2), AccessKind::Stack) as u16;
                let bank = self.bus_read(0x00, s.wrapping_add(3), AccessKind::Stack);
                self.sp_inc3();
                self.fetch_pc = ((hi << 8) | lo).wrapping_add(1);
                self.regs.pbr = bank;
            }

            // --- Software interrupts ---
            Op::Brk => {
                let sig = self.fetch_pb();
                cap.value = sig as u16;
                cap.imm8 = true;
                let vector = if self.pins.emulation {
                    VECTOR_EMU_IRQBRK
                } else {
                    VECTOR_NATIVE_BRK
                };
                let ret = self.fetch_pc;
                self.fetch_pc = self.interrupt_entry(vector, true, ret);
            }
            Op::Cop => {
                let sig = self.fetch_pb();
                cap.value = sig as u16;
                cap.imm8 = true;
                let vector = if self.pins.emulation {
                    VECTOR_EMU_COP
                } else {
                    VECTOR_NATIVE_COP
                };
                let ret = self.fetch_pc;
                self.fetch_pc = self.interrupt_entry(vector, true, ret);
            }
            Op::Rti => {
                self.cycle(2);
                self.pull_status();
                self.fetch_pc = self.pop16();
                if !self.pins.emulation {
                    self.regs.pbr = self.pop8();
                }
            }

            // --- Status manipulation ---
            Op::Clc => {
                self.set_flag(FLAG_CARRY, false);
                self.cycle(1);
            }
            Op::Cld => {
                self.set_flag(FLAG_DECIMAL, false);
                self.cycle(1);
            }
            Op::Cli => {
                self.set_flag(FLAG_IRQ_DISABLE, false);
                self.cycle(1);
            }
            Op::Clv => {
                self.set_flag(FLAG_OVERFLOW, false);
                self.cycle(1);
            }
            Op::Sec => {
                self.set_flag(FLAG_CARRY, true);
                self.cycle(1);
            }
            Op::Sed => {
                self.set_flag(FLAG_DECIMAL, true);
                self.cycle(1);
            }
            Op::Sei => {
                self.set_flag(FLAG_IRQ_DISABLE, true);
                self.cycle(1);
            }
            Op::Rep => {
                let mask = self.fetch_pb();
                cap.value = mask as u16;
                cap.imm8 = true;
                self.regs.p &= !mask;
                if self.pins.emulation {
                    self.regs.p |= FLAG_MEMORY | FLAG_INDEX;
                }
                self.apply_index_width();
                self.cycle(1);
            }
            Op::Sep => {
                let mut mask = self.fetch_pb();
                cap.value = mask as u16;
                cap.imm8 = true;
                if self.pins.emulation {
                    mask |= FLAG_MEMORY | FLAG_INDEX;
                }
                self.regs.p |= mask;
                self.apply_index_width();
                self.cycle(1);
            }
            Op::Xce => {
                let was_emulation = self.pins.emulation;
                let to_emulation = self.get_flag(FLAG_CARRY);
                self.pins.emulation = to_emulation;
                if was_emulation != to_emulation {
                    self.regs.p |= FLAG_MEMORY | FLAG_INDEX;
                    if to_emulation {
                        // emulation latches the stack into page 1
                        self.regs.s = 0x0100 | (self.regs.s & 0x00FF);
                    }
                    self.apply_index_width();
                }
                self.set_flag(FLAG_CARRY, was_emulation);
                self.cycle(1);
            }

            // --- Stack pushes and pulls ---
            Op::Pha => {
                let a = self.regs.a;
                self.push_reg(a, m8);
            }
            Op::Phx => {
                let x = self.regs.x;
                self.push_reg(x, x8);
            }
            Op::Phy => {
                let y = self.regs.y;
                self.push_reg(y, x8);
            }
            Op::Pla => {
                let v = self.pull_reg(m8);
                if m8 {
                    self.regs.a = (self.regs.a & 0xFF00) | (v & 0x00FF);
                } else {
                    self.regs.a = v;
                }
                self.set_nz(v, m8);
            }
            Op::Plx => {
                let v = self.pull_reg(x8);
                self.regs.x = if x8 { v & 0x00FF } else { v };
                self.set_nz(v, x8);
            }
            Op::Ply => {
                let v = self.pull_reg(x8);
                self.regs.y = if x8 { v & 0x00FF } else { v };
                self.set_nz(v, x8);
            }
            Op::Phb => {
                self.cycle(1);
                let dbr = self.regs.dbr;
                self.push8(dbr);
            }
            Op::Phk => {
                self.cycle(1);
                let pbr = self.regs.pbr;
                self.push8(pbr);
            }
            Op::Php => {
                self.cycle(1);
                self.push_status(false);
            }
            Op::Plb => {
                self.cycle(2);
                self.regs.dbr = self.pop8();
                let dbr = self.regs.dbr;
                self.set_nz8(dbr);
            }
            Op::Phd => {
                self.cycle(1);
                // D may straddle page 1; only the pointer update wraps
                let s = self.regs.s;
                let d = self.regs.d;
                self.bus_write((d >> 8) as u8, 0x00, s, AccessKind::Stack);
                self.bus_write(d as u8, 0x00, s.wrapping_sub(1), AccessKind::Stack);
                self.sp_dec2();
            }
            Op::Pld => {
                self.cycle(2);
                let s = self.regs.s;
                let lo = self.bus_read(0x00, s.wrapping_add(1), AccessKind::Stack) as u16;
                let hi = self.bus_read(0x00, s.wrapping_add(2), AccessKind::Stack) as u16;
                self.regs.d = (hi << 8) | lo;
                self.sp_inc2();
                let d = self.regs.d;
                self.set_nz16(d);
            }
            Op::Plp => {
                self.cycle(2);
                self.pull_status();
            }
            Op::Pea => {
                let addr = self.fetch_pb16();
                cap.value = addr;
                self.sp_dec2();
                self.push16_over_top(addr);
            }
            Op::Pei => {
                let (addr, offset) = self.mode_dp_indirect(0, false);
                cap.value = offset as u16;
                self.sp_dec2();
                self.push16_over_top(addr);
            }
            Op::Per => {
                let off = self.fetch_pb16();
                let target = self.fetch_pc.wrapping_add(off);
                cap.value = target;
                self.cycle(1);
                self.sp_dec2();
                self.push16_over_top(target);
            }

            // --- Transfers ---
            Op::Tax => {
                if x8 {
                    self.regs.x = (self.regs.x & 0xFF00) | (self.regs.a & 0x00FF);
                    let v = self.regs.x as u8;
                    self.set_nz8(v);
                } else {
                    self.regs.x = self.regs.a;
                    let v = self.regs.x;
                    self.set_nz16(v);
                }
                self.cycle(1);
            }
            Op::Tay => {
                if x8 {
                    self.regs.y = (self.regs.y & 0xFF00) | (self.regs.a & 0x00FF);
                    let v = self.regs.y as u8;
                    self.set_nz8(v);
                } else {
                    self.regs.y = self.regs.a;
                    let v = self.regs.y;
                    self.set_nz16(v);
                }
                self.cycle(1);
            }
            Op::Txa => {
                if m8 {
                    self.regs.a = (self.regs.a & 0xFF00) | (self.regs.x & 0x00FF);
                    let v = self.regs.a as u8;
                    self.set_nz8(v);
                } else {
                    self.regs.a = if x8 { self.regs.x & 0x00FF } else { self.regs.x };
                    let v = self.regs.a;
                    self.set_nz16(v);
                }
                self.cycle(1);
            }
            Op::Tya => {
                if m8 {
                    self.regs.a = (self.regs.a & 0xFF00) | (self.regs.y & 0x00FF);
                    let v = self.regs.a as u8;
                    self.set_nz8(v);
                } else {
                    self.regs.a = if x8 { self.regs.y & 0x00FF } else { self.regs.y };
                    let v = self.regs.a;
                    self.set_nz16(v);
                }
                self.cycle(1);
            }
            Op::Txy => {
                if x8 {
                    self.regs.y = (self.regs.y & 0xFF00) | (self.regs.x & 0x00FF);
                    let v = self.regs.y as u8;
                    self.set_nz8(v);
                } else {
                    self.regs.y = self.regs.x;
                    let v = self.regs.y;
                    self.set_nz16(v);
                }
                self.cycle(1);
            }
            Op::Tyx => {
                if x8 {
                    self.regs.x = (self.regs.x & 0xFF00) | (self.regs.y & 0x00FF);
                    let v = self.regs.x as u8;
                    self.set_nz8(v);
                } else {
                    self.regs.x = self.regs.y;
                    let v = self.regs.x;
                    self.set_nz16(v);
                }
                self.cycle(1);
            }
            Op::Tsx => {
                if x8 {
                    self.regs.x = (self.regs.x & 0xFF00) | (self.regs.s & 0x00FF);
                    let v = self.regs.x as u8;
                    self.set_nz8(v);
                } else {
                    self.regs.x = self.regs.s;
                    let v = self.regs.x;
                    self.set_nz16(v);
                }
                self.cycle(1);
            }
            Op::Txs => {
                // No flags
                if self.pins.emulation {
                    self.regs.s = 0x0100 | (self.regs.x & 0x00FF);
                } else if x8 {
                    self.regs.s = self.regs.x & 0x00FF;
                } else {
                    self.regs.s = self.regs.x;
                }
                self.cycle(1);
            }
            Op::Tcs => {
                // Full 16-bit transfer outside emulation mode, no flags
                if self.pins.emulation {
                    self.regs.s = 0x0100 | (self.regs.a & 0x00FF);
                } else {
                    self.regs.s = self.regs.a;
                }
                self.cycle(1);
            }
            Op::Tsc => {
                self.regs.a = self.regs.s;
                let v = self.regs.a;
                self.set_nz16(v);
                self.cycle(1);
            }
            Op::Tcd => {
                self.regs.d = self.regs.a;
                let v = self.regs.d;
                self.set_nz16(v);
                self.cycle(1);
            }
            Op::Tdc => {
                self.regs.a = self.regs.d;
                let v = self.regs.a;
                self.set_nz16(v);
                self.cycle(1);
            }

            // --- Block moves ---
            Op::Mvn | Op::Mvp => {
                let dest_bank = self.fetch_pb();
                let src_bank = self.fetch_pb();
                cap.value = src_bank as u16;
                cap.bank = dest_bank;
                let x = self.regs.x;
                let y = self.regs.y;
                let byte = self.bus_read(src_bank, x, AccessKind::Data);
                self.bus_write(byte, dest_bank, y, AccessKind::Data);
                let delta: u16 = if desc.op == Op::Mvn { 1 } else { 0xFFFF };
                if x8 {
                    self.regs.x = (x & 0xFF00) | (x.wrapping_add(delta) & 0x00FF);
                    self.regs.y = (y & 0xFF00) | (y.wrapping_add(delta) & 0x00FF);
                } else {
                    self.regs.x = x.wrapping_add(delta);
                    self.regs.y = y.wrapping_add(delta);
                }
                self.cycle(2);
                self.regs.a = self.regs.a.wrapping_sub(1);
                if self.regs.a != 0xFFFF {
                    // Restart: rewind to the opcode so the move resumes on
                    // the next step
                    self.fetch_pc = self.regs.pc;
                }
                self.regs.dbr = dest_bank;
            }

            // --- Control ---
            Op::Nop => {
                self.cycle(1);
            }
            Op::Wdm => {
                // Reserved; consumes its signature byte with no observable
                // side effects
                let sig = self.fetch_pb();
                cap.value = sig as u16;
                cap.imm8 = true;
            }
            Op::Xba => {
                let a = self.regs.a;
                self.regs.a = (a >> 8) | (a << 8);
                let lo = self.regs.a as u8;
                self.set_nz8(lo);
                self.cycle(2);
            }
            Op::Wai => {
                self.cycle(2);
                self.pins.ready_out = false;
                log(LogCategory::Cpu, LogLevel::Debug, || {
                    "WAI: halting until interrupt".to_string()
                });
            }
            Op::Stp => {
                self.cycle(2);
                self.enabled = false;
                log(LogCategory::Cpu, LogLevel::Debug, || {
                    "STP: stopped until reset".to_string()
                });
            }
        }

        cap
    }

    /// Resolve a value-producing addressing mode at the given operand width.
    fn read_operand(
        &mut self,
        mode: AddrMode,
        w8: bool,
        x8: bool,
        cap: &mut OperandCapture,
    ) -> u16 {
        match mode {
            AddrMode::Immediate => {
                let v = if w8 {
                    self.fetch_pb() as u16
                } else {
                    self.fetch_pb16()
                };
                cap.value = v;
                cap.imm8 = w8;
                v
            }
            AddrMode::Absolute => {
                let addr = self.fetch_pb16();
                cap.value = addr;
                let dbr = self.regs.dbr;
                self.read_data(dbr, addr, w8)
            }
            AddrMode::AbsoluteLong => {
                let addr = self.fetch_pb16();
                let bank = self.fetch_pb();
                cap.value = addr;
                cap.bank = bank;
                self.read_data(bank, addr, w8)
            }
            AddrMode::AbsoluteX => {
                let addr = self.fetch_pb16();
                cap.value = addr;
                let dbr = self.regs.dbr;
                let x = self.regs.x;
                self.read_data_indexed(dbr, addr, x, w8, x8)
            }
            AddrMode::AbsoluteY => {
                let addr = self.fetch_pb16();
                cap.value = addr;
                let dbr = self.regs.dbr;
                let y = self.regs.y;
                self.read_data_indexed(dbr, addr, y, w8, x8)
            }
            AddrMode::AbsoluteLongX => {
                let addr = self.fetch_pb16();
                let bank = self.fetch_pb();
                cap.value = addr;
                cap.bank = bank;
                let x = self.regs.x;
                self.read_data_indexed(bank, addr, x, w8, x8)
            }
            AddrMode::DirectPage => {
                let (addr, offset) = self.mode_dp(0, false);
                cap.value = offset as u16;
                self.read_data_bank0(addr, w8)
            }
            AddrMode::DirectPageX => {
                let x = self.regs.x;
                let (addr, offset) = self.mode_dp(x, x8);
                cap.value = offset as u16;
                self.cycle(1);
                self.read_data_bank0(addr, w8)
            }
            AddrMode::DirectPageY => {
                let y = self.regs.y;
                let (addr, offset) = self.mode_dp(y, x8);
                cap.value = offset as u16;
                self.cycle(1);
                self.read_data_bank0(addr, w8)
            }
            AddrMode::DpIndirect => {
                let (addr, offset) = self.mode_dp_indirect(0, false);
                cap.value = offset as u16;
                let dbr = self.regs.dbr;
                self.read_data(dbr, addr, w8)
            }
            AddrMode::DpXIndirect => {
                let x = self.regs.x;
                let (addr, offset) = self.mode_dp_indirect(x, x8);
                cap.value = offset as u16;
                self.cycle(1);
                let dbr = self.regs.dbr;
                self.read_data(dbr, addr, w8)
            }
            AddrMode::DpIndirectY => {
                let (addr, offset) = self.mode_dp_indirect(0, false);
                cap.value = offset as u16;
                let dbr = self.regs.dbr;
                let y = self.regs.y;
                self.read_data_indexed(dbr, addr, y, w8, x8)
            }
            AddrMode::DpIndirectLong => {
                let (addr, bank, offset) = self.mode_dp_indirect_long(0, false);
                cap.value = offset as u16;
                self.read_data(bank, addr, w8)
            }
            AddrMode::DpIndirectLongY => {
                let (addr, bank, offset) = self.mode_dp_indirect_long(0, false);
                cap.value = offset as u16;
                let y = self.regs.y;
                self.read_data_indexed(bank, addr, y, w8, x8)
            }
            AddrMode::StackRelative => {
                let (addr, offset) = self.mode_stack_rel();
                cap.value = offset as u16;
                self.read_data_bank0(addr, w8)
            }
            AddrMode::StackRelativeIndirectY => {
                let (addr, offset) = self.mode_stack_rel_indirect();
                cap.value = offset as u16;
                let dbr = self.regs.dbr;
                let y = self.regs.y;
                self.read_data_indexed(dbr, addr, y, w8, x8)
            }
            _ => {
                self.illegal(self.regs.ir);
                0
            }
        }
    }

    /// Resolve a store's addressing mode and write `value` at the given
    /// width. Indexed stores always charge the extra internal cycle.
    fn write_operand(
        &mut self,
        mode: AddrMode,
        value: u16,
        w8: bool,
        x8: bool,
        cap: &mut OperandCapture,
    ) {
        match mode {
            AddrMode::Absolute => {
                let addr = self.fetch_pb16();
                cap.value = addr;
                let dbr = self.regs.dbr;
                self.write_data(value, dbr, addr, w8);
            }
            AddrMode::AbsoluteLong => {
                let addr = self.fetch_pb16();
                let bank = self.fetch_pb();
                cap.value = addr;
                cap.bank = bank;
                self.write_data(value, bank, addr, w8);
            }
            AddrMode::AbsoluteX => {
                let addr = self.fetch_pb16();
                cap.value = addr;
                self.cycle(1);
                let dbr = self.regs.dbr;
                let x = self.regs.x;
                self.write_data_indexed(value, dbr, addr, x, w8, x8);
            }
            AddrMode::AbsoluteY => {
                let addr = self.fetch_pb16();
                cap.value = addr;
                self.cycle(1);
                let dbr = self.regs.dbr;
                let y = self.regs.y;
                self.write_data_indexed(value, dbr, addr, y, w8, x8);
            }
            AddrMode::AbsoluteLongX => {
                let addr = self.fetch_pb16();
                let bank = self.fetch_pb();
                cap.value = addr;
                cap.bank = bank;
                let x = self.regs.x;
                self.write_data_indexed(value, bank, addr, x, w8, x8);
            }
            AddrMode::DirectPage => {
                let (addr, offset) = self.mode_dp(0, false);
                cap.value = offset as u16;
                self.write_data_bank0(value, addr, w8);
            }
            AddrMode::DirectPageX => {
                let x = self.regs.x;
                let (addr, offset) = self.mode_dp(x, x8);
                cap.value = offset as u16;
                self.cycle(1);
                self.write_data_bank0(value, addr, w8);
            }
            AddrMode::DirectPageY => {
                let y = self.regs.y;
                let (addr, offset) = self.mode_dp(y, x8);
                cap.value = offset as u16;
                self.cycle(1);
                self.write_data_bank0(value, addr, w8);
            }
            AddrMode::DpIndirect => {
                let (addr, offset) = self.mode_dp_indirect(0, false);
                cap.value = offset as u16;
                let dbr = self.regs.dbr;
                self.write_data(value, dbr, addr, w8);
            }
            AddrMode::DpXIndirect => {
                let x = self.regs.x;
                let (addr, offset) = self.mode_dp_indirect(x, x8);
                cap.value = offset as u16;
                self.cycle(1);
                let dbr = self.regs.dbr;
                self.write_data(value, dbr, addr, w8);
            }
            AddrMode::DpIndirectY => {
                let (addr, offset) = self.mode_dp_indirect(0, false);
                cap.value = offset as u16;
                self.cycle(1);
                let dbr = self.regs.dbr;
                let y = self.regs.y;
                self.write_data_indexed(value, dbr, addr, y, w8, x8);
            }
            AddrMode::DpIndirectLong => {
                let (addr, bank, offset) = self.mode_dp_indirect_long(0, false);
                cap.value = offset as u16;
                self.write_data(value, bank, addr, w8);
            }
            AddrMode::DpIndirectLongY => {
                let (addr, bank, offset) = self.mode_dp_indirect_long(0, false);
                cap.value = offset as u16;
                let y = self.regs.y;
                self.write_data_indexed(value, bank, addr, y, w8, x8);
            }
            AddrMode::StackRelative => {
                let (addr, offset) = self.mode_stack_rel();
                cap.value = offset as u16;
                self.write_data_bank0(value, addr, w8);
            }
            AddrMode::StackRelativeIndirectY => {
                let (addr, offset) = self.mode_stack_rel_indirect();
                cap.value = offset as u16;
                let dbr = self.regs.dbr;
                let y = self.regs.y;
                self.write_data_indexed(value, dbr, addr, y, w8, x8);
            }
            _ => self.illegal(self.regs.ir),
        }
    }

    fn apply_rmw(&mut self, kind: Rmw, value: u16, w8: bool) -> u16 {
        match kind {
            Rmw::Asl => self.asl(value, w8),
            Rmw::Lsr => self.lsr(value, w8),
            Rmw::Rol => self.rol(value, w8),
            Rmw::Ror => self.ror(value, w8),
            Rmw::Inc => self.inc_value(value, w8),
            Rmw::Dec => self.dec_value(value, w8),
            Rmw::Tsb => self.tsb(value, w8),
            Rmw::Trb => self.trb(value, w8),
        }
    }

    /// Read-modify-write resolution: the modify step always costs one
    /// internal cycle before the write-back.
    fn rmw_operand(
        &mut self,
        kind: Rmw,
        mode: AddrMode,
        w8: bool,
        x8: bool,
        cap: &mut OperandCapture,
    ) {
        match mode {
            AddrMode::Implied => {
                // Accumulator form
                let v = if w8 {
                    self.regs.a & 0x00FF
                } else {
                    self.regs.a
                };
                let r = self.apply_rmw(kind, v, w8);
                if w8 {
                    self.regs.a = (self.regs.a & 0xFF00) | (r & 0x00FF);
                } else {
                    self.regs.a = r;
                }
                self.cycle(1);
            }
            AddrMode::Absolute => {
                let addr = self.fetch_pb16();
                cap.value = addr;
                let dbr = self.regs.dbr;
                let v = self.read_data(dbr, addr, w8);
                let r = self.apply_rmw(kind, v, w8);
                self.cycle(1);
                self.write_data(r, dbr, addr, w8);
            }
            AddrMode::DirectPage => {
                let (addr, offset) = self.mode_dp(0, false);
                cap.value = offset as u16;
                let v = self.read_data_bank0(addr, w8);
                let r = self.apply_rmw(kind, v, w8);
                self.cycle(1);
                self.write_data_bank0(r, addr, w8);
            }
            AddrMode::AbsoluteX => {
                let addr = self.fetch_pb16();
                cap.value = addr;
                self.cycle(1);
                let dbr = self.regs.dbr;
                let x = self.regs.x;
                let v = self.read_data_indexed(dbr, addr, x, w8, x8);
                let r = self.apply_rmw(kind, v, w8);
                self.cycle(1);
                self.write_data_indexed(r, dbr, addr, x, w8, x8);
            }
            AddrMode::DirectPageX => {
                let x = self.regs.x;
                let (addr, offset) = self.mode_dp(x, x8);
                cap.value = offset as u16;
                self.cycle(1);
                let v = self.read_data_bank0(addr, w8);
                let r = self.apply_rmw(kind, v, w8);
                self.cycle(1);
                self.write_data_bank0(r, addr, w8);
            }
            _ => self.illegal(self.regs.ir),
        }
    }

    /// Conditional branch: +1 cycle when taken, +1 more when the target is
    /// in a different page and the core is in emulation mode.
    fn branch(&mut self, condition: bool, cap: &mut OperandCapture) {
        let offset = self.fetch_pb();
        cap.value = offset as u16;
        if condition {
            self.cycle(1);
            let target = self.fetch_pc.wrapping_add(offset as i8 as u16);
            if self.pins.emulation && (target & 0xFF00) != (self.fetch_pc & 0xFF00) {
                self.cycle(1);
            }
            self.fetch_pc = target;
        }
    }

    /// Push at `cycle(1)` plus one write per byte at the current width.
    fn push_reg(&mut self, value: u16, w8: bool) {
        self.cycle(1);
        if !w8 {
            self.push8((value >> 8) as u8);
        }
        self.push8(value as u8);
    }

    /// Pull after two internal cycles, one read per byte.
    fn pull_reg(&mut self, w8: bool) -> u16 {
        self.cycle(2);
        let lo = self.pop8() as u16;
        if w8 {
            lo
        } else {
            let hi = self.pop8() as u16;
            (hi << 8) | lo
        }
    }

    /// 16-bit read within one bank, offset wrapping at 0xFFFF.
    pub(crate) fn read16_bank(&mut self, bank: u8, addr: u16) -> u16 {
        let lo = self.bus_read(bank, addr, AccessKind::Data) as u16;
        let hi = self.bus_read(bank, addr.wrapping_add(1), AccessKind::Data) as u16;
        (hi << 8) | lo
    }

    /// PEA/PEI/PER write their 16-bit value above the already-decremented
    /// stack pointer; the bytes may straddle page 1 in emulation mode.
    fn push16_over_top(&mut self, value: u16) {
        let s = self.regs.s;
        self.bus_write((value >> 8) as u8, 0x00, s.wrapping_add(2), AccessKind::Stack);
        self.bus_write(value as u8, 0x00, s.wrapping_add(1), AccessKind::Stack);
    }

    /// Dense map: reaching this is an implementation bug. Debug builds
    /// assert; release builds degrade to a 2-cycle NOP and log.
    fn illegal(&mut self, opcode: u8) {
        debug_assert!(false, "unhandled opcode/mode pairing {:02X}", opcode);
        log(LogCategory::Cpu, LogLevel::Warn, || {
            format!("unhandled opcode {:02X}; treating as NOP", opcode)
        });
        self.cycle(1);
    }
}
