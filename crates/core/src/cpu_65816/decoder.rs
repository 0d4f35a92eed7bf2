//! Static opcode decoder for the WDC 65C816.
//!
//! All 256 encodings are defined; the table drives both instruction dispatch
//! and disassembly of trace records. Each entry pairs an operation with its
//! addressing mode; operand width and cycle charging are resolved at
//! execution time from the M/X status flags.

/// Operation mnemonic, one variant per distinct 65C816 instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Bra, Brk, Brl, Bvc,
    Bvs, Clc, Cld, Cli, Clv, Cmp, Cop, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc,
    Inx, Iny, Jml, Jmp, Jsl, Jsr, Lda, Ldx, Ldy, Lsr, Mvn, Mvp, Nop, Ora,
    Pea, Pei, Per, Pha, Phb, Phd, Phk, Php, Phx, Phy, Pla, Plb, Pld, Plp,
    Plx, Ply, Rep, Rol, Ror, Rti, Rtl, Rts, Sbc, Sec, Sed, Sei, Sep, Sta,
    Stp, Stx, Sty, Stz, Tax, Tay, Tcd, Tcs, Tdc, Trb, Tsb, Tsc, Tsx, Txa,
    Txs, Txy, Tya, Tyx, Wai, Wdm, Xba, Xce,
}

impl Op {
    /// Three-character assembler mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Op::Adc => "ADC", Op::And => "AND", Op::Asl => "ASL",
            Op::Bcc => "BCC", Op::Bcs => "BCS", Op::Beq => "BEQ",
            Op::Bit => "BIT", Op::Bmi => "BMI", Op::Bne => "BNE",
            Op::Bpl => "BPL", Op::Bra => "BRA", Op::Brk => "BRK",
            Op::Brl => "BRL", Op::Bvc => "BVC", Op::Bvs => "BVS",
            Op::Clc => "CLC", Op::Cld => "CLD", Op::Cli => "CLI",
            Op::Clv => "CLV", Op::Cmp => "CMP", Op::Cop => "COP",
            Op::Cpx => "CPX", Op::Cpy => "CPY", Op::Dec => "DEC",
            Op::Dex => "DEX", Op::Dey => "DEY", Op::Eor => "EOR",
            Op::Inc => "INC", Op::Inx => "INX", Op::Iny => "INY",
            Op::Jml => "JML", Op::Jmp => "JMP", Op::Jsl => "JSL",
            Op::Jsr => "JSR", Op::Lda => "LDA", Op::Ldx => "LDX",
            Op::Ldy => "LDY", Op::Lsr => "LSR", Op::Mvn => "MVN",
            Op::Mvp => "MVP", Op::Nop => "NOP", Op::Ora => "ORA",
            Op::Pea => "PEA", Op::Pei => "PEI", Op::Per => "PER",
            Op::Pha => "PHA", Op::Phb => "PHB", Op::Phd => "PHD",
            Op::Phk => "PHK", Op::Php => "PHP", Op::Phx => "PHX",
            Op::Phy => "PHY", Op::Pla => "PLA", Op::Plb => "PLB",
            Op::Pld => "PLD", Op::Plp => "PLP", Op::Plx => "PLX",
            Op::Ply => "PLY", Op::Rep => "REP", Op::Rol => "ROL",
            Op::Ror => "ROR", Op::Rti => "RTI", Op::Rtl => "RTL",
            Op::Rts => "RTS", Op::Sbc => "SBC", Op::Sec => "SEC",
            Op::Sed => "SED", Op::Sei => "SEI", Op::Sep => "SEP",
            Op::Sta => "STA", Op::Stp => "STP", Op::Stx => "STX",
            Op::Sty => "STY", Op::Stz => "STZ", Op::Tax => "TAX",
            Op::Tay => "TAY", Op::Tcd => "TCD", Op::Tcs => "TCS",
            Op::Tdc => "TDC", Op::Trb => "TRB", Op::Tsb => "TSB",
            Op::Tsc => "TSC", Op::Tsx => "TSX", Op::Txa => "TXA",
            Op::Txs => "TXS", Op::Txy => "TXY", Op::Tya => "TYA",
            Op::Tyx => "TYX", Op::Wai => "WAI", Op::Wdm => "WDM",
            Op::Xba => "XBA", Op::Xce => "XCE",
        }
    }
}

/// The 24 addressing modes of the 65C816 plus implied and the BRK/COP/WDM
/// signature byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// No operand (register or implied operations)
    Implied,
    /// `#$nn` / `#$nnnn` -- operand width follows M or X
    Immediate,
    /// `$nnnn` in the data bank
    Absolute,
    /// `$bb:nnnn` with an operand-supplied bank
    AbsoluteLong,
    /// `$nnnn, X`
    AbsoluteX,
    /// `$bb:nnnn, X`
    AbsoluteLongX,
    /// `$nnnn, Y`
    AbsoluteY,
    /// `$nn` relative to the D register, bank 0
    DirectPage,
    /// `$nn, X`
    DirectPageX,
    /// `$nn, Y`
    DirectPageY,
    /// `($nn)`
    DpIndirect,
    /// `[$nn]` -- 24-bit pointer
    DpIndirectLong,
    /// `($nn, X)`
    DpXIndirect,
    /// `($nn), Y`
    DpIndirectY,
    /// `[$nn], Y`
    DpIndirectLongY,
    /// 8-bit signed branch offset
    PcRelative,
    /// 16-bit signed branch offset (BRL, PER)
    PcRelativeLong,
    /// `$nnnn` jump target within the program bank
    PcAbsolute,
    /// `($nnnn)` -- pointer in bank 0
    PcIndirect,
    /// `($nnnn, X)` -- pointer in the program bank
    PcIndirectX,
    /// `$bb:nnnn` long jump target
    PcLong,
    /// `[$nnnn]` -- 24-bit pointer in bank 0
    PcLongIndirect,
    /// `$nn, S`
    StackRelative,
    /// `($nn, S), Y`
    StackRelativeIndirectY,
    /// Two bank bytes (MVN/MVP)
    MoveBlock,
    /// Single signature byte (BRK, COP, WDM)
    Signature,
}

/// One opcode's static description: mnemonic plus addressing mode.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeDesc {
    pub op: Op,
    pub mode: AddrMode,
}

const fn d(op: Op, mode: AddrMode) -> OpcodeDesc {
    OpcodeDesc { op, mode }
}

use AddrMode as M;

/// The full 256-entry opcode map. The 65C816 map is dense; every encoding is
/// a defined instruction.
pub static OPCODES: [OpcodeDesc; 256] = [
    // 0x00
    d(Op::Brk, M::Signature),
    d(Op::Ora, M::DpXIndirect),
    d(Op::Cop, M::Signature),
    d(Op::Ora, M::StackRelative),
    d(Op::Tsb, M::DirectPage),
    d(Op::Ora, M::DirectPage),
    d(Op::Asl, M::DirectPage),
    d(Op::Ora, M::DpIndirectLong),
    d(Op::Php, M::Implied),
    d(Op::Ora, M::Immediate),
    d(Op::Asl, M::Implied),
    d(Op::Phd, M::Implied),
    d(Op::Tsb, M::Absolute),
    d(Op::Ora, M::Absolute),
    d(Op::Asl, M::Absolute),
    d(Op::Ora, M::AbsoluteLong),
    // 0x10
    d(Op::Bpl, M::PcRelative),
    d(Op::Ora, M::DpIndirectY),
    d(Op::Ora, M::DpIndirect),
    d(Op::Ora, M::StackRelativeIndirectY),
    d(Op::Trb, M::DirectPage),
    d(Op::Ora, M::DirectPageX),
    d(Op::Asl, M::DirectPageX),
    d(Op::Ora, M::DpIndirectLongY),
    d(Op::Clc, M::Implied),
    d(Op::Ora, M::AbsoluteY),
    d(Op::Inc, M::Implied),
    d(Op::Tcs, M::Implied),
    d(Op::Trb, M::Absolute),
    d(Op::Ora, M::AbsoluteX),
    d(Op::Asl, M::AbsoluteX),
    d(Op::Ora, M::AbsoluteLongX),
    // 0x20
    d(Op::Jsr, M::PcAbsolute),
    d(Op::And, M::DpXIndirect),
    d(Op::Jsl, M::PcLong),
    d(Op::And, M::StackRelative),
    d(Op::Bit, M::DirectPage),
    d(Op::And, M::DirectPage),
    d(Op::Rol, M::DirectPage),
    d(Op::And, M::DpIndirectLong),
    d(Op::Plp, M::Implied),
    d(Op::And, M::Immediate),
    d(Op::Rol, M::Implied),
    d(Op::Pld, M::Implied),
    d(Op::Bit, M::Absolute),
    d(Op::And, M::Absolute),
    d(Op::Rol, M::Absolute),
    d(Op::And, M::AbsoluteLong),
    // 0x30
    d(Op::Bmi, M::PcRelative),
    d(Op::And, M::DpIndirectY),
    d(Op::And, M::DpIndirect),
    d(Op::And, M::StackRelativeIndirectY),
    d(Op::Bit, M::DirectPageX),
    d(Op::And, M::DirectPageX),
    d(Op::Rol, M::DirectPageX),
    d(Op::And, M::DpIndirectLongY),
    d(Op::Sec, M::Implied),
    d(Op::And, M::AbsoluteY),
    d(Op::Dec, M::Implied),
    d(Op::Tsc, M::Implied),
    d(Op::Bit, M::AbsoluteX),
    d(Op::And, M::AbsoluteX),
    d(Op::Rol, M::AbsoluteX),
    d(Op::And, M::AbsoluteLongX),
    // 0x40
    d(Op::Rti, M::Implied),
    d(Op::Eor, M::DpXIndirect),
    d(Op::Wdm, M::Signature),
    d(Op::Eor, M::StackRelative),
    d(Op::Mvp, M::MoveBlock),
    d(Op::Eor, M::DirectPage),
    d(Op::Lsr, M::DirectPage),
    d(Op::Eor, M::DpIndirectLong),
    d(Op::Pha, M::Implied),
    d(Op::Eor, M::Immediate),
    d(Op::Lsr, M::Implied),
    d(Op::Phk, M::Implied),
    d(Op::Jmp, M::PcAbsolute),
    d(Op::Eor, M::Absolute),
    d(Op::Lsr, M::Absolute),
    d(Op::Eor, M::AbsoluteLong),
    // 0x50
    d(Op::Bvc, M::PcRelative),
    d(Op::Eor, M::DpIndirectY),
    d(Op::Eor, M::DpIndirect),
    d(Op::Eor, M::StackRelativeIndirectY),
    d(Op::Mvn, M::MoveBlock),
    d(Op::Eor, M::DirectPageX),
    d(Op::Lsr, M::DirectPageX),
    d(Op::Eor, M::DpIndirectLongY),
    d(Op::Cli, M::Implied),
    d(Op::Eor, M::AbsoluteY),
    d(Op::Phy, M::Implied),
    d(Op::Tcd, M::Implied),
    d(Op::Jml, M::PcLong),
    d(Op::Eor, M::AbsoluteX),
    d(Op::Lsr, M::AbsoluteX),
    d(Op::Eor, M::AbsoluteLongX),
    // 0x60
    d(Op::Rts, M::Implied),
    d(Op::Adc, M::DpXIndirect),
    d(Op::Per, M::PcRelativeLong),
    d(Op::Adc, M::StackRelative),
    d(Op::Stz, M::DirectPage),
    d(Op::Adc, M::DirectPage),
    d(Op::Ror, M::DirectPage),
    d(Op::Adc, M::DpIndirectLong),
    d(Op::Pla, M::Implied),
    d(Op::Adc, M::Immediate),
    d(Op::Ror, M::Implied),
    d(Op::Rtl, M::Implied),
    d(Op::Jmp, M::PcIndirect),
    d(Op::Adc, M::Absolute),
    d(Op::Ror, M::Absolute),
    d(Op::Adc, M::AbsoluteLong),
    // 0x70
    d(Op::Bvs, M::PcRelative),
    d(Op::Adc, M::DpIndirectY),
    d(Op::Adc, M::DpIndirect),
    d(Op::Adc, M::StackRelativeIndirectY),
    d(Op::Stz, M::DirectPageX),
    d(Op::Adc, M::DirectPageX),
    d(Op::Ror, M::DirectPageX),
    d(Op::Adc, M::DpIndirectLongY),
    d(Op::Sei, M::Implied),
    d(Op::Adc, M::AbsoluteY),
    d(Op::Ply, M::Implied),
    d(Op::Tdc, M::Implied),
    d(Op::Jmp, M::PcIndirectX),
    d(Op::Adc, M::AbsoluteX),
    d(Op::Ror, M::AbsoluteX),
    d(Op::Adc, M::AbsoluteLongX),
    // 0x80
    d(Op::Bra, M::PcRelative),
    d(Op::Sta, M::DpXIndirect),
    d(Op::Brl, M::PcRelativeLong),
    d(Op::Sta, M::StackRelative),
    d(Op::Sty, M::DirectPage),
    d(Op::Sta, M::DirectPage),
    d(Op::Stx, M::DirectPage),
    d(Op::Sta, M::DpIndirectLong),
    d(Op::Dey, M::Implied),
    d(Op::Bit, M::Immediate),
    d(Op::Txa, M::Implied),
    d(Op::Phb, M::Implied),
    d(Op::Sty, M::Absolute),
    d(Op::Sta, M::Absolute),
    d(Op::Stx, M::Absolute),
    d(Op::Sta, M::AbsoluteLong),
    // 0x90
    d(Op::Bcc, M::PcRelative),
    d(Op::Sta, M::DpIndirectY),
    d(Op::Sta, M::DpIndirect),
    d(Op::Sta, M::StackRelativeIndirectY),
    d(Op::Sty, M::DirectPageX),
    d(Op::Sta, M::DirectPageX),
    d(Op::Stx, M::DirectPageY),
    d(Op::Sta, M::DpIndirectLongY),
    d(Op::Tya, M::Implied),
    d(Op::Sta, M::AbsoluteY),
    d(Op::Txs, M::Implied),
    d(Op::Txy, M::Implied),
    d(Op::Stz, M::Absolute),
    d(Op::Sta, M::AbsoluteX),
    d(Op::Stz, M::AbsoluteX),
    d(Op::Sta, M::AbsoluteLongX),
    // 0xA0
    d(Op::Ldy, M::Immediate),
    d(Op::Lda, M::DpXIndirect),
    d(Op::Ldx, M::Immediate),
    d(Op::Lda, M::StackRelative),
    d(Op::Ldy, M::DirectPage),
    d(Op::Lda, M::DirectPage),
    d(Op::Ldx, M::DirectPage),
    d(Op::Lda, M::DpIndirectLong),
    d(Op::Tay, M::Implied),
    d(Op::Lda, M::Immediate),
    d(Op::Tax, M::Implied),
    d(Op::Plb, M::Implied),
    d(Op::Ldy, M::Absolute),
    d(Op::Lda, M::Absolute),
    d(Op::Ldx, M::Absolute),
    d(Op::Lda, M::AbsoluteLong),
    // 0xB0
    d(Op::Bcs, M::PcRelative),
    d(Op::Lda, M::DpIndirectY),
    d(Op::Lda, M::DpIndirect),
    d(Op::Lda, M::StackRelativeIndirectY),
    d(Op::Ldy, M::DirectPageX),
    d(Op::Lda, M::DirectPageX),
    d(Op::Ldx, M::DirectPageY),
    d(Op::Lda, M::DpIndirectLongY),
    d(Op::Clv, M::Implied),
    d(Op::Lda, M::AbsoluteY),
    d(Op::Tsx, M::Implied),
    d(Op::Tyx, M::Implied),
    d(Op::Ldy, M::AbsoluteX),
    d(Op::Lda, M::AbsoluteX),
    d(Op::Ldx, M::AbsoluteY),
    d(Op::Lda, M::AbsoluteLongX),
    // 0xC0
    d(Op::Cpy, M::Immediate),
    d(Op::Cmp, M::DpXIndirect),
    d(Op::Rep, M::Immediate),
    d(Op::Cmp, M::StackRelative),
    d(Op::Cpy, M::DirectPage),
    d(Op::Cmp, M::DirectPage),
    d(Op::Dec, M::DirectPage),
    d(Op::Cmp, M::DpIndirectLong),
    d(Op::Iny, M::Implied),
    d(Op::Cmp, M::Immediate),
    d(Op::Dex, M::Implied),
    d(Op::Wai, M::Implied),
    d(Op::Cpy, M::Absolute),
    d(Op::Cmp, M::Absolute),
    d(Op::Dec, M::Absolute),
    d(Op::Cmp, M::AbsoluteLong),
    // 0xD0
    d(Op::Bne, M::PcRelative),
    d(Op::Cmp, M::DpIndirectY),
    d(Op::Cmp, M::DpIndirect),
    d(Op::Cmp, M::StackRelativeIndirectY),
    d(Op::Pei, M::DpIndirect),
    d(Op::Cmp, M::DirectPageX),
    d(Op::Dec, M::DirectPageX),
    d(Op::Cmp, M::DpIndirectLongY),
    d(Op::Cld, M::Implied),
    d(Op::Cmp, M::AbsoluteY),
    d(Op::Phx, M::Implied),
    d(Op::Stp, M::Implied),
    d(Op::Jml, M::PcLongIndirect),
    d(Op::Cmp, M::AbsoluteX),
    d(Op::Dec, M::AbsoluteX),
    d(Op::Cmp, M::AbsoluteLongX),
    // 0xE0
    d(Op::Cpx, M::Immediate),
    d(Op::Sbc, M::DpXIndirect),
    d(Op::Sep, M::Immediate),
    d(Op::Sbc, M::StackRelative),
    d(Op::Cpx, M::DirectPage),
    d(Op::Sbc, M::DirectPage),
    d(Op::Inc, M::DirectPage),
    d(Op::Sbc, M::DpIndirectLong),
    d(Op::Inx, M::Implied),
    d(Op::Sbc, M::Immediate),
    d(Op::Nop, M::Implied),
    d(Op::Xba, M::Implied),
    d(Op::Cpx, M::Absolute),
    d(Op::Sbc, M::Absolute),
    d(Op::Inc, M::Absolute),
    d(Op::Sbc, M::AbsoluteLong),
    // 0xF0
    d(Op::Beq, M::PcRelative),
    d(Op::Sbc, M::DpIndirectY),
    d(Op::Sbc, M::DpIndirect),
    d(Op::Sbc, M::StackRelativeIndirectY),
    d(Op::Pea, M::Absolute),
    d(Op::Sbc, M::DirectPageX),
    d(Op::Inc, M::DirectPageX),
    d(Op::Sbc, M::DpIndirectLongY),
    d(Op::Sed, M::Implied),
    d(Op::Sbc, M::AbsoluteY),
    d(Op::Plx, M::Implied),
    d(Op::Xce, M::Implied),
    d(Op::Jsr, M::PcIndirectX),
    d(Op::Sbc, M::AbsoluteX),
    d(Op::Inc, M::AbsoluteX),
    d(Op::Sbc, M::AbsoluteLongX),
];

/// Format an instruction operand for a trace record or disassembly line.
///
/// `value`/`bank` carry whatever the executor captured for the mode;
/// `imm8` selects the short immediate form when the operand width was 8-bit.
pub fn format_operand(desc: &OpcodeDesc, value: u16, bank: u8, imm8: bool) -> String {
    match desc.mode {
        AddrMode::Implied => String::new(),
        AddrMode::Immediate => {
            if imm8 {
                format!("#${:02X}", value as u8)
            } else {
                format!("#${:04X}", value)
            }
        }
        AddrMode::Absolute => format!("${:04X}", value),
        AddrMode::AbsoluteLong => format!("${:02X}{:04X}", bank, value),
        AddrMode::AbsoluteX => format!("${:04X}, X", value),
        AddrMode::AbsoluteY => format!("${:04X}, Y", value),
        AddrMode::AbsoluteLongX => format!("${:02X}{:04X}, X", bank, value),
        AddrMode::DirectPage => format!("${:02X}", value as u8),
        AddrMode::DirectPageX => format!("${:02X}, X", value as u8),
        AddrMode::DirectPageY => format!("${:02X}, Y", value as u8),
        AddrMode::DpIndirect => format!("(${:02X})", value as u8),
        AddrMode::DpIndirectLong => format!("[${:02X}]", value as u8),
        AddrMode::DpXIndirect => format!("(${:02X}, X)", value as u8),
        AddrMode::DpIndirectY => format!("(${:02X}), Y", value as u8),
        AddrMode::DpIndirectLongY => format!("[${:02X}], Y", value as u8),
        AddrMode::PcRelative => format!("${:02X} ({})", value as u8, value as u8 as i8),
        AddrMode::PcRelativeLong => format!("${:04X} ({})", value, value as i16),
        AddrMode::PcAbsolute => format!("${:04X}", value),
        AddrMode::PcIndirect => format!("(${:04X})", value),
        AddrMode::PcIndirectX => format!("(${:04X}, X)", value),
        AddrMode::PcLong => format!("${:02X}{:04X}", bank, value),
        AddrMode::PcLongIndirect => format!("[${:04X}]", value),
        AddrMode::StackRelative => format!("${:02X}, S", value as u8),
        AddrMode::StackRelativeIndirectY => format!("(${:02X}, S), Y", value as u8),
        AddrMode::MoveBlock => format!("s:${:02X}, d:${:02X}", value as u8, bank),
        AddrMode::Signature => format!("${:02X}", value as u8),
    }
}
