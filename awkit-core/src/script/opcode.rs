use std::convert::TryFrom;
use std::fmt;

use super::labels::LabelKind;

/// Opcodes with a fixed operand layout, plus `CJMP`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    SetI = 0x00,
    SetR = 0x01,
    AddR = 0x02,
    AddI = 0x03,
    Call = 0x04,
    Ret = 0x05,
    Yield = 0x06,
    Jump = 0x07,
    Start = 0x08,
    Dbra = 0x09,
    CJmp = 0x0A,
    Fade = 0x0B,
    Reset = 0x0C,
    Page = 0x0D,
    Fill = 0x0E,
    Copy = 0x0F,
    Show = 0x10,
    Halt = 0x11,
    Print = 0x12,
    SubR = 0x13,
    AndI = 0x14,
    IorI = 0x15,
    LslI = 0x16,
    LsrI = 0x17,
    Sound = 0x18,
    Load = 0x19,
    Music = 0x1A,
}

/// First opcode of the polygon families; anything from here up to
/// [`POLY1_START`] is not a valid instruction.
pub const POLY_BEGIN: u8 = 0x1B;
pub const POLY1_START: u8 = 0x40;
pub const POLY2_START: u8 = 0x80;

impl TryFrom<u8> for Opcode {
    type Error = ();

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        let op = match v {
            0x00 => Opcode::SetI,
            0x01 => Opcode::SetR,
            0x02 => Opcode::AddR,
            0x03 => Opcode::AddI,
            0x04 => Opcode::Call,
            0x05 => Opcode::Ret,
            0x06 => Opcode::Yield,
            0x07 => Opcode::Jump,
            0x08 => Opcode::Start,
            0x09 => Opcode::Dbra,
            0x0A => Opcode::CJmp,
            0x0B => Opcode::Fade,
            0x0C => Opcode::Reset,
            0x0D => Opcode::Page,
            0x0E => Opcode::Fill,
            0x0F => Opcode::Copy,
            0x10 => Opcode::Show,
            0x11 => Opcode::Halt,
            0x12 => Opcode::Print,
            0x13 => Opcode::SubR,
            0x14 => Opcode::AndI,
            0x15 => Opcode::IorI,
            0x16 => Opcode::LslI,
            0x17 => Opcode::LsrI,
            0x18 => Opcode::Sound,
            0x19 => Opcode::Load,
            0x1A => Opcode::Music,
            _ => return Err(()),
        };
        Ok(op)
    }
}

/// How an operand is stored and printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// register index, `[$NN]`
    Reg,
    /// `0xNN`
    Byte,
    /// big-endian, `0xNNNN`
    Word,
    /// big-endian code address, printed as a label when one is known
    Target(LabelKind),
}

impl OperandKind {
    pub fn size(&self) -> usize {
        match self {
            OperandKind::Reg | OperandKind::Byte => 1,
            OperandKind::Word | OperandKind::Target(_) => 2,
        }
    }
}

/// Name and operand layout of a fixed-length instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionDef {
    pub name: &'static str,
    pub operands: &'static [OperandKind],
}

impl InstructionDef {
    /// Encoded length, opcode byte included.
    pub fn len(&self) -> usize {
        1 + self.operands.iter().map(OperandKind::size).sum::<usize>()
    }
}

use OperandKind::*;

const REG_REG: &[OperandKind] = &[Reg, Reg];
const REG_WORD: &[OperandKind] = &[Reg, Word];
const WORD_BYTE3: &[OperandKind] = &[Word, Byte, Byte, Byte];

impl Opcode {
    pub fn name(&self) -> &'static str {
        self.def().map_or("CJMP", |def| def.name)
    }

    /// Layout of the fixed-length opcodes; `CJMP` has none.
    pub fn def(&self) -> Option<InstructionDef> {
        let (name, operands): (&'static str, &'static [OperandKind]) = match self {
            Opcode::SetI => ("SETI", REG_WORD),
            Opcode::SetR => ("SETR", REG_REG),
            Opcode::AddR => ("ADDR", REG_REG),
            Opcode::AddI => ("ADDI", REG_WORD),
            Opcode::Call => ("CALL", &[Target(LabelKind::Func)]),
            Opcode::Ret => ("RET", &[]),
            Opcode::Yield => ("YIELD", &[]),
            Opcode::Jump => ("JUMP", &[Target(LabelKind::Label)]),
            Opcode::Start => ("START", &[Byte, Target(LabelKind::Thread)]),
            Opcode::Dbra => ("DBRA", &[Reg, Target(LabelKind::Label)]),
            Opcode::CJmp => return None,
            Opcode::Fade => ("FADE", &[Word]),
            Opcode::Reset => ("RESET", &[Byte, Byte, Byte]),
            Opcode::Page => ("PAGE", &[Byte]),
            Opcode::Fill => ("FILL", &[Byte, Byte]),
            Opcode::Copy => ("COPY", &[Byte, Byte]),
            Opcode::Show => ("SHOW", &[Byte]),
            Opcode::Halt => ("HALT", &[]),
            Opcode::Print => ("PRINT", WORD_BYTE3),
            Opcode::SubR => ("SUBR", REG_REG),
            Opcode::AndI => ("ANDI", REG_WORD),
            Opcode::IorI => ("IORI", REG_WORD),
            Opcode::LslI => ("LSLI", REG_WORD),
            Opcode::LsrI => ("LSRI", REG_WORD),
            Opcode::Sound => ("SOUND", WORD_BYTE3),
            Opcode::Load => ("LOAD", &[Word]),
            Opcode::Music => ("MUSIC", &[Byte, Word, Word, Byte]),
        };
        Some(InstructionDef { name, operands })
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decode path selected by the first byte of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeClass {
    Fixed(Opcode, InstructionDef),
    CondJump,
    /// 0x1B..=0x3F
    Invalid(u8),
    /// 0x40..=0x7F
    Polygon1(u8),
    /// 0x80..=0xFF
    Polygon2(u8),
}

impl From<u8> for OpcodeClass {
    fn from(byte: u8) -> Self {
        match Opcode::try_from(byte) {
            Ok(Opcode::CJmp) => OpcodeClass::CondJump,
            Ok(op) => match op.def() {
                Some(def) => OpcodeClass::Fixed(op, def),
                None => OpcodeClass::Invalid(byte),
            },
            Err(()) if byte >= POLY2_START => OpcodeClass::Polygon2(byte),
            Err(()) if byte >= POLY1_START => OpcodeClass::Polygon1(byte),
            Err(()) => OpcodeClass::Invalid(byte),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_lengths() {
        let expected: [(u8, &str, usize); 26] = [
            (0x00, "SETI", 4),
            (0x01, "SETR", 3),
            (0x02, "ADDR", 3),
            (0x03, "ADDI", 4),
            (0x04, "CALL", 3),
            (0x05, "RET", 1),
            (0x06, "YIELD", 1),
            (0x07, "JUMP", 3),
            (0x08, "START", 4),
            (0x09, "DBRA", 4),
            (0x0B, "FADE", 3),
            (0x0C, "RESET", 4),
            (0x0D, "PAGE", 2),
            (0x0E, "FILL", 3),
            (0x0F, "COPY", 3),
            (0x10, "SHOW", 2),
            (0x11, "HALT", 1),
            (0x12, "PRINT", 6),
            (0x13, "SUBR", 3),
            (0x14, "ANDI", 4),
            (0x15, "IORI", 4),
            (0x16, "LSLI", 4),
            (0x17, "LSRI", 4),
            (0x18, "SOUND", 6),
            (0x19, "LOAD", 3),
            (0x1A, "MUSIC", 7),
        ];

        for (byte, name, len) in expected {
            match OpcodeClass::from(byte) {
                OpcodeClass::Fixed(op, def) => {
                    assert_eq!(op as u8, byte);
                    assert_eq!(def.name, name);
                    assert_eq!(def.len(), len, "{}", name);
                }
                other => panic!("0x{:02x} classified as {:?}", byte, other),
            }
        }
    }

    #[test]
    fn classes_by_range() {
        assert_eq!(OpcodeClass::from(0x0A), OpcodeClass::CondJump);
        assert_eq!(Opcode::CJmp.name(), "CJMP");
        assert_eq!(OpcodeClass::from(0x1B), OpcodeClass::Invalid(0x1B));
        assert_eq!(OpcodeClass::from(0x3F), OpcodeClass::Invalid(0x3F));
        assert_eq!(OpcodeClass::from(0x40), OpcodeClass::Polygon1(0x40));
        assert_eq!(OpcodeClass::from(0x7F), OpcodeClass::Polygon1(0x7F));
        assert_eq!(OpcodeClass::from(0x80), OpcodeClass::Polygon2(0x80));
        assert_eq!(OpcodeClass::from(0xFF), OpcodeClass::Polygon2(0xFF));
    }
}
