use std::fmt;

use itertools::Itertools;

use super::labels::{LabelKind, LabelMap};
use super::opcode::{InstructionDef, Opcode, OpcodeClass, OperandKind};
use super::reader::{BytecodeReader, Result};

/// Zoom used when a polygon instruction carries none.
pub const DEFAULT_ZOOM: u16 = 0x40;

/// A decoded operand value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg(u8),
    Byte(u8),
    Word(u16),
    Target(u16, LabelKind),
}

impl Operand {
    fn read(rdr: &mut BytecodeReader<'_>, kind: OperandKind) -> Result<Self> {
        Ok(match kind {
            OperandKind::Reg => Operand::Reg(rdr.read_u8()?),
            OperandKind::Byte => Operand::Byte(rdr.read_u8()?),
            OperandKind::Word => Operand::Word(rdr.read_u16()?),
            OperandKind::Target(kind) => Operand::Target(rdr.read_u16()?, kind),
        })
    }

    pub fn render(&self, labels: &LabelMap) -> String {
        match self {
            Operand::Target(addr, _) => labels.resolve(*addr),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "[${:02x}]", r),
            Operand::Byte(b) => write!(f, "0x{:02x}", b),
            Operand::Word(w) | Operand::Target(w, _) => write!(f, "0x{:04x}", w),
        }
    }
}

/// `CJMP` comparison, low three bits of the variant byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Condition {
    /// `None` for a condition >= 6 or when any of bits 3..5 is set.
    pub fn from_variant(variant: u8) -> Option<Self> {
        if variant & 0x38 != 0 {
            return None;
        }
        match variant & 0x07 {
            0 => Some(Condition::Eq),
            1 => Some(Condition::Ne),
            2 => Some(Condition::Gt),
            3 => Some(Condition::Ge),
            4 => Some(Condition::Lt),
            5 => Some(Condition::Le),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Condition::Eq => "eq",
            Condition::Ne => "ne",
            Condition::Gt => "gt",
            Condition::Ge => "ge",
            Condition::Lt => "lt",
            Condition::Le => "le",
        }
    }
}

/// One polygon draw, family 1 or 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Polygon {
    pub flags: u8,
    /// Shape data offset, already scaled by two.
    pub offset: u16,
    pub x: Operand,
    pub y: Operand,
    pub zoom: Operand,
    /// 2 when the shape comes from the alternate segment.
    pub buffer: u8,
}

impl Polygon {
    fn read_family1(rdr: &mut BytecodeReader<'_>, flags: u8) -> Result<Self> {
        let offset = rdr.read_u16()?.wrapping_mul(2);
        let x = Self::read_coord(rdr, flags & 0x20 != 0, flags & 0x10 != 0)?;
        let y = Self::read_coord(rdr, flags & 0x08 != 0, flags & 0x04 != 0)?;

        let (zoom, buffer) = match (flags & 0x02 != 0, flags & 0x01 != 0) {
            (true, true) => (Operand::Word(DEFAULT_ZOOM), 2),
            (true, false) => (Operand::Byte(rdr.read_u8()?), 1),
            (false, true) => (Operand::Reg(rdr.read_u8()?), 1),
            (false, false) => (Operand::Word(DEFAULT_ZOOM), 1),
        };

        Ok(Self {
            flags,
            offset,
            x,
            y,
            zoom,
            buffer,
        })
    }

    /// `immediate` picks a one-byte value (`shifted` adds 0x100), otherwise
    /// `shifted` selects a register and its absence a 16-bit value.
    /// Y goes through the same rule as X, so Y with 0x08 and 0x04 both set
    /// also shows byte + 0x100 rather than the plain byte.
    fn read_coord(rdr: &mut BytecodeReader<'_>, immediate: bool, shifted: bool) -> Result<Operand> {
        let first = rdr.read_u8()?;
        Ok(match (immediate, shifted) {
            (true, true) => Operand::Word(first as u16 + 0x100),
            (true, false) => Operand::Byte(first),
            (false, true) => Operand::Reg(first),
            (false, false) => Operand::Word(((first as u16) << 8) | rdr.read_u8()? as u16),
        })
    }

    fn read_family2(rdr: &mut BytecodeReader<'_>, flags: u8) -> Result<Self> {
        let low = rdr.read_u8()?;
        let offset = (((flags as u16) << 8) | low as u16).wrapping_mul(2);
        Ok(Self {
            flags,
            offset,
            x: Operand::Byte(rdr.read_u8()?),
            y: Operand::Byte(rdr.read_u8()?),
            zoom: Operand::Word(DEFAULT_ZOOM),
            buffer: 1,
        })
    }
}

impl fmt::Display for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "flags=0x{:02x} addr_off=0x{:04x} x={} y={} buf={} zoom={}",
            self.flags, self.offset, self.x, self.y, self.buffer, self.zoom
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstKind {
    Fixed {
        op: Opcode,
        def: InstructionDef,
        operands: Vec<Operand>,
    },
    CondJump {
        variant: u8,
        condition: Option<Condition>,
        reg: u8,
        rhs: Operand,
        target: u16,
    },
    Polygon(Polygon),
    /// A byte that does not start a valid instruction.
    Data(u8),
}

/// One decoded instruction and the bytes it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction<'a> {
    address: usize,
    raw: &'a [u8],
    kind: InstKind,
}

impl<'a> Instruction<'a> {
    /// Decode the instruction starting at `pc`. Fails when its encoding runs
    /// past the end of `bytecode`.
    pub fn decode(bytecode: &'a [u8], pc: usize) -> Result<Self> {
        let mut rdr = BytecodeReader::new(bytecode, pc);
        let opcode = rdr.read_u8()?;

        let kind = match OpcodeClass::from(opcode) {
            OpcodeClass::Fixed(op, def) => {
                let operands = def
                    .operands
                    .iter()
                    .map(|kind| Operand::read(&mut rdr, *kind))
                    .collect::<Result<Vec<_>>>()?;
                InstKind::Fixed { op, def, operands }
            }
            OpcodeClass::CondJump => {
                let variant = rdr.read_u8()?;
                let reg = rdr.read_u8()?;
                let rhs = if variant & 0x80 != 0 {
                    Operand::Reg(rdr.read_u8()?)
                } else if variant & 0x40 != 0 {
                    Operand::Word(rdr.read_u16()?)
                } else {
                    Operand::Byte(rdr.read_u8()?)
                };
                let target = rdr.read_u16()?;
                InstKind::CondJump {
                    variant,
                    condition: Condition::from_variant(variant),
                    reg,
                    rhs,
                    target,
                }
            }
            OpcodeClass::Polygon1(flags) => InstKind::Polygon(Polygon::read_family1(&mut rdr, flags)?),
            OpcodeClass::Polygon2(flags) => InstKind::Polygon(Polygon::read_family2(&mut rdr, flags)?),
            OpcodeClass::Invalid(byte) => InstKind::Data(byte),
        };

        Ok(Self {
            address: pc,
            raw: rdr.raw(),
            kind,
        })
    }

    pub fn address(&self) -> usize {
        self.address
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    pub fn kind(&self) -> &InstKind {
        &self.kind
    }

    pub fn mnemonic(&self) -> &'static str {
        match &self.kind {
            InstKind::Fixed { def, .. } => def.name,
            InstKind::CondJump { .. } => "CJMP",
            InstKind::Polygon(_) => "POLYRAW",
            InstKind::Data(_) => "DB",
        }
    }

    /// Code address this instruction names, with the kind of label it earns.
    pub fn reference(&self) -> Option<(u16, LabelKind)> {
        match &self.kind {
            InstKind::Fixed { operands, .. } => operands.iter().find_map(|op| match op {
                Operand::Target(addr, kind) => Some((*addr, *kind)),
                _ => None,
            }),
            InstKind::CondJump { target, .. } => Some((*target, LabelKind::Label)),
            InstKind::Polygon(_) | InstKind::Data(_) => None,
        }
    }

    /// Operands as printed, targets replaced by their label when known.
    pub fn operands(&self, labels: &LabelMap) -> Vec<String> {
        match &self.kind {
            InstKind::Fixed { operands, .. } => operands.iter().map(|op| op.render(labels)).collect(),
            InstKind::CondJump {
                variant,
                condition,
                reg,
                rhs,
                target,
            } => vec![
                condition.map_or_else(|| format!("0x{:02x}", variant), |c| c.name().to_string()),
                Operand::Reg(*reg).to_string(),
                rhs.to_string(),
                labels.resolve(*target),
            ],
            InstKind::Polygon(_) => self.raw.iter().map(|b| format!("0x{:02x}", b)).collect(),
            InstKind::Data(byte) => vec![format!("0x{:02x}", byte)],
        }
    }

    /// Decoded fields of a polygon draw; the operands only carry raw bytes.
    pub fn comment(&self) -> Option<String> {
        match &self.kind {
            InstKind::Polygon(poly) => Some(poly.to_string()),
            _ => None,
        }
    }

    /// The listing line, without indentation.
    pub fn render(&self, labels: &LabelMap) -> String {
        let operands = self.operands(labels);
        let separator = match self.kind {
            InstKind::Polygon(_) => " ",
            _ => ", ",
        };

        let mut line = self.mnemonic().to_string();
        if !operands.is_empty() {
            line.push(' ');
            line.push_str(&operands.iter().join(separator));
        }
        if let Some(comment) = self.comment() {
            line.push_str(" ; ");
            line.push_str(&comment);
        }
        line
    }
}
