//! Script bytecode disassembly.
//!
//! A resource is decoded in two passes over the same instruction decoder:
//! [`LabelMap::scan`] names every call, jump and thread target, then
//! [`Disassembler`] walks the stream again and renders each instruction with
//! those names substituted.

mod disasm;
mod inst;
mod labels;
mod opcode;
mod reader;

pub use disasm::{disassemble, Disassembler, Inst, LabelEntry, Listing};
pub use inst::{Condition, InstKind, Instruction, Operand, Polygon};
pub use labels::{LabelKind, LabelMap};
pub use opcode::{InstructionDef, Opcode, OpcodeClass, OperandKind};
pub use reader::{BytecodeReader, DecodeError};
