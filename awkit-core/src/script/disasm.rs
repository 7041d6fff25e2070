use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::inst::Instruction;
use super::labels::{LabelKind, LabelMap};
use super::reader::Result;

const INDENT: &str = "    ";

/// Serialisable form of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub size: usize,
    pub labels: Vec<LabelEntry>,
    pub insts: Vec<Inst>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub address: u16,
    pub name: String,
    pub kind: LabelKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inst {
    pub address: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub label: Option<String>,
    pub mnemonic: String,
    pub operands: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comment: Option<String>,
    /// Encoded bytes as hex, e.g. `04 00 20`.
    pub raw: String,
}

/// Two-pass disassembler over one bytecode resource: labels first, then
/// the instructions.
#[derive(Debug, Clone)]
pub struct Disassembler<'a> {
    bytecode: &'a [u8],
    labels: LabelMap,
    insts: Vec<Instruction<'a>>,
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Result<Self> {
        let labels = LabelMap::scan(bytecode)?;

        let mut insts = Vec::new();
        let mut pc = 0;
        while pc < bytecode.len() {
            let inst = Instruction::decode(bytecode, pc)?;
            pc += inst.len();
            insts.push(inst);
        }

        let disasm = Self {
            bytecode,
            labels,
            insts,
        };
        disasm.warn_unplaced_labels();
        Ok(disasm)
    }

    /// Labels whose address is not the start of a decoded instruction still
    /// appear as operands, but get no definition line.
    fn warn_unplaced_labels(&self) {
        for (addr, kind) in self.labels.iter() {
            let placed = self
                .insts
                .binary_search_by_key(&(addr as usize), |inst| inst.address())
                .is_ok();
            if !placed {
                log::warn!(
                    "{} does not start an instruction (stream is 0x{:04x} bytes)",
                    kind.name(addr),
                    self.bytecode.len()
                );
            }
        }
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    pub fn instructions(&self) -> &[Instruction<'a>] {
        &self.insts
    }

    fn label_at(&self, inst: &Instruction<'_>) -> Option<String> {
        u16::try_from(inst.address())
            .ok()
            .and_then(|addr| self.labels.name(addr))
    }

    /// The text listing: `name:` lines at column 0, instructions indented.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for inst in &self.insts {
            if let Some(label) = self.label_at(inst) {
                out.push_str(&label);
                out.push_str(":\n");
            }
            out.push_str(INDENT);
            out.push_str(&inst.render(&self.labels));
            out.push('\n');
        }
        out
    }

    pub fn to_listing(&self) -> Listing {
        let labels = self
            .labels
            .iter()
            .map(|(address, kind)| LabelEntry {
                address,
                name: kind.name(address),
                kind,
            })
            .collect();

        let insts = self
            .insts
            .iter()
            .map(|inst| Inst {
                address: inst.address() as u32,
                label: self.label_at(inst),
                mnemonic: inst.mnemonic().to_string(),
                operands: inst.operands(&self.labels),
                comment: inst.comment(),
                raw: inst.raw().iter().map(|b| format!("{:02x}", b)).join(" "),
            })
            .collect();

        Listing {
            size: self.bytecode.len(),
            labels,
            insts,
        }
    }
}

/// Text listing of a whole bytecode resource.
pub fn disassemble(bytecode: &[u8]) -> Result<String> {
    Ok(Disassembler::new(bytecode)?.to_text())
}
