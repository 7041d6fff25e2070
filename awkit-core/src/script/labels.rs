use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::inst::Instruction;
use super::reader::Result;

/// What kind of reference first named an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelKind {
    /// `CALL` target
    Func,
    /// `JUMP`, `DBRA` and `CJMP` target
    Label,
    /// `START` entry point
    Thread,
}

impl LabelKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            LabelKind::Func => "func",
            LabelKind::Label => "label",
            LabelKind::Thread => "thread",
        }
    }

    pub fn name(&self, address: u16) -> String {
        format!("{}_{:04x}", self.prefix(), address)
    }
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Address to label mapping for one bytecode stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    labels: BTreeMap<u16, LabelKind>,
}

impl LabelMap {
    /// Walk the whole stream once and record every branch, call and thread
    /// target. The same decoder as the listing is used, so operand bytes are
    /// never taken for opcodes.
    pub fn scan(bytecode: &[u8]) -> Result<Self> {
        let mut labels = Self::default();
        let mut pc = 0;
        while pc < bytecode.len() {
            let inst = Instruction::decode(bytecode, pc)?;
            if let Some((target, kind)) = inst.reference() {
                labels.insert(target, kind);
            }
            pc += inst.len();
        }

        log::debug!("{} labels in {} bytes of bytecode", labels.len(), bytecode.len());
        Ok(labels)
    }

    /// The first kind recorded for an address is kept.
    pub fn insert(&mut self, address: u16, kind: LabelKind) -> LabelKind {
        *self.labels.entry(address).or_insert(kind)
    }

    pub fn kind(&self, address: u16) -> Option<LabelKind> {
        self.labels.get(&address).copied()
    }

    pub fn name(&self, address: u16) -> Option<String> {
        self.kind(address).map(|kind| kind.name(address))
    }

    /// Label name, or the raw address when nothing points there.
    pub fn resolve(&self, address: u16) -> String {
        self.name(address)
            .unwrap_or_else(|| format!("0x{:04x}", address))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in address order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, LabelKind)> + '_ {
        self.labels.iter().map(|(addr, kind)| (*addr, *kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn first_kind_wins() {
        let mut labels = LabelMap::default();
        assert_eq!(labels.insert(0x10, LabelKind::Func), LabelKind::Func);
        assert_eq!(labels.insert(0x10, LabelKind::Label), LabelKind::Func);
        assert_eq!(labels.name(0x10).as_deref(), Some("func_0010"));
        assert_eq!(labels.resolve(0x11), "0x0011");
    }

    #[test]
    fn scan_collects_every_reference_kind() {
        let bytecode = [
            0x04, 0x00, 0x20, // CALL 0x0020
            0x07, 0x00, 0x30, // JUMP 0x0030
            0x08, 0x01, 0x00, 0x40, // START 0x01, 0x0040
            0x09, 0x05, 0x00, 0x50, // DBRA [$05], 0x0050
            0x0A, 0x00, 0x01, 0x02, 0x00, 0x60, // CJMP eq, [$01], 0x02, 0x0060
            0x07, 0x00, 0x20, // JUMP to an address already named by CALL
        ];
        let labels = LabelMap::scan(&bytecode).unwrap();

        let names: Vec<String> = labels.iter().map(|(addr, kind)| kind.name(addr)).collect();
        assert_eq!(
            names,
            vec!["func_0020", "label_0030", "thread_0040", "label_0050", "label_0060"]
        );
    }

    #[test]
    fn polygon_operands_are_not_opcodes() {
        // poly1 0x40: offset, 16-bit x, 16-bit y, implied zoom; operand bytes
        // 0x04 0x00 0x99 would read as CALL 0x0099 if misaligned
        let bytecode = [0x40, 0x00, 0x10, 0x04, 0x00, 0x99, 0x00, 0x05];
        let labels = LabelMap::scan(&bytecode).unwrap();
        assert!(labels.is_empty());
    }

    #[test]
    fn scan_is_deterministic() {
        let bytecode = [0x04, 0x00, 0x08, 0x1B, 0x07, 0x00, 0x00, 0x05, 0x05];
        let first = LabelMap::scan(&bytecode).unwrap();
        let second = LabelMap::scan(&bytecode).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn truncated_target_fails() {
        assert!(LabelMap::scan(&[0x05, 0x04, 0x00]).is_err());
    }
}
