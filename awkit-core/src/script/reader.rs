use byteorder::{BigEndian, ByteOrder};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated instruction at 0x{pc:04x}: needs at least {needed} bytes, {available} left")]
    Truncated {
        pc: usize,
        needed: usize,
        available: usize,
    },
}

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Bounds-checked reads for a single instruction starting at `pc`.
#[derive(Debug, Clone)]
pub struct BytecodeReader<'a> {
    bytecode: &'a [u8],
    pc: usize,
    cursor: usize,
}

impl<'a> BytecodeReader<'a> {
    pub fn new(bytecode: &'a [u8], pc: usize) -> Self {
        Self {
            bytecode,
            pc,
            cursor: pc,
        }
    }

    fn ensure(&self, size: usize) -> Result<()> {
        if self.cursor + size > self.bytecode.len() {
            return Err(DecodeError::Truncated {
                pc: self.pc,
                needed: self.consumed() + size,
                available: self.bytecode.len() - self.pc,
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let value = self.bytecode[self.cursor];
        self.cursor += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        let value = BigEndian::read_u16(&self.bytecode[self.cursor..]);
        self.cursor += 2;
        Ok(value)
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.cursor - self.pc
    }

    /// The encoded instruction read so far.
    pub fn raw(&self) -> &'a [u8] {
        &self.bytecode[self.pc..self.cursor]
    }
}
