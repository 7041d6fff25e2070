use super::ByteKillerError;

/// A pre-sized output buffer filled from the last byte towards the first.
///
/// Every byte at an index above the cursor has already been written, so
/// back-references can only read from there.
#[derive(Debug, Clone)]
pub struct BackwardWriter {
    buf: Vec<u8>,
    /// Bytes still to be written; the next write lands at `remaining - 1`.
    remaining: usize,
}

impl BackwardWriter {
    pub fn new(size: usize) -> Self {
        Self {
            buf: vec![0; size],
            remaining: size,
        }
    }

    /// Write position of the next byte, `None` once the buffer is full.
    #[inline]
    pub fn cursor(&self) -> Option<usize> {
        self.remaining.checked_sub(1)
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.remaining == 0
    }

    pub fn write(&mut self, byte: u8) -> Result<(), ByteKillerError> {
        if self.remaining == 0 {
            return Err(ByteKillerError::Overflow {
                size: self.buf.len(),
            });
        }
        self.remaining -= 1;
        self.buf[self.remaining] = byte;
        Ok(())
    }

    /// Read the already written byte at `cursor + offset + 1`.
    pub fn peek(&self, offset: usize) -> Result<u8, ByteKillerError> {
        let src = self.remaining + offset;
        self.buf
            .get(src)
            .copied()
            .ok_or(ByteKillerError::CopyOutOfRange {
                src,
                size: self.buf.len(),
            })
    }

    /// Copy `count` bytes one at a time, so a copy may overlap its own output.
    pub fn copy(&mut self, offset: usize, count: usize) -> Result<(), ByteKillerError> {
        for _ in 0..count {
            let byte = self.peek(offset)?;
            self.write(byte)?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_back_to_front() {
        let mut w = BackwardWriter::new(3);
        assert_eq!(w.cursor(), Some(2));
        w.write(1).unwrap();
        w.write(2).unwrap();
        w.write(3).unwrap();
        assert!(w.is_full());
        assert_eq!(w.cursor(), None);
        assert_eq!(w.into_inner(), vec![3, 2, 1]);
    }

    #[test]
    fn overflow_is_rejected() {
        let mut w = BackwardWriter::new(1);
        w.write(0xaa).unwrap();
        assert_eq!(w.write(0xbb), Err(ByteKillerError::Overflow { size: 1 }));
    }

    #[test]
    fn overlapping_copy_repeats_pattern() {
        let mut w = BackwardWriter::new(6);
        w.write(b'b').unwrap();
        w.write(b'a').unwrap();
        // offset 1 reads two bytes above the cursor
        w.copy(1, 4).unwrap();
        assert_eq!(w.into_inner(), b"ababab".to_vec());
    }

    #[test]
    fn peek_outside_written_region_fails() {
        let mut w = BackwardWriter::new(4);
        w.write(7).unwrap();
        assert_eq!(w.peek(0), Ok(7));
        assert_eq!(
            w.peek(1),
            Err(ByteKillerError::CopyOutOfRange { src: 4, size: 4 })
        );
    }
}
