use byteorder::{BigEndian, ByteOrder};

use super::BackwardWriter;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ByteKillerError {
    #[error("packed stream truncated: need 4 more bytes below offset {pos}")]
    Truncated { pos: usize },

    #[error("destination overflow: all {size} bytes already written")]
    Overflow { size: usize },

    #[error("back-reference source 0x{src:X} outside decoded data (size={size})")]
    CopyOutOfRange { src: usize, size: usize },

    #[error("unsupported control code 0x{code:02X}")]
    InvalidCode { code: u8 },

    #[error("checksum mismatch: 0x{checksum:08X} left after decoding")]
    ChecksumMismatch { checksum: u32 },

    #[error("size mismatch: {missing} of {size} bytes never written")]
    SizeMismatch { missing: usize, size: usize },
}

type Result<T> = std::result::Result<T, ByteKillerError>;

/// Reads 32-bit words from the end of the packed buffer and hands out their
/// bits, least significant first.
struct BitReader<'a> {
    src: &'a [u8],
    /// End (exclusive) of the unread part of `src`.
    pos: usize,
    chunk: u32,
    checksum: u32,
}

impl<'a> BitReader<'a> {
    fn new(src: &'a [u8]) -> Self {
        Self {
            src,
            pos: src.len(),
            chunk: 0,
            checksum: 0,
        }
    }

    fn fetch_word(&mut self) -> Result<u32> {
        if self.pos < 4 {
            return Err(ByteKillerError::Truncated { pos: self.pos });
        }
        let word = BigEndian::read_u32(&self.src[self.pos - 4..self.pos]);
        self.pos -= 4;
        Ok(word)
    }

    fn next_bit(&mut self) -> Result<u32> {
        let mut bit = self.chunk & 1;
        self.chunk >>= 1;
        if self.chunk == 0 {
            // only the sentinel was left: reload, the new top bit becomes the sentinel
            let word = self.fetch_word()?;
            self.checksum ^= word;
            bit = word & 1;
            self.chunk = (word >> 1) | 0x8000_0000;
        }
        Ok(bit)
    }

    /// Assemble `count` bits, first bit read ends up most significant.
    fn read_bits(&mut self, count: u32) -> Result<u32> {
        let mut value = 0;
        for _ in 0..count {
            value = (value << 1) | self.next_bit()?;
        }
        Ok(value)
    }
}

/// Decode a ByteKiller buffer into exactly `unpacked_size` bytes.
pub fn unpack(data: &[u8], unpacked_size: usize) -> Result<Vec<u8>> {
    if unpacked_size == 0 {
        return Ok(Vec::new());
    }

    let mut rdr = BitReader::new(data);
    let mut remaining = rdr.fetch_word()? as usize;
    let checksum = rdr.fetch_word()?;
    rdr.chunk = rdr.fetch_word()?;
    rdr.checksum = checksum ^ rdr.chunk;

    let mut out = BackwardWriter::new(unpacked_size);

    while remaining > 0 {
        let code = if rdr.next_bit()? == 0 {
            rdr.read_bits(1)?
        } else {
            0b100 | rdr.read_bits(2)?
        };

        let written = match code {
            0b00 => {
                let count = rdr.read_bits(3)? as usize + 1;
                write_literals(&mut rdr, &mut out, count)?;
                count
            }
            0b111 => {
                let count = rdr.read_bits(8)? as usize + 9;
                write_literals(&mut rdr, &mut out, count)?;
                count
            }
            0b01 => {
                let offset = rdr.read_bits(8)? as usize;
                out.copy(offset, 2)?;
                2
            }
            0b100 => {
                let offset = rdr.read_bits(9)? as usize;
                out.copy(offset, 3)?;
                3
            }
            0b101 => {
                let offset = rdr.read_bits(10)? as usize;
                out.copy(offset, 4)?;
                4
            }
            0b110 => {
                let count = rdr.read_bits(8)? as usize + 1;
                let offset = rdr.read_bits(12)? as usize;
                out.copy(offset, count)?;
                count
            }
            code => return Err(ByteKillerError::InvalidCode { code: code as u8 }),
        };

        remaining = remaining.saturating_sub(written);
    }

    if rdr.checksum != 0 {
        return Err(ByteKillerError::ChecksumMismatch {
            checksum: rdr.checksum,
        });
    }

    if !out.is_full() {
        return Err(ByteKillerError::SizeMismatch {
            missing: out.remaining(),
            size: unpacked_size,
        });
    }

    Ok(out.into_inner())
}

fn write_literals(rdr: &mut BitReader<'_>, out: &mut BackwardWriter, count: usize) -> Result<()> {
    for _ in 0..count {
        out.write(rdr.read_bits(8)? as u8)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::bytekiller::BitWriter;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_literal_golden_stream() {
        // 13 bits (00, 000, 0x41) fit in the initial chunk, sentinel at bit 13
        let packed = hex::decode("000030400000304000000001").unwrap();
        assert_eq!(unpack(&packed, 1).unwrap(), vec![0x41]);
    }

    #[test]
    fn long_literal_run_of_ab() {
        let mut w = BitWriter::default();
        w.push_bits(0b111, 3);
        w.push_bits(16 - 9, 8);
        for _ in 0..16 {
            w.push_bits(0xAB, 8);
        }
        let packed = w.finish(16);

        assert_eq!(unpack(&packed, 16).unwrap(), vec![0xAB; 16]);
    }

    #[test]
    fn literals_are_written_back_to_front() {
        let mut w = BitWriter::default();
        w.push_bits(0b00, 2);
        w.push_bits(3 - 1, 3);
        for b in [b'c', b'b', b'a'] {
            w.push_bits(b as u32, 8);
        }
        let packed = w.finish(3);

        assert_eq!(unpack(&packed, 3).unwrap(), b"abc".to_vec());
    }

    #[test]
    fn every_back_reference_form() {
        let mut w = BitWriter::default();
        // "xy" at the very end
        w.push_bits(0b00, 2);
        w.push_bits(1, 3);
        w.push_bits(b'y' as u32, 8);
        w.push_bits(b'x' as u32, 8);
        // copy 2, offset 0: repeats the byte just above the cursor twice
        w.push_bits(0b01, 2);
        w.push_bits(0, 8);
        // copy 3, offset 1
        w.push_bits(0b100, 3);
        w.push_bits(1, 9);
        // copy 4, offset 3
        w.push_bits(0b101, 3);
        w.push_bits(3, 10);
        // copy 5, offset 10: starts from the trailing 'y'
        w.push_bits(0b110, 3);
        w.push_bits(5 - 1, 8);
        w.push_bits(10, 12);
        let packed = w.finish(16);

        let out = unpack(&packed, 16).unwrap();
        // built from the end: xy, xx, xxx, xxxx, yxxxx
        assert_eq!(out, b"xxxxyxxxxxxxxxxy".to_vec());
    }

    #[test]
    fn zero_size_is_trivial() {
        assert_eq!(unpack(&[], 0).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn short_input_is_truncated() {
        assert_eq!(
            unpack(&[0, 0, 0, 1, 0, 0], 1),
            Err(ByteKillerError::Truncated { pos: 2 })
        );
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let mut packed = hex::decode("000030400000304000000001").unwrap();
        packed[7] ^= 0x01;
        assert_eq!(
            unpack(&packed, 1),
            Err(ByteKillerError::ChecksumMismatch { checksum: 1 })
        );
    }

    #[test]
    fn copy_before_any_output_is_out_of_range() {
        let mut w = BitWriter::default();
        w.push_bits(0b01, 2);
        w.push_bits(0, 8);
        let packed = w.finish(2);

        assert_eq!(
            unpack(&packed, 2),
            Err(ByteKillerError::CopyOutOfRange { src: 2, size: 2 })
        );
    }

    #[test]
    fn declared_length_beyond_buffer_overflows() {
        let mut w = BitWriter::default();
        w.push_bits(0b00, 2);
        w.push_bits(1, 3);
        w.push_bits(1, 8);
        w.push_bits(2, 8);
        let packed = w.finish(2);

        assert_eq!(unpack(&packed, 1), Err(ByteKillerError::Overflow { size: 1 }));
    }

    #[test]
    fn declared_length_below_buffer_leaves_a_gap() {
        let mut w = BitWriter::default();
        w.push_bits(0b00, 2);
        w.push_bits(0, 3);
        w.push_bits(9, 8);
        let packed = w.finish(1);

        assert_eq!(
            unpack(&packed, 3),
            Err(ByteKillerError::SizeMismatch { missing: 2, size: 3 })
        );
    }
}
