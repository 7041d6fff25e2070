/// Longest back-reference distance reachable with the 12-bit offset.
const MAX_DISTANCE: usize = 0x1000;
/// Longest copy expressible with code `110`.
const MAX_RUN: usize = 0x100;
/// Longest literal run expressible with code `111`.
const MAX_LONG_LITERALS: usize = 0xFF + 9;
/// Longest literal run expressible with code `00`.
const MAX_SHORT_LITERALS: usize = 8;

/// Collects bits in stream order and lays them out the way the decoder
/// fetches them.
#[derive(Debug, Default)]
pub(crate) struct BitWriter {
    bits: Vec<u8>,
}

impl BitWriter {
    /// Append the low `count` bits of `value`, most significant first.
    pub(crate) fn push_bits(&mut self, value: u32, count: u32) {
        for i in (0..count).rev() {
            self.bits.push(((value >> i) & 1) as u8);
        }
    }

    /// Produce the packed buffer.
    ///
    /// The bits that do not fill a whole word go into the initial chunk under
    /// its sentinel; the rest become full words stored below it.
    pub(crate) fn finish(self, unpacked_size: u32) -> Vec<u8> {
        let head = self.bits.len() % 32;

        let mut chunk = 1u32 << head;
        for (i, bit) in self.bits[..head].iter().enumerate() {
            chunk |= (*bit as u32) << i;
        }

        let words: Vec<u32> = self.bits[head..]
            .chunks(32)
            .map(|word| {
                word.iter()
                    .enumerate()
                    .fold(0u32, |acc, (i, bit)| acc | ((*bit as u32) << i))
            })
            .collect();

        let checksum = words.iter().fold(chunk, |acc, w| acc ^ w);

        let mut out = Vec::with_capacity((words.len() + 3) * 4);
        for word in words.iter().rev().chain(&[chunk, checksum, unpacked_size]) {
            out.extend_from_slice(&word.to_be_bytes());
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backref {
    /// code `01`, 8-bit offset
    Pair { offset: usize },
    /// code `100`, 9-bit offset
    Triple { offset: usize },
    /// code `101`, 10-bit offset
    Quad { offset: usize },
    /// code `110`, 8-bit count and 12-bit offset
    Run { offset: usize, len: usize },
}

impl Backref {
    fn len(&self) -> usize {
        match self {
            Backref::Pair { .. } => 2,
            Backref::Triple { .. } => 3,
            Backref::Quad { .. } => 4,
            Backref::Run { len, .. } => *len,
        }
    }

    fn cost(&self) -> usize {
        match self {
            Backref::Pair { .. } => 2 + 8,
            Backref::Triple { .. } => 3 + 9,
            Backref::Quad { .. } => 3 + 10,
            Backref::Run { .. } => 3 + 8 + 12,
        }
    }

    /// Bits saved against emitting the same bytes as literals.
    fn score(&self) -> isize {
        (self.len() * 8) as isize - self.cost() as isize
    }

    fn emit(&self, w: &mut BitWriter) {
        match *self {
            Backref::Pair { offset } => {
                w.push_bits(0b01, 2);
                w.push_bits(offset as u32, 8);
            }
            Backref::Triple { offset } => {
                w.push_bits(0b100, 3);
                w.push_bits(offset as u32, 9);
            }
            Backref::Quad { offset } => {
                w.push_bits(0b101, 3);
                w.push_bits(offset as u32, 10);
            }
            Backref::Run { offset, len } => {
                w.push_bits(0b110, 3);
                w.push_bits((len - 1) as u32, 8);
                w.push_bits(offset as u32, 12);
            }
        }
    }
}

/// Best back-reference for the byte at `cursor`, searching the already
/// emitted bytes above it.
fn find_copy(data: &[u8], cursor: usize) -> Option<Backref> {
    let max_len = MAX_RUN.min(cursor + 1);
    let max_dist = MAX_DISTANCE.min(data.len() - 1 - cursor);

    let mut best: Option<Backref> = None;
    for dist in 1..=max_dist {
        let mut len = 0;
        while len < max_len && data[cursor - len] == data[cursor - len + dist] {
            len += 1;
        }
        if len < 2 {
            continue;
        }

        let offset = dist - 1;
        let candidates = [
            (offset <= 0xFF).then_some(Backref::Pair { offset }),
            (len >= 3 && offset <= 0x1FF).then_some(Backref::Triple { offset }),
            (len >= 4 && offset <= 0x3FF).then_some(Backref::Quad { offset }),
            Some(Backref::Run { offset, len }),
        ];
        for candidate in candidates.into_iter().flatten() {
            if candidate.score() > best.map_or(0, |b| b.score()) {
                best = Some(candidate);
            }
        }

        if len == max_len {
            break;
        }
    }

    best
}

fn flush_literals(w: &mut BitWriter, pending: &mut Vec<u8>) {
    let mut rest = pending.as_slice();
    while !rest.is_empty() {
        let count = rest.len().min(MAX_LONG_LITERALS);
        if count > MAX_SHORT_LITERALS {
            w.push_bits(0b111, 3);
            w.push_bits((count - 9) as u32, 8);
        } else {
            w.push_bits(0b00, 2);
            w.push_bits((count - 1) as u32, 3);
        }
        let (run, tail) = rest.split_at(count);
        for byte in run {
            w.push_bits(*byte as u32, 8);
        }
        rest = tail;
    }
    pending.clear();
}

/// Compress `data` into a buffer [`unpack`](super::unpack) restores exactly.
///
/// Greedy: at each position the back-reference saving the most bits wins,
/// otherwise the byte is queued as a literal.
pub fn pack(data: &[u8]) -> Vec<u8> {
    let mut w = BitWriter::default();
    let mut pending = Vec::new();

    let mut pos = data.len();
    while pos > 0 {
        let cursor = pos - 1;
        match find_copy(data, cursor) {
            Some(copy) => {
                flush_literals(&mut w, &mut pending);
                copy.emit(&mut w);
                pos -= copy.len();
            }
            None => {
                pending.push(data[cursor]);
                pos -= 1;
            }
        }
    }
    flush_literals(&mut w, &mut pending);

    log::trace!("packed {} bytes into {} bits", data.len(), w.bits.len());
    w.finish(data.len() as u32)
}
