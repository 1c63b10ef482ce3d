//! Canonical Huffman decoding tables: the two-level table builder and the
//! precomputed fixed-block tables.

use crate::common::*;
use std::sync::OnceLock;

/// Worst-case entry counts for the literal/length and distance tables,
/// over all possible code-length assignments with 9-bit and 6-bit roots.
pub const ENOUGH_LENS: usize = 852;
pub const ENOUGH_DISTS: usize = 592;
pub const ENOUGH: usize = ENOUGH_LENS + ENOUGH_DISTS;

/// One decoding table entry.
///
/// `op` keeps the wire mapping shared with the decoders: 0 is a literal,
/// 16+n a length/distance base with n extra bits, 96 end-of-block, 64 an
/// invalid code, and 1..15 the index width of a linked second-level table.
/// `bits` is the code width consumed by this entry and `val` the literal
/// value, base value, or second-level table offset.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Code {
    pub op: u8,
    pub bits: u8,
    pub val: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeKind {
    /// Code-length codes (the precode), symbols 0..19.
    Codes,
    /// Literal/length codes, symbols 0..288.
    Lens,
    /// Distance codes, symbols 0..30.
    Dists,
}

const LENGTH_BASE: [u16; 31] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258, 0, 0,
];
const LENGTH_OPS: [u16; 31] = [
    16, 16, 16, 16, 16, 16, 16, 16, 17, 17, 17, 17, 18, 18, 18, 18, 19, 19, 19, 19, 20, 20, 20,
    20, 21, 21, 21, 21, 16, 77, 202,
];
const DIST_BASE: [u16; 32] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577, 0, 0,
];
const DIST_OPS: [u16; 32] = [
    16, 16, 16, 16, 17, 17, 18, 18, 19, 19, 20, 20, 21, 21, 22, 22, 23, 23, 24, 24, 25, 25, 26,
    26, 27, 27, 28, 28, 29, 29, 64, 64,
];

/// Build a canonical decoding table for the `codes` code lengths in
/// `lens[..codes]` into `arena` starting at `*offset`.
///
/// On entry `*bits` is the requested root index width; on success it holds
/// the actual root width and `*offset` has advanced past every entry the
/// table used, leaving sub-tables bump-allocated behind the root.
/// `Err` means the length set was over-subscribed, incomplete (except the
/// permitted single-symbol distance codes), or would overrun the table
/// space budget.
pub fn build_table(
    kind: CodeKind,
    lens: &[u16],
    codes: usize,
    arena: &mut [Code],
    offset: &mut usize,
    bits: &mut u32,
    work: &mut [u16; DEFLATE_NUM_LITLEN_SYMS],
) -> Result<(), ()> {
    let mut count = [0u16; DEFLATE_MAX_CODEWORD_LEN + 1];
    for sym in 0..codes {
        count[lens[sym] as usize] += 1;
    }

    let table_base = *offset;

    let mut root = *bits as usize;
    let mut max = DEFLATE_MAX_CODEWORD_LEN;
    while max >= 1 && count[max] == 0 {
        max -= 1;
    }
    if root > max {
        root = max;
    }
    if max == 0 {
        // no symbols at all: emit a table that forces a decoding error
        let invalid = Code {
            op: 64,
            bits: 1,
            val: 0,
        };
        arena[table_base] = invalid;
        arena[table_base + 1] = invalid;
        *offset = table_base + 2;
        *bits = 1;
        return Ok(());
    }
    let mut min_len = 1;
    while min_len < max && count[min_len] == 0 {
        min_len += 1;
    }
    if root < min_len {
        root = min_len;
    }

    let mut left: i32 = 1;
    for len in 1..=DEFLATE_MAX_CODEWORD_LEN {
        left <<= 1;
        left -= count[len] as i32;
        if left < 0 {
            return Err(()); // over-subscribed
        }
    }
    if left > 0 && (kind == CodeKind::Codes || max != 1) {
        return Err(()); // incomplete set
    }

    // offsets into `work` for each length, then symbols sorted by
    // (length, symbol) order
    let mut offs = [0u16; DEFLATE_MAX_CODEWORD_LEN + 1];
    for len in 1..DEFLATE_MAX_CODEWORD_LEN {
        offs[len + 1] = offs[len] + count[len];
    }
    for sym in 0..codes {
        if lens[sym] != 0 {
            work[offs[lens[sym] as usize] as usize] = sym as u16;
            offs[lens[sym] as usize] += 1;
        }
    }

    let (base, ops, watershed): (&[u16], &[u16], usize) = match kind {
        CodeKind::Codes => (&[], &[], 20),
        CodeKind::Lens => (&LENGTH_BASE, &LENGTH_OPS, DEFLATE_FIRST_LEN_SYM),
        CodeKind::Dists => (&DIST_BASE, &DIST_OPS, 0),
    };

    let mut huff = 0usize; // code value, bit-reversed
    let mut sym = 0usize;
    let mut len = min_len;
    let mut next = table_base; // base of the table being filled
    let mut curr = root; // index width of the table being filled
    let mut drop_bits = 0usize; // bits dropped before sub-table indexing
    let mut low = usize::MAX; // low root bits of the open sub-table
    let mut used = 1usize << root;
    let mask = used - 1;

    if (kind == CodeKind::Lens && used > ENOUGH_LENS)
        || (kind == CodeKind::Dists && used > ENOUGH_DISTS)
    {
        return Err(());
    }

    loop {
        let w = work[sym] as usize;
        let here = if w + 1 < watershed {
            Code {
                op: 0,
                bits: (len - drop_bits) as u8,
                val: w as u16,
            }
        } else if w >= watershed {
            Code {
                op: ops[w - watershed] as u8,
                bits: (len - drop_bits) as u8,
                val: base[w - watershed],
            }
        } else {
            Code {
                op: 96,
                bits: (len - drop_bits) as u8,
                val: 0,
            }
        };

        // replicate the entry over every index whose low bits match the code
        let incr = 1usize << (len - drop_bits);
        let table_size = 1usize << curr;
        let mut fill = table_size;
        loop {
            fill -= incr;
            arena[next + (huff >> drop_bits) + fill] = here;
            if fill == 0 {
                break;
            }
        }

        // advance to the next code, bit-reversed increment
        let mut step = 1usize << (len - 1);
        while huff & step != 0 {
            step >>= 1;
        }
        if step != 0 {
            huff &= step - 1;
            huff += step;
        } else {
            huff = 0;
        }

        sym += 1;
        count[len] -= 1;
        if count[len] == 0 {
            if len == max {
                break;
            }
            len = lens[work[sym] as usize] as usize;
        }

        // open a new sub-table when the code outgrows the root and the
        // root prefix changed
        if len > root && (huff & mask) != low {
            if drop_bits == 0 {
                drop_bits = root;
            }
            next += table_size;

            curr = len - drop_bits;
            let mut left: i32 = 1i32 << curr;
            while curr + drop_bits < max {
                left -= count[curr + drop_bits] as i32;
                if left <= 0 {
                    break;
                }
                curr += 1;
                left <<= 1;
            }

            used += 1usize << curr;
            if (kind == CodeKind::Lens && used > ENOUGH_LENS)
                || (kind == CodeKind::Dists && used > ENOUGH_DISTS)
            {
                return Err(());
            }

            low = huff & mask;
            arena[table_base + low] = Code {
                op: curr as u8,
                bits: root as u8,
                val: (next - table_base) as u16,
            };
        }
    }

    // an incomplete single-symbol code leaves exactly one hole
    if huff != 0 {
        arena[next + (huff >> drop_bits)] = Code {
            op: 64,
            bits: (len - drop_bits) as u8,
            val: 0,
        };
    }

    *offset = table_base + used;
    *bits = root as u32;
    Ok(())
}

pub(crate) struct FixedTables {
    pub lencode: [Code; 512],
    pub distcode: [Code; 32],
}

static FIXED_TABLES: OnceLock<FixedTables> = OnceLock::new();

/// Tables for fixed-Huffman blocks per RFC 1951 3.2.6, built once per
/// process: 512 literal/length entries under a 9-bit root and 32 distance
/// entries under a 5-bit root.
pub(crate) fn fixed_tables() -> &'static FixedTables {
    FIXED_TABLES.get_or_init(|| {
        let mut work = [0u16; DEFLATE_NUM_LITLEN_SYMS];
        let mut arena = [Code::default(); ENOUGH];

        let mut lens = [0u16; DEFLATE_NUM_LITLEN_SYMS];
        for (sym, len) in lens.iter_mut().enumerate() {
            *len = match sym {
                0..=143 => 8,
                144..=255 => 9,
                256..=279 => 7,
                _ => 8,
            };
        }
        let mut next = 0usize;
        let mut bits = 9u32;
        // the fixed codes are complete, so these builds cannot fail
        let _ = build_table(
            CodeKind::Lens,
            &lens,
            DEFLATE_NUM_LITLEN_SYMS,
            &mut arena,
            &mut next,
            &mut bits,
            &mut work,
        );
        let mut lencode = [Code::default(); 512];
        lencode.copy_from_slice(&arena[..512]);

        let dist_lens = [5u16; DEFLATE_NUM_OFFSET_SYMS];
        next = 0;
        bits = 5;
        let _ = build_table(
            CodeKind::Dists,
            &dist_lens,
            DEFLATE_NUM_OFFSET_SYMS,
            &mut arena,
            &mut next,
            &mut bits,
            &mut work,
        );
        let mut distcode = [Code::default(); 32];
        distcode.copy_from_slice(&arena[..32]);

        FixedTables { lencode, distcode }
    })
}
