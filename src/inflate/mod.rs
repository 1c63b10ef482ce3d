//! Incremental RFC 1951 DEFLATE decoder.
//!
//! The decoder is a mode-driven state machine over caller-supplied input
//! and output buffers. It suspends whenever a buffer runs out and resumes
//! from the saved mode on the next [`InflateStream::write`] call; partially
//! read bits stay in the accumulator, so any chunking of the input and
//! output produces the same byte stream.

use crate::common::*;
use std::cmp::min;

mod bits;
mod fast;
pub mod tables;
mod window;

use bits::BitReader;
use tables::{build_table, Code, CodeKind, ENOUGH};
use window::Window;

/// Caller-selected policy for when `write` may suspend.
///
/// The first three are identical at this layer; `Block` also returns at
/// the next between-block boundary, `Trees` additionally as soon as the
/// code tables of a block become available, and `Finish` reports a
/// buffer-exhaustion return as `BufError` instead of `Ok`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum Flush {
    NoFlush = 0,
    SyncFlush = 2,
    FullFlush = 3,
    Finish = 4,
    Block = 5,
    Trees = 6,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
#[must_use = "the status carries stream end and error conditions"]
pub enum Status {
    Ok = 0,
    StreamEnd = 1,
    StreamError = -2,
    DataError = -3,
    MemError = -4,
    BufError = -5,
}

/// State-machine position, preserved across suspensions.
///
/// `CopyEnter` and `LenEnter` are the between-states a `Trees` flush
/// leaves in right after a block header or table set has been read; they
/// transition unconditionally on the next iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Head,
    Type,
    TypeDo,
    Stored,
    CopyEnter,
    Copy,
    Table,
    LenLens,
    CodeLens,
    LenEnter,
    Len,
    LenExt,
    Dist,
    DistExt,
    Match,
    Lit,
    Check,
    Done,
    Bad,
    Mem,
}

/// Permutation in which the code-length code lengths are transmitted.
const ORDER: [usize; DEFLATE_NUM_PRECODE_SYMS] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// Ensure at least `$n` bits in the accumulator, suspending the state
/// machine with everything intact when the input runs dry.
macro_rules! need_bits {
    ($st:expr, $input:expr, $in_idx:expr, $n:expr) => {
        while $st.bits.bitsleft < ($n) as u32 {
            if $in_idx == $input.len() {
                return Status::Ok;
            }
            $st.bits.pull($input[$in_idx]);
            $in_idx += 1;
        }
    };
}

/// Pull a single input byte into the accumulator or suspend.
macro_rules! pull_byte {
    ($st:expr, $input:expr, $in_idx:expr) => {
        if $in_idx == $input.len() {
            return Status::Ok;
        }
        $st.bits.pull($input[$in_idx]);
        $in_idx += 1;
    };
}

/// A resumable raw-DEFLATE inflater.
///
/// All state lives in the instance; the caller owns the buffers and
/// advances them by the `(consumed, produced)` counts `write` returns.
pub struct InflateStream {
    mode: Mode,
    /// final-block flag from the last block header
    last: bool,
    /// when false, too-far-back distances read as zeros instead of erroring
    sane: bool,
    /// maximum legal match distance
    #[cfg_attr(not(feature = "strict"), allow(dead_code))]
    dmax: usize,
    msg: Option<&'static str>,
    total_in: u64,
    total_out: u64,
    total: u64,
    data_type: u32,
    bits: BitReader,
    window: Window,
    /// stored-block bytes remaining, literal value, or match length
    length: usize,
    /// match distance
    offset: usize,
    /// extra bits pending for the current length/distance code
    extra: u32,
    /// match length before the distance decode, kept for diagnostics
    was: usize,
    /// bit distance of the code in flight, -1 between blocks
    back: i32,
    lencode: usize,
    distcode: usize,
    lenbits: u32,
    distbits: u32,
    ncode: usize,
    nlen: usize,
    ndist: usize,
    /// code lengths read so far in the current dynamic header
    have: usize,
    /// bump cursor into `codes`
    next: usize,
    lens: [u16; 320],
    work: [u16; DEFLATE_NUM_LITLEN_SYMS],
    codes: [Code; ENOUGH],
}

impl InflateStream {
    /// Inflater with the full 32 KiB window.
    pub fn new() -> Self {
        let mut st = InflateStream {
            mode: Mode::Head,
            last: false,
            sane: true,
            dmax: DEFLATE_MAX_MATCH_OFFSET,
            msg: None,
            total_in: 0,
            total_out: 0,
            total: 0,
            data_type: 0,
            bits: BitReader::default(),
            window: Window::new(DEFLATE_WINDOW_ORDER as u8),
            length: 0,
            offset: 0,
            extra: 0,
            was: 0,
            back: -1,
            lencode: 0,
            distcode: 0,
            lenbits: 0,
            distbits: 0,
            ncode: 0,
            nlen: 0,
            ndist: 0,
            have: 0,
            next: 0,
            lens: [0; 320],
            work: [0; DEFLATE_NUM_LITLEN_SYMS],
            codes: [Code::default(); ENOUGH],
        };
        st.reset_keep();
        st
    }

    /// Inflater with a `1 << wbits` window, `wbits` in `8..=15`.
    pub fn with_window_bits(wbits: u8) -> Option<Self> {
        if !(8..=15).contains(&wbits) {
            return None;
        }
        let mut st = Self::new();
        st.window = Window::new(wbits);
        Some(st)
    }

    /// Start over on a new stream, reallocating the window if `wbits`
    /// changed. `StreamError` if `wbits` is out of range.
    pub fn reset(&mut self, wbits: u8) -> Status {
        if !(8..=15).contains(&wbits) {
            return Status::StreamError;
        }
        self.window.reset(wbits);
        self.reset_keep();
        Status::Ok
    }

    /// Zero the stream state but keep the window allocation and `wbits`.
    pub fn reset_keep(&mut self) {
        self.total_in = 0;
        self.total_out = 0;
        self.total = 0;
        self.msg = None;
        self.mode = Mode::Head;
        self.last = false;
        self.dmax = DEFLATE_MAX_MATCH_OFFSET;
        self.bits.clear();
        self.lencode = 0;
        self.distcode = 0;
        self.next = 0;
        self.sane = true;
        self.back = -1;
        self.data_type = 0;
    }

    pub fn window_bits(&self) -> u8 {
        self.window.wbits
    }

    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Cumulative decoded bytes, mirroring `total_out`.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Diagnostic for the last `DataError`.
    pub fn msg(&self) -> Option<&'static str> {
        self.msg
    }

    /// Number of unused bits plus flags for the final block (64), a
    /// between-block boundary (128), and a just-delivered header (256).
    pub fn data_type(&self) -> u32 {
        self.data_type
    }

    /// Location marker for building a random-access index: the upper half
    /// is the bit distance of the code in flight back from the consumed
    /// input (-1 at a block boundary), the lower half how many bytes of
    /// the current stored block or match are still pending delivery.
    pub fn mark(&self) -> i64 {
        let pending = match self.mode {
            Mode::Copy => self.length as i64,
            Mode::Match => (self.was - self.length) as i64,
            _ => 0,
        };
        ((self.back as i64) << 16) + pending
    }

    /// Opt into reading zeros for distances that reach beyond the window
    /// instead of failing with `DataError`.
    #[cfg(feature = "allow-invalid-distance")]
    pub fn allow_invalid_distance(&mut self, allow: bool) {
        self.sane = !allow;
    }

    fn install_fixed_tables(&mut self) {
        let f = tables::fixed_tables();
        self.codes[..512].copy_from_slice(&f.lencode);
        self.codes[512..544].copy_from_slice(&f.distcode);
        self.lencode = 0;
        self.lenbits = 9;
        self.distcode = 512;
        self.distbits = 5;
    }

    /// Decode as much as the buffers allow, resuming from the saved mode.
    ///
    /// Returns the status along with the number of input bytes consumed
    /// and output bytes produced; the caller advances its buffers by those
    /// counts before the next call.
    pub fn write(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> (Status, usize, usize) {
        if self.mode == Mode::Type {
            self.mode = Mode::TypeDo;
        }
        let mut in_idx = 0usize;
        let mut out_idx = 0usize;
        let mut ret = self.run(input, output, &mut in_idx, &mut out_idx, flush);

        if ret == Status::MemError {
            return (ret, in_idx, out_idx);
        }

        // Leave-point accounting: fold this call's output into the window
        // unless the stream just finished cleanly, update the totals, and
        // upgrade to a buffer error when no progress was possible.
        let keep = self.window.in_use()
            || (out_idx > 0
                && !matches!(self.mode, Mode::Bad | Mode::Mem)
                && (!matches!(self.mode, Mode::Check | Mode::Done) || flush != Flush::Finish));
        if keep && self.window.update(&output[..out_idx]).is_err() {
            self.mode = Mode::Mem;
            return (Status::MemError, in_idx, out_idx);
        }
        self.total_in += in_idx as u64;
        self.total_out += out_idx as u64;
        self.total += out_idx as u64;
        self.data_type = self.bits.bitsleft
            + if self.last { 64 } else { 0 }
            + if self.mode == Mode::Type { 128 } else { 0 }
            + if matches!(self.mode, Mode::LenEnter | Mode::CopyEnter) {
                256
            } else {
                0
            };
        if ((in_idx == 0 && out_idx == 0) || flush == Flush::Finish) && ret == Status::Ok {
            ret = Status::BufError;
        }
        (ret, in_idx, out_idx)
    }

    /// Drive the mode machine until a leave point: buffer exhausted, a
    /// flush-requested boundary, stream end, or an error.
    fn run(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        in_idx: &mut usize,
        out_idx: &mut usize,
        flush: Flush,
    ) -> Status {
        loop {
            match self.mode {
                Mode::Head => self.mode = Mode::TypeDo,
                Mode::Type => {
                    if flush == Flush::Block || flush == Flush::Trees {
                        return Status::Ok;
                    }
                    self.mode = Mode::TypeDo;
                }
                Mode::TypeDo => {
                    if self.last {
                        self.bits.byte_align();
                        self.mode = Mode::Check;
                        continue;
                    }
                    need_bits!(self, input, *in_idx, 3);
                    self.last = self.bits.peek(1) != 0;
                    self.bits.drop_bits(1);
                    match self.bits.peek(2) as u8 {
                        DEFLATE_BLOCKTYPE_UNCOMPRESSED => self.mode = Mode::Stored,
                        DEFLATE_BLOCKTYPE_STATIC_HUFFMAN => {
                            self.install_fixed_tables();
                            self.mode = Mode::LenEnter;
                            if flush == Flush::Trees {
                                self.bits.drop_bits(2);
                                return Status::Ok;
                            }
                        }
                        DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN => self.mode = Mode::Table,
                        _ => {
                            self.msg = Some("invalid block type");
                            self.mode = Mode::Bad;
                        }
                    }
                    self.bits.drop_bits(2);
                }
                Mode::Stored => {
                    self.bits.byte_align();
                    need_bits!(self, input, *in_idx, 32);
                    let hold = self.bits.bitbuf;
                    if (hold & 0xffff) != ((hold >> 16) ^ 0xffff) {
                        self.msg = Some("invalid stored block lengths");
                        self.mode = Mode::Bad;
                        continue;
                    }
                    self.length = (hold & 0xffff) as usize;
                    self.bits.clear();
                    self.mode = Mode::CopyEnter;
                    if flush == Flush::Trees {
                        return Status::Ok;
                    }
                }
                Mode::CopyEnter => self.mode = Mode::Copy,
                Mode::Copy => {
                    let mut copy = self.length;
                    if copy != 0 {
                        copy = min(copy, input.len() - *in_idx);
                        copy = min(copy, output.len() - *out_idx);
                        if copy == 0 {
                            return Status::Ok;
                        }
                        output[*out_idx..*out_idx + copy]
                            .copy_from_slice(&input[*in_idx..*in_idx + copy]);
                        *in_idx += copy;
                        *out_idx += copy;
                        self.length -= copy;
                        continue;
                    }
                    self.mode = Mode::Type;
                }
                Mode::Table => {
                    need_bits!(self, input, *in_idx, 14);
                    self.nlen = self.bits.peek(5) as usize + 257;
                    self.bits.drop_bits(5);
                    self.ndist = self.bits.peek(5) as usize + 1;
                    self.bits.drop_bits(5);
                    self.ncode = self.bits.peek(4) as usize + 4;
                    self.bits.drop_bits(4);
                    if self.nlen > 286 || self.ndist > 30 {
                        self.msg = Some("too many length or distance symbols");
                        self.mode = Mode::Bad;
                        continue;
                    }
                    self.have = 0;
                    self.mode = Mode::LenLens;
                }
                Mode::LenLens => {
                    while self.have < self.ncode {
                        need_bits!(self, input, *in_idx, 3);
                        self.lens[ORDER[self.have]] = self.bits.peek(3) as u16;
                        self.have += 1;
                        self.bits.drop_bits(3);
                    }
                    while self.have < DEFLATE_NUM_PRECODE_SYMS {
                        self.lens[ORDER[self.have]] = 0;
                        self.have += 1;
                    }
                    self.next = 0;
                    self.lencode = 0;
                    self.lenbits = DEFLATE_MAX_PRE_CODEWORD_LEN as u32;
                    if build_table(
                        CodeKind::Codes,
                        &self.lens,
                        DEFLATE_NUM_PRECODE_SYMS,
                        &mut self.codes,
                        &mut self.next,
                        &mut self.lenbits,
                        &mut self.work,
                    )
                    .is_err()
                    {
                        self.msg = Some("invalid code lengths set");
                        self.mode = Mode::Bad;
                        continue;
                    }
                    self.have = 0;
                    self.mode = Mode::CodeLens;
                }
                Mode::CodeLens => {
                    while self.have < self.nlen + self.ndist {
                        let here = loop {
                            let here =
                                self.codes[self.lencode + self.bits.peek(self.lenbits) as usize];
                            if (here.bits as u32) <= self.bits.bitsleft {
                                break here;
                            }
                            pull_byte!(self, input, *in_idx);
                        };
                        if here.val < 16 {
                            self.bits.drop_bits(here.bits as u32);
                            self.lens[self.have] = here.val;
                            self.have += 1;
                        } else {
                            let len;
                            let copy;
                            if here.val == 16 {
                                need_bits!(self, input, *in_idx, here.bits as u32 + 2);
                                self.bits.drop_bits(here.bits as u32);
                                if self.have == 0 {
                                    self.msg = Some("invalid bit length repeat");
                                    self.mode = Mode::Bad;
                                    break;
                                }
                                len = self.lens[self.have - 1];
                                copy = 3 + self.bits.peek(2) as usize;
                                self.bits.drop_bits(2);
                            } else if here.val == 17 {
                                need_bits!(self, input, *in_idx, here.bits as u32 + 3);
                                self.bits.drop_bits(here.bits as u32);
                                len = 0;
                                copy = 3 + self.bits.peek(3) as usize;
                                self.bits.drop_bits(3);
                            } else {
                                need_bits!(self, input, *in_idx, here.bits as u32 + 7);
                                self.bits.drop_bits(here.bits as u32);
                                len = 0;
                                copy = 11 + self.bits.peek(7) as usize;
                                self.bits.drop_bits(7);
                            }
                            if self.have + copy > self.nlen + self.ndist {
                                self.msg = Some("invalid bit length repeat");
                                self.mode = Mode::Bad;
                                break;
                            }
                            for _ in 0..copy {
                                self.lens[self.have] = len;
                                self.have += 1;
                            }
                        }
                    }
                    if self.mode == Mode::Bad {
                        continue;
                    }
                    if self.lens[DEFLATE_END_OF_BLOCK] == 0 {
                        self.msg = Some("invalid code -- missing end-of-block");
                        self.mode = Mode::Bad;
                        continue;
                    }
                    // The 9-bit and 6-bit roots below bound the table sizes
                    // that ENOUGH_LENS and ENOUGH_DISTS were computed for.
                    self.next = 0;
                    self.lencode = 0;
                    self.lenbits = 9;
                    if build_table(
                        CodeKind::Lens,
                        &self.lens,
                        self.nlen,
                        &mut self.codes,
                        &mut self.next,
                        &mut self.lenbits,
                        &mut self.work,
                    )
                    .is_err()
                    {
                        self.msg = Some("invalid literal/lengths set");
                        self.mode = Mode::Bad;
                        continue;
                    }
                    self.distcode = self.next;
                    self.distbits = 6;
                    if build_table(
                        CodeKind::Dists,
                        &self.lens[self.nlen..],
                        self.ndist,
                        &mut self.codes,
                        &mut self.next,
                        &mut self.distbits,
                        &mut self.work,
                    )
                    .is_err()
                    {
                        self.msg = Some("invalid distances set");
                        self.mode = Mode::Bad;
                        continue;
                    }
                    self.mode = Mode::LenEnter;
                    if flush == Flush::Trees {
                        return Status::Ok;
                    }
                }
                Mode::LenEnter => self.mode = Mode::Len,
                Mode::Len => {
                    if input.len() - *in_idx >= 6
                        && output.len() - *out_idx >= DEFLATE_MAX_MATCH_LEN
                    {
                        fast::inflate_fast(self, input, in_idx, output, out_idx);
                        if self.mode == Mode::Type {
                            self.back = -1;
                        }
                        continue;
                    }
                    self.back = 0;
                    let mut here = loop {
                        let here = self.codes[self.lencode + self.bits.peek(self.lenbits) as usize];
                        if (here.bits as u32) <= self.bits.bitsleft {
                            break here;
                        }
                        pull_byte!(self, input, *in_idx);
                    };
                    if here.op != 0 && here.op & 0xf0 == 0 {
                        let last = here;
                        here = loop {
                            let here = self.codes[self.lencode
                                + last.val as usize
                                + (self.bits.peek(last.bits as u32 + last.op as u32)
                                    >> last.bits) as usize];
                            if (last.bits as u32 + here.bits as u32) <= self.bits.bitsleft {
                                break here;
                            }
                            pull_byte!(self, input, *in_idx);
                        };
                        self.bits.drop_bits(last.bits as u32);
                        self.back += last.bits as i32;
                    }
                    self.bits.drop_bits(here.bits as u32);
                    self.back += here.bits as i32;
                    self.length = here.val as usize;
                    if here.op == 0 {
                        self.mode = Mode::Lit;
                        continue;
                    }
                    if here.op & 32 != 0 {
                        self.back = -1;
                        self.mode = Mode::Type;
                        continue;
                    }
                    if here.op & 64 != 0 {
                        self.msg = Some("invalid literal/length code");
                        self.mode = Mode::Bad;
                        continue;
                    }
                    self.extra = (here.op & 15) as u32;
                    self.mode = Mode::LenExt;
                }
                Mode::LenExt => {
                    if self.extra != 0 {
                        need_bits!(self, input, *in_idx, self.extra);
                        self.length += self.bits.peek(self.extra) as usize;
                        self.bits.drop_bits(self.extra);
                        self.back += self.extra as i32;
                    }
                    self.was = self.length;
                    self.mode = Mode::Dist;
                }
                Mode::Dist => {
                    let mut here = loop {
                        let here =
                            self.codes[self.distcode + self.bits.peek(self.distbits) as usize];
                        if (here.bits as u32) <= self.bits.bitsleft {
                            break here;
                        }
                        pull_byte!(self, input, *in_idx);
                    };
                    if here.op & 0xf0 == 0 {
                        let last = here;
                        here = loop {
                            let here = self.codes[self.distcode
                                + last.val as usize
                                + (self.bits.peek(last.bits as u32 + last.op as u32)
                                    >> last.bits) as usize];
                            if (last.bits as u32 + here.bits as u32) <= self.bits.bitsleft {
                                break here;
                            }
                            pull_byte!(self, input, *in_idx);
                        };
                        self.bits.drop_bits(last.bits as u32);
                        self.back += last.bits as i32;
                    }
                    self.bits.drop_bits(here.bits as u32);
                    self.back += here.bits as i32;
                    if here.op & 64 != 0 {
                        self.msg = Some("invalid distance code");
                        self.mode = Mode::Bad;
                        continue;
                    }
                    self.offset = here.val as usize;
                    self.extra = (here.op & 15) as u32;
                    self.mode = Mode::DistExt;
                }
                Mode::DistExt => {
                    if self.extra != 0 {
                        need_bits!(self, input, *in_idx, self.extra);
                        self.offset += self.bits.peek(self.extra) as usize;
                        self.bits.drop_bits(self.extra);
                        self.back += self.extra as i32;
                    }
                    #[cfg(feature = "strict")]
                    if self.offset > self.dmax {
                        self.msg = Some("invalid distance too far back");
                        self.mode = Mode::Bad;
                        continue;
                    }
                    self.mode = Mode::Match;
                }
                Mode::Match => {
                    if *out_idx == output.len() {
                        return Status::Ok;
                    }
                    let written = *out_idx;
                    if self.offset > written {
                        // part of the match predates this call's output
                        let mut copy = self.offset - written;
                        if copy > self.window.whave {
                            if self.sane {
                                self.msg = Some("invalid distance too far back");
                                self.mode = Mode::Bad;
                                continue;
                            }
                            #[cfg(feature = "allow-invalid-distance")]
                            {
                                copy -= self.window.whave;
                                copy = min(copy, self.length);
                                copy = min(copy, output.len() - *out_idx);
                                self.length -= copy;
                                for _ in 0..copy {
                                    output[*out_idx] = 0;
                                    *out_idx += 1;
                                }
                                if self.length == 0 {
                                    self.mode = Mode::Len;
                                }
                                continue;
                            }
                        }
                        let from = if copy > self.window.wnext {
                            copy -= self.window.wnext;
                            self.window.wsize - copy
                        } else {
                            self.window.wnext - copy
                        };
                        copy = min(copy, self.length);
                        copy = min(copy, output.len() - *out_idx);
                        output[*out_idx..*out_idx + copy]
                            .copy_from_slice(&self.window.buf[from..from + copy]);
                        *out_idx += copy;
                        self.length -= copy;
                    } else {
                        // the whole source is in this call's output; the
                        // regions may overlap, so copy a byte at a time
                        let mut from = written - self.offset;
                        let mut copy = min(self.length, output.len() - *out_idx);
                        self.length -= copy;
                        while copy != 0 {
                            output[*out_idx] = output[from];
                            *out_idx += 1;
                            from += 1;
                            copy -= 1;
                        }
                    }
                    if self.length == 0 {
                        self.mode = Mode::Len;
                    }
                }
                Mode::Lit => {
                    if *out_idx == output.len() {
                        return Status::Ok;
                    }
                    output[*out_idx] = self.length as u8;
                    *out_idx += 1;
                    self.mode = Mode::Len;
                }
                Mode::Check => self.mode = Mode::Done,
                Mode::Done => return Status::StreamEnd,
                Mode::Bad => return Status::DataError,
                Mode::Mem => return Status::MemError,
            }
        }
    }
}
