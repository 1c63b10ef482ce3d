//! Tight literal/match loop, entered when the buffers guarantee a whole
//! length/distance pair of input (48 bits, six bytes) and a maximal match
//! (258 bytes) of output headroom, so no per-symbol availability checks
//! are needed.

use super::{InflateStream, Mode};

/// Decode from `LEN` until end-of-block, an error, or buffer pressure.
///
/// Preconditions: `input.len() - *in_idx >= 6` and
/// `output.len() - *out_idx >= 258`. On return the stream's mode is `Len`
/// (ran low on buffer headroom), `Type` (end of block), or `Bad`; whole
/// unused bytes pulled into the accumulator have been given back to the
/// input cursor.
pub(super) fn inflate_fast(
    st: &mut InflateStream,
    input: &[u8],
    in_idx: &mut usize,
    output: &mut [u8],
    out_idx: &mut usize,
) {
    let in_last = input.len() - 5;
    let out_end = output.len() - 257;

    let mut i = *in_idx;
    let mut o = *out_idx;
    let mut bitbuf = st.bits.bitbuf;
    let mut bitsleft = st.bits.bitsleft;

    let lcode = st.lencode;
    let dcode = st.distcode;
    let lmask = (1u32 << st.lenbits) - 1;
    let dmask = (1u32 << st.distbits) - 1;

    let wsize = st.window.wsize;
    let whave = st.window.whave;
    let wnext = st.window.wnext;

    'top: while i < in_last && o < out_end {
        if bitsleft < 15 {
            bitbuf |= (input[i] as u32) << bitsleft;
            i += 1;
            bitsleft += 8;
            bitbuf |= (input[i] as u32) << bitsleft;
            i += 1;
            bitsleft += 8;
        }
        let mut here = st.codes[lcode + (bitbuf & lmask) as usize];
        'dolen: loop {
            bitbuf >>= here.bits;
            bitsleft -= here.bits as u32;
            let op = here.op;
            if op == 0 {
                output[o] = here.val as u8;
                o += 1;
                break 'dolen;
            }
            if op & 16 != 0 {
                let mut len = here.val as usize;
                let extra = (op & 15) as u32;
                if extra != 0 {
                    if bitsleft < extra {
                        bitbuf |= (input[i] as u32) << bitsleft;
                        i += 1;
                        bitsleft += 8;
                    }
                    len += (bitbuf & ((1 << extra) - 1)) as usize;
                    bitbuf >>= extra;
                    bitsleft -= extra;
                }
                if bitsleft < 15 {
                    bitbuf |= (input[i] as u32) << bitsleft;
                    i += 1;
                    bitsleft += 8;
                    bitbuf |= (input[i] as u32) << bitsleft;
                    i += 1;
                    bitsleft += 8;
                }
                here = st.codes[dcode + (bitbuf & dmask) as usize];
                'dodist: loop {
                    bitbuf >>= here.bits;
                    bitsleft -= here.bits as u32;
                    let op = here.op;
                    if op & 16 != 0 {
                        let mut dist = here.val as usize;
                        let extra = (op & 15) as u32;
                        if bitsleft < extra {
                            bitbuf |= (input[i] as u32) << bitsleft;
                            i += 1;
                            bitsleft += 8;
                            if bitsleft < extra {
                                bitbuf |= (input[i] as u32) << bitsleft;
                                i += 1;
                                bitsleft += 8;
                            }
                        }
                        dist += (bitbuf & ((1 << extra) - 1)) as usize;
                        #[cfg(feature = "strict")]
                        if dist > st.dmax {
                            st.msg = Some("invalid distance too far back");
                            st.mode = Mode::Bad;
                            break 'top;
                        }
                        bitbuf >>= extra;
                        bitsleft -= extra;

                        if dist > o {
                            // the match starts before this call's output
                            #[allow(unused_mut)]
                            let mut rem = dist - o;
                            if rem > whave {
                                if st.sane {
                                    st.msg = Some("invalid distance too far back");
                                    st.mode = Mode::Bad;
                                    break 'top;
                                }
                                #[cfg(feature = "allow-invalid-distance")]
                                {
                                    let gap = rem - whave;
                                    if len <= gap {
                                        for _ in 0..len {
                                            output[o] = 0;
                                            o += 1;
                                        }
                                        break 'dolen;
                                    }
                                    len -= gap;
                                    for _ in 0..gap {
                                        output[o] = 0;
                                        o += 1;
                                    }
                                    if whave == 0 {
                                        let mut from = o - dist;
                                        for _ in 0..len {
                                            output[o] = output[from];
                                            o += 1;
                                            from += 1;
                                        }
                                        break 'dolen;
                                    }
                                    rem = whave;
                                }
                            }
                            // three window layouts: unwrapped write cursor
                            // at 0, a match wrapping the edge, or one fully
                            // below the cursor
                            if wnext == 0 {
                                let wfrom = wsize - rem;
                                let n = rem.min(len);
                                output[o..o + n]
                                    .copy_from_slice(&st.window.buf[wfrom..wfrom + n]);
                                o += n;
                                len -= n;
                            } else if wnext < rem {
                                let wfrom = wsize + wnext - rem;
                                let n = (rem - wnext).min(len);
                                output[o..o + n]
                                    .copy_from_slice(&st.window.buf[wfrom..wfrom + n]);
                                o += n;
                                len -= n;
                                if len != 0 {
                                    let n = wnext.min(len);
                                    output[o..o + n].copy_from_slice(&st.window.buf[..n]);
                                    o += n;
                                    len -= n;
                                }
                            } else {
                                let wfrom = wnext - rem;
                                let n = rem.min(len);
                                output[o..o + n]
                                    .copy_from_slice(&st.window.buf[wfrom..wfrom + n]);
                                o += n;
                                len -= n;
                            }
                            if len != 0 {
                                // the rest comes from this call's output
                                let mut from = o - dist;
                                while len > 2 {
                                    output[o] = output[from];
                                    output[o + 1] = output[from + 1];
                                    output[o + 2] = output[from + 2];
                                    o += 3;
                                    from += 3;
                                    len -= 3;
                                }
                                if len != 0 {
                                    output[o] = output[from];
                                    o += 1;
                                    from += 1;
                                    if len > 1 {
                                        output[o] = output[from];
                                        o += 1;
                                    }
                                }
                            }
                        } else {
                            // source and destination may overlap by less
                            // than the length; minimum match is three
                            let mut from = o - dist;
                            loop {
                                output[o] = output[from];
                                output[o + 1] = output[from + 1];
                                output[o + 2] = output[from + 2];
                                o += 3;
                                from += 3;
                                len -= 3;
                                if len <= 2 {
                                    break;
                                }
                            }
                            if len != 0 {
                                output[o] = output[from];
                                o += 1;
                                from += 1;
                                if len > 1 {
                                    output[o] = output[from];
                                    o += 1;
                                }
                            }
                        }
                        break 'dolen;
                    }
                    if op & 64 == 0 {
                        // second-level distance table
                        here = st.codes
                            [dcode + here.val as usize + (bitbuf & ((1u32 << op) - 1)) as usize];
                        continue 'dodist;
                    }
                    st.msg = Some("invalid distance code");
                    st.mode = Mode::Bad;
                    break 'top;
                }
            }
            if op & 64 == 0 {
                // second-level length table
                here = st.codes
                    [lcode + here.val as usize + (bitbuf & ((1u32 << op) - 1)) as usize];
                continue 'dolen;
            }
            if op & 32 != 0 {
                st.mode = Mode::Type;
                break 'top;
            }
            st.msg = Some("invalid literal/length code");
            st.mode = Mode::Bad;
            break 'top;
        }
    }

    // give whole unused bytes back to the input
    let unused = bitsleft >> 3;
    i -= unused as usize;
    bitsleft -= unused << 3;
    bitbuf &= (1u32 << bitsleft) - 1;

    *in_idx = i;
    *out_idx = o;
    st.bits.bitbuf = bitbuf;
    st.bits.bitsleft = bitsleft;
}
