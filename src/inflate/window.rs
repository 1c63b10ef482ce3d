use std::cmp::min;

/// Circular buffer of the most recent output bytes, the source for match
/// copies that reach behind the current call's output.
///
/// Allocation is lazy: nothing is reserved until the first `update`.
/// `wsize` stays 0 until then; afterwards the most recent `whave` output
/// bytes are recoverable, newest ending just before `wnext`.
pub(crate) struct Window {
    pub buf: Vec<u8>,
    pub wbits: u8,
    pub wsize: usize,
    pub whave: usize,
    pub wnext: usize,
}

impl Window {
    pub fn new(wbits: u8) -> Self {
        Window {
            buf: Vec::new(),
            wbits,
            wsize: 0,
            whave: 0,
            wnext: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        1usize << self.wbits
    }

    pub fn in_use(&self) -> bool {
        self.wsize != 0
    }

    /// Forget the window contents; drop the allocation when the size changes.
    pub fn reset(&mut self, wbits: u8) {
        if wbits != self.wbits {
            self.buf = Vec::new();
            self.wbits = wbits;
        }
        self.wsize = 0;
        self.whave = 0;
        self.wnext = 0;
    }

    /// Fold the output written by the current call into the window.
    /// `Err` means the lazy allocation failed.
    pub fn update(&mut self, written: &[u8]) -> Result<(), ()> {
        if self.buf.is_empty() {
            let cap = self.capacity();
            self.buf.try_reserve_exact(cap).map_err(|_| ())?;
            self.buf.resize(cap, 0);
        }
        if self.wsize == 0 {
            self.wsize = self.capacity();
            self.wnext = 0;
            self.whave = 0;
        }
        let copy = written.len();
        if copy >= self.wsize {
            self.buf[..self.wsize].copy_from_slice(&written[copy - self.wsize..]);
            self.wnext = 0;
            self.whave = self.wsize;
        } else {
            let dist = min(self.wsize - self.wnext, copy);
            let wnext = self.wnext;
            self.buf[wnext..wnext + dist].copy_from_slice(&written[..dist]);
            let rest = copy - dist;
            if rest > 0 {
                self.buf[..rest].copy_from_slice(&written[dist..]);
                self.wnext = rest;
                self.whave = self.wsize;
            } else {
                self.wnext += dist;
                if self.wnext == self.wsize {
                    self.wnext = 0;
                }
                if self.whave < self.wsize {
                    self.whave += dist;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Window;

    fn linearized(w: &Window) -> Vec<u8> {
        // oldest-to-newest view of the valid window bytes
        let mut out = Vec::with_capacity(w.whave);
        for k in 0..w.whave {
            let idx = (w.wnext + w.wsize - w.whave + k) % w.wsize;
            out.push(w.buf[idx]);
        }
        out
    }

    #[test]
    fn lazy_until_first_update() {
        let w = Window::new(8);
        assert!(!w.in_use());
        assert!(w.buf.is_empty());
    }

    #[test]
    fn holds_most_recent_bytes() {
        let mut w = Window::new(8);
        w.update(&[1, 2, 3]).unwrap();
        assert_eq!(w.wsize, 256);
        assert_eq!(w.whave, 3);
        assert_eq!(w.wnext, 3);
        assert_eq!(linearized(&w), vec![1, 2, 3]);

        let big: Vec<u8> = (0..300).map(|i| (i % 251) as u8).collect();
        w.update(&big).unwrap();
        assert_eq!(w.whave, 256);
        assert_eq!(w.wnext, 0);
        assert_eq!(linearized(&w), big[300 - 256..].to_vec());
    }

    #[test]
    fn wraps_across_the_edge() {
        let mut w = Window::new(8);
        w.update(&vec![7u8; 200]).unwrap();
        w.update(&vec![9u8; 100]).unwrap();
        assert_eq!(w.whave, 256);
        assert_eq!(w.wnext, 44);
        let lin = linearized(&w);
        assert_eq!(&lin[..156], &vec![7u8; 156][..]);
        assert_eq!(&lin[156..], &vec![9u8; 100][..]);
    }

    #[test]
    fn reset_changes_capacity() {
        let mut w = Window::new(8);
        w.update(&[1]).unwrap();
        w.reset(10);
        assert!(!w.in_use());
        w.update(&[2]).unwrap();
        assert_eq!(w.wsize, 1024);
        assert_eq!(w.whave, 1);
    }
}
