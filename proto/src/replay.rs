/// Number of sequence numbers tracked behind the highest accepted one.
pub const WINDOW_SIZE: u32 = 64;

/// Sliding-window replay detector for one inbound security association.
///
/// Acceptance and recording are split: [`check`](ReplayWindow::check) is a
/// pure query run before the ICV is verified, and
/// [`commit`](ReplayWindow::commit) records the sequence number only after
/// the datagram authenticated. A forged datagram therefore never moves the
/// window.
///
/// Bit 0 of the bitmap is `highest`, bit `n` is `highest - n`.
#[derive(Clone, Debug, Default)]
pub struct ReplayWindow {
    highest: u32,
    bitmap: u64,
}

impl ReplayWindow {
    pub fn new() -> Self {
        ReplayWindow {
            highest: 0,
            bitmap: 0,
        }
    }

    /// Whether `seq` would be accepted. Does not mutate the window.
    ///
    /// Rejects the reserved sequence number 0, anything more than
    /// `WINDOW_SIZE - 1` behind the highest accepted number, and anything
    /// already recorded.
    pub fn check(&self, seq: u32) -> bool {
        if seq == 0 {
            return false;
        }
        if seq > self.highest {
            return true;
        }
        let behind = self.highest - seq;
        if behind >= WINDOW_SIZE {
            return false;
        }
        self.bitmap & (1u64 << behind) == 0
    }

    /// Record `seq` as seen. Callers must only commit a sequence number for
    /// which [`check`](ReplayWindow::check) most recently returned true.
    pub fn commit(&mut self, seq: u32) {
        if seq > self.highest {
            let shift = seq - self.highest;
            if shift >= WINDOW_SIZE {
                self.bitmap = 0;
            } else {
                self.bitmap <<= shift;
            }
            self.bitmap |= 1;
            self.highest = seq;
        } else {
            self.bitmap |= 1u64 << (self.highest - seq);
        }
    }

    /// Highest sequence number accepted so far; 0 before the first commit.
    pub fn highest(&self) -> u32 {
        self.highest
    }
}

/// Egress sequence cursor. Hands out 1, 2, 3, ... in strict order and
/// refuses to wrap: once the 32-bit space is exhausted the association must
/// be torn down and rekeyed by the caller.
#[derive(Clone, Debug, Default)]
pub struct SequenceCursor {
    last: u32,
}

impl SequenceCursor {
    pub fn new() -> Self {
        SequenceCursor { last: 0 }
    }

    /// Next sequence number, or `None` once the counter has cycled.
    pub fn next(&mut self) -> Option<u32> {
        if self.last == u32::MAX {
            return None;
        }
        self.last += 1;
        Some(self.last)
    }

    /// Last sequence number handed out; 0 before the first datagram.
    pub fn last(&self) -> u32 {
        self.last
    }
}
