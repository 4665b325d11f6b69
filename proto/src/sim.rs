use crate::Vec;

/// Reusable mock datagram channel that can drop, reorder, corrupt, and
/// inject delivery jitter. Stands in for the UDP path between two tunnel
/// endpoints in host-side simulations.
pub struct MockWire {
    drop_first: bool,
    reorder: bool,
    corrupt_first: bool,
    jitter_ms: u64,
    now_ms: u64,
    queue: Vec<(u64, Vec<u8>)>, // (deliver_at_ms, datagram)
    delivered: usize,
    dropped: usize,
    corrupted: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct MockWireStats {
    pub delivered: usize,
    pub dropped: usize,
    pub corrupted: usize,
    pub last_time_ms: u64,
}

impl MockWire {
    pub fn new(drop_first: bool, reorder: bool, jitter_ms: u64) -> Self {
        Self {
            drop_first,
            reorder,
            corrupt_first: false,
            jitter_ms,
            now_ms: 0,
            queue: Vec::new(),
            delivered: 0,
            dropped: 0,
            corrupted: 0,
        }
    }

    /// Flip one ciphertext bit in the next datagram pushed. The receiver's
    /// integrity check is expected to reject it.
    pub fn corrupt_next(&mut self) {
        self.corrupt_first = true;
    }

    pub fn advance(&mut self, delta_ms: u64) {
        self.now_ms = self.now_ms.saturating_add(delta_ms);
    }

    pub fn push(&mut self, mut datagram: Vec<u8>) {
        if self.drop_first {
            self.drop_first = false;
            self.dropped += 1;
            return;
        }
        if self.corrupt_first {
            self.corrupt_first = false;
            if let Some(byte) = datagram.last_mut() {
                *byte ^= 0x01;
            }
            self.corrupted += 1;
        }
        let deliver_at = self.now_ms + self.jitter_ms;
        self.queue.push((deliver_at, datagram));
        if self.reorder && self.queue.len() >= 2 {
            let len = self.queue.len();
            self.queue.swap(len - 1, len - 2);
        }
    }

    pub fn pop(&mut self) -> Option<Vec<u8>> {
        if let Some(pos) = self
            .queue
            .iter()
            .position(|(deliver_at, _)| *deliver_at <= self.now_ms)
        {
            self.delivered += 1;
            Some(self.queue.remove(pos).1)
        } else {
            None
        }
    }

    pub fn stats(&self) -> MockWireStats {
        MockWireStats {
            delivered: self.delivered,
            dropped: self.dropped,
            corrupted: self.corrupted,
            last_time_ms: self.now_ms,
        }
    }
}
