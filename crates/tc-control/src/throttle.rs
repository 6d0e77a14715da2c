//! Rate limit for repetitive warnings.

/// Lets one message through per window and counts the ones it swallowed.
#[derive(Debug)]
pub struct LogThrottle {
    window_ms:  u64,
    last_ms:    Option<u64>,
    suppressed: u64,
}

impl LogThrottle {
    pub fn new(window_ms: u64) -> Self {
        Self { window_ms, last_ms: None, suppressed: 0 }
    }

    /// `Some(n)` if a message may be logged at `now_ms`, where `n` is the
    /// number suppressed since the last one that was; `None` otherwise.
    pub fn allow(&mut self, now_ms: u64) -> Option<u64> {
        match self.last_ms {
            Some(last) if now_ms.saturating_sub(last) < self.window_ms => {
                self.suppressed += 1;
                None
            }
            _ => {
                self.last_ms = Some(now_ms);
                Some(std::mem::take(&mut self.suppressed))
            }
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
        self.suppressed = 0;
    }
}
