//! Temporal smoothing of raw per-frame finger counts.
//!
//! Single-frame detector noise (a 4 flickering to 3 for one frame) would
//! otherwise reach the game judge directly. [`CountStabilizer`] keeps a
//! small FIFO window of recent raw counts and reports the window's mode —
//! the most frequent value — with ties broken by first occurrence.
//!
//! The history is deliberately *not* cleared when no hand is detected: a
//! null frame pushes a raw 0 and the window decays naturally, giving a
//! smooth ramp-down rather than an instant snap to zero.

use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Stabilized
// ---------------------------------------------------------------------------

/// Result of one [`CountStabilizer::push`].
///
/// `changed` is true only when `count` differs from the previously reported
/// value — the caller should invoke its count-changed callback exactly when
/// this flag is set, and never otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stabilized {
    /// The smoothed finger count (0–5).
    pub count: u8,
    /// Whether `count` differs from the last reported value.
    pub changed: bool,
}

// ---------------------------------------------------------------------------
// CountStabilizer
// ---------------------------------------------------------------------------

/// Mode-smoothing FIFO window over raw finger counts.
///
/// Capacity is a responsiveness trade-off, not a correctness knob: 3 on
/// constrained devices (faster reaction), 5 otherwise (better noise
/// rejection).
///
/// # Example
///
/// ```rust
/// use finger_rhythm::landmark::CountStabilizer;
///
/// let mut stab = CountStabilizer::new(3);
/// assert_eq!(stab.push(2).count, 2); // single sample passes through
/// stab.push(3);
/// let out = stab.push(3);
/// assert_eq!(out.count, 3); // mode of [2, 3, 3]
/// ```
#[derive(Debug)]
pub struct CountStabilizer {
    window: VecDeque<u8>,
    capacity: usize,
    last_reported: Option<u8>,
}

impl CountStabilizer {
    /// Create a stabilizer with the given window `capacity`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "CountStabilizer capacity must be > 0");
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            last_reported: None,
        }
    }

    /// Append a raw count, evicting the oldest sample beyond capacity, and
    /// return the stabilized value plus whether it changed since the last
    /// report.
    ///
    /// While the window holds fewer than 2 samples the raw value passes
    /// through unsmoothed.
    pub fn push(&mut self, raw: u8) -> Stabilized {
        self.window.push_back(raw);
        if self.window.len() > self.capacity {
            self.window.pop_front();
        }

        let count = if self.window.len() >= 2 {
            self.mode()
        } else {
            raw
        };

        let changed = self.last_reported != Some(count);
        self.last_reported = Some(count);

        Stabilized { count, changed }
    }

    /// The most recently reported stabilized value, if any sample has been
    /// pushed yet.
    pub fn current(&self) -> Option<u8> {
        self.last_reported
    }

    /// Discard all history and the last-reported value.
    pub fn clear(&mut self) {
        self.window.clear();
        self.last_reported = None;
    }

    /// Window capacity this stabilizer was built with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Mode of the window; ties resolve to the value that appears earliest
    /// in the window when scanned front (oldest) to back (newest).
    fn mode(&self) -> u8 {
        let mut best = self.window[0];
        let mut best_freq = 0usize;
        for &candidate in &self.window {
            let freq = self.window.iter().filter(|&&v| v == candidate).count();
            // Strict > keeps the first-scanned value on ties.
            if freq > best_freq {
                best_freq = freq;
                best = candidate;
            }
        }
        best
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
