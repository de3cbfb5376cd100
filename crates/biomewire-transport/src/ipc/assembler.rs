//! Rebuilds messages from fragments that may arrive across many polls.

use super::driver::Fragment;

/// Accumulates fragments until a message's END fragment arrives.
#[derive(Debug, Default)]
pub struct FragmentAssembler {
    buffer: Vec<u8>,
    in_progress: bool,
}

impl FragmentAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one fragment. Returns the message once it is complete.
    ///
    /// A continuation fragment with no preceding BEGIN is dropped, as is a
    /// partial message interrupted by a new BEGIN.
    pub fn on_fragment(&mut self, fragment: Fragment) -> Option<Vec<u8>> {
        if fragment.is_begin() {
            if self.in_progress {
                tracing::warn!(
                    discarded = self.buffer.len(),
                    "new message began before previous one ended"
                );
            }
            if fragment.is_end() {
                self.reset();
                return Some(fragment.payload);
            }
            self.buffer.clear();
            self.buffer.extend_from_slice(&fragment.payload);
            self.in_progress = true;
            return None;
        }

        if !self.in_progress {
            tracing::warn!(
                len = fragment.payload.len(),
                "dropping continuation fragment without a beginning"
            );
            return None;
        }

        self.buffer.extend_from_slice(&fragment.payload);
        if fragment.is_end() {
            self.in_progress = false;
            return Some(std::mem::take(&mut self.buffer));
        }
        None
    }

    /// Returns `true` while a message is partially assembled.
    pub fn is_assembling(&self) -> bool {
        self.in_progress
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.in_progress = false;
    }
}
