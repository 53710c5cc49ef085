//! Per-batch identifier allocation

/// Issues strictly increasing node ids for one request envelope.
///
/// Owned by a single `CsomBatch`; ids are only meaningful inside the envelope
/// they were issued for, so the provider is neither `Clone` nor shared.
#[derive(Debug)]
pub struct IdProvider {
    next: u32,
}

impl IdProvider {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Id the next call to `next_id` will return
    pub fn peek(&self) -> u32 {
        self.next
    }

    /// Make sure a caller-assigned id is never issued again
    pub fn advance_past(&mut self, id: u32) {
        if id >= self.next {
            self.next = id.saturating_add(1);
        }
    }
}

impl Default for IdProvider {
    fn default() -> Self {
        Self::new()
    }
}
