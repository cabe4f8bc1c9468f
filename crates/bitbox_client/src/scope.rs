use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Lifetime of one mounted page.
///
/// Requests take a ticket before they go out; once the page is left, tickets
/// taken earlier no longer match and their responses must be dropped.
#[derive(Debug, Clone, Default)]
pub struct PageScope {
    generation: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeTicket(u64);

impl PageScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticket(&self) -> ScopeTicket {
        ScopeTicket(self.generation.load(Ordering::Acquire))
    }

    pub fn is_current(&self, ticket: ScopeTicket) -> bool {
        self.generation.load(Ordering::Acquire) == ticket.0
    }

    pub fn leave(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Supersedes every earlier ticket and hands out the only current one.
    pub fn restart(&self) -> ScopeTicket {
        ScopeTicket(self.generation.fetch_add(1, Ordering::AcqRel) + 1)
    }
}
