//! 查询序号。
//!
//! 每类查询各有一个递增序号。发起查询时领取序号，结果只在序号仍是该类最新时应用；
//! 上游选择变化时可直接作废某类查询的全部在途序号。

use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Products,
    Sources,
    Ports,
}

impl LookupKind {
    fn index(self) -> usize {
        match self {
            LookupKind::Products => 0,
            LookupKind::Sources => 1,
            LookupKind::Ports => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LookupKind::Products => "products",
            LookupKind::Sources => "sources",
            LookupKind::Ports => "ports",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub kind: LookupKind,
    pub seq: u64,
}

#[derive(Debug, Default)]
pub struct LookupSequence {
    latest: Mutex<[u64; 3]>,
}

impl LookupSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, kind: LookupKind) -> Ticket {
        let mut latest = self.lock();
        let slot = &mut latest[kind.index()];
        *slot += 1;
        Ticket { kind, seq: *slot }
    }

    /// 作废给定类型的全部在途查询。
    pub fn invalidate(&self, kinds: &[LookupKind]) {
        let mut latest = self.lock();
        for kind in kinds {
            latest[kind.index()] += 1;
        }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.lock()[ticket.kind.index()] == ticket.seq
    }

    /// 序号仍为最新时执行 `apply`，检查与应用之间不会插入其他结果。
    pub fn apply_if_current(&self, ticket: Ticket, apply: impl FnOnce()) -> bool {
        let latest = self.lock();
        if latest[ticket.kind.index()] != ticket.seq {
            return false;
        }
        apply();
        drop(latest);
        true
    }

    fn lock(&self) -> MutexGuard<'_, [u64; 3]> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_ticket_supersedes_earlier() {
        let sequence = LookupSequence::new();
        let first = sequence.issue(LookupKind::Sources);
        let second = sequence.issue(LookupKind::Sources);
        assert!(!sequence.is_current(first));
        assert!(sequence.is_current(second));
        assert!(!sequence.apply_if_current(first, || {}));
    }

    #[test]
    fn kinds_are_independent() {
        let sequence = LookupSequence::new();
        let ports = sequence.issue(LookupKind::Ports);
        sequence.issue(LookupKind::Sources);
        assert!(sequence.is_current(ports));
        sequence.invalidate(&[LookupKind::Ports]);
        assert!(!sequence.is_current(ports));
    }
}
