//! Admission control for background tasks.
//!
//! The gate bounds how many spawned blocks run at once. A call that finds
//! the gate full simply runs inline, so a cap of zero serializes the whole
//! program.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counter of running background tasks with a fixed ceiling.
#[derive(Debug)]
pub struct ThreadGate {
    max: usize,
    active: AtomicUsize,
}

/// Slot in the gate, released when dropped.
#[derive(Debug)]
pub struct ThreadPermit {
    gate: Arc<ThreadGate>,
}

impl ThreadGate {
    pub fn new(max: usize) -> Arc<ThreadGate> {
        Arc::new(ThreadGate {
            max,
            active: AtomicUsize::new(0),
        })
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Whether a new task would currently be admitted.
    #[cfg(test)]
    pub(crate) fn accepts(&self) -> bool {
        self.active() < self.max
    }

    /// Take a slot if one is free.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ThreadPermit> {
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |active| {
                (active < self.max).then_some(active + 1)
            })
            .ok()
            .map(|_| ThreadPermit {
                gate: Arc::clone(self),
            })
    }
}

impl Drop for ThreadPermit {
    fn drop(&mut self) {
        self.gate.active.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_caps_admissions() {
        let gate = ThreadGate::new(2);
        let a = gate.try_acquire();
        let b = gate.try_acquire();
        assert!(a.is_some() && b.is_some());
        assert!(gate.try_acquire().is_none());
        assert!(!gate.accepts());
        drop(a);
        assert_eq!(gate.active(), 1);
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn test_zero_cap_admits_nothing() {
        let gate = ThreadGate::new(0);
        assert!(gate.try_acquire().is_none());
        assert_eq!(gate.active(), 0);
    }

    #[test]
    fn test_concurrent_acquire_never_exceeds_cap() {
        let gate = ThreadGate::new(3);
        let peak = Arc::new(AtomicUsize::new(0));
        std::thread::scope(|scope| {
            for _ in 0..8 {
                let gate = Arc::clone(&gate);
                let peak = Arc::clone(&peak);
                scope.spawn(move || {
                    for _ in 0..200 {
                        if let Some(permit) = gate.try_acquire() {
                            peak.fetch_max(gate.active(), Ordering::AcqRel);
                            drop(permit);
                        }
                    }
                });
            }
        });
        assert!(peak.load(Ordering::Acquire) <= 3);
        assert_eq!(gate.active(), 0);
    }
}
