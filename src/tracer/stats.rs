//! Ray trace counters.
//!
//! Each worker owns a [`RayCounters`] for the rows it renders; the frame
//! sums them into a [`RayCounts`] afterwards, so no counter is ever shared
//! between threads.

use std::cell::Cell;
use std::ops::{Add, AddAssign};

/// Per-frame ray totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RayCounts {
    pub primary: u64,
    pub scatter: u64,
    /// Valid shadow rays only.
    pub shadow: u64,
    /// Zero-length rays dispatched for rejected light samples; not part of [`RayCounts::total`].
    pub dummy: u64,
}

impl RayCounts {
    pub fn total(&self) -> u64 {
        self.primary + self.scatter + self.shadow
    }
}

impl Add for RayCounts {
    type Output = RayCounts;

    fn add(self, rhs: RayCounts) -> RayCounts {
        RayCounts {
            primary: self.primary + rhs.primary,
            scatter: self.scatter + rhs.scatter,
            shadow: self.shadow + rhs.shadow,
            dummy: self.dummy + rhs.dummy,
        }
    }
}

impl AddAssign for RayCounts {
    fn add_assign(&mut self, rhs: RayCounts) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for RayCounts {
    fn sum<I: Iterator<Item = RayCounts>>(iter: I) -> Self {
        iter.fold(RayCounts::default(), Add::add)
    }
}

/// Lane-local counters.
#[derive(Debug, Default)]
pub struct RayCounters {
    primary: Cell<u64>,
    scatter: Cell<u64>,
    shadow: Cell<u64>,
    dummy: Cell<u64>,
}

impl RayCounters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn count_primary(&self) {
        self.primary.set(self.primary.get() + 1);
    }

    #[inline]
    pub fn count_scatter(&self) {
        self.scatter.set(self.scatter.get() + 1);
    }

    #[inline]
    pub fn count_shadow(&self) {
        self.shadow.set(self.shadow.get() + 1);
    }

    #[inline]
    pub fn count_dummy(&self) {
        self.dummy.set(self.dummy.get() + 1);
    }

    pub fn snapshot(&self) -> RayCounts {
        RayCounts {
            primary: self.primary.get(),
            scatter: self.scatter.get(),
            shadow: self.shadow.get(),
            dummy: self.dummy.get(),
        }
    }
}
