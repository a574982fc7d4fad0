use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::host::{AttributeValue, RecordId};

/// Last observed caption value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptionState {
    pub value: Option<String>,
    pub loading: bool,
}

impl From<AttributeValue<String>> for CaptionState {
    fn from(value: AttributeValue<String>) -> Self {
        Self {
            loading: value.is_loading(),
            value: value.value,
        }
    }
}

/// Re-checks one caption on a fixed interval until it stops loading.
///
/// The first `poll` checks immediately; later polls check once the interval
/// has elapsed. The poller stops itself when a check reports a non-loading
/// status, or when cancelled.
#[derive(Clone, Debug)]
pub struct CaptionPoller {
    interval: Duration,
    next_check: Option<Instant>,
    active: bool,
    state: CaptionState,
}

impl CaptionPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_check: None,
            active: true,
            state: CaptionState {
                value: None,
                loading: true,
            },
        }
    }

    pub const fn is_active(&self) -> bool {
        self.active
    }

    pub const fn state(&self) -> &CaptionState {
        &self.state
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.active && self.next_check.is_none_or(|at| now >= at)
    }

    /// Checks the caption if due; returns `true` when the observed state changed.
    pub fn poll<F>(&mut self, now: Instant, fetch: F) -> bool
    where
        F: FnOnce() -> AttributeValue<String>,
    {
        if !self.is_due(now) {
            return false;
        }
        let next = CaptionState::from(fetch());
        if !next.loading {
            self.active = false;
        }
        self.next_check = Some(now + self.interval);
        let changed = next != self.state;
        self.state = next;
        changed
    }

    pub const fn cancel(&mut self) {
        self.active = false;
    }
}

/// Caption pollers for the records currently on screen.
#[derive(Debug, Default)]
pub struct CaptionWatch {
    interval: Duration,
    pollers: FxHashMap<RecordId, CaptionPoller>,
}

impl CaptionWatch {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pollers: FxHashMap::default(),
        }
    }

    /// Starts polling `id` unless it is already watched.
    pub fn watch(&mut self, id: RecordId) {
        let interval = self.interval;
        self.pollers
            .entry(id)
            .or_insert_with(|| CaptionPoller::new(interval));
    }

    pub fn is_watching(&self, id: RecordId) -> bool {
        self.pollers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.pollers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pollers.is_empty()
    }

    /// Polls every due caption; `fetch` returns `None` for records that no
    /// longer exist, which cancels their poller. Returns `true` if any caption
    /// changed.
    pub fn tick<F>(&mut self, now: Instant, mut fetch: F) -> bool
    where
        F: FnMut(RecordId) -> Option<AttributeValue<String>>,
    {
        let mut changed = false;
        for (id, poller) in &mut self.pollers {
            if !poller.is_due(now) {
                continue;
            }
            match fetch(*id) {
                Some(value) => changed |= poller.poll(now, || value),
                None => poller.cancel(),
            }
        }
        let before = self.pollers.len();
        self.pollers.retain(|_, poller| poller.is_active());
        tracing::trace!(finished = before - self.pollers.len(), "caption tick");
        changed
    }

    /// Cancels every poller.
    pub fn clear(&mut self) {
        self.pollers.clear();
    }
}
