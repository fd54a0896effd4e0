// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Replay scheduling for recorded performances.
//!
//! Each recorded note becomes a simulated press and release at its
//! original offsets. Events sit in a priority queue and fire when the
//! app clock passes them; cancellation drops the whole queue at once so
//! nothing can fire after a stop.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::debug;

use crate::recording::RecordedNote;

/// Idle is declared this long after the final release
pub const REPLAY_END_BUFFER_MS: u64 = 250;

/// A simulated input event produced by replay
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayEvent {
    /// Press a key. `duration_ms` is the note's full held time, known up
    /// front so the visual note can skip the growing phase.
    Press {
        key_id: usize,
        note: u8,
        velocity: u8,
        duration_ms: u64,
    },
    /// Release a key
    Release { key_id: usize, note: u8 },
}

/// A replay event waiting in the queue
#[derive(Debug, Clone)]
struct ScheduledEvent {
    /// Fire time in ms from replay start
    at_ms: u64,
    /// Insertion order, breaks ties at equal fire times
    seq: u64,
    /// The event to deliver
    event: ReplayEvent,
}

// For BinaryHeap - we want minimum time first, insertion order on ties
impl Eq for ScheduledEvent {}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.at_ms == other.at_ms && self.seq == other.seq
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior
        other
            .at_ms
            .cmp(&self.at_ms)
            .then(other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Schedules and delivers replay events against the app clock.
///
/// The scheduler never reads the clock itself; the owner passes `now_ms`
/// into `poll` from its event loop.
pub struct ReplayScheduler {
    /// Pending events
    queue: BinaryHeap<ScheduledEvent>,
    /// App-clock ms at which replay started (None = idle)
    started_at_ms: Option<u64>,
    /// Replay length in ms from start, including the end buffer
    duration_ms: u64,
    /// Next insertion sequence number
    next_seq: u64,
}

impl ReplayScheduler {
    /// Create a new scheduler
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            started_at_ms: None,
            duration_ms: 0,
            next_seq: 0,
        }
    }

    /// Check if a replay is in progress
    pub fn is_active(&self) -> bool {
        self.started_at_ms.is_some()
    }

    /// Number of events still queued
    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    /// Replay length in ms, including the end buffer
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Time into the replay, in ms
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        match self.started_at_ms {
            Some(started) => now_ms.saturating_sub(started),
            None => 0,
        }
    }

    /// Start replaying `notes` at `now_ms`.
    ///
    /// Returns false without side effects if a replay is already active
    /// or there is nothing to play.
    pub fn start(&mut self, notes: &[RecordedNote], now_ms: u64) -> bool {
        if self.is_active() || notes.is_empty() {
            return false;
        }

        self.queue.clear();
        self.next_seq = 0;

        let mut last_release_ms = 0u64;
        for note in notes {
            self.push(
                note.start_ms,
                ReplayEvent::Press {
                    key_id: note.key_id,
                    note: note.note,
                    velocity: note.velocity,
                    duration_ms: note.duration_ms,
                },
            );
            self.push(
                note.end_ms(),
                ReplayEvent::Release {
                    key_id: note.key_id,
                    note: note.note,
                },
            );
            last_release_ms = last_release_ms.max(note.end_ms());
        }

        self.duration_ms = last_release_ms + REPLAY_END_BUFFER_MS;
        self.started_at_ms = Some(now_ms);
        debug!("Replay started: {} notes", notes.len());
        true
    }

    fn push(&mut self, at_ms: u64, event: ReplayEvent) {
        self.queue.push(ScheduledEvent {
            at_ms,
            seq: self.next_seq,
            event,
        });
        self.next_seq += 1;
    }

    /// Deliver all events due at `now_ms`.
    ///
    /// Once the end of the replay has passed and the queue is drained,
    /// the scheduler resets itself to idle.
    pub fn poll(&mut self, now_ms: u64) -> Vec<ReplayEvent> {
        let started = match self.started_at_ms {
            Some(started) => started,
            None => return Vec::new(),
        };

        let elapsed = now_ms.saturating_sub(started);
        let mut events = Vec::new();

        while let Some(next) = self.queue.peek() {
            if next.at_ms <= elapsed {
                if let Some(scheduled) = self.queue.pop() {
                    events.push(scheduled.event);
                }
            } else {
                break;
            }
        }

        if self.queue.is_empty() && elapsed >= self.duration_ms {
            self.started_at_ms = None;
            self.duration_ms = 0;
            debug!("Replay finished");
        }

        events
    }

    /// Cancel the replay, dropping every pending event. Idempotent.
    pub fn stop(&mut self) {
        if self.started_at_ms.take().is_some() {
            debug!("Replay stopped with {} events pending", self.queue.len());
        }
        self.queue.clear();
        self.duration_ms = 0;
    }
}

impl Default for ReplayScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_notes() -> Vec<RecordedNote> {
        vec![
            RecordedNote::new(0, 21, 100, 0, 200),
            RecordedNote::new(1, 23, 90, 500, 100),
        ]
    }

    #[test]
    fn test_scheduler_creation() {
        let scheduler = ReplayScheduler::new();
        assert!(!scheduler.is_active());
        assert_eq!(scheduler.pending_len(), 0);
    }

    #[test]
    fn test_start_empty_is_noop() {
        let mut scheduler = ReplayScheduler::new();
        assert!(!scheduler.start(&[], 0));
        assert!(!scheduler.is_active());
    }

    #[test]
    fn test_start_while_active_is_noop() {
        let mut scheduler = ReplayScheduler::new();
        assert!(scheduler.start(&two_notes(), 0));
        assert!(!scheduler.start(&two_notes(), 100));
        assert_eq!(scheduler.pending_len(), 4);
    }

    #[test]
    fn test_events_fire_at_recorded_offsets() {
        let mut scheduler = ReplayScheduler::new();
        scheduler.start(&two_notes(), 1000);

        // Replay runs on the app clock; offsets apply from start time
        let events = scheduler.poll(1000);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            ReplayEvent::Press {
                key_id: 0,
                note: 21,
                velocity: 100,
                duration_ms: 200
            }
        ));

        let events = scheduler.poll(1200);
        assert_eq!(events, vec![ReplayEvent::Release { key_id: 0, note: 21 }]);

        let events = scheduler.poll(1499);
        assert!(events.is_empty());

        let events = scheduler.poll(1500);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ReplayEvent::Press { key_id: 1, .. }));

        let events = scheduler.poll(1600);
        assert_eq!(events, vec![ReplayEvent::Release { key_id: 1, note: 23 }]);
    }

    #[test]
    fn test_idle_after_last_release_plus_buffer() {
        let mut scheduler = ReplayScheduler::new();
        scheduler.start(&two_notes(), 0);

        // Last release at 600
        assert_eq!(scheduler.duration_ms(), 600 + REPLAY_END_BUFFER_MS);

        scheduler.poll(600);
        assert!(scheduler.is_active());

        // Queue empty but buffer not yet elapsed
        scheduler.poll(700);
        assert!(scheduler.is_active());

        scheduler.poll(600 + REPLAY_END_BUFFER_MS);
        assert!(!scheduler.is_active());
    }

    #[test]
    fn test_late_poll_delivers_everything_in_order() {
        let mut scheduler = ReplayScheduler::new();
        scheduler.start(&two_notes(), 0);

        let events = scheduler.poll(10_000);
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], ReplayEvent::Press { key_id: 0, .. }));
        assert!(matches!(events[1], ReplayEvent::Release { key_id: 0, .. }));
        assert!(matches!(events[2], ReplayEvent::Press { key_id: 1, .. }));
        assert!(matches!(events[3], ReplayEvent::Release { key_id: 1, .. }));
        assert!(!scheduler.is_active());
    }

    #[test]
    fn test_same_time_events_keep_insertion_order() {
        let mut scheduler = ReplayScheduler::new();

        // First note ends exactly when the second starts
        let notes = vec![
            RecordedNote::new(0, 21, 100, 0, 500),
            RecordedNote::new(1, 23, 100, 500, 100),
        ];
        scheduler.start(&notes, 0);

        let events = scheduler.poll(500);
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ReplayEvent::Press { key_id: 0, .. }));
        assert!(matches!(events[1], ReplayEvent::Release { key_id: 0, .. }));
        assert!(matches!(events[2], ReplayEvent::Press { key_id: 1, .. }));
    }

    #[test]
    fn test_stop_cancels_all_pending() {
        let mut scheduler = ReplayScheduler::new();
        scheduler.start(&two_notes(), 0);
        scheduler.poll(0);

        scheduler.stop();
        assert!(!scheduler.is_active());
        assert_eq!(scheduler.pending_len(), 0);

        // Nothing fires after a stop
        assert!(scheduler.poll(10_000).is_empty());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut scheduler = ReplayScheduler::new();
        scheduler.stop();
        scheduler.start(&two_notes(), 0);
        scheduler.stop();
        scheduler.stop();
        assert!(!scheduler.is_active());
    }

    #[test]
    fn test_restart_after_finish() {
        let mut scheduler = ReplayScheduler::new();
        scheduler.start(&two_notes(), 0);
        scheduler.poll(10_000);
        assert!(!scheduler.is_active());

        assert!(scheduler.start(&two_notes(), 20_000));
        let events = scheduler.poll(20_000);
        assert!(matches!(events[0], ReplayEvent::Press { key_id: 0, .. }));
    }

    #[test]
    fn test_elapsed_ms() {
        let mut scheduler = ReplayScheduler::new();
        assert_eq!(scheduler.elapsed_ms(500), 0);

        scheduler.start(&two_notes(), 1000);
        assert_eq!(scheduler.elapsed_ms(1000), 0);
        assert_eq!(scheduler.elapsed_ms(1400), 400);
    }
}
