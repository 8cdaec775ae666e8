// ── Event reconciliation ──
//
// Turns repeated, overlapping reads of the station's event log into a
// clean ON/OFF edge stream per event reason. Pure state machine: no I/O,
// no clock except the one passed in, so every rule is unit-testable.

use std::collections::BTreeMap;

use ssbridge_api::EventRecord;

use crate::thing::State;

/// Seconds subtracted from the server clock for the next `fromTime`.
///
/// Covers clock skew and events the station commits late.
pub const DEFAULT_OVERLAP_SECS: i64 = 30;

/// Why the station recorded an event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::AsRefStr, strum::EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum EventReason {
    Continuous,
    Motion,
    Alarm,
    Custom,
    Manual,
    External,
    Analytics,
    Edge,
    ActionRule,
}

impl EventReason {
    /// Wire code in `Event.List`.
    pub fn code(self) -> u8 {
        match self {
            Self::Continuous => 1,
            Self::Motion => 2,
            Self::Alarm => 3,
            Self::Custom => 4,
            Self::Manual => 5,
            Self::External => 6,
            Self::Analytics => 7,
            Self::Edge => 8,
            Self::ActionRule => 9,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => Self::Continuous,
            2 => Self::Motion,
            3 => Self::Alarm,
            4 => Self::Custom,
            5 => Self::Manual,
            6 => Self::External,
            7 => Self::Analytics,
            8 => Self::Edge,
            9 => Self::ActionRule,
            _ => return None,
        })
    }

    /// The switch channel that mirrors this reason.
    pub fn channel(self) -> &'static str {
        match self {
            Self::Continuous => "event-continuous",
            Self::Motion => "event-motion",
            Self::Alarm => "event-alarm",
            Self::Custom => "event-custom",
            Self::Manual => "event-manual",
            Self::External => "event-external",
            Self::Analytics => "event-analytics",
            Self::Edge => "event-edge",
            Self::ActionRule => "event-action-rule",
        }
    }
}

/// Last occurrence seen for one camera and reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventState {
    /// `-1` before the first occurrence.
    pub event_id: i64,
    pub completed: bool,
    /// Start of the occurrence, epoch seconds.
    pub started_at: i64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            event_id: -1,
            completed: true,
            started_at: 0,
        }
    }
}

/// One event occurrence, reduced to what reconciliation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub camera_id: u32,
    pub reason: EventReason,
    pub event_id: i64,
    pub completed: bool,
    pub start_time: i64,
}

impl Occurrence {
    /// `None` for reason codes this crate does not know.
    pub fn from_record(record: &EventRecord) -> Option<Self> {
        Some(Self {
            camera_id: record.camera_id,
            reason: EventReason::from_code(record.reason)?,
            event_id: record.event_id,
            completed: record.is_complete,
            start_time: record.start_time,
        })
    }
}

/// A state change to publish on the reason's channel.
///
/// `camera_id` and `event_id` name the occurrence that caused the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emission {
    pub reason: EventReason,
    pub camera_id: u32,
    pub event_id: i64,
    pub active: bool,
}

impl Emission {
    pub fn state(&self) -> State {
        State::OnOff(self.active)
    }
}

type StateKey = (EventReason, u32);

/// Per-camera occurrence tracking plus the `fromTime` watermark.
///
/// Each `(reason, camera)` pair follows its own occurrence sequence. The
/// reason's channel is the OR across cameras: it turns ON when the first
/// camera opens an occurrence and OFF when none is left open.
#[derive(Debug, Clone)]
pub struct EventReconciler {
    states: BTreeMap<StateKey, EventState>,
    watermark: i64,
    overlap_secs: i64,
}

impl EventReconciler {
    pub fn new(initial_watermark: i64, overlap_secs: i64) -> Self {
        Self {
            states: BTreeMap::new(),
            watermark: initial_watermark,
            overlap_secs,
        }
    }

    /// Start from the local clock minus the overlap.
    pub fn starting_now() -> Self {
        Self::new(
            chrono::Utc::now().timestamp() - DEFAULT_OVERLAP_SECS,
            DEFAULT_OVERLAP_SECS,
        )
    }

    /// `fromTime` for the next query.
    pub fn watermark(&self) -> i64 {
        self.watermark
    }

    pub fn state(&self, camera_id: u32, reason: EventReason) -> EventState {
        self.states.get(&(reason, camera_id)).copied().unwrap_or_default()
    }

    /// Whether any camera has an open occurrence for `reason`.
    pub fn is_active(&self, reason: EventReason) -> bool {
        self.open_count(reason) > 0
    }

    fn open_count(&self, reason: EventReason) -> usize {
        self.states
            .range((reason, 0)..=(reason, u32::MAX))
            .filter(|(_, state)| !state.completed)
            .count()
    }

    /// Merge one query response into the stored state.
    ///
    /// `observed` are the reasons the query asked for. An open occurrence
    /// of an observed reason that is missing from `occurrences` is treated
    /// as completed. Applying the same response twice emits nothing the
    /// second time.
    pub fn apply(
        &mut self,
        observed: &[EventReason],
        occurrences: &[Occurrence],
        server_timestamp: i64,
    ) -> Vec<Emission> {
        let mut emissions = Vec::new();

        for &reason in observed {
            let mut seen: Vec<&Occurrence> = occurrences.iter().filter(|o| o.reason == reason).collect();
            // Ids are monotonic station-wide, so id order is start order.
            seen.sort_by_key(|o| o.event_id);

            let mut channel = ChannelEdges {
                reason,
                open: self.open_count(reason),
                emissions: &mut emissions,
            };

            for occurrence in &seen {
                let state = self.states.entry((reason, occurrence.camera_id)).or_default();
                reconcile_one(state, occurrence, &mut channel);
            }

            for (&(_, camera_id), state) in self.states.range_mut((reason, 0)..=(reason, u32::MAX)) {
                let still_listed = seen
                    .iter()
                    .any(|o| o.camera_id == camera_id && o.event_id == state.event_id);
                if !state.completed && !still_listed {
                    state.completed = true;
                    channel.close(camera_id, state.event_id);
                }
            }
        }

        self.advance_watermark(observed, server_timestamp);
        emissions
    }

    fn advance_watermark(&mut self, observed: &[EventReason], server_timestamp: i64) {
        let mut next = server_timestamp - self.overlap_secs;
        for &reason in observed {
            for state in self.states.range((reason, 0)..=(reason, u32::MAX)).map(|(_, s)| s) {
                // Keep open occurrences inside the window until they complete.
                if !state.completed && state.started_at > 0 {
                    next = next.min(state.started_at);
                }
            }
        }
        self.watermark = next;
    }
}

/// Folds per-camera open/close edges into the reason's channel edges.
struct ChannelEdges<'a> {
    reason: EventReason,
    /// Cameras with an open occurrence for `reason`.
    open: usize,
    emissions: &'a mut Vec<Emission>,
}

impl ChannelEdges<'_> {
    fn open(&mut self, camera_id: u32, event_id: i64) {
        self.open += 1;
        if self.open == 1 {
            self.push(camera_id, event_id, true);
        }
    }

    fn close(&mut self, camera_id: u32, event_id: i64) {
        self.open = self.open.saturating_sub(1);
        if self.open == 0 {
            self.push(camera_id, event_id, false);
        }
    }

    fn push(&mut self, camera_id: u32, event_id: i64, active: bool) {
        self.emissions.push(Emission {
            reason: self.reason,
            camera_id,
            event_id,
            active,
        });
    }
}

fn reconcile_one(state: &mut EventState, occurrence: &Occurrence, channel: &mut ChannelEdges<'_>) {
    let camera_id = occurrence.camera_id;

    if occurrence.event_id > state.event_id {
        if !state.completed {
            // Superseded before we saw it complete.
            channel.close(camera_id, state.event_id);
        }
        *state = EventState {
            event_id: occurrence.event_id,
            completed: occurrence.completed,
            started_at: occurrence.start_time,
        };
        channel.open(camera_id, occurrence.event_id);
        if occurrence.completed {
            channel.close(camera_id, occurrence.event_id);
        }
    } else if occurrence.event_id == state.event_id && occurrence.completed && !state.completed {
        state.completed = true;
        channel.close(camera_id, occurrence.event_id);
    }
    // Older ids are stale and ignored.
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    use super::*;
    use EventReason::{Alarm, Motion};

    const NOW: i64 = 1_700_000_000;
    const CAM: u32 = 1;

    fn occ(reason: EventReason, event_id: i64, completed: bool, start_time: i64) -> Occurrence {
        occ_on(CAM, reason, event_id, completed, start_time)
    }

    fn occ_on(camera_id: u32, reason: EventReason, event_id: i64, completed: bool, start_time: i64) -> Occurrence {
        Occurrence {
            camera_id,
            reason,
            event_id,
            completed,
            start_time,
        }
    }

    fn edge(camera_id: u32, reason: EventReason, event_id: i64, active: bool) -> Emission {
        Emission {
            reason,
            camera_id,
            event_id,
            active,
        }
    }

    fn on(reason: EventReason, event_id: i64) -> Emission {
        edge(CAM, reason, event_id, true)
    }

    fn off(reason: EventReason, event_id: i64) -> Emission {
        edge(CAM, reason, event_id, false)
    }

    #[test]
    fn reason_codes_round_trip_and_unknown_is_none() {
        for reason in EventReason::iter() {
            assert_eq!(EventReason::from_code(reason.code()), Some(reason));
        }
        assert_eq!(EventReason::from_code(0), None);
        assert_eq!(EventReason::from_code(42), None);
        assert_eq!(EventReason::ActionRule.channel(), "event-action-rule");
    }

    #[test]
    fn empty_state_defaults() {
        let r = EventReconciler::new(NOW - 30, 30);
        assert_eq!(
            r.state(CAM, Motion),
            EventState {
                event_id: -1,
                completed: true,
                started_at: 0
            }
        );
    }

    #[test]
    fn new_open_occurrence_emits_on_then_completion_emits_off() {
        let mut r = EventReconciler::new(NOW - 30, 30);

        let first = r.apply(&[Motion], &[occ(Motion, 7, false, NOW - 5)], NOW);
        assert_eq!(first, vec![on(Motion, 7)]);
        assert_eq!(r.state(CAM, Motion).event_id, 7);
        assert!(!r.state(CAM, Motion).completed);

        let second = r.apply(&[Motion], &[occ(Motion, 7, true, NOW - 5)], NOW + 3);
        assert_eq!(second, vec![off(Motion, 7)]);
        assert!(r.state(CAM, Motion).completed);
    }

    #[test]
    fn occurrence_complete_on_first_sight_emits_on_then_off() {
        let mut r = EventReconciler::new(NOW - 30, 30);
        let emitted = r.apply(&[Motion], &[occ(Motion, 7, true, NOW - 5)], NOW);
        assert_eq!(emitted, vec![on(Motion, 7), off(Motion, 7)]);
    }

    #[test]
    fn open_occurrence_missing_from_response_is_completed() {
        let mut r = EventReconciler::new(NOW - 30, 30);
        r.apply(&[Motion], &[occ(Motion, 7, false, NOW - 5)], NOW);

        let emitted = r.apply(&[Motion], &[], NOW + 3);
        assert_eq!(emitted, vec![off(Motion, 7)]);
        assert!(r.state(CAM, Motion).completed);
    }

    #[test]
    fn newer_occurrence_supersedes_open_one() {
        let mut r = EventReconciler::new(NOW - 30, 30);
        r.apply(&[Motion], &[occ(Motion, 7, false, NOW - 5)], NOW);

        let emitted = r.apply(
            &[Motion],
            &[occ(Motion, 7, false, NOW - 5), occ(Motion, 8, false, NOW + 1)],
            NOW + 3,
        );
        assert_eq!(emitted, vec![off(Motion, 7), on(Motion, 8)]);
    }

    #[test]
    fn occurrences_are_processed_in_id_order() {
        let mut r = EventReconciler::new(NOW - 30, 30);
        let emitted = r.apply(
            &[Motion],
            &[occ(Motion, 9, false, NOW - 1), occ(Motion, 8, true, NOW - 10)],
            NOW,
        );
        assert_eq!(emitted, vec![on(Motion, 8), off(Motion, 8), on(Motion, 9)]);
    }

    #[test]
    fn stale_ids_are_ignored() {
        let mut r = EventReconciler::new(NOW - 30, 30);
        r.apply(&[Motion], &[occ(Motion, 9, true, NOW - 5)], NOW);

        let emitted = r.apply(&[Motion], &[occ(Motion, 4, false, NOW - 60)], NOW + 3);
        assert!(emitted.is_empty());
        assert_eq!(r.state(CAM, Motion).event_id, 9);
    }

    #[test]
    fn applying_the_same_response_twice_is_idempotent() {
        let mut r = EventReconciler::new(NOW - 30, 30);
        let response = [occ(Motion, 7, false, NOW - 5), occ(Alarm, 3, true, NOW - 8)];

        let first = r.apply(&[Motion, Alarm], &response, NOW);
        assert_eq!(first.len(), 3);
        let second = r.apply(&[Motion, Alarm], &response, NOW);
        assert!(second.is_empty());
    }

    #[test]
    fn reasons_are_independent() {
        let mut r = EventReconciler::new(NOW - 30, 30);
        let emitted = r.apply(
            &[Motion, Alarm],
            &[occ(Alarm, 2, false, NOW - 1), occ(Motion, 50, false, NOW - 2)],
            NOW,
        );
        assert_eq!(emitted, vec![on(Motion, 50), on(Alarm, 2)]);

        let emitted = r.apply(&[Motion, Alarm], &[occ(Motion, 50, false, NOW - 2)], NOW + 3);
        assert_eq!(emitted, vec![off(Alarm, 2)]);
        assert!(!r.state(CAM, Motion).completed);
    }

    #[test]
    fn unobserved_reasons_are_left_alone() {
        let mut r = EventReconciler::new(NOW - 30, 30);
        r.apply(&[Motion], &[occ(Motion, 7, false, NOW - 5)], NOW);

        // Motion no longer observed: its open occurrence is not closed.
        let emitted = r.apply(&[Alarm], &[], NOW + 3);
        assert!(emitted.is_empty());
        assert!(!r.state(CAM, Motion).completed);
    }

    #[test]
    fn watermark_is_server_time_minus_overlap() {
        let mut r = EventReconciler::new(NOW - 30, 30);
        r.apply(&[Motion], &[occ(Motion, 7, true, NOW - 5)], NOW + 100);
        assert_eq!(r.watermark(), NOW + 70);
    }

    #[test]
    fn watermark_never_passes_an_open_occurrence() {
        let mut r = EventReconciler::new(NOW - 30, 30);
        r.apply(&[Motion], &[occ(Motion, 7, false, NOW - 120)], NOW + 600);
        assert_eq!(r.watermark(), NOW - 120);

        r.apply(&[Motion], &[occ(Motion, 7, true, NOW - 120)], NOW + 603);
        assert_eq!(r.watermark(), NOW + 573);
    }

    #[test]
    fn starting_now_uses_local_clock() {
        let r = EventReconciler::starting_now();
        let expected = chrono::Utc::now().timestamp() - DEFAULT_OVERLAP_SECS;
        assert!((r.watermark() - expected).abs() <= 2);
    }

    #[test]
    fn from_record_carries_the_camera() {
        let record: EventRecord = serde_json::from_value(serde_json::json!({
            "eventId": 12, "cameraId": 4, "reason": 2, "is_complete": false, "startTime": NOW
        }))
        .unwrap();
        assert_eq!(
            Occurrence::from_record(&record),
            Some(occ_on(4, Motion, 12, false, NOW))
        );
    }

    // ── Several cameras ─────────────────────────────────────────────

    #[test]
    fn overlapping_cameras_keep_the_channel_on_until_the_last_completes() {
        let mut r = EventReconciler::new(NOW - 30, 30);

        let first = r.apply(
            &[Motion],
            &[occ_on(1, Motion, 7, false, NOW - 5), occ_on(2, Motion, 8, false, NOW - 2)],
            NOW,
        );
        assert_eq!(first, vec![edge(1, Motion, 7, true)]);

        // Camera 2 completes first; camera 1 is still open.
        let second = r.apply(
            &[Motion],
            &[occ_on(1, Motion, 7, false, NOW - 5), occ_on(2, Motion, 8, true, NOW - 2)],
            NOW + 3,
        );
        assert!(second.is_empty());
        assert!(r.is_active(Motion));
        assert!(!r.state(1, Motion).completed);
        assert!(r.state(2, Motion).completed);

        let third = r.apply(
            &[Motion],
            &[occ_on(1, Motion, 7, true, NOW - 5), occ_on(2, Motion, 8, true, NOW - 2)],
            NOW + 6,
        );
        assert_eq!(third, vec![edge(1, Motion, 7, false)]);
        assert!(!r.is_active(Motion));
    }

    #[test]
    fn higher_id_on_another_camera_does_not_supersede() {
        let mut r = EventReconciler::new(NOW - 30, 30);
        r.apply(&[Motion], &[occ_on(1, Motion, 7, false, NOW - 5)], NOW);

        let emitted = r.apply(
            &[Motion],
            &[occ_on(1, Motion, 7, false, NOW - 5), occ_on(2, Motion, 9, false, NOW - 1)],
            NOW + 3,
        );
        assert!(emitted.is_empty());
        assert_eq!(r.state(1, Motion).event_id, 7);
        assert!(!r.state(1, Motion).completed);
        assert_eq!(r.state(2, Motion).event_id, 9);
    }

    #[test]
    fn camera_dropping_out_of_the_response_closes_only_its_occurrence() {
        let mut r = EventReconciler::new(NOW - 30, 30);
        r.apply(
            &[Motion],
            &[occ_on(1, Motion, 7, false, NOW - 5), occ_on(2, Motion, 8, false, NOW - 2)],
            NOW,
        );

        let emitted = r.apply(&[Motion], &[occ_on(2, Motion, 8, false, NOW - 2)], NOW + 3);
        assert!(emitted.is_empty());
        assert!(r.state(1, Motion).completed);

        let emitted = r.apply(&[Motion], &[], NOW + 6);
        assert_eq!(emitted, vec![edge(2, Motion, 8, false)]);
    }

    #[test]
    fn watermark_holds_for_the_oldest_open_camera() {
        let mut r = EventReconciler::new(NOW - 30, 30);
        r.apply(
            &[Motion],
            &[occ_on(1, Motion, 7, false, NOW - 300), occ_on(2, Motion, 8, false, NOW - 100)],
            NOW,
        );
        assert_eq!(r.watermark(), NOW - 300);

        r.apply(
            &[Motion],
            &[occ_on(1, Motion, 7, true, NOW - 300), occ_on(2, Motion, 8, false, NOW - 100)],
            NOW + 3,
        );
        assert_eq!(r.watermark(), NOW - 100);
    }

    // ── Simulated event log ─────────────────────────────────────────

    /// Deterministic xorshift so the simulation needs no extra crates.
    struct Rng(u64);

    impl Rng {
        fn next(&mut self, bound: u64) -> i64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            i64::try_from(self.0 % bound).unwrap()
        }
    }

    struct Logged {
        camera_id: u32,
        reason: EventReason,
        event_id: i64,
        start: i64,
        end: i64,
    }

    /// Server side: returns what `Event.List` would for `from_time` at `now`.
    fn query(log: &[Logged], from_time: i64, now: i64) -> Vec<Occurrence> {
        log.iter()
            .filter(|e| e.start >= from_time && e.start <= now)
            .map(|e| occ_on(e.camera_id, e.reason, e.event_id, e.end <= now, e.start))
            .collect()
    }

    /// Occurrences follow each other per camera and overlap across cameras.
    fn simulated_log(rng: &mut Rng, reasons: &[EventReason], cameras: &[u32]) -> Vec<Logged> {
        let mut log = Vec::new();
        for &reason in reasons {
            for &camera_id in cameras {
                let mut t = NOW + rng.next(20);
                for _ in 0..12 {
                    let duration = 1 + rng.next(40);
                    log.push(Logged {
                        camera_id,
                        reason,
                        event_id: 0,
                        start: t,
                        end: t + duration,
                    });
                    t += duration + rng.next(25);
                }
            }
        }
        // The station numbers events in start order.
        log.sort_by_key(|e| (e.start, e.camera_id));
        for (id, logged) in (1_i64..).zip(log.iter_mut()) {
            logged.event_id = id;
        }
        log
    }

    #[test]
    fn simulated_logs_track_whether_any_camera_is_active() {
        for seed in 1..=40_u64 {
            let mut rng = Rng(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15));
            let reasons = [Motion, Alarm];
            let log = simulated_log(&mut rng, &reasons, &[1, 2, 3]);

            let mut r = EventReconciler::new(NOW - 30, 30);
            let mut emitted = Vec::new();
            let mut now = NOW;
            while now < NOW + 1_500 {
                now += 1 + rng.next(8);
                let response = query(&log, r.watermark(), now);
                emitted.extend(r.apply(&reasons, &response, now));

                for reason in reasons {
                    let expected = log
                        .iter()
                        .any(|l| l.reason == reason && l.start <= now && l.end > now);
                    assert_eq!(r.is_active(reason), expected, "seed {seed} {reason} at {now}");
                }
            }

            for reason in reasons {
                let edges: Vec<&Emission> = emitted.iter().filter(|e| e.reason == reason).collect();
                assert!(!edges.is_empty(), "seed {seed} {reason}");
                // Strict alternation per channel, starting with ON.
                for (i, edge) in edges.iter().enumerate() {
                    assert_eq!(edge.active, i % 2 == 0, "seed {seed} {reason} edge {i}");
                }
            }
        }
    }
}
