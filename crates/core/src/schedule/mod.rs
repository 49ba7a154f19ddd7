use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{FlythroughError, Result};

/// Rounding granularity of progress, i.e. 0.1 percent.
pub const ROUNDING_UNIT: f64 = 0.001;
const TENTHS_PER_PERCENT: f64 = 10.0;
const GRID_TOLERANCE: f64 = 1e-6;

/// How a poll tick decides that a threshold has been reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiringPolicy {
    /// Fires when the previous tick was below the threshold and the current
    /// one is at or above it.
    #[default]
    Crossing,
    /// Fires when progress rounded to 0.1 percent equals the threshold. A
    /// threshold stepped over between two ticks never fires.
    RoundedEquality,
}

/// Name of a scripted event or range action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(String);

impl EventId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EventId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

pub type EventAction<Ctx> = Box<dyn FnMut(&mut Ctx)>;
pub type RangeCallback<Ctx> = Box<dyn FnMut(&mut Ctx, f64)>;

/// One-shot trigger. `fired` flips to true exactly once per session.
pub struct ScriptedEvent<Ctx> {
    id: EventId,
    threshold_percent: f64,
    threshold_tenths: i64,
    fired: bool,
    action: EventAction<Ctx>,
}

impl<Ctx> ScriptedEvent<Ctx> {
    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn is_fired(&self) -> bool {
        self.fired
    }
}

/// Action evaluated on every tick while progress lies in `(start, end]`.
pub struct RangeAction<Ctx> {
    id: EventId,
    start: f64,
    end: f64,
    action: RangeCallback<Ctx>,
}

impl<Ctx> RangeAction<Ctx> {
    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn contains(&self, progress: f64) -> bool {
        self.start < progress && progress <= self.end
    }
}

/// Outcome of a single poll tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollReport {
    pub fired: Vec<EventId>,
    pub ranges_run: usize,
}

/// Per-session table of scripted triggers.
///
/// The scheduler is generic over the context the actions mutate, usually the
/// scene. Fired-state lives in the instance, so a new session starts from a
/// new scheduler.
pub struct EventScheduler<Ctx> {
    policy: FiringPolicy,
    events: Vec<ScriptedEvent<Ctx>>,
    ranges: Vec<RangeAction<Ctx>>,
    last_tenths: Option<i64>,
    ticks: u64,
}

impl<Ctx> Default for EventScheduler<Ctx> {
    fn default() -> Self {
        Self::new(FiringPolicy::default())
    }
}

impl<Ctx> EventScheduler<Ctx> {
    pub fn new(policy: FiringPolicy) -> Self {
        Self {
            policy,
            events: Vec::new(),
            ranges: Vec::new(),
            last_tenths: None,
            ticks: 0,
        }
    }

    pub fn policy(&self) -> FiringPolicy {
        self.policy
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn events(&self) -> &[ScriptedEvent<Ctx>] {
        &self.events
    }

    /// Registers a one-shot event at `threshold_percent` (0.1 percent grid).
    pub fn add_event<F>(
        &mut self,
        id: impl Into<EventId>,
        threshold_percent: f64,
        action: F,
    ) -> Result<()>
    where
        F: FnMut(&mut Ctx) + 'static,
    {
        let id = id.into();
        self.ensure_unique(&id)?;

        let scaled = threshold_percent * TENTHS_PER_PERCENT;
        let on_grid = (scaled - scaled.round()).abs() <= GRID_TOLERANCE;
        if !threshold_percent.is_finite() || threshold_percent < 0.0 || !on_grid {
            return Err(FlythroughError::InvalidThreshold {
                id: id.to_string(),
                threshold: threshold_percent,
            });
        }

        self.events.push(ScriptedEvent {
            id,
            threshold_percent,
            threshold_tenths: scaled.round() as i64,
            fired: false,
            action: Box::new(action),
        });
        self.events.sort_by_key(|event| event.threshold_tenths);
        Ok(())
    }

    /// Registers a continuous action for progress in `(start, end]`.
    pub fn add_range<F>(
        &mut self,
        id: impl Into<EventId>,
        start: f64,
        end: f64,
        action: F,
    ) -> Result<()>
    where
        F: FnMut(&mut Ctx, f64) + 'static,
    {
        let id = id.into();
        self.ensure_unique(&id)?;
        if !start.is_finite() || !end.is_finite() || start >= end {
            return Err(FlythroughError::config(format!(
                "range `{id}` must satisfy start < end, got ({start}, {end}]"
            )));
        }

        self.ranges.push(RangeAction {
            id,
            start,
            end,
            action: Box::new(action),
        });
        Ok(())
    }

    /// Runs the action of `id` unless it already ran. Returns whether it ran.
    pub fn fire_once(&mut self, id: &str, ctx: &mut Ctx) -> Result<bool> {
        let index = self
            .events
            .iter()
            .position(|event| event.id.as_str() == id)
            .ok_or_else(|| FlythroughError::UnknownEvent(id.to_string()))?;
        Ok(self.fire_at(index, ctx))
    }

    /// Evaluates every trigger against the current progress. Both policies
    /// compare on the 0.1 percent grid, so `0.29` reaches a 29 percent event.
    pub fn poll(&mut self, progress: f64, ctx: &mut Ctx) -> PollReport {
        self.ticks += 1;
        let rounded_tenths = (progress * 100.0 * TENTHS_PER_PERCENT).round() as i64;
        let previous = self.last_tenths.replace(rounded_tenths).unwrap_or(i64::MIN);

        let mut report = PollReport::default();
        for index in 0..self.events.len() {
            let event = &self.events[index];
            if event.fired {
                continue;
            }

            let due = match self.policy {
                FiringPolicy::Crossing => {
                    previous < event.threshold_tenths && event.threshold_tenths <= rounded_tenths
                }
                FiringPolicy::RoundedEquality => event.threshold_tenths == rounded_tenths,
            };

            if due && self.fire_at(index, ctx) {
                report.fired.push(self.events[index].id.clone());
            }
        }

        for range in self.ranges.iter_mut().filter(|range| range.contains(progress)) {
            (range.action)(ctx, progress);
            report.ranges_run += 1;
        }

        if !report.fired.is_empty() {
            tracing::debug!(
                tick = self.ticks,
                progress,
                fired = ?report.fired,
                "poll fired events"
            );
        }
        report
    }

    pub fn is_fired(&self, id: &str) -> Option<bool> {
        self.events
            .iter()
            .find(|event| event.id.as_str() == id)
            .map(|event| event.fired)
    }

    /// Events that have not fired yet, in threshold order.
    pub fn pending(&self) -> Vec<EventId> {
        self.events
            .iter()
            .filter(|event| !event.fired)
            .map(|event| event.id.clone())
            .collect()
    }

    pub fn fired(&self) -> Vec<EventId> {
        self.events
            .iter()
            .filter(|event| event.fired)
            .map(|event| event.id.clone())
            .collect()
    }

    fn fire_at(&mut self, index: usize, ctx: &mut Ctx) -> bool {
        let event = &mut self.events[index];
        if event.fired {
            return false;
        }
        event.fired = true;
        tracing::info!(
            event = %event.id,
            threshold = event.threshold_percent,
            "scripted event fired"
        );
        (event.action)(ctx);
        true
    }

    fn ensure_unique(&self, id: &EventId) -> Result<()> {
        let taken = self.events.iter().any(|event| &event.id == id)
            || self.ranges.iter().any(|range| &range.id == id);
        if taken {
            Err(FlythroughError::DuplicateEvent(id.to_string()))
        } else {
            Ok(())
        }
    }
}

impl<Ctx> fmt::Debug for EventScheduler<Ctx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventScheduler")
            .field("policy", &self.policy)
            .field("events", &self.events.len())
            .field("pending", &self.pending())
            .field("ranges", &self.ranges.len())
            .field("ticks", &self.ticks)
            .finish()
    }
}

/// Largest progress change between two poll ticks. `clock_rate` is clock
/// seconds per wall second, 1.0 for normal playback.
pub fn max_progress_step(poll_interval: Duration, duration: f64, clock_rate: f64) -> f64 {
    if duration <= 0.0 || !duration.is_finite() {
        return f64::INFINITY;
    }
    poll_interval.as_secs_f64() * clock_rate / duration
}

/// Whether rounded-equality firing is guaranteed to visit every 0.1 percent
/// step at this cadence.
pub fn cadence_is_safe(poll_interval: Duration, duration: f64, clock_rate: f64) -> bool {
    max_progress_step(poll_interval, duration, clock_rate) < ROUNDING_UNIT
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<String>;

    fn logging(label: &'static str) -> impl FnMut(&mut Log) + 'static {
        move |log: &mut Log| log.push(label.to_string())
    }

    #[test]
    fn fires_once_when_progress_reaches_threshold() {
        for policy in [FiringPolicy::Crossing, FiringPolicy::RoundedEquality] {
            let mut scheduler = EventScheduler::new(policy);
            scheduler.add_event("halfway", 50.0, logging("halfway")).unwrap();
            let mut log = Log::new();

            let mut fired_at = Vec::new();
            for tick in 0..=20 {
                let progress = tick as f64 * 0.05;
                if !scheduler.poll(progress, &mut log).fired.is_empty() {
                    fired_at.push(tick);
                }
            }

            assert_eq!(log, vec!["halfway"], "{policy:?}");
            assert_eq!(fired_at, vec![10], "{policy:?}");
            assert_eq!(scheduler.is_fired("halfway"), Some(true));
        }
    }

    #[test]
    fn repeated_matching_ticks_fire_once() {
        let mut scheduler = EventScheduler::new(FiringPolicy::RoundedEquality);
        scheduler.add_event("text", 8.0, logging("text")).unwrap();
        let mut log = Log::new();

        for progress in [0.0795, 0.0799, 0.08, 0.0801, 0.0804, 0.09] {
            scheduler.poll(progress, &mut log);
        }

        assert_eq!(log.len(), 1);
        assert!(scheduler.pending().is_empty());
    }

    #[test]
    fn rounded_equality_misses_a_stepped_over_threshold() {
        let mut coarse = EventScheduler::new(FiringPolicy::RoundedEquality);
        coarse.add_event("skipped", 50.0, logging("skipped")).unwrap();
        let mut crossing = EventScheduler::new(FiringPolicy::Crossing);
        crossing.add_event("skipped", 50.0, logging("skipped")).unwrap();

        let mut coarse_log = Log::new();
        let mut crossing_log = Log::new();
        for progress in [0.497, 0.498, 0.503, 0.51] {
            coarse.poll(progress, &mut coarse_log);
            crossing.poll(progress, &mut crossing_log);
        }

        assert!(coarse_log.is_empty());
        assert_eq!(coarse.pending(), vec![EventId::from("skipped")]);
        assert_eq!(crossing_log, vec!["skipped"]);
    }

    #[test]
    fn crossing_fires_on_the_tick_that_reaches_each_whole_percent() {
        let mut scheduler = EventScheduler::new(FiringPolicy::Crossing);
        for percent in 1..=99 {
            scheduler
                .add_event(format!("at-{percent}"), percent as f64, |_: &mut Log| {})
                .unwrap();
        }
        let mut log = Log::new();

        let mut late = Vec::new();
        for time in 0..=100 {
            for id in scheduler.poll(time as f64 / 100.0, &mut log).fired {
                let percent: i64 = id.as_str().trim_start_matches("at-").parse().unwrap();
                if percent != time {
                    late.push((percent, time));
                }
            }
        }

        assert!(late.is_empty(), "threshold, fired at: {late:?}");
        assert!(scheduler.pending().is_empty());
    }

    #[test]
    fn crossing_catches_up_on_the_first_tick() {
        let mut scheduler = EventScheduler::new(FiringPolicy::Crossing);
        scheduler.add_event("intro", 8.0, logging("intro")).unwrap();
        scheduler.add_event("outro", 97.5, logging("outro")).unwrap();
        let mut log = Log::new();

        let report = scheduler.poll(0.2, &mut log);
        assert_eq!(report.fired, vec![EventId::from("intro")]);
        assert_eq!(scheduler.pending(), vec![EventId::from("outro")]);
    }

    #[test]
    fn range_actions_run_every_tick_inside_the_window() {
        let mut scheduler: EventScheduler<Vec<f64>> = EventScheduler::default();
        scheduler
            .add_range("drift", 0.90, 0.97, |seen: &mut Vec<f64>, p| seen.push(p))
            .unwrap();
        let mut seen = Vec::new();

        for progress in [0.85, 0.90, 0.91, 0.95, 0.97, 0.98] {
            scheduler.poll(progress, &mut seen);
        }

        assert_eq!(seen, vec![0.91, 0.95, 0.97]);
    }

    #[test]
    fn fire_once_is_idempotent() {
        let mut scheduler = EventScheduler::default();
        scheduler.add_event("sprite", 97.5, logging("sprite")).unwrap();
        let mut log = Log::new();

        assert!(scheduler.fire_once("sprite", &mut log).unwrap());
        assert!(!scheduler.fire_once("sprite", &mut log).unwrap());
        assert!(scheduler.poll(0.99, &mut log).fired.is_empty());
        assert_eq!(log.len(), 1);
        assert_eq!(scheduler.fired(), vec![EventId::from("sprite")]);

        let err = scheduler.fire_once("missing", &mut log).unwrap_err();
        assert!(matches!(err, FlythroughError::UnknownEvent(_)));
    }

    #[test]
    fn validates_the_table() {
        let mut scheduler: EventScheduler<Log> = EventScheduler::default();
        assert!(scheduler.add_event("a", 12.34, logging("a")).is_err());
        assert!(scheduler.add_event("b", -1.0, logging("b")).is_err());
        assert!(scheduler.add_event("c", f64::NAN, logging("c")).is_err());
        scheduler.add_event("d", 12.3, logging("d")).unwrap();

        let err = scheduler.add_event("d", 20.0, logging("d")).unwrap_err();
        assert!(matches!(err, FlythroughError::DuplicateEvent(_)));
        assert!(scheduler.add_range("d", 0.1, 0.2, |_: &mut Log, _| {}).is_err());
        assert!(scheduler.add_range("e", 0.3, 0.2, |_: &mut Log, _| {}).is_err());
    }

    #[test]
    fn events_are_kept_in_threshold_order() {
        let mut scheduler: EventScheduler<Log> = EventScheduler::default();
        scheduler.add_event("late", 90.0, logging("late")).unwrap();
        scheduler.add_event("early", 10.0, logging("early")).unwrap();

        let order: Vec<&str> = scheduler.events().iter().map(|e| e.id().as_str()).collect();
        assert_eq!(order, vec!["early", "late"]);
    }

    #[test]
    fn cadence_check_bounds_the_progress_step() {
        assert!(cadence_is_safe(Duration::from_millis(10), 100.0, 1.0));
        assert!(!cadence_is_safe(Duration::from_secs(1), 100.0, 1.0));
        assert!(!cadence_is_safe(Duration::from_millis(10), 0.0, 1.0));
        let step = max_progress_step(Duration::from_millis(10), 100.0, 1.0);
        assert!((step - 0.0001).abs() < 1e-12);
    }
}
