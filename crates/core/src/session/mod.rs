use std::time::Duration;

use serde::Serialize;

use crate::{
    clock::{ClockSource, EndedSignal},
    config::AppConfig,
    motion::{MotionDriver, MotionState},
    render::{LoopControl, RenderLoop, SceneSink},
    schedule::{cadence_is_safe, EventId, EventScheduler, FiringPolicy},
    timeline::{shared_progress, ProgressMapper, ProgressReader, ProgressWriter},
    Result,
};

/// Which of the two cooperative activities a [`Session::step`] ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Poll,
    Redraw,
}

/// Summary of a finished (or idle) session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub poll_ticks: u64,
    pub frames: u64,
    pub fired: Vec<EventId>,
    pub pending: Vec<EventId>,
    pub final_progress: f64,
    pub elapsed: Duration,
    pub render_stopped: bool,
}

/// One playback: a poll loop and a redraw loop sharing a single progress
/// value, run cooperatively on one thread in virtual time.
///
/// The poll loop is the only writer of progress. It is cancelled as soon as
/// the clock's ended signal arrives. The redraw loop stops itself past the
/// configured stop threshold.
pub struct Session<C: ClockSource, S: SceneSink> {
    clock: C,
    ended: EndedSignal,
    mapper: ProgressMapper,
    writer: ProgressWriter,
    reader: ProgressReader,
    scheduler: EventScheduler<S>,
    motion: MotionDriver,
    render: RenderLoop,
    scene: S,
    poll_interval: Duration,
    frame_interval: Duration,
    stop_threshold: f64,
    now: Duration,
    next_poll: Option<Duration>,
    next_frame: Option<Duration>,
    poll_ticks: u64,
    started: bool,
}

impl<C: ClockSource, S: SceneSink> Session<C, S> {
    pub fn new(
        config: &AppConfig,
        mut clock: C,
        scene: S,
        scheduler: EventScheduler<S>,
    ) -> Result<Self> {
        config.validate()?;
        let curve = config.build_curve()?;
        let (writer, reader) = shared_progress();
        let ended = clock.subscribe_ended();
        let mapper = ProgressMapper::new(config.timeline.fallback_duration);
        let poll_interval = config.timeline.poll_interval();
        let frame_interval = config.render.frame_interval()?;

        if scheduler.policy() == FiringPolicy::RoundedEquality {
            let duration = clock.duration().unwrap_or(mapper.fallback_duration());
            if !cadence_is_safe(poll_interval, duration, 1.0) {
                tracing::warn!(
                    ?poll_interval,
                    duration,
                    "poll cadence can step over 0.1% thresholds; events may be missed"
                );
            }
        }

        Ok(Self {
            clock,
            ended,
            mapper,
            writer,
            reader,
            scheduler,
            motion: MotionDriver::new(curve, config.motion.clone()),
            render: RenderLoop::new(config.render.stop_threshold),
            scene,
            poll_interval,
            frame_interval,
            stop_threshold: config.render.stop_threshold,
            now: Duration::ZERO,
            next_poll: None,
            next_frame: None,
            poll_ticks: 0,
            started: false,
        })
    }

    /// Starts playback and arms both loops. Called implicitly by the first
    /// [`Session::step`].
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        if !self.clock.is_playing() {
            self.clock.play();
        }
        self.clock.on_wall_time(self.now);
        self.next_poll = Some(self.now + self.poll_interval);
        self.next_frame = Some(self.now + self.frame_interval);
        tracing::info!(
            poll_interval = ?self.poll_interval,
            frame_interval = ?self.frame_interval,
            events = self.scheduler.events().len(),
            "session started"
        );
    }

    /// Runs the earliest due activity. Returns `None` once neither loop has
    /// anything scheduled.
    pub fn step(&mut self) -> Result<Option<Activity>> {
        self.start();

        loop {
            self.observe_end();

            let activity = match (self.next_poll, self.next_frame) {
                (None, None) => return Ok(None),
                (Some(poll), Some(frame)) if poll <= frame => Activity::Poll,
                (Some(_), None) => Activity::Poll,
                (_, Some(_)) => Activity::Redraw,
            };

            match activity {
                Activity::Poll => {
                    let Some(at) = self.next_poll else { continue };
                    self.advance_to(at);
                    if self.observe_end() {
                        continue;
                    }
                    self.poll_tick();
                    self.next_poll = Some(at + self.poll_interval);
                }
                Activity::Redraw => {
                    let Some(at) = self.next_frame else { continue };
                    self.advance_to(at);
                    let control = self
                        .render
                        .frame(self.reader.get(), &mut self.motion, &mut self.scene)?;
                    self.next_frame = match control {
                        LoopControl::Continue => Some(at + self.frame_interval),
                        LoopControl::Stop => None,
                    };
                }
            }

            return Ok(Some(activity));
        }
    }

    /// Steps until both loops are done. If playback ends before progress
    /// reaches the stop threshold nothing can move progress any more, so the
    /// session returns with the render loop left idle.
    pub fn run(&mut self) -> Result<SessionReport> {
        self.run_paced(|_| {})
    }

    /// Like [`Session::run`], calling `pace` with the virtual deadline of each
    /// activity before it runs, e.g. to sleep until wall time catches up.
    pub fn run_paced<F: FnMut(Duration)>(&mut self, mut pace: F) -> Result<SessionReport> {
        self.start();
        while let Some(deadline) = self.next_deadline() {
            pace(deadline);
            if self.step()?.is_none() {
                break;
            }
            if self.next_poll.is_none() && self.next_frame.is_some() {
                let progress = self.reader.get();
                if progress < self.stop_threshold {
                    tracing::warn!(
                        progress,
                        stop_threshold = self.stop_threshold,
                        "playback ended before the render loop's stop threshold"
                    );
                    break;
                }
            }
        }

        Ok(self.report())
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            poll_ticks: self.poll_ticks,
            frames: self.render.frames(),
            fired: self.scheduler.fired(),
            pending: self.scheduler.pending(),
            final_progress: self.reader.get(),
            elapsed: self.now,
            render_stopped: self.render.is_stopped(),
        }
    }

    /// Virtual time of the next scheduled activity.
    pub fn next_deadline(&self) -> Option<Duration> {
        match (self.next_poll, self.next_frame) {
            (Some(poll), Some(frame)) => Some(poll.min(frame)),
            (poll, frame) => poll.or(frame),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn progress(&self) -> f64 {
        self.reader.get()
    }

    pub fn progress_reader(&self) -> ProgressReader {
        self.reader.clone()
    }

    pub fn poll_ticks(&self) -> u64 {
        self.poll_ticks
    }

    pub fn is_polling(&self) -> bool {
        self.next_poll.is_some()
    }

    pub fn is_rendering(&self) -> bool {
        self.next_frame.is_some()
    }

    pub fn motion_state(&self) -> MotionState {
        self.motion.state()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scheduler(&self) -> &EventScheduler<S> {
        &self.scheduler
    }

    fn advance_to(&mut self, at: Duration) {
        self.now = self.now.max(at);
        self.clock.on_wall_time(self.now);
    }

    /// Cancels the poll loop on the first ended notification. Returns whether
    /// it was cancelled by this call.
    fn observe_end(&mut self) -> bool {
        if self.next_poll.is_none() || !self.ended.has_ended() {
            return false;
        }

        self.next_poll = None;
        let pending = self.scheduler.pending();
        tracing::info!(
            ticks = self.poll_ticks,
            progress = self.reader.get(),
            "playback ended, poll loop cancelled"
        );
        if !pending.is_empty() {
            tracing::info!(?pending, "events left unfired");
        }
        true
    }

    fn poll_tick(&mut self) {
        let current = self.clock.current_time();
        let progress = self.mapper.update(current, self.clock.duration());
        self.writer.set(progress);
        self.poll_ticks += 1;

        let report = self.scheduler.poll(self.reader.get(), &mut self.scene);
        tracing::trace!(
            tick = self.poll_ticks,
            current,
            progress,
            ranges = report.ranges_run,
            "poll"
        );
    }
}
