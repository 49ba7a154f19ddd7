use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::time::Duration;

/// The audio playback clock the timeline follows.
///
/// The clock is owned and advanced outside the core. Readings must be
/// monotonically non-decreasing while playing.
pub trait ClockSource {
    /// Elapsed playback time in seconds.
    fn current_time(&self) -> f64;

    /// Total length in seconds, or `None` while the asset is still decoding.
    fn duration(&self) -> Option<f64>;

    fn is_playing(&self) -> bool;

    fn play(&mut self);

    /// Returns the one-shot end-of-playback notification.
    fn subscribe_ended(&mut self) -> EndedSignal;

    /// Cooperative loops forward their virtual wall time here. Clocks backed by
    /// a real audio device ignore it.
    fn on_wall_time(&mut self, _now: Duration) {}
}

/// Sending half of the end-of-playback notification, held by a clock.
#[derive(Debug, Default)]
pub struct EndedNotifier {
    sender: Option<SyncSender<()>>,
    fired: bool,
}

impl EndedNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the receiving half. Subscribing after the notification fired
    /// yields a signal that is already ended.
    pub fn subscribe(&mut self) -> EndedSignal {
        let (sender, receiver) = mpsc::sync_channel(1);
        if self.fired {
            let _ = sender.try_send(());
        } else {
            self.sender = Some(sender);
        }
        EndedSignal {
            receiver,
            ended: false,
        }
    }

    /// Fires the notification. Returns `false` if it had already fired.
    pub fn notify(&mut self) -> bool {
        if self.fired {
            return false;
        }
        self.fired = true;
        if let Some(sender) = self.sender.take() {
            let _ = sender.try_send(());
        }
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

/// Receiving half of the end-of-playback notification.
#[derive(Debug)]
pub struct EndedSignal {
    receiver: Receiver<()>,
    ended: bool,
}

impl EndedSignal {
    /// Drains the channel and reports whether playback has ended. Latches once
    /// the notification arrived.
    pub fn has_ended(&mut self) -> bool {
        if !self.ended {
            match self.receiver.try_recv() {
                Ok(()) => self.ended = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
            }
        }
        self.ended
    }
}

/// Simulated playback clock advanced by wall time while playing.
#[derive(Debug)]
pub struct PlaybackClock {
    time_seconds: f64,
    length_seconds: f64,
    duration_known: bool,
    playing: bool,
    last_wall: Option<Duration>,
    ended: EndedNotifier,
}

impl PlaybackClock {
    /// A clock whose duration is reported up front.
    pub fn new(length_seconds: f64) -> Self {
        Self {
            time_seconds: 0.0,
            length_seconds: length_seconds.max(0.0),
            duration_known: true,
            playing: false,
            last_wall: None,
            ended: EndedNotifier::new(),
        }
    }

    /// A clock that still plays for `length_seconds` but reports no duration,
    /// like an audio buffer that has not finished decoding.
    pub fn undecoded(length_seconds: f64) -> Self {
        Self {
            duration_known: false,
            ..Self::new(length_seconds)
        }
    }

    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
        self.last_wall = None;
    }

    pub fn advance(&mut self, delta: f64) {
        if !self.playing {
            return;
        }

        self.time_seconds = (self.time_seconds + delta).max(0.0);
        if self.time_seconds >= self.length_seconds {
            self.time_seconds = self.length_seconds;
            self.playing = false;
            if self.ended.notify() {
                tracing::debug!(time = self.time_seconds, "playback ended");
            }
        }
    }
}

impl ClockSource for PlaybackClock {
    fn current_time(&self) -> f64 {
        self.time_seconds
    }

    fn duration(&self) -> Option<f64> {
        self.duration_known.then_some(self.length_seconds)
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn play(&mut self) {
        if self.ended.has_fired() {
            return;
        }
        self.playing = true;
        self.last_wall = None;
    }

    fn subscribe_ended(&mut self) -> EndedSignal {
        self.ended.subscribe()
    }

    fn on_wall_time(&mut self, now: Duration) {
        if let Some(last) = self.last_wall {
            self.advance(now.saturating_sub(last).as_secs_f64());
        }
        if self.playing {
            self.last_wall = Some(now);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::{Cell, RefCell};

    use super::*;

    /// Advances by a fixed step every time it is read, independent of wall
    /// time. Ends once a reading reaches `end_time`.
    #[derive(Debug)]
    pub(crate) struct StepClock {
        time: Cell<f64>,
        step: f64,
        end_time: f64,
        duration: Option<f64>,
        playing: Cell<bool>,
        reads: Cell<usize>,
        ended: RefCell<EndedNotifier>,
    }

    impl StepClock {
        pub(crate) fn new(step: f64, end_time: f64, duration: Option<f64>) -> Self {
            Self {
                time: Cell::new(0.0),
                step,
                end_time,
                duration,
                playing: Cell::new(false),
                reads: Cell::new(0),
                ended: RefCell::new(EndedNotifier::new()),
            }
        }

        pub(crate) fn reads(&self) -> usize {
            self.reads.get()
        }
    }

    impl ClockSource for StepClock {
        fn current_time(&self) -> f64 {
            self.reads.set(self.reads.get() + 1);
            let now = self.time.get();
            if now >= self.end_time {
                self.playing.set(false);
                self.ended.borrow_mut().notify();
            } else {
                self.time.set(now + self.step);
            }
            now
        }

        fn duration(&self) -> Option<f64> {
            self.duration
        }

        fn is_playing(&self) -> bool {
            self.playing.get()
        }

        fn play(&mut self) {
            self.playing.set(true);
        }

        fn subscribe_ended(&mut self) -> EndedSignal {
            self.ended.borrow_mut().subscribe()
        }
    }
}
