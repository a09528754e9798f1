use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Minimum spacing between seeks sent while scrubbing.
pub const SEEK_THROTTLE: Duration = Duration::from_millis(200);

/// Pointer may stray this far outside the bar while scrubbing.
const SCRUB_SLACK_PX: f32 = 10.0;

/// What the HUD needs to know about the current song.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackState {
    pub title: String,
    pub artists: Vec<String>,
    pub is_playing: bool,
    pub progress_secs: u32,
    pub duration_secs: u32,
}

impl PlaybackState {
    pub fn has_song(&self) -> bool {
        !self.title.is_empty()
    }
}

/// Playback services that can jump to a position.
pub trait Seekable: Send + Sync {
    fn seek(&self, position_secs: u32) -> anyhow::Result<()>;
}

/// Client of the music service. Seeking is an optional capability.
pub trait PlaybackService: Send + Sync {
    fn state(&self) -> Option<PlaybackState>;

    fn seeker(&self) -> Option<Arc<dyn Seekable>> {
        None
    }
}

/// Lets one call through per interval.
#[derive(Debug, Clone)]
pub struct SeekThrottle {
    min_interval: Duration,
    last_sent: Option<Instant>,
}

impl SeekThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_sent: None,
        }
    }

    /// Whether a call at `now` may go out. Records it if so.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        match self.last_sent {
            Some(last) if now.saturating_duration_since(last) < self.min_interval => false,
            _ => {
                self.last_sent = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_sent = None;
    }
}

impl Default for SeekThrottle {
    fn default() -> Self {
        Self::new(SEEK_THROTTLE)
    }
}

/// Maps pointer movement over the progress bar to song positions.
///
/// Every method returns the position that should be sent to the service, if
/// any. Positions during a drag pass through the throttle; the position on
/// release is always returned.
#[derive(Debug, Clone)]
pub struct ProgressScrubber {
    duration_secs: u32,
    scrubbing: bool,
    last_position: Option<u32>,
    throttle: SeekThrottle,
}

impl ProgressScrubber {
    pub fn new(throttle: Duration) -> Self {
        Self {
            duration_secs: 0,
            scrubbing: false,
            last_position: None,
            throttle: SeekThrottle::new(throttle),
        }
    }

    pub fn set_duration(&mut self, duration_secs: u32) {
        self.duration_secs = duration_secs;
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrubbing
    }

    /// Position shown on the bar while scrubbing.
    pub fn preview(&self) -> Option<u32> {
        self.last_position
    }

    fn position_at(&self, relative_x: f32, width: f32) -> Option<u32> {
        if self.duration_secs == 0 || width <= 0.0 || relative_x.is_nan() {
            return None;
        }
        let fraction = (relative_x / width).clamp(0.0, 1.0);
        let position = (fraction * self.duration_secs as f32) as u32;
        Some(position.min(self.duration_secs))
    }

    pub fn press(&mut self, relative_x: f32, width: f32, now: Instant) -> Option<u32> {
        let position = self.position_at(relative_x, width)?;
        self.scrubbing = true;
        self.throttle.reset();
        self.last_position = Some(position);
        self.throttle.try_acquire(now).then_some(position)
    }

    pub fn drag(&mut self, relative_x: f32, width: f32, now: Instant) -> Option<u32> {
        if !self.scrubbing {
            return None;
        }
        if relative_x < -SCRUB_SLACK_PX || relative_x > width + SCRUB_SLACK_PX {
            return None;
        }
        let position = self.position_at(relative_x.clamp(0.0, width.max(0.0)), width)?;
        self.last_position = Some(position);
        self.throttle.try_acquire(now).then_some(position)
    }

    pub fn release(&mut self) -> Option<u32> {
        if !self.scrubbing {
            return None;
        }
        self.scrubbing = false;
        self.last_position.take()
    }
}

impl Default for ProgressScrubber {
    fn default() -> Self {
        Self::new(SEEK_THROTTLE)
    }
}

/// Sends seeks from a background thread. Requests queued while a call is in
/// flight collapse to the newest one, so the last position always wins.
pub struct SeekDispatcher {
    tx: Option<Sender<u32>>,
    join: Option<JoinHandle<()>>,
}

impl SeekDispatcher {
    /// A dispatcher without a seekable service drops every request.
    pub fn new(seeker: Option<Arc<dyn Seekable>>) -> Self {
        let Some(seeker) = seeker else {
            return Self {
                tx: None,
                join: None,
            };
        };
        let (tx, rx) = mpsc::channel();
        let join = thread::Builder::new()
            .name("hud-seek".into())
            .spawn(move || seek_loop(seeker, rx));
        match join {
            Ok(join) => Self {
                tx: Some(tx),
                join: Some(join),
            },
            Err(err) => {
                tracing::error!(?err, "failed to spawn seek thread");
                Self {
                    tx: None,
                    join: None,
                }
            }
        }
    }

    pub fn is_supported(&self) -> bool {
        self.tx.is_some()
    }

    pub fn dispatch(&self, position_secs: u32) {
        if let Some(tx) = &self.tx {
            if tx.send(position_secs).is_err() {
                tracing::debug!("seek thread is gone");
            }
        }
    }
}

impl Drop for SeekDispatcher {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn seek_loop(seeker: Arc<dyn Seekable>, rx: Receiver<u32>) {
    while let Ok(mut position) = rx.recv() {
        while let Ok(newer) = rx.try_recv() {
            position = newer;
        }
        if let Err(err) = seeker.seek(position) {
            tracing::debug!(?err, position, "seek failed");
        }
    }
}
