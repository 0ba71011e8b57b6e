//! Heartbeat and idle timeout deadlines
//!
//! Both are driven by [`ConnectionEngine::tick`](super::ConnectionEngine::tick)
//! instead of timers so the engine never waits on its own.

use std::time::{Duration, Instant};

/// Emits an empty frame whenever nothing was written for a period
#[derive(Debug)]
pub(crate) struct HeartBeat {
    period: Option<Duration>,
    last_write: Option<Instant>,
    written: bool,
}

impl HeartBeat {
    /// A [`HeartBeat`] that never fires
    pub fn never() -> Self {
        Self {
            period: None,
            last_write: None,
            written: false,
        }
    }

    /// A [`HeartBeat`] that fires after `period` of silence
    pub fn new(period: Duration) -> Self {
        Self {
            period: Some(period),
            last_write: None,
            written: false,
        }
    }

    pub fn on_frame_written(&mut self) {
        self.written = true;
    }

    /// Returns whether an empty frame is due, and the next deadline
    pub fn tick(&mut self, now: Instant) -> (bool, Option<Instant>) {
        let period = match self.period {
            Some(period) => period,
            None => return (false, None),
        };

        if self.written || self.last_write.is_none() {
            self.written = false;
            self.last_write = Some(now);
        }

        let deadline = self.last_write.map(|last| last + period).unwrap_or(now + period);
        if now >= deadline {
            self.last_write = Some(now);
            (true, Some(now + period))
        } else {
            (false, Some(deadline))
        }
    }
}

/// Fails the connection when the peer stays silent for too long
#[derive(Debug)]
pub(crate) struct IdleTimeout {
    timeout: Option<Duration>,
    last_read: Option<Instant>,
    received: bool,
}

impl IdleTimeout {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout: timeout.filter(|t| !t.is_zero()),
            last_read: None,
            received: false,
        }
    }

    pub fn on_frame_received(&mut self) {
        self.received = true;
    }

    /// Returns `Err(())` once the timeout expired, otherwise the next deadline
    pub fn tick(&mut self, now: Instant) -> Result<Option<Instant>, ()> {
        let timeout = match self.timeout {
            Some(timeout) => timeout,
            None => return Ok(None),
        };

        if self.received || self.last_read.is_none() {
            self.received = false;
            self.last_read = Some(now);
        }

        let deadline = self.last_read.map(|last| last + timeout).unwrap_or(now + timeout);
        match now >= deadline {
            true => Err(()),
            false => Ok(Some(deadline)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::{HeartBeat, IdleTimeout};

    #[test]
    fn heartbeat_fires_after_silence() {
        let start = Instant::now();
        let period = Duration::from_millis(500);
        let mut heartbeat = HeartBeat::new(period);

        assert_eq!(heartbeat.tick(start), (false, Some(start + period)));
        assert_eq!(
            heartbeat.tick(start + Duration::from_millis(200)),
            (false, Some(start + period))
        );

        let later = start + Duration::from_millis(600);
        assert_eq!(heartbeat.tick(later), (true, Some(later + period)));
    }

    #[test]
    fn writes_push_the_heartbeat_back() {
        let start = Instant::now();
        let period = Duration::from_millis(500);
        let mut heartbeat = HeartBeat::new(period);
        heartbeat.tick(start);

        let written_at = start + Duration::from_millis(400);
        heartbeat.on_frame_written();
        assert_eq!(heartbeat.tick(written_at), (false, Some(written_at + period)));
    }

    #[test]
    fn never_fires() {
        assert_eq!(HeartBeat::never().tick(Instant::now()), (false, None));
        assert_eq!(IdleTimeout::new(None).tick(Instant::now()), Ok(None));
    }

    #[test]
    fn idle_timeout_expires_without_input() {
        let start = Instant::now();
        let mut idle = IdleTimeout::new(Some(Duration::from_secs(1)));
        assert!(idle.tick(start).is_ok());
        idle.on_frame_received();
        assert!(idle.tick(start + Duration::from_millis(900)).is_ok());
        assert!(idle.tick(start + Duration::from_millis(1950)).is_err());
    }
}
