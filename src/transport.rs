use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

// -------------------------------------------------------------------------------------------------

/// Host transport state as published by the audio context.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackStatus {
    /// Wall-clock time the record was published at.
    pub published_at: Instant,
    /// Host beat position at `published_at`.
    pub initial_beat_position: f64,
    /// Playback seconds at `published_at`.
    pub initial_seconds_played: f64,
    /// Host tempo in beats per minute.
    pub tempo: f64,
    pub is_playing: bool,
}

impl Default for PlaybackStatus {
    fn default() -> Self {
        Self {
            published_at: Instant::now(),
            initial_beat_position: 0.0,
            initial_seconds_played: 0.0,
            tempo: 120.0,
            is_playing: false,
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Hands host transport time from the audio context to the edit context.
///
/// The audio side publishes a small fixed-size record once per buffer and never
/// blocks: on lock contention the publish is skipped and the next buffer retries.
/// The edit side extrapolates the current beat position from the last published
/// record and the elapsed wall-clock time, so it can animate phases between
/// publishes without touching the audio thread.
#[derive(Debug, Clone, Default)]
pub struct SharedTransport {
    status: Arc<Mutex<PlaybackStatus>>,
}

impl SharedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new transport record from the audio context. Never blocks: if the
    /// edit context holds the lock right now, this record is dropped.
    ///
    /// The record is plain data, so a poisoned lock is recovered instead of
    /// propagated: a panicking edit thread must not mute the transport.
    pub fn publish(&self, status: PlaybackStatus) {
        match self.status.try_lock() {
            Ok(mut guard) => *guard = status,
            Err(std::sync::TryLockError::Poisoned(err)) => *err.into_inner() = status,
            Err(std::sync::TryLockError::WouldBlock) => (),
        }
    }

    /// The last published transport record.
    pub fn status(&self) -> PlaybackStatus {
        *self
            .status
            .lock()
            .unwrap_or_else(|err| err.into_inner())
    }

    /// The extrapolated beat position at `now`. While stopped the last published
    /// position is held constant.
    pub fn beat_position(&self, now: Instant) -> f64 {
        let status = self.status();
        if status.is_playing {
            let elapsed = now.saturating_duration_since(status.published_at);
            status.initial_beat_position + elapsed.as_secs_f64() * status.tempo / 60.0
        } else {
            status.initial_beat_position
        }
    }

    /// The extrapolated playback seconds at `now`.
    pub fn seconds_played(&self, now: Instant) -> f64 {
        let status = self.status();
        if status.is_playing {
            let elapsed = now.saturating_duration_since(status.published_at);
            status.initial_seconds_played + elapsed.as_secs_f64()
        } else {
            status.initial_seconds_played
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_beat_position_while_playing() {
        let transport = SharedTransport::new();
        let start = Instant::now();
        transport.publish(PlaybackStatus {
            published_at: start,
            initial_beat_position: 8.0,
            initial_seconds_played: 4.0,
            tempo: 120.0,
            is_playing: true,
        });
        // 120 bpm is 2 beats per second.
        let now = start + Duration::from_secs(2);
        assert!((transport.beat_position(now) - 12.0).abs() < 1e-9);
        assert!((transport.seconds_played(now) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_poisoned_lock_recovers() {
        let transport = SharedTransport::new();
        let inner = transport.clone();
        // Poison the lock by panicking while holding it.
        let _ = std::thread::spawn(move || {
            let _guard = inner.status.lock().unwrap();
            panic!("poison the transport lock");
        })
        .join();

        // Reads and publishes keep working on the recovered record.
        let start = Instant::now();
        transport.publish(PlaybackStatus {
            published_at: start,
            initial_beat_position: 3.0,
            initial_seconds_played: 1.5,
            tempo: 120.0,
            is_playing: false,
        });
        assert_eq!(transport.status().initial_beat_position, 3.0);
        assert_eq!(transport.beat_position(start), 3.0);
    }

    #[test]
    fn test_position_held_while_stopped() {
        let transport = SharedTransport::new();
        let start = Instant::now();
        transport.publish(PlaybackStatus {
            published_at: start,
            initial_beat_position: 8.0,
            initial_seconds_played: 4.0,
            tempo: 120.0,
            is_playing: false,
        });
        let now = start + Duration::from_secs(60);
        assert_eq!(transport.beat_position(now), 8.0);
        assert_eq!(transport.seconds_played(now), 4.0);
    }
}
