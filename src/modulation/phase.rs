// -------------------------------------------------------------------------------------------------

/// How a modulator's oscillation phase is derived from host time.
///
/// The discriminants are part of the serialized state format and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::FromRepr)]
#[repr(i32)]
pub enum LoopMode {
    /// Power-of-two cycles per bar, following the host's beat position.
    TempoSynced = 0,
    /// A fixed period in seconds, following wall-clock playback time.
    Seconds = 1,
}

// -------------------------------------------------------------------------------------------------

/// Maps host playback time to a normalized oscillation phase in [0, 1).
///
/// Both mode settings are retained when switching modes, so toggling back restores
/// the previous frequency.
#[derive(Debug, Clone)]
pub struct PhaseSource {
    mode: LoopMode,
    /// Tempo-synced speed is `2^exponent` cycles per bar.
    tempo_exponent: i8,
    /// Period in seconds for [`LoopMode::Seconds`].
    seconds_period: f64,
}

impl PhaseSource {
    /// Smallest tempo-synced exponent: one cycle per 64 bars.
    pub const MIN_TEMPO_EXPONENT: i8 = -6;
    /// Largest tempo-synced exponent: 64 cycles per bar.
    pub const MAX_TEMPO_EXPONENT: i8 = 6;

    /// Create a tempo-synced source at one cycle per bar.
    pub fn new() -> Self {
        Self {
            mode: LoopMode::TempoSynced,
            tempo_exponent: 0,
            seconds_period: 1.0,
        }
    }

    /// The active loop mode.
    pub fn mode(&self) -> LoopMode {
        self.mode
    }

    /// Switch the loop mode. The inactive mode's setting is kept.
    pub fn set_mode(&mut self, mode: LoopMode) {
        self.mode = mode;
    }

    /// Tempo-synced speed exponent.
    pub fn tempo_exponent(&self) -> i8 {
        self.tempo_exponent
    }

    /// Set the tempo-synced speed exponent, clamped to the valid range.
    pub fn set_tempo_exponent(&mut self, exponent: i8) {
        self.tempo_exponent = exponent.clamp(Self::MIN_TEMPO_EXPONENT, Self::MAX_TEMPO_EXPONENT);
    }

    /// Period of the seconds mode.
    pub fn seconds_period(&self) -> f64 {
        self.seconds_period
    }

    /// Set the seconds-mode period. Negative periods are treated as zero.
    pub fn set_seconds_period(&mut self, period: f64) {
        self.seconds_period = period.max(0.0);
    }

    /// The oscillation phase in [0, 1) for the given host time.
    ///
    /// Tempo-synced mode follows the beat position (4 beats per bar); seconds mode
    /// follows playback wall-clock time. A zero period has no defined phase and
    /// yields the constant 0.
    pub fn phase(&self, beat_position: f64, seconds_played: f64) -> f64 {
        match self.mode {
            LoopMode::TempoSynced => {
                let bars = beat_position / 4.0;
                let speed = (self.tempo_exponent as f64).exp2();
                (bars.rem_euclid(1.0 / speed) * speed).fract()
            }
            LoopMode::Seconds => {
                if self.seconds_period == 0.0 {
                    0.0
                } else {
                    (seconds_played.rem_euclid(self.seconds_period) / self.seconds_period).fract()
                }
            }
        }
    }
}

impl Default for PhaseSource {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------
