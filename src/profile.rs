// src/profile.rs - Build-time firmware profiles
use crate::config::ConfigError;

/// Which build profile the firmware was compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    /// Short delays, low thresholds, verbose logging.
    Diagnostic,
    /// Long delays, high thresholds, silent.
    Production,
}

/// Timing constants selected at build time.
///
/// All durations are whole seconds except `tick_hz`. The policy's uptime
/// thresholds live here rather than in the policy variant because the
/// diagnostic build shrinks them to seconds so a bench session reaches
/// every tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub kind: ProfileKind,
    /// Uptime clock interrupt rate. One tick per millisecond.
    pub tick_hz: u32,
    /// Wait after USB enumeration so the host OS finishes booting.
    pub initial_delay_secs: u32,
    /// Minimum wait between two loop iterations.
    pub min_delay_secs: u32,
    /// Uptime after which the escalated tier starts.
    pub uptime_trigger_secs: u32,
    /// Uptime at which the escalated ramp ends.
    pub uptime_crazy_secs: u32,
}

impl Profile {
    pub const fn diagnostic() -> Self {
        Self {
            kind: ProfileKind::Diagnostic,
            tick_hz: 1000,
            initial_delay_secs: 1,
            min_delay_secs: 0,
            uptime_trigger_secs: 10,
            uptime_crazy_secs: 60,
        }
    }

    pub const fn production() -> Self {
        Self {
            kind: ProfileKind::Production,
            tick_hz: 1000,
            initial_delay_secs: 60,
            min_delay_secs: 10,
            uptime_trigger_secs: 518_400, // 6 days
            uptime_crazy_secs: 864_000,   // 10 days
        }
    }

    /// The profile selected by the `diagnostic` cargo feature.
    pub const fn from_build() -> Self {
        if cfg!(feature = "diagnostic") {
            Self::diagnostic()
        } else {
            Self::production()
        }
    }

    /// Reject profiles whose uptime thresholds would leave no escalated
    /// window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_hz == 0 {
            return Err(ConfigError::Invalid("profile tick rate must be > 0".to_string()));
        }
        if self.uptime_trigger_secs >= self.uptime_crazy_secs {
            return Err(ConfigError::Invalid(format!(
                "uptime trigger {}s must be below crazy threshold {}s",
                self.uptime_trigger_secs, self.uptime_crazy_secs
            )));
        }
        Ok(())
    }

    /// Max level for the debug channel.
    pub fn log_level(&self) -> tracing::Level {
        match self.kind {
            ProfileKind::Diagnostic => tracing::Level::DEBUG,
            ProfileKind::Production => tracing::Level::WARN,
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::from_build()
    }
}

/// How the boot counter is treated at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootMode {
    /// Increment the stored counter.
    Normal,
    /// Field recovery: zero the stored counter and run with the sentinel.
    ResetBootCount,
}

impl BootMode {
    /// The mode selected by the `reset-bootcount` cargo feature.
    pub const fn from_build() -> Self {
        if cfg!(feature = "reset-bootcount") {
            BootMode::ResetBootCount
        } else {
            BootMode::Normal
        }
    }
}
