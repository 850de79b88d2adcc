use crate::engine::DEFAULT_VOLUME;
use crate::output::AudioOutput;
use crate::outputs::SimulatedOutput;
use anyhow::Result;
use moodplay_core::DEFAULT_RESTART_THRESHOLD_SECS;
use serde::Deserialize;
use std::time::Duration;

/// Which output the session plays through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Simulated,
    Rodio,
}

/// Playback session settings
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Output gain at session start
    #[serde(default = "default_volume")]
    pub initial_volume: f32,

    /// "Previous" restarts the track after this many seconds
    #[serde(default = "default_restart_threshold")]
    pub restart_threshold_secs: f64,

    /// Detections below this confidence are ignored
    #[serde(default)]
    pub min_confidence: f32,

    #[serde(default = "default_output")]
    pub output: OutputKind,

    /// Nominal length of every source on the simulated output
    #[serde(default = "default_simulated_track_secs")]
    pub simulated_track_secs: f64,

    /// Progress reporting interval of the outputs
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,

    /// Fetch the full catalog when the session starts
    #[serde(default)]
    pub preload_catalog: bool,
}

impl SessionConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis.max(1))
    }

    /// Build the configured output
    pub fn build_output(&self) -> Result<Box<dyn AudioOutput>> {
        match self.output {
            OutputKind::Simulated => {
                let track = Duration::try_from_secs_f64(self.simulated_track_secs)
                    .unwrap_or_else(|_| Duration::from_secs_f64(default_simulated_track_secs()));
                Ok(Box::new(SimulatedOutput::new(track, self.tick())))
            }
            #[cfg(feature = "rodio-output")]
            OutputKind::Rodio => Ok(Box::new(crate::outputs::RodioOutput::new(self.tick())?)),
            #[cfg(not(feature = "rodio-output"))]
            OutputKind::Rodio => {
                anyhow::bail!("Rodio output requested but moodplay was built without the rodio-output feature")
            }
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_volume: default_volume(),
            restart_threshold_secs: default_restart_threshold(),
            min_confidence: 0.0,
            output: default_output(),
            simulated_track_secs: default_simulated_track_secs(),
            tick_millis: default_tick_millis(),
            preload_catalog: false,
        }
    }
}

fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

fn default_restart_threshold() -> f64 {
    DEFAULT_RESTART_THRESHOLD_SECS
}

fn default_output() -> OutputKind {
    OutputKind::Simulated
}

fn default_simulated_track_secs() -> f64 {
    180.0
}

fn default_tick_millis() -> u64 {
    250
}
