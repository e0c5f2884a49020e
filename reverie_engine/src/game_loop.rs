//! Fixed-timestep accumulator loop.
//!
//! The host drives [`GameLoop::advance`] with wall-clock timestamps; the
//! loop converts them into a whole number of fixed simulation steps plus
//! an interpolation alpha for the render phase. Simulation speed scales
//! only the accumulated simulation time, never the render cadence, and a
//! delta clamp prevents the spiral of death after long pauses.

use log::info;

/// One simulation step: 60 Hz.
pub const FIXED_STEP_MS: f64 = 1000.0 / 60.0;

/// Longest wall-clock delta a single frame may contribute.
pub const MAX_DELTA_MS: u64 = 100;

/// FPS meter reporting window.
const FPS_WINDOW_MS: u64 = 1000;

/// What one frame call decided: how many fixed steps to run and the
/// interpolation alpha for rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameAdvance {
    pub steps: u32,
    pub alpha: f64,
    /// Measured frames/second, emitted roughly once a second.
    pub fps: Option<f64>,
}

/// The accumulator and its controls.
#[derive(Debug, Clone)]
pub struct GameLoop {
    last_frame_ms: Option<u64>,
    accumulator: f64,
    speed: u8,
    pub paused: bool,
    pub running: bool,
    fps_frames: u32,
    fps_window_start: Option<u64>,
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl GameLoop {
    pub fn new() -> GameLoop {
        GameLoop {
            last_frame_ms: None,
            accumulator: 0.0,
            speed: 3,
            paused: false,
            running: true,
            fps_frames: 0,
            fps_window_start: None,
        }
    }

    /// Speed multiplier 1..=5; 3 is normal speed.
    pub fn set_speed(&mut self, speed: u8) {
        let clamped = speed.clamp(1, 5);
        if clamped != self.speed {
            info!("simulation speed set to {clamped}");
        }
        self.speed = clamped;
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// Feed one wall-clock frame. Returns the number of fixed steps to
    /// simulate and the render alpha.
    pub fn advance(&mut self, now_ms: u64) -> FrameAdvance {
        let dt = match self.last_frame_ms {
            Some(last) => now_ms.saturating_sub(last).min(MAX_DELTA_MS),
            None => 0,
        };
        self.last_frame_ms = Some(now_ms);

        let fps = self.measure_fps(now_ms);

        if self.paused || !self.running {
            return FrameAdvance {
                steps: 0,
                alpha: self.accumulator / FIXED_STEP_MS,
                fps,
            };
        }

        #[allow(clippy::cast_precision_loss)]
        let scaled = dt as f64 * (f64::from(self.speed) / 3.0);
        self.accumulator += scaled;

        let mut steps = 0;
        while self.accumulator >= FIXED_STEP_MS {
            self.accumulator -= FIXED_STEP_MS;
            steps += 1;
        }

        FrameAdvance {
            steps,
            alpha: self.accumulator / FIXED_STEP_MS,
            fps,
        }
    }

    fn measure_fps(&mut self, now_ms: u64) -> Option<f64> {
        self.fps_frames += 1;
        let start = *self.fps_window_start.get_or_insert(now_ms);
        let elapsed = now_ms.saturating_sub(start);
        if elapsed >= FPS_WINDOW_MS {
            #[allow(clippy::cast_precision_loss)]
            let fps = f64::from(self.fps_frames) * 1000.0 / elapsed as f64;
            self.fps_frames = 0;
            self.fps_window_start = Some(now_ms);
            return Some(fps);
        }
        None
    }
}
