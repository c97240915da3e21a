//! Playback loop - elapsed-time frame cursor for live preview
//!
//! The loop does not own a timer. Whatever drives it (a display refresh
//! callback, a test, the GIF writer) calls [`Playback::tick`] with a
//! monotonically increasing timestamp in milliseconds. Elapsed time is
//! accumulated and the cursor advances once per `1000 / fps` ms, carrying the
//! remainder, so irregular tick spacing does not drift.

use crate::frames::FrameState;

/// Default preview rate
pub const DEFAULT_FPS: u32 = 8;

/// Highest supported preview rate
pub const MAX_FPS: u32 = 60;

/// Frame cursor and timing state.
#[derive(Debug, Clone, PartialEq)]
pub struct Playback {
    fps: u32,
    cursor: usize,
    accumulated_ms: f64,
    last_tick_ms: Option<f64>,
    playing: bool,
    /// Step over deleted frames inside the active range
    skip_deleted: bool,
}

impl Default for Playback {
    fn default() -> Self {
        Self::new(DEFAULT_FPS)
    }
}

impl Playback {
    /// Stopped playback at `fps`, clamped to `1..=MAX_FPS`.
    pub fn new(fps: u32) -> Self {
        Self {
            fps: fps.clamp(1, MAX_FPS),
            cursor: 0,
            accumulated_ms: 0.0,
            last_tick_ms: None,
            playing: false,
            skip_deleted: true,
        }
    }

    pub fn with_skip_deleted(mut self, skip_deleted: bool) -> Self {
        self.skip_deleted = skip_deleted;
        self
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn skip_deleted(&self) -> bool {
        self.skip_deleted
    }

    /// Change the rate. Takes effect on the next tick.
    pub fn set_fps(&mut self, fps: u32) {
        self.fps = fps.clamp(1, MAX_FPS);
    }

    /// Milliseconds between frame advances.
    pub fn interval_ms(&self) -> f64 {
        1000.0 / self.fps as f64
    }

    /// Display position of the current frame.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Stop advancing. The next [`play`](Self::play) starts timing afresh.
    pub fn pause(&mut self) {
        self.playing = false;
        self.last_tick_ms = None;
        self.accumulated_ms = 0.0;
    }

    /// Jump to a display position, wrapped into the active range.
    pub fn seek(&mut self, position: usize, state: &FrameState) {
        self.cursor = position % state.active_frame_count().max(1);
        self.accumulated_ms = 0.0;
    }

    /// Feed the current time and advance the cursor as needed.
    ///
    /// The first tick after starting only records the baseline. A clock that
    /// goes backwards resets the baseline without advancing. Returns the
    /// number of steps taken.
    pub fn tick(&mut self, now_ms: f64, state: &FrameState) -> usize {
        if !self.playing {
            return 0;
        }
        self.clamp_cursor(state);

        let Some(last) = self.last_tick_ms else {
            self.last_tick_ms = Some(now_ms);
            return 0;
        };
        self.last_tick_ms = Some(now_ms);
        if now_ms < last {
            return 0;
        }

        self.accumulated_ms += now_ms - last;
        let interval = self.interval_ms();
        let steps = (self.accumulated_ms / interval).floor() as usize;
        self.accumulated_ms -= steps as f64 * interval;

        // After a long stall only the position within one loop matters
        let cycle = loop_positions(state, self.skip_deleted).len().max(1);
        let effective = if steps > cycle { 1 + (steps - 1) % cycle } else { steps };
        for _ in 0..effective {
            self.step(state);
        }
        steps
    }

    /// Advance one frame within the active range.
    pub fn step(&mut self, state: &FrameState) {
        let active = state.active_frame_count().max(1);
        let mut next = (self.cursor + 1) % active;
        if self.skip_deleted {
            for _ in 0..active {
                match state.get(next) {
                    Some(record) if record.deleted => next = (next + 1) % active,
                    _ => break,
                }
            }
        }
        self.cursor = next;
    }

    fn clamp_cursor(&mut self, state: &FrameState) {
        if self.cursor >= state.active_frame_count() {
            self.cursor = 0;
        }
    }
}

/// Display positions shown during one loop of the active range.
pub fn loop_positions(state: &FrameState, skip_deleted: bool) -> Vec<usize> {
    (0..state.active_frame_count().min(state.len()))
        .filter(|&i| !skip_deleted || state.get(i).is_some_and(|r| !r.deleted))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing(fps: u32) -> Playback {
        let mut playback = Playback::new(fps);
        playback.play();
        playback
    }

    #[test]
    fn test_three_intervals_wrap_active_range() {
        let mut state = FrameState::new(2, 3);
        state.set_active_frame_count(3);
        let mut playback = playing(8);

        assert_eq!(playback.tick(0.0, &state), 0);
        assert_eq!(playback.tick(375.0, &state), 3);
        assert_eq!(playback.cursor(), 0);
    }

    #[test]
    fn test_irregular_ticks_do_not_drift() {
        let mut state = FrameState::new(2, 3);
        state.set_active_frame_count(3);
        let mut playback = playing(8);

        let mut total = 0;
        let mut now = 0.0;
        playback.tick(now, &state);
        for delta in [16.0, 17.0, 40.0, 3.0, 100.0, 60.0, 50.0, 89.0] {
            now += delta;
            total += playback.tick(now, &state);
        }
        // 375ms elapsed in total
        assert_eq!(total, 3);
        assert_eq!(playback.cursor(), 0);
    }

    #[test]
    fn test_partial_interval_carries_over() {
        let state = FrameState::new(1, 4);
        let mut playback = playing(10);
        playback.tick(0.0, &state);
        assert_eq!(playback.tick(150.0, &state), 1);
        assert_eq!(playback.tick(200.0, &state), 1);
        assert_eq!(playback.cursor(), 2);
    }

    #[test]
    fn test_paused_does_not_advance() {
        let state = FrameState::new(1, 4);
        let mut playback = Playback::new(10);
        assert_eq!(playback.tick(0.0, &state), 0);
        assert_eq!(playback.tick(1000.0, &state), 0);
        assert_eq!(playback.cursor(), 0);

        playback.play();
        playback.tick(5000.0, &state);
        assert_eq!(playback.tick(5100.0, &state), 1);
    }

    #[test]
    fn test_backwards_clock_resets_baseline() {
        let state = FrameState::new(1, 4);
        let mut playback = playing(10);
        playback.tick(500.0, &state);
        assert_eq!(playback.tick(100.0, &state), 0);
        assert_eq!(playback.tick(200.0, &state), 1);
    }

    #[test]
    fn test_skips_deleted_frames() {
        let mut state = FrameState::new(1, 4);
        state.toggle_deleted(1);
        state.toggle_deleted(2);
        let mut playback = Playback::new(8);
        playback.step(&state);
        assert_eq!(playback.cursor(), 3);
        playback.step(&state);
        assert_eq!(playback.cursor(), 0);

        let mut plain = Playback::new(8).with_skip_deleted(false);
        plain.step(&state);
        assert_eq!(plain.cursor(), 1);
    }

    #[test]
    fn test_shrinking_active_range_clamps_cursor() {
        let mut state = FrameState::new(1, 6);
        let mut playback = playing(8);
        playback.seek(5, &state);
        assert_eq!(playback.cursor(), 5);

        state.set_active_frame_count(2);
        playback.tick(0.0, &state);
        assert_eq!(playback.cursor(), 0);
    }

    #[test]
    fn test_fps_clamped() {
        assert_eq!(Playback::new(0).fps(), 1);
        assert_eq!(Playback::new(500).fps(), MAX_FPS);
        assert_eq!(Playback::new(8).interval_ms(), 125.0);
    }

    #[test]
    fn test_loop_positions() {
        let mut state = FrameState::new(1, 5);
        state.set_active_frame_count(4);
        state.toggle_deleted(2);
        assert_eq!(loop_positions(&state, true), vec![0, 1, 3]);
        assert_eq!(loop_positions(&state, false), vec![0, 1, 2, 3]);
    }
}
