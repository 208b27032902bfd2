use std::time::Duration;

use bevy::prelude::*;

use crate::config::BLINK_HALF_PERIOD_MS;
use crate::overlay::OverlayState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlinkPhase {
    #[default]
    Base,
    Alert,
}

impl BlinkPhase {
    pub fn toggled(self) -> Self {
        match self {
            BlinkPhase::Base => BlinkPhase::Alert,
            BlinkPhase::Alert => BlinkPhase::Base,
        }
    }
}

/// Shared blink animation clock.
///
/// Suspended (phase pinned to `Base`) while no visible line blinks, so hidden
/// groups never keep the animation alive.
#[derive(Resource, Debug)]
pub struct BlinkClock {
    timer: Timer,
    phase: BlinkPhase,
    running: bool,
}

impl Default for BlinkClock {
    fn default() -> Self {
        Self {
            timer: Timer::new(
                Duration::from_millis(BLINK_HALF_PERIOD_MS),
                TimerMode::Repeating,
            ),
            phase: BlinkPhase::Base,
            running: false,
        }
    }
}

impl BlinkClock {
    pub fn phase(&self) -> BlinkPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn advance(&mut self, delta: Duration, any_blinking: bool) -> BlinkPhase {
        if !any_blinking {
            if self.running {
                self.running = false;
                self.timer.reset();
                self.phase = BlinkPhase::Base;
            }
            return self.phase;
        }
        self.running = true;
        self.timer.tick(delta);
        // An odd number of half periods flips the phase.
        if self.timer.times_finished_this_tick() % 2 == 1 {
            self.phase = self.phase.toggled();
        }
        self.phase
    }
}

pub fn tick_blink_clock(
    time: Res<Time>,
    overlay: Res<OverlayState>,
    mut clock: ResMut<BlinkClock>,
) {
    clock.advance(time.delta(), overlay.any_blinking());
}
