use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use tracing::info;

use crate::state::ControlState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerOutcome {
    pub rolled_over: bool,
    pub fired: bool,
}

impl TimerOutcome {
    pub fn changed(&self) -> bool {
        self.rolled_over || self.fired
    }
}

/// Daily timer check, run on every poll before regulation.
///
/// A change of day-of-month arms the timer for the day; an armed timer fires
/// on the first poll at or after the configured start, switching the
/// set-point to the timer target. `now` must be in the unit's local zone.
pub fn check_timer<Tz: TimeZone>(state: &mut ControlState, now: &DateTime<Tz>) -> TimerOutcome {
    let mut outcome = TimerOutcome::default();

    if now.day() != state.last_day {
        state.last_day = now.day();
        state.new_day = true;
        outcome.rolled_over = true;
    }

    if !state.new_day {
        return outcome;
    }

    let Some(start) = state.timer_start() else {
        return outcome;
    };

    if (now.hour(), now.minute()) >= start {
        info!(
            "daily timer {:02}:{:02} fired, heating to {}",
            start.0, start.1, state.timer_temp
        );
        state.retarget(state.timer_temp, now.with_timezone(&Utc));
        state.new_day = false;
        outcome.fired = true;
    }

    outcome
}

/// `Prg` directive field: `HH:MM,<temp>`.
pub fn format_program(hour: u32, minute: u32, temp: i32) -> String {
    format!("{hour:02}:{minute:02},{temp}")
}
