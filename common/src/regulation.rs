use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::{
    state::{ControlState, IDLE_SET_TEMP},
    types::RegulationState,
};

/// How long the unit may heat without reaching its target before it is
/// assumed stuck and told to stop.
pub const DEFAULT_HEATING_TIMEOUT_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub state: RegulationState,
    /// Set-point to put in the directive.
    pub set_temp: i32,
    /// Whether the control record was mutated and must be persisted.
    pub changed: bool,
}

/// Hysteresis regulation with a heating-timeout cutoff.
///
/// Heating continues while the reading is below the set-point and the
/// heating window is open. Reaching the set-point, or running out the
/// window, drops the set-point back to [`IDLE_SET_TEMP`].
#[derive(Debug, Clone, Copy)]
pub struct RegulationEngine {
    heating_timeout: Duration,
}

impl Default for RegulationEngine {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_HEATING_TIMEOUT_MINUTES))
    }
}

impl RegulationEngine {
    pub fn new(heating_timeout: Duration) -> Self {
        Self { heating_timeout }
    }

    pub fn heating_timeout(&self) -> Duration {
        self.heating_timeout
    }

    pub fn decide(&self, state: &mut ControlState, now: DateTime<Utc>) -> Decision {
        if state.current_temp < state.set_temp && !state.is_idle() {
            if now <= state.set_temp_time + self.heating_timeout {
                debug!(
                    "heating: current {} below set {}",
                    state.current_temp, state.set_temp
                );
                return Decision {
                    state: RegulationState::Heating,
                    set_temp: state.set_temp,
                    changed: false,
                };
            }

            warn!(
                "heated for over {} min without reaching {} (current {}), forcing idle",
                self.heating_timeout.num_minutes(),
                state.set_temp,
                state.current_temp
            );
            state.retarget(IDLE_SET_TEMP, now);
            return Decision {
                state: RegulationState::TimeoutFallback,
                set_temp: IDLE_SET_TEMP,
                changed: true,
            };
        }

        if state.is_idle() {
            return Decision {
                state: RegulationState::Idle,
                set_temp: IDLE_SET_TEMP,
                changed: false,
            };
        }

        info!(
            "temperature {} reached (current {}), going idle",
            state.set_temp, state.current_temp
        );
        state.retarget(IDLE_SET_TEMP, now);
        Decision {
            state: RegulationState::Idle,
            set_temp: IDLE_SET_TEMP,
            changed: true,
        }
    }
}
