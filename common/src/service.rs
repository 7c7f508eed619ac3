use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, info};

use crate::{
    config::{DirectiveConfig, ServerConfig},
    directive::{format_now, Directive, SignedDirective},
    error::StoreError,
    regulation::RegulationEngine,
    schedule::{check_timer, format_program},
    state::ControlState,
    store::StateStore,
    types::{TempView, TimerView},
};

/// The unit-facing protocol operations over an injected [`StateStore`].
///
/// Each operation is one complete read-modify-write of the control record.
/// The service itself is not shared; hosts that serve concurrent requests
/// wrap it in a lock.
#[derive(Debug)]
pub struct HeaterService<S> {
    store: S,
    engine: RegulationEngine,
    directive: DirectiveConfig,
}

impl<S: StateStore> HeaterService<S> {
    pub fn new(store: S, config: &ServerConfig) -> Self {
        Self {
            store,
            engine: RegulationEngine::new(config.heating_timeout()),
            directive: config.directive.clone(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ingest_reading(&mut self, current_temp: i32) -> Result<(), StoreError> {
        let mut state = self.store.get()?;
        state.current_temp = current_temp;
        self.store.put(&state)
    }

    /// Handles a directive poll: daily timer, then regulation, then signing.
    pub fn poll<Tz: TimeZone>(
        &mut self,
        user_number: i64,
        now: &DateTime<Tz>,
    ) -> Result<SignedDirective, StoreError> {
        let mut state = self.store.get()?;

        if check_timer(&mut state, now).changed() {
            self.store.put(&state)?;
        }

        let decision = self.engine.decide(&mut state, now.with_timezone(&Utc));
        if decision.changed {
            self.store.put(&state)?;
        }
        debug!(
            "poll from {user_number}: {} set {} current {}",
            decision.state.as_str(),
            decision.set_temp,
            state.current_temp
        );

        let directive = Directive {
            id: self.directive.unit_id,
            is_on: false,
            current_temp: state.current_temp,
            set_temp: decision.set_temp,
            now: format_now(now),
            user_number,
            program_number: self.directive.program_number,
            mode: self.directive.mode,
            prg: self.program_field(&state),
        };
        Ok(directive.sign())
    }

    pub fn snapshot(&mut self) -> Result<ControlState, StoreError> {
        self.store.get()
    }

    pub fn temp_view(&mut self) -> Result<TempView, StoreError> {
        let state = self.store.get()?;
        Ok(TempView {
            current_temp: Some(state.current_temp),
            set_temp: Some(state.set_temp),
        })
    }

    /// Manual override. Negative values leave the state untouched and return
    /// `None`; `6` turns the heater off.
    pub fn set_target(
        &mut self,
        set_temp: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<i32>, StoreError> {
        let Ok(set_temp) = i32::try_from(set_temp) else {
            return Ok(None);
        };
        if set_temp < 0 {
            return Ok(None);
        }

        let mut state = self.store.get()?;
        state.retarget(set_temp, now);
        self.store.put(&state)?;
        info!("set temperature to {set_temp}");
        Ok(Some(set_temp))
    }

    /// Sets the daily timer start and target. Out-of-range times are ignored.
    pub fn configure_timer(
        &mut self,
        hour: u32,
        minute: u32,
        timer_temp: Option<i32>,
    ) -> Result<TimerView, StoreError> {
        let mut state = self.store.get()?;
        if hour < 24 && minute < 60 {
            state.start_hour = Some(hour);
            state.start_min = Some(minute);
            if let Some(temp) = timer_temp {
                state.timer_temp = temp;
            }
            self.store.put(&state)?;
            info!(
                "daily timer set to {hour:02}:{minute:02}, target {}",
                state.timer_temp
            );
        }
        Ok(state.timer_view())
    }

    pub fn clear_timer(&mut self) -> Result<TimerView, StoreError> {
        let mut state = self.store.get()?;
        state.start_hour = None;
        state.start_min = None;
        self.store.put(&state)?;
        info!("daily timer cleared");
        Ok(state.timer_view())
    }

    pub fn timer_view(&mut self) -> Result<TimerView, StoreError> {
        Ok(self.store.get()?.timer_view())
    }

    fn program_field(&self, state: &ControlState) -> String {
        match state.timer_start() {
            Some((hour, minute)) => format_program(hour, minute, state.timer_temp),
            None => self.directive.fallback_program.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{state::IDLE_SET_TEMP, store::MemoryStore, types::HeaterMode};
    use chrono::{Datelike, Duration, FixedOffset};
    use pretty_assertions::assert_eq;

    fn local(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 1, day, hour, minute, 0)
            .unwrap()
    }

    fn service_with(state: ControlState) -> HeaterService<MemoryStore> {
        HeaterService::new(MemoryStore::with_state(state), &ServerConfig::default())
    }

    fn heating(now: DateTime<FixedOffset>, started_minutes_ago: i64) -> ControlState {
        let mut state = ControlState::new(now.with_timezone(&Utc));
        state.current_temp = 5;
        state.set_temp = 20;
        state.set_temp_time = (now - Duration::minutes(started_minutes_ago)).with_timezone(&Utc);
        state.last_day = now.day();
        state
    }

    #[test]
    fn poll_keeps_heating_within_window() {
        let now = local(7, 7, 30);
        let mut service = service_with(heating(now, 30));

        let signed = service.poll(25_564_181, &now).unwrap();

        assert_eq!(signed.heater.set_temp, 20);
        assert_eq!(signed.heater.current_temp, 5);
        assert_eq!(signed.heater.user_number, 25_564_181);
        assert_eq!(signed.heater.now, "4,07:30");
        assert_eq!(signed.heater.mode, HeaterMode::Man);
        assert_eq!(signed.heater.prg, "19:00,45");
        assert!(signed.verify());
        assert_eq!(service.store().writes(), 0);
    }

    #[test]
    fn poll_times_out_and_persists_idle() {
        let now = local(7, 7, 30);
        let mut service = service_with(heating(now, 90));

        let signed = service.poll(0, &now).unwrap();

        assert_eq!(signed.heater.set_temp, IDLE_SET_TEMP);
        assert!(signed.verify());
        let stored = service.snapshot().unwrap();
        assert_eq!(stored.set_temp, IDLE_SET_TEMP);
        assert_eq!(service.store().writes(), 1);
    }

    #[test]
    fn idle_poll_does_not_write() {
        let now = local(7, 9, 0);
        let mut state = ControlState::new(now.with_timezone(&Utc));
        state.last_day = 7;
        state.current_temp = 40;
        let mut service = service_with(state.clone());

        for _ in 0..3 {
            assert_eq!(service.poll(1, &now).unwrap().heater.set_temp, IDLE_SET_TEMP);
        }
        assert_eq!(service.store().writes(), 0);
        assert_eq!(service.snapshot().unwrap(), state);
    }

    #[test]
    fn daily_timer_starts_heating_cycle() {
        let mut state = ControlState::new(local(6, 22, 0).with_timezone(&Utc));
        state.last_day = 6;
        state.current_temp = 30;
        let mut service = service_with(state);
        service.configure_timer(19, 10, Some(50)).unwrap();

        // Day rolls over in the morning; timer is armed but not due.
        let morning = service.poll(0, &local(7, 6, 0)).unwrap();
        assert_eq!(morning.heater.set_temp, IDLE_SET_TEMP);
        assert_eq!(morning.heater.prg, "19:10,50");
        assert!(service.snapshot().unwrap().new_day);

        let early = service.poll(0, &local(7, 19, 9)).unwrap();
        assert_eq!(early.heater.set_temp, IDLE_SET_TEMP);

        let due = service.poll(0, &local(7, 19, 11)).unwrap();
        assert_eq!(due.heater.set_temp, 50);
        let stored = service.snapshot().unwrap();
        assert!(!stored.new_day);
        assert_eq!(stored.set_temp, 50);
        assert_eq!(stored.set_temp_time, local(7, 19, 11).with_timezone(&Utc));

        // Target reached later on: back to idle, timer stays consumed.
        service.ingest_reading(51).unwrap();
        let done = service.poll(0, &local(7, 19, 40)).unwrap();
        assert_eq!(done.heater.set_temp, IDLE_SET_TEMP);
        assert_eq!(done.heater.current_temp, 51);
        assert!(!service.snapshot().unwrap().new_day);
    }

    #[test]
    fn ingest_updates_current_temp_only() {
        let now = local(7, 7, 30);
        let mut service = service_with(heating(now, 10));

        service.ingest_reading(12).unwrap();

        let state = service.snapshot().unwrap();
        assert_eq!(state.current_temp, 12);
        assert_eq!(state.set_temp, 20);
    }

    #[test]
    fn manual_override_and_negative_noop() {
        let now = local(7, 7, 30).with_timezone(&Utc);
        let mut service = HeaterService::new(MemoryStore::new(), &ServerConfig::default());

        assert_eq!(service.set_target(-1, now).unwrap(), None);
        assert_eq!(
            service.temp_view().unwrap(),
            TempView {
                current_temp: Some(0),
                set_temp: Some(IDLE_SET_TEMP),
            }
        );

        assert_eq!(service.set_target(42, now).unwrap(), Some(42));
        let state = service.snapshot().unwrap();
        assert_eq!(state.set_temp, 42);
        assert_eq!(state.set_temp_time, now);

        assert_eq!(service.set_target(i64::MAX, now).unwrap(), None);
        assert_eq!(service.snapshot().unwrap().set_temp, 42);
    }

    #[test]
    fn timer_configuration_validates_range() {
        let mut service = HeaterService::new(MemoryStore::new(), &ServerConfig::default());

        let view = service.configure_timer(24, 0, Some(50)).unwrap();
        assert!(!view.enabled);

        let view = service.configure_timer(6, 45, None).unwrap();
        assert!(view.enabled);
        assert_eq!((view.start_hour, view.start_min), (Some(6), Some(45)));
        assert_eq!(view.timer_temp, 45);

        let view = service.clear_timer().unwrap();
        assert!(!view.enabled);
        assert_eq!(service.timer_view().unwrap(), view);
    }
}
