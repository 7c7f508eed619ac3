use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::StoreError, types::TimerView};

/// `set_temp` value meaning "heater off". Never a literal target.
pub const IDLE_SET_TEMP: i32 = 6;

/// Daily-timer target used until one is configured.
pub const DEFAULT_TIMER_TEMP: i32 = 45;

/// The single mutable control record shared by every unit interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    pub current_temp: i32,
    pub set_temp: i32,
    pub set_temp_time: DateTime<Utc>,
    pub timer_temp: i32,
    pub start_hour: Option<u32>,
    pub start_min: Option<u32>,
    pub last_day: u32,
    pub new_day: bool,
}

impl ControlState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            current_temp: 0,
            set_temp: IDLE_SET_TEMP,
            set_temp_time: now,
            timer_temp: DEFAULT_TIMER_TEMP,
            start_hour: None,
            start_min: None,
            last_day: 0,
            new_day: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.set_temp == IDLE_SET_TEMP
    }

    /// Replaces the set-point and restarts the heating window.
    /// Returns whether the set-point value changed.
    pub fn retarget(&mut self, set_temp: i32, now: DateTime<Utc>) -> bool {
        let changed = self.set_temp != set_temp;
        self.set_temp = set_temp;
        self.set_temp_time = now;
        changed
    }

    /// Configured start of the daily timer, if both parts are set.
    pub fn timer_start(&self) -> Option<(u32, u32)> {
        Some((self.start_hour?, self.start_min?))
    }

    pub fn timer_view(&self) -> TimerView {
        TimerView {
            enabled: self.timer_start().is_some(),
            start_hour: self.start_hour,
            start_min: self.start_min,
            timer_temp: self.timer_temp,
            new_day: self.new_day,
        }
    }

    pub fn to_record(&self) -> StoredRecord {
        let mut record = StoredRecord::default();
        record.insert(
            field::CURRENT_TEMP,
            StoredValue::Integer(self.current_temp.into()),
        );
        record.insert(field::SET_TEMP, StoredValue::Integer(self.set_temp.into()));
        record.insert(
            field::SET_TEMP_TIME,
            StoredValue::Timestamp(self.set_temp_time.timestamp_millis()),
        );
        record.insert(field::TIMER_TEMP, StoredValue::Integer(self.timer_temp.into()));
        if let Some(hour) = self.start_hour {
            record.insert(field::START_HOUR, StoredValue::Integer(hour.into()));
        }
        if let Some(minute) = self.start_min {
            record.insert(field::START_MIN, StoredValue::Integer(minute.into()));
        }
        record.insert(field::LAST_DAY, StoredValue::Integer(self.last_day.into()));
        record.insert(field::NEW_DAY, StoredValue::Boolean(self.new_day));
        record
    }

    /// Rebuilds the state from a persisted record. Absent fields take their
    /// defaults, `now` seeds `set_temp_time` when it was never written.
    pub fn from_record(record: &StoredRecord, now: DateTime<Utc>) -> Result<Self, StoreError> {
        let defaults = Self::new(now);
        Ok(Self {
            current_temp: record
                .integer::<i32>(field::CURRENT_TEMP)?
                .unwrap_or(defaults.current_temp),
            set_temp: record
                .integer::<i32>(field::SET_TEMP)?
                .unwrap_or(defaults.set_temp),
            set_temp_time: record
                .timestamp(field::SET_TEMP_TIME)?
                .unwrap_or(defaults.set_temp_time),
            timer_temp: record
                .integer::<i32>(field::TIMER_TEMP)?
                .unwrap_or(defaults.timer_temp),
            start_hour: record.integer_below(field::START_HOUR, 24)?,
            start_min: record.integer_below(field::START_MIN, 60)?,
            last_day: record
                .integer::<u32>(field::LAST_DAY)?
                .unwrap_or(defaults.last_day),
            new_day: record
                .boolean(field::NEW_DAY)?
                .unwrap_or(defaults.new_day),
        })
    }
}

mod field {
    pub const CURRENT_TEMP: &str = "current_temp";
    pub const SET_TEMP: &str = "set_temp";
    pub const SET_TEMP_TIME: &str = "set_temp_time";
    pub const TIMER_TEMP: &str = "timer_temp";
    pub const START_HOUR: &str = "start_hour";
    pub const START_MIN: &str = "start_min";
    pub const LAST_DAY: &str = "last_day";
    pub const NEW_DAY: &str = "new_day";
}

/// A persisted field value carrying its own type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum StoredValue {
    Integer(i64),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    Boolean(bool),
    Text(String),
}

impl StoredValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Timestamp(_) => "timestamp",
            Self::Boolean(_) => "boolean",
            Self::Text(_) => "text",
        }
    }
}

/// On-disk shape of [`ControlState`]: field name to tagged value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredRecord {
    fields: BTreeMap<String, StoredValue>,
}

impl StoredRecord {
    pub fn insert(&mut self, name: &str, value: StoredValue) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&StoredValue> {
        self.fields.get(name)
    }

    fn integer_below(&self, name: &str, limit: u32) -> Result<Option<u32>, StoreError> {
        match self.integer::<u32>(name)? {
            Some(value) if value >= limit => Err(StoreError::FieldRange {
                field: name.to_string(),
                value: value.into(),
            }),
            value => Ok(value),
        }
    }

    fn integer<T: TryFrom<i64>>(&self, name: &str) -> Result<Option<T>, StoreError> {
        match self.get(name) {
            None => Ok(None),
            Some(StoredValue::Integer(value)) => {
                T::try_from(*value)
                    .map(Some)
                    .map_err(|_| StoreError::FieldRange {
                        field: name.to_string(),
                        value: *value,
                    })
            }
            Some(other) => Err(mismatch(name, "integer", other)),
        }
    }

    fn timestamp(&self, name: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        match self.get(name) {
            None => Ok(None),
            Some(StoredValue::Timestamp(millis)) => DateTime::<Utc>::from_timestamp_millis(*millis)
                .map(Some)
                .ok_or_else(|| StoreError::FieldRange {
                    field: name.to_string(),
                    value: *millis,
                }),
            Some(other) => Err(mismatch(name, "timestamp", other)),
        }
    }

    fn boolean(&self, name: &str) -> Result<Option<bool>, StoreError> {
        match self.get(name) {
            None => Ok(None),
            Some(StoredValue::Boolean(value)) => Ok(Some(*value)),
            Some(other) => Err(mismatch(name, "boolean", other)),
        }
    }
}

fn mismatch(name: &str, expected: &'static str, found: &StoredValue) -> StoreError {
    StoreError::FieldType {
        field: name.to_string(),
        expected,
        found: found.kind(),
    }
}
