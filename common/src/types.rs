use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HeaterMode {
    Man,
    Prg,
}

impl HeaterMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Man => "MAN",
            Self::Prg => "PRG",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegulationState {
    Idle,
    Heating,
    TimeoutFallback,
}

impl RegulationState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Heating => "HEATING",
            Self::TimeoutFallback => "TIMEOUT_FALLBACK",
        }
    }
}

/// Body of `GET /get_temp`. Both fields are null when the store is unreadable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempView {
    pub current_temp: Option<i32>,
    pub set_temp: Option<i32>,
}

impl TempView {
    pub fn unavailable() -> Self {
        Self {
            current_temp: None,
            set_temp: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerView {
    pub enabled: bool,
    #[serde(rename = "startHour")]
    pub start_hour: Option<u32>,
    #[serde(rename = "startMin")]
    pub start_min: Option<u32>,
    #[serde(rename = "timerTemp")]
    pub timer_temp: i32,
    #[serde(rename = "newDay")]
    pub new_day: bool,
}

/// Reading posted by the unit to `/home/espcreate/`.
///
/// Every field is optional and loosely typed; the firmware has been seen to
/// send numbers as strings, and a malformed report still has to be accepted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UnitReport {
    #[serde(rename = "CurTemp")]
    pub cur_temp: Option<Value>,
    #[serde(rename = "IsOn")]
    pub is_on: Option<Value>,
    #[serde(rename = "SetTemp")]
    pub set_temp: Option<Value>,
    #[serde(rename = "PrgNum")]
    pub program_number: Option<Value>,
    #[serde(rename = "UsrNum")]
    pub user_number: Option<Value>,
    #[serde(rename = "Mode")]
    pub mode: Option<Value>,
}

impl UnitReport {
    /// Lenient parse: anything that is not a JSON object yields an empty report.
    pub fn from_slice(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// Reported water temperature, `0` when missing or unusable.
    pub fn current_temp(&self) -> i32 {
        self.cur_temp.as_ref().and_then(int_value).unwrap_or(0)
    }
}

fn int_value(value: &Value) -> Option<i32> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|f| f.round() as i64))
            .and_then(|n| i32::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
