use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{regulation::DEFAULT_HEATING_TIMEOUT_MINUTES, types::HeaterMode};

/// Constant parts of every directive sent to the unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectiveConfig {
    pub unit_id: i64,
    pub program_number: i64,
    pub mode: HeaterMode,
    /// `Prg` value sent while no daily timer is configured.
    pub fallback_program: String,
}

impl Default for DirectiveConfig {
    fn default() -> Self {
        Self {
            unit_id: 0,
            program_number: 3,
            mode: HeaterMode::Man,
            fallback_program: "19:00,45".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http_port: u16,
    /// IANA zone the unit lives in. Drives `Now` and the daily timer.
    pub timezone: String,
    pub heating_timeout_minutes: i64,
    pub directive: DirectiveConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 80,
            timezone: "UTC".to_string(),
            heating_timeout_minutes: DEFAULT_HEATING_TIMEOUT_MINUTES,
            directive: DirectiveConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn sanitize(&mut self) {
        self.heating_timeout_minutes = self.heating_timeout_minutes.clamp(1, 24 * 60);
        if self.timezone.trim().is_empty() {
            self.timezone = "UTC".to_string();
        }
        if self.directive.fallback_program.trim().is_empty() {
            self.directive.fallback_program = DirectiveConfig::default().fallback_program;
        }
    }

    pub fn heating_timeout(&self) -> Duration {
        Duration::minutes(self.heating_timeout_minutes)
    }
}
