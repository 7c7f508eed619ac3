//! Directive returned to the unit on every `/home/updated` poll.
//!
//! The unit parses the `heater` object positionally, so the struct field
//! order below is the wire order and also the checksum order.

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::{
    checksum::{compute_checksum, format_checksum, parse_checksum, FieldValue},
    types::HeaterMode,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Directive {
    pub id: i64,
    pub is_on: bool,
    pub current_temp: i32,
    pub set_temp: i32,
    pub now: String,
    pub user_number: i64,
    pub program_number: i64,
    pub mode: HeaterMode,
    pub prg: String,
}

impl Directive {
    pub fn fields(&self) -> [(&'static str, FieldValue); 9] {
        [
            ("Id", FieldValue::Integer(self.id)),
            ("IsOn", FieldValue::Boolean(self.is_on)),
            ("CurrentTemp", FieldValue::Integer(self.current_temp.into())),
            ("SetTemp", FieldValue::Integer(self.set_temp.into())),
            ("Now", FieldValue::Text(self.now.clone())),
            ("UserNumber", FieldValue::Integer(self.user_number)),
            ("ProgramNumber", FieldValue::Integer(self.program_number)),
            ("Mode", FieldValue::Text(self.mode.as_str().to_string())),
            ("Prg", FieldValue::Text(self.prg.clone())),
        ]
    }

    pub fn checksum(&self) -> u8 {
        let fields = self.fields();
        compute_checksum(fields.iter().map(|(name, value)| (*name, value)))
    }

    pub fn sign(self) -> SignedDirective {
        let check_sum = format_checksum(self.checksum());
        SignedDirective {
            heater: self,
            check_sum,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedDirective {
    pub heater: Directive,
    #[serde(rename = "checkSum")]
    pub check_sum: String,
}

impl SignedDirective {
    /// What the unit does before acting: recompute and compare.
    pub fn verify(&self) -> bool {
        parse_checksum(&self.check_sum) == Some(self.heater.checksum())
    }
}

/// `Now` directive field: weekday (1 = Sunday .. 7 = Saturday) and `HH:MM`.
pub fn format_now<Tz: TimeZone>(now: &DateTime<Tz>) -> String {
    format!(
        "{},{:02}:{:02}",
        now.weekday().number_from_sunday(),
        now.hour(),
        now.minute()
    )
}
