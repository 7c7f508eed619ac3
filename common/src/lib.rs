pub mod checksum;
pub mod config;
pub mod directive;
pub mod error;
pub mod regulation;
pub mod schedule;
pub mod service;
pub mod state;
pub mod store;
pub mod templog;
pub mod types;

pub use config::{DirectiveConfig, ServerConfig};
pub use directive::{Directive, SignedDirective};
pub use error::StoreError;
pub use regulation::{Decision, RegulationEngine};
pub use schedule::{check_timer, TimerOutcome};
pub use service::HeaterService;
pub use state::{ControlState, StoredRecord, StoredValue, IDLE_SET_TEMP};
pub use store::{MemoryStore, StateStore};
pub use templog::TemperatureSample;
pub use types::{HeaterMode, RegulationState, TempView, TimerView, UnitReport};
