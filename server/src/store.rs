use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::Utc;
use tracing::{info, warn};

use thermobit_common::{ControlState, StateStore, StoreError, StoredRecord};

/// Control record kept as one JSON blob in the data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("state.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn initialize(&mut self) -> Result<ControlState, StoreError> {
        let state = ControlState::new(Utc::now());
        self.put(&state)?;
        info!("initialized control state at {}", self.path.display());
        Ok(state)
    }

    fn decode(raw: &[u8]) -> Result<ControlState, StoreError> {
        let record: StoredRecord = serde_json::from_slice(raw)?;
        ControlState::from_record(&record, Utc::now())
    }
}

impl StateStore for FileStore {
    fn get(&mut self) -> Result<ControlState, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return self.initialize(),
            Err(err) => return Err(err.into()),
        };

        match Self::decode(&raw) {
            Ok(state) => Ok(state),
            Err(err) => {
                // Keep the unreadable record for inspection and start over.
                let aside = self.path.with_extension("json.bad");
                warn!(
                    "discarding unreadable control state {}: {err}; moved to {}",
                    self.path.display(),
                    aside.display()
                );
                fs::rename(&self.path, &aside)?;
                self.initialize()
            }
        }
    }

    fn put(&mut self, state: &ControlState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write aside and rename so a crash never leaves a torn record.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&state.to_record())?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use thermobit_common::{HeaterService, ServerConfig, IDLE_SET_TEMP};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "thermobit-store-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn creates_record_on_first_get() {
        let dir = scratch_dir("first");
        let mut store = FileStore::new(&dir);

        let state = store.get().unwrap();

        assert_eq!(state.set_temp, IDLE_SET_TEMP);
        assert!(store.path().exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn put_then_get_survives_reopen() {
        let dir = scratch_dir("reopen");
        let mut store = FileStore::new(&dir);
        let mut state = store.get().unwrap();
        state.current_temp = 33;
        state.set_temp = 48;
        state.start_hour = Some(19);
        state.start_min = Some(10);
        state.new_day = true;
        state.set_temp_time = Utc.with_ymd_and_hms(2026, 1, 7, 19, 11, 0).unwrap();
        store.put(&state).unwrap();

        let mut reopened = FileStore::new(&dir);
        assert_eq!(reopened.get().unwrap(), state);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unreadable_record_is_replaced_with_defaults() {
        let dir = scratch_dir("corrupt");
        fs::create_dir_all(&dir).unwrap();
        for (name, raw) in [
            ("json", r#"{"set_temp": 5}"#),
            ("range", r#"{"last_day":{"type":"integer","value":-1}}"#),
            ("tag", r#"{"new_day":{"type":"integer","value":1}}"#),
        ] {
            fs::write(dir.join("state.json"), raw).unwrap();

            let state = FileStore::new(&dir).get().unwrap();

            assert_eq!(state.set_temp, IDLE_SET_TEMP, "{name}");
            assert_eq!(fs::read_to_string(dir.join("state.json.bad")).unwrap(), raw);
        }
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn protocol_recovers_after_corruption() {
        let dir = scratch_dir("recover");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("state.json"),
            r#"{"last_day":{"type":"integer","value":-1}}"#,
        )
        .unwrap();
        let mut service = HeaterService::new(FileStore::new(&dir), &ServerConfig::default());
        let now = Utc.with_ymd_and_hms(2026, 1, 7, 12, 0, 0).unwrap();

        let signed = service.poll(25_564_181, &now).unwrap();
        assert_eq!(signed.heater.set_temp, IDLE_SET_TEMP);
        assert!(signed.verify());

        service.ingest_reading(21).unwrap();
        assert_eq!(service.set_target(40, now).unwrap(), Some(40));
        let state = FileStore::new(&dir).get().unwrap();
        assert_eq!((state.current_temp, state.set_temp), (21, 40));
        fs::remove_dir_all(&dir).unwrap();
    }
}
