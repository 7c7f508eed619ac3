use std::{io::ErrorKind, path::PathBuf};

use chrono::{DateTime, TimeZone};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};

use thermobit_common::{
    templog::{format_line, parse_log, LOG_HEADER},
    TemperatureSample,
};

/// Append-only file of unit readings.
#[derive(Debug)]
pub struct TempLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TempLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub async fn append<Tz: TimeZone>(&self, now: &DateTime<Tz>, temp: i32) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        if file.metadata().await?.len() == 0 {
            file.write_all(LOG_HEADER.as_bytes()).await?;
        }
        file.write_all(format_line(now, temp).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    pub async fn samples(&self) -> anyhow::Result<Vec<TemperatureSample>> {
        let _guard = self.lock.lock().await;
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(parse_log(&contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[tokio::test]
    async fn appends_under_a_single_header() {
        let dir = std::env::temp_dir().join(format!("thermobit-log-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let log = TempLog::new(dir.join("temp_log.txt"));
        let tz = FixedOffset::east_opt(0).unwrap();

        assert!(log.samples().await.unwrap().is_empty());

        log.append(&tz.with_ymd_and_hms(2026, 1, 7, 6, 0, 0).unwrap(), 28)
            .await
            .unwrap();
        log.append(&tz.with_ymd_and_hms(2026, 1, 7, 6, 15, 0).unwrap(), 29)
            .await
            .unwrap();

        let contents = std::fs::read_to_string(dir.join("temp_log.txt")).unwrap();
        assert_eq!(contents.matches("year").count(), 1);
        assert!(contents.ends_with("2026\t01\t07\t06\t15\t29\n"));

        let samples = log.samples().await.unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].temp, 29);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
