use crate::config::{DataLayout, PipelineConfig};
use crate::report::{RecoverableIssue, StageReport};
use crate::retrieval::error::RetrievalError;
use crate::types::data_kind::{City, DataKind, RETRIEVAL_PAIRS};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use log::{debug, info, warn};
use reqwest::blocking::Client;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Literal body the endpoint answers with when it has nothing for a range.
const EMPTY_BODY: &str = "None";

/// Downloads raw day partitions from the competition endpoint.
pub struct RawDataFetcher {
    layout: DataLayout,
    endpoint: String,
    token: String,
    first_day: NaiveDate,
    client: Client,
}

impl RawDataFetcher {
    pub fn new(config: &PipelineConfig) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(RetrievalError::ClientBuild)?;
        Ok(Self {
            layout: config.layout(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            first_day: config.first_day,
            client,
        })
    }

    /// Path of a kind's data on the endpoint; grid data lives under meteorology.
    fn endpoint_path(&self, kind: DataKind, city: City) -> String {
        match kind {
            DataKind::Grid => format!("{}/meteorology/{}_grid", self.endpoint, city.code()),
            _ => format!("{}/{}/{}", self.endpoint, kind.path_segment(), city.code()),
        }
    }

    /// URL of one UTC day, hours 0 through 23.
    pub fn day_url(&self, kind: DataKind, city: City, day: NaiveDate) -> String {
        format!(
            "{}/{day}-0/{day}-23/{}",
            self.endpoint_path(kind, city),
            self.token,
            day = day.format("%Y-%m-%d")
        )
    }

    /// URL of everything from the first published day up to `now`'s hour.
    pub fn range_url(&self, kind: DataKind, city: City, now: NaiveDateTime) -> String {
        format!(
            "{}/{}-0/{}-{}/{}",
            self.endpoint_path(kind, city),
            self.first_day.format("%Y-%m-%d"),
            now.date().format("%Y-%m-%d"),
            now.hour(),
            self.token
        )
    }

    fn download(&self, url: &str) -> Result<String, RetrievalError> {
        debug!("Requesting {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| RetrievalError::NetworkRequest(url.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(if let Some(status) = e.status() {
                    RetrievalError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    RetrievalError::NetworkRequest(url.to_string(), e)
                });
            }
        };

        let body = response
            .text()
            .map_err(|e| RetrievalError::ResponseBody(url.to_string(), e))?;
        if body.trim() == EMPTY_BODY {
            return Err(RetrievalError::Empty(url.to_string()));
        }
        Ok(body)
    }

    /// Downloads `url` into `path`, replacing it only once the body is complete.
    fn fetch_to(&self, url: &str, path: &Path) -> Result<usize, RetrievalError> {
        let body = self.download(url)?;
        save(path, &body)?;
        let rows = body.lines().count().saturating_sub(1);
        info!("Saved {} rows to {}", rows, path.display());
        Ok(rows)
    }

    /// Fetches every missing day partition and the combined range files.
    ///
    /// Days already on disk are skipped, except `now`'s own day which is still being
    /// published. Empty and failed partitions are recorded and skipped; only local
    /// filesystem errors abort.
    pub fn retrieve_all(&self, now: NaiveDateTime) -> Result<StageReport, RetrievalError> {
        let today = now.date();
        let mut report = StageReport::new("retrieval");

        for (kind, city) in RETRIEVAL_PAIRS {
            let pending = pending_days(&self.layout, kind, city, self.first_day, today);
            let total_days = (today - self.first_day).num_days() + 1;
            report.files_reused += (total_days.max(0) as usize).saturating_sub(pending.len());
            info!(
                "{} {}: fetching {} of {} days",
                city,
                kind,
                pending.len(),
                total_days
            );

            for day in pending {
                let url = self.day_url(kind, city, day);
                let path = self.layout.raw_day_file(kind, city, day);
                let partition = format!("{} {} {}", city, kind, day);
                self.fetch_partition(&url, &path, partition, &mut report)?;
            }

            let url = self.range_url(kind, city, now);
            let path = self.layout.raw_range_file(kind, city, self.first_day, today);
            let partition = format!("{} {} {}..{}", city, kind, self.first_day, today);
            self.fetch_partition(&url, &path, partition, &mut report)?;
        }
        Ok(report)
    }

    fn fetch_partition(
        &self,
        url: &str,
        path: &Path,
        partition: String,
        report: &mut StageReport,
    ) -> Result<(), RetrievalError> {
        match self.fetch_to(url, path) {
            Ok(rows) => report.wrote(rows),
            Err(RetrievalError::Empty(_)) => {
                warn!("No data for {}", partition);
                report.record(RecoverableIssue::RetrievalEmpty { partition });
            }
            Err(e) if e.is_skippable() => {
                warn!("Skipping {}: {}", partition, e);
                report.record(RecoverableIssue::RetrievalFailed {
                    partition,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

/// Days from `first_day` through `today` that still need fetching.
///
/// A day is pending when its file is absent; `today` is always pending.
pub fn pending_days(
    layout: &DataLayout,
    kind: DataKind,
    city: City,
    first_day: NaiveDate,
    today: NaiveDate,
) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = first_day;
    while day <= today {
        if day == today || !layout.raw_day_file(kind, city, day).is_file() {
            days.push(day);
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    days
}

fn save(path: &Path, body: &str) -> Result<(), RetrievalError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| RetrievalError::DirCreation(dir.to_path_buf(), e))?;

    let mut temp_file =
        NamedTempFile::new_in(dir).map_err(|e| RetrievalError::FileWrite(path.to_path_buf(), e))?;
    temp_file
        .write_all(body.as_bytes())
        .map_err(|e| RetrievalError::FileWrite(path.to_path_buf(), e))?;
    temp_file
        .persist(path)
        .map_err(|e| RetrievalError::FileWrite(path.to_path_buf(), e.error))?;
    Ok(())
}
