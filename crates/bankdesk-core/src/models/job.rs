//! Scheduled job definitions and executions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A job registered in the scheduler's job master table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefinition {
    #[serde(rename = "jobid")]
    pub job_id: i64,
    #[serde(rename = "jobName")]
    pub job_name: String,
    pub description: Option<String>,
    #[serde(rename = "cronExpression")]
    pub cron_expression: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(rename = "apiEndpoint")]
    pub api_endpoint: Option<String>,
    #[serde(rename = "lastStatus")]
    pub last_status: Option<String>,
    #[serde(rename = "lastRunTime")]
    pub last_run_time: Option<String>,
}

impl JobDefinition {
    pub fn status_display(&self) -> &str {
        self.last_status.as_deref().unwrap_or("NEVER RUN")
    }

    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(false)
    }
}

/// Result of triggering a job run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRun {
    #[serde(rename = "seqNo")]
    pub seq_no: Option<i64>,
    #[serde(rename = "jobid")]
    pub job_id: Option<i64>,
    #[serde(rename = "jobName")]
    pub job_name: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "executionMode")]
    pub execution_mode: Option<String>,
    #[serde(rename = "processedDate")]
    pub processed_date: Option<NaiveDate>,
    #[serde(rename = "startTime")]
    pub start_time: Option<String>,
    #[serde(rename = "endTime")]
    pub end_time: Option<String>,
    pub remarks: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_job_master() {
        let json = r#"[{"jobid":3,"jobName":"Billing","description":"Monthly billing","cronExpression":"0 0 1 * *","active":true,"apiEndpoint":"/api/billing/run","lastStatus":null,"lastRunTime":null}]"#;
        let jobs: Vec<JobDefinition> = serde_json::from_str(json).unwrap();
        assert_eq!(jobs[0].job_id, 3);
        assert!(jobs[0].is_active());
        assert_eq!(jobs[0].status_display(), "NEVER RUN");
    }

    #[test]
    fn test_parse_job_run() {
        let json = r#"{"seqNo":17,"jobid":3,"jobName":"Billing","status":"COMPLETED","executionMode":"MANUAL","processedDate":"2024-06-01","startTime":"2024-06-01T10:00:00","endTime":"2024-06-01T10:00:02","remarks":null,"billingResponse":null}"#;
        let run: JobRun = serde_json::from_str(json).unwrap();
        assert_eq!(run.seq_no, Some(17));
        assert_eq!(run.status.as_deref(), Some("COMPLETED"));
        assert_eq!(
            run.processed_date,
            NaiveDate::from_ymd_opt(2024, 6, 1)
        );
    }
}
