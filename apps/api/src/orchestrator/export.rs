//! Run report export: one JSON document, or CSV with one row per prospect.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Company, Delivery, DeliveryStatus, Prospect, RunStatus};
use crate::orchestrator::session::Session;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer error: {0}")]
    Buffer(String),

    #[error("CSV output was not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format '{other}' (expected json or csv)")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProspectRecord {
    pub index: usize,
    #[serde(flatten)]
    pub prospect: Prospect,
    pub delivery: Option<Delivery>,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub session_id: Uuid,
    pub goal: String,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub exported_at: DateTime<Utc>,
    pub summary: RunStatus,
    pub companies: Vec<Company>,
    pub prospects: Vec<ProspectRecord>,
}

impl RunReport {
    pub fn from_session(session: &Session) -> Self {
        let state = session.lock();
        let prospects = state
            .prospects
            .iter()
            .enumerate()
            .map(|(index, p)| ProspectRecord {
                index,
                prospect: p.clone(),
                delivery: state.delivery(index).cloned(),
            })
            .collect();

        RunReport {
            session_id: session.id(),
            goal: state.profile.goal.clone(),
            started_at: state.started_at,
            finished_at: state.finished_at,
            exported_at: Utc::now(),
            summary: state.status(),
            companies: state.companies.clone(),
            prospects,
        }
    }

    pub fn render(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            ExportFormat::Csv => self.to_csv(),
        }
    }

    fn to_csv(&self) -> Result<String, ExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in &self.prospects {
            writer.serialize(CsvRow::from(record))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ExportError::Buffer(e.to_string()))?;
        Ok(String::from_utf8(bytes)?)
    }
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    index: usize,
    first_name: &'a str,
    last_name: &'a str,
    company_name: &'a str,
    company_domain: Option<&'a str>,
    job_title: Option<&'a str>,
    linkedin_profile: Option<&'a str>,
    email: Option<&'a str>,
    email_confidence: Option<u8>,
    delivery_status: &'static str,
    delivery_detail: &'a str,
    dry_run: bool,
}

impl<'a> From<&'a ProspectRecord> for CsvRow<'a> {
    fn from(record: &'a ProspectRecord) -> Self {
        let p = &record.prospect;
        let delivery = record.delivery.as_ref();
        CsvRow {
            index: record.index,
            first_name: &p.first_name,
            last_name: &p.last_name,
            company_name: &p.company_name,
            company_domain: p.company_domain.as_deref(),
            job_title: p.job_title.as_deref(),
            linkedin_profile: p.linkedin_profile.as_deref(),
            email: p.email.as_deref(),
            email_confidence: p.email_confidence,
            delivery_status: match delivery.map(|d| d.status) {
                Some(DeliveryStatus::Sent) => "sent",
                Some(DeliveryStatus::Failed) => "failed",
                Some(DeliveryStatus::Skipped) => "skipped",
                None => "pending",
            },
            delivery_detail: delivery.map(|d| d.detail.as_str()).unwrap_or_default(),
            dry_run: delivery.is_some_and(|d| d.dry_run),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunPhase;

    fn session_with_results() -> Session {
        let session = Session::new();
        {
            let mut state = session.lock();
            state.phase = RunPhase::Done;
            state.profile.goal = "Rust Engineer".into();
            state.companies = vec![Company::new("Acme")];

            let mut jane = Prospect::new("Jane", "Doe", "Acme, Inc.");
            jane.email = Some("jane@acme.com".into());
            jane.email_confidence = Some(91);
            state.prospects = vec![jane, Prospect::new("John", "Roe", "Acme")];
            state.deliveries = vec![
                Some(Delivery {
                    index: 0,
                    email: Some("jane@acme.com".into()),
                    status: DeliveryStatus::Sent,
                    detail: "sent".into(),
                    dry_run: false,
                    subject: Some("Hi".into()),
                    body: Some("Body".into()),
                }),
                None,
            ];
        }
        session
    }

    #[test]
    fn test_json_report_contains_summary_and_deliveries() {
        let report = RunReport::from_session(&session_with_results());
        let json: serde_json::Value =
            serde_json::from_str(&report.render(ExportFormat::Json).unwrap()).unwrap();

        assert_eq!(json["goal"], "Rust Engineer");
        assert_eq!(json["summary"]["emails_sent"], 1);
        assert_eq!(json["summary"]["phase"], "done");
        assert_eq!(json["prospects"][0]["first_name"], "Jane");
        assert_eq!(json["prospects"][0]["delivery"]["status"], "sent");
        assert!(json["prospects"][1]["delivery"].is_null());
    }

    #[test]
    fn test_csv_has_one_row_per_prospect() {
        let report = RunReport::from_session(&session_with_results());
        let csv = report.render(ExportFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("index,first_name,last_name,company_name"));
        assert!(lines[1].contains("\"Acme, Inc.\""));
        assert!(lines[1].contains("jane@acme.com,91,sent,sent,false"));
        assert!(lines[2].ends_with(",pending,,false"));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::Json.extension(), "json");
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
