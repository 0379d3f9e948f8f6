//! `outreach` — runs one search → resolve → send pass locally and exports
//! the results.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use outreach_api::config::Config;
use outreach_api::models::{RunStatus, SenderProfile};
use outreach_api::orchestrator::{ExportFormat, Orchestrator, RunReport, SearchParams, Session};
use outreach_api::outreach::SendOptions;
use outreach_api::search::SearchMode;

/// Find hiring contacts for a job goal, resolve their emails and send
/// personalized outreach.
#[derive(Parser, Debug)]
#[command(name = "outreach", version, about)]
struct Args {
    /// What you are looking for, e.g. "Senior Rust Engineer"
    #[arg(long)]
    goal: String,

    /// Search LinkedIn profiles directly instead of company discovery
    #[arg(long)]
    linkedin: bool,

    /// Maximum companies to search (company mode)
    #[arg(long, default_value_t = 50)]
    max_companies: usize,

    /// Maximum prospects per company (company mode)
    #[arg(long, default_value_t = 5)]
    max_prospects: usize,

    /// Maximum LinkedIn results to process (--linkedin only)
    #[arg(long, default_value_t = 5)]
    max_linkedin_results: usize,

    /// Only keep results published in the last N days (default: RECENCY_DAYS)
    #[arg(long)]
    days: Option<u32>,

    /// Draft every email but send nothing
    #[arg(long)]
    dry_run: bool,

    /// Template file guiding the drafted emails
    #[arg(long, default_value = "templates/email_template.txt")]
    template: PathBuf,

    /// Subject line; placeholders such as {company_name} are filled in
    #[arg(long)]
    subject: Option<String>,

    /// Export format for results (json or csv)
    #[arg(long, default_value = "json")]
    export_format: ExportFormat,

    /// Export path (default: job_agent_results_<timestamp>.<ext>)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Your name, used in the signature
    #[arg(long)]
    name: Option<String>,

    /// Your email, used in the signature
    #[arg(long)]
    email: Option<String>,

    /// Your skills, given to the email writer
    #[arg(long)]
    skills: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn mode(&self) -> SearchMode {
        if self.linkedin {
            SearchMode::Linkedin {
                max_results: self.max_linkedin_results,
            }
        } else {
            SearchMode::CompanyBased {
                max_companies: self.max_companies,
                max_prospects: self.max_prospects,
            }
        }
    }

    fn profile(&self) -> SenderProfile {
        SenderProfile {
            name: self.name.clone().unwrap_or_default(),
            email: self.email.clone(),
            skills: self.skills.clone().unwrap_or_default(),
            goal: self.goal.trim().to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("outreach={level},outreach_api={level}"))),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let orchestrator =
        Orchestrator::from_config(&config).context("Failed to initialize service clients")?;
    ensure_can_send(args.dry_run, orchestrator.can_transmit())?;
    let session = Session::new();

    info!("Job Application Agent starting");
    info!("Goal: {}", args.goal);
    if args.dry_run {
        info!("DRY RUN MODE - no emails will be sent");
    }

    let status = orchestrator
        .search(
            &session,
            SearchParams {
                profile: args.profile(),
                mode: args.mode(),
                recency_days: args.days,
            },
        )
        .await?;
    print_summary("Search complete", &status);

    if status.can_send {
        let options = SendOptions {
            dry_run: args.dry_run,
            template: load_template(&args.template).await,
            subject: args.subject.clone(),
        };
        let job = orchestrator.begin_send_all(&session, options)?;
        info!("Sending {} emails...", job.len());

        let run = orchestrator.run_send_all(&session, job);
        tokio::pin!(run);
        let status = tokio::select! {
            status = &mut run => status,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, stopping after the current email...");
                if let Err(e) = orchestrator.cancel(&session) {
                    warn!("Cancel failed: {e}");
                }
                run.await
            }
        };
        print_summary("Outreach complete", &status);
    } else {
        warn!("No prospects with a resolved email, nothing to send");
    }

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(args.export_format, Local::now()));
    let report = RunReport::from_session(&session);
    write_report(&report, args.export_format, &path).await?;
    info!("Results exported to {}", path.display());

    Ok(())
}

/// Refuses a real run up front when nothing could be sent, before any search
/// or lookup quota is spent.
fn ensure_can_send(dry_run: bool, can_transmit: bool) -> Result<()> {
    if !dry_run && !can_transmit {
        anyhow::bail!("No mail transport configured: set GMAIL_ACCESS_TOKEN or pass --dry-run");
    }
    Ok(())
}

/// Reads the template. A missing or unreadable file means no template.
async fn load_template(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) if !text.trim().is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            warn!("Template file {} not usable ({e}), using default", path.display());
            None
        }
    }
}

fn default_output_path(format: ExportFormat, now: DateTime<Local>) -> PathBuf {
    PathBuf::from(format!(
        "job_agent_results_{}.{}",
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    ))
}

async fn write_report(report: &RunReport, format: ExportFormat, path: &Path) -> Result<()> {
    let document = report.render(format)?;
    tokio::fs::write(path, document)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn print_summary(title: &str, status: &RunStatus) {
    info!("{title}");
    info!("  Companies found:   {}", status.companies_found);
    info!("  Total prospects:   {}", status.total_prospects);
    info!("  Emails found:      {}", status.emails_found);
    if status.emails_sent > 0 || status.emails_failed > 0 {
        let label = if status.dry_run { "Would send" } else { "Emails sent" };
        info!("  {label}:       {}", status.emails_sent);
        info!("  Failed:            {}", status.emails_failed);
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["outreach", "--goal", " Rust Engineer "];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_company_mode_is_default() {
        let args = parse(&[]);
        assert_eq!(
            args.mode(),
            SearchMode::CompanyBased {
                max_companies: 50,
                max_prospects: 5
            }
        );
        assert_eq!(args.export_format, ExportFormat::Json);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_linkedin_flags() {
        let args = parse(&["--linkedin", "--max-linkedin-results", "8", "--export-format", "csv"]);
        assert_eq!(args.mode(), SearchMode::Linkedin { max_results: 8 });
        assert_eq!(args.export_format, ExportFormat::Csv);
    }

    #[test]
    fn test_profile_from_flags() {
        let args = parse(&["--name", "Sam", "--email", "sam@example.com", "--skills", "Rust"]);
        let profile = args.profile();
        assert_eq!(profile.goal, "Rust Engineer");
        assert_eq!(profile.name, "Sam");
        assert_eq!(profile.email.as_deref(), Some("sam@example.com"));
    }

    #[test]
    fn test_goal_is_required() {
        assert!(Args::try_parse_from(["outreach"]).is_err());
    }

    #[test]
    fn test_real_run_without_transport_stops_early() {
        assert!(ensure_can_send(false, false).is_err());
        assert!(ensure_can_send(true, false).is_ok());
        assert!(ensure_can_send(false, true).is_ok());
    }

    #[test]
    fn test_default_output_path() {
        let now = Local.with_ymd_and_hms(2026, 10, 17, 9, 5, 3).unwrap();
        assert_eq!(
            default_output_path(ExportFormat::Csv, now),
            PathBuf::from("job_agent_results_20261017_090503.csv")
        );
    }

    #[tokio::test]
    async fn test_missing_template_falls_back_to_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_template(&dir.path().join("missing.txt")).await.is_none());

        let path = dir.path().join("template.txt");
        std::fs::write(&path, "Mention {company_name}").unwrap();
        assert_eq!(load_template(&path).await.as_deref(), Some("Mention {company_name}"));
    }

    #[tokio::test]
    async fn test_write_report_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let report = RunReport::from_session(&Session::new());

        write_report(&report, ExportFormat::Json, &path).await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"summary\""));
    }
}
