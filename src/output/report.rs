//! Collection reports for jobs and fleets
//!
//! A job report attributes each collector's items to the job that admitted
//! them. Collectors can be shared between jobs, so the percentage is this
//! job's contribution relative to the collector's total across all jobs.

use crate::state::JobState;
use chrono::{DateTime, Utc};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One collector's line in a job report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorShare {
    /// Collector (descriptor) name
    pub name: String,

    /// Items admitted by the reporting job
    pub contributed: u64,

    /// Items admitted by every job sharing the collector
    pub total: u64,

    /// Collection limit, `None` when unlimited
    pub limit: Option<u64>,
}

impl CollectorShare {
    /// Returns the reporting job's share of the collector total in percent
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.contributed as f64 / self.total as f64) * 100.0
        }
    }

    /// Returns true when the collector has collected its limit
    pub fn reached_limit(&self) -> bool {
        self.limit.is_some_and(|limit| self.total >= limit)
    }
}

impl fmt::Display for CollectorShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let limit = match self.limit {
            Some(limit) => limit.to_string(),
            None => "unlimited".to_string(),
        };
        write!(
            f,
            "{}: {} of {} ({:.1}%), limit {}",
            self.name,
            self.contributed,
            self.total,
            self.percentage(),
            limit
        )
    }
}

/// Snapshot of one job's progress
#[derive(Debug, Clone)]
pub struct JobReport {
    pub id: u64,
    pub label: String,
    pub state: JobState,
    pub workers: usize,
    pub visited: usize,
    pub unvisited: usize,
    pub collectors: Vec<CollectorShare>,
}

impl JobReport {
    /// Total items this job admitted across all of its collectors
    pub fn contributed(&self) -> u64 {
        self.collectors.iter().map(|c| c.contributed).sum()
    }
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}]", self.label, self.state)?;
        writeln!(f, "  Workers: {}", self.workers)?;
        writeln!(f, "  Visited links: {}", self.visited)?;
        writeln!(f, "  Unvisited links: {}", self.unvisited)?;
        for share in &self.collectors {
            writeln!(f, "  {}", share)?;
        }
        Ok(())
    }
}

/// Snapshot of every job managed by a fleet
#[derive(Debug, Clone)]
pub struct FleetReport {
    pub started_at: DateTime<Utc>,
    pub elapsed_seconds: u64,
    pub config_hash: Option<String>,
    pub jobs: Vec<JobReport>,
}

impl FleetReport {
    /// Formats the report as markdown
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str("# Harvest-Ripple Summary\n\n");
        md.push_str(&format!("- **Started**: {}\n", self.started_at.to_rfc3339()));
        md.push_str(&format!(
            "- **Elapsed**: {} seconds ({:.2} minutes)\n",
            self.elapsed_seconds,
            self.elapsed_seconds as f64 / 60.0
        ));
        if let Some(hash) = &self.config_hash {
            md.push_str(&format!("- **Config Hash**: {}\n", hash));
        }
        md.push('\n');

        for job in &self.jobs {
            md.push_str(&format!("## {}\n\n", job.label));
            md.push_str(&format!("- **State**: {}\n", job.state));
            md.push_str(&format!("- **Visited Links**: {}\n", job.visited));
            md.push_str(&format!("- **Unvisited Links**: {}\n\n", job.unvisited));

            if job.collectors.is_empty() {
                continue;
            }
            md.push_str("| Collector | Contributed | Total | Share | Limit |\n");
            md.push_str("|-----------|-------------|-------|-------|-------|\n");
            for share in &job.collectors {
                let limit = share
                    .limit
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "-".to_string());
                md.push_str(&format!(
                    "| {} | {} | {} | {:.1}% | {} |\n",
                    share.name,
                    share.contributed,
                    share.total,
                    share.percentage(),
                    limit
                ));
            }
            md.push('\n');
        }

        md
    }

    /// Writes the markdown report to a file, replacing any previous one
    pub fn write_markdown(&self, path: &Path) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(self.to_markdown().as_bytes())
    }
}

impl fmt::Display for FleetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Harvest Report ===")?;
        writeln!(f, "Elapsed: {}s", self.elapsed_seconds)?;
        for job in &self.jobs {
            writeln!(f)?;
            write!(f, "{}", job)?;
        }
        Ok(())
    }
}
