use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Flow records: one observed connection per input row
// ---------------------------------------------------------------------------

/// An endpoint as it appears in the flow table: an IP or hostname, plus an
/// optional hostname split out of a combined "IP(hostname)" peer string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub identifier: String,
    pub hostname: Option<String>,
}

impl Endpoint {
    pub fn bare(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            hostname: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.identifier.is_empty()
    }

    /// The most human-readable name available for this endpoint.
    pub fn display_name(&self) -> &str {
        self.hostname.as_deref().unwrap_or(&self.identifier)
    }
}

/// One observed network connection. Immutable after load; `row_index` points
/// back into the source table so enrichment output stays row-aligned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowRecord {
    pub application: String,
    pub source: Endpoint,
    pub destination: Endpoint,
    pub protocol: String,
    pub port: Option<u16>,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub service_info: Option<String>,
    pub row_index: usize,
}

// ---------------------------------------------------------------------------
// Archetype definitions: the static pattern table
// ---------------------------------------------------------------------------

/// One architectural pattern template. Loaded once at process start from the
/// built-in table and never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ArchetypeDefinition {
    pub name: &'static str,
    pub protocols: &'static [&'static str],
    pub ports: &'static [u16],
    /// Human-readable traits for reporting only; never scored.
    pub indicators: &'static [&'static str],
    pub priority_weight: u32,
    pub high_fan_out: bool,
    pub terminal_ports: bool,
}

impl ArchetypeDefinition {
    pub fn has_protocol(&self, proto: &str) -> bool {
        self.protocols.iter().any(|p| *p == proto)
    }

    pub fn has_port(&self, port: u16) -> bool {
        self.ports.contains(&port)
    }
}

// ---------------------------------------------------------------------------
// Traffic profile: per-application aggregates fed to the scorer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrafficProfile {
    pub application: String,
    pub protocols: BTreeSet<String>,
    pub ports: BTreeSet<u16>,
    pub distinct_sources: usize,
    pub distinct_destinations: usize,
    pub mean_bytes_in: f64,
    pub mean_bytes_out: f64,
    pub record_count: usize,
}

// ---------------------------------------------------------------------------
// Scoreboard and assignment: the classifier's output
// ---------------------------------------------------------------------------

/// Per-archetype accumulated scores for one application. BTreeMap so that
/// iteration order is the tie-break order: stable and alphabetical.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationScoreboard {
    pub application: String,
    pub scores: BTreeMap<String, f64>,
}

impl ApplicationScoreboard {
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            scores: BTreeMap::new(),
        }
    }

    /// Highest-scoring archetype; alphabetical order wins ties.
    pub fn top(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (name, score) in &self.scores {
            match best {
                Some((_, s)) if *score <= s => {}
                _ => best = Some((name.as_str(), *score)),
            }
        }
        best
    }

    /// Second-highest archetype, for audit output.
    pub fn runner_up(&self) -> Option<(&str, f64)> {
        let top_name = self.top()?.0.to_string();
        let mut best: Option<(&str, f64)> = None;
        for (name, score) in &self.scores {
            if name.as_str() == top_name {
                continue;
            }
            match best {
                Some((_, s)) if *score <= s => {}
                _ => best = Some((name.as_str(), *score)),
            }
        }
        best
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMethod {
    /// Top archetype score cleared the minimum threshold.
    Score,
    /// Fell back to the dominant-service-category vote.
    CategoryVote,
    /// Nothing qualified; global default archetype.
    Default,
}

/// Final output: one archetype per application, with the runner-up retained
/// for auditability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchetypeAssignment {
    pub application: String,
    pub archetype: String,
    pub score: f64,
    pub runner_up: Option<(String, f64)>,
    pub method: AssignmentMethod,
}

// ---------------------------------------------------------------------------
// Service resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Web,
    Database,
    Messaging,
    RemoteAccess,
    Terminal,
    Mail,
    FileTransfer,
    Directory,
    Cache,
    Monitoring,
    Other,
}

/// A resolved service label for a (protocol, port) pair. Resolution is total:
/// absence of data degrades to a synthesized label, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceName {
    pub name: String,
    pub category: ServiceCategory,
}

// ---------------------------------------------------------------------------
// The report: primary contract between core, CLI, and exporters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    pub flowmap_version: String,
    pub generated_at: DateTime<Utc>,
    pub input_filename: String,
    pub input_sha256: String,
    pub input_size_bytes: u64,
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub skipped_rows: usize,
    /// Seed of the probabilistic SOA remap, when enabled. Recording it here
    /// keeps every run reproducible.
    pub remap_seed: Option<u64>,
}

impl RunMetadata {
    pub fn new_run_id() -> String {
        format!("R-{}", Uuid::new_v4().as_simple())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStatistics {
    pub protocol_breakdown: HashMap<String, u64>,
    pub top_ports: Vec<(u16, u64)>,
    pub top_talkers: Vec<(String, u64)>,
    pub archetype_breakdown: BTreeMap<String, u64>,
    pub analysis_duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: RunMetadata,
    pub executive_summary: Option<String>,
    pub assignments: Vec<ArchetypeAssignment>,
    pub scoreboards: Vec<ApplicationScoreboard>,
    pub statistics: RunStatistics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoreboard_top_prefers_alphabetical_on_tie() {
        let mut board = ApplicationScoreboard::new("billing");
        board.scores.insert("Web-Centric".into(), 40.0);
        board.scores.insert("Event-Driven".into(), 40.0);
        board.scores.insert("3-Tier".into(), 10.0);

        let (name, score) = board.top().unwrap();
        assert_eq!(name, "Event-Driven");
        assert_eq!(score, 40.0);
    }

    #[test]
    fn scoreboard_runner_up_skips_winner() {
        let mut board = ApplicationScoreboard::new("billing");
        board.scores.insert("Web-Centric".into(), 90.0);
        board.scores.insert("3-Tier".into(), 30.0);

        assert_eq!(board.top().unwrap().0, "Web-Centric");
        assert_eq!(board.runner_up().unwrap(), ("3-Tier", 30.0));
    }

    #[test]
    fn endpoint_display_name_prefers_hostname() {
        let ep = Endpoint {
            identifier: "10.1.2.3".into(),
            hostname: Some("web01.corp.local".into()),
        };
        assert_eq!(ep.display_name(), "web01.corp.local");
        assert_eq!(Endpoint::bare("10.1.2.3").display_name(), "10.1.2.3");
    }
}
