use std::collections::HashMap;

use crate::loader::FlowTable;
use crate::models::{
    AnalysisReport, ArchetypeAssignment, AssignmentMethod, FlowRecord, RunMetadata, RunStatistics,
};
use crate::scorer::ClassificationOutcome;

/// Assemble the full report: metadata, statistics, summary, assignments.
pub fn build_report(
    table: &FlowTable,
    outcome: ClassificationOutcome,
    remap_seed: Option<u64>,
    analysis_duration_ms: u64,
) -> AnalysisReport {
    let mut statistics = compute_statistics(&table.records, &outcome.assignments);
    statistics.analysis_duration_ms = analysis_duration_ms;

    let metadata = RunMetadata {
        run_id: RunMetadata::new_run_id(),
        flowmap_version: crate::VERSION.to_string(),
        generated_at: chrono::Utc::now(),
        input_filename: table.filename.clone(),
        input_sha256: table.sha256.clone(),
        input_size_bytes: table.size_bytes,
        total_rows: table.total_rows(),
        loaded_rows: table.records.len(),
        skipped_rows: table.skipped_rows,
        remap_seed,
    };

    let summary = generate_executive_summary(&metadata, &outcome.assignments, &statistics);

    AnalysisReport {
        metadata,
        executive_summary: Some(summary),
        assignments: outcome.assignments,
        scoreboards: outcome.scoreboards,
        statistics,
    }
}

pub fn compute_statistics(
    records: &[FlowRecord],
    assignments: &[ArchetypeAssignment],
) -> RunStatistics {
    let mut stats = RunStatistics::default();

    for rec in records {
        let proto = if rec.protocol.is_empty() {
            "UNKNOWN".to_string()
        } else {
            rec.protocol.clone()
        };
        *stats.protocol_breakdown.entry(proto).or_insert(0) += 1;
    }

    let mut ports: HashMap<u16, u64> = HashMap::new();
    for rec in records {
        if let Some(port) = rec.port {
            *ports.entry(port).or_insert(0) += 1;
        }
    }
    let mut top_ports: Vec<(u16, u64)> = ports.into_iter().collect();
    top_ports.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    top_ports.truncate(20);
    stats.top_ports = top_ports;

    let mut talkers: HashMap<String, u64> = HashMap::new();
    for rec in records {
        if !rec.source.is_empty() {
            *talkers.entry(rec.source.identifier.clone()).or_insert(0) += rec.bytes_out;
        }
        if !rec.destination.is_empty() {
            *talkers.entry(rec.destination.identifier.clone()).or_insert(0) += rec.bytes_in;
        }
    }
    let mut top_talkers: Vec<(String, u64)> = talkers.into_iter().collect();
    top_talkers.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    top_talkers.truncate(20);
    stats.top_talkers = top_talkers;

    for assignment in assignments {
        *stats
            .archetype_breakdown
            .entry(assignment.archetype.clone())
            .or_insert(0) += 1;
    }

    stats
}

/// Plain-prose summary of one run, assembled sentence by sentence.
pub fn generate_executive_summary(
    metadata: &RunMetadata,
    assignments: &[ArchetypeAssignment],
    statistics: &RunStatistics,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push(format!(
        "Classified {} application(s) from {} ({} rows loaded, {} skipped).",
        assignments.len(),
        metadata.input_filename,
        metadata.loaded_rows,
        metadata.skipped_rows,
    ));

    if !statistics.archetype_breakdown.is_empty() {
        let mut breakdown: Vec<_> = statistics.archetype_breakdown.iter().collect();
        breakdown.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        let top: Vec<String> = breakdown
            .iter()
            .take(4)
            .map(|(name, count)| format!("{} ({})", name, count))
            .collect();
        parts.push(format!("Dominant archetypes: {}.", top.join(", ")));
    }

    let mut protos: Vec<_> = statistics.protocol_breakdown.iter().collect();
    protos.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    if !protos.is_empty() {
        let top: Vec<String> = protos
            .iter()
            .take(5)
            .map(|(name, count)| format!("{} ({})", name, count))
            .collect();
        parts.push(format!("Protocols observed: {}.", top.join(", ")));
    }

    let by_vote = assignments
        .iter()
        .filter(|a| a.method == AssignmentMethod::CategoryVote)
        .count();
    let by_default = assignments
        .iter()
        .filter(|a| a.method == AssignmentMethod::Default)
        .count();
    if by_vote > 0 || by_default > 0 {
        parts.push(format!(
            "{} application(s) classified via category vote and {} via the default archetype.",
            by_vote, by_default,
        ));
    }

    if let Some(seed) = metadata.remap_seed {
        parts.push(format!(
            "Probabilistic SOA remap was enabled with seed {}.",
            seed,
        ));
    }

    parts.join(" ")
}
