use std::collections::{BTreeMap, BTreeSet};

use crate::archetypes::{
    ARCHETYPES, DATABASE_BONUS, DB_PORT_MIN_MATCHES, DEFAULT_ARCHETYPE, FAN_OUT_BONUS,
    FAN_OUT_MIN_DESTINATIONS, MESSAGING_BONUS, MIN_SCORE_THRESHOLD, PORT_MATCH_WEIGHT,
    PROTOCOL_MATCH_WEIGHT, TERMINAL_BONUS,
};
use crate::models::{
    ApplicationScoreboard, ArchetypeAssignment, AssignmentMethod, FlowRecord, ServiceCategory,
    TrafficProfile,
};
use crate::services::{self, DB_PORTS, MESSAGING_PROTOCOLS, TERMINAL_PORTS};

/// Coarse category -> archetype table for the fallback classifier.
const CATEGORY_ARCHETYPES: &[(ServiceCategory, &str)] = &[
    (ServiceCategory::Database, "Database-Centric"),
    (ServiceCategory::Messaging, "Event-Driven"),
    (ServiceCategory::Web, "Web-Centric"),
    (ServiceCategory::Terminal, "Host-Terminal"),
    (ServiceCategory::RemoteAccess, "Client-Server"),
    (ServiceCategory::Mail, "Client-Server"),
    (ServiceCategory::FileTransfer, "Client-Server"),
    (ServiceCategory::Directory, "3-Tier"),
    (ServiceCategory::Cache, "Database-Centric"),
];

// ---------------------------------------------------------------------------
// Profile aggregation
// ---------------------------------------------------------------------------

/// Aggregate one application's records into the statistics the scoring rules
/// consume. Missing fields degrade to empty sets and zero counts; this path
/// never fails.
pub fn build_profile(application: &str, records: &[&FlowRecord]) -> TrafficProfile {
    let mut profile = TrafficProfile {
        application: application.to_string(),
        record_count: records.len(),
        ..TrafficProfile::default()
    };

    let mut sources = BTreeSet::new();
    let mut destinations = BTreeSet::new();
    let mut bytes_in_total = 0u64;
    let mut bytes_out_total = 0u64;

    for rec in records {
        if !rec.protocol.is_empty() {
            profile.protocols.insert(rec.protocol.clone());
        }
        if let Some(port) = rec.port {
            profile.ports.insert(port);
        }
        if !rec.source.is_empty() {
            sources.insert(rec.source.identifier.as_str());
        }
        if !rec.destination.is_empty() {
            destinations.insert(rec.destination.identifier.as_str());
        }
        bytes_in_total += rec.bytes_in;
        bytes_out_total += rec.bytes_out;
    }

    profile.distinct_sources = sources.len();
    profile.distinct_destinations = destinations.len();
    if !records.is_empty() {
        profile.mean_bytes_in = bytes_in_total as f64 / records.len() as f64;
        profile.mean_bytes_out = bytes_out_total as f64 / records.len() as f64;
    }
    profile
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Score one application's profile against every archetype definition.
///
/// Base score: protocol matches x 5, port matches x 3. Qualitative boosts are
/// flat constants applied at most once each, and only when the base score is
/// non-zero -- a profile with zero protocol and port matches everywhere must
/// produce an all-zero scoreboard. The sum is then multiplied by the
/// archetype's priority weight. Deterministic: same profile, same scores.
pub fn score_application(profile: &TrafficProfile) -> ApplicationScoreboard {
    let mut board = ApplicationScoreboard::new(profile.application.as_str());

    let profile_has_messaging = profile
        .protocols
        .iter()
        .any(|p| MESSAGING_PROTOCOLS.contains(&p.as_str()));
    let db_port_matches = profile
        .ports
        .iter()
        .filter(|p| DB_PORTS.contains(*p))
        .count();
    let profile_has_terminal = profile.ports.iter().any(|p| TERMINAL_PORTS.contains(p));

    for def in ARCHETYPES {
        let protocol_matches = profile
            .protocols
            .iter()
            .filter(|p| def.has_protocol(p))
            .count();
        let port_matches = profile.ports.iter().filter(|p| def.has_port(**p)).count();

        let mut score = protocol_matches as f64 * PROTOCOL_MATCH_WEIGHT
            + port_matches as f64 * PORT_MATCH_WEIGHT;

        if score > 0.0 {
            if def.high_fan_out && profile.distinct_destinations >= FAN_OUT_MIN_DESTINATIONS {
                score += FAN_OUT_BONUS;
            }
            if profile_has_messaging
                && def.protocols.iter().any(|p| MESSAGING_PROTOCOLS.contains(p))
            {
                score += MESSAGING_BONUS;
            }
            if db_port_matches >= DB_PORT_MIN_MATCHES
                && def.ports.iter().any(|p| DB_PORTS.contains(p))
            {
                score += DATABASE_BONUS;
            }
            if def.terminal_ports && profile_has_terminal {
                score += TERMINAL_BONUS;
            }
        }

        board
            .scores
            .insert(def.name.to_string(), score * def.priority_weight as f64);
    }

    board
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Pick exactly one archetype for an application. Never fails: the score
/// path wins above the threshold, the dominant-service-category vote runs
/// below it, and the global default covers everything else.
pub fn select_archetype(
    board: &ApplicationScoreboard,
    records: &[&FlowRecord],
) -> ArchetypeAssignment {
    if let Some((name, score)) = board.top() {
        if score > MIN_SCORE_THRESHOLD {
            return ArchetypeAssignment {
                application: board.application.clone(),
                archetype: name.to_string(),
                score,
                runner_up: board.runner_up().map(|(n, s)| (n.to_string(), s)),
                method: AssignmentMethod::Score,
            };
        }
    }

    if let Some(archetype) = dominant_category_archetype(records) {
        return ArchetypeAssignment {
            application: board.application.clone(),
            archetype: archetype.to_string(),
            score: board.top().map(|(_, s)| s).unwrap_or(0.0),
            runner_up: None,
            method: AssignmentMethod::CategoryVote,
        };
    }

    ArchetypeAssignment {
        application: board.application.clone(),
        archetype: DEFAULT_ARCHETYPE.to_string(),
        score: board.top().map(|(_, s)| s).unwrap_or(0.0),
        runner_up: None,
        method: AssignmentMethod::Default,
    }
}

/// Majority vote over the service categories of an application's records,
/// mapped through the category->archetype table. Alphabetical tie-break.
fn dominant_category_archetype(records: &[&FlowRecord]) -> Option<&'static str> {
    let mut votes: BTreeMap<&'static str, usize> = BTreeMap::new();
    for rec in records {
        let category = services::lookup_service(&rec.protocol, rec.port).category;
        if let Some((_, archetype)) = CATEGORY_ARCHETYPES.iter().find(|(c, _)| *c == category) {
            *votes.entry(archetype).or_insert(0) += 1;
        }
    }

    let mut best: Option<(&'static str, usize)> = None;
    for (archetype, count) in votes {
        match best {
            Some((_, c)) if count <= c => {}
            _ => best = Some((archetype, count)),
        }
    }
    best.map(|(archetype, _)| archetype)
}

// ---------------------------------------------------------------------------
// Batch classification
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ClassificationOutcome {
    pub assignments: Vec<ArchetypeAssignment>,
    pub scoreboards: Vec<ApplicationScoreboard>,
    pub profiles: BTreeMap<String, TrafficProfile>,
}

/// Classify every application in the record set. Every application with at
/// least one record receives exactly one assignment; applications are
/// processed in name order so output is stable.
pub fn classify_all(records: &[FlowRecord]) -> ClassificationOutcome {
    let mut by_app: BTreeMap<&str, Vec<&FlowRecord>> = BTreeMap::new();
    for rec in records {
        by_app.entry(rec.application.as_str()).or_default().push(rec);
    }

    let mut outcome = ClassificationOutcome::default();
    for (app, recs) in &by_app {
        let profile = build_profile(app, recs);
        let board = score_application(&profile);
        let assignment = select_archetype(&board, recs);
        outcome.profiles.insert(app.to_string(), profile);
        outcome.scoreboards.push(board);
        outcome.assignments.push(assignment);
    }

    tracing::info!(
        applications = outcome.assignments.len(),
        "classification complete"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Endpoint;

    fn record(app: &str, src: &str, dst: &str, proto: &str, port: Option<u16>) -> FlowRecord {
        FlowRecord {
            application: app.into(),
            source: Endpoint::bare(src),
            destination: Endpoint::bare(dst),
            protocol: proto.into(),
            port,
            bytes_in: 0,
            bytes_out: 0,
            service_info: None,
            row_index: 0,
        }
    }

    #[test]
    fn database_ports_and_protocol_score_highest_under_database_centric() {
        let recs = vec![
            record("orders", "10.0.0.1", "10.0.0.50", "MYSQL", Some(3306)),
            record("orders", "10.0.0.1", "10.0.0.51", "MYSQL", Some(5432)),
        ];
        let refs: Vec<&FlowRecord> = recs.iter().collect();
        let profile = build_profile("orders", &refs);
        let board = score_application(&profile);

        let (top, score) = board.top().unwrap();
        assert_eq!(top, "Database-Centric");
        // 1 protocol match, 2 port matches, database boost, priority weight 9.
        let expected =
            (PROTOCOL_MATCH_WEIGHT + 2.0 * PORT_MATCH_WEIGHT + DATABASE_BONUS) * 9.0;
        assert_eq!(score, expected);

        let assignment = select_archetype(&board, &refs);
        assert_eq!(assignment.archetype, "Database-Centric");
        assert_eq!(assignment.method, AssignmentMethod::Score);
    }

    #[test]
    fn telnet_only_traffic_lands_on_host_terminal() {
        let recs = vec![record("legacy", "10.0.0.2", "10.0.0.90", "TCP", Some(23))];
        let refs: Vec<&FlowRecord> = recs.iter().collect();
        let board = score_application(&build_profile("legacy", &refs));

        let assignment = select_archetype(&board, &refs);
        assert_eq!(assignment.archetype, "Host-Terminal");
        // Port match plus terminal boost, priority weight 8.
        assert_eq!(
            assignment.score,
            (PORT_MATCH_WEIGHT + TERMINAL_BONUS) * 8.0
        );
    }

    #[test]
    fn zero_matches_everywhere_yields_all_zero_scores_and_default() {
        let recs = vec![record("odd", "10.0.0.3", "10.0.0.4", "GOPHER", Some(70))];
        let refs: Vec<&FlowRecord> = recs.iter().collect();
        let board = score_application(&build_profile("odd", &refs));

        assert!(board.scores.values().all(|s| *s == 0.0));
        let assignment = select_archetype(&board, &refs);
        assert_eq!(assignment.archetype, DEFAULT_ARCHETYPE);
        assert_eq!(assignment.method, AssignmentMethod::Default);
    }

    #[test]
    fn boosts_never_fire_without_a_base_match() {
        // Three distinct destinations would earn the fan-out boost, but no
        // archetype matches port 49152, so every score must stay zero.
        let recs = vec![
            record("fanout", "10.0.0.5", "10.0.1.1", "", Some(49152)),
            record("fanout", "10.0.0.5", "10.0.1.2", "", Some(49152)),
            record("fanout", "10.0.0.5", "10.0.1.3", "", Some(49152)),
        ];
        let refs: Vec<&FlowRecord> = recs.iter().collect();
        let board = score_application(&build_profile("fanout", &refs));
        assert!(board.scores.values().all(|s| *s == 0.0));
    }

    #[test]
    fn under_threshold_falls_back_to_category_vote() {
        // Port 995 (POP3S) matches no archetype but votes Mail -> Client-Server.
        let recs = vec![record("mailer", "10.0.0.6", "10.0.0.99", "TCP", Some(995))];
        let refs: Vec<&FlowRecord> = recs.iter().collect();
        let board = score_application(&build_profile("mailer", &refs));

        let assignment = select_archetype(&board, &refs);
        assert_eq!(assignment.archetype, "Client-Server");
        assert_eq!(assignment.method, AssignmentMethod::CategoryVote);
    }

    #[test]
    fn scoring_is_idempotent() {
        let recs = vec![
            record("bus", "10.0.0.7", "10.0.2.1", "AMQP", Some(5672)),
            record("bus", "10.0.0.7", "10.0.2.2", "MQTT", Some(1883)),
            record("bus", "10.0.0.7", "10.0.2.3", "HTTP", Some(8080)),
        ];
        let refs: Vec<&FlowRecord> = recs.iter().collect();
        let profile = build_profile("bus", &refs);
        let first = score_application(&profile);
        let second = score_application(&profile);
        assert_eq!(first.scores, second.scores);
    }

    #[test]
    fn every_application_receives_exactly_one_assignment() {
        let recs = vec![
            record("a", "10.0.0.1", "10.0.0.2", "HTTP", Some(80)),
            record("b", "10.0.0.3", "10.0.0.4", "GOPHER", Some(70)),
            record("a", "10.0.0.1", "10.0.0.5", "HTTPS", Some(443)),
        ];
        let outcome = classify_all(&recs);
        let mut apps: Vec<&str> = outcome
            .assignments
            .iter()
            .map(|a| a.application.as_str())
            .collect();
        apps.sort_unstable();
        assert_eq!(apps, vec!["a", "b"]);
    }

    #[test]
    fn profile_means_cover_byte_counters() {
        let mut r1 = record("x", "s", "d", "HTTP", Some(80));
        r1.bytes_in = 100;
        r1.bytes_out = 300;
        let mut r2 = record("x", "s", "d2", "HTTP", Some(80));
        r2.bytes_in = 200;
        r2.bytes_out = 100;
        let recs = [r1, r2];
        let refs: Vec<&FlowRecord> = recs.iter().collect();
        let profile = build_profile("x", &refs);
        assert_eq!(profile.mean_bytes_in, 150.0);
        assert_eq!(profile.mean_bytes_out, 200.0);
        assert_eq!(profile.distinct_destinations, 2);
    }
}
