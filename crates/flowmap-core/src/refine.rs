use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{ArchetypeAssignment, TrafficProfile};
use crate::services::MESSAGING_PROTOCOLS;

const SOA: &str = "SOA";
const SOA_WITH_BROKER: &str = "SOA with Message Broker";

/// Controls the post-selection remap of "SOA" assignments.
///
/// The evidence path always runs: an application assigned SOA whose own
/// traffic shows messaging protocols becomes "SOA with Message Broker".
/// The probabilistic path (the observed-in-the-wild 30% remap) is opt-in and
/// fully seeded, so a given (seed, input) pair always produces the same
/// output.
#[derive(Debug, Clone)]
pub struct RemapPolicy {
    pub enabled: bool,
    pub seed: u64,
    pub probability: f64,
}

impl Default for RemapPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            seed: 0,
            probability: 0.3,
        }
    }
}

impl RemapPolicy {
    pub fn seeded(seed: u64) -> Self {
        Self {
            enabled: true,
            seed,
            probability: 0.3,
        }
    }
}

/// Refine assignments in place. Assignments are visited in their existing
/// order (alphabetical by application, as produced by the classifier), which
/// is what keeps the seeded path reproducible.
pub fn refine_assignments(
    assignments: &mut [ArchetypeAssignment],
    profiles: &BTreeMap<String, TrafficProfile>,
    policy: &RemapPolicy,
) {
    let mut rng = StdRng::seed_from_u64(policy.seed);
    let mut remapped = 0usize;

    for assignment in assignments.iter_mut() {
        if assignment.archetype != SOA {
            continue;
        }

        let has_messaging = profiles
            .get(&assignment.application)
            .map(|p| {
                p.protocols
                    .iter()
                    .any(|proto| MESSAGING_PROTOCOLS.contains(&proto.as_str()))
            })
            .unwrap_or(false);

        if has_messaging {
            assignment.archetype = SOA_WITH_BROKER.to_string();
            remapped += 1;
        } else if policy.enabled && rng.gen::<f64>() < policy.probability {
            assignment.archetype = SOA_WITH_BROKER.to_string();
            remapped += 1;
        }
    }

    if remapped > 0 {
        tracing::info!(remapped, "archetype refinement remapped SOA assignments");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssignmentMethod;

    fn soa_assignment(app: &str) -> ArchetypeAssignment {
        ArchetypeAssignment {
            application: app.into(),
            archetype: SOA.into(),
            score: 50.0,
            runner_up: None,
            method: AssignmentMethod::Score,
        }
    }

    fn profile_with(app: &str, protocols: &[&str]) -> TrafficProfile {
        TrafficProfile {
            application: app.into(),
            protocols: protocols.iter().map(|p| p.to_string()).collect(),
            ..TrafficProfile::default()
        }
    }

    #[test]
    fn messaging_evidence_remaps_deterministically() {
        let mut assignments = vec![soa_assignment("bus")];
        let mut profiles = BTreeMap::new();
        profiles.insert("bus".to_string(), profile_with("bus", &["SOAP", "AMQP"]));

        refine_assignments(&mut assignments, &profiles, &RemapPolicy::default());
        assert_eq!(assignments[0].archetype, SOA_WITH_BROKER);
    }

    #[test]
    fn disabled_policy_never_remaps_without_evidence() {
        let mut assignments = vec![soa_assignment("plain")];
        let mut profiles = BTreeMap::new();
        profiles.insert("plain".to_string(), profile_with("plain", &["SOAP"]));

        refine_assignments(&mut assignments, &profiles, &RemapPolicy::default());
        assert_eq!(assignments[0].archetype, SOA);
    }

    #[test]
    fn seeded_remap_is_reproducible() {
        let profiles: BTreeMap<String, TrafficProfile> = (0..20)
            .map(|i| {
                let app = format!("app{:02}", i);
                (app.clone(), profile_with(&app, &["SOAP"]))
            })
            .collect();

        let run = |seed: u64| -> Vec<String> {
            let mut assignments: Vec<ArchetypeAssignment> =
                (0..20).map(|i| soa_assignment(&format!("app{:02}", i))).collect();
            refine_assignments(&mut assignments, &profiles, &RemapPolicy::seeded(seed));
            assignments.into_iter().map(|a| a.archetype).collect()
        };

        assert_eq!(run(7), run(7));
    }

    #[test]
    fn non_soa_assignments_are_untouched() {
        let mut assignments = vec![ArchetypeAssignment {
            application: "web".into(),
            archetype: "Web-Centric".into(),
            score: 40.0,
            runner_up: None,
            method: AssignmentMethod::Score,
        }];
        refine_assignments(&mut assignments, &BTreeMap::new(), &RemapPolicy::seeded(1));
        assert_eq!(assignments[0].archetype, "Web-Centric");
    }
}
