use crate::models::ArchetypeDefinition;

// Scoring constants. Base weights per match, flat bonuses applied at most
// once per rule per application, and the selection threshold.
pub const PROTOCOL_MATCH_WEIGHT: f64 = 5.0;
pub const PORT_MATCH_WEIGHT: f64 = 3.0;
pub const FAN_OUT_BONUS: f64 = 10.0;
pub const MESSAGING_BONUS: f64 = 15.0;
pub const DATABASE_BONUS: f64 = 12.0;
pub const TERMINAL_BONUS: f64 = 8.0;
pub const MIN_SCORE_THRESHOLD: f64 = 10.0;
pub const FAN_OUT_MIN_DESTINATIONS: usize = 3;
pub const DB_PORT_MIN_MATCHES: usize = 2;

pub const DEFAULT_ARCHETYPE: &str = "3-Tier";

/// The static pattern table. Never mutated; tie-breaks between entries are
/// resolved alphabetically by the selector, not by position here.
pub const ARCHETYPES: &[ArchetypeDefinition] = &[
    ArchetypeDefinition {
        name: "3-Tier",
        protocols: &["HTTP", "HTTPS", "TDS"],
        ports: &[80, 443, 8080, 1433],
        indicators: &[
            "distinct presentation, logic, and data tiers",
            "client traffic terminates at a web tier",
        ],
        priority_weight: 3,
        high_fan_out: false,
        terminal_ports: false,
    },
    ArchetypeDefinition {
        name: "Client-Server",
        protocols: &["SMB", "RDP", "TDS"],
        ports: &[445, 3389, 1433, 5900],
        indicators: &[
            "fat clients talking directly to shared servers",
            "file shares or remote desktop sessions",
        ],
        priority_weight: 2,
        high_fan_out: false,
        terminal_ports: false,
    },
    ArchetypeDefinition {
        name: "Database-Centric",
        protocols: &["MYSQL", "POSTGRES", "TDS", "ORACLE", "MONGODB", "REDIS", "DB2"],
        ports: &[3306, 5432, 1433, 1521, 27017, 6379, 50000],
        indicators: &[
            "multiple clients converge on shared database engines",
            "data-tier traffic dominates the profile",
        ],
        priority_weight: 9,
        high_fan_out: false,
        terminal_ports: false,
    },
    ArchetypeDefinition {
        name: "Event-Driven",
        protocols: &["AMQP", "MQTT", "KAFKA", "STOMP", "JMS"],
        ports: &[5672, 1883, 9092, 61613, 61616],
        indicators: &[
            "producers and consumers decoupled by a broker",
            "asynchronous message traffic",
        ],
        priority_weight: 6,
        high_fan_out: true,
        terminal_ports: false,
    },
    ArchetypeDefinition {
        name: "Host-Terminal",
        protocols: &["TELNET", "TN3270", "SSH"],
        ports: &[23, 992, 3270, 5250, 22],
        indicators: &[
            "interactive terminal sessions into a central host",
            "green-screen or shell access patterns",
        ],
        priority_weight: 8,
        high_fan_out: false,
        terminal_ports: true,
    },
    ArchetypeDefinition {
        name: "Mainframe",
        protocols: &["TN3270", "MQ"],
        ports: &[3270, 1414, 992, 5250],
        indicators: &[
            "3270/5250 terminal emulation",
            "MQ channels into a central complex",
        ],
        priority_weight: 7,
        high_fan_out: false,
        terminal_ports: true,
    },
    ArchetypeDefinition {
        name: "Microservices",
        protocols: &["HTTP", "HTTPS", "GRPC"],
        ports: &[8080, 8443, 3000, 5000, 8000, 9090, 50051],
        indicators: &[
            "many small services on ephemeral high ports",
            "dense east-west call graph",
        ],
        priority_weight: 5,
        high_fan_out: true,
        terminal_ports: false,
    },
    ArchetypeDefinition {
        name: "SOA",
        protocols: &["HTTP", "HTTPS", "SOAP", "JMS"],
        ports: &[8080, 8443, 7001, 9080],
        indicators: &[
            "coarse-grained services behind an enterprise bus",
            "SOAP or application-server endpoints",
        ],
        priority_weight: 5,
        high_fan_out: true,
        terminal_ports: false,
    },
    ArchetypeDefinition {
        name: "SOA with Message Broker",
        protocols: &["SOAP", "JMS", "AMQP", "MQTT"],
        ports: &[5672, 61616, 7001, 9080],
        indicators: &[
            "service bus fronted by a message broker",
            "mixed synchronous and queued traffic",
        ],
        priority_weight: 6,
        high_fan_out: true,
        terminal_ports: false,
    },
    ArchetypeDefinition {
        name: "Web-Centric",
        protocols: &["HTTP", "HTTPS"],
        ports: &[80, 443, 8080, 8443],
        indicators: &[
            "browser-facing traffic dominates",
            "little or no backend fan-out observed",
        ],
        priority_weight: 4,
        high_fan_out: false,
        terminal_ports: false,
    },
];

pub fn find(name: &str) -> Option<&'static ArchetypeDefinition> {
    ARCHETYPES.iter().find(|a| a.name == name)
}
