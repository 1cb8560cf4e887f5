use crate::models::{ServiceCategory, ServiceName};

// ---------------------------------------------------------------------------
// Static lookup tables
// ---------------------------------------------------------------------------

/// Exact "PROTOCOL:PORT" composite matches, consulted before the bare port
/// table. Lets e.g. UDP:53 and TCP:53 resolve to distinct labels if needed.
const COMPOSITE_SERVICES: &[(&str, &str)] = &[
    ("TCP:20", "FTP Data"),
    ("TCP:21", "FTP Control"),
    ("TCP:22", "SSH"),
    ("TCP:23", "Telnet"),
    ("TCP:25", "SMTP"),
    ("UDP:53", "DNS"),
    ("TCP:53", "DNS Zone Transfer"),
    ("UDP:123", "NTP"),
    ("UDP:161", "SNMP"),
    ("UDP:514", "Syslog"),
    ("TCP:992", "Telnet over TLS"),
    ("TCP:1414", "IBM MQ"),
    ("TCP:3270", "TN3270"),
    ("TCP:5250", "TN5250"),
];

/// Well-known ports, protocol-agnostic.
const WELL_KNOWN_PORTS: &[(u16, &str)] = &[
    (20, "FTP Data"),
    (21, "FTP"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (80, "HTTP"),
    (88, "Kerberos"),
    (110, "POP3"),
    (123, "NTP"),
    (135, "MS RPC"),
    (139, "NetBIOS"),
    (143, "IMAP"),
    (161, "SNMP"),
    (389, "LDAP"),
    (443, "HTTPS"),
    (445, "SMB"),
    (465, "SMTPS"),
    (514, "Syslog"),
    (587, "SMTP Submission"),
    (636, "LDAPS"),
    (992, "Telnet over TLS"),
    (993, "IMAPS"),
    (995, "POP3S"),
    (1414, "IBM MQ"),
    (1433, "MS SQL Server"),
    (1521, "Oracle"),
    (1883, "MQTT"),
    (2049, "NFS"),
    (3268, "AD Global Catalog"),
    (3270, "TN3270"),
    (3306, "MySQL"),
    (3389, "RDP"),
    (5250, "TN5250"),
    (5432, "PostgreSQL"),
    (5672, "AMQP"),
    (5900, "VNC"),
    (6379, "Redis"),
    (8080, "HTTP Proxy"),
    (8443, "HTTPS Alt"),
    (9092, "Kafka"),
    (9200, "Elasticsearch"),
    (11211, "Memcached"),
    (27017, "MongoDB"),
    (50000, "DB2"),
    (61616, "ActiveMQ"),
];

/// Protocol strings the scorer treats as messaging traffic.
pub const MESSAGING_PROTOCOLS: &[&str] = &["AMQP", "MQTT", "KAFKA", "STOMP", "JMS", "MSMQ"];

/// Database engine ports consulted by the database-centric boost.
pub const DB_PORTS: &[u16] = &[1433, 1521, 3306, 5432, 5984, 6379, 9042, 27017, 50000];

/// Terminal-emulation ports consulted by the terminal-traffic boost.
pub const TERMINAL_PORTS: &[u16] = &[23, 992, 3270, 5250];

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Resolve a best-effort service name for a (protocol, port) pair.
///
/// Total function: (1) composite "PROTOCOL:PORT" match, (2) bare port match,
/// (3) synthesized protocol default, (4) "Unknown Service". Never errors.
pub fn lookup_service(protocol: &str, port: Option<u16>) -> ServiceName {
    let proto = protocol.trim().to_uppercase();

    if let Some(port) = port {
        let composite = format!("{}:{}", proto, port);
        if let Some((_, name)) = COMPOSITE_SERVICES.iter().find(|(k, _)| *k == composite) {
            return named(name, port);
        }
        if let Some((_, name)) = WELL_KNOWN_PORTS.iter().find(|(p, _)| *p == port) {
            return named(name, port);
        }
        if !proto.is_empty() {
            return ServiceName {
                name: format!("{} Service on port {}", proto, port),
                category: category_for_port(port),
            };
        }
        return ServiceName {
            name: format!("Service on port {}", port),
            category: category_for_port(port),
        };
    }

    if !proto.is_empty() {
        // No port at all: the protocol name may itself identify the service.
        let cat = category_for_protocol(&proto);
        if cat != ServiceCategory::Other {
            return ServiceName {
                name: proto,
                category: cat,
            };
        }
        return ServiceName {
            name: format!("{} Service", proto),
            category: ServiceCategory::Other,
        };
    }

    ServiceName {
        name: "Unknown Service".to_string(),
        category: ServiceCategory::Other,
    }
}

fn named(name: &str, port: u16) -> ServiceName {
    ServiceName {
        name: name.to_string(),
        category: category_for_port(port),
    }
}

/// Coarse category for a port, used by the fallback classifier's majority
/// vote when the archetype scoreboard stays under threshold.
pub fn category_for_port(port: u16) -> ServiceCategory {
    match port {
        80 | 443 | 8080 | 8443 | 3000 | 5000 | 8000 => ServiceCategory::Web,
        1433 | 1521 | 3306 | 5432 | 5984 | 9042 | 27017 | 50000 | 9200 => {
            ServiceCategory::Database
        }
        1414 | 1883 | 5672 | 9092 | 61613 | 61616 => ServiceCategory::Messaging,
        22 | 3389 | 5900 => ServiceCategory::RemoteAccess,
        23 | 992 | 3270 | 5250 => ServiceCategory::Terminal,
        25 | 110 | 143 | 465 | 587 | 993 | 995 => ServiceCategory::Mail,
        20 | 21 | 2049 | 445 | 139 => ServiceCategory::FileTransfer,
        88 | 389 | 636 | 3268 => ServiceCategory::Directory,
        6379 | 11211 => ServiceCategory::Cache,
        123 | 161 | 514 => ServiceCategory::Monitoring,
        _ => ServiceCategory::Other,
    }
}

pub fn category_for_protocol(protocol: &str) -> ServiceCategory {
    match protocol {
        "HTTP" | "HTTPS" | "GRPC" | "SOAP" => ServiceCategory::Web,
        "MYSQL" | "POSTGRES" | "TDS" | "ORACLE" | "MONGODB" | "DB2" => ServiceCategory::Database,
        "REDIS" | "MEMCACHED" => ServiceCategory::Cache,
        "AMQP" | "MQTT" | "KAFKA" | "STOMP" | "JMS" | "MSMQ" | "MQ" => ServiceCategory::Messaging,
        "SSH" | "RDP" | "VNC" => ServiceCategory::RemoteAccess,
        "TELNET" | "TN3270" | "TN5250" => ServiceCategory::Terminal,
        "SMTP" | "POP3" | "IMAP" => ServiceCategory::Mail,
        "FTP" | "SMB" | "NFS" => ServiceCategory::FileTransfer,
        "LDAP" | "KERBEROS" => ServiceCategory::Directory,
        "SNMP" | "SYSLOG" | "NTP" => ServiceCategory::Monitoring,
        _ => ServiceCategory::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_match_wins_over_port_table() {
        let svc = lookup_service("tcp", Some(53));
        assert_eq!(svc.name, "DNS Zone Transfer");

        let svc = lookup_service("udp", Some(53));
        assert_eq!(svc.name, "DNS");
    }

    #[test]
    fn well_known_port_matches_any_protocol() {
        let svc = lookup_service("SCTP", Some(3306));
        assert_eq!(svc.name, "MySQL");
        assert_eq!(svc.category, ServiceCategory::Database);
    }

    #[test]
    fn unknown_port_synthesizes_protocol_default() {
        let svc = lookup_service("TCP", Some(47808));
        assert_eq!(svc.name, "TCP Service on port 47808");
        assert_eq!(svc.category, ServiceCategory::Other);
    }

    #[test]
    fn bare_protocol_resolves_without_port() {
        let svc = lookup_service("MQTT", None);
        assert_eq!(svc.name, "MQTT");
        assert_eq!(svc.category, ServiceCategory::Messaging);
    }

    #[test]
    fn empty_input_degrades_to_unknown() {
        let svc = lookup_service("", None);
        assert_eq!(svc.name, "Unknown Service");
        assert_eq!(svc.category, ServiceCategory::Other);
    }
}
