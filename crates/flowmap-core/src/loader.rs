use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::models::{Endpoint, FlowRecord};

pub const DEFAULT_SHEET: &str = "Network Flows";

// Accepted header synonyms per logical field. Matching is case-insensitive
// after underscores collapse to spaces.
const APPLICATION_COLUMNS: &[&str] = &["application", "app", "app name", "application name"];
const SOURCE_COLUMNS: &[&str] = &["source", "source ip", "src", "src ip", "ip", "local ip"];
const DESTINATION_COLUMNS: &[&str] = &[
    "destination",
    "destination ip",
    "dest",
    "dest ip",
    "dst",
    "dst ip",
    "peer",
    "peer ip",
    "remote ip",
];
const PROTOCOL_COLUMNS: &[&str] = &["protocol", "proto", "protocol:port", "protocol/port"];
const PORT_COLUMNS: &[&str] = &["port", "dst port", "dest port", "destination port", "server port"];
const BYTES_IN_COLUMNS: &[&str] = &["bytes in", "bytes received", "rx bytes", "in bytes"];
const BYTES_OUT_COLUMNS: &[&str] = &["bytes out", "bytes sent", "tx bytes", "out bytes"];
const SERVICE_COLUMNS: &[&str] = &["service", "service info", "service/info", "info", "description"];

// ---------------------------------------------------------------------------
// FlowTable: the normalized output of the load layer
// ---------------------------------------------------------------------------

/// A loaded flow table. `raw_rows` keeps every data row's original cells
/// verbatim (skipped rows included) so enrichment output can reproduce the
/// input exactly; `records` carry `row_index` back into `raw_rows`.
#[derive(Debug)]
pub struct FlowTable {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: u64,
    pub header: Vec<String>,
    pub raw_rows: Vec<Vec<String>>,
    pub records: Vec<FlowRecord>,
    pub skipped_rows: usize,
}

impl FlowTable {
    pub fn total_rows(&self) -> usize {
        self.raw_rows.len()
    }
}

/// Resolved header positions for one file. Built once per load; a file that
/// resolves neither a source nor a destination column is rejected up front
/// rather than producing zero records row by row.
#[derive(Debug, Default)]
struct ColumnMap {
    application: Option<usize>,
    source: Option<usize>,
    destination: Option<usize>,
    protocol: Option<usize>,
    port: Option<usize>,
    bytes_in: Option<usize>,
    bytes_out: Option<usize>,
    service: Option<usize>,
}

impl ColumnMap {
    fn resolve(header: &[String]) -> Result<Self> {
        let normalized: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();
        let position = |synonyms: &[&str]| -> Option<usize> {
            synonyms
                .iter()
                .find_map(|s| normalized.iter().position(|h| h == s))
        };

        let map = Self {
            application: position(APPLICATION_COLUMNS),
            source: position(SOURCE_COLUMNS),
            destination: position(DESTINATION_COLUMNS),
            protocol: position(PROTOCOL_COLUMNS),
            port: position(PORT_COLUMNS),
            bytes_in: position(BYTES_IN_COLUMNS),
            bytes_out: position(BYTES_OUT_COLUMNS),
            service: position(SERVICE_COLUMNS),
        };

        if map.source.is_none() && map.destination.is_none() {
            bail!(
                "no source or destination column found in header [{}]",
                header.join(", ")
            );
        }
        Ok(map)
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a flow table from a CSV or Excel file, chosen by extension.
/// Hard failures: unreadable file, unknown extension, missing worksheet,
/// unresolvable schema. Individual bad rows degrade silently and are counted.
pub fn load_flow_table(path: &Path, sheet: Option<&str>) -> Result<FlowTable> {
    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let size_bytes = std::fs::metadata(path)
        .with_context(|| format!("cannot stat {}", path.display()))?
        .len();
    let sha256 = compute_file_sha256(path)?;

    tracing::info!(file = %filename, size = size_bytes, sha256 = %sha256, "loading flow table");

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let (header, raw_rows) = match ext.as_str() {
        "csv" => read_csv_rows(path)?,
        "xlsx" | "xlsm" | "xls" => read_excel_rows(path, sheet)?,
        other => bail!(
            "unsupported input format '{}': expected .csv or .xlsx",
            other
        ),
    };

    let map = ColumnMap::resolve(&header)?;
    let (records, skipped_rows) = parse_rows(&raw_rows, &map);

    tracing::info!(
        rows = raw_rows.len(),
        loaded = records.len(),
        skipped = skipped_rows,
        "load complete"
    );

    Ok(FlowTable {
        filename,
        sha256,
        size_bytes,
        header,
        raw_rows,
        records,
        skipped_rows,
    })
}

fn read_csv_rows(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let record = result.with_context(|| format!("malformed CSV in {}", path.display()))?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }
    if rows.is_empty() {
        bail!("{} is empty", path.display());
    }
    let header = rows.remove(0);
    Ok((header, rows))
}

fn read_excel_rows(path: &Path, sheet: Option<&str>) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("cannot open {}", path.display()))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => {
            let names = workbook.sheet_names();
            if names.iter().any(|n| n == DEFAULT_SHEET) {
                DEFAULT_SHEET.to_string()
            } else {
                // No named sheet requested: take the first one.
                names
                    .first()
                    .cloned()
                    .with_context(|| format!("{} contains no worksheets", path.display()))?
            }
        }
    };

    let range = workbook.worksheet_range(&sheet_name).with_context(|| {
        format!("worksheet '{}' not found in {}", sheet_name, path.display())
    })?;

    let mut rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    if rows.is_empty() {
        bail!("worksheet '{}' in {} is empty", sheet_name, path.display());
    }
    let header = rows.remove(0);
    Ok((header, rows))
}

/// Render a spreadsheet cell the way it reads in the grid: integral floats
/// without the trailing ".0" Excel storage adds to every number.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Row parsing
// ---------------------------------------------------------------------------

fn parse_rows(rows: &[Vec<String>], map: &ColumnMap) -> (Vec<FlowRecord>, usize) {
    // "10.0.0.5(web01.corp.local)" -> identifier + embedded hostname
    let peer_re = Regex::new(r"^\s*([^()]+?)\s*\(\s*([^()]*?)\s*\)\s*$")
        .expect("peer pattern is valid");

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (row_index, row) in rows.iter().enumerate() {
        let source = parse_endpoint(cell(row, map.source), &peer_re);
        let destination = parse_endpoint(cell(row, map.destination), &peer_re);

        // Best-effort import policy: a row with no usable endpoint at all is
        // dropped and counted, never reported as an error.
        if source.is_empty() && destination.is_empty() {
            skipped += 1;
            continue;
        }

        let (mut protocol, mut port) = parse_protocol_token(cell(row, map.protocol));
        if port.is_none() {
            port = parse_port(cell(row, map.port));
        }
        if protocol.is_empty() {
            // A dedicated port column may itself carry a combined token.
            let (p, _) = parse_protocol_token(cell(row, map.port));
            protocol = p;
        }

        let application = {
            let app = cell(row, map.application).trim();
            if app.is_empty() {
                if source.is_empty() {
                    destination.identifier.clone()
                } else {
                    source.identifier.clone()
                }
            } else {
                app.to_string()
            }
        };

        let service_info = {
            let s = cell(row, map.service).trim();
            (!s.is_empty()).then(|| s.to_string())
        };

        records.push(FlowRecord {
            application,
            source,
            destination,
            protocol,
            port,
            bytes_in: parse_count(cell(row, map.bytes_in)),
            bytes_out: parse_count(cell(row, map.bytes_out)),
            service_info,
            row_index,
        });
    }

    (records, skipped)
}

fn cell<'a>(row: &'a [String], idx: Option<usize>) -> &'a str {
    idx.and_then(|i| row.get(i)).map(String::as_str).unwrap_or("")
}

fn parse_endpoint(raw: &str, peer_re: &Regex) -> Endpoint {
    let raw = raw.trim();
    if raw.is_empty() {
        return Endpoint::bare("");
    }
    if let Some(caps) = peer_re.captures(raw) {
        let identifier = caps[1].trim().to_string();
        let hostname = caps[2].trim();
        return Endpoint {
            identifier,
            hostname: (!hostname.is_empty()).then(|| hostname.to_string()),
        };
    }
    Endpoint::bare(raw)
}

/// Split a combined "PROTOCOL:PORT" (or "PROTOCOL/PORT") token. A bare
/// protocol or bare port is tolerated; anything unparseable degrades to
/// empty fields.
fn parse_protocol_token(raw: &str) -> (String, Option<u16>) {
    let raw = raw.trim();
    if raw.is_empty() {
        return (String::new(), None);
    }
    if let Some((left, right)) = raw.split_once(|c: char| c == ':' || c == '/') {
        return (left.trim().to_uppercase(), parse_port(right));
    }
    if let Some(port) = parse_port(raw) {
        return (String::new(), Some(port));
    }
    (raw.to_uppercase(), None)
}

/// Parse a port cell, tolerating the "443.0" float artifacts spreadsheet
/// exports produce.
fn parse_port(raw: &str) -> Option<u16> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(port) = raw.parse::<u16>() {
        return Some(port);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.fract() == 0.0 && (0.0..=65535.0).contains(&f) {
            return Some(f as u16);
        }
    }
    None
}

fn parse_count(raw: &str) -> u64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0;
    }
    if let Ok(n) = raw.parse::<u64>() {
        return n;
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() && f >= 0.0 {
            return f as u64;
        }
    }
    0
}

fn compute_file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn table_from_csv(content: &str) -> FlowTable {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flows.csv");
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        load_flow_table(&path, None).unwrap()
    }

    #[test]
    fn resolves_column_synonyms_case_insensitively() {
        let table = table_from_csv(
            "App Name,SRC IP,Peer,Protocol,Server Port,Bytes Sent\n\
             billing,10.0.0.1,10.0.0.9,TCP,443,1200\n",
        );
        assert_eq!(table.records.len(), 1);
        let rec = &table.records[0];
        assert_eq!(rec.application, "billing");
        assert_eq!(rec.source.identifier, "10.0.0.1");
        assert_eq!(rec.destination.identifier, "10.0.0.9");
        assert_eq!(rec.protocol, "TCP");
        assert_eq!(rec.port, Some(443));
        assert_eq!(rec.bytes_out, 1200);
    }

    #[test]
    fn splits_embedded_hostname_from_peer() {
        let table = table_from_csv(
            "app,source,destination\n\
             crm,10.1.1.1,192.168.4.20(db01.corp.local)\n",
        );
        let dst = &table.records[0].destination;
        assert_eq!(dst.identifier, "192.168.4.20");
        assert_eq!(dst.hostname.as_deref(), Some("db01.corp.local"));
    }

    #[test]
    fn splits_combined_protocol_port_token() {
        let table = table_from_csv(
            "app,source,destination,protocol\n\
             crm,10.1.1.1,10.1.1.2,MYSQL:3306\n",
        );
        let rec = &table.records[0];
        assert_eq!(rec.protocol, "MYSQL");
        assert_eq!(rec.port, Some(3306));
    }

    #[test]
    fn drops_rows_without_any_endpoint_silently() {
        let table = table_from_csv(
            "app,source,destination\n\
             a,10.0.0.1,10.0.0.2\n\
             b,,\n\
             c,10.0.0.3,\n",
        );
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.skipped_rows, 1);
        // Raw rows keep everything, including the dropped one.
        assert_eq!(table.total_rows(), 3);
    }

    #[test]
    fn missing_application_falls_back_to_source_identifier() {
        let table = table_from_csv(
            "source,destination\n\
             10.0.0.7,10.0.0.8\n",
        );
        assert_eq!(table.records[0].application, "10.0.0.7");
    }

    #[test]
    fn rejects_header_without_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flows.csv");
        std::fs::write(&path, "application,bytes in\nbilling,10\n").unwrap();
        let err = load_flow_table(&path, None).unwrap_err();
        assert!(err.to_string().contains("no source or destination column"));
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flows.parquet");
        std::fs::write(&path, "x").unwrap();
        assert!(load_flow_table(&path, None).is_err());
    }

    #[test]
    fn port_parser_tolerates_float_artifacts() {
        assert_eq!(parse_port("443"), Some(443));
        assert_eq!(parse_port("443.0"), Some(443));
        assert_eq!(parse_port("65536"), None);
        assert_eq!(parse_port("https"), None);
    }
}
