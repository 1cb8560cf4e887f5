use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};

use crate::loader::FlowTable;
use crate::models::{AnalysisReport, ArchetypeAssignment, FlowRecord};
use crate::services;

/// Columns appended to the right of the original table, in order.
pub const ENRICHMENT_COLUMNS: &[&str] =
    &["service_name", "parsed_protocol", "parsed_port", "archetype"];

// ---------------------------------------------------------------------------
// Enrichment grid
// ---------------------------------------------------------------------------

/// The enriched table as rows of cells: original header and cell values
/// verbatim, enrichment columns appended. Rows the loader skipped keep their
/// original cells and get empty enrichment.
pub fn enrichment_grid(
    table: &FlowTable,
    assignments: &[ArchetypeAssignment],
) -> (Vec<String>, Vec<Vec<String>>) {
    let by_row: HashMap<usize, &FlowRecord> =
        table.records.iter().map(|r| (r.row_index, r)).collect();
    let archetype_by_app: HashMap<&str, &str> = assignments
        .iter()
        .map(|a| (a.application.as_str(), a.archetype.as_str()))
        .collect();

    let mut header = table.header.clone();
    header.extend(ENRICHMENT_COLUMNS.iter().map(|c| c.to_string()));

    let width = table.header.len();
    let rows = table
        .raw_rows
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            let mut cells: Vec<String> = raw.clone();
            // Short rows pad out so enrichment lands in stable columns.
            while cells.len() < width {
                cells.push(String::new());
            }
            match by_row.get(&idx) {
                Some(rec) => {
                    let service = services::lookup_service(&rec.protocol, rec.port);
                    cells.push(service.name);
                    cells.push(rec.protocol.clone());
                    cells.push(rec.port.map(|p| p.to_string()).unwrap_or_default());
                    cells.push(
                        archetype_by_app
                            .get(rec.application.as_str())
                            .map(|a| a.to_string())
                            .unwrap_or_default(),
                    );
                }
                None => {
                    cells.extend(std::iter::repeat(String::new()).take(ENRICHMENT_COLUMNS.len()))
                }
            }
            cells
        })
        .collect();

    (header, rows)
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

pub fn write_enriched_csv(
    table: &FlowTable,
    assignments: &[ArchetypeAssignment],
    path: &Path,
) -> Result<()> {
    let (header, rows) = enrichment_grid(table, assignments);

    let file =
        File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(&header)?;
    for row in &rows {
        writer.write_record(row)?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(rows = rows.len(), path = %path.display(), "wrote enriched csv");
    Ok(())
}

pub fn write_enriched_xlsx(
    table: &FlowTable,
    assignments: &[ArchetypeAssignment],
    path: &Path,
) -> Result<()> {
    let (header, rows) = enrichment_grid(table, assignments);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(crate::loader::DEFAULT_SHEET)?;

    let bold = Format::new().set_bold();
    for (col, name) in header.iter().enumerate() {
        sheet.write_with_format(0, col as u16, name.as_str(), &bold)?;
    }
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            sheet.write((r + 1) as u32, c as u16, cell.as_str())?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(rows = rows.len(), path = %path.display(), "wrote enriched workbook");
    Ok(())
}

pub fn write_json_report(report: &AnalysisReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Topology page
// ---------------------------------------------------------------------------

/// Self-contained HTML page: applications grouped by archetype, rendered
/// client-side from the JSON embedded in the document. Presentation only.
pub fn write_topology_html(report: &AnalysisReport, path: &Path) -> Result<()> {
    let data = serde_json::json!({
        "generated_at": report.metadata.generated_at.to_rfc3339(),
        "input": report.metadata.input_filename,
        "summary": report.executive_summary,
        "applications": report.assignments.iter().map(|a| {
            serde_json::json!({
                "name": a.application,
                "archetype": a.archetype,
                "score": a.score,
                "method": a.method,
            })
        }).collect::<Vec<_>>(),
    });
    let payload = serde_json::to_string(&data).context("failed to serialize topology data")?;
    // The template never contains the marker twice; replace is exact.
    let page = TOPOLOGY_TEMPLATE.replace("__FLOWMAP_DATA__", &payload);
    std::fs::write(path, page)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

const TOPOLOGY_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>flowmap topology</title>
<style>
  body { font-family: -apple-system, "Segoe UI", sans-serif; margin: 0; background: #0f1419; color: #e6e1cf; }
  header { padding: 16px 24px; border-bottom: 1px solid #253340; }
  header h1 { margin: 0; font-size: 18px; }
  header p { margin: 4px 0 0; color: #5c6773; font-size: 12px; }
  #groups { display: flex; flex-wrap: wrap; gap: 16px; padding: 24px; }
  .group { background: #14191f; border: 1px solid #253340; border-radius: 8px; padding: 12px; min-width: 220px; }
  .group h2 { margin: 0 0 8px; font-size: 14px; color: #59c2ff; }
  .group .count { color: #5c6773; font-weight: normal; }
  .app { display: flex; justify-content: space-between; gap: 12px; padding: 4px 6px; border-radius: 4px; font-size: 13px; }
  .app:nth-child(odd) { background: #1a212a; }
  .app .score { color: #aad94c; }
  .app .fallback { color: #e6b450; }
</style>
</head>
<body>
<header>
  <h1>flowmap topology</h1>
  <p id="meta"></p>
</header>
<div id="groups"></div>
<script>
const DATA = __FLOWMAP_DATA__;
document.getElementById("meta").textContent =
  DATA.input + " | generated " + DATA.generated_at;

const groups = new Map();
for (const app of DATA.applications) {
  if (!groups.has(app.archetype)) groups.set(app.archetype, []);
  groups.get(app.archetype).push(app);
}

const container = document.getElementById("groups");
for (const [archetype, apps] of [...groups.entries()].sort()) {
  const div = document.createElement("div");
  div.className = "group";
  const h = document.createElement("h2");
  h.innerHTML = archetype + ' <span class="count">(' + apps.length + ")</span>";
  div.appendChild(h);
  for (const app of apps.sort((a, b) => b.score - a.score)) {
    const row = document.createElement("div");
    row.className = "app";
    const name = document.createElement("span");
    name.textContent = app.name;
    const score = document.createElement("span");
    score.className = app.method === "score" ? "score" : "fallback";
    score.textContent = app.method === "score" ? app.score.toFixed(0) : app.method;
    row.appendChild(name);
    row.appendChild(score);
    div.appendChild(row);
  }
  container.appendChild(div);
}
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_flow_table;
    use crate::scorer::classify_all;

    fn load_csv(content: &str, dir: &Path) -> FlowTable {
        let path = dir.join("flows.csv");
        std::fs::write(&path, content).unwrap();
        load_flow_table(&path, None).unwrap()
    }

    #[test]
    fn enriched_csv_round_trips_original_cells_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let table = load_csv(
            "application,source,destination,protocol,port\n\
             orders,10.0.0.1,10.0.0.50,MYSQL,3306\n\
             legacy,10.0.0.2,10.0.0.90,TCP,23\n",
            dir.path(),
        );
        let outcome = classify_all(&table.records);

        let out = dir.path().join("enriched.csv");
        write_enriched_csv(&table, &outcome.assignments, &out).unwrap();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&out)
            .unwrap();
        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(|c| c.to_string()).collect())
            .collect();

        // Header: original columns then the enrichment columns.
        assert_eq!(
            rows[0],
            vec![
                "application",
                "source",
                "destination",
                "protocol",
                "port",
                "service_name",
                "parsed_protocol",
                "parsed_port",
                "archetype"
            ]
        );
        // Original cells preserved verbatim in original order.
        assert_eq!(&rows[1][..5], ["orders", "10.0.0.1", "10.0.0.50", "MYSQL", "3306"]);
        assert_eq!(rows[1][5], "MySQL");
        assert_eq!(rows[1][8], "Database-Centric");
        assert_eq!(&rows[2][..5], ["legacy", "10.0.0.2", "10.0.0.90", "TCP", "23"]);
        assert_eq!(rows[2][8], "Host-Terminal");
    }

    #[test]
    fn skipped_rows_keep_cells_with_empty_enrichment() {
        let dir = tempfile::tempdir().unwrap();
        let table = load_csv(
            "application,source,destination\n\
             ok,10.0.0.1,10.0.0.2\n\
             ghost,,\n",
            dir.path(),
        );
        let outcome = classify_all(&table.records);
        let (header, rows) = enrichment_grid(&table, &outcome.assignments);

        assert_eq!(header.len(), 3 + ENRICHMENT_COLUMNS.len());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "ghost");
        assert!(rows[1][3..].iter().all(|c| c.is_empty()));
    }

    #[test]
    fn topology_page_embeds_application_data() {
        let dir = tempfile::tempdir().unwrap();
        let table = load_csv(
            "application,source,destination,protocol,port\n\
             orders,10.0.0.1,10.0.0.50,MYSQL,3306\n",
            dir.path(),
        );
        let outcome = classify_all(&table.records);
        let report = crate::report::build_report(&table, outcome, None, 0);

        let out = dir.path().join("topology.html");
        write_topology_html(&report, &out).unwrap();
        let page = std::fs::read_to_string(&out).unwrap();
        assert!(page.contains("\"orders\""));
        assert!(page.contains("Database-Centric"));
        assert!(!page.contains("__FLOWMAP_DATA__"));
    }

    #[test]
    fn json_report_is_valid_json() {
        let dir = tempfile::tempdir().unwrap();
        let table = load_csv(
            "application,source,destination,protocol,port\n\
             orders,10.0.0.1,10.0.0.50,MYSQL,3306\n",
            dir.path(),
        );
        let outcome = classify_all(&table.records);
        let report = crate::report::build_report(&table, outcome, None, 12);

        let out = dir.path().join("report.json");
        write_json_report(&report, &out).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(parsed["metadata"]["input_filename"], "flows.csv");
        assert_eq!(parsed["statistics"]["analysis_duration_ms"], 12);
        assert!(parsed["assignments"].is_array());
    }
}
