//! CSV rendering of a blend result.
//!
//! `ExportFormat::Plain` reproduces the legacy byte layout: names are written
//! verbatim, so a name containing a comma, quote, or line break corrupts its
//! row. Such rows are listed in [`CsvExport::ambiguous_rows`]. Use
//! `ExportFormat::Escaped` for RFC 4180 quoting.

use std::io;

use serde::{Deserialize, Serialize};

use crate::MassLine;

pub const CSV_HEADER: &str = "Component,Mass (g)";
pub const CSV_FILE_NAME: &str = "blend.csv";
pub const CSV_MIME_TYPE: &str = "text/csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Plain,
    Escaped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvExport {
    pub format: ExportFormat,
    /// Document text. Lines joined by `\n`, no trailing newline.
    pub body: String,
    /// Result indices whose names need quoting to survive a CSV reader.
    pub ambiguous_rows: Vec<usize>,
}

impl CsvExport {
    /// True when a plain export contains rows a CSV reader will misparse.
    pub fn is_corrupted(&self) -> bool {
        self.format == ExportFormat::Plain && !self.ambiguous_rows.is_empty()
    }
}

/// Formats grams with the shortest round-trip representation (`40`, `40.5`).
pub fn format_mass(mass: f64) -> String {
    let mass = if mass == 0.0 { 0.0 } else { mass };
    format!("{mass}")
}

/// Renders results as CSV. Returns `None` when there is nothing to export.
pub fn export_csv(results: &[MassLine], format: ExportFormat) -> io::Result<Option<CsvExport>> {
    if results.is_empty() {
        return Ok(None);
    }
    let ambiguous_rows = results
        .iter()
        .enumerate()
        .filter(|(_, line)| needs_quoting(&line.name))
        .map(|(index, _)| index)
        .collect();
    let body = match format {
        ExportFormat::Plain => plain_body(results),
        ExportFormat::Escaped => escaped_body(results)?,
    };
    Ok(Some(CsvExport {
        format,
        body,
        ambiguous_rows,
    }))
}

fn needs_quoting(name: &str) -> bool {
    name.contains([',', '"', '\n', '\r'])
}

fn plain_body(results: &[MassLine]) -> String {
    let mut body = String::from(CSV_HEADER);
    for line in results {
        body.push('\n');
        body.push_str(&line.name);
        body.push(',');
        body.push_str(&format_mass(line.mass));
    }
    body
}

fn escaped_body(results: &[MassLine]) -> io::Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER.split(','))?;
    for line in results {
        let mass = format_mass(line.mass);
        writer.write_record([line.name.as_str(), mass.as_str()])?;
    }
    let bytes = writer.into_inner().map_err(csv::IntoInnerError::into_error)?;
    let mut body =
        String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    if body.ends_with('\n') {
        body.pop();
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, mass: f64) -> MassLine {
        MassLine {
            name: name.to_string(),
            mass,
        }
    }

    #[test]
    fn plain_export_matches_legacy_layout() {
        let results = vec![line("A", 40.0), line("B", 60.0)];
        let export = export_csv(&results, ExportFormat::Plain).unwrap().unwrap();

        assert_eq!(export.body, "Component,Mass (g)\nA,40\nB,60");
        assert!(export.ambiguous_rows.is_empty());
        assert!(!export.is_corrupted());
    }

    #[test]
    fn empty_results_export_nothing() {
        assert!(export_csv(&[], ExportFormat::Plain).unwrap().is_none());
        assert!(export_csv(&[], ExportFormat::Escaped).unwrap().is_none());
    }

    #[test]
    fn masses_use_shortest_representation() {
        assert_eq!(format_mass(40.0), "40");
        assert_eq!(format_mass(40.5), "40.5");
        assert_eq!(format_mass(33.33), "33.33");
        assert_eq!(format_mass(-0.0), "0");
    }

    #[test]
    fn plain_export_flags_names_with_delimiters() {
        let results = vec![line("Brazil, Santos", 40.0), line("Kenya", 60.0)];
        let export = export_csv(&results, ExportFormat::Plain).unwrap().unwrap();

        assert_eq!(export.body, "Component,Mass (g)\nBrazil, Santos,40\nKenya,60");
        assert_eq!(export.ambiguous_rows, vec![0]);
        assert!(export.is_corrupted());
    }

    #[test]
    fn escaped_export_quotes_delimiters() {
        let results = vec![line("Brazil, Santos", 40.0), line("The \"House\"", 60.5)];
        let export = export_csv(&results, ExportFormat::Escaped).unwrap().unwrap();

        assert_eq!(
            export.body,
            "Component,Mass (g)\n\"Brazil, Santos\",40\n\"The \"\"House\"\"\",60.5"
        );
        assert_eq!(export.ambiguous_rows, vec![0, 1]);
        assert!(!export.is_corrupted());
    }

    #[test]
    fn escaped_export_of_simple_names_matches_plain() {
        let results = vec![line("A", 40.0), line("B", 60.0)];
        let plain = export_csv(&results, ExportFormat::Plain).unwrap().unwrap();
        let escaped = export_csv(&results, ExportFormat::Escaped).unwrap().unwrap();
        assert_eq!(plain.body, escaped.body);
    }

    #[test]
    fn escaped_export_reads_back_with_csv_reader() {
        let results = vec![line("Brazil, Santos", 12.25), line("Line\nBreak", 7.0)];
        let export = export_csv(&results, ExportFormat::Escaped).unwrap().unwrap();

        let mut reader = csv::Reader::from_reader(export.body.as_bytes());
        let rows: Vec<(String, f64)> = reader.deserialize().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "Brazil, Santos");
        assert_eq!(rows[1].0, "Line\nBreak");
        assert!((rows[0].1 - 12.25).abs() < 1e-12);
    }
}
