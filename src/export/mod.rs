//! File sinks: the full collection as JSON, and a flattened CSV table.
//!
//! The two writers are independent; callers run both even if one fails.

use crate::models::{CsvRow, Quote};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
            info!("Created output directory {:?}", parent);
        }
    }
    Ok(())
}

// ── JSON ──────────────────────────────────────────────────────────────────────

/// Pretty JSON, 4-space indent, non-ASCII written as-is.
pub fn write_json(path: &Path, quotes: &[Quote]) -> Result<()> {
    ensure_parent(path)?;

    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    let mut out = BufWriter::new(file);

    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    quotes
        .serialize(&mut ser)
        .with_context(|| format!("Failed to encode JSON into {:?}", path))?;
    out.flush().with_context(|| format!("Failed to write {:?}", path))?;

    Ok(())
}

pub fn read_json(path: &Path) -> Result<Vec<Quote>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let quotes = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("Invalid JSON in {:?}", path))?;
    Ok(quotes)
}

// ── CSV ───────────────────────────────────────────────────────────────────────

/// Header `Citacao,Autor,Tags`, one row per quote, every field quoted.
pub fn write_csv(path: &Path, quotes: &[Quote]) -> Result<()> {
    ensure_parent(path)?;

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;

    // Header comes from serialize(); write it explicitly when there are no rows.
    if quotes.is_empty() {
        writer.write_record(["Citacao", "Autor", "Tags"])?;
    }

    for q in quotes {
        writer
            .serialize(CsvRow::from(q))
            .with_context(|| format!("Failed to write row for {:?}", q.author))?;
    }

    writer.flush().with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Quote> {
        vec![
            Quote::new("Life is wonderful.", "Anon", &[]),
            Quote::new("“Não há.”", "José Saramago", &["life", "love"]),
        ]
    }

    #[test]
    fn test_json_read_back_equal() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/out.json");

        write_json(&path, &sample()).unwrap();
        assert_eq!(read_json(&path).unwrap(), sample());
    }

    #[test]
    fn test_json_keeps_unicode_and_indent() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.json");

        write_json(&path, &sample()).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("José Saramago"));
        assert!(!raw.contains("\\u"));
        assert!(raw.contains("\n        \"texto\": \"Life is wonderful.\""));
    }

    #[test]
    fn test_csv_tags_flattened() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.csv");

        write_csv(&path, &sample()).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines[0], r#""Citacao","Autor","Tags""#);
        assert_eq!(lines[1], r#""Life is wonderful.","Anon","""#);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<CsvRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].tags, "life, love");
        assert_eq!(rows[1].citacao, "“Não há.”");
    }

    #[test]
    fn test_csv_empty_collection_has_header() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("empty.csv");

        write_csv(&path, &[]).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap().trim_end(),
            r#""Citacao","Autor","Tags""#
        );
    }
}
