//! Delimited-text readers and writers for the experiment.
//!
//! - node table: header row, first column the identifier, a phylum column
//! - edge list: two tab-separated identifier columns, no header
//! - replicate table: one TSV row per replicate, `NA` for missing scores
//! - summary: JSON

use crate::error::{Error, Result};
use crate::experiment::Experiment;
use crate::network::{NodeTable, RawEdge};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

/// Marker written for missing values.
pub const MISSING: &str = "NA";

/// Field delimiter implied by a file extension: comma for `.csv`, tab otherwise.
pub fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => b',',
        _ => b'\t',
    }
}

/// Read a node table.
///
/// The phylum column is matched by exact name first, then ignoring ASCII
/// case. Its absence is fatal.
pub fn read_node_table<R: Read>(reader: R, phylum_column: &str, delimiter: u8) -> Result<NodeTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let column = headers
        .iter()
        .position(|h| h == phylum_column)
        .or_else(|| headers.iter().position(|h| h.eq_ignore_ascii_case(phylum_column)))
        .ok_or_else(|| Error::MissingColumn {
            column: phylum_column.to_string(),
            table: "node table",
        })?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let id = record.get(0).unwrap_or_default();
        if id.is_empty() {
            return Err(Error::MalformedRow {
                line: i + 2,
                table: "node table",
                message: "empty node identifier".to_string(),
            });
        }
        let phylum = record.get(column).unwrap_or_default();
        rows.push((id.to_string(), phylum.to_string()));
    }

    let nodes = NodeTable::new(rows)?;
    log::info!(
        "Loaded {} nodes in {} phyla",
        nodes.len(),
        nodes.strata().len()
    );
    Ok(nodes)
}

/// Read a headerless, tab-separated edge list. Columns past the second are ignored.
pub fn read_edge_list<R: Read>(reader: R) -> Result<Vec<RawEdge>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut edges = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        match (record.get(0), record.get(1)) {
            (Some(source), Some(target)) if !source.is_empty() && !target.is_empty() => {
                edges.push(RawEdge::new(source, target));
            }
            _ => {
                return Err(Error::MalformedRow {
                    line: i + 1,
                    table: "edge list",
                    message: "expected two identifier columns".to_string(),
                })
            }
        }
    }
    log::info!("Loaded {} edges", edges.len());
    Ok(edges)
}

/// Open and read a node table, choosing the delimiter from the extension.
pub fn load_node_table(path: &Path, phylum_column: &str) -> Result<NodeTable> {
    let file = BufReader::new(File::open(path)?);
    read_node_table(file, phylum_column, delimiter_for(path))
}

/// Open and read an edge list.
pub fn load_edge_list(path: &Path) -> Result<Vec<RawEdge>> {
    read_edge_list(BufReader::new(File::open(path)?))
}

#[derive(Serialize)]
struct ReplicateRow {
    replicate: usize,
    nodes: usize,
    edges: usize,
    communities: String,
    modularity: String,
}

fn or_missing<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

/// Write one TSV row per replicate.
pub fn write_replicates<W: Write>(writer: W, experiment: &Experiment) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_writer(writer);
    for replicate in &experiment.replicates {
        writer.serialize(ReplicateRow {
            replicate: replicate.index,
            nodes: replicate.nodes,
            edges: replicate.edges,
            communities: or_missing(replicate.communities),
            modularity: or_missing(replicate.modularity),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Serialise a summary (or any report wrapping one) as pretty JSON.
pub fn write_summary_json<W: Write, T: Serialize>(mut writer: W, summary: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
