//! Congruence between operational clusters and reference taxonomy.
//!
//! Sequences clustered at several amino-acid identity (AAI) thresholds are
//! compared against ICTV ranks with the Adjusted Rand Index. Cluster labels
//! live in `<cluster_dir>/<mode>/labels_id_<threshold>.tsv` (two columns,
//! sequence id and cluster id, no header), one directory per coverage mode.
//!
//! Only rows with a usable rank label take part. Empty cells, the usual
//! missing-value tokens (`NA`, `N/A`, `NaN`, `null`, `None`, `<NA>`, ...) and
//! `Unclassified` are excluded. A score needs more than one row and more than
//! one distinct label on each side; otherwise it is missing.
//!
//! A mode directory without any label file contributes no rows and is not an
//! error; only when no mode directory exists at all is there nothing to
//! report. The pivot matrix leaves out ranks and columns with no score at all.

use crate::error::{Error, Result};
use crate::io::MISSING;
use crate::metrics::ari;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

/// Ranks scored, in reporting order.
pub const RANKS: [&str; 4] = ["genus", "family", "order", "phylum"];

/// AAI thresholds used by default.
pub const DEFAULT_THRESHOLDS: [f64; 4] = [0.90, 0.70, 0.50, 0.30];

/// Coverage mode used by default.
pub const DEFAULT_MODE: &str = "cov_short_80";

/// Strip trailing `:`, `.` and whitespace from a sequence id.
pub fn clean_id(id: &str) -> &str {
    id.trim_end_matches(|c: char| c == ':' || c == '.' || c.is_whitespace())
}

/// Cell contents read as missing values in delimited tables.
const MISSING_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_usable_rank(label: &str) -> bool {
    let label = label.trim();
    !label.is_empty()
        && !MISSING_TOKENS.contains(&label)
        && !label.eq_ignore_ascii_case("na")
        && !label.eq_ignore_ascii_case("unclassified")
}

/// Reference taxonomy: one row per sequence, one optional label per rank.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    ids: Vec<String>,
    /// Present ranks (lowercase) with the label of every row.
    ranks: Vec<(String, Vec<String>)>,
}

impl Taxonomy {
    /// Read a tab-separated taxonomy table with a header.
    ///
    /// The first column holds sequence ids whatever its name. Rank columns
    /// are matched after lowercasing and trimming.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let columns: Vec<(String, usize)> = RANKS
            .iter()
            .filter_map(|&rank| {
                headers
                    .iter()
                    .skip(1)
                    .position(|h| h == rank)
                    .map(|p| (rank.to_string(), p + 1))
            })
            .collect();

        let mut ids = Vec::new();
        let mut labels: Vec<Vec<String>> = vec![Vec::new(); columns.len()];
        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(err) => {
                    log::warn!("Skipping unreadable taxonomy row: {err}");
                    continue;
                }
            };
            ids.push(clean_id(record.get(0).unwrap_or_default()).to_string());
            for (slot, (_, col)) in labels.iter_mut().zip(&columns) {
                slot.push(record.get(*col).unwrap_or_default().to_string());
            }
        }

        if ids.is_empty() {
            return Err(Error::EmptyInput("taxonomy table has no rows"));
        }
        log::info!("Loaded taxonomy reference: {} sequences", ids.len());

        let ranks = columns
            .into_iter()
            .map(|(rank, _)| rank)
            .zip(labels)
            .collect();
        Ok(Self { ids, ranks })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ranks present in the table.
    pub fn ranks(&self) -> impl Iterator<Item = &str> {
        self.ranks.iter().map(|(r, _)| r.as_str())
    }
}

/// Read `seq_id -> cluster_id` labels. Later duplicates of an id are ignored.
pub fn read_cluster_labels<R: Read>(reader: R) -> Result<HashMap<String, String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut labels = HashMap::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let (Some(id), Some(cluster)) = (record.get(0), record.get(1)) else {
            return Err(Error::MalformedRow {
                line: i + 1,
                table: "cluster labels",
                message: "expected sequence id and cluster id".to_string(),
            });
        };
        let _ = labels
            .entry(clean_id(id).to_string())
            .or_insert_with(|| cluster.trim().to_string());
    }
    Ok(labels)
}

/// Path of the label file for one mode and threshold.
pub fn cluster_file(cluster_dir: &Path, mode: &str, threshold: f64) -> PathBuf {
    cluster_dir.join(mode).join(format!("labels_id_{threshold:.2}.tsv"))
}

/// One ARI score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CongruenceRow {
    pub coverage_mode: String,
    /// Capitalised rank name.
    pub taxonomic_rank: String,
    /// Threshold formatted with two decimals.
    pub aai_threshold: String,
    pub ari_score: Option<f64>,
    /// Rows used for the score.
    pub n_sequences: usize,
}

/// ARI of `clusters` against every rank of `taxonomy`.
pub fn score_labels(
    taxonomy: &Taxonomy,
    clusters: &HashMap<String, String>,
    mode: &str,
    threshold: f64,
) -> Vec<CongruenceRow> {
    taxonomy
        .ranks
        .iter()
        .map(|(rank, labels)| {
            let (truth, pred): (Vec<&str>, Vec<&str>) = taxonomy
                .ids
                .iter()
                .zip(labels)
                .filter(|(_, label)| is_usable_rank(label))
                .filter_map(|(id, label)| Some((label.as_str(), clusters.get(id)?.as_str())))
                .unzip();

            let distinct_truth: BTreeSet<&str> = truth.iter().copied().collect();
            let distinct_pred: BTreeSet<&str> = pred.iter().copied().collect();
            let ari_score = (truth.len() > 1 && distinct_truth.len() > 1 && distinct_pred.len() > 1)
                .then(|| ari(&pred, &truth));

            CongruenceRow {
                coverage_mode: mode.to_string(),
                taxonomic_rank: capitalize(rank),
                aai_threshold: format!("{threshold:.2}"),
                ari_score,
                n_sequences: truth.len(),
            }
        })
        .collect()
}

/// Score every mode and threshold found under `cluster_dir`.
///
/// Missing mode directories and label files are skipped with a warning.
/// Fails with `EmptyInput` only when none of `modes` has a directory.
pub fn analyze(
    taxonomy: &Taxonomy,
    cluster_dir: &Path,
    modes: &[String],
    thresholds: &[f64],
) -> Result<Vec<CongruenceRow>> {
    if taxonomy.is_empty() {
        return Err(Error::EmptyInput("taxonomy table has no rows"));
    }
    let mut rows = Vec::new();
    let mut modes_found = 0;
    for mode in modes {
        log::info!("Analyzing coverage mode: {mode}");
        if !cluster_dir.join(mode).is_dir() {
            log::warn!("Directory not found for {mode}; skipping");
            continue;
        }
        modes_found += 1;
        for &threshold in thresholds {
            let path = cluster_file(cluster_dir, mode, threshold);
            let file = match File::open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    log::warn!("Cluster file not found: {}", path.display());
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let clusters = read_cluster_labels(BufReader::new(file))?;
            rows.extend(score_labels(taxonomy, &clusters, mode, threshold));
        }
    }

    if modes_found == 0 {
        return Err(Error::EmptyInput("no clustering results found"));
    }
    if rows.is_empty() {
        log::warn!("No cluster label files found; the summary matrix will be empty");
    }
    Ok(rows)
}

/// Write the long table: one row per mode, rank and threshold.
pub fn write_long<W: Write>(writer: W, rows: &[CongruenceRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    writer.write_record(["Coverage_Mode", "Taxonomic_Rank", "AAI_Threshold", "ARI_Score", "N_Sequences"])?;
    for row in rows {
        writer.write_record([
            row.coverage_mode.clone(),
            row.taxonomic_rank.clone(),
            row.aai_threshold.clone(),
            format_score(row.ari_score),
            row.n_sequences.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the rank × (mode, threshold) matrix. Ranks and columns are sorted;
/// those without a single score are left out.
pub fn write_pivot<W: Write>(writer: W, rows: &[CongruenceRow]) -> Result<()> {
    let scored = rows.iter().filter(|r| r.ari_score.is_some());
    let ranks: BTreeSet<&str> = scored.clone().map(|r| r.taxonomic_rank.as_str()).collect();
    let columns: BTreeSet<(&str, &str)> = scored
        .map(|r| (r.coverage_mode.as_str(), r.aai_threshold.as_str()))
        .collect();
    let cells: HashMap<(&str, &str, &str), Option<f64>> = rows
        .iter()
        .map(|r| {
            (
                (r.taxonomic_rank.as_str(), r.coverage_mode.as_str(), r.aai_threshold.as_str()),
                r.ari_score,
            )
        })
        .collect();

    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    let mut header = vec!["Taxonomic_Rank".to_string()];
    header.extend(columns.iter().map(|(mode, t)| format!("{mode}_{t}")));
    writer.write_record(&header)?;

    for rank in ranks {
        let mut record = vec![rank.to_string()];
        for &(mode, t) in &columns {
            record.push(format_score(cells.get(&(rank, mode, t)).copied().flatten()));
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| MISSING.to_string(), |s| format!("{s:.4}"))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAXONOMY: &str = "Seq_ID\tGenus\t Family \tPhylum\n\
        s1.\tg1\tf1\tp1\n\
        s2\tg1\tf1\tp1\n\
        s3\tg2\tf1\tp1\n\
        s4\tg2\tf2\tUnclassified\n\
        s5\tNA\tf2\tp2\n\
        s6\tg3\t\tp2\n";

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    #[test]
    fn test_clean_id() {
        assert_eq!(clean_id("NC_001.1:."), "NC_001.1");
        assert_eq!(clean_id("seq1 \t"), "seq1");
        assert_eq!(clean_id("seq1"), "seq1");
    }

    #[test]
    fn test_taxonomy_ranks_normalized() {
        let taxonomy = Taxonomy::from_reader(TAXONOMY.as_bytes()).unwrap();
        assert_eq!(taxonomy.len(), 6);
        let ranks: Vec<&str> = taxonomy.ranks().collect();
        assert_eq!(ranks, ["genus", "family", "phylum"]);
    }

    #[test]
    fn test_score_labels_filters_unusable_ranks() {
        let taxonomy = Taxonomy::from_reader(TAXONOMY.as_bytes()).unwrap();
        let clusters = labels(&[
            ("s1", "c1"),
            ("s2", "c1"),
            ("s3", "c2"),
            ("s4", "c2"),
            ("s5", "c3"),
            ("s6", "c4"),
        ]);
        let rows = score_labels(&taxonomy, &clusters, "cov_short_80", 0.9);
        assert_eq!(rows.len(), 3);

        let genus = &rows[0];
        assert_eq!(genus.taxonomic_rank, "Genus");
        assert_eq!(genus.aai_threshold, "0.90");
        // s5 has genus NA
        assert_eq!(genus.n_sequences, 5);
        // g1={s1,s2}->c1, g2={s3,s4}->c2, g3={s6}->c4: identical partitions
        assert!((genus.ari_score.unwrap() - 1.0).abs() < 1e-12);

        let family = &rows[1];
        // s6 family empty
        assert_eq!(family.n_sequences, 5);

        let phylum = &rows[2];
        // s4 unclassified
        assert_eq!(phylum.n_sequences, 5);
    }

    #[test]
    fn test_missing_value_tokens_are_not_ranks() {
        for token in ["NaN", "N/A", "n/a", "null", "None", "<NA>", "na", "UNCLASSIFIED", " ", ""] {
            assert!(!is_usable_rank(token), "{token:?} should be excluded");
        }
        assert!(is_usable_rank("Nairovirus"));
        assert!(is_usable_rank("Pisuviricota"));
    }

    #[test]
    fn test_null_genus_rows_excluded_from_scoring() {
        let taxonomy = Taxonomy::from_reader(
            "id\tGenus\na\tg1\nb\tg1\nc\tg2\nd\tNaN\ne\t<NA>\nf\tNone\n".as_bytes(),
        )
        .unwrap();
        let clusters = labels(&[("a", "c1"), ("b", "c1"), ("c", "c2"), ("d", "c3"), ("e", "c4"), ("f", "c5")]);
        let rows = score_labels(&taxonomy, &clusters, "m", 0.7);
        assert_eq!(rows[0].n_sequences, 3);
        assert!((rows[0].ari_score.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pivot_drops_unscored_ranks_and_columns() {
        let row = |rank: &str, t: &str, score: Option<f64>| CongruenceRow {
            coverage_mode: "m".to_string(),
            taxonomic_rank: rank.to_string(),
            aai_threshold: t.to_string(),
            ari_score: score,
            n_sequences: 4,
        };
        let rows = vec![
            row("Genus", "0.90", Some(0.5)),
            row("Genus", "0.70", None),
            row("Phylum", "0.90", None),
            row("Phylum", "0.70", None),
            row("Family", "0.90", None),
        ];
        let mut out = Vec::new();
        write_pivot(&mut out, &rows).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Taxonomic_Rank\tm_0.90\nGenus\t0.5000\n");
    }

    #[test]
    fn test_single_cluster_scores_missing() {
        let taxonomy = Taxonomy::from_reader(TAXONOMY.as_bytes()).unwrap();
        let clusters = labels(&[("s1", "c"), ("s2", "c"), ("s3", "c"), ("s5", "c")]);
        let rows = score_labels(&taxonomy, &clusters, "m", 0.5);
        assert!(rows.iter().all(|r| r.ari_score.is_none()));
    }

    #[test]
    fn test_read_cluster_labels_cleans_ids() {
        let data = "s1:\tc1\ns2\tc2\ns1\tc9\n";
        let labels = read_cluster_labels(data.as_bytes()).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["s1"], "c1");
    }

    #[test]
    fn test_analyze_reads_directory_layout() {
        let dir = std::env::temp_dir().join(format!("phylonet-congruence-{}", std::process::id()));
        let mode_dir = dir.join("cov_short_80");
        std::fs::create_dir_all(&mode_dir).unwrap();
        std::fs::write(
            cluster_file(&dir, "cov_short_80", 0.9),
            "s1\tc1\ns2\tc1\ns3\tc2\ns4\tc2\ns5\tc3\ns6\tc3\n",
        )
        .unwrap();

        let taxonomy = Taxonomy::from_reader(TAXONOMY.as_bytes()).unwrap();
        let modes = vec!["cov_short_80".to_string(), "cov_bidir_50".to_string()];
        let rows = analyze(&taxonomy, &dir, &modes, &DEFAULT_THRESHOLDS).unwrap();
        // only 0.90 exists, only one mode exists
        assert_eq!(rows.len(), 3);

        let mut pivot = Vec::new();
        write_pivot(&mut pivot, &rows).unwrap();
        let pivot = String::from_utf8(pivot).unwrap();
        let mut lines = pivot.lines();
        assert_eq!(lines.next(), Some("Taxonomic_Rank\tcov_short_80_0.90"));
        assert!(lines.next().unwrap().starts_with("Family\t"));

        let missing = analyze(&taxonomy, &dir, &["nope".to_string()], &DEFAULT_THRESHOLDS);
        assert!(matches!(missing, Err(Error::EmptyInput(_))));

        // a mode directory without label files yields no rows, not an error
        std::fs::create_dir_all(dir.join("cov_bidir_50")).unwrap();
        let empty = analyze(&taxonomy, &dir, &["cov_bidir_50".to_string()], &DEFAULT_THRESHOLDS).unwrap();
        assert!(empty.is_empty());
        let mut pivot = Vec::new();
        write_pivot(&mut pivot, &empty).unwrap();
        assert_eq!(String::from_utf8(pivot).unwrap(), "Taxonomic_Rank\n");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
