//! Case label tables.
//!
//! MRNet distributes one headerless `case,label` file per task and split
//! (`train-acl.csv`, ...). Labels are kept as text; what they mean is up to
//! the training code.

use csv::{ReaderBuilder, Trim};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

/// Width MRNet pads numeric case ids to.
pub const CASE_ID_WIDTH: usize = 4;

/// Zero-pads purely numeric ids (`7` -> `0007`), leaves anything else alone.
pub fn normalize_case_id(raw: &str) -> String {
    let raw = raw.trim();
    if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
        format!("{raw:0>width$}", width = CASE_ID_WIDTH)
    } else {
        raw.to_string()
    }
}

/// Reads `case,label` records from any reader; `origin` only labels errors.
pub fn parse_labels<R: Read>(reader: R, origin: &Path) -> Result<BTreeMap<String, String>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut labels = BTreeMap::new();
    for result in rdr.records() {
        let record = result.map_err(|source| match source.position().map(|p| p.line()) {
            Some(line) => Error::Labels {
                path: origin.to_path_buf(),
                line: line as usize,
                msg: source.to_string(),
            },
            None => Error::Csv {
                path: origin.to_path_buf(),
                source,
            },
        })?;
        let line = record.position().map_or(0, |pos| pos.line() as usize);
        if record.iter().all(str::is_empty) {
            continue;
        }
        let bad = |msg: String| Error::Labels {
            path: origin.to_path_buf(),
            line,
            msg,
        };
        if record.len() != 2 || record[0].is_empty() || record[1].is_empty() {
            let fields: Vec<&str> = record.iter().collect();
            return Err(bad(format!("expected `case,label`, got {fields:?}")));
        }
        let case = normalize_case_id(&record[0]);
        if labels.insert(case.clone(), record[1].to_string()).is_some() {
            return Err(bad(format!("duplicate case {case}")));
        }
    }
    Ok(labels)
}

pub fn read_labels<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, String>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_labels(file, path)
}

/// Case ids paired with their labels, where a label exists.
#[derive(Debug, Clone, Default)]
pub struct LabeledCases {
    labeled: Vec<(String, String)>,
    unlabeled: Vec<String>,
}

impl LabeledCases {
    pub fn new(labels: &BTreeMap<String, String>, case_ids: &BTreeSet<String>) -> Self {
        let mut out = LabeledCases::default();
        for id in case_ids {
            match labels.get(id) {
                Some(label) => out.labeled.push((id.clone(), label.clone())),
                None => out.unlabeled.push(id.clone()),
            }
        }
        out
    }

    /// `(case, label)` pairs in case id order.
    pub fn labeled(&self) -> &[(String, String)] {
        &self.labeled
    }

    /// Ids found on disk that the label table does not mention.
    pub fn unlabeled(&self) -> &[String] {
        &self.unlabeled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn parse(text: &str) -> Result<BTreeMap<String, String>> {
        parse_labels(text.as_bytes(), Path::new("train-acl.csv"))
    }

    #[test]
    fn numeric_ids_are_zero_padded() {
        let labels = parse("0,0\n7,1\n\n1130 , 0\n").unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels["0000"], "0");
        assert_eq!(labels["0007"], "1");
        assert_eq!(labels["1130"], "0");
        assert_eq!(normalize_case_id("case-a"), "case-a");
    }

    #[test]
    fn quoted_fields_are_unquoted() {
        let labels = parse("\"0001\",1\n\"12\",\"0\"\n").unwrap();
        assert_eq!(labels["0001"], "1");
        assert_eq!(labels["0012"], "0");
    }

    #[test]
    fn malformed_lines_report_position() {
        match parse("0000,1\n0001\n").unwrap_err() {
            Error::Labels { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other}"),
        }
        assert!(parse("0000,1,2\n").is_err());
        assert!(parse("0000,\n").is_err());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = parse("1,0\n0001,1\n").unwrap_err();
        assert!(err.to_string().contains("duplicate case 0001"));
    }

    #[test]
    fn reads_label_file_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("valid-acl.csv");
        fs::write(&path, "1130,0\n1131,1\n").unwrap();
        let labels = read_labels(&path).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["1131"], "1");

        let err = read_labels(dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn pairs_ids_with_labels() {
        let labels = parse("0000,1\n0002,0\n").unwrap();
        let ids: BTreeSet<String> = ["0000", "0001", "0002"].map(String::from).into();
        let cases = LabeledCases::new(&labels, &ids);
        assert_eq!(cases.labeled().len(), 2);
        assert_eq!(cases.labeled()[1], ("0002".to_string(), "0".to_string()));
        assert_eq!(cases.unlabeled(), ["0001".to_string()]);
    }
}
