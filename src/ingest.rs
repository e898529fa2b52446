// 📥 Appointment Ingestion - per-year CSV tables → AppointmentRecord
// The tri-state reappointed flag and the integer year are decided here, once.

use crate::appointment::{parse_year, AppointmentRecord, ReappointedFlag};
use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

// ============================================================================
// COLUMN MAPPING
// ============================================================================

/// Header positions of the recognised columns (case-insensitive, exact names)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub name: Option<usize>,
    pub position: Option<usize>,
    pub organization: Option<usize>,
    pub year: Option<usize>,
    pub reappointed: Option<usize>,
}

impl ColumnMap {
    pub fn from_headers(headers: &StringRecord) -> Self {
        let mut map = ColumnMap::default();
        for (index, header) in headers.iter().enumerate() {
            let slot = match header.trim().to_lowercase().as_str() {
                "name" | "person_name" => &mut map.name,
                "position" => &mut map.position,
                "org" | "organization" => &mut map.organization,
                "year" => &mut map.year,
                "reappointed" => &mut map.reappointed,
                _ => continue,
            };
            // First matching column wins
            if slot.is_none() {
                *slot = Some(index);
            }
        }
        map
    }

    pub fn has_identity_column(&self) -> bool {
        self.name.is_some() || self.position.is_some() || self.organization.is_some()
    }

    /// Header row with recognised columns renamed to their canonical field
    /// names; every other column gets a name serde will ignore
    fn canonical_headers(&self, headers: &StringRecord) -> StringRecord {
        let mut canonical: Vec<String> = (0..headers.len()).map(|i| format!("_col{}", i)).collect();
        for (slot, field) in [
            (self.name, "name"),
            (self.position, "position"),
            (self.organization, "org"),
            (self.year, "year"),
            (self.reappointed, "reappointed"),
        ] {
            if let Some(index) = slot {
                canonical[index] = field.to_string();
            }
        }
        StringRecord::from(canonical)
    }
}

/// One raw table row; blank cells deserialize to `None`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AppointmentRow {
    name: Option<String>,
    position: Option<String>,
    org: Option<String>,
    year: Option<String>,
    reappointed: Option<String>,
}

/// Trailing 4-digit year in a file stem, e.g. `appointments_2017.csv` → 2017
pub fn year_from_file_name(path: &Path) -> Option<i32> {
    let stem = path.file_stem()?.to_str()?;
    let digits: Vec<char> = stem.chars().collect();
    (0..digits.len().saturating_sub(3))
        .rev()
        .map(|start| &digits[start..start + 4])
        .find(|window| window.iter().all(|c| c.is_ascii_digit()))
        .and_then(|window| window.iter().collect::<String>().parse().ok())
}

// ============================================================================
// LOADERS
// ============================================================================

/// Load one appointment table. Row order is preserved.
pub fn load_appointments_csv(path: &Path) -> Result<Vec<AppointmentRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file);

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.csv")
        .to_string();

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read CSV header in {}", filename))?
        .clone();
    let columns = ColumnMap::from_headers(&headers);
    if !columns.has_identity_column() {
        bail!(
            "{} has none of the name, position or org columns (headers: {:?})",
            filename,
            headers.iter().collect::<Vec<_>>()
        );
    }
    let fallback_year = if columns.year.is_none() {
        year_from_file_name(path)
    } else {
        None
    };

    reader.set_headers(columns.canonical_headers(&headers));

    let mut records = Vec::new();
    for (line_num, result) in reader.deserialize::<AppointmentRow>().enumerate() {
        let row = result.with_context(|| {
            format!("Failed to parse CSV line {} in {}", line_num + 2, filename)
        })?;

        let year = match columns.year {
            Some(_) => row.year.as_deref().and_then(parse_year),
            None => fallback_year,
        };
        let reappointed = row
            .reappointed
            .as_deref()
            .map(ReappointedFlag::parse)
            .unwrap_or(ReappointedFlag::Unknown);

        records.push(AppointmentRecord {
            person_name: row.name,
            position: row.position,
            organization: row.org,
            year,
            reappointed,
            source_file: filename.clone(),
            line_number: line_num + 2, // +2 because: 1-indexed + header row
        });
    }

    debug!(file = %filename, rows = records.len(), "loaded appointment table");
    Ok(records)
}

/// Load several tables in the given order, concatenated
pub fn load_appointment_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<AppointmentRecord>> {
    let mut all = Vec::new();
    for path in paths {
        all.extend(load_appointments_csv(path.as_ref())?);
    }
    info!(files = paths.len(), records = all.len(), "ingestion complete");
    Ok(all)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_with_year_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "appointments.csv",
            "Name,Position,Org,Year,Reappointed\n\
             Jane Doe,Chair,Health Agency,2015,yes\n\
             John Roe,Member,Arts Council,2015.0,FALSE\n\
             Pat Poe,Member,,n/a,maybe\n",
        );

        let records = load_appointments_csv(&path).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].person_name.as_deref(), Some("Jane Doe"));
        assert_eq!(records[0].year, Some(2015));
        assert_eq!(records[0].reappointed, ReappointedFlag::True);
        assert_eq!(records[1].year, Some(2015));
        assert_eq!(records[1].reappointed, ReappointedFlag::False);
        assert_eq!(records[2].organization, None);
        assert_eq!(records[2].year, None);
        assert_eq!(records[2].reappointed, ReappointedFlag::Unknown);
        assert_eq!(records[2].line_number, 4);
        assert_eq!(records[2].source_file, "appointments.csv");
    }

    #[test]
    fn test_unrecognised_and_duplicate_columns_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "appointments.csv",
            "Name,Person_Name,Notes,Position,Organization,Year\n\
             \x20Jane Doe ,Someone Else,term renewed,Chair,   ,2016\n\
             John Roe,,,Member\n",
        );

        let records = load_appointments_csv(&path).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].person_name.as_deref(), Some("Jane Doe"));
        assert_eq!(records[0].position.as_deref(), Some("Chair"));
        assert_eq!(records[0].organization, None);
        assert_eq!(records[0].year, Some(2016));
        // Short row: trailing cells are simply absent
        assert_eq!(records[1].person_name.as_deref(), Some("John Roe"));
        assert_eq!(records[1].organization, None);
        assert_eq!(records[1].year, None);
        assert_eq!(records[1].reappointed, ReappointedFlag::Unknown);
    }

    #[test]
    fn test_year_from_file_name_when_column_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "appointments_2017.csv",
            "name,position,organization\nJane Doe,Chair,Health Agency\n",
        );

        let records = load_appointments_csv(&path).unwrap();
        assert_eq!(records[0].year, Some(2017));
        assert_eq!(records[0].reappointed, ReappointedFlag::Unknown);
    }

    #[test]
    fn test_year_from_file_name() {
        assert_eq!(year_from_file_name(Path::new("data/appointments_2013.csv")), Some(2013));
        assert_eq!(year_from_file_name(Path::new("2019-export.csv")), Some(2019));
        assert_eq!(year_from_file_name(Path::new("appointments.csv")), None);
        assert_eq!(year_from_file_name(Path::new("a1.csv")), None);
    }

    #[test]
    fn test_missing_identity_columns_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "bad.csv", "year,reappointed\n2015,true\n");

        let err = load_appointments_csv(&path).unwrap_err();
        assert!(err.to_string().contains("bad.csv"));
    }

    #[test]
    fn test_files_concatenate_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_csv(dir.path(), "appointments_2014.csv", "name,position,org\nA,Chair,X\n");
        let b = write_csv(dir.path(), "appointments_2013.csv", "name,position,org\nB,Chair,X\n");

        let records = load_appointment_files(&[a, b]).unwrap();
        let names: Vec<_> = records.iter().map(|r| r.person_name.clone().unwrap()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(records[1].year, Some(2013));
    }

    #[test]
    fn test_missing_file() {
        assert!(load_appointments_csv(Path::new("/nonexistent/file.csv")).is_err());
    }
}
