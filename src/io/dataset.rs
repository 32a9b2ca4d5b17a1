//! The applicant dataset (CSV) store.
//!
//! The store keeps two views of the same file:
//!
//! - the raw `Table` (header + cells, verbatim) which is what gets rewritten,
//!   so columns this tool does not know about and rows it cannot parse survive
//! - the parsed `StoredRecord` view used for scoring, training and charts
//!
//! Every mutation follows the same protocol:
//! take `<file>.lock`, re-read the file, apply the change, write a temp file in
//! the same directory, fsync, rename over the original, release the lock.
//! A failure at any step leaves the previous file untouched.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::domain::{ApplicantRecord, Prediction, RecordSource, RiskLabel};
use crate::error::AppError;

pub const COL_AGE: &str = "person_age";
pub const COL_INCOME: &str = "person_income";
pub const COL_LOAN: &str = "loan_amnt";
pub const COL_RATE: &str = "loan_int_rate";
pub const COL_GRADE: &str = "loan_grade";
pub const COL_OWNERSHIP: &str = "person_home_ownership";
pub const COL_STATUS: &str = "loan_status";
pub const COL_LABEL: &str = "hasil_prediksi";
pub const COL_PROBABILITY: &str = "probabilitas_risiko";
pub const COL_SOURCE: &str = "record_source";

/// Columns written for every new file, in order.
pub const CANONICAL_COLUMNS: [&str; 10] = [
    COL_AGE,
    COL_INCOME,
    COL_LOAN,
    COL_RATE,
    COL_GRADE,
    COL_OWNERSHIP,
    COL_STATUS,
    COL_LABEL,
    COL_PROBABILITY,
    COL_SOURCE,
];

const REQUIRED_COLUMNS: [&str; 6] = [COL_AGE, COL_INCOME, COL_LOAN, COL_RATE, COL_GRADE, COL_OWNERSHIP];

const LOCK_ATTEMPTS: usize = 50;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(20);

/// Raw CSV contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn canonical() -> Self {
        Self {
            headers: CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn header_map(&self) -> HashMap<String, usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (normalize_header_name(name), idx))
            .collect()
    }

    /// Index of `name`, adding the column (empty cells) if it is missing.
    ///
    /// Cells are kept untrimmed; parsing trims them.
    fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.header_map().get(name) {
            return *idx;
        }
        let idx = self.headers.len();
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            // Cells past the old header stay after the new column.
            if row.len() < idx {
                row.resize(idx, String::new());
            }
            row.insert(idx, String::new());
        }
        idx
    }

    fn ensure_canonical_columns(&mut self) {
        for col in CANONICAL_COLUMNS {
            self.ensure_column(col);
        }
    }

    fn row_from_record(&self, record: &ApplicantRecord) -> Vec<String> {
        self.headers
            .iter()
            .map(|h| match normalize_header_name(h).as_str() {
                COL_AGE => record.age.to_string(),
                COL_INCOME => record.annual_income.to_string(),
                COL_LOAN => record.loan_amount.to_string(),
                COL_RATE => record.interest_rate.to_string(),
                COL_GRADE => record.loan_grade.letter().to_string(),
                COL_OWNERSHIP => record.home_ownership.label().to_string(),
                COL_STATUS => record.loan_status.map(|s| s.to_string()).unwrap_or_default(),
                COL_LABEL => record.risk_label.map(|l| l.as_str().to_string()).unwrap_or_default(),
                COL_PROBABILITY => record.risk_probability.map(|p| p.to_string()).unwrap_or_default(),
                COL_SOURCE => record.source.as_str().to_string(),
                _ => String::new(),
            })
            .collect()
    }
}

/// A parsed dataset row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Index into `Table::rows`.
    pub row: usize,
    /// 1-based CSV line (header is line 1).
    pub line: usize,
    pub record: ApplicantRecord,
}

/// A row that could not be parsed (kept verbatim in the table).
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Outcome of a batch prediction update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateSummary {
    pub rows_updated: usize,
    /// Rows whose empty `loan_status` was filled with the prediction.
    pub status_filled: usize,
}

#[derive(Debug)]
pub struct DatasetStore {
    path: PathBuf,
    table: Table,
    records: Vec<StoredRecord>,
    row_errors: Vec<RowError>,
}

impl DatasetStore {
    /// Load the dataset at `path`. A missing file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let table = read_table(&path)?;
        let (records, row_errors) = parse_table(&table)?;

        info!(
            path = %path.display(),
            rows = table.rows.len(),
            parsed = records.len(),
            row_errors = row_errors.len(),
            "dataset loaded"
        );
        if !row_errors.is_empty() {
            warn!(count = row_errors.len(), "dataset rows could not be parsed and are excluded from the view");
        }

        Ok(Self {
            path,
            table,
            records,
            row_errors,
        })
    }

    /// Create (or replace) the dataset at `path` with exactly `records`.
    pub fn create(path: impl Into<PathBuf>, records: &[ApplicantRecord]) -> Result<Self, AppError> {
        let path = path.into();
        let mut table = Table::canonical();
        for r in records {
            let row = table.row_from_record(r);
            table.rows.push(row);
        }

        {
            let _lock = WriteLock::acquire(&path)?;
            write_table_atomic(&path, &table)?;
        }
        info!(path = %path.display(), rows = records.len(), "dataset written");

        let mut store = Self {
            path,
            table: Table::default(),
            records: Vec::new(),
            row_errors: Vec::new(),
        };
        store.replace_table(table)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[StoredRecord] {
        &self.records
    }

    /// Iterate over the parsed applicant rows.
    pub fn applicants(&self) -> impl Iterator<Item = &ApplicantRecord> {
        self.records.iter().map(|r| &r.record)
    }

    pub fn row_errors(&self) -> &[RowError] {
        &self.row_errors
    }

    /// Raw row count (parsed + unparseable).
    pub fn total_rows(&self) -> usize {
        self.table.rows.len()
    }

    pub fn headers(&self) -> &[String] {
        &self.table.headers
    }

    /// Re-read the file from disk.
    pub fn reload(&mut self) -> Result<(), AppError> {
        let table = read_table(&self.path)?;
        self.replace_table(table)
    }

    /// Append one record and persist the full table atomically.
    ///
    /// The on-disk file is re-read under the lock first, so rows appended by
    /// other writers since `open` are kept.
    pub fn append(&mut self, record: &ApplicantRecord) -> Result<(), AppError> {
        let _lock = WriteLock::acquire(&self.path)?;

        let mut table = read_table(&self.path)?;
        table.ensure_canonical_columns();
        let row = table.row_from_record(record);
        table.rows.push(row);

        write_table_atomic(&self.path, &table)?;
        debug!(path = %self.path.display(), rows = table.rows.len(), "record appended");

        self.replace_table(table)
    }

    /// Write model predictions into existing rows.
    ///
    /// `score` receives the freshly re-read parsed rows and returns
    /// `(table_row, prediction)` pairs. For each pair the probability cell is
    /// overwritten; `loan_status` is only filled when empty (and the row is then
    /// marked `predicted`), so observed outcomes are never replaced. The label
    /// is derived from the resulting `loan_status`.
    pub fn update_predictions<F>(&mut self, score: F) -> Result<UpdateSummary, AppError>
    where
        F: FnOnce(&[StoredRecord]) -> Result<Vec<(usize, Prediction)>, AppError>,
    {
        let _lock = WriteLock::acquire(&self.path)?;

        let mut table = read_table(&self.path)?;
        let (records, _) = parse_table(&table)?;
        let updates = score(&records)?;

        table.ensure_canonical_columns();
        let map = table.header_map();
        let col = |name: &str| map.get(name).copied().unwrap_or(0);
        let (status_col, label_col, prob_col, source_col) =
            (col(COL_STATUS), col(COL_LABEL), col(COL_PROBABILITY), col(COL_SOURCE));

        let mut summary = UpdateSummary::default();
        for (row, prediction) in updates {
            let Some(cells) = table.rows.get_mut(row) else {
                return Err(AppError::new(4, format!("Prediction refers to missing row {row}.")));
            };
            let existing = cells[status_col].trim().to_string();
            let status = if existing.is_empty() || existing.eq_ignore_ascii_case("nan") {
                cells[status_col] = prediction.loan_status.to_string();
                cells[source_col] = RecordSource::Predicted.as_str().to_string();
                summary.status_filled += 1;
                prediction.loan_status
            } else {
                let status = parse_status(&existing).map_err(|e| AppError::new(4, format!("Row {row}: {e}")))?;
                if cells[source_col].trim().is_empty() {
                    cells[source_col] = RecordSource::Observed.as_str().to_string();
                }
                status
            };
            // The label always follows the row's final status.
            cells[label_col] = RiskLabel::from_status(status).as_str().to_string();
            cells[prob_col] = prediction.probability.to_string();
            summary.rows_updated += 1;
        }

        write_table_atomic(&self.path, &table)?;
        info!(
            path = %self.path.display(),
            updated = summary.rows_updated,
            status_filled = summary.status_filled,
            "predictions written"
        );

        self.replace_table(table)?;
        Ok(summary)
    }

    fn replace_table(&mut self, table: Table) -> Result<(), AppError> {
        let (records, row_errors) = parse_table(&table)?;
        self.table = table;
        self.records = records;
        self.row_errors = row_errors;
        Ok(())
    }
}

/// Exclusive writer lock: a sibling `<file>.lock` created with `create_new`.
struct WriteLock {
    path: PathBuf,
}

impl WriteLock {
    fn acquire(dataset: &Path) -> Result<Self, AppError> {
        let mut name = dataset
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "dataset".into());
        name.push(".lock");
        let path = dataset.with_file_name(name);

        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .map_err(|e| AppError::storage(format!("Failed to create directory '{}': {e}", dir.display())))?;
        }

        for attempt in 0..LOCK_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if attempt + 1 < LOCK_ATTEMPTS {
                        thread::sleep(LOCK_RETRY_DELAY);
                    }
                }
                Err(e) => {
                    return Err(AppError::storage(format!(
                        "Failed to create dataset lock '{}': {e}",
                        path.display()
                    )));
                }
            }
        }

        Err(AppError::storage(format!(
            "Dataset is locked by another writer ('{}' exists). Remove it if no other process is running.",
            path.display()
        )))
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn read_table(path: &Path) -> Result<Table, AppError> {
    if !path.exists() {
        debug!(path = %path.display(), "dataset file missing; starting empty");
        return Ok(Table::canonical());
    }

    let file = File::open(path)
        .map_err(|e| AppError::invalid(format!("Failed to open dataset '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::invalid(format!("Failed to read dataset headers: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Ok(Table::canonical());
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // Unreadable rows abort the load; a rewrite would otherwise drop them.
        let record = result.map_err(|e| AppError::invalid(format!("CSV parse error near line {}: {e}", idx + 2)))?;
        let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
        if cells.len() < headers.len() {
            cells.resize(headers.len(), String::new());
        }
        rows.push(cells);
    }

    Ok(Table { headers, rows })
}

fn write_table_atomic(path: &Path, table: &Table) -> Result<(), AppError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .map_err(|e| AppError::storage(format!("Failed to create directory '{}': {e}", dir.display())))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| AppError::storage(format!("Failed to create temp file in '{}': {e}", dir.display())))?;

    {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(tmp.as_file_mut());
        writer
            .write_record(&table.headers)
            .map_err(|e| AppError::storage(format!("Failed to write dataset header: {e}")))?;
        for row in &table.rows {
            writer
                .write_record(row)
                .map_err(|e| AppError::storage(format!("Failed to write dataset row: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::storage(format!("Failed to flush dataset: {e}")))?;
    }

    tmp.as_file()
        .sync_all()
        .map_err(|e| AppError::storage(format!("Failed to sync dataset: {e}")))?;
    tmp.persist(path)
        .map_err(|e| AppError::storage(format!("Failed to replace dataset '{}': {e}", path.display())))?;
    Ok(())
}

fn parse_table(table: &Table) -> Result<(Vec<StoredRecord>, Vec<RowError>), AppError> {
    let header_map = table.header_map();
    for col in REQUIRED_COLUMNS {
        if !header_map.contains_key(col) {
            return Err(AppError::invalid(format!("Missing required dataset column: `{col}`")));
        }
    }

    let mut records = Vec::with_capacity(table.rows.len());
    let mut row_errors = Vec::new();

    for (row, cells) in table.rows.iter().enumerate() {
        // +2: 1-based lines, header on line 1.
        let line = row + 2;
        match parse_row(cells, &header_map) {
            Ok(record) => records.push(StoredRecord { row, line, record }),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    Ok((records, row_errors))
}

fn parse_row(cells: &[String], header_map: &HashMap<String, usize>) -> Result<ApplicantRecord, String> {
    let age = parse_age(get_required(cells, header_map, COL_AGE)?)?;
    let annual_income = parse_f64(COL_INCOME, get_required(cells, header_map, COL_INCOME)?)?;
    let loan_amount = parse_f64(COL_LOAN, get_required(cells, header_map, COL_LOAN)?)?;
    let interest_rate = parse_f64(COL_RATE, get_required(cells, header_map, COL_RATE)?)?;

    let loan_grade = get_required(cells, header_map, COL_GRADE)?
        .parse()
        .map_err(|e: AppError| e.message().to_string())?;
    let home_ownership = get_required(cells, header_map, COL_OWNERSHIP)?
        .parse()
        .map_err(|e: AppError| e.message().to_string())?;

    let loan_status = get_optional(cells, header_map, COL_STATUS)
        .map(parse_status)
        .transpose()?;
    let risk_probability = get_optional(cells, header_map, COL_PROBABILITY)
        .map(|s| parse_f64(COL_PROBABILITY, s))
        .transpose()?;
    let risk_label = get_optional(cells, header_map, COL_LABEL)
        .map(|s| s.parse::<RiskLabel>().map_err(|e| e.message().to_string()))
        .transpose()?;
    let source = get_optional(cells, header_map, COL_SOURCE)
        .map(|s| s.parse::<RecordSource>().map_err(|e| e.message().to_string()))
        .transpose()?
        .unwrap_or_default();

    Ok(ApplicantRecord {
        age,
        annual_income,
        loan_amount,
        interest_rate,
        loan_grade,
        home_ownership,
        loan_status,
        risk_probability,
        risk_label,
        source,
    })
}

fn normalize_header_name(name: &str) -> String {
    // Strip a UTF-8 BOM that spreadsheet exports put on the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn get_required<'a>(cells: &'a [String], header_map: &HashMap<String, usize>, name: &str) -> Result<&'a str, String> {
    get_optional(cells, header_map, name).ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(cells: &'a [String], header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    cells
        .get(*idx)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("nan"))
}

fn parse_f64(name: &str, s: &str) -> Result<f64, String> {
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid number for `{name}`: '{s}'"))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite value for `{name}`: '{s}'"))
    }
}

fn parse_age(s: &str) -> Result<u32, String> {
    let v = parse_f64(COL_AGE, s)?;
    if v < 0.0 || v.fract() != 0.0 || v > u32::MAX as f64 {
        return Err(format!("Invalid age '{s}'"));
    }
    Ok(v as u32)
}

fn parse_status(s: &str) -> Result<u8, String> {
    match parse_f64(COL_STATUS, s)? {
        v if v == 0.0 => Ok(0),
        v if v == 1.0 => Ok(1),
        _ => Err(format!("Invalid `{COL_STATUS}` '{s}' (expected 0 or 1)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HomeOwnership, LoanGrade};

    fn scored_record() -> ApplicantRecord {
        ApplicantRecord {
            age: 35,
            annual_income: 60_000.0,
            loan_amount: 10_000.0,
            interest_rate: 11.5,
            loan_grade: LoanGrade::B,
            home_ownership: HomeOwnership::Own,
            loan_status: Some(1),
            risk_probability: Some(0.6123),
            risk_label: Some(RiskLabel::High),
            source: RecordSource::Predicted,
        }
    }

    const LEGACY_CSV: &str = "\u{feff}person_age,person_income,person_home_ownership,loan_intent,loan_grade,loan_amnt,loan_int_rate,loan_status\n\
22,59000,RENT,PERSONAL,D,35000,16.02,1\n\
21,9600,OWN,EDUCATION,B,1000,,0\n\
25,9600,MORTGAGE,MEDICAL,C,5500,12.87,1\n";

    #[test]
    fn append_round_trips_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");

        let mut store = DatasetStore::open(&path).unwrap();
        assert_eq!(store.records().len(), 0);

        let r = scored_record();
        store.append(&r).unwrap();

        let reopened = DatasetStore::open(&path).unwrap();
        assert_eq!(reopened.records().len(), 1);
        assert_eq!(reopened.records()[0].record, r);
        assert_eq!(reopened.headers().len(), CANONICAL_COLUMNS.len());
    }

    #[test]
    fn append_adds_exactly_one_row_and_keeps_unknown_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credit.csv");
        fs::write(&path, LEGACY_CSV).unwrap();

        let mut store = DatasetStore::open(&path).unwrap();
        let before = store.records().len();
        assert_eq!(before, 2);
        assert_eq!(store.row_errors().len(), 1);
        assert_eq!(store.row_errors()[0].line, 3);

        let r = scored_record();
        store.append(&r).unwrap();

        let reopened = DatasetStore::open(&path).unwrap();
        assert_eq!(reopened.records().len(), before + 1);
        assert_eq!(reopened.records().last().unwrap().record, r);
        // The unparseable row and the extra column survive the rewrite.
        assert_eq!(reopened.total_rows(), 4);
        assert!(reopened.headers().iter().any(|h| h == "loan_intent"));
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("EDUCATION"));
        assert!(text.contains("PERSONAL"));
    }

    #[test]
    fn legacy_rows_parse_as_observed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credit.csv");
        fs::write(&path, LEGACY_CSV).unwrap();

        let store = DatasetStore::open(&path).unwrap();
        let first = &store.records()[0].record;
        assert_eq!(first.age, 22);
        assert_eq!(first.loan_grade, LoanGrade::D);
        assert_eq!(first.loan_status, Some(1));
        assert_eq!(first.source, RecordSource::Observed);
        assert_eq!(first.risk_label, None);
        assert!(first.has_observed_label());
    }

    #[test]
    fn pandas_style_cells_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.csv");
        fs::write(
            &path,
            "person_age,person_income,loan_amnt,loan_int_rate,loan_grade,person_home_ownership,loan_status,hasil_prediksi,probabilitas_risiko\n\
             30.0,50000.0,8000.0,10.5,a,own,1.0,Risiko Tinggi,0.81\n\
             40,70000,9000,9.5,B,RENT,,,\n",
        )
        .unwrap();

        let store = DatasetStore::open(&path).unwrap();
        assert_eq!(store.records().len(), 2);
        let r = &store.records()[0].record;
        assert_eq!(r.age, 30);
        assert_eq!(r.loan_status, Some(1));
        assert_eq!(r.risk_label, Some(RiskLabel::High));
        assert_eq!(r.risk_probability, Some(0.81));
        assert_eq!(store.records()[1].record.loan_status, None);
    }

    #[test]
    fn missing_required_column_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "person_age,person_income\n30,1000\n").unwrap();
        let err = DatasetStore::open(&path).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn held_lock_blocks_writers_and_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credit.csv");
        fs::write(&path, LEGACY_CSV).unwrap();
        fs::write(dir.path().join("credit.csv.lock"), "").unwrap();

        let mut store = DatasetStore::open(&path).unwrap();
        let err = store.append(&scored_record()).unwrap_err();
        assert_eq!(err.exit_code(), 5);
        assert_eq!(fs::read_to_string(&path).unwrap(), LEGACY_CSV);
        assert_eq!(store.records().len(), 2);
    }

    #[test]
    fn append_sees_rows_written_by_another_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.csv");

        let mut a = DatasetStore::open(&path).unwrap();
        let mut b = DatasetStore::open(&path).unwrap();
        a.append(&scored_record()).unwrap();
        b.append(&scored_record()).unwrap();

        assert_eq!(b.records().len(), 2);
        a.reload().unwrap();
        assert_eq!(a.records().len(), 2);
    }

    #[test]
    fn prediction_updates_never_overwrite_observed_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credit.csv");
        fs::write(
            &path,
            "person_age,person_income,loan_amnt,loan_int_rate,loan_grade,person_home_ownership,loan_status\n\
             30,50000,8000,10.5,A,OWN,1\n\
             40,70000,9000,9.5,B,RENT,\n",
        )
        .unwrap();

        let mut store = DatasetStore::open(&path).unwrap();
        let summary = store
            .update_predictions(|rows| Ok(rows.iter().map(|r| (r.row, Prediction::new(0, 0.12))).collect()))
            .unwrap();
        assert_eq!(summary.rows_updated, 2);
        assert_eq!(summary.status_filled, 1);

        let first = &store.records()[0].record;
        assert_eq!(first.loan_status, Some(1));
        assert_eq!(first.source, RecordSource::Observed);
        assert_eq!(first.risk_label, Some(RiskLabel::High));
        assert_eq!(first.risk_probability, Some(0.12));

        let second = &store.records()[1].record;
        assert_eq!(second.loan_status, Some(0));
        assert_eq!(second.source, RecordSource::Predicted);
        assert_eq!(second.risk_probability, Some(0.12));
        assert_eq!(second.risk_label, Some(RiskLabel::Low));

        for r in store.applicants() {
            assert_eq!(r.risk_label, r.loan_status.map(RiskLabel::from_status));
        }
    }

    #[test]
    fn overlong_rows_keep_their_extra_cells_when_columns_are_added() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credit.csv");
        fs::write(
            &path,
            "person_age,person_income,loan_amnt,loan_int_rate,loan_grade,person_home_ownership,loan_status\n\
             30,50000,8000,10.5,A,OWN,0,stray\n\
             41,61000,7000,9.5,C,RENT,1\n",
        )
        .unwrap();

        let mut store = DatasetStore::open(&path).unwrap();
        assert_eq!(store.records().len(), 2);
        store.append(&scored_record()).unwrap();

        let reopened = DatasetStore::open(&path).unwrap();
        assert!(reopened.row_errors().is_empty(), "{:?}", reopened.row_errors());
        assert_eq!(reopened.records().len(), 3);
        let first = &reopened.records()[0].record;
        assert_eq!(first.loan_status, Some(0));
        assert_eq!(first.risk_label, None);
        assert_eq!(first.source, RecordSource::Observed);
        let line = fs::read_to_string(&path).unwrap().lines().nth(1).unwrap().to_string();
        assert_eq!(line, "30,50000,8000,10.5,A,OWN,0,,,,stray");
    }

    #[test]
    fn unknown_cells_are_rewritten_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credit.csv");
        fs::write(
            &path,
            "person_age,person_income,loan_amnt,loan_int_rate,loan_grade,person_home_ownership,loan_status,note\n\
             \x2030,50000,8000,10.5,A,OWN,1,  padded note \n",
        )
        .unwrap();

        let mut store = DatasetStore::open(&path).unwrap();
        // Numeric cells are trimmed when parsed.
        assert_eq!(store.records()[0].record.age, 30);
        store.append(&scored_record()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains(",  padded note ,"), "{text}");
        assert!(text.lines().nth(1).unwrap().starts_with(" 30,"));
    }

    #[test]
    fn create_writes_canonical_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("new.csv");
        let store = DatasetStore::create(&path, &[scored_record(), scored_record()]).unwrap();
        assert_eq!(store.records().len(), 2);
        assert!(!dir.path().join("nested").join("new.csv.lock").exists());
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("person_age,person_income,loan_amnt"));
    }
}
