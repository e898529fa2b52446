// 🗄️ Run Store - AnalysisReport → SQLite + WAL
// One transaction per run; every stage output is kept alongside its run id.

use crate::annual::AnnualProportion;
use crate::pipeline::AnalysisReport;
use crate::trend::RegressionResult;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Runs (one row per pipeline execution)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id TEXT UNIQUE NOT NULL,
            generated_at TEXT NOT NULL,
            year_start INTEGER NOT NULL,
            year_end INTEGER NOT NULL,
            record_count INTEGER NOT NULL,
            reappointment_count INTEGER NOT NULL,
            config TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Appointments with source and reconciled flags side by side
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS appointments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id TEXT NOT NULL,
            input_index INTEGER NOT NULL,
            content_hash TEXT NOT NULL,
            person_name TEXT,
            position TEXT,
            organization TEXT,
            year INTEGER,
            source_flag TEXT NOT NULL,
            inferred INTEGER NOT NULL,
            final_flag TEXT NOT NULL,
            source_file TEXT NOT NULL,
            line_number INTEGER NOT NULL,
            UNIQUE(run_id, input_index)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS org_year_counts (
            run_id TEXT NOT NULL,
            organization TEXT NOT NULL,
            year INTEGER NOT NULL,
            total_appointments INTEGER NOT NULL,
            reappointment_count INTEGER NOT NULL,
            rate REAL NOT NULL,
            PRIMARY KEY (run_id, organization, year)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS yearly_leaders (
            run_id TEXT NOT NULL,
            year INTEGER NOT NULL,
            organization TEXT NOT NULL,
            rate REAL NOT NULL,
            total_appointments INTEGER NOT NULL,
            runner_up TEXT,
            runner_up_rate REAL,
            margin REAL,
            PRIMARY KEY (run_id, year)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS annual_proportions (
            run_id TEXT NOT NULL,
            year INTEGER NOT NULL,
            total_appointments INTEGER NOT NULL,
            total_reappointments INTEGER NOT NULL,
            proportion REAL NOT NULL,
            PRIMARY KEY (run_id, year)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS regressions (
            run_id TEXT PRIMARY KEY,
            slope REAL NOT NULL,
            intercept REAL NOT NULL,
            r_squared REAL NOT NULL,
            p_value REAL NOT NULL,
            standard_error REAL NOT NULL,
            ci_low REAL NOT NULL,
            ci_high REAL NOT NULL,
            durbin_watson REAL,
            shapiro_p REAL,
            payload TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS run_warnings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            severity TEXT NOT NULL,
            message TEXT NOT NULL,
            data TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_appointments_hash ON appointments(content_hash)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_warnings_run ON run_warnings(run_id)",
        [],
    )?;

    Ok(())
}

/// Persist a complete run in one transaction; returns the run id
pub fn save_report(conn: &Connection, report: &AnalysisReport) -> Result<String> {
    let tx = conn
        .unchecked_transaction()
        .context("Failed to begin transaction")?;

    tx.execute(
        "INSERT INTO runs (run_id, generated_at, year_start, year_end, record_count, reappointment_count, config)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            report.run_id,
            report.generated_at.to_rfc3339(),
            report.config.year_start,
            report.config.year_end,
            report.record_count() as i64,
            report.reappointment_count() as i64,
            serde_json::to_string(&report.config)?,
        ],
    )
    .context("Failed to insert run")?;

    for a in &report.appointments {
        tx.execute(
            "INSERT INTO appointments (
                run_id, input_index, content_hash, person_name, position, organization,
                year, source_flag, inferred, final_flag, source_file, line_number
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                report.run_id,
                a.index as i64,
                a.record.content_hash(),
                a.record.person_name,
                a.record.position,
                a.record.organization,
                a.record.year,
                a.record.reappointed.as_str(),
                a.inferred,
                a.reappointed.as_str(),
                a.record.source_file,
                a.record.line_number as i64,
            ],
        )?;
    }

    for c in &report.org_year_counts {
        tx.execute(
            "INSERT INTO org_year_counts (run_id, organization, year, total_appointments, reappointment_count, rate)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                report.run_id,
                c.organization,
                c.year,
                c.total_appointments as i64,
                c.reappointment_count as i64,
                c.rate(),
            ],
        )?;
    }

    for l in &report.yearly_leaders {
        tx.execute(
            "INSERT INTO yearly_leaders (run_id, year, organization, rate, total_appointments, runner_up, runner_up_rate, margin)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                report.run_id,
                l.year,
                l.winner.organization,
                l.winner.rate,
                l.winner.total_appointments as i64,
                l.runner_up.as_ref().map(|r| r.organization.clone()),
                l.runner_up.as_ref().map(|r| r.rate),
                l.margin,
            ],
        )?;
    }

    for p in &report.annual_proportions {
        tx.execute(
            "INSERT INTO annual_proportions (run_id, year, total_appointments, total_reappointments, proportion)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                report.run_id,
                p.year,
                p.total_appointments as i64,
                p.total_reappointments as i64,
                p.proportion,
            ],
        )?;
    }

    if let Some(r) = &report.regression {
        tx.execute(
            "INSERT INTO regressions (run_id, slope, intercept, r_squared, p_value, standard_error,
                                      ci_low, ci_high, durbin_watson, shapiro_p, payload)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                report.run_id,
                r.slope,
                r.intercept,
                r.r_squared,
                r.p_value,
                r.standard_error,
                r.confidence_interval.0,
                r.confidence_interval.1,
                r.durbin_watson,
                r.shapiro_p,
                serde_json::to_string(r)?,
            ],
        )?;
    }

    for w in &report.warnings {
        tx.execute(
            "INSERT INTO run_warnings (run_id, kind, severity, message, data)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                report.run_id,
                w.kind(),
                format!("{:?}", w.severity()),
                w.to_string(),
                serde_json::to_string(w)?,
            ],
        )?;
    }

    tx.commit().context("Failed to commit run")?;
    info!(run_id = %report.run_id, records = report.record_count(), "run saved");

    Ok(report.run_id.clone())
}

pub fn load_annual_proportions(conn: &Connection, run_id: &str) -> Result<Vec<AnnualProportion>> {
    let mut stmt = conn.prepare(
        "SELECT year, total_appointments, total_reappointments, proportion
         FROM annual_proportions
         WHERE run_id = ?1
         ORDER BY year",
    )?;

    let rows = stmt
        .query_map(params![run_id], |row| {
            let total: i64 = row.get(1)?;
            let reappointed: i64 = row.get(2)?;
            Ok(AnnualProportion {
                year: row.get(0)?,
                total_appointments: total as u64,
                total_reappointments: reappointed as u64,
                proportion: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub fn load_regression(conn: &Connection, run_id: &str) -> Result<Option<RegressionResult>> {
    let payload: Option<String> = conn
        .query_row(
            "SELECT payload FROM regressions WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )
        .optional()?;

    payload
        .map(|json| serde_json::from_str(&json).context("Failed to parse stored regression"))
        .transpose()
}

pub fn count_runs(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
    Ok(count)
}

pub fn count_warnings(conn: &Connection, run_id: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM run_warnings WHERE run_id = ?1",
        params![run_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointment::{AppointmentRecord, ReappointedFlag};
    use crate::config::AnalysisConfig;
    use crate::pipeline::ReappointmentPipeline;

    fn create_test_report() -> AnalysisReport {
        let config = AnalysisConfig {
            year_start: 2013,
            year_end: 2016,
            min_appointments: 1,
            ..AnalysisConfig::default()
        };
        let mut records = Vec::new();
        for year in 2013..=2016 {
            records.push(AppointmentRecord::new("Ann Lee", "Chair", "Arts Council", Some(year), ReappointedFlag::False));
            records.push(AppointmentRecord::new(
                &format!("Newcomer {}", year),
                "Member",
                "Arts Council",
                Some(year),
                ReappointedFlag::Unknown,
            ));
        }
        records.push(AppointmentRecord::new("No Year", "Member", "Arts Council", None, ReappointedFlag::True));

        ReappointmentPipeline::new(config).unwrap().run(&records).unwrap()
    }

    #[test]
    fn test_save_and_reload_run() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let report = create_test_report();
        let run_id = save_report(&conn, &report).unwrap();

        assert_eq!(run_id, report.run_id);
        assert_eq!(count_runs(&conn).unwrap(), 1);
        assert_eq!(load_annual_proportions(&conn, &run_id).unwrap(), report.annual_proportions);
        assert_eq!(load_regression(&conn, &run_id).unwrap(), report.regression);
        assert_eq!(count_warnings(&conn, &run_id).unwrap(), report.warnings.len() as i64);

        let stored: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM appointments WHERE run_id = ?1 AND inferred = 1",
                params![run_id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, 3);
    }

    #[test]
    fn test_same_run_twice_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let report = create_test_report();
        save_report(&conn, &report).unwrap();

        assert!(save_report(&conn, &report).is_err());
        // Rolled back: still exactly one run and its appointments
        assert_eq!(count_runs(&conn).unwrap(), 1);
        let appointments: i64 = conn
            .query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))
            .unwrap();
        assert_eq!(appointments, report.appointments.len() as i64);
    }

    #[test]
    fn test_unknown_run_is_empty() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        assert!(load_annual_proportions(&conn, "missing").unwrap().is_empty());
        assert_eq!(load_regression(&conn, "missing").unwrap(), None);
    }
}
