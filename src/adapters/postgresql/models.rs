//! PostgreSQL row mapping
//!
//! Converts between `tokio_postgres` rows and domain records, and renders
//! partial job updates into a single guarded `UPDATE` statement.

use crate::domain::ids::{JobId, ToolId, UserId};
use crate::domain::job::{ExportJob, JobStatus, JobUpdate};
use crate::domain::tool::ToolRecord;
use crate::domain::{Result, ToolpackError};
use chrono::{DateTime, Utc};
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;
use uuid::Uuid;

/// Columns selected for every job read
pub const JOB_COLUMNS: &str = "job_id, tool_id, user_id, status, steps_total, steps_completed, \
     progress_percentage, current_step, error_message, package_path, package_size_bytes, \
     completed_steps, created_at, updated_at, completed_at";

/// Columns selected for every tool read
pub const TOOL_COLUMNS: &str = "id, name, owner_id, configuration, created_at, updated_at";

fn column<'a, T: tokio_postgres::types::FromSql<'a>>(row: &'a Row, name: &str) -> Result<T> {
    row.try_get(name)
        .map_err(|e| ToolpackError::Database(format!("Failed to read column '{}': {}", name, e)))
}

fn to_u32(value: i32, name: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| ToolpackError::Database(format!("Column '{}' is negative: {}", name, value)))
}

/// Map an `export_jobs` row
///
/// # Errors
///
/// Returns a database error if a column is missing or holds an invalid value.
pub fn job_from_row(row: &Row) -> Result<ExportJob> {
    let job_id: Uuid = column(row, "job_id")?;
    let status: String = column(row, "status")?;
    let progress: i16 = column(row, "progress_percentage")?;
    let package_size: Option<i64> = column(row, "package_size_bytes")?;

    Ok(ExportJob {
        job_id: JobId::from_uuid(job_id),
        tool_id: ToolId::new(column::<String>(row, "tool_id")?),
        user_id: UserId::new(column::<String>(row, "user_id")?),
        status: status
            .parse::<JobStatus>()
            .map_err(|e| ToolpackError::Database(format!("Stored job status: {}", e)))?,
        steps_total: to_u32(column(row, "steps_total")?, "steps_total")?,
        steps_completed: to_u32(column(row, "steps_completed")?, "steps_completed")?,
        progress_percentage: progress.clamp(0, 100) as u8,
        current_step: column(row, "current_step")?,
        error_message: column(row, "error_message")?,
        package_path: column(row, "package_path")?,
        package_size_bytes: package_size.map(|size| size.max(0) as u64),
        completed_steps: column(row, "completed_steps")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
        completed_at: column(row, "completed_at")?,
    })
}

/// Map a `tools` row
///
/// # Errors
///
/// Returns a database error if a column is missing or holds an invalid value.
pub fn tool_from_row(row: &Row) -> Result<ToolRecord> {
    let owner_id: Option<String> = column(row, "owner_id")?;
    let created_at: DateTime<Utc> = column(row, "created_at")?;
    let updated_at: DateTime<Utc> = column(row, "updated_at")?;

    Ok(ToolRecord {
        id: ToolId::new(column::<String>(row, "id")?),
        name: column(row, "name")?,
        owner_id: owner_id.map(UserId::new),
        configuration: column(row, "configuration")?,
        created_at,
        updated_at,
    })
}

/// Boxed statement parameter
pub type SqlParam = Box<dyn ToSql + Sync + Send>;

/// A rendered `UPDATE export_jobs` statement
pub struct UpdateStatement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl UpdateStatement {
    /// Parameters borrowed in the shape `tokio_postgres` expects
    pub fn param_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|param| param.as_ref() as &(dyn ToSql + Sync))
            .collect()
    }
}

struct Assignments {
    columns: Vec<String>,
    params: Vec<SqlParam>,
}

impl Assignments {
    fn push(&mut self, expression: impl FnOnce(usize) -> String, value: SqlParam) {
        self.params.push(value);
        self.columns.push(expression(self.params.len()));
    }

    fn set(&mut self, column: &str, value: SqlParam) {
        self.push(|n| format!("{} = ${}", column, n), value);
    }
}

/// Render a partial update into one atomic statement
///
/// Only the fields present in `update` are assigned. A status guard becomes
/// part of the `WHERE` clause so the check and the write cannot interleave
/// with another writer.
pub fn build_job_update(job_id: &JobId, update: &JobUpdate) -> Result<UpdateStatement> {
    let mut assignments = Assignments {
        columns: Vec::new(),
        params: Vec::new(),
    };

    if let Some(status) = update.status {
        assignments.set("status", Box::new(status.as_str().to_string()));
    }
    if let Some(total) = update.steps_total {
        assignments.set("steps_total", Box::new(to_i32(total, "steps_total")?));
    }
    if let Some(completed) = update.steps_completed {
        assignments.set("steps_completed", Box::new(to_i32(completed, "steps_completed")?));
    }
    if let Some(progress) = update.progress_percentage {
        assignments.set("progress_percentage", Box::new(i16::from(progress.min(100))));
    }
    if let Some(current) = &update.current_step {
        assignments.set("current_step", Box::new(current.clone()));
    }
    if let Some(error) = &update.error_message {
        assignments.set("error_message", Box::new(error.clone()));
    }
    if let Some(path) = &update.package_path {
        assignments.set("package_path", Box::new(path.clone()));
    }
    if let Some(size) = update.package_size_bytes {
        let size = size
            .map(|bytes| {
                i64::try_from(bytes).map_err(|_| {
                    ToolpackError::Validation(format!("package size {} out of range", bytes))
                })
            })
            .transpose()?;
        assignments.set("package_size_bytes", Box::new(size));
    }
    if let Some(step) = &update.append_completed_step {
        assignments.push(
            |n| format!("completed_steps = array_append(completed_steps, ${})", n),
            Box::new(step.clone()),
        );
    }
    if let Some(at) = update.completed_at {
        assignments.set("completed_at", Box::new(at));
    }

    let Assignments {
        mut columns,
        mut params,
    } = assignments;
    columns.push("updated_at = NOW()".to_string());

    params.push(Box::new(*job_id.as_uuid()));
    let mut sql = format!(
        "UPDATE export_jobs SET {} WHERE job_id = ${}",
        columns.join(", "),
        params.len()
    );

    if let Some(expected) = &update.expected_status {
        let expected: Vec<String> = expected.iter().map(|s| s.as_str().to_string()).collect();
        params.push(Box::new(expected));
        sql.push_str(&format!(" AND status = ANY(${})", params.len()));
    }

    Ok(UpdateStatement { sql, params })
}

fn to_i32(value: u32, name: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| ToolpackError::Validation(format!("{} out of range: {}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_renders_only_set_fields() {
        let job_id = JobId::generate();
        let statement = build_job_update(
            &job_id,
            &JobUpdate::new()
                .status(JobStatus::InProgress)
                .current_step("Selecting export strategy"),
        )
        .unwrap();

        assert_eq!(
            statement.sql,
            "UPDATE export_jobs SET status = $1, current_step = $2, updated_at = NOW() \
             WHERE job_id = $3"
        );
        assert_eq!(statement.params.len(), 3);
        assert_eq!(statement.param_refs().len(), 3);
    }

    #[test]
    fn test_update_guard_in_where_clause() {
        let statement = build_job_update(
            &JobId::generate(),
            &JobUpdate::new()
                .status(JobStatus::Cancelling)
                .when_status(&[JobStatus::Pending, JobStatus::InProgress]),
        )
        .unwrap();

        assert!(statement
            .sql
            .ends_with("WHERE job_id = $2 AND status = ANY($3)"));
        assert_eq!(statement.params.len(), 3);
    }

    #[test]
    fn test_update_appends_to_ledger() {
        let statement = build_job_update(
            &JobId::generate(),
            &JobUpdate::new()
                .progress(2, 4)
                .append_completed_step("write-manifest"),
        )
        .unwrap();

        assert!(statement.sql.contains("steps_completed = $1"));
        assert!(statement.sql.contains("progress_percentage = $2"));
        assert!(statement
            .sql
            .contains("completed_steps = array_append(completed_steps, $3)"));
    }

    #[test]
    fn test_clearing_error_assigns_null() {
        let statement =
            build_job_update(&JobId::generate(), &JobUpdate::new().clear_error()).unwrap();
        assert!(statement.sql.contains("error_message = $1"));
    }

    #[test]
    fn test_empty_update_still_touches_timestamp() {
        let statement = build_job_update(&JobId::generate(), &JobUpdate::new()).unwrap();
        assert_eq!(
            statement.sql,
            "UPDATE export_jobs SET updated_at = NOW() WHERE job_id = $1"
        );
    }
}
