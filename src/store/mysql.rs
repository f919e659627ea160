use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, MySqlPool};
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::model::attendance::AttendanceEvent;
use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveBalance, LeaveRequest, LeaveStatus};
use crate::model::summary::{MonthlySummary, ProjectBreakdown, SummaryStatus};
use crate::model::timesheet::Timesheet;
use crate::service::calculator::DateRange;
use crate::service::projects::{AssignedProject, AssignmentBackend};

use super::{
    LeaveFilter, LeaveStatusUpdate, LeaveUpdateOutcome, NewLeaveRequest, Store, SummaryFilter,
};

const DUPLICATE_KEY: &str = "23000";

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

// Typed binding for dynamically built WHERE clauses
enum FilterValue {
    U64(u64),
    U32(u32),
    I32(i32),
    Text(String),
}

fn parse_column<T>(column: &'static str, value: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn is_duplicate(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some(DUPLICATE_KEY))
}

#[derive(FromRow)]
struct EmployeeRow {
    id: u64,
    employee_code: String,
    first_name: String,
    last_name: String,
    status: String,
    hours_source: String,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = sqlx::Error;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        Ok(Employee {
            id: row.id,
            employee_code: row.employee_code,
            first_name: row.first_name,
            last_name: row.last_name,
            status: row.status,
            hours_source: parse_column("hours_source", &row.hours_source)?,
        })
    }
}

#[derive(FromRow)]
struct LeaveRequestRow {
    id: u64,
    employee_id: u64,
    leave_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    number_of_days: u32,
    status: String,
    rejection_reason: Option<String>,
    approved_by: Option<u64>,
    approved_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<LeaveRequestRow> for LeaveRequest {
    type Error = sqlx::Error;

    fn try_from(row: LeaveRequestRow) -> Result<Self, Self::Error> {
        Ok(LeaveRequest {
            id: row.id,
            employee_id: row.employee_id,
            leave_type: parse_column("leave_type", &row.leave_type)?,
            start_date: row.start_date,
            end_date: row.end_date,
            number_of_days: row.number_of_days,
            status: parse_column("status", &row.status)?,
            rejection_reason: row.rejection_reason,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct LeaveBalanceRow {
    employee_id: u64,
    leave_type: String,
    year: i32,
    total_days: Option<u32>,
    used_days: u32,
}

impl TryFrom<LeaveBalanceRow> for LeaveBalance {
    type Error = sqlx::Error;

    fn try_from(row: LeaveBalanceRow) -> Result<Self, Self::Error> {
        Ok(LeaveBalance {
            employee_id: row.employee_id,
            leave_type: parse_column("leave_type", &row.leave_type)?,
            year: row.year,
            total_days: row.total_days,
            used_days: row.used_days,
        })
    }
}

#[derive(FromRow)]
struct TimesheetRow {
    id: u64,
    staff_id: u64,
    project_id: u64,
    project_name: String,
    work_date: NaiveDate,
    check_in: Option<NaiveTime>,
    check_out: Option<NaiveTime>,
    total_hours: f64,
    overtime_hours: f64,
    status: String,
    approval_status: String,
    ot_approval_status: Option<String>,
}

impl TryFrom<TimesheetRow> for Timesheet {
    type Error = sqlx::Error;

    fn try_from(row: TimesheetRow) -> Result<Self, Self::Error> {
        Ok(Timesheet {
            id: row.id,
            staff_id: row.staff_id,
            project_id: row.project_id,
            project_name: row.project_name,
            work_date: row.work_date,
            check_in: row.check_in,
            check_out: row.check_out,
            total_hours: row.total_hours,
            overtime_hours: row.overtime_hours,
            status: parse_column("status", &row.status)?,
            approval_status: parse_column("approval_status", &row.approval_status)?,
            ot_approval_status: row
                .ot_approval_status
                .as_deref()
                .map(|s| parse_column("ot_approval_status", s))
                .transpose()?,
        })
    }
}

#[derive(FromRow)]
struct SummaryRow {
    id: u64,
    employee_id: u64,
    month: u32,
    year: i32,
    status: String,
    total_working_days: u32,
    total_worked_hours: f64,
    total_ot_hours: f64,
    approved_leaves: u32,
    absent_days: u32,
    project_breakdown: Json<Vec<ProjectBreakdown>>,
    staff_signature: Option<String>,
    staff_signed_at: Option<DateTime<Utc>>,
    admin_signature: Option<String>,
    admin_approved_at: Option<DateTime<Utc>>,
    admin_remarks: Option<String>,
}

impl TryFrom<SummaryRow> for MonthlySummary {
    type Error = sqlx::Error;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        Ok(MonthlySummary {
            id: row.id,
            employee_id: row.employee_id,
            month: row.month,
            year: row.year,
            status: parse_column("status", &row.status)?,
            total_working_days: row.total_working_days,
            total_worked_hours: row.total_worked_hours,
            total_ot_hours: row.total_ot_hours,
            approved_leaves: row.approved_leaves,
            absent_days: row.absent_days,
            project_breakdown: row.project_breakdown.0,
            staff_signature: row.staff_signature,
            staff_signed_at: row.staff_signed_at,
            admin_signature: row.admin_signature,
            admin_approved_at: row.admin_approved_at,
            admin_remarks: row.admin_remarks,
        })
    }
}

fn decode_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, sqlx::Error>
where
    T: TryFrom<R, Error = sqlx::Error>,
{
    rows.into_iter().map(T::try_from).collect()
}

const LEAVE_COLUMNS: &str = r#"
    id, employee_id, leave_type, start_date, end_date, number_of_days, status,
    rejection_reason, approved_by, approved_at, created_at
"#;

const SUMMARY_COLUMNS: &str = r#"
    id, employee_id, month, year, status, total_working_days, total_worked_hours,
    total_ot_hours, approved_leaves, absent_days, project_breakdown,
    staff_signature, staff_signed_at, admin_signature, admin_approved_at, admin_remarks
"#;

#[async_trait]
impl Store for MySqlStore {
    async fn fetch_attendance(
        &self,
        employee_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<AttendanceEvent>> {
        let events = sqlx::query_as::<_, AttendanceEvent>(
            r#"
            SELECT id, employee_id, check_in_time, check_out_time
            FROM attendance_events
            WHERE employee_id = ?
            AND check_in_time >= ?
            AND check_in_time < ?
            ORDER BY check_in_time
            "#,
        )
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn fetch_approved_leave(
        &self,
        employee_id: u64,
        range: DateRange,
    ) -> AppResult<Vec<LeaveRequest>> {
        let sql = format!(
            r#"
            SELECT {LEAVE_COLUMNS}
            FROM leave_requests
            WHERE employee_id = ?
            AND status = ?
            AND start_date <= ?
            AND end_date >= ?
            ORDER BY start_date
            "#
        );

        let rows = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(employee_id)
            .bind(LeaveStatus::Approved.as_ref())
            .bind(range.end())
            .bind(range.start())
            .fetch_all(&self.pool)
            .await?;

        Ok(decode_all(rows)?)
    }

    async fn fetch_timesheets(
        &self,
        employee_id: u64,
        range: DateRange,
    ) -> AppResult<Vec<Timesheet>> {
        let rows = sqlx::query_as::<_, TimesheetRow>(
            r#"
            SELECT
                t.id, t.staff_id, t.project_id, p.name AS project_name, t.work_date,
                t.check_in, t.check_out, t.total_hours, t.overtime_hours, t.status,
                t.approval_status, t.ot_approval_status
            FROM timesheets t
            JOIN projects p ON p.id = t.project_id
            WHERE t.staff_id = ?
            AND t.work_date BETWEEN ? AND ?
            ORDER BY t.work_date, t.project_id
            "#,
        )
        .bind(employee_id)
        .bind(range.start())
        .bind(range.end())
        .fetch_all(&self.pool)
        .await?;

        Ok(decode_all(rows)?)
    }

    async fn fetch_leave_balance(&self, employee_id: u64, year: i32) -> AppResult<Vec<LeaveBalance>> {
        let rows = sqlx::query_as::<_, LeaveBalanceRow>(
            r#"
            SELECT employee_id, leave_type, year, total_days, used_days
            FROM leave_balances
            WHERE employee_id = ? AND year = ?
            ORDER BY leave_type
            "#,
        )
        .bind(employee_id)
        .bind(year)
        .fetch_all(&self.pool)
        .await?;

        Ok(decode_all(rows)?)
    }

    async fn fetch_employee(&self, employee_id: u64) -> AppResult<Option<Employee>> {
        let row = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT id, employee_code, first_name, last_name, status, hours_source
            FROM employees
            WHERE id = ?
            "#,
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Employee::try_from).transpose()?)
    }

    async fn list_active_employee_ids(&self) -> AppResult<Vec<u64>> {
        let ids = sqlx::query_scalar::<_, u64>(
            "SELECT id FROM employees WHERE status = 'active' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn find_summary(
        &self,
        employee_id: u64,
        month: u32,
        year: i32,
    ) -> AppResult<Option<MonthlySummary>> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM monthly_summaries WHERE employee_id = ? AND month = ? AND year = ?"
        );
        let row = sqlx::query_as::<_, SummaryRow>(&sql)
            .bind(employee_id)
            .bind(month)
            .bind(year)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(MonthlySummary::try_from).transpose()?)
    }

    async fn get_summary(&self, id: u64) -> AppResult<Option<MonthlySummary>> {
        let sql = format!("SELECT {SUMMARY_COLUMNS} FROM monthly_summaries WHERE id = ?");
        let row = sqlx::query_as::<_, SummaryRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(MonthlySummary::try_from).transpose()?)
    }

    async fn list_summaries(&self, filter: SummaryFilter) -> AppResult<(Vec<MonthlySummary>, i64)> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(month) = filter.month {
            where_sql.push_str(" AND month = ?");
            args.push(FilterValue::U32(month));
        }
        if let Some(year) = filter.year {
            where_sql.push_str(" AND year = ?");
            args.push(FilterValue::I32(year));
        }
        if let Some(status) = filter.status {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Text(status.to_string()));
        }

        let count_sql = format!("SELECT COUNT(*) FROM monthly_summaries{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::U32(v) => count_q.bind(*v),
                FilterValue::I32(v) => count_q.bind(*v),
                FilterValue::Text(s) => count_q.bind(s.as_str()),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let data_sql = format!(
            r#"
            SELECT {SUMMARY_COLUMNS}
            FROM monthly_summaries
            {where_sql}
            ORDER BY year DESC, month DESC, employee_id
            LIMIT ? OFFSET ?
            "#
        );
        let mut data_q = sqlx::query_as::<_, SummaryRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::U32(v) => data_q.bind(v),
                FilterValue::I32(v) => data_q.bind(v),
                FilterValue::Text(s) => data_q.bind(s),
            };
        }
        let rows = data_q
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((decode_all(rows)?, total))
    }

    async fn insert_summary(&self, summary: &MonthlySummary) -> AppResult<Option<u64>> {
        let result = sqlx::query(
            r#"
            INSERT INTO monthly_summaries
                (employee_id, month, year, status, total_working_days, total_worked_hours,
                 total_ot_hours, approved_leaves, absent_days, project_breakdown)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(summary.employee_id)
        .bind(summary.month)
        .bind(summary.year)
        .bind(summary.status.as_ref())
        .bind(summary.total_working_days)
        .bind(summary.total_worked_hours)
        .bind(summary.total_ot_hours)
        .bind(summary.approved_leaves)
        .bind(summary.absent_days)
        .bind(Json(&summary.project_breakdown))
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(Some(done.last_insert_id())),
            Err(e) if is_duplicate(&e) => {
                debug!(
                    employee_id = summary.employee_id,
                    month = summary.month,
                    year = summary.year,
                    "Summary insert lost to a concurrent generation"
                );
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_summary_if(
        &self,
        summary: &MonthlySummary,
        expected: SummaryStatus,
    ) -> AppResult<bool> {
        // updated_at always changes, so a matched row is always reported as affected
        let result = sqlx::query(
            r#"
            UPDATE monthly_summaries
            SET status = ?,
                total_working_days = ?,
                total_worked_hours = ?,
                total_ot_hours = ?,
                approved_leaves = ?,
                absent_days = ?,
                project_breakdown = ?,
                staff_signature = ?,
                staff_signed_at = ?,
                admin_signature = ?,
                admin_approved_at = ?,
                admin_remarks = ?,
                updated_at = CURRENT_TIMESTAMP(6)
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(summary.status.as_ref())
        .bind(summary.total_working_days)
        .bind(summary.total_worked_hours)
        .bind(summary.total_ot_hours)
        .bind(summary.approved_leaves)
        .bind(summary.absent_days)
        .bind(Json(&summary.project_breakdown))
        .bind(summary.staff_signature.as_deref())
        .bind(summary.staff_signed_at)
        .bind(summary.admin_signature.as_deref())
        .bind(summary.admin_approved_at)
        .bind(summary.admin_remarks.as_deref())
        .bind(summary.id)
        .bind(expected.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_summary_signatures_if(
        &self,
        summary: &MonthlySummary,
        expected: SummaryStatus,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE monthly_summaries
            SET status = ?,
                staff_signature = ?,
                staff_signed_at = ?,
                admin_signature = ?,
                admin_approved_at = ?,
                admin_remarks = ?,
                updated_at = CURRENT_TIMESTAMP(6)
            WHERE id = ?
            AND status = ?
            "#,
        )
        .bind(summary.status.as_ref())
        .bind(summary.staff_signature.as_deref())
        .bind(summary.staff_signed_at)
        .bind(summary.admin_signature.as_deref())
        .bind(summary.admin_approved_at)
        .bind(summary.admin_remarks.as_deref())
        .bind(summary.id)
        .bind(expected.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_leave_request(&self, request: &NewLeaveRequest) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, leave_type, start_date, end_date, number_of_days, status)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.employee_id)
        .bind(request.leave_type.as_ref())
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.number_of_days)
        .bind(LeaveStatus::Pending.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id())
    }

    async fn get_leave_request(&self, id: u64) -> AppResult<Option<LeaveRequest>> {
        let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");
        let row = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(LeaveRequest::try_from).transpose()?)
    }

    async fn list_leave_requests(&self, filter: LeaveFilter) -> AppResult<(Vec<LeaveRequest>, i64)> {
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue> = Vec::new();

        if let Some(employee_id) = filter.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(employee_id));
        }
        if let Some(status) = filter.status {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Text(status.to_string()));
        }

        let count_sql = format!("SELECT COUNT(*) FROM leave_requests{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::U32(v) => count_q.bind(*v),
                FilterValue::I32(v) => count_q.bind(*v),
                FilterValue::Text(s) => count_q.bind(s.as_str()),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let data_sql = format!(
            r#"
            SELECT {LEAVE_COLUMNS}
            FROM leave_requests
            {where_sql}
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#
        );
        let mut data_q = sqlx::query_as::<_, LeaveRequestRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::U32(v) => data_q.bind(v),
                FilterValue::I32(v) => data_q.bind(v),
                FilterValue::Text(s) => data_q.bind(s),
            };
        }
        let rows = data_q
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((decode_all(rows)?, total))
    }

    async fn update_leave_request_status(
        &self,
        id: u64,
        update: &LeaveStatusUpdate,
    ) -> AppResult<LeaveUpdateOutcome> {
        let mut tx = self.pool.begin().await?;

        let approved_at = (update.to == LeaveStatus::Approved).then_some(update.at);
        let mut sql = String::from(
            r#"
            UPDATE leave_requests
            SET status = ?,
                approved_by = COALESCE(?, approved_by),
                approved_at = COALESCE(?, approved_at),
                rejection_reason = COALESCE(?, rejection_reason)
            WHERE id = ?
            AND status = 'pending'
            "#,
        );
        if update.requester.is_some() {
            sql.push_str(" AND employee_id = ?");
        }

        let mut query = sqlx::query(&sql)
            .bind(update.to.as_ref())
            .bind(update.actor_id)
            .bind(approved_at)
            .bind(update.reason.as_deref())
            .bind(id);
        if let Some(requester) = update.requester {
            query = query.bind(requester);
        }

        if query.execute(&mut *tx).await?.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(LeaveUpdateOutcome::NotPending);
        }

        if let Some(debit) = &update.debit {
            let debited = sqlx::query(
                r#"
                UPDATE leave_balances
                SET used_days = used_days + ?
                WHERE employee_id = ?
                AND leave_type = ?
                AND year = ?
                AND (total_days IS NULL OR used_days + ? <= total_days)
                "#,
            )
            .bind(debit.days)
            .bind(debit.employee_id)
            .bind(debit.leave_type.as_ref())
            .bind(debit.year)
            .bind(debit.days)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if debited == 0 {
                let exists = sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT COUNT(*) FROM leave_balances
                    WHERE employee_id = ? AND leave_type = ? AND year = ?
                    "#,
                )
                .bind(debit.employee_id)
                .bind(debit.leave_type.as_ref())
                .bind(debit.year)
                .fetch_one(&mut *tx)
                .await?
                    > 0;

                tx.rollback().await?;
                warn!(
                    leave_id = id,
                    employee_id = debit.employee_id,
                    leave_type = %debit.leave_type,
                    year = debit.year,
                    days = debit.days,
                    "Leave balance debit refused, approval rolled back"
                );
                return Ok(if exists {
                    LeaveUpdateOutcome::InsufficientBalance
                } else {
                    LeaveUpdateOutcome::MissingBalance
                });
            }
        }

        tx.commit().await?;
        Ok(LeaveUpdateOutcome::Applied)
    }
}

#[async_trait]
impl AssignmentBackend for MySqlStore {
    async fn has_assignment_table(&self) -> AppResult<bool> {
        let found = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM information_schema.tables
            WHERE table_schema = DATABASE()
            AND table_name = 'project_assignments'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(found > 0)
    }

    async fn assigned_from_table(&self, employee_id: u64) -> AppResult<Vec<AssignedProject>> {
        let rows = sqlx::query_as::<_, (u64, String)>(
            r#"
            SELECT p.id, p.name
            FROM project_assignments a
            JOIN projects p ON p.id = a.project_id
            WHERE a.employee_id = ?
            AND (a.end_date IS NULL OR a.end_date >= CURDATE())
            ORDER BY p.name
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(assigned).collect())
    }

    async fn assigned_from_history(
        &self,
        employee_id: u64,
        since: NaiveDate,
    ) -> AppResult<Vec<AssignedProject>> {
        let rows = sqlx::query_as::<_, (u64, String)>(
            r#"
            SELECT DISTINCT p.id, p.name
            FROM timesheets t
            JOIN projects p ON p.id = t.project_id
            WHERE t.staff_id = ?
            AND t.work_date >= ?
            ORDER BY p.name
            "#,
        )
        .bind(employee_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(assigned).collect())
    }
}

fn assigned((project_id, project_name): (u64, String)) -> AssignedProject {
    AssignedProject {
        project_id,
        project_name,
    }
}
