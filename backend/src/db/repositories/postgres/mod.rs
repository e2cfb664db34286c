//! Postgres repository implementation using Diesel.
//!
//! The schema lives in `migrations/` and is applied on startup. Overlap
//! safety does not depend on the application: `appointments` carries two
//! `EXCLUDE USING gist` constraints over `tsrange(start, ends_at, '[)')`,
//! one per doctor and one per patient, and every appointment write runs in a
//! SERIALIZABLE transaction.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures (including serialization failures)
//! - Per-transaction `statement_timeout` bounded by the caller's deadline
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)
//! - `PG_STATEMENT_TIMEOUT_MS`: Upper bound for a single statement (default: 5000)

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::Error as DieselError;
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{debug, warn};
use std::time::Duration;
use tokio::task;

use crate::api::{AppointmentView, DoctorSearch, DoctorSearchResult};
use crate::db::repository::{
    AppointmentRepository, Deadline, ErrorContext, ReferenceRepository, RepositoryError,
    RepositoryResult,
};
use crate::models::{
    Appointment, AppointmentDraft, AppointmentId, BookingParticipant, BookingSlot, Clinic,
    ClinicId, Doctor, DoctorId, NewClinic, NewDoctor, NewPatient, NewSpeciality, Patient,
    PatientId, PatientIdentity, Speciality, SpecialityId,
};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

const PATIENT_OVERLAP_CONSTRAINT: &str = "appointments_patient_no_overlap";
const DOCTOR_OVERLAP_CONSTRAINT: &str = "appointments_doctor_no_overlap";

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
    /// Upper bound for `statement_timeout` inside write transactions
    pub statement_timeout_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
            statement_timeout_ms: 5_000,
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    ///
    /// See the module documentation for the variables and their defaults.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let defaults = Self::default();
        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or(
                "PG_CONN_TIMEOUT_SEC",
                defaults.connection_timeout_sec,
            ),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
            statement_timeout_ms: env_or(
                "PG_STATEMENT_TIMEOUT_MS",
                defaults.statement_timeout_ms,
            ),
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self { pool, config })
    }

    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        Ok(())
    }

    /// Execute a database operation with automatic retry for transient failures.
    ///
    /// Retries connection errors and serialization failures up to
    /// `max_retries` times with exponential backoff. Deadline expiry is
    /// never retried.
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2; // Exponential backoff
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        return Err(err);
                    }
                };

                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e @ RepositoryError::TimeoutError { .. }) => return Err(e),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        debug!("Retrying after transient error: {}", e);
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }

            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Run `f` in a SERIALIZABLE transaction bounded by `deadline`.
    ///
    /// The statement timeout is the smaller of the configured bound and the
    /// time left; the deadline is checked again right before commit.
    async fn write_tx<T, F>(
        &self,
        operation: &'static str,
        deadline: Deadline,
        f: F,
    ) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: Fn(&mut PgConnection) -> RepositoryResult<T> + Send + Sync + 'static + Clone,
    {
        let statement_cap = self.config.statement_timeout_ms;
        self.with_conn(move |conn| {
            deadline.check(operation)?;
            conn.build_transaction()
                .serializable()
                .run(|tx| {
                    let remaining_ms = deadline.remaining().as_millis() as u64;
                    let timeout_ms = remaining_ms.min(statement_cap).max(1);
                    sql_query(format!("SET LOCAL statement_timeout = {}", timeout_ms))
                        .execute(tx)
                        .map_err(|e| map_write_error(e, operation))?;
                    let value = f(tx)?;
                    deadline.check(operation)?;
                    Ok(value)
                })
        })
        .await
    }
}

fn map_diesel_error(err: DieselError) -> RepositoryError {
    RepositoryError::from(err)
}

/// Map write failures, recognising overlap constraints and statement timeouts.
fn map_write_error(err: DieselError, operation: &str) -> RepositoryError {
    if let DieselError::DatabaseError(_, info) = &err {
        let participant = match info.constraint_name() {
            Some(PATIENT_OVERLAP_CONSTRAINT) => Some(BookingParticipant::Patient),
            Some(DOCTOR_OVERLAP_CONSTRAINT) => Some(BookingParticipant::Doctor),
            _ => None,
        };
        if let Some(participant) = participant {
            warn!(
                "{}: overlap rejected by constraint {:?}",
                operation,
                info.constraint_name()
            );
            return RepositoryError::conflict(
                participant,
                ErrorContext::new(operation).with_entity("appointment"),
            );
        }
        if info.message().contains("statement timeout") {
            return RepositoryError::timeout_with_context(
                info.message().to_string(),
                ErrorContext::new(operation),
            );
        }
    }
    map_diesel_error(err).with_operation(operation)
}

/// `%term%` for ILIKE, with LIKE wildcards in the term escaped.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn patient_by_identity(
    conn: &mut PgConnection,
    identity: &PatientIdentity,
) -> RepositoryResult<Option<Patient>> {
    patients::table
        .filter(patients::first_name.eq(&identity.first_name))
        .filter(patients::last_name.eq(&identity.last_name))
        .filter(patients::email.eq(&identity.email))
        .select(PatientRow::as_select())
        .first::<PatientRow>(conn)
        .optional()
        .map(|row| row.map(Patient::from))
        .map_err(map_diesel_error)
}

type ViewRow = (AppointmentRow, String, String, String, String, String);

fn view_from_row(row: ViewRow) -> AppointmentView {
    let (appointment, patient_first, patient_last, doctor_first, doctor_last, clinic_name) = row;
    let appointment = Appointment::from(appointment);
    AppointmentView::from_parts(
        &appointment,
        format!("{} {}", patient_first, patient_last),
        format!("{} {}", doctor_first, doctor_last),
        clinic_name,
    )
}

macro_rules! view_query {
    () => {
        appointments::table
            .inner_join(patients::table.on(patients::id.eq(appointments::patient_id)))
            .inner_join(doctors::table.on(doctors::id.eq(appointments::doctor_id)))
            .inner_join(clinics::table.on(clinics::id.eq(appointments::clinic_id)))
            .select((
                AppointmentRow::as_select(),
                patients::first_name,
                patients::last_name,
                doctors::first_name,
                doctors::last_name,
                clinics::name,
            ))
    };
}

#[async_trait]
impl ReferenceRepository for PostgresRepository {
    async fn patient_exists(&self, id: PatientId) -> RepositoryResult<bool> {
        self.with_conn(move |conn| {
            diesel::select(diesel::dsl::exists(patients::table.find(id.value())))
                .get_result(conn)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn doctor_exists(&self, id: DoctorId) -> RepositoryResult<bool> {
        self.with_conn(move |conn| {
            diesel::select(diesel::dsl::exists(doctors::table.find(id.value())))
                .get_result(conn)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn clinic_exists(&self, id: ClinicId) -> RepositoryResult<bool> {
        self.with_conn(move |conn| {
            diesel::select(diesel::dsl::exists(clinics::table.find(id.value())))
                .get_result(conn)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn find_patient_by_identity(
        &self,
        identity: &PatientIdentity,
    ) -> RepositoryResult<Option<Patient>> {
        let identity = identity.clone();
        self.with_conn(move |conn| patient_by_identity(conn, &identity)).await
    }

    async fn create_patient(&self, patient: &NewPatient) -> RepositoryResult<Patient> {
        let row = NewPatientRow::from(patient);
        self.with_conn(move |conn| {
            diesel::insert_into(patients::table)
                .values(&row)
                .returning(PatientRow::as_returning())
                .get_result::<PatientRow>(conn)
                .map(Patient::from)
                .map_err(|e| map_diesel_error(e).with_operation("create_patient"))
        })
        .await
    }

    async fn create_clinic(&self, clinic: &NewClinic) -> RepositoryResult<Clinic> {
        let row = NewClinicRow::from(clinic);
        self.with_conn(move |conn| {
            diesel::insert_into(clinics::table)
                .values(&row)
                .returning(ClinicRow::as_returning())
                .get_result::<ClinicRow>(conn)
                .map(Clinic::from)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn create_speciality(
        &self,
        speciality: &NewSpeciality,
    ) -> RepositoryResult<Speciality> {
        let row = NewSpecialityRow::from(speciality);
        self.with_conn(move |conn| {
            diesel::insert_into(specialities::table)
                .values(&row)
                .returning(SpecialityRow::as_returning())
                .get_result::<SpecialityRow>(conn)
                .map(Speciality::from)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn create_doctor(&self, doctor: &NewDoctor) -> RepositoryResult<Doctor> {
        let row = NewDoctorRow::from(doctor);
        self.with_conn(move |conn| {
            diesel::insert_into(doctors::table)
                .values(&row)
                .returning(DoctorRow::as_returning())
                .get_result::<DoctorRow>(conn)
                .map(Doctor::from)
                .map_err(|e| map_diesel_error(e).with_operation("create_doctor"))
        })
        .await
    }

    async fn find_clinic(&self, id: ClinicId) -> RepositoryResult<Option<Clinic>> {
        self.with_conn(move |conn| {
            clinics::table
                .find(id.value())
                .select(ClinicRow::as_select())
                .first::<ClinicRow>(conn)
                .optional()
                .map(|row| row.map(Clinic::from))
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn list_clinics(&self) -> RepositoryResult<Vec<Clinic>> {
        self.with_conn(|conn| {
            clinics::table
                .order(clinics::id)
                .select(ClinicRow::as_select())
                .load::<ClinicRow>(conn)
                .map(|rows| rows.into_iter().map(Clinic::from).collect())
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn find_speciality(&self, id: SpecialityId) -> RepositoryResult<Option<Speciality>> {
        self.with_conn(move |conn| {
            specialities::table
                .find(id.value())
                .select(SpecialityRow::as_select())
                .first::<SpecialityRow>(conn)
                .optional()
                .map(|row| row.map(Speciality::from))
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn list_specialities(&self) -> RepositoryResult<Vec<Speciality>> {
        self.with_conn(|conn| {
            specialities::table
                .order(specialities::id)
                .select(SpecialityRow::as_select())
                .load::<SpecialityRow>(conn)
                .map(|rows| rows.into_iter().map(Speciality::from).collect())
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn find_doctor(&self, id: DoctorId) -> RepositoryResult<Option<Doctor>> {
        self.with_conn(move |conn| {
            doctors::table
                .find(id.value())
                .select(DoctorRow::as_select())
                .first::<DoctorRow>(conn)
                .optional()
                .map(|row| row.map(Doctor::from))
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn list_doctors(&self) -> RepositoryResult<Vec<Doctor>> {
        self.with_conn(|conn| {
            doctors::table
                .order(doctors::id)
                .select(DoctorRow::as_select())
                .load::<DoctorRow>(conn)
                .map(|rows| rows.into_iter().map(Doctor::from).collect())
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn find_patient(&self, id: PatientId) -> RepositoryResult<Option<Patient>> {
        self.with_conn(move |conn| {
            patients::table
                .find(id.value())
                .select(PatientRow::as_select())
                .first::<PatientRow>(conn)
                .optional()
                .map(|row| row.map(Patient::from))
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn list_patients(&self) -> RepositoryResult<Vec<Patient>> {
        self.with_conn(|conn| {
            patients::table
                .order(patients::id)
                .select(PatientRow::as_select())
                .load::<PatientRow>(conn)
                .map(|rows| rows.into_iter().map(Patient::from).collect())
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn search_doctors(
        &self,
        search: &DoctorSearch,
    ) -> RepositoryResult<Vec<DoctorSearchResult>> {
        let first = search.first_name_term().map(|t| like_pattern(&t));
        let last = search.last_name_term().map(|t| like_pattern(&t));
        self.with_conn(move |conn| {
            let mut query = doctors::table
                .inner_join(clinics::table.on(clinics::id.eq(doctors::clinic_id)))
                .inner_join(specialities::table.on(specialities::id.eq(doctors::speciality_id)))
                .select((
                    doctors::id,
                    doctors::first_name,
                    doctors::last_name,
                    clinics::name,
                    specialities::name,
                ))
                .order(doctors::id)
                .into_boxed();
            if let Some(pattern) = first.clone() {
                query = query.filter(doctors::first_name.ilike(pattern));
            }
            if let Some(pattern) = last.clone() {
                query = query.filter(doctors::last_name.ilike(pattern));
            }
            let rows: Vec<(i64, String, String, String, String)> =
                query.load(conn).map_err(map_diesel_error)?;
            Ok(rows
                .into_iter()
                .map(|(id, first_name, last_name, clinic_name, speciality_name)| {
                    DoctorSearchResult {
                        doctor_id: DoctorId::new(id),
                        full_name: format!("{} {}", first_name, last_name),
                        clinic_name,
                        speciality_name,
                    }
                })
                .collect())
        })
        .await
    }
}

#[async_trait]
impl AppointmentRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn find_appointment(&self, id: AppointmentId) -> RepositoryResult<Option<Appointment>> {
        self.with_conn(move |conn| {
            appointments::table
                .find(id.value())
                .select(AppointmentRow::as_select())
                .first::<AppointmentRow>(conn)
                .optional()
                .map(|row| row.map(Appointment::from))
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn appointments_for_participants(
        &self,
        doctor_id: DoctorId,
        patient_id: Option<PatientId>,
    ) -> RepositoryResult<Vec<Appointment>> {
        self.with_conn(move |conn| {
            let mut query = appointments::table
                .select(AppointmentRow::as_select())
                .into_boxed();
            query = match patient_id {
                Some(patient_id) => query.filter(
                    appointments::doctor_id
                        .eq(doctor_id.value())
                        .or(appointments::patient_id.eq(patient_id.value())),
                ),
                None => query.filter(appointments::doctor_id.eq(doctor_id.value())),
            };
            query
                .load::<AppointmentRow>(conn)
                .map(|rows| rows.into_iter().map(Appointment::from).collect())
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn insert_appointment(
        &self,
        draft: &AppointmentDraft,
        deadline: Deadline,
    ) -> RepositoryResult<Appointment> {
        const OP: &str = "insert_appointment";
        let values = AppointmentValues::from(draft);
        self.write_tx(OP, deadline, move |tx| {
            diesel::insert_into(appointments::table)
                .values(&values)
                .returning(AppointmentRow::as_returning())
                .get_result::<AppointmentRow>(tx)
                .map(Appointment::from)
                .map_err(|e| map_write_error(e, OP))
        })
        .await
    }

    async fn insert_appointment_with_patient(
        &self,
        patient: &NewPatient,
        slot: &BookingSlot,
        deadline: Deadline,
    ) -> RepositoryResult<(Patient, Appointment)> {
        const OP: &str = "insert_appointment_with_patient";
        let identity = patient.identity();
        let new_patient = NewPatientRow::from(patient);
        let slot = slot.clone();
        self.write_tx(OP, deadline, move |tx| {
            // Concurrent inserts of the same identity collapse onto one row.
            let inserted = diesel::insert_into(patients::table)
                .values(&new_patient)
                .on_conflict((patients::first_name, patients::last_name, patients::email))
                .do_nothing()
                .returning(PatientRow::as_returning())
                .get_result::<PatientRow>(tx)
                .optional()
                .map_err(|e| map_write_error(e, OP))?;
            let patient = match inserted {
                Some(row) => Patient::from(row),
                None => patient_by_identity(tx, &identity)?.ok_or_else(|| {
                    RepositoryError::transaction_with_context(
                        "patient identity vanished during booking",
                        ErrorContext::new(OP).with_entity("patient").retryable(),
                    )
                })?,
            };

            let appointment = diesel::insert_into(appointments::table)
                .values(&AppointmentValues::new(patient.id, &slot))
                .returning(AppointmentRow::as_returning())
                .get_result::<AppointmentRow>(tx)
                .map(Appointment::from)
                .map_err(|e| map_write_error(e, OP))?;
            Ok((patient, appointment))
        })
        .await
    }

    async fn update_appointment(
        &self,
        id: AppointmentId,
        draft: &AppointmentDraft,
        deadline: Deadline,
    ) -> RepositoryResult<Appointment> {
        const OP: &str = "update_appointment";
        let values = AppointmentValues::from(draft);
        self.write_tx(OP, deadline, move |tx| {
            diesel::update(appointments::table.find(id.value()))
                .set(&values)
                .returning(AppointmentRow::as_returning())
                .get_result::<AppointmentRow>(tx)
                .optional()
                .map_err(|e| map_write_error(e, OP))?
                .map(Appointment::from)
                .ok_or_else(|| {
                    RepositoryError::not_found_with_context(
                        "Appointment not found",
                        ErrorContext::new(OP)
                            .with_entity("appointment")
                            .with_entity_id(id),
                    )
                })
        })
        .await
    }

    async fn delete_appointment(
        &self,
        id: AppointmentId,
        deadline: Deadline,
    ) -> RepositoryResult<bool> {
        const OP: &str = "delete_appointment";
        self.write_tx(OP, deadline, move |tx| {
            diesel::delete(appointments::table.find(id.value()))
                .execute(tx)
                .map(|n| n > 0)
                .map_err(|e| map_write_error(e, OP))
        })
        .await
    }

    async fn get_appointment_view(
        &self,
        id: AppointmentId,
    ) -> RepositoryResult<Option<AppointmentView>> {
        self.with_conn(move |conn| {
            view_query!()
                .filter(appointments::id.eq(id.value()))
                .first::<ViewRow>(conn)
                .optional()
                .map(|row| row.map(view_from_row))
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn list_appointment_views(&self) -> RepositoryResult<Vec<AppointmentView>> {
        self.with_conn(|conn| {
            view_query!()
                .order((appointments::appointment_date_time, appointments::id))
                .load::<ViewRow>(conn)
                .map(|rows| rows.into_iter().map(view_from_row).collect())
                .map_err(map_diesel_error)
        })
        .await
    }
}
