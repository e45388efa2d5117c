use axum::response::IntoResponse;
use chrono::{Datelike, NaiveDate};
use erp_database::{
    Period,
    entities::{
        goals::GoalsDAO, mileage::MileageDAO, sales::SalesDAO, sales_reps::SalesRepsDAO,
        visits::VisitsDAO,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::guard::{INVALID_CODE, INVALID_CREDENTIALS, ROLE_UNASSIGNED},
    reports::summary::{GoalProgress, MileageTotals, SalesTotals},
    server::ServerError,
};

macro_rules! json_response {
    ($($dto:ty),+ $(,)?) => {
        $(
            impl IntoResponse for $dto {
                fn into_response(self) -> axum::response::Response {
                    axum::Json::from(self).into_response()
                }
            }
        )+
    };
}

json_response!(
    LoginPageDTO,
    SaleDTO,
    SalesListDTO,
    SalesRepsListDTO,
    GoalDTO,
    GoalsListDTO,
    VisitDTO,
    VisitsListDTO,
    MileageDTO,
    MileageListDTO,
    DashboardDTO,
    PortalHomeDTO,
);

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginPageQuery {
    pub next: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginPageDTO {
    pub next: Option<String>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl From<LoginPageQuery> for LoginPageDTO {
    fn from(value: LoginPageQuery) -> Self {
        let message = value.error.as_deref().and_then(|error| match error {
            ROLE_UNASSIGNED => Some("Seu usuário não possui perfil de acesso. Procure o administrador."),
            INVALID_CREDENTIALS => Some("E-mail ou senha inválidos."),
            INVALID_CODE => Some("Link de acesso inválido ou expirado."),
            _ => None,
        });

        Self {
            next: value.next,
            error: value.error,
            message: message.map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetDTO {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordDTO {
    pub password: String,
}

/// Date range from a query string. A missing bound falls back to the
/// month of the other bound, or to the current month when both are missing.
pub fn resolve_period(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<Period, ServerError> {
    let (from, to) = match (from, to) {
        (Some(from), Some(to)) => (from, to),
        (Some(from), None) => (from, Period::month_of(from).to),
        (None, Some(to)) => (Period::month_of(to).from, to),
        (None, None) => {
            let month = Period::month_of(today);
            (month.from, month.to)
        }
    };

    Period::new(from, to).ok_or_else(|| ServerError::BadRequest("Invalid Period".to_string()))
}

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub sales_rep_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl PeriodQuery {
    pub fn period(&self, today: NaiveDate) -> Result<Period, ServerError> {
        resolve_period(self.from, self.to, today)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    pub sales_rep_id: Option<Uuid>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl MonthQuery {
    pub fn resolve(&self, today: NaiveDate) -> Result<(i32, u32), ServerError> {
        let year = self.year.unwrap_or(today.year());
        let month = self.month.unwrap_or(today.month());

        match Period::month(year, month) {
            Some(_) => Ok((year, month)),
            None => Err(ServerError::BadRequest("Invalid Month".to_string())),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub sales_rep_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub format: ReportFormat,
}

impl ReportQuery {
    pub fn period(&self, today: NaiveDate) -> Result<Period, ServerError> {
        resolve_period(self.from, self.to, today)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct PeriodDTO {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl From<Period> for PeriodDTO {
    fn from(value: Period) -> Self {
        Self {
            from: value.from,
            to: value.to,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SalesRepDTO {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub commission_rate_bps: i32,
    pub active: bool,
}

impl From<SalesRepsDAO> for SalesRepDTO {
    fn from(value: SalesRepsDAO) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            commission_rate_bps: value.commission_rate_bps,
            active: value.active,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SalesRepsListDTO {
    pub sales_reps: Vec<SalesRepDTO>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSaleDTO {
    pub sales_rep_id: Uuid,
    pub customer: String,
    pub sold_on: NaiveDate,
    pub amount_cents: i64,
    pub commission_rate_bps: Option<i32>,
}

impl CreateSaleDTO {
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.customer.trim().is_empty() {
            return Err(ServerError::BadRequest("Customer Is Required".to_string()));
        }
        if self.amount_cents <= 0 {
            return Err(ServerError::BadRequest("Invalid Amount".to_string()));
        }
        if self
            .commission_rate_bps
            .is_some_and(|rate| !(0..=10_000).contains(&rate))
        {
            return Err(ServerError::BadRequest("Invalid Commission Rate".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaleDTO {
    pub id: Uuid,
    pub sales_rep_id: Uuid,
    pub customer: String,
    pub sold_on: NaiveDate,
    pub amount_cents: i64,
    pub commission_rate_bps: i32,
    pub commission_cents: i64,
}

impl From<SalesDAO> for SaleDTO {
    fn from(value: SalesDAO) -> Self {
        Self {
            commission_cents: value.commission_cents(),
            id: value.id,
            sales_rep_id: value.sales_rep_id,
            customer: value.customer,
            sold_on: value.sold_on,
            amount_cents: value.amount_cents,
            commission_rate_bps: value.commission_rate_bps,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SalesListDTO {
    pub period: PeriodDTO,
    pub totals: SalesTotals,
    pub sales: Vec<SaleDTO>,
}

impl SalesListDTO {
    pub fn new(period: Period, sales: Vec<SalesDAO>) -> Self {
        Self {
            period: period.into(),
            totals: SalesTotals::of(&sales),
            sales: sales.into_iter().map(SaleDTO::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GoalDTO {
    pub id: Uuid,
    pub sales_rep_id: Uuid,
    pub year: i32,
    pub month: i32,
    pub target_cents: i64,
}

impl From<GoalsDAO> for GoalDTO {
    fn from(value: GoalsDAO) -> Self {
        Self {
            id: value.id,
            sales_rep_id: value.sales_rep_id,
            year: value.year,
            month: value.month,
            target_cents: value.target_cents,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpsertGoalDTO {
    pub sales_rep_id: Uuid,
    pub year: i32,
    pub month: u32,
    pub target_cents: i64,
}

impl UpsertGoalDTO {
    pub fn validate(&self) -> Result<(), ServerError> {
        if Period::month(self.year, self.month).is_none() {
            return Err(ServerError::BadRequest("Invalid Month".to_string()));
        }
        if self.target_cents < 0 {
            return Err(ServerError::BadRequest("Invalid Target".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct GoalsListDTO {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub goals: Vec<GoalDTO>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VisitDTO {
    pub id: Uuid,
    pub sales_rep_id: Uuid,
    pub visited_on: NaiveDate,
    pub podiatrist: String,
    pub pharmacy: Option<String>,
    pub notes: Option<String>,
}

impl From<VisitsDAO> for VisitDTO {
    fn from(value: VisitsDAO) -> Self {
        Self {
            id: value.id,
            sales_rep_id: value.sales_rep_id,
            visited_on: value.visited_on,
            podiatrist: value.podiatrist,
            pharmacy: value.pharmacy,
            notes: value.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateVisitDTO {
    /// Only honoured for administrators logging on behalf of a rep.
    pub sales_rep_id: Option<Uuid>,
    pub visited_on: Option<NaiveDate>,
    pub podiatrist: String,
    pub pharmacy: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VisitsListDTO {
    pub period: PeriodDTO,
    pub visits: Vec<VisitDTO>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MileageDTO {
    pub id: Uuid,
    pub sales_rep_id: Uuid,
    pub driven_on: NaiveDate,
    pub origin: String,
    pub destination: String,
    pub distance_km: f64,
    pub rate_cents_per_km: i32,
    pub reimbursement_cents: i64,
}

impl From<MileageDAO> for MileageDTO {
    fn from(value: MileageDAO) -> Self {
        Self {
            reimbursement_cents: value.reimbursement_cents(),
            id: value.id,
            sales_rep_id: value.sales_rep_id,
            driven_on: value.driven_on,
            origin: value.origin,
            destination: value.destination,
            distance_km: value.distance_km,
            rate_cents_per_km: value.rate_cents_per_km,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateMileageDTO {
    pub sales_rep_id: Option<Uuid>,
    pub driven_on: Option<NaiveDate>,
    pub origin: String,
    pub destination: String,
    pub distance_km: f64,
}

impl CreateMileageDTO {
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.origin.trim().is_empty() || self.destination.trim().is_empty() {
            return Err(ServerError::BadRequest("Route Is Required".to_string()));
        }
        if !self.distance_km.is_finite() || self.distance_km <= 0.0 {
            return Err(ServerError::BadRequest("Invalid Distance".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct MileageListDTO {
    pub period: PeriodDTO,
    pub totals: MileageTotals,
    pub entries: Vec<MileageDTO>,
}

impl MileageListDTO {
    pub fn new(period: Period, entries: Vec<MileageDAO>) -> Self {
        Self {
            period: period.into(),
            totals: MileageTotals::of(&entries),
            entries: entries.into_iter().map(MileageDTO::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RepMonthDTO {
    pub sales_rep_id: Uuid,
    pub name: String,
    pub sales: SalesTotals,
    pub goal: GoalProgress,
}

#[derive(Debug, Serialize)]
pub struct DashboardDTO {
    pub period: PeriodDTO,
    pub totals: SalesTotals,
    pub reimbursement_cents: i64,
    pub reps: Vec<RepMonthDTO>,
}

#[derive(Debug, Serialize)]
pub struct PortalHomeDTO {
    pub sales_rep_id: Option<Uuid>,
    pub period: PeriodDTO,
    pub sales: SalesTotals,
    pub goal: GoalProgress,
    pub mileage: MileageTotals,
    pub visits: usize,
}
