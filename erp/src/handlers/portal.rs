//! Sales-rep portal. Every query is filtered by the caller's own sales rep;
//! administrators browsing the portal pick the rep with `sales_rep_id`.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use erp_database::{
    GoalsRepository, MileageRepository, Period, SalesRepository, VisitsRepository,
    entities::{
        goals::{GoalsBy, GoalsWhere},
        mileage::{CreateMileageDAO, MileageWhere},
        sales::SalesWhere,
        visits::{CreateVisitsDAO, VisitsWhere},
    },
    traits::{EntityRepository, InsertRepository},
};
use uuid::Uuid;

use crate::{
    auth::{guard::CurrentUser, profile::Role},
    handlers::{
        dto::{
            CreateMileageDTO, CreateVisitDTO, GoalDTO, GoalsListDTO, MileageDTO, MileageListDTO,
            MonthQuery, PeriodQuery, PortalHomeDTO, SalesListDTO, VisitDTO, VisitsListDTO,
        },
        today,
    },
    reports::summary::{GoalProgress, MileageTotals, SalesTotals},
    server::{AppState, ServerError},
};

/// Sales rep whose data the caller may see. Sales reps always get their own
/// record whatever they ask for; an administrator without a rep in view
/// gets `None` and therefore empty data.
pub fn portal_scope(user: &CurrentUser, requested: Option<Uuid>) -> Result<Option<Uuid>, ServerError> {
    match user.role {
        Role::Vendedor => match user.sales_rep_id {
            Some(own) => Ok(Some(own)),
            None => {
                tracing::warn!(user_id = %user.user_id, "sales rep profile has no linked record");
                Err(ServerError::Forbidden("Sales Rep Not Linked".to_string()))
            }
        },
        Role::Admin => Ok(requested.or(user.sales_rep_id)),
    }
}

fn required_scope(user: &CurrentUser, requested: Option<Uuid>) -> Result<Uuid, ServerError> {
    portal_scope(user, requested)?
        .ok_or_else(|| ServerError::BadRequest("Sales Rep Required".to_string()))
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub async fn home(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<MonthQuery>,
) -> Result<PortalHomeDTO, ServerError> {
    let scope = portal_scope(&user, query.sales_rep_id)?;
    let (year, month) = query.resolve(today())?;
    let period = Period::month(year, month)
        .ok_or_else(|| ServerError::BadRequest("Invalid Month".to_string()))?;

    let Some(sales_rep_id) = scope else {
        return Ok(PortalHomeDTO {
            sales_rep_id: None,
            period: period.into(),
            sales: SalesTotals::default(),
            goal: GoalProgress::new(None, 0),
            mileage: MileageTotals::default(),
            visits: 0,
        });
    };

    let mut tx = state.pool.begin().await?;

    let sales =
        SalesRepository::get_all(&mut tx, SalesWhere::SalesRepWithin(sales_rep_id, period)).await?;
    let goal = GoalsRepository::try_get(
        &mut tx,
        GoalsBy::SalesRepMonth {
            sales_rep_id,
            year,
            month: month as i32,
        },
    )
    .await?;
    let mileage =
        MileageRepository::get_all(&mut tx, MileageWhere::SalesRepWithin(sales_rep_id, period))
            .await?;
    let visits =
        VisitsRepository::get_all(&mut tx, VisitsWhere::SalesRepWithin(sales_rep_id, period))
            .await?;

    tx.commit().await?;

    let sales = SalesTotals::of(&sales);

    Ok(PortalHomeDTO {
        sales_rep_id: Some(sales_rep_id),
        period: period.into(),
        goal: GoalProgress::new(goal.map(|goal| goal.target_cents), sales.amount_cents),
        sales,
        mileage: MileageTotals::of(&mileage),
        visits: visits.len(),
    })
}

pub async fn sales(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<PeriodQuery>,
) -> Result<SalesListDTO, ServerError> {
    let scope = portal_scope(&user, query.sales_rep_id)?;
    let period = query.period(today())?;

    let Some(sales_rep_id) = scope else {
        return Ok(SalesListDTO::new(period, Vec::new()));
    };

    let mut tx = state.pool.begin().await?;
    let sales =
        SalesRepository::get_all(&mut tx, SalesWhere::SalesRepWithin(sales_rep_id, period)).await?;
    tx.commit().await?;

    Ok(SalesListDTO::new(period, sales))
}

pub async fn visits(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<PeriodQuery>,
) -> Result<VisitsListDTO, ServerError> {
    let scope = portal_scope(&user, query.sales_rep_id)?;
    let period = query.period(today())?;

    let visits = match scope {
        Some(sales_rep_id) => {
            let mut tx = state.pool.begin().await?;
            let visits =
                VisitsRepository::get_all(&mut tx, VisitsWhere::SalesRepWithin(sales_rep_id, period))
                    .await?;
            tx.commit().await?;
            visits
        }
        None => Vec::new(),
    };

    Ok(VisitsListDTO {
        period: period.into(),
        visits: visits.into_iter().map(VisitDTO::from).collect(),
    })
}

pub async fn log_visit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateVisitDTO>,
) -> Result<(StatusCode, VisitDTO), ServerError> {
    let sales_rep_id = required_scope(&user, payload.sales_rep_id)?;

    let podiatrist = payload.podiatrist.trim().to_string();
    if podiatrist.is_empty() {
        return Err(ServerError::BadRequest("Podiatrist Is Required".to_string()));
    }

    let mut tx = state.pool.begin().await?;
    let visit = VisitsRepository::insert(
        &mut tx,
        CreateVisitsDAO {
            sales_rep_id,
            visited_on: payload.visited_on.unwrap_or_else(today),
            podiatrist,
            pharmacy: optional_text(payload.pharmacy),
            notes: optional_text(payload.notes),
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(visit_id = %visit.id, %sales_rep_id, "visit logged");
    Ok((StatusCode::CREATED, visit.into()))
}

pub async fn mileage(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<PeriodQuery>,
) -> Result<MileageListDTO, ServerError> {
    let scope = portal_scope(&user, query.sales_rep_id)?;
    let period = query.period(today())?;

    let Some(sales_rep_id) = scope else {
        return Ok(MileageListDTO::new(period, Vec::new()));
    };

    let mut tx = state.pool.begin().await?;
    let entries =
        MileageRepository::get_all(&mut tx, MileageWhere::SalesRepWithin(sales_rep_id, period))
            .await?;
    tx.commit().await?;

    Ok(MileageListDTO::new(period, entries))
}

pub async fn log_mileage(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateMileageDTO>,
) -> Result<(StatusCode, MileageDTO), ServerError> {
    let sales_rep_id = required_scope(&user, payload.sales_rep_id)?;
    payload.validate()?;

    let mut tx = state.pool.begin().await?;
    let entry = MileageRepository::insert(
        &mut tx,
        CreateMileageDAO {
            sales_rep_id,
            driven_on: payload.driven_on.unwrap_or_else(today),
            origin: payload.origin.trim().to_string(),
            destination: payload.destination.trim().to_string(),
            distance_km: payload.distance_km,
            rate_cents_per_km: state.config.mileage_rate_cents_per_km,
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(entry_id = %entry.id, %sales_rep_id, "mileage logged");
    Ok((StatusCode::CREATED, entry.into()))
}

pub async fn goals(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<MonthQuery>,
) -> Result<GoalsListDTO, ServerError> {
    let scope = portal_scope(&user, query.sales_rep_id)?;

    let goals = match scope {
        Some(sales_rep_id) => {
            let mut tx = state.pool.begin().await?;
            let goals = GoalsRepository::get_all(&mut tx, GoalsWhere::SalesRep(sales_rep_id)).await?;
            tx.commit().await?;
            goals
        }
        None => Vec::new(),
    };

    Ok(GoalsListDTO {
        year: query.year,
        month: query.month,
        goals: goals
            .into_iter()
            .filter(|goal| query.year.is_none_or(|year| goal.year == year))
            .filter(|goal| query.month.is_none_or(|month| goal.month == month as i32))
            .map(GoalDTO::from)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{
            guard::tests::{MemoryAuth, TOKEN},
            profile::tests::FixedProfile,
        },
        server::tests::app,
    };
    use axum::{
        body::Body,
        http::{Request, header},
    };
    use chrono::Duration;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::util::ServiceExt;

    fn user(role: Role, sales_rep_id: Option<Uuid>) -> CurrentUser {
        CurrentUser {
            user_id: Uuid::new_v4(),
            email: "rep@pharma.com".to_string(),
            role,
            sales_rep_id,
        }
    }

    #[test]
    fn sales_reps_only_see_themselves() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4();
        let rep = user(Role::Vendedor, Some(own));

        assert_eq!(portal_scope(&rep, None).unwrap(), Some(own));
        assert_eq!(portal_scope(&rep, Some(other)).unwrap(), Some(own));
    }

    #[test]
    fn unlinked_sales_reps_are_forbidden() {
        let rep = user(Role::Vendedor, None);
        assert!(matches!(
            portal_scope(&rep, Some(Uuid::new_v4())),
            Err(ServerError::Forbidden(_))
        ));
    }

    #[test]
    fn admins_pick_the_rep() {
        let picked = Uuid::new_v4();
        let admin = user(Role::Admin, None);

        assert_eq!(portal_scope(&admin, Some(picked)).unwrap(), Some(picked));
        assert_eq!(portal_scope(&admin, None).unwrap(), None);
        assert!(matches!(
            required_scope(&admin, None),
            Err(ServerError::BadRequest(_))
        ));
    }

    #[test]
    fn blank_optional_text_is_dropped() {
        assert_eq!(optional_text(Some("  ".to_string())), None);
        assert_eq!(
            optional_text(Some(" Drogaria Central ".to_string())),
            Some("Drogaria Central".to_string())
        );
    }

    async fn get_json(uri: &str, profile: FixedProfile) -> (StatusCode, Value) {
        let app = app(
            Arc::new(MemoryAuth::with_session(Duration::hours(8))),
            profile,
        )
        .await;
        let response = app
            .oneshot(
                Request::get(uri)
                    .header(header::COOKIE, format!("ssid={TOKEN}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn admin_portal_without_rep_is_empty() {
        let (status, json) = get_json(
            "/portal?year=2024&month=2",
            FixedProfile::role("ADMIN", None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sales_rep_id"], Value::Null);
        assert_eq!(json["period"]["to"], "2024-02-29");
        assert_eq!(json["sales"]["amount_cents"], 0);
        assert_eq!(json["goal"]["attainment_bps"], Value::Null);
    }

    #[tokio::test]
    async fn unlinked_sales_rep_gets_403() {
        let (status, json) =
            get_json("/portal/vendas", FixedProfile::role("VENDEDOR", None)).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["message"], "Sales Rep Not Linked");
    }

    #[tokio::test]
    async fn reversed_period_is_rejected() {
        let (status, _) = get_json(
            "/portal/quilometragem?from=2024-05-10&to=2024-05-01",
            FixedProfile::role("ADMIN", None),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[cfg(feature = "unit")]
    mod with_database {
        use super::*;
        use std::sync::Arc;

        use erp_database::{
            ErpDatabase, SalesRepsRepository, entities::sales_reps::CreateSalesRepsDAO,
            traits::InsertRepository,
        };

        use crate::{
            config::Config,
            server::{App, AppState},
        };

        async fn seeded() -> (axum::Router, Uuid, Uuid) {
            let pool = ErpDatabase::connect("sqlite::memory:", 1).await.unwrap();
            let mut tx = pool.begin().await.unwrap();
            let rep = |name: &str| CreateSalesRepsDAO {
                name: name.to_string(),
                email: format!("{}@pharma.com", name.to_lowercase()),
                commission_rate_bps: 500,
            };
            let ana = SalesRepsRepository::insert(&mut tx, rep("Ana")).await.unwrap().id;
            let bruno = SalesRepsRepository::insert(&mut tx, rep("Bruno")).await.unwrap().id;
            tx.commit().await.unwrap();

            let app = App::new(AppState::with_providers(
                pool,
                Arc::new(MemoryAuth::with_session(Duration::hours(8))),
                Arc::new(FixedProfile::role("VENDEDOR", Some(ana))),
                Config::default(),
            ));
            (app, ana, bruno)
        }

        fn post(uri: &str, body: Value) -> Request<Body> {
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::COOKIE, format!("ssid={TOKEN}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        }

        #[tokio::test]
        async fn logged_visits_belong_to_the_caller() {
            let (app, ana, bruno) = seeded().await;

            let response = app
                .clone()
                .oneshot(post(
                    "/portal/visitas",
                    serde_json::json!({
                        "sales_rep_id": bruno,
                        "visited_on": "2024-05-06",
                        "podiatrist": "Dra. Carla",
                        "pharmacy": "Drogaria Central",
                        "notes": ""
                    }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let visit: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(visit["sales_rep_id"], ana.to_string());
            assert_eq!(visit["notes"], Value::Null);

            let response = app
                .oneshot(
                    Request::get("/portal/visitas?from=2024-05-01&to=2024-05-31")
                        .header(header::COOKIE, format!("ssid={TOKEN}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let list: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(list["visits"].as_array().unwrap().len(), 1);
        }

        #[tokio::test]
        async fn logged_mileage_uses_the_configured_rate() {
            let (app, _, _) = seeded().await;

            let response = app
                .oneshot(post(
                    "/portal/quilometragem",
                    serde_json::json!({
                        "driven_on": "2024-05-03",
                        "origin": "Campinas",
                        "destination": "Sumaré",
                        "distance_km": 25.0
                    }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let entry: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(entry["rate_cents_per_km"], 90);
            assert_eq!(entry["reimbursement_cents"], 2250);
        }
    }
}
