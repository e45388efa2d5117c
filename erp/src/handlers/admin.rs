use std::{collections::HashMap, sync::Arc};

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use erp_database::{
    GoalsRepository, MileageRepository, Period, SalesRepository, SalesRepsRepository,
    VisitsRepository,
    entities::{
        goals::{CreateGoalsDAO, GoalsDAO, GoalsWhere},
        mileage::{MileageDAO, MileageWhere},
        sales::{CreateSalesDAO, SalesDAO, SalesWhere},
        sales_reps::{SalesRepsBy, SalesRepsDAO, SalesRepsWhere},
        visits::VisitsWhere,
    },
    traits::{EntityRepository, InsertRepository},
};

use crate::{
    handlers::{
        dto::{
            CreateSaleDTO, DashboardDTO, GoalDTO, GoalsListDTO, MileageListDTO, MonthQuery,
            PeriodQuery, RepMonthDTO, SaleDTO, SalesListDTO, SalesRepDTO, SalesRepsListDTO,
            UpsertGoalDTO, VisitDTO, VisitsListDTO,
        },
        today,
    },
    reports::summary::{GoalProgress, MileageTotals, SalesTotals, sales_by_rep},
    server::{AppState, ServerError},
};

/// Month overview across active reps. Reps without sales still show up
/// with zero totals against their goal.
pub fn dashboard_view(
    period: Period,
    reps: Vec<SalesRepsDAO>,
    sales: &[SalesDAO],
    goals: &[GoalsDAO],
    mileage: &[MileageDAO],
) -> DashboardDTO {
    let by_rep = sales_by_rep(sales);
    let targets: HashMap<_, _> = goals
        .iter()
        .map(|goal| (goal.sales_rep_id, goal.target_cents))
        .collect();

    let reps = reps
        .into_iter()
        .map(|rep| {
            let sales = by_rep.get(&rep.id).cloned().unwrap_or_default();
            RepMonthDTO {
                goal: GoalProgress::new(targets.get(&rep.id).copied(), sales.amount_cents),
                sales_rep_id: rep.id,
                name: rep.name,
                sales,
            }
        })
        .collect();

    DashboardDTO {
        period: period.into(),
        totals: SalesTotals::of(sales),
        reimbursement_cents: MileageTotals::of(mileage).reimbursement_cents,
        reps,
    }
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MonthQuery>,
) -> Result<DashboardDTO, ServerError> {
    let (year, month) = query.resolve(today())?;
    let period = Period::month(year, month)
        .ok_or_else(|| ServerError::BadRequest("Invalid Month".to_string()))?;

    let mut tx = state.pool.begin().await?;

    let reps = SalesRepsRepository::get_all(&mut tx, SalesRepsWhere::Active(true)).await?;
    let sales = SalesRepository::get_all(&mut tx, SalesWhere::Within(period)).await?;
    let goals = GoalsRepository::get_all(
        &mut tx,
        GoalsWhere::Month {
            year,
            month: month as i32,
        },
    )
    .await?;
    let mileage = MileageRepository::get_all(&mut tx, MileageWhere::Within(period)).await?;

    tx.commit().await?;

    Ok(dashboard_view(period, reps, &sales, &goals, &mileage))
}

pub async fn sales_reps(
    State(state): State<Arc<AppState>>,
) -> Result<SalesRepsListDTO, ServerError> {
    let mut tx = state.pool.begin().await?;
    let reps = SalesRepsRepository::get_all(&mut tx, SalesRepsWhere::All).await?;
    tx.commit().await?;

    Ok(SalesRepsListDTO {
        sales_reps: reps.into_iter().map(SalesRepDTO::from).collect(),
    })
}

pub async fn sales(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PeriodQuery>,
) -> Result<SalesListDTO, ServerError> {
    let period = query.period(today())?;
    let filter = match query.sales_rep_id {
        Some(id) => SalesWhere::SalesRepWithin(id, period),
        None => SalesWhere::Within(period),
    };

    let mut tx = state.pool.begin().await?;
    let sales = SalesRepository::get_all(&mut tx, filter).await?;
    tx.commit().await?;

    Ok(SalesListDTO::new(period, sales))
}

/// Registers a sale. Without an explicit rate the rep's current commission
/// rate is frozen into the row.
pub async fn create_sale(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSaleDTO>,
) -> Result<(StatusCode, SaleDTO), ServerError> {
    payload.validate()?;

    let mut tx = state.pool.begin().await?;

    let rep = SalesRepsRepository::try_get(&mut tx, SalesRepsBy::Id(payload.sales_rep_id))
        .await?
        .filter(|rep| rep.active)
        .ok_or_else(|| ServerError::BadRequest("Unknown Sales Rep".to_string()))?;

    let sale = SalesRepository::insert(
        &mut tx,
        CreateSalesDAO {
            sales_rep_id: rep.id,
            customer: payload.customer.trim().to_string(),
            sold_on: payload.sold_on,
            amount_cents: payload.amount_cents,
            commission_rate_bps: payload
                .commission_rate_bps
                .unwrap_or(rep.commission_rate_bps),
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(sale_id = %sale.id, sales_rep_id = %rep.id, "sale registered");
    Ok((StatusCode::CREATED, sale.into()))
}

pub async fn goals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MonthQuery>,
) -> Result<GoalsListDTO, ServerError> {
    let (year, month) = query.resolve(today())?;

    let mut tx = state.pool.begin().await?;
    let goals = GoalsRepository::get_all(
        &mut tx,
        GoalsWhere::Month {
            year,
            month: month as i32,
        },
    )
    .await?;
    tx.commit().await?;

    Ok(GoalsListDTO {
        year: Some(year),
        month: Some(month),
        goals: goals
            .into_iter()
            .filter(|goal| query.sales_rep_id.is_none_or(|id| goal.sales_rep_id == id))
            .map(GoalDTO::from)
            .collect(),
    })
}

pub async fn upsert_goal(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpsertGoalDTO>,
) -> Result<GoalDTO, ServerError> {
    payload.validate()?;

    let mut tx = state.pool.begin().await?;

    let rep = SalesRepsRepository::get(&mut tx, SalesRepsBy::Id(payload.sales_rep_id)).await?;

    let goal = GoalsRepository::insert(
        &mut tx,
        CreateGoalsDAO {
            sales_rep_id: rep.id,
            year: payload.year,
            month: payload.month as i32,
            target_cents: payload.target_cents,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(sales_rep_id = %rep.id, year = goal.year, month = goal.month, "goal set");
    Ok(goal.into())
}

pub async fn mileage(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PeriodQuery>,
) -> Result<MileageListDTO, ServerError> {
    let period = query.period(today())?;
    let filter = match query.sales_rep_id {
        Some(id) => MileageWhere::SalesRepWithin(id, period),
        None => MileageWhere::Within(period),
    };

    let mut tx = state.pool.begin().await?;
    let entries = MileageRepository::get_all(&mut tx, filter).await?;
    tx.commit().await?;

    Ok(MileageListDTO::new(period, entries))
}

pub async fn visits(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PeriodQuery>,
) -> Result<VisitsListDTO, ServerError> {
    let period = query.period(today())?;
    let filter = match query.sales_rep_id {
        Some(id) => VisitsWhere::SalesRepWithin(id, period),
        None => VisitsWhere::Within(period),
    };

    let mut tx = state.pool.begin().await?;
    let visits = VisitsRepository::get_all(&mut tx, filter).await?;
    tx.commit().await?;

    Ok(VisitsListDTO {
        period: period.into(),
        visits: visits.into_iter().map(VisitDTO::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn rep(name: &str) -> SalesRepsDAO {
        SalesRepsDAO {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@pharma.com", name.to_lowercase()),
            commission_rate_bps: 500,
            active: true,
        }
    }

    fn sale(sales_rep_id: Uuid, amount_cents: i64) -> SalesDAO {
        SalesDAO {
            id: Uuid::new_v4(),
            sales_rep_id,
            customer: "Drogaria Central".to_string(),
            sold_on: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            amount_cents,
            commission_rate_bps: 1_000,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn dashboard_tracks_goals_per_rep() {
        let (ana, bruno) = (rep("Ana"), rep("Bruno"));
        let goals = vec![GoalsDAO {
            id: Uuid::new_v4(),
            sales_rep_id: ana.id,
            year: 2024,
            month: 5,
            target_cents: 200_000,
        }];
        let sales = vec![sale(ana.id, 50_000), sale(ana.id, 100_000)];
        let (ana_id, bruno_id) = (ana.id, bruno.id);

        let view = dashboard_view(
            Period::month(2024, 5).unwrap(),
            vec![ana, bruno],
            &sales,
            &goals,
            &[],
        );

        assert_eq!(view.totals.amount_cents, 150_000);
        assert_eq!(view.totals.commission_cents, 15_000);
        assert_eq!(view.reimbursement_cents, 0);

        let ana = view.reps.iter().find(|r| r.sales_rep_id == ana_id).unwrap();
        assert_eq!(ana.goal.attainment_bps, Some(7_500));

        let bruno = view.reps.iter().find(|r| r.sales_rep_id == bruno_id).unwrap();
        assert_eq!(bruno.sales.count, 0);
        assert_eq!(bruno.goal.target_cents, 0);
        assert_eq!(bruno.goal.attainment_bps, None);
    }

    #[cfg(feature = "unit")]
    mod with_database {
        use super::*;
        use crate::{
            auth::{
                guard::tests::{MemoryAuth, TOKEN},
                profile::tests::FixedProfile,
            },
            config::Config,
            server::{App, AppState},
        };
        use axum::{
            body::Body,
            http::{Request, header},
        };
        use chrono::Duration;
        use erp_database::{ErpDatabase, entities::sales_reps::CreateSalesRepsDAO};
        use http_body_util::BodyExt;
        use serde_json::Value;
        use tower::util::ServiceExt;

        async fn seeded() -> (axum::Router, Uuid) {
            let pool = ErpDatabase::connect("sqlite::memory:", 1).await.unwrap();
            let mut tx = pool.begin().await.unwrap();
            let ana = SalesRepsRepository::insert(
                &mut tx,
                CreateSalesRepsDAO {
                    name: "Ana".to_string(),
                    email: "ana@pharma.com".to_string(),
                    commission_rate_bps: 750,
                },
            )
            .await
            .unwrap()
            .id;
            tx.commit().await.unwrap();

            let app = App::new(AppState::with_providers(
                pool,
                Arc::new(MemoryAuth::with_session(Duration::hours(8))),
                Arc::new(FixedProfile::role("ADMIN", None)),
                Config::default(),
            ));
            (app, ana)
        }

        fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
            let builder = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::COOKIE, format!("ssid={TOKEN}"))
                .header(header::CONTENT_TYPE, "application/json");
            match body {
                Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            }
        }

        async fn json(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
            let response = app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            (status, serde_json::from_slice(&bytes).unwrap())
        }

        #[tokio::test]
        async fn sales_default_to_the_rep_commission() {
            let (app, ana) = seeded().await;

            let (status, sale) = json(
                &app,
                request(
                    "POST",
                    "/vendas",
                    Some(serde_json::json!({
                        "sales_rep_id": ana,
                        "customer": "Drogaria Central",
                        "sold_on": "2024-05-02",
                        "amount_cents": 100_000
                    })),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
            assert_eq!(sale["commission_rate_bps"], 750);
            assert_eq!(sale["commission_cents"], 7_500);

            let (status, list) = json(
                &app,
                request("GET", "/vendas?from=2024-05-01&to=2024-05-31", None),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(list["totals"]["count"], 1);
            assert_eq!(list["totals"]["amount_cents"], 100_000);
        }

        #[tokio::test]
        async fn sales_for_unknown_reps_are_rejected() {
            let (app, _) = seeded().await;

            let (status, body) = json(
                &app,
                request(
                    "POST",
                    "/vendas",
                    Some(serde_json::json!({
                        "sales_rep_id": Uuid::new_v4(),
                        "customer": "Drogaria Central",
                        "sold_on": "2024-05-02",
                        "amount_cents": 100_000
                    })),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], "Unknown Sales Rep");
        }

        #[tokio::test]
        async fn goals_are_upserted_and_shown_on_the_dashboard() {
            let (app, ana) = seeded().await;

            for target in [100_000, 80_000] {
                let (status, _) = json(
                    &app,
                    request(
                        "PUT",
                        "/metas",
                        Some(serde_json::json!({
                            "sales_rep_id": ana,
                            "year": 2024,
                            "month": 5,
                            "target_cents": target
                        })),
                    ),
                )
                .await;
                assert_eq!(status, StatusCode::OK);
            }

            let (_, goals) = json(&app, request("GET", "/metas?year=2024&month=5", None)).await;
            assert_eq!(goals["goals"].as_array().unwrap().len(), 1);
            assert_eq!(goals["goals"][0]["target_cents"], 80_000);

            let (status, dashboard) =
                json(&app, request("GET", "/dashboard?year=2024&month=5", None)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(dashboard["reps"][0]["name"], "Ana");
            assert_eq!(dashboard["reps"][0]["goal"]["target_cents"], 80_000);
        }

        #[tokio::test]
        async fn goals_for_unknown_reps_are_not_found() {
            let (app, _) = seeded().await;

            let (status, _) = json(
                &app,
                request(
                    "PUT",
                    "/metas",
                    Some(serde_json::json!({
                        "sales_rep_id": Uuid::new_v4(),
                        "year": 2024,
                        "month": 5,
                        "target_cents": 1
                    })),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
    }
}
