use std::{collections::HashMap, sync::Arc};

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use erp_database::{
    DB, MileageRepository, Period, SalesRepository, SalesRepsRepository,
    entities::{
        mileage::MileageWhere,
        sales::SalesWhere,
        sales_reps::{SalesRepsBy, SalesRepsWhere},
    },
    traits::EntityRepository,
};
use sqlx::Transaction;
use uuid::Uuid;

use crate::{
    auth::guard::CurrentUser,
    handlers::{
        dto::{ReportFormat, ReportQuery},
        portal::portal_scope,
        today,
    },
    reports::{
        layout::{Document, ReportInput, layout},
        templates,
    },
    server::{AppState, ServerError},
};

fn file_name(kind: &str, period: &Period) -> String {
    format!(
        "relatorio-{kind}-{}-{}.txt",
        period.from.format("%Y-%m-%d"),
        period.to.format("%Y-%m-%d")
    )
}

/// Plain text is sent as a download; JSON exposes the page structure.
fn render(document: Document, format: ReportFormat, file_name: &str) -> Response {
    match format {
        ReportFormat::Json => Json(document).into_response(),
        ReportFormat::Text => {
            let mut response = (
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                document.render_text(),
            )
                .into_response();

            match HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\"")) {
                Ok(value) => {
                    response
                        .headers_mut()
                        .insert(header::CONTENT_DISPOSITION, value);
                }
                Err(e) => tracing::error!("Could not encode report file name: {:?}", e),
            }
            response
        }
    }
}

fn build(state: &AppState, input: &ReportInput) -> Document {
    layout(input, Utc::now(), state.config.report_rows_per_page)
}

async fn rep_names(
    tx: &mut Transaction<'_, DB>,
    only: Option<Uuid>,
) -> Result<HashMap<Uuid, String>, ServerError> {
    let reps = match only {
        Some(id) => SalesRepsRepository::try_get(tx, SalesRepsBy::Id(id))
            .await?
            .into_iter()
            .collect(),
        None => SalesRepsRepository::get_all(tx, SalesRepsWhere::All).await?,
    };

    Ok(reps.into_iter().map(|rep| (rep.id, rep.name)).collect())
}

pub async fn sales_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ServerError> {
    let period = query.period(today())?;
    let filter = match query.sales_rep_id {
        Some(id) => SalesWhere::SalesRepWithin(id, period),
        None => SalesWhere::Within(period),
    };

    let mut tx = state.pool.begin().await?;
    let sales = SalesRepository::get_all(&mut tx, filter).await?;
    let names = rep_names(&mut tx, query.sales_rep_id).await?;
    tx.commit().await?;

    let document = build(&state, &templates::sales_report(&period, &sales, &names));
    Ok(render(document, query.format, &file_name("vendas", &period)))
}

pub async fn mileage_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ServerError> {
    let period = query.period(today())?;
    let filter = match query.sales_rep_id {
        Some(id) => MileageWhere::SalesRepWithin(id, period),
        None => MileageWhere::Within(period),
    };

    let mut tx = state.pool.begin().await?;
    let entries = MileageRepository::get_all(&mut tx, filter).await?;
    let names = rep_names(&mut tx, query.sales_rep_id).await?;
    tx.commit().await?;

    let document = build(&state, &templates::mileage_report(&period, &entries, &names));
    Ok(render(
        document,
        query.format,
        &file_name("quilometragem", &period),
    ))
}

pub async fn own_sales_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ServerError> {
    let scope = portal_scope(&user, query.sales_rep_id)?;
    let period = query.period(today())?;

    let (sales, names) = match scope {
        Some(sales_rep_id) => {
            let mut tx = state.pool.begin().await?;
            let sales =
                SalesRepository::get_all(&mut tx, SalesWhere::SalesRepWithin(sales_rep_id, period))
                    .await?;
            let names = rep_names(&mut tx, Some(sales_rep_id)).await?;
            tx.commit().await?;
            (sales, names)
        }
        None => (Vec::new(), HashMap::new()),
    };

    let document = build(&state, &templates::sales_report(&period, &sales, &names));
    Ok(render(document, query.format, &file_name("vendas", &period)))
}
