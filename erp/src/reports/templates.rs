use std::collections::HashMap;

use erp_database::{
    Period,
    entities::{mileage::MileageDAO, sales::SalesDAO},
};
use uuid::Uuid;

use crate::reports::{
    layout::{Column, ReportInput},
    money::{format_brl, format_km},
    summary::{MileageTotals, SalesTotals, sales_by_rep},
};

const UNKNOWN_REP: &str = "(sem representante)";

fn describe(period: &Period) -> String {
    format!(
        "{} a {}",
        period.from.format("%d/%m/%Y"),
        period.to.format("%d/%m/%Y")
    )
}

fn rep_name(names: &HashMap<Uuid, String>, id: &Uuid) -> String {
    names
        .get(id)
        .cloned()
        .unwrap_or_else(|| UNKNOWN_REP.to_string())
}

/// Sales report. When the sales span more than one rep the summary also
/// breaks the totals down per rep.
pub fn sales_report(
    period: &Period,
    sales: &[SalesDAO],
    names: &HashMap<Uuid, String>,
) -> ReportInput {
    let totals = SalesTotals::of(sales);

    let mut summary = vec![
        ("Período".to_string(), describe(period)),
        ("Vendas".to_string(), totals.count.to_string()),
        ("Faturamento".to_string(), format_brl(totals.amount_cents)),
        ("Comissão".to_string(), format_brl(totals.commission_cents)),
    ];

    let by_rep = sales_by_rep(sales);
    if by_rep.len() > 1 {
        let mut per_rep: Vec<(String, SalesTotals)> = by_rep
            .into_iter()
            .map(|(id, totals)| (rep_name(names, &id), totals))
            .collect();
        per_rep.sort_by(|a, b| a.0.cmp(&b.0));

        summary.extend(per_rep.into_iter().map(|(name, totals)| {
            (
                name,
                format!(
                    "{} em {} venda(s), comissão {}",
                    format_brl(totals.amount_cents),
                    totals.count,
                    format_brl(totals.commission_cents)
                ),
            )
        }));
    }

    let rows = sales
        .iter()
        .map(|sale| {
            vec![
                sale.sold_on.format("%d/%m/%Y").to_string(),
                rep_name(names, &sale.sales_rep_id),
                sale.customer.clone(),
                format_brl(sale.amount_cents),
                format_brl(sale.commission_cents()),
            ]
        })
        .collect();

    ReportInput {
        title: "Relatório de Vendas".to_string(),
        subtitle: Some(describe(period)),
        summary,
        columns: vec![
            Column::left("Data", 10),
            Column::left("Representante", 18),
            Column::left("Cliente", 24),
            Column::right("Valor", 16),
            Column::right("Comissão", 14),
        ],
        rows,
    }
}

pub fn mileage_report(
    period: &Period,
    entries: &[MileageDAO],
    names: &HashMap<Uuid, String>,
) -> ReportInput {
    let totals = MileageTotals::of(entries);

    let rows = entries
        .iter()
        .map(|entry| {
            vec![
                entry.driven_on.format("%d/%m/%Y").to_string(),
                rep_name(names, &entry.sales_rep_id),
                format!("{} → {}", entry.origin, entry.destination),
                format_km(entry.distance_km),
                format_brl(entry.reimbursement_cents()),
            ]
        })
        .collect();

    ReportInput {
        title: "Relatório de Quilometragem".to_string(),
        subtitle: Some(describe(period)),
        summary: vec![
            ("Período".to_string(), describe(period)),
            ("Lançamentos".to_string(), totals.count.to_string()),
            ("Distância".to_string(), format_km(totals.distance_km)),
            ("Reembolso".to_string(), format_brl(totals.reimbursement_cents)),
        ],
        columns: vec![
            Column::left("Data", 10),
            Column::left("Representante", 18),
            Column::left("Trajeto", 30),
            Column::right("Distância", 10),
            Column::right("Reembolso", 14),
        ],
        rows,
    }
}
