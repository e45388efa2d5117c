use std::collections::BTreeMap;

use erp_database::entities::{mileage::MileageDAO, sales::SalesDAO};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SalesTotals {
    pub count: usize,
    pub amount_cents: i64,
    pub commission_cents: i64,
}

impl SalesTotals {
    pub fn add(&mut self, sale: &SalesDAO) {
        self.count += 1;
        self.amount_cents += sale.amount_cents;
        self.commission_cents += sale.commission_cents();
    }

    pub fn of<'a>(sales: impl IntoIterator<Item = &'a SalesDAO>) -> Self {
        sales.into_iter().fold(Self::default(), |mut totals, sale| {
            totals.add(sale);
            totals
        })
    }
}

pub fn sales_by_rep(sales: &[SalesDAO]) -> BTreeMap<Uuid, SalesTotals> {
    let mut by_rep: BTreeMap<Uuid, SalesTotals> = BTreeMap::new();
    for sale in sales {
        by_rep.entry(sale.sales_rep_id).or_default().add(sale);
    }
    by_rep
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct MileageTotals {
    pub count: usize,
    pub distance_km: f64,
    pub reimbursement_cents: i64,
}

impl MileageTotals {
    pub fn of<'a>(entries: impl IntoIterator<Item = &'a MileageDAO>) -> Self {
        entries
            .into_iter()
            .fold(Self::default(), |mut totals, entry| {
                totals.count += 1;
                if entry.distance_km.is_finite() && entry.distance_km > 0.0 {
                    totals.distance_km += entry.distance_km;
                }
                totals.reimbursement_cents += entry.reimbursement_cents();
                totals
            })
    }
}

/// Progress of a month against its goal. Without a goal the target is 0
/// and there is no attainment to report.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct GoalProgress {
    pub target_cents: i64,
    pub achieved_cents: i64,
    pub attainment_bps: Option<i64>,
}

impl GoalProgress {
    pub fn new(target_cents: Option<i64>, achieved_cents: i64) -> Self {
        let target_cents = target_cents.unwrap_or(0).max(0);
        let attainment_bps = (target_cents > 0).then(|| {
            (i128::from(achieved_cents) * 10_000 / i128::from(target_cents)) as i64
        });

        Self {
            target_cents,
            achieved_cents,
            attainment_bps,
        }
    }
}
