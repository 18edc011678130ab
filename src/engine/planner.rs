//! Investment planner.
//!
//! Turns a shortlist into fixed-amount purchase orders. There is no
//! brokerage backend: orders are dry-run only, logged and reported with a
//! generated id.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

use crate::config::InvestmentConfig;
use crate::types::{Category, FundRankError, ScoredRecord};

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedOrder {
    pub order_id: String,
    pub category: Category,
    pub code: String,
    pub name: String,
    pub amount: Decimal,
    /// Fee rate in percent, if the ranking listed one.
    pub fee_rate: Option<Decimal>,
    pub estimated_fee: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct InvestmentPlan {
    pub orders: Vec<PlannedOrder>,
    pub total_amount: Decimal,
    pub total_fees: Decimal,
}

impl InvestmentPlan {
    pub fn merge(&mut self, other: InvestmentPlan) {
        self.total_amount += other.total_amount;
        self.total_fees += other.total_fees;
        self.orders.extend(other.orders);
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

pub struct InvestmentPlanner {
    amount_per_fund: Decimal,
}

impl InvestmentPlanner {
    /// Refuses live mode and non-positive amounts.
    pub fn new(config: &InvestmentConfig) -> Result<Self, FundRankError> {
        if !config.dry_run {
            return Err(FundRankError::Config(
                "investment.dry_run = false is not supported: no order backend".to_string(),
            ));
        }
        let amount_per_fund = Decimal::try_from(config.amount_per_fund)
            .map_err(|e| FundRankError::Config(format!("invalid amount_per_fund: {e}")))?
            .round_dp(2);
        if amount_per_fund <= Decimal::ZERO {
            return Err(FundRankError::Config(format!(
                "amount_per_fund must be positive, got {amount_per_fund}"
            )));
        }
        Ok(Self { amount_per_fund })
    }

    /// One order per shortlisted fund, in shortlist order.
    pub fn plan(&self, category: Category, shortlist: &[ScoredRecord]) -> InvestmentPlan {
        let mut plan = InvestmentPlan::default();

        for scored in shortlist {
            let fee_rate = scored
                .record
                .fee
                .and_then(|f| Decimal::try_from(f).ok())
                .map(|f| f.round_dp(4));
            let estimated_fee = fee_rate
                .map(|rate| (self.amount_per_fund * rate / dec!(100)).round_dp(2))
                .unwrap_or(Decimal::ZERO);

            let order = PlannedOrder {
                order_id: format!("dry-run-{}", uuid::Uuid::new_v4()),
                category,
                code: scored.record.code.clone(),
                name: scored.record.name.clone(),
                amount: self.amount_per_fund,
                fee_rate,
                estimated_fee,
            };
            info!(
                order_id = %order.order_id,
                code = %order.code,
                name = %order.name,
                amount = %order.amount,
                fee = %order.estimated_fee,
                score = format!("{:.2}", scored.composite),
                "[DRY RUN] Would invest"
            );

            plan.total_amount += order.amount;
            plan.total_fees += order.estimated_fee;
            plan.orders.push(order);
        }
        plan
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
