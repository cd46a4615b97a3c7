// engine/src/forecast.rs
// Closed-form compound-growth projection. Deterministic: the same ledger,
// scenario, and horizon always produce the same sequence.

use rust_decimal::Decimal;
use shared::{
    CustomRates, ForecastProjection, ForecastScenario, ForecastSummary, ProjectedPeriod,
};
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{EngineError, EngineResult};
use crate::metrics::MetricsCalculator;

const MAX_HORIZON_PERIODS: u32 = 120;

/// Per-period growth/churn rates for a scenario.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioRates {
    pub growth: Decimal,
    pub churn: Decimal,
}

/// Scenario-to-rate table. `custom` requires caller-supplied rates.
pub fn rates_for(
    scenario: ForecastScenario,
    custom: Option<CustomRates>,
) -> EngineResult<ScenarioRates> {
    match scenario {
        ForecastScenario::Base => Ok(ScenarioRates {
            growth: Decimal::new(2, 2),
            churn: Decimal::new(3, 2),
        }),
        ForecastScenario::Optimistic => Ok(ScenarioRates {
            growth: Decimal::new(4, 2),
            churn: Decimal::new(15, 3),
        }),
        ForecastScenario::Pessimistic => Ok(ScenarioRates {
            growth: Decimal::new(5, 3),
            churn: Decimal::new(5, 2),
        }),
        ForecastScenario::Custom => match custom {
            Some(rates) => Ok(ScenarioRates {
                growth: rates.growth_rate,
                churn: rates.churn_rate,
            }),
            None => Err(EngineError::InvalidForecast(
                "custom scenario requires growth and churn rates".to_string(),
            )),
        },
    }
}

pub struct ForecastEngine {
    calculator: MetricsCalculator,
    clock: Arc<dyn Clock>,
}

impl ForecastEngine {
    pub fn new(calculator: MetricsCalculator, clock: Arc<dyn Clock>) -> Self {
        Self { calculator, clock }
    }

    /// Project MRR/ARR over `horizon_periods` months under the scenario's
    /// net compound rate.
    pub async fn generate(
        &self,
        scenario: ForecastScenario,
        horizon_periods: u32,
        custom: Option<CustomRates>,
    ) -> EngineResult<ForecastProjection> {
        if horizon_periods == 0 || horizon_periods > MAX_HORIZON_PERIODS {
            return Err(EngineError::InvalidForecast(format!(
                "horizon must be between 1 and {MAX_HORIZON_PERIODS} periods, got {horizon_periods}"
            )));
        }
        let rates = rates_for(scenario, custom)?;

        let baseline = self.calculator.baseline().await?;
        let start_mrr = baseline.mrr;
        let per_period = Decimal::ONE + rates.growth - rates.churn;

        let mut periods = Vec::with_capacity(horizon_periods as usize);
        let mut factor = Decimal::ONE;
        for period in 1..=horizon_periods {
            factor *= per_period;
            let mrr = (start_mrr * factor).round_dp(2);
            periods.push(ProjectedPeriod {
                period,
                mrr,
                arr: (mrr * Decimal::from(12)).round_dp(2),
            });
        }

        let end_mrr = periods.last().map(|p| p.mrr).unwrap_or(start_mrr);
        let total_growth_pct = if start_mrr.is_zero() {
            Decimal::ZERO
        } else {
            ((end_mrr - start_mrr)
                .checked_div(start_mrr)
                .unwrap_or(Decimal::ZERO)
                * Decimal::ONE_HUNDRED)
                .round_dp(2)
        };

        tracing::info!(
            scenario = %scenario,
            horizon_periods,
            start_mrr = %start_mrr,
            end_mrr = %end_mrr,
            "forecast generated"
        );

        Ok(ForecastProjection {
            scenario,
            horizon_periods,
            baseline,
            periods,
            summary: ForecastSummary {
                start_mrr,
                end_mrr,
                total_growth_pct,
                monthly_growth_rate: rates.growth,
                monthly_churn_rate: rates.churn,
            },
            generated_at: self.clock.now(),
        })
    }
}
