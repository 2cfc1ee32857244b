use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", tag = "period")]
pub enum Recurrence {
    Monthly,
    Quarterly,
    Yearly,
    #[serde(rename_all = "camelCase")]
    MultiYear { interval_years: u32 },
    OneTime,
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringExpense {
    pub amount: f64,
    #[serde(flatten)]
    pub recurrence: Recurrence,
}

impl RecurringExpense {
    pub fn annualized(&self) -> f64 {
        match self.recurrence {
            Recurrence::Monthly => self.amount * 12.0,
            Recurrence::Quarterly => self.amount * 4.0,
            Recurrence::Yearly => self.amount,
            Recurrence::MultiYear { interval_years: 0 } => 0.0,
            Recurrence::MultiYear { interval_years } => self.amount / interval_years as f64,
            Recurrence::OneTime => 0.0,
        }
    }
}

/// Annual recurring expense total fed to `base_annual_expenses`. One-time expenses are excluded.
pub fn annual_total(expenses: &[RecurringExpense]) -> f64 {
    expenses.iter().map(RecurringExpense::annualized).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expense(amount: f64, recurrence: Recurrence) -> RecurringExpense {
        RecurringExpense { amount, recurrence }
    }

    #[test]
    fn annualizes_each_recurrence_period() {
        let expenses = [
            expense(1_000.0, Recurrence::Monthly),
            expense(500.0, Recurrence::Quarterly),
            expense(2_400.0, Recurrence::Yearly),
            expense(30_000.0, Recurrence::MultiYear { interval_years: 5 }),
            expense(9_999.0, Recurrence::OneTime),
        ];
        assert_eq!(annual_total(&expenses), 12_000.0 + 2_000.0 + 2_400.0 + 6_000.0);
    }

    #[test]
    fn multi_year_without_interval_contributes_nothing() {
        let expenses = [expense(10_000.0, Recurrence::MultiYear { interval_years: 0 })];
        assert_eq!(annual_total(&expenses), 0.0);
    }

    #[test]
    fn parses_tagged_json_records() {
        let json = r#"[
            {"amount": 100, "period": "monthly"},
            {"amount": 25000, "period": "multiYear", "intervalYears": 5}
        ]"#;
        let parsed = serde_json::from_str::<Vec<RecurringExpense>>(json).expect("valid json");
        assert_eq!(annual_total(&parsed), 1_200.0 + 5_000.0);
    }
}
