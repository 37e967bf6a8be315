use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Billing unit a rental is purchased in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Week,
    Month,
}

impl DurationUnit {
    pub const fn label(self) -> &'static str {
        match self {
            DurationUnit::Week => "week",
            DurationUnit::Month => "month",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            _ => None,
        }
    }

    /// Months are always thirty days; calendar months are never consulted.
    const fn days(self) -> i64 {
        match self {
            DurationUnit::Week => 7,
            DurationUnit::Month => 30,
        }
    }
}

/// Canonical reading of the free-text duration a tenant asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RentalTerm {
    pub unit: DurationUnit,
    pub count: u32,
    pub price: &'static str,
}

impl RentalTerm {
    const ONE_WEEK: Self = Self {
        unit: DurationUnit::Week,
        count: 1,
        price: "$150",
    };
    const ONE_MONTH: Self = Self {
        unit: DurationUnit::Month,
        count: 1,
        price: "$400",
    };
    const THREE_MONTHS: Self = Self {
        unit: DurationUnit::Month,
        count: 3,
        price: "$1000",
    };

    /// Reads English or Spanish duration text ("1 week", "3 meses", ...).
    ///
    /// Never fails: anything unrecognised is billed as a single month.
    pub fn parse(text: &str) -> Self {
        let text = text.to_lowercase();
        let mentions = |needles: &[&str]| needles.iter().any(|needle| text.contains(needle));

        if mentions(&["week", "semana"]) && text.contains('1') {
            return Self::ONE_WEEK;
        }

        if mentions(&["month", "mes"]) {
            if text.contains('1') {
                return Self::ONE_MONTH;
            }
            if text.contains('3') {
                return Self::THREE_MONTHS;
            }
        }

        Self::ONE_MONTH
    }

    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        expires_at(self.unit, self.count, now)
    }
}

/// `None` when the term runs past the representable calendar.
pub fn expires_at(
    unit: DurationUnit,
    count: u32,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let days = unit.days().checked_mul(i64::from(count))?;
    now.checked_add_signed(Duration::try_days(days)?)
}
