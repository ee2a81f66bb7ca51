//! Expense (gasto) entity

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::id::entity_id;
use crate::domain::query::DateRange;
use crate::domain::storage::StorageEntity;
use crate::domain::DomainError;

entity_id!(
    /// Identifier of an expense
    ExpenseId,
    "expense"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Feed,
    Health,
    Infrastructure,
    Labor,
    Services,
    Other,
}

impl ExpenseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Health => "health",
            Self::Infrastructure => "infrastructure",
            Self::Labor => "labor",
            Self::Services => "services",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(
        date: NaiveDate,
        category: ExpenseCategory,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Result<Self, DomainError> {
        validate_amount(amount)?;
        let description = description.into().trim().to_string();

        if description.is_empty() {
            return Err(DomainError::validation("Description cannot be empty"));
        }

        let now = Utc::now();

        Ok(Self {
            id: ExpenseId::generate(),
            date,
            category,
            amount,
            description,
            supplier: None,
            receipt_number: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

pub fn validate_amount(amount: Decimal) -> Result<(), DomainError> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::validation("Amount must be greater than zero"));
    }

    Ok(())
}

impl StorageEntity for Expense {
    type Key = ExpenseId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExpenseQuery {
    pub category: Option<ExpenseCategory>,
    pub range: DateRange,
}

impl ExpenseQuery {
    pub fn matches(&self, expense: &Expense) -> bool {
        self.category.is_none_or(|c| c == expense.category) && self.range.contains(expense.date)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpenseSummary {
    pub total: Decimal,
    pub count: usize,
    pub by_category: BTreeMap<ExpenseCategory, Decimal>,
}

impl ExpenseSummary {
    pub fn from_expenses<'a>(expenses: impl IntoIterator<Item = &'a Expense>) -> Self {
        let mut summary = Self::default();

        for expense in expenses {
            summary.total += expense.amount;
            summary.count += 1;
            *summary
                .by_category
                .entry(expense.category)
                .or_insert(Decimal::ZERO) += expense.amount;
        }

        summary
    }
}
