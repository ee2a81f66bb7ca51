use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use super::today;
use crate::domain::expense::{
    validate_amount, Expense, ExpenseCategory, ExpenseId, ExpenseQuery, ExpenseSummary,
};
use crate::domain::{DateRange, DomainError, Page, Pagination};
use crate::infrastructure::storage::Stores;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateExpenseRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub category: ExpenseCategory,
    pub amount: Decimal,
    pub description: String,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub receipt_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateExpenseRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub category: Option<ExpenseCategory>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub receipt_number: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExpenseService {
    stores: Stores,
}

impl ExpenseService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn create(&self, request: CreateExpenseRequest) -> Result<Expense, DomainError> {
        let date = request.date.unwrap_or_else(today);
        let mut expense =
            Expense::new(date, request.category, request.amount, request.description)?;
        expense.supplier = request.supplier;
        expense.receipt_number = request.receipt_number;

        info!(
            id = %expense.id,
            category = %expense.category.as_str(),
            amount = %expense.amount,
            "Recording expense"
        );
        self.stores.expenses.create(expense).await
    }

    pub async fn get(&self, id: &str) -> Result<Expense, DomainError> {
        let expense_id = ExpenseId::parse(id)?;
        self.stores
            .expenses
            .get(&expense_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Expense '{}' not found", id)))
    }

    pub async fn list(
        &self,
        query: &ExpenseQuery,
        pagination: Pagination,
    ) -> Result<Page<Expense>, DomainError> {
        let mut expenses: Vec<Expense> = self
            .stores
            .expenses
            .list()
            .await?
            .into_iter()
            .filter(|e| query.matches(e))
            .collect();

        expenses.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(Page::from_sorted(expenses, pagination))
    }

    pub async fn update(
        &self,
        id: &str,
        request: UpdateExpenseRequest,
    ) -> Result<Expense, DomainError> {
        let mut expense = self.get(id).await?;

        if let Some(date) = request.date {
            expense.date = date;
        }

        if let Some(category) = request.category {
            expense.category = category;
        }

        if let Some(amount) = request.amount {
            validate_amount(amount)?;
            expense.amount = amount;
        }

        if let Some(description) = request.description {
            let description = description.trim().to_string();
            if description.is_empty() {
                return Err(DomainError::validation("Description cannot be empty"));
            }
            expense.description = description;
        }

        if request.supplier.is_some() {
            expense.supplier = request.supplier;
        }

        if request.receipt_number.is_some() {
            expense.receipt_number = request.receipt_number;
        }

        expense.touch();
        info!(id = %expense.id, "Updating expense");
        self.stores.expenses.update(expense).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), DomainError> {
        let expense = self.get(id).await?;
        info!(id = %expense.id, "Deleting expense");
        self.stores.expenses.delete(&expense.id).await?;
        Ok(())
    }

    pub async fn summary(&self, range: DateRange) -> Result<ExpenseSummary, DomainError> {
        let expenses = self.stores.expenses.list().await?;
        Ok(ExpenseSummary::from_expenses(
            expenses.iter().filter(|e| range.contains(e.date)),
        ))
    }
}
