//! Expenses (gastos)

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Deleted, Json, ListParams, RangeParams};
use crate::domain::expense::{Expense, ExpenseCategory, ExpenseQuery, ExpenseSummary};
use crate::domain::Page;
use crate::infrastructure::services::{CreateExpenseRequest, UpdateExpenseRequest};

#[derive(Debug, Default, Deserialize)]
pub struct ExpenseFilter {
    #[serde(default)]
    pub category: Option<ExpenseCategory>,
}

/// GET /api/gastos?category=&from=&to=
pub async fn list_expenses(
    State(state): State<AppState>,
    Query(filter): Query<ExpenseFilter>,
    Query(range): Query<RangeParams>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Expense>>, ApiError> {
    let query = ExpenseQuery {
        category: filter.category,
        range: range.range()?,
    };

    Ok(Json(state.expenses.list(&query, params.pagination()).await?))
}

/// POST /api/gastos
pub async fn create_expense(
    State(state): State<AppState>,
    Json(request): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<Expense>), ApiError> {
    let expense = state.expenses.create(request).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// GET /api/gastos/resumen?from=&to=
pub async fn expense_summary(
    State(state): State<AppState>,
    Query(range): Query<RangeParams>,
) -> Result<Json<ExpenseSummary>, ApiError> {
    Ok(Json(state.expenses.summary(range.range()?).await?))
}

/// GET /api/gastos/{id}
pub async fn get_expense(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Expense>, ApiError> {
    Ok(Json(state.expenses.get(&id).await?))
}

/// PUT /api/gastos/{id}
pub async fn update_expense(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateExpenseRequest>,
) -> Result<Json<Expense>, ApiError> {
    Ok(Json(state.expenses.update(&id, request).await?))
}

/// DELETE /api/gastos/{id}
pub async fn delete_expense(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    state.expenses.delete(&id).await?;
    Ok(Json(Deleted::new(id)))
}
