//! Expenses domain

mod entity;

pub use entity::{
    validate_amount, Expense, ExpenseCategory, ExpenseId, ExpenseQuery, ExpenseSummary,
};
