//! Sales domain

mod entity;

pub use entity::{
    PaymentMethod, Sale, SaleId, SaleItem, SaleQuery, SaleStatus, SalesStatistics,
};
