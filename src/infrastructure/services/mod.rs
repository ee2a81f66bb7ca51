//! Application services
//!
//! Each service owns the rules of one farm area and works against the
//! shared [`Stores`](crate::infrastructure::storage::Stores) bundle.

mod alert_service;
mod cuy_service;
mod dashboard_service;
mod expense_service;
mod feed_service;
mod health_service;
mod housing_service;
mod notification_service;
mod report_service;
mod reproduction_service;
mod sales_service;

use chrono::NaiveDate;

pub use alert_service::{AlertService, AlertSummary, GenerateAlertsRequest};
pub use cuy_service::{
    CreateCuyRequest, CuyService, CuyStatistics, RecordDeathRequest, UpdateCuyRequest,
};
pub use dashboard_service::DashboardService;
pub use expense_service::{CreateExpenseRequest, ExpenseService, UpdateExpenseRequest};
pub use feed_service::{
    ConsumeFeedRequest, CreateFeedRequest, FeedService, RestockFeedRequest, UpdateFeedRequest,
};
pub use health_service::{CreateHealthRecordRequest, HealthService, UpdateHealthRecordRequest};
pub use housing_service::{
    CreateCageRequest, CreateShedRequest, HousingService, UpdateCageRequest, UpdateShedRequest,
};
pub use notification_service::NotificationService;
pub use report_service::{GeneratedReport, GenerateReportRequest, ReportService, SignedUrl};
pub use reproduction_service::{
    BirthRegistration, CreateLitterRequest, CreatePregnancyRequest, LitterQuery,
    PregnancyQuery, RegisterBirthRequest, RegisterOffspringRequest, ReproductionService,
    UpdateLitterRequest, UpdatePregnancyRequest, WeanRequest,
};
pub use sales_service::{CreateSaleRequest, SaleItemRequest, SalesService, UpdateSaleRequest};

/// Calendar date used for every "today" rule
pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
