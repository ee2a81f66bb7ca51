//! Sales of animals and their effect on the herd

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use super::cuy_service::ensure_active;
use super::{today, CuyService, HousingService};
use crate::domain::cuy::{Cuy, CuyId, CuyStatus};
use crate::domain::housing::CageId;
use crate::domain::sales::{PaymentMethod, Sale, SaleId, SaleItem, SaleQuery, SalesStatistics};
use crate::domain::{DateRange, DomainError, Page, Pagination};
use crate::infrastructure::storage::Stores;

#[derive(Debug, Clone, Deserialize)]
pub struct SaleItemRequest {
    pub cuy_id: String,
    pub price: Decimal,
    #[serde(default)]
    pub weight_kg: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSaleRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub items: Vec<SaleItemRequest>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Items and totals are fixed once a sale is recorded
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSaleRequest {
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SalesService {
    stores: Stores,
    housing: Arc<HousingService>,
    cuyes: Arc<CuyService>,
}

impl SalesService {
    pub fn new(stores: Stores, housing: Arc<HousingService>, cuyes: Arc<CuyService>) -> Self {
        Self {
            stores,
            housing,
            cuyes,
        }
    }

    /// Record a sale and mark every sold animal as `sold`
    pub async fn create(&self, request: CreateSaleRequest) -> Result<Sale, DomainError> {
        let date = request.date.unwrap_or_else(today);
        if date > today() {
            return Err(DomainError::validation(format!(
                "Sale date {} is in the future",
                date
            )));
        }

        let mut items = Vec::with_capacity(request.items.len());
        for item in &request.items {
            if let Some(weight) = item.weight_kg {
                crate::domain::cuy::validate_weight(weight)?;
            }

            items.push(SaleItem {
                cuy_id: CuyId::parse(&item.cuy_id)?,
                price: item.price,
                weight_kg: item.weight_kg,
            });
        }

        let mut sale = Sale::new(date, request.customer_name, items, request.payment_method)?;
        sale.customer_phone = request.customer_phone;
        sale.notes = request.notes;

        // status changes of the sold animals must not interleave with another sale
        let _guard = self.housing.lock_placement().await;

        let mut sold: Vec<Cuy> = Vec::with_capacity(sale.items.len());
        for cuy_id in sale.cuy_ids() {
            let cuy = self.cuyes.get_referenced(cuy_id).await?;
            ensure_active(&cuy, "sold")?;
            sold.push(cuy);
        }

        let sale = self.stores.sales.create(sale).await?;

        for mut cuy in sold {
            cuy.set_status(CuyStatus::Sold, sale.date);
            self.stores.cuyes.update(cuy).await?;
        }

        info!(
            id = %sale.id,
            customer = %sale.customer_name,
            units = sale.items.len(),
            total = %sale.total,
            "Sale recorded"
        );
        Ok(sale)
    }

    pub async fn get(&self, id: &str) -> Result<Sale, DomainError> {
        let sale_id = SaleId::parse(id)?;
        self.stores
            .sales
            .get(&sale_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Sale '{}' not found", id)))
    }

    /// Matching sales, newest first
    pub async fn list(
        &self,
        query: &SaleQuery,
        pagination: Pagination,
    ) -> Result<Page<Sale>, DomainError> {
        let mut sales: Vec<Sale> = self
            .stores
            .sales
            .list()
            .await?
            .into_iter()
            .filter(|s| query.matches(s))
            .collect();

        sales.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(Page::from_sorted(sales, pagination))
    }

    pub async fn update(&self, id: &str, request: UpdateSaleRequest) -> Result<Sale, DomainError> {
        let mut sale = self.get(id).await?;

        if let Some(customer_name) = request.customer_name {
            let customer_name = customer_name.trim().to_string();
            if customer_name.is_empty() {
                return Err(DomainError::validation("Customer name cannot be empty"));
            }
            sale.customer_name = customer_name;
        }

        if request.customer_phone.is_some() {
            sale.customer_phone = request.customer_phone;
        }

        if let Some(payment_method) = request.payment_method {
            sale.payment_method = payment_method;
        }

        if request.notes.is_some() {
            sale.notes = request.notes;
        }

        sale.touch();
        info!(id = %sale.id, "Updating sale");
        self.stores.sales.update(sale).await
    }

    /// Cancel a completed sale and return its animals to the herd.
    ///
    /// Animals go back to the cage they were sold from. The cancel is
    /// rejected when a cage has since filled up; animals whose cage was
    /// deleted come back unhoused.
    pub async fn cancel(&self, id: &str) -> Result<Sale, DomainError> {
        let mut sale = self.get(id).await?;
        sale.cancel()?;

        let _guard = self.housing.lock_placement().await;

        let mut restored: Vec<Cuy> = Vec::with_capacity(sale.items.len());
        for cuy_id in sale.cuy_ids() {
            let Some(cuy) = self.stores.cuyes.get(cuy_id).await? else {
                warn!(sale_id = %sale.id, cuy_id = %cuy_id, "Sold cuy no longer exists");
                continue;
            };

            if cuy.status == CuyStatus::Sold {
                restored.push(cuy);
            }
        }

        let mut per_cage: HashMap<CageId, u32> = HashMap::new();
        for cuy in &restored {
            if let Some(cage_id) = &cuy.cage_id {
                *per_cage.entry(cage_id.clone()).or_default() += 1;
            }
        }

        let mut missing_cages = Vec::new();
        for (cage_id, count) in &per_cage {
            if self.housing.find_cage(cage_id).await?.is_none() {
                missing_cages.push(cage_id.clone());
                continue;
            }
            self.housing.ensure_capacity(cage_id, *count, None).await?;
        }

        for mut cuy in restored {
            if cuy
                .cage_id
                .as_ref()
                .is_some_and(|cage_id| missing_cages.contains(cage_id))
            {
                warn!(cuy_id = %cuy.id, "Cage of returned cuy was deleted; leaving it unhoused");
                cuy.cage_id = None;
            }

            cuy.set_status(CuyStatus::Active, sale.date);
            self.stores.cuyes.update(cuy).await?;
        }

        info!(id = %sale.id, "Sale cancelled");
        self.stores.sales.update(sale).await
    }

    /// Only cancelled sales can be deleted
    pub async fn delete(&self, id: &str) -> Result<(), DomainError> {
        let sale = self.get(id).await?;

        if sale.is_completed() {
            return Err(DomainError::conflict(format!(
                "Sale '{}' is completed; cancel it before deleting",
                sale.id
            )));
        }

        info!(id = %sale.id, "Deleting sale");
        self.stores.sales.delete(&sale.id).await?;
        Ok(())
    }

    pub async fn statistics(&self, range: DateRange) -> Result<SalesStatistics, DomainError> {
        let sales = self.stores.sales.list().await?;
        Ok(SalesStatistics::from_sales(
            sales.iter().filter(|s| range.contains(s.date)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cuy::Sex;
    use crate::domain::sales::SaleStatus;
    use crate::infrastructure::services::{CreateCageRequest, CreateShedRequest};
    use chrono::Duration;

    struct Fixture {
        service: SalesService,
        stores: Stores,
    }

    fn fixture() -> Fixture {
        let stores = Stores::in_memory();
        let housing = Arc::new(HousingService::new(stores.clone()));
        let cuyes = Arc::new(CuyService::new(stores.clone(), housing.clone()));

        Fixture {
            service: SalesService::new(stores.clone(), housing, cuyes),
            stores,
        }
    }

    async fn animal(stores: &Stores, code: &str) -> Cuy {
        let born = today() - Duration::days(100);
        let cuy = Cuy::new(code, Sex::Male, "Peru", born, today()).unwrap();
        stores.cuyes.create(cuy).await.unwrap()
    }

    fn item(cuy: &Cuy, price: i64) -> SaleItemRequest {
        SaleItemRequest {
            cuy_id: cuy.id.to_string(),
            price: Decimal::new(price, 0),
            weight_kg: Some(1.2),
        }
    }

    fn request(items: Vec<SaleItemRequest>) -> CreateSaleRequest {
        CreateSaleRequest {
            date: None,
            customer_name: "Rosa Quispe".to_string(),
            customer_phone: None,
            items,
            payment_method: PaymentMethod::Cash,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_sale_marks_cuyes_sold() {
        let f = fixture();
        let a = animal(&f.stores, "CU-01").await;
        let b = animal(&f.stores, "CU-02").await;

        let sale = f
            .service
            .create(request(vec![item(&a, 35), item(&b, 40)]))
            .await
            .unwrap();
        assert_eq!(sale.total, Decimal::new(75, 0));

        let a = f.stores.cuyes.get(&a.id).await.unwrap().unwrap();
        assert_eq!(a.status, CuyStatus::Sold);
        assert_eq!(a.status_date, Some(today()));
    }

    #[tokio::test]
    async fn test_sale_rejects_inactive_and_unknown_cuyes() {
        let f = fixture();
        let a = animal(&f.stores, "CU-01").await;
        f.service.create(request(vec![item(&a, 35)])).await.unwrap();

        let err = f.service.create(request(vec![item(&a, 35)])).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let ghost = SaleItemRequest {
            cuy_id: CuyId::generate().to_string(),
            price: Decimal::new(30, 0),
            weight_kg: None,
        };
        let err = f.service.create(request(vec![ghost])).await.unwrap_err();
        assert!(matches!(err, DomainError::Reference { .. }));
    }

    #[tokio::test]
    async fn test_failed_sale_leaves_cuyes_active() {
        let f = fixture();
        let a = animal(&f.stores, "CU-01").await;
        let b = animal(&f.stores, "CU-02").await;
        f.service.create(request(vec![item(&b, 20)])).await.unwrap();

        assert!(f
            .service
            .create(request(vec![item(&a, 35), item(&b, 40)]))
            .await
            .is_err());

        let a = f.stores.cuyes.get(&a.id).await.unwrap().unwrap();
        assert_eq!(a.status, CuyStatus::Active);
    }

    #[tokio::test]
    async fn test_duplicate_cuy_and_empty_sale_rejected() {
        let f = fixture();
        let a = animal(&f.stores, "CU-01").await;

        let err = f
            .service
            .create(request(vec![item(&a, 35), item(&a, 35)]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("more than once"));

        assert!(f.service.create(request(vec![])).await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_restores_cuyes_and_allows_delete() {
        let f = fixture();
        let a = animal(&f.stores, "CU-01").await;
        let sale = f.service.create(request(vec![item(&a, 35)])).await.unwrap();

        let err = f.service.delete(sale.id.as_str()).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));

        let cancelled = f.service.cancel(sale.id.as_str()).await.unwrap();
        assert_eq!(cancelled.status, SaleStatus::Cancelled);

        let a = f.stores.cuyes.get(&a.id).await.unwrap().unwrap();
        assert_eq!(a.status, CuyStatus::Active);
        assert_eq!(a.status_date, None);

        assert!(f.service.cancel(sale.id.as_str()).await.is_err());
        f.service.delete(sale.id.as_str()).await.unwrap();
    }

    async fn cage(f: &Fixture, capacity: u32) -> crate::domain::housing::Cage {
        let shed = f
            .service
            .housing
            .create_shed(CreateShedRequest {
                name: "Galpon A".to_string(),
                location: None,
                description: None,
            })
            .await
            .unwrap();

        f.service
            .housing
            .create_cage(CreateCageRequest {
                shed_id: shed.id.to_string(),
                code: "J-1".to_string(),
                capacity,
                kind: Default::default(),
                notes: None,
            })
            .await
            .unwrap()
    }

    async fn housed(f: &Fixture, code: &str, cage_id: &CageId) -> Cuy {
        let born = today() - Duration::days(100);
        let cuy = Cuy::new(code, Sex::Male, "Peru", born, today())
            .unwrap()
            .with_cage(cage_id.clone());
        f.stores.cuyes.create(cuy).await.unwrap()
    }

    #[tokio::test]
    async fn test_cancel_rejected_when_cage_refilled() {
        let f = fixture();
        let cage = cage(&f, 1).await;
        let first = housed(&f, "CU-01", &cage.id).await;
        let sale = f.service.create(request(vec![item(&first, 35)])).await.unwrap();

        // the freed place is taken by another animal
        housed(&f, "CU-02", &cage.id).await;

        let err = f.service.cancel(sale.id.as_str()).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let occupancy = f
            .service
            .housing
            .cage_occupancy(cage.id.as_str())
            .await
            .unwrap();
        assert_eq!(occupancy.occupied, 1);

        let first = f.stores.cuyes.get(&first.id).await.unwrap().unwrap();
        assert_eq!(first.status, CuyStatus::Sold);
        let sale = f.service.get(sale.id.as_str()).await.unwrap();
        assert_eq!(sale.status, SaleStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancel_returns_cuy_to_free_cage_or_unhoused() {
        let f = fixture();
        let cage = cage(&f, 1).await;
        let first = housed(&f, "CU-01", &cage.id).await;
        let sale = f.service.create(request(vec![item(&first, 35)])).await.unwrap();

        f.service.cancel(sale.id.as_str()).await.unwrap();
        let back = f.stores.cuyes.get(&first.id).await.unwrap().unwrap();
        assert_eq!(back.cage_id, Some(cage.id.clone()));

        // sell again, then remove the now empty cage before cancelling
        let sale = f.service.create(request(vec![item(&first, 35)])).await.unwrap();
        f.service
            .housing
            .delete_cage(cage.id.as_str())
            .await
            .unwrap();

        f.service.cancel(sale.id.as_str()).await.unwrap();
        let back = f.stores.cuyes.get(&first.id).await.unwrap().unwrap();
        assert_eq!(back.status, CuyStatus::Active);
        assert_eq!(back.cage_id, None);
    }

    #[tokio::test]
    async fn test_statistics_exclude_cancelled_and_out_of_range() {
        let f = fixture();
        let a = animal(&f.stores, "CU-01").await;
        let b = animal(&f.stores, "CU-02").await;
        let c = animal(&f.stores, "CU-03").await;

        f.service.create(request(vec![item(&a, 30)])).await.unwrap();
        let cancelled = f.service.create(request(vec![item(&b, 50)])).await.unwrap();
        f.service.cancel(cancelled.id.as_str()).await.unwrap();

        let mut old = request(vec![item(&c, 40)]);
        old.date = Some(today() - Duration::days(60));
        f.service.create(old).await.unwrap();

        let all = f.service.statistics(DateRange::unbounded()).await.unwrap();
        assert_eq!(all.sales, 2);
        assert_eq!(all.revenue, Decimal::new(70, 0));
        assert_eq!(all.average_price, Decimal::new(35, 0));

        let recent = DateRange::new(Some(today() - Duration::days(7)), None).unwrap();
        let recent = f.service.statistics(recent).await.unwrap();
        assert_eq!(recent.sales, 1);
        assert_eq!(recent.units_sold, 1);
    }

    #[tokio::test]
    async fn test_list_filters_by_customer() {
        let f = fixture();
        let a = animal(&f.stores, "CU-01").await;
        let b = animal(&f.stores, "CU-02").await;
        f.service.create(request(vec![item(&a, 30)])).await.unwrap();
        let mut other = request(vec![item(&b, 30)]);
        other.customer_name = "Mercado Central".to_string();
        f.service.create(other).await.unwrap();

        let query = SaleQuery {
            customer: Some("quispe".to_string()),
            ..Default::default()
        };
        let page = f.service.list(&query, Pagination::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].customer_name, "Rosa Quispe");
    }
}
