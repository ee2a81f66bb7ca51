//! Feed inventory: stock levels and movements

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::today;
use crate::domain::feed::{
    validate_cost, validate_non_negative, FeedId, FeedItem, FeedKind, FeedMovement, MovementKind,
};
use crate::domain::{DomainError, Page, Pagination};
use crate::infrastructure::storage::Stores;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFeedRequest {
    pub name: String,
    pub kind: FeedKind,
    #[serde(default)]
    pub stock_kg: f64,
    #[serde(default)]
    pub min_stock_kg: f64,
    #[serde(default)]
    pub unit_cost: Decimal,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Stock is only changed through restock/consume
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFeedRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: Option<FeedKind>,
    #[serde(default)]
    pub min_stock_kg: Option<f64>,
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestockFeedRequest {
    pub quantity_kg: f64,
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsumeFeedRequest {
    pub quantity_kg: f64,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FeedService {
    stores: Stores,
    /// Held from reading stock until its movement is written
    stock: Arc<Mutex<()>>,
}

impl FeedService {
    pub fn new(stores: Stores) -> Self {
        Self {
            stores,
            stock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn create(&self, request: CreateFeedRequest) -> Result<FeedItem, DomainError> {
        let mut feed = FeedItem::new(
            request.name,
            request.kind,
            request.stock_kg,
            request.min_stock_kg,
            request.unit_cost,
        )?;
        feed.supplier = request.supplier;
        feed.notes = request.notes;

        self.ensure_unique_name(&feed.name, None).await?;

        info!(id = %feed.id, name = %feed.name, "Creating feed item");
        self.stores.feeds.create(feed).await
    }

    pub async fn get(&self, id: &str) -> Result<FeedItem, DomainError> {
        let feed_id = FeedId::parse(id)?;
        self.stores
            .feeds
            .get(&feed_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Feed item '{}' not found", id)))
    }

    pub async fn list(&self, pagination: Pagination) -> Result<Page<FeedItem>, DomainError> {
        let mut feeds = self.stores.feeds.list().await?;
        feeds.sort_by_key(|f| f.name.to_lowercase());
        Ok(Page::from_sorted(feeds, pagination))
    }

    pub async fn update(
        &self,
        id: &str,
        request: UpdateFeedRequest,
    ) -> Result<FeedItem, DomainError> {
        let mut feed = self.get(id).await?;

        if let Some(name) = request.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::validation("Feed name cannot be empty"));
            }
            self.ensure_unique_name(&name, Some(&feed.id)).await?;
            feed.name = name;
        }

        if let Some(kind) = request.kind {
            feed.kind = kind;
        }

        if let Some(min_stock_kg) = request.min_stock_kg {
            validate_non_negative("min_stock_kg", min_stock_kg)?;
            feed.min_stock_kg = min_stock_kg;
        }

        if let Some(unit_cost) = request.unit_cost {
            validate_cost(unit_cost)?;
            feed.unit_cost = unit_cost;
        }

        if request.supplier.is_some() {
            feed.supplier = request.supplier;
        }

        if request.notes.is_some() {
            feed.notes = request.notes;
        }

        feed.touch();
        info!(id = %feed.id, "Updating feed item");
        self.stores.feeds.update(feed).await
    }

    /// Delete an item together with its movement history
    pub async fn delete(&self, id: &str) -> Result<(), DomainError> {
        let _guard = self.stock.lock().await;
        let feed = self.get(id).await?;

        let movements = self.movements_of(&feed.id).await?;
        for movement in &movements {
            self.stores.feed_movements.delete(&movement.id).await?;
        }

        info!(id = %feed.id, movements = movements.len(), "Deleting feed item");
        self.stores.feeds.delete(&feed.id).await?;
        Ok(())
    }

    pub async fn restock(
        &self,
        id: &str,
        request: RestockFeedRequest,
    ) -> Result<FeedItem, DomainError> {
        let _guard = self.stock.lock().await;
        let mut feed = self.get(id).await?;
        feed.restock(request.quantity_kg)?;

        if let Some(unit_cost) = request.unit_cost {
            validate_cost(unit_cost)?;
            feed.unit_cost = unit_cost;
        }

        let mut movement = FeedMovement::new(
            feed.id.clone(),
            MovementKind::In,
            request.quantity_kg,
            request.date.unwrap_or_else(today),
        );
        movement.unit_cost = request.unit_cost;
        movement.notes = request.notes;

        let feed = self.stores.feeds.update(feed).await?;
        self.stores.feed_movements.create(movement).await?;

        info!(
            id = %feed.id,
            quantity_kg = request.quantity_kg,
            stock_kg = feed.stock_kg,
            "Feed restocked"
        );
        Ok(feed)
    }

    pub async fn consume(
        &self,
        id: &str,
        request: ConsumeFeedRequest,
    ) -> Result<FeedItem, DomainError> {
        let _guard = self.stock.lock().await;
        let mut feed = self.get(id).await?;
        feed.consume(request.quantity_kg)?;

        let mut movement = FeedMovement::new(
            feed.id.clone(),
            MovementKind::Out,
            request.quantity_kg,
            request.date.unwrap_or_else(today),
        );
        movement.notes = request.notes;

        let feed = self.stores.feeds.update(feed).await?;
        self.stores.feed_movements.create(movement).await?;

        if feed.is_low_stock() {
            warn!(
                id = %feed.id,
                name = %feed.name,
                stock_kg = feed.stock_kg,
                min_stock_kg = feed.min_stock_kg,
                "Feed stock is low"
            );
        }

        Ok(feed)
    }

    /// Movements of one item, newest first
    pub async fn movements(
        &self,
        id: &str,
        pagination: Pagination,
    ) -> Result<Page<FeedMovement>, DomainError> {
        let feed = self.get(id).await?;
        let mut movements = self.movements_of(&feed.id).await?;
        movements.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(Page::from_sorted(movements, pagination))
    }

    pub async fn low_stock(&self) -> Result<Vec<FeedItem>, DomainError> {
        let mut feeds: Vec<FeedItem> = self
            .stores
            .feeds
            .list()
            .await?
            .into_iter()
            .filter(FeedItem::is_low_stock)
            .collect();

        feeds.sort_by(|a, b| a.stock_kg.total_cmp(&b.stock_kg));
        Ok(feeds)
    }

    async fn movements_of(&self, feed_id: &FeedId) -> Result<Vec<FeedMovement>, DomainError> {
        Ok(self
            .stores
            .feed_movements
            .list()
            .await?
            .into_iter()
            .filter(|m| m.feed_id == *feed_id)
            .collect())
    }

    async fn ensure_unique_name(
        &self,
        name: &str,
        except: Option<&FeedId>,
    ) -> Result<(), DomainError> {
        let taken = self.stores.feeds.list().await?.iter().any(|f| {
            f.name.eq_ignore_ascii_case(name) && except.is_none_or(|id| *id != f.id)
        });

        if taken {
            return Err(DomainError::conflict(format!(
                "Feed item '{}' already exists",
                name
            )));
        }

        Ok(())
    }
}
