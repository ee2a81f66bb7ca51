//! Herd management: registration, placement, deaths and statistics

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{today, HousingService};
use crate::domain::cuy::{
    normalize_code, validate_weight, Cuy, CuyId, CuyQuery, CuyStatus, Origin, Sex, Stage,
};
use crate::domain::housing::CageId;
use crate::domain::reproduction::LitterId;
use crate::domain::{DomainError, Page, Pagination};
use crate::infrastructure::storage::Stores;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCuyRequest {
    pub code: String,
    pub sex: Sex,
    pub breed: String,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub stage: Option<Stage>,
    #[serde(default)]
    pub origin: Option<Origin>,
    #[serde(default)]
    pub cage_id: Option<String>,
    #[serde(default)]
    pub litter_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCuyRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub stage: Option<Stage>,
    #[serde(default)]
    pub cage_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordDeathRequest {
    pub date: NaiveDate,
    #[serde(default)]
    pub cause: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CuyStatistics {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub active_by_sex: BTreeMap<String, usize>,
    pub active_by_stage: BTreeMap<String, usize>,
}

impl CuyStatistics {
    pub fn from_cuyes<'a>(cuyes: impl IntoIterator<Item = &'a Cuy>) -> Self {
        let mut stats = Self::default();

        for status in CuyStatus::all() {
            stats.by_status.insert(status.as_str().to_string(), 0);
        }
        for stage in Stage::all() {
            stats.active_by_stage.insert(stage.as_str().to_string(), 0);
        }
        for sex in [Sex::Male, Sex::Female] {
            stats.active_by_sex.insert(sex.as_str().to_string(), 0);
        }

        for cuy in cuyes {
            stats.total += 1;
            *stats.by_status.entry(cuy.status.as_str().to_string()).or_default() += 1;

            if cuy.is_active() {
                *stats.active_by_sex.entry(cuy.sex.as_str().to_string()).or_default() += 1;
                *stats
                    .active_by_stage
                    .entry(cuy.stage.as_str().to_string())
                    .or_default() += 1;
            }
        }

        stats
    }

    pub fn active(&self) -> usize {
        self.by_status.get(CuyStatus::Active.as_str()).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct CuyService {
    stores: Stores,
    housing: Arc<HousingService>,
}

impl CuyService {
    pub fn new(stores: Stores, housing: Arc<HousingService>) -> Self {
        Self { stores, housing }
    }

    pub async fn create(&self, request: CreateCuyRequest) -> Result<Cuy, DomainError> {
        let mut cuy = Cuy::new(
            &request.code,
            request.sex,
            request.breed,
            request.birth_date,
            today(),
        )?;

        if let Some(weight) = request.weight_kg {
            cuy = cuy.with_weight(weight)?;
        }
        if let Some(stage) = request.stage {
            cuy = cuy.with_stage(stage);
        }
        cuy.origin = request.origin.unwrap_or_default();
        cuy.notes = request.notes;

        if let Some(litter_id) = request.litter_id {
            let litter_id = LitterId::parse(&litter_id)?;
            if !self.stores.litters.exists(&litter_id).await? {
                return Err(DomainError::reference(format!(
                    "Litter '{}' does not exist",
                    litter_id
                )));
            }
            cuy.litter_id = Some(litter_id);
        }

        self.ensure_unique_code(&cuy.code, None).await?;

        let _guard = self.housing.lock_placement().await;

        if let Some(cage_id) = request.cage_id {
            let cage_id = CageId::parse(&cage_id)?;
            self.housing.ensure_capacity(&cage_id, 1, None).await?;
            cuy = cuy.with_cage(cage_id);
        }

        info!(id = %cuy.id, code = %cuy.code, "Registering cuy");
        self.stores.cuyes.create(cuy).await
    }

    pub async fn get(&self, id: &str) -> Result<Cuy, DomainError> {
        let cuy_id = CuyId::parse(id)?;
        self.stores
            .cuyes
            .get(&cuy_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Cuy '{}' not found", id)))
    }

    /// Look up a cuy that another record points at
    pub async fn get_referenced(&self, id: &CuyId) -> Result<Cuy, DomainError> {
        self.stores
            .cuyes
            .get(id)
            .await?
            .ok_or_else(|| DomainError::reference(format!("Cuy '{}' does not exist", id)))
    }

    pub async fn list(
        &self,
        query: &CuyQuery,
        pagination: Pagination,
    ) -> Result<Page<Cuy>, DomainError> {
        let mut cuyes: Vec<Cuy> = self
            .stores
            .cuyes
            .list()
            .await?
            .into_iter()
            .filter(|c| query.matches(c))
            .collect();

        cuyes.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(Page::from_sorted(cuyes, pagination))
    }

    pub async fn update(&self, id: &str, request: UpdateCuyRequest) -> Result<Cuy, DomainError> {
        let _guard = self.housing.lock_placement().await;
        let mut cuy = self.get(id).await?;

        if let Some(code) = request.code {
            let code = normalize_code(&code)?;
            self.ensure_unique_code(&code, Some(&cuy.id)).await?;
            cuy.code = code;
        }

        if let Some(sex) = request.sex {
            cuy.sex = sex;
        }

        if let Some(breed) = request.breed {
            let breed = breed.trim().to_string();
            if breed.is_empty() {
                return Err(DomainError::validation("Breed cannot be empty"));
            }
            cuy.breed = breed;
        }

        if let Some(birth_date) = request.birth_date {
            if birth_date > today() {
                return Err(DomainError::validation(format!(
                    "Birth date {} is in the future",
                    birth_date
                )));
            }
            cuy.birth_date = birth_date;
        }

        if let Some(weight) = request.weight_kg {
            validate_weight(weight)?;
            cuy.weight_kg = Some(weight);
        }

        if let Some(stage) = request.stage {
            cuy.stage = stage;
        }

        if let Some(cage_id) = request.cage_id {
            let cage_id = CageId::parse(&cage_id)?;

            if cuy.cage_id.as_ref() != Some(&cage_id) {
                if cuy.is_active() {
                    self.housing.ensure_capacity(&cage_id, 1, Some(&cuy.id)).await?;
                } else if self.housing.find_cage(&cage_id).await?.is_none() {
                    return Err(DomainError::reference(format!(
                        "Cage '{}' does not exist",
                        cage_id
                    )));
                }
                cuy.cage_id = Some(cage_id);
            }
        }

        if request.notes.is_some() {
            cuy.notes = request.notes;
        }

        cuy.touch();
        info!(id = %cuy.id, "Updating cuy");
        self.stores.cuyes.update(cuy).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), DomainError> {
        let cuy = self.get(id).await?;

        let sold = self
            .stores
            .sales
            .list()
            .await?
            .iter()
            .any(|s| s.cuy_ids().any(|c| *c == cuy.id));

        if sold {
            return Err(DomainError::conflict(format!(
                "Cuy '{}' is part of a sale and cannot be deleted",
                cuy.code
            )));
        }

        info!(id = %cuy.id, code = %cuy.code, "Deleting cuy");
        self.stores.cuyes.delete(&cuy.id).await?;
        Ok(())
    }

    pub async fn move_to_cage(&self, id: &str, cage_id: &str) -> Result<Cuy, DomainError> {
        let cage_id = CageId::parse(cage_id)?;
        let _guard = self.housing.lock_placement().await;
        let mut cuy = self.get(id).await?;

        ensure_active(&cuy, "moved")?;

        if cuy.cage_id.as_ref() == Some(&cage_id) {
            return Ok(cuy);
        }

        self.housing.ensure_capacity(&cage_id, 1, Some(&cuy.id)).await?;

        info!(id = %cuy.id, from = ?cuy.cage_id, to = %cage_id, "Moving cuy");
        cuy.cage_id = Some(cage_id);
        cuy.touch();
        self.stores.cuyes.update(cuy).await
    }

    pub async fn record_death(
        &self,
        id: &str,
        request: RecordDeathRequest,
    ) -> Result<Cuy, DomainError> {
        let mut cuy = self.get(id).await?;
        ensure_active(&cuy, "recorded as dead")?;

        if request.date < cuy.birth_date || request.date > today() {
            return Err(DomainError::validation(format!(
                "Death date {} must be between birth ({}) and today",
                request.date, cuy.birth_date
            )));
        }

        if let Some(cause) = request.cause.filter(|c| !c.trim().is_empty()) {
            cuy.notes = Some(match cuy.notes.take() {
                Some(notes) => format!("{}\nCausa de muerte: {}", notes, cause.trim()),
                None => format!("Causa de muerte: {}", cause.trim()),
            });
        }

        cuy.set_status(CuyStatus::Dead, request.date);
        info!(id = %cuy.id, code = %cuy.code, date = %request.date, "Recording death");
        self.stores.cuyes.update(cuy).await
    }

    pub async fn statistics(&self) -> Result<CuyStatistics, DomainError> {
        let cuyes = self.stores.cuyes.list().await?;
        Ok(CuyStatistics::from_cuyes(&cuyes))
    }

    async fn ensure_unique_code(
        &self,
        code: &str,
        except: Option<&CuyId>,
    ) -> Result<(), DomainError> {
        let taken = self
            .stores
            .cuyes
            .list()
            .await?
            .iter()
            .any(|c| c.code == code && Some(&c.id) != except);

        if taken {
            return Err(DomainError::conflict(format!(
                "Cuy code '{}' is already in use",
                code
            )));
        }

        Ok(())
    }
}

pub(crate) fn ensure_active(cuy: &Cuy, action: &str) -> Result<(), DomainError> {
    if !cuy.is_active() {
        return Err(DomainError::validation(format!(
            "Cuy '{}' is {} and cannot be {}",
            cuy.code, cuy.status, action
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::housing::{Cage, CageKind, Shed};
    use crate::domain::sales::{PaymentMethod, Sale, SaleItem};
    use rust_decimal::Decimal;

    struct Fixture {
        service: CuyService,
        stores: Stores,
        cage: Cage,
    }

    async fn fixture(capacity: u32) -> Fixture {
        let stores = Stores::in_memory();
        let shed = stores.sheds.create(Shed::new("A").unwrap()).await.unwrap();
        let cage = Cage::new(shed.id, "J-1", capacity, CageKind::Rearing).unwrap();
        let cage = stores.cages.create(cage).await.unwrap();
        let housing = Arc::new(HousingService::new(stores.clone()));

        Fixture {
            service: CuyService::new(stores.clone(), housing),
            stores,
            cage,
        }
    }

    fn request(code: &str, cage: Option<&Cage>) -> CreateCuyRequest {
        CreateCuyRequest {
            code: code.to_string(),
            sex: Sex::Female,
            breed: "Peru".to_string(),
            birth_date: today() - chrono::Duration::days(120),
            weight_kg: Some(1.1),
            stage: None,
            origin: None,
            cage_id: cage.map(|c| c.id.to_string()),
            litter_id: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_code() {
        let f = fixture(5).await;
        let cuy = f.service.create(request(" cu-01 ", Some(&f.cage))).await.unwrap();

        assert_eq!(cuy.code, "CU-01");
        assert_eq!(cuy.status, CuyStatus::Active);
        assert_eq!(cuy.cage_id, Some(f.cage.id.clone()));
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts() {
        let f = fixture(5).await;
        f.service.create(request("CU-01", None)).await.unwrap();

        let err = f.service.create(request("cu-01", None)).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_future_birth_date_rejected() {
        let f = fixture(5).await;
        let mut req = request("CU-01", None);
        req.birth_date = today() + chrono::Duration::days(1);

        let err = f.service.create(req).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_full_cage_rejects_new_cuy() {
        let f = fixture(1).await;
        f.service.create(request("CU-01", Some(&f.cage))).await.unwrap();

        let err = f
            .service
            .create(request("CU-02", Some(&f.cage)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("is full"));
    }

    #[tokio::test]
    async fn test_unknown_cage_is_reference_error() {
        let f = fixture(1).await;
        let mut req = request("CU-01", None);
        req.cage_id = Some(CageId::generate().to_string());

        let err = f.service.create(req).await.unwrap_err();
        assert!(matches!(err, DomainError::Reference { .. }));
    }

    #[tokio::test]
    async fn test_death_frees_cage_slot() {
        let f = fixture(1).await;
        let first = f.service.create(request("CU-01", Some(&f.cage))).await.unwrap();

        let dead = f
            .service
            .record_death(
                first.id.as_str(),
                RecordDeathRequest {
                    date: today(),
                    cause: Some("neumonia".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(dead.status, CuyStatus::Dead);
        assert_eq!(dead.status_date, Some(today()));
        assert!(dead.notes.unwrap().contains("neumonia"));

        f.service.create(request("CU-02", Some(&f.cage))).await.unwrap();

        let err = f
            .service
            .move_to_cage(first.id.as_str(), f.cage.id.as_str())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_move_to_cage_checks_capacity() {
        let f = fixture(1).await;
        let other = Cage::new(f.cage.shed_id.clone(), "J-2", 1, CageKind::Rearing).unwrap();
        let other = f.stores.cages.create(other).await.unwrap();

        let a = f.service.create(request("CU-01", Some(&f.cage))).await.unwrap();
        f.service.create(request("CU-02", Some(&other))).await.unwrap();

        let err = f
            .service
            .move_to_cage(a.id.as_str(), other.id.as_str())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        // moving into its own cage is a no-op
        let same = f
            .service
            .move_to_cage(a.id.as_str(), f.cage.id.as_str())
            .await
            .unwrap();
        assert_eq!(same.cage_id, Some(f.cage.id.clone()));
    }

    #[tokio::test]
    async fn test_delete_sold_cuy_conflicts() {
        let f = fixture(5).await;
        let cuy = f.service.create(request("CU-01", None)).await.unwrap();

        let sale = Sale::new(
            today(),
            "Mercado",
            vec![SaleItem {
                cuy_id: cuy.id.clone(),
                price: Decimal::new(35, 0),
                weight_kg: None,
            }],
            PaymentMethod::Cash,
        )
        .unwrap();
        f.stores.sales.create(sale).await.unwrap();

        let err = f.service.delete(cuy.id.as_str()).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let f = fixture(5).await;
        f.service.create(request("CU-03", None)).await.unwrap();
        f.service.create(request("CU-01", Some(&f.cage))).await.unwrap();
        let mut male = request("CU-02", None);
        male.sex = Sex::Male;
        f.service.create(male).await.unwrap();

        let page = f
            .service
            .list(&CuyQuery::new(), Pagination::default())
            .await
            .unwrap();
        let codes: Vec<_> = page.items.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["CU-01", "CU-02", "CU-03"]);

        let query = CuyQuery {
            sex: Some(Sex::Female),
            ..Default::default()
        };
        let page = f.service.list(&query, Pagination::new(Some(1), None)).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn test_statistics() {
        let f = fixture(5).await;
        let a = f.service.create(request("CU-01", None)).await.unwrap();
        f.service.create(request("CU-02", None)).await.unwrap();
        f.service
            .record_death(
                a.id.as_str(),
                RecordDeathRequest {
                    date: today(),
                    cause: None,
                },
            )
            .await
            .unwrap();

        let stats = f.service.statistics().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active(), 1);
        assert_eq!(stats.by_status["dead"], 1);
        assert_eq!(stats.active_by_sex["female"], 1);
        assert_eq!(stats.active_by_sex["male"], 0);
        assert_eq!(stats.active_by_stage["growing"], 1);
    }
}
