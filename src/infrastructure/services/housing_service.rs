//! Sheds, cages and the shared cage capacity check

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::domain::cuy::CuyId;
use crate::domain::housing::{
    validate_cage_code, validate_capacity, validate_shed_name, Cage, CageId, CageKind,
    CageOccupancy, Shed, ShedId,
};
use crate::domain::{DomainError, Page, Pagination};
use crate::infrastructure::storage::Stores;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateShedRequest {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateShedRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCageRequest {
    pub shed_id: String,
    pub code: String,
    pub capacity: u32,
    #[serde(default)]
    pub kind: CageKind,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCageRequest {
    #[serde(default)]
    pub shed_id: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub kind: Option<CageKind>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Manages housing units and guards placements into cages
#[derive(Debug, Clone)]
pub struct HousingService {
    stores: Stores,
    placement: Arc<Mutex<()>>,
}

impl HousingService {
    pub fn new(stores: Stores) -> Self {
        Self {
            stores,
            placement: Arc::new(Mutex::new(())),
        }
    }

    /// Serialize operations that check capacity and then place animals
    pub async fn lock_placement(&self) -> MutexGuard<'_, ()> {
        self.placement.lock().await
    }

    pub async fn create_shed(&self, request: CreateShedRequest) -> Result<Shed, DomainError> {
        let mut shed = Shed::new(request.name)?;
        shed.location = request.location;
        shed.description = request.description;

        self.ensure_unique_shed_name(&shed.name, None).await?;

        info!(id = %shed.id, name = %shed.name, "Creating shed");
        self.stores.sheds.create(shed).await
    }

    pub async fn get_shed(&self, id: &str) -> Result<Shed, DomainError> {
        let shed_id = ShedId::parse(id)?;
        self.stores
            .sheds
            .get(&shed_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Shed '{}' not found", id)))
    }

    pub async fn list_sheds(&self, pagination: Pagination) -> Result<Page<Shed>, DomainError> {
        let mut sheds = self.stores.sheds.list().await?;
        sheds.sort_by_key(|s| s.name.to_lowercase());
        Ok(Page::from_sorted(sheds, pagination))
    }

    pub async fn update_shed(
        &self,
        id: &str,
        request: UpdateShedRequest,
    ) -> Result<Shed, DomainError> {
        let mut shed = self.get_shed(id).await?;

        if let Some(name) = request.name {
            let name = name.trim().to_string();
            validate_shed_name(&name)?;
            self.ensure_unique_shed_name(&name, Some(&shed.id)).await?;
            shed.name = name;
        }

        if request.location.is_some() {
            shed.location = request.location;
        }

        if request.description.is_some() {
            shed.description = request.description;
        }

        shed.touch();
        info!(id = %shed.id, "Updating shed");
        self.stores.sheds.update(shed).await
    }

    pub async fn delete_shed(&self, id: &str) -> Result<(), DomainError> {
        let shed = self.get_shed(id).await?;

        let cages = self
            .stores
            .cages
            .list()
            .await?
            .into_iter()
            .filter(|c| c.shed_id == shed.id)
            .count();

        if cages > 0 {
            return Err(DomainError::conflict(format!(
                "Shed '{}' still has {} cage(s)",
                shed.name, cages
            )));
        }

        info!(id = %shed.id, "Deleting shed");
        self.stores.sheds.delete(&shed.id).await?;
        Ok(())
    }

    pub async fn create_cage(&self, request: CreateCageRequest) -> Result<Cage, DomainError> {
        let shed_id = ShedId::parse(&request.shed_id)?;
        self.ensure_shed_exists(&shed_id).await?;

        let mut cage = Cage::new(shed_id, request.code, request.capacity, request.kind)?;
        cage.notes = request.notes;

        self.ensure_unique_cage_code(&cage.shed_id, &cage.code, None)
            .await?;

        info!(id = %cage.id, code = %cage.code, shed_id = %cage.shed_id, "Creating cage");
        self.stores.cages.create(cage).await
    }

    pub async fn get_cage(&self, id: &str) -> Result<Cage, DomainError> {
        let cage_id = CageId::parse(id)?;
        self.find_cage(&cage_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Cage '{}' not found", id)))
    }

    pub async fn find_cage(&self, id: &CageId) -> Result<Option<Cage>, DomainError> {
        self.stores.cages.get(id).await
    }

    pub async fn list_cages(
        &self,
        shed_id: Option<&str>,
        pagination: Pagination,
    ) -> Result<Page<Cage>, DomainError> {
        let shed_id = shed_id.map(ShedId::parse).transpose()?;

        let mut cages: Vec<Cage> = self
            .stores
            .cages
            .list()
            .await?
            .into_iter()
            .filter(|c| shed_id.as_ref().is_none_or(|id| *id == c.shed_id))
            .collect();

        cages.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(Page::from_sorted(cages, pagination))
    }

    pub async fn update_cage(
        &self,
        id: &str,
        request: UpdateCageRequest,
    ) -> Result<Cage, DomainError> {
        let _guard = self.lock_placement().await;
        let mut cage = self.get_cage(id).await?;

        if let Some(shed_id) = request.shed_id {
            let shed_id = ShedId::parse(&shed_id)?;
            self.ensure_shed_exists(&shed_id).await?;
            cage.shed_id = shed_id;
        }

        if let Some(code) = request.code {
            let code = code.trim().to_uppercase();
            validate_cage_code(&code)?;
            cage.code = code;
        }

        self.ensure_unique_cage_code(&cage.shed_id, &cage.code, Some(&cage.id))
            .await?;

        if let Some(capacity) = request.capacity {
            validate_capacity(capacity)?;
            let occupied = self.occupied(&cage.id, None).await?;

            if capacity < occupied {
                return Err(DomainError::validation(format!(
                    "Cage '{}' holds {} cuyes; capacity cannot drop to {}",
                    cage.code, occupied, capacity
                )));
            }

            cage.capacity = capacity;
        }

        if let Some(kind) = request.kind {
            cage.kind = kind;
        }

        if request.notes.is_some() {
            cage.notes = request.notes;
        }

        cage.touch();
        info!(id = %cage.id, "Updating cage");
        self.stores.cages.update(cage).await
    }

    pub async fn delete_cage(&self, id: &str) -> Result<(), DomainError> {
        let _guard = self.lock_placement().await;
        let cage = self.get_cage(id).await?;
        let occupied = self.occupied(&cage.id, None).await?;

        if occupied > 0 {
            return Err(DomainError::conflict(format!(
                "Cage '{}' still holds {} active cuyes",
                cage.code, occupied
            )));
        }

        info!(id = %cage.id, "Deleting cage");
        self.stores.cages.delete(&cage.id).await?;
        Ok(())
    }

    pub async fn cage_occupancy(&self, id: &str) -> Result<CageOccupancy, DomainError> {
        let cage = self.get_cage(id).await?;
        let occupied = self.occupied(&cage.id, None).await?;
        Ok(CageOccupancy::new(cage.capacity, occupied))
    }

    /// Occupancy of every cage, computed from a single scan of the herd
    pub async fn all_occupancies(&self) -> Result<Vec<(Cage, CageOccupancy)>, DomainError> {
        let cuyes = self.stores.cuyes.list().await?;
        let cages = self.stores.cages.list().await?;

        Ok(cages
            .into_iter()
            .map(|cage| {
                let occupied = cuyes
                    .iter()
                    .filter(|c| c.is_active() && c.cage_id.as_ref() == Some(&cage.id))
                    .count() as u32;
                let occupancy = CageOccupancy::new(cage.capacity, occupied);
                (cage, occupancy)
            })
            .collect())
    }

    /// Require that `count` more cuyes fit in the cage.
    ///
    /// `moving` is left out of the count so re-saving an animal already in
    /// the cage does not count it twice. A missing cage is a reference error.
    pub async fn ensure_capacity(
        &self,
        cage_id: &CageId,
        count: u32,
        moving: Option<&CuyId>,
    ) -> Result<Cage, DomainError> {
        let cage = self.find_cage(cage_id).await?.ok_or_else(|| {
            DomainError::reference(format!("Cage '{}' does not exist", cage_id))
        })?;

        let occupied = self.occupied(cage_id, moving).await?;
        let occupancy = CageOccupancy::new(cage.capacity, occupied);

        if !occupancy.can_fit(count) {
            return Err(DomainError::validation(format!(
                "Cage '{}' is full: {} of {} places taken, {} requested",
                cage.code, occupancy.occupied, occupancy.capacity, count
            )));
        }

        Ok(cage)
    }

    async fn occupied(
        &self,
        cage_id: &CageId,
        exclude: Option<&CuyId>,
    ) -> Result<u32, DomainError> {
        let count = self
            .stores
            .cuyes
            .list()
            .await?
            .iter()
            .filter(|c| c.is_active())
            .filter(|c| c.cage_id.as_ref() == Some(cage_id))
            .filter(|c| exclude.is_none_or(|id| *id != c.id))
            .count();

        Ok(count as u32)
    }

    async fn ensure_shed_exists(&self, shed_id: &ShedId) -> Result<(), DomainError> {
        if !self.stores.sheds.exists(shed_id).await? {
            return Err(DomainError::reference(format!(
                "Shed '{}' does not exist",
                shed_id
            )));
        }

        Ok(())
    }

    async fn ensure_unique_shed_name(
        &self,
        name: &str,
        except: Option<&ShedId>,
    ) -> Result<(), DomainError> {
        let taken = self
            .stores
            .sheds
            .list()
            .await?
            .iter()
            .any(|s| s.name.to_lowercase() == name.to_lowercase() && Some(&s.id) != except);

        if taken {
            return Err(DomainError::conflict(format!(
                "A shed named '{}' already exists",
                name
            )));
        }

        Ok(())
    }

    async fn ensure_unique_cage_code(
        &self,
        shed_id: &ShedId,
        code: &str,
        except: Option<&CageId>,
    ) -> Result<(), DomainError> {
        let taken = self
            .stores
            .cages
            .list()
            .await?
            .iter()
            .any(|c| c.shed_id == *shed_id && c.code == code && Some(&c.id) != except);

        if taken {
            return Err(DomainError::conflict(format!(
                "Cage code '{}' is already used in this shed",
                code
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cuy::{Cuy, Sex};
    use chrono::NaiveDate;

    fn service() -> HousingService {
        HousingService::new(Stores::in_memory())
    }

    fn shed_request(name: &str) -> CreateShedRequest {
        CreateShedRequest {
            name: name.to_string(),
            location: None,
            description: None,
        }
    }

    fn cage_request(shed: &Shed, code: &str, capacity: u32) -> CreateCageRequest {
        CreateCageRequest {
            shed_id: shed.id.to_string(),
            code: code.to_string(),
            capacity,
            kind: CageKind::Rearing,
            notes: None,
        }
    }

    async fn house(service: &HousingService, cage: &Cage, code: &str) -> Cuy {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let cuy = Cuy::new(code, Sex::Female, "Peru", date, date)
            .unwrap()
            .with_cage(cage.id.clone());
        service.stores.cuyes.create(cuy).await.unwrap()
    }

    #[tokio::test]
    async fn test_shed_names_are_unique_ignoring_case() {
        let service = service();
        service.create_shed(shed_request("Galpon A")).await.unwrap();

        let err = service.create_shed(shed_request("galpon a")).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_rename_to_own_name_is_allowed() {
        let service = service();
        let shed = service.create_shed(shed_request("Norte")).await.unwrap();

        let request = UpdateShedRequest {
            name: Some("NORTE".to_string()),
            ..Default::default()
        };
        let updated = service.update_shed(shed.id.as_str(), request).await.unwrap();
        assert_eq!(updated.name, "NORTE");
    }

    #[tokio::test]
    async fn test_cage_requires_existing_shed() {
        let service = service();
        let request = CreateCageRequest {
            shed_id: ShedId::generate().to_string(),
            code: "J-1".to_string(),
            capacity: 5,
            kind: CageKind::Breeding,
            notes: None,
        };

        let err = service.create_cage(request).await.unwrap_err();
        assert!(matches!(err, DomainError::Reference { .. }));
    }

    #[tokio::test]
    async fn test_cage_code_unique_per_shed() {
        let service = service();
        let a = service.create_shed(shed_request("A")).await.unwrap();
        let b = service.create_shed(shed_request("B")).await.unwrap();

        service.create_cage(cage_request(&a, "j-1", 5)).await.unwrap();
        service.create_cage(cage_request(&b, "J-1", 5)).await.unwrap();

        let err = service.create_cage(cage_request(&a, "J-1", 3)).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_delete_shed_with_cages_conflicts() {
        let service = service();
        let shed = service.create_shed(shed_request("A")).await.unwrap();
        service.create_cage(cage_request(&shed, "J-1", 5)).await.unwrap();

        let err = service.delete_shed(shed.id.as_str()).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_delete_missing_shed_is_not_found() {
        let service = service();
        let err = service
            .delete_shed(ShedId::generate().as_str())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_occupancy_counts_active_cuyes_only() {
        let service = service();
        let shed = service.create_shed(shed_request("A")).await.unwrap();
        let cage = service.create_cage(cage_request(&shed, "J-1", 4)).await.unwrap();

        house(&service, &cage, "CU-01").await;
        let mut dead = house(&service, &cage, "CU-02").await;
        dead.set_status(
            crate::domain::cuy::CuyStatus::Dead,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        );
        service.stores.cuyes.update(dead).await.unwrap();

        let occupancy = service.cage_occupancy(cage.id.as_str()).await.unwrap();
        assert_eq!(occupancy.occupied, 1);
        assert_eq!(occupancy.available, 3);
        assert_eq!(occupancy.ratio, 0.25);
    }

    #[tokio::test]
    async fn test_ensure_capacity() {
        let service = service();
        let shed = service.create_shed(shed_request("A")).await.unwrap();
        let cage = service.create_cage(cage_request(&shed, "J-1", 2)).await.unwrap();
        let first = house(&service, &cage, "CU-01").await;

        assert!(service.ensure_capacity(&cage.id, 1, None).await.is_ok());
        let err = service.ensure_capacity(&cage.id, 2, None).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        // the animal being re-placed does not count against itself
        assert!(service
            .ensure_capacity(&cage.id, 2, Some(&first.id))
            .await
            .is_ok());

        let err = service
            .ensure_capacity(&CageId::generate(), 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Reference { .. }));
    }

    #[tokio::test]
    async fn test_capacity_cannot_drop_below_occupancy() {
        let service = service();
        let shed = service.create_shed(shed_request("A")).await.unwrap();
        let cage = service.create_cage(cage_request(&shed, "J-1", 3)).await.unwrap();
        house(&service, &cage, "CU-01").await;
        house(&service, &cage, "CU-02").await;

        let request = UpdateCageRequest {
            capacity: Some(1),
            ..Default::default()
        };
        let err = service
            .update_cage(cage.id.as_str(), request)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let err = service.delete_cage(cage.id.as_str()).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }
}
