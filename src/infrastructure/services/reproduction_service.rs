//! Pregnancies (preñez) and litters (camadas)

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::cuy_service::ensure_active;
use super::{today, CuyService, HousingService};
use crate::domain::cuy::{normalize_code, Cuy, CuyId, Origin, Sex, Stage};
use crate::domain::housing::CageId;
use crate::domain::reproduction::{
    GestationPolicy, Litter, LitterId, LitterStatistics, Pregnancy, PregnancyId, PregnancyStatus,
};
use crate::domain::{DateRange, DomainError, Page, Pagination};
use crate::infrastructure::storage::Stores;

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePregnancyRequest {
    pub female_id: String,
    #[serde(default)]
    pub male_id: Option<String>,
    pub mating_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePregnancyRequest {
    #[serde(default)]
    pub male_id: Option<String>,
    #[serde(default)]
    pub mating_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterBirthRequest {
    pub birth_date: NaiveDate,
    pub born_alive: u32,
    #[serde(default)]
    pub born_dead: u32,
    #[serde(default)]
    pub cage_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BirthRegistration {
    pub pregnancy: Pregnancy,
    pub litter: Litter,
}

#[derive(Debug, Clone, Default)]
pub struct PregnancyQuery {
    pub status: Option<PregnancyStatus>,
    pub female_id: Option<CuyId>,
}

impl PregnancyQuery {
    fn matches(&self, pregnancy: &Pregnancy) -> bool {
        self.status.is_none_or(|s| s == pregnancy.status)
            && self
                .female_id
                .as_ref()
                .is_none_or(|id| *id == pregnancy.female_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLitterRequest {
    pub mother_id: String,
    #[serde(default)]
    pub father_id: Option<String>,
    pub birth_date: NaiveDate,
    pub born_alive: u32,
    #[serde(default)]
    pub born_dead: u32,
    #[serde(default)]
    pub cage_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLitterRequest {
    #[serde(default)]
    pub father_id: Option<String>,
    #[serde(default)]
    pub born_alive: Option<u32>,
    #[serde(default)]
    pub born_dead: Option<u32>,
    #[serde(default)]
    pub cage_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeanRequest {
    pub weaning_date: NaiveDate,
    pub weaned_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterOffspringRequest {
    #[serde(default)]
    pub males: u32,
    #[serde(default)]
    pub females: u32,
    pub cage_id: String,
    #[serde(default)]
    pub breed: Option<String>,
    pub code_prefix: String,
}

#[derive(Debug, Clone, Default)]
pub struct LitterQuery {
    pub mother_id: Option<CuyId>,
    pub range: DateRange,
}

impl LitterQuery {
    fn matches(&self, litter: &Litter) -> bool {
        self.mother_id
            .as_ref()
            .is_none_or(|id| *id == litter.mother_id)
            && self.range.contains(litter.birth_date)
    }
}

#[derive(Debug, Clone)]
pub struct ReproductionService {
    stores: Stores,
    housing: Arc<HousingService>,
    cuyes: Arc<CuyService>,
    policy: GestationPolicy,
}

impl ReproductionService {
    pub fn new(
        stores: Stores,
        housing: Arc<HousingService>,
        cuyes: Arc<CuyService>,
        policy: GestationPolicy,
    ) -> Self {
        Self {
            stores,
            housing,
            cuyes,
            policy,
        }
    }

    pub fn policy(&self) -> &GestationPolicy {
        &self.policy
    }

    // Pregnancies

    pub async fn create_pregnancy(
        &self,
        request: CreatePregnancyRequest,
    ) -> Result<Pregnancy, DomainError> {
        let today = today();
        let female = self.breeding_female(&request.female_id, today).await?;
        let male_id = match request.male_id {
            Some(ref id) => Some(self.breeding_male(id).await?.id),
            None => None,
        };

        if request.mating_date > today {
            return Err(DomainError::validation(format!(
                "Mating date {} is in the future",
                request.mating_date
            )));
        }

        if request.mating_date < female.birth_date {
            return Err(DomainError::validation(
                "Mating date cannot precede the female's birth",
            ));
        }

        let already_pregnant = self
            .stores
            .pregnancies
            .list()
            .await?
            .iter()
            .any(|p| p.is_active() && p.female_id == female.id);

        if already_pregnant {
            return Err(DomainError::conflict(format!(
                "Cuy '{}' already has an active pregnancy",
                female.code
            )));
        }

        let mut pregnancy = Pregnancy::new(female.id, male_id, request.mating_date, &self.policy);
        pregnancy.notes = request.notes;

        info!(
            id = %pregnancy.id,
            female = %female.code,
            expected = %pregnancy.expected_birth_date,
            "Registering pregnancy"
        );
        self.stores.pregnancies.create(pregnancy).await
    }

    pub async fn get_pregnancy(&self, id: &str) -> Result<Pregnancy, DomainError> {
        let pregnancy_id = PregnancyId::parse(id)?;
        self.stores
            .pregnancies
            .get(&pregnancy_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Pregnancy '{}' not found", id)))
    }

    pub async fn list_pregnancies(
        &self,
        query: &PregnancyQuery,
        pagination: Pagination,
    ) -> Result<Page<Pregnancy>, DomainError> {
        let mut pregnancies: Vec<Pregnancy> = self
            .stores
            .pregnancies
            .list()
            .await?
            .into_iter()
            .filter(|p| query.matches(p))
            .collect();

        pregnancies.sort_by(|a, b| b.mating_date.cmp(&a.mating_date));
        Ok(Page::from_sorted(pregnancies, pagination))
    }

    pub async fn update_pregnancy(
        &self,
        id: &str,
        request: UpdatePregnancyRequest,
    ) -> Result<Pregnancy, DomainError> {
        let mut pregnancy = self.get_pregnancy(id).await?;
        pregnancy.ensure_active()?;

        if let Some(ref male_id) = request.male_id {
            pregnancy.male_id = Some(self.breeding_male(male_id).await?.id);
        }

        if let Some(mating_date) = request.mating_date {
            if mating_date > today() {
                return Err(DomainError::validation(format!(
                    "Mating date {} is in the future",
                    mating_date
                )));
            }
            pregnancy.reschedule(mating_date, &self.policy);
        }

        if request.notes.is_some() {
            pregnancy.notes = request.notes;
        }

        pregnancy.touch();
        info!(id = %pregnancy.id, "Updating pregnancy");
        self.stores.pregnancies.update(pregnancy).await
    }

    pub async fn delete_pregnancy(&self, id: &str) -> Result<(), DomainError> {
        let pregnancy = self.get_pregnancy(id).await?;

        if pregnancy.status == PregnancyStatus::Delivered {
            return Err(DomainError::conflict(format!(
                "Pregnancy '{}' has a registered birth and cannot be deleted",
                pregnancy.id
            )));
        }

        info!(id = %pregnancy.id, "Deleting pregnancy");
        self.stores.pregnancies.delete(&pregnancy.id).await?;
        Ok(())
    }

    pub async fn register_birth(
        &self,
        id: &str,
        request: RegisterBirthRequest,
    ) -> Result<BirthRegistration, DomainError> {
        let mut pregnancy = self.get_pregnancy(id).await?;
        pregnancy.ensure_active()?;

        self.policy
            .validate_birth(pregnancy.mating_date, request.birth_date)?;

        let mut litter = Litter::new(
            pregnancy.female_id.clone(),
            request.birth_date,
            request.born_alive,
            request.born_dead,
            today(),
        )?;
        litter.pregnancy_id = Some(pregnancy.id.clone());
        litter.father_id = pregnancy.male_id.clone();
        litter.cage_id = self.existing_cage(request.cage_id.as_deref()).await?;
        litter.notes = request.notes;

        let litter = self.stores.litters.create(litter).await?;
        pregnancy.mark_delivered(litter.id.clone());
        let pregnancy = self.stores.pregnancies.update(pregnancy).await?;

        info!(
            pregnancy_id = %pregnancy.id,
            litter_id = %litter.id,
            born_alive = litter.born_alive,
            born_dead = litter.born_dead,
            "Registered birth"
        );

        Ok(BirthRegistration { pregnancy, litter })
    }

    pub async fn mark_failed(&self, id: &str, reason: &str) -> Result<Pregnancy, DomainError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("A failure reason is required"));
        }

        let mut pregnancy = self.get_pregnancy(id).await?;
        pregnancy.ensure_active()?;
        pregnancy.mark_failed(reason);

        info!(id = %pregnancy.id, reason = %reason, "Pregnancy failed");
        self.stores.pregnancies.update(pregnancy).await
    }

    /// Active pregnancies expected within `[today, today + days]`, soonest first
    pub async fn upcoming_births(&self, days: i64) -> Result<Vec<Pregnancy>, DomainError> {
        if days < 0 {
            return Err(DomainError::validation("days cannot be negative"));
        }

        let today = today();
        let mut upcoming: Vec<Pregnancy> = self
            .stores
            .pregnancies
            .list()
            .await?
            .into_iter()
            .filter(|p| p.is_active())
            .filter(|p| (0..=days).contains(&p.days_until_birth(today)))
            .collect();

        upcoming.sort_by_key(|p| p.expected_birth_date);
        Ok(upcoming)
    }

    /// Active pregnancies past the longest allowed gestation
    pub async fn overdue(&self) -> Result<Vec<Pregnancy>, DomainError> {
        let today = today();
        let mut overdue: Vec<Pregnancy> = self
            .stores
            .pregnancies
            .list()
            .await?
            .into_iter()
            .filter(|p| p.is_overdue(today, &self.policy))
            .collect();

        overdue.sort_by_key(|p| p.mating_date);
        Ok(overdue)
    }

    // Litters

    pub async fn create_litter(&self, request: CreateLitterRequest) -> Result<Litter, DomainError> {
        let mother_id = CuyId::parse(&request.mother_id)?;
        let mother = self.cuyes.get_referenced(&mother_id).await?;

        if mother.sex != Sex::Female {
            return Err(DomainError::validation(format!(
                "Cuy '{}' is not female",
                mother.code
            )));
        }

        let mut litter = Litter::new(
            mother.id,
            request.birth_date,
            request.born_alive,
            request.born_dead,
            today(),
        )?;

        if let Some(father_id) = request.father_id {
            litter.father_id = Some(self.breeding_male_any_status(&father_id).await?.id);
        }

        litter.cage_id = self.existing_cage(request.cage_id.as_deref()).await?;
        litter.notes = request.notes;

        info!(id = %litter.id, mother = %mother.code, "Registering litter");
        self.stores.litters.create(litter).await
    }

    pub async fn get_litter(&self, id: &str) -> Result<Litter, DomainError> {
        let litter_id = LitterId::parse(id)?;
        self.stores
            .litters
            .get(&litter_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Litter '{}' not found", id)))
    }

    pub async fn list_litters(
        &self,
        query: &LitterQuery,
        pagination: Pagination,
    ) -> Result<Page<Litter>, DomainError> {
        let mut litters: Vec<Litter> = self
            .stores
            .litters
            .list()
            .await?
            .into_iter()
            .filter(|l| query.matches(l))
            .collect();

        litters.sort_by(|a, b| b.birth_date.cmp(&a.birth_date));
        Ok(Page::from_sorted(litters, pagination))
    }

    pub async fn update_litter(
        &self,
        id: &str,
        request: UpdateLitterRequest,
    ) -> Result<Litter, DomainError> {
        let mut litter = self.get_litter(id).await?;

        if request.born_alive.is_some() || request.born_dead.is_some() {
            let born_alive = request.born_alive.unwrap_or(litter.born_alive);
            let born_dead = request.born_dead.unwrap_or(litter.born_dead);
            let offspring = self.offspring_count(&litter.id).await?;

            if (born_alive as usize) < offspring {
                return Err(DomainError::validation(format!(
                    "Litter already has {} registered offspring",
                    offspring
                )));
            }

            litter.set_counts(born_alive, born_dead)?;
        }

        if let Some(father_id) = request.father_id {
            litter.father_id = Some(self.breeding_male_any_status(&father_id).await?.id);
        }

        if request.cage_id.is_some() {
            litter.cage_id = self.existing_cage(request.cage_id.as_deref()).await?;
        }

        if request.notes.is_some() {
            litter.notes = request.notes;
        }

        litter.touch();
        info!(id = %litter.id, "Updating litter");
        self.stores.litters.update(litter).await
    }

    pub async fn delete_litter(&self, id: &str) -> Result<(), DomainError> {
        let litter = self.get_litter(id).await?;
        let offspring = self.offspring_count(&litter.id).await?;

        if offspring > 0 {
            return Err(DomainError::conflict(format!(
                "Litter '{}' has {} registered offspring",
                litter.id, offspring
            )));
        }

        if let Some(ref pregnancy_id) = litter.pregnancy_id {
            if let Some(mut pregnancy) = self.stores.pregnancies.get(pregnancy_id).await? {
                pregnancy.litter_id = None;
                pregnancy.touch();
                self.stores.pregnancies.update(pregnancy).await?;
            }
        }

        info!(id = %litter.id, "Deleting litter");
        self.stores.litters.delete(&litter.id).await?;
        Ok(())
    }

    pub async fn wean(&self, id: &str, request: WeanRequest) -> Result<Litter, DomainError> {
        let mut litter = self.get_litter(id).await?;

        if request.weaning_date > today() {
            return Err(DomainError::validation(format!(
                "Weaning date {} is in the future",
                request.weaning_date
            )));
        }

        self.policy
            .validate_weaning(litter.birth_date, request.weaning_date)?;
        litter.wean(request.weaning_date, request.weaned_count)?;

        info!(id = %litter.id, weaned = request.weaned_count, "Litter weaned");
        self.stores.litters.update(litter).await
    }

    /// Create nursing cuyes for a litter, numbered after any already registered
    pub async fn register_offspring(
        &self,
        id: &str,
        request: RegisterOffspringRequest,
    ) -> Result<Vec<Cuy>, DomainError> {
        let count = request
            .males
            .checked_add(request.females)
            .ok_or_else(|| DomainError::validation("Offspring count is out of range"))?;
        if count == 0 {
            return Err(DomainError::validation(
                "At least one male or female offspring is required",
            ));
        }

        let litter = self.get_litter(id).await?;
        let cage_id = CageId::parse(&request.cage_id)?;
        let existing = self.offspring_count(&litter.id).await?;

        if existing + count as usize > litter.born_alive as usize {
            return Err(DomainError::validation(format!(
                "Litter has {} born alive and {} already registered; cannot add {}",
                litter.born_alive, existing, count
            )));
        }

        let prefix = request.code_prefix.trim().to_uppercase();
        if prefix.is_empty() {
            return Err(DomainError::validation("Code prefix cannot be empty"));
        }

        let breed = match request.breed {
            Some(breed) if !breed.trim().is_empty() => breed,
            _ => self.cuyes.get_referenced(&litter.mother_id).await?.breed,
        };

        let _guard = self.housing.lock_placement().await;
        self.housing.ensure_capacity(&cage_id, count, None).await?;

        let taken: Vec<String> = self
            .stores
            .cuyes
            .list()
            .await?
            .into_iter()
            .map(|c| c.code)
            .collect();

        let sexes = std::iter::repeat_n(Sex::Male, request.males as usize)
            .chain(std::iter::repeat_n(Sex::Female, request.females as usize));

        let mut pups = Vec::with_capacity(count as usize);
        for (offset, sex) in sexes.enumerate() {
            let code = normalize_code(&format!("{}-{:02}", prefix, existing + offset + 1))?;

            if taken.contains(&code) {
                return Err(DomainError::conflict(format!(
                    "Cuy code '{}' is already in use",
                    code
                )));
            }

            let mut pup = Cuy::new(&code, sex, breed.clone(), litter.birth_date, today())?
                .with_stage(Stage::Nursing)
                .with_cage(cage_id.clone());
            pup.origin = Origin::Born;
            pup.litter_id = Some(litter.id.clone());
            pups.push(pup);
        }

        let mut created = Vec::with_capacity(pups.len());
        for pup in pups {
            created.push(self.stores.cuyes.create(pup).await?);
        }

        info!(litter_id = %litter.id, count = created.len(), "Registered offspring");
        Ok(created)
    }

    pub async fn litter_statistics(&self) -> Result<LitterStatistics, DomainError> {
        let litters = self.stores.litters.list().await?;
        Ok(LitterStatistics::from_litters(&litters))
    }

    async fn offspring_count(&self, litter_id: &LitterId) -> Result<usize, DomainError> {
        Ok(self
            .stores
            .cuyes
            .list()
            .await?
            .iter()
            .filter(|c| c.litter_id.as_ref() == Some(litter_id))
            .count())
    }

    async fn breeding_female(&self, id: &str, today: NaiveDate) -> Result<Cuy, DomainError> {
        let female = self.cuyes.get_referenced(&CuyId::parse(id)?).await?;

        if female.sex != Sex::Female {
            return Err(DomainError::validation(format!(
                "Cuy '{}' is not female",
                female.code
            )));
        }

        ensure_active(&female, "bred")?;

        let age = female.age_days(today);
        if age < self.policy.min_breeding_age_days as i64 {
            return Err(DomainError::validation(format!(
                "Cuy '{}' is {} days old; breeding requires at least {}",
                female.code, age, self.policy.min_breeding_age_days
            )));
        }

        Ok(female)
    }

    async fn breeding_male(&self, id: &str) -> Result<Cuy, DomainError> {
        let male = self.breeding_male_any_status(id).await?;
        ensure_active(&male, "bred")?;
        Ok(male)
    }

    async fn breeding_male_any_status(&self, id: &str) -> Result<Cuy, DomainError> {
        let male = self.cuyes.get_referenced(&CuyId::parse(id)?).await?;

        if male.sex != Sex::Male {
            return Err(DomainError::validation(format!(
                "Cuy '{}' is not male",
                male.code
            )));
        }

        Ok(male)
    }

    async fn existing_cage(&self, id: Option<&str>) -> Result<Option<CageId>, DomainError> {
        let Some(id) = id else {
            return Ok(None);
        };

        let cage_id = CageId::parse(id)?;
        if self.housing.find_cage(&cage_id).await?.is_none() {
            return Err(DomainError::reference(format!(
                "Cage '{}' does not exist",
                cage_id
            )));
        }

        Ok(Some(cage_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::housing::{Cage, CageKind, Shed};
    use chrono::Duration;

    struct Fixture {
        service: ReproductionService,
        stores: Stores,
        cage: Cage,
    }

    async fn fixture() -> Fixture {
        let stores = Stores::in_memory();
        let shed = stores.sheds.create(Shed::new("A").unwrap()).await.unwrap();
        let cage = stores
            .cages
            .create(Cage::new(shed.id, "J-1", 10, CageKind::Breeding).unwrap())
            .await
            .unwrap();
        let housing = Arc::new(HousingService::new(stores.clone()));
        let cuyes = Arc::new(CuyService::new(stores.clone(), housing.clone()));

        Fixture {
            service: ReproductionService::new(
                stores.clone(),
                housing,
                cuyes,
                GestationPolicy::default(),
            ),
            stores,
            cage,
        }
    }

    async fn animal(stores: &Stores, code: &str, sex: Sex, age_days: i64) -> Cuy {
        let birth = today() - Duration::days(age_days);
        let cuy = Cuy::new(code, sex, "Andina", birth, today()).unwrap();
        stores.cuyes.create(cuy).await.unwrap()
    }

    fn pregnancy_request(female: &Cuy, mating_date: NaiveDate) -> CreatePregnancyRequest {
        CreatePregnancyRequest {
            female_id: female.id.to_string(),
            male_id: None,
            mating_date,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_pregnancy_computes_expected_date() {
        let f = fixture().await;
        let female = animal(&f.stores, "H-01", Sex::Female, 200).await;
        let mating = today() - Duration::days(10);

        let pregnancy = f
            .service
            .create_pregnancy(pregnancy_request(&female, mating))
            .await
            .unwrap();

        assert_eq!(pregnancy.expected_birth_date, mating + Duration::days(67));
        assert_eq!(pregnancy.status, PregnancyStatus::Active);
    }

    #[tokio::test]
    async fn test_second_active_pregnancy_conflicts() {
        let f = fixture().await;
        let female = animal(&f.stores, "H-01", Sex::Female, 200).await;
        f.service
            .create_pregnancy(pregnancy_request(&female, today()))
            .await
            .unwrap();

        let err = f
            .service
            .create_pregnancy(pregnancy_request(&female, today()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_pregnancy_rules() {
        let f = fixture().await;
        let young = animal(&f.stores, "H-01", Sex::Female, 30).await;
        let male = animal(&f.stores, "M-01", Sex::Male, 200).await;

        let err = f
            .service
            .create_pregnancy(pregnancy_request(&young, today()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("breeding requires"));

        let err = f
            .service
            .create_pregnancy(pregnancy_request(&male, today()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not female"));

        let missing = CreatePregnancyRequest {
            female_id: CuyId::generate().to_string(),
            male_id: None,
            mating_date: today(),
            notes: None,
        };
        let err = f.service.create_pregnancy(missing).await.unwrap_err();
        assert!(matches!(err, DomainError::Reference { .. }));

        let female = animal(&f.stores, "H-02", Sex::Female, 200).await;
        let err = f
            .service
            .create_pregnancy(pregnancy_request(&female, today() + Duration::days(1)))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("future"));
    }

    #[tokio::test]
    async fn test_register_birth_validates_gestation_window() {
        let f = fixture().await;
        let female = animal(&f.stores, "H-01", Sex::Female, 300).await;
        let mating = today() - Duration::days(70);
        let pregnancy = f
            .service
            .create_pregnancy(pregnancy_request(&female, mating))
            .await
            .unwrap();

        let too_early = RegisterBirthRequest {
            birth_date: mating + Duration::days(40),
            born_alive: 3,
            born_dead: 0,
            cage_id: None,
            notes: None,
        };
        let err = f
            .service
            .register_birth(pregnancy.id.as_str(), too_early)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let on_time = RegisterBirthRequest {
            birth_date: mating + Duration::days(68),
            born_alive: 3,
            born_dead: 1,
            cage_id: Some(f.cage.id.to_string()),
            notes: None,
        };
        let registration = f
            .service
            .register_birth(pregnancy.id.as_str(), on_time.clone())
            .await
            .unwrap();

        assert_eq!(registration.pregnancy.status, PregnancyStatus::Delivered);
        assert_eq!(
            registration.pregnancy.litter_id,
            Some(registration.litter.id.clone())
        );
        assert_eq!(registration.litter.mother_id, female.id);
        assert_eq!(registration.litter.total_born(), 4);

        let err = f
            .service
            .register_birth(pregnancy.id.as_str(), on_time)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let err = f
            .service
            .delete_pregnancy(pregnancy.id.as_str())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_upcoming_and_overdue() {
        let f = fixture().await;
        let soon = animal(&f.stores, "H-01", Sex::Female, 300).await;
        let late = animal(&f.stores, "H-02", Sex::Female, 300).await;
        let early = animal(&f.stores, "H-03", Sex::Female, 300).await;

        f.service
            .create_pregnancy(pregnancy_request(&soon, today() - Duration::days(64)))
            .await
            .unwrap();
        f.service
            .create_pregnancy(pregnancy_request(&late, today() - Duration::days(80)))
            .await
            .unwrap();
        f.service
            .create_pregnancy(pregnancy_request(&early, today() - Duration::days(5)))
            .await
            .unwrap();

        let upcoming = f.service.upcoming_births(7).await.unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].female_id, soon.id);

        let overdue = f.service.overdue().await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].female_id, late.id);
    }

    #[tokio::test]
    async fn test_mark_failed_requires_reason() {
        let f = fixture().await;
        let female = animal(&f.stores, "H-01", Sex::Female, 300).await;
        let pregnancy = f
            .service
            .create_pregnancy(pregnancy_request(&female, today()))
            .await
            .unwrap();

        assert!(f.service.mark_failed(pregnancy.id.as_str(), " ").await.is_err());

        let failed = f
            .service
            .mark_failed(pregnancy.id.as_str(), "reabsorcion")
            .await
            .unwrap();
        assert_eq!(failed.status, PregnancyStatus::Failed);

        // a failed pregnancy frees the female for a new one
        f.service
            .create_pregnancy(pregnancy_request(&female, today()))
            .await
            .unwrap();
    }

    async fn litter(f: &Fixture, born_alive: u32, age_days: i64) -> Litter {
        let mother = animal(&f.stores, "MADRE-1", Sex::Female, 400).await;
        f.service
            .create_litter(CreateLitterRequest {
                mother_id: mother.id.to_string(),
                father_id: None,
                birth_date: today() - Duration::days(age_days),
                born_alive,
                born_dead: 0,
                cage_id: None,
                notes: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_wean_respects_minimum_age() {
        let f = fixture().await;
        let l = litter(&f, 3, 20).await;

        let err = f
            .service
            .wean(
                l.id.as_str(),
                WeanRequest {
                    weaning_date: l.birth_date + Duration::days(5),
                    weaned_count: 3,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let err = f
            .service
            .wean(
                l.id.as_str(),
                WeanRequest {
                    weaning_date: l.birth_date + Duration::days(14),
                    weaned_count: 4,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let weaned = f
            .service
            .wean(
                l.id.as_str(),
                WeanRequest {
                    weaning_date: l.birth_date + Duration::days(14),
                    weaned_count: 3,
                },
            )
            .await
            .unwrap();
        assert_eq!(weaned.weaned_count, Some(3));
    }

    #[tokio::test]
    async fn test_register_offspring() {
        let f = fixture().await;
        let l = litter(&f, 4, 3).await;

        let pups = f
            .service
            .register_offspring(
                l.id.as_str(),
                RegisterOffspringRequest {
                    males: 1,
                    females: 2,
                    cage_id: f.cage.id.to_string(),
                    breed: None,
                    code_prefix: "c24".to_string(),
                },
            )
            .await
            .unwrap();

        let codes: Vec<_> = pups.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["C24-01", "C24-02", "C24-03"]);
        assert_eq!(pups[0].sex, Sex::Male);
        assert!(pups.iter().all(|p| p.stage == Stage::Nursing));
        assert!(pups.iter().all(|p| p.breed == "Andina"));
        assert!(pups.iter().all(|p| p.birth_date == l.birth_date));

        // only one born-alive pup remains unregistered
        let err = f
            .service
            .register_offspring(
                l.id.as_str(),
                RegisterOffspringRequest {
                    males: 2,
                    females: 0,
                    cage_id: f.cage.id.to_string(),
                    breed: None,
                    code_prefix: "C24".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let err = f
            .service
            .register_offspring(
                l.id.as_str(),
                RegisterOffspringRequest {
                    males: u32::MAX,
                    females: 1,
                    cage_id: f.cage.id.to_string(),
                    breed: None,
                    code_prefix: "C24".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));

        let err = f.service.delete_litter(l.id.as_str()).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_litter_statistics() {
        let f = fixture().await;
        litter(&f, 4, 3).await;

        let stats = f.service.litter_statistics().await.unwrap();
        assert_eq!(stats.litters, 1);
        assert_eq!(stats.born_alive, 4);
        assert_eq!(stats.average_litter_size, 4.0);
    }
}
