//! Restaurant Repository

use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{DEFAULT_TOLERANCE_MINUTES, Restaurant, RestaurantCreate, RestaurantUpdate};

const TABLE: &str = "restaurant";

#[derive(Clone)]
pub struct RestaurantRepository {
    base: BaseRepository,
}

impl RestaurantRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all active restaurants
    pub async fn find_all(&self) -> RepoResult<Vec<Restaurant>> {
        let restaurants: Vec<Restaurant> = self
            .base
            .db()
            .query("SELECT * FROM restaurant WHERE is_active = true ORDER BY name")
            .await?
            .take(0)?;
        Ok(restaurants)
    }

    /// Find restaurant by record key
    pub async fn find_by_id(&self, key: &str) -> RepoResult<Option<Restaurant>> {
        let thing = RecordId::from_table_key(TABLE, key);
        let restaurant: Option<Restaurant> = self.base.db().select(thing).await?;
        Ok(restaurant)
    }

    /// Find restaurant by name
    pub async fn find_by_name(&self, name: &str) -> RepoResult<Option<Restaurant>> {
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM restaurant WHERE name = $name LIMIT 1")
            .bind(("name", name.to_string()))
            .await?;
        let restaurants: Vec<Restaurant> = result.take(0)?;
        Ok(restaurants.into_iter().next())
    }

    /// Create a new restaurant
    pub async fn create(&self, data: RestaurantCreate) -> RepoResult<Restaurant> {
        let tolerance = data.tolerance_minutes.unwrap_or(DEFAULT_TOLERANCE_MINUTES);
        if tolerance < 1 {
            return Err(RepoError::Validation(
                "tolerance_minutes must be at least 1".to_string(),
            ));
        }

        // Check duplicate name
        if self.find_by_name(&data.name).await?.is_some() {
            return Err(RepoError::Duplicate(format!(
                "Restaurant '{}' already exists",
                data.name
            )));
        }

        let restaurant = Restaurant {
            id: None,
            name: data.name,
            tolerance_minutes: tolerance,
            reinsertion_policy: data.reinsertion_policy.unwrap_or_default(),
            max_queue_size: data.max_queue_size,
            is_active: true,
            created_at: shared::util::now_millis(),
        };

        let created: Option<Restaurant> = self.base.db().create(TABLE).content(restaurant).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create restaurant".to_string()))
    }

    /// Update restaurant settings.
    ///
    /// 设置变更只影响之后的叫号；已叫号 party 的宽容期在叫号时已定格。
    pub async fn update(&self, key: &str, data: RestaurantUpdate) -> RepoResult<Restaurant> {
        let thing = RecordId::from_table_key(TABLE, key);
        let existing = self
            .find_by_id(key)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Restaurant {} not found", key)))?;

        if let Some(t) = data.tolerance_minutes
            && t < 1
        {
            return Err(RepoError::Validation(
                "tolerance_minutes must be at least 1".to_string(),
            ));
        }

        // Check duplicate name if renaming
        if let Some(ref name) = data.name
            && let Some(found) = self.find_by_name(name).await?
            && found.id != existing.id
        {
            return Err(RepoError::Duplicate(format!(
                "Restaurant '{}' already exists",
                name
            )));
        }

        let name = data.name.unwrap_or(existing.name);
        let tolerance_minutes = data.tolerance_minutes.unwrap_or(existing.tolerance_minutes);
        let reinsertion_policy = data
            .reinsertion_policy
            .unwrap_or(existing.reinsertion_policy);
        // max_queue_size: Some(0) 清除上限，None 保持不变
        let max_queue_size = match data.max_queue_size {
            Some(0) => None,
            Some(n) => Some(n),
            None => existing.max_queue_size,
        };
        let is_active = data.is_active.unwrap_or(existing.is_active);

        self.base
            .db()
            .query(
                "UPDATE $thing SET name = $name, tolerance_minutes = $tolerance_minutes, \
                 reinsertion_policy = $reinsertion_policy, max_queue_size = $max_queue_size, \
                 is_active = $is_active",
            )
            .bind(("thing", thing))
            .bind(("name", name))
            .bind(("tolerance_minutes", tolerance_minutes))
            .bind(("reinsertion_policy", reinsertion_policy))
            .bind(("max_queue_size", max_queue_size))
            .bind(("is_active", is_active))
            .await?;

        self.find_by_id(key)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Restaurant {} not found", key)))
    }

    /// Hard delete a restaurant
    pub async fn delete(&self, key: &str) -> RepoResult<bool> {
        let thing = RecordId::from_table_key(TABLE, key);
        self.base
            .db()
            .query("DELETE $thing")
            .bind(("thing", thing))
            .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use shared::waitlist::ReinsertionPolicy;

    async fn repo() -> RestaurantRepository {
        let svc = DbService::new_in_memory().await.unwrap();
        RestaurantRepository::new(svc.db)
    }

    fn create_payload(name: &str) -> RestaurantCreate {
        RestaurantCreate {
            name: name.to_string(),
            tolerance_minutes: Some(5),
            reinsertion_policy: None,
            max_queue_size: Some(50),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = repo().await;
        let created = repo.create(create_payload("La Terraza")).await.unwrap();
        let key = created.key().unwrap();

        let found = repo.find_by_id(&key).await.unwrap().unwrap();
        assert_eq!(found.name, "La Terraza");
        assert_eq!(found.tolerance_minutes, 5);
        assert_eq!(found.reinsertion_policy, ReinsertionPolicy::Last);
        assert_eq!(found.max_queue_size, Some(50));
        assert!(found.is_active);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let repo = repo().await;
        repo.create(create_payload("Casa Pepe")).await.unwrap();
        let err = repo.create(create_payload("Casa Pepe")).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_tolerance_must_be_positive() {
        let repo = repo().await;
        let mut payload = create_payload("Zero");
        payload.tolerance_minutes = Some(0);
        let err = repo.create(payload).await.unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_settings() {
        let repo = repo().await;
        let created = repo.create(create_payload("El Faro")).await.unwrap();
        let key = created.key().unwrap();

        let updated = repo
            .update(
                &key,
                RestaurantUpdate {
                    name: None,
                    tolerance_minutes: Some(2),
                    reinsertion_policy: Some(ReinsertionPolicy::First),
                    max_queue_size: Some(0),
                    is_active: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.tolerance_minutes, 2);
        assert_eq!(updated.reinsertion_policy, ReinsertionPolicy::First);
        assert!(updated.max_queue_size.is_none());
    }

    #[tokio::test]
    async fn test_default_tolerance_applied() {
        let repo = repo().await;
        let created = repo
            .create(RestaurantCreate {
                name: "Defaults".to_string(),
                tolerance_minutes: None,
                reinsertion_policy: None,
                max_queue_size: None,
            })
            .await
            .unwrap();
        assert_eq!(created.tolerance_minutes, DEFAULT_TOLERANCE_MINUTES);
        assert!(created.max_queue_size.is_none());
    }
}
