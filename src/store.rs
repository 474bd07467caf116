//! Policy repository abstraction.
//!
//! The evaluation core is storage-free: policies live behind this trait,
//! injected into the route and sweeper layers. The bundled implementation
//! is in-memory; a database-backed store slots in behind the same trait.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Policy;

/// Repository seam for insurance policies.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn insert(&self, policy: Policy) -> Result<(), AppError>;
    async fn get(&self, id: Uuid) -> Result<Option<Policy>, AppError>;
    /// All policies, ordered by start date then id for stable listings.
    async fn list(&self) -> Result<Vec<Policy>, AppError>;
    /// Policies currently marked active.
    async fn list_active(&self) -> Result<Vec<Policy>, AppError>;
    async fn count(&self) -> Result<usize, AppError>;
}

/// Shared handle to the policy store.
pub type SharedPolicyStore = Arc<dyn PolicyStore>;

/// In-memory policy store.
#[derive(Default)]
pub struct InMemoryPolicyStore {
    policies: RwLock<HashMap<Uuid, Policy>>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn insert(&self, policy: Policy) -> Result<(), AppError> {
        self.policies.write().await.insert(policy.id, policy);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Policy>, AppError> {
        Ok(self.policies.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Policy>, AppError> {
        let mut policies: Vec<Policy> = self.policies.read().await.values().cloned().collect();
        policies.sort_by(|a, b| (a.start_date, a.id).cmp(&(b.start_date, b.id)));
        Ok(policies)
    }

    async fn list_active(&self) -> Result<Vec<Policy>, AppError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|p| p.active)
            .collect())
    }

    async fn count(&self) -> Result<usize, AppError> {
        Ok(self.policies.read().await.len())
    }
}

/// Load seed policies from `*.json` files in a directory.
///
/// Each file holds either a single policy object or an array of them. A
/// missing directory is fine (no seeding); an unreadable or malformed file
/// is an error so bad seed data doesn't pass silently.
pub fn load_policies_from_dir(dir: &Path) -> Result<Vec<Policy>, AppError> {
    let mut policies = Vec::new();

    if !dir.exists() {
        return Ok(policies);
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| AppError::InternalError(format!("Failed to read {}: {}", dir.display(), e)))?;

    for entry in entries {
        let entry = entry
            .map_err(|e| AppError::InternalError(format!("Failed to read dir entry: {}", e)))?;
        let path = entry.path();

        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            AppError::InternalError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        match serde_json::from_str::<Vec<Policy>>(&contents) {
            Ok(mut batch) => policies.append(&mut batch),
            Err(_) => {
                let single: Policy = serde_json::from_str(&contents).map_err(|e| {
                    AppError::InternalError(format!(
                        "Invalid policy JSON in {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                policies.push(single);
            }
        }
    }

    Ok(policies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CoverageType, DroughtThresholds, FloodThresholds, PolicyThresholds, WindThresholds,
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn sample_policy(active: bool, start_day: u32) -> Policy {
        Policy {
            id: Uuid::new_v4(),
            station_id: "st-1".to_string(),
            holder_name: "Nikos Groves".to_string(),
            coverage_type: CoverageType::Drought,
            start_date: NaiveDate::from_ymd_opt(2025, 6, start_day).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            active,
            coverage_amount: Decimal::from(5000),
            deductible_pct: 10.0,
            thresholds: PolicyThresholds {
                drought: DroughtThresholds {
                    days: 7,
                    humidity_threshold: 40.0,
                    temperature_threshold: 30.0,
                },
                flood: FloodThresholds {
                    days: 3,
                    precipitation_threshold: 20.0,
                    cumulative_threshold: 50.0,
                },
                wind: WindThresholds {
                    occurrences: 1,
                    wind_speed_threshold: 20.0,
                    gust_threshold: 30.0,
                },
            },
        }
    }

    #[tokio::test]
    async fn test_insert_get_roundtrip() {
        let store = InMemoryPolicyStore::new();
        let policy = sample_policy(true, 1);
        let id = policy.id;

        store.insert(policy).await.unwrap();
        let fetched = store.get(id).await.unwrap().unwrap();
        assert_eq!(fetched.id, id);
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_start_date() {
        let store = InMemoryPolicyStore::new();
        store.insert(sample_policy(true, 20)).await.unwrap();
        store.insert(sample_policy(true, 5)).await.unwrap();
        store.insert(sample_policy(true, 12)).await.unwrap();

        let listed = store.list().await.unwrap();
        let days: Vec<u32> = listed
            .iter()
            .map(|p| {
                use chrono::Datelike;
                p.start_date.day()
            })
            .collect();
        assert_eq!(days, vec![5, 12, 20]);
    }

    #[tokio::test]
    async fn test_list_active_filters() {
        let store = InMemoryPolicyStore::new();
        store.insert(sample_policy(true, 1)).await.unwrap();
        store.insert(sample_policy(false, 2)).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.list_active().await.unwrap().len(), 1);
    }

    #[test]
    fn test_load_policies_missing_dir_is_empty() {
        let dir = std::env::temp_dir().join("weather-cover-no-such-dir");
        let policies = load_policies_from_dir(&dir).unwrap();
        assert!(policies.is_empty());
    }

    #[test]
    fn test_load_policies_from_json_files() {
        let dir = std::env::temp_dir().join(format!("weather-cover-seed-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let single = sample_policy(true, 1);
        let batch = vec![sample_policy(true, 2), sample_policy(false, 3)];
        std::fs::write(
            dir.join("single.json"),
            serde_json::to_string(&single).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.join("batch.json"),
            serde_json::to_string(&batch).unwrap(),
        )
        .unwrap();
        std::fs::write(dir.join("ignored.txt"), "not json").unwrap();

        let policies = load_policies_from_dir(&dir).unwrap();
        assert_eq!(policies.len(), 3);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
