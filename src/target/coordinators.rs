use serde_json::Value;

use crate::agency::{AgencyClient, AgencyPaths};
use crate::common::utils::validate_name;
use crate::common::{Error, Result};

/// Membership set of coordinator nodes.
///
/// Presence of `<root>/Coordinators/<name>` is what counts; the stored
/// marker value is never interpreted.
pub struct TargetCoordinators<'a, A> {
    agency: &'a A,
    paths: &'a AgencyPaths,
}

impl<'a, A: AgencyClient> TargetCoordinators<'a, A> {
    pub fn new(agency: &'a A, paths: &'a AgencyPaths) -> Self {
        Self { agency, paths }
    }

    /// Sorted coordinator names.
    pub async fn get_list(&self) -> Result<Vec<String>> {
        let mut names = self.agency.list(&self.paths.coordinators()).await?;
        names.sort();
        names.dedup();
        Ok(names)
    }

    pub async fn contains(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        let found = self.agency.get(&self.paths.coordinator(name), false).await?;
        Ok(!found.is_empty())
    }

    pub async fn add(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let path = self.paths.coordinator(name);
        if !self.agency.set(&path, Value::Bool(true)).await? {
            return Err(Error::WriteRejected(path));
        }
        tracing::info!("coordinator {} added", name);
        Ok(())
    }

    pub async fn remove(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let path = self.paths.coordinator(name);
        if !self.agency.remove(&path).await? {
            return Err(Error::WriteRejected(path));
        }
        tracing::info!("coordinator {} removed", name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agency::MemAgency;
    use serde_json::json;

    fn agency() -> MemAgency {
        MemAgency::with_entries([
            ("Target/Coordinators/cindy", json!(2)),
            ("Target/Coordinators/carlos", json!(true)),
            ("Target/Coordinators/charly", json!("alice")),
        ])
    }

    #[tokio::test]
    async fn test_get_coordinator_list() {
        let agency = agency();
        let paths = AgencyPaths::default();
        let coords = TargetCoordinators::new(&agency, &paths);
        assert_eq!(coords.get_list().await.unwrap(), vec!["carlos", "charly", "cindy"]);
    }

    #[tokio::test]
    async fn test_add_coordinator() {
        let agency = agency();
        let paths = AgencyPaths::default();
        let coords = TargetCoordinators::new(&agency, &paths);

        coords.add("carol").await.unwrap();
        assert_eq!(
            coords.get_list().await.unwrap(),
            vec!["carlos", "carol", "charly", "cindy"]
        );
        assert_eq!(agency.dump().await["Target/Coordinators/carol"], json!(true));
        assert!(coords.contains("carol").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_coordinator() {
        let agency = agency();
        let paths = AgencyPaths::default();
        let coords = TargetCoordinators::new(&agency, &paths);

        coords.remove("cindy").await.unwrap();
        assert_eq!(coords.get_list().await.unwrap(), vec!["carlos", "charly"]);
        assert!(!coords.contains("cindy").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_unknown_coordinator_is_rejected() {
        let agency = agency();
        let paths = AgencyPaths::default();
        let coords = TargetCoordinators::new(&agency, &paths);

        let err = coords.remove("nobody").await.unwrap_err();
        assert!(matches!(err, Error::WriteRejected(_)));
        assert_eq!(coords.get_list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_name() {
        let agency = agency();
        let paths = AgencyPaths::default();
        let coords = TargetCoordinators::new(&agency, &paths);
        assert!(matches!(
            coords.add("a/b").await.unwrap_err(),
            Error::InvalidName(_)
        ));
    }
}
