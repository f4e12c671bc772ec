use crate::agency::{AgencyClient, AgencyPaths};
use crate::common::Result;

/// Read-only list of logical databases.
pub struct TargetDatabases<'a, A> {
    agency: &'a A,
    paths: &'a AgencyPaths,
}

impl<'a, A: AgencyClient> TargetDatabases<'a, A> {
    pub fn new(agency: &'a A, paths: &'a AgencyPaths) -> Self {
        Self { agency, paths }
    }

    /// Sorted database names.
    pub async fn get_list(&self) -> Result<Vec<String>> {
        let mut names = self.agency.list(&self.paths.databases()).await?;
        names.sort();
        names.dedup();
        Ok(names)
    }
}
