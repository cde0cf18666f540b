//! Category and issue type management.

use tracing::{info, instrument};

use helpdesk_core::{Actor, Category, CategoryId, IssueType, IssueTypeId};

use super::{Helpdesk, HelpdeskError, Result, require_staff};
use crate::db::{HelpdeskStore, RepositoryError};

/// Map a store miss onto the catalog entity that was missing.
fn missing(what: &'static str) -> impl FnOnce(RepositoryError) -> HelpdeskError {
    move |e| match e {
        RepositoryError::NotFound => HelpdeskError::NotFound(what),
        other => other.into(),
    }
}

/// Trimmed `name`, or `BlankName` when nothing is left.
fn catalog_name<'a>(what: &'static str, name: &'a str) -> Result<&'a str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(HelpdeskError::BlankName(what));
    }
    Ok(name)
}

impl<S: HelpdeskStore> Helpdesk<S> {
    /// All categories ordered by name.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the store fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.store.list_categories().await?)
    }

    /// Issue types ordered by name.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the store fails.
    pub async fn list_issue_types(&self, active_only: bool) -> Result<Vec<IssueType>> {
        Ok(self.store.list_issue_types(active_only).await?)
    }

    /// # Errors
    ///
    /// `AuthorizationDenied` for non-staff, `BlankName` for a blank name,
    /// `Duplicate` if the name is taken.
    #[instrument(skip(self, actor, description), fields(actor = %actor.id))]
    pub async fn create_category(
        &self,
        actor: &Actor,
        name: &str,
        description: &str,
    ) -> Result<Category> {
        require_staff(actor, "manage the catalog")?;
        let name = catalog_name("category", name)?;
        let category = self
            .store
            .insert_category(name, description.trim())
            .await?;
        info!(category = %category.id, "Category created");
        Ok(category)
    }

    /// # Errors
    ///
    /// `AuthorizationDenied` for non-staff, `BlankName` for a blank name,
    /// `NotFound` for an unknown category, `Duplicate` if the name is taken
    /// within the category.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn create_issue_type(
        &self,
        actor: &Actor,
        name: &str,
        category: CategoryId,
        active: bool,
    ) -> Result<IssueType> {
        require_staff(actor, "manage the catalog")?;
        let name = catalog_name("issue type", name)?;
        let issue_type = self
            .store
            .insert_issue_type(name, category, active)
            .await
            .map_err(missing("category"))?;
        info!(issue_type = %issue_type.id, "Issue type created");
        Ok(issue_type)
    }

    /// Activate or retire an issue type. Tickets keep their reference either way.
    ///
    /// # Errors
    ///
    /// `AuthorizationDenied` for non-staff, `NotFound` for an unknown issue type.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn set_issue_type_active(
        &self,
        actor: &Actor,
        id: IssueTypeId,
        active: bool,
    ) -> Result<IssueType> {
        require_staff(actor, "manage the catalog")?;
        let issue_type = self
            .store
            .set_issue_type_active(id, active)
            .await
            .map_err(missing("issue type"))?;
        info!("Issue type activation changed");
        Ok(issue_type)
    }

    /// # Errors
    ///
    /// `AuthorizationDenied` for non-staff, `NotFound` for an unknown issue
    /// type, `CatalogInUse` while tickets reference it.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn delete_issue_type(&self, actor: &Actor, id: IssueTypeId) -> Result<()> {
        require_staff(actor, "manage the catalog")?;
        self.store
            .delete_issue_type(id)
            .await
            .map_err(missing("issue type"))?;
        info!("Issue type deleted");
        Ok(())
    }

    /// Delete a category and its issue types.
    ///
    /// # Errors
    ///
    /// `AuthorizationDenied` for non-staff, `NotFound` for an unknown
    /// category, `CatalogInUse` while tickets reference it or its issue types.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn delete_category(&self, actor: &Actor, id: CategoryId) -> Result<()> {
        require_staff(actor, "manage the catalog")?;
        self.store
            .delete_category(id)
            .await
            .map_err(missing("category"))?;
        info!("Category deleted");
        Ok(())
    }
}
