//! Product comments and their moderation lifecycle.
//!
//! New comments start in `Waiting` and stay out of public listings until a
//! moderator approves them.

use common::{CommentId, ProductId};
use store::{CatalogStore, Comment, CommentStatus, CommentStore};

use crate::error::{DomainError, Result};

#[derive(Debug, Clone)]
pub struct NewComment {
    pub name: String,
    pub body: String,
}

pub struct ModerationService<S> {
    store: S,
}

impl<S> ModerationService<S>
where
    S: CommentStore + CatalogStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Submits a comment for a product. It is held for moderation.
    #[tracing::instrument(skip(self, new))]
    pub async fn add_comment(&self, product_id: ProductId, new: NewComment) -> Result<Comment> {
        if new.name.trim().is_empty() {
            return Err(DomainError::validation("name", "must not be empty"));
        }
        if new.body.trim().is_empty() {
            return Err(DomainError::validation("body", "must not be empty"));
        }
        if self.store.get_product(product_id).await?.is_none() {
            return Err(DomainError::not_found("product", product_id));
        }

        let comment = Comment {
            id: CommentId::new(),
            product_id,
            name: new.name,
            body: new.body,
            status: CommentStatus::Waiting,
        };
        let comment = self.store.insert_comment(comment).await?;
        metrics::counter!("comments_submitted_total").increment(1);
        Ok(comment)
    }

    pub async fn get_comment(&self, product_id: ProductId, id: CommentId) -> Result<Comment> {
        self.store
            .get_comment(product_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("comment", id))
    }

    /// Lists only approved comments. This is the public-facing view.
    pub async fn list_public(&self, product_id: ProductId) -> Result<Vec<Comment>> {
        self.require_product(product_id).await?;
        Ok(self
            .store
            .list_comments(product_id, Some(CommentStatus::Approved))
            .await?)
    }

    /// Lists comments in any state, optionally filtered. Moderator view.
    pub async fn list_all(
        &self,
        product_id: ProductId,
        status: Option<CommentStatus>,
    ) -> Result<Vec<Comment>> {
        self.require_product(product_id).await?;
        Ok(self.store.list_comments(product_id, status).await?)
    }

    /// Moves a comment to the given status.
    #[tracing::instrument(skip(self))]
    pub async fn set_status(
        &self,
        product_id: ProductId,
        id: CommentId,
        status: CommentStatus,
    ) -> Result<Comment> {
        Ok(self.store.set_comment_status(product_id, id, status).await?)
    }

    async fn require_product(&self, product_id: ProductId) -> Result<()> {
        if self.store.get_product(product_id).await?.is_none() {
            return Err(DomainError::not_found("product", product_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogService, NewCategory, NewProduct};
    use common::Money;
    use store::MemoryStore;

    async fn setup() -> (ModerationService<MemoryStore>, ProductId) {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(store.clone());
        let category = catalog
            .create_category(NewCategory {
                title: "Lamps".to_string(),
                description: String::new(),
            })
            .await
            .unwrap();
        let product = catalog
            .create_product(NewProduct {
                name: "Brass Lamp".to_string(),
                description: String::new(),
                price: Money::from_cents(4_500),
                inventory: 3,
                category_id: category.id,
                discount_ids: vec![],
            })
            .await
            .unwrap();
        (ModerationService::new(store), product.id)
    }

    fn comment(name: &str) -> NewComment {
        NewComment {
            name: name.to_string(),
            body: "Sheds a warm light.".to_string(),
        }
    }

    #[tokio::test]
    async fn new_comments_start_waiting_and_stay_hidden() {
        let (service, product_id) = setup().await;
        let posted = service.add_comment(product_id, comment("Ada")).await.unwrap();
        assert_eq!(posted.status, CommentStatus::Waiting);

        assert!(service.list_public(product_id).await.unwrap().is_empty());
        assert_eq!(service.list_all(product_id, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn approval_makes_comment_public() {
        let (service, product_id) = setup().await;
        let posted = service.add_comment(product_id, comment("Ada")).await.unwrap();

        let approved = service
            .set_status(product_id, posted.id, CommentStatus::Approved)
            .await
            .unwrap();
        assert_eq!(approved.status, CommentStatus::Approved);

        let public = service.list_public(product_id).await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, posted.id);
    }

    #[tokio::test]
    async fn rejected_comment_never_listed_publicly() {
        let (service, product_id) = setup().await;
        let posted = service.add_comment(product_id, comment("Ada")).await.unwrap();
        service
            .set_status(product_id, posted.id, CommentStatus::NotApproved)
            .await
            .unwrap();

        assert!(service.list_public(product_id).await.unwrap().is_empty());
        let rejected = service
            .list_all(product_id, Some(CommentStatus::NotApproved))
            .await
            .unwrap();
        assert_eq!(rejected.len(), 1);
    }

    #[tokio::test]
    async fn blank_fields_and_unknown_product_rejected() {
        let (service, product_id) = setup().await;

        let result = service
            .add_comment(
                product_id,
                NewComment {
                    name: String::new(),
                    body: "text".to_string(),
                },
            )
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Validation { field: "name", .. })
        ));

        let result = service
            .add_comment(
                product_id,
                NewComment {
                    name: "Ada".to_string(),
                    body: "   ".to_string(),
                },
            )
            .await;
        assert!(matches!(
            result,
            Err(DomainError::Validation { field: "body", .. })
        ));

        let result = service.add_comment(ProductId::new(), comment("Ada")).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn comment_scoped_to_its_product() {
        let (service, product_id) = setup().await;
        let posted = service.add_comment(product_id, comment("Ada")).await.unwrap();

        let result = service.get_comment(ProductId::new(), posted.id).await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
