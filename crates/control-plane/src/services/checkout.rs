// Checkout service: records a pending order for a template

use marketplace_core::{DomainError, Order, Result, Role};
use uuid::Uuid;

use crate::api::checkout::CheckoutRequest;
use crate::api::validation::{normalize_email, Validator, MIN_NAME_CHARS};
use crate::storage::{CreateOrderRow, CreateUserRow, StorageBackend, UserRow};

/// Minimum length of the submitted template id.
const MIN_TEMPLATE_ID_CHARS: usize = 2;

pub struct CheckoutService {
    db: StorageBackend,
}

impl CheckoutService {
    pub fn new(db: StorageBackend) -> Self {
        Self { db }
    }

    /// Find the buyer by email, creating an unverified account if needed.
    async fn buyer(&self, name: &str, email: &str) -> Result<UserRow> {
        if let Some(user) = self.db.get_user_by_email(email).await? {
            return Ok(user);
        }
        let user = self
            .db
            .create_user(CreateUserRow {
                name: name.to_string(),
                email: email.to_string(),
                role: Role::User,
            })
            .await?;
        tracing::info!(user_id = %user.id, "Created buyer account at checkout");
        Ok(user)
    }

    pub async fn checkout(&self, req: CheckoutRequest) -> Result<Order> {
        let mut v = Validator::new();
        let name = v.required("name", req.name.as_deref());
        if let Some(name) = name {
            v.min_chars("name", name, MIN_NAME_CHARS);
        }
        let email = v.required("email", req.email.as_deref());
        if let Some(email) = email {
            v.email("email", email);
        }
        let template_id = v.required("templateId", req.template_id.as_deref());
        if let Some(id) = template_id {
            v.min_chars("templateId", id, MIN_TEMPLATE_ID_CHARS);
        }
        match req.amount {
            Some(amount) => v.non_negative("amount", amount),
            None => v.issue("amount", "amount is required"),
        }
        v.finish()?;
        let (Some(name), Some(email), Some(template_id), Some(amount)) =
            (name, email, template_id, req.amount)
        else {
            return Err(DomainError::invalid("body", "Invalid checkout"));
        };

        let template_id =
            Uuid::parse_str(template_id).map_err(|_| DomainError::not_found("Template"))?;
        if self.db.get_template(template_id).await?.is_none() {
            return Err(DomainError::not_found("Template"));
        }

        let buyer = self.buyer(name, &normalize_email(email)).await?;
        let order = self
            .db
            .create_order(CreateOrderRow {
                user_id: buyer.id,
                template_id,
                amount,
            })
            .await?;
        tracing::info!(order_id = %order.id, %template_id, "Order created");
        Ok(order.to_order())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CreateTemplateRow;
    use marketplace_core::{OrderStatus, TemplateDetails};

    async fn seed_template(db: &StorageBackend) -> Uuid {
        db.create_template(
            CreateTemplateRow {
                title: "Landing Page".to_string(),
                description: "Marketing site".to_string(),
                cover_image: "https://cdn.example.com/l.png".to_string(),
                content: "# Landing".to_string(),
                price: 19.0,
                offer_price: None,
                resource: None,
                details: TemplateDetails::default(),
            },
            vec![],
        )
        .await
        .unwrap()
        .row
        .id
    }

    fn request(template_id: &str) -> CheckoutRequest {
        CheckoutRequest {
            name: Some("Ada".to_string()),
            email: Some("Ada@Example.com".to_string()),
            template_id: Some(template_id.to_string()),
            amount: Some(19.0),
        }
    }

    #[tokio::test]
    async fn test_checkout_creates_buyer_and_pending_order() {
        let db = StorageBackend::in_memory();
        let template_id = seed_template(&db).await;
        let service = CheckoutService::new(db.clone());

        let order = service
            .checkout(request(&template_id.to_string()))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.template_id, template_id);

        let buyer = db
            .get_user_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.user_id, buyer.id);
        assert!(!buyer.is_verified);

        let again = service
            .checkout(request(&template_id.to_string()))
            .await
            .unwrap();
        assert_eq!(again.user_id, buyer.id);
    }

    #[tokio::test]
    async fn test_unknown_template_is_not_found() {
        let service = CheckoutService::new(StorageBackend::in_memory());
        let err = service
            .checkout(request(&Uuid::now_v7().to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));

        let err = service.checkout(request("tpl-123")).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_body_is_rejected() {
        let service = CheckoutService::new(StorageBackend::in_memory());
        let err = service
            .checkout(CheckoutRequest {
                name: Some("A".to_string()),
                email: Some("nope".to_string()),
                template_id: Some("x".to_string()),
                amount: Some(-5.0),
            })
            .await
            .unwrap_err();
        match err {
            DomainError::Validation(issues) => assert_eq!(issues.len(), 4),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
