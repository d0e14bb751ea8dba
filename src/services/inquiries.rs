use crate::models::ContactSupplierRequest;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when storing inquiries
#[derive(Debug, Error)]
pub enum InquiryError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Buyer inquiry addressed to a supplier about one product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: Uuid,
    pub supplier_id: String,
    pub product_id: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub quantity: u32,
    pub message: String,
}

impl From<&ContactSupplierRequest> for Inquiry {
    fn from(req: &ContactSupplierRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            supplier_id: req.supplier_id.clone(),
            product_id: req.product_id.clone(),
            buyer_name: req.name.trim().to_string(),
            buyer_email: req.email.trim().to_string(),
            quantity: req.quantity,
            message: req.message.clone(),
        }
    }
}

/// PostgreSQL store for supplier inquiries
pub struct InquiryStore {
    pool: PgPool,
}

impl InquiryStore {
    /// Connect and run pending migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, InquiryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Insert an inquiry and return its id
    pub async fn record(&self, inquiry: &Inquiry) -> Result<Uuid, InquiryError> {
        let quantity = i32::try_from(inquiry.quantity)
            .map_err(|_| InquiryError::InvalidInput(format!("quantity {} too large", inquiry.quantity)))?;

        let query = r#"
            INSERT INTO inquiries (id, supplier_id, product_id, buyer_name, buyer_email, quantity, message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        "#;

        sqlx::query(query)
            .bind(inquiry.id)
            .bind(&inquiry.supplier_id)
            .bind(&inquiry.product_id)
            .bind(&inquiry.buyer_name)
            .bind(&inquiry.buyer_email)
            .bind(quantity)
            .bind(&inquiry.message)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            "Recorded inquiry {} for supplier {} (product {})",
            inquiry.id,
            inquiry.supplier_id,
            inquiry.product_id
        );

        Ok(inquiry.id)
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, InquiryError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
