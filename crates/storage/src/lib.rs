use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    domain::{
        DeliveryId, DeliverymanId, FileId, NotificationId, ProblemId, RecipientId, UserId,
    },
    protocol::{DeliverymanContact, RecipientSummary},
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredDeliveryman {
    pub id: DeliverymanId,
    pub name: String,
    pub email: String,
    pub avatar_id: Option<FileId>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct DeliverymanChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_id: Option<FileId>,
}

#[derive(Debug, Clone)]
pub struct StoredDelivery {
    pub id: DeliveryId,
    pub product: String,
    pub deliveryman_id: Option<DeliverymanId>,
    pub signature_id: Option<FileId>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub recipient: Option<RecipientSummary>,
    pub deliveryman: Option<DeliverymanContact>,
}

impl StoredDelivery {
    pub fn is_finished(&self) -> bool {
        shared::domain::is_finished(self.end_date, self.signature_id)
    }
}

#[derive(Debug, Clone)]
pub struct StoredProblem {
    pub id: ProblemId,
    pub delivery_id: DeliveryId,
    pub deliveryman_id: Option<DeliverymanId>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredProblemListing {
    pub id: ProblemId,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub product: String,
    pub recipient: Option<RecipientSummary>,
    pub deliveryman: Option<DeliverymanContact>,
}

#[derive(Debug, Clone, Default)]
pub struct NewRecipient {
    pub name: String,
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StoredNotification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

const DELIVERY_SELECT: &str = "SELECT d.id, d.product, d.deliveryman_id, d.signature_id,
        d.canceled_at, d.start_date, d.end_date,
        r.id AS recipient_id, r.name AS recipient_name,
        m.id AS courier_id, m.name AS courier_name, m.email AS courier_email
     FROM deliveries d
     LEFT JOIN recipients r ON r.id = d.recipient_id
     LEFT JOIN deliverymen m ON m.id = d.deliveryman_id";

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to apply database migrations")?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_user(&self, name: &str, email: &str, administrator: bool) -> Result<UserId> {
        let now = Utc::now();
        let rec = sqlx::query(
            "INSERT INTO users (name, email, administrator, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(email) DO UPDATE SET name = excluded.name,
                administrator = excluded.administrator, updated_at = excluded.updated_at
             RETURNING id",
        )
        .bind(name)
        .bind(email)
        .bind(administrator)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to create user '{email}'"))?;
        Ok(UserId(rec.get::<i64, _>(0)))
    }

    /// The administrator with the lowest id, if any.
    pub async fn first_administrator(&self) -> Result<Option<UserId>> {
        let row = sqlx::query("SELECT id FROM users WHERE administrator = 1 ORDER BY id LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| UserId(r.get::<i64, _>(0))))
    }

    pub async fn create_recipient(&self, recipient: &NewRecipient) -> Result<RecipientId> {
        let now = Utc::now();
        let rec = sqlx::query(
            "INSERT INTO recipients (name, street, number, complement, state, city, zip_code, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             RETURNING id",
        )
        .bind(&recipient.name)
        .bind(&recipient.street)
        .bind(&recipient.number)
        .bind(&recipient.complement)
        .bind(&recipient.state)
        .bind(&recipient.city)
        .bind(&recipient.zip_code)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(RecipientId(rec.get::<i64, _>(0)))
    }

    pub async fn create_delivery(
        &self,
        product: &str,
        recipient_id: RecipientId,
        deliveryman_id: Option<DeliverymanId>,
    ) -> Result<DeliveryId> {
        let now = Utc::now();
        let rec = sqlx::query(
            "INSERT INTO deliveries (product, recipient_id, deliveryman_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             RETURNING id",
        )
        .bind(product)
        .bind(recipient_id.0)
        .bind(deliveryman_id.map(|id| id.0))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(DeliveryId(rec.get::<i64, _>(0)))
    }

    pub async fn assign_delivery(
        &self,
        delivery_id: DeliveryId,
        deliveryman_id: DeliverymanId,
    ) -> Result<bool> {
        let affected =
            sqlx::query("UPDATE deliveries SET deliveryman_id = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(deliveryman_id.0)
                .bind(Utc::now())
                .bind(delivery_id.0)
                .execute(&self.pool)
                .await?
                .rows_affected();
        Ok(affected > 0)
    }

    pub async fn start_delivery(&self, delivery_id: DeliveryId, at: DateTime<Utc>) -> Result<bool> {
        let affected =
            sqlx::query("UPDATE deliveries SET start_date = ?1, updated_at = ?1 WHERE id = ?2")
                .bind(at)
                .bind(delivery_id.0)
                .execute(&self.pool)
                .await?
                .rows_affected();
        Ok(affected > 0)
    }

    pub async fn finish_delivery(
        &self,
        delivery_id: DeliveryId,
        signature_id: FileId,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let affected = sqlx::query(
            "UPDATE deliveries SET end_date = ?1, signature_id = ?2, updated_at = ?1 WHERE id = ?3",
        )
        .bind(at)
        .bind(signature_id.0)
        .bind(delivery_id.0)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected > 0)
    }

    pub async fn load_delivery(&self, delivery_id: DeliveryId) -> Result<Option<StoredDelivery>> {
        let row = sqlx::query(&format!("{DELIVERY_SELECT} WHERE d.id = ?1"))
            .bind(delivery_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| stored_delivery_from_row(&r)))
    }

    pub async fn delivery_belongs_to(
        &self,
        delivery_id: DeliveryId,
        deliveryman_id: DeliverymanId,
    ) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM deliveries WHERE id = ?1 AND deliveryman_id = ?2")
            .bind(delivery_id.0)
            .bind(deliveryman_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn mark_delivery_canceled(
        &self,
        delivery_id: DeliveryId,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let affected =
            sqlx::query("UPDATE deliveries SET canceled_at = ?1, updated_at = ?1 WHERE id = ?2")
                .bind(at)
                .bind(delivery_id.0)
                .execute(&self.pool)
                .await?
                .rows_affected();
        Ok(affected > 0)
    }

    pub async fn list_deliverymen(&self) -> Result<Vec<StoredDeliveryman>> {
        let rows = sqlx::query("SELECT id, name, email, avatar_id FROM deliverymen ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(stored_deliveryman_from_row).collect())
    }

    pub async fn find_deliveryman(
        &self,
        deliveryman_id: DeliverymanId,
    ) -> Result<Option<StoredDeliveryman>> {
        let row = sqlx::query("SELECT id, name, email, avatar_id FROM deliverymen WHERE id = ?1")
            .bind(deliveryman_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(stored_deliveryman_from_row))
    }

    pub async fn find_deliveryman_by_email(&self, email: &str) -> Result<Option<StoredDeliveryman>> {
        let row =
            sqlx::query("SELECT id, name, email, avatar_id FROM deliverymen WHERE email = ?1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.as_ref().map(stored_deliveryman_from_row))
    }

    pub async fn create_deliveryman(
        &self,
        name: &str,
        email: &str,
        avatar_id: Option<FileId>,
    ) -> Result<StoredDeliveryman> {
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO deliverymen (name, email, avatar_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             RETURNING id, name, email, avatar_id",
        )
        .bind(name)
        .bind(email)
        .bind(avatar_id.map(|id| id.0))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to insert deliveryman '{email}'"))?;
        Ok(stored_deliveryman_from_row(&row))
    }

    pub async fn update_deliveryman(
        &self,
        deliveryman_id: DeliverymanId,
        changes: &DeliverymanChanges,
    ) -> Result<Option<StoredDeliveryman>> {
        let row = sqlx::query(
            "UPDATE deliverymen
             SET name = COALESCE(?1, name),
                 email = COALESCE(?2, email),
                 avatar_id = COALESCE(?3, avatar_id),
                 updated_at = ?4
             WHERE id = ?5
             RETURNING id, name, email, avatar_id",
        )
        .bind(changes.name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.avatar_id.map(|id| id.0))
        .bind(Utc::now())
        .bind(deliveryman_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(stored_deliveryman_from_row))
    }

    pub async fn delete_deliveryman(&self, deliveryman_id: DeliverymanId) -> Result<bool> {
        let affected = sqlx::query("DELETE FROM deliverymen WHERE id = ?1")
            .bind(deliveryman_id.0)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    pub async fn insert_problem(
        &self,
        delivery_id: DeliveryId,
        deliveryman_id: DeliverymanId,
        description: &str,
    ) -> Result<StoredProblem> {
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO delivery_problems (delivery_id, deliveryman_id, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             RETURNING id, delivery_id, deliveryman_id, description, created_at, updated_at",
        )
        .bind(delivery_id.0)
        .bind(deliveryman_id.0)
        .bind(description)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored_problem_from_row(&row))
    }

    pub async fn find_problem(&self, problem_id: ProblemId) -> Result<Option<StoredProblem>> {
        let row = sqlx::query(
            "SELECT id, delivery_id, deliveryman_id, description, created_at, updated_at
             FROM delivery_problems WHERE id = ?1",
        )
        .bind(problem_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(stored_problem_from_row))
    }

    /// Problems ordered by id, optionally restricted to one delivery.
    pub async fn list_problems(
        &self,
        delivery_id: Option<DeliveryId>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<StoredProblemListing>> {
        let rows = sqlx::query(
            "SELECT p.id, p.description, p.created_at, d.product,
                r.id AS recipient_id, r.name AS recipient_name,
                m.id AS courier_id, m.name AS courier_name, m.email AS courier_email
             FROM delivery_problems p
             INNER JOIN deliveries d ON d.id = p.delivery_id
             LEFT JOIN recipients r ON r.id = d.recipient_id
             LEFT JOIN deliverymen m ON m.id = d.deliveryman_id
             WHERE (?1 IS NULL OR p.delivery_id = ?1)
             ORDER BY p.id ASC
             LIMIT ?2 OFFSET ?3",
        )
        .bind(delivery_id.map(|id| id.0))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| StoredProblemListing {
                id: ProblemId(r.get::<i64, _>("id")),
                description: r.get::<String, _>("description"),
                created_at: r.get::<DateTime<Utc>, _>("created_at"),
                product: r.get::<String, _>("product"),
                recipient: recipient_from_row(r),
                deliveryman: courier_from_row(r),
            })
            .collect())
    }

    pub async fn insert_notification(&self, user_id: UserId, content: &str) -> Result<NotificationId> {
        let rec = sqlx::query(
            "INSERT INTO notifications (user_id, content, read, created_at)
             VALUES (?1, ?2, 0, ?3)
             RETURNING id",
        )
        .bind(user_id.0)
        .bind(content)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(NotificationId(rec.get::<i64, _>(0)))
    }

    pub async fn list_notifications(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<StoredNotification>> {
        let rows = sqlx::query(
            "SELECT id, user_id, content, read, created_at
             FROM notifications
             WHERE user_id = ?1
             ORDER BY id DESC
             LIMIT ?2",
        )
        .bind(user_id.0)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| StoredNotification {
                id: NotificationId(r.get::<i64, _>("id")),
                user_id: UserId(r.get::<i64, _>("user_id")),
                content: r.get::<String, _>("content"),
                read: r.get::<bool, _>("read"),
                created_at: r.get::<DateTime<Utc>, _>("created_at"),
            })
            .collect())
    }

    pub async fn mark_notification_read(
        &self,
        notification_id: NotificationId,
        user_id: UserId,
    ) -> Result<bool> {
        let affected = sqlx::query("UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2")
            .bind(notification_id.0)
            .bind(user_id.0)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }
}

fn stored_deliveryman_from_row(r: &SqliteRow) -> StoredDeliveryman {
    StoredDeliveryman {
        id: DeliverymanId(r.get::<i64, _>("id")),
        name: r.get::<String, _>("name"),
        email: r.get::<String, _>("email"),
        avatar_id: r.get::<Option<i64>, _>("avatar_id").map(FileId),
    }
}

fn stored_problem_from_row(r: &SqliteRow) -> StoredProblem {
    StoredProblem {
        id: ProblemId(r.get::<i64, _>("id")),
        delivery_id: DeliveryId(r.get::<i64, _>("delivery_id")),
        deliveryman_id: r.get::<Option<i64>, _>("deliveryman_id").map(DeliverymanId),
        description: r.get::<String, _>("description"),
        created_at: r.get::<DateTime<Utc>, _>("created_at"),
        updated_at: r.get::<DateTime<Utc>, _>("updated_at"),
    }
}

fn stored_delivery_from_row(r: &SqliteRow) -> StoredDelivery {
    StoredDelivery {
        id: DeliveryId(r.get::<i64, _>("id")),
        product: r.get::<String, _>("product"),
        deliveryman_id: r.get::<Option<i64>, _>("deliveryman_id").map(DeliverymanId),
        signature_id: r.get::<Option<i64>, _>("signature_id").map(FileId),
        canceled_at: r.get::<Option<DateTime<Utc>>, _>("canceled_at"),
        start_date: r.get::<Option<DateTime<Utc>>, _>("start_date"),
        end_date: r.get::<Option<DateTime<Utc>>, _>("end_date"),
        recipient: recipient_from_row(r),
        deliveryman: courier_from_row(r),
    }
}

fn recipient_from_row(r: &SqliteRow) -> Option<RecipientSummary> {
    let id = r.get::<Option<i64>, _>("recipient_id")?;
    Some(RecipientSummary {
        id: RecipientId(id),
        name: r.get::<String, _>("recipient_name"),
    })
}

fn courier_from_row(r: &SqliteRow) -> Option<DeliverymanContact> {
    let id = r.get::<Option<i64>, _>("courier_id")?;
    Some(DeliverymanContact {
        id: DeliverymanId(id),
        name: r.get::<String, _>("courier_name"),
        email: r.get::<String, _>("courier_email"),
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
