//! Order notification service
//!
//! Composes and dispatches the order lifecycle emails: new order (to the
//! yard), shipped and ready-for-pickup (to the buyer). Every send is
//! best-effort — a notification failure is logged and recorded, never
//! surfaced to the flow that triggered it.

use sqlx::PgPool;
use uuid::Uuid;

use crate::external::MailerClient;

/// Order notification service
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
    mailer: Option<MailerClient>,
    orders_address: String,
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(db: PgPool, mailer: Option<MailerClient>, orders_address: String) -> Self {
        Self {
            db,
            mailer,
            orders_address,
        }
    }

    /// Notify the yard that a paid order has come in.
    pub async fn notify_new_order(&self, order_id: Uuid, customer_name: &str, total_cents: i64) {
        let subject = format!("New order {}", order_id);
        let body = format!(
            "Order {} from {} has been paid.\nTotal: ${}.\nOpen the admin to pick and pack it.",
            order_id,
            customer_name,
            shared::types::cents_to_decimal(total_cents)
        );
        let to = self.orders_address.clone();
        self.dispatch(order_id, "new_order", &to, &subject, &body).await;
    }

    /// Tell the buyer their order is on its way.
    pub async fn notify_shipped(
        &self,
        order_id: Uuid,
        email: &str,
        tracking_number: &str,
        carrier: &str,
    ) {
        let subject = format!("Your order {} has shipped", order_id);
        let body = format!(
            "Good news - your order is on its way.\nCarrier: {}\nTracking number: {}",
            carrier, tracking_number
        );
        self.dispatch(order_id, "shipped", email, &subject, &body).await;
    }

    /// Tell the buyer their order is ready to collect from the yard.
    pub async fn notify_ready_for_pickup(&self, order_id: Uuid, email: &str) {
        let subject = format!("Your order {} is ready for pickup", order_id);
        let body =
            "Your order is ready to collect. Bring your order number and photo ID.".to_string();
        self.dispatch(order_id, "ready_for_pickup", email, &subject, &body)
            .await;
    }

    /// Send and log one notification. Failures are swallowed by design.
    async fn dispatch(&self, order_id: Uuid, kind: &str, to: &str, subject: &str, body: &str) {
        let outcome = match &self.mailer {
            Some(mailer) => mailer.send(to, subject, body).await,
            None => Err("mailer not configured".to_string()),
        };

        let (status, error) = match &outcome {
            Ok(()) => ("sent", None),
            Err(e) => {
                tracing::warn!(order_id = %order_id, kind, error = %e, "Order notification failed");
                ("failed", Some(e.clone()))
            }
        };

        let logged = sqlx::query(
            r#"
            INSERT INTO notification_log (order_id, kind, recipient, status, error_message)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order_id)
        .bind(kind)
        .bind(to)
        .bind(status)
        .bind(error)
        .execute(&self.db)
        .await;

        if let Err(e) = logged {
            tracing::warn!(order_id = %order_id, kind, error = %e, "Failed to record notification log entry");
        }
    }
}
