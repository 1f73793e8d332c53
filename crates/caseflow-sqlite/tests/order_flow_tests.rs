//! Order Flow Integration Tests
//!
//! Drives a small order-placement domain through the full lifecycle against
//! a real SQLite database:
//! - Creating an order persists it and sends a confirmation exactly once,
//!   only after the order row exists
//! - Validation failures leave no rows behind
//! - A dependency's unique-constraint violation rolls the parent back too
//! - Disabling the transaction mode loses that atomicity, visibly

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use caseflow_core::{
    ExecutionContext, Persist, TransactionMode, TransactionRunner, UseCase, UseCaseError,
    UseCaseState,
};
use caseflow_sqlite::{open, runner_for, SharedConnection};

struct OrderStore {
    conn: SharedConnection,
}

impl OrderStore {
    async fn insert(&self, customer_email: &str, total_cents: i64) -> Result<i64, UseCaseError> {
        let mut conn = self.conn.lock().await;
        let result = sqlx::query("INSERT INTO orders (customer_email, total_cents) VALUES (?, ?)")
            .bind(customer_email)
            .bind(total_cents)
            .execute(&mut *conn)
            .await
            .map_err(|e| UseCaseError::commit(format!("failed to insert order: {e}")))?;
        Ok(result.last_insert_rowid())
    }

    async fn count(&self) -> Result<i64, UseCaseError> {
        let mut conn = self.conn.lock().await;
        sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| UseCaseError::commit(format!("failed to count orders: {e}")))
    }
}

struct EmailStore {
    conn: SharedConnection,
}

impl EmailStore {
    async fn insert(&self, recipient: &str) -> Result<(), UseCaseError> {
        let mut conn = self.conn.lock().await;
        sqlx::query("INSERT INTO confirmation_emails (recipient) VALUES (?)")
            .bind(recipient)
            .execute(&mut *conn)
            .await
            .map(|_| ())
            .map_err(|e| UseCaseError::commit(format!("failed to queue confirmation: {e}")))
    }

    async fn count(&self) -> Result<i64, UseCaseError> {
        let mut conn = self.conn.lock().await;
        sqlx::query_scalar("SELECT COUNT(*) FROM confirmation_emails")
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| UseCaseError::commit(format!("failed to count confirmations: {e}")))
    }
}

/// Observes the confirmation side effect from outside the cascade.
#[derive(Default)]
struct EmailProbe {
    sent: AtomicU32,
    orders_at_send: AtomicI64,
}

/// An order built during preparation and saved during commit.
struct PendingOrder {
    customer_email: String,
    total_cents: i64,
    id: Option<i64>,
    store: Arc<OrderStore>,
}

impl std::fmt::Debug for PendingOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingOrder")
            .field("customer_email", &self.customer_email)
            .field("total_cents", &self.total_cents)
            .field("id", &self.id)
            .finish()
    }
}

#[async_trait]
impl Persist for PendingOrder {
    async fn persist(&mut self) -> Result<(), UseCaseError> {
        let id = self
            .store
            .insert(&self.customer_email, self.total_cents)
            .await?;
        self.id = Some(id);
        Ok(())
    }
}

/// A confirmation row written in the same transaction as the order.
struct OutgoingEmail {
    recipient: String,
    store: Arc<EmailStore>,
}

#[async_trait]
impl Persist for OutgoingEmail {
    async fn persist(&mut self) -> Result<(), UseCaseError> {
        self.store.insert(&self.recipient).await
    }
}

struct SendConfirmationEmail {
    state: UseCaseState<OutgoingEmail>,
    recipient: String,
    emails: Arc<EmailStore>,
    orders: Arc<OrderStore>,
    probe: Arc<EmailProbe>,
}

impl SendConfirmationEmail {
    fn new(
        recipient: String,
        context: ExecutionContext,
        runner: Arc<dyn TransactionRunner>,
        emails: Arc<EmailStore>,
        orders: Arc<OrderStore>,
        probe: Arc<EmailProbe>,
    ) -> Self {
        Self {
            state: UseCaseState::new(context, runner),
            recipient,
            emails,
            orders,
            probe,
        }
    }
}

#[async_trait]
impl UseCase for SendConfirmationEmail {
    type Model = OutgoingEmail;

    fn state(&self) -> &UseCaseState<OutgoingEmail> {
        &self.state
    }

    fn state_mut(&mut self) -> &mut UseCaseState<OutgoingEmail> {
        &mut self.state
    }

    async fn on_prepare(&mut self) -> Result<(), UseCaseError> {
        if self.recipient.trim().is_empty() {
            return Err(UseCaseError::validation(
                "RECIPIENT_REQUIRED",
                "Confirmation recipient is required",
            ));
        }
        self.state.set_model(OutgoingEmail {
            recipient: self.recipient.clone(),
            store: Arc::clone(&self.emails),
        });
        Ok(())
    }

    async fn on_after_commit(&mut self) -> Result<(), UseCaseError> {
        // deliverability is observable only once the order row is durable
        let orders = self.orders.count().await?;
        self.probe.orders_at_send.store(orders, Ordering::SeqCst);
        self.probe.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone)]
struct OrderParams {
    customer_email: String,
    total_cents: i64,
}

struct CreateOrder {
    state: UseCaseState<PendingOrder>,
    params: OrderParams,
    orders: Arc<OrderStore>,
    emails: Arc<EmailStore>,
    probe: Arc<EmailProbe>,
}

impl CreateOrder {
    fn new(
        params: OrderParams,
        context: ExecutionContext,
        runner: Arc<dyn TransactionRunner>,
        orders: Arc<OrderStore>,
        emails: Arc<EmailStore>,
        probe: Arc<EmailProbe>,
    ) -> Self {
        Self {
            state: UseCaseState::new(context, runner),
            params,
            orders,
            emails,
            probe,
        }
    }
}

#[async_trait]
impl UseCase for CreateOrder {
    type Model = PendingOrder;

    fn state(&self) -> &UseCaseState<PendingOrder> {
        &self.state
    }

    fn state_mut(&mut self) -> &mut UseCaseState<PendingOrder> {
        &mut self.state
    }

    async fn on_prepare(&mut self) -> Result<(), UseCaseError> {
        let customer_email = self.params.customer_email.trim().to_string();
        if customer_email.is_empty() {
            return Err(UseCaseError::validation(
                "EMAIL_REQUIRED",
                "Customer email is required",
            ));
        }
        if self.params.total_cents <= 0 {
            return Err(UseCaseError::validation(
                "TOTAL_INVALID",
                "Order total must be positive",
            ));
        }

        self.state.set_model(PendingOrder {
            customer_email: customer_email.clone(),
            total_cents: self.params.total_cents,
            id: None,
            store: Arc::clone(&self.orders),
        });

        let context = self
            .state
            .context()
            .with_causation(self.state.context().execution_id.clone());
        let mut confirmation = SendConfirmationEmail::new(
            customer_email,
            context,
            Arc::clone(self.state.transaction()),
            Arc::clone(&self.emails),
            Arc::clone(&self.orders),
            Arc::clone(&self.probe),
        );
        confirmation.prepare().await?;
        self.state.register_dependency(confirmation);
        Ok(())
    }
}

struct Harness {
    orders: Arc<OrderStore>,
    emails: Arc<EmailStore>,
    probe: Arc<EmailProbe>,
    runner: Arc<dyn TransactionRunner>,
    conn: SharedConnection,
}

async fn harness(mode: TransactionMode) -> Harness {
    let conn = open("sqlite::memory:").await.unwrap();
    {
        let mut c = conn.lock().await;
        sqlx::query(
            "CREATE TABLE orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_email TEXT NOT NULL,
                total_cents INTEGER NOT NULL
            )",
        )
        .execute(&mut *c)
        .await
        .unwrap();
        sqlx::query(
            "CREATE TABLE confirmation_emails (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recipient TEXT NOT NULL UNIQUE
            )",
        )
        .execute(&mut *c)
        .await
        .unwrap();
    }

    Harness {
        orders: Arc::new(OrderStore { conn: Arc::clone(&conn) }),
        emails: Arc::new(EmailStore { conn: Arc::clone(&conn) }),
        probe: Arc::new(EmailProbe::default()),
        runner: runner_for(mode, Arc::clone(&conn)),
        conn,
    }
}

fn order_params(email: &str) -> OrderParams {
    OrderParams {
        customer_email: email.to_string(),
        total_cents: 2500,
    }
}

#[tokio::test]
async fn test_call_persists_order_and_sends_confirmation_once() {
    let h = harness(TransactionMode::Required).await;

    let usecase = CreateOrder::new(
        order_params("buyer@example.com"),
        ExecutionContext::create("user-42"),
        Arc::clone(&h.runner),
        Arc::clone(&h.orders),
        Arc::clone(&h.emails),
        Arc::clone(&h.probe),
    );
    let order = usecase.execute().await.unwrap().unwrap();

    assert!(order.id.is_some());
    assert_eq!(h.orders.count().await.unwrap(), 1);
    assert_eq!(h.emails.count().await.unwrap(), 1);

    // confirmation ran exactly once, after the order row existed
    assert_eq!(h.probe.sent.load(Ordering::SeqCst), 1);
    assert_eq!(h.probe.orders_at_send.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_validation_failure_leaves_no_rows() {
    let h = harness(TransactionMode::Required).await;

    let usecase = CreateOrder::new(
        order_params("   "),
        ExecutionContext::create("user-42"),
        Arc::clone(&h.runner),
        Arc::clone(&h.orders),
        Arc::clone(&h.emails),
        Arc::clone(&h.probe),
    );
    let err = usecase.execute().await.unwrap_err();

    assert_eq!(err.code(), "EMAIL_REQUIRED");
    assert_eq!(h.orders.count().await.unwrap(), 0);
    assert_eq!(h.emails.count().await.unwrap(), 0);
    assert_eq!(h.probe.sent.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_dependency_unique_violation_rolls_back_parent() {
    let h = harness(TransactionMode::Required).await;

    // a confirmation for this recipient already exists
    {
        let mut c = h.conn.lock().await;
        sqlx::query("INSERT INTO confirmation_emails (recipient) VALUES ('buyer@example.com')")
            .execute(&mut *c)
            .await
            .unwrap();
    }

    let usecase = CreateOrder::new(
        order_params("buyer@example.com"),
        ExecutionContext::create("user-42"),
        Arc::clone(&h.runner),
        Arc::clone(&h.orders),
        Arc::clone(&h.emails),
        Arc::clone(&h.probe),
    );
    let err = usecase.execute().await.unwrap_err();

    assert_eq!(err.code(), "COMMIT_FAILED");
    // the parent's own insert was rolled back with the dependency's
    assert_eq!(h.orders.count().await.unwrap(), 0);
    assert_eq!(h.emails.count().await.unwrap(), 1);
    assert_eq!(h.probe.sent.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_disabled_mode_loses_atomicity() {
    let h = harness(TransactionMode::Disabled).await;

    {
        let mut c = h.conn.lock().await;
        sqlx::query("INSERT INTO confirmation_emails (recipient) VALUES ('buyer@example.com')")
            .execute(&mut *c)
            .await
            .unwrap();
    }

    let usecase = CreateOrder::new(
        order_params("buyer@example.com"),
        ExecutionContext::create("user-42"),
        Arc::clone(&h.runner),
        Arc::clone(&h.orders),
        Arc::clone(&h.emails),
        Arc::clone(&h.probe),
    );
    let err = usecase.execute().await.unwrap_err();

    assert_eq!(err.code(), "COMMIT_FAILED");
    // without a transaction scope the parent's write survives the failure
    assert_eq!(h.orders.count().await.unwrap(), 1);
    assert_eq!(h.probe.sent.load(Ordering::SeqCst), 0);
}
