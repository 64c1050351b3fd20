//! Test doubles shared by the unit tests: an in-memory `ComplaintStore`,
//! canned collaborators and an `AppState` builder.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::complaints::store::{ComplaintFilter, ComplaintStore, ListScope};
use crate::config::Config;
use crate::identity::{IdentityError, IdentityResolver};
use crate::inference::{Classifier, InferenceClient, Prediction};
use crate::models::complaint::{
    Complaint, ComplaintPatch, ComplaintStatus, Message, NewComplaint, SenderRole,
};
use crate::models::user::{AdminMarker, Identity};
use crate::notify::{Notification, Notifier, NotifyError};
use crate::state::AppState;

pub const SERVICE_KEY: &str = "test-service-role-key";

pub fn identity(email: &str) -> Identity {
    Identity {
        id: Uuid::new_v4(),
        email: email.to_string(),
    }
}

pub fn sample_complaint(owner: Option<&Identity>) -> Complaint {
    let now = Utc::now();
    Complaint {
        id: Uuid::new_v4(),
        complaint_text: "My package was delayed by 5 days".to_string(),
        category: "Delayed Delivery".to_string(),
        sentiment: "Negative".to_string(),
        priority: "High".to_string(),
        ai_response: "We apologize for the delay.".to_string(),
        ai_confidence_score: 82,
        ai_explanation: String::new(),
        status: ComplaintStatus::Pending.as_str().to_string(),
        feedback_helpful: None,
        user_id: owner.map(|i| i.id),
        user_email: owner.map(|i| i.email.clone()),
        created_at: now,
        updated_at: now,
    }
}

/// Inserts a sample complaint with a fixed `created_at`.
pub fn seed_complaint(
    store: &MemoryStore,
    owner: Option<&Identity>,
    created_at: DateTime<Utc>,
) -> Complaint {
    let mut complaint = sample_complaint(owner);
    complaint.created_at = created_at;
    complaint.updated_at = created_at;
    store.push(complaint.clone());
    complaint
}

#[derive(Default)]
struct MemoryTables {
    complaints: Vec<Complaint>,
    messages: Vec<Message>,
    admins: Vec<AdminMarker>,
}

/// Insertion-ordered in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<MemoryTables>,
}

impl MemoryStore {
    pub fn push(&self, complaint: Complaint) {
        self.tables.lock().unwrap().complaints.push(complaint);
    }

    pub fn grant_admin(&self, identity: &Identity) {
        self.tables.lock().unwrap().admins.push(AdminMarker {
            user_id: identity.id,
            email: identity.email.clone(),
        });
    }

    pub fn complaint_count(&self) -> usize {
        self.tables.lock().unwrap().complaints.len()
    }
}

#[async_trait]
impl ComplaintStore for MemoryStore {
    async fn insert(&self, new: NewComplaint) -> Result<Complaint, sqlx::Error> {
        let now = Utc::now();
        let complaint = Complaint {
            id: Uuid::new_v4(),
            complaint_text: new.complaint_text,
            category: new.category,
            sentiment: new.sentiment,
            priority: new.priority,
            ai_response: new.ai_response,
            ai_confidence_score: new.ai_confidence_score,
            ai_explanation: new.ai_explanation,
            status: ComplaintStatus::Pending.as_str().to_string(),
            feedback_helpful: None,
            user_id: new.user_id,
            user_email: new.user_email,
            created_at: now,
            updated_at: now,
        };
        self.push(complaint.clone());
        Ok(complaint)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Complaint>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.complaints.iter().find(|c| c.id == id).cloned())
    }

    async fn list(
        &self,
        scope: ListScope,
        filter: &ComplaintFilter,
    ) -> Result<Vec<Complaint>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Complaint> = tables
            .complaints
            .iter()
            .filter(|c| match scope {
                ListScope::All => true,
                ListScope::Owner(user_id) => c.user_id == Some(user_id),
            })
            .filter(|c| matches_filter(filter, c))
            .cloned()
            .collect();
        // Stable sort: equal timestamps keep insertion order.
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn apply_patch(
        &self,
        id: Uuid,
        patch: &ComplaintPatch,
    ) -> Result<Option<Complaint>, sqlx::Error> {
        let mut tables = self.tables.lock().unwrap();
        let Some(row) = tables.complaints.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if patch.conflict_with(row).is_some() {
            return Ok(None);
        }
        if let Some(status) = patch.status_to_write() {
            row.status = status.as_str().to_string();
        }
        if let Some(helpful) = patch.feedback_helpful {
            row.feedback_helpful = Some(helpful);
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn is_admin(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.admins.iter().any(|a| a.user_id == user_id))
    }

    async fn append_message(
        &self,
        complaint_id: Uuid,
        message_text: &str,
        sender_role: SenderRole,
    ) -> Result<Message, sqlx::Error> {
        let message = Message {
            id: Uuid::new_v4(),
            complaint_id,
            message_text: message_text.to_string(),
            sender_role: sender_role.as_str().to_string(),
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, complaint_id: Uuid) -> Result<Vec<Message>, sqlx::Error> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.complaint_id == complaint_id)
            .cloned()
            .collect())
    }
}

fn matches_filter(filter: &ComplaintFilter, complaint: &Complaint) -> bool {
    filter.status.map_or(true, |s| complaint.status == s.as_str())
        && filter
            .category
            .as_deref()
            .map_or(true, |c| complaint.category == c)
        && filter
            .priority
            .as_deref()
            .map_or(true, |p| complaint.priority == p)
}

/// Wraps a `MemoryStore` and yields once after every `find`, so concurrent
/// callers interleave between their read and their write.
#[derive(Default)]
pub struct LaggingReadStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl ComplaintStore for LaggingReadStore {
    async fn insert(&self, new: NewComplaint) -> Result<Complaint, sqlx::Error> {
        self.inner.insert(new).await
    }

    async fn find(&self, id: Uuid) -> Result<Option<Complaint>, sqlx::Error> {
        let row = self.inner.find(id).await;
        tokio::task::yield_now().await;
        row
    }

    async fn list(
        &self,
        scope: ListScope,
        filter: &ComplaintFilter,
    ) -> Result<Vec<Complaint>, sqlx::Error> {
        self.inner.list(scope, filter).await
    }

    async fn apply_patch(
        &self,
        id: Uuid,
        patch: &ComplaintPatch,
    ) -> Result<Option<Complaint>, sqlx::Error> {
        self.inner.apply_patch(id, patch).await
    }

    async fn is_admin(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        self.inner.is_admin(user_id).await
    }

    async fn append_message(
        &self,
        complaint_id: Uuid,
        message_text: &str,
        sender_role: SenderRole,
    ) -> Result<Message, sqlx::Error> {
        self.inner
            .append_message(complaint_id, message_text, sender_role)
            .await
    }

    async fn list_messages(&self, complaint_id: Uuid) -> Result<Vec<Message>, sqlx::Error> {
        self.inner.list_messages(complaint_id).await
    }
}

/// Every operation fails as if the database were unreachable.
pub struct FailingStore;

#[async_trait]
impl ComplaintStore for FailingStore {
    async fn insert(&self, _new: NewComplaint) -> Result<Complaint, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn find(&self, _id: Uuid) -> Result<Option<Complaint>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn list(
        &self,
        _scope: ListScope,
        _filter: &ComplaintFilter,
    ) -> Result<Vec<Complaint>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn apply_patch(
        &self,
        _id: Uuid,
        _patch: &ComplaintPatch,
    ) -> Result<Option<Complaint>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn is_admin(&self, _user_id: Uuid) -> Result<bool, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn append_message(
        &self,
        _complaint_id: Uuid,
        _message_text: &str,
        _sender_role: SenderRole,
    ) -> Result<Message, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn list_messages(&self, _complaint_id: Uuid) -> Result<Vec<Message>, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }
}

pub struct StaticClassifier(pub Prediction);

#[async_trait]
impl Classifier for StaticClassifier {
    async fn classify(&self, _complaint_text: &str) -> Prediction {
        self.0.clone()
    }
}

/// Resolves a fixed set of tokens; everything else is rejected.
#[derive(Default)]
pub struct StaticIdentity {
    tokens: HashMap<String, Identity>,
}

impl StaticIdentity {
    pub fn new<const N: usize>(entries: [(&str, Identity); N]) -> Self {
        Self {
            tokens: entries
                .into_iter()
                .map(|(token, identity)| (token.to_string(), identity))
                .collect(),
        }
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentity {
    async fn resolve(&self, token: &str) -> Result<Identity, IdentityError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(IdentityError::Rejected(401))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Api {
            status: 503,
            message: "mail service down".to_string(),
        })
    }
}

/// Polls until the detached notification task has delivered `count` messages.
pub async fn wait_for_notifications(
    notifier: &RecordingNotifier,
    count: usize,
) -> Vec<Notification> {
    for _ in 0..100 {
        let sent = notifier.sent();
        if sent.len() >= count {
            return sent;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    notifier.sent()
}

/// Builds an `AppState` with offline collaborators: in-memory store, an
/// unconfigured inference client (always fallback), no known tokens.
pub struct TestStateBuilder {
    store: Arc<dyn ComplaintStore>,
    classifier: Arc<dyn Classifier>,
    identity: Arc<dyn IdentityResolver>,
    notifier: Arc<dyn Notifier>,
    config: Config,
}

impl TestStateBuilder {
    pub fn new() -> Self {
        let classifier = InferenceClient::new(None, Duration::from_secs(10))
            .expect("inference client builds without network");
        Self {
            store: Arc::new(MemoryStore::default()),
            classifier: Arc::new(classifier),
            identity: Arc::new(StaticIdentity::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            config: Config::offline(),
        }
    }

    pub fn store(mut self, store: Arc<dyn ComplaintStore>) -> Self {
        self.store = store;
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn identity(mut self, identity: Arc<dyn IdentityResolver>) -> Self {
        self.identity = identity;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn recipient(mut self, recipient: &str) -> Self {
        self.config.notify_recipient = Some(recipient.to_string());
        self
    }

    pub fn service_key(mut self) -> Self {
        self.config.service_role_key = Some(SERVICE_KEY.to_string());
        self
    }

    pub fn build(self) -> AppState {
        AppState {
            store: self.store,
            classifier: self.classifier,
            identity: self.identity,
            notifier: self.notifier,
            config: self.config,
        }
    }
}
