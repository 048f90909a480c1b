use async_trait::async_trait;

/// Transactional email collaborator. Fire-and-forget from the engine's point
/// of view: a failed send is logged by the caller and never fails the request
/// that triggered it.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        to: &str,
        template: &str,
        context: &serde_json::Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Mailer that only logs. Used in development and tests; deployments swap in
/// an SMTP-backed implementation.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(
        &self,
        to: &str,
        template: &str,
        _context: &serde_json::Value,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!("Mail '{}' queued for {}", template, to);
        Ok(())
    }
}

/// Object storage collaborator for licence/photo uploads. Accepts a buffer,
/// returns a durable URL; the engine stores only the URL string.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// Storage stand-in that fabricates URLs under a configured base without
/// writing anything.
pub struct MockObjectStorage {
    base_url: String,
}

impl MockObjectStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ObjectStorage for MockObjectStorage {
    async fn put(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let key = uuid::Uuid::new_v4().simple().to_string();
        tracing::info!("Stored {} ({} bytes)", filename, bytes.len());
        Ok(format!("{}/{}/{}", self.base_url, key, filename))
    }
}
