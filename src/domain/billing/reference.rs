//! Payment references: the opaque strings handed to a provider when a
//! payment is initiated and echoed back in every webhook for it.
//!
//! Subscription references embed a short form of the subscription id:
//! `SUB-{first 8 chars of id}-{unix millis}-{random suffix}`. Order
//! references carry no structure the webhook side relies on; they are
//! stored on the order at initiation and matched by equality.

use std::fmt;

use uuid::Uuid;

use crate::domain::foundation::{OrderId, SubscriptionId, Timestamp, ValidationError};

const SUBSCRIPTION_PREFIX: &str = "SUB-";
const ORDER_PREFIX: &str = "ORD-";
const SHORT_ID_LEN: usize = 8;
const SUFFIX_LEN: usize = 4;

/// Parsed `SUB-...` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionReference {
    short_id: String,
    issued_at: String,
    suffix: String,
}

impl SubscriptionReference {
    /// Returns true if the string uses the subscription encoding at all.
    pub fn is_subscription_reference(reference: &str) -> bool {
        reference.starts_with(SUBSCRIPTION_PREFIX)
    }

    /// Parses a subscription reference.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidFormat` if the prefix, short id,
    /// timestamp or suffix segment is malformed.
    pub fn parse(reference: &str) -> Result<Self, ValidationError> {
        let body = reference
            .strip_prefix(SUBSCRIPTION_PREFIX)
            .ok_or_else(|| ValidationError::invalid_format("reference", "missing SUB- prefix"))?;

        let mut parts = body.splitn(3, '-');
        let (Some(short_id), Some(issued_at), Some(suffix)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(ValidationError::invalid_format(
                "reference",
                "expected SUB-{id}-{timestamp}-{suffix}",
            ));
        };

        if short_id.len() != SHORT_ID_LEN || !short_id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::invalid_format(
                "reference",
                "short id must be 8 hex characters",
            ));
        }
        if issued_at.is_empty() || !issued_at.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::invalid_format(
                "reference",
                "timestamp segment must be numeric",
            ));
        }
        if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::invalid_format(
                "reference",
                "suffix must be alphanumeric",
            ));
        }

        Ok(Self {
            short_id: short_id.to_ascii_lowercase(),
            issued_at: issued_at.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// Builds a fresh reference for a subscription charge.
    pub fn generate(subscription_id: &SubscriptionId, now: Timestamp) -> Self {
        let random = Uuid::new_v4().simple().to_string();
        Self {
            short_id: subscription_id.short_id(),
            issued_at: now.as_unix_millis().to_string(),
            suffix: random[..SUFFIX_LEN].to_string(),
        }
    }

    /// Lowercase 8-character prefix of the subscription id.
    pub fn short_id(&self) -> &str {
        &self.short_id
    }

    /// Exact check of a loaded subscription against this reference.
    ///
    /// The short id is lossy; callers must run every candidate through this
    /// instead of trusting the lookup that produced it.
    pub fn matches(&self, subscription_id: &SubscriptionId) -> bool {
        subscription_id.short_id() == self.short_id
    }
}

impl fmt::Display for SubscriptionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}-{}-{}",
            SUBSCRIPTION_PREFIX, self.short_id, self.issued_at, self.suffix
        )
    }
}

/// Reference stored on an order when its payment is initiated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderReference(String);

impl OrderReference {
    /// Wraps a reference echoed back by a provider.
    pub fn new(reference: impl Into<String>) -> Result<Self, ValidationError> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return Err(ValidationError::empty_field("reference"));
        }
        Ok(Self(reference))
    }

    /// Builds a unique reference for a new order payment attempt.
    pub fn generate(order_id: &OrderId, now: Timestamp) -> Self {
        Self(format!(
            "{}{}-{}",
            ORDER_PREFIX,
            order_id.as_uuid().simple(),
            now.as_unix_millis()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
