//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(
    /// Tenant that owns orders, subscriptions and provider credentials.
    OrganizationId
);

uuid_id!(
    /// Store order paid through a payment provider.
    OrderId
);

uuid_id!(
    /// Recurring platform subscription.
    SubscriptionId
);

uuid_id!(
    /// Row in the transaction ledger.
    LedgerRowId
);

uuid_id!(
    /// Durable audit record of a received webhook.
    WebhookLogId
);

impl SubscriptionId {
    /// First eight characters of the hyphenated id.
    ///
    /// This is the lossy short form embedded in payment references.
    pub fn short_id(&self) -> String {
        self.0.to_string().chars().take(8).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(OrderId::new(), OrderId::new());
        assert_ne!(SubscriptionId::new(), SubscriptionId::new());
    }

    #[test]
    fn id_round_trips_through_string() {
        let id = OrganizationId::new();
        let parsed: OrganizationId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn id_rejects_garbage() {
        assert!("not-a-uuid".parse::<LedgerRowId>().is_err());
    }

    #[test]
    fn short_id_takes_leading_eight_chars() {
        let uuid = Uuid::parse_str("12345678-9abc-def0-1234-56789abcdef0").unwrap();
        let id = SubscriptionId::from_uuid(uuid);
        assert_eq!(id.short_id(), "12345678");
    }

    #[test]
    fn id_serializes_transparently() {
        let uuid = Uuid::parse_str("12345678-9abc-def0-1234-56789abcdef0").unwrap();
        let json = serde_json::to_string(&OrderId::from_uuid(uuid)).unwrap();
        assert_eq!(json, "\"12345678-9abc-def0-1234-56789abcdef0\"");
    }
}
