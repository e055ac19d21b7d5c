//! Per-organization provider credentials.

use secrecy::SecretString;

/// Keys an organization configured for one provider.
///
/// What each field means depends on the provider:
///
/// | provider    | `public_key`          | `integrity_secret`     |
/// |-------------|-----------------------|------------------------|
/// | Wompi       | public key            | events secret          |
/// | ePayco      | `p_cust_id_cliente`   | `p_key`                |
/// | Meta Cloud  | app id                | app secret / webhook secret |
#[derive(Debug, Clone)]
pub struct ProviderCredentials {
    pub public_key: String,
    pub private_key: SecretString,
    pub integrity_secret: Option<SecretString>,
    /// Sandbox keys. Only surfaced in logs.
    pub is_test_mode: bool,
}

impl ProviderCredentials {
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: SecretString::new(private_key.into()),
            integrity_secret: None,
            is_test_mode: false,
        }
    }

    pub fn with_integrity_secret(mut self, secret: impl Into<String>) -> Self {
        self.integrity_secret = Some(SecretString::new(secret.into()));
        self
    }
}
