//! External services that post webhooks to this system.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Payment or messaging provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Wompi,
    Epayco,
    MetaCloud,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Wompi, Provider::Epayco, Provider::MetaCloud];

    /// Stable lowercase name used in URLs and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Wompi => "wompi",
            Provider::Epayco => "epayco",
            Provider::MetaCloud => "meta_cloud",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wompi" => Ok(Provider::Wompi),
            "epayco" => Ok(Provider::Epayco),
            "meta_cloud" | "meta-cloud" | "whatsapp" => Ok(Provider::MetaCloud),
            other => Err(ValidationError::invalid_format(
                "provider",
                format!("unknown provider '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_provider_from_its_own_name() {
        for provider in Provider::ALL {
            assert_eq!(provider.as_str().parse::<Provider>().unwrap(), provider);
        }
    }

    #[test]
    fn parsing_is_case_insensitive() {
        assert_eq!("WOMPI".parse::<Provider>().unwrap(), Provider::Wompi);
        assert_eq!("ePayco".parse::<Provider>().unwrap(), Provider::Epayco);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert!("stripe".parse::<Provider>().is_err());
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&Provider::MetaCloud).unwrap();
        assert_eq!(json, "\"meta_cloud\"");
    }
}
