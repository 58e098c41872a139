use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Transport security for one domain entry, mapped from configuration text.
///
/// The textual value must resolve explicitly. A value outside the accepted
/// vocabulary is carried as `Invalid` so that a typo can never pick plaintext
/// or TLS on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Secure {
    Tls,
    Plain,
    Invalid(String),
}

impl Secure {
    /// Exhaustive mapping from the INI boolean vocabulary.
    pub fn from_config(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Secure::Tls,
            "false" | "no" | "off" | "0" => Secure::Plain,
            _ => Secure::Invalid(raw.to_string()),
        }
    }
}

/// Connection parameters for one mail domain, immutable for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainParams {
    pub host: String,
    pub port: u16,
    pub secure: Secure,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "imap-host")]
    imap_host: String,
    port: u16,
    secure: String,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("cannot read domains file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse domains file {path}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Per-domain connection table, keyed by exact domain string.
///
/// Lookups never fail the run: a miss is the caller's `UnknownDomain`
/// outcome, and an unresolved `secure` value surfaces later as
/// `InvalidDomainConfig`.
pub struct DomainRegistry {
    entries: HashMap<String, DomainParams>,
}

impl DomainRegistry {
    /// Load the TOML table from disk. Failure here is fatal: without the
    /// table no record can be verified, so the run must not start.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let text = fs::read_to_string(path).map_err(|source| RegistryError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| RegistryError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let raw: HashMap<String, RawEntry> = toml::from_str(text)?;
        let entries = raw
            .into_iter()
            .map(|(domain, e)| {
                let params = DomainParams {
                    host: e.imap_host,
                    port: e.port,
                    secure: Secure::from_config(&e.secure),
                };
                (domain, params)
            })
            .collect();
        Ok(Self { entries })
    }

    /// Exact-key lookup; no wildcard or subdomain matching.
    pub fn resolve(&self, domain: &str) -> Option<&DomainParams> {
        self.entries.get(domain)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_vocabulary_is_exhaustive() {
        for raw in ["true", "TRUE", "yes", "On", "1"] {
            assert_eq!(Secure::from_config(raw), Secure::Tls, "{raw}");
        }
        for raw in ["false", "No", "OFF", "0"] {
            assert_eq!(Secure::from_config(raw), Secure::Plain, "{raw}");
        }
        assert_eq!(
            Secure::from_config("enabled"),
            Secure::Invalid("enabled".into())
        );
        assert_eq!(Secure::from_config(""), Secure::Invalid("".into()));
    }
}
