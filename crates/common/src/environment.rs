//! Cloud environment definitions
//!
//! An environment names the endpoint set every other component talks to:
//! the authority host used for token acquisition and the resource manager
//! endpoint used for tenant/subscription discovery. The three sovereign
//! clouds are built in; air-gapped stacks can be described in a small TOML
//! file and loaded with [`CloudEnvironment::from_toml_file`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A named set of cloud endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudEnvironment {
    /// Environment name, e.g. "AzureCloud"
    pub name: String,
    /// Authority host for token acquisition
    pub authority_host: String,
    /// Resource manager endpoint for discovery/listing calls
    pub resource_manager_endpoint: String,
}

impl CloudEnvironment {
    /// The global public cloud.
    pub fn public() -> Self {
        Self {
            name: "AzureCloud".into(),
            authority_host: "https://login.microsoftonline.com".into(),
            resource_manager_endpoint: "https://management.azure.com".into(),
        }
    }

    /// The China sovereign cloud.
    pub fn china() -> Self {
        Self {
            name: "AzureChinaCloud".into(),
            authority_host: "https://login.chinacloudapi.cn".into(),
            resource_manager_endpoint: "https://management.chinacloudapi.cn".into(),
        }
    }

    /// The US government sovereign cloud.
    pub fn us_government() -> Self {
        Self {
            name: "AzureUSGovernment".into(),
            authority_host: "https://login.microsoftonline.us".into(),
            resource_manager_endpoint: "https://management.usgovcloudapi.net".into(),
        }
    }

    /// Look up a built-in environment by name (case-insensitive).
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "azurecloud" | "azure" => Ok(Self::public()),
            "azurechinacloud" | "azurechina" => Ok(Self::china()),
            "azureusgovernment" | "azureusgovernmentcloud" => Ok(Self::us_government()),
            other => Err(Error::Environment(format!(
                "unknown environment name: {other}"
            ))),
        }
    }

    /// Parse a custom environment from TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let environment: Self = toml::from_str(contents)?;
        environment.validate()?;
        Ok(environment)
    }

    /// Load a custom environment definition from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Default token scope for the resource manager API.
    pub fn management_scope(&self) -> String {
        format!(
            "{}/.default",
            self.resource_manager_endpoint.trim_end_matches('/')
        )
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Environment("environment name is empty".into()));
        }
        for (field, value) in [
            ("authority_host", &self.authority_host),
            ("resource_manager_endpoint", &self.resource_manager_endpoint),
        ] {
            if !value.starts_with("https://") {
                return Err(Error::Environment(format!(
                    "{field} must be an https URL, got: {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for CloudEnvironment {
    fn default() -> Self {
        Self::public()
    }
}
