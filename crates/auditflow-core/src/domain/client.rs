//! Client profiles
//!
//! A client is a firm or entity whose compliance profile (type, size and
//! fiscal year) selects the template a workflow is generated from.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::CoreError;

static FISCAL_YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^FY (\d{4})-(\d{2})$").expect("fiscal year pattern is valid"));

/// Value object: Client ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        ClientId(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compliance regime the client is engaged for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientType {
    /// Goods and Services Tax compliance
    #[serde(rename = "GST")]
    Gst,
    /// Income tax return preparation
    #[serde(rename = "ITR")]
    Itr,
    /// Statutory company audit
    #[serde(rename = "CompanyAudit")]
    CompanyAudit,
}

impl ClientType {
    /// Wire spelling of the variant
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientType::Gst => "GST",
            ClientType::Itr => "ITR",
            ClientType::CompanyAudit => "CompanyAudit",
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GST" => Ok(ClientType::Gst),
            "ITR" => Ok(ClientType::Itr),
            "CompanyAudit" => Ok(ClientType::CompanyAudit),
            other => Err(CoreError::ValidationError(format!(
                "Unknown client_type '{}', expected one of GST, ITR, CompanyAudit",
                other
            ))),
        }
    }
}

/// Size bracket of the client's business
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusinessSize {
    /// Small business
    Small,
    /// Medium business
    Medium,
    /// Large business
    Large,
    /// Enterprise; recognised, but the built-in catalog has no templates for it
    Enterprise,
}

impl BusinessSize {
    /// Wire spelling of the variant
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessSize::Small => "small",
            BusinessSize::Medium => "medium",
            BusinessSize::Large => "large",
            BusinessSize::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for BusinessSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BusinessSize {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" => Ok(BusinessSize::Small),
            "medium" => Ok(BusinessSize::Medium),
            "large" => Ok(BusinessSize::Large),
            "enterprise" => Ok(BusinessSize::Enterprise),
            other => Err(CoreError::ValidationError(format!(
                "Unknown business_size '{}', expected one of small, medium, large, enterprise",
                other
            ))),
        }
    }
}

/// Fiscal year in the form `FY 2024-25`
///
/// The two-digit suffix must be the year following the four-digit start year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FiscalYear(String);

impl FiscalYear {
    /// Parse and validate a fiscal year label
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        let invalid = || {
            CoreError::ValidationError(format!(
                "Invalid fiscal_year '{}', expected format 'FY yyyy-yy'",
                value
            ))
        };

        let captures = FISCAL_YEAR_PATTERN.captures(value).ok_or_else(invalid)?;
        let start: u32 = captures[1].parse().map_err(|_| invalid())?;
        let end: u32 = captures[2].parse().map_err(|_| invalid())?;

        if (start + 1) % 100 != end {
            return Err(CoreError::ValidationError(format!(
                "Invalid fiscal_year '{}': year {} must be followed by {:02}",
                value,
                start,
                (start + 1) % 100
            )));
        }

        Ok(FiscalYear(value.to_string()))
    }

    /// The label as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FiscalYear {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FiscalYear::parse(&value)
    }
}

impl From<FiscalYear> for String {
    fn from(value: FiscalYear) -> Self {
        value.0
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregate: a registered client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Unique identifier
    pub id: ClientId,

    /// Display name
    pub name: String,

    /// Compliance regime
    pub client_type: ClientType,

    /// Business size bracket
    pub business_size: BusinessSize,

    /// Fiscal year the engagement covers
    pub fiscal_year: FiscalYear,

    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

/// Unvalidated registration request
///
/// Fields are kept as raw strings so that unknown enum values surface as
/// validation errors rather than deserialization failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterClient {
    /// Display name
    #[serde(default)]
    pub name: String,

    /// One of `GST`, `ITR`, `CompanyAudit`
    #[serde(default)]
    pub client_type: String,

    /// One of `small`, `medium`, `large`, `enterprise`
    #[serde(default)]
    pub business_size: String,

    /// Fiscal year, e.g. `FY 2024-25`
    #[serde(default)]
    pub fiscal_year: String,
}

impl RegisterClient {
    /// Convenience constructor
    pub fn new(
        name: impl Into<String>,
        client_type: impl Into<String>,
        business_size: impl Into<String>,
        fiscal_year: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            client_type: client_type.into(),
            business_size: business_size.into(),
            fiscal_year: fiscal_year.into(),
        }
    }

    /// Validate every field and build a new client with a fresh id
    ///
    /// All problems are reported together, separated by `; `.
    pub fn into_client(self) -> Result<Client, CoreError> {
        let mut problems = Vec::new();

        let name = self.name.trim().to_string();
        if name.is_empty() {
            problems.push("name must not be empty".to_string());
        }

        let client_type = self
            .client_type
            .parse::<ClientType>()
            .map_err(|e| problems.push(validation_message(e)))
            .ok();
        let business_size = self
            .business_size
            .parse::<BusinessSize>()
            .map_err(|e| problems.push(validation_message(e)))
            .ok();
        let fiscal_year = FiscalYear::parse(&self.fiscal_year)
            .map_err(|e| problems.push(validation_message(e)))
            .ok();

        match (client_type, business_size, fiscal_year) {
            (Some(client_type), Some(business_size), Some(fiscal_year)) if problems.is_empty() => {
                Ok(Client {
                    id: ClientId::generate(),
                    name,
                    client_type,
                    business_size,
                    fiscal_year,
                    created_at: Utc::now(),
                })
            }
            _ => Err(CoreError::ValidationError(problems.join("; "))),
        }
    }
}

fn validation_message(err: CoreError) -> String {
    match err {
        CoreError::ValidationError(msg) => msg,
        other => other.to_string(),
    }
}
