//! Engine configuration, loaded from the environment with defaults.

use transitgate_core::{DomainError, DomainResult, Money};
use transitgate_fares::PassPrices;

pub const ENV_SESSION_COOKIE: &str = "TRANSITGATE_SESSION_COOKIE";
pub const ENV_FALLBACK_ROLE: &str = "TRANSITGATE_FALLBACK_ROLE";
pub const ENV_PASS_CODE_PREFIX: &str = "TRANSITGATE_PASS_CODE_PREFIX";
pub const ENV_MONTHLY_PASS_PRICE: &str = "TRANSITGATE_MONTHLY_PASS_PRICE";
pub const ENV_YEARLY_PASS_PRICE: &str = "TRANSITGATE_YEARLY_PASS_PRICE";
pub const ENV_DEFAULT_BASE_FARE: &str = "TRANSITGATE_DEFAULT_BASE_FARE";
pub const ENV_TICKET_SETTLEMENT: &str = "TRANSITGATE_TICKET_SETTLEMENT";

/// How a purchased ticket's payment is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TicketSettlement {
    /// Settled to PAID inside the purchase transaction.
    #[default]
    Instant,
    /// Left PENDING for a payment collaborator to decide later.
    Deferred,
}

impl TicketSettlement {
    pub fn parse(s: &str) -> DomainResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "instant" => Ok(Self::Instant),
            "deferred" => Ok(Self::Deferred),
            other => Err(DomainError::validation(format!(
                "{ENV_TICKET_SETTLEMENT} must be 'instant' or 'deferred', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Name of the cookie carrying the session token.
    pub session_cookie: String,
    /// Role members are moved to when their role is deleted.
    pub fallback_role: String,
    pub pass_code_prefix: String,
    pub pass_prices: PassPrices,
    /// Base price for lazily created pricing rules.
    pub default_base_fare: Money,
    pub ticket_settlement: TicketSettlement,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_cookie: "transitgate_session".to_string(),
            fallback_role: "USER".to_string(),
            pass_code_prefix: "TG".to_string(),
            pass_prices: PassPrices::default(),
            default_base_fare: Money::from_units(50),
            ticket_settlement: TicketSettlement::Instant,
        }
    }
}

impl EngineConfig {
    /// Load from process environment variables.
    pub fn from_env() -> DomainResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (unset keys keep their default).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DomainResult<Self> {
        let defaults = Self::default();

        let session_cookie = lookup(ENV_SESSION_COOKIE).unwrap_or_else(|| {
            tracing::warn!("{ENV_SESSION_COOKIE} not set; using default cookie name");
            defaults.session_cookie.clone()
        });
        if session_cookie.is_empty() || session_cookie.contains([';', '=', ' ']) {
            return Err(DomainError::validation(format!(
                "{ENV_SESSION_COOKIE} is not a valid cookie name"
            )));
        }

        let fallback_role = lookup(ENV_FALLBACK_ROLE)
            .map(|r| transitgate_auth::roles::normalize_role_name(&r))
            .filter(|r| !r.is_empty())
            .unwrap_or(defaults.fallback_role);

        let pass_code_prefix = lookup(ENV_PASS_CODE_PREFIX)
            .map(|p| p.trim().to_uppercase())
            .filter(|p| !p.is_empty())
            .unwrap_or(defaults.pass_code_prefix);

        let money = |key: &str, default: Money| -> DomainResult<Money> {
            let parsed = lookup(key)
                .map(|raw| {
                    Money::parse(&raw).map_err(|_| {
                        DomainError::validation(format!("{key} must be a price, got '{raw}'"))
                    })
                })
                .transpose()?;
            Ok(parsed.unwrap_or(default))
        };

        Ok(Self {
            session_cookie,
            fallback_role,
            pass_code_prefix,
            pass_prices: PassPrices {
                monthly: money(ENV_MONTHLY_PASS_PRICE, defaults.pass_prices.monthly)?,
                yearly: money(ENV_YEARLY_PASS_PRICE, defaults.pass_prices.yearly)?,
            },
            default_base_fare: money(ENV_DEFAULT_BASE_FARE, defaults.default_base_fare)?,
            ticket_settlement: lookup(ENV_TICKET_SETTLEMENT)
                .map(|raw| TicketSettlement::parse(&raw))
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn unset_values_fall_back_to_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn overrides_are_normalized() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_FALLBACK_ROLE, " rider "),
            (ENV_PASS_CODE_PREFIX, "bus"),
            (ENV_MONTHLY_PASS_PRICE, "750.50"),
        ]))
        .unwrap();
        assert_eq!(config.fallback_role, "RIDER");
        assert_eq!(config.pass_code_prefix, "BUS");
        assert_eq!(config.pass_prices.monthly, Money::from_minor(75050));
        assert_eq!(config.pass_prices.yearly, Money::from_units(10000));
    }

    #[test]
    fn non_numeric_price_is_a_validation_error() {
        let err = EngineConfig::from_lookup(lookup(&[(ENV_DEFAULT_BASE_FARE, "fifty")])).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn settlement_policy_is_parsed() {
        let config =
            EngineConfig::from_lookup(lookup(&[(ENV_TICKET_SETTLEMENT, "Deferred")])).unwrap();
        assert_eq!(config.ticket_settlement, TicketSettlement::Deferred);
        assert!(EngineConfig::from_lookup(lookup(&[(ENV_TICKET_SETTLEMENT, "later")])).is_err());
    }

    #[test]
    fn bad_cookie_name_is_rejected() {
        let err =
            EngineConfig::from_lookup(lookup(&[(ENV_SESSION_COOKIE, "a=b")])).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
