use std::net::SocketAddr;

use anyhow::{Context, Result, bail};
use dunning_auth::AuthConfig;
use dunning_db::DbConfig;

/// Deployment environment, from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => bail!("APP_ENV must be development, production or test, got {other:?}"),
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Server configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub database: DbConfig,
    pub auth: AuthConfig,
    /// Whether `POST /api/tenants` accepts anonymous onboarding.
    pub public_signup: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as
    /// unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port: u16 = var("PORT")
            .unwrap_or_else(|| "3333".to_string())
            .parse()
            .with_context(|| "parse PORT")?;
        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let bind_addr = format!("{host}:{port}")
            .parse()
            .with_context(|| "parse HOST/PORT into a socket address")?;

        let environment = Environment::parse(
            var("APP_ENV")
                .as_deref()
                .unwrap_or("development"),
        )?;

        let defaults = DbConfig::default();
        let database = DbConfig {
            url: var("DATABASE_URL").context("DATABASE_URL is required")?,
            namespace: var("DATABASE_NS").unwrap_or(defaults.namespace),
            database: var("DATABASE_DB").unwrap_or(defaults.database),
            username: var("DATABASE_USER").unwrap_or(defaults.username),
            password: var("DATABASE_PASS").unwrap_or(defaults.password),
        };

        let mut auth = AuthConfig {
            jwt_secret: var("JWT_SECRET").context("JWT_SECRET is required")?,
            ..AuthConfig::default()
        };
        if let Some(issuer) = var("JWT_ISSUER") {
            auth.jwt_issuer = issuer;
        }
        if let Some(cost) = var("BCRYPT_COST") {
            auth.bcrypt_cost = cost.parse().with_context(|| "parse BCRYPT_COST")?;
        }
        if let Some(secs) = var("ACCESS_TOKEN_TTL_SECS") {
            auth.access_token_lifetime_secs =
                secs.parse().with_context(|| "parse ACCESS_TOKEN_TTL_SECS")?;
        }
        if let Some(secs) = var("REFRESH_TOKEN_TTL_SECS") {
            auth.refresh_token_lifetime_secs =
                secs.parse().with_context(|| "parse REFRESH_TOKEN_TTL_SECS")?;
        }
        auth.validate().context("invalid authentication configuration")?;

        let public_signup = match var("PUBLIC_SIGNUP").as_deref() {
            None | Some("true") | Some("1") => true,
            Some("false") | Some("0") => false,
            Some(other) => bail!("PUBLIC_SIGNUP must be true or false, got {other:?}"),
        };

        Ok(Self {
            bind_addr,
            environment,
            database,
            auth,
            public_signup,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn defaults_apply() {
        let config =
            ServerConfig::from_lookup(lookup(&[("DATABASE_URL", "mem://"), ("JWT_SECRET", SECRET)]))
                .unwrap();
        assert_eq!(config.bind_addr.port(), 3333);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.database.url, "mem://");
        assert_eq!(config.database.namespace, "dunning");
        assert!(config.public_signup);
        assert_eq!(config.auth.bcrypt_cost, 10);
    }

    #[test]
    fn required_values_are_enforced() {
        let missing_db = ServerConfig::from_lookup(lookup(&[("JWT_SECRET", SECRET)]));
        assert!(missing_db.unwrap_err().to_string().contains("DATABASE_URL"));

        let short_secret = ServerConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "mem://"),
            ("JWT_SECRET", "short"),
        ]));
        assert!(short_secret.is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "ws://db:8000"),
            ("JWT_SECRET", SECRET),
            ("PORT", "8080"),
            ("APP_ENV", "production"),
            ("PUBLIC_SIGNUP", "false"),
            ("BCRYPT_COST", "12"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.environment.is_production());
        assert!(!config.public_signup);
        assert_eq!(config.auth.bcrypt_cost, 12);
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let result = ServerConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "mem://"),
            ("JWT_SECRET", SECRET),
            ("APP_ENV", "staging"),
        ]));
        assert!(result.is_err());
    }
}
