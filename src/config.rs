// src/config.rs

use std::{collections::HashMap, env, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;

use crate::{
    db::ProcedureExecutor,
    middleware::{
        auth::{CredentialProvider, JwtCredentials, StaticCredentials},
        rbac::{AllowAll, Authorizer},
    },
    services::StockMovementService,
};

// ---
// Configuração (variáveis de ambiente / .env)
// ---

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_version: String,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    // Identidade fixa usada quando não há JWT configurado (só desenvolvimento).
    pub dev_account_id: i64,
    pub dev_user_id: i64,
}

// Não imprime o segredo nos logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "***"))
            .field("dev_account_id", &self.dev_account_id)
            .field("dev_user_id", &self.dev_user_id)
            .finish()
    }
}

impl Config {
    /// Lê o `.env` (se existir) e as variáveis de ambiente do processo.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL").context("DATABASE_URL deve ser definida")?;

        let server = ServerConfig {
            host: lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "API_PORT", 3000)?,
            api_version: lookup("API_VERSION").unwrap_or_else(|| "v1".to_string()),
            cors_origins: lookup("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_else(|| vec!["*".to_string()]),
        };

        let database = DatabaseConfig {
            url,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            acquire_timeout: Duration::from_secs(parse_or(&lookup, "DATABASE_ACQUIRE_TIMEOUT_SECS", 3)?),
        };

        let auth = AuthConfig {
            jwt_secret: lookup("JWT_SECRET").filter(|s| !s.is_empty()),
            dev_account_id: parse_or(&lookup, "DEV_ACCOUNT_ID", 1)?,
            dev_user_id: parse_or(&lookup, "DEV_USER_ID", 1)?,
        };

        Ok(Self {
            server,
            database,
            auth,
        })
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .with_context(|| format!("endereço inválido {}:{}", self.server.host, self.server.port))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} inválida: {raw:?}")),
        None => Ok(default),
    }
}

// ---
// O estado compartilhado que será acessível em toda a aplicação
// ---
#[derive(Clone)]
pub struct AppState {
    pub stock_movement_service: StockMovementService,
    pub credentials: Arc<dyn CredentialProvider>,
    pub authorizer: Arc<dyn Authorizer>,
}

impl AppState {
    /// Monta o gráfico de dependências a partir da configuração.
    pub fn new(config: &Config, gateway: Arc<dyn ProcedureExecutor>) -> Self {
        let credentials: Arc<dyn CredentialProvider> = match &config.auth.jwt_secret {
            Some(secret) => Arc::new(JwtCredentials::new(secret)),
            None => {
                tracing::warn!(
                    account = config.auth.dev_account_id,
                    user = config.auth.dev_user_id,
                    "⚠️ JWT_SECRET não definido: usando identidade fixa de desenvolvimento"
                );
                Arc::new(StaticCredentials::new(
                    config.auth.dev_account_id,
                    config.auth.dev_user_id,
                ))
            }
        };

        Self::with_security(gateway, credentials, Arc::new(AllowAll))
    }

    pub fn with_security(
        gateway: Arc<dyn ProcedureExecutor>,
        credentials: Arc<dyn CredentialProvider>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            stock_movement_service: StockMovementService::new(gateway),
            credentials,
            authorizer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/stockbox")])).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.api_version, "v1");
        assert_eq!(config.server.cors_origins, vec!["*"]);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.database.acquire_timeout, Duration::from_secs(3));
        assert!(config.auth.jwt_secret.is_none());
        assert_eq!(config.auth.dev_account_id, 1);
        assert_eq!(config.bind_addr().unwrap().port(), 3000);
    }

    #[test]
    fn database_url_is_required() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/stockbox"),
            ("API_PORT", "8080"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_MAX_CONNECTIONS", "20"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("s3cret"));
        assert!(!format!("{:?}", config.auth).contains("s3cret"));
    }

    #[test]
    fn invalid_numbers_fail() {
        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/stockbox"),
            ("API_PORT", "porta"),
        ]));
        assert!(result.is_err());
    }
}
