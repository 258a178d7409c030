// src/middleware/auth.rs

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{common::error::AppError, config::AppState};

/// Identidade de quem chamou a API. Toda procedure é escopada por `id_account`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credential {
    pub id_account: i64,
    pub id_user: i64,
}

// ---
// O "plug" de autenticação
// ---
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn resolve(&self, parts: &Parts) -> Result<Credential, AppError>;
}

// Extrator: os handlers recebem a credencial já resolvida
impl<S> FromRequestParts<S> for Credential
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        app_state.credentials.resolve(parts).await
    }
}

// ---
// Identidade fixa (desenvolvimento)
// ---
pub struct StaticCredentials {
    credential: Credential,
}

impl StaticCredentials {
    pub fn new(id_account: i64, id_user: i64) -> Self {
        Self {
            credential: Credential {
                id_account,
                id_user,
            },
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn resolve(&self, _parts: &Parts) -> Result<Credential, AppError> {
        Ok(self.credential)
    }
}

// ---
// JWT (Authorization: Bearer <token>)
// ---
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,   // ID do usuário
    pub account: i64,  // ID da conta (tenant)
    pub exp: usize,
    pub iat: usize,
}

pub struct JwtCredentials {
    secret: String,
}

impl JwtCredentials {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Emite um token HS256 para a credencial (usado por ferramentas e testes).
    pub fn issue_token(
        &self,
        credential: Credential,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: credential.id_user.to_string(),
            account: credential.id_account,
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
    }

    fn validate_token(&self, token: &str) -> Result<Credential, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|e| {
            tracing::debug!("Token rejeitado: {}", e);
            AppError::Unauthorized
        })?;

        let id_user = token_data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::Unauthorized)?;

        Ok(Credential {
            id_account: token_data.claims.account,
            id_user,
        })
    }
}

#[async_trait]
impl CredentialProvider for JwtCredentials {
    async fn resolve(&self, parts: &Parts) -> Result<Credential, AppError> {
        let bearer = parts
            .headers
            .typed_get::<Authorization<Bearer>>()
            .ok_or(AppError::Unauthorized)?;

        self.validate_token(bearer.token())
    }
}
