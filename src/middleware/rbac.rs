// src/middleware/rbac.rs

use async_trait::async_trait;

use crate::{common::error::AppError, config::AppState, middleware::auth::Credential};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Create,
    Read,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Create => "CREATE",
            Permission::Read => "READ",
        }
    }
}

/// 1. O Trait que define o que é uma Permissão (recurso + ação)
pub trait PermissionDef: Send + Sync + 'static {
    fn securable() -> &'static str;
    fn permission() -> Permission;
}

/// 2. Quem decide se a credencial pode executar a ação
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn is_allowed(
        &self,
        credential: &Credential,
        securable: &str,
        permission: Permission,
    ) -> Result<bool, AppError>;
}

/// Libera tudo. Usado enquanto não existe uma política de papéis.
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn is_allowed(&self, _: &Credential, _: &str, _: Permission) -> Result<bool, AppError> {
        Ok(true)
    }
}

/// 3. O guardião chamado pelos handlers depois da validação
pub async fn authorize<P: PermissionDef>(
    state: &AppState,
    credential: &Credential,
) -> Result<(), AppError> {
    let securable = P::securable();
    let permission = P::permission();

    if !state
        .authorizer
        .is_allowed(credential, securable, permission)
        .await?
    {
        tracing::warn!(
            account = credential.id_account,
            user = credential.id_user,
            "Acesso negado: {} em {}",
            permission.as_str(),
            securable
        );
        return Err(AppError::Forbidden {
            securable,
            permission: permission.as_str(),
        });
    }

    Ok(())
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermStockMovementCreate;
impl PermissionDef for PermStockMovementCreate {
    fn securable() -> &'static str { "STOCK_MOVEMENT" }
    fn permission() -> Permission { Permission::Create }
}

pub struct PermStockMovementRead;
impl PermissionDef for PermStockMovementRead {
    fn securable() -> &'static str { "STOCK_MOVEMENT" }
    fn permission() -> Permission { Permission::Read }
}
