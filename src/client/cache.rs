// src/client/cache.rs

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use moka::future::Cache;

use super::api::{ClientError, StockBoxClient};
use crate::models::stock_movement::{
    CurrentStock, MovementCreated, MovementDraft, MovementListQuery, MovementPage, StockMovement,
};

/// Por quanto tempo uma leitura é reaproveitada.
pub const STALE_TIME: Duration = Duration::from_secs(2 * 60);

const MAX_ENTRIES: u64 = 1_000;

/// Leituras com cache curto por filtro. Um `create` bem-sucedido invalida
/// a listagem e o estoque atual, para a tela refletir a movimentação nova.
///
/// As chaves carregam a geração do cache: uma leitura que já estava em
/// andamento quando o `create` terminou grava na geração antiga, que ninguém
/// mais consulta.
#[derive(Clone)]
pub struct CachedStockBoxClient {
    client: StockBoxClient,
    generation: Arc<AtomicU64>,
    movements: Cache<(u64, MovementListQuery), MovementPage>,
    current_stock: Cache<(u64, Option<i64>), Vec<CurrentStock>>,
}

impl CachedStockBoxClient {
    pub fn new(client: StockBoxClient) -> Self {
        Self::with_ttl(client, STALE_TIME)
    }

    pub fn with_ttl(client: StockBoxClient, ttl: Duration) -> Self {
        Self {
            client,
            generation: Arc::new(AtomicU64::new(0)),
            movements: Cache::builder()
                .name("stock-movements")
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ttl)
                .build(),
            current_stock: Cache::builder()
                .name("current-stock")
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn movements(&self, filters: &MovementListQuery) -> Result<MovementPage, ClientError> {
        let key = (self.generation(), filters.clone());
        if let Some(page) = self.movements.get(&key).await {
            return Ok(page);
        }

        // Falhas não entram no cache.
        let page = self.client.list(filters).await?;
        self.movements.insert(key, page.clone()).await;
        Ok(page)
    }

    pub async fn movement(&self, id: i64) -> Result<Option<StockMovement>, ClientError> {
        self.client.get_by_id(id).await
    }

    pub async fn current_stock(&self, id_product: Option<i64>) -> Result<Vec<CurrentStock>, ClientError> {
        let key = (self.generation(), id_product);
        if let Some(stock) = self.current_stock.get(&key).await {
            return Ok(stock);
        }

        let stock = self.client.current_stock(id_product).await?;
        self.current_stock.insert(key, stock.clone()).await;
        Ok(stock)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn create(&self, draft: &MovementDraft) -> Result<MovementCreated, ClientError> {
        let created = self.client.create(draft).await?;

        self.generation.fetch_add(1, Ordering::SeqCst);
        self.movements.invalidate_all();
        self.current_stock.invalidate_all();
        tracing::debug!(id = created.id_stock_movement, "caches de estoque invalidados");

        Ok(created)
    }
}
