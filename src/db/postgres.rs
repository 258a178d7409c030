// src/db/postgres.rs

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{
    postgres::{PgArguments, PgConnectOptions, PgPoolOptions},
    query::Query,
    PgConnection, PgPool, Postgres, Row as _, Transaction,
};
use tokio::sync::{Mutex, OnceCell};

use super::procedure::{
    DatabaseError, ExpectedReturn, ParamValue, ProcedureCall, ProcedureExecutor, ProcedureOutput,
};
use super::row::row_to_json;
use crate::config::DatabaseConfig;

// ---
// Database: dono do pool (inicializado na primeira chamada)
// ---
/// Criado uma vez no startup e injetado no `AppState`. O pool só é aberto
/// quando a primeira procedure é executada e vive até o fim do processo.
pub struct Database {
    options: PgConnectOptions,
    max_connections: u32,
    acquire_timeout: std::time::Duration,
    pool: OnceCell<PgPool>,
}

impl Database {
    pub fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let options = PgConnectOptions::from_str(&config.url).map_err(DatabaseError::Connection)?;
        Ok(Self {
            options,
            max_connections: config.max_connections,
            acquire_timeout: config.acquire_timeout,
            pool: OnceCell::new(),
        })
    }

    async fn pool(&self) -> Result<&PgPool, DatabaseError> {
        self.pool
            .get_or_try_init(|| async {
                let pool = PgPoolOptions::new()
                    .max_connections(self.max_connections)
                    .acquire_timeout(self.acquire_timeout)
                    .connect_with(self.options.clone())
                    .await
                    .map_err(|e| {
                        tracing::error!("🔥 Falha ao conectar ao banco de dados: {:?}", e);
                        DatabaseError::Connection(e)
                    })?;
                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
                Ok(pool)
            })
            .await
    }

    /// Abre uma transação para quem precisa de várias chamadas atômicas.
    pub async fn begin(&self) -> Result<DbTransaction, DatabaseError> {
        let tx = self.pool().await?.begin().await?;
        Ok(DbTransaction {
            inner: Mutex::new(Some(tx)),
        })
    }

    /// Fecha o pool, se ele chegou a ser aberto.
    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
            tracing::info!("Pool de conexões encerrado.");
        }
    }
}

#[async_trait]
impl ProcedureExecutor for Database {
    async fn execute(
        &self,
        call: &ProcedureCall,
        expected: ExpectedReturn,
    ) -> Result<ProcedureOutput, DatabaseError> {
        let pool = self.pool().await?;

        match expected {
            // Cursores só existem dentro de uma transação.
            ExpectedReturn::Multi => {
                let mut tx = pool.begin().await?;
                let output = run_call(&mut tx, call, expected).await?;
                tx.commit().await?;
                Ok(output)
            }
            _ => {
                let mut conn = pool.acquire().await?;
                run_call(&mut conn, call, expected).await
            }
        }
    }
}

// ---
// Transação explícita (begin / commit / rollback)
// ---
pub struct DbTransaction {
    inner: Mutex<Option<Transaction<'static, Postgres>>>,
}

impl DbTransaction {
    pub async fn commit(&self) -> Result<(), DatabaseError> {
        let tx = self.inner.lock().await.take().ok_or(DatabaseError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(&self) -> Result<(), DatabaseError> {
        let tx = self.inner.lock().await.take().ok_or(DatabaseError::TransactionClosed)?;
        tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl ProcedureExecutor for DbTransaction {
    async fn execute(
        &self,
        call: &ProcedureCall,
        expected: ExpectedReturn,
    ) -> Result<ProcedureOutput, DatabaseError> {
        let mut guard = self.inner.lock().await;
        let tx = guard.as_mut().ok_or(DatabaseError::TransactionClosed)?;
        run_call(tx, call, expected).await
    }
}

// ---
// Execução
// ---
async fn run_call(
    conn: &mut PgConnection,
    call: &ProcedureCall,
    expected: ExpectedReturn,
) -> Result<ProcedureOutput, DatabaseError> {
    tracing::debug!(procedure = call.name(), ?expected, "executando procedure");

    match expected {
        ExpectedReturn::None => {
            let sql = call_sql(call);
            bind_params(&sql, call).execute(&mut *conn).await?;
            Ok(ProcedureOutput::None)
        }
        ExpectedReturn::Single => {
            let sql = call_sql(call);
            let row = bind_params(&sql, call).fetch_optional(&mut *conn).await?;
            Ok(ProcedureOutput::Single(row.as_ref().map(row_to_json).transpose()?))
        }
        ExpectedReturn::Multi => {
            let sql = cursor_sql(call);
            let cursors = bind_params(&sql, call)
                .fetch_all(&mut *conn)
                .await?
                .iter()
                .map(|row| row.try_get::<String, _>(0))
                .collect::<Result<Vec<_>, _>>()?;

            let mut sets = Vec::with_capacity(cursors.len());
            for cursor in &cursors {
                let fetch = format!("FETCH ALL FROM {}", quote_ident(cursor));
                let rows = sqlx::query(&fetch).fetch_all(&mut *conn).await?;
                sets.push(rows.iter().map(row_to_json).collect::<Result<Vec<_>, _>>()?);
            }
            Ok(ProcedureOutput::from_result_sets(call, sets))
        }
    }
}

fn bind_params<'q>(sql: &'q str, call: &ProcedureCall) -> Query<'q, Postgres, PgArguments> {
    call.params()
        .iter()
        .fold(sqlx::query(sql), |query, param| match &param.value {
            ParamValue::Int(v) => query.bind(*v),
            ParamValue::Decimal(v) => query.bind(*v),
            ParamValue::Text(v) => query.bind(v.clone()),
            ParamValue::Date(v) => query.bind(*v),
        })
}

// SELECT * FROM "functional"."spX"("idAccount" => $1, ...)
fn call_sql(call: &ProcedureCall) -> String {
    format!("SELECT * FROM {}", invocation(call))
}

// Procedures com vários result sets devolvem `SETOF refcursor`.
fn cursor_sql(call: &ProcedureCall) -> String {
    format!("SELECT rs::text FROM {} AS rs", invocation(call))
}

fn invocation(call: &ProcedureCall) -> String {
    let args = call
        .params()
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{} => ${}", quote_ident(p.name), i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}({})", qualified_name(call.name()), args)
}

fn qualified_name(name: &str) -> String {
    name.split('.').map(quote_ident).collect::<Vec<_>>().join(".")
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::procedure::procedures;

    #[test]
    fn builds_named_notation_call() {
        let call = ProcedureCall::new(procedures::STOCK_MOVEMENT_GET)
            .param("idAccount", 1_i64)
            .param("idStockMovement", 7_i64);

        assert_eq!(
            call_sql(&call),
            r#"SELECT * FROM "functional"."spStockMovementGet"("idAccount" => $1, "idStockMovement" => $2)"#
        );
    }

    #[test]
    fn multi_result_calls_read_cursor_names() {
        let call = ProcedureCall::new(procedures::STOCK_CURRENT_GET)
            .param("idAccount", 1_i64)
            .param("idProduct", None::<i64>);

        assert_eq!(
            cursor_sql(&call),
            r#"SELECT rs::text FROM "functional"."spStockCurrentGet"("idAccount" => $1, "idProduct" => $2) AS rs"#
        );
    }

    #[test]
    fn procedure_without_params() {
        let call = ProcedureCall::new("functional.spPing");
        assert_eq!(call_sql(&call), r#"SELECT * FROM "functional"."spPing"()"#);
    }

    #[test]
    fn identifiers_are_escaped() {
        assert_eq!(quote_ident(r#"a"b"#), r#""a""b""#);
        assert_eq!(qualified_name("s.t"), r#""s"."t""#);
    }

    #[test]
    fn invalid_url_is_rejected() {
        let config = DatabaseConfig {
            url: "not a url".into(),
            max_connections: 5,
            acquire_timeout: std::time::Duration::from_secs(3),
        };
        assert!(Database::new(&config).is_err());
    }
}
