//! Roda contra um Postgres de verdade: `DATABASE_URL=... cargo test -- --ignored`.

use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use stockbox::{
    config::DatabaseConfig,
    db::{Database, DatabaseError, ExpectedReturn, ProcedureCall, ProcedureExecutor, ProcedureOutput},
};

const ECHO: &str = "stockbox_it.spEcho";
const FAIL: &str = "stockbox_it.spFail";
const TWO_SETS: &str = "stockbox_it.spTwoSets";
const NOTE_ADD: &str = "stockbox_it.spNoteAdd";
const NOTE_COUNT: &str = "stockbox_it.spNoteCount";

const SETUP: &[&str] = &[
    "SELECT pg_advisory_xact_lock(51000)",
    "CREATE SCHEMA IF NOT EXISTS stockbox_it",
    "CREATE TABLE IF NOT EXISTS stockbox_it.notes (id serial PRIMARY KEY, tag text NOT NULL, body text NOT NULL)",
    r#"CREATE OR REPLACE FUNCTION stockbox_it."spEcho"("idAccount" bigint, "label" text, "amount" numeric DEFAULT NULL)
       RETURNS TABLE("echoAccount" bigint, "echoLabel" text, "echoAmount" numeric, "createdAt" timestamp)
       LANGUAGE sql AS $$ SELECT "idAccount", "label", "amount", timestamp '2024-05-01 10:00:00' $$"#,
    r#"CREATE OR REPLACE FUNCTION stockbox_it."spFail"()
       RETURNS void LANGUAGE plpgsql AS $$
       BEGIN RAISE EXCEPTION 'Estoque insuficiente' USING ERRCODE = '51000'; END $$"#,
    r#"CREATE OR REPLACE FUNCTION stockbox_it."spTwoSets"("pageSize" bigint)
       RETURNS SETOF refcursor LANGUAGE plpgsql AS $$
       DECLARE cur_rows refcursor := 'rows'; cur_meta refcursor := 'meta';
       BEGIN
         OPEN cur_rows FOR SELECT g::bigint AS "id" FROM generate_series(1, "pageSize") g;
         RETURN NEXT cur_rows;
         OPEN cur_meta FOR SELECT "pageSize" AS "pageSize", 1::int AS "currentPage";
         RETURN NEXT cur_meta;
       END $$"#,
    r#"CREATE OR REPLACE FUNCTION stockbox_it."spNoteAdd"("tag" text, "body" text)
       RETURNS TABLE("id" int) LANGUAGE sql AS $$
       INSERT INTO stockbox_it.notes (tag, body) VALUES ("tag", "body") RETURNING id $$"#,
    r#"CREATE OR REPLACE FUNCTION stockbox_it."spNoteCount"("tag" text)
       RETURNS TABLE("total" bigint) LANGUAGE sql AS $$
       SELECT count(*) FROM stockbox_it.notes n WHERE n.tag = "spNoteCount"."tag" $$"#,
];

fn database_url() -> String {
    dotenvy::dotenv().ok();
    std::env::var("DATABASE_URL").expect("DATABASE_URL precisa estar definida para estes testes")
}

async fn database() -> Database {
    let url = database_url();

    let pool = PgPoolOptions::new().max_connections(1).connect(&url).await.unwrap();
    let mut tx = pool.begin().await.unwrap();
    for statement in SETUP {
        sqlx::query(statement).execute(&mut *tx).await.unwrap();
    }
    tx.commit().await.unwrap();
    pool.close().await;

    Database::new(&DatabaseConfig {
        url,
        max_connections: 2,
        acquire_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn unique_tag(prefix: &str) -> String {
    format!("{prefix}-{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn single_row_uses_named_arguments_and_json_columns() {
    let db = database().await;

    let call = ProcedureCall::new(ECHO)
        .param("idAccount", 42_i64)
        .param("label", "Parafuso")
        .param("amount", Decimal::new(1250, 2));

    let row = db.execute(&call, ExpectedReturn::Single).await.unwrap().into_single().unwrap().unwrap();

    assert_eq!(row["echoAccount"], json!(42));
    assert_eq!(row["echoLabel"], json!("Parafuso"));
    assert_eq!(row["echoAmount"], json!(12.5));
    assert_eq!(row["createdAt"], json!("2024-05-01T10:00:00+00:00"));
    db.close().await;
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn null_parameters_are_sent_as_typed_nulls() {
    let db = database().await;

    let call = ProcedureCall::new(ECHO)
        .param("idAccount", 1_i64)
        .param("label", None::<String>)
        .param("amount", None::<Decimal>);

    let row = db.execute(&call, ExpectedReturn::Single).await.unwrap().into_single().unwrap().unwrap();
    assert_eq!(row["echoLabel"], serde_json::Value::Null);
    assert_eq!(row["echoAmount"], serde_json::Value::Null);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn cursors_are_read_in_order_and_named_on_request() {
    let db = database().await;

    let call = ProcedureCall::new(TWO_SETS).param("pageSize", 3_i64);
    let sets = db.execute(&call, ExpectedReturn::Multi).await.unwrap().into_result_sets().unwrap();
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].len(), 3);
    assert_eq!(sets[1][0]["pageSize"], json!(3));

    let named = ProcedureCall::new(TWO_SETS)
        .param("pageSize", 1_i64)
        .named_result_sets(&["movements", "pagination"]);
    let sets = db.execute(&named, ExpectedReturn::Multi).await.unwrap().into_named().unwrap();
    assert_eq!(sets["movements"].len(), 1);
    assert_eq!(sets["pagination"][0]["currentPage"], json!(1));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn business_rule_errors_keep_their_sqlstate() {
    let db = database().await;

    let err = db.execute(&ProcedureCall::new(FAIL), ExpectedReturn::None).await.unwrap_err();
    assert!(err.is_business_rule());
    match err {
        DatabaseError::Rejected { message, .. } => assert_eq!(message, "Estoque insuficiente"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn explicit_transaction_rolls_back() {
    let db = database().await;
    let tag = unique_tag("rollback");

    let tx = db.begin().await.unwrap();
    let add = ProcedureCall::new(NOTE_ADD).param("tag", tag.as_str()).param("body", "temporária");
    tx.execute(&add, ExpectedReturn::Single).await.unwrap();
    tx.rollback().await.unwrap();

    assert!(matches!(
        tx.execute(&add, ExpectedReturn::Single).await,
        Err(DatabaseError::TransactionClosed)
    ));

    let count = ProcedureCall::new(NOTE_COUNT).param("tag", tag.as_str());
    let output = db.execute(&count, ExpectedReturn::Single).await.unwrap();
    assert_eq!(output, ProcedureOutput::Single(Some(json!({ "total": 0 }).as_object().unwrap().clone())));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn explicit_transaction_commits() {
    let db = database().await;
    let tag = unique_tag("commit");

    let tx = db.begin().await.unwrap();
    for body in ["a", "b"] {
        let add = ProcedureCall::new(NOTE_ADD).param("tag", tag.as_str()).param("body", body);
        tx.execute(&add, ExpectedReturn::None).await.unwrap();
    }
    tx.commit().await.unwrap();

    let count = ProcedureCall::new(NOTE_COUNT).param("tag", tag.as_str());
    let row = db.execute(&count, ExpectedReturn::Single).await.unwrap().into_single().unwrap().unwrap();
    assert_eq!(row["total"], json!(2));
}
