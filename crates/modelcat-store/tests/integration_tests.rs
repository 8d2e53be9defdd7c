//! Integration tests for modelcat-store
//!
//! These tests exercise the SQLite ledger and record store against on-disk
//! databases.

use chrono::NaiveDate;
use modelcat_domain::traits::{CreateOutcome, LedgerStore, RecordStore};
use modelcat_domain::{
    BenchmarkResultDraft, Confidence, EntityDraft, EntityKind, ModelDraft, OpinionDraft,
    ProcessingOutcome, ProcessingRecord, RecordResult, SourceKey, ValidatedEntity,
};
use modelcat_store::{MemoryRecordStore, SqliteLedger, SqliteRecordStore, StoreError};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn model(name: &str) -> ValidatedEntity {
    ValidatedEntity {
        draft: EntityDraft::Model(ModelDraft {
            name: name.to_string(),
            description: "Large language model".to_string(),
            organization: Some("OpenAI".to_string()),
            release_date: NaiveDate::from_ymd_opt(2023, 3, 14),
            license: None,
            metadata: json!({"context_window": 8192}).as_object().cloned(),
        }),
        confidence: Confidence::Partial,
    }
}

fn result(model: &str, date: Option<NaiveDate>) -> ValidatedEntity {
    ValidatedEntity {
        draft: EntityDraft::BenchmarkResult(BenchmarkResultDraft {
            model_name: model.to_string(),
            benchmark_name: "MMLU".to_string(),
            score: 86.4,
            date_tested: date,
            source: None,
        }),
        confidence: Confidence::Partial,
    }
}

#[test]
fn test_store_initialization() {
    let store = SqliteRecordStore::new(":memory:");
    assert!(store.is_ok(), "Store should initialize successfully");
}

#[tokio::test]
async fn test_create_and_find_model() {
    let store = SqliteRecordStore::new(":memory:").unwrap();

    let outcome = store.create(&model("gpt-4")).await.unwrap();
    let CreateOutcome::Created(id) = outcome.clone() else {
        panic!("expected Created, got {:?}", outcome);
    };

    let found = store.find_by_key(EntityKind::Model, "gpt-4").await.unwrap();
    assert_eq!(found, Some(id));
    assert!(store.find_by_key(EntityKind::Model, "gpt-5").await.unwrap().is_none());
    assert_eq!(store.count(EntityKind::Model).unwrap(), 1);
}

#[tokio::test]
async fn test_duplicate_model_is_conflict() {
    let store = SqliteRecordStore::new(":memory:").unwrap();
    store.create(&model("gpt-4")).await.unwrap();

    let second = store.create(&model("gpt-4")).await.unwrap();
    assert!(matches!(second, CreateOutcome::Conflict(ref detail) if detail.contains("gpt-4")));
    assert_eq!(store.count(EntityKind::Model).unwrap(), 1);
}

#[tokio::test]
async fn test_result_uniqueness_includes_date() {
    let store = SqliteRecordStore::new(":memory:").unwrap();
    let march = NaiveDate::from_ymd_opt(2023, 3, 1);
    let june = NaiveDate::from_ymd_opt(2023, 6, 1);

    assert!(matches!(store.create(&result("gpt-4", march)).await.unwrap(), CreateOutcome::Created(_)));
    assert!(matches!(store.create(&result("gpt-4", june)).await.unwrap(), CreateOutcome::Created(_)));
    assert!(matches!(store.create(&result("gpt-4", march)).await.unwrap(), CreateOutcome::Conflict(_)));
    assert_eq!(store.count(EntityKind::BenchmarkResult).unwrap(), 2);
}

#[tokio::test]
async fn test_opinion_with_tags() {
    let store = SqliteRecordStore::new(":memory:").unwrap();
    let opinion = ValidatedEntity {
        draft: EntityDraft::Opinion(OpinionDraft {
            model_name: "gpt-4o".to_string(),
            content: "Remarkably fast".to_string(),
            sentiment: Some("positive".to_string()),
            source: None,
            author: None,
            date_published: None,
            tags: Some(vec!["speed".to_string()]),
        }),
        confidence: Confidence::Partial,
    };

    let outcome = store.create(&opinion).await.unwrap();
    assert!(matches!(outcome, CreateOutcome::Created(_)));
    let key = opinion.draft.natural_key();
    assert!(store.find_by_key(EntityKind::Opinion, &key).await.unwrap().is_some());
}

#[tokio::test]
async fn test_ledger_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("modelcat.db");
    let key = SourceKey::from_origin("https://example.com/gpt-4", Some("2023-03-14"));

    {
        let ledger = SqliteLedger::new(&path).unwrap();
        ledger
            .append(ProcessingRecord::now(key.clone(), ProcessingOutcome::Accepted).with_detail("created"))
            .await
            .unwrap();
    }

    let reopened = SqliteLedger::new(&path).unwrap();
    assert!(reopened.has_accepted(&key).await.unwrap());
    let again = reopened
        .append(ProcessingRecord::now(key.clone(), ProcessingOutcome::Accepted))
        .await
        .unwrap();
    assert_eq!(again, RecordResult::AlreadyAccepted);
}

#[tokio::test]
async fn test_ledger_and_records_share_a_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("modelcat.db");

    let ledger = SqliteLedger::new(&path).unwrap();
    let records = SqliteRecordStore::new(&path).unwrap();

    records.create(&model("llama-2")).await.unwrap();
    ledger
        .append(ProcessingRecord::now(SourceKey::new("a"), ProcessingOutcome::Accepted))
        .await
        .unwrap();

    assert_eq!(records.count(EntityKind::Model).unwrap(), 1);
    assert_eq!(ledger.counts().unwrap().accepted, 1);
}

#[tokio::test]
async fn test_concurrent_acceptances_one_wins() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.db");
    let ledger = Arc::new(SqliteLedger::new(&path).unwrap());
    let key = SourceKey::new("https://example.com/race");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ledger = Arc::clone(&ledger);
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            ledger
                .append(ProcessingRecord::now(key, ProcessingOutcome::Accepted))
                .await
                .unwrap()
        }));
    }

    let mut recorded = 0;
    for handle in handles {
        if handle.await.unwrap() == RecordResult::Recorded {
            recorded += 1;
        }
    }
    assert_eq!(recorded, 1);
    assert_eq!(ledger.history(&key).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_memory_store_conflict_and_failure() {
    let store = MemoryRecordStore::new();
    assert!(matches!(store.create(&model("gpt-4")).await.unwrap(), CreateOutcome::Created(_)));
    assert!(matches!(store.create(&model("gpt-4")).await.unwrap(), CreateOutcome::Conflict(_)));

    store.fail_on("mistral-7b").unwrap();
    let err = store.create(&model("mistral-7b")).await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));
    assert_eq!(store.len(), 1);
}
