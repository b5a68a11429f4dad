mod common;

use common::{Territory, sqlite};
use partsmap::prelude::*;
use pretty_assertions::assert_eq;

fn database_url() -> (std::path::PathBuf, String) {
    let path = std::env::temp_dir().join(format!("partsmap-it-{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    (path, url)
}

fn territory(id: i64, description: &str, region_id: i64) -> Territory {
    Territory {
        id,
        description: description.to_string(),
        region_id,
    }
}

#[tokio::test]
async fn test_unit_of_work_against_sqlite() {
    let (path, url) = database_url();
    let settings = Settings::default().with_database_url(Some(url));
    let mut ctx = DatabaseContext::from_settings(&settings).unwrap();
    let compiler = ctx.compiler();

    ctx.add_query(
        TableQuery::of::<Territory>(compiler)
            .key("Id", false)
            .create()
            .unwrap(),
    );
    for t in [
        territory(1, "Westboro", 1),
        territory(2, "Bedford", 1),
        territory(3, "Georgetown", 2),
    ] {
        ctx.add_query(InsertQuery::new(compiler, &t).compile().unwrap());
    }
    ctx.add_query(
        UpdateQuery::<Territory>::new(compiler)
            .set("Description", "Boston")
            .filter(col("Id").eq(2))
            .compile()
            .unwrap(),
    );
    assert_eq!(ctx.pending().len(), 5);
    ctx.commit().await.unwrap();
    assert!(ctx.pending().is_empty());

    let query = ctx
        .select::<Territory>()
        .filter(col("RegionId").eq(1))
        .order_by_desc(col("Id"))
        .compile()
        .unwrap();
    let rows = ctx.fetch::<Territory>(&query).await.unwrap();
    let descriptions: Vec<&Value> = rows.iter().filter_map(|r| r.get("Description")).collect();
    assert_eq!(
        descriptions,
        vec![&Value::from("Boston"), &Value::from("Westboro")]
    );

    let removed = ctx
        .execute(&DeleteQuery::<Territory>::new(compiler).compile().unwrap())
        .await
        .unwrap();
    assert_eq!(removed, 3);

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn test_failed_commit_clears_queue() {
    let (path, url) = database_url();
    let mut ctx = DatabaseContext::new(SqlxConnectionProvider::new(url), sqlite());
    ctx.add_query(DeleteQuery::<Territory>::new(sqlite()).compile().unwrap());

    let err = ctx.commit().await.unwrap_err();
    assert!(matches!(err, PartsError::Execution(_)));
    assert!(ctx.pending().is_empty());

    let _ = std::fs::remove_file(path);
}

#[test]
fn test_settings_without_url() {
    let err = DatabaseContext::from_settings(&Settings::default()).err().unwrap();
    assert!(matches!(err, PartsError::Config(_)));
}
