//! Live Keystone project collection tests
//!
//! Run with:
//! ```bash
//! CONSOLE_IDENTITY_URL=http://controller:5000 CONSOLE_AUTH_TOKEN=xxx \
//!     cargo test -p console-api --test keystone_projects_test -- --ignored --nocapture --test-threads=1
//! ```

mod common;

use common::{TestContext, generate_test_name};
use console_api::{ApiError, ListQuery};
use serde_json::json;

#[tokio::test]
#[ignore = "integration test: requires CONSOLE_IDENTITY_URL and CONSOLE_AUTH_TOKEN"]
async fn test_keystone_list_projects() {
    skip_if_no_credentials!("CONSOLE_IDENTITY_URL", "CONSOLE_AUTH_TOKEN");

    let ctx = require_some!(TestContext::keystone_projects(), "failed to build test context");
    let page = require_ok!(
        ctx.api.list(&ListQuery::default()).await,
        "list projects failed"
    );
    assert!(!page.items.is_empty(), "admin token should see at least one project");
    assert!(page.items.iter().all(|p| !p.id.is_empty()));

    println!("✓ listed {} projects", page.items.len());
}

#[tokio::test]
#[ignore = "integration test: requires CONSOLE_IDENTITY_URL and CONSOLE_AUTH_TOKEN"]
async fn test_keystone_get_missing_project() {
    skip_if_no_credentials!("CONSOLE_IDENTITY_URL", "CONSOLE_AUTH_TOKEN");

    let ctx = require_some!(TestContext::keystone_projects(), "failed to build test context");
    let result = ctx.api.get("00000000000000000000000000000000").await;
    assert!(
        matches!(result, Err(ApiError::NotFound { .. })),
        "expected NotFound, got {result:?}"
    );
}

#[tokio::test]
#[ignore = "integration test: requires CONSOLE_IDENTITY_URL and CONSOLE_AUTH_TOKEN"]
async fn test_keystone_project_lifecycle() {
    skip_if_no_credentials!("CONSOLE_IDENTITY_URL", "CONSOLE_AUTH_TOKEN");

    let ctx = require_some!(TestContext::keystone_projects(), "failed to build test context");
    let name = generate_test_name();

    let created = require_ok!(
        ctx.api
            .create(&json!({ "name": name, "description": "created by test", "enabled": true }))
            .await,
        "create project failed"
    );
    assert_eq!(created.name(), name);

    let updated = ctx
        .api
        .update(&created.id, &json!({ "description": "edited by test" }))
        .await;
    let cleanup = ctx.api.delete(&created.id).await;

    let updated = require_ok!(updated, "update project failed");
    assert_eq!(updated.get_str("description"), Some("edited by test"));
    require_ok!(cleanup, "delete project failed");

    let filtered = require_ok!(
        ctx.api.list(&ListQuery::default().with_filter("name", name.clone())).await,
        "filtered list failed"
    );
    assert!(filtered.items.is_empty(), "deleted project still listed");

    println!("✓ project {name} created, updated and deleted");
}
