//! 共享测试工具和辅助函数

#![allow(dead_code)]

use std::env;
use std::sync::Arc;

use console_api::{ApiConfig, ResourceApi, ResourceEndpoint, create_resource_api};

/// Skip a test when any of the listed environment variables is missing.
#[macro_export]
macro_rules! skip_if_no_credentials {
    ($($var:expr),+) => {
        $(
            if std::env::var($var).is_err() {
                eprintln!("skipping: missing environment variable {}", $var);
                return;
            }
        )+
    };
}

/// Assert an `Option` is `Some` and unwrap it (fails the test otherwise).
#[macro_export]
macro_rules! require_some {
    ($expr:expr $(,)?) => {{
        let opt = $expr;
        assert!(opt.is_some(), "expected Some(..), got None");
        let Some(val) = opt else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let opt = $expr;
        assert!(opt.is_some(), "{}", format_args!($($msg)+));
        let Some(val) = opt else {
            return;
        };
        val
    }};
}

/// Assert a `Result` is `Ok` and unwrap it (fails the test otherwise).
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {res:?}");
        let Ok(val) = res else {
            return;
        };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(
            res.is_ok(),
            "{}: {res:?}",
            format_args!($($msg)+)
        );
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

/// Unique project name for a test run.
pub fn generate_test_name() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("_console-test-{}", &uuid.to_string()[..8])
}

/// Live Keystone project collection built from the environment.
pub struct TestContext {
    pub api: Arc<dyn ResourceApi>,
}

impl TestContext {
    /// `CONSOLE_IDENTITY_URL` (e.g. `http://controller:5000`) and `CONSOLE_AUTH_TOKEN`.
    pub fn keystone_projects() -> Option<Self> {
        let base_url = env::var("CONSOLE_IDENTITY_URL").ok()?;
        let auth_token = env::var("CONSOLE_AUTH_TOKEN").ok()?;
        let config = ApiConfig {
            base_url,
            auth_token,
            ..ApiConfig::default()
        };
        let api = create_resource_api(
            &config,
            ResourceEndpoint::new("/v3/projects", "projects", "project"),
        )
        .ok()?;
        Some(Self { api })
    }
}
