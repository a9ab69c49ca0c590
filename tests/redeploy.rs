// ABOUTME: Integration tests for the redeploy sequence against a recording engine.
// ABOUTME: Covers resolution, the latest fallback, teardown tolerance and abort paths.

mod support;

use redeploy::config::Config;
use redeploy::index::ImageIndex;
use redeploy::redeploy::{RedeployErrorKind, RedeployOutcome, Redeployer};
use std::sync::Arc;
use support::{Call, FakeEngine, Op};

const WEB_ON_ACME: &str = r#"
version: "3"
services:
  web:
    image: acme/app
    ports:
      - "8080:80"
"#;

fn redeployer(yaml: &str, engine: Arc<FakeEngine>) -> Redeployer {
    let config = Config::from_yaml(yaml).unwrap();
    let index = Arc::new(ImageIndex::new(&config.services));
    Redeployer::new(engine, index)
}

#[tokio::test]
async fn replaces_existing_container() {
    support::init_tracing();
    let engine = Arc::new(FakeEngine::new().with_container("old-web", "web"));
    let redeployer = redeployer(WEB_ON_ACME, engine.clone());

    let outcome = redeployer.redeploy("acme/app", "latest").await.unwrap();

    assert_eq!(
        engine.calls(),
        vec![
            Call::Pull("acme/app:latest".to_string()),
            Call::List,
            Call::Stop("old-web".to_string()),
            Call::Remove("old-web".to_string()),
            Call::Create("web".to_string()),
            Call::Start("new-web".to_string()),
        ]
    );

    let RedeployOutcome::Redeployed { image, services } = outcome else {
        panic!("expected a redeploy");
    };
    assert_eq!(image, "acme/app:latest");
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].service.as_str(), "web");
    assert_eq!(services[0].container.as_str(), "new-web");
    assert_eq!(services[0].replaced.as_ref().map(|id| id.as_str()), Some("old-web"));
}

#[tokio::test]
async fn creates_precompiled_spec() {
    let engine = Arc::new(FakeEngine::new());
    let redeployer = redeployer(WEB_ON_ACME, engine.clone());

    redeployer.redeploy("acme/app", "latest").await.unwrap();

    let specs = engine.created_specs();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].process.image, "acme/app");
    assert!(specs[0].host.port_bindings.contains_key("80/tcp"));
}

#[tokio::test]
async fn skips_teardown_without_existing_container() {
    let engine = Arc::new(FakeEngine::new().with_container("other", "db"));
    let redeployer = redeployer(WEB_ON_ACME, engine.clone());

    redeployer.redeploy("acme/app", "latest").await.unwrap();

    assert_eq!(
        engine.calls(),
        vec![
            Call::Pull("acme/app:latest".to_string()),
            Call::List,
            Call::Create("web".to_string()),
            Call::Start("new-web".to_string()),
        ]
    );
}

#[tokio::test]
async fn name_match_is_exact() {
    let engine = Arc::new(FakeEngine::new().with_container("lookalike", "web-old"));
    let redeployer = redeployer(WEB_ON_ACME, engine.clone());

    redeployer.redeploy("acme/app", "latest").await.unwrap();

    assert!(!engine.calls().contains(&Call::Stop("lookalike".to_string())));
}

#[tokio::test]
async fn stop_failure_does_not_abort() {
    let engine = Arc::new(
        FakeEngine::new()
            .with_container("old-web", "web")
            .failing(Op::Stop),
    );
    let redeployer = redeployer(WEB_ON_ACME, engine.clone());

    let outcome = redeployer.redeploy("acme/app", "latest").await;

    assert!(outcome.is_ok());
    assert_eq!(
        engine.calls()[2..],
        [
            Call::Stop("old-web".to_string()),
            Call::Remove("old-web".to_string()),
            Call::Create("web".to_string()),
            Call::Start("new-web".to_string()),
        ]
    );
}

#[tokio::test]
async fn list_failure_is_treated_as_no_container() {
    let engine = Arc::new(
        FakeEngine::new()
            .with_container("old-web", "web")
            .failing(Op::List),
    );
    let redeployer = redeployer(WEB_ON_ACME, engine.clone());

    redeployer.redeploy("acme/app", "latest").await.unwrap();

    assert_eq!(
        engine.mutations(),
        vec![
            Call::Pull("acme/app:latest".to_string()),
            Call::Create("web".to_string()),
            Call::Start("new-web".to_string()),
        ]
    );
}

#[tokio::test]
async fn create_failure_aborts() {
    let engine = Arc::new(FakeEngine::new().failing(Op::Create));
    let redeployer = redeployer(WEB_ON_ACME, engine.clone());

    let err = redeployer.redeploy("acme/app", "latest").await.unwrap_err();

    assert_eq!(err.kind(), RedeployErrorKind::CreateFailed);
    assert!(!err.is_client_error());
    assert!(!engine.calls().iter().any(|c| matches!(c, Call::Start(_))));
}

#[tokio::test]
async fn start_failure_aborts() {
    let engine = Arc::new(FakeEngine::new().failing(Op::Start));
    let redeployer = redeployer(WEB_ON_ACME, engine.clone());

    let err = redeployer.redeploy("acme/app", "latest").await.unwrap_err();

    assert_eq!(err.kind(), RedeployErrorKind::StartFailed);
}

#[tokio::test]
async fn pull_failure_touches_nothing() {
    let engine = Arc::new(
        FakeEngine::new()
            .with_container("old-web", "web")
            .failing(Op::Pull),
    );
    let redeployer = redeployer(WEB_ON_ACME, engine.clone());

    let err = redeployer.redeploy("acme/app", "latest").await.unwrap_err();

    assert_eq!(err.kind(), RedeployErrorKind::PullFailed);
    assert_eq!(engine.calls(), vec![Call::Pull("acme/app:latest".to_string())]);
}

#[tokio::test]
async fn untracked_image_is_a_no_op() {
    let engine = Arc::new(FakeEngine::new());
    let redeployer = redeployer(WEB_ON_ACME, engine.clone());

    let outcome = redeployer.redeploy("acme/other", "latest").await.unwrap();

    assert_eq!(
        outcome,
        RedeployOutcome::Untracked {
            image: "acme/other:latest".to_string()
        }
    );
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn latest_fallback_only_applies_to_latest() {
    let engine = Arc::new(FakeEngine::new());
    let redeployer = redeployer(WEB_ON_ACME, engine.clone());

    assert!(redeployer.resolve("acme/app", "latest").is_some());
    assert!(redeployer.resolve("acme/app", "v2").is_none());

    let outcome = redeployer.redeploy("acme/app", "v2").await.unwrap();
    assert!(matches!(outcome, RedeployOutcome::Untracked { .. }));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn exact_tag_match_wins() {
    let yaml = r#"
services:
  pinned:
    image: acme/app:v2
  floating:
    image: acme/app
"#;
    let engine = Arc::new(FakeEngine::new());
    let redeployer = redeployer(yaml, engine.clone());

    redeployer.redeploy("acme/app", "v2").await.unwrap();

    assert_eq!(
        engine.mutations(),
        vec![
            Call::Pull("acme/app:v2".to_string()),
            Call::Create("pinned".to_string()),
            Call::Start("new-pinned".to_string()),
        ]
    );
}

#[tokio::test]
async fn fans_out_in_declaration_order() {
    let yaml = r#"
services:
  worker:
    image: acme/app
    command: worker
  api:
    image: acme/app
    command: serve
  db:
    image: postgres:16
"#;
    let engine = Arc::new(
        FakeEngine::new()
            .with_container("old-api", "api")
            .with_container("pg", "db"),
    );
    let redeployer = redeployer(yaml, engine.clone());

    let outcome = redeployer.redeploy("acme/app", "latest").await.unwrap();

    assert_eq!(
        engine.mutations(),
        vec![
            Call::Pull("acme/app:latest".to_string()),
            Call::Create("worker".to_string()),
            Call::Start("new-worker".to_string()),
            Call::Stop("old-api".to_string()),
            Call::Remove("old-api".to_string()),
            Call::Create("api".to_string()),
            Call::Start("new-api".to_string()),
        ]
    );
    let RedeployOutcome::Redeployed { services, .. } = outcome else {
        panic!("expected a redeploy");
    };
    let names: Vec<_> = services.iter().map(|s| s.service.as_str()).collect();
    assert_eq!(names, ["worker", "api"]);
}

#[tokio::test]
async fn create_failure_keeps_earlier_services_replaced() {
    let yaml = r#"
services:
  first:
    image: acme/app
  second:
    image: acme/app
  third:
    image: acme/app
"#;
    let engine = Arc::new(
        FakeEngine::new()
            .with_container("old-first", "first")
            .with_container("old-third", "third")
            .failing_for(Op::Create, "second"),
    );
    let redeployer = redeployer(yaml, engine.clone());

    let err = redeployer.redeploy("acme/app", "latest").await.unwrap_err();

    assert_eq!(err.kind(), RedeployErrorKind::CreateFailed);
    assert_eq!(
        engine.mutations(),
        vec![
            Call::Pull("acme/app:latest".to_string()),
            Call::Stop("old-first".to_string()),
            Call::Remove("old-first".to_string()),
            Call::Create("first".to_string()),
            Call::Start("new-first".to_string()),
            Call::Create("second".to_string()),
        ]
    );
}

#[tokio::test]
async fn start_failure_stops_before_later_services() {
    let yaml = r#"
services:
  first:
    image: acme/app
  second:
    image: acme/app
"#;
    let engine = Arc::new(FakeEngine::new().failing_for(Op::Start, "new-first"));
    let redeployer = redeployer(yaml, engine.clone());

    let err = redeployer.redeploy("acme/app", "latest").await.unwrap_err();

    assert_eq!(err.kind(), RedeployErrorKind::StartFailed);
    assert!(!engine.calls().contains(&Call::Create("second".to_string())));
}

#[tokio::test]
async fn container_without_id_is_not_torn_down() {
    let engine = Arc::new(FakeEngine::new().with_container("", "web"));
    let redeployer = redeployer(WEB_ON_ACME, engine.clone());

    let outcome = redeployer.redeploy("acme/app", "latest").await.unwrap();

    assert_eq!(
        engine.calls(),
        vec![
            Call::Pull("acme/app:latest".to_string()),
            Call::List,
            Call::Create("web".to_string()),
            Call::Start("new-web".to_string()),
        ]
    );
    let RedeployOutcome::Redeployed { services, .. } = outcome else {
        panic!("expected a redeploy");
    };
    assert_eq!(services[0].replaced, None);
}

#[tokio::test]
async fn container_without_id_does_not_hide_a_later_match() {
    let engine = Arc::new(
        FakeEngine::new()
            .with_container("", "web")
            .with_container("old-web", "web"),
    );
    let redeployer = redeployer(WEB_ON_ACME, engine.clone());

    redeployer.redeploy("acme/app", "latest").await.unwrap();

    assert!(engine.calls().contains(&Call::Stop("old-web".to_string())));
    assert!(!engine.calls().contains(&Call::Stop(String::new())));
}

#[tokio::test]
async fn tagged_repository_is_a_client_error() {
    let yaml = r#"
services:
  pinned:
    image: acme/app:v1
"#;
    let engine = Arc::new(FakeEngine::new());
    let redeployer = redeployer(yaml, engine.clone());

    // "acme/app:v1" + "latest" falls back to the service declaring "acme/app:v1",
    // but a repository name cannot carry a tag of its own.
    let err = redeployer.redeploy("acme/app:v1", "latest").await.unwrap_err();

    assert_eq!(err.kind(), RedeployErrorKind::InvalidImage);
    assert!(err.is_client_error());
    assert!(engine.calls().is_empty());
}
