//! Dry-run provisioning of a manifest-defined stack.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::fs;

use hookstack_common::config::HookstackConfig;
use hookstack_common::error::HookstackError;
use hookstack_compose::manifest;
use hookstack_provision::DryRunEngine;

const MANIFEST: &str = r"
stack: CacheOffEcsLambdaStack
secrets:
  - id: MomentoSecret
    arn: arn:aws:secretsmanager:us-west-2:252703795646:secret:moment-webhook-token-brOeW3
functions:
  - name: WebhookHandler
    artifact: app/lambda_webhook
    memory_mb: 256
    environment:
      RUST_LOG: webhook_handler=debug
    secrets: [MomentoSecret]
    url:
      auth: none
";

// ── Helpers ──────────────────────────────────────────────────────────

fn config(out_dir: &std::path::Path) -> HookstackConfig {
    HookstackConfig {
        out_dir: out_dir.to_path_buf(),
        account: "252703795646".into(),
        ..HookstackConfig::default()
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[test]
fn deploys_manifest_and_writes_parseable_template() {
    let root = tempfile::tempdir().expect("tempdir");
    let artifact = root.path().join("app/lambda_webhook");
    fs::create_dir_all(&artifact).expect("mkdir");
    fs::write(artifact.join("bootstrap"), b"\x7fELF").expect("write");

    let config = config(&root.path().join("cdk.out"));
    let mut composer = manifest::parse(MANIFEST)
        .expect("parse")
        .compose(&config)
        .expect("compose");
    let _ = composer.synthesize().expect("synthesize");

    let engine = DryRunEngine::from_config(&config).artifact_root(root.path());
    let report = composer.deploy(&engine).expect("deploy");

    assert!(report.success);
    assert_eq!(report.stack, "CacheOffEcsLambdaStack");
    assert_eq!(
        report.identity("WebhookHandler"),
        Some("arn:aws:lambda:us-west-2:252703795646:function:WebhookHandler")
    );
    let url = report.url("WebhookHandlerUrl").expect("url");
    assert!(url.ends_with(".lambda-url.us-west-2.on.aws/"), "got: {url}");

    let template = fs::read_to_string(engine.template_path("CacheOffEcsLambdaStack"))
        .expect("template written");
    let json: serde_json::Value = serde_json::from_str(&template).expect("valid json");
    assert_eq!(json["stack"], "CacheOffEcsLambdaStack");
    assert_eq!(json["units"][0]["memory_mb"], 256);
    assert_eq!(json["endpoints"][0]["auth_mode"], "none");
}

#[test]
fn missing_artifact_is_an_engine_failure() {
    let root = tempfile::tempdir().expect("tempdir");
    let config = config(&root.path().join("cdk.out"));
    let mut composer = manifest::parse(MANIFEST)
        .expect("parse")
        .compose(&config)
        .expect("compose");
    let _ = composer.synthesize().expect("synthesize");

    let engine = DryRunEngine::from_config(&config).artifact_root(root.path());
    let err = composer.deploy(&engine).unwrap_err();
    assert!(
        matches!(err, HookstackError::Provisioning { ref message, .. } if message.contains("WebhookHandler")),
        "got: {err}"
    );
}
