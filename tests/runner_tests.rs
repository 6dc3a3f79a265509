//! End-to-end runs through the public FeatureRunner API.

use std::sync::Arc;

use stepflow::{
    CaptureLogger, FeatureDocument, FeatureRunner, RunStage, SeedVariable,
};

fn doc(path: &str, text: &str) -> FeatureDocument {
    FeatureDocument::new(path, text)
}

#[tokio::test]
async fn test_set_and_display_logs_value() {
    let logger = Arc::new(CaptureLogger::new());
    let result = FeatureRunner::builder()
        .logger(logger.clone())
        .run(&[doc("/f", "set x to y\ndisplay x")], &[])
        .await;
    assert!(result.ok, "{:?}", result.failure);
    assert!(logger.contains("x is y"));
}

#[tokio::test]
async fn test_strict_mode_unmatched_line_aborts_run() {
    let result = FeatureRunner::builder()
        .run(&[doc("/f", "frobnicate the widget")], &[])
        .await;
    assert!(!result.ok);
    assert!(result.features.is_empty());
    let failure = result.failure.expect("stage failure");
    assert_eq!(failure.stage, RunStage::Resolve);
    assert!(failure.error.contains("frobnicate"));
}

#[tokio::test]
async fn test_permissive_mode_unmatched_line_is_noop() {
    let result = FeatureRunner::builder()
        .permissive()
        .run(&[doc("/f", "frobnicate the widget\nset x to y")], &[])
        .await;
    assert!(result.ok);
    let steps = &result.features[0].step_results;
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].action_results[0].name, "comment");
}

#[tokio::test]
async fn test_hierarchical_background_expansion() {
    let logger = Arc::new(CaptureLogger::new());
    let result = FeatureRunner::builder()
        .logger(logger.clone())
        .run(
            &[
                doc("/f1", "set a to 1"),
                doc("/f1/l1f1", "display a"),
            ],
            &[],
        )
        .await;
    assert!(result.ok, "{:?}", result.failure);
    // The nested feature sees /f1's text prepended, so `a` is in scope.
    assert!(logger.contains("a is 1"));
    assert_eq!(result.features[1].step_results.len(), 2);
}

#[tokio::test]
async fn test_explicit_background_inclusion() {
    let logger = Arc::new(CaptureLogger::new());
    let result = FeatureRunner::builder()
        .logger(logger.clone())
        .run(
            &[doc("/f", "Backgrounds: setup\ndisplay a")],
            &[doc("/shared/setup", "set a to ready")],
        )
        .await;
    assert!(result.ok, "{:?}", result.failure);
    assert!(logger.contains("a is ready"));
}

#[tokio::test]
async fn test_missing_background_aborts_at_expand() {
    let result = FeatureRunner::builder()
        .run(&[doc("/f", "Backgrounds: nonesuch")], &[])
        .await;
    let failure = result.failure.expect("stage failure");
    assert_eq!(failure.stage, RunStage::Expand);
}

#[tokio::test]
async fn test_set_empty_does_not_overwrite() {
    let logger = Arc::new(CaptureLogger::new());
    let result = FeatureRunner::builder()
        .logger(logger.clone())
        .run(
            &[doc("/f", "set x to y\nset empty x to z\ndisplay x")],
            &[],
        )
        .await;
    assert!(result.ok);
    assert!(logger.contains("x is y"));
    assert!(!logger.contains("x is z"));
}

#[tokio::test]
async fn test_ordered_domain_increment_clamps_at_top() {
    let feature = "\
ordered domain tees of a, b, c
set sleeve to a
variable sleeve is of domain tees
increment sleeve
check sleeve is b
increment sleeve
increment sleeve
check sleeve is c";
    let result = FeatureRunner::builder().run(&[doc("/f", feature)], &[]).await;
    assert!(result.ok, "{:?}", result.features[0]);
}

#[tokio::test]
async fn test_failed_step_short_circuits_feature_only() {
    let result = FeatureRunner::builder()
        .run(
            &[
                doc("/a", "set x to y\ncheck x is wrong\nset never to reached"),
                doc("/b", "set x to y\ncheck x is y"),
            ],
            &[],
        )
        .await;
    assert!(!result.ok);
    assert!(!result.features[0].ok);
    // The failing feature stopped after the failed check.
    assert_eq!(result.features[0].step_results.len(), 2);
    assert!(result.features[1].ok);
}

#[tokio::test]
async fn test_seed_variables_are_readonly() {
    let mut runner = FeatureRunner::builder()
        .seed(SeedVariable::string("base", "http://localhost"))
        .build()
        .unwrap();
    let result = runner
        .run(&[doc("/f", "display base\nset base to other")], &[])
        .await;
    assert!(!result.ok);
    let steps = &result.features[0].step_results;
    assert!(steps[0].ok);
    assert!(!steps[1].ok);
    assert!(steps[1].action_results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("read-only"));
}

#[tokio::test]
async fn test_scenario_writes_do_not_leak() {
    let logger = Arc::new(CaptureLogger::new());
    let feature = "\
set x to outer
Scenario: first
set x to inner
display x
Scenario: second
display x";
    let result = FeatureRunner::builder()
        .logger(logger.clone())
        .run(&[doc("/f", feature)], &[])
        .await;
    assert!(result.ok, "{:?}", result.features[0]);
    let messages: Vec<String> = logger.messages().into_iter().map(|(_, m)| m).collect();
    assert!(messages.iter().any(|m| m == "x is inner"));
    assert!(messages.iter().any(|m| m == "x is outer"));
}

#[tokio::test]
async fn test_show_steps_lists_exposed_definitions() {
    let result = FeatureRunner::builder()
        .run(&[doc("/f", "show steps")], &[])
        .await;
    assert!(result.ok, "{:?}", result.failure);
    let listed = result.features[0].step_results[0].action_results[0]
        .detail
        .as_ref()
        .unwrap()
        .as_array()
        .unwrap();
    assert!(listed.iter().any(|s| s["name"] == "set"));
    assert!(listed.iter().any(|s| s["name"] == "ensure"));
    // Structural markers are not part of the exposed surface.
    assert!(!listed.iter().any(|s| s["name"] == "feature"));
}

#[tokio::test]
async fn test_step_delay_paces_between_steps_only() {
    use std::time::{Duration, Instant};
    let started = Instant::now();
    let result = FeatureRunner::builder()
        .step_delay(Duration::from_secs(2))
        .run(&[doc("/f", "set x to y")], &[])
        .await;
    assert!(result.ok, "{:?}", result.failure);
    // A single-step feature never waits.
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_resolution_is_deterministic_across_runs() {
    let feature = doc("/f", "set x to y\ndisplay x\ncheck x is y");
    let a = FeatureRunner::builder().run(&[feature.clone()], &[]).await;
    let b = FeatureRunner::builder().run(&[feature], &[]).await;
    assert_eq!(
        serde_json::to_value(&a).unwrap(),
        serde_json::to_value(&b).unwrap()
    );
}
