use actcore::{
    ActivityDefinition, ConnectionDefinition, NamedActivity, TypeResolutionError, Value, Variables,
    WorkflowDefinitionVersion, WorkflowExpression, WorkflowStatus,
};
use activities::{standard_registry, Absolute, IfElse, SetVariable};
use actruntime::ActivityRuntime;
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn definition(
    activities: Vec<ActivityDefinition>,
    connections: Vec<ConnectionDefinition>,
) -> WorkflowDefinitionVersion {
    WorkflowDefinitionVersion {
        id: "standard".to_string(),
        version: 1,
        name: None,
        activities,
        connections,
        is_disabled: false,
    }
}

fn set_variable(id: &str, name: &str, expression: WorkflowExpression) -> ActivityDefinition {
    ActivityDefinition::new(id, SetVariable::TYPE_NAME)
        .with_state("variableName", json!(name))
        .with_expression("valueExpression", expression)
}

#[tokio::test]
async fn test_absolute_reads_across_scopes() {
    let runtime = ActivityRuntime::new(standard_registry());

    let workflow = definition(
        vec![
            set_variable("promote", "dyGloVar", WorkflowExpression::variable("luna"))
                .with_variable("luna", -3.5),
            set_variable("shadow", "glo", WorkflowExpression::literal("-8")),
            ActivityDefinition::new("fromInput", Absolute::TYPE_NAME)
                .with_expression("valueExpression", WorkflowExpression::variable("gloVar1")),
            ActivityDefinition::new("fromPromoted", Absolute::TYPE_NAME)
                .with_expression("valueExpression", WorkflowExpression::variable("dyGloVar")),
            ActivityDefinition::new("fromShadowed", Absolute::TYPE_NAME)
                .with_expression("valueExpression", WorkflowExpression::variable("glo")),
        ],
        vec![
            ConnectionDefinition::new("promote", "shadow", "Done"),
            ConnectionDefinition::new("shadow", "fromInput", "Done"),
            ConnectionDefinition::new("fromInput", "fromPromoted", "Done"),
            ConnectionDefinition::new("fromPromoted", "fromShadowed", "Done"),
        ],
    );

    let (workflow, outcome) = runtime
        .execute(
            workflow,
            Variables::new().with("gloVar1", -12.0),
            &Variables::new().with("glo", 4.0),
            None,
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, WorkflowStatus::Finished);
    let result_of = |id: &str| {
        workflow
            .activity(id)
            .unwrap()
            .output()
            .get(Absolute::RESULT)
            .cloned()
    };
    assert_eq!(result_of("fromInput"), Some(Value::Number(12.0)));
    assert_eq!(result_of("fromPromoted"), Some(Value::Number(3.5)));
    assert_eq!(result_of("fromShadowed"), Some(Value::Number(8.0)));

    assert_eq!(workflow.input().get("dyGloVar"), Some(&Value::Number(-3.5)));
    assert!(!workflow.input().contains("luna"));
}

#[tokio::test]
async fn test_absolute_rejects_non_numeric_value() {
    let runtime = ActivityRuntime::new(standard_registry());
    let (workflow, outcome) = runtime
        .execute(
            definition(
                vec![ActivityDefinition::new("abs", Absolute::TYPE_NAME)
                    .with_expression("valueExpression", WorkflowExpression::literal("north"))],
                vec![],
            ),
            Variables::new(),
            &Variables::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, WorkflowStatus::Faulted);
    assert!(workflow.activity("abs").unwrap().output().is_empty());
}

#[tokio::test]
async fn test_if_else_follows_condition() {
    let runtime = ActivityRuntime::new(standard_registry());
    let branching = definition(
        vec![
            ActivityDefinition::new("check", IfElse::TYPE_NAME).with_expression(
                "conditionExpression",
                WorkflowExpression::variable("approved"),
            ),
            set_variable("yes", "decision", WorkflowExpression::literal("\"approved\"")),
            set_variable("no", "decision", WorkflowExpression::literal("\"rejected\"")),
        ],
        vec![
            ConnectionDefinition::new("check", "yes", "True"),
            ConnectionDefinition::new("check", "no", "False"),
        ],
    );

    let (approved, outcome) = runtime
        .execute(
            branching.clone(),
            Variables::new().with("approved", true),
            &Variables::new(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(outcome.executed, vec!["check", "yes"]);
    assert_eq!(approved.input().get("decision"), Some(&Value::from("approved")));

    let (rejected, outcome) = runtime
        .execute(
            branching,
            Variables::new().with("approved", false),
            &Variables::new(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(outcome.executed, vec!["check", "no"]);
    assert_eq!(rejected.input().get("decision"), Some(&Value::from("rejected")));
}

#[tokio::test]
async fn test_signaled_halts_until_signal_arrives() {
    let runtime = ActivityRuntime::new(standard_registry());
    let gated = definition(
        vec![
            ActivityDefinition::new("gate", "Signaled").with_state("signal", json!("go")),
            ActivityDefinition::new("log", "WriteLine")
                .with_expression("textExpression", WorkflowExpression::literal("through")),
        ],
        vec![ConnectionDefinition::new("gate", "log", "Done")],
    );

    let mut workflow = runtime
        .create_workflow(gated, None, None, None)
        .unwrap();
    let outcome = runtime
        .run(&mut workflow, &Variables::new(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.status, WorkflowStatus::Halted);
    assert_eq!(outcome.blocking, vec!["gate"]);

    // still no signal: stays halted
    let outcome = runtime
        .run(&mut workflow, &Variables::new(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.status, WorkflowStatus::Halted);

    let outcome = runtime
        .run(
            &mut workflow,
            &Variables::new().with("go", true),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.status, WorkflowStatus::Finished);
    assert_eq!(outcome.executed, vec!["gate", "log"]);
    assert_eq!(
        workflow.activity("log").unwrap().output().get("Text"),
        Some(&Value::from("through"))
    );
}

#[tokio::test]
async fn test_fault_and_finish_stop_the_run() {
    let runtime = ActivityRuntime::new(standard_registry());

    let (faulted, outcome) = runtime
        .execute(
            definition(
                vec![
                    ActivityDefinition::new("fail", "Fault").with_state("message", json!("no stock")),
                    set_variable("after", "x", WorkflowExpression::literal("1")),
                ],
                vec![ConnectionDefinition::new("fail", "after", "Done")],
            ),
            Variables::new(),
            &Variables::new(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(outcome.status, WorkflowStatus::Faulted);
    assert_eq!(faulted.fault(), Some("no stock"));
    assert!(!faulted.input().contains("x"));

    let (_, outcome) = runtime
        .execute(
            definition(
                vec![
                    ActivityDefinition::new("wait", "Signaled").with_state("signal", json!("never")),
                    ActivityDefinition::new("done", "Finish"),
                    set_variable("after", "x", WorkflowExpression::literal("1")),
                ],
                vec![ConnectionDefinition::new("done", "after", "Done")],
            ),
            Variables::new(),
            &Variables::new(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(outcome.status, WorkflowStatus::Finished);
    assert!(outcome.blocking.is_empty());
    assert_eq!(outcome.executed, vec!["wait", "done"]);
}

#[test]
fn test_qualified_names_resolve_through_fallback() {
    let registry = standard_registry();

    let short = registry.resolve_type("Absolute").unwrap();
    let qualified = registry.resolve_type("activities::Absolute").unwrap();
    assert_eq!(qualified.name(), "Absolute");
    assert!(short.same_as(&registry.resolve_type("Absolute").unwrap()));

    let activity = registry.resolve_activity("activities::IfElse").unwrap();
    assert_eq!(activity.type_name(), "IfElse");

    assert_eq!(
        registry.resolve_type("Nope").unwrap_err(),
        TypeResolutionError::Unknown("Nope".to_string())
    );
    assert!(matches!(
        registry.resolve_type("activities::"),
        Err(TypeResolutionError::Unparsable { .. })
    ));
    assert!(matches!(
        registry.resolve_type("other::Absolute"),
        Err(TypeResolutionError::Unknown(_))
    ));
}

#[test]
fn test_every_kind_has_metadata() {
    let registry = standard_registry();
    let names = registry.registered_types();
    assert_eq!(
        names,
        vec!["Absolute", "Fault", "Finish", "IfElse", "SetVariable", "Signaled", "WriteLine"]
    );
    for name in names {
        let metadata = registry.get_metadata(&name).unwrap();
        assert!(!metadata.category.is_empty());
    }
}
