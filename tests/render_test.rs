use pretty_assertions::assert_eq;
use promptmark::{
    parse,
    renderer::{DiagnosticCode, RenderError},
    InputValues, PostAction, RenderOptions, RenderResult, Value,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

async fn render_with(source: &str, inputs: InputValues) -> RenderResult {
    let root = parse(source, "render_test.prompt").unwrap();
    promptmark::render(
        &root,
        &RenderOptions::new()
            .with_provider("anthropic")
            .with_inputs(inputs),
    )
    .await
}

#[tokio::test]
async fn it_renders_inputs_into_text() {
    let result = render_with(
        r#"<Prompt bare>
            <Ask.Text name="topic" silent />
            <Task>Write about {inputs.topic}.</Task>
        </Prompt>"#,
        InputValues::new().with("topic", "tides"),
    )
    .await;
    assert!(result.ok, "{:?}", result.diagnostics);
    assert_eq!(result.text, "Write about tides.");
}

#[tokio::test]
async fn it_keeps_submitted_whitespace_verbatim() {
    let source =
        r#"<Prompt bare><Ask.Text name="notes" silent /><Task>Notes: [{inputs.notes}]</Task></Prompt>"#;
    let notes = "first  \n\n\n\nsecond  \n  indented";
    let mut iterator = promptmark::create_input_iterator(
        parse(source, "verbatim.prompt").unwrap(),
        Default::default(),
    );
    iterator.start().await.unwrap();
    assert!(iterator.submit(notes).valid);

    let result = render_with(source, iterator.into_values()).await;
    assert!(result.ok, "{:?}", result.diagnostics);
    assert_eq!(result.text, format!("Notes: [{}]", notes));
}

#[tokio::test]
async fn it_uses_defaults_and_default_references() {
    let source = r#"<Prompt bare>
        <Inputs>
            <Ask.Text name="author" />
            <Ask.Text name="reviewer" default={inputs.author} />
            <Ask.Number name="words" default="200" />
        </Inputs>
        <Task>{inputs.author} writes, {inputs.reviewer} reviews, {inputs.words} words.</Task>
    </Prompt>"#;
    let result = render_with(source, InputValues::new().with("author", "Kim")).await;
    assert!(result.ok, "{:?}", result.diagnostics);
    assert_eq!(result.text, "Kim writes, Kim reviews, 200 words.");
}

#[tokio::test]
async fn it_fails_on_missing_required_input() {
    let result = render_with(
        r#"<Prompt bare><Ask.Text name="who" silent /><Task>Hi {inputs.who}</Task></Prompt>"#,
        InputValues::new(),
    )
    .await;
    assert!(!result.ok);
    assert_eq!(result.text, "");
    assert_eq!(result.error, Some(RenderError::MissingInput("who".to_string())));
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::MissingInput && d.is_error()));
}

#[tokio::test]
async fn it_fails_on_undeclared_input() {
    let result = render_with(
        r#"<Prompt bare><Task>Hi {inputs.ghost}</Task></Prompt>"#,
        InputValues::new().with("ghost", "boo"),
    )
    .await;
    assert_eq!(result.error, Some(RenderError::UnknownInput("ghost".to_string())));
}

#[tokio::test]
async fn it_leaves_markers_in_partial_renders() {
    let root = parse(
        r#"<Prompt bare><Ask.Text name="who" silent /><Task>Hello {inputs.who}</Task></Prompt>"#,
        "partial",
    )
    .unwrap();
    let result = promptmark::render(&root, &RenderOptions::new().partial(true)).await;
    assert!(result.ok);
    assert_eq!(result.text, "Hello {who}");
}

#[tokio::test]
async fn it_skips_guarded_regions_without_evaluating_them() {
    let source = r#"<Prompt bare>
        <Inputs><Ask.Text name="secret" /></Inputs>
        <If when={false}><Task>{inputs.secret}</Task></If>
        <Task>Safe.</Task>
    </Prompt>"#;
    let result = render_with(source, InputValues::new()).await;
    assert!(result.ok, "{:?}", result.diagnostics);
    assert_eq!(result.text, "Safe.");
}

#[tokio::test]
async fn it_evaluates_conditions() {
    let source = r#"<Prompt bare>
        <Ask.Number name="count" silent />
        <Ask.Confirm name="detailed" default={false} silent />
        <If when={inputs.count > 2}><Task>Many.</Task></If>
        <If when={inputs.detailed}><Task>Detailed.</Task></If>
        <If when="=count = 1"><Task>One.</Task></If>
    </Prompt>"#;
    let many = render_with(source, InputValues::new().with("count", 5.0)).await;
    assert_eq!(many.text, "Many.");
    let one = render_with(
        source,
        InputValues::new().with("count", 1.0).with("detailed", true),
    )
    .await;
    assert_eq!(one.text, "Detailed.\n\nOne.");
}

#[tokio::test]
async fn it_loops_over_lists() {
    let source = r#"<Prompt bare>
        <Ask.MultiSelect name="topics" options="rust,go,zig" silent />
        <Task><ForEach items={inputs.topics} as="topic" index="i">{i}: {topic}</ForEach></Task>
    </Prompt>"#;
    let result = render_with(
        source,
        InputValues::new().with(
            "topics",
            Value::List(vec![Value::string("rust"), Value::string("zig")]),
        ),
    )
    .await;
    assert!(result.ok, "{:?}", result.diagnostics);
    assert_eq!(result.text, "0: rust\n1: zig");

    let empty = render_with(
        r#"<Prompt bare><Task>Start.<ForEach items={[]}>x</ForEach></Task></Prompt>"#,
        InputValues::new(),
    )
    .await;
    assert_eq!(empty.text, "Start.");
}

#[tokio::test]
async fn it_collects_post_execution_actions() {
    let source = r#"<Prompt bare>
        <Inputs>
            <Ask.Text name="outputFile" default="notes.md" />
        </Inputs>
        <Ask.ReviewFile name="report" silent />
        <Task>Summarize.</Task>
        <PostExecution>
            <WriteFile path={inputs.outputFile}>Saved to {inputs.outputFile}</WriteFile>
            <OpenUrl url="https://example.com/docs" />
            <RunCommand />
        </PostExecution>
    </Prompt>"#;
    let result = render_with(source, InputValues::new().with("report", "report.md")).await;
    assert!(result.ok, "{:?}", result.diagnostics);
    assert_eq!(result.text, "Summarize.");
    assert_eq!(
        result.post_execution,
        vec![
            PostAction::ReviewFile {
                file: "report.md".to_string(),
                editor: None,
            },
            PostAction::WriteFile {
                path: "notes.md".to_string(),
                content: "Saved to notes.md".to_string(),
            },
            PostAction::OpenUrl {
                url: "https://example.com/docs".to_string(),
                browser: None,
            },
        ]
    );
    assert!(result
        .warnings()
        .any(|d| d.code == DiagnosticCode::MissingAttribute));
}

#[tokio::test]
async fn it_warns_about_actions_outside_post_execution() {
    let result = render_with(
        r#"<Prompt bare><Task>Go.</Task><OpenUrl url="https://example.com" /></Prompt>"#,
        InputValues::new(),
    )
    .await;
    assert!(result.ok);
    assert!(result.post_execution.is_empty());
    assert_eq!(result.diagnostics[0].code, DiagnosticCode::MisplacedElement);
}

#[tokio::test]
async fn it_renders_composites_with_presets_and_extend() {
    let replaced = render_with(
        r#"<Prompt bare><Steps items="Plan,Build" /></Prompt>"#,
        InputValues::new(),
    )
    .await;
    assert_eq!(replaced.text, "1. Plan\n2. Build");

    let listed = render_with(
        r#"<Prompt bare><Steps><Step>Read</Step><Step>Write</Step></Steps></Prompt>"#,
        InputValues::new(),
    )
    .await;
    assert_eq!(listed.text, "1. Read\n2. Write");

    let extended = render_with(
        r#"<Prompt bare><Steps items="Plan" extend><Step>Ship</Step></Steps></Prompt>"#,
        InputValues::new(),
    )
    .await;
    assert_eq!(extended.text, "1. Plan\n2. Ship");

    let overridden = render_with(
        r#"<Prompt bare><Steps items="Plan"><Step>Ship</Step></Steps></Prompt>"#,
        InputValues::new(),
    )
    .await;
    assert_eq!(overridden.text, "1. Ship");
}

#[tokio::test]
async fn it_serializes_results() {
    let result = render_with(
        r#"<Prompt><Task>Go.</Task></Prompt>"#,
        InputValues::new(),
    )
    .await;
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["text"], "<task>\nGo.\n</task>");
    assert_eq!(json["provider"], "anthropic");
    assert_eq!(json["postExecution"], serde_json::json!([]));
}
