use std::sync::Mutex;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use promptmark::{
    config::{self, PromptConfig},
    create_input_iterator,
    input::{
        Environment, InputPrompter, IteratorState, PromptAnswer, PrompterError, ValidationError,
    },
    parse, InputRequirement, InputType, InputValues, Value,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

const FORM: &str = r#"<Prompt>
    <Inputs>
        <Ask.Select name="tone" label="Tone">
            <Ask.Option value="formal">Formal</Ask.Option>
            <Ask.Option value="casual">Casual</Ask.Option>
        </Ask.Select>
        <Ask.Text name="ticket" pattern="[A-Z]+-[0-9]+" />
        <Ask.Confirm name="urgent" required="false" />
    </Inputs>
    <Task>Reply to {inputs.ticket} in a {inputs.tone} tone.</Task>
</Prompt>"#;

/// Answers from a fixed script and records what it was asked.
struct ScriptedPrompter {
    answers: Mutex<Vec<PromptAnswer>>,
    asked: Mutex<Vec<(String, usize)>>,
}

impl ScriptedPrompter {
    fn new(answers: Vec<PromptAnswer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().rev().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl InputPrompter for ScriptedPrompter {
    async fn ask(
        &self,
        requirement: &InputRequirement,
        _suggested: Option<Value>,
        errors: &[ValidationError],
    ) -> Result<PromptAnswer, PrompterError> {
        self.asked
            .lock()
            .unwrap()
            .push((requirement.name.clone(), errors.len()));
        self.answers
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| PrompterError::Unavailable("script exhausted".to_string()))
    }
}

#[tokio::test]
async fn it_discovers_typed_requirements() {
    let mut iterator = create_input_iterator(parse(FORM, "form").unwrap(), Default::default());
    iterator.start().await.unwrap();
    let types: Vec<InputType> = iterator
        .requirements()
        .iter()
        .map(|r| r.input_type)
        .collect();
    assert_eq!(
        types,
        vec![InputType::Select, InputType::Text, InputType::Boolean]
    );
    let tone = &iterator.requirements()[0];
    assert_eq!(tone.label, "Tone");
    let choices: Vec<&str> = tone
        .constraints
        .choices
        .iter()
        .map(|c| c.value.as_str())
        .collect();
    assert_eq!(choices, vec!["formal", "casual"]);
}

#[tokio::test]
async fn it_validates_and_coerces_submissions() {
    let mut iterator = create_input_iterator(parse(FORM, "form").unwrap(), Default::default());
    iterator.start().await.unwrap();

    let rejected = iterator.submit("rude");
    assert!(!rejected.valid);
    assert!(matches!(
        rejected.errors[0],
        ValidationError::InvalidChoice { .. }
    ));
    assert!(iterator.submit("casual").valid);

    assert!(!iterator.submit("ticket 12").valid);
    assert!(iterator.submit("OPS-12").valid);

    assert!(iterator.submit("yes").valid);
    assert_eq!(iterator.state(), IteratorState::Done);
    assert_eq!(iterator.values().get("urgent"), Some(&Value::Bool(true)));

    let result = promptmark::render(
        &parse(FORM, "form").unwrap(),
        &promptmark::RenderOptions::new()
            .with_provider("openai")
            .with_inputs(iterator.values().clone()),
    )
    .await;
    assert_eq!(result.text, "## Task\n\nReply to OPS-12 in a casual tone.");
}

#[tokio::test]
async fn it_retries_and_steps_back_with_a_prompter() {
    let prompter = ScriptedPrompter::new(vec![
        PromptAnswer::Value(Value::string("formal")),
        PromptAnswer::Value(Value::string("nope")),
        PromptAnswer::Back,
        PromptAnswer::Value(Value::string("casual")),
        PromptAnswer::Value(Value::string("OPS-7")),
        PromptAnswer::Value(Value::string("")),
    ]);
    let mut iterator = create_input_iterator(parse(FORM, "form").unwrap(), Default::default());
    let values = iterator.run_interactive(&prompter).await.unwrap();

    assert_eq!(values.get("tone"), Some(&Value::string("casual")));
    assert_eq!(values.get("ticket"), Some(&Value::string("OPS-7")));
    assert_eq!(
        prompter.asked.lock().unwrap().clone(),
        vec![
            ("tone".to_string(), 0),
            ("ticket".to_string(), 0),
            ("ticket".to_string(), 1),
            ("tone".to_string(), 0),
            ("ticket".to_string(), 0),
            ("urgent".to_string(), 0),
        ]
    );
}

#[tokio::test]
async fn it_reports_prompter_failures() {
    let prompter = ScriptedPrompter::new(Vec::new());
    let mut iterator = create_input_iterator(parse(FORM, "form").unwrap(), Default::default());
    let result = iterator.run_interactive(&prompter).await;
    assert!(result.is_err());
    assert_eq!(iterator.position(), 0);
}

#[tokio::test]
async fn it_takes_options_from_config() {
    let config: PromptConfig = config::from_str(
        r#"{ "inputs": { "environment": "embedded", "onMissingDefault": "default" } }"#,
    )
    .unwrap();
    let mut options = config.iterator_options();
    assert_eq!(options.environment, Environment::Embedded);
    options.values = InputValues::new().with("tone", "formal");

    let mut iterator = create_input_iterator(parse(FORM, "form").unwrap(), options);
    iterator.start().await.unwrap();
    assert_eq!(iterator.current().map(|r| r.name.as_str()), Some("ticket"));

    let values = iterator
        .run_non_interactive(config.inputs.on_missing_default)
        .await
        .unwrap();
    assert_eq!(values.get("tone"), Some(&Value::string("formal")));
    assert_eq!(values.get("ticket"), Some(&Value::string("")));
    assert!(!values.contains("urgent"));
}
