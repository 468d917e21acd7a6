//! Step-by-step collection of the inputs a prompt needs.
//!
//! An [`InputIterator`] runs discovery once on [`start`](InputIterator::start)
//! and then walks the requirements in document order. A host either drives it
//! by hand (`current` / `submit` / `previous` / `go_to`), hands it an
//! [`InputPrompter`], or fills everything from pre-supplied values with
//! [`run_non_interactive`](InputIterator::run_non_interactive). Both drivers
//! produce the same [`InputValues`] for the same answers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::prompter::{InputPrompter, PromptAnswer, PrompterError};
use super::requirement::{DefaultValue, InputRequirement};
use super::validation::{validate, ValidationError};
use crate::ast::Element;
use crate::renderer::{Diagnostic, DiscoveryError, Renderer};
use crate::value::{InputValues, Value};

/// Attempts per input before an interactive run gives up on it.
pub const MAX_RETRIES: usize = 3;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IteratorError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("Input iterator has not been started")]
    NotStarted,
    #[error("No value for required input `{0}`")]
    MissingValue(String),
    #[error("Invalid value for `{name}`: {}", .errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    InvalidValue {
        name: String,
        errors: Vec<ValidationError>,
    },
    #[error(transparent)]
    Prompter(#[from] PrompterError),
    #[error("Input collection was cancelled")]
    Cancelled,
}

pub type IteratorResult<T> = Result<T, IteratorError>;

/// Where the iterator is hosted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Environment {
    /// A person answers prompts.
    Interactive,
    /// Batch runs: values come from files or flags.
    NonInteractive,
    /// Inside another application that supplies values up front.
    Embedded,
}

/// What a batch run does with a required input that has neither a value nor
/// a default.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MissingDefaultPolicy {
    /// Fail with [`IteratorError::MissingValue`].
    Error,
    /// Leave it unanswered; it renders as nothing.
    Skip,
    /// Use the empty value of the input's type.
    Default,
}

#[derive(Debug, Clone)]
pub struct IteratorOptions {
    /// Pre-supplied values, used by batch runs, suggestions and embedded hosts.
    pub values: InputValues,
    pub validate_on_submit: bool,
    pub environment: Environment,
}

impl Default for IteratorOptions {
    fn default() -> Self {
        Self {
            values: InputValues::new(),
            validate_on_submit: true,
            environment: Environment::Interactive,
        }
    }
}

impl IteratorOptions {
    pub fn with_values(mut self, values: InputValues) -> Self {
        self.values = values;
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum IteratorState {
    NotStarted,
    Iterating,
    Done,
}

/// Result of one [`InputIterator::submit`]. Rejections are data, not errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitOutcome {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl SubmitOutcome {
    fn accepted() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    fn rejected(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

pub struct InputIterator {
    element: Arc<Element>,
    renderer: Renderer,
    options: IteratorOptions,
    state: IteratorState,
    requirements: Vec<InputRequirement>,
    diagnostics: Vec<Diagnostic>,
    cursor: usize,
    values: InputValues,
}

impl InputIterator {
    pub fn new(element: Arc<Element>, options: IteratorOptions) -> Self {
        Self::with_renderer(element, options, Renderer::default())
    }

    pub fn with_renderer(
        element: Arc<Element>,
        options: IteratorOptions,
        renderer: Renderer,
    ) -> Self {
        Self {
            element,
            renderer,
            options,
            state: IteratorState::NotStarted,
            requirements: Vec::new(),
            diagnostics: Vec::new(),
            cursor: 0,
            values: InputValues::new(),
        }
    }

    /// Runs discovery and positions the iterator on the first input. Embedded
    /// hosts get their pre-supplied values submitted right away; the iterator
    /// stops on the first input without a valid one.
    #[instrument(level = "debug", skip(self))]
    pub async fn start(&mut self) -> IteratorResult<()> {
        let discovery = self.renderer.discover(&self.element, None).await?;
        info!("Discovered {} inputs", discovery.requirements.len());
        self.requirements = discovery.requirements;
        self.diagnostics = discovery.diagnostics;
        self.values.clear();
        self.cursor = 0;
        self.update_state();

        if self.options.environment == Environment::Embedded {
            while let Some(name) = self.current().map(|r| r.name.clone()) {
                let Some(value) = self.options.values.get(&name).cloned() else {
                    break;
                };
                let outcome = self.submit(value);
                if !outcome.valid {
                    warn!("Pre-supplied value for `{}` rejected", name);
                    break;
                }
            }
        }
        Ok(())
    }

    async fn ensure_started(&mut self) -> IteratorResult<()> {
        if self.state == IteratorState::NotStarted {
            self.start().await?;
        }
        Ok(())
    }

    fn update_state(&mut self) {
        self.state = if self.cursor >= self.requirements.len() {
            IteratorState::Done
        } else {
            IteratorState::Iterating
        };
    }

    pub fn state(&self) -> IteratorState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == IteratorState::Done
    }

    pub fn requirements(&self) -> &[InputRequirement] {
        &self.requirements
    }

    /// Warnings collected by discovery.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// The input awaiting a value, if any.
    pub fn current(&self) -> Option<&InputRequirement> {
        match self.state {
            IteratorState::Iterating => self.requirements.get(self.cursor),
            _ => None,
        }
    }

    /// What to pre-fill for the current input: an earlier answer, a
    /// pre-supplied value, or the input's default.
    pub fn suggested_value(&self) -> Option<Value> {
        let requirement = self.current()?;
        self.values
            .get(&requirement.name)
            .or_else(|| self.options.values.get(&requirement.name))
            .filter(|value| !value.is_unset())
            .cloned()
            .or_else(|| self.default_of(requirement))
    }

    fn default_of(&self, requirement: &InputRequirement) -> Option<Value> {
        match requirement.default.as_ref()? {
            DefaultValue::Literal(value) => Some(value.clone()),
            DefaultValue::Reference(other) => self
                .values
                .get(other)
                .or_else(|| self.options.values.get(other))
                .filter(|value| !value.is_empty())
                .cloned(),
        }
    }

    /// Validates (when enabled) and stores a value for the current input,
    /// then advances.
    #[instrument(level = "debug", skip(self, value))]
    pub fn submit<V: Into<Value>>(&mut self, value: V) -> SubmitOutcome {
        let Some(requirement) = self.current().cloned() else {
            return SubmitOutcome::rejected(vec![ValidationError::NotAccepting]);
        };
        let value = value.into();
        let value = if self.options.validate_on_submit {
            match validate(&requirement, &value) {
                Ok(coerced) => coerced,
                Err(errors) => {
                    debug!("Rejected value for `{}`", requirement.name);
                    return SubmitOutcome::rejected(errors);
                }
            }
        } else {
            value
        };
        self.values.insert(requirement.name, value);
        self.cursor += 1;
        self.update_state();
        SubmitOutcome::accepted()
    }

    /// Steps back one input. Returns false at the first input.
    pub fn previous(&mut self) -> bool {
        if self.state == IteratorState::NotStarted || self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.update_state();
        true
    }

    /// Moves to `index`, clamped to `[0, len]`; `len` means done.
    pub fn go_to(&mut self, index: usize) -> IteratorResult<()> {
        if self.state == IteratorState::NotStarted {
            return Err(IteratorError::NotStarted);
        }
        self.cursor = index.min(self.requirements.len());
        self.update_state();
        Ok(())
    }

    /// Forgets collected values and rewinds, keeping discovered requirements.
    pub fn reset(&mut self) {
        self.values.clear();
        self.cursor = 0;
        if self.state != IteratorState::NotStarted {
            self.update_state();
        }
    }

    pub fn values(&self) -> &InputValues {
        &self.values
    }

    pub fn into_values(self) -> InputValues {
        self.values
    }

    fn checked(&self, requirement: &InputRequirement, value: Value) -> IteratorResult<Value> {
        if !self.options.validate_on_submit {
            return Ok(value);
        }
        validate(requirement, &value).map_err(|errors| IteratorError::InvalidValue {
            name: requirement.name.clone(),
            errors,
        })
    }

    /// Fills every input without asking: the pre-supplied value (even an
    /// empty one, checked as [`submit`](Self::submit) checks it), else the
    /// default, else `policy` for required inputs. Optional inputs without
    /// either are left out.
    #[instrument(level = "debug", skip(self))]
    pub async fn run_non_interactive(
        &mut self,
        policy: MissingDefaultPolicy,
    ) -> IteratorResult<InputValues> {
        self.ensure_started().await?;
        self.values.clear();
        for requirement in self.requirements.clone() {
            let candidate = match self.options.values.get(&requirement.name) {
                Some(value) => Some(value.clone()),
                None => self.default_of(&requirement),
            };
            match candidate {
                Some(value) => {
                    let value = self.checked(&requirement, value)?;
                    self.values.insert(requirement.name, value);
                }
                None if !requirement.required => {}
                None => match policy {
                    MissingDefaultPolicy::Error => {
                        return Err(IteratorError::MissingValue(requirement.name))
                    }
                    MissingDefaultPolicy::Skip => {
                        debug!("Skipping input `{}`", requirement.name);
                        self.values.insert(requirement.name, Value::Unset);
                    }
                    MissingDefaultPolicy::Default => {
                        let empty = requirement.input_type.empty_value();
                        self.values.insert(requirement.name, empty);
                    }
                },
            }
        }
        self.cursor = self.requirements.len();
        self.update_state();
        Ok(self.values.clone())
    }

    /// Asks `prompter` for each remaining input. A rejected answer is asked
    /// again with its errors, up to [`MAX_RETRIES`] attempts.
    pub async fn run_interactive(
        &mut self,
        prompter: &dyn InputPrompter,
    ) -> IteratorResult<InputValues> {
        if self.options.environment == Environment::NonInteractive {
            return Err(PrompterError::Unavailable("non-interactive environment".to_string()).into());
        }
        self.ensure_started().await?;

        'inputs: while let Some(requirement) = self.current().cloned() {
            let suggested = self.suggested_value();
            let mut errors = Vec::new();
            for _ in 0..MAX_RETRIES {
                match prompter.ask(&requirement, suggested.clone(), &errors).await? {
                    PromptAnswer::Value(value) => {
                        let outcome = self.submit(value);
                        if outcome.valid {
                            continue 'inputs;
                        }
                        errors = outcome.errors;
                    }
                    PromptAnswer::Back => {
                        self.previous();
                        continue 'inputs;
                    }
                    PromptAnswer::Cancel => return Err(IteratorError::Cancelled),
                }
            }
            return Err(IteratorError::InvalidValue {
                name: requirement.name,
                errors,
            });
        }
        Ok(self.values.clone())
    }
}

pub fn create_input_iterator<E: Into<Arc<Element>>>(
    element: E,
    options: IteratorOptions,
) -> InputIterator {
    InputIterator::new(element.into(), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::prompter::MockInputPrompter;
    use crate::parser::parse;
    use mockall::Sequence;
    use pretty_assertions::assert_eq;

    const MARKUP: &str = r#"<Prompt name="p">
        <Ask.Text name="who" label="Who" />
        <Ask.Number name="count" default="3" />
        <Ask.Text name="alias" default={inputs.who} />
        <Ask.Text name="notes" required="false" />
        <Task>{inputs.who}</Task>
    </Prompt>"#;

    fn iterator(options: IteratorOptions) -> InputIterator {
        create_input_iterator(parse(MARKUP, "test").unwrap(), options)
    }

    #[tokio::test]
    async fn test_walks_inputs_in_order() {
        let mut it = iterator(IteratorOptions::default());
        assert_eq!(it.state(), IteratorState::NotStarted);
        assert!(it.current().is_none());
        it.start().await.unwrap();
        assert_eq!(it.len(), 4);
        assert_eq!(it.current().unwrap().name, "who");
        assert_eq!(it.suggested_value(), None);

        assert!(it.submit("Ada").valid);
        assert_eq!(it.current().unwrap().name, "count");
        assert_eq!(it.suggested_value(), Some(Value::string("3")));

        let outcome = it.submit("many");
        assert!(!outcome.valid);
        assert_eq!(it.current().unwrap().name, "count");
        assert!(it.submit("7").valid);
        assert_eq!(it.values().get("count"), Some(&Value::Number(7.0)));

        assert_eq!(it.suggested_value(), Some(Value::string("Ada")));
        assert!(it.submit("A").valid);
        assert!(it.submit("").valid);
        assert!(it.is_done());
        assert_eq!(
            it.submit("late").errors,
            vec![ValidationError::NotAccepting]
        );
    }

    #[tokio::test]
    async fn test_navigation() {
        let mut it = iterator(IteratorOptions::default());
        assert!(!it.previous());
        assert_eq!(it.go_to(1), Err(IteratorError::NotStarted));
        it.start().await.unwrap();
        assert!(!it.previous());
        it.submit("Ada");
        assert!(it.previous());
        assert_eq!(it.current().unwrap().name, "who");
        assert_eq!(it.suggested_value(), Some(Value::string("Ada")));

        it.go_to(99).unwrap();
        assert!(it.is_done());
        assert_eq!(it.position(), 4);
        it.go_to(2).unwrap();
        assert_eq!(it.current().unwrap().name, "alias");

        it.reset();
        assert_eq!(it.position(), 0);
        assert!(it.values().is_empty());
        assert_eq!(it.len(), 4);
    }

    #[tokio::test]
    async fn test_non_interactive_defaults_and_policy() {
        let options =
            IteratorOptions::default().with_values(InputValues::new().with("who", "Ada"));
        let mut it = iterator(options);
        let values = it
            .run_non_interactive(MissingDefaultPolicy::Error)
            .await
            .unwrap();
        assert_eq!(values.get("who"), Some(&Value::string("Ada")));
        assert_eq!(values.get("count"), Some(&Value::Number(3.0)));
        assert_eq!(values.get("alias"), Some(&Value::string("Ada")));
        assert!(!values.contains("notes"));
        assert!(it.is_done());

        let mut missing = iterator(IteratorOptions::default());
        assert_eq!(
            missing.run_non_interactive(MissingDefaultPolicy::Error).await,
            Err(IteratorError::MissingValue("who".to_string()))
        );
        let skipped = iterator(IteratorOptions::default())
            .run_non_interactive(MissingDefaultPolicy::Skip)
            .await
            .unwrap();
        assert_eq!(skipped.get("who"), Some(&Value::Unset));
        let defaulted = iterator(IteratorOptions::default())
            .run_non_interactive(MissingDefaultPolicy::Default)
            .await
            .unwrap();
        assert_eq!(defaulted.get("who"), Some(&Value::string("")));
    }

    #[tokio::test]
    async fn test_non_interactive_rejects_invalid_value() {
        let options = IteratorOptions::default()
            .with_values(InputValues::new().with("who", "Ada").with("count", "x"));
        let result = iterator(options)
            .run_non_interactive(MissingDefaultPolicy::Error)
            .await;
        assert!(matches!(
            result,
            Err(IteratorError::InvalidValue { ref name, .. }) if name == "count"
        ));
    }

    #[tokio::test]
    async fn test_non_interactive_keeps_empty_values() {
        let root = parse(
            r#"<Prompt>
                <Inputs><Ask.Text name="x" default="fallback" required="false" /></Inputs>
                <Task>[{inputs.x}]</Task>
            </Prompt>"#,
            "test",
        )
        .unwrap();
        let options = IteratorOptions::default().with_values(InputValues::new().with("x", ""));
        let batch = create_input_iterator(root.clone(), options.clone())
            .run_non_interactive(MissingDefaultPolicy::Error)
            .await
            .unwrap();
        let mut stepped = create_input_iterator(root.clone(), options);
        stepped.start().await.unwrap();
        assert!(stepped.submit("").valid);
        assert_eq!(batch, stepped.into_values());
        assert_eq!(batch.get("x"), Some(&Value::string("")));

        let absent = create_input_iterator(root, IteratorOptions::default())
            .run_non_interactive(MissingDefaultPolicy::Error)
            .await
            .unwrap();
        assert_eq!(absent.get("x"), Some(&Value::string("fallback")));

        let blank = IteratorOptions::default().with_values(InputValues::new().with("who", ""));
        assert!(matches!(
            iterator(blank).run_non_interactive(MissingDefaultPolicy::Error).await,
            Err(IteratorError::InvalidValue { ref name, .. }) if name == "who"
        ));
    }

    #[tokio::test]
    async fn test_embedded_prefills() {
        let options = IteratorOptions::default()
            .with_environment(Environment::Embedded)
            .with_values(InputValues::new().with("who", "Ada").with("count", "4"));
        let mut it = iterator(options);
        it.start().await.unwrap();
        assert_eq!(it.current().unwrap().name, "alias");
        assert_eq!(it.values().len(), 2);
    }

    #[tokio::test]
    async fn test_discovery_error() {
        let root = parse(r#"<Prompt><Ask.Text label="x" /></Prompt>"#, "test").unwrap();
        let mut it = create_input_iterator(root, IteratorOptions::default());
        assert!(matches!(
            it.start().await,
            Err(IteratorError::Discovery(DiscoveryError::MissingName { .. }))
        ));
        assert_eq!(it.state(), IteratorState::NotStarted);
    }

    #[tokio::test]
    async fn test_interactive_accepts_suggestions() {
        let mut prompter = MockInputPrompter::new();
        prompter
            .expect_ask()
            .times(4)
            .returning(|requirement, suggested, _| {
                Ok(PromptAnswer::Value(
                    suggested.unwrap_or_else(|| Value::string(format!("{}!", requirement.name))),
                ))
            });
        let values = iterator(IteratorOptions::default())
            .run_interactive(&prompter)
            .await
            .unwrap();
        assert_eq!(values.get("who"), Some(&Value::string("who!")));
        assert_eq!(values.get("count"), Some(&Value::Number(3.0)));
        assert_eq!(values.get("alias"), Some(&Value::string("who!")));
        assert_eq!(values.get("notes"), Some(&Value::string("notes!")));
    }

    #[tokio::test]
    async fn test_interactive_retries_then_fails() {
        let mut prompter = MockInputPrompter::new();
        let mut seq = Sequence::new();
        prompter
            .expect_ask()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(PromptAnswer::Value(Value::string("Ada"))));
        prompter
            .expect_ask()
            .times(MAX_RETRIES)
            .in_sequence(&mut seq)
            .returning(|requirement, _, _| {
                assert_eq!(requirement.name, "count");
                Ok(PromptAnswer::Value(Value::string("lots")))
            });
        let result = iterator(IteratorOptions::default())
            .run_interactive(&prompter)
            .await;
        assert!(matches!(
            result,
            Err(IteratorError::InvalidValue { ref name, ref errors }) if name == "count" && !errors.is_empty()
        ));
    }

    #[tokio::test]
    async fn test_interactive_back_and_cancel() {
        let mut prompter = MockInputPrompter::new();
        let mut seq = Sequence::new();
        prompter
            .expect_ask()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(PromptAnswer::Value(Value::string("Ada"))));
        prompter
            .expect_ask()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(PromptAnswer::Back));
        prompter
            .expect_ask()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|requirement, suggested, _| {
                assert_eq!(requirement.name, "who");
                assert_eq!(suggested, Some(Value::string("Ada")));
                Ok(PromptAnswer::Cancel)
            });
        let result = iterator(IteratorOptions::default())
            .run_interactive(&prompter)
            .await;
        assert_eq!(result, Err(IteratorError::Cancelled));
    }

    #[tokio::test]
    async fn test_interactive_unavailable_in_batch_environment() {
        let prompter = MockInputPrompter::new();
        let options = IteratorOptions::default().with_environment(Environment::NonInteractive);
        let result = iterator(options).run_interactive(&prompter).await;
        assert!(matches!(
            result,
            Err(IteratorError::Prompter(PrompterError::Unavailable(_)))
        ));
    }
}
