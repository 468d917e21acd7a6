//! # Renderer
//!
//! The renderer walks an [`Element`] tree twice:
//!
//! ```text
//! Element ─► discovery ─► Vec<InputRequirement>
//!                              │
//!                  InputIterator collects values
//!                              ▼
//! Element ─► render(InputValues, provider) ─► text + PostExecution actions
//! ```
//!
//! ## Discovery
//!
//! Side-effect free. Visits every node, including guarded and looped ones,
//! and returns the deduplicated input requirements. Field references resolve
//! to placeholders, so nothing needs to be known up front.
//!
//! ## Render
//!
//! Runs discovery again, then evaluates attributes, guards and loops against
//! the final [`InputValues`]. The same tree, values and provider always yield
//! byte-identical text unless the tree uses `DateTime` or `Uuid`.
//!
//! Failures never panic and never escape as `Err`: [`RenderResult::ok`] is
//! `false` and the cause is in [`RenderResult::error`] and the diagnostics.
//! Warnings (unknown presets, unknown tags, duplicate inputs) leave `ok` true.
//!
//! ## Concurrency
//!
//! Trees, preset tables and provider records are read-only, so one tree may be
//! rendered for several providers at once with [`render_for_providers`].
//! Cancellation is cooperative through [`CancelSignal`], checked between
//! node visits.

pub mod cancel;
pub mod diagnostics;
pub mod discovery;
pub mod post_execution;
pub mod render;

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::ast::Element;
use crate::components::{builtin_registry, ComponentRegistry, RenderContext};
use crate::config::{OutputConfig, RenderEnv};
use crate::eval::Scope;
use crate::provider::ProviderId;
use crate::value::InputValues;

pub use cancel::CancelSignal;
pub use diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
pub use discovery::{Discovery, DiscoveryError, DiscoveryResult};
pub use post_execution::{ActionKind, PostAction};
pub use render::{RenderError, Rendered};

use discovery::DiscoveryPass;
use render::RenderPass;

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub env: RenderEnv,
    pub inputs: InputValues,
    /// Render missing inputs as `{name}` instead of failing.
    pub partial: bool,
    /// Unknown tags fail the render instead of warning.
    pub strict_tags: bool,
    pub cancel: Option<CancelSignal>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, env: RenderEnv) -> Self {
        self.env = env;
        self
    }

    pub fn with_inputs(mut self, inputs: InputValues) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_provider<S: Into<String>>(mut self, provider: S) -> Self {
        self.env.llm.provider = Some(provider.into());
        self
    }

    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.env.llm.model = Some(model.into());
        self
    }

    pub fn partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    pub fn strict_tags(mut self, strict_tags: bool) -> Self {
        self.strict_tags = strict_tags;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    pub ok: bool,
    pub text: String,
    pub post_execution: Vec<PostAction>,
    pub diagnostics: Vec<Diagnostic>,
    pub provider: ProviderId,
    #[serde(skip)]
    pub error: Option<RenderError>,
}

impl RenderResult {
    fn failed(provider: ProviderId, error: RenderError, diagnostics: Diagnostics) -> Self {
        let mut diagnostics = diagnostics.into_vec();
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            error.code(),
            error.to_string(),
        ));
        tracing::warn!(%error, "render failed");
        Self {
            ok: false,
            text: String::new(),
            post_execution: Vec::new(),
            diagnostics,
            provider,
            error: Some(error),
        }
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }
}

/// Trims the ends of the artifact. Interior whitespace belongs to the
/// rendered values and is kept as is.
fn finish_output(text: String, output: &OutputConfig) -> String {
    if output.trim {
        text.trim().to_string()
    } else {
        text
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    registry: Arc<ComponentRegistry>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(builtin_registry())
    }
}

impl Renderer {
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Lists the inputs `element` needs, in document order.
    #[instrument(level = "debug", skip(self, element, cancel), fields(root = element.tag()))]
    pub async fn discover(
        &self,
        element: &Element,
        cancel: Option<&CancelSignal>,
    ) -> DiscoveryResult<Discovery> {
        DiscoveryPass::new(cancel).run(element).await
    }

    #[instrument(level = "debug", skip(self, element, options), fields(root = element.tag()))]
    pub async fn render(&self, element: &Element, options: &RenderOptions) -> RenderResult {
        let resolution = ProviderId::resolve(
            options.env.llm.provider.as_deref(),
            options.env.llm.model.as_deref(),
        );
        let provider = resolution.id;
        let mut diagnostics = Diagnostics::new();
        if let Some(unknown) = resolution.unknown {
            diagnostics.warn(
                DiagnosticCode::UnknownProvider,
                format!("Unknown provider `{}`; using unspecified", unknown),
            );
        }

        let cancel = options.cancel.as_ref();
        let discovery = match self.discover(element, cancel).await {
            Ok(discovery) => discovery,
            Err(error) => return RenderResult::failed(provider, error.into(), diagnostics),
        };
        diagnostics.extend(discovery.diagnostics);

        let scope = Scope::render(&options.inputs, &discovery.requirements, options.partial);
        let context =
            RenderContext::new(provider.adaptation()).with_indent(options.env.output.indent);
        let mut pass = RenderPass::new(&self.registry, options.strict_tags, cancel);
        let outcome = pass.run(element, &scope, &context).await;
        diagnostics.extend(pass.take_diagnostics().into_vec());

        match outcome {
            Ok((text, post_execution)) => {
                let text = finish_output(text, &options.env.output);
                debug!(%provider, chars = text.len(), actions = post_execution.len(), "rendered");
                RenderResult {
                    ok: true,
                    text,
                    post_execution,
                    diagnostics: diagnostics.into_vec(),
                    provider,
                    error: None,
                }
            }
            Err(error) => RenderResult::failed(provider, error, diagnostics),
        }
    }

    /// Renders one tree for several providers concurrently.
    pub async fn render_for_providers(
        &self,
        element: &Element,
        providers: &[ProviderId],
        options: &RenderOptions,
    ) -> Vec<RenderResult> {
        let per_provider: Vec<RenderOptions> = providers
            .iter()
            .map(|provider| {
                let mut options = options.clone();
                options.env.llm.provider = Some(provider.to_string());
                options.env.llm.model = None;
                options
            })
            .collect();
        join_all(
            per_provider
                .iter()
                .map(|options| self.render(element, options)),
        )
        .await
    }
}

/// Renders with the built-in components.
pub async fn render(element: &Element, options: &RenderOptions) -> RenderResult {
    Renderer::default().render(element, options).await
}

/// Discovers inputs with the built-in components.
pub async fn discover(element: &Element) -> DiscoveryResult<Discovery> {
    Renderer::default().discover(element, None).await
}

pub async fn render_for_providers(
    element: &Element,
    providers: &[ProviderId],
    options: &RenderOptions,
) -> Vec<RenderResult> {
    Renderer::default()
        .render_for_providers(element, providers, options)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn options(provider: &str) -> RenderOptions {
        RenderOptions::new().with_provider(provider)
    }

    async fn render_source(source: &str, options: &RenderOptions) -> RenderResult {
        let root = parse(source, "test.prompt").unwrap();
        render(&root, options).await
    }

    #[test]
    fn test_finish_output() {
        let output = OutputConfig::default();
        assert_eq!(
            finish_output("\n\n a  \n\n\n\nb\n".to_string(), &output),
            "a  \n\n\n\nb"
        );
        let raw = OutputConfig {
            trim: false,
            ..OutputConfig::default()
        };
        assert_eq!(finish_output(" a\n".to_string(), &raw), " a\n");
    }

    #[tokio::test]
    async fn test_xml_structure() {
        let result = render_source(
            r#"<Prompt>
                <Role preset="engineer" />
                <Task>Review the diff.</Task>
            </Prompt>"#,
            &options("anthropic"),
        )
        .await;
        assert!(result.ok, "{:?}", result.diagnostics);
        assert_eq!(
            result.text,
            "<role>\nYou are a software engineer in software development.\nYour expertise includes system design, debugging, and code review.\nYou are pragmatic and precise.\n</role>\n\n<task>\nReview the diff.\n</task>"
        );
    }

    #[tokio::test]
    async fn test_markdown_structure() {
        let result = render_source(
            r#"<Prompt>
                <Task description="Summarize the notes." />
                <Section title="Notes"><Context>Meeting notes.</Context></Section>
            </Prompt>"#,
            &options("openai"),
        )
        .await;
        assert_eq!(
            result.text,
            "## Task\n\nSummarize the notes.\n\n## Notes\n\n### Context\n\nMeeting notes."
        );
    }

    #[tokio::test]
    async fn test_bare_and_delimiter_override() {
        let bare = render_source(
            r#"<Prompt bare><Task>Do it.</Task></Prompt>"#,
            &options("anthropic"),
        )
        .await;
        assert_eq!(bare.text, "Do it.");
        let overridden = render_source(
            r#"<Prompt delimiter="markdown"><Task>Do it.</Task></Prompt>"#,
            &options("anthropic"),
        )
        .await;
        assert_eq!(overridden.text, "## Task\n\nDo it.");
    }

    #[tokio::test]
    async fn test_constraint_markers_follow_provider() {
        let source = r#"<Prompt bare><Constraint level="must-not">Guess.</Constraint></Prompt>"#;
        let anthropic = render_source(source, &options("anthropic")).await;
        assert_eq!(anthropic.text, "MUST NOT: Guess.");
        let google = render_source(source, &options("google")).await;
        assert_eq!(google.text, "Must not: Guess.");
    }

    #[tokio::test]
    async fn test_unknown_preset_warns() {
        let result = render_source(
            r#"<Prompt><Role preset="astronaut" title="pilot" /></Prompt>"#,
            &options("anthropic"),
        )
        .await;
        assert!(result.ok);
        assert_eq!(result.text, "<role>\nYou are a pilot.\n</role>");
        assert_eq!(result.diagnostics[0].code, DiagnosticCode::UnknownPreset);
    }

    #[tokio::test]
    async fn test_unknown_tag_is_transparent_or_strict() {
        let source = r#"<Prompt><Marquee>Hello</Marquee></Prompt>"#;
        let lenient = render_source(source, &options("anthropic")).await;
        assert!(lenient.ok);
        assert_eq!(lenient.text, "Hello");
        assert_eq!(lenient.diagnostics[0].code, DiagnosticCode::UnknownTag);

        let strict = render_source(source, &options("anthropic").strict_tags(true)).await;
        assert!(!strict.ok);
        assert!(matches!(strict.error, Some(RenderError::UnknownTag { .. })));
    }

    #[tokio::test]
    async fn test_unknown_provider_falls_back() {
        let result = render_source(r#"<Prompt><Task>x</Task></Prompt>"#, &options("acme")).await;
        assert!(result.ok);
        assert_eq!(result.provider, ProviderId::Unspecified);
        assert_eq!(result.diagnostics[0].code, DiagnosticCode::UnknownProvider);
    }

    #[tokio::test]
    async fn test_cancelled_render() {
        let signal = CancelSignal::new();
        signal.cancel();
        let result = render_source(
            r#"<Prompt><Task>x</Task></Prompt>"#,
            &RenderOptions::new().with_cancel(signal),
        )
        .await;
        assert!(!result.ok);
        assert!(result.post_execution.is_empty());
    }

    #[tokio::test]
    async fn test_render_for_providers() {
        let root = parse(r#"<Prompt><Task>Go.</Task></Prompt>"#, "t").unwrap();
        let results = render_for_providers(
            &root,
            &[ProviderId::Anthropic, ProviderId::OpenAI],
            &RenderOptions::new(),
        )
        .await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "<task>\nGo.\n</task>");
        assert_eq!(results[1].text, "## Task\n\nGo.");
    }
}
