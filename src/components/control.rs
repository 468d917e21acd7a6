//! Tags the renderer handles itself. They are registered so lookups succeed
//! and carry the capability that tells the walker what to do.

use std::sync::Arc;

use strum::IntoEnumIterator;

use super::{Capability, Component, Layout};
use crate::analyzer::tags::{ASK_MEMBERS, ASK_NAMESPACE};
use crate::input::requirement::InputType;
use crate::renderer::post_execution::ActionKind;

pub const INPUTS_TAG: &str = "Inputs";
pub const POST_EXECUTION_TAG: &str = "PostExecution";

pub(crate) fn components() -> Vec<Arc<dyn Component>> {
    let mut components: Vec<Arc<dyn Component>> = vec![
        Arc::new(Marker::new("If", Capability::Conditional)),
        Arc::new(Marker::new("ForEach", Capability::Loop)),
        Arc::new(Marker::new(INPUTS_TAG, Capability::Declarations)),
        Arc::new(Marker::new(POST_EXECUTION_TAG, Capability::PostExecution)),
    ];
    for kind in ActionKind::iter() {
        components.push(Arc::new(Marker::new(kind.to_string(), Capability::Action(kind))));
    }
    for member in ASK_MEMBERS {
        let capability = match InputType::from_ask_member(member) {
            Some(input_type) => Capability::Input(input_type),
            None => Capability::Silent,
        };
        components.push(Arc::new(Marker::new(
            format!("{}.{}", ASK_NAMESPACE, member),
            capability,
        )));
    }
    components
}

pub struct Marker {
    tag: String,
    capability: Capability,
}

impl Marker {
    pub fn new<S: Into<String>>(tag: S, capability: Capability) -> Self {
        Self {
            tag: tag.into(),
            capability,
        }
    }
}

impl Component for Marker {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn capability(&self) -> Capability {
        self.capability
    }

    fn layout(&self) -> Layout {
        match self.capability {
            Capability::Input(_) => Layout::Inline,
            _ => Layout::Block,
        }
    }
}
