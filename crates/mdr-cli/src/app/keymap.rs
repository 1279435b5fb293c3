use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use mdr_core::Transition;
use thiserror::Error;

/// Name of the single view showing the document.
pub const RENDER_VIEW: &str = "render";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Active whichever view has focus.
    Global,
    View(&'static str),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => f.write_str("global"),
            Scope::View(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub scope: Scope,
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
    pub transition: Transition,
}

const fn view(code: KeyCode, modifiers: KeyModifiers, transition: Transition) -> Binding {
    Binding {
        scope: Scope::View(RENDER_VIEW),
        code,
        modifiers,
        transition,
    }
}

pub const BINDINGS: &[Binding] = &[
    Binding {
        scope: Scope::Global,
        code: KeyCode::Char('c'),
        modifiers: KeyModifiers::CONTROL,
        transition: Transition::Quit,
    },
    view(KeyCode::Char('q'), KeyModifiers::NONE, Transition::Quit),
    view(KeyCode::Char('k'), KeyModifiers::NONE, Transition::LineUp),
    view(KeyCode::Char('p'), KeyModifiers::CONTROL, Transition::LineUp),
    view(KeyCode::Up, KeyModifiers::NONE, Transition::LineUp),
    view(KeyCode::Char('j'), KeyModifiers::NONE, Transition::LineDown),
    view(KeyCode::Char('n'), KeyModifiers::CONTROL, Transition::LineDown),
    view(KeyCode::Down, KeyModifiers::NONE, Transition::LineDown),
    view(KeyCode::PageUp, KeyModifiers::NONE, Transition::PageUp),
    view(KeyCode::Char(','), KeyModifiers::NONE, Transition::PageUp),
    view(KeyCode::PageDown, KeyModifiers::NONE, Transition::PageDown),
    view(KeyCode::Char(' '), KeyModifiers::NONE, Transition::PageDown),
    view(KeyCode::Char('m'), KeyModifiers::NONE, Transition::PageDown),
    view(KeyCode::Char('g'), KeyModifiers::NONE, Transition::Top),
    view(KeyCode::Char('G'), KeyModifiers::NONE, Transition::Bottom),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeymapError {
    #[error("key {key} is bound twice in scope {scope}")]
    Duplicate { scope: Scope, key: String },
}

type BindingKey = (Scope, KeyCode, KeyModifiers);

#[derive(Debug, Default)]
pub struct KeyDispatcher {
    bindings: HashMap<BindingKey, Transition>,
}

impl KeyDispatcher {
    /// Registers a whole table. Nothing is returned unless every binding
    /// registered.
    pub fn register_all(table: &[Binding]) -> Result<Self, KeymapError> {
        let mut dispatcher = Self::default();
        for binding in table {
            dispatcher.register(*binding)?;
        }
        tracing::debug!(bindings = dispatcher.bindings.len(), "registered key bindings");
        Ok(dispatcher)
    }

    fn register(&mut self, binding: Binding) -> Result<(), KeymapError> {
        let modifiers = normalize(binding.code, binding.modifiers);
        match self.bindings.entry((binding.scope, binding.code, modifiers)) {
            Entry::Occupied(_) => Err(KeymapError::Duplicate {
                scope: binding.scope,
                key: format!("{modifiers:?}+{:?}", binding.code),
            }),
            Entry::Vacant(slot) => {
                slot.insert(binding.transition);
                Ok(())
            }
        }
    }

    /// Global bindings win over bindings of the focused view.
    pub fn dispatch(&self, focused: &'static str, key: KeyEvent) -> Option<Transition> {
        let modifiers = normalize(key.code, key.modifiers);
        self.bindings
            .get(&(Scope::Global, key.code, modifiers))
            .or_else(|| self.bindings.get(&(Scope::View(focused), key.code, modifiers)))
            .copied()
    }
}

/// Characters already carry their case, so Shift is dropped for them.
fn normalize(code: KeyCode, modifiers: KeyModifiers) -> KeyModifiers {
    match code {
        KeyCode::Char(_) => modifiers.difference(KeyModifiers::SHIFT),
        _ => modifiers,
    }
}
