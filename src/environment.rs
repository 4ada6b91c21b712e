use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope frame.  Closures and active blocks hold these;
/// a write through any holder is visible to every other holder.
pub type EnvRef<'a> = Rc<RefCell<Environment<'a>>>;

/// One lexical scope: name → value, plus the enclosing frame (absent only for
/// the global frame).
#[derive(Debug, Default)]
pub struct Environment<'a> {
    values: HashMap<String, Value<'a>>,
    enclosing: Option<EnvRef<'a>>,
}

impl<'a> Environment<'a> {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef<'a>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Convenience: a fresh shared child frame of `enclosing`.
    pub fn child_of(enclosing: &EnvRef<'a>) -> EnvRef<'a> {
        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            enclosing,
        ))))
    }

    pub fn enclosing(&self) -> Option<EnvRef<'a>> {
        self.enclosing.clone()
    }

    /// Inserts or overwrites unconditionally in this frame.
    pub fn define(&mut self, name: &str, value: Value<'a>) {
        self.values.insert(name.to_string(), value);
    }

    /// Walks the chain outward from this frame.
    pub fn get(&self, name: &Token<'_>) -> Result<Value<'a>> {
        if let Some(value) = self.values.get(name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined(name))
        }
    }

    /// Walks the chain outward and overwrites the first binding found.
    pub fn assign(&mut self, name: &Token<'_>, value: Value<'a>) -> Result<()> {
        if let Some(slot) = self.values.get_mut(name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// The frame exactly `distance` enclosing-links away from `env`.
    pub fn ancestor(env: &EnvRef<'a>, distance: usize) -> Option<EnvRef<'a>> {
        let mut frame = Rc::clone(env);
        for _ in 0..distance {
            let next = frame.borrow().enclosing()?;
            frame = next;
        }
        Some(frame)
    }

    /// Reads `name` directly from the frame `distance` hops out.  Only used for
    /// resolver-recorded accesses; a miss means the resolver and interpreter
    /// disagree about scope layout.
    pub fn get_at(env: &EnvRef<'a>, distance: usize, name: &Token<'_>) -> Result<Value<'a>> {
        let frame = Environment::ancestor(env, distance).ok_or_else(|| desync(name, distance))?;
        let value = frame.borrow().values.get(name.lexeme).cloned();
        value.ok_or_else(|| desync(name, distance))
    }

    /// Same as [`Environment::get_at`] for a name without a token (`this`, `super`).
    pub fn get_named_at(env: &EnvRef<'a>, distance: usize, name: &str) -> Option<Value<'a>> {
        let frame = Environment::ancestor(env, distance)?;
        let value = frame.borrow().values.get(name).cloned();
        value
    }

    pub fn assign_at(
        env: &EnvRef<'a>,
        distance: usize,
        name: &Token<'_>,
        value: Value<'a>,
    ) -> Result<()> {
        let frame = Environment::ancestor(env, distance).ok_or_else(|| desync(name, distance))?;
        frame.borrow_mut().define(name.lexeme, value);
        Ok(())
    }
}

fn undefined(name: &Token<'_>) -> LoxError {
    LoxError::runtime(name.line, format!("Undefined variable '{}'.", name.lexeme))
}

fn desync(name: &Token<'_>, distance: usize) -> LoxError {
    debug!(
        "Resolved access to '{}' at distance {} found no binding",
        name.lexeme, distance
    );
    undefined(name)
}
