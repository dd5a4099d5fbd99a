use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;

/// One lexical frame: a name→value map plus a link to the enclosing frame.
/// Frames are reference-counted because closures keep the frame they
/// captured alive past its lexical block.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Unconditional insert/overwrite in this frame.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Name-walking lookup along the chain.
    pub fn get(&self, name: &Token) -> Result<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(undefined_variable(name))
        }
    }

    /// Name-walking assignment: writes at the first frame that defines the
    /// name, never creates a binding.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if self.values.contains_key(&name.lexeme) {
            self.values.insert(name.lexeme.clone(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined_variable(name))
        }
    }

    /// Depth-indexed lookup: skip exactly `distance` links, then read.
    /// `None` means the resolver and the runtime disagree about this frame
    /// chain; the interpreter turns it into an undefined-variable error.
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Option<Value> {
        let frame = Environment::ancestor(env, distance)?;
        let value = frame.borrow().values.get(name).cloned();
        value
    }

    /// Depth-indexed assignment; `false` on a missing frame or name.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
    ) -> bool {
        match Environment::ancestor(env, distance) {
            Some(frame) => {
                frame.borrow_mut().values.insert(name.to_string(), value);
                true
            }
            None => false,
        }
    }

    fn ancestor(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment>>> {
        let mut current = Rc::clone(env);

        for _ in 0..distance {
            let enclosing = current.borrow().enclosing.as_ref().map(Rc::clone);
            match enclosing {
                Some(next) => current = next,
                None => return None,
            }
        }

        Some(current)
    }
}

fn undefined_variable(name: &Token) -> LoxError {
    LoxError::runtime(
        name.line,
        format!("Undefined variable '{}'.", name.lexeme),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn ident(name: &str) -> Token {
        Token::new(TokenType::IDENTIFIER, name.to_string(), 1)
    }

    #[test]
    fn define_then_get() {
        let mut env = Environment::new();
        env.define("x", Value::Number(1.0));

        assert!(matches!(env.get(&ident("x")), Ok(Value::Number(n)) if n == 1.0));
        assert!(env.get(&ident("y")).is_err());
    }

    #[test]
    fn assign_walks_to_defining_frame() {
        let global = Rc::new(RefCell::new(Environment::new()));
        global.borrow_mut().define("x", Value::Number(1.0));

        let inner = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            &global,
        ))));

        inner
            .borrow_mut()
            .assign(&ident("x"), Value::Number(2.0))
            .unwrap();

        assert!(matches!(
            global.borrow().get(&ident("x")),
            Ok(Value::Number(n)) if n == 2.0
        ));
    }

    #[test]
    fn assign_never_creates_bindings() {
        let mut env = Environment::new();
        assert!(env.assign(&ident("ghost"), Value::Nil).is_err());
    }

    #[test]
    fn get_at_skips_exact_depth() {
        let global = Rc::new(RefCell::new(Environment::new()));
        global.borrow_mut().define("x", Value::Number(1.0));

        let middle = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            &global,
        ))));
        middle.borrow_mut().define("x", Value::Number(2.0));

        let inner = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            &middle,
        ))));

        assert!(matches!(
            Environment::get_at(&inner, 1, "x"),
            Some(Value::Number(n)) if n == 2.0
        ));
        assert!(matches!(
            Environment::get_at(&inner, 2, "x"),
            Some(Value::Number(n)) if n == 1.0
        ));
        assert!(Environment::get_at(&inner, 0, "x").is_none());
    }
}
