use std::collections::HashMap;

use solz_lexer::Pos;

/// Names declared in one contract or function body
#[derive(Debug, Clone, Default)]
pub struct Scope {
    /// Declaring position of each name
    names: HashMap<String, Pos>,
    /// Enclosing scope
    parent: Option<Box<Scope>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: Scope) -> Self {
        Self {
            names: HashMap::new(),
            parent: Some(Box::new(parent)),
        }
    }

    /// Declare `name` here, replacing an earlier declaration in this scope.
    pub fn define(&mut self, name: impl Into<String>, pos: Pos) {
        self.names.insert(name.into(), pos);
    }

    /// Innermost declaration of `name` along the chain
    pub fn lookup(&self, name: &str) -> Option<Pos> {
        if let Some(pos) = self.names.get(name) {
            Some(*pos)
        } else if let Some(parent) = &self.parent {
            parent.lookup(name)
        } else {
            None
        }
    }

    pub fn depth(&self) -> usize {
        self.parent.as_ref().map_or(0, |parent| parent.depth() + 1)
    }

    pub fn into_parent(self) -> Option<Scope> {
        self.parent.map(|b| *b)
    }
}
