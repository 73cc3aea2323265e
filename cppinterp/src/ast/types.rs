//! Type AST nodes

use serde::{Deserialize, Serialize};

/// Name of the void type as written in source
pub const VOID: &str = "void";

/// A type as written at a declaration site: `int`, `string&`, `Point`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeUsage {
    pub name: String,
    /// Trailing `&`
    pub is_reference: bool,
}

impl TypeUsage {
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_reference: false,
        }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_reference: true,
        }
    }

    pub fn is_void(&self) -> bool {
        self.name == VOID
    }
}

impl std::fmt::Display for TypeUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_reference {
            write!(f, "{}&", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Member visibility inside a class body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
    Protected,
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
            Visibility::Protected => write!(f, "protected"),
        }
    }
}
