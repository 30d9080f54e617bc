use serde::{Deserialize, Serialize};

/// A module declaration found in a source file: the raw specifier and how
/// it was written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Declaration {
    pub specifier: String,
    pub kind: DeclarationKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeclarationKind {
    /// `import`, `export … from`, `require()`.
    Static,
    /// `import()` with a string literal.
    Dynamic,
    /// `import type` / `export type … from`.
    TypeOnly,
}

impl Declaration {
    pub fn new(specifier: impl Into<String>, kind: DeclarationKind) -> Self {
        Self { specifier: specifier.into(), kind }
    }

    pub fn is_type_only(&self) -> bool {
        self.kind == DeclarationKind::TypeOnly
    }
}
