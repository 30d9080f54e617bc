//! Declaration extractors: turn file content into the module specifiers it
//! declares. Purely syntactic, nothing here resolves a specifier.

use log::{debug, trace};
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    CallExpression, ExportAllDeclaration, ExportNamedDeclaration, Expression, ImportDeclaration,
    ImportDeclarationSpecifier, ImportExpression,
};
use oxc_ast_visit::{Visit, walk};
use oxc_parser::{Parser as OxcParser, ParserReturn};
use oxc_span::SourceType;
use std::{collections::HashMap, path::Path, sync::Arc};

use crate::{
    paths::dotted_extension,
    types::{Declaration, DeclarationKind},
};

/// Extracts module declarations from one source dialect.
pub trait DeclarationExtractor: Send + Sync {
    fn extract(&self, path: &Path, source: &str) -> Vec<Declaration>;
}

/// JavaScript and TypeScript in all their module flavours, parsed with oxc.
#[derive(Debug, Clone, Copy)]
pub struct EcmaScriptExtractor {
    /// Report `import type` declarations instead of skipping them.
    pub include_type_only: bool,
}

impl EcmaScriptExtractor {
    pub fn new(include_type_only: bool) -> Self {
        Self { include_type_only }
    }

    fn extract_with(&self, path: &Path, source: &str, st: SourceType) -> Vec<Declaration> {
        let allocator = Allocator::default();
        let ParserReturn { program, errors, .. } = OxcParser::new(&allocator, source, st).parse();
        if !errors.is_empty() {
            debug!("{} syntax errors while parsing {}", errors.len(), path.display());
        }

        let mut collector = DeclarationCollector { extractor: self, path, decls: Vec::new() };
        collector.visit_program(&program);

        debug!("Found {} module declarations in {}", collector.decls.len(), path.display());
        collector.decls
    }

    fn push(
        &self,
        decls: &mut Vec<Declaration>,
        specifier: &str,
        kind: DeclarationKind,
        path: &Path,
    ) {
        if kind == DeclarationKind::TypeOnly && !self.include_type_only {
            trace!("Skipping type-only declaration '{}' in {}", specifier, path.display());
            return;
        }
        trace!("Found {:?} declaration: '{}' in {}", kind, specifier, path.display());
        match decls.iter_mut().find(|d| d.specifier == specifier) {
            // A runtime import of the same specifier outranks a type-only one.
            Some(existing) => {
                if existing.kind == DeclarationKind::TypeOnly {
                    existing.kind = kind;
                }
            }
            None => decls.push(Declaration::new(specifier, kind)),
        }
    }
}

impl DeclarationExtractor for EcmaScriptExtractor {
    fn extract(&self, path: &Path, source: &str) -> Vec<Declaration> {
        trace!("Parsing file for declarations: {}", path.display());
        self.extract_with(path, source, source_type_for(path))
    }
}

/// Walks a whole program, so declarations inside functions, blocks and
/// exported initializers are found too.
struct DeclarationCollector<'e> {
    extractor: &'e EcmaScriptExtractor,
    path: &'e Path,
    decls: Vec<Declaration>,
}

impl DeclarationCollector<'_> {
    fn push(&mut self, specifier: &str, kind: DeclarationKind) {
        self.extractor.push(&mut self.decls, specifier, kind, self.path);
    }
}

fn declaration_kind(is_type: bool) -> DeclarationKind {
    if is_type { DeclarationKind::TypeOnly } else { DeclarationKind::Static }
}

impl<'a> Visit<'a> for DeclarationCollector<'_> {
    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        // import { type Foo } from 'bar' is type-only as well
        let has_runtime_import = !decl.import_kind.is_type()
            && decl.specifiers.as_ref().is_none_or(|specifiers| {
                specifiers.is_empty()
                    || specifiers.iter().any(|spec| match spec {
                        ImportDeclarationSpecifier::ImportSpecifier(s) => !s.import_kind.is_type(),
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(_)
                        | ImportDeclarationSpecifier::ImportNamespaceSpecifier(_) => true,
                    })
            });
        self.push(decl.source.value.as_str(), declaration_kind(!has_runtime_import));
    }

    fn visit_export_all_declaration(&mut self, decl: &ExportAllDeclaration<'a>) {
        self.push(decl.source.value.as_str(), declaration_kind(decl.export_kind.is_type()));
    }

    fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &decl.source {
            self.push(source.value.as_str(), declaration_kind(decl.export_kind.is_type()));
        }
        walk::walk_export_named_declaration(self, decl);
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::Identifier(callee) = &call.callee
            && callee.name.as_str() == "require"
            && let Some(Expression::StringLiteral(sl)) =
                call.arguments.first().and_then(|a| a.as_expression())
        {
            self.push(sl.value.as_str(), DeclarationKind::Static);
        }
        walk::walk_call_expression(self, call);
    }

    fn visit_import_expression(&mut self, import: &ImportExpression<'a>) {
        if let Expression::StringLiteral(sl) = &import.source {
            self.push(sl.value.as_str(), DeclarationKind::Dynamic);
        }
        walk::walk_import_expression(self, import);
    }
}

/// Vue and Svelte single-file components: every `<script>` block is parsed
/// with the language named by its `lang` attribute.
#[derive(Debug, Clone, Copy)]
pub struct ComponentExtractor {
    script: EcmaScriptExtractor,
}

impl ComponentExtractor {
    pub fn new(include_type_only: bool) -> Self {
        Self { script: EcmaScriptExtractor::new(include_type_only) }
    }
}

impl DeclarationExtractor for ComponentExtractor {
    fn extract(&self, path: &Path, source: &str) -> Vec<Declaration> {
        let mut decls: Vec<Declaration> = Vec::new();
        for block in script_blocks(source) {
            let st = SourceType::default()
                .with_module(true)
                .with_typescript(matches!(block.lang, Some("ts") | Some("tsx")))
                .with_jsx(matches!(block.lang, Some("tsx") | Some("jsx")));
            for decl in self.script.extract_with(path, block.content, st) {
                if !decls.iter().any(|d| d.specifier == decl.specifier) {
                    decls.push(decl);
                }
            }
        }
        decls
    }
}

#[derive(Debug, PartialEq, Eq)]
struct ScriptBlock<'a> {
    lang: Option<&'a str>,
    content: &'a str,
}

fn script_blocks(source: &str) -> Vec<ScriptBlock<'_>> {
    let mut blocks = Vec::new();
    let mut rest = source;

    while let Some(start) = rest.find("<script") {
        let after_tag = &rest[start + "<script".len()..];
        let Some(tag_end) = after_tag.find('>') else {
            break;
        };
        let attrs = &after_tag[..tag_end];
        let body = &after_tag[tag_end + 1..];
        let Some(close) = body.find("</script>") else {
            break;
        };
        blocks.push(ScriptBlock { lang: attribute(attrs, "lang"), content: &body[..close] });
        rest = &body[close + "</script>".len()..];
    }
    blocks
}

fn attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let pos = attrs.find(&format!("{}=", name))?;
    let value = &attrs[pos + name.len() + 1..];
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &value[1..];
    value.find(quote).map(|end| &value[..end])
}

fn source_type_for(path: &Path) -> SourceType {
    let ext = path.extension().and_then(|e| e.to_str());

    let mut st = SourceType::default()
        .with_jsx(matches!(ext, Some("tsx") | Some("jsx")))
        .with_typescript(matches!(ext, Some("ts") | Some("tsx") | Some("mts") | Some("cts")));

    if matches!(ext, Some("mjs") | Some("mts")) {
        st = st.with_module(true);
    }

    st
}

/// Maps dotted file extensions to the extractor for that dialect.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<String, Arc<dyn DeclarationExtractor>>,
}

impl ExtractorRegistry {
    /// oxc for `.js`-like and `.ts`-like files, script blocks for components.
    pub fn with_defaults(include_type_only: bool) -> Self {
        let mut registry = Self::default();
        let ecma: Arc<dyn DeclarationExtractor> =
            Arc::new(EcmaScriptExtractor::new(include_type_only));
        for ext in [".js", ".ts", ".jsx", ".tsx", ".mjs", ".cjs", ".mts", ".cts"] {
            registry.register(ext, Arc::clone(&ecma));
        }
        let component: Arc<dyn DeclarationExtractor> =
            Arc::new(ComponentExtractor::new(include_type_only));
        registry.register(".vue", Arc::clone(&component));
        registry.register(".svelte", component);
        registry
    }

    pub fn register(&mut self, extension: &str, extractor: Arc<dyn DeclarationExtractor>) {
        self.extractors.insert(extension.to_string(), extractor);
    }

    pub fn supports(&self, path: &Path) -> bool {
        dotted_extension(path).is_some_and(|ext| self.extractors.contains_key(&ext))
    }

    pub fn extract(&self, path: &Path, source: &str) -> Vec<Declaration> {
        match dotted_extension(path).and_then(|ext| self.extractors.get(&ext)) {
            Some(extractor) => extractor.extract(path, source),
            None => {
                debug!("No declaration extractor for {}", path.display());
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut extensions: Vec<&String> = self.extractors.keys().collect();
        extensions.sort();
        f.debug_struct("ExtractorRegistry").field("extensions", &extensions).finish()
    }
}
