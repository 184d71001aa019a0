//! Static import scanning.
//!
//! Parses a module with oxc and collects every literal specifier passed to
//! `require()`, `import()`, `import ... from` and `export ... from`, plus a
//! count of `require()`/`import()` calls whose argument is not a literal.
//! Source is only parsed, never executed.

use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, CallExpression, ExportAllDeclaration, ExportNamedDeclaration, Expression,
    ImportDeclaration, ImportExpression, TemplateLiteral,
};
use oxc_ast_visit::{Visit, walk};
use oxc_parser::{ParseOptions, Parser};
use oxc_span::SourceType;

/// Specifiers found in one module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Literal specifiers in source order, duplicates included
    pub literal_specifiers: Vec<String>,
    /// Number of `require()`/`import()` calls with a computed argument
    pub dynamic_expressions: usize,
}

impl ScanResult {
    pub fn has_dynamic_expressions(&self) -> bool {
        self.dynamic_expressions > 0
    }
}

/// Static scanning failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScanError {
    #[error("{0}")]
    Syntax(String),
}

/// Extracts import specifiers from module source without running it.
pub trait StaticScanner: Send + Sync + std::fmt::Debug {
    fn scan(&self, path: &Path, source: &str) -> Result<ScanResult, ScanError>;
}

/// [`StaticScanner`] backed by the oxc parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct OxcScanner;

impl OxcScanner {
    pub fn new() -> Self {
        Self
    }
}

fn source_type_for(path: &Path) -> SourceType {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("mjs") => SourceType::mjs(),
        Some("cjs") => SourceType::cjs(),
        // .js may be either CommonJS or ESM depending on package.json "type"
        _ => SourceType::cjs().with_unambiguous(true),
    }
}

impl StaticScanner for OxcScanner {
    fn scan(&self, path: &Path, source: &str) -> Result<ScanResult, ScanError> {
        let allocator = Allocator::default();
        let options = ParseOptions {
            allow_return_outside_function: true,
            ..ParseOptions::default()
        };
        let ret = Parser::new(&allocator, source, source_type_for(path))
            .with_options(options)
            .parse();

        if let Some(first) = ret.errors.first() {
            let mut message = first.to_string();
            if ret.errors.len() > 1 {
                message.push_str(&format!(" (and {} more)", ret.errors.len() - 1));
            }
            return Err(ScanError::Syntax(message));
        }

        let mut collector = SpecifierCollector::default();
        collector.visit_program(&ret.program);

        Ok(ScanResult {
            literal_specifiers: collector.literals,
            dynamic_expressions: collector.dynamic,
        })
    }
}

#[derive(Default)]
struct SpecifierCollector {
    literals: Vec<String>,
    dynamic: usize,
}

impl SpecifierCollector {
    /// Literal value of a call argument, or `None` when it is computed.
    fn literal_argument(argument: &Argument<'_>) -> Option<String> {
        match argument {
            Argument::StringLiteral(lit) => Some(lit.value.as_str().to_string()),
            Argument::TemplateLiteral(tpl) => Self::static_template(tpl),
            _ => None,
        }
    }

    fn literal_expression(expression: &Expression<'_>) -> Option<String> {
        match expression {
            Expression::StringLiteral(lit) => Some(lit.value.as_str().to_string()),
            Expression::TemplateLiteral(tpl) => Self::static_template(tpl),
            _ => None,
        }
    }

    /// A template literal without substitutions is as good as a string.
    fn static_template(tpl: &TemplateLiteral<'_>) -> Option<String> {
        if !tpl.expressions.is_empty() {
            return None;
        }
        tpl.quasis.first().map(|quasi| {
            quasi
                .value
                .cooked
                .as_ref()
                .unwrap_or(&quasi.value.raw)
                .as_str()
                .to_string()
        })
    }

    fn record(&mut self, literal: Option<String>) {
        match literal {
            Some(specifier) => self.literals.push(specifier),
            None => self.dynamic += 1,
        }
    }
}

impl<'a> Visit<'a> for SpecifierCollector {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        let is_require = matches!(
            &call.callee,
            Expression::Identifier(ident) if ident.name.as_str() == "require"
        );
        if is_require {
            if let Some(argument) = call.arguments.first() {
                self.record(Self::literal_argument(argument));
            }
        }
        walk::walk_call_expression(self, call);
    }

    fn visit_import_expression(&mut self, expr: &ImportExpression<'a>) {
        self.record(Self::literal_expression(&expr.source));
        walk::walk_import_expression(self, expr);
    }

    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        self.literals.push(decl.source.value.as_str().to_string());
    }

    fn visit_export_all_declaration(&mut self, decl: &ExportAllDeclaration<'a>) {
        self.literals.push(decl.source.value.as_str().to_string());
    }

    fn visit_export_named_declaration(&mut self, decl: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &decl.source {
            self.literals.push(source.value.as_str().to_string());
        }
        walk::walk_export_named_declaration(self, decl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> ScanResult {
        OxcScanner::new().scan(Path::new("test.js"), source).unwrap()
    }

    #[test]
    fn test_literal_requires() {
        let result = scan(
            r#"
            var fs = require('fs');
            var helper = require("./lib/helper");
            var utils = require(`socket.io/lib/utils`);
            "#,
        );
        assert_eq!(
            result.literal_specifiers,
            vec!["fs", "./lib/helper", "socket.io/lib/utils"]
        );
        assert!(!result.has_dynamic_expressions());
    }

    #[test]
    fn test_dynamic_requires_are_counted_not_guessed() {
        let result = scan(
            r#"
            var name = 'ex' + 'press';
            require(name);
            require('./plugins/' + name);
            require(`./${name}`);
            "#,
        );
        assert!(result.literal_specifiers.is_empty());
        assert_eq!(result.dynamic_expressions, 3);
    }

    #[test]
    fn test_esm_forms() {
        let result = OxcScanner::new()
            .scan(
                Path::new("mod.mjs"),
                r#"
                import express from 'express';
                export * from './reexport.mjs';
                export { a } from 'a-pkg';
                const lazy = await import('lazy-pkg');
                const computed = await import(someVar);
                "#,
            )
            .unwrap();
        assert_eq!(
            result.literal_specifiers,
            vec!["express", "./reexport.mjs", "a-pkg", "lazy-pkg"]
        );
        assert_eq!(result.dynamic_expressions, 1);
    }

    #[test]
    fn test_nested_requires_and_top_level_return() {
        let result = scan(
            r#"
            if (process.env.X) { return; }
            function load() { return require('nested'); }
            module.exports = { other: require('other').thing };
            "#,
        );
        assert_eq!(result.literal_specifiers, vec!["nested", "other"]);
    }

    #[test]
    fn test_other_calls_ignored() {
        let result = scan("foo('bar'); obj.require('baz'); require.resolve('qux');");
        assert!(result.literal_specifiers.is_empty());
        assert_eq!(result.dynamic_expressions, 0);
    }

    #[test]
    fn test_syntax_error() {
        let err = OxcScanner::new()
            .scan(Path::new("broken.js"), "var = ;")
            .unwrap_err();
        assert!(matches!(err, ScanError::Syntax(_)));
    }
}
