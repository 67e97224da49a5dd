//! Anchor Location
//!
//! Resolves a descriptor's `scope`/`path` to a byte region of the host text.
//!
//! The host text is parsed with Oxc and the AST is searched for the named
//! declaration:
//! - `function name(...) {}` or a named function expression
//! - `class name {}` or a named class expression
//! - a method or function-valued field `name` of a class
//! - `target = function(...) {}`, `target = (...) => {}` or `target = class {}`,
//!   as an assignment or a variable declarator
//!
//! Declarations win over assignments; among each kind the first in source
//! order wins. Because regions come from parser spans, braces inside string,
//! template, comment and regular-expression literals never move a boundary.

use super::{MixinDescriptor, WHOLE_SURFACE};
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    AssignmentExpression, BindingPatternKind, Class, ClassElement, Expression, Function,
    Program, VariableDeclarator,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::{Parser, ParserReturn};
use oxc_semantic::ScopeFlags;
use oxc_span::{GetSpan, SourceType, Span};
use thiserror::Error;

/// A located region of the host text.
///
/// `start..end` covers the whole declaration, header included. `body` holds
/// the positions of the opening and closing brace when the region is a
/// function, method or class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: usize,
    pub end: usize,
    pub body: Option<(usize, usize)>,
}

impl Region {
    pub fn whole(len: usize) -> Self {
        Self {
            start: 0,
            end: len,
            body: None,
        }
    }

    fn spanning(start: u32, end: u32, body: Span) -> Self {
        Self {
            start: start as usize,
            end: end as usize,
            body: Some((body.start as usize, body.end as usize - 1)),
        }
    }
}

/// The host text could not be parsed, so no anchor in it can be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("host script does not parse: {0}")]
pub struct ParseFailure(pub String);

/// Locate the region a descriptor addresses in `src`.
pub fn locate(src: &str, descriptor: &MixinDescriptor) -> Result<Option<Region>, ParseFailure> {
    if descriptor.path == WHOLE_SURFACE {
        return Ok(Some(Region::whole(src.len())));
    }
    match &descriptor.scope {
        Some(scope) => find_scoped(src, scope, &descriptor.path),
        None if descriptor.mixin_type.is_class_wide() => match find_class(src, &descriptor.path)? {
            Some(region) => Ok(Some(region)),
            None => find_function(src, &descriptor.path),
        },
        None => find_function(src, &descriptor.path),
    }
}

/// Locate `path` under `scope`: a method of a class, or a prototype assignment.
pub fn find_scoped(src: &str, scope: &str, path: &str) -> Result<Option<Region>, ParseFailure> {
    let class = scope.strip_suffix(".prototype").unwrap_or(scope);
    search(
        src,
        Target::Method {
            class,
            method: path,
        },
        format!("{}.{}", scope, path),
    )
}

/// Locate a free function by name.
pub fn find_function(src: &str, name: &str) -> Result<Option<Region>, ParseFailure> {
    search(src, Target::Function(name), name.to_string())
}

/// Locate a class by name.
pub fn find_class(src: &str, name: &str) -> Result<Option<Region>, ParseFailure> {
    search(src, Target::Class(name), name.to_string())
}

fn search(src: &str, target: Target<'_>, assigned_name: String) -> Result<Option<Region>, ParseFailure> {
    let allocator = Allocator::default();
    let program = parse(&allocator, src)?;
    let mut finder = AnchorFinder {
        source: src,
        target,
        assigned_name,
        declared: None,
        assigned: None,
    };
    finder.visit_program(&program);
    Ok(finder.declared.or(finder.assigned))
}

/// Parse as a module first, then as a sloppy-mode script.
///
/// Recoverable diagnostics are tolerated: the spans of what was parsed are
/// still exact.
fn parse<'a>(allocator: &'a Allocator, src: &'a str) -> Result<Program<'a>, ParseFailure> {
    let mut first_error = None;
    for source_type in [SourceType::mjs(), SourceType::cjs()] {
        let ParserReturn {
            program,
            errors,
            panicked,
            ..
        } = Parser::new(allocator, src, source_type).parse();
        if !panicked {
            if !errors.is_empty() {
                log::debug!("Host script parsed with {} recoverable error(s)", errors.len());
            }
            return Ok(program);
        }
        if first_error.is_none() {
            first_error = errors.first().map(|e| e.to_string());
        }
    }
    Err(ParseFailure(
        first_error.unwrap_or_else(|| "unknown syntax error".to_string()),
    ))
}

#[derive(Debug, Clone, Copy)]
enum Target<'q> {
    Function(&'q str),
    Class(&'q str),
    Method { class: &'q str, method: &'q str },
}

struct AnchorFinder<'s> {
    source: &'s str,
    target: Target<'s>,
    /// Source text an assignment target must equal.
    assigned_name: String,
    declared: Option<Region>,
    assigned: Option<Region>,
}

impl AnchorFinder<'_> {
    /// Region of a value bound to the searched name, if it has the right shape.
    fn value_region(&self, start: u32, value: &Expression) -> Option<Region> {
        match (self.target, value) {
            (Target::Class(_), Expression::ClassExpression(class)) => {
                Some(Region::spanning(start, class.span.end, class.body.span))
            }
            (Target::Class(_), _) => None,
            (_, Expression::FunctionExpression(func)) => func
                .body
                .as_ref()
                .map(|body| Region::spanning(start, func.span.end, body.span)),
            (_, Expression::ArrowFunctionExpression(arrow)) if !arrow.expression => {
                Some(Region::spanning(start, arrow.span.end, arrow.body.span))
            }
            (_, Expression::ParenthesizedExpression(inner)) => {
                self.value_region(start, &inner.expression)
            }
            _ => None,
        }
    }

    /// Method or function-valued field `name` declared directly in `class`.
    fn member_region(&self, class: &Class, name: &str) -> Option<Region> {
        class.body.body.iter().find_map(|element| match element {
            ClassElement::MethodDefinition(method)
                if method.key.static_name().as_deref() == Some(name) =>
            {
                method
                    .value
                    .body
                    .as_ref()
                    .map(|body| Region::spanning(method.span.start, method.span.end, body.span))
            }
            ClassElement::PropertyDefinition(prop)
                if prop.key.static_name().as_deref() == Some(name) =>
            {
                prop.value
                    .as_ref()
                    .and_then(|value| self.value_region(prop.span.start, value))
            }
            _ => None,
        })
    }
}

impl<'a> Visit<'a> for AnchorFinder<'_> {
    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        if self.declared.is_none() {
            if let (Target::Function(name), Some(id), Some(body)) = (self.target, &func.id, &func.body) {
                if id.name.as_str() == name {
                    self.declared = Some(Region::spanning(func.span.start, func.span.end, body.span));
                }
            }
        }
        walk::walk_function(self, func, flags);
    }

    fn visit_class(&mut self, class: &Class<'a>) {
        if self.declared.is_none() {
            if let Some(id) = &class.id {
                match self.target {
                    Target::Class(name) if id.name.as_str() == name => {
                        self.declared =
                            Some(Region::spanning(class.span.start, class.span.end, class.body.span));
                    }
                    Target::Method { class: owner, method } if id.name.as_str() == owner => {
                        self.declared = self.member_region(class, method);
                    }
                    _ => {}
                }
            }
        }
        walk::walk_class(self, class);
    }

    fn visit_variable_declarator(&mut self, decl: &VariableDeclarator<'a>) {
        if self.assigned.is_none() {
            if let (BindingPatternKind::BindingIdentifier(ident), Some(init)) = (&decl.id.kind, &decl.init) {
                if ident.name.as_str() == self.assigned_name {
                    self.assigned = self.value_region(decl.span.start, init);
                }
            }
        }
        walk::walk_variable_declarator(self, decl);
    }

    fn visit_assignment_expression(&mut self, expr: &AssignmentExpression<'a>) {
        if self.assigned.is_none() {
            let left = expr.left.span();
            let written = self.source.get(left.start as usize..left.end as usize);
            if written == Some(self.assigned_name.as_str()) {
                self.assigned = self.value_region(expr.span.start, &expr.right);
            }
        }
        walk::walk_assignment_expression(self, expr);
    }
}
