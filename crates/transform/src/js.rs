//! JavaScript lowering, minification and mangling, all on `oxc`.
//!
//! Sources are parsed as classic scripts: files pulled in by `<script src>`
//! share the page's global scope, so top-level names are only mangled when
//! obfuscation is requested explicitly.

use crate::error::{ErrorKind, Result};
use oxc::allocator::Allocator;
use oxc::ast::ast::Program;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use oxc::transformer::{TransformOptions, Transformer};
use std::path::{Path, PathBuf};

/// Syntax target for `--babel`.
const LOWERING_TARGET: &str = "es2015";

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MinifyOptions {
    pub drop_console: bool,
    pub top_level: bool,
}

#[derive(Debug)]
pub(crate) struct Minified {
    pub code: String,
    /// Source map JSON, when a file name was given for it.
    pub map: Option<String>,
}

fn parse<'a>(allocator: &'a Allocator, source: &'a str, transform: &'static str) -> Result<Program<'a>> {
    let ret = Parser::new(allocator, source, SourceType::cjs()).parse();
    if let Some(err) = ret.errors.first() {
        exn::bail!(ErrorKind::parse(transform, err));
    }
    Ok(ret.program)
}

/// Lower modern syntax to ES2015.
pub(crate) fn lower(source: &str, path: &Path) -> Result<String> {
    let allocator = Allocator::default();
    let mut program = parse(&allocator, source, "babel")?;
    let options = match TransformOptions::from_target(LOWERING_TARGET) {
        Ok(options) => options,
        Err(err) => exn::bail!(ErrorKind::output("babel", err)),
    };
    let scoping = SemanticBuilder::new().build(&program).semantic.into_scoping();
    let ret = Transformer::new(&allocator, path, &options).build_with_scoping(scoping, &mut program);
    if let Some(err) = ret.errors.first() {
        exn::bail!(ErrorKind::output("babel", err));
    }
    Ok(Codegen::new().build(&program).code)
}

/// Compress and mangle. A source map is produced when `map_name` (the file
/// name the map should point back at) is given.
pub(crate) fn minify(source: &str, options: MinifyOptions, map_name: Option<&str>) -> Result<Minified> {
    let allocator = Allocator::default();
    let mut program = parse(&allocator, source, "js")?;
    let minifier_options = MinifierOptions {
        mangle: Some(MangleOptions { top_level: Some(options.top_level), ..MangleOptions::default() }),
        compress: Some(CompressOptions { drop_console: options.drop_console, ..CompressOptions::smallest() }),
    };
    let ret = Minifier::new(minifier_options).minify(&allocator, &mut program);
    let output = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            source_map_path: map_name.map(PathBuf::from),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program);
    Ok(Minified { code: output.code, map: output.map.map(|map| map.to_json_string()) })
}

/// Wrap a script in an immediately invoked function so its top-level names
/// stay out of the global scope.
pub(crate) fn wrap_iife(source: &str) -> String {
    format!("+function() {{\n{}\n}}();\n", source.trim_end())
}
