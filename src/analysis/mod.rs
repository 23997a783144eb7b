//! Source analyzer: heuristic language detection plus structural feature
//! extraction. The default language gets a best-effort structured scan;
//! everything else (and any scan failure) goes through line patterns.

use log::debug;

mod ast;
mod patterns;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    JavaScript,
    Python,
    Java,
}

impl Language {
    pub fn name(self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Java => "java",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionInfo {
    pub name: String,
    /// 0-based line span of the definition.
    pub line_start: usize,
    pub line_end: usize,
    /// Line span of the body; the structured scan uses it as a rough
    /// complexity stand-in.
    pub complexity: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopKind {
    For,
    While,
    DoWhile,
    ForIn,
    ForOf,
    ArrayMethod,
    Generic,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoopInfo {
    pub kind: LoopKind,
    /// Synthetic nesting depth; the scan does not measure real nesting.
    pub depth: usize,
    /// Assumed iteration count, not a measured bound.
    pub iterations: usize,
    pub line: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConditionalInfo {
    pub has_else: bool,
    pub line: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableInfo {
    pub name: String,
    pub kind: DeclKind,
    pub line: usize,
}

/// Immutable structural summary of one source text.
#[derive(Clone, Debug)]
pub struct AnalysisResult {
    /// Clamped to [0, 1].
    pub complexity: f64,
    pub functions: Vec<FunctionInfo>,
    pub loops: Vec<LoopInfo>,
    pub conditionals: Vec<ConditionalInfo>,
    pub variables: Vec<VariableInfo>,
    pub line_count: usize,
    pub language: Language,
}

/// Fixed substring decision table, not a real parser.
pub fn detect_language(text: &str) -> Language {
    if text.contains("function") || text.contains("var") || text.contains("const") {
        Language::JavaScript
    } else if text.contains("def ") && text.contains("import ") && text.contains(':') {
        Language::Python
    } else if text.contains("class ") && text.contains('{') {
        Language::Java
    } else {
        Language::JavaScript
    }
}

/// Analyze the text. Scan failures are recovered locally, never surfaced.
pub fn analyze(text: &str) -> AnalysisResult {
    let language = detect_language(text);
    match language {
        Language::JavaScript => match ast::analyze_structured(text) {
            Ok(result) => result,
            Err(e) => {
                debug!("structured scan failed ({e}), using pattern analysis");
                patterns::analyze_by_patterns(text, language)
            }
        },
        other => patterns::analyze_generic(text, other),
    }
}

pub(crate) fn clamp_complexity(raw: f64) -> f64 {
    raw.min(1.0).max(0.0)
}
