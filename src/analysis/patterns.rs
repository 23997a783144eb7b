// Per-line pattern analysis: the fallback for the default language when the
// structured scan rejects the input, and the only analysis non-default
// languages get. Line numbers stand in for exact spans.

use regex::Regex;

use super::{
    clamp_complexity, AnalysisResult, ConditionalInfo, DeclKind, FunctionInfo, Language, LoopInfo,
    LoopKind, VariableInfo,
};

struct LineRegexes {
    func_decl: Regex,
    func_prop: Regex,
    func_assign: Regex,
    var_decl: Regex,
    py_def: Regex,
}

impl LineRegexes {
    fn new() -> Option<Self> {
        Some(Self {
            func_decl: Regex::new(r"function\s*(\w*)\s*\(").ok()?,
            func_prop: Regex::new(r"(\w+)\s*[:=]\s*function").ok()?,
            func_assign: Regex::new(r"(\w+)\s*=.*function").ok()?,
            var_decl: Regex::new(r"(var|let|const)\s+(\w+)").ok()?,
            py_def: Regex::new(r"def\s+(\w+)").ok()?,
        })
    }
}

/// Fallback walk for the default language.
pub fn analyze_by_patterns(text: &str, language: Language) -> AnalysisResult {
    let regexes = LineRegexes::new();
    let mut functions = Vec::new();
    let mut loops = Vec::new();
    let mut conditionals = Vec::new();
    let mut variables = Vec::new();

    let lines: Vec<&str> = text.split('\n').collect();
    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if trimmed.contains("function") && trimmed.contains('(') {
            functions.push(FunctionInfo {
                name: function_name(trimmed, regexes.as_ref()),
                line_start: index,
                line_end: index,
                complexity: 1,
            });
        }

        if trimmed.contains(".forEach")
            || trimmed.contains(".map")
            || trimmed.contains(".filter")
            || trimmed.contains(".reduce")
        {
            loops.push(LoopInfo {
                kind: LoopKind::ArrayMethod,
                depth: 1,
                iterations: 3,
                line: index + 1,
            });
        }

        if trimmed.starts_with("for ") || trimmed.contains(" for ") {
            loops.push(LoopInfo {
                kind: LoopKind::For,
                depth: 1,
                iterations: 4,
                line: index + 1,
            });
        }

        if trimmed.starts_with("if ") || trimmed.contains(" if ") {
            conditionals.push(ConditionalInfo {
                has_else: false,
                line: index + 1,
            });
        }

        if trimmed.starts_with("var ") || trimmed.starts_with("let ") || trimmed.starts_with("const ")
        {
            if let Some(regexes) = regexes.as_ref() {
                if let Some(caps) = regexes.var_decl.captures(trimmed) {
                    let kind = match &caps[1] {
                        "var" => DeclKind::Var,
                        "let" => DeclKind::Let,
                        _ => DeclKind::Const,
                    };
                    variables.push(VariableInfo {
                        name: caps[2].to_string(),
                        kind,
                        line: index + 1,
                    });
                }
            }
        }
    }

    // the fallback weighs variables lighter and adds a line-count term
    let complexity = clamp_complexity(
        functions.len() as f64 * 0.1
            + loops.len() as f64 * 0.15
            + conditionals.len() as f64 * 0.1
            + variables.len() as f64 * 0.02
            + lines.len() as f64 * 0.005,
    );

    AnalysisResult {
        complexity,
        functions,
        loops,
        conditionals,
        variables,
        line_count: lines.len(),
        language,
    }
}

fn function_name(line: &str, regexes: Option<&LineRegexes>) -> String {
    let Some(regexes) = regexes else {
        return "function".to_string();
    };
    let captured = regexes
        .func_decl
        .captures(line)
        .or_else(|| regexes.func_prop.captures(line))
        .or_else(|| regexes.func_assign.captures(line));
    match captured {
        Some(caps) => {
            let name = &caps[1];
            if name.is_empty() {
                "anonymous".to_string()
            } else {
                name.to_string()
            }
        }
        None => "function".to_string(),
    }
}

/// Simplified walk for languages without structured support. Only the
/// alternate (Python-like) language has line patterns; anything else
/// contributes nothing but its line count.
pub fn analyze_generic(text: &str, language: Language) -> AnalysisResult {
    let regexes = LineRegexes::new();
    let mut functions = Vec::new();
    let mut loops = Vec::new();
    let mut conditionals = Vec::new();

    let lines: Vec<&str> = text.split('\n').collect();
    if language == Language::Python {
        for (index, line) in lines.iter().enumerate() {
            if line.trim().starts_with("def ") {
                let name = regexes
                    .as_ref()
                    .and_then(|r| r.py_def.captures(line))
                    .map(|caps| caps[1].to_string())
                    .unwrap_or_else(|| "function".to_string());
                functions.push(FunctionInfo {
                    name,
                    line_start: index,
                    line_end: index,
                    complexity: 1,
                });
            }
            if line.contains("for ") || line.contains("while ") {
                loops.push(LoopInfo {
                    kind: LoopKind::Generic,
                    depth: 1,
                    iterations: 4,
                    line: index + 1,
                });
            }
            if line.contains("if ") || line.contains("elif ") {
                conditionals.push(ConditionalInfo {
                    has_else: false,
                    line: index + 1,
                });
            }
        }
    }

    let complexity = clamp_complexity(
        functions.len() as f64 * 0.1
            + loops.len() as f64 * 0.15
            + conditionals.len() as f64 * 0.1
            + lines.len() as f64 * 0.005,
    );

    AnalysisResult {
        complexity,
        functions,
        loops,
        conditionals,
        variables: Vec::new(),
        line_count: lines.len(),
        language,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_walk_finds_line_features() {
        let code = "function greet() {\nlet msg = 'hi';\nitems.forEach(show)\nfor (;;) {}\nif (x) {}\n";
        let result = analyze_by_patterns(code, Language::JavaScript);
        assert_eq!(result.functions.len(), 1);
        assert_eq!(result.functions[0].name, "greet");
        assert_eq!(result.loops.len(), 2);
        assert_eq!(result.conditionals.len(), 1);
        assert_eq!(result.variables.len(), 1);
        assert_eq!(result.variables[0].name, "msg");
    }

    #[test]
    fn fallback_array_methods_assume_three_iterations() {
        let result = analyze_by_patterns("xs.map(f)\n", Language::JavaScript);
        assert_eq!(result.loops[0].kind, LoopKind::ArrayMethod);
        assert_eq!(result.loops[0].iterations, 3);
    }

    #[test]
    fn fallback_weights_include_line_count() {
        let result = analyze_by_patterns("var a = 1;\n\n\n", Language::JavaScript);
        // one variable at 0.02 plus four lines at 0.005
        assert!((result.complexity - (0.02 + 4.0 * 0.005)).abs() < 1e-9);
    }

    #[test]
    fn assignment_style_function_names() {
        // `function (` wins the cascade with an empty capture
        let result = analyze_by_patterns("greet = function() {}\n", Language::JavaScript);
        assert_eq!(result.functions[0].name, "anonymous");
        let result = analyze_by_patterns("var f = function() {}\n", Language::JavaScript);
        assert_eq!(result.functions[0].name, "anonymous");

        // the property/assignment regexes apply when no paren follows
        let result = analyze_by_patterns("greet = function; init()\n", Language::JavaScript);
        assert_eq!(result.functions[0].name, "greet");
        let result = analyze_by_patterns("show: function; call()\n", Language::JavaScript);
        assert_eq!(result.functions[0].name, "show");
    }

    #[test]
    fn python_walk() {
        let code = "import os\ndef main():\n    for x in range(3):\n        if x:\n            pass\n";
        let result = analyze_generic(code, Language::Python);
        assert_eq!(result.functions.len(), 1);
        assert_eq!(result.functions[0].name, "main");
        assert_eq!(result.loops.len(), 1);
        assert_eq!(result.conditionals.len(), 1);
        assert!(result.variables.is_empty());
    }

    #[test]
    fn other_languages_only_count_lines() {
        let code = "public class A {\n  void run() {}\n}\n";
        let result = analyze_generic(code, Language::Java);
        assert!(result.functions.is_empty());
        assert!((result.complexity - 4.0 * 0.005).abs() < 1e-9);
    }
}
