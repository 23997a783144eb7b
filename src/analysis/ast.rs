// Best-effort structured scan of the default language. The text is
// tokenized with line tracking, reduced to a flat list of typed nodes, and
// the nodes are dispatched into analysis records. The scan fails hard on
// unbalanced delimiters or unterminated strings so the caller can drop to
// the pattern path; everything else is tolerated.

use std::collections::HashSet;
use std::fmt;

use super::{
    clamp_complexity, AnalysisResult, ConditionalInfo, DeclKind, FunctionInfo, Language, LoopInfo,
    LoopKind, VariableInfo,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ScanError {
    UnterminatedString { line: usize },
    UnterminatedComment { line: usize },
    UnexpectedClose { found: char, line: usize },
    UnclosedDelimiter { open: char, line: usize },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::UnterminatedString { line } => {
                write!(f, "unterminated string starting on line {}", line + 1)
            }
            ScanError::UnterminatedComment { line } => {
                write!(f, "unterminated block comment starting on line {}", line + 1)
            }
            ScanError::UnexpectedClose { found, line } => {
                write!(f, "unexpected '{}' on line {}", found, line + 1)
            }
            ScanError::UnclosedDelimiter { open, line } => {
                write!(f, "unclosed '{}' opened on line {}", open, line + 1)
            }
        }
    }
}

impl std::error::Error for ScanError {}

#[derive(Clone, Debug, PartialEq)]
enum Tok {
    Ident(String),
    Num,
    Op(String),
    Punct(char),
}

#[derive(Clone, Debug)]
struct Token {
    tok: Tok,
    line: usize,
}

/// Typed node produced by the scan, one variant per recognized construct.
#[derive(Clone, Debug, PartialEq)]
enum Node {
    Function {
        name: String,
        line_start: usize,
        line_end: usize,
    },
    Loop {
        kind: LoopKind,
        line: usize,
    },
    Conditional {
        has_else: bool,
        line: usize,
    },
    VarDecl {
        names: Vec<String>,
        kind: DeclKind,
        line: usize,
    },
    ArrayCall {
        line: usize,
    },
}

const ARRAY_METHODS: [&str; 4] = ["forEach", "map", "filter", "reduce"];
const OP_CHARS: &str = "+-*/%=!<>&|^~?";

pub fn analyze_structured(text: &str) -> Result<AnalysisResult, ScanError> {
    let tokens = tokenize(text)?;
    let line_count = text.split('\n').count();
    let nodes = extract_nodes(&tokens, line_count);

    let mut functions = Vec::new();
    let mut loops = Vec::new();
    let mut conditionals = Vec::new();
    let mut variables = Vec::new();

    for node in nodes {
        match node {
            Node::Function {
                name,
                line_start,
                line_end,
            } => functions.push(FunctionInfo {
                name,
                line_start,
                line_end,
                complexity: line_end - line_start + 1,
            }),
            Node::Loop { kind, line } => loops.push(LoopInfo {
                kind,
                depth: 1,
                iterations: 4,
                line,
            }),
            Node::ArrayCall { line } => loops.push(LoopInfo {
                kind: LoopKind::ArrayMethod,
                depth: 1,
                iterations: 5,
                line,
            }),
            Node::Conditional { has_else, line } => {
                conditionals.push(ConditionalInfo { has_else, line })
            }
            Node::VarDecl { names, kind, line } => {
                for name in names {
                    variables.push(VariableInfo { name, kind, line });
                }
            }
        }
    }

    let complexity = clamp_complexity(
        functions.len() as f64 * 0.1
            + loops.len() as f64 * 0.15
            + conditionals.len() as f64 * 0.1
            + variables.len() as f64 * 0.05,
    );

    Ok(AnalysisResult {
        complexity,
        functions,
        loops,
        conditionals,
        variables,
        line_count,
        language: Language::JavaScript,
    })
}

fn tokenize(text: &str) -> Result<Vec<Token>, ScanError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut line = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            _ if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let start_line = line;
                i += 2;
                loop {
                    if i >= chars.len() {
                        return Err(ScanError::UnterminatedComment { line: start_line });
                    }
                    if chars[i] == '\n' {
                        line += 1;
                    }
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            '"' | '\'' => {
                let start_line = line;
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(ScanError::UnterminatedString { line: start_line }),
                        Some('\n') => {
                            return Err(ScanError::UnterminatedString { line: start_line })
                        }
                        Some('\\') => i += 2,
                        Some(&q) if q == c => {
                            i += 1;
                            break;
                        }
                        Some(_) => i += 1,
                    }
                }
            }
            '`' => {
                // template literals may span lines
                let start_line = line;
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(ScanError::UnterminatedString { line: start_line }),
                        Some('\n') => {
                            line += 1;
                            i += 1;
                        }
                        Some('\\') => i += 2,
                        Some('`') => {
                            i += 1;
                            break;
                        }
                        Some(_) => i += 1,
                    }
                }
            }
            '(' | '[' | '{' => {
                stack.push((c, line));
                tokens.push(Token {
                    tok: Tok::Punct(c),
                    line,
                });
                i += 1;
            }
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    _ => return Err(ScanError::UnexpectedClose { found: c, line }),
                }
                tokens.push(Token {
                    tok: Tok::Punct(c),
                    line,
                });
                i += 1;
            }
            ';' | ',' | ':' | '.' => {
                tokens.push(Token {
                    tok: Tok::Punct(c),
                    line,
                });
                i += 1;
            }
            _ if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                tokens.push(Token {
                    tok: Tok::Ident(chars[start..i].iter().collect()),
                    line,
                });
            }
            _ if c.is_ascii_digit() => {
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(Token { tok: Tok::Num, line });
            }
            _ if OP_CHARS.contains(c) => {
                let start = i;
                while i < chars.len() && OP_CHARS.contains(chars[i]) {
                    i += 1;
                }
                tokens.push(Token {
                    tok: Tok::Op(chars[start..i].iter().collect()),
                    line,
                });
            }
            _ => i += 1, // anything else is noise to this scan
        }
    }

    if let Some((open, open_line)) = stack.pop() {
        return Err(ScanError::UnclosedDelimiter {
            open,
            line: open_line,
        });
    }
    Ok(tokens)
}

fn extract_nodes(tokens: &[Token], line_count: usize) -> Vec<Node> {
    let mut nodes = Vec::new();
    // "while" tokens that belong to an already-recorded do-while
    let mut consumed_while: HashSet<usize> = HashSet::new();

    for i in 0..tokens.len() {
        let line = tokens[i].line;
        match &tokens[i].tok {
            Tok::Ident(word) => match word.as_str() {
                "function" => nodes.push(function_node(tokens, i, line_count)),
                "for" => nodes.push(Node::Loop {
                    kind: for_kind(tokens, i),
                    line,
                }),
                "while" if !consumed_while.contains(&i) => {
                    nodes.push(Node::Loop {
                        kind: LoopKind::While,
                        line,
                    });
                }
                "do" => {
                    nodes.push(Node::Loop {
                        kind: LoopKind::DoWhile,
                        line,
                    });
                    if let Some(w) = do_while_tail(tokens, i) {
                        consumed_while.insert(w);
                    }
                }
                "if" => nodes.push(Node::Conditional {
                    has_else: if_has_else(tokens, i),
                    line,
                }),
                "var" | "let" | "const" => {
                    let kind = match word.as_str() {
                        "var" => DeclKind::Var,
                        "let" => DeclKind::Let,
                        _ => DeclKind::Const,
                    };
                    let names = declared_names(tokens, i);
                    if !names.is_empty() {
                        nodes.push(Node::VarDecl { names, kind, line });
                    }
                }
                _ => {}
            },
            Tok::Op(op) if op == "=>" => nodes.push(arrow_node(tokens, i, line_count)),
            // a ? b : c counts as a conditional with an alternate branch;
            // optional chaining `?.` does not
            Tok::Op(op) if op == "?" => {
                if !matches!(tokens.get(i + 1).map(|t| &t.tok), Some(Tok::Punct('.'))) {
                    nodes.push(Node::Conditional {
                        has_else: true,
                        line,
                    });
                }
            }
            Tok::Punct('.') => {
                if let (Some(Tok::Ident(method)), Some(Tok::Punct('('))) = (
                    tokens.get(i + 1).map(|t| &t.tok),
                    tokens.get(i + 2).map(|t| &t.tok),
                ) {
                    if ARRAY_METHODS.contains(&method.as_str()) {
                        nodes.push(Node::ArrayCall { line });
                    }
                }
            }
            _ => {}
        }
    }
    nodes
}

/// Name resolution priority: explicit identifier, then the enclosing
/// declarator or assignment target, then "anonymous".
fn function_node(tokens: &[Token], i: usize, line_count: usize) -> Node {
    let line_start = tokens[i].line;

    let name = match tokens.get(i + 1).map(|t| &t.tok) {
        Some(Tok::Ident(n)) => n.clone(),
        _ => enclosing_name(tokens, i).unwrap_or_else(|| "anonymous".to_string()),
    };

    let line_end = body_end_line(tokens, i).unwrap_or(line_count.saturating_sub(1).max(line_start));
    Node::Function {
        name,
        line_start,
        line_end: line_end.max(line_start),
    }
}

fn arrow_node(tokens: &[Token], i: usize, line_count: usize) -> Node {
    // parameter list is either `(...)` or a single bare identifier
    let param_start = match tokens.get(i.wrapping_sub(1)).map(|t| &t.tok) {
        Some(Tok::Punct(')')) => matching_open(tokens, i - 1).unwrap_or(i - 1),
        Some(Tok::Ident(_)) => i - 1,
        _ => i,
    };
    let name = enclosing_name(tokens, param_start).unwrap_or_else(|| "anonymous".to_string());
    let line_start = tokens[param_start].line;

    let line_end = if matches!(tokens.get(i + 1).map(|t| &t.tok), Some(Tok::Punct('{'))) {
        matching_close(tokens, i + 1).map(|c| tokens[c].line)
    } else {
        expression_end_line(tokens, i + 1)
    }
    .unwrap_or(line_count.saturating_sub(1).max(line_start));

    Node::Function {
        name,
        line_start,
        line_end: line_end.max(line_start),
    }
}

/// Look just before `at` for `name =` or `name :`.
fn enclosing_name(tokens: &[Token], at: usize) -> Option<String> {
    if at < 2 {
        return None;
    }
    match (&tokens[at - 1].tok, &tokens[at - 2].tok) {
        (Tok::Op(op), Tok::Ident(n)) if op == "=" => Some(n.clone()),
        (Tok::Punct(':'), Tok::Ident(n)) => Some(n.clone()),
        _ => None,
    }
}

/// Line of the `}` closing the first `{` after `i`.
fn body_end_line(tokens: &[Token], i: usize) -> Option<usize> {
    let open = (i..tokens.len()).find(|&j| tokens[j].tok == Tok::Punct('{'))?;
    matching_close(tokens, open).map(|c| tokens[c].line)
}

/// Line of the last token of a braceless expression starting at `from`.
fn expression_end_line(tokens: &[Token], from: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut last_line = None;
    for tok in &tokens[from.min(tokens.len())..] {
        match tok.tok {
            Tok::Punct('(') | Tok::Punct('[') | Tok::Punct('{') => depth += 1,
            Tok::Punct(')') | Tok::Punct(']') | Tok::Punct('}') => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Tok::Punct(';') | Tok::Punct(',') if depth == 0 => break,
            _ => {}
        }
        last_line = Some(tok.line);
    }
    last_line
}

fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let (open_ch, close_ch) = match tokens[open].tok {
        Tok::Punct('(') => ('(', ')'),
        Tok::Punct('[') => ('[', ']'),
        Tok::Punct('{') => ('{', '}'),
        _ => return None,
    };
    let mut depth = 0i32;
    for (j, tok) in tokens.iter().enumerate().skip(open) {
        match tok.tok {
            Tok::Punct(c) if c == open_ch => depth += 1,
            Tok::Punct(c) if c == close_ch => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
    }
    None
}

fn matching_open(tokens: &[Token], close: usize) -> Option<usize> {
    let (open_ch, close_ch) = match tokens[close].tok {
        Tok::Punct(')') => ('(', ')'),
        Tok::Punct(']') => ('[', ']'),
        Tok::Punct('}') => ('{', '}'),
        _ => return None,
    };
    let mut depth = 0i32;
    for j in (0..=close).rev() {
        match tokens[j].tok {
            Tok::Punct(c) if c == close_ch => depth += 1,
            Tok::Punct(c) if c == open_ch => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
    }
    None
}

/// `for (x of xs)` / `for (k in obj)` / plain `for (;;)`.
fn for_kind(tokens: &[Token], i: usize) -> LoopKind {
    let Some(open) = (i..tokens.len()).find(|&j| tokens[j].tok == Tok::Punct('(')) else {
        return LoopKind::For;
    };
    let Some(close) = matching_close(tokens, open) else {
        return LoopKind::For;
    };
    for tok in &tokens[open..close] {
        if let Tok::Ident(w) = &tok.tok {
            if w == "of" {
                return LoopKind::ForOf;
            }
            if w == "in" {
                return LoopKind::ForIn;
            }
        }
    }
    LoopKind::For
}

/// Index of the `while` that closes `do { ... } while (...)`.
fn do_while_tail(tokens: &[Token], i: usize) -> Option<usize> {
    let open = (i..tokens.len()).find(|&j| tokens[j].tok == Tok::Punct('{'))?;
    let close = matching_close(tokens, open)?;
    match tokens.get(close + 1).map(|t| &t.tok) {
        Some(Tok::Ident(w)) if w == "while" => Some(close + 1),
        _ => None,
    }
}

fn if_has_else(tokens: &[Token], i: usize) -> bool {
    let Some(open) = (i..tokens.len()).find(|&j| tokens[j].tok == Tok::Punct('(')) else {
        return false;
    };
    let Some(cond_close) = matching_close(tokens, open) else {
        return false;
    };

    let after = match tokens.get(cond_close + 1).map(|t| &t.tok) {
        Some(Tok::Punct('{')) => matching_close(tokens, cond_close + 1).map(|c| c + 1),
        // braceless consequent runs to the next statement-level semicolon
        Some(_) => {
            let mut depth = 0i32;
            let mut end = None;
            for (j, tok) in tokens.iter().enumerate().skip(cond_close + 1) {
                match tok.tok {
                    Tok::Punct('(') | Tok::Punct('[') | Tok::Punct('{') => depth += 1,
                    Tok::Punct(')') | Tok::Punct(']') | Tok::Punct('}') => {
                        if depth == 0 {
                            break;
                        }
                        depth -= 1;
                    }
                    Tok::Punct(';') if depth == 0 => {
                        end = Some(j + 1);
                        break;
                    }
                    _ => {}
                }
            }
            end
        }
        None => None,
    };

    matches!(
        after.and_then(|j| tokens.get(j)).map(|t| &t.tok),
        Some(Tok::Ident(w)) if w == "else"
    )
}

/// Declared names after a var/let/const keyword. Only simple identifier
/// declarators are recorded; destructuring patterns are skipped.
fn declared_names(tokens: &[Token], i: usize) -> Vec<String> {
    let mut names = Vec::new();
    let mut depth = 0i32;
    let mut expect_name = true;

    for tok in &tokens[(i + 1).min(tokens.len())..] {
        match &tok.tok {
            Tok::Punct('(') | Tok::Punct('[') | Tok::Punct('{') => {
                depth += 1;
                expect_name = false;
            }
            Tok::Punct(')') | Tok::Punct(']') | Tok::Punct('}') => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Tok::Punct(';') if depth == 0 => break,
            Tok::Punct(',') if depth == 0 => expect_name = true,
            Tok::Ident(name) if expect_name => {
                if name == "in" || name == "of" {
                    break;
                }
                names.push(name.clone());
                expect_name = false;
            }
            _ => {}
        }
    }
    names
}
