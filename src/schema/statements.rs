//! Statement splitting and the small amount of SQL reading the lifecycle
//! manager needs: which entity a statement creates and which it depends on.

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Normal,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Splits a migration script into individual statements.
///
/// Semicolons inside string literals, quoted identifiers and comments do not
/// terminate a statement, nor do the ones inside a trigger body. Comments are
/// dropped and empty statements are skipped.
#[must_use]
pub fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = Scan::Normal;
    let mut chars = script.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            Scan::Normal => match c {
                '\'' | '"' | '`' => {
                    state = Scan::Quoted(c);
                    current.push(c);
                }
                '[' => {
                    state = Scan::Quoted(']');
                    current.push(c);
                }
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    state = Scan::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = Scan::BlockComment;
                }
                ';' => {
                    if is_open_trigger(&current) {
                        current.push(c);
                    } else {
                        push_statement(&mut statements, &mut current);
                    }
                }
                _ => current.push(c),
            },
            Scan::Quoted(close) => {
                current.push(c);
                if c == close {
                    // A doubled quote is an escaped quote, not the end.
                    if close != ']' && chars.peek() == Some(&close) {
                        current.push(close);
                        chars.next();
                    } else {
                        state = Scan::Normal;
                    }
                }
            }
            Scan::LineComment => {
                if c == '\n' {
                    current.push('\n');
                    state = Scan::Normal;
                }
            }
            Scan::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    current.push(' ');
                    state = Scan::Normal;
                }
            }
        }
    }

    push_statement(&mut statements, &mut current);
    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
    current.clear();
}

fn is_open_trigger(statement: &str) -> bool {
    let words = tokenize(statement);
    let is_trigger = matches!(
        words.iter().map(String::as_str).collect::<Vec<_>>().as_slice(),
        ["create", "trigger", ..]
            | ["create", "temp" | "temporary", "trigger", ..]
    );
    if !is_trigger {
        return false;
    }

    // The body closes on the END matching BEGIN; CASE ... END nests inside it.
    let mut depth = 0i32;
    let mut opened = false;
    for word in &words {
        match word.as_str() {
            "begin" => {
                depth += 1;
                opened = true;
            }
            "case" => depth += 1,
            "end" => depth -= 1,
            _ => {}
        }
    }
    !opened || depth > 0
}

/// Lowercased words and identifiers of a statement; literals and punctuation
/// are dropped. Quoted identifiers are unquoted and schema prefixes removed.
fn tokenize(statement: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = statement.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' | '`' | '[' => {
                let close = if c == '[' { ']' } else { c };
                let mut ident = String::new();
                for next in chars.by_ref() {
                    if next == close {
                        break;
                    }
                    ident.push(next);
                }
                tokens.push(strip_schema(&ident.to_lowercase()));
            }
            '\'' => {
                for next in chars.by_ref() {
                    if next == '\'' {
                        break;
                    }
                }
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' || next == '.' || next == '$' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(strip_schema(&word.to_lowercase()));
            }
            _ => {}
        }
    }

    tokens
}

fn strip_schema(ident: &str) -> String {
    ident.rsplit('.').next().unwrap_or(ident).to_string()
}

fn skip_if_not_exists(words: &[&str]) -> usize {
    if words.starts_with(&["if", "not", "exists"]) {
        3
    } else {
        0
    }
}

/// Entity created by a `CREATE TABLE` / `CREATE VIEW` statement, if any.
#[must_use]
pub fn created_entity(statement: &str) -> Option<String> {
    let tokens = tokenize(statement);
    let words: Vec<&str> = tokens.iter().map(String::as_str).collect();

    let mut i = match words.as_slice() {
        ["create", "temp" | "temporary", "table" | "view", ..] => 3,
        ["create", "virtual", "table", ..] => 3,
        ["create", "table" | "view", ..] => 2,
        _ => return None,
    };
    i += skip_if_not_exists(&words[i..]);
    words.get(i).map(|w| (*w).to_string())
}

/// Entities a statement requires to exist already.
#[must_use]
pub fn referenced_entities(statement: &str) -> Vec<String> {
    let tokens = tokenize(statement);
    let words: Vec<&str> = tokens.iter().map(String::as_str).collect();
    let mut found: Vec<String> = Vec::new();
    let mut add = |name: &str| {
        if !found.iter().any(|f| f == name) {
            found.push(name.to_string());
        }
    };

    match words.as_slice() {
        ["create", "unique", "index", ..] | ["create", "index", ..] => {
            if let Some(pos) = words.iter().position(|w| *w == "on") {
                if let Some(target) = words.get(pos + 1) {
                    add(*target);
                }
            }
        }
        ["create", "trigger", ..] | ["create", "temp" | "temporary", "trigger", ..] => {
            if let Some(pos) = words.iter().position(|w| *w == "on") {
                if let Some(target) = words.get(pos + 1) {
                    add(*target);
                }
            }
        }
        ["alter", "table", rest @ ..] => {
            let skip = if rest.first() == Some(&"if") { 2 } else { 0 };
            if let Some(target) = rest.get(skip) {
                add(*target);
            }
        }
        ["insert", "into", target, ..]
        | ["insert", "or", _, "into", target, ..]
        | ["update", target, ..]
        | ["delete", "from", target, ..] => add(*target),
        _ => {}
    }

    for (i, word) in words.iter().enumerate() {
        if *word == "references" {
            if let Some(target) = words.get(i + 1) {
                add(*target);
            }
        }
    }

    found
}
