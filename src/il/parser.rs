//! # IL textual parser
//!
//! Line-oriented parser that is the inverse of [`crate::il::printer`]
//! (spec.md §4.4, §6). Every helper returns `Result<_, IlParseError>`; the
//! top-level entry point surfaces the *first* failure to the caller verbatim
//! because IL input is machine-generated and partial IR is not useful
//! (spec.md §7) — this differs deliberately from the BASIC parser, which
//! recovers and keeps going.

use std::collections::HashMap;

use thiserror::Error;

use crate::il::model::*;
use crate::il::operand;
use crate::il::types::Type;
use crate::il::value::Value;
use crate::source::SourceLoc;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct IlParseError {
    pub line: usize,
    pub message: String,
}

impl IlParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

type PResult<T> = Result<T, IlParseError>;

/// Strips a `//` line comment that begins outside of a quoted string.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut in_string = false;
    let mut escape = false;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if c == '/' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
            return &line[..i];
        }
        i += 1;
    }
    line
}

/// Splits `text` on top-level commas, respecting `"..."` quoting and
/// `(...)`/`[...]` nesting so commas inside a string literal or a nested
/// argument list don't split the list prematurely.
fn split_top_level(text: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    let mut current = String::new();
    for c in text.chars() {
        if in_string {
            current.push(c);
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                current.push(c);
            }
            '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' => {
                depth -= 1;
                current.push(c);
            }
            c if c == sep && depth == 0 => {
                parts.push(current.trim().to_string());
                current = String::new();
            }
            c => current.push(c),
        }
    }
    if !current.trim().is_empty() || !parts.is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

struct Line {
    no: usize,
    text: String,
}

/// Per-function temp-id table: maps the SSA name as written (`t0`, `sum`,
/// ...) to its allocated numeric id, and tracks the next free id so named
/// temporaries and explicit `%tN` ids can coexist.
#[derive(Default)]
struct TempTable {
    ids: HashMap<String, u32>,
    next: u32,
}

impl TempTable {
    fn lookup(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    /// Binds `name` to an id: if `name` has the literal shape `tN`, that
    /// numeral is the id (and bumps the counter past it); otherwise the next
    /// free id is allocated.
    fn bind(&mut self, name: &str) -> u32 {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = if let Some(digits) = name.strip_prefix('t') {
            digits.parse::<u32>().unwrap_or(self.next)
        } else {
            self.next
        };
        self.ids.insert(name.to_string(), id);
        if id >= self.next {
            self.next = id + 1;
        }
        id
    }
}

/// Parses a complete IL module from its textual representation.
pub fn parse_module(source: &str) -> PResult<Module> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);

    let mut lines = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let no = idx + 1;
        let trimmed = strip_comment(raw).trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        lines.push(Line { no, text: trimmed.to_string() });
    }

    let mut module = Module::default();
    let mut i = 0usize;
    let mut saw_version = false;

    while i < lines.len() {
        let line = &lines[i];
        let word = first_word(&line.text);
        match word {
            "il" => {
                if saw_version {
                    return Err(IlParseError::new(line.no, "duplicate 'il' version directive"));
                }
                let rest = line.text["il".len()..].trim();
                if rest.is_empty() {
                    return Err(IlParseError::new(line.no, "missing 'il' version directive"));
                }
                module.version = rest.to_string();
                saw_version = true;
                i += 1;
            }
            "target" => {
                if !saw_version {
                    return Err(IlParseError::new(line.no, "missing 'il' version directive"));
                }
                let rest = line.text["target".len()..].trim();
                let triple = parse_quoted(rest, line.no)?;
                module.target = Some(triple);
                i += 1;
            }
            "extern" => {
                if !saw_version {
                    return Err(IlParseError::new(line.no, "missing 'il' version directive"));
                }
                module.externs.push(parse_extern(&line.text, line.no)?);
                i += 1;
            }
            "global" => {
                if !saw_version {
                    return Err(IlParseError::new(line.no, "missing 'il' version directive"));
                }
                module.globals.push(parse_global(&line.text, line.no)?);
                i += 1;
            }
            "func" => {
                if !saw_version {
                    return Err(IlParseError::new(line.no, "missing 'il' version directive"));
                }
                let (func, next) = parse_function(&lines, i)?;
                module.functions.push(func);
                i = next;
            }
            other => {
                return Err(IlParseError::new(line.no, format!("unexpected directive '{other}'")));
            }
        }
    }

    if !saw_version {
        return Err(IlParseError::new(0, "missing 'il' version directive"));
    }

    Ok(module)
}

fn first_word(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}

fn parse_quoted(text: &str, line: usize) -> PResult<String> {
    let text = text.trim();
    let body = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| IlParseError::new(line, "expected quoted string"))?;
    crate::il::escape::decode(body)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|e| IlParseError::new(line, e.to_string()))
}

/// `extern @name(<type>, ...) -> <type>`
fn parse_extern(text: &str, line: usize) -> PResult<Extern> {
    let rest = text["extern".len()..].trim();
    let name_start = rest
        .strip_prefix('@')
        .ok_or_else(|| IlParseError::new(line, "expected '@' before extern name"))?;
    let open = name_start
        .find('(')
        .ok_or_else(|| IlParseError::new(line, "expected '(' in extern signature"))?;
    let name = name_start[..open].trim().to_string();
    let close = name_start
        .find(')')
        .ok_or_else(|| IlParseError::new(line, "expected ')' in extern signature"))?;
    let params_text = &name_start[open + 1..close];
    let mut param_tys = Vec::new();
    for tok in split_top_level(params_text, ',') {
        if tok.is_empty() {
            continue;
        }
        param_tys.push(operand::parse_type(&tok).map_err(|m| IlParseError::new(line, m))?);
    }
    let arrow_rest = name_start[close + 1..]
        .trim()
        .strip_prefix("->")
        .ok_or_else(|| IlParseError::new(line, "expected '->' in extern signature"))?
        .trim();
    let ret_ty = operand::parse_type(arrow_rest).map_err(|m| IlParseError::new(line, m))?;
    Ok(Extern { name, ret_ty, param_tys })
}

/// `global @name = "<escaped string>"` or `global @name: <type> = <const>`
fn parse_global(text: &str, line: usize) -> PResult<Global> {
    let rest = text["global".len()..].trim();
    let name_part = rest
        .strip_prefix('@')
        .ok_or_else(|| IlParseError::new(line, "expected '@' before global name"))?;
    let eq = name_part
        .find('=')
        .ok_or_else(|| IlParseError::new(line, "expected '=' in global directive"))?;
    let mut header = name_part[..eq].trim();
    let mut ty = Type::Str;
    if let Some(colon) = header.find(':') {
        ty = operand::parse_type(header[colon + 1..].trim()).map_err(|m| IlParseError::new(line, m))?;
        header = header[..colon].trim();
    }
    let name = header.to_string();
    let init_text = name_part[eq + 1..].trim();
    let init = if init_text.starts_with('"') {
        let decoded = parse_quoted(init_text, line)?;
        GlobalInit::Str(decoded.into_bytes())
    } else {
        GlobalInit::Scalar(operand::parse_const(init_text).map_err(|m| IlParseError::new(line, m))?)
    };
    Ok(Global { name, ty, init })
}

/// `func @name(%t0:type, ...) -> type { ... }`
fn parse_function(lines: &[Line], start: usize) -> PResult<(Function, usize)> {
    let header = &lines[start];
    let rest = header.text["func".len()..].trim();
    let name_part = rest
        .strip_prefix('@')
        .ok_or_else(|| IlParseError::new(header.no, "expected '@' before function name"))?;
    let open = name_part
        .find('(')
        .ok_or_else(|| IlParseError::new(header.no, "expected '(' in function header"))?;
    let name = name_part[..open].trim().to_string();
    let close = matching_paren(name_part, open)
        .ok_or_else(|| IlParseError::new(header.no, "unmatched '(' in function header"))?;
    let params_text = &name_part[open + 1..close];

    let mut temps = TempTable::default();
    let mut params = Vec::new();
    for tok in split_top_level(params_text, ',') {
        if tok.is_empty() {
            continue;
        }
        let (pname, ty) = split_name_type(&tok, header.no)?;
        let pname = pname
            .strip_prefix('%')
            .ok_or_else(|| IlParseError::new(header.no, "expected '%' before parameter name"))?;
        let id = temps.bind(pname);
        params.push(Param { id, ty });
    }

    let after_params = name_part[close + 1..].trim();
    let arrow_rest = after_params
        .strip_prefix("->")
        .ok_or_else(|| IlParseError::new(header.no, "expected '->' in function header"))?
        .trim();
    let brace = arrow_rest
        .find('{')
        .ok_or_else(|| IlParseError::new(header.no, "expected '{' to open function body"))?;
    let ret_ty = operand::parse_type(arrow_rest[..brace].trim()).map_err(|m| IlParseError::new(header.no, m))?;

    let mut i = start + 1;
    let mut blocks = Vec::new();
    loop {
        if i >= lines.len() {
            return Err(IlParseError::new(header.no, "unterminated function body: missing '}'"));
        }
        let line = &lines[i];
        if line.text == "}" {
            i += 1;
            break;
        }
        let (block, next) = parse_block(lines, i, &mut temps)?;
        blocks.push(block);
        i = next;
    }

    Ok((
        Function { name, ret_ty, params, blocks, next_temp: temps.next },
        i,
    ))
}

fn matching_paren(text: &str, open_idx: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    for (idx, &b) in bytes.iter().enumerate().skip(open_idx) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_name_type(tok: &str, line: usize) -> PResult<(String, Type)> {
    let colon = tok
        .find(':')
        .ok_or_else(|| IlParseError::new(line, format!("expected ':' in '{tok}'")))?;
    let name = tok[..colon].trim().to_string();
    let ty = operand::parse_type(tok[colon + 1..].trim()).map_err(|m| IlParseError::new(line, m))?;
    Ok((name, ty))
}

/// `^label(%t0:type, ...):` followed by instruction lines.
fn parse_block(lines: &[Line], start: usize, temps: &mut TempTable) -> PResult<(BasicBlock, usize)> {
    let header = &lines[start];
    let text = header
        .text
        .strip_prefix('^')
        .ok_or_else(|| IlParseError::new(header.no, "expected block label starting with '^'"))?;
    let colon = text
        .rfind(':')
        .ok_or_else(|| IlParseError::new(header.no, "expected ':' after block label"))?;
    let label_part = &text[..colon];
    let (label, params) = if let Some(open) = label_part.find('(') {
        let close = matching_paren(label_part, open)
            .ok_or_else(|| IlParseError::new(header.no, "unmatched '(' in block params"))?;
        let label = label_part[..open].trim().to_string();
        let mut params = Vec::new();
        for tok in split_top_level(&label_part[open + 1..close], ',') {
            if tok.is_empty() {
                continue;
            }
            let (pname, ty) = split_name_type(&tok, header.no)?;
            let pname = pname
                .strip_prefix('%')
                .ok_or_else(|| IlParseError::new(header.no, "expected '%' before block param name"))?;
            let id = temps.bind(pname);
            params.push(BlockParam { id, ty });
        }
        (label, params)
    } else {
        (label_part.trim().to_string(), Vec::new())
    };

    let mut instrs = Vec::new();
    let mut i = start + 1;
    while i < lines.len() {
        let line = &lines[i];
        if line.text == "}" || line.text.starts_with('^') {
            break;
        }
        instrs.push(parse_instr(&line.text, line.no, temps)?);
        i += 1;
    }
    Ok((BasicBlock { label, params, instrs }, i))
}

/// `[%tN = ] <opcode> <type>? <operand>, ... [-> ^label(args), ...]`
fn parse_instr(text: &str, line: usize, temps: &mut TempTable) -> PResult<Instr> {
    let (result, rest) = if let Some(eq_idx) = text.find(" = ") {
        let lhs = text[..eq_idx].trim();
        let name = lhs
            .strip_prefix('%')
            .ok_or_else(|| IlParseError::new(line, "expected '%' before assigned temp"))?;
        (Some(temps.bind(name)), text[eq_idx + 3..].trim())
    } else {
        (None, text)
    };

    let (main_part, branch_part) = split_branch_clause(rest);

    let mut tokens = main_part.splitn(2, char::is_whitespace);
    let mnemonic = tokens.next().unwrap_or("").trim();
    let operand_text = tokens.next().unwrap_or("").trim();
    let opcode = Opcode::parse(mnemonic)
        .ok_or_else(|| IlParseError::new(line, format!("unknown opcode '{mnemonic}'")))?;

    let info = opcode.info();
    if info.has_result != result.is_some() && opcode != Opcode::Trap {
        return Err(IlParseError::new(
            line,
            if info.has_result {
                format!("opcode '{mnemonic}' requires an assigned result")
            } else {
                format!("opcode '{mnemonic}' does not produce a result")
            },
        ));
    }

    let mut ty = Type::Void;
    let mut operands = Vec::new();
    let mut remaining = operand_text;

    if !matches!(opcode, Opcode::Br | Opcode::Trap) {
        let (type_tok, after) = split_first_token(remaining);
        if !type_tok.is_empty() {
            ty = operand::parse_type(type_tok).map_err(|m| IlParseError::new(line, m))?;
            remaining = after;
        }
    }

    let is_const_opcode = matches!(opcode, Opcode::Iconst | Opcode::Fconst | Opcode::Sconst);
    for tok in split_top_level(remaining, ',') {
        let tok = tok.trim();
        if tok.is_empty() {
            continue;
        }
        let value = if is_const_opcode {
            operand::parse_const(tok).map_err(|m| IlParseError::new(line, m))?
        } else {
            let lookup = |name: &str| temps.lookup(name);
            operand::parse_value(tok, lookup).map_err(|m| IlParseError::new(line, m))?
        };
        operands.push(value);
    }

    let mut targets = Vec::new();
    let mut trap_kind = None;
    if opcode == Opcode::Trap {
        if let Some(first) = operands.first() {
            if let Value::ConstStr(bytes) = first {
                trap_kind = Some(String::from_utf8_lossy(bytes).into_owned());
                operands.clear();
            }
        }
    }
    if let Some(clause) = branch_part {
        targets = parse_branch_targets(clause, line, temps)?;
    }

    Ok(Instr {
        opcode,
        result,
        ty,
        operands,
        targets,
        trap_kind,
        loc: SourceLoc::new(crate::source::FileId(0), line as u32, 0),
    })
}

fn split_first_token(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(|c: char| c.is_whitespace()) {
        Some(idx) => (&text[..idx], text[idx..].trim_start()),
        None => {
            // A lone token might actually be the start of an operand list
            // (e.g. `ret` with no operands, or `trap` with no type). Treat it
            // as a type only when it parses as one; otherwise it belongs to
            // the operand list.
            if text.is_empty() || operand::parse_type(text).is_ok() {
                (text, "")
            } else {
                ("", text)
            }
        }
    }
}

/// Splits `-> ^label(...), ^label(...)` off the end of an instruction's main
/// operand text, respecting nested parens/brackets/quotes.
fn split_branch_clause(text: &str) -> (&str, Option<&str>) {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            '-' if depth == 0 && bytes.get(i + 1) == Some(&b'>') => {
                return (text[..i].trim(), Some(text[i + 2..].trim()));
            }
            _ => {}
        }
        i += 1;
    }
    (text.trim(), None)
}

fn parse_branch_targets(clause: &str, line: usize, temps: &mut TempTable) -> PResult<Vec<BranchTarget>> {
    let mut targets = Vec::new();
    for item in split_top_level(clause, ',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let label_part = item.strip_prefix('^').unwrap_or(item);
        let (label, args_text) = if let Some(open) = label_part.find('(') {
            let close = matching_paren(label_part, open)
                .ok_or_else(|| IlParseError::new(line, "unmatched '(' in branch target"))?;
            (label_part[..open].trim().to_string(), Some(&label_part[open + 1..close]))
        } else {
            (label_part.trim().to_string(), None)
        };
        if label.is_empty() {
            return Err(IlParseError::new(line, "malformed branch target"));
        }
        let mut args = Vec::new();
        if let Some(text) = args_text {
            for tok in split_top_level(text, ',') {
                if tok.is_empty() {
                    continue;
                }
                let lookup = |name: &str| temps.lookup(name);
                args.push(operand::parse_value(&tok, lookup).map_err(|m| IlParseError::new(line, m))?);
            }
        }
        targets.push(BranchTarget { label, args });
    }
    if targets.is_empty() {
        return Err(IlParseError::new(line, "malformed branch target"));
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY_FN: &str = "il 0.1\nfunc @main() -> i32 {\n^entry:\n  %t0 = iconst i32 42\n  ret i32 %t0\n}\n";

    #[test]
    fn parses_tiny_function() {
        let module = parse_module(TINY_FN).expect("parse");
        assert_eq!(module.version, "0.1");
        assert_eq!(module.functions.len(), 1);
        let f = &module.functions[0];
        assert_eq!(f.name, "main");
        assert_eq!(f.blocks.len(), 1);
        assert_eq!(f.blocks[0].instrs.len(), 2);
        assert_eq!(f.blocks[0].instrs[0].opcode, Opcode::Iconst);
        assert_eq!(f.blocks[0].instrs[1].opcode, Opcode::Ret);
    }

    #[test]
    fn missing_version_directive_is_rejected() {
        let err = parse_module("func @main() -> void {\n^entry:\n  ret void\n}\n").unwrap_err();
        assert!(err.message.contains("'il' version"));
    }

    #[test]
    fn rejects_unknown_type() {
        let src = "il 0.1\nfunc @main() -> i32 {\n^entry:\n  %t0 = iconst i128 1\n  ret i32 %t0\n}\n";
        let err = parse_module(src).unwrap_err();
        assert!(err.message.contains("unknown type"));
    }

    #[test]
    fn parses_branch_with_block_arguments() {
        let src = "il 0.1\nfunc @f(%t0:i32) -> i32 {\n^entry:\n  br -> ^exit(%t0)\n^exit(%t1:i32):\n  ret i32 %t1\n}\n";
        let module = parse_module(src).expect("parse");
        let entry = &module.functions[0].blocks[0];
        assert_eq!(entry.instrs[0].opcode, Opcode::Br);
        assert_eq!(entry.instrs[0].targets[0].label, "exit");
        assert_eq!(entry.instrs[0].targets[0].args, vec![Value::Temp(0)]);
    }

    #[test]
    fn parses_extern_and_global_directives() {
        let src = "il 0.1\nextern @puts(ptr) -> i32\nglobal @msg = \"hi\\n\"\nfunc @main() -> void {\n^entry:\n  ret void\n}\n";
        let module = parse_module(src).expect("parse");
        assert_eq!(module.externs[0].name, "puts");
        assert_eq!(module.externs[0].ret_ty, Type::I32);
        match &module.globals[0].init {
            GlobalInit::Str(bytes) => assert_eq!(bytes, b"hi\n"),
            _ => panic!("expected string init"),
        }
    }

    #[test]
    fn comments_and_preprocessor_lines_are_ignored() {
        let src = "// leading comment\n#line 1\nil 0.1\nfunc @main() -> void { // trailing\n^entry:\n  ret void\n}\n";
        assert!(parse_module(src).is_ok());
    }
}
