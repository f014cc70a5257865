//! Text Assembly Front-End
//!
//! One instruction per line, optionally preceded by a `name:` label.
//! `;` starts a comment. Mnemonics are the opcode names in any case:
//!
//! ```text
//! ; sum 1..=10
//!         push 0
//!         store_global 0
//! loop:   load_global 1
//!         push 11
//!         lt
//!         jmp_if_false done
//! ```
//!
//! PUSH takes a literal (`nil`, `true`, `false`, an integer, a double or a
//! double-quoted string). Branches take a label or an absolute address.

use crate::bytecode::{Chunk, Constant, OpCode};
use crate::error::{SvmError, SvmResult};

use super::builder::Assembler;

/// Assemble text source into a chunk. Source line numbers become the line table.
pub fn assemble_source(source: &str) -> SvmResult<Chunk> {
    let mut asm = Assembler::new();

    for (index, raw) in source.lines().enumerate() {
        let line = index as u32 + 1;
        let syntax = |message: String| SvmError::Syntax { line, message };

        asm.set_line(line);

        let mut text = strip_comment(raw).trim();
        let (head, rest) = split_first_token(text);
        if let Some(name) = head.strip_suffix(':') {
            if !is_identifier(name) {
                return Err(syntax(format!("invalid label name '{}'", name)));
            }
            asm.label(name)?;
            text = rest;
        }

        if text.is_empty() {
            continue;
        }

        assemble_instruction(&mut asm, text).map_err(syntax)?;
    }

    asm.resolve()
}

fn assemble_instruction(asm: &mut Assembler, text: &str) -> Result<(), String> {
    let (mnemonic, operand) = split_first_token(text);
    let opcode = OpCode::from_mnemonic(mnemonic)
        .ok_or_else(|| format!("unknown instruction '{}'", mnemonic))?;

    if !opcode.has_operand() {
        if !operand.is_empty() {
            return Err(format!("{} takes no operand", opcode));
        }
        asm.op(opcode);
        return Ok(());
    }

    if operand.is_empty() {
        return Err(format!("{} requires an operand", opcode));
    }

    match opcode {
        OpCode::Push => asm.push_constant(parse_literal(operand)?),
        op if op.is_branch() => {
            if let Ok(address) = operand.parse::<i32>() {
                asm.emit(op, address);
            } else if is_identifier(operand) {
                asm.branch(op, operand);
            } else {
                return Err(format!("invalid branch target '{}'", operand));
            }
        }
        op => {
            let value = operand
                .parse::<i32>()
                .map_err(|_| format!("invalid operand '{}' for {}", operand, op))?;
            asm.emit(op, value);
        }
    }
    Ok(())
}

fn split_first_token(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (text, ""),
    }
}

/// Cut the line at the first `;` outside a string literal.
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;

    for (pos, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            ';' if !in_string => return &line[..pos],
            _ => {}
        }
    }
    line
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '.' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn parse_literal(text: &str) -> Result<Constant, String> {
    match text {
        "nil" => return Ok(Constant::Nil),
        "true" => return Ok(Constant::Bool(true)),
        "false" => return Ok(Constant::Bool(false)),
        _ => {}
    }

    if text.starts_with('"') {
        return parse_string(text).map(|s| Constant::Str(s.into()));
    }

    if let Ok(i) = text.parse::<i64>() {
        return Ok(Constant::Int(i));
    }

    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("integer literal out of range '{}'", text));
    }

    let numeric = text.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+' || c == '.');
    match text.parse::<f64>() {
        Ok(d) if numeric => Ok(Constant::Double(d)),
        _ => Err(format!("invalid literal '{}'", text)),
    }
}

fn parse_string(text: &str) -> Result<String, String> {
    let body = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| format!("unterminated string {}", text))?;

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some(other) => return Err(format!("unknown escape '\\{}'", other)),
                None => return Err("dangling escape at end of string".to_string()),
            },
            '"' => return Err(format!("unexpected quote in {}", text)),
            c => out.push(c),
        }
    }
    Ok(out)
}
