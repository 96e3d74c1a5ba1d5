//! # IL textual printer
//!
//! Renders a [`Module`] back to the textual form [`crate::il::parser`]
//! consumes, byte-for-byte stable for any module the parser produced
//! (spec.md §4.4, §8's round-trip testable property).

use std::fmt::Write as _;

use crate::il::model::*;

/// Prints `module` to its canonical textual representation.
pub fn print_module(module: &Module) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "il {}", module.version);
    if let Some(target) = &module.target {
        let _ = writeln!(out, "target \"{}\"", crate::il::escape::encode(target.as_bytes()));
    }
    for extern_ in &module.externs {
        print_extern(&mut out, extern_);
    }
    for global in &module.globals {
        print_global(&mut out, global);
    }
    for func in &module.functions {
        print_function(&mut out, func);
    }
    out
}

fn print_extern(out: &mut String, e: &Extern) {
    let params = e
        .param_tys
        .iter()
        .map(|t| t.canonical_name())
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "extern @{}({}) -> {}", e.name, params, e.ret_ty);
}

fn print_global(out: &mut String, g: &Global) {
    match &g.init {
        GlobalInit::Str(bytes) => {
            let _ = writeln!(out, "global @{} = \"{}\"", g.name, crate::il::escape::encode(bytes));
        }
        GlobalInit::Scalar(value) => {
            let _ = writeln!(out, "global @{}: {} = {}", g.name, g.ty, value);
        }
    }
}

fn print_function(out: &mut String, f: &Function) {
    let params = f
        .params
        .iter()
        .map(|p| format!("%t{}:{}", p.id, p.ty))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "func @{}({}) -> {} {{", f.name, params, f.ret_ty);
    for block in &f.blocks {
        print_block(out, block);
    }
    let _ = writeln!(out, "}}");
}

fn print_block(out: &mut String, block: &BasicBlock) {
    if block.params.is_empty() {
        let _ = writeln!(out, "^{}:", block.label);
    } else {
        let params = block
            .params
            .iter()
            .map(|p| format!("%t{}:{}", p.id, p.ty))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "^{}({}):", block.label, params);
    }
    for instr in &block.instrs {
        print_instr(out, instr);
    }
}

fn print_instr(out: &mut String, instr: &Instr) {
    let mut line = String::from("  ");
    if let Some(result) = instr.result {
        let _ = write!(line, "%t{result} = ");
    }
    line.push_str(instr.opcode.mnemonic());

    if !matches!(instr.opcode, Opcode::Br | Opcode::Trap) {
        let _ = write!(line, " {}", instr.ty);
    }

    if instr.opcode == Opcode::Trap {
        if let Some(kind) = &instr.trap_kind {
            let _ = write!(line, " \"{}\"", crate::il::escape::encode(kind.as_bytes()));
        }
    } else if !instr.operands.is_empty() {
        let operands = instr
            .operands
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(line, " {operands}");
    }

    if !instr.targets.is_empty() {
        let targets = instr
            .targets
            .iter()
            .map(print_target)
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(line, " -> {targets}");
    }

    out.push_str(&line);
    out.push('\n');
}

fn print_target(target: &BranchTarget) -> String {
    if target.args.is_empty() {
        format!("^{}", target.label)
    } else {
        let args = target
            .args
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!("^{}({})", target.label, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::parser::parse_module;

    const TINY_FN: &str = "il 0.1\nfunc @main() -> i32 {\n^entry:\n  %t0 = iconst i32 42\n  ret i32 %t0\n}\n";

    #[test]
    fn round_trips_tiny_function() {
        let module = parse_module(TINY_FN).expect("parse");
        assert_eq!(print_module(&module), TINY_FN);
    }

    #[test]
    fn round_trips_branch_with_args() {
        let src = "il 0.1\nfunc @f(%t0:i32) -> i32 {\n^entry:\n  br -> ^exit(%t0)\n^exit(%t1:i32):\n  ret i32 %t1\n}\n";
        let module = parse_module(src).expect("parse");
        assert_eq!(print_module(&module), src);
    }

    #[test]
    fn round_trips_externs_and_globals() {
        let src = "il 0.1\nextern @puts(ptr) -> i32\nglobal @msg = \"hi\\n\"\nfunc @main() -> void {\n^entry:\n  ret void\n}\n";
        let module = parse_module(src).expect("parse");
        assert_eq!(print_module(&module), src);
    }

    #[test]
    fn round_trips_switch_and_trap() {
        let src = "il 0.1\nfunc @f(%t0:i32) -> void {\n^entry:\n  switch i32 %t0 -> ^default, ^case0\n^default:\n  trap \"Unreachable\"\n^case0:\n  ret void\n}\n";
        let module = parse_module(src).expect("parse");
        assert_eq!(print_module(&module), src);
    }
}
