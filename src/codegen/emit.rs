//! Move source printer.
//!
//! Four-space indentation, one statement per line, integers in plain
//! decimal. Output depends only on the module value.

use std::fmt::Write;

use super::ir::{Expr, Function, MoveModule, Param, Stmt, Type, Visibility};

const INDENT: &str = "    ";

pub fn emit_module(module: &MoveModule) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "module {}::{} {{", module.address, module.name);
    for path in &module.uses {
        let _ = writeln!(out, "{}use {};", INDENT, path);
    }
    for func in &module.functions {
        out.push('\n');
        emit_function(&mut out, func);
    }
    out.push_str("}\n");
    out
}

fn emit_function(out: &mut String, func: &Function) {
    let visibility = match func.visibility {
        Visibility::Public => "public fun",
        Visibility::PublicEntry => "public entry fun",
        Visibility::EntryPublic => "entry public fun",
    };
    let params: Vec<String> = func.params.iter().map(param).collect();
    let _ = write!(out, "{}{} {}({})", INDENT, visibility, func.name, params.join(", "));
    match func.returns.as_slice() {
        [] => {}
        [single] => {
            let _ = write!(out, ": {}", ty(single));
        }
        many => {
            let types: Vec<String> = many.iter().map(ty).collect();
            let _ = write!(out, ": ({})", types.join(", "));
        }
    }
    out.push_str(" {\n");

    let body = format!("{0}{0}", INDENT);
    for (i, block) in func.blocks.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for stmt in block {
            out.push_str(&body);
            out.push_str(&statement(stmt));
            out.push('\n');
        }
    }
    if let Some(tail) = &func.tail {
        out.push_str(&body);
        out.push_str(&expr(tail));
        out.push('\n');
    }
    let _ = writeln!(out, "{}}}", INDENT);
}

fn param(p: &Param) -> String {
    format!("{}: {}", p.name, ty(&p.ty))
}

fn ty(t: &Type) -> String {
    match t {
        Type::U64 => "u64".to_string(),
        Type::Bytes => "vector<u8>".to_string(),
        Type::U64Vector => "vector<u64>".to_string(),
        Type::Named(path) => path.clone(),
        Type::Ref(inner) => format!("&{}", ty(inner)),
        Type::MutRef(inner) => format!("&mut {}", ty(inner)),
    }
}

fn statement(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Let {
            names,
            mutable,
            value,
        } => {
            let pattern = match names.as_slice() {
                [single] => single.clone(),
                many => format!("({})", many.join(", ")),
            };
            let kw = if *mutable { "let mut" } else { "let" };
            format!("{} {} = {};", kw, pattern, expr(value))
        }
        Stmt::Expr(e) => format!("{};", expr(e)),
    }
}

fn expr(e: &Expr) -> String {
    match e {
        Expr::Var(name) => name.clone(),
        Expr::U64(n) => n.to_string(),
        Expr::ByteString(s) => format!("b\"{}\"", s),
        Expr::Vector(items) => {
            let mut s = String::with_capacity(items.len() * 4 + 8);
            s.push_str("vector[");
            for (i, n) in items.iter().enumerate() {
                if i > 0 {
                    s.push_str(", ");
                }
                let _ = write!(s, "{}", n);
            }
            s.push(']');
            s
        }
        Expr::Call { func, args } => {
            let args: Vec<String> = args.iter().map(expr).collect();
            format!("{}({})", func, args.join(", "))
        }
        Expr::Borrow { mutable, expr: inner } => {
            let prefix = if *mutable { "&mut " } else { "&" };
            format!("{}{}", prefix, expr(inner))
        }
        Expr::Tuple(items) => {
            let items: Vec<String> = items.iter().map(expr).collect();
            format!("({})", items.join(", "))
        }
    }
}
