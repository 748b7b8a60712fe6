//! `--java`: a thin, best-effort transpiler to a single Java source
//! file, grounded in the teacher's Java-transpiler visitor. It shares
//! the pretty-printer's AST walk but rewrites the handful of spots
//! where MyPL and Java syntax diverge: builtin calls, array
//! declarations, and struct allocation.

use std::fmt::Write;

use mypl_lex::TokenKind;
use mypl_par::{
    AssignStmt, CallExpr, Expr, ForStmt, FunDef, IfStmt, NewRValue, Program, RValue, Stmt,
    StructDef, Term, VarDeclStmt, VarRValue, VarRef, WhileStmt,
};

const INDENT_AMT: usize = 2;

fn is_scalar_type_name(name: &str) -> bool {
    matches!(name, "int" | "double" | "bool" | "char" | "string" | "void")
}

/// MyPL's five scalar type names rendered as their Java counterparts.
fn java_type_name(mypl_name: &str) -> String {
    match mypl_name {
        "string" => "String".to_string(),
        "void" => "void".to_string(),
        other => other.to_string(),
    }
}

struct Transpiler {
    out: String,
    indent: usize,
}

impl Transpiler {
    fn inc_indent(&mut self) {
        self.indent += INDENT_AMT;
    }

    fn dec_indent(&mut self) {
        self.indent -= INDENT_AMT;
    }

    fn print_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push(' ');
        }
    }

    fn program(&mut self, p: &Program) {
        self.out.push_str("import java.util.*;\n");
        self.out.push_str("import java.util.Scanner;\n\n");
        self.out.push_str("class Program {\n");
        self.inc_indent();
        self.print_indent();
        self.out.push_str("static Scanner input = new Scanner(System.in);\n");
        for s in &p.struct_defs {
            self.struct_def(s);
        }
        for f in &p.fun_defs {
            self.fun_def(f);
        }
        self.dec_indent();
        self.out.push_str("}\n");
    }

    fn struct_def(&mut self, s: &StructDef) {
        self.print_indent();
        let _ = writeln!(self.out, "static class {} {{", s.name.lexeme);
        self.inc_indent();
        for field in &s.fields {
            self.print_indent();
            let _ = writeln!(
                self.out,
                "public {} {};",
                java_type_name(&field.data_type.type_name),
                field.var_name.lexeme
            );
        }
        self.dec_indent();
        self.print_indent();
        self.out.push_str("}\n");
    }

    fn fun_def(&mut self, f: &FunDef) {
        self.out.push('\n');
        self.print_indent();
        self.out.push_str("public ");
        if f.name.lexeme == "main" {
            self.out.push_str("static ");
        }
        let _ = write!(self.out, "{} {}(", java_type_name(&f.return_type.type_name), f.name.lexeme);
        if f.name.lexeme == "main" {
            self.out.push_str("String[] args");
        } else {
            for (i, p) in f.params.iter().enumerate() {
                let _ = write!(self.out, "{} {}", java_type_name(&p.data_type.type_name), p.var_name.lexeme);
                if i < f.params.len() - 1 {
                    self.out.push_str(", ");
                }
            }
        }
        self.out.push_str(") {\n");
        self.inc_indent();
        for stmt in &f.body {
            self.print_indent();
            self.stmt(stmt);
            self.out.push_str(";\n");
        }
        self.dec_indent();
        self.print_indent();
        self.out.push_str("}\n");
    }

    fn stmt(&mut self, s: &Stmt) {
        match s {
            Stmt::VarDecl(d) => self.var_decl(d),
            Stmt::Assign(a) => self.assign(a),
            Stmt::Return(r) => {
                self.out.push_str("return ");
                self.expr(&r.expr);
            }
            Stmt::If(i) => self.if_stmt(i),
            Stmt::While(w) => self.while_stmt(w),
            Stmt::For(f) => self.for_stmt(f),
            Stmt::Call(c) => self.call(c),
        }
    }

    fn var_decl(&mut self, d: &VarDeclStmt) {
        let _ = write!(self.out, "{}", java_type_name(&d.var_def.data_type.type_name));
        if d.var_def.data_type.is_array {
            self.out.push_str("[]");
        }
        let _ = write!(self.out, " {} = ", d.var_def.var_name.lexeme);
        self.expr(&d.expr);
    }

    fn assign(&mut self, a: &AssignStmt) {
        for (i, step) in a.lvalue.iter().enumerate() {
            self.var_ref(step);
            if i + 1 < a.lvalue.len() {
                self.out.push('.');
            }
        }
        self.out.push_str(" = ");
        self.expr(&a.expr);
    }

    fn var_ref(&mut self, r: &VarRef) {
        self.out.push_str(&r.var_name.lexeme);
        if let Some(idx) = &r.array_expr {
            self.out.push('[');
            self.expr(idx);
            self.out.push(']');
        }
    }

    fn while_stmt(&mut self, w: &WhileStmt) {
        self.out.push_str("while (");
        self.expr(&w.condition);
        self.out.push_str(") {\n");
        self.inc_indent();
        for stmt in &w.stmts {
            self.print_indent();
            self.stmt(stmt);
            self.out.push_str(";\n");
        }
        self.dec_indent();
        self.print_indent();
        self.out.push('}');
    }

    fn for_stmt(&mut self, f: &ForStmt) {
        self.out.push_str("for (");
        self.var_decl(&f.var_decl);
        self.out.push_str("; ");
        self.expr(&f.condition);
        self.out.push_str("; ");
        self.assign(&f.assign_stmt);
        self.out.push_str(") {\n");
        self.inc_indent();
        for stmt in &f.stmts {
            self.print_indent();
            self.stmt(stmt);
            self.out.push_str(";\n");
        }
        self.dec_indent();
        self.print_indent();
        self.out.push('}');
    }

    fn if_stmt(&mut self, s: &IfStmt) {
        self.out.push_str("if (");
        self.expr(&s.if_part.condition);
        self.out.push_str(") {\n");
        self.inc_indent();
        for stmt in &s.if_part.stmts {
            self.print_indent();
            self.stmt(stmt);
            self.out.push_str(";\n");
        }
        self.dec_indent();
        self.print_indent();
        self.out.push('}');
        for elseif in &s.else_ifs {
            self.out.push('\n');
            self.print_indent();
            self.out.push_str("else if (");
            self.expr(&elseif.condition);
            self.out.push_str(") {\n");
            self.inc_indent();
            for stmt in &elseif.stmts {
                self.print_indent();
                self.stmt(stmt);
                self.out.push_str(";\n");
            }
            self.dec_indent();
            self.print_indent();
            self.out.push('}');
        }
        if !s.else_stmts.is_empty() {
            self.out.push('\n');
            self.print_indent();
            self.out.push_str("else {\n");
            self.inc_indent();
            for stmt in &s.else_stmts {
                self.print_indent();
                self.stmt(stmt);
                self.out.push_str(";\n");
            }
            self.dec_indent();
            self.print_indent();
            self.out.push('}');
        }
    }

    fn call(&mut self, c: &CallExpr) {
        match c.fun_name.lexeme.as_str() {
            "get" => {
                self.expr(&c.args[1]);
                self.out.push_str(".charAt(");
                self.expr(&c.args[0]);
                self.out.push(')');
            }
            "length" => {
                self.expr(&c.args[0]);
                self.out.push_str(".length");
                if matches!(expr_leaf_kind(&c.args[0]), Some(TokenKind::StringVal) | Some(TokenKind::StringType)) {
                    self.out.push_str("()");
                }
            }
            "input" => self.out.push_str("input.nextLine()"),
            "concat" => {
                self.expr(&c.args[0]);
                self.out.push_str(".concat(");
                self.expr(&c.args[1]);
                self.out.push(')');
            }
            "print" => {
                self.out.push_str("System.out.println(");
                self.expr(&c.args[0]);
                self.out.push(')');
            }
            "to_string" => self.builtin_call("String.valueOf", &c.args),
            "to_int" => self.builtin_call("(int) Double.parseDouble", &c.args),
            "to_double" => self.builtin_call("Double.parseDouble", &c.args),
            name => self.builtin_call(name, &c.args),
        }
    }

    fn builtin_call(&mut self, callee: &str, args: &[Expr]) {
        let _ = write!(self.out, "{callee}(");
        for (i, arg) in args.iter().enumerate() {
            self.expr(arg);
            if i + 1 < args.len() {
                self.out.push_str(", ");
            }
        }
        self.out.push(')');
    }

    fn expr(&mut self, e: &Expr) {
        if e.negated {
            self.out.push('!');
            self.out.push('(');
        }
        self.term(&e.first);
        if let Some(op) = &e.op {
            let _ = write!(self.out, " {} ", op.lexeme);
            self.expr(e.rest.as_ref().expect("op without rest"));
        }
        if e.negated {
            self.out.push(')');
        }
    }

    fn term(&mut self, t: &Term) {
        match t {
            Term::Simple(r) => self.rvalue(r),
            Term::Complex(e) => {
                self.out.push('(');
                self.expr(e);
                self.out.push(')');
            }
        }
    }

    fn rvalue(&mut self, v: &RValue) {
        match v {
            RValue::Simple(tok) => match tok.kind {
                TokenKind::CharVal => {
                    let _ = write!(self.out, "'{}'", tok.lexeme);
                }
                TokenKind::StringVal => {
                    let _ = write!(self.out, "\"{}\"", tok.lexeme);
                }
                _ => self.out.push_str(&tok.lexeme),
            },
            RValue::New(n) => self.new_rvalue(n),
            RValue::Var(v) => self.var_rvalue(v),
            RValue::Call(c) => self.call(c),
        }
    }

    fn new_rvalue(&mut self, v: &NewRValue) {
        let _ = write!(self.out, "new {}", java_type_name(&v.type_name.lexeme));
        if !is_scalar_type_name(&v.type_name.lexeme) {
            self.out.push_str("()");
        }
        if let Some(size) = &v.array_expr {
            self.out.push('[');
            self.expr(size);
            self.out.push(']');
        }
    }

    fn var_rvalue(&mut self, v: &VarRValue) {
        for (i, step) in v.path.iter().enumerate() {
            self.var_ref(step);
            if i + 1 < v.path.len() {
                self.out.push('.');
            }
        }
    }
}

fn expr_leaf_kind(e: &Expr) -> Option<TokenKind> {
    match &*e.first {
        Term::Simple(RValue::Simple(tok)) => Some(tok.kind),
        _ => None,
    }
}

/// Renders `program` as a single Java source file.
pub fn transpile_program(program: &Program) -> String {
    let mut t = Transpiler { out: String::new(), indent: 0 };
    t.program(program);
    t.out
}
