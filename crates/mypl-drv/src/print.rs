//! Pretty-printer for `--print`: a straightforward visitor over the AST
//! that reconstructs readable MyPL source, grounded in the teacher's
//! print-visitor style (one `fmt::Write` sink, indent tracked on a
//! running counter rather than per-call depth).

use std::fmt::Write;

use mypl_lex::TokenKind;
use mypl_par::{
    AssignStmt, CallExpr, Expr, ForStmt, FunDef, IfStmt, NewRValue, Program, RValue, Stmt,
    StructDef, Term, VarDeclStmt, VarRValue, VarRef, WhileStmt,
};

const INDENT_AMT: usize = 2;

struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
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
        for s in &p.struct_defs {
            self.struct_def(s);
        }
        for f in &p.fun_defs {
            self.fun_def(f);
        }
    }

    fn fun_def(&mut self, f: &FunDef) {
        let _ = write!(self.out, "\n{} {}(", f.return_type.type_name, f.name.lexeme);
        for (i, p) in f.params.iter().enumerate() {
            let _ = write!(self.out, "{} {}", p.data_type.type_name, p.var_name.lexeme);
            if i < f.params.len() - 1 {
                self.out.push_str(", ");
            }
        }
        self.out.push_str(") {\n");
        self.inc_indent();
        for stmt in &f.body {
            self.print_indent();
            self.stmt(stmt);
            self.out.push('\n');
        }
        self.dec_indent();
        self.out.push_str("}\n");
    }

    fn struct_def(&mut self, s: &StructDef) {
        let _ = writeln!(self.out, "struct {} {{", s.name.lexeme);
        self.inc_indent();
        for (i, field) in s.fields.iter().enumerate() {
            self.print_indent();
            let _ = write!(self.out, "{} {}", field.data_type.type_name, field.var_name.lexeme);
            if i + 1 < s.fields.len() {
                self.out.push(',');
            }
            self.out.push('\n');
        }
        self.dec_indent();
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
        let _ = write!(self.out, "{} {} = ", d.var_def.data_type.type_name, d.var_def.var_name.lexeme);
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
            self.out.push('\n');
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
            self.out.push('\n');
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
            self.out.push('\n');
        }
        self.dec_indent();
        self.print_indent();
        self.out.push('}');
        for elseif in &s.else_ifs {
            self.out.push('\n');
            self.print_indent();
            self.out.push_str("elseif (");
            self.expr(&elseif.condition);
            self.out.push_str(") {\n");
            self.inc_indent();
            for stmt in &elseif.stmts {
                self.print_indent();
                self.stmt(stmt);
                self.out.push('\n');
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
                self.out.push('\n');
            }
            self.dec_indent();
            self.print_indent();
            self.out.push('}');
        }
    }

    fn call(&mut self, c: &CallExpr) {
        let _ = write!(self.out, "{}(", c.fun_name.lexeme);
        for (i, arg) in c.args.iter().enumerate() {
            self.expr(arg);
            if i + 1 < c.args.len() {
                self.out.push_str(", ");
            }
        }
        self.out.push(')');
    }

    fn expr(&mut self, e: &Expr) {
        if e.negated {
            self.out.push_str("not (");
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
        let _ = write!(self.out, "new {}", v.type_name.lexeme);
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

/// Renders `program` back to MyPL source text.
pub fn print_program(program: &Program) -> String {
    let mut printer = Printer { out: String::new(), indent: 0 };
    printer.program(program);
    printer.out
}
