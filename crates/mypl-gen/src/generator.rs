use indexmap::IndexMap;

use mypl_lex::TokenKind;
use mypl_par::{
    CallExpr, Expr, ForStmt, FunDef, IfStmt, NewRValue, Program, RValue, ReturnStmt, Stmt, Term, VarDef, VarDeclStmt, VarRValue,
    VarRef, WhileStmt,
};
use mypl_sem::Checker;
use mypl_vm::{Operand, OpCode, VMFrameInfo, VMInstr, VMValue};

use crate::error::{GenError, GenResult};
use crate::slots::SlotEnv;

/// Lowers a type-checked `Program` into one `VMFrameInfo` per function.
/// Runs its own `Checker` in lock-step with its own scope stack purely to
/// answer one question codegen can't read off the AST directly: whether a
/// `length()` argument is a string (`SLEN`) or an array (`ALEN`).
pub struct Generator {
    checker: Checker,
    structs: IndexMap<String, Vec<VarDef>>,
    slots: SlotEnv,
    instructions: Vec<VMInstr>,
}

pub fn generate(program: &Program) -> GenResult<Vec<VMFrameInfo>> {
    let checker = Checker::prepare(program)?;
    let structs = program.struct_defs.iter().map(|s| (s.name.lexeme.clone(), s.fields.clone())).collect();
    let mut gen = Generator { checker, structs, slots: SlotEnv::new(), instructions: Vec::new() };
    program.fun_defs.iter().map(|f| gen.gen_fun(f)).collect()
}

impl Generator {
    fn emit(&mut self, instr: VMInstr) -> usize {
        self.instructions.push(instr);
        self.instructions.len() - 1
    }

    fn next_index(&self) -> usize {
        self.instructions.len()
    }

    fn patch(&mut self, idx: usize, target: usize) {
        self.instructions[idx].operand = Operand::Int(target as i64);
    }

    fn slot_of(&self, name: &str) -> GenResult<usize> {
        self.slots.lookup(name).ok_or_else(|| GenError(format!("undefined variable '{name}' during codegen")))
    }

    fn gen_fun(&mut self, fun_def: &FunDef) -> GenResult<VMFrameInfo> {
        self.instructions = Vec::new();
        self.slots = SlotEnv::new();
        self.slots.push_scope();
        self.checker.push_scope();

        for param in &fun_def.params {
            self.slots.allocate(&param.var_name.lexeme);
            self.checker.declare_local(&param.var_name.lexeme, param.data_type.clone());
        }
        for i in 0..fun_def.params.len() {
            self.emit(VMInstr::new(OpCode::Store, Operand::Int(i as i64)));
        }

        for stmt in &fun_def.body {
            self.gen_stmt(stmt)?;
        }

        if self.instructions.last().map(|i| i.op) != Some(OpCode::Ret) {
            self.emit(VMInstr::new(OpCode::Push, Operand::Value(VMValue::Null)));
            self.emit(VMInstr::bare(OpCode::Ret));
        }

        self.checker.pop_scope();
        self.slots.pop_scope();
        Ok(VMFrameInfo {
            function_name: fun_def.name.lexeme.clone(),
            arg_count: fun_def.params.len(),
            instructions: std::mem::take(&mut self.instructions),
        })
    }

    fn gen_stmt(&mut self, stmt: &Stmt) -> GenResult<()> {
        match stmt {
            Stmt::VarDecl(d) => self.gen_var_decl(d),
            Stmt::Assign(a) => self.gen_assign(&a.lvalue, &a.expr),
            Stmt::Return(r) => self.gen_return(r),
            Stmt::If(i) => self.gen_if(i),
            Stmt::While(w) => self.gen_while(w),
            Stmt::For(f) => self.gen_for(f),
            Stmt::Call(c) => {
                let pushed = self.gen_call(c)?;
                if pushed {
                    self.emit(VMInstr::bare(OpCode::Pop));
                }
                Ok(())
            }
        }
    }

    fn gen_var_decl(&mut self, d: &VarDeclStmt) -> GenResult<()> {
        // A plain-typed local initialized from `new T[n]` takes on the
        // array-ness of its initializer (see mypl-sem's `check_var_decl`);
        // mirror that here so a later `length()` on it picks `ALEN`.
        let init_type = self.checker.infer_expr(&d.expr)?;
        let effective_type = if init_type.type_name == "void" && !init_type.is_array { d.var_def.data_type.clone() } else { init_type };
        self.gen_expr(&d.expr)?;
        self.slots.allocate(&d.var_def.var_name.lexeme);
        self.checker.declare_local(&d.var_def.var_name.lexeme, effective_type);
        let slot = self.slot_of(&d.var_def.var_name.lexeme)?;
        self.emit(VMInstr::new(OpCode::Store, Operand::Int(slot as i64)));
        Ok(())
    }

    fn gen_return(&mut self, r: &ReturnStmt) -> GenResult<()> {
        self.gen_expr(&r.expr)?;
        self.emit(VMInstr::bare(OpCode::Ret));
        Ok(())
    }

    /// `N=1` assigns straight to a slot (optionally through `SETI`);
    /// `N>1` walks interior steps via `GETF`/`GETI` to the receiver just
    /// before the leaf, then sets the leaf with `SETF`/`SETI`.
    fn gen_assign(&mut self, lvalue: &[VarRef], rhs: &Expr) -> GenResult<()> {
        let n = lvalue.len();
        let first = &lvalue[0];
        if n == 1 {
            match &first.array_expr {
                None => {
                    self.gen_expr(rhs)?;
                    let slot = self.slot_of(&first.var_name.lexeme)?;
                    self.emit(VMInstr::new(OpCode::Store, Operand::Int(slot as i64)));
                }
                Some(idx) => {
                    let slot = self.slot_of(&first.var_name.lexeme)?;
                    self.emit(VMInstr::new(OpCode::Load, Operand::Int(slot as i64)));
                    self.gen_expr(idx)?;
                    self.gen_expr(rhs)?;
                    self.emit(VMInstr::bare(OpCode::Seti));
                }
            }
            return Ok(());
        }

        let slot = self.slot_of(&first.var_name.lexeme)?;
        self.emit(VMInstr::new(OpCode::Load, Operand::Int(slot as i64)));
        if let Some(idx) = &first.array_expr {
            self.gen_expr(idx)?;
            self.emit(VMInstr::bare(OpCode::Geti));
        }
        for step in &lvalue[1..n - 1] {
            self.emit(VMInstr::new(OpCode::Getf, Operand::Name(step.var_name.lexeme.clone())));
            if let Some(idx) = &step.array_expr {
                self.gen_expr(idx)?;
                self.emit(VMInstr::bare(OpCode::Geti));
            }
        }

        let leaf = &lvalue[n - 1];
        match &leaf.array_expr {
            None => {
                self.gen_expr(rhs)?;
                self.emit(VMInstr::new(OpCode::Setf, Operand::Name(leaf.var_name.lexeme.clone())));
            }
            Some(idx) => {
                self.emit(VMInstr::new(OpCode::Getf, Operand::Name(leaf.var_name.lexeme.clone())));
                self.gen_expr(idx)?;
                self.gen_expr(rhs)?;
                self.emit(VMInstr::bare(OpCode::Seti));
            }
        }
        Ok(())
    }

    fn gen_if(&mut self, i: &IfStmt) -> GenResult<()> {
        let mut end_jumps = Vec::new();

        self.gen_expr(&i.if_part.condition)?;
        let mut jmpf_idx = self.emit(VMInstr::new(OpCode::Jmpf, Operand::Int(0)));
        self.slots.push_scope();
        self.checker.push_scope();
        for stmt in &i.if_part.stmts {
            self.gen_stmt(stmt)?;
        }
        self.checker.pop_scope();
        self.slots.pop_scope();
        end_jumps.push(self.emit(VMInstr::new(OpCode::Jmp, Operand::Int(0))));
        self.patch(jmpf_idx, self.next_index());

        for elseif in &i.else_ifs {
            self.gen_expr(&elseif.condition)?;
            jmpf_idx = self.emit(VMInstr::new(OpCode::Jmpf, Operand::Int(0)));
            self.slots.push_scope();
            self.checker.push_scope();
            for stmt in &elseif.stmts {
                self.gen_stmt(stmt)?;
            }
            self.checker.pop_scope();
            self.slots.pop_scope();
            end_jumps.push(self.emit(VMInstr::new(OpCode::Jmp, Operand::Int(0))));
            self.patch(jmpf_idx, self.next_index());
        }

        self.slots.push_scope();
        self.checker.push_scope();
        for stmt in &i.else_stmts {
            self.gen_stmt(stmt)?;
        }
        self.checker.pop_scope();
        self.slots.pop_scope();
        let after = self.next_index();
        for idx in end_jumps {
            self.patch(idx, after);
        }
        Ok(())
    }

    fn gen_while(&mut self, w: &WhileStmt) -> GenResult<()> {
        let top = self.next_index();
        self.gen_expr(&w.condition)?;
        let jmpf_idx = self.emit(VMInstr::new(OpCode::Jmpf, Operand::Int(0)));
        self.slots.push_scope();
        self.checker.push_scope();
        for stmt in &w.stmts {
            self.gen_stmt(stmt)?;
        }
        self.checker.pop_scope();
        self.slots.pop_scope();
        self.emit(VMInstr::new(OpCode::Jmp, Operand::Int(top as i64)));
        self.emit(VMInstr::bare(OpCode::Nop));
        self.patch(jmpf_idx, self.next_index());
        Ok(())
    }

    fn gen_for(&mut self, f: &ForStmt) -> GenResult<()> {
        self.slots.push_scope();
        self.checker.push_scope();
        self.gen_var_decl(&f.var_decl)?;

        let top = self.next_index();
        self.gen_expr(&f.condition)?;
        let jmpf_idx = self.emit(VMInstr::new(OpCode::Jmpf, Operand::Int(0)));

        self.slots.push_scope();
        self.checker.push_scope();
        for stmt in &f.stmts {
            self.gen_stmt(stmt)?;
        }
        self.checker.pop_scope();
        self.slots.pop_scope();

        self.gen_assign(&f.assign_stmt.lvalue, &f.assign_stmt.expr)?;
        self.emit(VMInstr::new(OpCode::Jmp, Operand::Int(top as i64)));
        self.emit(VMInstr::bare(OpCode::Nop));
        self.patch(jmpf_idx, self.next_index());

        self.checker.pop_scope();
        self.slots.pop_scope();
        Ok(())
    }

    fn gen_expr(&mut self, expr: &Expr) -> GenResult<()> {
        self.gen_term(&expr.first)?;
        if expr.negated {
            self.emit(VMInstr::bare(OpCode::Not));
        }
        if let Some(op) = &expr.op {
            let rest = expr.rest.as_ref().ok_or_else(|| GenError("operator with no right-hand side".to_string()))?;
            self.gen_expr(rest)?;
            self.emit(VMInstr::bare(binop_opcode(op.kind)?));
        }
        Ok(())
    }

    fn gen_term(&mut self, term: &Term) -> GenResult<()> {
        match term {
            Term::Simple(rv) => self.gen_rvalue(rv),
            Term::Complex(e) => self.gen_expr(e),
        }
    }

    fn gen_rvalue(&mut self, rv: &RValue) -> GenResult<()> {
        match rv {
            RValue::Simple(token) => {
                let value = match token.kind {
                    TokenKind::IntVal => VMValue::Int(
                        token.lexeme.parse().map_err(|_| GenError(format!("malformed int literal '{}'", token.lexeme)))?,
                    ),
                    TokenKind::DoubleVal => VMValue::Double(
                        token.lexeme.parse().map_err(|_| GenError(format!("malformed double literal '{}'", token.lexeme)))?,
                    ),
                    TokenKind::BoolVal => VMValue::Bool(token.lexeme == "true"),
                    TokenKind::NullVal => VMValue::Null,
                    TokenKind::StringVal => VMValue::Str(unescape(&token.lexeme)),
                    // Char literals keep their raw lexeme: the VM never
                    // re-interprets `\n`/`\t` at runtime.
                    TokenKind::CharVal => VMValue::Str(token.lexeme.clone()),
                    _ => return Err(GenError(format!("unexpected literal token kind for '{}'", token.lexeme))),
                };
                self.emit(VMInstr::new(OpCode::Push, Operand::Value(value)));
                Ok(())
            }
            RValue::New(n) => self.gen_new(n),
            RValue::Var(v) => self.gen_var_read(v),
            RValue::Call(c) => self.gen_call(c).map(|_| ()),
        }
    }

    fn gen_new(&mut self, n: &NewRValue) -> GenResult<()> {
        match &n.array_expr {
            Some(size_expr) => {
                self.gen_expr(size_expr)?;
                self.emit(VMInstr::new(OpCode::Push, Operand::Value(VMValue::Null)));
                self.emit(VMInstr::bare(OpCode::Alloca));
            }
            None => {
                let fields = self
                    .structs
                    .get(&n.type_name.lexeme)
                    .ok_or_else(|| GenError(format!("unknown struct '{}'", n.type_name.lexeme)))?
                    .clone();
                self.emit(VMInstr::bare(OpCode::Allocs));
                for field in &fields {
                    self.emit(VMInstr::bare(OpCode::Dup));
                    self.emit(VMInstr::new(OpCode::Addf, Operand::Name(field.var_name.lexeme.clone())));
                    self.emit(VMInstr::bare(OpCode::Dup));
                    self.emit(VMInstr::new(OpCode::Push, Operand::Value(VMValue::Null)));
                    self.emit(VMInstr::new(OpCode::Setf, Operand::Name(field.var_name.lexeme.clone())));
                }
            }
        }
        Ok(())
    }

    fn gen_var_read(&mut self, v: &VarRValue) -> GenResult<()> {
        let first = &v.path[0];
        let slot = self.slot_of(&first.var_name.lexeme)?;
        self.emit(VMInstr::new(OpCode::Load, Operand::Int(slot as i64)));
        if let Some(idx) = &first.array_expr {
            self.gen_expr(idx)?;
            self.emit(VMInstr::bare(OpCode::Geti));
        }
        for step in &v.path[1..] {
            self.emit(VMInstr::new(OpCode::Getf, Operand::Name(step.var_name.lexeme.clone())));
            if let Some(idx) = &step.array_expr {
                self.gen_expr(idx)?;
                self.emit(VMInstr::bare(OpCode::Geti));
            }
        }
        Ok(())
    }

    /// Returns whether a value was left on the operand stack, so
    /// statement-level calls know whether to balance it with a `POP`.
    fn gen_call(&mut self, call: &CallExpr) -> GenResult<bool> {
        match call.fun_name.lexeme.as_str() {
            "print" => {
                self.gen_expr(&call.args[0])?;
                self.emit(VMInstr::bare(OpCode::Write));
                Ok(false)
            }
            "concat" => {
                self.gen_expr(&call.args[0])?;
                self.gen_expr(&call.args[1])?;
                self.emit(VMInstr::bare(OpCode::Concat));
                Ok(true)
            }
            "to_string" => {
                self.gen_expr(&call.args[0])?;
                self.emit(VMInstr::bare(OpCode::ToStr));
                Ok(true)
            }
            "to_int" => {
                self.gen_expr(&call.args[0])?;
                self.emit(VMInstr::bare(OpCode::ToInt));
                Ok(true)
            }
            "to_double" => {
                self.gen_expr(&call.args[0])?;
                self.emit(VMInstr::bare(OpCode::ToDbl));
                Ok(true)
            }
            "input" => {
                self.emit(VMInstr::bare(OpCode::Read));
                Ok(true)
            }
            "get" => {
                self.gen_expr(&call.args[0])?;
                self.gen_expr(&call.args[1])?;
                self.emit(VMInstr::bare(OpCode::Getc));
                Ok(true)
            }
            "length" => {
                let arg_type = self.checker.infer_expr(&call.args[0])?;
                self.gen_expr(&call.args[0])?;
                self.emit(VMInstr::bare(if arg_type.is_array { OpCode::Alen } else { OpCode::Slen }));
                Ok(true)
            }
            name => {
                for arg in &call.args {
                    self.gen_expr(arg)?;
                }
                self.emit(VMInstr::new(OpCode::Call, Operand::Name(name.to_string())));
                Ok(true)
            }
        }
    }
}

fn binop_opcode(kind: TokenKind) -> GenResult<OpCode> {
    Ok(match kind {
        TokenKind::Plus => OpCode::Add,
        TokenKind::Minus => OpCode::Sub,
        TokenKind::Star => OpCode::Mul,
        TokenKind::Slash => OpCode::Div,
        TokenKind::Equal => OpCode::CmpEq,
        TokenKind::NotEqual => OpCode::CmpNe,
        TokenKind::Less => OpCode::CmpLt,
        TokenKind::LessEq => OpCode::CmpLe,
        TokenKind::Greater => OpCode::CmpGt,
        TokenKind::GreaterEq => OpCode::CmpGe,
        TokenKind::And => OpCode::And,
        TokenKind::Or => OpCode::Or,
        other => return Err(GenError(format!("{other:?} is not a binary operator"))),
    })
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('n') => {
                    out.push('\n');
                    chars.next();
                }
                Some('t') => {
                    out.push('\t');
                    chars.next();
                }
                _ => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
