use indexmap::IndexMap;
use std::collections::HashMap;

use mypl_lex::{Token, TokenKind};
use mypl_par::{
    AssignStmt, BasicIf, CallExpr, DataType, Expr, ForStmt, FunDef, IfStmt, NewRValue, Program, RValue, ReturnStmt, Stmt, StructDef,
    Term, VarDeclStmt, VarRValue, VarRef, WhileStmt,
};
use mypl_util::Position;

use crate::error::{StaticError, StaticResult};
use crate::types::{accepts_null, bool_type, int_type, is_base_type, is_null_type, null_type, string_type, TypeEnv};

const BUILTIN_NAMES: [&str; 8] = ["print", "concat", "to_string", "to_int", "to_double", "input", "get", "length"];

struct FunSig {
    params: Vec<DataType>,
    return_type: DataType,
}

/// Two-pass checker: register every struct/function signature, then
/// walk each function body with an explicit scope stack, inferring the
/// type of every expression along the way.
pub struct Checker {
    structs: IndexMap<String, Vec<mypl_par::VarDef>>,
    funs: HashMap<String, FunSig>,
    env: TypeEnv,
    current_return: DataType,
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker {
    pub fn new() -> Self {
        Checker { structs: IndexMap::new(), funs: HashMap::new(), env: TypeEnv::new(), current_return: null_type() }
    }

    pub fn check(program: &Program) -> StaticResult<()> {
        let mut checker = Checker::new();
        checker.register_structs(program)?;
        checker.register_funs(program)?;
        checker.check_main_exists(program)?;
        for fun_def in &program.fun_defs {
            checker.check_fun_def(fun_def)?;
        }
        Ok(())
    }

    /// Registers struct/function signatures without checking bodies, so
    /// `mypl-gen` can drive the same `infer_expr` the checker uses —
    /// e.g. to tell whether a `length()` argument is a string or an
    /// array when picking between `SLEN`/`ALEN`. Only meaningful for an
    /// already-[`Checker::check`]ed program.
    pub fn prepare(program: &Program) -> StaticResult<Checker> {
        let mut checker = Checker::new();
        checker.register_structs(program)?;
        checker.register_funs(program)?;
        Ok(checker)
    }

    pub fn push_scope(&mut self) {
        self.env.push_scope();
    }

    pub fn pop_scope(&mut self) {
        self.env.pop_scope();
    }

    pub fn declare_local(&mut self, name: &str, dt: DataType) {
        self.env.declare(name, dt);
    }

    fn error(&self, token: &Token, message: impl Into<String>) -> StaticError {
        StaticError { message: message.into(), pos: token.pos }
    }

    fn is_valid_type(&self, dt: &DataType) -> bool {
        is_base_type(&dt.type_name) || dt.type_name == "void" || self.structs.contains_key(&dt.type_name)
    }

    fn register_structs(&mut self, program: &Program) -> StaticResult<()> {
        for s in &program.struct_defs {
            if self.structs.contains_key(&s.name.lexeme) {
                return Err(self.error(&s.name, format!("duplicate struct name '{}'", s.name.lexeme)));
            }
            self.structs.insert(s.name.lexeme.clone(), s.fields.clone());
        }
        for s in &program.struct_defs {
            self.check_unique_field_names(s)?;
            for field in &s.fields {
                if !self.is_valid_type(&field.data_type) {
                    return Err(self.error(&field.var_name, format!("type not defined: {}", field.data_type.type_name)));
                }
            }
        }
        Ok(())
    }

    fn check_unique_field_names(&self, s: &StructDef) -> StaticResult<()> {
        let mut seen = std::collections::HashSet::new();
        for field in &s.fields {
            if !seen.insert(field.var_name.lexeme.as_str()) {
                return Err(self.error(&field.var_name, format!("duplicate field name '{}'", field.var_name.lexeme)));
            }
        }
        Ok(())
    }

    fn register_funs(&mut self, program: &Program) -> StaticResult<()> {
        for f in &program.fun_defs {
            if BUILTIN_NAMES.contains(&f.name.lexeme.as_str()) {
                return Err(self.error(&f.name, format!("cannot redefine built-in '{}'", f.name.lexeme)));
            }
            if self.funs.contains_key(&f.name.lexeme) {
                return Err(self.error(&f.name, format!("duplicate function name '{}'", f.name.lexeme)));
            }
            let mut seen = std::collections::HashSet::new();
            for param in &f.params {
                if !seen.insert(param.var_name.lexeme.as_str()) {
                    return Err(self.error(&param.var_name, format!("duplicate parameter name '{}'", param.var_name.lexeme)));
                }
                if !self.is_valid_type(&param.data_type) {
                    return Err(self.error(&param.var_name, format!("type not defined: {}", param.data_type.type_name)));
                }
            }
            if !self.is_valid_type(&f.return_type) {
                return Err(self.error(&f.name, format!("type not defined: {}", f.return_type.type_name)));
            }
            let params = f.params.iter().map(|p| p.data_type.clone()).collect();
            self.funs.insert(f.name.lexeme.clone(), FunSig { params, return_type: f.return_type.clone() });
        }
        Ok(())
    }

    fn check_main_exists(&self, program: &Program) -> StaticResult<()> {
        let mains: Vec<&FunDef> = program.fun_defs.iter().filter(|f| f.name.lexeme == "main").collect();
        match mains.as_slice() {
            [main] if main.return_type.type_name == "void" && !main.return_type.is_array && main.params.is_empty() => Ok(()),
            [main] => Err(self.error(&main.name, "'main' must return void and take no parameters")),
            [] => Err(StaticError { message: "no 'main' function defined".to_string(), pos: Position::new(0, 0) }),
            [_, second, ..] => Err(self.error(&second.name, "duplicate function name 'main'")),
        }
    }

    fn check_fun_def(&mut self, fun_def: &FunDef) -> StaticResult<()> {
        self.current_return = fun_def.return_type.clone();
        self.env.push_scope();
        for param in &fun_def.params {
            self.env.declare(&param.var_name.lexeme, param.data_type.clone());
        }
        for stmt in &fun_def.body {
            self.check_stmt(stmt)?;
        }
        self.env.pop_scope();
        Ok(())
    }

    fn check_block(&mut self, stmts: &[Stmt]) -> StaticResult<()> {
        self.env.push_scope();
        for stmt in stmts {
            self.check_stmt(stmt)?;
        }
        self.env.pop_scope();
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> StaticResult<()> {
        match stmt {
            Stmt::VarDecl(d) => self.check_var_decl(d),
            Stmt::Assign(a) => self.check_assign(a),
            Stmt::Return(r) => self.check_return(r),
            Stmt::If(i) => self.check_if(i),
            Stmt::While(w) => self.check_while(w),
            Stmt::For(f) => self.check_for(f),
            Stmt::Call(c) => self.infer_call(c).map(|_| ()),
        }
    }

    fn check_assignable(&self, token: &Token, declared: &DataType, actual: &DataType) -> StaticResult<()> {
        if is_null_type(actual) {
            if accepts_null(declared) {
                return Ok(());
            }
            return Err(self.error(token, format!("cannot assign null to '{}'", declared.type_name)));
        }
        // `is_array` is not compared here: a plain-typed local initialized
        // from `new T[n]` takes on the array-ness of its initializer (see
        // scenario 5), and the VM represents both equally as a heap id.
        if declared.type_name == actual.type_name {
            return Ok(());
        }
        Err(self.error(token, format!("expected type '{}', found '{}'", describe_type(declared), describe_type(actual))))
    }

    fn check_var_decl(&mut self, d: &VarDeclStmt) -> StaticResult<()> {
        if !self.is_valid_type(&d.var_def.data_type) {
            return Err(self.error(&d.var_def.var_name, format!("type not defined: {}", d.var_def.data_type.type_name)));
        }
        let init_type = self.infer_expr(&d.expr)?;
        self.check_assignable(&d.var_def.var_name, &d.var_def.data_type, &init_type)?;
        if self.env.declared_in_current_scope(&d.var_def.var_name.lexeme) {
            return Err(self.error(&d.var_def.var_name, format!("'{}' already declared in this scope", d.var_def.var_name.lexeme)));
        }
        let effective_type = if is_null_type(&init_type) { d.var_def.data_type.clone() } else { init_type };
        self.env.declare(&d.var_def.var_name.lexeme, effective_type);
        Ok(())
    }

    fn check_assign(&mut self, a: &AssignStmt) -> StaticResult<()> {
        let leaf = self.resolve_path(&a.lvalue)?;
        let rhs_type = self.infer_expr(&a.expr)?;
        let last = a.lvalue.last().expect("a lvalue path always has at least one step");
        self.check_assignable(&last.var_name, &leaf, &rhs_type)
    }

    fn check_return(&mut self, r: &ReturnStmt) -> StaticResult<()> {
        let et = self.infer_expr(&r.expr)?;
        let current_return = self.current_return.clone();
        self.check_assignable(expr_token(&r.expr), &current_return, &et)
    }

    fn check_condition(&mut self, cond: &Expr) -> StaticResult<()> {
        let ct = self.infer_expr(cond)?;
        if ct != bool_type() {
            return Err(self.error(expr_token(cond), "condition must be a bool expression"));
        }
        Ok(())
    }

    fn check_basic_if(&mut self, basic: &BasicIf) -> StaticResult<()> {
        self.check_condition(&basic.condition)?;
        self.check_block(&basic.stmts)
    }

    fn check_if(&mut self, i: &IfStmt) -> StaticResult<()> {
        self.check_basic_if(&i.if_part)?;
        for elseif in &i.else_ifs {
            self.check_basic_if(elseif)?;
        }
        self.check_block(&i.else_stmts)
    }

    fn check_while(&mut self, w: &WhileStmt) -> StaticResult<()> {
        self.check_condition(&w.condition)?;
        self.check_block(&w.stmts)
    }

    fn check_for(&mut self, f: &ForStmt) -> StaticResult<()> {
        self.env.push_scope();
        self.check_var_decl(&f.var_decl)?;
        self.check_condition(&f.condition)?;
        self.env.push_scope();
        for stmt in &f.stmts {
            self.check_stmt(stmt)?;
        }
        self.env.pop_scope();
        self.check_assign(&f.assign_stmt)?;
        self.env.pop_scope();
        Ok(())
    }

    fn resolve_path(&mut self, path: &[VarRef]) -> StaticResult<DataType> {
        let first = &path[0];
        let mut cur = self
            .env
            .lookup(&first.var_name.lexeme)
            .cloned()
            .ok_or_else(|| self.error(&first.var_name, format!("undefined variable '{}'", first.var_name.lexeme)))?;
        cur = self.apply_index(&first.var_name, cur, &first.array_expr)?;

        for step in &path[1..] {
            if cur.is_array || is_base_type(&cur.type_name) {
                return Err(self.error(&step.var_name, format!("'{}' is not a struct", step.var_name.lexeme)));
            }
            let fields = self
                .structs
                .get(&cur.type_name)
                .ok_or_else(|| self.error(&step.var_name, format!("type not defined: {}", cur.type_name)))?;
            let field = fields
                .iter()
                .find(|f| f.var_name.lexeme == step.var_name.lexeme)
                .ok_or_else(|| self.error(&step.var_name, format!("unknown field '{}'", step.var_name.lexeme)))?;
            cur = field.data_type.clone();
            cur = self.apply_index(&step.var_name, cur, &step.array_expr)?;
        }
        Ok(cur)
    }

    fn apply_index(&mut self, token: &Token, cur: DataType, array_expr: &Option<Expr>) -> StaticResult<DataType> {
        match array_expr {
            None => Ok(cur),
            Some(idx) => {
                if !cur.is_array {
                    return Err(self.error(token, format!("'{}' is not an array", token.lexeme)));
                }
                let it = self.infer_expr(idx)?;
                if it != int_type() {
                    return Err(self.error(expr_token(idx), "array index must be an int"));
                }
                Ok(DataType { is_array: false, type_name: cur.type_name })
            }
        }
    }

    /// Public so `mypl-gen` can reuse the same inference rules when it
    /// needs to know whether a `length()` argument is a string or an
    /// array to pick between `SLEN`/`ALEN`.
    pub fn infer_expr(&mut self, expr: &Expr) -> StaticResult<DataType> {
        let t = self.infer_term(&expr.first)?;
        if expr.negated && t != bool_type() {
            return Err(self.error(expr_token(expr), "'not' requires a bool operand"));
        }
        match &expr.op {
            None => Ok(t),
            Some(op) => {
                let rest = expr.rest.as_ref().expect("an operator always has a right-hand expression");
                let rt = self.infer_expr(rest)?;
                self.check_binop(op, t, rt)
            }
        }
    }

    fn infer_term(&mut self, term: &Term) -> StaticResult<DataType> {
        match term {
            Term::Simple(rv) => self.infer_rvalue(rv),
            Term::Complex(e) => self.infer_expr(e),
        }
    }

    fn check_binop(&self, op: &Token, lt: DataType, rt: DataType) -> StaticResult<DataType> {
        match op.kind {
            TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash => {
                if !lt.is_array && lt == rt && (lt.type_name == "int" || lt.type_name == "double") {
                    Ok(lt)
                } else {
                    Err(self.error(op, format!("arithmetic requires two ints or two doubles, found '{}' and '{}'", describe_type(&lt), describe_type(&rt))))
                }
            }
            TokenKind::Equal | TokenKind::NotEqual => {
                if lt == rt || is_null_type(&lt) || is_null_type(&rt) {
                    Ok(bool_type())
                } else {
                    Err(self.error(op, format!("cannot compare '{}' and '{}'", describe_type(&lt), describe_type(&rt))))
                }
            }
            TokenKind::Less | TokenKind::LessEq | TokenKind::Greater | TokenKind::GreaterEq => {
                let comparable = ["int", "double", "char", "string"];
                if !lt.is_array && lt == rt && comparable.contains(&lt.type_name.as_str()) {
                    Ok(bool_type())
                } else {
                    Err(self.error(op, format!("relational operators require matching int, double, char, or string operands, found '{}' and '{}'", describe_type(&lt), describe_type(&rt))))
                }
            }
            TokenKind::And | TokenKind::Or => {
                if lt == bool_type() && rt == bool_type() {
                    Ok(bool_type())
                } else {
                    Err(self.error(op, "'and'/'or' require bool operands"))
                }
            }
            _ => unreachable!("the parser only ever stores a binary operator token here"),
        }
    }

    fn infer_rvalue(&mut self, rv: &RValue) -> StaticResult<DataType> {
        match rv {
            RValue::Simple(token) => Ok(literal_type(token)),
            RValue::New(n) => self.infer_new(n),
            RValue::Var(v) => self.infer_var(v),
            RValue::Call(c) => self.infer_call(c),
        }
    }

    fn infer_new(&mut self, n: &NewRValue) -> StaticResult<DataType> {
        let type_name = n.type_name.lexeme.clone();
        if !is_base_type(&type_name) && !self.structs.contains_key(&type_name) {
            return Err(self.error(&n.type_name, format!("type not defined: {type_name}")));
        }
        if let Some(size_expr) = &n.array_expr {
            let st = self.infer_expr(size_expr)?;
            if st != int_type() {
                return Err(self.error(expr_token(size_expr), "array size must be an int"));
            }
            Ok(DataType { is_array: true, type_name })
        } else {
            Ok(DataType { is_array: false, type_name })
        }
    }

    fn infer_var(&mut self, v: &VarRValue) -> StaticResult<DataType> {
        self.resolve_path(&v.path)
    }

    fn infer_call(&mut self, call: &CallExpr) -> StaticResult<DataType> {
        let name = call.fun_name.lexeme.as_str();
        let mut arg_types = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            arg_types.push(self.infer_expr(arg)?);
        }
        match name {
            "print" => {
                self.expect_arity(call, 1)?;
                let t = &arg_types[0];
                if t.is_array || !is_base_type(&t.type_name) {
                    return Err(self.error(&call.fun_name, "print() requires a non-array scalar argument"));
                }
                Ok(null_type())
            }
            "concat" => {
                self.expect_arity(call, 2)?;
                if arg_types[0] != string_type() || arg_types[1] != string_type() {
                    return Err(self.error(&call.fun_name, "concat() requires two strings"));
                }
                Ok(string_type())
            }
            "to_string" => {
                self.expect_arity(call, 1)?;
                let t = &arg_types[0];
                if t.is_array || t.type_name == "bool" || is_null_type(t) {
                    return Err(self.error(&call.fun_name, "to_string() does not accept a bool or null argument"));
                }
                Ok(string_type())
            }
            "to_int" => {
                self.expect_arity(call, 1)?;
                let t = &arg_types[0];
                if t.is_array || (t.type_name != "string" && t.type_name != "double") {
                    return Err(self.error(&call.fun_name, "to_int() requires a string or double argument"));
                }
                Ok(int_type())
            }
            "to_double" => {
                self.expect_arity(call, 1)?;
                let t = &arg_types[0];
                if t.is_array || (t.type_name != "string" && t.type_name != "int") {
                    return Err(self.error(&call.fun_name, "to_double() requires a string or int argument"));
                }
                Ok(DataType { is_array: false, type_name: "double".to_string() })
            }
            "input" => {
                self.expect_arity(call, 0)?;
                Ok(string_type())
            }
            "get" => {
                self.expect_arity(call, 2)?;
                if arg_types[0] != int_type() || arg_types[1] != string_type() {
                    return Err(self.error(&call.fun_name, "get() requires an int and a string"));
                }
                Ok(DataType { is_array: false, type_name: "char".to_string() })
            }
            "length" => {
                self.expect_arity(call, 1)?;
                let t = &arg_types[0];
                if !t.is_array && t.type_name != "string" {
                    return Err(self.error(&call.fun_name, "length() requires a string or array argument"));
                }
                Ok(int_type())
            }
            _ => {
                let sig = self
                    .funs
                    .get(name)
                    .ok_or_else(|| self.error(&call.fun_name, format!("undefined function '{name}'")))?;
                if sig.params.len() != arg_types.len() {
                    return Err(self.error(
                        &call.fun_name,
                        format!("'{name}' expects {} argument(s), found {}", sig.params.len(), arg_types.len()),
                    ));
                }
                for (param, (arg_type, arg_expr)) in sig.params.iter().zip(arg_types.iter().zip(&call.args)) {
                    self.check_assignable(expr_token(arg_expr), param, arg_type)?;
                }
                Ok(sig.return_type.clone())
            }
        }
    }

    fn expect_arity(&self, call: &CallExpr, n: usize) -> StaticResult<()> {
        if call.args.len() != n {
            return Err(self.error(&call.fun_name, format!("'{}' expects {n} argument(s), found {}", call.fun_name.lexeme, call.args.len())));
        }
        Ok(())
    }
}

fn describe_type(dt: &DataType) -> String {
    if dt.is_array {
        format!("array {}", dt.type_name)
    } else {
        dt.type_name.clone()
    }
}

fn literal_type(token: &Token) -> DataType {
    let name = match token.kind {
        TokenKind::IntVal => "int",
        TokenKind::DoubleVal => "double",
        TokenKind::BoolVal => "bool",
        TokenKind::CharVal => "char",
        TokenKind::StringVal => "string",
        TokenKind::NullVal => "void",
        _ => unreachable!("the parser only stores a literal-kind token here"),
    };
    DataType { is_array: false, type_name: name.to_string() }
}

/// Best-effort token to anchor a diagnostic to, since `Expr`/`Term`
/// don't carry their own position.
fn expr_token(expr: &Expr) -> &Token {
    match &expr.op {
        Some(op) => op,
        None => term_token(&expr.first),
    }
}

fn term_token(term: &Term) -> &Token {
    match term {
        Term::Simple(rv) => rvalue_token(rv),
        Term::Complex(e) => expr_token(e),
    }
}

fn rvalue_token(rv: &RValue) -> &Token {
    match rv {
        RValue::Simple(token) => token,
        RValue::New(n) => &n.type_name,
        RValue::Var(v) => &v.path[0].var_name,
        RValue::Call(c) => &c.fun_name,
    }
}
