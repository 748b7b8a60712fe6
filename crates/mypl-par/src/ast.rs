use mypl_lex::Token;

/// `{ is_array, type_name }` — valid `type_name`s are the five base
/// scalars, `"void"`, or a declared struct name.
#[derive(Debug, Clone, PartialEq)]
pub struct DataType {
    pub is_array: bool,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub data_type: DataType,
    pub var_name: Token,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub struct_defs: Vec<StructDef>,
    pub fun_defs: Vec<FunDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: Token,
    pub fields: Vec<VarDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunDef {
    pub return_type: DataType,
    pub name: Token,
    pub params: Vec<VarDef>,
    pub body: Vec<Stmt>,
}

/// Recast from the source's visitor-over-class-hierarchy design into a
/// tagged variant matched by the checker, code generator, and printers.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl(VarDeclStmt),
    Assign(AssignStmt),
    Return(ReturnStmt),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Call(CallExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclStmt {
    pub var_def: VarDef,
    pub expr: Expr,
}

/// One step of an lvalue or variable-rvalue path: a name, optionally
/// indexed when that step is array-typed.
#[derive(Debug, Clone, PartialEq)]
pub struct VarRef {
    pub var_name: Token,
    pub array_expr: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub lvalue: Vec<VarRef>,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicIf {
    pub condition: Expr,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub if_part: BasicIf,
    pub else_ifs: Vec<BasicIf>,
    pub else_stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub var_decl: VarDeclStmt,
    pub condition: Expr,
    pub assign_stmt: AssignStmt,
    pub stmts: Vec<Stmt>,
}

/// Binary operators are parsed right-recursively and flat (no
/// precedence climbing) — `first`/`rest` own their subtrees uniformly,
/// so downstream stages must not assume standard precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub negated: bool,
    pub first: Box<Term>,
    pub op: Option<Token>,
    pub rest: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Simple(RValue),
    Complex(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RValue {
    Simple(Token),
    New(NewRValue),
    Var(VarRValue),
    Call(CallExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRValue {
    pub type_name: Token,
    pub array_expr: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarRValue {
    pub path: Vec<VarRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub fun_name: Token,
    pub args: Vec<Expr>,
}
