use mypl_lex::{Token, TokenKind};

use crate::ast::*;
use crate::error::{ParseError, ParseResult};

fn describe(kind: TokenKind) -> &'static str {
    use TokenKind::*;
    match kind {
        LParen => "'('",
        RParen => "')'",
        LBrace => "'{'",
        RBrace => "'}'",
        LBracket => "'['",
        RBracket => "']'",
        Semicolon => "';'",
        Comma => "','",
        Assign => "'='",
        Id => "an identifier",
        Struct => "'struct'",
        _ => "a token",
    }
}

fn lexeme_display(tok: &Token) -> String {
    if tok.kind == TokenKind::Eos {
        "EOS".to_string()
    } else {
        tok.lexeme.clone()
    }
}

const BIN_OPS: &[TokenKind] = &[
    TokenKind::Plus,
    TokenKind::Minus,
    TokenKind::Star,
    TokenKind::Slash,
    TokenKind::Equal,
    TokenKind::NotEqual,
    TokenKind::Less,
    TokenKind::LessEq,
    TokenKind::Greater,
    TokenKind::GreaterEq,
    TokenKind::And,
    TokenKind::Or,
];

const TYPE_START: &[TokenKind] = &[
    TokenKind::IntType,
    TokenKind::DoubleType,
    TokenKind::BoolType,
    TokenKind::CharType,
    TokenKind::StringType,
    TokenKind::Array,
];

/// Recursive-descent parser with one-token lookahead; entry point is
/// [`Parser::parse`].
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    pub fn parse(tokens: Vec<Token>) -> ParseResult<Program> {
        let mut parser = Parser::new(tokens);
        parser.parse_program()
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn check_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.peek().kind)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, expected: &str) -> ParseError {
        let tok = self.peek();
        ParseError {
            message: format!("expecting {} found '{}' at {}", expected, lexeme_display(tok), tok.pos),
            pos: tok.pos,
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(describe(kind)))
        }
    }

    fn parse_program(&mut self) -> ParseResult<Program> {
        let mut program = Program::default();
        while !self.check(TokenKind::Eos) {
            if self.check(TokenKind::Struct) {
                program.struct_defs.push(self.parse_struct_def()?);
            } else {
                program.fun_defs.push(self.parse_fun_def()?);
            }
        }
        Ok(program)
    }

    fn parse_struct_def(&mut self) -> ParseResult<StructDef> {
        self.expect(TokenKind::Struct)?;
        let name = self.expect(TokenKind::Id)?;
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        if !self.check(TokenKind::RBrace) {
            fields.push(self.parse_vardef()?);
            while self.check(TokenKind::Comma) {
                self.advance();
                fields.push(self.parse_vardef()?);
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(StructDef { name, fields })
    }

    fn parse_vardef(&mut self) -> ParseResult<VarDef> {
        let data_type = self.parse_type()?;
        let var_name = self.expect(TokenKind::Id)?;
        Ok(VarDef { data_type, var_name })
    }

    fn parse_type(&mut self) -> ParseResult<DataType> {
        if self.check(TokenKind::Array) {
            self.advance();
            let type_name = self.parse_base_or_struct_name()?;
            Ok(DataType { is_array: true, type_name })
        } else {
            let type_name = self.parse_base_or_struct_name()?;
            Ok(DataType { is_array: false, type_name })
        }
    }

    fn parse_base_or_struct_name(&mut self) -> ParseResult<String> {
        use TokenKind::*;
        match self.peek().kind {
            IntType | DoubleType | BoolType | CharType | StringType | Id => Ok(self.advance().lexeme),
            _ => Err(self.error("a type")),
        }
    }

    fn parse_fun_def(&mut self) -> ParseResult<FunDef> {
        let return_type = if self.check(TokenKind::Void) {
            self.advance();
            DataType { is_array: false, type_name: "void".to_string() }
        } else {
            self.parse_type()?
        };
        let name = self.expect(TokenKind::Id)?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            params.push(self.parse_vardef()?);
            while self.check(TokenKind::Comma) {
                self.advance();
                params.push(self.parse_vardef()?);
            }
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::LBrace)?;
        let body = self.parse_stmts_until_rbrace()?;
        self.expect(TokenKind::RBrace)?;
        Ok(FunDef { return_type, name, params, body })
    }

    fn parse_stmts_until_rbrace(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        use TokenKind::*;
        match self.peek().kind {
            Return => self.parse_return(),
            If => self.parse_if(),
            For => self.parse_for(),
            While => self.parse_while(),
            k if TYPE_START.contains(&k) => {
                let data_type = self.parse_type()?;
                let var_name = self.expect(Id)?;
                self.expect(Assign)?;
                let expr = self.parse_expr()?;
                Ok(Stmt::VarDecl(VarDeclStmt { var_def: VarDef { data_type, var_name }, expr }))
            }
            Id => {
                let id = self.advance();
                if self.check(LParen) {
                    self.advance();
                    let args = self.parse_call_args()?;
                    self.expect(RParen)?;
                    Ok(Stmt::Call(CallExpr { fun_name: id, args }))
                } else if self.check(Id) {
                    let var_name = self.advance();
                    self.expect(Assign)?;
                    let expr = self.parse_expr()?;
                    Ok(Stmt::VarDecl(VarDeclStmt {
                        var_def: VarDef { data_type: DataType { is_array: false, type_name: id.lexeme }, var_name },
                        expr,
                    }))
                } else {
                    let lvalue = self.parse_var_path(id)?;
                    self.expect(Assign)?;
                    let expr = self.parse_expr()?;
                    Ok(Stmt::Assign(AssignStmt { lvalue, expr }))
                }
            }
            _ => Err(self.error("a statement")),
        }
    }

    fn parse_return(&mut self) -> ParseResult<Stmt> {
        let ret_tok = self.expect(TokenKind::Return)?;
        let expr = if self.check(TokenKind::RBrace) {
            Expr {
                negated: false,
                first: Box::new(Term::Simple(RValue::Simple(Token::new(
                    TokenKind::NullVal,
                    "null",
                    ret_tok.pos.line,
                    ret_tok.pos.column,
                )))),
                op: None,
                rest: None,
            }
        } else {
            self.parse_expr()?
        };
        Ok(Stmt::Return(ReturnStmt { expr }))
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::If)?;
        let if_part = self.parse_basic_if()?;
        let mut else_ifs = Vec::new();
        while self.check(TokenKind::Elseif) {
            self.advance();
            else_ifs.push(self.parse_basic_if()?);
        }
        let mut else_stmts = Vec::new();
        if self.check(TokenKind::Else) {
            self.advance();
            self.expect(TokenKind::LBrace)?;
            else_stmts = self.parse_stmts_until_rbrace()?;
            self.expect(TokenKind::RBrace)?;
        }
        Ok(Stmt::If(IfStmt { if_part, else_ifs, else_stmts }))
    }

    fn parse_basic_if(&mut self) -> ParseResult<BasicIf> {
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::LBrace)?;
        let stmts = self.parse_stmts_until_rbrace()?;
        self.expect(TokenKind::RBrace)?;
        Ok(BasicIf { condition, stmts })
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::While)?;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::LBrace)?;
        let stmts = self.parse_stmts_until_rbrace()?;
        self.expect(TokenKind::RBrace)?;
        Ok(Stmt::While(WhileStmt { condition, stmts }))
    }

    fn parse_for(&mut self) -> ParseResult<Stmt> {
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;
        let data_type = self.parse_type()?;
        let var_name = self.expect(TokenKind::Id)?;
        self.expect(TokenKind::Assign)?;
        let init_expr = self.parse_expr()?;
        let var_decl = VarDeclStmt { var_def: VarDef { data_type, var_name }, expr: init_expr };
        self.expect(TokenKind::Semicolon)?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::Semicolon)?;
        let id = self.expect(TokenKind::Id)?;
        let lvalue = self.parse_var_path(id)?;
        self.expect(TokenKind::Assign)?;
        let step_expr = self.parse_expr()?;
        let assign_stmt = AssignStmt { lvalue, expr: step_expr };
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::LBrace)?;
        let stmts = self.parse_stmts_until_rbrace()?;
        self.expect(TokenKind::RBrace)?;
        Ok(Stmt::For(ForStmt { var_decl, condition, assign_stmt, stmts }))
    }

    fn parse_var_path(&mut self, first: Token) -> ParseResult<Vec<VarRef>> {
        let mut path = Vec::new();
        let array_expr = self.parse_optional_index()?;
        path.push(VarRef { var_name: first, array_expr });
        while self.check(TokenKind::Dot) {
            self.advance();
            let var_name = self.expect(TokenKind::Id)?;
            let array_expr = self.parse_optional_index()?;
            path.push(VarRef { var_name, array_expr });
        }
        Ok(path)
    }

    fn parse_optional_index(&mut self) -> ParseResult<Option<Expr>> {
        if self.check(TokenKind::LBracket) {
            self.advance();
            let expr = self.parse_expr()?;
            self.expect(TokenKind::RBracket)?;
            Ok(Some(expr))
        } else {
            Ok(None)
        }
    }

    fn parse_call_args(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            args.push(self.parse_expr()?);
            while self.check(TokenKind::Comma) {
                self.advance();
                args.push(self.parse_expr()?);
            }
        }
        Ok(args)
    }

    fn parse_expr(&mut self) -> ParseResult<Expr> {
        let negated = if self.check(TokenKind::Not) {
            self.advance();
            true
        } else {
            false
        };
        let first = Box::new(self.parse_term()?);
        let op = if self.check_any(BIN_OPS) { Some(self.advance()) } else { None };
        let rest = if op.is_some() { Some(Box::new(self.parse_expr()?)) } else { None };
        Ok(Expr { negated, first, op, rest })
    }

    fn parse_term(&mut self) -> ParseResult<Term> {
        if self.check(TokenKind::LParen) {
            self.advance();
            let expr = self.parse_expr()?;
            self.expect(TokenKind::RParen)?;
            Ok(Term::Complex(expr))
        } else {
            Ok(Term::Simple(self.parse_rvalue()?))
        }
    }

    fn parse_rvalue(&mut self) -> ParseResult<RValue> {
        use TokenKind::*;
        match self.peek().kind {
            IntVal | DoubleVal | CharVal | StringVal | BoolVal | NullVal => Ok(RValue::Simple(self.advance())),
            New => {
                self.advance();
                self.parse_new_tail()
            }
            Id => {
                let id = self.advance();
                if self.check(LParen) {
                    self.advance();
                    let args = self.parse_call_args()?;
                    self.expect(RParen)?;
                    Ok(RValue::Call(CallExpr { fun_name: id, args }))
                } else {
                    let path = self.parse_var_path(id)?;
                    Ok(RValue::Var(VarRValue { path }))
                }
            }
            _ => Err(self.error("a value")),
        }
    }

    fn parse_new_tail(&mut self) -> ParseResult<RValue> {
        use TokenKind::*;
        match self.peek().kind {
            IntType | DoubleType | BoolType | CharType | StringType => {
                let type_name = self.advance();
                self.expect(LBracket)?;
                let array_expr = self.parse_expr()?;
                self.expect(RBracket)?;
                Ok(RValue::New(NewRValue { type_name, array_expr: Some(array_expr) }))
            }
            Id => {
                let type_name = self.advance();
                let array_expr = self.parse_optional_index()?;
                Ok(RValue::New(NewRValue { type_name, array_expr }))
            }
            _ => Err(self.error("a type after 'new'")),
        }
    }
}
