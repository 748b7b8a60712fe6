//! Token stream to `Program` AST: recursive-descent, tree-building parsing.

mod ast;
mod error;
mod parser;

pub use ast::*;
pub use error::{ParseError, ParseResult};
pub use parser::Parser;

#[cfg(test)]
mod tests {
    use super::*;
    use mypl_lex::Lexer;

    fn parse(src: &str) -> ParseResult<Program> {
        Parser::parse(Lexer::tokenize(src).unwrap())
    }

    #[test]
    fn parses_empty_struct_and_main() {
        let program = parse("struct S {} void main(){}").unwrap();
        assert_eq!(program.struct_defs.len(), 1);
        assert_eq!(program.struct_defs[0].name.lexeme, "S");
        assert!(program.struct_defs[0].fields.is_empty());
        assert_eq!(program.fun_defs.len(), 1);
        assert_eq!(program.fun_defs[0].name.lexeme, "main");
        assert!(program.fun_defs[0].body.is_empty());
    }

    #[test]
    fn parses_struct_fields_and_params() {
        let program = parse("struct P { int x, int y } int add(int a, int b){ return a+b }").unwrap();
        assert_eq!(program.struct_defs[0].fields.len(), 2);
        assert_eq!(program.fun_defs[0].params.len(), 2);
    }

    #[test]
    fn parses_call_statement_and_vardecl() {
        let program = parse("void main(){ int i=0 print(i) }").unwrap();
        assert_eq!(program.fun_defs[0].body.len(), 2);
        assert!(matches!(program.fun_defs[0].body[0], Stmt::VarDecl(_)));
        assert!(matches!(program.fun_defs[0].body[1], Stmt::Call(_)));
    }

    #[test]
    fn parses_struct_typed_vardecl_vs_assignment() {
        let program = parse("struct P { int x } void main(){ P p=new P p.x=7 }").unwrap();
        let body = &program.fun_defs[0].body;
        assert!(matches!(body[0], Stmt::VarDecl(_)));
        match &body[1] {
            Stmt::Assign(a) => assert_eq!(a.lvalue.len(), 2),
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn parses_while_and_if() {
        let program = parse("void main(){ int i=0 while(i<3){ if(i==1){ print(i) } else { print(i) } i=i+1 } }").unwrap();
        assert_eq!(program.fun_defs[0].body.len(), 2);
    }

    #[test]
    fn parses_for_loop() {
        let program = parse("void main(){ for(int i=0; i<3; i=i+1){ print(i) } }").unwrap();
        assert!(matches!(program.fun_defs[0].body[0], Stmt::For(_)));
    }

    #[test]
    fn expr_is_flat_right_recursive() {
        let program = parse("void main(){ int x = 1+2+3 }").unwrap();
        let Stmt::VarDecl(decl) = &program.fun_defs[0].body[0] else { panic!() };
        assert!(decl.expr.op.is_some());
        assert!(decl.expr.rest.is_some());
        assert!(decl.expr.rest.as_ref().unwrap().rest.is_some());
    }

    #[test]
    fn parses_array_new_and_index() {
        let program = parse("void main(){ int xs=new int[3] xs[0]=1 }").unwrap();
        assert!(matches!(program.fun_defs[0].body[0], Stmt::VarDecl(_)));
        match &program.fun_defs[0].body[1] {
            Stmt::Assign(a) => assert!(a.lvalue[0].array_expr.is_some()),
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    #[test]
    fn parse_error_reports_location() {
        let err = parse("void main(){ int x = }").unwrap_err();
        assert!(err.message.contains("found '}'"));
    }
}
