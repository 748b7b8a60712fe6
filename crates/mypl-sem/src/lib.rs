//! Two-pass static checker: registers struct/function signatures, then
//! type-checks every function body against an explicit scope stack.

mod checker;
mod error;
mod types;

pub use checker::Checker;
pub use error::{StaticError, StaticResult};
pub use types::{is_base_type, null_type, TypeEnv};

#[cfg(test)]
mod tests {
    use super::*;
    use mypl_lex::Lexer;
    use mypl_par::Parser;

    fn check(src: &str) -> StaticResult<()> {
        let program = Parser::parse(Lexer::tokenize(src).unwrap()).unwrap();
        Checker::check(&program)
    }

    #[test]
    fn accepts_the_canonical_scenarios() {
        assert!(check(r#"void main(){ print("hi") }"#).is_ok());
        assert!(check("int add(int a,int b){ return a+b } void main(){ print(add(2,3)) }").is_ok());
        assert!(check("void main(){ int i=0 while(i<3){ print(i) i=i+1 } }").is_ok());
        assert!(check("struct P{ int x } void main(){ P p=new P p.x=7 print(p.x) }").is_ok());
        assert!(check("void main(){ int xs=new int[3] xs[0]=1 xs[1]=2 xs[2]=3 print(length(xs)) }").is_ok());
        assert!(check(r#"void main(){ print(get(1,"abc")) }"#).is_ok());
    }

    #[test]
    fn rejects_a_program_with_no_main() {
        let err = check("void helper(){}").unwrap_err();
        assert!(err.message.contains("main"));
    }

    #[test]
    fn rejects_duplicate_locals_in_one_block() {
        let err = check("void main(){ int x=0 int x=1 }").unwrap_err();
        assert!(err.message.contains("already declared"));
    }

    #[test]
    fn allows_shadowing_across_blocks() {
        assert!(check("void main(){ int x=0 while(true){ int x=1 print(x) } }").is_ok());
    }

    #[test]
    fn rejects_a_type_mismatch() {
        let err = check(r#"void main(){ int x = "hi" }"#).unwrap_err();
        assert!(err.message.contains("expected type"));
    }

    #[test]
    fn rejects_mixed_int_and_double_arithmetic() {
        let err = check("void main(){ double x = 1 + 2.0 }").unwrap_err();
        assert!(err.message.contains("arithmetic"));
    }

    #[test]
    fn allows_null_for_struct_locals_but_not_scalars() {
        assert!(check("struct P{ int x } void main(){ P p = null }").is_ok());
        let err = check("void main(){ int x = null }").unwrap_err();
        assert!(err.message.contains("cannot assign null"));
    }

    #[test]
    fn rejects_an_undefined_function_call() {
        let err = check("void main(){ nope() }").unwrap_err();
        assert!(err.message.contains("undefined function"));
    }

    #[test]
    fn for_step_cannot_see_body_locals() {
        let err = check("void main(){ for(int i=0; i<3; i=y){ int y=1 } }").unwrap_err();
        assert!(err.message.contains("undefined variable"));
    }
}
