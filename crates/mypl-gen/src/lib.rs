//! AST to bytecode lowering: one `VMFrameInfo` per function, with
//! jump-patching for structured control flow.

mod error;
mod generator;
mod slots;

pub use error::{GenError, GenResult};
pub use generator::generate;

#[cfg(test)]
mod tests {
    use super::*;
    use mypl_lex::Lexer;
    use mypl_par::Parser;
    use mypl_vm::VM;
    use std::io::Cursor;

    fn run_source(src: &str, input: &str) -> String {
        let program = Parser::parse(Lexer::tokenize(src).unwrap()).unwrap();
        mypl_sem::Checker::check(&program).unwrap();
        let frames = generate(&program).unwrap();
        let mut out = Vec::new();
        {
            let mut vm = VM::new(frames, Cursor::new(input.as_bytes()), &mut out);
            vm.run().unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn scenario_hello() {
        assert_eq!(run_source(r#"void main(){ print("hi") }"#, ""), "hi");
    }

    #[test]
    fn scenario_function_call() {
        assert_eq!(run_source("int add(int a,int b){ return a+b } void main(){ print(add(2,3)) }", ""), "5");
    }

    #[test]
    fn scenario_while_loop() {
        assert_eq!(run_source("void main(){ int i=0 while(i<3){ print(i) i=i+1 } }", ""), "012");
    }

    #[test]
    fn scenario_struct_field() {
        assert_eq!(run_source("struct P{ int x } void main(){ P p=new P p.x=7 print(p.x) }", ""), "7");
    }

    #[test]
    fn scenario_array_length() {
        assert_eq!(run_source("void main(){ int xs=new int[3] xs[0]=1 xs[1]=2 xs[2]=3 print(length(xs)) }", ""), "3");
    }

    #[test]
    fn scenario_get_char() {
        assert_eq!(run_source(r#"void main(){ print(get(1,"abc")) }"#, ""), "b");
    }

    #[test]
    fn out_of_bounds_array_access_is_a_runtime_error() {
        let program = Parser::parse(Lexer::tokenize("void main(){ int xs=new int[2] print(xs[5]) }").unwrap()).unwrap();
        mypl_sem::Checker::check(&program).unwrap();
        let frames = generate(&program).unwrap();
        let mut out = Vec::new();
        let mut vm = VM::new(frames, Cursor::new(&b""[..]), &mut out);
        let err = vm.run().unwrap_err();
        assert!(err.message.contains("out-of-bounds"));
    }

    #[test]
    fn null_deref_is_a_runtime_error() {
        let program =
            Parser::parse(Lexer::tokenize("struct P{ int x } void main(){ P p=null print(p.x) }").unwrap()).unwrap();
        mypl_sem::Checker::check(&program).unwrap();
        let frames = generate(&program).unwrap();
        let mut out = Vec::new();
        let mut vm = VM::new(frames, Cursor::new(&b""[..]), &mut out);
        let err = vm.run().unwrap_err();
        assert!(err.message.contains("null reference"));
    }

    #[test]
    fn if_elseif_else_picks_the_right_arm() {
        let src = "void main(){ int x=2 if(x==1){ print(1) } elseif(x==2){ print(2) } else { print(3) } }";
        assert_eq!(run_source(src, ""), "2");
    }

    #[test]
    fn for_loop_counts_up() {
        assert_eq!(run_source("void main(){ for(int i=0; i<4; i=i+1){ print(i) } }", ""), "0123");
    }

    #[test]
    fn if_body_shadowing_does_not_leak_into_the_outer_scope() {
        let src = "void main(){ int x=1 if(true){ int x=2 } print(x) }";
        assert_eq!(run_source(src, ""), "1");
    }

    #[test]
    fn while_body_shadowing_does_not_leak_into_the_outer_scope() {
        let src = "void main(){ int x=1 int i=0 while(i<1){ int x=2 i=i+1 } print(x) }";
        assert_eq!(run_source(src, ""), "1");
    }

    #[test]
    fn implicit_trailing_return_is_appended() {
        let program = Parser::parse(Lexer::tokenize("void main(){ print(\"x\") }").unwrap()).unwrap();
        mypl_sem::Checker::check(&program).unwrap();
        let frames = generate(&program).unwrap();
        let main = frames.iter().find(|f| f.function_name == "main").unwrap();
        let last = main.instructions.last().unwrap();
        assert_eq!(last.op, mypl_vm::OpCode::Ret);
    }
}
