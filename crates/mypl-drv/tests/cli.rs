use assert_cmd::Command;
use predicates::str::contains;
use std::io::Write;
use tempfile::NamedTempFile;

fn mypl() -> Command {
    Command::cargo_bin("mypl").unwrap()
}

fn script(src: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    write!(f, "{src}").unwrap();
    f
}

#[test]
fn scenario_hello() {
    let f = script(r#"void main(){ print("hi") }"#);
    mypl().arg(f.path()).assert().success().stdout("hi");
}

#[test]
fn scenario_function_call() {
    let f = script("int add(int a,int b){ return a+b } void main(){ print(add(2,3)) }");
    mypl().arg(f.path()).assert().success().stdout("5");
}

#[test]
fn scenario_while_loop() {
    let f = script("void main(){ int i=0 while(i<3){ print(i) i=i+1 } }");
    mypl().arg(f.path()).assert().success().stdout("012");
}

#[test]
fn if_body_local_does_not_shadow_the_outer_variable_permanently() {
    let f = script("void main(){ int x=1 if(false){ int x=2 } print(x) }");
    mypl().arg(f.path()).assert().success().stdout("1");
}

#[test]
fn scenario_struct_field() {
    let f = script("struct P{ int x } void main(){ P p=new P p.x=7 print(p.x) }");
    mypl().arg(f.path()).assert().success().stdout("7");
}

#[test]
fn scenario_array_length() {
    let f = script("void main(){ int xs=new int[3] xs[0]=1 xs[1]=2 xs[2]=3 print(length(xs)) }");
    mypl().arg(f.path()).assert().success().stdout("3");
}

#[test]
fn scenario_get_char() {
    let f = script(r#"void main(){ print(get(1,"abc")) }"#);
    mypl().arg(f.path()).assert().success().stdout("b");
}

#[test]
fn out_of_bounds_is_a_vm_error() {
    let f = script("void main(){ int xs=new int[2] print(xs[5]) }");
    mypl().arg(f.path()).assert().failure().stderr(contains("out-of-bounds"));
}

#[test]
fn null_deref_is_a_vm_error() {
    let f = script("struct P{ int x } void main(){ P p=null print(p.x) }");
    mypl().arg(f.path()).assert().failure().stderr(contains("null reference"));
}

#[test]
fn type_error_is_a_static_error() {
    let f = script(r#"void main(){ int x = "hi" }"#);
    mypl().arg(f.path()).assert().failure();
}

#[test]
fn unreadable_file_exits_1() {
    mypl().arg("/no/such/file.mypl").assert().failure().code(1);
}

#[test]
fn check_mode_runs_the_checker_and_stops() {
    let f = script("void main(){ print(\"hi\") }");
    mypl().arg("--check").arg(f.path()).assert().success().stdout("");
}

#[test]
fn print_mode_pretty_prints() {
    let f = script(r#"void main(){ print("hi") }"#);
    mypl().arg("--print").arg(f.path()).assert().success().stdout(contains("print(\"hi\")"));
}

#[test]
fn ir_mode_dumps_frames() {
    let f = script(r#"void main(){ print("hi") }"#);
    mypl().arg("--ir").arg(f.path()).assert().success().stdout(contains("Frame 'main'"));
}

#[test]
fn java_mode_transpiles() {
    let f = script(r#"void main(){ print("hi") }"#);
    mypl().arg("--java").arg(f.path()).assert().success().stdout(contains("class Program"));
}

#[test]
fn lex_mode_prints_tokens() {
    let f = script("void");
    mypl().arg("--lex").arg(f.path()).assert().success().stdout(contains("Void"));
}

#[test]
fn reads_from_stdin_when_no_script_given() {
    mypl().write_stdin(r#"void main(){ print("hi") }"#).assert().success().stdout("hi");
}
