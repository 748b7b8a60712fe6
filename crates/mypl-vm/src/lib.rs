//! Tree-walked bytecode VM: two-heap (struct + array) interpreter over
//! the frames produced by `mypl-gen`.

mod error;
mod instr;
mod value;
mod vm;

pub use error::{VMError, VMResult};
pub use instr::{Operand, OpCode, VMFrameInfo, VMInstr};
pub use value::VMValue;
pub use vm::VM;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(frames: Vec<VMFrameInfo>, input: &str) -> VMResult<String> {
        let mut out = Vec::new();
        {
            let mut vm = VM::new(frames, Cursor::new(input.as_bytes()), &mut out);
            vm.run()?;
        }
        Ok(String::from_utf8(out).unwrap())
    }

    fn main_frame(instructions: Vec<VMInstr>) -> VMFrameInfo {
        VMFrameInfo { function_name: "main".to_string(), arg_count: 0, instructions }
    }

    #[test]
    fn push_add_write() {
        let frames = vec![main_frame(vec![
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Int(1))),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Int(2))),
            VMInstr::bare(OpCode::Add),
            VMInstr::bare(OpCode::Write),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Null)),
            VMInstr::bare(OpCode::Ret),
        ])];
        assert_eq!(run(frames, "").unwrap(), "3");
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let frames = vec![main_frame(vec![
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Int(1))),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Int(0))),
            VMInstr::bare(OpCode::Div),
        ])];
        let err = run(frames, "").unwrap_err();
        assert!(err.message.contains("division by zero"));
    }

    #[test]
    fn requires_a_main_function() {
        let frames = vec![VMFrameInfo { function_name: "helper".to_string(), arg_count: 0, instructions: vec![] }];
        let err = run(frames, "").unwrap_err();
        assert!(err.message.contains("main"));
    }

    #[test]
    fn call_passes_arguments_in_declared_order() {
        // add(a, b) = a - b, called as add(10, 3); verifies args land in
        // slots 0 and 1 in call order despite the pop/push double reversal.
        let add = VMFrameInfo {
            function_name: "add".to_string(),
            arg_count: 2,
            instructions: vec![
                VMInstr::new(OpCode::Store, Operand::Int(0)),
                VMInstr::new(OpCode::Store, Operand::Int(1)),
                VMInstr::new(OpCode::Load, Operand::Int(0)),
                VMInstr::new(OpCode::Load, Operand::Int(1)),
                VMInstr::bare(OpCode::Sub),
                VMInstr::bare(OpCode::Ret),
            ],
        };
        let main = main_frame(vec![
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Int(10))),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Int(3))),
            VMInstr::new(OpCode::Call, Operand::Name("add".to_string())),
            VMInstr::bare(OpCode::Write),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Null)),
            VMInstr::bare(OpCode::Ret),
        ]);
        assert_eq!(run(vec![add, main], "").unwrap(), "7");
    }

    #[test]
    fn struct_allocation_and_fields() {
        let frames = vec![main_frame(vec![
            VMInstr::bare(OpCode::Allocs),
            VMInstr::bare(OpCode::Dup),
            VMInstr::new(OpCode::Addf, Operand::Name("x".to_string())),
            VMInstr::bare(OpCode::Dup),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Int(42))),
            VMInstr::new(OpCode::Setf, Operand::Name("x".to_string())),
            VMInstr::new(OpCode::Getf, Operand::Name("x".to_string())),
            VMInstr::bare(OpCode::Write),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Null)),
            VMInstr::bare(OpCode::Ret),
        ])];
        assert_eq!(run(frames, "").unwrap(), "42");
    }

    #[test]
    fn array_allocation_and_indexing() {
        let frames = vec![main_frame(vec![
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Int(3))),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Int(0))),
            VMInstr::bare(OpCode::Alloca),
            VMInstr::bare(OpCode::Dup),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Int(1))),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Int(9))),
            VMInstr::bare(OpCode::Seti),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Int(1))),
            VMInstr::bare(OpCode::Geti),
            VMInstr::bare(OpCode::Write),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Null)),
            VMInstr::bare(OpCode::Ret),
        ])];
        assert_eq!(run(frames, "").unwrap(), "9");
    }

    #[test]
    fn out_of_bounds_array_index_is_an_error() {
        let frames = vec![main_frame(vec![
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Int(2))),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Int(0))),
            VMInstr::bare(OpCode::Alloca),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Int(5))),
            VMInstr::bare(OpCode::Geti),
        ])];
        let err = run(frames, "").unwrap_err();
        assert!(err.message.contains("out-of-bounds"));
    }

    #[test]
    fn getf_on_null_reference_is_an_error() {
        let frames = vec![main_frame(vec![
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Null)),
            VMInstr::new(OpCode::Getf, Operand::Name("x".to_string())),
        ])];
        let err = run(frames, "").unwrap_err();
        assert!(err.message.contains("null reference"));
    }

    #[test]
    fn getc_reads_the_indexed_character() {
        let frames = vec![main_frame(vec![
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Int(1))),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Str("abc".to_string()))),
            VMInstr::bare(OpCode::Getc),
            VMInstr::bare(OpCode::Write),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Null)),
            VMInstr::bare(OpCode::Ret),
        ])];
        assert_eq!(run(frames, "").unwrap(), "b");
    }

    #[test]
    fn read_consumes_one_line_of_input() {
        let frames = vec![main_frame(vec![
            VMInstr::bare(OpCode::Read),
            VMInstr::bare(OpCode::Write),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Null)),
            VMInstr::bare(OpCode::Ret),
        ])];
        assert_eq!(run(frames, "hello\nworld\n").unwrap(), "hello");
    }

    #[test]
    fn cmpeq_allows_null_comparison() {
        let frames = vec![main_frame(vec![
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Null)),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Null)),
            VMInstr::bare(OpCode::CmpEq),
            VMInstr::bare(OpCode::Write),
            VMInstr::new(OpCode::Push, Operand::Value(VMValue::Null)),
            VMInstr::bare(OpCode::Ret),
        ])];
        assert_eq!(run(frames, "").unwrap(), "true");
    }
}
