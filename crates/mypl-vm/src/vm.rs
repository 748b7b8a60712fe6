use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{VMError, VMResult};
use crate::instr::{Operand, OpCode, VMFrameInfo, VMInstr};
use crate::value::VMValue;

struct CallFrame {
    info: Rc<VMFrameInfo>,
    pc: usize,
    operand_stack: Vec<VMValue>,
    variables: Vec<VMValue>,
}

impl CallFrame {
    fn new(info: Rc<VMFrameInfo>) -> Self {
        CallFrame { info, pc: 0, operand_stack: Vec::new(), variables: Vec::new() }
    }
}

/// Tree-walked bytecode interpreter: an operand stack and variable array
/// per call frame, plus two process-wide heaps for structs and arrays.
pub struct VM<R: BufRead, W: Write> {
    frame_infos: HashMap<String, Rc<VMFrameInfo>>,
    call_stack: Vec<CallFrame>,
    struct_heap: HashMap<u64, IndexMap<String, VMValue>>,
    array_heap: HashMap<u64, Vec<VMValue>>,
    next_obj_id: u64,
    stdin: R,
    stdout: W,
}

impl<R: BufRead, W: Write> VM<R, W> {
    pub fn new(frames: Vec<VMFrameInfo>, stdin: R, stdout: W) -> Self {
        let frame_infos = frames.into_iter().map(|f| (f.function_name.clone(), Rc::new(f))).collect();
        VM {
            frame_infos,
            call_stack: Vec::new(),
            struct_heap: HashMap::new(),
            array_heap: HashMap::new(),
            next_obj_id: 0,
            stdin,
            stdout,
        }
    }

    /// Refuses to start without a `main` frame; runs the dispatch loop
    /// until the call stack empties.
    pub fn run(&mut self) -> VMResult<()> {
        let main = self
            .frame_infos
            .get("main")
            .cloned()
            .ok_or_else(|| VMError { message: "no 'main' function defined".to_string(), function_name: String::new(), pc: 0 })?;
        self.call_stack.push(CallFrame::new(main));
        while !self.call_stack.is_empty() {
            let done = {
                let frame = self.call_stack.last().unwrap();
                frame.pc >= frame.info.instructions.len()
            };
            if done {
                self.call_stack.pop();
                continue;
            }
            self.step()?;
        }
        Ok(())
    }

    fn frame(&self) -> &CallFrame {
        self.call_stack.last().expect("dispatch loop holds an active frame")
    }

    fn frame_mut(&mut self) -> &mut CallFrame {
        self.call_stack.last_mut().expect("dispatch loop holds an active frame")
    }

    fn fresh_id(&mut self) -> u64 {
        let id = self.next_obj_id;
        self.next_obj_id += 1;
        id
    }

    fn step(&mut self) -> VMResult<()> {
        let instr: VMInstr = {
            let frame = self.frame_mut();
            let instr = frame.info.instructions[frame.pc].clone();
            frame.pc += 1;
            instr
        };
        let function_name = self.frame().info.function_name.clone();
        let pc = self.frame().pc - 1;
        tracing::trace!(function = %function_name, pc, op = %instr.op, "dispatch");

        macro_rules! err {
            ($msg:expr) => {
                VMError { message: $msg.to_string(), function_name: function_name.clone(), pc }
            };
        }

        match instr.op {
            OpCode::Push => {
                let Operand::Value(v) = instr.operand else { return Err(err!("PUSH missing a literal operand")) };
                self.frame_mut().operand_stack.push(v);
            }
            OpCode::Pop => {
                self.frame_mut().operand_stack.pop();
            }
            OpCode::Dup => {
                let v = self.frame().operand_stack.last().cloned().ok_or_else(|| err!("DUP on an empty stack"))?;
                self.frame_mut().operand_stack.push(v);
            }
            OpCode::Nop => {}
            OpCode::Load => {
                let i = operand_int(&instr.operand, || err!("LOAD missing a slot operand"))?;
                let v = self
                    .frame()
                    .variables
                    .get(i as usize)
                    .cloned()
                    .ok_or_else(|| err!("LOAD from an unassigned slot"))?;
                self.frame_mut().operand_stack.push(v);
            }
            OpCode::Store => {
                let v = self.pop_any(&function_name, pc)?;
                let i = operand_int(&instr.operand, || err!("STORE missing a slot operand"))? as usize;
                let frame = self.frame_mut();
                if i == frame.variables.len() {
                    frame.variables.push(v);
                } else {
                    frame.variables[i] = v;
                }
            }
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div => {
                let b = self.pop_nonnull(&function_name, pc)?;
                let a = self.pop_nonnull(&function_name, pc)?;
                let result = match (a, b) {
                    (VMValue::Int(x), VMValue::Int(y)) => match instr.op {
                        OpCode::Add => VMValue::Int(x + y),
                        OpCode::Sub => VMValue::Int(x - y),
                        OpCode::Mul => VMValue::Int(x * y),
                        OpCode::Div => {
                            if y == 0 {
                                return Err(err!("division by zero"));
                            }
                            VMValue::Int(x / y)
                        }
                        _ => unreachable!(),
                    },
                    (VMValue::Double(x), VMValue::Double(y)) => match instr.op {
                        OpCode::Add => VMValue::Double(x + y),
                        OpCode::Sub => VMValue::Double(x - y),
                        OpCode::Mul => VMValue::Double(x * y),
                        OpCode::Div => {
                            if y == 0.0 {
                                return Err(err!("division by zero"));
                            }
                            VMValue::Double(x / y)
                        }
                        _ => unreachable!(),
                    },
                    _ => return Err(err!("arithmetic requires two ints or two doubles")),
                };
                self.frame_mut().operand_stack.push(result);
            }
            OpCode::And | OpCode::Or => {
                let b = as_bool(self.pop_nonnull(&function_name, pc)?, &function_name, pc)?;
                let a = as_bool(self.pop_nonnull(&function_name, pc)?, &function_name, pc)?;
                let result = if instr.op == OpCode::And { a && b } else { a || b };
                self.frame_mut().operand_stack.push(VMValue::Bool(result));
            }
            OpCode::Not => {
                let a = as_bool(self.pop_nonnull(&function_name, pc)?, &function_name, pc)?;
                self.frame_mut().operand_stack.push(VMValue::Bool(!a));
            }
            OpCode::CmpEq | OpCode::CmpNe => {
                let b = self.pop_any(&function_name, pc)?;
                let a = self.pop_any(&function_name, pc)?;
                let eq = a == b;
                let result = if instr.op == OpCode::CmpEq { eq } else { !eq };
                self.frame_mut().operand_stack.push(VMValue::Bool(result));
            }
            OpCode::CmpLt | OpCode::CmpLe | OpCode::CmpGt | OpCode::CmpGe => {
                let b = self.pop_nonnull(&function_name, pc)?;
                let a = self.pop_nonnull(&function_name, pc)?;
                let ord = compare_values(&a, &b).ok_or_else(|| err!("comparison requires two values of the same comparable type"))?;
                let result = match instr.op {
                    OpCode::CmpLt => ord.is_lt(),
                    OpCode::CmpLe => ord.is_le(),
                    OpCode::CmpGt => ord.is_gt(),
                    OpCode::CmpGe => ord.is_ge(),
                    _ => unreachable!(),
                };
                self.frame_mut().operand_stack.push(VMValue::Bool(result));
            }
            OpCode::Jmp => {
                let t = operand_int(&instr.operand, || err!("JMP missing a target operand"))?;
                self.frame_mut().pc = t as usize;
            }
            OpCode::Jmpf => {
                let a = as_bool(self.pop_nonnull(&function_name, pc)?, &function_name, pc)?;
                if !a {
                    let t = operand_int(&instr.operand, || err!("JMPF missing a target operand"))?;
                    self.frame_mut().pc = t as usize;
                }
            }
            OpCode::Call => {
                let Operand::Name(name) = &instr.operand else { return Err(err!("CALL missing a function name")) };
                let callee_info = self.frame_infos.get(name).cloned().ok_or_else(|| err!(format!("undefined function '{name}'")))?;
                let n = callee_info.arg_count;
                let mut args = Vec::with_capacity(n);
                for _ in 0..n {
                    args.push(self.frame_mut().operand_stack.pop().ok_or_else(|| err!("CALL missing an argument"))?);
                }
                let mut callee = CallFrame::new(callee_info);
                callee.operand_stack.extend(args);
                self.call_stack.push(callee);
            }
            OpCode::Ret => {
                let v = self.pop_any(&function_name, pc)?;
                self.call_stack.pop();
                if let Some(caller) = self.call_stack.last_mut() {
                    caller.operand_stack.push(v);
                }
            }
            OpCode::Write => {
                let v = self.pop_any(&function_name, pc)?;
                write!(self.stdout, "{}", v.to_display_string()).map_err(|e| err!(format!("write failed: {e}")))?;
                self.stdout.flush().map_err(|e| err!(format!("write failed: {e}")))?;
            }
            OpCode::Read => {
                let mut line = String::new();
                self.stdin.read_line(&mut line).map_err(|e| err!(format!("read failed: {e}")))?;
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                self.frame_mut().operand_stack.push(VMValue::Str(line));
            }
            OpCode::Slen => {
                let s = as_str(self.pop_nonnull(&function_name, pc)?, &function_name, pc)?;
                self.frame_mut().operand_stack.push(VMValue::Int(s.chars().count() as i64));
            }
            OpCode::Alen => {
                let id = as_int(self.pop_nonnull(&function_name, pc)?, &function_name, pc)?;
                let len = self.array_heap.get(&(id as u64)).ok_or_else(|| err!("unknown array reference"))?.len();
                self.frame_mut().operand_stack.push(VMValue::Int(len as i64));
            }
            OpCode::Getc => {
                let s = as_str(self.pop_nonnull(&function_name, pc)?, &function_name, pc)?;
                let i = as_int(self.pop_nonnull(&function_name, pc)?, &function_name, pc)?;
                let chars: Vec<char> = s.chars().collect();
                if i < 0 || i as usize >= chars.len() {
                    return Err(err!("out-of-bounds string index"));
                }
                self.frame_mut().operand_stack.push(VMValue::Str(chars[i as usize].to_string()));
            }
            OpCode::ToInt => {
                let v = self.pop_nonnull(&function_name, pc)?;
                let result = match v {
                    VMValue::Double(d) => VMValue::Int(d as i64),
                    VMValue::Str(s) => VMValue::Int(
                        s.trim().parse::<i64>().map_err(|_| err!("cannot convert string to int"))?,
                    ),
                    _ => return Err(err!("cannot convert value to int")),
                };
                self.frame_mut().operand_stack.push(result);
            }
            OpCode::ToDbl => {
                let v = self.pop_nonnull(&function_name, pc)?;
                let result = match v {
                    VMValue::Int(i) => VMValue::Double(i as f64),
                    VMValue::Str(s) => VMValue::Double(
                        s.trim().parse::<f64>().map_err(|_| err!("cannot convert string to double"))?,
                    ),
                    _ => return Err(err!("cannot convert value to double")),
                };
                self.frame_mut().operand_stack.push(result);
            }
            OpCode::ToStr => {
                let v = self.pop_nonnull(&function_name, pc)?;
                self.frame_mut().operand_stack.push(VMValue::Str(v.to_display_string()));
            }
            OpCode::Concat => {
                let b = as_str(self.pop_nonnull(&function_name, pc)?, &function_name, pc)?;
                let a = as_str(self.pop_nonnull(&function_name, pc)?, &function_name, pc)?;
                self.frame_mut().operand_stack.push(VMValue::Str(a + &b));
            }
            OpCode::Allocs => {
                let id = self.fresh_id();
                self.struct_heap.insert(id, IndexMap::new());
                self.frame_mut().operand_stack.push(VMValue::Int(id as i64));
            }
            OpCode::Alloca => {
                let fill = self.pop_any(&function_name, pc)?;
                let n = as_int(self.pop_nonnull(&function_name, pc)?, &function_name, pc)?;
                if n < 0 {
                    return Err(err!("negative array size"));
                }
                let id = self.fresh_id();
                self.array_heap.insert(id, vec![fill; n as usize]);
                self.frame_mut().operand_stack.push(VMValue::Int(id as i64));
            }
            OpCode::Addf => {
                let Operand::Name(field) = &instr.operand else { return Err(err!("ADDF missing a field name")) };
                let id = as_int(self.pop_nonnull(&function_name, pc)?, &function_name, pc)?;
                let fields = self.struct_heap.get_mut(&(id as u64)).ok_or_else(|| err!("unknown struct reference"))?;
                fields.insert(field.clone(), VMValue::Null);
            }
            OpCode::Setf => {
                let Operand::Name(field) = &instr.operand else { return Err(err!("SETF missing a field name")) };
                let v = self.pop_any(&function_name, pc)?;
                let id = as_int(self.pop_nonnull(&function_name, pc)?, &function_name, pc)?;
                let fields = self.struct_heap.get_mut(&(id as u64)).ok_or_else(|| err!("null reference"))?;
                fields.insert(field.clone(), v);
            }
            OpCode::Getf => {
                let Operand::Name(field) = &instr.operand else { return Err(err!("GETF missing a field name")) };
                let id = as_int(self.pop_nonnull(&function_name, pc)?, &function_name, pc)?;
                let fields = self.struct_heap.get(&(id as u64)).ok_or_else(|| err!("null reference"))?;
                let v = fields.get(field).cloned().ok_or_else(|| err!(format!("unknown field '{field}'")))?;
                self.frame_mut().operand_stack.push(v);
            }
            OpCode::Seti => {
                let v = self.pop_any(&function_name, pc)?;
                let i = as_int(self.pop_nonnull(&function_name, pc)?, &function_name, pc)?;
                let id = as_int(self.pop_nonnull(&function_name, pc)?, &function_name, pc)?;
                let elems = self.array_heap.get_mut(&(id as u64)).ok_or_else(|| err!("null reference"))?;
                if i < 0 || i as usize >= elems.len() {
                    return Err(err!("out-of-bounds array index"));
                }
                elems[i as usize] = v;
            }
            OpCode::Geti => {
                let i = as_int(self.pop_nonnull(&function_name, pc)?, &function_name, pc)?;
                let id = as_int(self.pop_nonnull(&function_name, pc)?, &function_name, pc)?;
                let elems = self.array_heap.get(&(id as u64)).ok_or_else(|| err!("null reference"))?;
                if i < 0 || i as usize >= elems.len() {
                    return Err(err!("out-of-bounds array index"));
                }
                let v = elems[i as usize].clone();
                self.frame_mut().operand_stack.push(v);
            }
        }
        Ok(())
    }

    fn pop_any(&mut self, function_name: &str, pc: usize) -> VMResult<VMValue> {
        self.frame_mut()
            .operand_stack
            .pop()
            .ok_or_else(|| VMError { message: "operand stack underflow".to_string(), function_name: function_name.to_string(), pc })
    }

    fn pop_nonnull(&mut self, function_name: &str, pc: usize) -> VMResult<VMValue> {
        let v = self.pop_any(function_name, pc)?;
        if v == VMValue::Null {
            return Err(VMError { message: "null reference".to_string(), function_name: function_name.to_string(), pc });
        }
        Ok(v)
    }
}

fn operand_int(operand: &Operand, err: impl FnOnce() -> VMError) -> VMResult<i64> {
    match operand {
        Operand::Int(i) => Ok(*i),
        _ => Err(err()),
    }
}

fn as_bool(v: VMValue, function_name: &str, pc: usize) -> VMResult<bool> {
    match v {
        VMValue::Bool(b) => Ok(b),
        _ => Err(VMError { message: "expected a bool value".to_string(), function_name: function_name.to_string(), pc }),
    }
}

fn as_int(v: VMValue, function_name: &str, pc: usize) -> VMResult<i64> {
    match v {
        VMValue::Int(i) => Ok(i),
        _ => Err(VMError { message: "expected an int value".to_string(), function_name: function_name.to_string(), pc }),
    }
}

fn as_str(v: VMValue, function_name: &str, pc: usize) -> VMResult<String> {
    match v {
        VMValue::Str(s) => Ok(s),
        _ => Err(VMError { message: "expected a string value".to_string(), function_name: function_name.to_string(), pc }),
    }
}

fn compare_values(a: &VMValue, b: &VMValue) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (VMValue::Int(x), VMValue::Int(y)) => x.partial_cmp(y),
        (VMValue::Double(x), VMValue::Double(y)) => x.partial_cmp(y),
        (VMValue::Str(x), VMValue::Str(y)) => x.partial_cmp(y),
        (VMValue::Bool(x), VMValue::Bool(y)) => x.partial_cmp(y),
        _ => None,
    }
}
