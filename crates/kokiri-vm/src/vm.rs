//! The interpreter loop.

use std::sync::Arc;

use kokiri_codegen::{Chunk, Instruction, Opcode};
use kokiri_types::Packed;

use crate::env::{Frame, FunctionRef, Resolver, Scope};
use crate::error::{VmError, VmResult};
use crate::function::Function;
use crate::options::VmOptions;

/// Truth value of a rule result: booleans as themselves, numbers when
/// non-zero. Anything else is a type error.
pub fn truthy(value: Packed) -> VmResult<bool> {
    if let Some(b) = value.unpack_bool() {
        return Ok(b);
    }
    match value.as_number() {
        Some(n) => Ok(n != 0.0 && !n.is_nan()),
        None => Err(VmError::TypeMismatch {
            op: "truth test",
            found: vec![value.tag()],
        }),
    }
}

/// Stack machine for [`Chunk`]s.
///
/// A `Vm` is reusable: each [`run`](Vm::run) starts from an empty stack.
/// Compiled-function calls share the operand stack with their caller, so
/// `max_stack_depth` bounds the whole evaluation.
#[derive(Debug)]
pub struct Vm {
    options: VmOptions,
    stack: Vec<Packed>,
    call_depth: usize,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new(VmOptions::default())
    }
}

impl Vm {
    pub fn new(options: VmOptions) -> Self {
        Self {
            options,
            stack: Vec::with_capacity(options.max_stack_depth.min(64)),
            call_depth: 0,
        }
    }

    pub fn options(&self) -> &VmOptions {
        &self.options
    }

    /// Evaluate `chunk` against `env`.
    pub fn run(&mut self, chunk: &Chunk, env: &dyn Resolver) -> VmResult<Packed> {
        self.stack.clear();
        self.call_depth = 0;
        let result = self.execute(chunk, env);
        if let Err(err) = &result {
            tracing::trace!(chunk = %chunk.name, error = %err, "evaluation failed");
        }
        result
    }

    /// Evaluate `chunk` and apply [`truthy`] to its result.
    pub fn test(&mut self, chunk: &Chunk, env: &dyn Resolver) -> VmResult<bool> {
        self.run(chunk, env).and_then(truthy)
    }

    /// Call `function` directly with `args`.
    pub fn call(
        &mut self,
        function: &Function,
        args: Vec<Packed>,
        env: &dyn Resolver,
    ) -> VmResult<Packed> {
        self.stack.clear();
        self.call_depth = 0;
        self.dispatch(function, args, env)
    }

    fn execute(&mut self, chunk: &Chunk, env: &dyn Resolver) -> VmResult<Packed> {
        let base = self.stack.len();
        let result = self.interpret(chunk, env, base);
        self.stack.truncate(base);
        result
    }

    fn interpret(&mut self, chunk: &Chunk, env: &dyn Resolver, base: usize) -> VmResult<Packed> {
        let mut pc = 0;
        let mut ret = None;

        while pc < chunk.code.len() {
            let inst = self.fetch(chunk, pc)?;
            pc = inst.next_offset();

            match inst.opcode {
                Opcode::LoadConst => {
                    let value = chunk
                        .constants
                        .get(inst.operand as usize)
                        .copied()
                        .ok_or_else(|| malformed(chunk, inst.offset, "constant index out of range"))?;
                    self.push(value)?;
                }
                Opcode::LoadIdent => {
                    let name = name_operand(chunk, &inst)?;
                    let value = env
                        .identifier(name)
                        .ok_or_else(|| VmError::UnboundName {
                            name: name.to_owned(),
                        })?;
                    self.push(value)?;
                }

                Opcode::Eq | Opcode::NotEq => {
                    let right = self.pop(base, inst.offset)?;
                    let left = self.pop(base, inst.offset)?;
                    let eq = equal(left, right, inst.opcode)?;
                    self.push(Packed::pack_bool(eq == (inst.opcode == Opcode::Eq)))?;
                }
                Opcode::Less => {
                    let right = self.pop(base, inst.offset)?;
                    let left = self.pop(base, inst.offset)?;
                    match (left.as_number(), right.as_number()) {
                        (Some(l), Some(r)) => self.push(Packed::pack_bool(l < r))?,
                        _ => {
                            return Err(VmError::TypeMismatch {
                                op: "<",
                                found: vec![left.tag(), right.tag()],
                            })
                        }
                    }
                }

                Opcode::And | Opcode::Or => {
                    let right = truthy(self.pop(base, inst.offset)?)?;
                    let left = truthy(self.pop(base, inst.offset)?)?;
                    let value = if inst.opcode == Opcode::And {
                        left && right
                    } else {
                        left || right
                    };
                    self.push(Packed::pack_bool(value))?;
                }
                Opcode::Not => {
                    let value = truthy(self.pop(base, inst.offset)?)?;
                    self.push(Packed::pack_bool(!value))?;
                }

                Opcode::Jump => pc = jump_target(chunk, &inst)?,
                Opcode::JumpFalse | Opcode::JumpTrue => {
                    let target = jump_target(chunk, &inst)?;
                    let test = truthy(self.pop(base, inst.offset)?)?;
                    if test == (inst.opcode == Opcode::JumpTrue) {
                        pc = target;
                    }
                }
                Opcode::Pop => {
                    self.pop(base, inst.offset)?;
                }

                Opcode::Call0 | Opcode::Call1 | Opcode::Call2 | Opcode::CallN => {
                    let name = name_operand(chunk, &inst)?;
                    let argc = match inst.opcode {
                        Opcode::Call0 => 0,
                        Opcode::Call1 => 1,
                        Opcode::Call2 => 2,
                        _ => inst.argc as usize,
                    };
                    if self.stack.len() < base + argc {
                        return Err(VmError::StackUnderflow { offset: inst.offset });
                    }
                    let args = self.stack.split_off(self.stack.len() - argc);
                    let function = match env.function(name) {
                        FunctionRef::Bound(function) => function,
                        FunctionRef::Declared => {
                            return Err(VmError::UndefinedFunction {
                                name: name.to_owned(),
                            })
                        }
                        FunctionRef::Unbound => {
                            return Err(VmError::UnknownFunction {
                                name: name.to_owned(),
                            })
                        }
                    };
                    let value = self.dispatch(&function, args, env)?;
                    self.push(value)?;
                }

                Opcode::SetReturn => ret = Some(self.pop(base, inst.offset)?),
                Opcode::Return => return self.finish(ret, base, inst.offset),
            }
        }

        self.finish(ret, base, chunk.code.len())
    }

    fn fetch(&self, chunk: &Chunk, pc: usize) -> VmResult<Instruction> {
        let byte = chunk.code[pc];
        if Opcode::from_byte(byte).is_none() {
            return Err(VmError::InvalidOpcode { byte, offset: pc });
        }
        chunk
            .decode(pc)
            .ok_or_else(|| malformed(chunk, pc, "truncated instruction"))
    }

    fn dispatch(&mut self, function: &Function, args: Vec<Packed>, env: &dyn Resolver) -> VmResult<Packed> {
        if args.len() != function.arity() {
            return Err(VmError::ArityMismatch {
                name: function.name().to_owned(),
                expected: function.arity(),
                found: args.len(),
            });
        }
        tracing::trace!(function = function.name(), argc = args.len(), "call");

        match function {
            Function::Native(native) => native.invoke(&args).map_err(|message| VmError::Native {
                name: native.name.clone(),
                message,
            }),
            Function::Compiled(compiled) => {
                if self.call_depth >= self.options.max_call_depth {
                    return Err(VmError::CallDepthExceeded {
                        limit: self.options.max_call_depth,
                    });
                }
                let mut locals = Scope::with_parent(Arc::clone(&compiled.captured));
                for (param, value) in compiled.params.iter().zip(args) {
                    locals.set(param.as_str(), value);
                }
                let frame = Frame { locals, outer: env };

                self.call_depth += 1;
                let result = self.execute(&compiled.chunk, &frame);
                self.call_depth -= 1;
                result
            }
        }
    }

    fn finish(&mut self, ret: Option<Packed>, base: usize, offset: usize) -> VmResult<Packed> {
        match ret {
            Some(value) => Ok(value),
            None => self.pop(base, offset),
        }
    }

    fn push(&mut self, value: Packed) -> VmResult<()> {
        if self.stack.len() >= self.options.max_stack_depth {
            return Err(VmError::StackOverflow {
                limit: self.options.max_stack_depth,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self, base: usize, offset: usize) -> VmResult<Packed> {
        if self.stack.len() <= base {
            return Err(VmError::StackUnderflow { offset });
        }
        self.stack.pop().ok_or(VmError::StackUnderflow { offset })
    }
}

/// Numbers compare by value across the three numeric tags; everything else
/// compares by identity within one tag.
fn equal(left: Packed, right: Packed, op: Opcode) -> VmResult<bool> {
    match (left.as_number(), right.as_number()) {
        (Some(l), Some(r)) => Ok(l == r),
        (None, None) if left.tag().is_some() && left.tag() == right.tag() => Ok(left == right),
        _ => Err(VmError::TypeMismatch {
            op: if op == Opcode::Eq { "==" } else { "!=" },
            found: vec![left.tag(), right.tag()],
        }),
    }
}

fn name_operand<'c>(chunk: &'c Chunk, inst: &Instruction) -> VmResult<&'c str> {
    chunk
        .name_at(inst.operand)
        .ok_or_else(|| malformed(chunk, inst.offset, "name index out of range"))
}

fn jump_target(chunk: &Chunk, inst: &Instruction) -> VmResult<usize> {
    let target = inst.operand as usize;
    if target > chunk.code.len() {
        return Err(malformed(chunk, inst.offset, "jump target out of range"));
    }
    Ok(target)
}

fn malformed(chunk: &Chunk, offset: usize, reason: &'static str) -> VmError {
    VmError::MalformedChunk {
        chunk: chunk.name.clone(),
        offset,
        reason,
    }
}
