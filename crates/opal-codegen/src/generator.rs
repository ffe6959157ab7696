//! Lowering typed IR to instructions.
//!
//! Every source class becomes a [`CompiledClass`]; closure expressions
//! become additional synthesized classes implementing their interface,
//! holding references to the captured frame objects (and the enclosing
//! instance, when there is one).

use opal_semantics::frame::{CapturedBinding, FrameSnapshot, LocalBinding};
use opal_semantics::ir::{IrBinOp, IrBody, IrClosure, IrExpr, IrStmt, IrUnaryOp};
use opal_semantics::symbols::{ClassTable, ConstructorRef, FieldRef, Lookup, MethodRef, MethodSymbol};
use opal_semantics::{Analysis, BasicType, ClassId, TypeRef};

use crate::builder::CodeBuilder;
use crate::error::CodegenError;
use crate::frame_layout::FrameLayout;
use crate::instruction::{num_kind, CmpOp, Instruction, NumKind};
use crate::output::{
    CompiledClass, CompiledConstructor, CompiledField, CompiledMethod, CompiledProgram,
};

/// Compile every analyzed source class.
pub fn generate(analysis: &Analysis) -> Result<CompiledProgram, CodegenError> {
    let mut classes = Vec::new();
    for &class in &analysis.classes {
        compile_class(analysis, class, &mut classes)?;
    }
    Ok(CompiledProgram { classes })
}

fn compile_class(
    analysis: &Analysis,
    class: ClassId,
    out: &mut Vec<CompiledClass>,
) -> Result<(), CodegenError> {
    let table = &analysis.table;
    let symbol = table.class(class);
    let name = symbol.name.clone();
    let mut compiled = CompiledClass {
        name: name.clone(),
        is_interface: symbol.is_interface(),
        super_class: symbol.super_class.map(|s| table.class(s).name.clone()),
        interfaces: symbol
            .interfaces
            .iter()
            .map(|&i| table.class(i).name.clone())
            .collect(),
        fields: symbol
            .fields
            .iter()
            .map(|f| CompiledField {
                name: f.name.clone(),
                ty: table.type_name(f.ty),
                is_static: f.modifiers.is_static(),
            })
            .collect(),
        methods: Vec::new(),
        constructors: Vec::new(),
    };

    let mut closure_counter = 0u32;
    for index in 0..symbol.methods.len() {
        let r = MethodRef { class, index };
        let m = table.method(r);
        let signature = method_sig(analysis, m);
        let is_static = m.modifiers.is_static();
        let (locals, max_stack, code, exceptions) = match &m.body {
            None => (0, 0, Vec::new(), Vec::new()),
            Some(body) => {
                let mut gen = MethodGen::new(
                    analysis,
                    class,
                    body,
                    m.params.len(),
                    is_static,
                    None,
                    out,
                    &mut closure_counter,
                );
                gen.emit_prologue();
                gen.stmt(&body.block)?;
                let locals = gen.layout.locals();
                let finished = gen.builder.finish()?;
                (locals, finished.max_stack, finished.code, finished.exceptions)
            }
        };
        compiled.methods.push(CompiledMethod {
            name: m.name.clone(),
            signature,
            is_static,
            locals,
            max_stack,
            code,
            exceptions,
        });
    }

    for index in 0..symbol.constructors.len() {
        let r = ConstructorRef { class, index };
        let c = table.constructor(r);
        let signature = params_sig(analysis, &c.params);
        let Some(body) = &c.body else {
            return Err(CodegenError::MissingBody {
                class: name.clone(),
                method: format!("new{signature}"),
            });
        };
        let mut gen = MethodGen::new(
            analysis,
            class,
            body,
            c.params.len(),
            false,
            None,
            out,
            &mut closure_counter,
        );
        gen.emit_prologue();
        // chain to the superclass constructor before anything else
        if let Some((super_ctor, args)) = &c.super_call {
            gen.builder.emit(Instruction::Load {
                slot: 0,
                wide: false,
            });
            for arg in args {
                gen.expr(arg)?;
            }
            gen.builder.emit(Instruction::InvokeCtor {
                class: table.class(super_ctor.class).name.clone(),
                signature: params_sig(analysis, &table.constructor(*super_ctor).params),
                args: slot_count(&table.constructor(*super_ctor).params),
            });
        }
        gen.stmt(&body.block)?;
        let locals = gen.layout.locals();
        let finished = gen.builder.finish()?;
        compiled.constructors.push(CompiledConstructor {
            signature,
            locals,
            max_stack: finished.max_stack,
            code: finished.code,
            exceptions: finished.exceptions,
        });
    }

    out.push(compiled);
    Ok(())
}

/// `name(t1,t2)` with fully qualified type names.
fn method_sig(analysis: &Analysis, m: &MethodSymbol) -> String {
    format!("{}{}", m.name, params_sig(analysis, &m.params))
}

fn params_sig(analysis: &Analysis, params: &[TypeRef]) -> String {
    let names: Vec<String> = params
        .iter()
        .map(|&p| analysis.table.type_name(p))
        .collect();
    format!("({})", names.join(","))
}

fn slot_count(params: &[TypeRef]) -> u16 {
    params.iter().map(|p| p.width() as u16).sum()
}

fn is_wide(ty: TypeRef) -> bool {
    ty.width() == 2
}

/// The constant pushed by stub bodies, `None` for void returns.
fn default_const(ty: TypeRef) -> Option<Instruction> {
    match ty {
        TypeRef::Basic(b) => match b {
            BasicType::Boolean => Some(Instruction::ConstBool(false)),
            BasicType::Char => Some(Instruction::ConstChar('\0')),
            BasicType::Byte | BasicType::Short | BasicType::Int => Some(Instruction::ConstInt(0)),
            BasicType::Long => Some(Instruction::ConstLong(0)),
            BasicType::Float => Some(Instruction::ConstFloat(0.0)),
            BasicType::Double => Some(Instruction::ConstDouble(0.0)),
            BasicType::Void => None,
        },
        _ => Some(Instruction::ConstNull),
    }
}

/// Generation context for a closure body: the synthesized class it lives
/// in and its frame nesting depth.
struct ClosureEnv {
    class_name: String,
    depth: usize,
}

/// Emits the body of one method, constructor or closure method.
struct MethodGen<'a, 'o> {
    analysis: &'a Analysis,
    /// The source class the code belongs to; closures keep their
    /// enclosing class here.
    class: ClassId,
    snapshot: FrameSnapshot,
    base: u16,
    params: usize,
    layout: FrameLayout,
    builder: CodeBuilder,
    env: Option<ClosureEnv>,
    /// Synthesized closure classes are appended here.
    out: &'o mut Vec<CompiledClass>,
    closure_counter: &'o mut u32,
}

impl<'a, 'o> MethodGen<'a, 'o> {
    #[allow(clippy::too_many_arguments)]
    fn new(
        analysis: &'a Analysis,
        class: ClassId,
        body: &IrBody,
        params: usize,
        is_static: bool,
        env: Option<ClosureEnv>,
        out: &'o mut Vec<CompiledClass>,
        closure_counter: &'o mut u32,
    ) -> Self {
        let base = if is_static { 0 } else { 1 };
        let layout = FrameLayout::of(&body.frame, base, params);
        Self {
            analysis,
            class,
            snapshot: body.frame.clone(),
            base,
            params,
            layout,
            builder: CodeBuilder::new(),
            env,
            out,
            closure_counter,
        }
    }

    fn table(&self) -> &'a ClassTable {
        &self.analysis.table
    }

    fn class_name(&self, id: ClassId) -> String {
        self.table().class(id).name.clone()
    }

    fn type_name(&self, ty: TypeRef) -> String {
        self.table().type_name(ty)
    }

    /// Body depth: 0 for a member body, the closure nesting depth inside
    /// one otherwise.
    fn depth(&self) -> usize {
        self.env.as_ref().map(|e| e.depth).unwrap_or(0)
    }

    /// For closed frames, materialize the frame object and copy the
    /// arguments into it.
    fn emit_prologue(&mut self) {
        let (frame_local, frame_size) = match &self.layout {
            FrameLayout::Closed {
                frame_local,
                frame_size,
                ..
            } => (*frame_local, *frame_size),
            FrameLayout::Open { .. } => return,
        };
        self.builder.emit(Instruction::NewFrame { size: frame_size });
        self.builder.emit(Instruction::Store {
            slot: frame_local,
            wide: false,
        });
        for i in 0..self.params {
            let wide = is_wide(self.snapshot.entries[i]);
            self.builder.emit(Instruction::Load {
                slot: FrameLayout::arg_slot(&self.snapshot, self.base, i),
                wide,
            });
            self.builder.emit(Instruction::Load {
                slot: frame_local,
                wide: false,
            });
            self.builder.emit(Instruction::FrameStore {
                slot: i as u16,
                wide,
            });
        }
    }

    // ----- variable access ------------------------------------------------

    /// Push the frame object of the enclosing frame at nesting depth `j`.
    fn push_frame_at_depth(&mut self, j: usize) {
        if j == self.depth() {
            // own frame, always closed when anyone captures it
            if let FrameLayout::Closed { frame_local, .. } = self.layout {
                self.builder.emit(Instruction::Load {
                    slot: frame_local,
                    wide: false,
                });
            }
        } else {
            let class_name = self
                .env
                .as_ref()
                .map(|e| e.class_name.clone())
                .unwrap_or_default();
            self.builder.emit(Instruction::Load {
                slot: 0,
                wide: false,
            });
            self.builder.emit(Instruction::GetField {
                class: class_name,
                field: format!("frame{j}"),
                wide: false,
            });
        }
    }

    fn load_local(&mut self, binding: &CapturedBinding) {
        let wide = is_wide(binding.ty);
        if binding.frame == 0 {
            match &self.layout {
                FrameLayout::Open { slots, .. } => {
                    let slot = slots[binding.index];
                    self.builder.emit(Instruction::Load { slot, wide });
                }
                FrameLayout::Closed { frame_local, .. } => {
                    let frame_local = *frame_local;
                    self.builder.emit(Instruction::Load {
                        slot: frame_local,
                        wide: false,
                    });
                    self.builder.emit(Instruction::FrameLoad {
                        slot: binding.index as u16,
                        wide,
                    });
                }
            }
        } else {
            let j = self.depth() - binding.frame;
            self.push_frame_at_depth(j);
            self.builder.emit(Instruction::FrameLoad {
                slot: binding.index as u16,
                wide,
            });
        }
    }

    /// Store the value on top of the stack into `binding`, keeping a copy
    /// on the stack.
    fn store_local_keeping(&mut self, binding: &CapturedBinding) {
        let wide = is_wide(binding.ty);
        self.builder.emit(Instruction::Dup { wide });
        self.store_local(binding);
    }

    fn store_local(&mut self, binding: &CapturedBinding) {
        let wide = is_wide(binding.ty);
        if binding.frame == 0 {
            match &self.layout {
                FrameLayout::Open { slots, .. } => {
                    let slot = slots[binding.index];
                    self.builder.emit(Instruction::Store { slot, wide });
                }
                FrameLayout::Closed { frame_local, .. } => {
                    let frame_local = *frame_local;
                    self.builder.emit(Instruction::Load {
                        slot: frame_local,
                        wide: false,
                    });
                    self.builder.emit(Instruction::FrameStore {
                        slot: binding.index as u16,
                        wide,
                    });
                }
            }
        } else {
            let j = self.depth() - binding.frame;
            self.push_frame_at_depth(j);
            self.builder.emit(Instruction::FrameStore {
                slot: binding.index as u16,
                wide,
            });
        }
    }

    /// Push the enclosing instance. Inside a closure body this reads the
    /// captured outer reference.
    fn push_this(&mut self) {
        self.builder.emit(Instruction::Load {
            slot: 0,
            wide: false,
        });
        if let Some(env) = &self.env {
            let class = env.class_name.clone();
            self.builder.emit(Instruction::GetField {
                class,
                field: "outer".into(),
                wide: false,
            });
        }
    }

    // ----- expressions ----------------------------------------------------

    fn expr(&mut self, e: &IrExpr) -> Result<(), CodegenError> {
        match e {
            IrExpr::Int { value } => self.builder.emit(Instruction::ConstInt(*value)),
            IrExpr::Long { value } => self.builder.emit(Instruction::ConstLong(*value)),
            IrExpr::Char { value } => self.builder.emit(Instruction::ConstChar(*value)),
            IrExpr::Float { value } => self.builder.emit(Instruction::ConstFloat(*value)),
            IrExpr::Double { value } => self.builder.emit(Instruction::ConstDouble(*value)),
            IrExpr::Bool { value } => self.builder.emit(Instruction::ConstBool(*value)),
            IrExpr::Str { value, .. } => self.builder.emit(Instruction::ConstStr(value.clone())),
            IrExpr::Null => self.builder.emit(Instruction::ConstNull),
            IrExpr::List { elements, .. } => self.list_literal(elements)?,
            IrExpr::This { .. } => self.push_this(),
            IrExpr::RefLocal { binding } => self.load_local(binding),
            IrExpr::SetLocal { binding, value } => {
                self.expr(value)?;
                self.store_local_keeping(binding);
            }
            IrExpr::RefField { target, field, ty } => {
                self.expr(target)?;
                self.builder.emit(Instruction::GetField {
                    class: self.class_name(field.class),
                    field: self.field_name(*field),
                    wide: is_wide(*ty),
                });
            }
            IrExpr::SetField {
                target,
                field,
                value,
                ty,
            } => {
                self.expr(target)?;
                self.expr(value)?;
                let wide = is_wide(*ty);
                self.builder.emit(Instruction::DupX1 { wide });
                self.builder.emit(Instruction::PutField {
                    class: self.class_name(field.class),
                    field: self.field_name(*field),
                    wide,
                });
            }
            IrExpr::RefStaticField { field, ty } => {
                self.builder.emit(Instruction::GetStatic {
                    class: self.class_name(field.class),
                    field: self.field_name(*field),
                    wide: is_wide(*ty),
                });
            }
            IrExpr::SetStaticField { field, value, ty } => {
                self.expr(value)?;
                let wide = is_wide(*ty);
                self.builder.emit(Instruction::Dup { wide });
                self.builder.emit(Instruction::PutStatic {
                    class: self.class_name(field.class),
                    field: self.field_name(*field),
                    wide,
                });
            }
            IrExpr::ArrayLength { target } => {
                self.expr(target)?;
                self.builder.emit(Instruction::ArrayLength);
            }
            IrExpr::ArrayRef { target, index, ty } => {
                self.expr(target)?;
                self.expr(index)?;
                self.builder.emit(Instruction::ArrayLoad { wide: is_wide(*ty) });
            }
            IrExpr::ArraySet {
                target,
                index,
                value,
                ty,
            } => {
                self.expr(target)?;
                self.expr(index)?;
                self.expr(value)?;
                let wide = is_wide(*ty);
                self.builder.emit(Instruction::DupX2 { wide });
                self.builder.emit(Instruction::ArrayStore { wide });
            }
            IrExpr::Unary { op, ty, operand } => {
                self.expr(operand)?;
                let kind = num_kind(*ty).unwrap_or(NumKind::Int);
                match op {
                    IrUnaryOp::Neg => self.builder.emit(Instruction::Neg(kind)),
                    IrUnaryOp::Not => self.builder.emit(Instruction::Not),
                    IrUnaryOp::BitNot => {
                        match kind {
                            NumKind::Long => self.builder.emit(Instruction::ConstLong(-1)),
                            _ => self.builder.emit(Instruction::ConstInt(-1)),
                        }
                        self.builder.emit(Instruction::BitXor(kind));
                    }
                }
            }
            IrExpr::Binary { op, ty, lhs, rhs } => self.binary(*op, *ty, lhs, rhs)?,
            IrExpr::Cast { value, to } => {
                self.expr(value)?;
                self.cast(value.ty(), *to);
            }
            IrExpr::IsInstance { value, of } => {
                self.expr(value)?;
                self.builder.emit(Instruction::InstanceOf {
                    class: self.type_name(*of),
                });
            }
            IrExpr::Call {
                target,
                method,
                args,
                ..
            } => {
                self.expr(target)?;
                for arg in args {
                    self.expr(arg)?;
                }
                self.invoke(Invoke::Virtual, *method);
            }
            IrExpr::CallStatic { method, args, .. } => {
                for arg in args {
                    self.expr(arg)?;
                }
                self.invoke(Invoke::Static, *method);
            }
            IrExpr::CallSuper {
                target,
                method,
                args,
                ..
            } => {
                self.expr(target)?;
                for arg in args {
                    self.expr(arg)?;
                }
                self.invoke(Invoke::Super, *method);
            }
            IrExpr::New { ctor, args, .. } => {
                let class = self.class_name(ctor.class);
                self.builder.emit(Instruction::New { class: class.clone() });
                self.builder.emit(Instruction::Dup { wide: false });
                for arg in args {
                    self.expr(arg)?;
                }
                let params = self.table().constructor(*ctor).params.clone();
                self.builder.emit(Instruction::InvokeCtor {
                    class,
                    signature: params_sig(self.analysis, &params),
                    args: slot_count(&params),
                });
            }
            IrExpr::NewArray { array, sizes } => {
                for size in sizes {
                    self.expr(size)?;
                }
                let base = self.table().array(*array).base;
                self.builder.emit(Instruction::NewArray {
                    component: self.type_name(base),
                    dims: sizes.len() as u8,
                });
            }
            IrExpr::NewClosure(closure) => self.closure(closure)?,
            IrExpr::Begin { exprs } => {
                let last = exprs.len().saturating_sub(1);
                for (i, e) in exprs.iter().enumerate() {
                    self.expr(e)?;
                    if i != last {
                        self.pop_value(e.ty());
                    }
                }
            }
        }
        Ok(())
    }

    fn field_name(&self, field: FieldRef) -> String {
        self.table().field(field).name.clone()
    }

    fn pop_value(&mut self, ty: TypeRef) {
        match ty.width() {
            0 => {}
            2 => self.builder.emit(Instruction::Pop2),
            _ => self.builder.emit(Instruction::Pop),
        }
    }

    fn binary(
        &mut self,
        op: IrBinOp,
        ty: TypeRef,
        lhs: &IrExpr,
        rhs: &IrExpr,
    ) -> Result<(), CodegenError> {
        match op {
            IrBinOp::LogicalAnd => {
                self.expr(lhs)?;
                let end = self.builder.new_label();
                self.builder.emit(Instruction::Dup { wide: false });
                self.builder
                    .emit_branch(Instruction::JumpIfFalse { target: 0 }, end);
                self.builder.emit(Instruction::Pop);
                self.expr(rhs)?;
                self.builder.bind(end);
            }
            IrBinOp::LogicalOr => {
                self.expr(lhs)?;
                let end = self.builder.new_label();
                self.builder.emit(Instruction::Dup { wide: false });
                self.builder
                    .emit_branch(Instruction::JumpIfTrue { target: 0 }, end);
                self.builder.emit(Instruction::Pop);
                self.expr(rhs)?;
                self.builder.bind(end);
            }
            IrBinOp::Elvis => {
                self.expr(lhs)?;
                let end = self.builder.new_label();
                self.builder.emit(Instruction::Dup { wide: false });
                self.builder
                    .emit_branch(Instruction::JumpIfNonNull { target: 0 }, end);
                self.builder.emit(Instruction::Pop);
                self.expr(rhs)?;
                self.builder.bind(end);
            }
            IrBinOp::Eq | IrBinOp::Ne if lhs.ty().is_reference() => {
                // reference operands mean identity by this point; the
                // structural form was lowered to an equals call
                self.expr(lhs)?;
                self.expr(rhs)?;
                self.builder.emit(Instruction::RefCmp {
                    negated: op == IrBinOp::Ne,
                });
            }
            IrBinOp::Lt | IrBinOp::Le | IrBinOp::Gt | IrBinOp::Ge | IrBinOp::Eq | IrBinOp::Ne => {
                self.expr(lhs)?;
                self.expr(rhs)?;
                let kind = num_kind(lhs.ty()).unwrap_or(NumKind::Int);
                let op = match op {
                    IrBinOp::Lt => CmpOp::Lt,
                    IrBinOp::Le => CmpOp::Le,
                    IrBinOp::Gt => CmpOp::Gt,
                    IrBinOp::Ge => CmpOp::Ge,
                    IrBinOp::Eq => CmpOp::Eq,
                    _ => CmpOp::Ne,
                };
                self.builder.emit(Instruction::Cmp { op, kind });
            }
            _ => {
                self.expr(lhs)?;
                self.expr(rhs)?;
                let kind = num_kind(ty).unwrap_or(NumKind::Int);
                let instruction = match op {
                    IrBinOp::Add => Instruction::Add(kind),
                    IrBinOp::Sub => Instruction::Sub(kind),
                    IrBinOp::Mul => Instruction::Mul(kind),
                    IrBinOp::Div => Instruction::Div(kind),
                    IrBinOp::Rem => Instruction::Rem(kind),
                    IrBinOp::BitAnd => Instruction::BitAnd(kind),
                    IrBinOp::BitOr => Instruction::BitOr(kind),
                    IrBinOp::BitXor => Instruction::BitXor(kind),
                    IrBinOp::Shl => Instruction::Shl(kind),
                    IrBinOp::Shr => Instruction::Shr(kind),
                    _ => Instruction::UShr(kind),
                };
                self.builder.emit(instruction);
            }
        }
        Ok(())
    }

    fn cast(&mut self, from: TypeRef, to: TypeRef) {
        match (num_kind(from), num_kind(to)) {
            (Some(f), Some(t)) => {
                if f != t {
                    self.builder.emit(Instruction::Convert { from: f, to: t });
                }
            }
            _ => {
                // reference cast; upcasts and null need no check
                if from != TypeRef::Null && !self.table().is_super_type(to, from) {
                    self.builder.emit(Instruction::CheckCast {
                        class: self.type_name(to),
                    });
                }
            }
        }
    }

    /// Build the platform list for a list literal: create, then `add`
    /// each element, dropping the returned receiver.
    fn list_literal(&mut self, elements: &[IrExpr]) -> Result<(), CodegenError> {
        let array_list = self.analysis.platform.array_list;
        let class = self.class_name(array_list);
        let Lookup::Found(ctor) = self.table().find_constructor(array_list, &[]) else {
            return Err(CodegenError::MissingBody {
                class,
                method: "new()".into(),
            });
        };
        self.builder.emit(Instruction::New { class: class.clone() });
        self.builder.emit(Instruction::Dup { wide: false });
        self.builder.emit(Instruction::InvokeCtor {
            class,
            signature: params_sig(self.analysis, &self.table().constructor(ctor).params),
            args: 0,
        });
        let list = self.analysis.platform.list;
        let Some(add) = self.table().methods_named(list, "add").into_iter().next() else {
            return Err(CodegenError::MissingBody {
                class: self.class_name(list),
                method: "add".into(),
            });
        };
        for element in elements {
            self.builder.emit(Instruction::Dup { wide: false });
            self.expr(element)?;
            self.invoke(Invoke::Virtual, add);
            self.builder.emit(Instruction::Pop);
        }
        Ok(())
    }

    fn invoke(&mut self, kind: Invoke, method: MethodRef) {
        let m = self.table().method(method);
        let class = self.class_name(method.class);
        let sig = method_sig(self.analysis, m);
        let args = slot_count(&m.params);
        let ret = m.return_type.width() as u16;
        let instruction = match kind {
            Invoke::Virtual => Instruction::InvokeVirtual {
                class,
                method: sig,
                args,
                ret,
            },
            Invoke::Super => Instruction::InvokeSuper {
                class,
                method: sig,
                args,
                ret,
            },
            Invoke::Static => Instruction::InvokeStatic {
                class,
                method: sig,
                args,
                ret,
            },
        };
        self.builder.emit(instruction);
    }

    /// Synthesize the closure class and emit its creation.
    fn closure(&mut self, closure: &IrClosure) -> Result<(), CodegenError> {
        let enclosing = self.class_name(self.class);
        let name = format!("{}Closure{}", enclosing, *self.closure_counter);
        *self.closure_counter += 1;
        let depth = closure.frame.depth;

        let mut fields = Vec::new();
        if closure.has_outer {
            fields.push(CompiledField {
                name: "outer".into(),
                ty: enclosing.clone(),
                is_static: false,
            });
        }
        for j in 0..depth {
            fields.push(CompiledField {
                name: format!("frame{j}"),
                ty: "frame".into(),
                is_static: false,
            });
        }

        // compile the body into its own method
        let body = IrBody {
            frame: closure.frame.clone(),
            block: closure.body.clone(),
        };
        let method_symbol = self.table().method(closure.method);
        let signature = method_sig(self.analysis, method_symbol);
        let method_name = method_symbol.name.clone();
        let mut gen = MethodGen::new(
            self.analysis,
            self.class,
            &body,
            closure.params.len(),
            false,
            Some(ClosureEnv {
                class_name: name.clone(),
                depth,
            }),
            self.out,
            self.closure_counter,
        );
        gen.emit_prologue();
        gen.stmt(&body.block)?;
        let locals = gen.layout.locals();
        let finished = gen.builder.finish()?;

        let mut methods = vec![CompiledMethod {
            name: method_name,
            signature,
            is_static: false,
            locals,
            max_stack: finished.max_stack,
            code: finished.code,
            exceptions: finished.exceptions,
        }];
        for r in self.table().interface_methods(closure.interface) {
            if r != closure.method {
                methods.push(self.closure_stub(r)?);
            }
        }
        let ctor = self.closure_constructor(&name, &fields)?;
        let ctor_sig = ctor.signature.clone();
        let arg_count = fields.len() as u16;

        self.out.push(CompiledClass {
            name: name.clone(),
            is_interface: false,
            super_class: Some(self.class_name(self.analysis.platform.object)),
            interfaces: vec![self.class_name(closure.interface)],
            fields,
            methods,
            constructors: vec![ctor],
        });

        // creation: allocate, then hand the outer instance and captured
        // frames to the generated constructor
        self.builder.emit(Instruction::New { class: name.clone() });
        self.builder.emit(Instruction::Dup { wide: false });
        if closure.has_outer {
            self.push_this();
        }
        for j in 0..depth {
            self.push_frame_at_depth(j);
        }
        self.builder.emit(Instruction::InvokeCtor {
            class: name,
            signature: ctor_sig,
            args: arg_count,
        });
        Ok(())
    }

    /// The generated constructor stores each capture argument into its
    /// field, in declaration order.
    fn closure_constructor(
        &self,
        class: &str,
        fields: &[CompiledField],
    ) -> Result<CompiledConstructor, CodegenError> {
        let mut builder = CodeBuilder::new();
        for (i, field) in fields.iter().enumerate() {
            builder.emit(Instruction::Load {
                slot: 0,
                wide: false,
            });
            builder.emit(Instruction::Load {
                slot: 1 + i as u16,
                wide: false,
            });
            builder.emit(Instruction::PutField {
                class: class.to_string(),
                field: field.name.clone(),
                wide: false,
            });
        }
        builder.emit(Instruction::ReturnVoid);
        let finished = builder.finish()?;
        let names: Vec<&str> = fields.iter().map(|f| f.ty.as_str()).collect();
        Ok(CompiledConstructor {
            signature: format!("({})", names.join(",")),
            locals: 1 + fields.len() as u16,
            max_stack: finished.max_stack,
            code: finished.code,
            exceptions: finished.exceptions,
        })
    }

    /// Interface methods the closure does not implement get a body that
    /// returns the default value of their return type.
    fn closure_stub(&self, method: MethodRef) -> Result<CompiledMethod, CodegenError> {
        let m = self.table().method(method);
        let mut builder = CodeBuilder::new();
        match default_const(m.return_type) {
            Some(constant) => {
                builder.emit(constant);
                builder.emit(Instruction::ReturnValue {
                    wide: is_wide(m.return_type),
                });
            }
            None => builder.emit(Instruction::ReturnVoid),
        }
        let finished = builder.finish()?;
        Ok(CompiledMethod {
            name: m.name.clone(),
            signature: method_sig(self.analysis, m),
            is_static: false,
            locals: 1 + slot_count(&m.params),
            max_stack: finished.max_stack,
            code: finished.code,
            exceptions: finished.exceptions,
        })
    }

    // ----- statements -----------------------------------------------------

    fn stmt(&mut self, s: &IrStmt) -> Result<(), CodegenError> {
        match s {
            IrStmt::Block(stmts) => {
                for s in stmts {
                    self.stmt(s)?;
                }
            }
            IrStmt::Expression(e) => {
                self.expr(e)?;
                self.pop_value(e.ty());
            }
            IrStmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition)?;
                let end = self.builder.new_label();
                match else_branch {
                    None => {
                        self.builder
                            .emit_branch(Instruction::JumpIfFalse { target: 0 }, end);
                        self.stmt(then_branch)?;
                    }
                    Some(else_branch) => {
                        let other = self.builder.new_label();
                        self.builder
                            .emit_branch(Instruction::JumpIfFalse { target: 0 }, other);
                        self.stmt(then_branch)?;
                        self.builder.emit_branch(Instruction::Jump { target: 0 }, end);
                        self.builder.bind(other);
                        self.stmt(else_branch)?;
                    }
                }
                self.builder.bind(end);
            }
            IrStmt::Loop { condition, body } => {
                let start = self.builder.new_label();
                let end = self.builder.new_label();
                self.builder.bind(start);
                self.expr(condition)?;
                self.builder
                    .emit_branch(Instruction::JumpIfFalse { target: 0 }, end);
                self.stmt(body)?;
                self.builder.emit_branch(Instruction::Jump { target: 0 }, start);
                self.builder.bind(end);
            }
            IrStmt::Return { value } => match value {
                Some(v) => {
                    self.expr(v)?;
                    self.builder.emit(Instruction::ReturnValue {
                        wide: is_wide(v.ty()),
                    });
                }
                None => self.builder.emit(Instruction::ReturnVoid),
            },
            IrStmt::Throw { value } => {
                self.expr(value)?;
                self.builder.emit(Instruction::Throw);
            }
            IrStmt::Try { body, catches } => {
                let start = self.builder.new_label();
                let end = self.builder.new_label();
                let done = self.builder.new_label();
                self.builder.bind(start);
                self.stmt(body)?;
                self.builder.bind(end);
                self.builder.emit_branch(Instruction::Jump { target: 0 }, done);
                for catch in catches {
                    let handler = self.builder.new_label();
                    self.builder.bind(handler);
                    self.store_caught(&catch.binding);
                    self.stmt(&catch.body)?;
                    self.builder.emit_branch(Instruction::Jump { target: 0 }, done);
                    self.builder
                        .add_exception(start, end, handler, self.type_name(catch.binding.ty));
                }
                self.builder.bind(done);
            }
            IrStmt::Nop => {}
        }
        Ok(())
    }

    /// Store the thrown value (on the stack at handler entry) into the
    /// catch variable.
    fn store_caught(&mut self, binding: &LocalBinding) {
        let captured = CapturedBinding {
            frame: 0,
            index: binding.index,
            ty: binding.ty,
        };
        self.store_local(&captured);
    }
}

#[derive(Clone, Copy)]
enum Invoke {
    Virtual,
    Super,
    Static,
}
