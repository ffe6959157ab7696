//! Compile hand-built programs end to end and run them on a small
//! reference interpreter for the instruction set.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use opal_codegen::{generate, CmpOp, CompiledMethod, CompiledProgram, Instruction, NumKind};
use opal_semantics::Analyzer;
use opal_syntax::{
    BinaryOp, BlockStatement, CatchClause, ClassDecl, ClosureExpression, CompilationUnit,
    Expression, FieldDecl, ForeachStatement, InterfaceDecl, InterfaceMethodDecl, Location,
    MemberSelect, MethodCall, MethodDecl, Modifiers, NewObject, NodeIdGen, Parameter,
    PrimitiveKind, ReturnStatement, SelectStatement, Statement, ThrowStatement, TopLevel,
    TryStatement, TypeName, TypeSpec, WhileStatement,
};

// ----- tree building helpers ---------------------------------------------

fn lc() -> Location {
    Location::new(1, 1)
}

fn int_spec() -> TypeSpec {
    TypeSpec::primitive(PrimitiveKind::Int)
}

fn block(statements: Vec<Statement>) -> BlockStatement {
    BlockStatement::new(statements, lc())
}

fn ret(value: Expression) -> Statement {
    Statement::Return(ReturnStatement {
        value: Some(value),
        loc: lc(),
    })
}

fn assign(name: &str, value: Expression) -> Expression {
    Expression::Assign(opal_syntax::Assignment {
        lhs: Box::new(Expression::id(name, lc())),
        rhs: Box::new(value),
        loc: lc(),
    })
}

fn this_field(name: &str) -> Expression {
    Expression::MemberSelect(MemberSelect {
        target: Box::new(Expression::CurrentInstance(lc())),
        name: name.to_string(),
        loc: lc(),
    })
}

fn set_field(name: &str, value: Expression) -> Statement {
    Statement::expression(Expression::Assign(opal_syntax::Assignment {
        lhs: Box::new(this_field(name)),
        rhs: Box::new(value),
        loc: lc(),
    }))
}

fn call(target: Expression, name: &str, args: Vec<Expression>) -> Expression {
    Expression::Call(MethodCall {
        target: Box::new(target),
        name: name.to_string(),
        args,
        loc: lc(),
    })
}

fn method(
    ids: &mut NodeIdGen,
    name: &str,
    params: Vec<(&str, TypeSpec)>,
    return_type: Option<TypeSpec>,
    body: BlockStatement,
) -> MethodDecl {
    MethodDecl {
        node_id: ids.fresh(),
        modifiers: Modifiers::PUBLIC,
        name: name.to_string(),
        params: params
            .into_iter()
            .map(|(n, t)| Parameter::new(n, t, lc()))
            .collect(),
        return_type,
        body: Some(body),
        loc: lc(),
    }
}

fn class(ids: &mut NodeIdGen, name: &str, methods: Vec<MethodDecl>) -> ClassDecl {
    ClassDecl {
        node_id: ids.fresh(),
        modifiers: Modifiers::PUBLIC,
        name: name.to_string(),
        super_class: None,
        interfaces: Vec::new(),
        fields: Vec::new(),
        methods,
        constructors: Vec::new(),
        loc: lc(),
    }
}

fn compile(toplevels: Vec<TopLevel>) -> CompiledProgram {
    let mut unit = CompilationUnit::new("test.opl");
    unit.toplevels = toplevels;
    let analysis = Analyzer::default()
        .process(&[unit])
        .expect("analysis fails");
    generate(&analysis).expect("generation fails")
}

// ----- reference interpreter ---------------------------------------------

#[derive(Debug, Clone)]
enum Value {
    Null,
    Int(i32),
    Bool(bool),
    Str(String),
    Obj(Rc<Object>),
    Frame(Rc<RefCell<Vec<Value>>>),
    Array(Rc<RefCell<Vec<Value>>>),
}

impl Value {
    fn as_int(&self) -> i32 {
        match self {
            Value::Int(n) => *n,
            other => panic!("expected int, got {other:?}"),
        }
    }

    fn as_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            other => panic!("expected boolean, got {other:?}"),
        }
    }
}

#[derive(Debug)]
struct Object {
    class: String,
    fields: RefCell<HashMap<String, Value>>,
}

fn new_object(class: &str) -> Value {
    Value::Obj(Rc::new(Object {
        class: class.to_string(),
        fields: RefCell::new(HashMap::new()),
    }))
}

struct Vm<'a> {
    program: &'a CompiledProgram,
}

impl<'a> Vm<'a> {
    fn new(program: &'a CompiledProgram) -> Self {
        Self { program }
    }

    /// Invoke `signature` on `receiver`, dispatching on its runtime class.
    /// `Err` carries an uncaught throwable.
    fn call(
        &self,
        receiver: Value,
        signature: &str,
        args: Vec<Value>,
    ) -> Result<Option<Value>, Value> {
        let class = match &receiver {
            Value::Obj(o) => o.class.clone(),
            other => panic!("cannot dispatch on {other:?}"),
        };
        let Some(compiled) = self.program.class(&class) else {
            // platform classes: constructor chaining lands here, a no-op
            return Ok(None);
        };
        let Some(m) = compiled.method(signature) else {
            return Ok(None);
        };
        self.run(m, receiver, args)
    }

    fn construct(&self, receiver: Value, class: &str, signature: &str, args: Vec<Value>) {
        let Some(compiled) = self.program.class(class) else {
            return;
        };
        let Some(ctor) = compiled
            .constructors
            .iter()
            .find(|c| c.signature == signature)
        else {
            return;
        };
        let body = CompiledMethod {
            name: "new".into(),
            signature: signature.to_string(),
            is_static: false,
            locals: ctor.locals,
            max_stack: ctor.max_stack,
            code: ctor.code.clone(),
            exceptions: ctor.exceptions.clone(),
        };
        self.run(&body, receiver, args).expect("constructor threw");
    }

    fn run(
        &self,
        method: &CompiledMethod,
        receiver: Value,
        args: Vec<Value>,
    ) -> Result<Option<Value>, Value> {
        let mut locals = vec![Value::Null; method.locals.max(1) as usize + args.len() + 1];
        locals[0] = receiver;
        for (i, arg) in args.into_iter().enumerate() {
            locals[1 + i] = arg;
        }
        let mut stack: Vec<Value> = Vec::new();
        let mut pc: usize = 0;

        macro_rules! pop {
            () => {
                stack.pop().expect("stack underflow")
            };
        }

        loop {
            assert!(pc < method.code.len(), "fell off the end of {}", method.name);
            let at = pc;
            pc += 1;
            match &method.code[at] {
                Instruction::ConstNull => stack.push(Value::Null),
                Instruction::ConstBool(b) => stack.push(Value::Bool(*b)),
                Instruction::ConstInt(n) => stack.push(Value::Int(*n)),
                Instruction::ConstStr(s) => stack.push(Value::Str(s.clone())),
                Instruction::Pop => {
                    pop!();
                }
                Instruction::Pop2 => {
                    pop!();
                    pop!();
                }
                Instruction::Dup { .. } => {
                    let v = pop!();
                    stack.push(v.clone());
                    stack.push(v);
                }
                Instruction::DupX1 { .. } => {
                    let b = pop!();
                    let a = pop!();
                    stack.push(b.clone());
                    stack.push(a);
                    stack.push(b);
                }
                Instruction::Load { slot, .. } => stack.push(locals[*slot as usize].clone()),
                Instruction::Store { slot, .. } => locals[*slot as usize] = pop!(),
                Instruction::NewFrame { size } => stack.push(Value::Frame(Rc::new(RefCell::new(
                    vec![Value::Null; *size as usize],
                )))),
                Instruction::FrameLoad { slot, .. } => {
                    let Value::Frame(f) = pop!() else {
                        panic!("frame expected");
                    };
                    let v = f.borrow()[*slot as usize].clone();
                    stack.push(v);
                }
                Instruction::FrameStore { slot, .. } => {
                    let Value::Frame(f) = pop!() else {
                        panic!("frame expected");
                    };
                    let v = pop!();
                    f.borrow_mut()[*slot as usize] = v;
                }
                Instruction::Add(NumKind::Int) => {
                    let (b, a) = (pop!().as_int(), pop!().as_int());
                    stack.push(Value::Int(a + b));
                }
                Instruction::Sub(NumKind::Int) => {
                    let (b, a) = (pop!().as_int(), pop!().as_int());
                    stack.push(Value::Int(a - b));
                }
                Instruction::Mul(NumKind::Int) => {
                    let (b, a) = (pop!().as_int(), pop!().as_int());
                    stack.push(Value::Int(a * b));
                }
                Instruction::Neg(NumKind::Int) => {
                    let a = pop!().as_int();
                    stack.push(Value::Int(-a));
                }
                Instruction::Cmp {
                    op,
                    kind: NumKind::Int,
                } => {
                    let (b, a) = (pop!().as_int(), pop!().as_int());
                    let r = match op {
                        CmpOp::Eq => a == b,
                        CmpOp::Ne => a != b,
                        CmpOp::Lt => a < b,
                        CmpOp::Le => a <= b,
                        CmpOp::Gt => a > b,
                        CmpOp::Ge => a >= b,
                    };
                    stack.push(Value::Bool(r));
                }
                Instruction::Not => {
                    let b = pop!().as_bool();
                    stack.push(Value::Bool(!b));
                }
                Instruction::Jump { target } => pc = *target as usize,
                Instruction::JumpIfTrue { target } => {
                    if pop!().as_bool() {
                        pc = *target as usize;
                    }
                }
                Instruction::JumpIfFalse { target } => {
                    if !pop!().as_bool() {
                        pc = *target as usize;
                    }
                }
                Instruction::JumpIfNull { target } => {
                    if matches!(pop!(), Value::Null) {
                        pc = *target as usize;
                    }
                }
                Instruction::JumpIfNonNull { target } => {
                    if !matches!(pop!(), Value::Null) {
                        pc = *target as usize;
                    }
                }
                Instruction::GetField { field, .. } => {
                    let Value::Obj(o) = pop!() else {
                        panic!("object expected");
                    };
                    let v = o
                        .fields
                        .borrow()
                        .get(field)
                        .cloned()
                        .unwrap_or(Value::Null);
                    stack.push(v);
                }
                Instruction::PutField { field, .. } => {
                    let v = pop!();
                    let Value::Obj(o) = pop!() else {
                        panic!("object expected");
                    };
                    o.fields.borrow_mut().insert(field.clone(), v);
                }
                Instruction::New { class } => stack.push(new_object(class)),
                Instruction::ArrayLoad { .. } => {
                    let i = pop!().as_int();
                    let Value::Array(a) = pop!() else {
                        panic!("array expected");
                    };
                    let v = a.borrow()[i as usize].clone();
                    stack.push(v);
                }
                Instruction::ArrayStore { .. } => {
                    let v = pop!();
                    let i = pop!().as_int();
                    let Value::Array(a) = pop!() else {
                        panic!("array expected");
                    };
                    a.borrow_mut()[i as usize] = v;
                }
                Instruction::ArrayLength => {
                    let Value::Array(a) = pop!() else {
                        panic!("array expected");
                    };
                    let n = a.borrow().len() as i32;
                    stack.push(Value::Int(n));
                }
                Instruction::InvokeVirtual {
                    method: sig, args, ..
                } => {
                    let mut argv: Vec<Value> = (0..*args).map(|_| pop!()).collect();
                    argv.reverse();
                    let receiver = pop!();
                    match self.call(receiver, sig, argv) {
                        Ok(Some(v)) => stack.push(v),
                        Ok(None) => {}
                        Err(exc) => pc = handler_for(method, at, &mut stack, exc),
                    }
                }
                Instruction::InvokeCtor {
                    class,
                    signature,
                    args,
                } => {
                    let mut argv: Vec<Value> = (0..*args).map(|_| pop!()).collect();
                    argv.reverse();
                    let receiver = pop!();
                    self.construct(receiver, class, signature, argv);
                }
                Instruction::ReturnValue { .. } => return Ok(Some(pop!())),
                Instruction::ReturnVoid => return Ok(None),
                Instruction::Throw => {
                    let exc = pop!();
                    pc = handler_for(method, at, &mut stack, exc);
                }
                other => panic!("instruction not supported by this interpreter: {other:?}"),
            }
        }
    }

}

/// Find the catch handler covering `at`, reset the stack to hold the
/// throwable and return the handler target.
fn handler_for(method: &CompiledMethod, at: usize, stack: &mut Vec<Value>, exc: Value) -> usize {
    for entry in &method.exceptions {
        if (entry.start as usize) <= at && at < (entry.end as usize) {
            stack.clear();
            stack.push(exc);
            return entry.handler as usize;
        }
    }
    panic!("uncaught throwable")
}

fn run_method(
    program: &CompiledProgram,
    class: &str,
    signature: &str,
    args: Vec<Value>,
) -> Option<Value> {
    Vm::new(program)
        .call(new_object(class), signature, args)
        .expect("uncaught throwable")
}

// ----- tests --------------------------------------------------------------

#[test]
fn arithmetic_method_computes() {
    let mut ids = NodeIdGen::new();
    let body = block(vec![ret(Expression::binary(
        BinaryOp::Add,
        Expression::id("a", lc()),
        Expression::id("b", lc()),
        lc(),
    ))]);
    let add = method(
        &mut ids,
        "add",
        vec![("a", int_spec()), ("b", int_spec())],
        Some(int_spec()),
        body,
    );
    let decl = class(&mut ids, "Calc", vec![add]);
    let program = compile(vec![TopLevel::Class(decl)]);

    let result = run_method(
        &program,
        "Calc",
        "add(int,int)",
        vec![Value::Int(1), Value::Int(2)],
    );
    assert_eq!(result.unwrap().as_int(), 3);

    // the output survives serialization intact
    let json = serde_json::to_string(&program).unwrap();
    let back: CompiledProgram = serde_json::from_str(&json).unwrap();
    let result = run_method(
        &back,
        "Calc",
        "add(int,int)",
        vec![Value::Int(20), Value::Int(22)],
    );
    assert_eq!(result.unwrap().as_int(), 42);
}

#[test]
fn while_loop_branches_resolve() {
    let mut ids = NodeIdGen::new();
    let body = block(vec![
        Statement::expression(assign("s", Expression::int(0, lc()))),
        Statement::expression(assign("i", Expression::int(0, lc()))),
        Statement::While(WhileStatement {
            condition: Expression::binary(
                BinaryOp::Lt,
                Expression::id("i", lc()),
                Expression::id("n", lc()),
                lc(),
            ),
            body: block(vec![
                Statement::expression(assign(
                    "s",
                    Expression::binary(
                        BinaryOp::Add,
                        Expression::id("s", lc()),
                        Expression::id("i", lc()),
                        lc(),
                    ),
                )),
                Statement::expression(assign(
                    "i",
                    Expression::binary(
                        BinaryOp::Add,
                        Expression::id("i", lc()),
                        Expression::int(1, lc()),
                        lc(),
                    ),
                )),
            ]),
            loc: lc(),
        }),
        ret(Expression::id("s", lc())),
    ]);
    let below = method(
        &mut ids,
        "below",
        vec![("n", int_spec())],
        Some(int_spec()),
        body,
    );
    let decl = class(&mut ids, "Sums", vec![below]);
    let program = compile(vec![TopLevel::Class(decl)]);

    let result = run_method(&program, "Sums", "below(int)", vec![Value::Int(5)]);
    assert_eq!(result.unwrap().as_int(), 10);
    let result = run_method(&program, "Sums", "below(int)", vec![Value::Int(0)]);
    assert_eq!(result.unwrap().as_int(), 0);
}

#[test]
fn short_circuit_and_skips_the_right_side() {
    let mut ids = NodeIdGen::new();
    let body = block(vec![ret(Expression::binary(
        BinaryOp::And,
        Expression::id("a", lc()),
        Expression::id("b", lc()),
        lc(),
    ))]);
    let bool_spec = TypeSpec::primitive(PrimitiveKind::Boolean);
    let both = method(
        &mut ids,
        "both",
        vec![("a", bool_spec.clone()), ("b", bool_spec.clone())],
        Some(bool_spec),
        body,
    );
    let decl = class(&mut ids, "Logic", vec![both]);
    let program = compile(vec![TopLevel::Class(decl)]);

    let sig = "both(boolean,boolean)";
    let t = Value::Bool(true);
    let f = Value::Bool(false);
    assert!(run_method(&program, "Logic", sig, vec![t.clone(), t.clone()])
        .unwrap()
        .as_bool());
    assert!(!run_method(&program, "Logic", sig, vec![t, f.clone()])
        .unwrap()
        .as_bool());
    assert!(!run_method(&program, "Logic", sig, vec![f.clone(), f])
        .unwrap()
        .as_bool());
}

#[test]
fn closures_capture_through_frame_objects() {
    let mut ids = NodeIdGen::new();
    let iface = InterfaceDecl {
        node_id: ids.fresh(),
        modifiers: Modifiers::PUBLIC,
        name: "Adder".into(),
        interfaces: Vec::new(),
        methods: vec![InterfaceMethodDecl {
            node_id: ids.fresh(),
            name: "apply".into(),
            params: vec![Parameter::new("k", int_spec(), lc())],
            return_type: Some(int_spec()),
            loc: lc(),
        }],
        loc: lc(),
    };
    let closure = Expression::Closure(ClosureExpression {
        interface: TypeSpec::named("Adder"),
        method_name: "apply".into(),
        params: vec![Parameter::new("k", int_spec(), lc())],
        body: block(vec![ret(Expression::binary(
            BinaryOp::Add,
            Expression::id("n", lc()),
            Expression::id("k", lc()),
            lc(),
        ))]),
        loc: lc(),
    });
    let body = block(vec![
        Statement::expression(assign("n", Expression::int(10, lc()))),
        Statement::expression(assign("f", closure)),
        ret(call(
            Expression::id("f", lc()),
            "apply",
            vec![Expression::int(5, lc())],
        )),
    ]);
    let bump = method(&mut ids, "bump", vec![], Some(int_spec()), body);
    let decl = class(&mut ids, "Counter", vec![bump]);
    let program = compile(vec![TopLevel::Interface(iface), TopLevel::Class(decl)]);

    // the closure got its own class with a capture-storing constructor
    let synthesized = program.class("CounterClosure0").expect("closure class");
    assert_eq!(synthesized.interfaces, vec!["Adder".to_string()]);
    assert!(synthesized.fields.iter().any(|f| f.name == "frame0"));
    assert_eq!(synthesized.constructors.len(), 1);
    assert!(synthesized.constructors[0].signature.contains("frame"));

    let result = run_method(&program, "Counter", "bump()", vec![]);
    assert_eq!(result.unwrap().as_int(), 15);
}

#[test]
fn try_catch_routes_thrown_values() {
    let mut ids = NodeIdGen::new();
    let body = block(vec![
        Statement::Try(TryStatement {
            body: block(vec![Statement::Throw(ThrowStatement {
                value: Expression::New(NewObject {
                    type_spec: TypeSpec::named("Throwable"),
                    args: vec![],
                    loc: lc(),
                }),
                loc: lc(),
            })]),
            catches: vec![CatchClause {
                var_name: "e".into(),
                var_type: TypeSpec::named("Throwable"),
                body: block(vec![ret(Expression::int(7, lc()))]),
                loc: lc(),
            }],
            loc: lc(),
        }),
        ret(Expression::int(0, lc())),
    ]);
    let shield = method(&mut ids, "shield", vec![], Some(int_spec()), body);
    let decl = class(&mut ids, "Guard", vec![shield]);
    let program = compile(vec![TopLevel::Class(decl)]);

    let compiled = program.class("Guard").unwrap().method("shield()").unwrap();
    assert_eq!(compiled.exceptions.len(), 1);
    let entry = &compiled.exceptions[0];
    assert_eq!(entry.class, "opal.lang.Throwable");
    assert!(entry.start < entry.end);
    assert!(entry.handler >= entry.end);

    let result = run_method(&program, "Guard", "shield()", vec![]);
    assert_eq!(result.unwrap().as_int(), 7);
}

#[test]
fn foreach_over_an_array_sums_elements() {
    let mut ids = NodeIdGen::new();
    let body = block(vec![
        Statement::expression(assign("s", Expression::int(0, lc()))),
        Statement::Foreach(ForeachStatement {
            var_name: "v".into(),
            var_type: int_spec(),
            collection: Expression::id("values", lc()),
            body: block(vec![Statement::expression(assign(
                "s",
                Expression::binary(
                    BinaryOp::Add,
                    Expression::id("s", lc()),
                    Expression::id("v", lc()),
                    lc(),
                ),
            ))]),
            loc: lc(),
        }),
        ret(Expression::id("s", lc())),
    ]);
    let total = method(
        &mut ids,
        "total",
        vec![(
            "values",
            TypeSpec::array_of(TypeName::Primitive(PrimitiveKind::Int), 1),
        )],
        Some(int_spec()),
        body,
    );
    let decl = class(&mut ids, "Fold", vec![total]);
    let program = compile(vec![TopLevel::Class(decl)]);

    let values = Value::Array(Rc::new(RefCell::new(vec![
        Value::Int(1),
        Value::Int(2),
        Value::Int(3),
    ])));
    let result = run_method(&program, "Fold", "total(int[])", vec![values]);
    assert_eq!(result.unwrap().as_int(), 6);
}

#[test]
fn foreach_over_a_collection_drives_its_iterator() {
    let mut ids = NodeIdGen::new();

    // the collection is its own iterator, counting hasNext calls
    let init = method(
        &mut ids,
        "init",
        vec![],
        None,
        block(vec![
            set_field("idx", Expression::int(0, lc())),
            set_field("checks", Expression::int(0, lc())),
        ]),
    );
    let iterator = method(
        &mut ids,
        "iterator",
        vec![],
        Some(TypeSpec::named("Feed")),
        block(vec![ret(Expression::CurrentInstance(lc()))]),
    );
    let has_next = method(
        &mut ids,
        "hasNext",
        vec![],
        Some(TypeSpec::primitive(PrimitiveKind::Boolean)),
        block(vec![
            set_field(
                "checks",
                Expression::binary(
                    BinaryOp::Add,
                    this_field("checks"),
                    Expression::int(1, lc()),
                    lc(),
                ),
            ),
            ret(Expression::binary(
                BinaryOp::Lt,
                Expression::id("idx", lc()),
                Expression::int(3, lc()),
                lc(),
            )),
        ]),
    );
    let next = method(
        &mut ids,
        "next",
        vec![],
        Some(int_spec()),
        block(vec![
            Statement::expression(assign("v", this_field("idx"))),
            set_field(
                "idx",
                Expression::binary(
                    BinaryOp::Add,
                    Expression::id("v", lc()),
                    Expression::int(1, lc()),
                    lc(),
                ),
            ),
            ret(Expression::id("v", lc())),
        ]),
    );
    let tally = method(
        &mut ids,
        "tally",
        vec![],
        Some(int_spec()),
        block(vec![ret(this_field("checks"))]),
    );
    let mut feed = class(&mut ids, "Feed", vec![init, iterator, has_next, next, tally]);
    for name in ["idx", "checks"] {
        feed.fields.push(FieldDecl {
            node_id: ids.fresh(),
            modifiers: Modifiers::PUBLIC,
            name: name.into(),
            type_spec: int_spec(),
            loc: lc(),
        });
    }

    let body = block(vec![
        Statement::expression(assign(
            "f",
            Expression::New(NewObject {
                type_spec: TypeSpec::named("Feed"),
                args: vec![],
                loc: lc(),
            }),
        )),
        Statement::expression(call(Expression::id("f", lc()), "init", vec![])),
        Statement::expression(assign("s", Expression::int(0, lc()))),
        Statement::Foreach(ForeachStatement {
            var_name: "v".into(),
            var_type: int_spec(),
            collection: Expression::id("f", lc()),
            body: block(vec![Statement::expression(assign(
                "s",
                Expression::binary(
                    BinaryOp::Add,
                    Expression::id("s", lc()),
                    Expression::id("v", lc()),
                    lc(),
                ),
            ))]),
            loc: lc(),
        }),
        ret(Expression::binary(
            BinaryOp::Add,
            Expression::binary(
                BinaryOp::Mul,
                Expression::id("s", lc()),
                Expression::int(10, lc()),
                lc(),
            ),
            call(Expression::id("f", lc()), "tally", vec![]),
            lc(),
        )),
    ]);
    let walk = method(&mut ids, "walk", vec![], Some(int_spec()), body);
    let decl = class(&mut ids, "Walker", vec![walk]);
    let program = compile(vec![TopLevel::Class(feed), TopLevel::Class(decl)]);

    // elements 0 + 1 + 2, and hasNext answers three trues then one false
    let result = run_method(&program, "Walker", "walk()", vec![]);
    assert_eq!(result.unwrap().as_int(), 34);
}

#[test]
fn select_compares_case_values_in_order() {
    let mut ids = NodeIdGen::new();
    let body = block(vec![
        Statement::Select(SelectStatement {
            scrutinee: Expression::id("n", lc()),
            cases: vec![
                (
                    vec![Expression::int(1, lc())],
                    block(vec![ret(Expression::int(10, lc()))]),
                ),
                (
                    vec![Expression::int(2, lc()), Expression::int(3, lc())],
                    block(vec![ret(Expression::int(20, lc()))]),
                ),
            ],
            else_block: Some(block(vec![ret(Expression::int(30, lc()))])),
            loc: lc(),
        }),
        ret(Expression::int(0, lc())),
    ]);
    let pick = method(
        &mut ids,
        "pick",
        vec![("n", int_spec())],
        Some(int_spec()),
        body,
    );
    let decl = class(&mut ids, "Picker", vec![pick]);
    let program = compile(vec![TopLevel::Class(decl)]);

    for (input, expected) in [(1, 10), (2, 20), (3, 20), (9, 30)] {
        let result = run_method(&program, "Picker", "pick(int)", vec![Value::Int(input)]);
        assert_eq!(result.unwrap().as_int(), expected, "pick({input})");
    }
}

#[test]
fn compiled_methods_report_plausible_limits() {
    let mut ids = NodeIdGen::new();
    let body = block(vec![ret(Expression::binary(
        BinaryOp::Mul,
        Expression::binary(
            BinaryOp::Add,
            Expression::id("a", lc()),
            Expression::id("b", lc()),
            lc(),
        ),
        Expression::int(2, lc()),
        lc(),
    ))]);
    let f = method(
        &mut ids,
        "f",
        vec![("a", int_spec()), ("b", int_spec())],
        Some(int_spec()),
        body,
    );
    let decl = class(&mut ids, "Limits", vec![f]);
    let program = compile(vec![TopLevel::Class(decl)]);
    let m = program.class("Limits").unwrap().method("f(int,int)").unwrap();
    // receiver + two int args
    assert_eq!(m.locals, 3);
    assert_eq!(m.max_stack, 2);
    assert!(m.code.iter().any(|i| matches!(i, Instruction::ReturnValue { .. })));
}
