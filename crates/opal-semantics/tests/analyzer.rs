//! End-to-end analysis over hand-built syntax trees.

use opal_semantics::ir::{IrBinOp, IrExpr, IrStmt};
use opal_semantics::{Analyzer, SemanticErrorKind, TypeRef};
use opal_syntax::{
    BinaryOp, BlockStatement, ClassDecl, ClosureExpression, CompilationUnit, ConstructorDecl,
    Expression, FieldDecl, ImportDecl, InterfaceDecl, InterfaceMethodDecl, Location, MethodCall,
    MethodDecl, Modifiers, NodeIdGen, Parameter, PrimitiveKind, ReturnStatement, Statement,
    TopLevel, TypeSpec, WhileStatement,
};

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

fn unit(source_file: &str, toplevels: Vec<TopLevel>) -> CompilationUnit {
    let mut u = CompilationUnit::new(source_file);
    u.toplevels = toplevels;
    u
}

#[test]
fn method_body_becomes_typed_ir() {
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
    let units = [unit("calc.opl", vec![TopLevel::Class(decl)])];
    let analysis = Analyzer::default().process(&units).expect("analysis fails");

    let calc = analysis.table.lookup("Calc").expect("class missing");
    let add = &analysis.table.class(calc).methods[0];
    assert_eq!(add.params, vec![TypeRef::INT, TypeRef::INT]);
    let body = add.body.as_ref().expect("no body checked");
    let IrStmt::Block(stmts) = &body.block else {
        panic!("body is not a block");
    };
    // explicit return plus the synthesized trailing one
    assert_eq!(stmts.len(), 2);
    let IrStmt::Return { value: Some(v) } = &stmts[0] else {
        panic!("first statement is not a return");
    };
    assert!(matches!(
        v,
        IrExpr::Binary {
            op: IrBinOp::Add,
            ty: TypeRef::INT,
            ..
        }
    ));
}

#[test]
fn script_unit_synthesizes_entry_points() {
    let stmt = Statement::expression(assign("x", Expression::int(41, lc())));
    let units = [unit("fib.opl", vec![TopLevel::Statement(stmt)])];
    let analysis = Analyzer::default().process(&units).expect("analysis fails");

    let main = analysis.table.lookup("fibMain").expect("no main class");
    let symbol = analysis.table.class(main);
    let run = symbol
        .methods
        .iter()
        .find(|m| m.name == "run")
        .expect("run missing");
    assert!(!run.modifiers.is_static());
    assert!(run.body.is_some());

    let entry = symbol
        .methods
        .iter()
        .find(|m| m.name == "main")
        .expect("main missing");
    assert!(entry.modifiers.is_static());
    let body = entry.body.as_ref().expect("main has no body");
    let IrStmt::Block(stmts) = &body.block else {
        panic!("main body is not a block");
    };
    // new instance, call run(args), return
    assert!(matches!(
        &stmts[0],
        IrStmt::Expression(IrExpr::Call { .. })
    ));
    assert!(matches!(&stmts[1], IrStmt::Return { value: None }));
}

#[test]
fn duplicate_class_reports_and_first_wins() {
    let mut ids = NodeIdGen::new();
    let first = class(&mut ids, "Twice", vec![]);
    let second = class(&mut ids, "Twice", vec![]);
    let units = [unit(
        "dup.opl",
        vec![TopLevel::Class(first), TopLevel::Class(second)],
    )];
    let failure = Analyzer::default().process(&units).unwrap_err();
    let dups: Vec<_> = failure
        .errors
        .iter()
        .filter(|e| matches!(e.kind, SemanticErrorKind::DuplicateClass { .. }))
        .collect();
    assert_eq!(dups.len(), 1);
}

#[test]
fn cyclic_inheritance_is_reported_for_every_participant() {
    let mut ids = NodeIdGen::new();
    let mut a = class(&mut ids, "A", vec![]);
    a.super_class = Some(TypeSpec::named("B"));
    let mut b = class(&mut ids, "B", vec![]);
    b.super_class = Some(TypeSpec::named("A"));
    let units = [unit("cyc.opl", vec![TopLevel::Class(a), TopLevel::Class(b)])];
    let failure = Analyzer::default().process(&units).unwrap_err();
    let cyclic: Vec<_> = failure
        .errors
        .iter()
        .filter(|e| matches!(e.kind, SemanticErrorKind::CyclicInheritance { .. }))
        .collect();
    assert_eq!(cyclic.len(), 2);
}

#[test]
fn mutually_referencing_field_types_are_not_a_cycle() {
    let mut ids = NodeIdGen::new();
    let mut left = class(&mut ids, "Left", vec![]);
    left.fields.push(FieldDecl {
        node_id: ids.fresh(),
        modifiers: Modifiers::PUBLIC,
        name: "partner".into(),
        type_spec: TypeSpec::named("Right"),
        loc: lc(),
    });
    let mut right = class(&mut ids, "Right", vec![]);
    right.fields.push(FieldDecl {
        node_id: ids.fresh(),
        modifiers: Modifiers::PUBLIC,
        name: "partner".into(),
        type_spec: TypeSpec::named("Left"),
        loc: lc(),
    });
    let units = [unit(
        "pair.opl",
        vec![TopLevel::Class(left), TopLevel::Class(right)],
    )];
    // only super/interface edges count for cyclicity
    let analysis = Analyzer::default().process(&units).expect("analysis fails");
    let left = analysis.table.lookup("Left").expect("class missing");
    assert_eq!(analysis.table.class(left).fields.len(), 1);
}

#[test]
fn duplicate_method_keeps_the_first_declaration() {
    let mut ids = NodeIdGen::new();
    let first = method(
        &mut ids,
        "pick",
        vec![("n", int_spec())],
        Some(int_spec()),
        block(vec![ret(Expression::int(1, lc()))]),
    );
    let second = method(
        &mut ids,
        "pick",
        vec![("n", int_spec())],
        Some(int_spec()),
        block(vec![ret(Expression::int(2, lc()))]),
    );
    let decl = class(&mut ids, "Chooser", vec![first, second]);
    let units = [unit("choose.opl", vec![TopLevel::Class(decl)])];
    let failure = Analyzer::default().process(&units).unwrap_err();
    let dups: Vec<_> = failure
        .errors
        .iter()
        .filter(|e| matches!(e.kind, SemanticErrorKind::DuplicateMethod { .. }))
        .collect();
    assert_eq!(dups.len(), 1);
}

#[test]
fn delegate_field_forwards_interface_methods() {
    let mut ids = NodeIdGen::new();
    let iface = InterfaceDecl {
        node_id: ids.fresh(),
        modifiers: Modifiers::PUBLIC,
        name: "Greeter".into(),
        interfaces: Vec::new(),
        methods: vec![InterfaceMethodDecl {
            node_id: ids.fresh(),
            name: "greet".into(),
            params: vec![],
            return_type: Some(int_spec()),
            loc: lc(),
        }],
        loc: lc(),
    };
    let mut host = class(&mut ids, "Host", vec![]);
    host.fields.push(FieldDecl {
        node_id: ids.fresh(),
        modifiers: Modifiers::PUBLIC | Modifiers::DELEGATE,
        name: "inner".into(),
        type_spec: TypeSpec::named("Greeter"),
        loc: lc(),
    });
    let units = [unit(
        "del.opl",
        vec![TopLevel::Interface(iface), TopLevel::Class(host)],
    )];
    let analysis = Analyzer::default().process(&units).expect("analysis fails");

    let host = analysis.table.lookup("Host").expect("class missing");
    let greet = analysis
        .table
        .class(host)
        .methods
        .iter()
        .find(|m| m.name == "greet")
        .expect("forwarder missing");
    let body = greet.body.as_ref().expect("forwarder has no body");
    let IrStmt::Block(stmts) = &body.block else {
        panic!("forwarder body is not a block");
    };
    let IrStmt::Return { value: Some(call) } = &stmts[0] else {
        panic!("forwarder does not return the call");
    };
    let IrExpr::Call { target, .. } = call else {
        panic!("forwarder does not call through");
    };
    assert!(matches!(**target, IrExpr::RefField { .. }));
}

#[test]
fn delegation_leaves_declared_methods_alone() {
    let mut ids = NodeIdGen::new();
    let iface = InterfaceDecl {
        node_id: ids.fresh(),
        modifiers: Modifiers::PUBLIC,
        name: "Duo".into(),
        interfaces: Vec::new(),
        methods: vec![
            InterfaceMethodDecl {
                node_id: ids.fresh(),
                name: "first".into(),
                params: vec![],
                return_type: Some(int_spec()),
                loc: lc(),
            },
            InterfaceMethodDecl {
                node_id: ids.fresh(),
                name: "second".into(),
                params: vec![],
                return_type: Some(int_spec()),
                loc: lc(),
            },
        ],
        loc: lc(),
    };
    let own = method(
        &mut ids,
        "first",
        vec![],
        Some(int_spec()),
        block(vec![ret(Expression::int(5, lc()))]),
    );
    let mut host = class(&mut ids, "Host", vec![own]);
    host.fields.push(FieldDecl {
        node_id: ids.fresh(),
        modifiers: Modifiers::PUBLIC | Modifiers::DELEGATE,
        name: "inner".into(),
        type_spec: TypeSpec::named("Duo"),
        loc: lc(),
    });
    let units = [unit(
        "duo.opl",
        vec![TopLevel::Interface(iface), TopLevel::Class(host)],
    )];
    let analysis = Analyzer::default().process(&units).expect("analysis fails");

    let host = analysis.table.lookup("Host").expect("class missing");
    let methods = &analysis.table.class(host).methods;
    assert_eq!(methods.iter().filter(|m| m.name == "first").count(), 1);

    // the declared method keeps its own body
    let first = methods.iter().find(|m| m.name == "first").unwrap();
    let IrStmt::Block(stmts) = &first.body.as_ref().unwrap().block else {
        panic!("declared body is not a block");
    };
    assert!(
        matches!(&stmts[0], IrStmt::Return { value: Some(v) } if !matches!(v, IrExpr::Call { .. }))
    );

    // only the undeclared method gets a forwarder
    let second = methods
        .iter()
        .find(|m| m.name == "second")
        .expect("forwarder missing");
    let IrStmt::Block(stmts) = &second.body.as_ref().unwrap().block else {
        panic!("forwarder body is not a block");
    };
    assert!(matches!(
        &stmts[0],
        IrStmt::Return {
            value: Some(IrExpr::Call { .. })
        }
    ));
}

#[test]
fn closures_close_the_frames_they_capture() {
    let mut ids = NodeIdGen::new();
    let iface = InterfaceDecl {
        node_id: ids.fresh(),
        modifiers: Modifiers::PUBLIC,
        name: "Supplier".into(),
        interfaces: Vec::new(),
        methods: vec![InterfaceMethodDecl {
            node_id: ids.fresh(),
            name: "get".into(),
            params: vec![],
            return_type: Some(int_spec()),
            loc: lc(),
        }],
        loc: lc(),
    };
    let closure = Expression::Closure(ClosureExpression {
        interface: TypeSpec::named("Supplier"),
        method_name: "get".into(),
        params: vec![],
        body: block(vec![ret(Expression::id("n", lc()))]),
        loc: lc(),
    });
    let body = block(vec![
        Statement::expression(assign("n", Expression::int(7, lc()))),
        ret(Expression::Call(MethodCall {
            target: Box::new(closure),
            name: "get".into(),
            args: vec![],
            loc: lc(),
        })),
    ]);
    let value = method(&mut ids, "value", vec![], Some(int_spec()), body);
    let holder = class(&mut ids, "Holder", vec![value]);
    let units = [unit(
        "clo.opl",
        vec![TopLevel::Interface(iface), TopLevel::Class(holder)],
    )];
    let analysis = Analyzer::default().process(&units).expect("analysis fails");

    let holder = analysis.table.lookup("Holder").expect("class missing");
    let value = analysis
        .table
        .class(holder)
        .methods
        .iter()
        .find(|m| m.name == "value")
        .expect("method missing");
    let body = value.body.as_ref().expect("no body checked");
    assert!(body.frame.closed, "captured frame must be closed");

    // dig out the closure and check what it captured
    fn find_closure(stmt: &IrStmt) -> Option<&opal_semantics::ir::IrClosure> {
        match stmt {
            IrStmt::Block(stmts) => stmts.iter().find_map(find_closure),
            IrStmt::Return {
                value: Some(IrExpr::Call { target, .. }),
            } => match &**target {
                IrExpr::NewClosure(c) => Some(c),
                _ => None,
            },
            _ => None,
        }
    }
    let closure = find_closure(&body.block).expect("closure not in IR");
    assert_eq!(closure.frame.depth, 1);
    assert!(closure.has_outer);
    assert!(!closure.frame.closed);
}

#[test]
fn while_loops_lower_to_pretest_loops() {
    let mut ids = NodeIdGen::new();
    let body = block(vec![
        Statement::expression(assign("i", Expression::int(0, lc()))),
        Statement::While(WhileStatement {
            condition: Expression::binary(
                BinaryOp::Lt,
                Expression::id("i", lc()),
                Expression::id("n", lc()),
                lc(),
            ),
            body: block(vec![Statement::expression(assign(
                "i",
                Expression::binary(
                    BinaryOp::Add,
                    Expression::id("i", lc()),
                    Expression::int(1, lc()),
                    lc(),
                ),
            ))]),
            loc: lc(),
        }),
        ret(Expression::id("i", lc())),
    ]);
    let count = method(
        &mut ids,
        "count",
        vec![("n", int_spec())],
        Some(int_spec()),
        body,
    );
    let decl = class(&mut ids, "Looper", vec![count]);
    let units = [unit("loop.opl", vec![TopLevel::Class(decl)])];
    let analysis = Analyzer::default().process(&units).expect("analysis fails");

    let looper = analysis.table.lookup("Looper").expect("class missing");
    let count = &analysis.table.class(looper).methods[0];
    let IrStmt::Block(stmts) = &count.body.as_ref().unwrap().block else {
        panic!("body is not a block");
    };
    assert!(stmts.iter().any(|s| matches!(s, IrStmt::Loop { .. })));
}

#[test]
fn default_namespace_resolves_platform_names() {
    let mut ids = NodeIdGen::new();
    let body = block(vec![ret(Expression::Call(MethodCall {
        target: Box::new(Expression::id("s", lc())),
        name: "length".into(),
        args: vec![],
        loc: lc(),
    }))]);
    let measure = method(
        &mut ids,
        "measure",
        vec![("s", TypeSpec::named("String"))],
        Some(int_spec()),
        body,
    );
    let decl = class(&mut ids, "Meter", vec![measure]);
    let units = [unit("imp.opl", vec![TopLevel::Class(decl)])];
    let analysis = Analyzer::default().process(&units).expect("analysis fails");

    let meter = analysis.table.lookup("Meter").expect("class missing");
    let measure = &analysis.table.class(meter).methods[0];
    let string = analysis.table.lookup("opal.lang.String").unwrap();
    assert_eq!(measure.params, vec![TypeRef::Class(string)]);
}

#[test]
fn module_units_see_their_sibling_classes() {
    let mut ids = NodeIdGen::new();
    let box_decl = class(&mut ids, "Box", vec![]);
    let mut first = unit("box.opl", vec![TopLevel::Class(box_decl)]);
    first.module_name = Some("store".into());

    let body = block(vec![Statement::Return(ReturnStatement {
        value: None,
        loc: lc(),
    })]);
    let take = method(
        &mut ids,
        "take",
        vec![("b", TypeSpec::named("Box"))],
        None,
        body,
    );
    let user = class(&mut ids, "User", vec![take]);
    let mut second = unit("user.opl", vec![TopLevel::Class(user)]);
    second.module_name = Some("store".into());

    let analysis = Analyzer::default()
        .process(&[first, second])
        .expect("analysis fails");
    let user = analysis.table.lookup("store.User").expect("class missing");
    let take = &analysis.table.class(user).methods[0];
    let box_id = analysis.table.lookup("store.Box").unwrap();
    assert_eq!(take.params, vec![TypeRef::Class(box_id)]);
}

#[test]
fn single_type_imports_beat_the_builtin_wildcards() {
    let mut ids = NodeIdGen::new();
    let list_decl = class(&mut ids, "List", vec![]);
    let mut first = unit("mylist.opl", vec![TopLevel::Class(list_decl)]);
    first.module_name = Some("my".into());

    let body = block(vec![Statement::Return(ReturnStatement {
        value: None,
        loc: lc(),
    })]);
    let keep = method(
        &mut ids,
        "keep",
        vec![("l", TypeSpec::named("List"))],
        None,
        body,
    );
    let user = class(&mut ids, "Keeper", vec![keep]);
    let mut second = unit("keeper.opl", vec![TopLevel::Class(user)]);
    second.imports.push(ImportDecl::single("List", "my.List", lc()));

    let analysis = Analyzer::default()
        .process(&[first, second])
        .expect("analysis fails");
    let keeper = analysis.table.lookup("Keeper").expect("class missing");
    let keep = &analysis.table.class(keeper).methods[0];
    // the explicit import shadows opal.util.List
    let mine = analysis.table.lookup("my.List").unwrap();
    assert_eq!(keep.params, vec![TypeRef::Class(mine)]);
}

#[test]
fn returning_a_value_from_void_is_rejected() {
    let mut ids = NodeIdGen::new();
    let body = block(vec![ret(Expression::int(1, lc()))]);
    let fire = method(&mut ids, "fire", vec![], None, body);
    let decl = class(&mut ids, "Noisy", vec![fire]);
    let units = [unit("void.opl", vec![TopLevel::Class(decl)])];
    let failure = Analyzer::default().process(&units).unwrap_err();
    assert!(failure
        .errors
        .iter()
        .any(|e| e.kind == SemanticErrorKind::CannotReturnValue));
}

#[test]
fn incompatible_initializer_is_rejected() {
    let mut ids = NodeIdGen::new();
    let body = block(vec![
        Statement::LocalVar(opal_syntax::LocalVarStatement {
            name: "flag".into(),
            type_spec: TypeSpec::primitive(PrimitiveKind::Boolean),
            init: Some(Expression::int(3, lc())),
            loc: lc(),
        }),
        Statement::Return(ReturnStatement {
            value: None,
            loc: lc(),
        }),
    ]);
    let check = method(&mut ids, "check", vec![], None, body);
    let decl = class(&mut ids, "Strict", vec![check]);
    let units = [unit("bad.opl", vec![TopLevel::Class(decl)])];
    let failure = Analyzer::default().process(&units).unwrap_err();
    assert!(failure
        .errors
        .iter()
        .any(|e| matches!(e.kind, SemanticErrorKind::IncompatibleType { .. })));
}

#[test]
fn explicit_constructors_resolve_super_calls() {
    let mut ids = NodeIdGen::new();
    let mut base = class(&mut ids, "Base", vec![]);
    base.constructors.push(ConstructorDecl {
        node_id: ids.fresh(),
        modifiers: Modifiers::PUBLIC,
        params: vec![Parameter::new("n", int_spec(), lc())],
        super_args: vec![],
        body: block(vec![]),
        loc: lc(),
    });
    let mut derived = class(&mut ids, "Derived", vec![]);
    derived.super_class = Some(TypeSpec::named("Base"));
    derived.constructors.push(ConstructorDecl {
        node_id: ids.fresh(),
        modifiers: Modifiers::PUBLIC,
        params: vec![],
        super_args: vec![Expression::int(5, lc())],
        body: block(vec![]),
        loc: lc(),
    });
    let units = [unit(
        "ctor.opl",
        vec![TopLevel::Class(base), TopLevel::Class(derived)],
    )];
    let analysis = Analyzer::default().process(&units).expect("analysis fails");

    let derived = analysis.table.lookup("Derived").expect("class missing");
    let ctor = &analysis.table.class(derived).constructors[0];
    let (super_ctor, args) = ctor.super_call.as_ref().expect("super call unresolved");
    let base = analysis.table.lookup("Base").unwrap();
    assert_eq!(super_ctor.class, base);
    assert_eq!(args.len(), 1);
    assert!(ctor.body.is_some());
}
