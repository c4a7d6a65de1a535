//! End-to-end pipeline tests: legality checking first, then scheduling
//!
//! These drive the two halves together the way a front end would. The
//! declaration is built as an AST and vetted by the checker; only a clean
//! program is lowered (by hand here) into a registry and run.

use weft::checker::{check, CheckFailure};
use weft::runtime::{
    ActionDef, ComponentType, FieldSlot, InitializerDef, Op, OutputStream, ReactionDef, Registry,
    Scheduler, Value,
};
use weft_ast::*;

fn loc(line: u32) -> Loc {
    Loc::new("pump.weft", line)
}

/// A pump that fires its level out a push port while below capacity
fn pump_component() -> Program {
    let precondition = Expr::new(
        ExprKind::Binary {
            op: BinaryOp::Lt,
            left: Box::new(Expr::new(ExprKind::Ident("level".into()), loc(4))),
            right: Box::new(Expr::literal(Literal::Int(3), loc(4))),
        },
        loc(4),
    );
    let fill = Stmt::new(
        StmtKind::Activate {
            values: vec![Expr::new(ExprKind::Ident("level".into()), loc(5))],
            body: Block::new(vec![Stmt::new(
                StmtKind::Assign {
                    target: Expr::new(ExprKind::Ident("level".into()), loc(6)),
                    value: Expr::new(
                        ExprKind::Binary {
                            op: BinaryOp::Add,
                            left: Box::new(Expr::new(ExprKind::Ident("level".into()), loc(6))),
                            right: Box::new(Expr::literal(Literal::Int(1), loc(6))),
                        },
                        loc(6),
                    ),
                },
                loc(6),
            )]),
        },
        loc(5),
    );
    let action = MemberKind::Action(ActionDecl {
        name: "fill".into(),
        iota: None,
        precondition,
        body: Block::new(vec![fill]),
        loc: loc(4),
    });
    Program::new(
        vec![ComponentDecl {
            name: "Pump".into(),
            members: vec![MemberDecl::new(action, loc(4))],
            loc: loc(1),
        }],
        Vec::new(),
    )
}

/// Hand-lowered form of the pump: the runtime half of the pipeline
fn pump_registry() -> (Registry, weft::runtime::InstanceId) {
    let mut registry = Registry::new();
    let mut ty = ComponentType::new("Pump", 1);
    ty.add_initializer(InitializerDef {
        name: "empty".into(),
        body: vec![Op::Const(Value::Int(0)), Op::StoreField(FieldSlot(0))],
    });
    ty.add_action(ActionDef {
        name: "fill".into(),
        iota: None,
        precondition: vec![
            Op::LoadField(FieldSlot(0)),
            Op::Const(Value::Int(3)),
            Op::Binary(BinaryOp::Lt),
        ],
        body: vec![
            Op::LoadField(FieldSlot(0)),
            Op::Const(Value::Int(1)),
            Op::Binary(BinaryOp::Add),
            Op::StoreField(FieldSlot(0)),
        ],
    });
    let ty = registry.register_type(ty);
    let pump = registry.instantiate("pump", ty).unwrap();
    (registry, pump)
}

#[test]
fn checked_program_runs_to_quiescence() {
    let program = pump_component();
    assert!(check(&program).is_ok());

    let (registry, pump) = pump_registry();
    let scheduler = Scheduler::with_output(registry, OutputStream::new(Box::new(std::io::sink())));
    let mut exec = scheduler.executor();
    scheduler.initialize_all(&mut exec).unwrap();
    let stats = scheduler.run(&mut exec).unwrap();

    assert_eq!(stats.actions_run, 3);
    let state = scheduler.registry().instance(pump).unwrap().snapshot();
    assert_eq!(state.fields[0], Value::Int(3));
}

#[test]
fn illegal_program_is_rejected_before_lowering() {
    // Same pump, but the mutable section fires a push port. The checker
    // stops the program before any lowering happens.
    let fire = Stmt::expr(Expr::call(
        "out",
        CalleeKind::Function(FunctionKind::PushPort),
        loc(6),
    ));
    let action = MemberKind::Action(ActionDecl {
        name: "fill".into(),
        iota: None,
        precondition: Expr::literal(Literal::Bool(true), loc(4)),
        body: Block::new(vec![Stmt::new(
            StmtKind::Activate {
                values: Vec::new(),
                body: Block::new(vec![fire]),
            },
            loc(5),
        )]),
        loc: loc(4),
    });
    let program = Program::new(
        vec![ComponentDecl {
            name: "Pump".into(),
            members: vec![MemberDecl::new(action, loc(4))],
            loc: loc(1),
        }],
        Vec::new(),
    );

    let Err(CheckFailure::Violations(violations)) = check(&program) else {
        panic!("expected the push-port firing to be rejected");
    };
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].code(), "E-CTX-001");
}

#[test]
fn checked_pipeline_delivers_push_values() {
    // A producer/consumer pair wired through a push port, run end to end.
    let mut registry = Registry::new();

    let mut producer_ty = ComponentType::new("Pump", 1);
    producer_ty.add_initializer(InitializerDef {
        name: "empty".into(),
        body: vec![Op::Const(Value::Int(0)), Op::StoreField(FieldSlot(0))],
    });
    let out = producer_ty.add_push_port("out");
    producer_ty.add_action(ActionDef {
        name: "fill".into(),
        iota: None,
        precondition: vec![
            Op::LoadField(FieldSlot(0)),
            Op::Const(Value::Int(3)),
            Op::Binary(BinaryOp::Lt),
        ],
        body: vec![
            Op::LoadField(FieldSlot(0)),
            Op::Const(Value::Int(1)),
            Op::Binary(BinaryOp::Add),
            Op::StoreField(FieldSlot(0)),
            Op::LoadField(FieldSlot(0)),
            Op::Fire(out),
        ],
    });
    let producer_ty = registry.register_type(producer_ty);

    let mut consumer_ty = ComponentType::new("Meter", 1);
    consumer_ty.add_initializer(InitializerDef {
        name: "zero".into(),
        body: vec![Op::Const(Value::Int(0)), Op::StoreField(FieldSlot(0))],
    });
    let on_level = consumer_ty.add_reaction(ReactionDef {
        name: "on_level".into(),
        body: vec![Op::LoadParam(0), Op::StoreField(FieldSlot(0))],
    });
    let consumer_ty = registry.register_type(consumer_ty);

    let pump = registry.instantiate("pump", producer_ty).unwrap();
    let meter = registry.instantiate("meter", consumer_ty).unwrap();
    registry.bind(pump, out, meter, on_level, 0).unwrap();

    let scheduler = Scheduler::with_output(registry, OutputStream::new(Box::new(std::io::sink())));
    let mut exec = scheduler.executor();
    scheduler.initialize_all(&mut exec).unwrap();
    let stats = scheduler.run(&mut exec).unwrap();

    assert_eq!(stats.actions_run, 3);
    assert_eq!(stats.reactions_run, 3);
    // The meter holds the last delivered level.
    let state = scheduler.registry().instance(meter).unwrap().snapshot();
    assert_eq!(state.fields[0], Value::Int(3));
}
