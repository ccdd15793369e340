use super::*;
use cwscript_core::{
    ast::{ExecDefn, FnCallExpr, IfClause, IfExpr, MapKey, StateItemDefn, StateMapDefn},
    BindingValue, CodegenError, ContractDefn, GenerationError, Ident, Lowered, Node, Param,
    Program, Renderer, TemplateBinding, TemplateName, TypeExpr, VerificationError,
};
use pretty_assertions::assert_eq;
use std::sync::Mutex;

/// Renders `<template name>` and remembers which templates it saw.
#[derive(Default)]
struct TagRenderer {
    seen: Mutex<Vec<TemplateName>>,
}

impl TagRenderer {
    fn seen(&self) -> Vec<TemplateName> {
        self.seen.lock().unwrap().clone()
    }
}

impl Renderer for TagRenderer {
    fn render(&self, binding: &TemplateBinding) -> Result<String, GenerationError> {
        self.seen.lock().unwrap().push(binding.template);
        Ok(match binding.text("name") {
            Ok(name) => format!("<{} {}>", binding.template, name),
            Err(_) => format!("<{}>", binding.template),
        })
    }
}

struct FailOn(TemplateName);

impl Renderer for FailOn {
    fn render(&self, binding: &TemplateBinding) -> Result<String, GenerationError> {
        if binding.template == self.0 {
            Err(GenerationError::Render(format!("refusing {}", self.0)))
        } else {
            Ok(String::new())
        }
    }
}

fn frag(text: &str) -> Lowered {
    Lowered::fragment(text)
}

fn exec(name: &str, args: Vec<Param>, body: Vec<Node>) -> Node {
    Node::Exec(ExecDefn {
        name: Ident::new(name),
        args,
        body,
    })
}

fn state_item(name: &str, ty: &str) -> Node {
    Node::StateItem(StateItemDefn {
        name: Ident::new(name),
        ty: TypeExpr::new(ty),
    })
}

fn state_map(name: &str, keys: &[&str], ty: &str) -> Node {
    Node::StateMap(StateMapDefn {
        name: Ident::new(name),
        keys: keys
            .iter()
            .map(|key| MapKey {
                name: None,
                ty: TypeExpr::new(*key),
            })
            .collect(),
        ty: TypeExpr::new(ty),
    })
}

fn token_contract(handlers: Vec<Node>) -> ContractDefn {
    let mut body = vec![
        state_item("count", "i32"),
        state_item("owner", "Addr"),
        state_map("balances", &["Addr", "Addr"], "Uint128"),
    ];
    body.extend(handlers);
    ContractDefn::new("Token", body)
}

fn lower_one(node: &Node) -> Lowered {
    let renderer = TagRenderer::default();
    let mut env = CodegenEnv::new(&renderer);
    lower(node, &mut env).unwrap()
}

#[test]
fn test_chained_lookup_collapses_into_one_map_ref() {
    let node = Node::lookup(
        Node::lookup(
            Node::lookup(Node::state("x"), Node::ident("a")),
            Node::ident("b"),
        ),
        Node::ident("c"),
    );

    assert_eq!(
        lower_one(&node),
        Lowered::map("x", vec![frag("a"), frag("b"), frag("c")])
    );
}

#[test]
fn test_lookup_on_plain_value_is_opaque() {
    let node = Node::lookup(Node::ident("balances"), Node::ident("a"));
    assert_eq!(
        lower_one(&node),
        Lowered::Lookup {
            base: Box::new(frag("balances")),
            key: Box::new(frag("a")),
        }
    );
}

#[test]
fn test_message_context_forwards_to_info() {
    assert_eq!(lower_one(&Node::msg("sender")), frag("info.sender"));
    assert_eq!(
        lower_one(&Node::member(Node::msg("funds"), "amount")),
        frag("info.funds.amount")
    );
}

#[test]
fn test_member_chain_on_plain_value_dot_joins() {
    let node = Node::member(Node::member(Node::ident("config"), "owner"), "len");
    assert_eq!(lower_one(&node), frag("config.owner.len"));
}

#[test]
fn test_member_on_state_item_keeps_structure() {
    let node = Node::member(Node::state("config"), "owner");
    assert_eq!(
        lower_one(&node),
        Lowered::Member {
            base: Box::new(Lowered::item("config")),
            member: "owner".into(),
        }
    );
}

#[test]
fn test_map_key_may_be_message_field() {
    let node = Node::lookup(Node::state("balances"), Node::msg("sender"));
    assert_eq!(
        lower_one(&node),
        Lowered::map("balances", vec![frag("info.sender")])
    );
}

#[test]
fn test_binary_keeps_operand_structure() {
    let node = Node::binary(">", Node::state("count"), Node::int("10"));
    assert_eq!(
        lower_one(&node),
        Lowered::Op {
            op: ">".into(),
            lhs: Box::new(Lowered::item("count")),
            rhs: Box::new(frag("10")),
        }
    );
}

#[test]
fn test_lowering_is_repeatable() {
    let renderer = TagRenderer::default();
    let mut env = CodegenEnv::new(&renderer);
    let stmt = Node::assign(
        Node::lookup(Node::state("balances"), Node::ident("a")),
        Node::state("count"),
    );
    let Node::Assign(stmt) = stmt else {
        unreachable!()
    };

    let first = bind_assignment(&stmt, &mut env).unwrap();
    let second = bind_assignment(&stmt, &mut env).unwrap();
    assert_eq!(first, second);
    assert_eq!(env.depth(), 0);
}

fn assignment(lhs: Node, rhs: Node) -> cwscript_core::AssignStmt {
    match Node::assign(lhs, rhs) {
        Node::Assign(stmt) => stmt,
        _ => unreachable!(),
    }
}

#[test]
fn test_state_item_assignment_binding() {
    let renderer = TagRenderer::default();
    let mut env = CodegenEnv::new(&renderer);
    let stmt = assignment(Node::state("count"), Node::int("31"));

    let binding = bind_assignment(&stmt, &mut env).unwrap();
    let expected = TemplateBinding::new(TemplateName::SetStateItem)
        .with("lhs", BindingValue::Value(Lowered::item("count")))
        .with("rhs", BindingValue::Value(frag("31")))
        .with("lhs_is_ident", BindingValue::Flag(false))
        .with("rhs_is_item", BindingValue::Flag(false));
    assert_eq!(binding, expected);
}

#[test]
fn test_state_map_assignment_binding() {
    let renderer = TagRenderer::default();
    let mut env = CodegenEnv::new(&renderer);
    let stmt = assignment(
        Node::lookup(
            Node::lookup(Node::state("balances"), Node::ident("a")),
            Node::ident("b"),
        ),
        Node::int("1"),
    );

    let binding = bind_assignment(&stmt, &mut env).unwrap();
    assert_eq!(binding.template, TemplateName::SetStateMap);
    assert_eq!(
        binding.value("lhs").unwrap(),
        &Lowered::map("balances", vec![frag("a"), frag("b")])
    );
    assert_eq!(binding.value("rhs").unwrap(), &frag("1"));
    assert!(!binding.flag("lhs_is_ident").unwrap());
    assert!(!binding.flag("rhs_is_item").unwrap());
}

#[test]
fn test_variable_assignment_from_state_item() {
    let renderer = TagRenderer::default();
    let mut env = CodegenEnv::new(&renderer);
    let stmt = assignment(Node::ident("total"), Node::state("count"));

    let binding = bind_assignment(&stmt, &mut env).unwrap();
    assert_eq!(binding.template, TemplateName::SetVariable);
    assert!(binding.flag("lhs_is_ident").unwrap());
    assert!(binding.flag("rhs_is_item").unwrap());
}

#[test]
fn test_template_selection_by_lhs_shape() {
    assert_eq!(
        select_template(&Lowered::item("count")),
        TemplateName::SetStateItem
    );
    assert_eq!(
        select_template(&Lowered::map("balances", vec![frag("a")])),
        TemplateName::SetStateMap
    );
    assert_eq!(select_template(&frag("x")), TemplateName::SetVariable);
    assert_eq!(
        select_template(&Lowered::Lookup {
            base: Box::new(frag("arr")),
            key: Box::new(frag("0")),
        }),
        TemplateName::SetVariable
    );
}

#[test]
fn test_empty_function_binding() {
    let renderer = TagRenderer::default();
    let mut env = CodegenEnv::new(&renderer);
    let defn = ExecDefn {
        name: Ident::new("noop"),
        args: vec![],
        body: vec![],
    };

    let binding = bind_function(&defn, &mut env).unwrap();
    assert_eq!(binding.template, TemplateName::Function);
    assert_eq!(binding.text("name").unwrap(), "noop");
    assert!(binding.list("args").unwrap().is_empty());
    assert!(binding.list("body").unwrap().is_empty());
}

#[test]
fn test_function_args_keep_declaration_order() {
    let renderer = TagRenderer::default();
    let mut env = CodegenEnv::new(&renderer);
    let defn = ExecDefn {
        name: Ident::new("transfer"),
        args: vec![Param::new("to", "Addr"), Param::new("amount", "Uint128")],
        body: vec![Node::assign(Node::ident("x"), Node::ident("amount"))],
    };

    let binding = bind_function(&defn, &mut env).unwrap();
    assert_eq!(
        binding.list("args").unwrap(),
        &[
            BindingValue::pair(
                BindingValue::Text("to".into()),
                BindingValue::Type(TypeExpr::new("Addr"))
            ),
            BindingValue::pair(
                BindingValue::Text("amount".into()),
                BindingValue::Type(TypeExpr::new("Uint128"))
            ),
        ]
    );
    assert_eq!(
        binding.list("body").unwrap(),
        &[BindingValue::Value(frag("<set-variable>"))]
    );
}

fn conditional(else_body: Option<Vec<Node>>) -> IfExpr {
    IfExpr {
        if_clause: IfClause::new(Node::ident("a"), vec![Node::ident("x")]),
        else_if_clauses: vec![
            IfClause::new(Node::ident("b"), vec![]),
            IfClause::new(Node::ident("c"), vec![]),
        ],
        else_body,
    }
}

#[test]
fn test_conditional_binding() {
    let renderer = TagRenderer::default();
    let mut env = CodegenEnv::new(&renderer);

    let binding = bind_conditional(&conditional(None), &mut env).unwrap();
    assert_eq!(binding.template, TemplateName::Conditional);
    assert_eq!(
        binding.get("if_clause").unwrap(),
        &BindingValue::pair(
            BindingValue::Value(frag("a")),
            BindingValue::values(vec![frag("x")])
        )
    );
    let conds: Vec<_> = binding
        .list("else_if_clauses")
        .unwrap()
        .iter()
        .map(|clause| match clause {
            BindingValue::Pair(cond, _) => cond.as_ref().clone(),
            other => panic!("unexpected clause {:?}", other),
        })
        .collect();
    assert_eq!(
        conds,
        vec![
            BindingValue::Value(frag("b")),
            BindingValue::Value(frag("c"))
        ]
    );
    assert!(binding.get("else_body").unwrap().is_absent());
}

#[test]
fn test_empty_else_is_not_absent() {
    let renderer = TagRenderer::default();
    let mut env = CodegenEnv::new(&renderer);

    let binding = bind_conditional(&conditional(Some(vec![])), &mut env).unwrap();
    assert_eq!(
        binding.get("else_body").unwrap(),
        &BindingValue::List(vec![])
    );
}

fn transfer_call() -> Node {
    Node::FnCall(FnCallExpr {
        func: Box::new(Node::ident("transfer")),
        args: vec![],
    })
}

#[test]
fn test_permissive_fallback_emits_placeholder() {
    assert_eq!(
        lower_one(&transfer_call()),
        frag("// Omitted: fn-call transfer")
    );
}

#[test]
fn test_strict_fallback_fails() {
    let renderer = TagRenderer::default();
    let mut env = CodegenEnv::with_config(&renderer, CodegenConfig::strict());
    let node = exec("pay", vec![], vec![transfer_call()]);

    let err = lower(&node, &mut env).unwrap_err();
    assert_eq!(
        err,
        CodegenError::Generation {
            context: "exec pay".into(),
            source: GenerationError::UnsupportedNode("fn-call transfer".into()),
        }
    );
    assert_eq!(env.depth(), 0);
}

#[test]
fn test_generate_code_balances_stack_on_success() {
    let renderer = TagRenderer::default();
    let mut env = CodegenEnv::new(&renderer);
    let defn = token_contract(vec![exec(
        "reset",
        vec![],
        vec![Node::If(conditional(Some(vec![Node::assign(
            Node::state("count"),
            Node::int("0"),
        )])))],
    )]);

    let code = defn.generate_code(&mut env).unwrap();
    assert_eq!(code, "<contract Token>");
    assert_eq!(env.depth(), 0);
    assert_eq!(
        renderer.seen(),
        vec![
            TemplateName::SetStateItem,
            TemplateName::Conditional,
            TemplateName::Function,
            TemplateName::Contract,
        ]
    );
}

#[test]
fn test_generate_code_balances_stack_on_render_failure() {
    let renderer = FailOn(TemplateName::SetStateMap);
    let mut env = CodegenEnv::new(&renderer);
    let defn = token_contract(vec![exec(
        "credit",
        vec![],
        vec![Node::assign(
            Node::lookup(
                Node::lookup(Node::state("balances"), Node::ident("a")),
                Node::ident("b"),
            ),
            Node::int("1"),
        )],
    )]);

    let err = defn.generate_code(&mut env).unwrap_err();
    assert_eq!(
        err.context(),
        "contract Token > exec credit > assign $state.balances[a][b]"
    );
    assert!(!err.is_verification());
    assert_eq!(env.depth(), 0);
}

#[test]
fn test_verification_runs_before_generation() {
    let renderer = TagRenderer::default();
    let mut env = CodegenEnv::new(&renderer);
    let defn = token_contract(vec![exec(
        "mint",
        vec![],
        vec![Node::assign(Node::state("supply"), Node::int("1"))],
    )]);

    let err = defn.generate_code(&mut env).unwrap_err();
    assert_eq!(
        err,
        CodegenError::Verification {
            context: "contract Token > exec mint > assign $state.supply".into(),
            source: VerificationError::UndeclaredState("supply".into()),
        }
    );
    assert!(renderer.seen().is_empty());
    assert_eq!(env.depth(), 0);
}

fn verify_in_token(stmt: Node) -> VerificationError {
    let renderer = TagRenderer::default();
    let mut env = CodegenEnv::new(&renderer);
    let defn = token_contract(vec![exec("run", vec![], vec![stmt])]);
    match defn.generate_code(&mut env) {
        Err(CodegenError::Verification { source, .. }) => source,
        other => panic!("expected a verification error, got {:?}", other),
    }
}

#[test]
fn test_message_context_is_read_only() {
    assert_eq!(
        verify_in_token(Node::assign(Node::msg("sender"), Node::ident("x"))),
        VerificationError::ReadOnlyTarget("$msg.sender".into())
    );
}

#[test]
fn test_message_context_is_read_only_through_chains() {
    assert_eq!(
        verify_in_token(Node::assign(
            Node::lookup(Node::msg("funds"), Node::int("0")),
            Node::int("1")
        )),
        VerificationError::ReadOnlyTarget("$msg.funds[0]".into())
    );
    assert_eq!(
        verify_in_token(Node::assign(
            Node::member(Node::msg("sender"), "inner"),
            Node::int("1")
        )),
        VerificationError::ReadOnlyTarget("$msg.sender.inner".into())
    );
}

#[test]
fn test_state_reads_are_checked() {
    assert_eq!(
        verify_in_token(Node::assign(Node::state("count"), Node::state("missing"))),
        VerificationError::UndeclaredState("missing".into())
    );
    assert_eq!(
        verify_in_token(Node::assign(
            Node::ident("x"),
            Node::lookup(Node::state("count"), Node::ident("k"))
        )),
        VerificationError::ShapeMismatch {
            key: "count".into(),
            declared: "an item",
            used: "a map",
        }
    );
    assert_eq!(
        verify_in_token(Node::assign(
            Node::ident("x"),
            Node::binary(
                "+",
                Node::int("1"),
                Node::lookup(Node::state("balances"), Node::ident("a"))
            )
        )),
        VerificationError::KeyArity {
            key: "balances".into(),
            expected: 2,
            found: 1,
        }
    );
}

#[test]
fn test_state_used_as_map_key_is_checked() {
    let lhs = Node::lookup(
        Node::lookup(Node::state("balances"), Node::state("missing")),
        Node::ident("b"),
    );
    assert_eq!(
        verify_in_token(Node::assign(lhs, Node::int("1"))),
        VerificationError::UndeclaredState("missing".into())
    );
}

#[test]
fn test_conditions_are_checked() {
    let renderer = TagRenderer::default();
    let mut env = CodegenEnv::new(&renderer);
    let check = Node::If(IfExpr {
        if_clause: IfClause::new(Node::state("count"), vec![]),
        else_if_clauses: vec![IfClause::new(
            Node::binary(">", Node::state("supply"), Node::int("1")),
            vec![],
        )],
        else_body: None,
    });
    let defn = token_contract(vec![exec("run", vec![], vec![check])]);

    let err = defn.generate_code(&mut env).unwrap_err();
    assert_eq!(
        err,
        CodegenError::Verification {
            context: "contract Token > exec run > if".into(),
            source: VerificationError::UndeclaredState("supply".into()),
        }
    );
    assert_eq!(env.depth(), 0);
}

#[test]
fn test_state_shape_is_checked() {
    assert_eq!(
        verify_in_token(Node::assign(Node::state("balances"), Node::int("0"))),
        VerificationError::ShapeMismatch {
            key: "balances".into(),
            declared: "a map",
            used: "an item",
        }
    );
    assert_eq!(
        verify_in_token(Node::assign(
            Node::lookup(Node::state("count"), Node::ident("k")),
            Node::int("0")
        )),
        VerificationError::ShapeMismatch {
            key: "count".into(),
            declared: "an item",
            used: "a map",
        }
    );
    assert_eq!(
        verify_in_token(Node::assign(
            Node::lookup(Node::state("balances"), Node::ident("a")),
            Node::int("0")
        )),
        VerificationError::KeyArity {
            key: "balances".into(),
            expected: 2,
            found: 1,
        }
    );
}

#[test]
fn test_item_to_item_assignment_passes() {
    let renderer = TagRenderer::default();
    let mut env = CodegenEnv::new(&renderer);
    let defn = token_contract(vec![exec(
        "copy",
        vec![],
        vec![Node::assign(Node::state("owner"), Node::state("count"))],
    )]);
    assert!(defn.generate_code(&mut env).is_ok());
}

#[test]
fn test_duplicate_declarations_are_rejected() {
    let renderer = TagRenderer::default();
    let mut env = CodegenEnv::new(&renderer);

    let defn = ContractDefn::new(
        "Dup",
        vec![state_item("count", "i32"), state_map("count", &["Addr"], "i32")],
    );
    let err = defn.generate_code(&mut env).unwrap_err();
    assert_eq!(err.context(), "contract Dup");
    assert!(matches!(
        err,
        CodegenError::Verification {
            source: VerificationError::DuplicateState(_),
            ..
        }
    ));

    let defn = ContractDefn::new(
        "Dup",
        vec![exec("a", vec![], vec![]), exec("a", vec![], vec![])],
    );
    assert!(matches!(
        defn.generate_code(&mut env),
        Err(CodegenError::Verification {
            source: VerificationError::DuplicateHandler(_),
            ..
        })
    ));

    let defn = ContractDefn::new(
        "Dup",
        vec![exec(
            "a",
            vec![Param::new("x", "i32"), Param::new("x", "i32")],
            vec![],
        )],
    );
    assert!(matches!(
        defn.generate_code(&mut env),
        Err(CodegenError::Verification {
            source: VerificationError::DuplicateParam(_),
            ..
        })
    ));
    assert_eq!(env.depth(), 0);
}

#[test]
fn test_names_colliding_in_generated_code_are_rejected() {
    let renderer = TagRenderer::default();
    let mut env = CodegenEnv::new(&renderer);

    let defn = ContractDefn::new(
        "Clash",
        vec![state_item("fooBar", "i32"), state_item("foo_bar", "i32")],
    );
    assert_eq!(
        defn.generate_code(&mut env).unwrap_err(),
        CodegenError::Verification {
            context: "contract Clash".into(),
            source: VerificationError::NameClash {
                first: "fooBar".into(),
                second: "foo_bar".into(),
                host: "FOO_BAR".into(),
            },
        }
    );

    let defn = ContractDefn::new(
        "Clash",
        vec![exec("doThing", vec![], vec![]), exec("do_thing", vec![], vec![])],
    );
    assert!(matches!(
        defn.generate_code(&mut env),
        Err(CodegenError::Verification {
            source: VerificationError::NameClash { .. },
            ..
        })
    ));
    assert!(renderer.seen().is_empty());
}

#[test]
fn test_state_table_is_scoped_to_contract() {
    let renderer = TagRenderer::default();
    let mut env = CodegenEnv::new(&renderer);
    token_contract(vec![]).generate_code(&mut env).unwrap();
    assert!(env.state().is_none());
}

#[test]
fn test_assembler_preserves_tree_order() {
    let renderer = TagRenderer::default();
    let program = Program::new(vec![
        Node::Contract(ContractDefn::new("B", vec![])),
        Node::Contract(ContractDefn::new(
            "A",
            vec![Node::Contract(ContractDefn::new("Inner", vec![]))],
        )),
    ]);

    let output = ContractAssembler::new(&renderer).compile(&program).unwrap();
    assert_eq!(output, "<contract B><contract A><contract Inner>");
}

#[test]
fn test_contract_nested_in_handler_is_emitted_once() {
    let renderer = TagRenderer::default();
    let nested = |name: &str| Node::Contract(ContractDefn::new(name, vec![]));
    let program = Program::new(vec![Node::Contract(ContractDefn::new(
        "Outer",
        vec![exec(
            "f",
            vec![],
            vec![
                nested("InHandler"),
                Node::If(IfExpr {
                    if_clause: IfClause::new(Node::ident("a"), vec![nested("InIf")]),
                    else_if_clauses: vec![],
                    else_body: Some(vec![nested("InElse")]),
                }),
            ],
        )],
    ))]);

    let output = ContractAssembler::new(&renderer).compile(&program).unwrap();
    assert_eq!(
        output,
        "<contract Outer><contract InHandler><contract InIf><contract InElse>"
    );
    assert_eq!(
        renderer.seen(),
        vec![
            TemplateName::Conditional,
            TemplateName::Function,
            TemplateName::Contract,
            TemplateName::Contract,
            TemplateName::Contract,
            TemplateName::Contract,
        ]
    );
}

#[test]
fn test_assembler_empty_program() {
    let renderer = TagRenderer::default();
    assert_eq!(compile(&Program::default(), &renderer).unwrap(), "");
}

#[test]
fn test_assembler_continues_after_failed_contract() {
    let renderer = TagRenderer::default();
    let program = Program::new(vec![
        Node::Contract(token_contract(vec![exec(
            "bad",
            vec![],
            vec![Node::assign(Node::state("missing"), Node::int("1"))],
        )])),
        Node::Contract(ContractDefn::new("Good", vec![])),
    ]);
    let assembler = ContractAssembler::new(&renderer);

    assert!(assembler.compile(&program).is_err());

    let results = assembler.compile_each(&program);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "Token");
    assert!(results[0].1.is_err());
    assert_eq!(
        results[1].1.as_ref().unwrap().code,
        "<contract Good>".to_string()
    );
}

#[test]
fn test_strict_assembler_rejects_placeholders() {
    let renderer = TagRenderer::default();
    let program = Program::new(vec![Node::Contract(ContractDefn::new(
        "Caller",
        vec![exec("go", vec![], vec![transfer_call()])],
    ))]);

    let permissive = ContractAssembler::new(&renderer);
    assert!(permissive.compile(&program).is_ok());

    let strict = ContractAssembler::new(&renderer).with_config(CodegenConfig::strict());
    assert!(strict.config().is_strict());
    assert!(strict.compile(&program).is_err());
}

#[test]
fn test_state_target_mirrors_lowering() {
    let node = Node::lookup(
        Node::lookup(Node::state("balances"), Node::ident("a")),
        Node::ident("b"),
    );
    assert_eq!(
        state_target(&node),
        Some(StateTarget {
            key: "balances".into(),
            lookups: 2,
        })
    );
    assert_eq!(state_target(&Node::msg("sender")), None);
    assert_eq!(
        state_accesses(&Node::binary(
            "+",
            Node::lookup(Node::state("m"), Node::state("k")),
            Node::state("n")
        )),
        vec![
            StateTarget {
                key: "m".into(),
                lookups: 1,
            },
            StateTarget {
                key: "k".into(),
                lookups: 0,
            },
            StateTarget {
                key: "n".into(),
                lookups: 0,
            },
        ]
    );
    assert_eq!(
        state_target(&Node::lookup(Node::ident("arr"), Node::int("0"))),
        None
    );
}
