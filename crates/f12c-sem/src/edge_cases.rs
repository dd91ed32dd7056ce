//! Edge case tests for f12c-sem.

#[cfg(test)]
mod tests {
    use crate::{analyze, Analysis, Def};
    use f12c_lex::lex;
    use f12c_par::{parse, Decl, DeclId, Program, RootElem, Stmt};
    use f12c_util::{FileId, Handler};

    fn analyze_source(source: &str) -> (Program, Analysis, Handler) {
        let tokens = lex(source, FileId::DUMMY).expect("lexing failed");
        let mut program = parse(tokens).expect("parsing failed");
        let mut handler = Handler::new();
        let analysis = analyze(&mut program, &mut handler);
        (program, analysis, handler)
    }

    fn messages(handler: &Handler) -> Vec<String> {
        handler
            .diagnostics()
            .iter()
            .map(|d| d.message.clone())
            .collect()
    }

    fn find_decl(program: &Program, name: &str) -> DeclId {
        program
            .elements
            .iter()
            .find_map(|elem| match elem {
                RootElem::Decl(id) if program.ast.decl(*id).name().lexeme == name => Some(*id),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no declaration named {}", name))
    }

    #[test]
    fn test_well_formed_program_has_no_errors() {
        let (_, _, handler) = analyze_source(
            "fun fib(int n) => int {\
               if n < 2 { ret n; }\
               ret fib(n - 1) + fib(n - 2);\
             }\
             fun main => int { ret fib(10); }",
        );
        assert!(!handler.has_errors(), "errors: {:?}", messages(&handler));
    }

    #[test]
    fn test_global_slots_are_contiguous_in_declaration_order() {
        let (program, analysis, handler) =
            analyze_source("int a; float b; char c; fun main { }");
        assert!(!handler.has_errors());

        let slot = |name: &str| analysis.slot_of[&Def::Decl(find_decl(&program, name))];
        assert_eq!(slot("a"), 0);
        assert_eq!(slot("b"), 4);
        assert_eq!(slot("c"), 12);
        assert_eq!(analysis.globals_size, 13);
    }

    #[test]
    fn test_param_and_local_slots() {
        let (program, analysis, handler) =
            analyze_source("fun f(int a, float b) { int c; } fun main { }");
        assert!(!handler.has_errors());

        let fun_id = find_decl(&program, "f");
        assert_eq!(analysis.slot_of[&Def::Param(fun_id, 0)], 0);
        assert_eq!(analysis.slot_of[&Def::Param(fun_id, 1)], 4);

        let Decl::Fun(fun) = program.ast.decl(fun_id) else {
            panic!();
        };
        let local_stmt = fun.body.stmts[0];
        assert!(matches!(program.ast.stmt(local_stmt), Stmt::DeclVar(_)));
        assert_eq!(analysis.slot_of[&Def::Local(local_stmt)], 12);
        assert_eq!(analysis.frame_size_of[&fun_id], 16);
    }

    #[test]
    fn test_stack_dispenser_resets_per_function() {
        let (program, analysis, handler) =
            analyze_source("fun f(int a) { } fun g(int b) { } fun main { }");
        assert!(!handler.has_errors());
        assert_eq!(
            analysis.slot_of[&Def::Param(find_decl(&program, "g"), 0)],
            0
        );
    }

    #[test]
    fn test_unit_field_slots() {
        let (program, analysis, handler) =
            analyze_source("unit mix { int a; float b; char c; } fun main { }");
        assert!(!handler.has_errors());

        let unit_id = find_decl(&program, "mix");
        assert_eq!(analysis.field_slots[&unit_id], vec![0, 4, 12]);
        assert_eq!(analysis.unit_size_of[&unit_id], 13);
    }

    #[test]
    fn test_unknown_name() {
        let (_, _, handler) = analyze_source("fun main { ret x; }");
        assert!(messages(&handler).contains(&"Item with name \"x\" is not declared".to_string()));
    }

    #[test]
    fn test_duplicate_declaration() {
        let (_, _, handler) = analyze_source("fun twice { } fun twice { } fun main { }");
        assert!(messages(&handler)
            .contains(&"Item with name \"twice\" is already declared".to_string()));
    }

    #[test]
    fn test_duplicate_local() {
        let (_, _, handler) = analyze_source("fun main { int x; int x; }");
        assert!(
            messages(&handler).contains(&"Item with name \"x\" is already declared".to_string())
        );
    }

    #[test]
    fn test_shadowing_in_nested_block_is_fine() {
        let (_, _, handler) = analyze_source("fun main { int x; while true { int x; } }");
        assert!(!handler.has_errors(), "errors: {:?}", messages(&handler));
    }

    #[test]
    fn test_forward_function_reference() {
        let (_, _, handler) = analyze_source("fun main { later(); } fun later { }");
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_break_outside_loop() {
        let (_, _, handler) = analyze_source("fun main { break; }");
        assert!(messages(&handler).contains(&"'break' keyword has to be in a loop".to_string()));
    }

    #[test]
    fn test_continue_outside_loop() {
        let (_, _, handler) = analyze_source("fun main { continue; }");
        assert!(
            messages(&handler).contains(&"'continue' keyword has to be in a loop".to_string())
        );
    }

    #[test]
    fn test_break_nested_in_if_inside_loop_is_fine() {
        let (_, _, handler) =
            analyze_source("fun main { while true { if true { break; } } }");
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_assign_to_const() {
        let (_, _, handler) = analyze_source("const int k = 1; fun main { k = 2; }");
        assert!(messages(&handler).contains(&"Assign to constant variable".to_string()));
    }

    #[test]
    fn test_type_mismatch_message_format() {
        let (_, _, handler) = analyze_source("fun main { int x = 1.5; }");
        assert!(messages(&handler).contains(&"Expected: int, got: float".to_string()));
    }

    #[test]
    fn test_arithmetic_operand_mismatch() {
        let (_, _, handler) = analyze_source("fun main { int x = 1 + 1.5; }");
        assert!(messages(&handler)
            .contains(&"Right operand type does not match left's one".to_string()));
    }

    #[test]
    fn test_arithmetic_on_bool() {
        let (_, _, handler) = analyze_source("fun main { bool b = true + false; }");
        assert!(messages(&handler)
            .contains(&"Cannot perform arithmetic operations with type \"bool\"".to_string()));
    }

    #[test]
    fn test_compare_on_string() {
        let (_, _, handler) = analyze_source("fun main { bool b = \"a\" < \"b\"; }");
        assert!(messages(&handler)
            .contains(&"Cannot perform compare operations with string".to_string()));
    }

    #[test]
    fn test_logic_requires_bool() {
        let (_, _, handler) = analyze_source("fun main { bool b = 1 && true; }");
        assert!(messages(&handler).contains(&"Expected: bool, got: int".to_string()));
    }

    #[test]
    fn test_equality_works_on_chars() {
        let (_, _, handler) = analyze_source("fun main { bool b = 'a' == 'b'; }");
        assert!(!handler.has_errors(), "errors: {:?}", messages(&handler));
    }

    #[test]
    fn test_condition_must_be_bool() {
        let (_, _, handler) = analyze_source("fun main { if 1 { } }");
        assert!(messages(&handler).contains(&"Expected: bool, got: int".to_string()));
    }

    #[test]
    fn test_return_type_is_unified() {
        let (_, _, handler) = analyze_source("fun main => int { ret 1.5; }");
        assert!(messages(&handler).contains(&"Expected: int, got: float".to_string()));
    }

    #[test]
    fn test_return_without_value_from_typed_function() {
        let (_, _, handler) = analyze_source("fun f => int { ret; } fun main { }");
        assert!(messages(&handler).contains(&"Expected: int, got: void".to_string()));
    }

    #[test]
    fn test_call_arity() {
        let (_, _, handler) =
            analyze_source("fun f(int a, int b) { } fun main { f(1); }");
        assert!(messages(&handler)
            .contains(&"Wrong number of arguments. Expected: 2, got: 1".to_string()));
    }

    #[test]
    fn test_call_argument_type() {
        let (_, _, handler) = analyze_source("fun f(int a) { } fun main { f(1.5); }");
        assert!(messages(&handler).contains(&"Expected: int, got: float".to_string()));
    }

    #[test]
    fn test_calling_a_variable() {
        let (_, _, handler) = analyze_source("int x; fun main { x(); }");
        assert!(messages(&handler).contains(&"Item \"x\" is not a function".to_string()));
    }

    #[test]
    fn test_unary_on_string() {
        let (_, _, handler) = analyze_source("fun main { string s = -\"a\"; }");
        assert!(messages(&handler)
            .contains(&"Unary operators applicable only to int and float".to_string()));
    }

    #[test]
    fn test_index_must_be_int() {
        let (_, _, handler) =
            analyze_source("fun main { char[] p = new char[3]; char c = p[1.5]; }");
        assert!(messages(&handler).contains(&"Expected: int, got: float".to_string()));
    }

    #[test]
    fn test_indexing_an_int() {
        let (_, _, handler) = analyze_source("fun main { int x; int y = x[0]; }");
        assert!(messages(&handler).contains(&"You cannot access variable of int".to_string()));
    }

    #[test]
    fn test_cannot_print_an_array() {
        let (_, _, handler) =
            analyze_source("fun main { int[] xs = new int[2]; --> xs; }");
        assert!(messages(&handler).contains(&"You cannot print pointer of int[]".to_string()));
    }

    #[test]
    fn test_free_requires_a_pointer() {
        let (_, _, handler) = analyze_source("fun main { free 5; }");
        assert!(messages(&handler).contains(&"Expected: pointer, got: int".to_string()));
    }

    #[test]
    fn test_free_accepts_any_pointer() {
        let (_, _, handler) =
            analyze_source("fun main { char[] p = new char[3]; free p; }");
        assert!(!handler.has_errors(), "errors: {:?}", messages(&handler));
    }

    #[test]
    fn test_void_variable() {
        let (_, _, handler) = analyze_source("fun main { void v; }");
        assert!(messages(&handler)
            .contains(&"Cannot create a variable of the given type".to_string()));
    }

    #[test]
    fn test_empty_array_literal() {
        let (_, _, handler) = analyze_source("fun main { int[] xs = new []; }");
        assert!(messages(&handler).contains(&"Array cannot be empty".to_string()));
    }

    #[test]
    fn test_array_literal_elements_must_agree() {
        let (_, _, handler) = analyze_source("fun main { int[] xs = new [1, 2.5]; }");
        assert!(messages(&handler).contains(&"Expected: int, got: float".to_string()));
    }

    #[test]
    fn test_unit_literal_checks() {
        let source = "unit point { int x; int y; }\
                      fun main { point p = new point|x: 1, y: 2|; }";
        let (_, _, handler) = analyze_source(source);
        assert!(!handler.has_errors(), "errors: {:?}", messages(&handler));
    }

    #[test]
    fn test_unit_literal_wrong_count() {
        let source = "unit point { int x; int y; }\
                      fun main { point p = new point|x: 1|; }";
        let (_, _, handler) = analyze_source(source);
        assert!(messages(&handler).contains(&"Wrong number of arguments".to_string()));
    }

    #[test]
    fn test_unit_literal_unknown_field() {
        let source = "unit point { int x; int y; }\
                      fun main { point p = new point|x: 1, z: 2|; }";
        let (_, _, handler) = analyze_source(source);
        assert!(
            messages(&handler).contains(&"Item with name \"z\" is not declared".to_string())
        );
    }

    #[test]
    fn test_unit_literal_field_type() {
        let source = "unit point { int x; int y; }\
                      fun main { point p = new point|x: 1, y: 2.5|; }";
        let (_, _, handler) = analyze_source(source);
        assert!(messages(&handler).contains(&"Expected: int, got: float".to_string()));
    }

    #[test]
    fn test_field_access_resolves() {
        let source = "unit point { int x; int y; }\
                      fun main { point p = new point|x: 1, y: 2|; int v = p.y; }";
        let (program, analysis, handler) = analyze_source(source);
        assert!(!handler.has_errors(), "errors: {:?}", messages(&handler));

        let unit_id = find_decl(&program, "point");
        let fref = analysis
            .field_of
            .values()
            .next()
            .expect("field access was resolved");
        assert_eq!(fref.unit, unit_id);
        assert_eq!(fref.index, 1);
    }

    #[test]
    fn test_field_access_on_int() {
        let (_, _, handler) = analyze_source("fun main { int x; int y = x.f; }");
        assert!(messages(&handler).contains(&"You cannot access this type".to_string()));
    }

    #[test]
    fn test_entry_point_missing() {
        let (_, _, handler) = analyze_source("fun not_main { }");
        assert!(messages(&handler).contains(
            &"You have to provide single function with a name 'main' for a program entry point"
                .to_string()
        ));
    }

    #[test]
    fn test_entry_point_with_params() {
        let (_, _, handler) = analyze_source("fun main(int argc) { }");
        assert!(
            messages(&handler).contains(&"'main' function must not take any params".to_string())
        );
    }

    #[test]
    fn test_entry_point_bad_return_type() {
        let (_, _, handler) = analyze_source("fun main => float { ret 1.5; }");
        assert!(messages(&handler).contains(&"'main' must return void or int".to_string()));
    }

    #[test]
    fn test_entry_point_int_return_is_fine() {
        let (_, _, handler) = analyze_source("fun main => int { ret 0; }");
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_builtins_are_callable() {
        let (_, _, handler) =
            analyze_source("fun main { clear_screen(); sleep(100); put_char_x_y('a', 1, 2); }");
        assert!(!handler.has_errors(), "errors: {:?}", messages(&handler));
    }

    #[test]
    fn test_redefining_a_builtin_is_a_duplicate() {
        let (_, _, handler) = analyze_source("fun sleep(int ms) { } fun main { }");
        assert!(messages(&handler)
            .contains(&"Item with name \"sleep\" is already declared".to_string()));
    }

    #[test]
    fn test_decl_links_are_complete_when_no_errors() {
        let source = "int g = 1;\
                      fun f(int a) => int { ret a + g; }\
                      fun main => int { ret f(2); }";
        let (program, analysis, handler) = analyze_source(source);
        assert!(!handler.has_errors());

        for (id, expr) in program.ast.exprs.iter_enumerated() {
            match expr {
                f12c_par::Expr::Var { .. } | f12c_par::Expr::Call { .. } => {
                    assert!(
                        analysis.decl_of.contains_key(&id),
                        "expression {:?} has no declaration link",
                        expr
                    );
                    assert!(analysis.ty_of.contains_key(&id));
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod property_tests {
    use f12c_lex::{Token, TokenKind};
    use f12c_par::{types_match, Ty};
    use f12c_util::Span;
    use proptest::prelude::*;

    fn unit(name: &str) -> Ty {
        Ty::Unit(Token::new(TokenKind::Identifier, Span::DUMMY, name))
    }

    fn ty_strategy() -> impl Strategy<Value = Ty> {
        let leaf = prop_oneof![
            Just(Ty::int()),
            Just(Ty::float()),
            Just(Ty::char()),
            Just(Ty::bool()),
            Just(Ty::string()),
            Just(Ty::void()),
            Just(Ty::any_pointer()),
            Just(unit("a")),
            Just(unit("b")),
        ];
        leaf.prop_recursive(3, 24, 2, |inner| {
            prop_oneof![
                inner.clone().prop_map(Ty::pointer_to),
                inner.prop_map(Ty::array_of),
            ]
        })
    }

    proptest! {
        /// unify(T, T) always succeeds.
        #[test]
        fn unification_is_reflexive(ty in ty_strategy()) {
            prop_assert!(types_match(&ty, &ty));
        }

        /// unify(A, B) succeeds iff unify(B, A) does.
        #[test]
        fn unification_is_symmetric(a in ty_strategy(), b in ty_strategy()) {
            prop_assert_eq!(types_match(&a, &b), types_match(&b, &a));
        }
    }
}
