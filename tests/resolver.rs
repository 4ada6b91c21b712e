#[cfg(test)]
mod resolver_tests {
    use rox::interpreter::Interpreter;
    use rox::expr::{Expr, ExprId};
    use rox::parser::Parser;
    use rox::stmt::Stmt;
    use rox::resolver::Resolver;
    use rox::runner::{run, scan, Outcome};

    fn static_errors(source: &str) -> Vec<String> {
        match run(source, Vec::new()) {
            Outcome::StaticFailure(errors) => errors.iter().map(|e| e.to_string()).collect(),
            other => panic!("expected static failure, got {:?}", other),
        }
    }

    fn variable_id(expr: &Expr<'_>) -> ExprId {
        match expr {
            Expr::Variable { id, .. } => *id,
            other => panic!("expected variable, got {:?}", other),
        }
    }

    #[test]
    fn test_records_hop_counts_for_locals_only() {
        let source = "var g = 1; { var a = 1; { print a; print g; } }";
        let (tokens, _) = scan(source);
        let statements = Parser::new(&tokens).parse().expect("valid program");

        let mut interpreter = Interpreter::with_output(Vec::new());
        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .expect("resolves");

        let Stmt::Block(outer) = &statements[1] else {
            panic!("expected block");
        };
        let Stmt::Block(inner) = &outer[1] else {
            panic!("expected nested block");
        };
        let (Stmt::Print(read_a), Stmt::Print(read_g)) = (&inner[0], &inner[1]) else {
            panic!("expected two prints");
        };

        assert_eq!(interpreter.resolved_depth(variable_id(read_a)), Some(1));
        assert_eq!(interpreter.resolved_depth(variable_id(read_g)), None);
    }

    #[test]
    fn test_function_parameters_resolve_at_depth_zero() {
        let source = "fun f(x) { return x; }";
        let (tokens, _) = scan(source);
        let statements = Parser::new(&tokens).parse().expect("valid program");

        let mut interpreter = Interpreter::with_output(Vec::new());
        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .expect("resolves");

        let Stmt::Function(decl) = &statements[0] else {
            panic!("expected function");
        };
        let Stmt::Return {
            value: Some(value), ..
        } = &decl.body[0]
        else {
            panic!("expected return with value");
        };

        assert_eq!(interpreter.resolved_depth(variable_id(value)), Some(0));
    }

    #[test]
    fn test_closure_binding_is_fixed_at_resolution() {
        let mut out = Vec::new();
        let source = r#"
            var a = "global";
            {
              fun show() { print a; }
              show();
              var a = "block";
              show();
            }
        "#;
        assert!(run(source, &mut out).is_success());
        assert_eq!(String::from_utf8(out).unwrap(), "global\nglobal\n");
    }

    #[test]
    fn test_read_in_own_initializer() {
        assert_eq!(
            static_errors("{ var a = a; }"),
            vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_read_in_own_initializer_at_global_scope() {
        assert_eq!(
            static_errors("var a = 1;\nvar a = a;"),
            vec!["[line 2] Error at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn test_global_initializer_may_read_other_globals() {
        let mut out = Vec::new();
        assert!(run("var a = 1; var b = a + 1; print b;", &mut out).is_success());
        assert_eq!(out, b"2\n");
    }

    #[test]
    fn test_redeclaration_in_local_scope() {
        assert_eq!(
            static_errors("{ var a = 1; var a = 2; }"),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
        assert_eq!(
            static_errors("fun f(a, a) {}"),
            vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
        );
    }

    #[test]
    fn test_global_redeclaration_is_allowed() {
        let mut out = Vec::new();
        assert!(run("var a = 1; var a = 2; print a;", &mut out).is_success());
        assert_eq!(out, b"2\n");
    }

    #[test]
    fn test_top_level_return() {
        assert_eq!(
            static_errors("return 1;"),
            vec!["[line 1] Error at 'return': Can't return from top-level code."]
        );
    }

    #[test]
    fn test_this_and_super_outside_class() {
        assert_eq!(
            static_errors("print this;\nfun f() { super.g(); }"),
            vec![
                "[line 1] Error at 'this': Can't use 'this' outside of a class.",
                "[line 2] Error at 'super': Can't use 'super' outside of a class.",
            ]
        );
    }

    #[test]
    fn test_super_without_superclass() {
        assert_eq!(
            static_errors("class A { f() { super.f(); } }"),
            vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
        );
    }

    #[test]
    fn test_self_inheritance() {
        assert_eq!(
            static_errors("class A < A {}"),
            vec!["[line 1] Error at 'A': A class can't inherit from itself."]
        );
    }

    #[test]
    fn test_return_value_inside_initializer_is_allowed() {
        let mut out = Vec::new();
        assert!(run("class A { init() { return 1; } } print A();", &mut out).is_success());
        assert_eq!(out, b"A instance\n");
    }

    #[test]
    fn test_static_errors_prevent_execution() {
        let mut out = Vec::new();
        let outcome = run("print 1; { var a = a; }", &mut out);
        assert_eq!(outcome.exit_code(), 65);
        assert!(out.is_empty());
    }
}
