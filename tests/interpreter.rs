#[cfg(test)]
mod interpreter_tests {
    use rox::interpreter::MAX_CALL_DEPTH;
    use rox::runner::{run, Outcome};

    /// Runs `source` and returns its printed output, panicking on any error.
    fn output_of(source: &str) -> String {
        let mut out = Vec::new();
        match run(source, &mut out) {
            Outcome::Success => String::from_utf8(out).expect("utf-8 output"),
            other => panic!("expected success, got {:?}", other),
        }
    }

    /// Runs `source`, expecting a runtime error.  Returns (output, error text).
    fn runtime_failure(source: &str) -> (String, String) {
        let mut out = Vec::new();
        match run(source, &mut out) {
            Outcome::RuntimeFailure(e) => (String::from_utf8(out).expect("utf-8 output"), e.to_string()),
            other => panic!("expected runtime failure, got {:?}", other),
        }
    }

    #[test]
    fn test_arithmetic_and_printing() {
        assert_eq!(output_of("print 1 + 2;"), "3\n");
        assert_eq!(output_of("print 7 / 2;"), "3.5\n");
        assert_eq!(output_of("print -(2 * 3) + 10;"), "4\n");
        assert_eq!(output_of("print \"a\" + \"b\";"), "ab\n");
        assert_eq!(output_of("print 1 < 2; print 2 <= 1; print nil;"), "true\nfalse\nnil\n");
    }

    #[test]
    fn test_division_by_zero_follows_ieee() {
        assert_eq!(output_of("print 1 / 0;"), "inf\n");
        assert_eq!(output_of("print -1 / 0;"), "-inf\n");
    }

    #[test]
    fn test_equality() {
        assert_eq!(
            output_of("print 1 == 1; print \"a\" == \"a\"; print nil == false; print 1 != \"1\";"),
            "true\ntrue\nfalse\ntrue\n"
        );
        assert_eq!(
            output_of("class A {} var a = A(); var b = A(); print a == a; print a == b;"),
            "true\nfalse\n"
        );
    }

    #[test]
    fn test_truthiness_and_short_circuit() {
        assert_eq!(
            output_of("if (0) print \"zero\"; if (\"\") print \"empty\"; if (nil) print \"nil\"; else print \"no\";"),
            "zero\nempty\nno\n"
        );
        assert_eq!(output_of("print nil or \"yes\"; print false and undefined;"), "yes\nfalse\n");
    }

    #[test]
    fn test_mixed_addition_is_a_runtime_error() {
        let (_, error) = runtime_failure("print \"a\" + 1;");
        assert_eq!(error, "Operands must be two numbers or two strings.\n[line 1]");
    }

    #[test]
    fn test_operand_type_errors() {
        assert_eq!(
            runtime_failure("print -\"x\";").1,
            "Operand must be a number.\n[line 1]"
        );
        assert_eq!(
            runtime_failure("print 1 < \"x\";").1,
            "Operands must be numbers.\n[line 1]"
        );
    }

    #[test]
    fn test_runtime_error_keeps_earlier_output() {
        let mut out = Vec::new();
        let outcome = run("print \"before\";\nprint missing;\nprint \"after\";", &mut out);

        assert_eq!(outcome.exit_code(), 70);
        assert_eq!(out, b"before\n");
        match outcome {
            Outcome::RuntimeFailure(e) => {
                assert_eq!(e.to_string(), "Undefined variable 'missing'.\n[line 2]")
            }
            other => panic!("expected runtime failure, got {:?}", other),
        }
    }

    #[test]
    fn test_blocks_shadow_and_restore() {
        let source = r#"
            var a = "outer";
            {
              var a = "inner";
              print a;
            }
            print a;
        "#;
        assert_eq!(output_of(source), "inner\nouter\n");
    }

    #[test]
    fn test_loops() {
        assert_eq!(
            output_of("var i = 0; while (i < 3) { print i; i = i + 1; }"),
            "0\n1\n2\n"
        );
        assert_eq!(
            output_of("for (var i = 0; i < 3; i = i + 1) print i * 10;"),
            "0\n10\n20\n"
        );
    }

    #[test]
    fn test_counter_closure() {
        let source = r#"
            fun makeCounter() {
              var i = 0;
              fun count() {
                i = i + 1;
                print i;
              }
              return count;
            }
            var counter = makeCounter();
            counter();
            counter();
        "#;
        assert_eq!(output_of(source), "1\n2\n");
    }

    #[test]
    fn test_closures_share_captured_variable() {
        let source = r#"
            var get;
            var set;
            {
              var shared = "start";
              fun g() { print shared; }
              fun s(v) { shared = v; }
              get = g;
              set = s;
            }
            get();
            set("changed");
            get();
        "#;
        assert_eq!(output_of(source), "start\nchanged\n");
    }

    #[test]
    fn test_recursion_and_early_return() {
        let source = r#"
            fun fib(n) {
              if (n < 2) return n;
              return fib(n - 1) + fib(n - 2);
            }
            print fib(15);

            fun firstOver(limit) {
              for (var i = 0; ; i = i + 1) {
                if (i > limit) return i;
              }
            }
            print firstOver(4);
        "#;
        assert_eq!(output_of(source), "610\n5\n");
    }

    #[test]
    fn test_function_without_return_yields_nil() {
        assert_eq!(output_of("fun f() {} print f();"), "nil\n");
    }

    #[test]
    fn test_callable_string_forms() {
        assert_eq!(
            output_of("fun f() {} class C {} print f; print C; print C(); print clock;"),
            "<fn f>\nC\nC instance\n<native fn>\n"
        );
    }

    #[test]
    fn test_clock_returns_a_number() {
        assert_eq!(output_of("print clock() > 0;"), "true\n");
    }

    #[test]
    fn test_arity_mismatch() {
        let (_, error) = runtime_failure("fun f(a, b) {}\nf(1);");
        assert_eq!(error, "Expected 2 arguments but got 1.\n[line 2]");

        let (_, error) = runtime_failure("class P { init(x) {} } P();");
        assert_eq!(error, "Expected 1 arguments but got 0.\n[line 1]");
    }

    #[test]
    fn test_calling_a_non_callable() {
        let (_, error) = runtime_failure("\"nope\"();");
        assert_eq!(error, "Can only call functions and classes.\n[line 1]");
    }

    #[test]
    fn test_fields_and_methods() {
        let source = r#"
            class Box {
              init(value) { this.value = value; }
              get() { return this.value; }
            }
            var b = Box(3);
            print b.get();
            b.value = 4;
            print b.get();
            var m = b.get;
            b.value = 5;
            print m();
        "#;
        assert_eq!(output_of(source), "3\n4\n5\n");
    }

    #[test]
    fn test_fields_shadow_methods() {
        let source = r#"
            class A { m() { return "method"; } }
            var a = A();
            print a.m();
            a.m = "field";
            print a.m;
        "#;
        assert_eq!(output_of(source), "method\nfield\n");
    }

    #[test]
    fn test_property_errors() {
        assert_eq!(
            runtime_failure("class A {} A().missing;").1,
            "Undefined property 'missing'.\n[line 1]"
        );
        assert_eq!(
            runtime_failure("var x = 1; print x.y;").1,
            "Only instances have properties.\n[line 1]"
        );
        assert_eq!(
            runtime_failure("var x = 1; x.y = 2;").1,
            "Only instances have fields.\n[line 1]"
        );
    }

    #[test]
    fn test_initializer_returns_instance() {
        let source = r#"
            class Thing {
              init() {
                this.n = 1;
                return;
              }
            }
            var t = Thing();
            print t.init();
            print t.n;
        "#;
        assert_eq!(output_of(source), "Thing instance\n1\n");
    }

    #[test]
    fn test_initializer_return_value_is_discarded() {
        assert_eq!(
            output_of("class A { init() { return 42; } } print A();"),
            "A instance\n"
        );
    }

    #[test]
    fn test_inheritance_and_super() {
        let source = r#"
            class A {
              method() { print "A method"; }
            }
            class B < A {
              method() { print "B method"; }
              test() { super.method(); }
            }
            class C < B {}
            C().test();
            C().method();
        "#;
        assert_eq!(output_of(source), "A method\nB method\n");
    }

    #[test]
    fn test_inherited_initializer() {
        let source = r#"
            class Base { init(x) { this.x = x; } }
            class Derived < Base {
              init(x, y) {
                super.init(x);
                this.y = y;
              }
              sum() { return this.x + this.y; }
            }
            print Derived(2, 3).sum();
        "#;
        assert_eq!(output_of(source), "5\n");
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        let (_, error) = runtime_failure("var NotAClass = 1;\nclass B < NotAClass {}");
        assert_eq!(error, "Superclass must be a class.\n[line 2]");
    }

    #[test]
    fn test_this_is_bound_in_returned_closures() {
        let source = r#"
            class Greeter {
              init(name) { this.name = name; }
              greeter() {
                fun greet() { print "hi " + this.name; }
                return greet;
              }
            }
            var g = Greeter("lox").greeter();
            g();
        "#;
        assert_eq!(output_of(source), "hi lox\n");
    }

    #[test]
    fn test_deep_recursion_below_the_limit() {
        let source = format!(
            "fun down(n) {{ if (n > 0) return down(n - 1); return 0; }}\nprint down({});",
            MAX_CALL_DEPTH - 1
        );
        assert_eq!(output_of(&source), "0\n");
    }

    #[test]
    fn test_unbounded_recursion_is_a_runtime_error() {
        let (output, error) = runtime_failure(
            "print \"start\";\nfun forever(n) {\n  return forever(n + 1);\n}\nforever(0);",
        );
        assert_eq!(output, "start\n");
        assert_eq!(error, "Stack overflow.\n[line 3]");
    }

    #[test]
    fn test_recursive_initializers_hit_the_limit() {
        let (_, error) = runtime_failure("class Node { init() { this.next = Node(); } }\nNode();");
        assert_eq!(error, "Stack overflow.\n[line 1]");
    }

    #[test]
    fn test_depth_is_released_after_returning() {
        let source = format!(
            "fun down(n) {{ if (n > 0) return down(n - 1); return n; }}\n\
             for (var i = 0; i < 3; i = i + 1) print down({});",
            MAX_CALL_DEPTH - 1
        );
        assert_eq!(output_of(&source), "0\n0\n0\n");
    }
}
