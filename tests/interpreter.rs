#[cfg(test)]
mod interpreter_tests {
    use lox_interpreter as lox;

    use lox::error::LoxError;
    use lox::interpreter::Interpreter;
    use lox::parser::Parser;
    use lox::resolver::Resolver;
    use lox::scanner::Scanner;
    use lox::token::Token;

    fn scan(source: &str) -> Vec<Token> {
        Scanner::new(source.as_bytes())
            .map(|r| r.expect("unexpected lexical error"))
            .collect()
    }

    /// Run a program, capturing `print` output and the runtime-error flag.
    /// Panics on front-end errors so tests fail loudly on bad fixtures.
    fn run_capturing(source: &str) -> (String, bool) {
        let mut parser = Parser::new(scan(source));
        let statements = parser.parse_program();
        assert!(!parser.had_error(), "unexpected parse error");

        let mut output: Vec<u8> = Vec::new();
        let had_runtime_error;
        {
            let mut interpreter = Interpreter::new(&mut output);

            let mut resolver = Resolver::new(&mut interpreter);
            resolver.resolve(&statements);
            assert!(!resolver.had_error(), "unexpected resolve error");

            interpreter.interpret(&statements);
            had_runtime_error = interpreter.had_runtime_error();
        }

        (
            String::from_utf8(output).expect("print output is not UTF-8"),
            had_runtime_error,
        )
    }

    fn run(source: &str) -> String {
        let (output, had_runtime_error) = run_capturing(source);
        assert!(!had_runtime_error, "unexpected runtime error");
        output
    }

    /// Evaluate a single expression the way the evaluate mode does.
    fn evaluate(source: &str) -> Result<String, LoxError> {
        let mut parser = Parser::new(scan(source));
        let expr = parser.parse_expression().expect("unexpected parse error");

        let mut interpreter = Interpreter::new(Vec::new());
        interpreter.evaluate(&expr).map(|v| v.to_string())
    }

    /// Resolve a program and report whether the static pass rejected it.
    fn resolver_rejects(source: &str) -> bool {
        let mut parser = Parser::new(scan(source));
        let statements = parser.parse_program();
        assert!(!parser.had_error(), "unexpected parse error");

        let mut interpreter = Interpreter::new(Vec::new());
        let mut resolver = Resolver::new(&mut interpreter);
        resolver.resolve(&statements);
        resolver.had_error()
    }

    // ── expression evaluation ────────────────────────────────────────────

    #[test]
    fn arithmetic_and_stringification() {
        assert_eq!(evaluate("1 + 2 * 3").unwrap(), "7");
        assert_eq!(evaluate("10 / 2").unwrap(), "5");
        assert_eq!(evaluate("10 / 4").unwrap(), "2.5");
        assert_eq!(evaluate("-(1 + 2)").unwrap(), "-3");
        assert_eq!(evaluate("\"foo\" + \"bar\"").unwrap(), "foobar");
        assert_eq!(evaluate("!nil").unwrap(), "true");
        assert_eq!(evaluate("nil").unwrap(), "nil");
    }

    #[test]
    fn comparison_and_equality() {
        assert_eq!(evaluate("1 < 2").unwrap(), "true");
        assert_eq!(evaluate("2 <= 1").unwrap(), "false");
        assert_eq!(evaluate("1 == 1").unwrap(), "true");
        assert_eq!(evaluate("nil == nil").unwrap(), "true");
        assert_eq!(evaluate("nil == false").unwrap(), "false");
        // No string-to-number coercion at `==`.
        assert_eq!(evaluate("\"1\" == 1").unwrap(), "false");
        assert_eq!(evaluate("\"a\" != \"b\"").unwrap(), "true");
    }

    #[test]
    fn division_follows_ieee_754() {
        assert_eq!(evaluate("1 / 0").unwrap(), "inf");
        assert_eq!(evaluate("-1 / 0").unwrap(), "-inf");
        assert_eq!(evaluate("0 / 0").unwrap(), "NaN");
    }

    #[test]
    fn type_errors_carry_the_offending_line() {
        let err = evaluate("\"a\" + 1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Operands must be two numbers or two strings.\n[line 1]"
        );

        let err = evaluate("-\"a\"").unwrap_err();
        assert_eq!(err.to_string(), "Operand must be a number.\n[line 1]");

        let err = evaluate("1 < \"a\"").unwrap_err();
        assert_eq!(err.to_string(), "Operands must be numbers.\n[line 1]");
    }

    // ── statements, scoping, control flow ────────────────────────────────

    #[test]
    fn print_writes_to_the_sink() {
        assert_eq!(run("print 1 + 1;"), "2\n");
        assert_eq!(run("print \"hi\"; print true; print nil;"), "hi\ntrue\nnil\n");
    }

    #[test]
    fn block_scopes_shadow_and_restore() {
        let source = r#"
            var a = "outer";
            {
                var a = "inner";
                print a;
            }
            print a;
        "#;
        assert_eq!(run(source), "inner\nouter\n");
    }

    #[test]
    fn assignment_in_inner_block_mutates_defining_frame() {
        assert_eq!(run("var a = 1; { a = 2; } print a;"), "2\n");
    }

    #[test]
    fn if_else_and_truthiness() {
        assert_eq!(
            run("if (0) print \"zero\"; if (\"\") print \"empty\"; if (nil) print \"nil\"; else print \"no\";"),
            "zero\nempty\nno\n"
        );
    }

    #[test]
    fn while_loop_runs_to_falsy() {
        assert_eq!(
            run("var i = 0; while (i < 3) { print i; i = i + 1; }"),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn for_loop_desugaring_executes() {
        assert_eq!(
            run("for (var i = 0; i < 3; i = i + 1) print i;"),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn logical_operators_return_an_operand() {
        assert_eq!(run("print nil or \"hi\"; print 0 and 1;"), "hi\n1\n");
        assert_eq!(run("print false or false; print \"a\" or \"b\";"), "false\na\n");
    }

    #[test]
    fn logical_operators_short_circuit_side_effects() {
        let source = r#"
            fun boom() { print "evaluated"; return true; }
            var x = true or boom();
            var y = false and boom();
            print x;
            print y;
        "#;
        assert_eq!(run(source), "true\nfalse\n");
    }

    // ── functions and closures ───────────────────────────────────────────

    #[test]
    fn closures_capture_frames_by_reference() {
        let source = r#"
            var a = 1;
            fun f() { print a; }
            a = 2;
            f();
        "#;
        assert_eq!(run(source), "2\n");
    }

    #[test]
    fn counter_closure_keeps_private_state() {
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
        assert_eq!(run(source), "1\n2\n");
    }

    #[test]
    fn shadowed_capture_stays_bound_to_declaration_scope() {
        let source = r#"
            var a = "global";
            {
                fun show() { print a; }
                show();
                var a = "block";
                show();
            }
        "#;
        assert_eq!(run(source), "global\nglobal\n");
    }

    #[test]
    fn return_unwinds_to_the_nearest_call() {
        let source = r#"
            fun max(x, y) {
                if (x > y) {
                    return x;
                }
                return y;
            }
            print max(10, 20);
        "#;
        assert_eq!(run(source), "20\n");
    }

    #[test]
    fn function_falls_through_to_nil() {
        assert_eq!(run("fun f() {} print f();"), "nil\n");
    }

    #[test]
    fn recursion_resolves_through_the_declaring_scope() {
        let source = r#"
            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(10);
        "#;
        assert_eq!(run(source), "55\n");
    }

    #[test]
    fn callable_values_print_their_names() {
        assert_eq!(run("fun f() {} print f;"), "<fn f>\n");
        assert_eq!(run("class A {} print A;"), "A\n");
        assert_eq!(run("class A {} print A();"), "A instance\n");
        assert_eq!(run("print clock;"), "<native fn clock>\n");
    }

    #[test]
    fn clock_returns_a_positive_number() {
        assert_eq!(run("print clock() > 0;"), "true\n");
    }

    // ── classes, instances, this ─────────────────────────────────────────

    #[test]
    fn methods_dispatch_through_instances() {
        let source = r#"
            class Bacon {
                eat() { print "Crunch!"; }
            }
            Bacon().eat();
        "#;
        assert_eq!(run(source), "Crunch!\n");
    }

    #[test]
    fn initializer_stores_fields_via_this() {
        let source = r#"
            class Point {
                init(x, y) { this.x = x; this.y = y; }
            }
            var p = Point(3, 4);
            print p.x + p.y;
        "#;
        assert_eq!(run(source), "7\n");
    }

    #[test]
    fn bound_methods_retain_their_receiver() {
        let source = r#"
            class Bacon {
                eat() { print "Crunch!"; }
            }
            var m = Bacon().eat;
            m();
        "#;
        assert_eq!(run(source), "Crunch!\n");
    }

    #[test]
    fn fields_shadow_methods() {
        let source = r#"
            class Box {
                label() { return "method"; }
            }
            var b = Box();
            b.label = "field";
            print b.label;
        "#;
        assert_eq!(run(source), "field\n");
    }

    #[test]
    fn initializer_returns_this_even_when_called_directly() {
        let source = r#"
            class Foo {
                init() { this.x = 1; }
            }
            var foo = Foo();
            print foo.init().x;
        "#;
        assert_eq!(run(source), "1\n");
    }

    #[test]
    fn bare_return_in_initializer_yields_the_instance() {
        let source = r#"
            class Guard {
                init(n) {
                    if (n < 0) return;
                    this.n = n;
                }
            }
            print Guard(1).n;
        "#;
        assert_eq!(run(source), "1\n");
    }

    #[test]
    fn methods_on_separate_instances_see_separate_fields() {
        let source = r#"
            class Cell {
                init(v) { this.v = v; }
                get() { return this.v; }
            }
            var a = Cell(1);
            var b = Cell(2);
            print a.get() + b.get();
        "#;
        assert_eq!(run(source), "3\n");
    }

    // ── runtime errors ───────────────────────────────────────────────────

    #[test]
    fn runtime_error_sets_flag_and_stops_execution() {
        let (output, had_runtime_error) = run_capturing("print 1; print missing; print 2;");
        assert!(had_runtime_error);
        assert_eq!(output, "1\n");
    }

    #[test]
    fn calling_a_non_callable_is_a_runtime_error() {
        let (_, had_runtime_error) = run_capturing("var x = 1; x();");
        assert!(had_runtime_error);
    }

    #[test]
    fn arity_mismatch_is_a_runtime_error() {
        let (_, had_runtime_error) = run_capturing("fun f(a) {} f(1, 2);");
        assert!(had_runtime_error);
    }

    #[test]
    fn property_access_on_non_instance_is_a_runtime_error() {
        let (_, had_runtime_error) = run_capturing("var x = 1; print x.y;");
        assert!(had_runtime_error);

        let (_, had_runtime_error) = run_capturing("class A {} var a = A(); print a.missing;");
        assert!(had_runtime_error);
    }

    // ── resolver rules ───────────────────────────────────────────────────

    #[test]
    fn resolver_rejects_self_referential_initializer() {
        assert!(resolver_rejects("var a = \"outer\"; { var a = a; }"));
    }

    #[test]
    fn resolver_rejects_duplicate_locals() {
        assert!(resolver_rejects("{ var a = 1; var a = 2; }"));
        // Globals may be redeclared freely.
        assert!(!resolver_rejects("var a = 1; var a = 2;"));
    }

    #[test]
    fn resolver_rejects_top_level_return() {
        assert!(resolver_rejects("return 1;"));
    }

    #[test]
    fn resolver_rejects_value_return_from_initializer() {
        assert!(resolver_rejects("class Foo { init() { return 1; } }"));
        assert!(!resolver_rejects("class Foo { init() { return; } }"));
    }

    #[test]
    fn resolver_rejects_this_outside_a_class() {
        assert!(resolver_rejects("print this;"));
        assert!(resolver_rejects("fun f() { print this; }"));
    }
}
