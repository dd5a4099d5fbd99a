#[cfg(test)]
mod parser_tests {
    use lox_interpreter as lox;

    use lox::ast_printer::AstPrinter;
    use lox::expr::Expr;
    use lox::parser::Parser;
    use lox::scanner::Scanner;
    use lox::stmt::Stmt;
    use lox::token::Token;

    fn scan(source: &str) -> Vec<Token> {
        Scanner::new(source.as_bytes())
            .map(|r| r.expect("unexpected lexical error"))
            .collect()
    }

    fn parse_expr(source: &str) -> String {
        let mut parser = Parser::new(scan(source));
        let expr = parser.parse_expression().expect("unexpected parse error");
        AstPrinter::print(&expr)
    }

    fn parse_program(source: &str) -> (Vec<Stmt>, bool) {
        let mut parser = Parser::new(scan(source));
        let statements = parser.parse_program();
        (statements, parser.had_error())
    }

    #[test]
    fn literals_print_canonically() {
        assert_eq!(parse_expr("42"), "42.0");
        assert_eq!(parse_expr("1.2300"), "1.23");
        assert_eq!(parse_expr("\"hi\""), "hi");
        assert_eq!(parse_expr("true"), "true");
        assert_eq!(parse_expr("nil"), "nil");
    }

    #[test]
    fn factor_binds_tighter_than_term() {
        assert_eq!(parse_expr("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(parse_expr("1 * 2 - 3 / 4"), "(- (* 1.0 2.0) (/ 3.0 4.0))");
    }

    #[test]
    fn grouping_overrides_precedence() {
        assert_eq!(parse_expr("(1 + 2) * 3"), "(* (group (+ 1.0 2.0)) 3.0)");
    }

    #[test]
    fn binary_operators_are_left_associative() {
        assert_eq!(parse_expr("1 - 2 - 3"), "(- (- 1.0 2.0) 3.0)");
        assert_eq!(parse_expr("1 / 2 / 3"), "(/ (/ 1.0 2.0) 3.0)");
    }

    #[test]
    fn unary_is_right_associative() {
        assert_eq!(parse_expr("!!true"), "(! (! true))");
        assert_eq!(parse_expr("--1"), "(- (- 1.0))");
    }

    #[test]
    fn comparison_binds_tighter_than_equality() {
        assert_eq!(parse_expr("1 < 2 == true"), "(== (< 1.0 2.0) true)");
    }

    #[test]
    fn and_binds_tighter_than_or() {
        assert_eq!(parse_expr("a or b and c"), "(or a (and b c))");
        assert_eq!(parse_expr("a and b or c"), "(or (and a b) c)");
    }

    #[test]
    fn assignment_is_right_associative_and_lowest() {
        assert_eq!(parse_expr("a = b = c"), "(= a (= b c))");
        assert_eq!(parse_expr("a = b or c"), "(= a (or b c))");
    }

    #[test]
    fn calls_and_property_access_chain() {
        assert_eq!(parse_expr("f(1)(2)"), "(call (call f 1.0) 2.0)");
        assert_eq!(parse_expr("p.x.y"), "(. (. p x) y)");
        assert_eq!(parse_expr("p.x = 1"), "(= (. p x) 1.0)");
        assert_eq!(parse_expr("f(a, b).c"), "(. (call f a b) c)");
    }

    #[test]
    fn redundant_grouping_changes_nothing_but_group_nodes() {
        assert_eq!(parse_expr("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(parse_expr("1 + (2 * 3)"), "(+ 1.0 (group (* 2.0 3.0)))");
        assert_eq!(parse_expr("!a == b"), "(== (! a) b)");
        assert_eq!(parse_expr("(!a) == b"), "(== (group (! a)) b)");
    }

    #[test]
    fn for_loop_desugars_to_while_in_a_block() {
        let (statements, had_error) =
            parse_program("for (var i = 0; i < 3; i = i + 1) print i;");

        assert!(!had_error);
        assert_eq!(statements.len(), 1);

        // { var i; while (i < 3) { print i; i = i + 1; } }
        let Stmt::Block(outer) = &statements[0] else {
            panic!("expected desugared block, got {:?}", statements[0]);
        };
        assert_eq!(outer.len(), 2);
        assert!(matches!(&outer[0], Stmt::Var { name, .. } if name.lexeme == "i"));

        let Stmt::While { body, .. } = &outer[1] else {
            panic!("expected while loop, got {:?}", outer[1]);
        };
        let Stmt::Block(inner) = body.as_ref() else {
            panic!("expected loop body block, got {:?}", body);
        };
        assert_eq!(inner.len(), 2);
        assert!(matches!(&inner[0], Stmt::Print(_)));
        assert!(matches!(&inner[1], Stmt::Expression(Expr::Assign { .. })));
    }

    #[test]
    fn for_loop_without_condition_uses_true() {
        let (statements, had_error) = parse_program("for (;;) print 1;");

        assert!(!had_error);
        assert_eq!(statements.len(), 1);

        let Stmt::While { condition, .. } = &statements[0] else {
            panic!("expected bare while, got {:?}", statements[0]);
        };
        assert_eq!(AstPrinter::print(condition), "true");
    }

    #[test]
    fn invalid_assignment_target_is_reported_but_keeps_lhs() {
        let (statements, had_error) = parse_program("a + b = c;");

        assert!(had_error);
        // The statement survives with the LHS expression.
        assert_eq!(statements.len(), 1);
        assert!(matches!(
            &statements[0],
            Stmt::Expression(Expr::Binary { .. })
        ));
    }

    #[test]
    fn parser_synchronizes_at_statement_boundaries() {
        let (statements, had_error) = parse_program("var 1 = 2; print 3;");

        assert!(had_error);
        assert_eq!(statements.len(), 1);
        assert!(matches!(&statements[0], Stmt::Print(_)));
    }

    #[test]
    fn parser_synchronizes_at_declaration_keywords() {
        let (statements, had_error) = parse_program("print (1; var x = 2;");

        assert!(had_error);
        assert_eq!(statements.len(), 1);
        assert!(matches!(&statements[0], Stmt::Var { .. }));
    }

    #[test]
    fn error_at_end_location() {
        let mut parser = Parser::new(scan("(1 + 2"));
        let err = parser.parse_expression().unwrap_err();

        assert_eq!(
            err.to_string(),
            "[line 1] Error at end: Expect ')' after expression."
        );
    }

    #[test]
    fn error_at_token_location() {
        let mut parser = Parser::new(scan("1 +"));
        let err = parser.parse_expression().unwrap_err();

        assert_eq!(err.to_string(), "[line 1] Error at end: Expect expression.");

        let mut parser = Parser::new(scan("+ 1"));
        let err = parser.parse_expression().unwrap_err();

        assert_eq!(err.to_string(), "[line 1] Error at '+': Expect expression.");
    }

    #[test]
    fn class_declaration_collects_methods() {
        let (statements, had_error) =
            parse_program("class Point { init(x, y) { this.x = x; } len() { return 0; } }");

        assert!(!had_error);
        assert_eq!(statements.len(), 1);

        let Stmt::Class { name, methods } = &statements[0] else {
            panic!("expected class, got {:?}", statements[0]);
        };
        assert_eq!(name.lexeme, "Point");
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].name.lexeme, "init");
        assert_eq!(methods[0].params.len(), 2);
        assert_eq!(methods[1].name.lexeme, "len");
    }
}
