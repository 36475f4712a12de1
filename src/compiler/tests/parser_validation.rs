use super::*;

#[test]
fn test_redefinition_and_shadowing() {
    Tester::new_single_source_expect_err("same block", "{ var int x; var int x; }")
        .assert_kind(CompileErrorKind::Redefinition("x".to_string()))
        .assert_occurs_at("x; }");

    Tester::new_single_source_expect_err("function and variable", "{ var int f; func int f() { return 1; } }")
        .assert_kind(CompileErrorKind::Redefinition("f".to_string()));

    Tester::new_single_source_expect_err("duplicate parameter", "{ func int f(int a, int a) { return a; } }")
        .assert_kind(CompileErrorKind::Redefinition("a".to_string()));

    Tester::new_single_source_expect_ok("nested block", "{ var int x = 1; { var int x = 2; } }")
        .assert_var_address("x", 0)
        .run()
        .expect_ok()
        .assert_memory(0, Value::Int(1))
        .assert_memory(1, Value::Int(2));

    Tester::new_single_source_expect_ok("parameter shadows outer", "{ var int x; func int f(int x) { return x; } }");
}

#[test]
fn test_loop_context_errors() {
    let break_positions = [
        "{ break; }",
        "{ if (1) { break; } }",
        "{ { { break; } } }",
        "{ func int f() { break; } }",
        "{ while (1) { func int f() { break; } } }",
    ];
    for source in break_positions.iter() {
        Tester::new_single_source_expect_err(source, source)
            .assert_kind(CompileErrorKind::LoopError { statement: "break" })
            .assert_msg_has(0, "<break> statement is outside a loop")
            .assert_occurs_at("break");
    }

    let continue_positions = [
        "{ continue; }",
        "{ if (0) { continue; } }",
        "{ func int f() { continue; } }",
        "{ while (1) { func int f() { continue; } } }",
    ];
    for source in continue_positions.iter() {
        Tester::new_single_source_expect_err(source, source)
            .assert_kind(CompileErrorKind::LoopError { statement: "continue" })
            .assert_occurs_at("continue");
    }

    Tester::new_single_source_expect_ok("loop inside function", "{ func int f() { while (1) { break; } return 0; } }");
}

#[test]
fn test_return_context_errors() {
    let positions = ["{ return 1; }", "{ while (1) { return 1; } }", "{ { if (1) { return 0; } } }"];
    for source in positions.iter() {
        Tester::new_single_source_expect_err(source, source)
            .assert_kind(CompileErrorKind::InvalidReturn)
            .assert_msg_has(0, "Return statement outside function definition");
    }

    Tester::new_single_source_expect_ok("nested in function", "{ func int f() { while (1) { { return 1; } } } }");
}

#[test]
fn test_resolution_errors() {
    Tester::new_single_source_expect_err("undeclared type", "{ var bool b; }")
        .assert_kind(CompileErrorKind::UndeclaredType("bool".to_string()))
        .assert_occurs_at("bool");

    Tester::new_single_source_expect_err("undeclared identifier", "{ var int x;\n  y = 1; }")
        .assert_kind(CompileErrorKind::UndeclaredIdentifier("y".to_string()))
        .assert_line(2)
        .assert_occurs_at("y = 1");

    Tester::new_single_source_expect_err("used before declaration", "{ x = 1; var int x; }")
        .assert_kind(CompileErrorKind::UndeclaredIdentifier("x".to_string()));

    Tester::new_single_source_expect_err("initializer sees outer scope only", "{ var int x = x; }")
        .assert_kind(CompileErrorKind::UndeclaredIdentifier("x".to_string()));

    Tester::new_single_source_expect_err("call of variable", "{ var int x; x(1); }")
        .assert_kind(CompileErrorKind::NotAFunction("x".to_string()));

    Tester::new_single_source_expect_err("function as value", "{ func int f() { return 1; } var int y = f; }")
        .assert_kind(CompileErrorKind::NotAVariable("f".to_string()));

    Tester::new_single_source_expect_err("outer frame", "{ var int g = 1; func int f() { return g; } }")
        .assert_kind(CompileErrorKind::VariableOutsideFrame("g".to_string()))
        .assert_occurs_at("g; }");

    Tester::new_single_source_expect_ok("recursion", "{ func int f(int n) { return f(n); } }");
}

#[test]
fn test_call_arity() {
    Tester::new_single_source_expect_err("too many", "{ func int f(int a) { return a; } entry f(1, 2); }")
        .assert_kind(CompileErrorKind::ArityMismatch { function: "f".to_string(), expected: 1, found: 2 })
        .assert_occurs_at("f(1, 2)");

    Tester::new_single_source_expect_err("too few", "{ func int f(int a, int b) { return a; } entry f(); }")
        .assert_kind(CompileErrorKind::ArityMismatch { function: "f".to_string(), expected: 2, found: 0 });
}

#[test]
fn test_syntax_errors() {
    Tester::new_single_source_expect_err("missing semicolon", "{ var int x }")
        .assert_kind(CompileErrorKind::UnexpectedToken { found: "}".to_string(), index: 4 })
        .assert_num(2)
        .assert_msg_has(0, "Unexpected token <}> at position 4")
        .assert_msg_has(1, "expected ';' here");

    Tester::new_single_source_expect_err("else is unsupported", "{ if (1) { } else { } }")
        .assert_kind(CompileErrorKind::UnexpectedToken { found: "else".to_string(), index: 7 })
        .assert_occurs_at("else");

    Tester::new_single_source_expect_err("trailing tokens", "{ } }")
        .assert_kind(CompileErrorKind::UnexpectedToken { found: "}".to_string(), index: 2 });

    Tester::new_single_source_expect_err("unterminated", "{ var int x;")
        .assert_kind(CompileErrorKind::UnexpectedToken { found: "<eof>".to_string(), index: 5 });

    Tester::new_single_source_expect_err("program is a block", "var int x;")
        .assert_kind(CompileErrorKind::UnexpectedToken { found: "var".to_string(), index: 0 });

    Tester::new_single_source_expect_err("assign to literal", "{ var int x; 1 = x; }")
        .assert_kind(CompileErrorKind::InvalidAssignmentTarget);

    Tester::new_single_source_expect_err("assign to sum", "{ var int x; x + 1 = x; }")
        .assert_kind(CompileErrorKind::InvalidAssignmentTarget);

    Tester::new_single_source_expect_err("array subscript", "{ var int x; x[0] = 1; }")
        .assert_kind(CompileErrorKind::ArraySubscriptUnsupported)
        .assert_occurs_at("[0]");

    Tester::new_single_source_expect_err("unknown character", "{ var int x = 1 % 2; }")
        .assert_kind(CompileErrorKind::Lexical)
        .assert_occurs_at("%");
}

#[test]
fn test_comments_are_stripped() {
    Tester::new_single_source_expect_ok("comments", "{ // a block\n  var int x = 1; // one\n  // var int x;\n}")
        .assert_listing(&["push 1", "alloc", "push 1", "store 0", "push 1", "dealloc"]);

    let mut config = CompileConfig::default();
    config.comment_marker = String::from("#");
    Tester::new("custom marker", "{ var int x; # x = y;\n }")
        .with_config(config)
        .compile()
        .expect_ok()
        .assert_listing(&["push 1", "alloc", "push 1", "dealloc"]);
}

#[test]
fn test_configured_types_and_nesting() {
    let mut config = CompileConfig::default();
    config.builtin_types.push((String::from("pair"), 2));
    Tester::new("wide type", "{ var pair p; var int x; }")
        .with_config(config)
        .compile()
        .expect_ok()
        .assert_var_address("p", 0)
        .assert_var_address("x", 2)
        .assert_listing(&["push 2", "alloc", "push 1", "alloc", "push 3", "dealloc"]);

    let mut config = CompileConfig::default();
    config.max_nesting = 4;
    Tester::new("too deep", "{ { { { { } } } } }")
        .with_config(config.clone())
        .compile()
        .expect_err()
        .assert_kind(CompileErrorKind::NestingTooDeep);
    Tester::new("deep enough", "{ { { { } } } }")
        .with_config(config)
        .compile()
        .expect_ok();
}

#[test]
fn test_frame_address_space_exhausted() {
    let mut config = CompileConfig::default();
    config.builtin_types.push((String::from("huge"), u32::MAX - 1));
    Tester::new("one fits", "{ var int a; var huge h; }")
        .with_config(config.clone())
        .compile()
        .expect_ok()
        .assert_var_address("h", 1);

    Tester::new("declarations", "{ var huge h; var int a; var int b; }")
        .with_config(config.clone())
        .compile()
        .expect_err()
        .assert_kind(CompileErrorKind::FrameTooLarge(String::from("b")))
        .assert_occurs_at("b;")
        .assert_msg_has(0, "does not fit");

    Tester::new("parameters", "{ func int f(huge h, int a, int b) { return a; } }")
        .with_config(config)
        .compile()
        .expect_err()
        .assert_kind(CompileErrorKind::FrameTooLarge(String::from("b")))
        .assert_occurs_at("b)");
}

#[test]
fn test_ast_printer() {
    Tester::new_single_source_expect_ok("declaration", "{ var int x = 1; }")
        .for_ast(|ast| {
            assert!(ast.starts_with("SBl [0000]- Block:\n"), "{}", ast);
            assert!(ast.contains("SDcl[0001]    - Declaration:\n"), "{}", ast);
            assert!(ast.contains("                - Address: Some(0)\n"), "{}", ast);
            assert!(ast.contains("ECns[0002]        - Number: 1\n"), "{}", ast);
        });

    Tester::new_single_source_expect_ok("function", "{ func int id(int v) { return v; } }")
        .for_ast(|ast| {
            assert!(ast.contains("- Label: func_id\n"), "{}", ast);
            assert!(ast.contains("- v: int @ Some(0)\n"), "{}", ast);
            assert!(ast.contains("- Variable: v\n"), "{}", ast);
        });
}

#[test]
fn test_compiler_logging() {
    let mut compiler = Compiler::with_logger(CompileConfig::default(), Box::new(StringLogger::new("compiler")));
    compiler.compile("{ var int x = 1; }").unwrap();
    let mut dumped = Vec::new();
    compiler.logger().dump_log(&mut dumped);
    let dumped = String::from_utf8(dumped).unwrap();
    if !cfg!(feature = "no_logging") {
        assert!(dumped.contains("compiler: Tokenized 8 token(s)"), "{}", dumped);
        assert!(dumped.contains("compiler: Generated 6 statement(s)"), "{}", dumped);
    }
}

#[test]
fn test_compile_file() {
    let dir = std::env::temp_dir();
    let good = dir.join(format!("stacklang_good_{}.sl", std::process::id()));
    let bad = dir.join(format!("stacklang_bad_{}.sl", std::process::id()));
    std::fs::write(&good, "{ entry var int x = 3; }").unwrap();
    std::fs::write(&bad, "{\n  var int x = y;\n}").unwrap();

    let mut compiler = Compiler::default();
    let listing = compiler.compile_file(&good).unwrap();
    assert!(listing.has_entry_point());

    let err = compiler.compile_file(&bad).unwrap_err();
    let rendered = err.to_string();
    let expected = format!("--> {}:2:15", bad.file_name().unwrap().to_string_lossy());
    assert!(rendered.contains(&expected), "{}", rendered);

    let missing = dir.join("stacklang_does_not_exist.sl");
    assert!(matches!(compiler.compile_file(&missing), Err(crate::Error::Io(_))));

    let _ = std::fs::remove_file(good);
    let _ = std::fs::remove_file(bad);
}
