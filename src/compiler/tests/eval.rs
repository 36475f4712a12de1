use super::*;

lazy_static::lazy_static! {
    // Programs exercising every way of leaving a block
    static ref BALANCED_PROGRAMS: Vec<(&'static str, &'static str)> = vec![
        ("straight line", "{ var int a = 1; { var int b = 2; { var int c = 3; } } var int d = 4; }"),
        ("loop with locals", "{
            var int i = 0;
            while (i < 5) { var int sq = i * i; i = i + 1; }
        }"),
        ("break and continue", "{
            var int i = 0;
            while (i < 10) {
                i = i + 1;
                var int half = i / 2;
                { var int twice = half * 2; if (twice == i) { continue; } }
                if (i > 6) { var int x = 1; break; }
            }
        }"),
        ("function frames", "{
            func int sum3(int a, int b, int c) { var int t = a + b; return t + c; }
            entry
            var int r = sum3(1, 2, 3);
            { var int s = sum3(r, r, r); }
        }"),
    ];
}

#[test]
fn test_arithmetic() {
    Tester::new_single_source_expect_ok("initializer", "{ var int x = 1 + 2; }")
        .run()
        .expect_ok()
        .assert_memory(0, Value::Int(3));

    Tester::new_single_source_expect_ok("dependent", "{ var int x = 1; var int y = x + 2; }")
        .assert_var_address("x", 0)
        .assert_var_address("y", 1)
        .run()
        .expect_ok()
        .assert_memory(0, Value::Int(1))
        .assert_memory(1, Value::Int(3));

    Tester::new_single_source_expect_ok("precedence", "{ var int x = 2 + 3 * 4 - 10 / 3; }")
        .run()
        .expect_ok()
        .assert_memory(0, Value::Int(11));

    Tester::new_single_source_expect_ok("float promotion", "{ var float f = 1.5; var int i = 3; f = f * i; }")
        .run()
        .expect_ok()
        .assert_memory(0, Value::Float(4.5));
}

#[test]
fn test_control_flow() {
    Tester::new_single_source_expect_ok("if", "{ var int x = 1; if (x < 10) { x = 100; } x = 5; }")
        .run()
        .expect_ok()
        .assert_memory(0, Value::Int(5));

    Tester::new_single_source_expect_ok("if taken", "{ var int x = 1; var int y; if (x < 10) { y = 100; } }")
        .run()
        .expect_ok()
        .assert_memory(1, Value::Int(100));

    Tester::new_single_source_expect_ok("if not taken", "{ var int x = 1; var int y = 7; if (x > 10) { y = 100; } }")
        .run()
        .expect_ok()
        .assert_memory(1, Value::Int(7));

    Tester::new_single_source_expect_ok("while", "{ var int x = 1; while (x < 10) { x = x + 1; } }")
        .run()
        .expect_ok()
        .assert_memory(0, Value::Int(10))
        .assert_stack(&[]);

    Tester::new_single_source_expect_ok("break and continue", "{
        var int i = 0;
        var int sum = 0;
        while (i < 10) {
            i = i + 1;
            var int even = i / 2 * 2;
            if (even == i) { continue; }
            if (i > 7) { break; }
            sum = sum + i;
        }
    }")
        .run()
        .expect_ok()
        .assert_memory(0, Value::Int(9))
        .assert_memory(1, Value::Int(16))
        .assert_memory_released();
}

#[test]
fn test_function_calls() {
    Tester::new_single_source_expect_ok("identity", "{ func int id(int x) { return x; } entry id(42); }")
        .run()
        .expect_ok()
        .assert_stack(&[Value::Int(42)])
        .assert_memory_released();

    Tester::new_single_source_expect_ok("argument order", "{
        func int sub(int a, int b) { return a - b; }
        entry
        var int r = sub(10, 3);
    }")
        .run()
        .expect_ok()
        .assert_memory(0, Value::Int(7))
        .assert_stack(&[]);

    Tester::new_single_source_expect_ok("recursion", "{
        func int fact(int n) {
            if (n < 2) { return 1; }
            return n * fact(n - 1);
        }
        entry
        var int result = fact(5);
    }")
        .run()
        .expect_ok()
        .assert_memory(0, Value::Int(120))
        .assert_memory_released();

    Tester::new_single_source_expect_ok("return from loop", "{
        func int first_above(int limit) {
            var int i = 0;
            while (1) {
                var int sq = i * i;
                if (sq > limit) { return i; }
                i = i + 1;
            }
            return 0;
        }
        entry
        var int r = first_above(50);
    }")
        .run()
        .expect_ok()
        .assert_memory(0, Value::Int(8))
        .assert_memory_released();
}

#[test]
fn test_assignment_values() {
    Tester::new_single_source_expect_ok("chained", "{ var int a; var int b; a = b = 7; }")
        .run()
        .expect_ok()
        .assert_memory(0, Value::Int(7))
        .assert_memory(1, Value::Int(7))
        .assert_stack(&[]);

    Tester::new_single_source_expect_ok("assignment as operand", "{ var int a; var int b = (a = 3) + 1; }")
        .run()
        .expect_ok()
        .assert_memory(0, Value::Int(3))
        .assert_memory(1, Value::Int(4));
}

#[test]
fn test_chained_comparison_is_left_associative() {
    // (3 < 2) < 1 is 0 < 1
    Tester::new_single_source_expect_ok("chained", "{ 3 < 2 < 1; }")
        .for_root(|root| {
            let block = root.as_code_block().unwrap();
            match &block.statements[0] {
                Node::Expression(expr) => {
                    assert_eq!(expr.operation, ExpressionOperator::Binary(BinaryOperator::LessThan));
                    assert!(matches!(&*expr.left, Node::Expression(_)));
                    assert!(matches!(&*expr.right, Node::NumberLiteral(_)));
                }
                other => panic!("unexpected statement {}", other.kind_name()),
            }
        })
        .run()
        .expect_ok()
        .assert_stack(&[Value::Int(1)]);
}

#[test]
fn test_runtime_failures() {
    Tester::new_single_source_expect_ok("division by zero", "{ var int x = 1 / 0; }")
        .run()
        .expect_err(RuntimeErrorKind::DivisionByZero);

    Tester::new_single_source_expect_ok("missing return", "{ func int f() { } entry f(); }")
        .run()
        .expect_err(RuntimeErrorKind::StackUnderflow { instruction: "ret", required: 1, available: 0 });
}

#[test]
fn test_blocks_release_their_memory() {
    for (name, source) in BALANCED_PROGRAMS.iter() {
        Tester::new_single_source_expect_ok(name, source)
            .run()
            .expect_ok()
            .assert_memory_released();
    }
}

#[test]
fn test_run_source() {
    let vm = crate::run_source("{ func int sq(int x) { return x * x; } entry var int y = sq(9); }").unwrap();
    assert_eq!(vm.memory()[0], Value::Int(81));
    assert!(vm.is_halted());

    match crate::run_source("{ var int x = y; }") {
        Err(crate::Error::Compile(err)) => {
            assert_eq!(err.kind, CompileErrorKind::UndeclaredIdentifier("y".to_string()))
        }
        other => panic!("unexpected result {:?}", other.map(|vm| vm.stack().to_vec())),
    }
}
