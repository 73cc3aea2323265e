use crate::error::{CompileError, Result};
use crate::interp::program::{InterpreterConfig, parse_and_build_with};
use std::cell::RefCell;
use std::rc::Rc;

fn run(source: &str) -> (Result<i32>, String) {
    let buffer = Rc::new(RefCell::new(Vec::new()));
    let result = parse_and_build_with(source, buffer.clone(), InterpreterConfig::default())
        .and_then(|program| program.execute("main"));
    let output = String::from_utf8(buffer.borrow().clone()).unwrap();
    (result, output)
}

fn exit_code(source: &str) -> i32 {
    match run(source).0 {
        Ok(code) => code,
        Err(err) => panic!("program failed: {err}"),
    }
}

fn static_error(source: &str) -> String {
    match run(source).0 {
        Err(err @ CompileError::Semantic { .. }) => err.message().to_string(),
        Err(other) => panic!("expected a static error, got {other}"),
        Ok(code) => panic!("expected a static error, program exited with {code}"),
    }
}

// ============================================
// Expressions
// ============================================

#[test]
fn test_arithmetic_and_precedence() {
    assert_eq!(exit_code("int main() { return 2 + 3 * 4 - 10 / 5; }"), 12);
    assert_eq!(exit_code("int main() { return (2 + 3) * 4 % 7; }"), 6);
    assert_eq!(exit_code("int main() { return -3 + ~0 + +1; }"), -3);
}

#[test]
fn test_long_arithmetic_is_separate() {
    let err = static_error("int main() { long a = 1L; return a + 1; }");
    assert_eq!(
        err,
        "Type 'long' does not have a matching operator '+' for 'int'"
    );
    assert_eq!(
        exit_code("int main() { long a = 5000000000L; a = a - 4999999999L; if (a == 1L) { return 1; } return 0; }"),
        1
    );
}

#[test]
fn test_undefined_value() {
    assert_eq!(
        static_error("int main() { return y; }"),
        "Undefined value 'y'"
    );
}

#[test]
fn test_assignment_rules() {
    assert_eq!(
        static_error("int main() { 1 = 2; return 0; }"),
        "Target of an assignment must be an identifier or a member accessor"
    );
    assert_eq!(
        static_error("int f() { return 1; } int main() { f = 2; return 0; }"),
        "Can not assign to callable"
    );
    assert_eq!(
        static_error("int main() { int x; x = true; return x; }"),
        "Incompatible types. Expected 'int' got 'bool'"
    );
}

#[test]
fn test_assignment_yields_value() {
    assert_eq!(
        exit_code("int main() { int a; int b; a = b = 4; return a + b; }"),
        8
    );
}

#[test]
fn test_increment_and_decrement() {
    assert_eq!(
        exit_code("int main() { int i = 5; int old = i++; return old * 10 + i; }"),
        56
    );
    assert_eq!(
        exit_code("int main() { int i = 5; int now = --i; return now * 10 + i; }"),
        44
    );
}

#[test]
fn test_missing_unary_operator() {
    assert_eq!(
        static_error("int main() { bool b; b++; return 0; }"),
        "Type 'bool' does not implement suffix operator '++'"
    );
    assert_eq!(
        static_error("int main() { string s; -s; return 0; }"),
        "Type 'string' does not implement unary operator '-'"
    );
}

#[test]
fn test_short_circuit_skips_right_side() {
    let source = "
        int calls;
        bool touch() { calls++; return true; }
        int main() {
            bool a = false && touch();
            bool b = true || touch();
            bool c = true && touch();
            return calls;
        }";
    assert_eq!(exit_code(source), 1);
}

#[test]
fn test_boolean_operators_accept_any_condition_type() {
    assert_eq!(
        exit_code("int main() { int x = 3; string s = \"\"; if (x && !(s == \"a\")) { return 1; } return 0; }"),
        1
    );
    assert_eq!(
        exit_code("int main() { string s; if (s || 0) { return 1; } return 2; }"),
        2
    );
}

#[test]
fn test_condition_must_be_a_value() {
    assert_eq!(
        static_error("void f() {} int main() { if (f()) { return 1; } return 0; }"),
        "Value of type 'void' can not be used as a condition"
    );
}

#[test]
fn test_division_by_zero_is_runtime_error() {
    let (result, _) = run("int main() { int zero; return 1 / zero; }");
    let err = result.unwrap_err();
    assert!(!err.is_static());
    assert_eq!(err.message(), "division by zero");
}

// ============================================
// Calls
// ============================================

#[test]
fn test_overload_resolution() {
    let source = "
        int pick(int a) { return 1; }
        int pick(long a) { return 2; }
        int pick(int a, int b) { return 3; }
        int main() { return pick(1) * 100 + pick(1L) * 10 + pick(1, 2); }";
    assert_eq!(exit_code(source), 123);
}

#[test]
fn test_no_matching_overload() {
    assert_eq!(
        static_error("int f(int a) { return a; } int main() { return f(true); }"),
        "No matching overload: [bool]"
    );
}

#[test]
fn test_calling_a_variable() {
    assert_eq!(
        static_error("int main() { int x; return x(1); }"),
        "Symbol is not a function"
    );
}

#[test]
fn test_value_and_reference_parameters() {
    let source = "
        void by_value(int n) { n = 100; }
        void by_ref(int& n) { n = 7; }
        int main() {
            int x = 1;
            by_value(x);
            int before = x;
            by_ref(x);
            return before * 10 + x;
        }";
    assert_eq!(exit_code(source), 17);
}

#[test]
fn test_call_before_definition() {
    assert_eq!(
        exit_code("int main() { return later(4); } int later(int n) { return n + 1; }"),
        5
    );
}

#[test]
fn test_runtime_error_inside_call_is_wrapped() {
    let (result, _) = run("int div(int a) { return 10 / a; } int main() { return div(0); }");
    let err = result.unwrap_err();
    assert!(err.message().starts_with("call to 'div(0)"), "{err}");
    assert!(err.message().ends_with("failed: division by zero"), "{err}");
}

// ============================================
// Statements
// ============================================

#[test]
fn test_shadowing_leaves_outer_unchanged() {
    let source = "
        int main() {
            int test = 1;
            {
                int test = 42;
                test++;
            }
            return test;
        }";
    assert_eq!(exit_code(source), 1);
}

#[test]
fn test_redefinition_in_same_block() {
    assert_eq!(
        static_error("int main() { int a; long a; return 0; }"),
        "'a' was already defined"
    );
}

#[test]
fn test_initializer_does_not_see_new_variable() {
    assert_eq!(
        static_error("int main() { int a = a; return a; }"),
        "Undefined value 'a'"
    );
}

#[test]
fn test_reference_variables_alias() {
    let source = "
        int main() {
            int x = 1;
            int& r = x;
            r = 9;
            int copy = x;
            copy = 3;
            return x;
        }";
    assert_eq!(exit_code(source), 9);
}

#[test]
fn test_reference_variable_requires_initializer() {
    assert_eq!(
        static_error("int main() { int& r; return 0; }"),
        "Declaration of reference variable 'r' required an initializer"
    );
}

#[test]
fn test_if_else_chain() {
    let source = "
        int classify(int n) {
            if (n < 0) { return 0; }
            else if (n == 0) { return 1; }
            else { return 2; }
        }
        int main() { return classify(-5) * 100 + classify(0) * 10 + classify(8); }";
    assert_eq!(exit_code(source), 12);
}

#[test]
fn test_while_with_break_and_continue() {
    let source = "
        int main() {
            int i = 0;
            int sum = 0;
            while (true) {
                i++;
                if (i > 10) { break; }
                if (i % 2 == 0) { continue; }
                sum = sum + i;
            }
            return sum;
        }";
    assert_eq!(exit_code(source), 25);
}

#[test]
fn test_do_while_runs_once() {
    assert_eq!(
        exit_code("int main() { int n = 0; do { n++; } while (false); return n; }"),
        1
    );
}

#[test]
fn test_for_loop_scope_and_order() {
    let source = "
        int main() {
            int total = 0;
            for (int i = 0; i < 5; i++) {
                if (i == 2) { continue; }
                total = total * 10 + i;
            }
            int i = 100;
            return total + i;
        }";
    assert_eq!(exit_code(source), 134 + 100);
}

#[test]
fn test_for_without_condition() {
    assert_eq!(
        exit_code("int main() { int n; for (;;) { n++; if (n == 3) { break; } } return n; }"),
        3
    );
}

#[test]
fn test_return_from_inside_loop() {
    assert_eq!(
        exit_code("int main() { for (int i = 0; ; i++) { if (i == 6) { return i; } } }"),
        6
    );
}

#[test]
fn test_break_outside_loop() {
    assert_eq!(
        static_error("int main() { break; return 0; }"),
        "'break' can only be used inside a loop"
    );
    assert_eq!(
        static_error("int main() { if (true) { continue; } return 0; }"),
        "'continue' can only be used inside a loop"
    );
}

#[test]
fn test_return_type_checks() {
    assert_eq!(
        static_error("int main() { return true; }"),
        "Incompatible return type. Expected 'int' got 'bool'"
    );
    assert_eq!(
        static_error("void f() { return 1; } int main() { return 0; }"),
        "Void function 'f' can not return a value"
    );
    assert_eq!(
        static_error("int main() { int x; }"),
        "Non void function must return a value"
    );
}

#[test]
fn test_missing_return_at_runtime() {
    let source = "int f(bool b) { if (b) { return 1; } } int main() { return f(false); }";
    let (result, _) = run(source);
    let err = result.unwrap_err();
    assert!(!err.is_static());
    assert!(err.message().ends_with("Return statement missing in 'f'"), "{err}");
}

#[test]
fn test_unreachable_code_after_return_is_ignored() {
    assert_eq!(exit_code("int main() { return 1; return true; }"), 1);
}

#[test]
fn test_nested_definitions_rejected() {
    assert_eq!(
        static_error("int main() { int inner() { return 1; } return 0; }"),
        "Functions can only be defined at the top level"
    );
}

// ============================================
// Classes
// ============================================

#[test]
fn test_fields_and_copies() {
    let source = "
        struct Pair { int a; int b; };
        int sum(Pair p) { return p.a + p.b; }
        void bump(Pair& p) { p.a++; }
        int main() {
            Pair p;
            p.a = 3;
            p.b = 4;
            Pair q = p;
            q.a = 100;
            bump(p);
            return sum(p) * 1000 + q.a;
        }";
    assert_eq!(exit_code(source), 8100);
}

#[test]
fn test_unknown_member() {
    assert_eq!(
        static_error("struct P { int a; }; int main() { P p; return p.b; }"),
        "Type 'P' does not have a member 'b'"
    );
}

#[test]
fn test_private_fields_hidden() {
    assert_eq!(
        static_error("class P { int a; }; int main() { P p; return p.a; }"),
        "Type 'P' does not have a member 'a'"
    );
}

#[test]
fn test_string_members() {
    assert_eq!(
        exit_code("int main() { string s = \"hel\"; s = s + \"lo\"; return s.size(); }"),
        5
    );
}

// ============================================
// Output
// ============================================

#[test]
fn test_print_overloads() {
    let (result, output) = run(
        "int main() { print(1); print(2L); print(true); print('c'); print(\"s\"); print_bool(false); return 0; }",
    );
    assert_eq!(result.unwrap(), 0);
    assert_eq!(output, "1\n2\ntrue\nc\ns\n0\n");
}

#[test]
fn test_global_initializers_run_in_order() {
    let (result, output) = run("
        int a = 2;
        int b = a * 3;
        int main() { print(b); return a; }");
    assert_eq!(result.unwrap(), 2);
    assert_eq!(output, "6\n");
}
