use jack::{compile_str, JackError, Location};

fn compile_err(source: &str) -> JackError {
    match compile_str(source) {
        Ok(code) => panic!("expected compile error, generated {} commands", code.len()),
        Err(err) => err,
    }
}

#[test]
fn test_undeclared_variable() {
    let err = compile_err("class Main { function int f() { return y; } }");
    assert!(err.is_semantic(), "{}", err);
    assert_eq!(err.location(), Some(Location { line: 1, column: 40 }));
}

#[test]
fn test_assign_undeclared_variable() {
    let err = compile_err("class Main { function void f() { let z = 1; return; } }");
    assert!(err.is_semantic(), "{}", err);
    assert!(err.to_string().contains("'z'"));
}

#[test]
fn test_index_non_array() {
    let err = compile_err("class Main { function void f(int n) { let n[0] = 1; return; } }");
    assert!(err.is_semantic(), "{}", err);

    let err = compile_err("class Main { function int f(int n) { return n[0]; } }");
    assert!(err.is_semantic(), "{}", err);
}

#[test]
fn test_duplicate_declaration() {
    let err = compile_err("class Main { field int a; static char a; }");
    assert!(err.is_semantic(), "{}", err);

    let err = compile_err("class Main { function void f(int a) { var int a; return; } }");
    assert!(err.is_semantic(), "{}", err);
}

#[test]
fn test_subroutine_scope_isolation() {
    let err = compile_err(
        "class Main {
            function void a() { var int x; let x = 1; return; }
            function void b() { let x = 2; return; }
        }",
    );
    assert!(err.is_semantic(), "{}", err);
    assert_eq!(err.location().map(|loc| loc.line), Some(3));
}

#[test]
fn test_missing_semicolon() {
    let err = compile_err("class Main { function void f() { var int x; let x = 1 return; } }");
    assert!(err.is_syntax(), "{}", err);
    assert_eq!(err.to_string(), "syntax error at 1:55: expected ';', found 'return'");
}

#[test]
fn test_unexpected_end_of_file() {
    let err = compile_err("class Main { function void f() { return;");
    assert!(err.is_syntax(), "{}", err);
    assert!(err.to_string().contains("unexpected end of file"));

    assert!(compile_err("").is_syntax());
}

#[test]
fn test_not_a_class() {
    let err = compile_err("function void f() { return; }");
    assert!(err.is_syntax(), "{}", err);
}

#[test]
fn test_bad_statement() {
    let err = compile_err("class Main { function void f() { x = 1; return; } }");
    assert!(err.is_syntax(), "{}", err);
}

#[test]
fn test_bad_term() {
    let err = compile_err("class Main { function void f() { var int x; let x = ; return; } }");
    assert!(err.is_syntax(), "{}", err);

    let err = compile_err("class Main { function int f() { return * 2; } }");
    assert!(err.is_syntax(), "{}", err);
}

#[test]
fn test_lexical_errors_propagate() {
    let err = compile_err("class Main { function int f() { return 99999; } }");
    assert!(err.is_lexical(), "{}", err);

    let err = compile_err("class Main { function void f() { do Output.printString(\"open); return; } }");
    assert!(err.is_lexical(), "{}", err);
}

#[test]
fn test_method_on_primitive() {
    let err = compile_err("class Main { function void f(int n) { do n.run(); return; } }");
    assert!(err.is_semantic(), "{}", err);
}

#[test]
fn test_string_constant_too_long() {
    let source = format!(
        "class Main {{ function void f() {{ do Output.printString(\"{}\"); return; }} }}",
        "x".repeat(40000)
    );
    let err = compile_err(source.as_str());
    assert!(err.is_lexical(), "{}", err);
}

#[test]
fn test_too_many_fields() {
    let names = (0..=32767).map(|i| format!("f{i}")).collect::<Vec<_>>().join(", ");

    let source = format!("class Big {{ field int {names}; }}");
    let err = compile_err(source.as_str());
    assert!(err.is_semantic(), "{}", err);
    assert_eq!(err.location(), Some(Location { line: 1, column: 19 }));

    // One short of the limit still fits in a constant.
    let names = (0..32767).map(|i| format!("f{i}")).collect::<Vec<_>>().join(", ");
    let source = format!("class Big {{ field int {names}; constructor Big new() {{ return this; }} }}");
    let code = compile_str(source).unwrap();
    assert_eq!(code[1].to_string(), "push constant 32767");
}

#[test]
fn test_too_many_fields_across_declarations() {
    let first = (0..20000).map(|i| format!("a{i}")).collect::<Vec<_>>().join(", ");
    let second = (0..20000).map(|i| format!("b{i}")).collect::<Vec<_>>().join(", ");
    let source = format!("class Big {{ field int {first}; field char {second}; }}");
    let err = compile_err(source.as_str());
    assert!(err.is_semantic(), "{}", err);
}

#[test]
fn test_trailing_tokens() {
    let err = compile_err("class Main { } class Other { }");
    assert!(err.is_syntax(), "{}", err);
    assert_eq!(err.location(), Some(Location { line: 1, column: 16 }));
}
