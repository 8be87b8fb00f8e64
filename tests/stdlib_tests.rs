// Builtin library tests, driven through small programs.

use flex::config::InterpreterConfig;
use flex::console::{ScriptedConsole, Severity, Transcript};
use flex::error::FlexError;
use flex::evaluator::Evaluator;
use flex::stdlib::Registry;
use flex::value::{Arity, Value};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn evaluator_with(registry: Registry) -> (Evaluator, Transcript) {
    let console = ScriptedConsole::default();
    let transcript = console.transcript();
    let evaluator = Evaluator::new(
        Arc::new(registry),
        Box::new(console),
        InterpreterConfig::default().with_seed(7),
    );
    (evaluator, transcript)
}

/// Output of `source`, which must run cleanly.
fn output(source: &str) -> String {
    let (mut evaluator, transcript) = evaluator_with(Registry::standard());
    let outcome = flex::execute(&mut evaluator, source);
    if let Err(error) = outcome.value {
        panic!("{} failed: {}", source, error.describe());
    }
    transcript.output()
}

/// Value of a single expression.
fn eval(expression: &str) -> String {
    output(&format!("etb3({});", expression)).trim_end_matches('\n').to_string()
}

fn failure(source: &str) -> FlexError {
    let (mut evaluator, _) = evaluator_with(Registry::standard());
    match flex::execute(&mut evaluator, source).value {
        Err(error) => error,
        Ok(value) => panic!("{} should fail, returned {}", source, value),
    }
}

// ============================================================================
// I/O
// ============================================================================

#[test]
fn print_variants() {
    assert_eq!(output("print(1); print(\"a\"); println(2); printLine(3); etb3([1, \"b\"]);"), "1a2\n3\n[1, b]\n");
}

#[test]
fn clear_screen_reaches_the_console() {
    let (mut evaluator, transcript) = evaluator_with(Registry::standard());
    assert!(flex::execute(&mut evaluator, "clearScreen(); clear();").succeeded);
    assert_eq!(transcript.clears(), 2);
}

#[test]
fn sleep_clamps_bad_durations() {
    assert_eq!(output("sleep(-5); sleep(\"soon\"); sleep(1); etb3(\"awake\");"), "awake\n");
}

#[test]
fn input_prompt_defaults() {
    let console = ScriptedConsole::new(["a", "b", "c"]);
    let transcript = console.transcript();
    let mut evaluator = Evaluator::with_console(Box::new(console));
    let outcome = flex::execute(&mut evaluator, "x = input(); y = input(\"\"); z = input(\"? \");");
    assert!(outcome.succeeded);
    assert_eq!(transcript.prompts(), vec!["Input: ", "Input: ", "? "]);
}

// ============================================================================
// Math
// ============================================================================

#[test]
fn rounding() {
    assert_eq!(eval("round(2.5)"), "3");
    assert_eq!(eval("round(-2.5)"), "-2");
    assert_eq!(eval("round(2.49)"), "2");
    assert_eq!(eval("floor(-1.5)"), "-2");
    assert_eq!(eval("ceil(1.2)"), "2");
    assert_eq!(eval("abs(-3)"), "3");
}

#[test]
fn powers_and_roots() {
    assert_eq!(eval("pow(2, 10)"), "1024");
    assert_eq!(eval("sqrt(16)"), "4");
    assert_eq!(
        failure("x = sqrt(-1);").message,
        "Cannot calculate square root of negative number"
    );
}

#[test]
fn trig_and_constants() {
    assert_eq!(eval("sin(0)"), "0");
    assert_eq!(eval("cos(0)"), "1");
    assert_eq!(eval("round(PI * 100)"), "314");
    assert_eq!(eval("floor(E)"), "2");
}

#[test]
fn min_and_max() {
    assert_eq!(eval("min(3, 1, 2)"), "1");
    assert_eq!(eval("max(3, 1, 2)"), "3");
    assert_eq!(eval("max(1, parseFloat(\"x\"))"), "NaN");
    assert_eq!(failure("x = min();").message, "min() requires at least 1 argument");
}

#[test]
fn random_ranges() {
    let source = r#"
        ok = true;
        for (i = 0; i < 200; i = i + 1) {
            f = random();
            n = random(10);
            r = random(5, 8);
            if (f < 0 or f >= 1) { ok = false; }
            if (n < 0 or n >= 10 or n != floor(n)) { ok = false; }
            if (r < 5 or r >= 8 or r != floor(r)) { ok = false; }
        }
        etb3(ok);
    "#;
    assert_eq!(output(source), "true\n");
}

#[test]
fn math_argument_types_are_checked() {
    assert_eq!(
        failure("x = abs(\"a\");").message,
        "abs() argument must be a number, got string"
    );
    assert_eq!(
        failure("x = pow(1);").message,
        "Expected 2 arguments but got 1."
    );
}

// ============================================================================
// Strings
// ============================================================================

#[test]
fn length_accepts_strings_only() {
    assert_eq!(eval("length(\"four\")"), "4");
    assert_eq!(
        failure("x = length([1]);").message,
        "length() argument must be a string, got array"
    );
}

#[test]
fn case_conversion() {
    assert_eq!(eval("toUpper(\"abc\") + toLowerCase(\"DEF\")"), "ABCdef");
    assert_eq!(eval("toUpperCase(12)"), "12");
}

#[test]
fn substring_clamps_and_swaps() {
    assert_eq!(eval("substring(\"hello\", 1, 3)"), "el");
    assert_eq!(eval("substring(\"hello\", 3, 1)"), "el");
    assert_eq!(eval("substring(\"hello\", -2, 99)"), "hello");
    assert_eq!(eval("substring(\"hello\", 2)"), "llo");
    assert_eq!(
        failure("x = substring(\"a\");").message,
        "substring() requires 2 or 3 arguments"
    );
}

#[test]
fn replace_is_literal_and_global() {
    assert_eq!(eval("replace(\"a.b.c\", \".\", \"-\")"), "a-b-c");
}

#[test]
fn split_and_join_back() {
    assert_eq!(eval("split(\"a,b,,c\", \",\")"), "[a, b, , c]");
    assert_eq!(eval("split(\"abc\", \"\")"), "[a, b, c]");
    assert_eq!(eval("arrayLength(split(\"x\", \",\"))"), "1");
}

#[test]
fn searching() {
    assert_eq!(eval("trim(\"  x  \")"), "x");
    assert_eq!(eval("startsWith(\"flex\", \"fl\")"), "true");
    assert_eq!(eval("endsWith(\"flex\", \"fl\")"), "false");
    assert_eq!(eval("contains(\"flex\", \"le\")"), "true");
    assert_eq!(eval("indexOf(\"héllo\", \"l\")"), "2");
    assert_eq!(eval("indexOf(\"flex\", \"z\")"), "-1");
}

#[test]
fn repeat_and_padding() {
    assert_eq!(eval("repeat(\"ab\", 3)"), "ababab");
    assert_eq!(eval("repeat(\"ab\", 0)"), "");
    assert_eq!(failure("x = repeat(\"ab\", -1);").message, "repeat() count must be non-negative");
    assert_eq!(eval("padLeft(7, 3, \"0\")"), "007");
    assert_eq!(eval("padRight(\"a\", 4, \"xy\")"), "axyx");
    assert_eq!(eval("padLeft(\"long\", 2) + \"|\""), "long|");
    assert_eq!(eval("padRight(\"a\", 3) + \"|\""), "a  |");
}

#[test]
fn oversized_strings_are_rejected() {
    assert_eq!(
        failure("x = repeat(\"ab\", 10000000000000000000);").message,
        "Invalid string length"
    );
    assert_eq!(failure("x = repeat(\"ab\", 6000000);").message, "Invalid string length");
    assert_eq!(
        failure("x = padLeft(\"ab\", 10000000000000000000, \"x\");").message,
        "Invalid string length"
    );
    assert_eq!(
        failure("x = padRight(\"ab\", 20000000);").message,
        "Invalid string length"
    );
    assert_eq!(eval("repeat(\"\", 10000000000000000000)"), "");
    assert_eq!(eval("length(repeat(\"ab\", 5000))"), "10000");
}

// ============================================================================
// Arrays and types
// ============================================================================

#[test]
fn array_helpers() {
    let source = r#"
        a = arrayNew(2);
        etb3(a);
        same = arrayPush(a, 5);
        etb3(same == a);
        etb3(arrayLength(a));
        etb3(arrayPop(a));
        etb3(arrayPop(arrayNew()));
        etb3(arrayLength(null));
    "#;
    assert_eq!(output(source), "[null, null]\ntrue\n3\n5\nnull\n0\n");
}

#[test]
fn array_helper_errors() {
    assert_eq!(failure("x = arrayNew(-1);").message, "Invalid array length: -1");
    assert_eq!(failure("x = arrayPush(3, 1);").message, "arrayPush() expects an array, got number");
}

#[test]
fn type_names() {
    let source = r#"
        function f() { }
        etb3(typeof(null) + " " + typeof(true) + " " + typeof(1) + " " + typeof("s"));
        etb3(typeof([]) + " " + typeof(f) + " " + typeof(print));
    "#;
    assert_eq!(output(source), "null boolean number string\narray function function\n");
}

#[test]
fn numeric_parsing() {
    assert_eq!(eval("parseInt(\"42px\")"), "42");
    assert_eq!(eval("parseInt(\"  -17\")"), "-17");
    assert_eq!(eval("parseInt(\"ff\", 16)"), "255");
    assert_eq!(eval("parseInt(\"101\", 2)"), "5");
    assert_eq!(eval("parseInt(\"10\", 1)"), "NaN");
    assert_eq!(eval("parseInt(\"abc\")"), "NaN");
    assert_eq!(eval("parseFloat(\"3.25 apples\")"), "3.25");
    assert_eq!(eval("parseFloat(\"1e3\")"), "1000");
    assert_eq!(eval("parseFloat(\"-Infinity\")"), "-Infinity");
    assert_eq!(eval("parseFloat(\".5\")"), "0.5");
}

#[test]
fn to_string_stringifies() {
    assert_eq!(eval("toString(1.5) + toString(null) + toString([1, [2]])"), "1.5null[1, [2]]");
}

// ============================================================================
// Registry
// ============================================================================

fn shout(evaluator: &mut Evaluator, args: &[Value]) -> Result<Value, FlexError> {
    let text = format!("{}!", args[0]);
    evaluator.console().write_line(&text, Severity::Warning);
    Ok(Value::String(text))
}

#[test]
fn later_registrations_shadow_standard_natives() {
    let registry = Registry::builder()
        .extend(&Registry::standard())
        .native("print", Arity::Fixed(1), shout)
        .build();
    let (mut evaluator, transcript) = evaluator_with(registry);

    let outcome = flex::execute(&mut evaluator, "x = print(\"hi\"); etb3(x);");
    assert!(outcome.succeeded);
    assert_eq!(transcript.output(), "hi!\n");
    assert_eq!(transcript.messages(), vec![(Severity::Warning, "hi!".to_string())]);
}

#[test]
fn one_registry_serves_many_evaluators() {
    let registry = Arc::new(Registry::standard());
    let handles: Vec<_> = (0..4)
        .map(|n| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                let console = ScriptedConsole::default();
                let transcript = console.transcript();
                let mut evaluator =
                    Evaluator::new(registry, Box::new(console), InterpreterConfig::default());
                let source = format!("etb3(pow(2, {}));", n);
                assert!(flex::execute(&mut evaluator, &source).succeeded);
                transcript.output()
            })
        })
        .collect();

    let outputs: Vec<String> = handles
        .into_iter()
        .map(|handle| handle.join().expect("evaluator thread"))
        .collect();
    assert_eq!(outputs, vec!["1\n", "2\n", "4\n", "8\n"]);
}

#[test]
fn builtins_can_be_reassigned_by_programs() {
    assert_eq!(output("abs = 5; etb3(abs + 1);"), "6\n");
}
