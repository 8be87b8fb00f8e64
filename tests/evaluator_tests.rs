// Evaluator behavior tests
//
// Programs run against a ScriptedConsole so output and prompts can be
// compared exactly.

use flex::config::{AssignScope, InterpreterConfig};
use flex::console::{ScriptedConsole, Transcript};
use flex::error::{ErrorKind, FlexError};
use flex::evaluator::Evaluator;
use flex::stdlib::Registry;
use flex::value::Value;
use pretty_assertions::assert_eq;
use std::sync::Arc;

struct Run {
    value: Result<Value, FlexError>,
    transcript: Transcript,
}

impl Run {
    fn output(&self) -> String {
        self.transcript.output()
    }

    fn error(&self) -> &FlexError {
        match &self.value {
            Err(error) => error,
            Ok(value) => panic!("expected an error, program returned {}", value),
        }
    }
}

fn run_configured(source: &str, inputs: &[&str], config: InterpreterConfig) -> Run {
    let console = ScriptedConsole::new(inputs.iter().copied());
    let transcript = console.transcript();
    let mut evaluator = Evaluator::new(Arc::new(Registry::standard()), Box::new(console), config);
    let outcome = flex::execute(&mut evaluator, source);
    assert_eq!(outcome.succeeded, outcome.value.is_ok());
    Run {
        value: outcome.value,
        transcript,
    }
}

fn run(source: &str) -> Run {
    run_configured(source, &[], InterpreterConfig::default())
}

fn run_with_input(source: &str, inputs: &[&str]) -> Run {
    run_configured(source, inputs, InterpreterConfig::default())
}

// ============================================================================
// Reference scenarios
// ============================================================================

#[test]
fn adds_two_variables() {
    assert_eq!(run("x = 3; y = 4; etb3(x + y);").output(), "7\n");
}

#[test]
fn concatenation_stringifies_numbers() {
    assert_eq!(run("etb3(\"a\" + 1);").output(), "a1\n");
}

#[test]
fn recursive_fibonacci() {
    let source = "function f(n){ if (n <= 1) { return n; } return f(n-1)+f(n-2); } etb3(f(6));";
    assert_eq!(run(source).output(), "8\n");
}

#[test]
fn index_write_extends_array_with_nulls() {
    let result = run("arr = [1,2,3]; arr[5] = 9; etb3(arr.length); etb3(arr);");
    assert_eq!(result.output(), "6\n[1, 2, 3, null, null, 9]\n");
}

#[test]
fn division_by_zero_produces_no_output() {
    let result = run("etb3(5/0);");
    let error = result.error();
    assert_eq!(error.kind, ErrorKind::Runtime);
    assert_eq!(error.message, "Division by zero");
    assert_eq!(error.line(), Some(1));
    assert_eq!(result.output(), "");
}

// ============================================================================
// Operators and values
// ============================================================================

#[test]
fn arithmetic_follows_precedence() {
    assert_eq!(run("etb3(1 + 2 * 3 - 4 / 2);").output(), "5\n");
    assert_eq!(run("etb3(-(1 + 2) * 2);").output(), "-6\n");
    assert_eq!(run("etb3(7 / 2);").output(), "3.5\n");
}

#[test]
fn truthiness_rules() {
    let source = r#"
        values = [null, false, 0, -1, "", "x", [], [0]];
        for (i = 0; i < values.length; i = i + 1) {
            if (values[i]) { print("T"); } else { print("F"); }
        }
    "#;
    assert_eq!(run(source).output(), "FFFTFTFT");
}

#[test]
fn logical_operators_short_circuit() {
    let source = r#"
        function loud(v) { print("!"); return v; }
        a = false and loud(true);
        b = true or loud(false);
        c = null or loud("y");
        etb3(a);
        etb3(b);
        etb3(c);
    "#;
    assert_eq!(run(source).output(), "!false\ntrue\ny\n");
}

#[test]
fn equality_is_shallow() {
    let source = r#"
        a = [1]; b = [1]; c = a;
        etb3(a == b);
        etb3(a == c);
        etb3(1 == "1");
        etb3(null == null);
    "#;
    assert_eq!(run(source).output(), "false\ntrue\nfalse\ntrue\n");
}

#[test]
fn arrays_are_shared_by_reference() {
    let source = "a = [1, 2]; b = a; b[0] = 10; etb3(a[0]);";
    assert_eq!(run(source).output(), "10\n");
}

#[test]
fn comparison_requires_numbers() {
    let result = run("etb3(\"a\" < 1);");
    assert_eq!(result.error().message, "Operands must be numbers.");
}

#[test]
fn addition_of_incompatible_values_fails() {
    let result = run("x = [1] + null;");
    assert_eq!(result.error().message, "Operands must be numbers or strings.");
}

#[test]
fn negating_a_string_fails() {
    assert_eq!(run("x = -\"a\";").error().message, "Operand must be a number.");
}

#[test]
fn string_indexing_and_length() {
    assert_eq!(run("s = \"héllo\"; etb3(s[1]); etb3(s.length);").output(), "é\n5\n");
}

#[test]
fn index_errors() {
    assert_eq!(run("a = [1]; x = a[3];").error().message, "Array index out of bounds: 3");
    assert_eq!(run("a = [1]; x = a[-1];").error().message, "Array index out of bounds: -1");
    assert_eq!(run("a = [1]; x = a[0.5];").error().message, "Invalid array index: 0.5");
    assert_eq!(
        run("a = [1]; x = a[\"0\"];").error().message,
        "Array index must be a number, got string."
    );
}

#[test]
fn property_errors() {
    assert_eq!(run("x = null; y = x.length;").error().message, "Cannot read property 'length' of null.");
    assert_eq!(run("a = [1]; y = a.size;").error().message, "Undefined property 'size'.");
    assert_eq!(run("x = null; x[0] = 1;").error().message, "Cannot set property of null.");
}

#[test]
fn undefined_variable_reports_line() {
    let result = run("x = 1;\netb3(y);");
    let error = result.error();
    assert_eq!(error.message, "Undefined variable 'y'.");
    assert_eq!(error.line(), Some(2));
}

#[test]
fn calling_a_non_function_fails() {
    assert_eq!(run("x = 3; x();").error().message, "Can only call functions.");
}

#[test]
fn arity_is_checked() {
    let result = run("function f(a, b) { return a; } f(1);");
    assert_eq!(result.error().message, "Expected 2 arguments but got 1.");
    assert_eq!(run("x = abs(1, 2);").error().message, "Expected 1 arguments but got 2.");
}

#[test]
fn program_value_is_last_top_level_expression() {
    assert_eq!(run("1 + 1; x = 5; x * 2;").value.ok(), Some(Value::Number(10.0)));
    assert_eq!(run("x = 5;").value.ok(), Some(Value::Null));
}

// ============================================================================
// Functions, closures and scope
// ============================================================================

#[test]
fn closures_keep_outer_locals_alive() {
    let source = r#"
        function counter() {
            count = 0;
            function increment() {
                count = count + 1;
                return count;
            }
            return increment;
        }
        next = counter();
        next();
        next();
        etb3(next());
        other = counter();
        etb3(other());
    "#;
    assert_eq!(run(source).output(), "3\n1\n");
}

#[test]
fn functions_see_globals_defined_later() {
    let source = "function show() { etb3(label); } label = \"late\"; show();";
    assert_eq!(run(source).output(), "late\n");
}

#[test]
fn mutual_recursion() {
    let source = r#"
        function isEven(n) { if (n == 0) { return true; } return isOdd(n - 1); }
        function isOdd(n) { if (n == 0) { return false; } return isEven(n - 1); }
        etb3(isEven(10));
        etb3(isOdd(7));
    "#;
    assert_eq!(run(source).output(), "true\ntrue\n");
}

#[test]
fn block_assignment_does_not_leak_by_default() {
    let source = r#"
        outer = 1;
        {
            outer = 2;
            inner = 3;
        }
        etb3(outer);
        etb3(inner);
    "#;
    let result = run(source);
    assert_eq!(result.output(), "2\n");
    assert_eq!(result.error().message, "Undefined variable 'inner'.");
}

#[test]
fn function_locals_do_not_leak_by_default() {
    let result = run("function f() { local = 1; } f(); etb3(local);");
    assert_eq!(result.error().message, "Undefined variable 'local'.");
}

#[test]
fn global_assign_scope_writes_undeclared_names_to_globals() {
    let config = InterpreterConfig::default().with_assign_scope(AssignScope::Global);
    let source = r#"
        { inner = 3; }
        function f() { fromCall = 4; }
        f();
        etb3(inner + fromCall);
    "#;
    assert_eq!(run_configured(source, &[], config).output(), "7\n");
}

#[test]
fn parameters_shadow_globals() {
    let source = "x = 1; function f(x) { x = x + 10; return x; } etb3(f(5)); etb3(x);";
    assert_eq!(run(source).output(), "15\n1\n");
}

#[test]
fn return_unwinds_only_to_its_call() {
    let source = r#"
        function firstOver(items, limit) {
            for (i = 0; i < items.length; i = i + 1) {
                {
                    if (items[i] > limit) { return items[i]; }
                }
            }
            return null;
        }
        etb3(firstOver([1, 5, 9], 4));
        etb3(firstOver([1], 4));
        etb3("after");
    "#;
    assert_eq!(run(source).output(), "5\nnull\nafter\n");
}

#[test]
fn function_without_return_yields_null() {
    assert_eq!(run("function f() { x = 1; } etb3(f());").output(), "null\n");
}

#[test]
fn top_level_return_ends_program_normally() {
    let result = run("etb3(1); return; etb3(2);");
    assert!(result.value.is_ok());
    assert_eq!(result.output(), "1\n");
}

#[test]
fn runaway_recursion_hits_depth_limit() {
    let config = InterpreterConfig::default().with_max_call_depth(50);
    let result = run_configured("function f(n) { return f(n + 1); } f(0);", &[], config);
    assert_eq!(result.error().message, "Maximum call depth exceeded");
}

#[test]
fn default_depth_limit_is_reached_without_overflowing_the_stack() {
    let result = run("function f(n) { return f(n + 1); } f(0);");
    assert_eq!(result.error().message, "Maximum call depth exceeded");
}

#[test]
fn deep_but_bounded_recursion_succeeds() {
    let source = "function sum(n) { if (n == 0) { return 0; } return n + sum(n - 1); } etb3(sum(900));";
    assert_eq!(run(source).output(), "405450\n");
}

// ============================================================================
// Input
// ============================================================================

#[test]
fn input_reads_scripted_lines() {
    let source = r#"
        name = da5l("Name? ");
        age = parseInt(scan());
        etb3(name + " is " + (age + 1));
    "#;
    let result = run_with_input(source, &["Ada", "36"]);
    assert_eq!(result.output(), "Ada is 37\n");
    assert_eq!(result.transcript.prompts(), vec!["Name? ", "Input: "]);
}

#[test]
fn input_statement_discards_the_line() {
    let result = run_with_input("d5l(\"Press enter\"); etb3(\"done\");", &["ignored"]);
    assert_eq!(result.output(), "done\n");
    assert_eq!(result.transcript.prompts(), vec!["Press enter"]);
}

#[test]
fn exhausted_input_cancels_the_run() {
    let result = run_with_input("a = input(); b = input(); etb3(\"unreachable\");", &["one"]);
    let error = result.error();
    assert_eq!(error.kind, ErrorKind::InputCancelled);
    assert_eq!(error.line(), Some(1));
    assert_eq!(result.output(), "");
}

#[test]
fn identical_input_gives_identical_output() {
    let source = r#"
        total = 0;
        line = scan();
        while (line != "end") {
            total = total + parseFloat(line);
            etb3("running " + total);
            line = scan();
        }
    "#;
    let inputs = ["1.5", "2", "x", "4", "end"];
    let first = run_with_input(source, &inputs);
    let second = run_with_input(source, &inputs);
    assert!(first.value.is_ok());
    assert_eq!(first.output(), second.output());
    assert_eq!(first.output(), "running 1.5\nrunning 3.5\nrunning NaN\nrunning NaN\n");
}

#[test]
fn seeded_random_is_reproducible() {
    let source = "for (i = 0; i < 5; i = i + 1) { print(random(100) + \",\"); }";
    let config = || InterpreterConfig::default().with_seed(42);
    let first = run_configured(source, &[], config());
    let second = run_configured(source, &[], config());
    assert_eq!(first.output(), second.output());
}

// ============================================================================
// Stopping
// ============================================================================

#[test]
fn stopped_evaluator_halts_before_next_statement() {
    let console = ScriptedConsole::new(Vec::<String>::new());
    let transcript = console.transcript();
    let mut evaluator = Evaluator::with_console(Box::new(console));
    evaluator.stop_flag().store(true, std::sync::atomic::Ordering::SeqCst);

    let outcome = flex::execute(&mut evaluator, "etb3(1);");
    let error = outcome.value.expect_err("stopped run should fail");
    assert!(error.is_halt());
    assert_eq!(transcript.output(), "");
}

#[test]
fn stop_handle_interrupts_a_running_loop() {
    let (tx, rx) = std::sync::mpsc::channel();
    let worker = std::thread::spawn(move || {
        let mut evaluator = Evaluator::with_console(Box::new(ScriptedConsole::default()));
        tx.send(flex::StopHandle::from_flag(evaluator.stop_flag()))
            .expect("receiver alive");
        flex::execute(&mut evaluator, "while (true) { x = 1; }")
            .value
            .map(|_| ())
    });

    let handle = rx.recv().expect("handle sent");
    std::thread::sleep(std::time::Duration::from_millis(20));
    handle.stop();

    let result = worker.join().expect("worker thread");
    assert!(result.expect_err("loop should be stopped").is_halt());
}

#[test]
fn evaluator_state_persists_between_runs() {
    let console = ScriptedConsole::default();
    let transcript = console.transcript();
    let mut evaluator = Evaluator::with_console(Box::new(console));

    assert!(flex::execute(&mut evaluator, "function twice(n) { return n * 2; } x = 21;").succeeded);
    assert!(flex::execute(&mut evaluator, "etb3(twice(x));").succeeded);
    assert_eq!(transcript.output(), "42\n");
}

#[test]
fn syntax_errors_prevent_execution() {
    let result = run("etb3(1);\netb3(2)\netb3(3);");
    let error = result.error();
    assert_eq!(error.kind, ErrorKind::Syntax);
    assert_eq!(result.output(), "");
}
