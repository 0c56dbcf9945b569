//! End-to-end scenarios exercised through the public `compile_and_run` entry point,
//! each compiling and running a short PhySL snippet in one shot.

use phylanx::{CodeRange, RunConfig, Value, compile_and_run};

fn run(source: &str) -> Value {
    compile_and_run("test", source, RunConfig::single_threaded()).unwrap()
}

fn scalar(value: &Value) -> f64 {
    value.as_f64(CodeRange::default()).unwrap()
}

#[test]
fn fold_left_sums_a_list() {
    let result = run("fold_left(lambda(x, y, x + y), 0, list(1, 2, 3, 4))");
    assert_eq!(scalar(&result), 10.0);
}

#[test]
fn slice_store_mutates_a_defined_vector() {
    let result = run("block(define(x, constant(0.0, 4)), store(slice(x, 1), 5.0), x)");
    assert_eq!(result.to_string(), "[0, 5, 0, 0]");
}

#[test]
fn defined_function_applies_to_its_arguments() {
    let result = run("block(define(f, lambda(x, y, x + y)), f(2, 3))");
    assert_eq!(scalar(&result), 5.0);
}

#[test]
fn for_loop_returns_the_last_body_value() {
    let result = run("for(define(i, 0), i < 3, store(i, i + 1), i)");
    assert_eq!(scalar(&result), 3.0);
}

#[test]
fn integer_array_index_gathers_selected_elements() {
    // `list(0, 2, 4)` itself decodes as a basic (start, stop, step) range, not an
    // advanced integer-array index (see `index_from_value`'s list-dispatch arm) — the
    // only way to drive the array-gather path from PhySL source is to build the index
    // as an actual vector value, one store at a time.
    let result = run(
        "block(\
           define(idx, constant(0.0, 3)), \
           store(slice(idx, 0), 0.0), \
           store(slice(idx, 1), 2.0), \
           store(slice(idx, 2), 4.0), \
           slice(constant(2.0, 5), idx))",
    );
    assert_eq!(result.to_string(), "[2, 2, 2]");
}

#[test]
fn parallel_block_returns_its_last_operand() {
    let result = run("parallel_block(1, 2, 3)");
    assert_eq!(scalar(&result), 3.0);
}

#[test]
fn empty_fold_left_returns_the_seed() {
    let result = run("fold_left(lambda(x, y, x + y), 7, list())");
    assert_eq!(scalar(&result), 7.0);
}

#[test]
fn false_for_loop_condition_skips_the_body() {
    let result = run("for(define(i, 0), false, store(i, i + 1), 99)");
    assert_eq!(result, Value::Nil);
}

#[test]
fn negative_slice_index_reads_the_last_element() {
    let result = run("slice(constant(1.0, 3), -1)");
    assert_eq!(scalar(&result), 1.0);
}
