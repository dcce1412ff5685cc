use rstest::{fixture, rstest};
use tern_core::{BufferSource, Interp, ObjRef};

#[fixture]
fn interp() -> Interp {
    Interp::new()
}

fn keep_value_k(interp: &mut Interp, args: ObjRef, _state: ObjRef) {
    let v = interp.first(args);
    interp.values_push(v);
}

fn try_read(interp: &mut Interp, src: &str) -> Result<ObjRef, String> {
    let mut buf = BufferSource::from(src);
    interp.read_and_then(ObjRef::NIL, keep_value_k);
    interp.run_until_done(&mut buf);
    if let Some(err) = interp.error_get() {
        let msg = interp.print_str(err);
        interp.reset_stacks();
        interp.error_clear();
        return Err(msg);
    }
    let (v, _) = interp.values_pop().expect("reader delivered no value");
    Ok(v)
}

fn read_str(interp: &mut Interp, src: &str) -> ObjRef {
    match try_read(interp, src) {
        Ok(v) => v,
        Err(err) => panic!("unexpected read error for {:?}: {}", src, err),
    }
}

#[rstest]
fn integers_read_with_signs(mut interp: Interp) {
    let tests: &[(&str, i64)] = &[
        ("42", 42),
        ("-17", -17),
        ("0", 0),
        ("007", 7),
        // A digit right after one leading byte turns the token into a
        // number; the leading byte only survives as a sign.
        ("a5", 5),
    ];
    for (src, expected) in tests {
        println!("testing: '{}'", src);
        let v = read_str(&mut interp, src);
        assert_eq!(interp.int_of(v), Some(*expected), "wrong value for '{}'", src);
    }
}

#[rstest]
fn symbols_read_bare_and_quoted(mut interp: Interp) {
    let tests: &[(&str, &str)] = &[
        ("foo", "foo"),
        ("-", "-"),
        ("#t", "#t"),
        // Semicolons only start comments at the front of a token.
        ("a;b", "a;b"),
        ("\"hello world\"", "hello world"),
        ("\"\"", ""),
    ];
    for (src, expected) in tests {
        println!("testing: '{}'", src);
        let v = read_str(&mut interp, src);
        let want = interp.new_sym_str(expected);
        assert!(interp.deep_eq(v, want), "wrong symbol for '{}'", src);
    }
}

#[rstest]
fn lists_read_proper_and_improper(mut interp: Interp) {
    let v = read_str(&mut interp, "(1 2 3)");
    let one = interp.new_int(1);
    let two = interp.new_int(2);
    let three = interp.new_int(3);
    let expected = interp.list(&[one, two, three]);
    assert!(interp.deep_eq(v, expected));

    let v = read_str(&mut interp, "(1 . 2)");
    let expected = interp.new_pair(one, two);
    assert!(interp.deep_eq(v, expected));

    let v = read_str(&mut interp, "((a) (b c))");
    let a = interp.new_sym_str("a");
    let b = interp.new_sym_str("b");
    let c = interp.new_sym_str("c");
    let first = interp.list(&[a]);
    let second = interp.list(&[b, c]);
    let expected_refs = [first, second];
    let expected = interp.list(&expected_refs);
    assert!(interp.deep_eq(v, expected));

    assert!(read_str(&mut interp, "()").is_nil());
    assert!(read_str(&mut interp, "( )").is_nil());
}

#[rstest]
fn comments_are_skipped(mut interp: Interp) {
    let v = read_str(&mut interp, "; note\n7");
    assert_eq!(interp.int_of(v), Some(7));

    let v = read_str(&mut interp, "(1 ; note\n 2)");
    let one = interp.new_int(1);
    let two = interp.new_int(2);
    let expected = interp.list(&[one, two]);
    assert!(interp.deep_eq(v, expected));
}

#[rstest]
#[case::empty("")]
#[case::blank("   ")]
#[case::comment_only("; just a comment")]
fn end_of_input_reads_as_nil(mut interp: Interp, #[case] src: &str) {
    assert!(read_str(&mut interp, src).is_nil());
}

#[rstest]
#[case::stray_close(")", "malformed form")]
#[case::open_list("(1 2", "eof while reading")]
#[case::open_string("\"abc", "eof while reading")]
#[case::extra_tail("(1 . 2 3)", "malformed form")]
#[case::dangling_dot("(1 .", "eof while reading")]
fn malformed_input_is_an_error(mut interp: Interp, #[case] src: &str, #[case] msg: &str) {
    let err = try_read(&mut interp, src).unwrap_err();
    assert!(err.contains(msg), "error {:?} should mention {:?}", err, msg);
}

#[rstest]
fn quote_prefix_wraps_the_next_expression(mut interp: Interp) {
    let v = read_str(&mut interp, "'x");
    // The expansion holds the quote callable itself in the head.
    let quote = interp.new_sym_str("quote");
    let quote_fn = interp.env_get(interp.top_env(), quote).unwrap();
    assert_eq!(interp.first(v), quote_fn);
    let x = interp.new_sym_str("x");
    let arg = interp.first(interp.rest(v));
    assert!(interp.deep_eq(arg, x));
    assert!(interp.rest(interp.rest(v)).is_nil());

    let v = read_str(&mut interp, "'(1 2)");
    assert_eq!(interp.first(v), quote_fn);
    let one = interp.new_int(1);
    let two = interp.new_int(2);
    let expected = interp.list(&[one, two]);
    let arg = interp.first(interp.rest(v));
    assert!(interp.deep_eq(arg, expected));
}

#[rstest]
fn printed_data_reads_back(mut interp: Interp) {
    let v = read_str(&mut interp, "(1 (2 . 3) \"two words\")");
    let s = interp.print_str(v);
    assert_eq!(s, "(1 (2 . 3) \"two words\")");
    let v2 = read_str(&mut interp, &s);
    assert!(interp.deep_eq(v, v2));
}

#[rstest]
fn functions_print_as_their_defining_forms(mut interp: Interp) {
    let params = read_str(&mut interp, "(x)");
    let body = read_str(&mut interp, "((+ x 1))");
    let f = interp.new_closure(params, body, ObjRef::NIL);
    assert_eq!(interp.print_str(f), "(lambda (x) (+ x 1))");

    let mparams = read_str(&mut interp, "(a)");
    let mbody = read_str(&mut interp, "(a)");
    let e = interp.new_sym_str("e");
    let e_name = interp.sym_of(e).unwrap();
    let m = interp.new_macro(mparams, mbody, ObjRef::NIL, e_name);
    assert_eq!(interp.print_str(m), "(macro (a) e a)");
}

#[rstest]
fn opaque_values_print_without_addresses(mut interp: Interp) {
    let car = interp.new_sym_str("car");
    let car_fn = interp.env_get(interp.top_env(), car).unwrap();
    assert_eq!(interp.print_str(car_fn), "native:car");

    let if_sym = interp.new_sym_str("if");
    let if_fn = interp.env_get(interp.top_env(), if_sym).unwrap();
    assert_eq!(interp.print_str(if_fn), "native-form:if");

    let k = interp.capture();
    assert!(interp.print_str(k).starts_with("cont:"));

    let p = interp.new_ptr(Box::new(5u8), None, 7);
    assert_eq!(interp.print_str(p), "ptr:7:open");
}
