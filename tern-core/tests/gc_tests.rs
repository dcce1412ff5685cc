mod harness;

use harness::eval_str;
use rstest::{fixture, rstest};
use tern_core::{Interp, InterpConfig};

#[fixture]
fn interp() -> Interp {
    Interp::new()
}

#[rstest]
fn collection_reclaims_unreachable_objects(mut interp: Interp) {
    interp.collect();
    let baseline = interp.live_count();

    let v = eval_str(&mut interp, "(car (quote (1 2 3 4 5 6 7 8)))");
    assert_eq!(interp.int_of(v), Some(1));
    assert!(interp.live_count() > baseline);

    interp.collect();
    assert!(
        interp.live_count() <= baseline + 2,
        "live count {} should fall back near baseline {}",
        interp.live_count(),
        baseline
    );
}

#[rstest]
fn reachable_bindings_survive_collection(mut interp: Interp) {
    eval_str(&mut interp, "(define keep (quote (1 (2 3) x)))");
    interp.collect();
    interp.collect();

    let v = eval_str(&mut interp, "keep");
    let one = interp.new_int(1);
    let two = interp.new_int(2);
    let three = interp.new_int(3);
    let x = interp.new_sym_str("x");
    let inner = interp.list(&[two, three]);
    let parts = [one, inner, x];
    let expected = interp.list(&parts);
    assert!(interp.deep_eq(v, expected));
}

#[rstest]
fn permanent_objects_survive_until_released(mut interp: Interp) {
    interp.collect();
    let a = interp.new_int(7);
    let b = interp.new_int(8);
    let p = interp.new_pair(a, b);
    interp.make_permanent(p);

    let before = interp.live_count();
    interp.collect();
    assert_eq!(interp.live_count(), before);
    assert_eq!(interp.int_of(interp.first(p)), Some(7));
    assert_eq!(interp.int_of(interp.rest(p)), Some(8));

    interp.make_transient(p);
    interp.collect();
    assert_eq!(interp.live_count(), before - 3);
}

#[rstest]
fn a_bounded_heap_keeps_evaluation_running() {
    let mut interp = Interp::with_config(InterpConfig {
        heap_limit: Some(2048),
        heap_batch: 64,
        ..InterpConfig::default()
    });
    for _ in 0..60 {
        let v = eval_str(&mut interp, "(car (quote (1 2 3 4 5 6 7 8)))");
        assert_eq!(interp.int_of(v), Some(1));
    }
    assert!(interp.live_count() < 2048);
}

#[rstest]
#[should_panic(expected = "object heap exhausted")]
fn a_heap_full_of_live_objects_panics() {
    let mut interp = Interp::with_config(InterpConfig {
        heap_limit: Some(600),
        heap_batch: 64,
        ..InterpConfig::default()
    });
    eval_str(&mut interp, "(define acc (quote ()))");
    for _ in 0..2000 {
        eval_str(&mut interp, "(set! acc (cons 1 acc))");
    }
}
