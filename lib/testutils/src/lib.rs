pub fn float_eq(v1: f64, v2: f64, epsilon: f64) -> bool {
    let diff = (v1 - v2).abs();
    diff <= epsilon
}

pub fn assert_float_eq(v1: f64, v2: f64, epsilon: f64) {
    if !float_eq(v1, v2, epsilon) {
        panic!(
            "{} != {} (difference={}, epsilon={})",
            v1,
            v2,
            (v1 - v2).abs(),
            epsilon
        );
    }
}

pub fn assert_f64_slice_eq(v1: &[f64], v2: &[f64], epsilon: f64) {
    assert_eq!(
        v1.len(),
        v2.len(),
        "slice lengths differ: {} != {}",
        v1.len(),
        v2.len()
    );
    for (i, (a, b)) in v1.iter().zip(v2.iter()).enumerate() {
        if !float_eq(*a, *b, epsilon) {
            panic!(
                "slices differ at index {}: {} != {} (epsilon={})",
                i, a, b, epsilon
            );
        }
    }
}
