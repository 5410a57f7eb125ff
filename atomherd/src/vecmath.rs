/// contains some very simple helpers for 2d vectors

pub type Vector = [f64; 2];

/// calculates the length of a vector
pub fn len(inp: Vector) -> f64 {
    inp[0].hypot(inp[1])
}

/// distance between two points
pub fn dist(a: Vector, b: Vector) -> f64 {
    len(sub(b, a))
}

/// turns the input into a vector that has length 1
/// the zero vector has no direction, it stays zero
pub fn norm(mut inp: Vector) -> Vector {
    let len = len(inp);
    if len == 0. {
        return inp;
    }
    inp[0] /= len;
    inp[1] /= len;
    inp
}

/// component-wise addition
pub fn add(mut a: Vector, b: Vector) -> Vector {
    a[0] += b[0];
    a[1] += b[1];
    a
}

/// component-wise subtraction, a - b
pub fn sub(mut a: Vector, b: Vector) -> Vector {
    a[0] -= b[0];
    a[1] -= b[1];
    a
}

/// scales a vector by a scalar
pub fn scale(mut a: Vector, scalar: f64) -> Vector {
    a[0] *= scalar;
    a[1] *= scalar;
    a
}

pub fn dot(a: Vector, b: Vector) -> f64 {
    (a[0] * b[0]) + (a[1] * b[1])
}

#[test]
fn norm_zero() {
    assert_eq!(norm([0., 0.]), [0., 0.]);
    assert_eq!(norm([3., 4.]), [0.6, 0.8]);
}

#[test]
fn dist_symmetric() {
    let a = [1., 2.];
    let b = [4., 6.];
    assert_eq!(dist(a, b), 5.);
    assert_eq!(dist(a, b), dist(b, a));
}
