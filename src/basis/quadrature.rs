//! Gauss-Legendre quadrature on [-1, 1].
//!
//! Nodes are the roots of P_n, found by Newton iteration from Chebyshev
//! initial guesses; weights are w_i = 2 / ((1 - x_i²) P'_n(x_i)²).

use std::f64::consts::PI;

/// Evaluate P_n(x) and P'_n(x) via the three-term recurrence
/// (n+1) P_{n+1} = (2n+1) x P_n - n P_{n-1}.
pub fn legendre_and_derivative(n: usize, x: f64) -> (f64, f64) {
    if n == 0 {
        return (1.0, 0.0);
    }
    let mut p_prev = 1.0; // P_{k-1}
    let mut p_curr = x; // P_k
    for k in 1..n {
        let p_next = ((2 * k + 1) as f64 * x * p_curr - k as f64 * p_prev) / (k + 1) as f64;
        p_prev = p_curr;
        p_curr = p_next;
    }
    // P'_n = n (x P_n - P_{n-1}) / (x² - 1), safe away from ±1 where the
    // Gauss nodes live
    let dp = n as f64 * (x * p_curr - p_prev) / (x * x - 1.0);
    (p_curr, dp)
}

/// Gauss-Legendre nodes and weights with `num_points` points, ascending order.
pub fn gauss_legendre(num_points: usize) -> (Vec<f64>, Vec<f64>) {
    assert!(num_points > 0);
    if num_points == 1 {
        return (vec![0.0], vec![2.0]);
    }
    let n = num_points;
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];
    for i in 0..n {
        // Chebyshev initial guess, descending in i so nodes come out ascending
        let mut x = -(PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut dp = 0.0;
        for _ in 0..100 {
            let (p, d) = legendre_and_derivative(n, x);
            dp = d;
            let update = p / d;
            x -= update;
            if update.abs() < 1e-15 {
                break;
            }
        }
        nodes[i] = x;
        weights[i] = 2.0 / ((1.0 - x * x) * dp * dp);
    }
    (nodes, weights)
}
