// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in constants and functions of the expression language.

/// Default constants available in every evaluation. Lookup is
/// case-sensitive; these names are lowercase by convention.
pub fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        // Standard gravity, m/s^2.
        "g" => Some(9.80665),
        // Speed of light, m/s.
        "c" => Some(2.998e8),
        _ => None,
    }
}

/// Single-argument functions. Domain errors surface as NaN from the float
/// operations and fail tolerance comparison downstream.
pub fn function(name: &str) -> Option<fn(f64) -> f64> {
    let f: fn(f64) -> f64 = match name {
        "sin" => f64::sin,
        "cos" => f64::cos,
        "tan" => f64::tan,
        "sec" => |x| 1.0 / x.cos(),
        "csc" => |x| 1.0 / x.sin(),
        "cot" => |x| 1.0 / x.tan(),
        "sqrt" => f64::sqrt,
        "log10" => f64::log10,
        "log2" => f64::log2,
        "ln" => f64::ln,
        "exp" => f64::exp,
        "abs" => f64::abs,
        "arcsin" => f64::asin,
        "arccos" => f64::acos,
        "arctan" => f64::atan,
        "sinh" => f64::sinh,
        "cosh" => f64::cosh,
        "tanh" => f64::tanh,
        _ => return None,
    };
    Some(f)
}

#[cfg(test)]
mod tests {
    use super::{constant, function};

    #[test]
    fn constants_present() {
        assert_eq!(constant("pi"), Some(std::f64::consts::PI));
        assert_eq!(constant("tau"), None);
    }

    #[test]
    fn reciprocal_trig() {
        let sec = function("sec").unwrap();
        assert!((sec(0.0) - 1.0).abs() < 1e-12);
    }
}
