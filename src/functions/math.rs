use crate::functions::traits::Function;

// --- Arithmetic ---

pub struct Add;
impl Function for Add {
    fn symbol(&self) -> &'static str { "+" }
    fn arity(&self) -> usize { 2 }
    fn apply(&self, args: &[f64]) -> f64 {
        args[0] + args[1]
    }
    fn render(&self, args: &[String]) -> String {
        format!("({} + {})", args[0], args[1])
    }
}

pub struct Sub;
impl Function for Sub {
    fn symbol(&self) -> &'static str { "-" }
    fn arity(&self) -> usize { 2 }
    fn apply(&self, args: &[f64]) -> f64 {
        args[0] - args[1]
    }
    fn render(&self, args: &[String]) -> String {
        format!("({} - {})", args[0], args[1])
    }
}

pub struct Mul;
impl Function for Mul {
    fn symbol(&self) -> &'static str { "*" }
    fn arity(&self) -> usize { 2 }
    fn apply(&self, args: &[f64]) -> f64 {
        args[0] * args[1]
    }
    fn render(&self, args: &[String]) -> String {
        format!("({} * {})", args[0], args[1])
    }
}

pub struct Div;
impl Function for Div {
    fn symbol(&self) -> &'static str { "/" }
    fn arity(&self) -> usize { 2 }
    fn apply(&self, args: &[f64]) -> f64 {
        // full floating-point division; x/0 yields ±Inf, 0/0 yields NaN
        args[0] / args[1]
    }
    fn render(&self, args: &[String]) -> String {
        format!("({} / {})", args[0], args[1])
    }
}

pub struct Pow;
impl Function for Pow {
    fn symbol(&self) -> &'static str { "^" }
    fn arity(&self) -> usize { 2 }
    fn apply(&self, args: &[f64]) -> f64 {
        args[0].powf(args[1])
    }
    fn render(&self, args: &[String]) -> String {
        format!("({} ^ {})", args[0], args[1])
    }
}

pub struct Min;
impl Function for Min {
    fn symbol(&self) -> &'static str { "min" }
    fn arity(&self) -> usize { 2 }
    fn apply(&self, args: &[f64]) -> f64 {
        args[0].min(args[1])
    }
    fn render(&self, args: &[String]) -> String {
        format!("min({}, {})", args[0], args[1])
    }
}

pub struct Max;
impl Function for Max {
    fn symbol(&self) -> &'static str { "max" }
    fn arity(&self) -> usize { 2 }
    fn apply(&self, args: &[f64]) -> f64 {
        args[0].max(args[1])
    }
    fn render(&self, args: &[String]) -> String {
        format!("max({}, {})", args[0], args[1])
    }
}

// --- Unary ---

pub struct Neg;
impl Function for Neg {
    fn symbol(&self) -> &'static str { "neg" }
    fn arity(&self) -> usize { 1 }
    fn apply(&self, args: &[f64]) -> f64 {
        -args[0]
    }
    fn render(&self, args: &[String]) -> String {
        format!("(-{})", args[0])
    }
}

pub struct Abs;
impl Function for Abs {
    fn symbol(&self) -> &'static str { "abs" }
    fn arity(&self) -> usize { 1 }
    fn apply(&self, args: &[f64]) -> f64 {
        args[0].abs()
    }
    fn render(&self, args: &[String]) -> String {
        format!("abs({})", args[0])
    }
}

pub struct Sqrt;
impl Function for Sqrt {
    fn symbol(&self) -> &'static str { "sqrt" }
    fn arity(&self) -> usize { 1 }
    fn apply(&self, args: &[f64]) -> f64 {
        // negative arguments yield NaN
        args[0].sqrt()
    }
    fn render(&self, args: &[String]) -> String {
        format!("sqrt({})", args[0])
    }
}

pub struct Ln;
impl Function for Ln {
    fn symbol(&self) -> &'static str { "ln" }
    fn arity(&self) -> usize { 1 }
    fn apply(&self, args: &[f64]) -> f64 {
        args[0].ln()
    }
    fn render(&self, args: &[String]) -> String {
        format!("ln({})", args[0])
    }
}

pub struct Exp;
impl Function for Exp {
    fn symbol(&self) -> &'static str { "exp" }
    fn arity(&self) -> usize { 1 }
    fn apply(&self, args: &[f64]) -> f64 {
        args[0].exp()
    }
    fn render(&self, args: &[String]) -> String {
        format!("exp({})", args[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_division_follows_ieee_semantics() {
        assert!(Div.apply(&[1.0, 0.0]).is_infinite());
        assert!(Div.apply(&[-1.0, 0.0]).is_infinite());
        assert!(Div.apply(&[0.0, 0.0]).is_nan());
        assert_eq!(Div.apply(&[7.0, 2.0]), 3.5);
    }

    #[test]
    fn test_sqrt_of_negative_is_nan() {
        assert!(Sqrt.apply(&[-4.0]).is_nan());
        assert_eq!(Sqrt.apply(&[9.0]), 3.0);
    }

    #[test]
    fn test_render_nests_arguments() {
        let inner = Add.render(&["d0".to_string(), "d1".to_string()]);
        let outer = Mul.render(&[inner.clone(), "d0".to_string()]);
        assert_eq!(inner, "(d0 + d1)");
        assert_eq!(outer, "((d0 + d1) * d0)");
    }
}
