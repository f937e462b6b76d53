//! The semantic type model.
//!
//! [`Ty`] mirrors the surface type annotations plus the internal types the
//! checker needs: `Void` for no value, `Never` for panics, `Tuple` for
//! multi-return functions, and `Unknown` for recovery after an error.
//! `Unknown` is assignable in both directions so one bad expression does
//! not cascade into a wall of follow-on diagnostics.

use std::fmt;

use kuki_util::Name;

/// A resolved type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    /// Recovery type after an error; compatible with everything
    Unknown,
    /// No value (a call with no returns)
    Void,
    /// Diverges (`panic`)
    Never,
    /// 64-bit default integer
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    /// 64-bit default float
    Float,
    Float32,
    Float64,
    Str,
    Bool,
    Byte,
    Rune,
    /// Top type
    Any,
    /// The error type
    Error,
    /// `list of T`
    List(Box<Ty>),
    /// `map of K to V`
    Map(Box<Ty>, Box<Ty>),
    /// `channel of T`
    Chan(Box<Ty>),
    /// `reference to T`
    Ref(Box<Ty>),
    /// Function type
    Func(FuncTy),
    /// User-defined record, alias, or interface, by name
    Named(Name),
    /// Multi-return bundle; only ever the type of a call
    Tuple(Vec<Ty>),
}

/// A function signature as a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncTy {
    /// Parameter types; for a variadic function the last entry is the
    /// element type of the `many` parameter
    pub params: Vec<Ty>,
    /// Return types, empty for void
    pub results: Vec<Ty>,
    /// True when the final parameter is `many`
    pub variadic: bool,
}

impl FuncTy {
    /// The type of a call's value: `Void`, the single result, or a tuple
    pub fn result_ty(&self) -> Ty {
        match self.results.len() {
            0 => Ty::Void,
            1 => self.results[0].clone(),
            _ => Ty::Tuple(self.results.clone()),
        }
    }
}

impl Ty {
    /// True for every integer-family type
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Ty::Int | Ty::Int8 | Ty::Int16 | Ty::Int32 | Ty::Int64 | Ty::Byte | Ty::Rune
        )
    }

    /// True for float types
    pub fn is_float(&self) -> bool {
        matches!(self, Ty::Float | Ty::Float32 | Ty::Float64)
    }

    /// True for any numeric type
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// True when ordering comparisons apply
    pub fn is_ordered(&self) -> bool {
        self.is_numeric() || matches!(self, Ty::Str)
    }

    /// True when the checker should stay quiet about this operand
    pub fn is_unknown(&self) -> bool {
        matches!(self, Ty::Unknown)
    }

    /// Width rank used for integer promotion; `int` is widest
    fn int_rank(&self) -> u8 {
        match self {
            Ty::Int8 => 1,
            Ty::Byte => 1,
            Ty::Int16 => 2,
            Ty::Int32 => 3,
            Ty::Rune => 3,
            Ty::Int64 => 4,
            Ty::Int => 5,
            _ => 0,
        }
    }

    /// The common type of two numeric operands, if one exists
    ///
    /// Equal types stay put; integers promote to the wider operand;
    /// floats promote to the wider float. Mixing integers and floats is
    /// not a promotion, it is a type error at the call site.
    pub fn promote(&self, other: &Ty) -> Option<Ty> {
        if self == other {
            return Some(self.clone());
        }
        if self.is_unknown() || other.is_unknown() {
            return Some(Ty::Unknown);
        }
        if self.is_integer() && other.is_integer() {
            let wide = if self.int_rank() >= other.int_rank() {
                self
            } else {
                other
            };
            return Some(wide.clone());
        }
        if self.is_float() && other.is_float() {
            let wide = if matches!(self, Ty::Float32) { other } else { self };
            return Some(wide.clone());
        }
        None
    }

    /// Structural assignability of `self` into `expected`
    ///
    /// `any` accepts everything; `error` accepts every named type (an
    /// interface check this front-end does not model further); `Unknown`
    /// and `Never` are compatible in both directions.
    pub fn assignable_to(&self, expected: &Ty) -> bool {
        if self == expected {
            return true;
        }
        match (self, expected) {
            (Ty::Unknown, _) | (_, Ty::Unknown) => true,
            (Ty::Never, _) => true,
            (_, Ty::Any) => true,
            (Ty::List(a), Ty::List(b)) => a.assignable_to(b),
            (Ty::Map(ak, av), Ty::Map(bk, bv)) => ak.assignable_to(bk) && av.assignable_to(bv),
            (Ty::Chan(a), Ty::Chan(b)) => a.assignable_to(b),
            (Ty::Ref(a), Ty::Ref(b)) => a.assignable_to(b),
            (Ty::Func(a), Ty::Func(b)) => {
                a.params.len() == b.params.len()
                    && a.results.len() == b.results.len()
                    && a.params
                        .iter()
                        .zip(&b.params)
                        .all(|(x, y)| x.assignable_to(y))
                    && a.results
                        .iter()
                        .zip(&b.results)
                        .all(|(x, y)| x.assignable_to(y))
            }
            (Ty::Named(_), Ty::Error) => true,
            _ => false,
        }
    }

    /// True when `==`/`!=` make sense between these operands
    pub fn comparable_with(&self, other: &Ty) -> bool {
        self.assignable_to(other) || other.assignable_to(self) || self.promote(other).is_some()
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Unknown => write!(f, "<unknown>"),
            Ty::Void => write!(f, "()"),
            Ty::Never => write!(f, "never"),
            Ty::Int => write!(f, "int"),
            Ty::Int8 => write!(f, "int8"),
            Ty::Int16 => write!(f, "int16"),
            Ty::Int32 => write!(f, "int32"),
            Ty::Int64 => write!(f, "int64"),
            Ty::Float => write!(f, "float"),
            Ty::Float32 => write!(f, "float32"),
            Ty::Float64 => write!(f, "float64"),
            Ty::Str => write!(f, "string"),
            Ty::Bool => write!(f, "bool"),
            Ty::Byte => write!(f, "byte"),
            Ty::Rune => write!(f, "rune"),
            Ty::Any => write!(f, "any"),
            Ty::Error => write!(f, "error"),
            Ty::List(elem) => write!(f, "list of {elem}"),
            Ty::Map(key, value) => write!(f, "map of {key} to {value}"),
            Ty::Chan(elem) => write!(f, "channel of {elem}"),
            Ty::Ref(inner) => write!(f, "reference to {inner}"),
            Ty::Func(func) => {
                write!(f, "func(")?;
                for (i, p) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if func.variadic && i + 1 == func.params.len() {
                        write!(f, "many ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")?;
                match func.results.len() {
                    0 => Ok(()),
                    1 => write!(f, " {}", func.results[0]),
                    _ => {
                        write!(f, " (")?;
                        for (i, r) in func.results.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{r}")?;
                        }
                        write!(f, ")")
                    }
                }
            }
            Ty::Named(name) => write!(f, "{name}"),
            Ty::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_classes() {
        assert!(Ty::Int.is_integer());
        assert!(Ty::Byte.is_integer());
        assert!(Ty::Rune.is_integer());
        assert!(Ty::Float32.is_float());
        assert!(!Ty::Str.is_numeric());
        assert!(Ty::Str.is_ordered());
    }

    #[test]
    fn test_promotion_widens_integers() {
        assert_eq!(Ty::Int8.promote(&Ty::Int32), Some(Ty::Int32));
        assert_eq!(Ty::Int32.promote(&Ty::Int), Some(Ty::Int));
        assert_eq!(Ty::Int.promote(&Ty::Int), Some(Ty::Int));
        assert_eq!(Ty::Float32.promote(&Ty::Float), Some(Ty::Float));
    }

    #[test]
    fn test_promotion_rejects_mixed_families() {
        assert_eq!(Ty::Int.promote(&Ty::Float), None);
        assert_eq!(Ty::Str.promote(&Ty::Int), None);
    }

    #[test]
    fn test_unknown_is_quiet() {
        assert_eq!(Ty::Unknown.promote(&Ty::Int), Some(Ty::Unknown));
        assert!(Ty::Unknown.assignable_to(&Ty::Str));
        assert!(Ty::Str.assignable_to(&Ty::Unknown));
    }

    #[test]
    fn test_assignability() {
        assert!(Ty::Int.assignable_to(&Ty::Int));
        assert!(Ty::Int.assignable_to(&Ty::Any));
        assert!(!Ty::Int.assignable_to(&Ty::Str));
        assert!(Ty::List(Box::new(Ty::Int)).assignable_to(&Ty::List(Box::new(Ty::Int))));
        assert!(!Ty::List(Box::new(Ty::Int)).assignable_to(&Ty::List(Box::new(Ty::Str))));
        assert!(Ty::Never.assignable_to(&Ty::Int));
    }

    #[test]
    fn test_display() {
        assert_eq!(Ty::List(Box::new(Ty::Int)).to_string(), "list of int");
        assert_eq!(
            Ty::Map(Box::new(Ty::Str), Box::new(Ty::Int)).to_string(),
            "map of string to int"
        );
        let func = Ty::Func(FuncTy {
            params: vec![Ty::Str],
            results: vec![Ty::Int, Ty::Error],
            variadic: false,
        });
        assert_eq!(func.to_string(), "func(string) (int, error)");
    }

    #[test]
    fn test_result_ty() {
        let void = FuncTy {
            params: vec![],
            results: vec![],
            variadic: false,
        };
        assert_eq!(void.result_ty(), Ty::Void);

        let pair = FuncTy {
            params: vec![],
            results: vec![Ty::Int, Ty::Error],
            variadic: false,
        };
        assert_eq!(pair.result_ty(), Ty::Tuple(vec![Ty::Int, Ty::Error]));
    }
}
