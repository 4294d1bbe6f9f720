use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Width {
    Known(u32),
    Unknown,
}

impl Width {
    pub fn known(&self) -> Option<u32> {
        match self {
            Width::Known(w) => Some(*w),
            Width::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Width::Known(_))
    }

    pub fn max(self, other: Width) -> Width {
        self.combine(other, |a, b| a.max(b))
    }

    pub fn min(self, other: Width) -> Width {
        self.combine(other, |a, b| a.min(b))
    }

    pub fn sum(self, other: Width) -> Width {
        self.combine(other, |a, b| a.saturating_add(b))
    }

    pub fn plus(self, n: u32) -> Width {
        self.map(|w| w.saturating_add(n))
    }

    /// Narrows by `n` bits, never below one bit.
    pub fn minus(self, n: u32) -> Width {
        self.map(|w| w.saturating_sub(n).max(1))
    }

    pub fn map(self, f: impl FnOnce(u32) -> u32) -> Width {
        match self {
            Width::Known(w) => Width::Known(f(w)),
            Width::Unknown => Width::Unknown,
        }
    }

    fn combine(self, other: Width, f: impl FnOnce(u32, u32) -> u32) -> Width {
        match (self, other) {
            (Width::Known(a), Width::Known(b)) => Width::Known(f(a, b)),
            _ => Width::Unknown,
        }
    }
}

impl From<u32> for Width {
    fn from(w: u32) -> Self {
        Width::Known(w)
    }
}

/// Minimal two's-complement width able to hold `value`.
pub fn signed_width(value: &BigInt) -> u32 {
    let magnitude_bits = if value.is_negative() {
        (-value - BigInt::one()).bits()
    } else {
        value.bits()
    };
    u32::try_from(magnitude_bits + 1).unwrap_or(u32::MAX)
}

/// Minimal unsigned width able to hold a non-negative `value`. Zero needs one bit.
pub fn unsigned_width(value: &BigInt) -> u32 {
    u32::try_from(value.bits().max(1)).unwrap_or(u32::MAX)
}

/// One endpoint of an interval: a known rational value, or unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bound {
    Known(BigRational),
    Open,
}

impl Bound {
    pub fn integer(value: impl Into<BigInt>) -> Self {
        Bound::Known(BigRational::from_integer(value.into()))
    }

    /// Finite values are converted exactly; infinities and NaN become open bounds.
    pub fn from_f64(value: f64) -> Self {
        BigRational::from_float(value)
            .map(Bound::Known)
            .unwrap_or(Bound::Open)
    }

    pub fn value(&self) -> Option<&BigRational> {
        match self {
            Bound::Known(v) => Some(v),
            Bound::Open => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Bound::Known(_))
    }

    /// Integer encoding of the bound at `point` fractional bits: `floor(bound * 2^point)`.
    pub fn adjusted(&self, point: u32) -> Option<BigInt> {
        let value = self.value()?;
        let scale = BigRational::from_integer(BigInt::one() << (point as usize));
        Some((value.clone() * scale).floor().to_integer())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntervalType {
    pub lower: Bound,
    pub upper: Bound,
    /// Binary point: number of fractional bits.
    pub point: Width,
    /// Intrinsic width of the adjusted range, filled in on construction.
    pub width: Width,
}

impl IntervalType {
    pub fn new(lower: Bound, upper: Bound, point: Width) -> Self {
        let width = Self::intrinsic_width(&lower, &upper, point);
        Self {
            lower,
            upper,
            point,
            width,
        }
    }

    pub fn closed(lower: f64, upper: f64, point: u32) -> Self {
        Self::new(
            Bound::from_f64(lower),
            Bound::from_f64(upper),
            Width::Known(point),
        )
    }

    fn intrinsic_width(lower: &Bound, upper: &Bound, point: Width) -> Width {
        let Some(p) = point.known() else {
            return Width::Unknown;
        };
        match (lower.adjusted(p), upper.adjusted(p)) {
            (Some(lo), Some(hi)) => Width::Known(signed_width(&lo).max(signed_width(&hi))),
            _ => Width::Unknown,
        }
    }

    pub fn min_adjusted(&self) -> Option<BigInt> {
        self.lower.adjusted(self.point.known()?)
    }

    pub fn max_adjusted(&self) -> Option<BigInt> {
        self.upper.adjusted(self.point.known()?)
    }

    pub fn adjusted_bounds(&self) -> Option<(BigInt, BigInt)> {
        Some((self.min_adjusted()?, self.max_adjusted()?))
    }

    /// Both bounds and the binary point are known.
    pub fn is_resolved(&self) -> bool {
        self.lower.is_known() && self.upper.is_known() && self.point.is_known()
    }

    pub fn has_open_bound(&self) -> bool {
        !self.lower.is_known() || !self.upper.is_known()
    }

    /// Same bounds, re-expressed at `point` fractional bits.
    pub fn with_point(&self, point: u32) -> Self {
        Self::new(self.lower.clone(), self.upper.clone(), Width::Known(point))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub flip: bool,
    pub ty: Type,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            flip: false,
            ty,
        }
    }

    pub fn flipped(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            flip: true,
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    UInt(Width),
    SInt(Width),
    Interval(IntervalType),
    Clock,
    Bundle(Vec<Field>),
    Vector(Box<Type>, usize),
    Unknown,
}

impl Type {
    pub fn uint(width: u32) -> Self {
        Type::UInt(Width::Known(width))
    }

    pub fn sint(width: u32) -> Self {
        Type::SInt(Width::Known(width))
    }

    pub fn interval(lower: f64, upper: f64, point: u32) -> Self {
        Type::Interval(IntervalType::closed(lower, upper, point))
    }

    pub fn vector(elem: Type, size: usize) -> Self {
        Type::Vector(Box::new(elem), size)
    }

    /// Width of a ground type; aggregates and unknown types report `Width::Unknown`.
    pub fn width(&self) -> Width {
        match self {
            Type::UInt(w) | Type::SInt(w) => *w,
            Type::Interval(i) => i.width,
            Type::Clock => Width::Known(1),
            Type::Bundle(_) | Type::Vector(_, _) | Type::Unknown => Width::Unknown,
        }
    }

    pub fn as_interval(&self) -> Option<&IntervalType> {
        match self {
            Type::Interval(i) => Some(i),
            _ => None,
        }
    }

    pub fn is_interval(&self) -> bool {
        matches!(self, Type::Interval(_))
    }

    pub fn is_ground(&self) -> bool {
        !matches!(self, Type::Bundle(_) | Type::Vector(_, _))
    }

    pub fn contains_interval(&self) -> bool {
        match self {
            Type::Interval(_) => true,
            Type::Bundle(fields) => fields.iter().any(|f| f.ty.contains_interval()),
            Type::Vector(elem, _) => elem.contains_interval(),
            _ => false,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        match self {
            Type::Bundle(fields) => fields.iter().find(|f| f.name == name),
            _ => None,
        }
    }

    /// Rewrites the direct child types of an aggregate; ground types are returned as-is.
    pub fn try_map<E, F>(self, mut f: F) -> Result<Type, E>
    where
        F: FnMut(Type) -> Result<Type, E>,
    {
        match self {
            Type::Bundle(fields) => {
                let fields = fields
                    .into_iter()
                    .map(|field| {
                        Ok(Field {
                            name: field.name,
                            flip: field.flip,
                            ty: f(field.ty)?,
                        })
                    })
                    .collect::<Result<Vec<_>, E>>()?;
                Ok(Type::Bundle(fields))
            }
            Type::Vector(elem, size) => Ok(Type::Vector(Box::new(f(*elem)?), size)),
            ground => Ok(ground),
        }
    }
}

pub(crate) fn is_power_of_two(value: &BigInt) -> bool {
    !value.is_zero() && value.trailing_zeros() == Some(value.bits() - 1)
}
