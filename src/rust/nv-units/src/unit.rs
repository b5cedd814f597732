// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Unit-tagged quantities.
//!
//! `quantity!(Name)` defines `Name<U, T = f64>`: a value of type `T` tagged
//! with a zero-sized unit marker `U`. Quantities add and subtract only
//! within one unit and scale by a bare `T`.

use std::fmt;

pub(crate) fn round_to_significant_digits(x: f64, n: u32) -> f64 {
    if x == 0.0 {
        return 0.0;
    }
    let order = x.abs().log10().floor();
    let scale = 10f64.powf(f64::from(n) - 1.0 - order);
    (x * scale).round() / scale
}

/// Numeric payload of a quantity.
pub trait QuantityValue: num_traits::Num + Copy + PartialOrd {
    fn fmt_value(self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

/// Floats print with 14 significant digits so that rounding noise such as
/// `80.00000000000001` stays out of logs and command strings.
impl QuantityValue for f64 {
    fn fmt_value(self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&round_to_significant_digits(self, 14), f)
    }
}

impl QuantityValue for i64 {
    fn fmt_value(self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self, f)
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __quantity_op {
    ($ident:ident, $trait:ident, $method:ident, $op:tt) => {
        impl<U: Copy, T: $crate::unit::QuantityValue> std::ops::$trait for $ident<U, T> {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self {
                $ident {
                    value: self.value $op rhs.value,
                    unit: self.unit,
                }
            }
        }
    };
}

#[macro_export]
macro_rules! quantity {
    ($ident:ident) => {
        /// A value of type `T` in the unit `U`.
        #[derive(Clone, Copy, Default, Debug)]
        pub struct $ident<U, T = f64> {
            pub(crate) value: T,
            pub(crate) unit: U,
        }

        impl<U, T> $ident<U, T> {
            pub fn value(self) -> T {
                self.value
            }
        }

        impl<U, T: PartialEq> PartialEq for $ident<U, T> {
            fn eq(&self, other: &Self) -> bool {
                self.value == other.value
            }
        }

        impl<U, T: PartialOrd> PartialOrd for $ident<U, T> {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                self.value.partial_cmp(&other.value)
            }
        }

        $crate::__quantity_op!($ident, Add, add, +);
        $crate::__quantity_op!($ident, Sub, sub, -);

        impl<U: Copy, T: $crate::unit::QuantityValue> std::ops::Mul<T> for $ident<U, T> {
            type Output = Self;

            fn mul(self, factor: T) -> Self {
                $ident {
                    value: self.value * factor,
                    unit: self.unit,
                }
            }
        }

        impl<U: Copy, T> std::ops::Neg for $ident<U, T>
        where
            T: $crate::unit::QuantityValue + std::ops::Neg<Output = T>,
        {
            type Output = Self;

            fn neg(self) -> Self {
                $ident {
                    value: -self.value,
                    unit: self.unit,
                }
            }
        }

        /// `{}` prints value and unit, `{:#}` the bare value as sent on the
        /// wire.
        impl<U: std::fmt::Display, T: $crate::unit::QuantityValue> std::fmt::Display
            for $ident<U, T>
        {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.value.fmt_value(f)?;
                if !f.alternate() {
                    write!(f, " {}", self.unit)?;
                }
                Ok(())
            }
        }

        impl<U> From<$ident<U, f64>> for f64 {
            fn from(quantity: $ident<U, f64>) -> Self {
                quantity.value
            }
        }

        impl<U> From<$ident<U, i64>> for i64 {
            fn from(quantity: $ident<U, i64>) -> Self {
                quantity.value
            }
        }

        impl<U: Copy + Default, T: $crate::unit::QuantityValue> num_traits::Zero for $ident<U, T> {
            fn zero() -> Self {
                $ident {
                    value: T::zero(),
                    unit: U::default(),
                }
            }

            fn is_zero(&self) -> bool {
                self.value.is_zero()
            }
        }
    };
}
