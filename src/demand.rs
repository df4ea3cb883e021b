//! Demand: how many more values a subscriber is willing to receive.
//!
//! Arithmetic saturates: adding anything to `Unlimited` stays `Unlimited`, a
//! bounded sum that would overflow becomes `Unlimited`, and subtraction never
//! goes below zero.

use std::{
  fmt::{Display, Formatter},
  ops::{Add, AddAssign, Sub, SubAssign},
};

use crate::error::RxError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Demand {
  /// A bounded number of further values. `Max(0)` is "no demand".
  Max(usize),
  Unlimited,
}

impl Demand {
  pub const NONE: Demand = Demand::Max(0);
  pub const UNLIMITED: Demand = Demand::Unlimited;

  #[inline]
  pub const fn none() -> Self { Demand::NONE }

  #[inline]
  pub const fn unlimited() -> Self { Demand::Unlimited }

  #[inline]
  pub const fn max(n: usize) -> Self { Demand::Max(n) }

  #[inline]
  pub fn is_none(&self) -> bool { matches!(self, Demand::Max(0)) }

  #[inline]
  pub fn is_unlimited(&self) -> bool { matches!(self, Demand::Unlimited) }

  /// The bounded amount, or `None` for `Unlimited`.
  pub fn max_value(&self) -> Option<usize> {
    match self {
      Demand::Max(n) => Some(*n),
      Demand::Unlimited => None,
    }
  }

  /// True when at least `n + 1` more values may be emitted.
  #[inline]
  pub fn exceeds(&self, n: usize) -> bool {
    match self {
      Demand::Max(m) => *m > n,
      Demand::Unlimited => true,
    }
  }

  /// Accounts for one emitted value. Returns false, leaving the demand
  /// untouched, when there was nothing to consume.
  pub fn consume_one(&mut self) -> bool {
    match self {
      Demand::Unlimited => true,
      Demand::Max(0) => false,
      Demand::Max(n) => {
        *n -= 1;
        true
      }
    }
  }
}

impl Default for Demand {
  fn default() -> Self { Demand::NONE }
}

impl Add for Demand {
  type Output = Demand;

  fn add(self, rhs: Demand) -> Demand {
    match (self, rhs) {
      (Demand::Max(a), Demand::Max(b)) => a.checked_add(b).map_or(Demand::Unlimited, Demand::Max),
      _ => Demand::Unlimited,
    }
  }
}

impl AddAssign for Demand {
  fn add_assign(&mut self, rhs: Demand) { *self = *self + rhs; }
}

impl Add<usize> for Demand {
  type Output = Demand;

  fn add(self, rhs: usize) -> Demand { self + Demand::Max(rhs) }
}

impl Sub<usize> for Demand {
  type Output = Demand;

  fn sub(self, rhs: usize) -> Demand {
    match self {
      Demand::Max(n) => Demand::Max(n.saturating_sub(rhs)),
      Demand::Unlimited => Demand::Unlimited,
    }
  }
}

impl SubAssign<usize> for Demand {
  fn sub_assign(&mut self, rhs: usize) { *self = *self - rhs; }
}

impl From<usize> for Demand {
  fn from(n: usize) -> Self { Demand::Max(n) }
}

impl TryFrom<i64> for Demand {
  type Error = RxError;

  fn try_from(n: i64) -> Result<Self, Self::Error> {
    usize::try_from(n).map(Demand::Max).map_err(|_| RxError::NegativeDemand(n))
  }
}

impl Display for Demand {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Demand::Max(n) => write!(f, "max({n})"),
      Demand::Unlimited => f.write_str("unlimited"),
    }
  }
}
