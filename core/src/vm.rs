//! Value multiplicity patterns from the data element dictionary.
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// The value multiplicity constraint of a dictionary entry.
///
/// Covers the standard patterns: `1`, `3`, `1-3`, `1-n`, `2-2n`, `3-3n`.
/// `multiplier` is 1 except for the `k-kn` forms, where the number of
/// values must additionally be a multiple of `k`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ValueMultiplicity {
    /// Minimum number of values.
    pub min: u32,
    /// Maximum number of values, `None` for unbounded (`n` patterns).
    pub max: Option<u32>,
    /// The count must be a multiple of this factor.
    pub multiplier: u32,
}

impl ValueMultiplicity {
    /// The most common multiplicity: exactly one value.
    pub const ONE: ValueMultiplicity = ValueMultiplicity {
        min: 1,
        max: Some(1),
        multiplier: 1,
    };

    /// One or more values.
    pub const ONE_N: ValueMultiplicity = ValueMultiplicity {
        min: 1,
        max: None,
        multiplier: 1,
    };

    /// A fixed multiplicity of exactly `n` values.
    pub const fn fixed(n: u32) -> ValueMultiplicity {
        ValueMultiplicity {
            min: n,
            max: Some(n),
            multiplier: 1,
        }
    }

    /// A bounded range `min-max`.
    pub const fn range(min: u32, max: u32) -> ValueMultiplicity {
        ValueMultiplicity {
            min,
            max: Some(max),
            multiplier: 1,
        }
    }

    /// An unbounded `k-kn` pattern.
    pub const fn multiple(k: u32) -> ValueMultiplicity {
        ValueMultiplicity {
            min: k,
            max: None,
            multiplier: k,
        }
    }

    /// Check whether a value count satisfies this multiplicity.
    pub fn accepts(&self, count: u32) -> bool {
        if count < self.min {
            return false;
        }
        if let Some(max) = self.max {
            if count > max {
                return false;
            }
        }
        count % self.multiplier == 0
    }
}

impl FromStr for ValueMultiplicity {
    type Err = Error;

    fn from_str(pattern: &str) -> Result<Self> {
        let fail = || Error::InvalidMultiplicity {
            pattern: pattern.to_string(),
        };
        match pattern.split_once('-') {
            None => {
                let n: u32 = pattern.parse().map_err(|_| fail())?;
                Ok(ValueMultiplicity::fixed(n))
            }
            Some((lo, hi)) => {
                let min: u32 = lo.parse().map_err(|_| fail())?;
                if hi == "n" {
                    return Ok(ValueMultiplicity {
                        min,
                        max: None,
                        multiplier: 1,
                    });
                }
                // "2-2n", "3-3n"
                if let Some(k) = hi.strip_suffix('n') {
                    let k: u32 = k.parse().map_err(|_| fail())?;
                    if k != min {
                        return Err(fail());
                    }
                    return Ok(ValueMultiplicity::multiple(k));
                }
                let max: u32 = hi.parse().map_err(|_| fail())?;
                if max < min {
                    return Err(fail());
                }
                Ok(ValueMultiplicity::range(min, max))
            }
        }
    }
}

impl fmt::Display for ValueMultiplicity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.max, self.multiplier) {
            (Some(max), _) if self.min == max => write!(f, "{}", self.min),
            (Some(max), _) => write!(f, "{}-{}", self.min, max),
            (None, 1) => write!(f, "{}-n", self.min),
            (None, k) => write!(f, "{}-{}n", k, k),
        }
    }
}
