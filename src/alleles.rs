use std::fmt;
use std::ops::{Add, Div, Index, IndexMut, Mul};
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use crate::error::ConfigError;

/**
The six heritable loci. The `A` triple parametrizes the acceptance of
offspring by a breeder, the `B` triple the offspring's own tendency to stay.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locus {
    A0,
    A1,
    A2,
    B0,
    B1,
    B2,
}

pub const LOCI: usize = 6;

/**
A set of alleles, one real value per locus.
*/
#[derive(Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Alleles {
    pub entries: [f64; LOCI],
}

impl From<[f64; LOCI]> for Alleles {
    fn from(entries: [f64; LOCI]) -> Self {
        Alleles { entries }
    }
}

impl From<f64> for Alleles {
    fn from(v: f64) -> Self {
        Alleles { entries: [v; LOCI] }
    }
}

impl Index<Locus> for Alleles {
    type Output = f64;

    fn index(&self, locus: Locus) -> &f64 {
        &self.entries[locus as usize]
    }
}

impl Index<usize> for Alleles {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.entries[index]
    }
}

impl IndexMut<usize> for Alleles {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.entries[index]
    }
}

/**
Masking multiplies locus by locus.
*/
impl Mul for Alleles {
    type Output = Self;

    fn mul(self, mask: Self) -> Self {
        let mut result = self;
        for (r, m) in result.entries.iter_mut().zip(mask.entries.iter()) {
            *r *= m;
        }
        result
    }
}

impl Add for Alleles {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        let mut result = self;
        for (r, o) in result.entries.iter_mut().zip(other.entries.iter()) {
            *r += o;
        }
        result
    }
}

impl Div<f64> for Alleles {
    type Output = Self;

    fn div(self, f: f64) -> Self {
        let mut result = self;
        for r in result.entries.iter_mut() {
            *r /= f;
        }
        result
    }
}

impl<'a> std::iter::Sum<&'a Alleles> for Alleles {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Alleles::default(), |acc, a| acc + *a)
    }
}

impl fmt::Debug for Alleles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

impl fmt::Display for Alleles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", itertools::join(self.entries.iter(), " "))
    }
}

/**
Parse an allele configuration such as `5 0 0 5 0 0` or `5,0,0,5,0,0`.

```rust
# use model::alleles::{Alleles, Locus};
let a: Alleles = "5, 0 0 5 0 -0.5".parse().unwrap();
assert_eq!(a[Locus::B0], 5.0);
assert_eq!(a[Locus::B2], -0.5);
assert!("5 0 0".parse::<Alleles>().is_err());
```
*/
impl FromStr for Alleles {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ConfigError::MalformedAlleles(s.to_string());
        let values = s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(f64::from_str)
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|_| malformed())?;
        if values.len() != LOCI || values.iter().any(|v| !v.is_finite()) {
            return Err(malformed());
        }
        let mut entries = [0.; LOCI];
        entries.copy_from_slice(&values);
        Ok(Alleles { entries })
    }
}
