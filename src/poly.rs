//! Dense polynomials over Z_n.
//!
//! Coefficients are stored constant term first and kept canonical: the
//! leading coefficient is never zero, and the zero polynomial is the empty
//! coefficient vector (degree `None`). The polynomial protocol builds its
//! set encodings from [Polynomial::from_roots] and ships the coefficient
//! vector; see [crate::ope].

use num_bigint::BigUint;
use num_traits::{One, Zero};

/// A polynomial over Z_n, constant term first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Polynomial {
    modulus: BigUint,
    coef: Vec<BigUint>,
}

impl Polynomial {
    /// The zero polynomial.
    pub fn zero(modulus: &BigUint) -> Self {
        Self {
            modulus: modulus.clone(),
            coef: Vec::new(),
        }
    }

    /// The polynomial `coefficient · x^exponent`.
    pub fn monomial(coefficient: BigUint, exponent: usize, modulus: &BigUint) -> Self {
        let c = coefficient % modulus;
        if c.is_zero() {
            return Self::zero(modulus);
        }
        let mut coef = vec![BigUint::zero(); exponent];
        coef.push(c);
        Self {
            modulus: modulus.clone(),
            coef,
        }
    }

    /// The monic polynomial Π (x - r) over the given roots.
    ///
    /// ```
    /// use num_bigint::BigUint;
    /// use threshold_mpsi_with_paillier::poly::Polynomial;
    ///
    /// let modulus = BigUint::from(97u32);
    /// let roots = [BigUint::from(2u32), BigUint::from(5u32)];
    /// let p = Polynomial::from_roots(&roots, &modulus);
    ///
    /// // (x - 2)(x - 5) = x² - 7x + 10
    /// assert_eq!(
    ///     p.coefficients(),
    ///     &[BigUint::from(10u32), BigUint::from(90u32), BigUint::from(1u32)]
    /// );
    /// assert_eq!(p.evaluate(&BigUint::from(5u32)), BigUint::from(0u32));
    /// ```
    pub fn from_roots(roots: &[BigUint], modulus: &BigUint) -> Self {
        let mut product = Self::monomial(BigUint::one(), 0, modulus);
        for r in roots {
            let neg = (modulus - (r % modulus)) % modulus;
            let factor = Self {
                modulus: modulus.clone(),
                coef: vec![neg, BigUint::one()],
            };
            product = product.mul(&factor);
        }
        product
    }

    /// The coefficient modulus.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Degree of the polynomial, `None` for the zero polynomial.
    pub fn degree(&self) -> Option<usize> {
        self.coef.len().checked_sub(1)
    }

    /// Coefficients, constant term first. The leading entry is non-zero.
    pub fn coefficients(&self) -> &[BigUint] {
        &self.coef
    }

    /// Coefficient-wise sum.
    pub fn add(&self, other: &Self) -> Self {
        assert!(self.modulus == other.modulus);
        let len = self.coef.len().max(other.coef.len());
        let zero = BigUint::zero();
        let coef = (0..len)
            .map(|i| {
                let a = self.coef.get(i).unwrap_or(&zero);
                let b = other.coef.get(i).unwrap_or(&zero);
                (a + b) % &self.modulus
            })
            .collect();
        let mut sum = Self {
            modulus: self.modulus.clone(),
            coef,
        };
        sum.reduce();
        sum
    }

    /// Coefficient-wise difference.
    pub fn sub(&self, other: &Self) -> Self {
        assert!(self.modulus == other.modulus);
        let len = self.coef.len().max(other.coef.len());
        let zero = BigUint::zero();
        let coef = (0..len)
            .map(|i| {
                let a = self.coef.get(i).unwrap_or(&zero);
                let b = other.coef.get(i).unwrap_or(&zero);
                (a + &self.modulus - b) % &self.modulus
            })
            .collect();
        let mut diff = Self {
            modulus: self.modulus.clone(),
            coef,
        };
        diff.reduce();
        diff
    }

    /// Polynomial product by coefficient convolution.
    pub fn mul(&self, other: &Self) -> Self {
        assert!(self.modulus == other.modulus);
        if self.coef.is_empty() || other.coef.is_empty() {
            return Self::zero(&self.modulus);
        }
        let mut coef = vec![BigUint::zero(); self.coef.len() + other.coef.len() - 1];
        for (i, a) in self.coef.iter().enumerate() {
            for (j, b) in other.coef.iter().enumerate() {
                coef[i + j] = (&coef[i + j] + a * b) % &self.modulus;
            }
        }
        let mut product = Self {
            modulus: self.modulus.clone(),
            coef,
        };
        product.reduce();
        product
    }

    /// Evaluate at `x` with Horner's rule.
    pub fn evaluate(&self, x: &BigUint) -> BigUint {
        let x = x % &self.modulus;
        let mut acc = BigUint::zero();
        for c in self.coef.iter().rev() {
            acc = (acc * &x + c) % &self.modulus;
        }
        acc
    }

    // canonical form: no zero leading coefficient
    fn reduce(&mut self) {
        while self.coef.last().map_or(false, |c| c.is_zero()) {
            self.coef.pop();
        }
    }
}
