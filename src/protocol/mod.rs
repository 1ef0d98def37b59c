//! The three multi-party private set intersection engines.
//!
//! Every engine drives its roles through a fixed round order in-process:
//! the orchestrating `run` method collects all messages of a round into
//! indexed buffers before any receiving role's next step executes, so no
//! role ever observes a half-delivered round. The roles themselves are
//! plain structs holding only their own key share, dataset and randomness;
//! everything that crosses a role boundary is a `Vec` handed through the
//! orchestrator and logged in the run's [ProtocolStats].
//!
//! * [AdditiveMpsi]: bloom filters, inverted encoding, one designated
//!   server learns the intersection. Tolerates the full client count as
//!   decryption threshold.
//! * [IntegratedMpsi]: bloom filters, direct encoding, a dealer folds the
//!   filters and every party learns the intersection of its own elements.
//! * [PolynomialMpsi]: encrypted root polynomials and masked oblivious
//!   evaluation, one designated server learns the intersection.

pub mod additive;
pub mod integrated;
pub mod polynomial;

pub use additive::AdditiveMpsi;
pub use integrated::IntegratedMpsi;
pub use polynomial::PolynomialMpsi;

use crate::paillier::PrivateKeyShare;
use crate::stats::ProtocolStats;
use anyhow::{bail, Result};

/// Structured outcome of one protocol run.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Intersection as seen by each result-learning role: a single entry
    /// (the server's view) for the additive and polynomial engines, one
    /// entry per party for the integrated engine.
    pub intersections: Vec<Vec<String>>,
    /// Transfer and timing recorders of the run.
    pub stats: ProtocolStats,
}

impl RunReport {
    /// The first recorded view of the intersection. Engines always record
    /// at least one view.
    pub fn intersection(&self) -> &[String] {
        &self.intersections[0]
    }
}

pub(crate) fn ensure_datasets(datasets: &[Vec<String>], min_parties: usize) -> Result<()> {
    if datasets.len() < min_parties {
        bail!(
            "need at least {} datasets, got {} @{}:{}",
            min_parties,
            datasets.len(),
            file!(),
            line!()
        );
    }
    for (i, dataset) in datasets.iter().enumerate() {
        if dataset.is_empty() {
            bail!("dataset {} is empty @{}:{}", i, file!(), line!());
        }
    }
    Ok(())
}

pub(crate) fn ensure_keys(
    keys: &[PrivateKeyShare],
    num_roles: usize,
    threshold: usize,
) -> Result<()> {
    if keys.len() != num_roles {
        bail!(
            "expected {} key shares, got {} @{}:{}",
            num_roles,
            keys.len(),
            file!(),
            line!()
        );
    }
    let public = keys[0].public();
    if public.threshold() != threshold {
        bail!(
            "key threshold is {}, protocol needs {} @{}:{}",
            public.threshold(),
            threshold,
            file!(),
            line!()
        );
    }
    for key in keys.iter().skip(1) {
        if key.public() != public {
            bail!(
                "key shares belong to different public keys @{}:{}",
                file!(),
                line!()
            );
        }
    }
    Ok(())
}
