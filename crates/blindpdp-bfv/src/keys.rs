use blindpdp_core::SerializedSize;
use fhe::bfv::{PublicKey, RelinearizationKey, SecretKey};
use fhe_traits::Serialize;

/// Secret key. The wrapped key wipes itself on drop; `Debug` never prints
/// coefficients.
pub struct BfvSecretKey {
    pub(crate) inner: SecretKey,
    pub(crate) degree: usize,
}

impl BfvSecretKey {
    pub fn degree(&self) -> usize {
        self.degree
    }
}

impl std::fmt::Debug for BfvSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BfvSecretKey")
            .field("degree", &self.degree)
            .finish_non_exhaustive()
    }
}

impl SerializedSize for BfvSecretKey {
    /// One byte per ternary coefficient.
    fn serialized_size(&self) -> usize {
        self.degree
    }
}

pub struct BfvPublicKey {
    pub(crate) inner: PublicKey,
    pub(crate) degree: usize,
}

impl BfvPublicKey {
    pub fn degree(&self) -> usize {
        self.degree
    }
}

impl std::fmt::Debug for BfvPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BfvPublicKey")
            .field("degree", &self.degree)
            .finish_non_exhaustive()
    }
}

impl SerializedSize for BfvPublicKey {
    fn serialized_size(&self) -> usize {
        self.inner.to_bytes().len()
    }
}

pub struct BfvRelinKeys {
    pub(crate) inner: RelinearizationKey,
    pub(crate) degree: usize,
}

impl BfvRelinKeys {
    pub fn degree(&self) -> usize {
        self.degree
    }
}

impl std::fmt::Debug for BfvRelinKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BfvRelinKeys")
            .field("degree", &self.degree)
            .finish_non_exhaustive()
    }
}

impl SerializedSize for BfvRelinKeys {
    fn serialized_size(&self) -> usize {
        self.inner.to_bytes().len()
    }
}
