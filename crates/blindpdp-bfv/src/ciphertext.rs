use blindpdp_core::SerializedSize;
use fhe::bfv::Ciphertext;
use fhe_traits::Serialize;

/// BFV ciphertext together with its component count. Fresh and
/// relinearized ciphertexts have two components; a product before
/// relinearization has three.
#[derive(Clone)]
pub struct BfvCiphertext {
    pub(crate) inner: Ciphertext,
    pub(crate) parts: usize,
    pub(crate) degree: usize,
}

impl BfvCiphertext {
    pub(crate) fn fresh(inner: Ciphertext, degree: usize) -> Self {
        Self {
            inner,
            parts: 2,
            degree,
        }
    }

    /// Number of polynomial components.
    pub fn size(&self) -> usize {
        self.parts
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.to_bytes()
    }
}

impl std::fmt::Debug for BfvCiphertext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BfvCiphertext")
            .field("parts", &self.parts)
            .field("degree", &self.degree)
            .finish_non_exhaustive()
    }
}

impl SerializedSize for BfvCiphertext {
    fn serialized_size(&self) -> usize {
        self.to_bytes().len()
    }
}
