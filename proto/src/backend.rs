/// Entropy source used to fill per-datagram initialization vectors.
pub trait EntropySource {
    type Error;

    /// Fill `buf` completely with random bytes. A partial fill is an error.
    fn fill_bytes(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;
}

/// Stand-in entropy source for inbound contexts, which never generate IVs.
///
/// Always fails, so a misconfigured outbound context cannot silently emit
/// zeroed IVs.
pub struct NoEntropy;

impl EntropySource for NoEntropy {
    type Error = ();

    fn fill_bytes(&mut self, _buf: &mut [u8]) -> Result<(), ()> {
        Err(())
    }
}
