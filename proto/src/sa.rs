use crate::backend::{EntropySource, NoEntropy};
use crate::crypto::{Crypter, Signer};
use crate::replay::{ReplayWindow, SequenceCursor};

/// One direction of a security association: the negotiated crypter/signer
/// pair, an entropy source for IV generation (outbound only), and the
/// sequence state for that direction.
///
/// The context is the single mutable resource of an association. Taking it
/// by `&mut` serializes sequence issue and window updates per SA without any
/// global lock; callers that share one association across threads wrap the
/// context in their own mutex.
pub struct SaContext<C, S, R = NoEntropy> {
    crypter: C,
    signer: S,
    entropy: Option<R>,
    cursor: SequenceCursor,
    window: ReplayWindow,
}

impl<C: Crypter, S: Signer, R: EntropySource> SaContext<C, S, R> {
    /// Outbound context. The entropy source feeds per-datagram IVs.
    pub fn outbound(crypter: C, signer: S, entropy: R) -> Self {
        SaContext {
            crypter,
            signer,
            entropy: Some(entropy),
            cursor: SequenceCursor::new(),
            window: ReplayWindow::new(),
        }
    }

    pub fn crypter(&self) -> &C {
        &self.crypter
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    /// Entropy source, if this context has one. Inbound contexts return
    /// `None`; encrypting against such a context fails without touching any
    /// key material.
    pub fn entropy(&mut self) -> Option<&mut R> {
        self.entropy.as_mut()
    }

    /// Issue the next egress sequence number, or `None` once the counter has
    /// cycled and the association needs rekeying.
    pub fn next_seqno(&mut self) -> Option<u32> {
        self.cursor.next()
    }

    /// Last egress sequence number issued.
    pub fn last_seqno(&self) -> u32 {
        self.cursor.last()
    }

    /// Replay pre-check for an ingress sequence number. Pure query; run
    /// before any key material is exercised.
    pub fn verify_seqno(&self, seq: u32) -> bool {
        self.window.check(seq)
    }

    /// Record an ingress sequence number after the datagram authenticated.
    pub fn commit_seqno(&mut self, seq: u32) {
        self.window.commit(seq)
    }

    pub fn window(&self) -> &ReplayWindow {
        &self.window
    }
}

impl<C: Crypter, S: Signer> SaContext<C, S, NoEntropy> {
    /// Inbound context. Never generates IVs, so it carries no entropy
    /// source.
    pub fn inbound(crypter: C, signer: S) -> Self {
        SaContext {
            crypter,
            signer,
            entropy: None,
            cursor: SequenceCursor::new(),
            window: ReplayWindow::new(),
        }
    }
}
