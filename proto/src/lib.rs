#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]

//! ESP datagram engine shared by host tools and embedded targets.
//! Implements the RFC 4303 wire format with encrypt-then-MAC composition
//! from separate crypter/signer primitives, plus per-association anti-replay.

#[cfg(all(not(feature = "std"), feature = "alloc"))]
extern crate alloc;

use core::mem;
use core::net::SocketAddr;

use zeroize::{Zeroize, Zeroizing};

mod crypto;
pub mod backend;
pub mod replay;
pub mod sa;
pub mod sim;

pub use crypto::{Crypter, CryptoError, DummyCrypter, DummySigner, Signer};
#[cfg(feature = "crypto")]
pub use crypto::{Aes128CbcCrypter, HmacSha1Signer, HmacSha256Signer};
pub use replay::{ReplayWindow, SequenceCursor, WINDOW_SIZE};
pub use sa::SaContext;

use backend::EntropySource;

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec;
#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec as StdVec;

pub const ESP_HEADER_LEN: usize = 8; // spi (4) + sequence number (4)
pub const ESP_TRAILER_LEN: usize = 2; // pad length (1) + next header (1)
pub const MAX_PAD_LEN: usize = 255;
/// Next-header value for an encapsulated IPv4 packet (IPPROTO_IPIP).
pub const PROTO_IPIP: u8 = 4;
/// Next-header value for an encapsulated IPv6 packet (IPPROTO_IPV6).
pub const PROTO_IPV6: u8 = 41;
/// Next-header value for an empty payload (IPPROTO_NONE).
pub const PROTO_NONE: u8 = 59;

#[cfg(all(not(feature = "std"), feature = "alloc"))]
pub(crate) type Vec<T> = StdVec<T>;
#[cfg(feature = "std")]
pub(crate) type Vec<T> = std::vec::Vec<T>;

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    /// Fewer than eight bytes where an ESP header was expected.
    TruncatedHeader,
    /// Datagram length does not admit the negotiated IV/ICV/block geometry.
    BadLayout,
    /// Trailer padding deviates from the 1, 2, ... pad_len pattern or
    /// overruns the plaintext.
    BadPadding,
    /// Decrypted payload does not start with an IPv4 or IPv6 version nibble.
    UnsupportedVersion(u8),
}

/// Pipeline-level failure classes. Replay and integrity failures are
/// indistinguishable on the wire but distinct here so callers can account
/// for them separately.
#[derive(Debug, PartialEq, Eq)]
pub enum EspError {
    Parse(ParseError),
    /// Sequence number outside the replay window or already seen.
    Replay,
    Crypto(CryptoError),
    /// The egress sequence counter reached its maximum; the association
    /// must be rekeyed.
    SeqnoCycled,
    /// No entropy source is attached to the association.
    EntropyUnavailable,
    /// The entropy source failed to produce a full IV.
    ShortEntropy,
}

impl From<ParseError> for EspError {
    fn from(err: ParseError) -> Self {
        EspError::Parse(err)
    }
}

impl From<CryptoError> for EspError {
    fn from(err: CryptoError) -> Self {
        EspError::Crypto(err)
    }
}

/// Encode the fixed ESP header: SPI and sequence number, network byte order.
pub fn encode_header(spi: u32, seq: u32) -> [u8; ESP_HEADER_LEN] {
    let mut out = [0u8; ESP_HEADER_LEN];
    out[..4].copy_from_slice(&spi.to_be_bytes());
    out[4..].copy_from_slice(&seq.to_be_bytes());
    out
}

pub fn decode_header(bytes: &[u8]) -> Result<(u32, u32), ParseError> {
    if bytes.len() < ESP_HEADER_LEN {
        return Err(ParseError::TruncatedHeader);
    }
    let spi = u32::from_be_bytes(bytes[..4].try_into().unwrap());
    let seq = u32::from_be_bytes(bytes[4..8].try_into().unwrap());
    Ok((spi, seq))
}

/// Pad length that makes payload + padding + trailer block-aligned.
/// Always at least 1: an already-aligned payload takes a whole block.
pub fn pad_len_for(payload_len: usize, block_size: usize) -> usize {
    block_size - ((payload_len + ESP_TRAILER_LEN) % block_size)
}

/// Append the self-describing tail: pad bytes 1, 2, ... pad_len, then the
/// pad-length and next-header bytes.
///
/// A pad length above [`MAX_PAD_LEN`] cannot be represented in the one-byte
/// pad-length field and is rejected; it means the crypter's block size is
/// too wide for this wire format.
pub fn write_tail(out: &mut Vec<u8>, pad_len: usize, next_header: u8) -> Result<(), CryptoError> {
    if pad_len > MAX_PAD_LEN {
        return Err(CryptoError::Primitive {
            context: "pad length exceeds one-byte field",
        });
    }
    for i in 1..=pad_len {
        out.push(i as u8);
    }
    out.push(pad_len as u8);
    out.push(next_header);
    Ok(())
}

/// Split a decrypted plaintext into payload and next-header, verifying the
/// pad bytes against their expected 1-based values.
pub fn strip_tail(plaintext: &[u8]) -> Result<(&[u8], u8), ParseError> {
    if plaintext.len() < ESP_TRAILER_LEN {
        return Err(ParseError::BadLayout);
    }
    let next_header = plaintext[plaintext.len() - 1];
    let pad_len = plaintext[plaintext.len() - 2] as usize;
    if pad_len + ESP_TRAILER_LEN > plaintext.len() {
        return Err(ParseError::BadPadding);
    }
    let pad_start = plaintext.len() - ESP_TRAILER_LEN - pad_len;
    for (i, b) in plaintext[pad_start..plaintext.len() - ESP_TRAILER_LEN]
        .iter()
        .enumerate()
    {
        if *b != (i + 1) as u8 {
            return Err(ParseError::BadPadding);
        }
    }
    Ok((&plaintext[..pad_start], next_header))
}

/// Inner IP packet carried through the tunnel. Wipes its bytes on drop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IpPacket {
    version: u8,
    data: Vec<u8>,
}

impl IpPacket {
    /// Decode from raw bytes; the first nibble must identify IPv4 or IPv6.
    /// Rejected input is wiped before returning.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ParseError> {
        let mut data = data;
        let version = match data.first().map(|b| b >> 4) {
            Some(4) => 4,
            Some(6) => 6,
            other => {
                let nibble = other.unwrap_or(0);
                data.zeroize();
                return Err(ParseError::UnsupportedVersion(nibble));
            }
        };
        Ok(IpPacket { version, data })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn encoding(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Drop for IpPacket {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

/// One ESP datagram in flight between two tunnel endpoints.
///
/// Created either from received wire bytes (then [`decrypt`](Self::decrypt)
/// populates the inner packet) or from an inner packet to send (then
/// [`encrypt`](Self::encrypt) populates the wire bytes). The pipelines own
/// the container exclusively while they run and keep no aliases afterwards.
#[derive(Clone, Debug)]
pub struct EspPacket {
    source: SocketAddr,
    destination: SocketAddr,
    data: Vec<u8>,
    payload: Option<IpPacket>,
    next_header: u8,
}

impl EspPacket {
    /// Wrap a datagram received from the transport.
    pub fn from_wire(source: SocketAddr, destination: SocketAddr, data: Vec<u8>) -> Self {
        EspPacket {
            source,
            destination,
            data,
            payload: None,
            next_header: PROTO_NONE,
        }
    }

    /// Prepare an egress datagram around an inner packet. The next-header
    /// byte is derived from the payload's IP version.
    pub fn from_payload(
        source: SocketAddr,
        destination: SocketAddr,
        payload: Option<IpPacket>,
    ) -> Self {
        let next_header = match &payload {
            Some(p) if p.version() == 4 => PROTO_IPIP,
            Some(_) => PROTO_IPV6,
            None => PROTO_NONE,
        };
        EspPacket {
            source,
            destination,
            data: Vec::new(),
            payload,
            next_header,
        }
    }

    pub fn source(&self) -> SocketAddr {
        self.source
    }

    pub fn set_source(&mut self, source: SocketAddr) {
        self.source = source;
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    pub fn set_destination(&mut self, destination: SocketAddr) {
        self.destination = destination;
    }

    /// Raw wire bytes: the received datagram, or the built one after encrypt.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    /// Drop `bytes` from the front of the raw data (e.g. a UDP encapsulation
    /// header already consumed by the transport layer).
    pub fn skip_bytes(&mut self, bytes: usize) {
        let n = bytes.min(self.data.len());
        self.data.drain(..n);
    }

    pub fn next_header(&self) -> u8 {
        self.next_header
    }

    /// Decoded inner packet; `None` until a successful decrypt.
    pub fn payload(&self) -> Option<&IpPacket> {
        self.payload.as_ref()
    }

    /// Move the decoded inner packet out, leaving the container empty.
    pub fn extract_payload(&mut self) -> Option<IpPacket> {
        self.payload.take()
    }

    /// Read SPI and sequence number without touching any key material, so
    /// the caller can select the association before decrypting.
    pub fn parse_header(&self) -> Result<(u32, u32), ParseError> {
        decode_header(&self.data)
    }

    /// Build the complete ESP datagram for this packet's payload.
    ///
    /// Consumes one egress sequence number even if a later step fails, and
    /// wipes the partially built datagram on any failure.
    pub fn encrypt<C, S, R>(
        &mut self,
        sa: &mut SaContext<C, S, R>,
        spi: u32,
    ) -> Result<(), EspError>
    where
        C: Crypter,
        S: Signer,
        R: EntropySource,
    {
        self.data.clear();

        let seq = sa.next_seqno().ok_or(EspError::SeqnoCycled)?;

        let block_size = sa.crypter().block_size();
        let iv_len = sa.crypter().iv_size();
        let icv_len = sa.signer().icv_size();

        let payload_len = self.payload.as_ref().map_or(0, |p| p.len());
        let pad_len = pad_len_for(payload_len, block_size);
        let plain_len = payload_len + pad_len + ESP_TRAILER_LEN;
        let total = ESP_HEADER_LEN + iv_len + plain_len + icv_len;

        // One contiguous allocation; the reserved capacity covers every
        // region, so later pushes never reallocate and strand a plaintext
        // copy outside the wipe guard.
        let mut buf = Zeroizing::new(Vec::with_capacity(total));
        buf.extend_from_slice(&encode_header(spi, seq));
        buf.resize(ESP_HEADER_LEN + iv_len, 0);
        match sa.entropy() {
            Some(entropy) => entropy
                .fill_bytes(&mut buf[ESP_HEADER_LEN..])
                .map_err(|_| EspError::ShortEntropy)?,
            None => return Err(EspError::EntropyUnavailable),
        }

        if let Some(payload) = &self.payload {
            buf.extend_from_slice(payload.encoding());
        }
        write_tail(&mut buf, pad_len, self.next_header)?;

        let ciphertext_start = ESP_HEADER_LEN + iv_len;
        {
            let (head, body) = buf.split_at_mut(ciphertext_start);
            sa.crypter().encrypt(body, &head[ESP_HEADER_LEN..])?;
        }

        buf.resize(total, 0);
        {
            let (authed, icv) = buf.split_at_mut(ciphertext_start + plain_len);
            sa.signer().sign(&[&*authed], icv)?;
        }

        self.data = mem::take(&mut *buf);
        Ok(())
    }

    /// Authenticate and decrypt this packet's wire bytes, populating the
    /// inner packet and next-header byte.
    ///
    /// Steps run in a fixed order: header parse, layout validation, replay
    /// pre-check, ICV verification, decryption, trailer strip, inner decode,
    /// and only then the window commit. A datagram that fails its ICV never
    /// moves the replay window, and all plaintext scratch is wiped on any
    /// failure.
    pub fn decrypt<C, S, R>(&mut self, sa: &mut SaContext<C, S, R>) -> Result<(), EspError>
    where
        C: Crypter,
        S: Signer,
        R: EntropySource,
    {
        self.payload = None;

        let (_spi, seq) = decode_header(&self.data)?;

        let block_size = sa.crypter().block_size();
        let iv_len = sa.crypter().iv_size();
        let icv_len = sa.signer().icv_size();

        let len = self.data.len();
        if len < ESP_HEADER_LEN + iv_len + icv_len + block_size
            || (len - ESP_HEADER_LEN - iv_len - icv_len) % block_size != 0
        {
            return Err(EspError::Parse(ParseError::BadLayout));
        }

        if !sa.verify_seqno(seq) {
            return Err(EspError::Replay);
        }

        let (header, after_header) = self.data.split_at(ESP_HEADER_LEN);
        let (iv, after_iv) = after_header.split_at(iv_len);
        let (ciphertext, icv) = after_iv.split_at(after_iv.len() - icv_len);

        sa.signer().verify(&[header, iv, ciphertext], icv)?;

        let mut plaintext = Zeroizing::new(vec![0u8; ciphertext.len()]);
        sa.crypter().decrypt(ciphertext, iv, &mut plaintext)?;

        let (payload, next_header) = strip_tail(&plaintext)?;
        let inner = IpPacket::from_bytes(payload.to_vec())?;

        self.payload = Some(inner);
        self.next_header = next_header;
        sa.commit_seqno(seq);
        Ok(())
    }
}

/// Minimal 20-byte IPv4 header (version 4, IHL 5) for demos and tests.
pub fn sample_ipv4_packet() -> IpPacket {
    let mut data = vec![0u8; 20];
    data[0] = 0x45;
    data[3] = 20; // total length
    data[8] = 64; // TTL
    data[9] = PROTO_NONE;
    data[12..16].copy_from_slice(&[10, 0, 0, 1]);
    data[16..20].copy_from_slice(&[10, 0, 0, 2]);
    IpPacket { version: 4, data }
}

/// Minimal 40-byte IPv6 header for demos and tests.
pub fn sample_ipv6_packet() -> IpPacket {
    let mut data = vec![0u8; 40];
    data[0] = 0x60;
    data[6] = PROTO_NONE;
    data[7] = 64; // hop limit
    data[23] = 1; // src ::1
    data[39] = 2; // dst ::2
    IpPacket { version: 6, data }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    struct FixedEntropy(u8);

    impl EntropySource for FixedEntropy {
        type Error = ();

        fn fill_bytes(&mut self, buf: &mut [u8]) -> Result<(), ()> {
            buf.fill(self.0);
            Ok(())
        }
    }

    struct BrokenEntropy;

    impl EntropySource for BrokenEntropy {
        type Error = ();

        fn fill_bytes(&mut self, _buf: &mut [u8]) -> Result<(), ()> {
            Err(())
        }
    }

    fn endpoints() -> (SocketAddr, SocketAddr) {
        (
            "192.0.2.1:4500".parse().unwrap(),
            "192.0.2.2:4500".parse().unwrap(),
        )
    }

    fn dummy_pair(
        block: usize,
        iv: usize,
        icv: usize,
    ) -> (
        SaContext<DummyCrypter, DummySigner, FixedEntropy>,
        SaContext<DummyCrypter, DummySigner>,
    ) {
        let outbound = SaContext::outbound(
            DummyCrypter::new([0x42; 16], block, iv),
            DummySigner::new([0x24; 16], icv),
            FixedEntropy(0xA5),
        );
        let inbound = SaContext::inbound(
            DummyCrypter::new([0x42; 16], block, iv),
            DummySigner::new([0x24; 16], icv),
        );
        (outbound, inbound)
    }

    #[test]
    fn header_roundtrip() {
        let bytes = encode_header(0xDEAD_BEEF, 7);
        assert_eq!(bytes, [0xDE, 0xAD, 0xBE, 0xEF, 0, 0, 0, 7]);
        assert_eq!(decode_header(&bytes).unwrap(), (0xDEAD_BEEF, 7));
    }

    #[test]
    fn header_rejects_short_input() {
        assert_eq!(decode_header(&[0u8; 7]), Err(ParseError::TruncatedHeader));
    }

    #[test]
    fn pad_length_law() {
        for block in [8usize, 16] {
            for payload_len in 0..64 {
                let pad = pad_len_for(payload_len, block);
                assert!(pad >= 1 && pad <= block, "pad {} for block {}", pad, block);
                assert_eq!((payload_len + pad + ESP_TRAILER_LEN) % block, 0);
            }
        }
    }

    #[test]
    fn tail_roundtrip() {
        let mut buf = b"payload".to_vec();
        let pad = pad_len_for(buf.len(), 16);
        write_tail(&mut buf, pad, PROTO_IPIP).expect("tail");
        assert_eq!(buf.len() % 16, 0);

        let (payload, next_header) = strip_tail(&buf).unwrap();
        assert_eq!(payload, b"payload");
        assert_eq!(next_header, PROTO_IPIP);
    }

    #[test]
    fn tail_rejects_bad_pad_byte() {
        let mut buf = b"data".to_vec();
        write_tail(&mut buf, 3, PROTO_IPIP).expect("tail");
        let pad_offset = buf.len() - ESP_TRAILER_LEN - 3;
        buf[pad_offset] = 0x07; // should be 0x01
        assert_eq!(strip_tail(&buf), Err(ParseError::BadPadding));
    }

    #[test]
    fn tail_rejects_overlong_pad() {
        // pad_len byte claims more padding than the plaintext holds
        let buf = [0x01, 0x02, 0xFF, PROTO_IPIP];
        assert_eq!(strip_tail(&buf), Err(ParseError::BadPadding));
    }

    #[test]
    fn tail_rejects_short_plaintext() {
        assert_eq!(strip_tail(&[0x01]), Err(ParseError::BadLayout));
    }

    #[test]
    fn tail_rejects_unrepresentable_pad_len() {
        let mut buf = b"payload".to_vec();
        assert_eq!(
            write_tail(&mut buf, 300, PROTO_IPIP),
            Err(CryptoError::Primitive {
                context: "pad length exceeds one-byte field",
            })
        );
        // Nothing was written.
        assert_eq!(buf, b"payload");
    }

    #[test]
    fn encrypt_rejects_overwide_block() {
        let (src, dst) = endpoints();
        // A 512-byte block needs a pad length no one-byte field can carry.
        let mut sa = SaContext::outbound(
            DummyCrypter::new([0x42; 16], 512, 16),
            DummySigner::new([0x24; 16], 12),
            FixedEntropy(0xA5),
        );
        let mut pkt = EspPacket::from_payload(src, dst, Some(sample_ipv4_packet()));
        assert!(matches!(
            pkt.encrypt(&mut sa, 0x1001),
            Err(EspError::Crypto(CryptoError::Primitive { .. }))
        ));
        assert!(pkt.data().is_empty());
    }

    #[test]
    fn tail_accepts_zero_padding() {
        let buf = [0x45, 0x00, 0x00, PROTO_IPIP];
        let (payload, next_header) = strip_tail(&buf).unwrap();
        assert_eq!(payload, &[0x45, 0x00]);
        assert_eq!(next_header, PROTO_IPIP);
    }

    #[test]
    fn ip_packet_versions() {
        assert_eq!(IpPacket::from_bytes(vec![0x45, 0x00]).unwrap().version(), 4);
        assert_eq!(IpPacket::from_bytes(vec![0x60, 0x00]).unwrap().version(), 6);
        assert_eq!(
            IpPacket::from_bytes(vec![0x20, 0x00]),
            Err(ParseError::UnsupportedVersion(2))
        );
        assert_eq!(
            IpPacket::from_bytes(vec![]),
            Err(ParseError::UnsupportedVersion(0))
        );
    }

    #[test]
    fn next_header_follows_payload_version() {
        let (src, dst) = endpoints();
        let v4 = EspPacket::from_payload(src, dst, Some(sample_ipv4_packet()));
        assert_eq!(v4.next_header(), PROTO_IPIP);

        let v6 = EspPacket::from_payload(src, dst, Some(sample_ipv6_packet()));
        assert_eq!(v6.next_header(), PROTO_IPV6);

        let none = EspPacket::from_payload(src, dst, None);
        assert_eq!(none.next_header(), PROTO_NONE);
        assert!(none.payload().is_none());
    }

    #[test]
    fn fresh_container_has_empty_data_and_no_payload() {
        let (src, dst) = endpoints();
        let pkt = EspPacket::from_payload(src, dst, Some(sample_ipv4_packet()));
        assert!(pkt.data().is_empty());

        let rx = EspPacket::from_wire(src, dst, vec![0u8; 16]);
        assert!(rx.payload().is_none());
    }

    #[test]
    fn minimal_ipv4_roundtrip() {
        let (src, dst) = endpoints();
        let (mut sa_out, mut sa_in) = dummy_pair(16, 16, 12);

        let inner = sample_ipv4_packet();
        let mut pkt = EspPacket::from_payload(src, dst, Some(inner.clone()));
        pkt.encrypt(&mut sa_out, 0xDEAD_BEEF).expect("encrypt");

        // 20-byte payload + trailer pads to 32; 8 + 16 + 32 + 12 = 68.
        assert_eq!(pkt.data().len(), 68);
        assert_eq!(pkt.parse_header().unwrap(), (0xDEAD_BEEF, 1));

        let mut rx = EspPacket::from_wire(src, dst, pkt.data().to_vec());
        rx.decrypt(&mut sa_in).expect("decrypt");
        assert_eq!(rx.next_header(), PROTO_IPIP);
        assert_eq!(rx.payload().unwrap().encoding(), inner.encoding());
        assert_eq!(sa_in.window().highest(), 1);
    }

    #[test]
    fn egress_sequence_increments() {
        let (src, dst) = endpoints();
        let (mut sa_out, _) = dummy_pair(16, 16, 12);

        for expected in 1..=3u32 {
            let mut pkt = EspPacket::from_payload(src, dst, Some(sample_ipv4_packet()));
            pkt.encrypt(&mut sa_out, 0x1001).expect("encrypt");
            let (_, seq) = pkt.parse_header().unwrap();
            assert_eq!(seq, expected);
        }
        assert_eq!(sa_out.last_seqno(), 3);
    }

    #[test]
    fn encrypt_without_entropy_fails() {
        let (src, dst) = endpoints();
        let mut sa = SaContext::inbound(
            DummyCrypter::new([0x42; 16], 16, 16),
            DummySigner::new([0x24; 16], 12),
        );
        let mut pkt = EspPacket::from_payload(src, dst, Some(sample_ipv4_packet()));
        assert_eq!(pkt.encrypt(&mut sa, 0x1001), Err(EspError::EntropyUnavailable));
        assert!(pkt.data().is_empty());
    }

    #[test]
    fn encrypt_with_failing_entropy_fails() {
        let (src, dst) = endpoints();
        let mut sa = SaContext::outbound(
            DummyCrypter::new([0x42; 16], 16, 16),
            DummySigner::new([0x24; 16], 12),
            BrokenEntropy,
        );
        let mut pkt = EspPacket::from_payload(src, dst, Some(sample_ipv4_packet()));
        assert_eq!(pkt.encrypt(&mut sa, 0x1001), Err(EspError::ShortEntropy));
    }

    #[test]
    fn decrypt_rejects_bad_layout() {
        let (src, dst) = endpoints();
        let (_, mut sa_in) = dummy_pair(16, 16, 12);

        // Too short for header + IV + ICV + one block.
        let mut short = EspPacket::from_wire(src, dst, vec![0u8; 40]);
        assert_eq!(
            short.decrypt(&mut sa_in),
            Err(EspError::Parse(ParseError::BadLayout))
        );

        // Right ballpark but not block-aligned.
        let mut ragged = EspPacket::from_wire(src, dst, vec![0u8; 69]);
        assert_eq!(
            ragged.decrypt(&mut sa_in),
            Err(EspError::Parse(ParseError::BadLayout))
        );

        // Not even a full header.
        let mut stub = EspPacket::from_wire(src, dst, vec![0u8; 4]);
        assert_eq!(
            stub.decrypt(&mut sa_in),
            Err(EspError::Parse(ParseError::TruncatedHeader))
        );
    }

    #[test]
    fn extract_payload_empties_container() {
        let (src, dst) = endpoints();
        let (mut sa_out, mut sa_in) = dummy_pair(16, 16, 12);

        let mut pkt = EspPacket::from_payload(src, dst, Some(sample_ipv4_packet()));
        pkt.encrypt(&mut sa_out, 0x1001).expect("encrypt");

        let mut rx = EspPacket::from_wire(src, dst, pkt.data().to_vec());
        rx.decrypt(&mut sa_in).expect("decrypt");

        let inner = rx.extract_payload().expect("payload present");
        assert_eq!(inner.version(), 4);
        assert!(rx.payload().is_none());
        // Raw bytes still carry the ciphertext datagram.
        assert_eq!(rx.data().len(), 68);
    }

    #[test]
    fn clone_is_deep() {
        let (src, dst) = endpoints();
        let mut pkt = EspPacket::from_payload(src, dst, Some(sample_ipv4_packet()));
        let copy = pkt.clone();

        pkt.set_data(vec![0xFF; 4]);
        pkt.extract_payload();

        assert!(copy.data().is_empty());
        assert_eq!(copy.payload().unwrap().version(), 4);
    }

    #[test]
    fn skip_bytes_trims_prefix() {
        let (src, dst) = endpoints();
        let mut pkt = EspPacket::from_wire(src, dst, vec![1, 2, 3, 4, 5]);
        pkt.skip_bytes(2);
        assert_eq!(pkt.data(), &[3, 4, 5]);
        pkt.skip_bytes(10);
        assert!(pkt.data().is_empty());
    }
}
