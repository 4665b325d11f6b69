use clap::Parser;
use proto::backend::EntropySource;
use proto::sim::MockWire;
use proto::{
    sample_ipv4_packet, sample_ipv6_packet, Aes128CbcCrypter, Crypter, DummyCrypter, DummySigner,
    EspError, EspPacket, HmacSha1Signer, SaContext, Signer,
};
use serde::Serialize;
use std::net::SocketAddr;

fn main() {
    let args = Args::parse();
    let enc_key = args.enc_key.unwrap_or([0x42; 16]);
    let auth_key = args.auth_key.unwrap_or([0x24; 16]);

    println!("Host-side ESP tunnel simulation");
    println!(
        "crypto: {}",
        if args.real_crypto {
            "aes-128-cbc + hmac-sha1-96"
        } else {
            "dummy crypter/signer (wire layout only)"
        }
    );
    println!("spi: 0x{:08x}, datagrams: {}", args.spi, args.packets);
    println!(
        "wire faults: drop_first={} reorder={} corrupt_one={} jitter={}ms",
        args.drop_first, args.reorder, args.corrupt_one, args.jitter_ms
    );
    println!();

    let metrics = if args.real_crypto {
        run(
            &args,
            SaContext::outbound(
                Aes128CbcCrypter::new(enc_key),
                HmacSha1Signer::new(&auth_key),
                SimEntropy(args.seed),
            ),
            SaContext::inbound(
                Aes128CbcCrypter::new(enc_key),
                HmacSha1Signer::new(&auth_key),
            ),
        )
    } else {
        run(
            &args,
            SaContext::outbound(
                DummyCrypter::new(enc_key, 16, 16),
                DummySigner::new(auth_key, 12),
                SimEntropy(args.seed),
            ),
            SaContext::inbound(
                DummyCrypter::new(enc_key, 16, 16),
                DummySigner::new(auth_key, 12),
            ),
        )
    };

    println!(
        "\nmetrics json: {}",
        serde_json::to_string(&metrics).expect("serialize metrics")
    );
    if let Some(path) = args.metrics_csv.as_ref() {
        let mut content = String::new();
        content.push_str("sent,delivered,dropped,corrupted,accepted,replay_rejected,auth_rejected\n");
        content.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            metrics.sent,
            metrics.delivered,
            metrics.dropped,
            metrics.corrupted,
            metrics.accepted,
            metrics.replay_rejected,
            metrics.auth_rejected,
        ));
        std::fs::write(path, content).expect("write metrics csv");
        println!("metrics written to {}", path);
    }
}

fn run<C: Crypter, S: Signer>(
    args: &Args,
    mut sa_out: SaContext<C, S, SimEntropy>,
    mut sa_in: SaContext<C, S>,
) -> Metrics {
    let src: SocketAddr = "10.13.0.1:4500".parse().expect("src endpoint");
    let dst: SocketAddr = "10.13.0.2:4500".parse().expect("dst endpoint");
    let mut wire = MockWire::new(args.drop_first, args.reorder, args.jitter_ms);

    let mut metrics = Metrics::default();
    let mut last_delivered: Option<Vec<u8>> = None;

    for i in 0..args.packets {
        let inner = if i % 2 == 0 {
            sample_ipv4_packet()
        } else {
            sample_ipv6_packet()
        };
        let version = inner.version();

        let mut tx = EspPacket::from_payload(src, dst, Some(inner));
        tx.encrypt(&mut sa_out, args.spi).expect("encrypt");
        metrics.sent += 1;

        let (spi, seq) = tx.parse_header().expect("header");
        let iv_len = sa_out.crypter().iv_size();
        let icv_len = sa_out.signer().icv_size();
        let ct_len = tx.data().len() - 8 - iv_len - icv_len;
        println!(
            "tx ipv{} spi=0x{:08x} seq={} layout: header=8 iv={} ciphertext={} icv={} ({} bytes total)",
            version, spi, seq, iv_len, ct_len, icv_len, tx.data().len(),
        );
        if args.hex_dump {
            let hex: String = tx.data().iter().map(|b| format!("{:02x}", b)).collect();
            println!("   {}", hex);
        }

        if args.corrupt_one && i == args.packets / 2 {
            wire.corrupt_next();
        }
        wire.push(tx.data().to_vec());
        wire.advance(args.jitter_ms.max(1));

        while let Some(bytes) = wire.pop() {
            let mut rx = EspPacket::from_wire(src, dst, bytes.clone());
            match rx.decrypt(&mut sa_in) {
                Ok(()) => {
                    let inner = rx.extract_payload().expect("payload");
                    println!(
                        "rx seq={} -> ipv{} payload {} bytes, next_header={}",
                        rx.parse_header().expect("header").1,
                        inner.version(),
                        inner.len(),
                        rx.next_header(),
                    );
                    metrics.accepted += 1;
                    last_delivered = Some(bytes);
                }
                Err(EspError::Replay) => {
                    println!("rx rejected: replay");
                    metrics.replay_rejected += 1;
                }
                Err(err) => {
                    println!("rx rejected: {:?}", err);
                    metrics.auth_rejected += 1;
                }
            }
        }
    }

    // Replay the last accepted datagram; the window must reject it without
    // moving.
    if let Some(bytes) = last_delivered {
        let highest = sa_in.window().highest();
        let mut replay = EspPacket::from_wire(src, dst, bytes);
        match replay.decrypt(&mut sa_in) {
            Err(EspError::Replay) => {
                println!(
                    "\nreplayed datagram rejected, window highest still {}",
                    sa_in.window().highest()
                );
                assert_eq!(sa_in.window().highest(), highest);
                metrics.replay_rejected += 1;
            }
            other => println!("\nunexpected replay verdict: {:?}", other),
        }
    }

    let stats = wire.stats();
    metrics.delivered = stats.delivered;
    metrics.dropped = stats.dropped;
    metrics.corrupted = stats.corrupted;
    println!(
        "\nwire stats: delivered={} dropped={} corrupted={}",
        stats.delivered, stats.dropped, stats.corrupted
    );
    println!(
        "egress seq cursor at {}, ingress window highest {}",
        sa_out.last_seqno(),
        sa_in.window().highest()
    );
    metrics
}

/// Deterministic xorshift entropy; good enough for simulated IVs.
struct SimEntropy(u64);

impl EntropySource for SimEntropy {
    type Error = ();

    fn fill_bytes(&mut self, buf: &mut [u8]) -> Result<(), ()> {
        for b in buf.iter_mut() {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            *b = self.0 as u8;
        }
        Ok(())
    }
}

#[derive(Parser, Debug)]
struct Args {
    /// Use AES-128-CBC + HMAC-SHA1-96 instead of the dummy primitives.
    #[arg(long, default_value_t = false)]
    real_crypto: bool,

    /// 16-byte encryption key as hex (32 chars). Defaults to 0x42 * 16.
    #[arg(long, value_parser = parse_key)]
    enc_key: Option<[u8; 16]>,

    /// 16-byte authentication key as hex (32 chars). Defaults to 0x24 * 16.
    #[arg(long, value_parser = parse_key)]
    auth_key: Option<[u8; 16]>,

    /// Outbound SPI.
    #[arg(long, default_value_t = 0xDEAD_BEEF)]
    spi: u32,

    /// Number of datagrams to tunnel.
    #[arg(long, default_value_t = 6)]
    packets: usize,

    /// Drop the first datagram on the wire.
    #[arg(long, default_value_t = false)]
    drop_first: bool,

    /// Reorder datagrams on the wire.
    #[arg(long, default_value_t = false)]
    reorder: bool,

    /// Flip a bit in one in-flight datagram.
    #[arg(long, default_value_t = false)]
    corrupt_one: bool,

    /// Delivery jitter in ms.
    #[arg(long, default_value_t = 0)]
    jitter_ms: u64,

    /// Seed for the simulated IV entropy.
    #[arg(long, default_value_t = 0x1357_9BDF_0246_8ACE)]
    seed: u64,

    /// Print full datagram hex dumps.
    #[arg(long, default_value_t = false)]
    hex_dump: bool,

    /// Path to write metrics CSV (optional).
    #[arg(long)]
    metrics_csv: Option<String>,
}

#[derive(Serialize, Default)]
struct Metrics {
    sent: usize,
    delivered: usize,
    dropped: usize,
    corrupted: usize,
    accepted: usize,
    replay_rejected: usize,
    auth_rejected: usize,
}

fn parse_key(s: &str) -> Result<[u8; 16], String> {
    if s.len() != 32 {
        return Err(format!("expected 32 hex chars (16 bytes), got {}", s.len()));
    }
    let mut out = [0u8; 16];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&s[2 * i..2 * i + 2], 16).map_err(|e| e.to_string())?;
    }
    Ok(out)
}
