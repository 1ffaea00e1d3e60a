//! Crypto Worker Pool (C5).
//!
//! Grounded on `crypto_util.py`'s `ContentHelper`: a `queue.Queue` is
//! pre-populated with `instances` cipher handle pairs, and `ciface(idx)` is a
//! `@contextmanager` that pops a handle, yields it, and puts it back in a
//! `finally` block -- so the handle returns to the pool on every exit path,
//! including an exception raised inside the `with` block.
//!
//! The Rust equivalent replaces the queue with a bounded `mpsc` channel
//! pre-seeded with handles, and replaces the `finally` with a `Drop` guard:
//! `CryptoHandle` puts its inner handle back the moment it goes out of
//! scope, whether that's a clean return or an unwind.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use ring::aead::{self, BoundKey, Nonce, NonceSequence, OpeningKey, SealingKey, UnboundKey, NONCE_LEN};
use ring::error::Unspecified;
use tokio::sync::mpsc::{self, Receiver, Sender};

use engine_core::error::{Error, Result};
use telemetry::metrics;

/// Yields exactly one caller-supplied nonce, then refuses to advance again.
/// `seal_in_place_append_tag`/`open_in_place` each call `advance()` exactly
/// once per invocation, so a fresh instance per call is all a `SealingKey`/
/// `OpeningKey` ever needs -- and it lets the nonce used to seal travel with
/// the ciphertext for `decrypt` to reuse when opening, rather than both
/// sides silently drawing from one shared counter (which desyncs encrypt
/// from decrypt after a single call).
struct OneShotNonce(Option<[u8; NONCE_LEN]>);

impl NonceSequence for OneShotNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, Unspecified> {
        self.0.take().map(Nonce::assume_unique_for_key).ok_or(Unspecified)
    }
}

/// One cipher handle: the engine's configured encryption key, plus a
/// monotonic counter that hands out a fresh nonce to every `encrypt` call on
/// this handle.
pub struct CipherHandle {
    key_bytes: [u8; 32],
    nonce_counter: AtomicU64,
}

impl CipherHandle {
    fn new(key_bytes: [u8; 32]) -> Self {
        Self {
            key_bytes,
            nonce_counter: AtomicU64::new(1),
        }
    }

    fn next_nonce_bytes(&self) -> [u8; NONCE_LEN] {
        let value = self.nonce_counter.fetch_add(1, Ordering::SeqCst);
        let mut bytes = [0u8; NONCE_LEN];
        bytes[4..].copy_from_slice(&value.to_be_bytes());
        bytes
    }

    /// Encrypts `plaintext`, returning `nonce || ciphertext || tag` and an
    /// elapsed-time measurement. Mirrors `crypto_util.py`'s `encrypt()`
    /// returning `(result, elapsed_time)`; the nonce prefix lets `decrypt`
    /// recover the exact value sealing used, since this handle's sealing and
    /// opening nonces are otherwise independent.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<(Vec<u8>, std::time::Duration)> {
        let start = Instant::now();
        let nonce_bytes = self.next_nonce_bytes();

        let unbound = UnboundKey::new(&aead::AES_256_GCM, &self.key_bytes)
            .map_err(|_| Error::encryption("failed to build sealing key"))?;
        let mut key = SealingKey::new(unbound, OneShotNonce(Some(nonce_bytes)));

        let mut buf = plaintext.to_vec();
        key.seal_in_place_append_tag(aead::Aad::empty(), &mut buf)
            .map_err(|_| Error::encryption("seal_in_place failed"))?;

        let mut out = Vec::with_capacity(NONCE_LEN + buf.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend(buf);
        Ok((out, start.elapsed()))
    }

    /// Decrypts `nonce || ciphertext || tag` as produced by [`encrypt`],
    /// returning the plaintext.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<(Vec<u8>, std::time::Duration)> {
        let start = Instant::now();
        if ciphertext.len() < NONCE_LEN {
            return Err(Error::encryption("ciphertext too short to contain a nonce"));
        }
        let (nonce_bytes, body) = ciphertext.split_at(NONCE_LEN);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);

        let unbound = UnboundKey::new(&aead::AES_256_GCM, &self.key_bytes)
            .map_err(|_| Error::encryption("failed to build opening key"))?;
        let mut key = OpeningKey::new(unbound, OneShotNonce(Some(nonce)));

        let mut buf = body.to_vec();
        let plaintext = key
            .open_in_place(aead::Aad::empty(), &mut buf)
            .map_err(|_| Error::encryption("open_in_place failed"))?;
        let plaintext = plaintext.to_vec();
        Ok((plaintext, start.elapsed()))
    }
}

/// Bounded pool serializing access to cipher handles (spec C5). `pool_size`
/// mirrors the Python `instances` parameter.
pub struct CryptoPool {
    tx: Sender<Arc<CipherHandle>>,
    rx: tokio::sync::Mutex<Receiver<Arc<CipherHandle>>>,
}

impl CryptoPool {
    pub fn new(pool_size: usize, key_bytes: [u8; 32]) -> Self {
        let (tx, rx) = mpsc::channel(pool_size.max(1));
        for _ in 0..pool_size.max(1) {
            let _ = tx.try_send(Arc::new(CipherHandle::new(key_bytes)));
        }
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// Checks out a handle, blocking until one is free. The returned guard
    /// returns the handle to the pool on drop, whether `Ok`, `Err`, or panic
    /// unwound through the caller.
    pub async fn acquire(&self) -> CryptoGuard {
        let start = Instant::now();
        let handle = {
            let mut rx = self.rx.lock().await;
            rx.recv()
                .await
                .expect("pool sender is never dropped while the pool is alive")
        };
        metrics().crypto_pool_wait_ms.observe(start.elapsed().as_millis() as u64);
        CryptoGuard {
            handle: Some(handle),
            tx: self.tx.clone(),
        }
    }
}

/// RAII checkout of a single `CipherHandle`. Dropping it (by any path)
/// returns the handle to the pool.
pub struct CryptoGuard {
    handle: Option<Arc<CipherHandle>>,
    tx: Sender<Arc<CipherHandle>>,
}

impl std::ops::Deref for CryptoGuard {
    type Target = CipherHandle;

    fn deref(&self) -> &Self::Target {
        self.handle.as_ref().expect("handle present until drop")
    }
}

impl Drop for CryptoGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.tx.try_send(handle);
        }
    }
}
