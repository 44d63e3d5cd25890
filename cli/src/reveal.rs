//! Typewriter-style output for complete answers.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

pub const DEFAULT_REVEAL_DELAY_MS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reveal {
    delay: Duration,
}

impl Reveal {
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub const fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Write `text` one `char` at a time, pausing between characters.
    pub async fn write<W>(&self, out: &mut W, text: &str) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        if self.delay.is_zero() {
            out.write_all(text.as_bytes()).await?;
            return out.flush().await;
        }

        let mut buf = [0u8; 4];
        for ch in text.chars() {
            out.write_all(ch.encode_utf8(&mut buf).as_bytes()).await?;
            out.flush().await?;
            tokio::time::sleep(self.delay).await;
        }
        Ok(())
    }

    /// Like [`Reveal::write`], but stop early once `interrupt` resolves.
    /// Returns `false` when the text was cut short.
    pub async fn write_until<W, F>(&self, out: &mut W, text: &str, interrupt: F) -> io::Result<bool>
    where
        W: AsyncWrite + Unpin,
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            () = interrupt => Ok(false),
            written = self.write(out, text) => written.map(|()| true),
        }
    }
}

impl Default for Reveal {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_REVEAL_DELAY_MS))
    }
}
