use std::{marker::PhantomData, pin::Pin};

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::tcp::{OwnedReadHalf, OwnedWriteHalf},
};
use tokio_stream::{wrappers::LinesStream, Stream, StreamExt};

pub const NEW_LINE: &[u8; 2] = b"\r\n";

pub type BoxedStream<Item> = Pin<Box<dyn Stream<Item = Item> + Send>>;

/// [FrameWriter] writes newline delimited JSON frames of type `T` to the write half of a TCP stream
pub struct FrameWriter<T> {
    writer: OwnedWriteHalf,
    _frame: PhantomData<fn(&T)>,
}

impl<T: Serialize> FrameWriter<T> {
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self {
            writer,
            _frame: PhantomData,
        }
    }

    /// Send a single frame to the backing TCP stream
    ///
    /// # Cancel Safety
    ///
    /// This method is not cancellation safe. If it is used as the event
    /// in a [tokio::select!] statement and some other
    /// branch completes first, then the frame may have been
    /// partially written, but future calls to `write` will start over
    /// from the beginning of the buffer. Causing undefined behaviour.
    pub async fn write(&mut self, frame: &T) -> anyhow::Result<()> {
        let mut serialized_bytes = serde_json::to_vec(frame)?;
        serialized_bytes.extend_from_slice(NEW_LINE);

        self.writer.write_all(serialized_bytes.as_slice()).await?;

        Ok(())
    }
}

/// Turns the read half of a TCP stream into a stream of deserialized frames.
/// Blank lines are skipped, `peer` only names the other side in error messages.
pub fn frame_stream<T>(reader: OwnedReadHalf, peer: &'static str) -> BoxedStream<anyhow::Result<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    Box::pin(
        LinesStream::new(BufReader::new(reader).lines())
            .filter(|line| !matches!(line, Ok(line) if line.trim().is_empty()))
            .map(move |line| {
                line.with_context(|| format!("could not read line from the {}", peer))
                    .and_then(|line| {
                        serde_json::from_str::<T>(&line)
                            .with_context(|| format!("failed to deserialize frame from the {}", peer))
                    })
            }),
    )
}
