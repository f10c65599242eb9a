use crate::engine::EngineStream;
use crate::recognizer::OnlineRecognizer;
use crate::stream::OnlineStream;
use crate::{RecognizerError, Result};

impl OnlineRecognizer {
    /// Advance every stream by one decode step in a single engine call.
    ///
    /// Nothing is decoded unless every stream belongs to this recognizer and
    /// is ready.
    pub fn decode_streams(&self, streams: &mut [&mut OnlineStream]) -> Result<()> {
        if streams.is_empty() {
            return Err(RecognizerError::EmptyBatch);
        }
        for (index, stream) in streams.iter().enumerate() {
            self.check_owner(stream)?;
            if !self.engine().is_ready(stream.engine_stream()) {
                return Err(RecognizerError::NotReadyInBatch { index });
            }
        }

        let mut inner: Vec<&mut dyn EngineStream> = streams
            .iter_mut()
            .map(|stream| stream.engine_stream_mut())
            .collect();
        self.engine().decode_streams(&mut inner);
        tracing::trace!(count = inner.len(), "Decoded batch");
        Ok(())
    }
}
